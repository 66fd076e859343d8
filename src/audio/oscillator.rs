use std::f32::consts::TAU;

/// Endless sine wave with a short linear fade in so tone changes don't click.
#[derive(Clone, Copy, Debug)]
pub struct Oscillator {
    /// Fraction of a period, kept in `[0, 1)`.
    phase: f32,
    step: f32,
    sample_rate: f32,
    /// Samples into the fade in, stops counting once it's over.
    i: usize,
    ramp: usize,
}

impl Oscillator {
    pub fn new(frequency: f32, sample_rate: u32) -> Self {
        let sample_rate = sample_rate as f32;
        Self {
            phase: 0.0,
            step: frequency / sample_rate,
            sample_rate,
            i: 0,
            ramp: 0,
        }
    }

    /// Fade in over `seconds`.
    pub fn ramp(mut self, seconds: f32) -> Self {
        self.ramp = (self.sample_rate * seconds) as usize;
        self
    }

    #[cfg(test)]
    pub fn frequency(&self) -> f32 {
        self.step * self.sample_rate
    }
}

impl Iterator for Oscillator {
    type Item = f32;

    fn next(&mut self) -> Option<Self::Item> {
        self.phase += self.step;
        self.phase -= self.phase.floor();

        let mut raw = (self.phase * TAU).sin();
        if self.i < self.ramp {
            self.i += 1;
            if self.i < self.ramp {
                raw *= self.i as f32 / self.ramp as f32;
            }
        }

        Some(raw)
    }
}

#[cfg(test)]
mod test {
    use super::Oscillator;

    #[test]
    fn test_oscillator_ramp() {
        let mut osc = Oscillator::new(1000.0, 8000).ramp(0.001);
        let samples = (&mut osc).take(16).collect::<Vec<_>>();

        // 8 samples per period, peak at the second sample, damped by the ramp
        assert!((samples[1] - 2.0 / 8.0).abs() < 1e-5);
        assert!((samples[9] - 1.0).abs() < 1e-5);
        assert!(samples.iter().all(|x| x.abs() <= 1.0 + 1e-5));
    }

    #[test]
    fn test_oscillator_long_tone() {
        // Well past the point where a sample counter stops being exact as f32
        let mut osc = Oscillator::new(1000.0, 8000);
        let late = osc.nth((1 << 24) + 1).unwrap();
        assert!((late - 1.0).abs() < 1e-4, "{late}");
        assert!((osc.next().unwrap() - 0.5_f32.sqrt()).abs() < 1e-4);
    }
}
