use hashbrown::HashMap;

pub trait Similarity {
    fn similarity(&self, other: &Self) -> f64;
}

impl<T: AsRef<str>> Similarity for T {
    fn similarity(&self, other: &Self) -> f64 {
        similarity(self.as_ref(), other.as_ref())
    }
}

/// Dice coefficient over character bigrams, ignoring spaces.
/// 1.0 for identical names, 0.0 when nothing is shared.
pub fn similarity(str1: &str, str2: &str) -> f64 {
    let a = str1.chars().filter(|x| *x != ' ').collect::<Vec<_>>();
    let b = str2.chars().filter(|x| *x != ' ').collect::<Vec<_>>();

    if a == b {
        return 1.0;
    }

    if a.len() < 2 || b.len() < 2 {
        return 0.0;
    }

    let mut first_bigrams = HashMap::<(char, char), i32>::new();
    for i in a.windows(2) {
        *first_bigrams.entry((i[0], i[1])).or_insert(0) += 1;
    }

    let mut intersection_size = 0;
    for i in b.windows(2) {
        if let Some(count) = first_bigrams.get_mut(&(i[0], i[1])) {
            if *count > 0 {
                *count -= 1;
                intersection_size += 1;
            }
        }
    }

    (2.0 * intersection_size as f64) / (a.len() + b.len() - 2) as f64
}
