//! Levenshtein distance over arbitrary token sequences

/// Minimum number of unit-cost insertions, deletions and substitutions
/// needed to turn `reference` into `hypothesis`.
///
/// Generic over the token type so the same routine scores characters
/// (CER) and words (WER).
pub fn edit_distance<T: PartialEq>(reference: &[T], hypothesis: &[T]) -> usize {
    let m = reference.len();
    let n = hypothesis.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    // Two rows of the DP matrix are enough.
    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let substitution = if reference[i - 1] == hypothesis[j - 1] { 0 } else { 1 };
            curr[j] = (prev[j] + 1)
                .min(curr[j - 1] + 1)
                .min(prev[j - 1] + substitution);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_empty_sequences() {
        let empty: [char; 0] = [];
        assert_eq!(edit_distance(&empty, &empty), 0);
        assert_eq!(edit_distance(&empty, &chars("abc")), 3);
        assert_eq!(edit_distance(&chars("abc"), &empty), 3);
    }

    #[test]
    fn test_classic_pairs() {
        assert_eq!(edit_distance(&chars("kitten"), &chars("sitting")), 3);
        assert_eq!(edit_distance(&chars("flaw"), &chars("lawn")), 2);
        assert_eq!(edit_distance(&chars("same"), &chars("same")), 0);
    }

    #[test]
    fn test_word_tokens() {
        let reference = ["the", "cat", "sat"];
        let hypothesis = ["the", "hat", "sat", "down"];
        assert_eq!(edit_distance(&reference, &hypothesis), 2);
    }

    #[test]
    fn test_distance_is_symmetric() {
        let a = chars("hello");
        let b = chars("hello world");
        assert_eq!(edit_distance(&a, &b), edit_distance(&b, &a));
    }
}
