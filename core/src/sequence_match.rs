//! A small Ratcliff-Obershelp-style sequence matcher, grounded line-for-line
//! on `difflib.SequenceMatcher`'s `find_longest_match`/`ratio` (no junk
//! heuristics -- the Gloss Matcher's inputs are short enough that they are
//! unneeded).

use std::collections::HashMap;

fn find_longest_match<T: PartialEq>(
    a: &[T],
    b: &[T],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let mut best = (alo, blo, 0usize);
    let mut j2len: HashMap<usize, usize> = HashMap::new();
    for i in alo..ahi {
        let mut new_j2len: HashMap<usize, usize> = HashMap::new();
        for j in blo..bhi {
            if a[i] == b[j] {
                let k = if j > blo {
                    j2len.get(&(j - 1)).copied().unwrap_or(0)
                } else {
                    0
                } + 1;
                new_j2len.insert(j, k);
                if k > best.2 {
                    best = (i + 1 - k, j + 1 - k, k);
                }
            }
        }
        j2len = new_j2len;
    }
    best
}

/// Total length of all matching blocks between `a` and `b`, found by
/// recursively splitting around the longest match.
fn matching_blocks_total_len<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    let mut total = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        if alo >= ahi || blo >= bhi {
            continue;
        }
        let (i, j, k) = find_longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        total += k;
        queue.push((alo, i, blo, j));
        queue.push((i + k, ahi, j + k, bhi));
    }
    total
}

/// Length of the single longest contiguous matching run.
pub fn longest_match_len<T: PartialEq>(a: &[T], b: &[T]) -> usize {
    find_longest_match(a, b, 0, a.len(), 0, b.len()).2
}

/// `2 * M / (len(a) + len(b))` where `M` is the total matching-block length.
pub fn ratio<T: PartialEq>(a: &[T], b: &[T]) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let total = matching_blocks_total_len(a, b);
    2.0 * total as f64 / (a.len() + b.len()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_sequences_have_ratio_one() {
        let a: Vec<char> = "hello".chars().collect();
        assert_eq!(ratio(&a, &a), 1.0);
    }

    #[test]
    fn disjoint_sequences_have_ratio_zero() {
        let a: Vec<char> = "abc".chars().collect();
        let b: Vec<char> = "xyz".chars().collect();
        assert_eq!(ratio(&a, &b), 0.0);
        assert_eq!(longest_match_len(&a, &b), 0);
    }

    #[test]
    fn longest_match_finds_shared_substring() {
        let a: Vec<char> = "television".chars().collect();
        let b: Vec<char> = "vision".chars().collect();
        assert_eq!(longest_match_len(&a, &b), 6); // "vision"
    }
}
