//! Natural ("human") ordering: embedded digit runs compare as integers.

use regex::Regex;
use std::cmp::Ordering;
use std::sync::LazyLock;

static CHUNKS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+|\D+").unwrap());

/// Compare two strings in natural order, so `a2` sorts before `a10`.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = CHUNKS.find_iter(a).map(|m| m.as_str());
    let mut right = CHUNKS.find_iter(b).map(|m| m.as_str());

    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = compare_chunks(x, y);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

fn compare_chunks(x: &str, y: &str) -> Ordering {
    let numeric = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if numeric(x) && numeric(y) {
        // Compare by magnitude without parsing, so arbitrarily long digit runs work.
        let xs = x.trim_start_matches('0');
        let ys = y.trim_start_matches('0');
        xs.len()
            .cmp(&ys.len())
            .then_with(|| xs.cmp(ys))
            .then_with(|| x.len().cmp(&y.len()))
    } else {
        x.cmp(y)
    }
}

/// Sort items in place by the natural order of a string key.
pub fn natural_sort_by_key<T, K, F>(items: &mut [T], mut key: F)
where
    F: FnMut(&T) -> K,
    K: AsRef<str>,
{
    items.sort_by(|a, b| natural_cmp(key(a).as_ref(), key(b).as_ref()));
}
