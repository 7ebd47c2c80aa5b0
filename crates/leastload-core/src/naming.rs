//! Worker id generation for synthetic pools.

const ALPHABET_LEN: usize = 26;

/// Generate `count` worker ids: `a`..`z`, then `a1`..`z1`, `a2`..`z2`, ...
pub fn worker_names(count: usize) -> Vec<String> {
    (0..count).map(worker_name).collect()
}

fn worker_name(index: usize) -> String {
    let letter = char::from(b'a' + (index % ALPHABET_LEN) as u8);
    let round = index / ALPHABET_LEN;
    if round == 0 {
        letter.to_string()
    } else {
        format!("{letter}{round}")
    }
}
