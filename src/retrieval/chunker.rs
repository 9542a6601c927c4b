//! Text chunking and lexical scoring

use std::collections::HashSet;

/// Target chunk length in characters
pub const CHUNK_SIZE: usize = 500;

/// Characters shared by consecutive chunks
pub const CHUNK_OVERLAP: usize = 100;

const SEPARATORS: [char; 4] = ['.', '?', '!', '\n'];

/// Split text into overlapping chunks
///
/// A chunk may run up to `CHUNK_OVERLAP` characters past `CHUNK_SIZE` so it
/// ends right after a sentence separator.
pub fn chunk_text(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let len = chars.len();
    let mut chunks = Vec::new();
    let mut start = 0;

    while start < len {
        let end = (start + CHUNK_SIZE).min(len);
        let mut actual_end = end;

        if end < len {
            let window_end = (end + CHUNK_OVERLAP).min(len);
            let last_separator = chars[start..window_end]
                .iter()
                .rposition(|c| SEPARATORS.contains(c));
            if let Some(idx) = last_separator.filter(|idx| *idx >= end - start) {
                actual_end = start + idx + 1;
            }
        }

        chunks.push(chars[start..actual_end].iter().collect());
        if actual_end == len {
            break;
        }
        start = actual_end.saturating_sub(CHUNK_OVERLAP);
    }

    chunks
}

/// Lowercased character bigrams, ignoring whitespace
///
/// Text shorter than two characters yields its single characters.
fn grams(text: &str) -> HashSet<String> {
    let chars: Vec<char> = text
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();

    if chars.len() < 2 {
        return chars.iter().map(|c| c.to_string()).collect();
    }
    chars.windows(2).map(|w| w.iter().collect()).collect()
}

/// Share of the query's bigrams found in the chunk, in `0.0..=1.0`
pub fn score(query: &str, chunk: &str) -> f64 {
    let query_grams = grams(query);
    if query_grams.is_empty() {
        return 0.0;
    }
    let chunk_grams = grams(chunk);
    let shared = query_grams.intersection(&chunk_grams).count();
    shared as f64 / query_grams.len() as f64
}
