//! Recursive, overlapping text chunker.
//!
//! Splits document text into an ordered sequence of chunks no longer
//! than `chunk_size` characters, repeating up to `overlap` trailing
//! characters of each chunk at the start of the next so retrieval keeps
//! local context across boundaries.
//!
//! # Algorithm
//!
//! 1. Pick the coarsest separator present in the text from the ladder
//!    `"\n\n"` → `"\n"` → `" "` → `""` (paragraph, line, word, character).
//! 2. Split on it. Pieces that fit within `chunk_size` are buffered.
//! 3. A piece that does not fit flushes the buffer (merged into chunks)
//!    and is split recursively with the next, finer separator.
//! 4. Merging joins buffered pieces with the separator until the next
//!    piece would overflow `chunk_size`, emits the chunk, then drops
//!    pieces from the front until at most `overlap` characters remain.
//!
//! Lengths are counted in Unicode scalar values, never bytes, so a split
//! never lands inside a multi-byte character.
//!
//! Runs of the chosen separator collapse: the empty pieces between two
//! adjacent separators are dropped, so `"a\n\n\n\nb"` comes back as
//! `"a\n\nb"`. Each chunk is also trimmed of surrounding whitespace.
//! A chunk is therefore not always a verbatim slice of the document.
//!
//! # Example
//!
//! ```rust
//! use study_context_core::chunk::split_text;
//!
//! let chunks = split_text("Hello world.\n\nSecond paragraph.", 1000, 200);
//! assert_eq!(chunks, vec!["Hello world.\n\nSecond paragraph.".to_string()]);
//! assert!(split_text("", 1000, 200).is_empty());
//! ```

use std::collections::VecDeque;

use crate::models::Chunk;

/// Separator ladder, coarsest first. The empty separator splits into
/// single characters and always terminates the recursion.
const SEPARATORS: [&str; 4] = ["\n\n", "\n", " ", ""];

/// Chunk size and overlap, in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingParams {
    pub chunk_size: usize,
    pub overlap: usize,
}

impl Default for ChunkingParams {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            overlap: 200,
        }
    }
}

/// Split text into ordered chunk strings.
///
/// # Guarantees
///
/// - Deterministic: identical input yields an identical sequence.
/// - Empty or whitespace-only input yields an empty sequence.
/// - No chunk is empty and no chunk exceeds `chunk_size` characters.
/// - With `overlap = 0`, adjacent chunks share no repeated text.
///
/// `chunk_size = 0` is treated as 1 and `overlap` is clamped below
/// `chunk_size`.
pub fn split_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let chunk_size = chunk_size.max(1);
    let overlap = overlap.min(chunk_size - 1);

    if text.trim().is_empty() {
        return Vec::new();
    }

    split_recursive(text, &SEPARATORS, chunk_size, overlap)
}

/// Split a document into [`Chunk`]s whose `chunk_index` is the sequence
/// position (contiguous from 0). Embeddings are left empty.
pub fn chunk_text(source_id: &str, text: &str, params: ChunkingParams) -> Vec<Chunk> {
    split_text(text, params.chunk_size, params.overlap)
        .into_iter()
        .enumerate()
        .map(|(index, piece)| Chunk::new(source_id, index, piece))
        .collect()
}

fn split_recursive(
    text: &str,
    separators: &[&str],
    chunk_size: usize,
    overlap: usize,
) -> Vec<String> {
    let position = separators
        .iter()
        .position(|sep| sep.is_empty() || text.contains(sep))
        .unwrap_or(separators.len());
    let separator = separators.get(position).copied().unwrap_or("");
    let finer = separators.get(position + 1..).unwrap_or(&[]);

    let pieces: Vec<&str> = if separator.is_empty() {
        text.char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect()
    } else {
        // Adjacent separators yield empty pieces; dropping them collapses the run.
        text.split(separator).filter(|p| !p.is_empty()).collect()
    };

    let mut chunks = Vec::new();
    let mut pending: Vec<&str> = Vec::new();

    for piece in pieces {
        if char_len(piece) <= chunk_size {
            pending.push(piece);
            continue;
        }

        if !pending.is_empty() {
            chunks.extend(merge_pieces(&pending, separator, chunk_size, overlap));
            pending.clear();
        }

        if finer.is_empty() {
            push_trimmed(&mut chunks, piece);
        } else {
            chunks.extend(split_recursive(piece, finer, chunk_size, overlap));
        }
    }

    if !pending.is_empty() {
        chunks.extend(merge_pieces(&pending, separator, chunk_size, overlap));
    }

    chunks
}

/// Greedily join pieces into chunks of at most `chunk_size` characters,
/// carrying up to `overlap` characters of trailing pieces forward.
fn merge_pieces(
    pieces: &[&str],
    separator: &str,
    chunk_size: usize,
    overlap: usize,
) -> Vec<String> {
    let sep_len = char_len(separator);
    let mut chunks = Vec::new();
    let mut window: VecDeque<(&str, usize)> = VecDeque::new();
    // Character length of the window joined with `separator`.
    let mut total = 0usize;

    for &piece in pieces {
        let len = char_len(piece);

        if !window.is_empty() && total + sep_len + len > chunk_size {
            push_joined(&mut chunks, &window, separator);

            while let Some(&(_, front_len)) = window.front() {
                let joiner = if window.is_empty() { 0 } else { sep_len };
                let next_fits = total + joiner + len <= chunk_size;
                if total <= overlap && next_fits {
                    break;
                }
                window.pop_front();
                total -= front_len;
                if !window.is_empty() {
                    total -= sep_len;
                }
            }
        }

        if !window.is_empty() {
            total += sep_len;
        }
        total += len;
        window.push_back((piece, len));
    }

    push_joined(&mut chunks, &window, separator);
    chunks
}

fn push_joined(chunks: &mut Vec<String>, window: &VecDeque<(&str, usize)>, separator: &str) {
    let joined = window
        .iter()
        .map(|(piece, _)| *piece)
        .collect::<Vec<_>>()
        .join(separator);
    push_trimmed(chunks, &joined);
}

fn push_trimmed(chunks: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prose(sentences: usize) -> String {
        (0..sentences)
            .map(|i| format!("Sentence number {} explains one more idea.", i))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_empty_text() {
        assert!(split_text("", 100, 20).is_empty());
        assert!(split_text("   \n\n  \n", 100, 20).is_empty());
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunks = split_text("Hello, world!", 1000, 200);
        assert_eq!(chunks, vec!["Hello, world!".to_string()]);
    }

    #[test]
    fn test_paragraphs_merge_under_limit() {
        let text = "First paragraph.\n\nSecond paragraph.\n\nThird paragraph.";
        let chunks = split_text(text, 1000, 0);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], text);
    }

    #[test]
    fn test_no_chunk_exceeds_size() {
        let text = format!("{}\n\n{}\nshort line\n{}", prose(40), prose(3), prose(25));
        for (size, overlap) in [(50, 0), (120, 30), (300, 100), (7, 3)] {
            let chunks = split_text(&text, size, overlap);
            assert!(!chunks.is_empty());
            for c in &chunks {
                assert!(!c.is_empty());
                assert!(
                    c.chars().count() <= size,
                    "chunk of {} chars exceeds {}",
                    c.chars().count(),
                    size
                );
            }
        }
    }

    #[test]
    fn test_zero_overlap_splits_without_repetition() {
        let text = prose(30);
        let size = 100;
        assert!(text.chars().count() > size);

        let chunks = split_text(&text, size, 0);
        assert!(chunks.len() > 1);

        // Without overlap the chunks partition the words of the text.
        let rejoined: Vec<&str> = chunks.iter().flat_map(|c| c.split_whitespace()).collect();
        let original: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(rejoined, original);

        for pair in chunks.windows(2) {
            let last_word = pair[0].split_whitespace().last().unwrap();
            let first_word = pair[1].split_whitespace().next().unwrap();
            let tail = format!("{} {}", last_word, first_word);
            assert!(text.contains(&tail), "boundary {:?} not adjacent in source", tail);
        }
    }

    #[test]
    fn test_overlap_repeats_trailing_text() {
        let text = prose(30);
        let chunks = split_text(&text, 120, 40);
        assert!(chunks.len() > 1);
        let repeated = chunks.windows(2).any(|pair| {
            let last_word = pair[0].split_whitespace().last().unwrap();
            pair[1].starts_with(last_word) || pair[1].contains(last_word)
        });
        assert!(repeated, "expected overlapping text between adjacent chunks");
    }

    #[test]
    fn test_long_word_hard_split() {
        let text = "x".repeat(25);
        let chunks = split_text(&text, 10, 0);
        assert_eq!(chunks, vec!["x".repeat(10), "x".repeat(10), "x".repeat(5)]);
    }

    #[test]
    fn test_multibyte_utf8_chars() {
        let text = "┌──────────────────┐\n│ Hello world      │\n└──────────────────┘";
        let chunks = split_text(text, 5, 1);
        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(c.chars().count() <= 5);
        }
    }

    #[test]
    fn test_overlap_clamped_below_size() {
        let chunks = split_text(&prose(5), 20, 500);
        assert!(!chunks.is_empty());
        for c in &chunks {
            assert!(c.chars().count() <= 20);
        }
    }

    #[test]
    fn test_deterministic() {
        let text = format!("Alpha\n\nBeta\n\n{}\n\nGamma", prose(20));
        assert_eq!(split_text(&text, 64, 16), split_text(&text, 64, 16));
    }

    #[test]
    fn test_separator_runs_collapse() {
        assert_eq!(split_text("a\n\n\n\nb", 1000, 0), vec!["a\n\nb"]);
        assert_eq!(split_text("a\n\n\n\n\n\nb", 1000, 0), vec!["a\n\nb"]);
        // An odd newline left over from the paragraph split stays with its piece.
        assert_eq!(split_text("a\n\n\nb", 1000, 0), vec!["a\n\n\nb"]);
        assert_eq!(split_text("one  two", 4, 0), vec!["one", "two"]);
    }

    #[test]
    fn test_chunk_indices_contiguous() {
        let text = (0..50)
            .map(|i| format!("Paragraph number {}.", i))
            .collect::<Vec<_>>()
            .join("\n\n");
        let params = ChunkingParams {
            chunk_size: 60,
            overlap: 0,
        };
        let chunks = chunk_text("doc.txt", &text, params);
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i, "Index mismatch at position {}", i);
            assert_eq!(c.source_id, "doc.txt");
            assert!(!c.is_embedded());
        }
    }
}
