use std::collections::VecDeque;

use crate::domain::{DocumentChunk, DomainError, Result};
use uuid::Uuid;

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 200;
pub const DEFAULT_SEPARATORS: [&str; 4] = ["\n\n", "\n", ".", " "];

/// Splits text on the coarsest separator that occurs in it, recursing into
/// finer separators for pieces that are still too long, then merges the
/// pieces back into chunks of at most `chunk_size` characters that overlap
/// by up to `chunk_overlap` characters.
///
/// Splitting into single characters is always the last resort, so no chunk
/// ever exceeds `chunk_size`.
#[derive(Debug, Clone)]
pub struct RecursiveTextSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveTextSplitter {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(DomainError::validation("chunk_size must be greater than zero"));
        }
        if chunk_overlap >= chunk_size {
            return Err(DomainError::validation(format!(
                "chunk_overlap ({chunk_overlap}) must be smaller than chunk_size ({chunk_size})"
            )));
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(ToString::to_string).collect(),
        })
    }

    pub fn with_separators(mut self, separators: Vec<String>) -> Self {
        self.separators = separators.into_iter().filter(|s| !s.is_empty()).collect();
        self
    }

    pub fn split_text(&self, text: &str) -> Vec<String> {
        let mut separators: Vec<&str> = self.separators.iter().map(String::as_str).collect();
        separators.push("");
        self.split_recursive(text, &separators)
    }

    /// Splits `content` and wraps each piece as a chunk of `document_id`,
    /// indexed from 0 in document order.
    pub fn split_document(&self, document_id: Uuid, content: &str) -> Vec<DocumentChunk> {
        self.split_text(content)
            .into_iter()
            .enumerate()
            .map(|(index, text)| DocumentChunk::new(document_id, text, index))
            .collect()
    }

    fn split_recursive(&self, text: &str, separators: &[&str]) -> Vec<String> {
        let (index, separator) = separators
            .iter()
            .enumerate()
            .find(|(_, sep)| sep.is_empty() || text.contains(**sep))
            .map(|(i, sep)| (i, *sep))
            .unwrap_or((separators.len(), ""));
        let remaining = separators.get(index + 1..).unwrap_or_default();

        let mut chunks = Vec::new();
        let mut pending: Vec<&str> = Vec::new();

        for piece in split_keep_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                pending.push(piece);
                continue;
            }

            if !pending.is_empty() {
                chunks.extend(self.merge(&pending));
                pending.clear();
            }

            if remaining.is_empty() {
                let trimmed = piece.trim();
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !pending.is_empty() {
            chunks.extend(self.merge(&pending));
        }

        chunks
    }

    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut current: VecDeque<&str> = VecDeque::new();
        let mut total = 0;

        for piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size && !current.is_empty() {
                push_joined(&mut docs, &current);

                // keep a tail of at most `chunk_overlap` characters
                while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0) {
                    let Some(front) = current.pop_front() else {
                        break;
                    };
                    total -= char_len(front);
                }
            }

            current.push_back(piece);
            total += len;
        }

        push_joined(&mut docs, &current);
        docs
    }
}

impl Default for RecursiveTextSplitter {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            separators: DEFAULT_SEPARATORS.iter().map(ToString::to_string).collect(),
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn push_joined(docs: &mut Vec<String>, parts: &VecDeque<&str>) {
    let joined: String = parts.iter().copied().collect();
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        docs.push(trimmed.to_string());
    }
}

/// Splits on `separator`, attaching each separator to the start of the piece
/// that follows it. An empty separator splits into characters.
fn split_keep_separator<'a>(text: &'a str, separator: &str) -> Vec<&'a str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (idx, _) in text.match_indices(separator) {
        if idx > start {
            pieces.push(&text[start..idx]);
        }
        start = idx;
    }
    pieces.push(&text[start..]);
    pieces.retain(|p| !p.is_empty());
    pieces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_text_is_single_chunk() {
        let splitter = RecursiveTextSplitter::new(100, 20).unwrap();
        let chunks = splitter.split_text("Hello world.\n\nThis is a test.");

        assert_eq!(chunks, vec!["Hello world.\n\nThis is a test."]);
    }

    #[test]
    fn test_prefers_paragraph_boundaries() {
        let splitter = RecursiveTextSplitter::new(12, 0).unwrap();
        let chunks = splitter.split_text("aaaa bbbb\n\ncccc dddd");

        assert_eq!(chunks, vec!["aaaa bbbb", "cccc dddd"]);
    }

    #[test]
    fn test_long_text_respects_size_and_overlaps() {
        let text = (0..300)
            .map(|i| format!("w{i}"))
            .collect::<Vec<_>>()
            .join(" ");
        let splitter = RecursiveTextSplitter::new(50, 10).unwrap();
        let chunks = splitter.split_text(&text);

        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= 50));
        assert!(chunks[0].starts_with("w0 "));
        assert!(chunks.last().unwrap().ends_with("w299"));

        for pair in chunks.windows(2) {
            let last_word = pair[0].split_whitespace().last().unwrap();
            assert!(
                pair[1].split_whitespace().any(|w| w == last_word),
                "expected {last_word:?} to carry over into {:?}",
                pair[1]
            );
        }
    }

    #[test]
    fn test_hard_split_without_separators() {
        let splitter = RecursiveTextSplitter::new(10, 0).unwrap();
        let chunks = splitter.split_text(&"a".repeat(25));

        assert_eq!(chunks, vec!["a".repeat(10), "a".repeat(10), "a".repeat(5)]);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let splitter = RecursiveTextSplitter::new(10, 0).unwrap();
        let chunks = splitter.split_text(&"é".repeat(15));

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 10);
        assert_eq!(chunks[1].chars().count(), 5);
    }

    #[test]
    fn test_empty_and_blank_text() {
        let splitter = RecursiveTextSplitter::default();
        assert!(splitter.split_text("").is_empty());
        assert!(splitter.split_text("   \n\n  ").is_empty());
    }

    #[test]
    fn test_overlap_must_be_smaller_than_size() {
        assert!(RecursiveTextSplitter::new(100, 100).is_err());
        assert!(RecursiveTextSplitter::new(0, 0).is_err());
        assert!(RecursiveTextSplitter::new(100, 99).is_ok());
    }

    #[test]
    fn test_split_document_indexes_chunks() {
        let doc_id = Uuid::new_v4();
        let splitter = RecursiveTextSplitter::new(12, 0).unwrap();
        let chunks = splitter.split_document(doc_id, "aaaa bbbb\n\ncccc dddd");

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chunk_index, 0);
        assert_eq!(chunks[1].chunk_index, 1);
        assert_eq!(chunks[1].metadata.source, "chunk_1");
        assert!(chunks.iter().all(|c| c.document_id == doc_id));
    }
}
