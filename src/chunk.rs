//! Sliding-window text chunker with sentence-boundary cuts.
//!
//! Splits cleaned document text into overlapping windows of at most
//! `chunk_size` characters. Before cutting a window, the chunker looks for
//! the last `". "` inside it; when that sentence end sits past 60% of the
//! window, the cut moves there so chunks rarely end mid-sentence.
//! Consecutive windows share `overlap` characters of context.
//!
//! All positions are measured in `char`s, never bytes, so multi-byte text
//! (accented names, CJK) is never split inside a code point.
//!
//! # Example
//!
//! ```rust
//! use resume_rag::chunk::{chunk_text, ChunkParams};
//!
//! let params = ChunkParams::default();
//! let chunks = chunk_text("Ana has 5 years of experience.", &params);
//! assert_eq!(chunks, vec!["Ana has 5 years of experience.".to_string()]);
//! ```

use std::path::Path;

use crate::error::{RagError, Result};
use crate::models::{Chunk, Document};

/// Fraction of the window a sentence cut must lie beyond.
const SENTENCE_CUT_MIN_RATIO: f64 = 0.6;

/// Validated chunking parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkParams {
    size: usize,
    overlap: usize,
}

impl ChunkParams {
    /// Rejects `size == 0` and `overlap >= size`, either of which would
    /// stop the window from advancing.
    pub fn new(size: usize, overlap: usize) -> Result<Self> {
        if size == 0 {
            return Err(RagError::InvalidArgument(
                "chunk size must be > 0".to_string(),
            ));
        }
        if overlap >= size {
            return Err(RagError::InvalidArgument(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                overlap, size
            )));
        }
        Ok(Self { size, overlap })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }
}

impl Default for ChunkParams {
    fn default() -> Self {
        Self {
            size: 1000,
            overlap: 150,
        }
    }
}

/// Normalize whitespace: drop `\r`, squeeze spaces and tabs, cap blank
/// lines at one, trim the ends. Idempotent.
pub fn clean_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;
    let mut newline_run = 0usize;

    for c in text.chars() {
        match c {
            '\r' => {}
            ' ' | '\t' => pending_space = true,
            '\n' => {
                if pending_space {
                    out.push(' ');
                    pending_space = false;
                    newline_run = 0;
                }
                newline_run += 1;
                if newline_run <= 2 {
                    out.push('\n');
                }
            }
            other => {
                if pending_space {
                    out.push(' ');
                    pending_space = false;
                }
                newline_run = 0;
                out.push(other);
            }
        }
    }

    out.trim().to_string()
}

/// Split `text` into overlapping chunks.
///
/// The text is cleaned first. Text no longer than the window comes back as
/// a single chunk; empty text yields no chunks.
pub fn chunk_text(text: &str, params: &ChunkParams) -> Vec<String> {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        return Vec::new();
    }

    let chars: Vec<char> = cleaned.chars().collect();
    let len = chars.len();
    if len <= params.size {
        return vec![cleaned];
    }

    let min_cut = params.size as f64 * SENTENCE_CUT_MIN_RATIO;
    let mut chunks = Vec::new();
    let mut start = 0usize;

    while start < len {
        let mut end = start + params.size;
        let window = &chars[start..end.min(len)];

        if let Some(dot) = last_sentence_end(window) {
            if dot as f64 > min_cut {
                end = start + dot + 1;
            }
        }

        let piece: String = chars[start..end.min(len)].iter().collect();
        let piece = piece.trim();
        if !piece.is_empty() {
            chunks.push(piece.to_string());
        }

        let next = end.saturating_sub(params.overlap);
        // A sentence cut can land closer to `start` than the overlap.
        start = if next > start { next } else { end };
    }

    chunks
}

/// Offset of the `.` in the last `". "` of `window`.
fn last_sentence_end(window: &[char]) -> Option<usize> {
    window
        .windows(2)
        .rposition(|pair| pair[0] == '.' && pair[1] == ' ')
}

/// Chunk one document, tagging each piece with its source and sequence id.
pub fn chunk_document(doc: &Document, params: &ChunkParams) -> Vec<Chunk> {
    chunk_source(&doc.path, &doc.text, params)
}

fn chunk_source(source: &Path, text: &str, params: &ChunkParams) -> Vec<Chunk> {
    chunk_text(text, params)
        .into_iter()
        .enumerate()
        .map(|(chunk_id, text)| Chunk {
            source: source.to_path_buf(),
            chunk_id,
            text,
        })
        .collect()
}
