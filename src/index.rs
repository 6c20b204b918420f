//! Exact inner-product vector index.
//!
//! Vectors are stored row-major in one contiguous buffer; position `i` is
//! the `i`-th vector added. Search is a brute-force scan, which is exact
//! and fast enough for a few thousand resume chunks.
//!
//! # On-disk format
//!
//! Little-endian throughout:
//!
//! ```text
//! magic   "RRIX"      4 bytes
//! version u32         currently 1
//! dim     u32
//! count   u64
//! data    count * dim * f32
//! ```
//!
//! The file size must match the header exactly; anything else is rejected
//! as invalid rather than partially read.

use std::cmp::Ordering;
use std::path::Path;

use crate::embedding::{blob_to_vec, dot, vec_to_blob};
use crate::error::{RagError, Result};

const MAGIC: &[u8; 4] = b"RRIX";
const VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

/// Position reported for empty result slots.
pub const SENTINEL: i64 = -1;

#[derive(Debug, Clone, PartialEq)]
pub struct FlatIndex {
    dim: usize,
    data: Vec<f32>,
}

/// Top-`k` scores and positions for each query row.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub scores: Vec<Vec<f32>>,
    pub positions: Vec<Vec<i64>>,
}

impl FlatIndex {
    pub fn new(dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(RagError::InvalidArgument(
                "index dimension must be > 0".to_string(),
            ));
        }
        Ok(Self {
            dim,
            data: Vec::new(),
        })
    }

    /// Build an index over `vectors`; their order fixes the positions.
    pub fn build(dim: usize, vectors: &[Vec<f32>]) -> Result<Self> {
        let mut index = Self::new(dim)?;
        index.add(vectors)?;
        Ok(index)
    }

    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dim) {
            return Err(RagError::InvalidArgument(format!(
                "vector has dimension {}, index expects {}",
                bad.len(),
                self.dim
            )));
        }
        self.data.reserve(vectors.len() * self.dim);
        for v in vectors {
            self.data.extend_from_slice(v);
        }
        Ok(())
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Vector stored at `position`.
    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        let start = position.checked_mul(self.dim)?;
        self.data.get(start..start + self.dim)
    }

    /// Top-`k` neighbors by descending inner product for each query row.
    ///
    /// Ties go to the lower position. When the index holds fewer than `k`
    /// vectors, the remaining slots carry [`SENTINEL`] and `-inf`.
    pub fn search(&self, queries: &[Vec<f32>], k: usize) -> Result<SearchResult> {
        let mut scores = Vec::with_capacity(queries.len());
        let mut positions = Vec::with_capacity(queries.len());

        for query in queries {
            if query.len() != self.dim {
                return Err(RagError::InvalidArgument(format!(
                    "query has dimension {}, index expects {}",
                    query.len(),
                    self.dim
                )));
            }

            let mut ranked: Vec<(usize, f32)> = self
                .data
                .chunks_exact(self.dim)
                .map(|row| dot(query, row))
                .enumerate()
                .collect();
            ranked.sort_by(|a, b| {
                b.1.partial_cmp(&a.1)
                    .unwrap_or(Ordering::Equal)
                    .then(a.0.cmp(&b.0))
            });
            ranked.truncate(k);

            let mut row_scores: Vec<f32> = ranked.iter().map(|(_, s)| *s).collect();
            let mut row_positions: Vec<i64> = ranked.iter().map(|(p, _)| *p as i64).collect();
            row_scores.resize(k, f32::NEG_INFINITY);
            row_positions.resize(k, SENTINEL);

            scores.push(row_scores);
            positions.push(row_positions);
        }

        Ok(SearchResult { scores, positions })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.data.len() * 4);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&VERSION.to_le_bytes());
        bytes.extend_from_slice(&(self.dim as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.len() as u64).to_le_bytes());
        bytes.extend_from_slice(&vec_to_blob(&self.data));
        bytes
    }

    /// Parse the binary format; the error string says what is wrong.
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, String> {
        if bytes.len() < HEADER_LEN {
            return Err(format!("file too short ({} bytes)", bytes.len()));
        }
        if &bytes[0..4] != MAGIC {
            return Err("bad magic".to_string());
        }
        let version = read_u32(&bytes[4..8]);
        if version != VERSION {
            return Err(format!("unsupported version {}", version));
        }
        let dim = read_u32(&bytes[8..12]) as usize;
        if dim == 0 {
            return Err("dimension is zero".to_string());
        }
        let count = read_u64(&bytes[12..20]);

        let expected = usize::try_from(count)
            .ok()
            .and_then(|c| c.checked_mul(dim))
            .and_then(|n| n.checked_mul(4))
            .ok_or_else(|| "header overflows".to_string())?;
        let payload = &bytes[HEADER_LEN..];
        if payload.len() != expected {
            return Err(format!(
                "expected {} data bytes for {} vectors of dim {}, found {}",
                expected,
                count,
                dim,
                payload.len()
            ));
        }

        Ok(Self {
            dim,
            data: blob_to_vec(payload),
        })
    }

    /// Write the index to `path`, creating parent directories.
    pub fn persist(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_bytes())?;
        Ok(())
    }

    /// Read an index written by [`persist`](Self::persist).
    ///
    /// I/O failures come back as `Io`; malformed content as the `String`
    /// half so callers can attach the scope and remediation hint.
    pub fn load(path: &Path) -> Result<std::result::Result<Self, String>> {
        let bytes = std::fs::read(path)?;
        Ok(Self::from_bytes(&bytes))
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}
