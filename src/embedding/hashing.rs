//! Feature-hashing embedder.
//!
//! Maps lowercase word tokens and character trigrams into a fixed number
//! of signed buckets with FNV-1a. No model, no network: identical text
//! always yields the identical vector, and texts sharing words land close
//! together. Good enough for offline indexes and tests, not for semantic
//! search in production.

use async_trait::async_trait;

use super::Embedder;
use crate::error::Result;

pub(crate) const DEFAULT_DIMS: usize = 256;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

pub struct HashEmbedder {
    dims: usize,
    model: String,
}

impl HashEmbedder {
    pub fn new(dims: usize) -> Self {
        let dims = dims.max(1);
        Self {
            dims,
            model: format!("hash-{}", dims),
        }
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        let lower = text.to_lowercase();

        for word in lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
        {
            self.add_feature(&mut v, word.as_bytes(), 1.0);

            let chars: Vec<char> = word.chars().collect();
            for tri in chars.windows(3) {
                let gram: String = tri.iter().collect();
                self.add_feature(&mut v, gram.as_bytes(), 0.5);
            }
        }

        // Empty or punctuation-only text still gets a usable direction.
        if v.iter().all(|x| *x == 0.0) {
            v[0] = 1.0;
        }
        v
    }

    fn add_feature(&self, v: &mut [f32], bytes: &[u8], weight: f32) {
        let h = fnv1a(bytes);
        let bucket = (h % self.dims as u64) as usize;
        let sign = if (h >> 63) & 1 == 0 { 1.0 } else { -1.0 };
        v[bucket] += sign * weight;
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}
