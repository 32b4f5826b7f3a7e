//! Deterministic text-to-vector embedding.
//!
//! Two paths, in priority order: a pretrained word-vector table when one
//! is loaded, and a hashed bag-of-words fallback that needs nothing but
//! the text itself. Both are bit-deterministic for identical input, which
//! the index relies on for portability.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Target embedding dimension
pub const EMBEDDING_DIM: usize = 384;

/// Minimum token length kept by the embedding tokenizer
const MIN_TOKEN_LEN: usize = 2;

/// Accumulation weights for the three hash slots per token
const HASH_WEIGHTS: [f32; 3] = [1.0, 0.5, 0.25];

// FNV-1a constants; the three offset bases give independent hash functions
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;
const FNV_BASES: [u64; 3] = [
    0xcbf2_9ce4_8422_2325,
    0x9ae1_6a3b_2f90_404f,
    0x6c62_272e_07bb_0142,
];

/// A pretrained word-vector lookup table
#[derive(Debug, Clone, Default)]
pub struct WordVectorTable {
    dim: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl WordVectorTable {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            vectors: HashMap::new(),
        }
    }

    /// Insert a word vector; vectors of the wrong length are rejected
    pub fn insert(&mut self, word: impl Into<String>, vector: Vec<f32>) -> bool {
        if vector.len() != self.dim {
            return false;
        }
        self.vectors.insert(word.into(), vector);
        true
    }

    pub fn get(&self, word: &str) -> Option<&Vec<f32>> {
        self.vectors.get(word)
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

/// Deterministic embedding generator
#[derive(Debug, Clone, Default)]
pub struct EmbeddingGenerator {
    table: Option<WordVectorTable>,
}

impl EmbeddingGenerator {
    /// Hashed bag-of-words only; no external data needed
    pub fn new() -> Self {
        Self { table: None }
    }

    /// Prefer the given word-vector table, falling back to hashing when
    /// no token matches
    pub fn with_table(table: WordVectorTable) -> Self {
        Self { table: Some(table) }
    }

    /// Embed text into an L2-normalized vector of [`EMBEDDING_DIM`] floats.
    ///
    /// Empty or token-free text yields the zero vector, which downstream
    /// scoring treats as "no signal" rather than an error.
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return vec![0.0; EMBEDDING_DIM];
        }

        if let Some(ref table) = self.table {
            if let Some(vector) = embed_with_table(&tokens, table) {
                return vector;
            }
        }

        embed_hashed(&tokens)
    }
}

/// Lowercase, split on word boundaries, drop short tokens
fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= MIN_TOKEN_LEN)
        .map(|t| t.to_string())
        .collect()
}

/// Word-vector path: inverse-term-frequency weighted average, resampled
/// to the target dimension. Returns None when no token has a vector.
fn embed_with_table(tokens: &[String], table: &WordVectorTable) -> Option<Vec<f32>> {
    let mut term_freq: HashMap<&str, usize> = HashMap::new();
    for token in tokens {
        *term_freq.entry(token.as_str()).or_insert(0) += 1;
    }

    let mut accum = vec![0.0f32; table.dim()];
    let mut total_weight = 0.0f32;
    for (token, &tf) in &term_freq {
        let Some(vector) = table.get(token) else {
            continue;
        };
        // Discount locally repeated words
        let weight = 1.0 / ((tf as f32) + 1.0).ln();
        for (a, v) in accum.iter_mut().zip(vector.iter()) {
            *a += v * weight;
        }
        total_weight += weight;
    }

    if total_weight == 0.0 {
        return None;
    }
    for a in accum.iter_mut() {
        *a /= total_weight;
    }
    l2_normalize(&mut accum);

    let mut resampled = resample(&accum, EMBEDDING_DIM);
    l2_normalize(&mut resampled);
    Some(resampled)
}

/// Hashed bag-of-words fallback: each token lands in three distinct slots
fn embed_hashed(tokens: &[String]) -> Vec<f32> {
    let mut accum = vec![0.0f32; EMBEDDING_DIM];
    for token in tokens {
        let mut slots = [0usize; 3];
        for (i, &basis) in FNV_BASES.iter().enumerate() {
            let mut slot = (fnv1a(token.as_bytes(), basis) % EMBEDDING_DIM as u64) as usize;
            // Keep the three slots distinct per token
            while slots[..i].contains(&slot) {
                slot = (slot + 1) % EMBEDDING_DIM;
            }
            slots[i] = slot;
            accum[slot] += HASH_WEIGHTS[i];
        }
    }
    l2_normalize(&mut accum);
    accum
}

fn fnv1a(bytes: &[u8], basis: u64) -> u64 {
    let mut hash = basis;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Strided index selection to change dimensionality
fn resample(vector: &[f32], target: usize) -> Vec<f32> {
    if vector.len() == target {
        return vector.to_vec();
    }
    (0..target)
        .map(|i| vector[i * vector.len() / target])
        .collect()
}

fn l2_normalize(vector: &mut [f32]) {
    let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in vector.iter_mut() {
            *v /= norm;
        }
    }
}

/// Compute cosine similarity between two vectors
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Embedding storage format for persistence
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredEmbedding {
    pub document_id: String,
    pub vector: Vec<f32>,
    pub model: String,
    pub created_at: String,
}

impl StoredEmbedding {
    pub fn new(document_id: impl Into<String>, vector: Vec<f32>, model: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            vector,
            model: model.into(),
            created_at: Utc::now().to_rfc3339(),
        }
    }
}
