//! Embedding generation and approximate similarity search

mod generator;
mod index;
mod similarity;

pub use generator::*;
pub use index::*;
pub use similarity::*;
