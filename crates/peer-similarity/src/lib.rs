//! Peer Similarity Module
//!
//! Cosine similarity between instruments' average (standardised) feature profiles,
//! and ranked "similar stocks" lookups over the resulting matrix.

pub mod builder;
pub mod error;
pub mod matrix;


pub use builder::{build_similarity, symbol_profile};
pub use error::{SimilarityError, SimilarityResult};
pub use matrix::{SimilarityMatrix, DEFAULT_TOP_N};
