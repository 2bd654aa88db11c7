// src/analyze/mod.rs
//! Text-generation client and the entity extractor built on it.

pub mod ai_adapter;
pub mod extractor;

pub use ai_adapter::{build_generator, DynTextGenerator, MockGenerator, TextGenerator};
pub use extractor::EntityExtractor;
