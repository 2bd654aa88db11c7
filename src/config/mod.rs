// src/config/mod.rs
pub mod ai;
pub mod briefing;

pub use ai::AiConfig;
pub use briefing::{BriefingConfig, Instrument};
