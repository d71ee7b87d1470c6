//! Storage layer for aeroforge - JSONL persistence of mission records.
//!
//! Each collection lives in `<storage dir>/<collection>.jsonl`. Records are
//! plain serde types keyed by an `id` field.

mod jsonl;
mod traits;

pub use jsonl::JsonlStorage;
pub use traits::{HasId, Storage};

/// Collection holding one record per mission
pub const MISSIONS: &str = "missions";
