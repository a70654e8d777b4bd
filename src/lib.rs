//! Personal content vault library
//!
//! This library persists notes and links to a single JSON snapshot, merges
//! repeated saves of the same link, and serves text, tag and date-range
//! queries over the saved items.

mod cli;
mod config;
mod errors;
mod helper;
mod item;
mod storage;
mod types;

// Re-export key components
pub use cli::*;
pub use config::*;
pub use errors::*;
pub use helper::*;
pub use item::*;
pub use storage::*;
pub use types::*;
