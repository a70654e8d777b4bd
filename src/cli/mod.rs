//! Command-line front-end for the item store.
mod app;
mod args;

pub use app::*;
pub use args::*;
