//! In-process store for development and tests

mod entry;
mod pattern;
mod store;

pub use pattern::glob_to_regex;
pub use store::MemoryStore;
