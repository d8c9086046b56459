//! Local persistence

mod lookup_cache;

pub use lookup_cache::{CachedAbi, LookupCache};
