pub mod error;
pub mod store;
pub mod temporal_cache;
