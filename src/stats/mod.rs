pub mod aggregate;
pub mod analysis;
pub mod events;
pub mod percentile;
pub mod trend;
