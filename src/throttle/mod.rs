pub mod error;
pub mod feed_limiter;
pub mod request_throttle;
