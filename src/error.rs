use crate::acquisition::error::{AcquisitionError, FetchError};
use crate::cache::error::StoreError;
use crate::throttle::error::ThrottleError;
use crate::types::frame::FrameError;
use crate::types::observation::SeriesError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClimateError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Throttle(#[from] ThrottleError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Series(#[from] SeriesError),

    #[error(transparent)]
    Frame(#[from] FrameError),
}
