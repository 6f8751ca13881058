use crate::acquisition::error::FetchError;
use crate::types::field::Field;
use crate::types::location::LatLon;
use crate::types::observation::ObservationSeries;
use crate::types::period::DateRange;
use async_trait::async_trait;

/// Daily observations wanted for one location.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub location: LatLon,
    pub range: DateRange,
    pub fields: Vec<Field>,
}

impl FetchRequest {
    /// A request for every field.
    pub fn comprehensive(location: LatLon, range: DateRange) -> Self {
        Self {
            location,
            range,
            fields: Field::ALL.to_vec(),
        }
    }
}

/// A source of daily observations.
#[async_trait]
pub trait ObservationFetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<ObservationSeries, FetchError>;
}
