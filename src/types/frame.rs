//! Conversion between [`ObservationSeries`] and polars daily frames.
//!
//! The column names follow the Meteostat daily schema (`date`, `prcp`, `tavg`,
//! `tmin`, `tmax`, `wspd`, `wpgt`, `wdir`, `tsun`) plus `srad` for radiation, so a
//! frame collected from a Meteostat daily `LazyFrame` can be analysed directly.
//! `tsun` is in minutes, as in Meteostat; observations keep sunshine in seconds.

use crate::types::field::Field;
use crate::types::observation::{Observation, ObservationSeries, SeriesError};
use chrono::{NaiveDate, TimeDelta};
use polars::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Required column '{0}' not found in DataFrame")]
    ColumnNotFound(String, #[source] PolarsError),

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),

    #[error("Row {row} has no date")]
    MissingDate { row: usize },

    #[error(transparent)]
    Series(#[from] SeriesError),
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

fn field_to_column(field: Field, value: f64) -> f64 {
    match field {
        Field::Sunshine => value / 60.0,
        _ => value,
    }
}

fn column_to_field(field: Field, value: f64) -> f64 {
    match field {
        Field::Sunshine => value * 60.0,
        _ => value,
    }
}

fn get_opt_floats(df: &DataFrame, name: &str) -> Result<Option<Vec<Option<f64>>>, FrameError> {
    let Ok(column) = df.column(name) else {
        return Ok(None);
    };
    let cast = column.cast(&DataType::Float64)?;
    let values = cast.f64()?.into_iter().collect();
    Ok(Some(values))
}

impl ObservationSeries {
    /// Builds a daily frame with one row per observation.
    pub fn to_frame(&self) -> Result<DataFrame, FrameError> {
        let dates: Vec<NaiveDate> = self.iter().map(|o| o.date).collect();
        let mut columns = vec![Column::new("date".into(), dates)];
        for field in Field::ALL {
            let values: Vec<Option<f64>> = self
                .iter()
                .map(|o| field.value(o).map(|v| field_to_column(field, v)))
                .collect();
            columns.push(Column::new(field.column_name().into(), values));
        }
        Ok(DataFrame::new(columns)?)
    }

    /// Reads a daily frame into a series. Only the `date` column is required;
    /// any other known column that is absent leaves its field empty. Rows are
    /// sorted by date before the series invariant is checked.
    pub fn from_frame(df: &DataFrame) -> Result<ObservationSeries, FrameError> {
        let date_column = df
            .column("date")
            .map_err(|e| FrameError::ColumnNotFound("date".to_string(), e))?
            .cast(&DataType::Date)?;
        let date_series = date_column.date()?;

        let mut observations = Vec::with_capacity(df.height());
        for row in 0..df.height() {
            let days = date_series
                .get(row)
                .ok_or(FrameError::MissingDate { row })?;
            observations.push(Observation::empty(
                epoch() + TimeDelta::days(days as i64),
            ));
        }

        for field in Field::ALL {
            let Some(values) = get_opt_floats(df, field.column_name())? else {
                continue;
            };
            for (observation, value) in observations.iter_mut().zip(values) {
                *field.slot(observation) = value.map(|v| column_to_field(field, v));
            }
        }

        Ok(ObservationSeries::from_unsorted(observations)?)
    }
}
