//! Observation fields and the domains they are grouped into for fetching.

use crate::types::observation::Observation;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single measured quantity of a daily [`Observation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    /// Precipitation sum, mm.
    Rainfall,
    /// Mean air temperature, °C.
    TemperatureMean,
    /// Minimum air temperature, °C.
    TemperatureMin,
    /// Maximum air temperature, °C.
    TemperatureMax,
    /// Daily maximum sustained wind speed, km/h.
    WindSpeed,
    /// Daily peak gust, km/h.
    WindGusts,
    /// Dominant wind direction, degrees 0-359.
    WindDirection,
    /// Shortwave radiation sum, MJ/m².
    SolarRadiation,
    /// Sunshine duration, seconds.
    Sunshine,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::Rainfall,
        Field::TemperatureMean,
        Field::TemperatureMin,
        Field::TemperatureMax,
        Field::WindSpeed,
        Field::WindGusts,
        Field::WindDirection,
        Field::SolarRadiation,
        Field::Sunshine,
    ];

    pub fn value(self, observation: &Observation) -> Option<f64> {
        match self {
            Field::Rainfall => observation.rainfall,
            Field::TemperatureMean => observation.temperature_mean,
            Field::TemperatureMin => observation.temperature_min,
            Field::TemperatureMax => observation.temperature_max,
            Field::WindSpeed => observation.wind_speed,
            Field::WindGusts => observation.wind_gusts,
            Field::WindDirection => observation.wind_direction,
            Field::SolarRadiation => observation.solar_radiation_sum,
            Field::Sunshine => observation.sunshine_duration,
        }
    }

    pub(crate) fn slot(self, observation: &mut Observation) -> &mut Option<f64> {
        match self {
            Field::Rainfall => &mut observation.rainfall,
            Field::TemperatureMean => &mut observation.temperature_mean,
            Field::TemperatureMin => &mut observation.temperature_min,
            Field::TemperatureMax => &mut observation.temperature_max,
            Field::WindSpeed => &mut observation.wind_speed,
            Field::WindGusts => &mut observation.wind_gusts,
            Field::WindDirection => &mut observation.wind_direction,
            Field::SolarRadiation => &mut observation.solar_radiation_sum,
            Field::Sunshine => &mut observation.sunshine_duration,
        }
    }

    /// Whether negative values are physically meaningless for this field.
    pub(crate) fn non_negative(self) -> bool {
        !matches!(
            self,
            Field::TemperatureMean | Field::TemperatureMin | Field::TemperatureMax
        )
    }

    /// Name of the daily variable in the Open-Meteo archive API.
    pub(crate) fn open_meteo_name(self) -> &'static str {
        match self {
            Field::Rainfall => "precipitation_sum",
            Field::TemperatureMean => "temperature_2m_mean",
            Field::TemperatureMin => "temperature_2m_min",
            Field::TemperatureMax => "temperature_2m_max",
            Field::WindSpeed => "wind_speed_10m_max",
            Field::WindGusts => "wind_gusts_10m_max",
            Field::WindDirection => "wind_direction_10m_dominant",
            Field::SolarRadiation => "shortwave_radiation_sum",
            Field::Sunshine => "sunshine_duration",
        }
    }

    /// Column name in a daily polars frame. Matches the Meteostat daily schema where one exists.
    pub(crate) fn column_name(self) -> &'static str {
        match self {
            Field::Rainfall => "prcp",
            Field::TemperatureMean => "tavg",
            Field::TemperatureMin => "tmin",
            Field::TemperatureMax => "tmax",
            Field::WindSpeed => "wspd",
            Field::WindGusts => "wpgt",
            Field::WindDirection => "wdir",
            Field::SolarRadiation => "srad",
            Field::Sunshine => "tsun",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.open_meteo_name())
    }
}

/// A group of fields that is meaningful on its own, used to narrow a fetch
/// when the comprehensive request is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    Rainfall,
    Temperature,
    Wind,
    Solar,
}

impl Domain {
    pub const ALL: [Domain; 4] = [
        Domain::Rainfall,
        Domain::Temperature,
        Domain::Wind,
        Domain::Solar,
    ];

    pub fn fields(self) -> &'static [Field] {
        match self {
            Domain::Rainfall => &[Field::Rainfall],
            Domain::Temperature => &[
                Field::TemperatureMean,
                Field::TemperatureMin,
                Field::TemperatureMax,
            ],
            Domain::Wind => &[Field::WindSpeed, Field::WindGusts, Field::WindDirection],
            Domain::Solar => &[Field::SolarRadiation, Field::Sunshine],
        }
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Domain::Rainfall => "rainfall",
            Domain::Temperature => "temperature",
            Domain::Wind => "wind",
            Domain::Solar => "solar",
        };
        f.write_str(name)
    }
}
