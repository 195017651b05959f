use std::{fmt, num::NonZeroU32};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Parameters of one forecast lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastQuery {
    pub city_name: String,
    pub days: NonZeroU32,
}

impl ForecastQuery {
    pub fn new(city_name: impl Into<String>, days: NonZeroU32) -> Self {
        Self { city_name: city_name.into(), days }
    }
}

/// A place returned by location search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationCandidate {
    pub name: String,
    pub country: String,
}

impl LocationCandidate {
    pub fn new(name: impl Into<String>, country: impl Into<String>) -> Self {
        Self { name: name.into(), country: country.into() }
    }
}

impl fmt::Display for LocationCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {}", self.name, self.country)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature_c: f64,
    pub wind_kph: f64,
    pub humidity_pct: u8,
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub avg_temp_c: f64,
    pub condition: String,
    pub sunrise: Option<String>,
}

impl ForecastDay {
    /// Weekday name in the fixed `en-US` locale, e.g. "Monday".
    pub fn day_name(&self) -> String {
        self.date.format("%A").to_string()
    }
}

/// Current conditions plus the per-day forecast, in provider order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResult {
    pub location: LocationCandidate,
    pub current: CurrentConditions,
    pub days: Vec<ForecastDay>,
}

impl ForecastResult {
    /// Sunrise time of the first forecast day.
    pub fn sunrise(&self) -> Option<&str> {
        self.days.first().and_then(|d| d.sunrise.as_deref())
    }
}
