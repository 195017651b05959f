use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::FetchError,
    model::{ForecastQuery, ForecastResult, LocationCandidate},
};

pub mod weatherapi;

pub use weatherapi::{WeatherApiGateway, parse_location_candidates};

/// Read-only access to a remote weather provider.
///
/// Implementations log failures and report them as [`FetchError`]; they never
/// retry and never panic on bad input from the network.
#[async_trait]
pub trait WeatherGateway: Send + Sync + Debug {
    /// Current conditions and a `query.days` day forecast for one city.
    async fn fetch_forecast(&self, query: &ForecastQuery) -> Result<ForecastResult, FetchError>;

    /// Places matching a free-text query.
    ///
    /// Always a list, even when the provider answers with a single object.
    async fn fetch_location_candidates(
        &self,
        query: &str,
    ) -> Result<Vec<LocationCandidate>, FetchError>;
}
