use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::{
    config::Config,
    error::FetchError,
    model::{CurrentConditions, ForecastDay, ForecastQuery, ForecastResult, LocationCandidate},
};

use super::WeatherGateway;

pub const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com/v1";

/// [`WeatherGateway`] backed by WeatherAPI.com.
#[derive(Debug, Clone)]
pub struct WeatherApiGateway {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherApiGateway {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: String, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { api_key, base_url, http: Client::new() }
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config.api_key()?;
        Ok(Self::with_base_url(api_key.to_owned(), config.base_url.as_str()))
    }

    async fn get_body(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String, FetchError> {
        let url = format!("{}/{endpoint}", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[("key", self.api_key.as_str())])
            .query(params)
            .send()
            .await
            // The URL carries the API key; keep it out of messages and logs.
            .map_err(|e| FetchError::network(e.without_url()))?;

        let status = res.status();
        let body = res.text().await.map_err(|e| FetchError::decode(e.without_url()))?;

        if !status.is_success() {
            return Err(FetchError::status(status.as_u16(), &body));
        }

        debug!(endpoint, bytes = body.len(), "weatherapi response received");
        Ok(body)
    }
}

#[async_trait]
impl WeatherGateway for WeatherApiGateway {
    #[instrument(skip(self, query), fields(city = %query.city_name, days = query.days.get()))]
    async fn fetch_forecast(&self, query: &ForecastQuery) -> Result<ForecastResult, FetchError> {
        let days = query.days.to_string();

        self.get_body("forecast.json", &[("q", query.city_name.as_str()), ("days", days.as_str())])
            .await
            .and_then(|body| parse_forecast(&body))
            .inspect_err(|err| warn!(error = %err, "forecast request failed"))
    }

    #[instrument(skip(self))]
    async fn fetch_location_candidates(
        &self,
        query: &str,
    ) -> Result<Vec<LocationCandidate>, FetchError> {
        self.get_body("search.json", &[("q", query)])
            .await
            .and_then(|body| parse_location_candidates(&body))
            .inspect_err(|err| warn!(error = %err, "location search failed"))
    }
}

/// Parse a `search.json` body into a list of candidates.
///
/// The endpoint answers with either a single location object or an array of
/// them. Both shapes are accepted; a single object becomes a one-element list.
pub fn parse_location_candidates(body: &str) -> Result<Vec<LocationCandidate>, FetchError> {
    let parsed: WaSearchResponse = serde_json::from_str(body).map_err(FetchError::decode)?;

    let locations = match parsed {
        WaSearchResponse::Many(list) => list,
        WaSearchResponse::One(location) => vec![location],
    };

    Ok(locations.into_iter().map(Into::into).collect())
}

fn parse_forecast(body: &str) -> Result<ForecastResult, FetchError> {
    let parsed: WaForecastResponse = serde_json::from_str(body).map_err(FetchError::decode)?;

    let days = parsed
        .forecast
        .forecastday
        .into_iter()
        .map(|d| ForecastDay {
            date: d.date,
            avg_temp_c: d.day.avgtemp_c,
            condition: d.day.condition.text,
            sunrise: d.astro.and_then(|a| a.sunrise),
        })
        .collect();

    Ok(ForecastResult {
        location: parsed.location.into(),
        current: CurrentConditions {
            temperature_c: parsed.current.temp_c,
            wind_kph: parsed.current.wind_kph,
            humidity_pct: parsed.current.humidity,
            condition: parsed.current.condition.text,
        },
        days,
    })
}

#[derive(Debug, Deserialize)]
struct WaLocation {
    name: String,
    country: String,
}

impl From<WaLocation> for LocationCandidate {
    fn from(location: WaLocation) -> Self {
        LocationCandidate { name: location.name, country: location.country }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WaSearchResponse {
    Many(Vec<WaLocation>),
    One(WaLocation),
}

#[derive(Debug, Deserialize)]
struct WaCondition {
    text: String,
}

#[derive(Debug, Deserialize)]
struct WaCurrent {
    temp_c: f64,
    wind_kph: f64,
    humidity: u8,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaDay {
    avgtemp_c: f64,
    condition: WaCondition,
}

#[derive(Debug, Deserialize)]
struct WaAstro {
    sunrise: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WaForecastDay {
    date: NaiveDate,
    day: WaDay,
    #[serde(default)]
    astro: Option<WaAstro>,
}

#[derive(Debug, Deserialize)]
struct WaForecast {
    forecastday: Vec<WaForecastDay>,
}

#[derive(Debug, Deserialize)]
struct WaForecastResponse {
    location: WaLocation,
    current: WaCurrent,
    forecast: WaForecast,
}

#[cfg(test)]
mod tests {
    use super::*;

    const FORECAST_BODY: &str = r#"{
        "location": { "name": "Prague", "region": "Prague", "country": "Czech Republic" },
        "current": {
            "temp_c": 4.0, "wind_kph": 11.2, "humidity": 87,
            "condition": { "text": "Partly cloudy", "code": 1003 }
        },
        "forecast": { "forecastday": [
            {
                "date": "2024-01-01",
                "day": { "avgtemp_c": 3.1, "condition": { "text": "Light rain" } },
                "astro": { "sunrise": "08:01 AM", "sunset": "04:10 PM" }
            },
            {
                "date": "2024-01-02",
                "day": { "avgtemp_c": 1.4, "condition": { "text": "Overcast" } }
            }
        ] }
    }"#;

    #[test]
    fn forecast_current_mirrors_body() {
        let result = parse_forecast(FORECAST_BODY).expect("valid body");

        assert_eq!(result.location, LocationCandidate::new("Prague", "Czech Republic"));
        assert_eq!(
            result.current,
            CurrentConditions {
                temperature_c: 4.0,
                wind_kph: 11.2,
                humidity_pct: 87,
                condition: "Partly cloudy".into(),
            }
        );
    }

    #[test]
    fn forecast_days_keep_order_and_sunrise() {
        let result = parse_forecast(FORECAST_BODY).expect("valid body");

        assert_eq!(result.days.len(), 2);
        assert_eq!(result.days[0].day_name(), "Monday");
        assert_eq!(result.days[0].condition, "Light rain");
        assert_eq!(result.sunrise(), Some("08:01 AM"));
        assert_eq!(result.days[1].avg_temp_c, 1.4);
        assert_eq!(result.days[1].sunrise, None);
    }

    #[test]
    fn malformed_forecast_is_decode_error() {
        let err = parse_forecast(r#"{"current": {}}"#).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn single_location_object_becomes_one_element_list() {
        let body = r#"{ "id": 1, "name": "Prague", "country": "Czech Republic", "lat": 50.08 }"#;
        let candidates = parse_location_candidates(body).expect("valid body");
        assert_eq!(candidates, vec![LocationCandidate::new("Prague", "Czech Republic")]);
    }

    #[test]
    fn location_array_keeps_order() {
        let body = r#"[
            { "name": "Paris", "country": "France" },
            { "name": "Paris", "country": "United States of America" }
        ]"#;
        let candidates = parse_location_candidates(body).expect("valid body");
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[1].country, "United States of America");

        assert!(parse_location_candidates("[]").expect("empty array").is_empty());
    }

    #[test]
    fn location_without_country_is_rejected() {
        let err = parse_location_candidates(r#"{ "name": "Nowhere" }"#).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let gateway = WeatherApiGateway::with_base_url("KEY".into(), "http://localhost:1/v1/");
        assert_eq!(gateway.base_url, "http://localhost:1/v1");
    }
}
