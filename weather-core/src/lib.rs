//! Core library for the `weather` lookup CLI.
//!
//! This crate defines:
//! - Configuration & credentials handling
//! - The gateway to the remote weather provider (forecast and location search)
//! - A debounced, event-driven coordinator that owns UI-facing state
//! - Shared domain models
//!
//! It is used by `weather-lookup-cli`, but any front end that can turn user
//! input into [`Event`]s and render a [`CoordinatorState`] can drive it.

pub mod config;
pub mod coordinator;
pub mod debounce;
pub mod error;
pub mod gateway;
pub mod model;

pub use config::Config;
pub use coordinator::{Coordinator, CoordinatorSettings, CoordinatorState, Event, Step};
pub use debounce::Debouncer;
pub use error::FetchError;
pub use gateway::{WeatherApiGateway, WeatherGateway};
pub use model::{CurrentConditions, ForecastDay, ForecastQuery, ForecastResult, LocationCandidate};
