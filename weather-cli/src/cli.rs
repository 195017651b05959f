use std::num::NonZeroU32;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Text};
use weather_lookup_core::{Config, ForecastQuery, WeatherApiGateway, WeatherGateway};

use crate::{browse, render};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "weather", version, about = "Look up current weather and forecasts by city")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the WeatherAPI.com key and the default city.
    Configure,

    /// Show current conditions and the daily forecast for a city.
    Show {
        /// City name; defaults to the configured city.
        city: Option<String>,

        /// Number of forecast days.
        #[arg(long, short)]
        days: Option<NonZeroU32>,
    },

    /// List locations matching a search query.
    Search {
        query: String,
    },

    /// Interactive session: search cities and switch the displayed forecast.
    Browse,
}

impl Cli {
    pub async fn run(self, mut config: Config) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(&mut config).await,
            Command::Show { city, days } => {
                let gateway = WeatherApiGateway::from_config(&config)?;
                let city = city.unwrap_or_else(|| config.default_city.clone());
                let days = match days {
                    Some(days) => days,
                    None => config.forecast_days()?,
                };

                let forecast = gateway
                    .fetch_forecast(&ForecastQuery::new(city.as_str(), days))
                    .await
                    .map_err(|err| anyhow!(err.user_message()))
                    .with_context(|| format!("Could not load the forecast for '{city}'"))?;

                print!("{}", render::forecast(&forecast.location, &forecast));
                Ok(())
            }
            Command::Search { query } => {
                let gateway = WeatherApiGateway::from_config(&config)?;
                let candidates = gateway
                    .fetch_location_candidates(&query)
                    .await
                    .map_err(|err| anyhow!(err.user_message()))
                    .with_context(|| format!("Location search for '{query}' failed"))?;

                print!("{}", render::candidates(&candidates));
                Ok(())
            }
            Command::Browse => browse::run(&config).await,
        }
    }
}

async fn configure(config: &mut Config) -> anyhow::Result<()> {
    let current_city = config.default_city.clone();
    let current_country = config.default_country.clone();

    let (api_key, city, country) = tokio::task::spawn_blocking(move || {
        let api_key = Password::new("WeatherAPI.com key:")
            .without_confirmation()
            .with_display_mode(PasswordDisplayMode::Masked)
            .prompt()?;
        let city = Text::new("Default city:").with_default(&current_city).prompt()?;
        let country = Text::new("Default country:").with_default(&current_country).prompt()?;
        Ok::<_, inquire::InquireError>((api_key, city, country))
    })
    .await
    .context("Configuration prompt panicked")??;

    config.set_api_key(api_key);
    config.set_default_location(city, country);
    config.save()?;

    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}
