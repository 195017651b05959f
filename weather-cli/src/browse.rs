//! Interactive session driving the core [`Coordinator`].
//!
//! The coordinator runs on its own task. [`Session`] turns answers into
//! [`Event`]s and waits on the published state; [`run`] adds the prompts.

use std::{fmt, sync::Arc};

use anyhow::Context;
use inquire::{Select, Text, error::InquireResult};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};
use tracing::debug;
use weather_lookup_core::{
    Config, Coordinator, CoordinatorSettings, CoordinatorState, Event, LocationCandidate,
    WeatherApiGateway, WeatherGateway,
};

use crate::render;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    Search,
    Retry,
    Quit,
}

impl fmt::Display for MenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MenuAction::Search => "Search for a city",
            MenuAction::Retry => "Reload forecast",
            MenuAction::Quit => "Quit",
        })
    }
}

pub async fn run(config: &Config) -> anyhow::Result<()> {
    let gateway: Arc<dyn WeatherGateway> = Arc::new(WeatherApiGateway::from_config(config)?);
    let mut session = Session::start(gateway, config.coordinator_settings()?);

    println!("Loading forecast...");
    let mut seen = session.loaded().await?;

    loop {
        print!("\n{}", render::state(&seen));

        let action = prompt(|| {
            Select::new("What next?", vec![MenuAction::Search, MenuAction::Retry, MenuAction::Quit])
                .prompt()
        })
        .await?;

        match action {
            MenuAction::Search => {
                let query = prompt(|| Text::new("Search city:").prompt()).await?;
                let candidates = session.search(query).await?;
                if candidates.is_empty() {
                    print!("{}", render::candidates(&candidates));
                    continue;
                }

                let picked =
                    prompt(move || Select::new("Pick a location:", candidates).prompt_skippable())
                        .await?;
                match picked {
                    Some(candidate) => {
                        println!("Loading forecast...");
                        seen = session.select(candidate).await?;
                    }
                    None => session.dismiss_search().await?,
                }
            }
            MenuAction::Retry => seen = session.retry().await?,
            MenuAction::Quit => break,
        }
    }

    session.finish().await
}

/// Event sender and state receiver for one running coordinator.
///
/// The session is the only sender, so it tracks whether the search panel is
/// open itself instead of reading a possibly stale snapshot.
#[derive(Debug)]
pub struct Session {
    events: mpsc::Sender<Event>,
    state: watch::Receiver<CoordinatorState>,
    task: JoinHandle<()>,
    panel_open: bool,
}

impl Session {
    pub fn start(gateway: Arc<dyn WeatherGateway>, settings: CoordinatorSettings) -> Self {
        let coordinator = Coordinator::new(gateway, settings);
        let (events, events_rx) = mpsc::channel(16);
        let (state_tx, state) = watch::channel(coordinator.state().clone());
        let task = tokio::spawn(coordinator.run(events_rx, state_tx));
        Self { events, state, task, panel_open: false }
    }

    /// State once the startup fetch has settled.
    pub async fn loaded(&mut self) -> anyhow::Result<CoordinatorState> {
        self.wait_for(|s| s.forecast_revision > 0 && !s.is_loading).await
    }

    /// Send `query` through the search box and return the settled candidates.
    ///
    /// An empty result closes the panel again.
    pub async fn search(&mut self, query: String) -> anyhow::Result<Vec<LocationCandidate>> {
        if !self.panel_open {
            self.send(Event::SearchToggled).await?;
            self.panel_open = true;
        }

        let revision = self.state.borrow().search_revision;
        self.send(Event::TextChanged(query)).await?;
        let found = self.wait_for(|s| s.search_revision > revision && !s.is_searching).await?;

        if found.candidates.is_empty() {
            self.dismiss_search().await?;
        }
        Ok(found.candidates)
    }

    pub async fn dismiss_search(&mut self) -> anyhow::Result<()> {
        if self.panel_open {
            self.send(Event::SearchToggled).await?;
            self.panel_open = false;
        }
        Ok(())
    }

    pub async fn select(&mut self, candidate: LocationCandidate) -> anyhow::Result<CoordinatorState> {
        let revision = self.state.borrow().forecast_revision;
        self.send(Event::CandidateSelected(candidate)).await?;
        // Selecting closes the panel on the coordinator side.
        self.panel_open = false;
        self.wait_for(|s| s.forecast_revision > revision && !s.is_loading).await
    }

    pub async fn retry(&mut self) -> anyhow::Result<CoordinatorState> {
        let revision = self.state.borrow().forecast_revision;
        self.send(Event::Retry).await?;
        self.wait_for(|s| s.forecast_revision > revision && !s.is_loading).await
    }

    /// Close the event channel and wait for the coordinator to stop.
    pub async fn finish(self) -> anyhow::Result<()> {
        drop(self.events);
        self.task.await.context("Coordinator task failed")
    }

    async fn send(&self, event: Event) -> anyhow::Result<()> {
        debug!(?event, "sending event to coordinator");
        self.events.send(event).await.context("Coordinator stopped unexpectedly")
    }

    async fn wait_for(
        &mut self,
        pred: impl FnMut(&CoordinatorState) -> bool,
    ) -> anyhow::Result<CoordinatorState> {
        let snapshot = self.state.wait_for(pred).await.context("Coordinator stopped unexpectedly")?;
        Ok(snapshot.clone())
    }
}

/// Run a blocking `inquire` prompt off the async runtime.
async fn prompt<T, F>(f: F) -> anyhow::Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> InquireResult<T> + Send + 'static,
{
    let answer = tokio::task::spawn_blocking(f).await.context("Prompt task panicked")??;
    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use std::{collections::HashMap, sync::Mutex};
    use weather_lookup_core::{CurrentConditions, FetchError, ForecastDay, ForecastQuery, ForecastResult};

    #[derive(Debug, Default)]
    struct FakeGateway {
        countries: Mutex<HashMap<String, String>>,
        searches: HashMap<String, Vec<LocationCandidate>>,
        search_calls: Mutex<Vec<String>>,
    }

    impl FakeGateway {
        fn with_city(self, name: &str, country: &str) -> Self {
            self.add_city(name, country);
            self
        }

        fn add_city(&self, name: &str, country: &str) {
            self.countries.lock().unwrap().insert(name.into(), country.into());
        }

        fn with_search(mut self, query: &str, results: Vec<LocationCandidate>) -> Self {
            self.searches.insert(query.into(), results);
            self
        }
    }

    #[async_trait]
    impl WeatherGateway for FakeGateway {
        async fn fetch_forecast(&self, query: &ForecastQuery) -> Result<ForecastResult, FetchError> {
            let country = self.countries.lock().unwrap().get(&query.city_name).cloned();
            let country = country.ok_or_else(|| FetchError::status(400, "no match"))?;
            Ok(ForecastResult {
                location: LocationCandidate::new(query.city_name.as_str(), country),
                current: CurrentConditions {
                    temperature_c: 12.0,
                    wind_kph: 5.0,
                    humidity_pct: 60,
                    condition: "Clear".into(),
                },
                days: vec![ForecastDay {
                    date: NaiveDate::from_ymd_opt(2024, 5, 6).unwrap(),
                    avg_temp_c: 11.0,
                    condition: "Clear".into(),
                    sunrise: Some("05:30 AM".into()),
                }],
            })
        }

        async fn fetch_location_candidates(
            &self,
            query: &str,
        ) -> Result<Vec<LocationCandidate>, FetchError> {
            self.search_calls.lock().unwrap().push(query.to_string());
            Ok(self.searches.get(query).cloned().unwrap_or_default())
        }
    }

    fn session(gateway: &Arc<FakeGateway>, default_city: &str) -> Session {
        let gateway: Arc<dyn WeatherGateway> = gateway.clone();
        let settings = CoordinatorSettings {
            default_city: default_city.into(),
            ..CoordinatorSettings::default()
        };
        Session::start(gateway, settings)
    }

    #[tokio::test(start_paused = true)]
    async fn search_and_select_switches_city() {
        let oslo = LocationCandidate::new("Oslo", "Norway");
        let gateway = Arc::new(
            FakeGateway::default()
                .with_city("Prague", "Czech Republic")
                .with_city("Oslo", "Norway")
                .with_search("Oslo", vec![oslo.clone()]),
        );
        let mut session = session(&gateway, "Prague");

        let state = session.loaded().await.unwrap();
        assert!(state.current_result.is_some());
        assert_eq!(state.selected_city, "Prague");

        let found = session.search("Oslo".into()).await.unwrap();
        assert_eq!(found, vec![oslo.clone()]);

        let state = session.select(oslo).await.unwrap();
        assert_eq!(state.selected_city, "Oslo");
        assert_eq!(state.selected_country, "Norway");
        assert!(!state.is_search_panel_open);
        assert!(state.candidates.is_empty());

        session.finish().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn empty_search_closes_panel_and_next_search_still_works() {
        let oslo = LocationCandidate::new("Oslo", "Norway");
        let gateway = Arc::new(
            FakeGateway::default()
                .with_city("Prague", "Czech Republic")
                .with_search("Oslo", vec![oslo.clone()]),
        );
        let mut session = session(&gateway, "Prague");
        session.loaded().await.unwrap();

        assert!(session.search("Zzyzx".into()).await.unwrap().is_empty());
        let closed = session.wait_for(|s| !s.is_search_panel_open).await.unwrap();
        assert!(closed.candidates.is_empty());

        assert_eq!(session.search("Oslo".into()).await.unwrap(), vec![oslo]);
        assert_eq!(*gateway.search_calls.lock().unwrap(), vec!["Zzyzx", "Oslo"]);

        session.finish().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn short_query_returns_nothing_without_searching() {
        let gateway = Arc::new(FakeGateway::default().with_city("Prague", "Czech Republic"));
        let mut session = session(&gateway, "Prague");
        session.loaded().await.unwrap();

        assert!(session.search("Pr".into()).await.unwrap().is_empty());
        assert!(gateway.search_calls.lock().unwrap().is_empty());

        session.finish().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn dismissed_search_leaves_forecast_alone() {
        let gateway = Arc::new(
            FakeGateway::default()
                .with_city("Prague", "Czech Republic")
                .with_search("Paris", vec![LocationCandidate::new("Paris", "France")]),
        );
        let mut session = session(&gateway, "Prague");
        let before = session.loaded().await.unwrap();

        assert_eq!(session.search("Paris".into()).await.unwrap().len(), 1);
        session.dismiss_search().await.unwrap();

        let after = session.wait_for(|s| !s.is_search_panel_open).await.unwrap();
        assert!(after.candidates.is_empty());
        assert_eq!(after.current_result, before.current_result);
        assert_eq!(after.selected_city, "Prague");

        session.finish().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn retry_recovers_after_failed_startup() {
        let gateway = Arc::new(FakeGateway::default());
        let mut session = session(&gateway, "Atlantis");

        let state = session.loaded().await.unwrap();
        assert!(state.current_result.is_none());
        assert!(matches!(state.last_error, Some(FetchError::Status { status: 400, .. })));

        gateway.add_city("Atlantis", "Ocean");
        let state = session.retry().await.unwrap();
        assert!(state.last_error.is_none());
        assert_eq!(
            state.current_result.map(|r| r.location),
            Some(LocationCandidate::new("Atlantis", "Ocean"))
        );

        session.finish().await.unwrap();
    }
}
