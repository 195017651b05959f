//! UI-facing state and the sequencing of user-triggered fetches.
//!
//! [`Coordinator`] is the only writer of [`CoordinatorState`]. User input
//! arrives as [`Event`]s through [`Coordinator::handle`], which updates state
//! synchronously and spawns gateway calls on the tokio runtime. Their results
//! come back over an internal channel and are applied by
//! [`Coordinator::settle`], one at a time.
//!
//! Every dispatched fetch carries a sequence number. A result whose number is
//! no longer the latest for its kind is dropped, so a slow, older response
//! can never overwrite a newer one.
//!
//! [`Coordinator::run`] wraps both halves in an event loop and publishes a
//! state snapshot over a `watch` channel after every transition.

use std::{num::NonZeroU32, sync::Arc, time::Duration};

use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::{
    debounce::Debouncer,
    error::FetchError,
    gateway::WeatherGateway,
    model::{ForecastQuery, ForecastResult, LocationCandidate},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorSettings {
    pub default_city: String,
    pub default_country: String,
    pub forecast_days: NonZeroU32,
    pub debounce: Duration,
    /// Queries with at most this many characters are not sent.
    pub min_query_chars: usize,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            default_city: "Prague".to_string(),
            default_country: "Czech Republic".to_string(),
            forecast_days: NonZeroU32::new(7).unwrap_or(NonZeroU32::MIN),
            debounce: Duration::from_millis(1200),
            min_query_chars: 2,
        }
    }
}

/// Snapshot of everything a renderer needs.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinatorState {
    pub selected_city: String,
    pub selected_country: String,
    pub current_result: Option<ForecastResult>,
    /// Non-empty only while the search panel is open.
    pub candidates: Vec<LocationCandidate>,
    /// True from dispatch of a forecast fetch until the latest one settles.
    pub is_loading: bool,
    pub is_search_panel_open: bool,
    /// A typed query is waiting on the debounce timer or its request.
    pub is_searching: bool,
    /// Failure of the most recent forecast fetch.
    pub last_error: Option<FetchError>,
    /// Bumped every time a forecast fetch settles.
    pub forecast_revision: u64,
    /// Bumped every time a search settles or is skipped.
    pub search_revision: u64,
}

impl CoordinatorState {
    fn new(settings: &CoordinatorSettings) -> Self {
        Self {
            selected_city: settings.default_city.clone(),
            selected_country: settings.default_country.clone(),
            current_result: None,
            candidates: Vec::new(),
            is_loading: false,
            is_search_panel_open: false,
            is_searching: false,
            last_error: None,
            forecast_revision: 0,
            search_revision: 0,
        }
    }
}

/// User input understood by the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Full contents of the search box after a keystroke.
    TextChanged(String),
    CandidateSelected(LocationCandidate),
    SearchToggled,
    /// Fetch the selected city again, e.g. after a failure.
    Retry,
}

/// What a call to [`Coordinator::settle`] did.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// The debounce timer fired and a location search was sent.
    SearchDispatched(String),
    /// The debounce timer fired but the query was too short to send.
    SearchSkipped(String),
    CandidatesUpdated(usize),
    SearchFailed(FetchError),
    ForecastApplied,
    ForecastFailed(FetchError),
    /// A result arrived for a request that has since been replaced.
    Superseded,
}

#[derive(Debug)]
enum Outcome {
    Forecast {
        seq: u64,
        selection: Option<LocationCandidate>,
        result: Result<ForecastResult, FetchError>,
    },
    Candidates {
        seq: u64,
        result: Result<Vec<LocationCandidate>, FetchError>,
    },
}

#[derive(Debug)]
pub struct Coordinator {
    gateway: Arc<dyn WeatherGateway>,
    settings: CoordinatorSettings,
    state: CoordinatorState,
    debouncer: Debouncer<String>,
    outcomes_tx: mpsc::UnboundedSender<Outcome>,
    outcomes_rx: mpsc::UnboundedReceiver<Outcome>,
    forecast_seq: u64,
    search_seq: u64,
}

impl Coordinator {
    pub fn new(gateway: Arc<dyn WeatherGateway>, settings: CoordinatorSettings) -> Self {
        let (outcomes_tx, outcomes_rx) = mpsc::unbounded_channel();
        Self {
            gateway,
            state: CoordinatorState::new(&settings),
            debouncer: Debouncer::new(settings.debounce),
            settings,
            outcomes_tx,
            outcomes_rx,
            forecast_seq: 0,
            search_seq: 0,
        }
    }

    pub fn state(&self) -> &CoordinatorState {
        &self.state
    }

    pub fn settings(&self) -> &CoordinatorSettings {
        &self.settings
    }

    /// Load the default city.
    pub fn start(&mut self) {
        let city = self.state.selected_city.clone();
        self.dispatch_forecast(city, None);
    }

    pub fn handle(&mut self, event: Event) {
        match event {
            Event::TextChanged(text) => {
                if !self.state.is_search_panel_open {
                    debug!("ignoring text input while search panel is closed");
                    return;
                }
                self.debouncer.call(text);
                self.state.is_searching = true;
            }
            Event::CandidateSelected(candidate) => {
                self.close_search();
                let city = candidate.name.clone();
                self.dispatch_forecast(city, Some(candidate));
            }
            Event::SearchToggled => {
                if self.state.is_search_panel_open {
                    self.close_search();
                } else {
                    self.state.is_search_panel_open = true;
                }
            }
            Event::Retry => {
                let city = self.state.selected_city.clone();
                self.dispatch_forecast(city, None);
            }
        }
    }

    /// Wait for the next debounced query or fetch result and apply it.
    ///
    /// Cancel safe.
    pub async fn settle(&mut self) -> Step {
        tokio::select! {
            query = self.debouncer.fired() => self.dispatch_search(query),
            Some(outcome) = self.outcomes_rx.recv() => self.apply(outcome),
        }
    }

    /// Run until `events` is closed, publishing state after each transition.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<Event>,
        publish: watch::Sender<CoordinatorState>,
    ) {
        self.start();
        publish.send_replace(self.state.clone());

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => {
                        debug!(?event, "handling event");
                        self.handle(event);
                    }
                    None => break,
                },
                step = self.settle() => debug!(?step, "coordinator step"),
            }
            publish.send_replace(self.state.clone());
        }

        debug!("event channel closed, coordinator stopping");
    }

    fn close_search(&mut self) {
        self.state.is_search_panel_open = false;
        self.state.candidates.clear();
        self.state.is_searching = false;
        self.debouncer.cancel();
        // Anything still in flight belongs to the closed panel.
        self.search_seq += 1;
    }

    fn dispatch_forecast(&mut self, city: String, selection: Option<LocationCandidate>) {
        self.forecast_seq += 1;
        let seq = self.forecast_seq;
        self.state.is_loading = true;
        self.state.last_error = None;

        debug!(seq, city = %city, "dispatching forecast fetch");

        let query = ForecastQuery::new(city, self.settings.forecast_days);
        let gateway = Arc::clone(&self.gateway);
        let tx = self.outcomes_tx.clone();
        tokio::spawn(async move {
            let result = gateway.fetch_forecast(&query).await;
            // The receiver lives as long as the coordinator.
            let _ = tx.send(Outcome::Forecast { seq, selection, result });
        });
    }

    fn dispatch_search(&mut self, query: String) -> Step {
        self.search_seq += 1;
        let seq = self.search_seq;

        if query.chars().count() <= self.settings.min_query_chars {
            debug!(query = %query, "query too short, not searching");
            self.state.candidates.clear();
            self.state.is_searching = false;
            self.state.search_revision += 1;
            return Step::SearchSkipped(query);
        }

        debug!(seq, query = %query, "dispatching location search");

        let gateway = Arc::clone(&self.gateway);
        let tx = self.outcomes_tx.clone();
        let sent = query.clone();
        tokio::spawn(async move {
            let result = gateway.fetch_location_candidates(&sent).await;
            let _ = tx.send(Outcome::Candidates { seq, result });
        });

        Step::SearchDispatched(query)
    }

    fn apply(&mut self, outcome: Outcome) -> Step {
        let latest = match &outcome {
            Outcome::Forecast { seq, .. } => *seq == self.forecast_seq,
            Outcome::Candidates { seq, .. } => {
                *seq == self.search_seq && self.state.is_search_panel_open
            }
        };
        if !latest {
            debug!("dropping superseded result");
            return Step::Superseded;
        }

        match outcome {
            Outcome::Forecast { selection, result, .. } => {
                self.state.is_loading = false;
                self.state.forecast_revision += 1;
                match result {
                    Ok(forecast) => {
                        if let Some(candidate) = selection {
                            self.state.selected_city = candidate.name;
                            self.state.selected_country = candidate.country;
                        }
                        info!(city = %self.state.selected_city, "forecast updated");
                        self.state.current_result = Some(forecast);
                        self.state.last_error = None;
                        Step::ForecastApplied
                    }
                    Err(err) => {
                        warn!(error = %err, "forecast unavailable, keeping previous result");
                        self.state.last_error = Some(err.clone());
                        Step::ForecastFailed(err)
                    }
                }
            }
            Outcome::Candidates { result, .. } => {
                // Newer text may still be waiting on the timer.
                self.state.is_searching = self.debouncer.is_pending();
                self.state.search_revision += 1;
                match result {
                    Ok(candidates) => {
                        let count = candidates.len();
                        self.state.candidates = candidates;
                        Step::CandidatesUpdated(count)
                    }
                    Err(err) => {
                        warn!(error = %err, "location search failed, keeping candidates");
                        Step::SearchFailed(err)
                    }
                }
            }
        }
    }
}
