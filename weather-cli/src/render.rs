use weather_lookup_core::{CoordinatorState, ForecastResult, LocationCandidate};

/// Current conditions block followed by the daily forecast strip.
pub fn forecast(location: &LocationCandidate, result: &ForecastResult) -> String {
    let current = &result.current;

    let mut out = format!(
        "{location}\n  {}°  {}\n  wind {} km/h   humidity {} %   sunrise {}\n",
        current.temperature_c,
        current.condition,
        current.wind_kph,
        current.humidity_pct,
        result.sunrise().unwrap_or("-"),
    );

    if !result.days.is_empty() {
        out.push_str("\nDaily forecast\n");
        for day in &result.days {
            out.push_str(&format!(
                "  {:<10} {:<7} {:>6}°  {}\n",
                day.day_name(),
                day.date.format("%d %b").to_string(),
                day.avg_temp_c,
                day.condition,
            ));
        }
    }

    out
}

pub fn candidates(candidates: &[LocationCandidate]) -> String {
    if candidates.is_empty() {
        return "No matching locations.\n".to_string();
    }
    candidates.iter().map(|c| format!("  {c}\n")).collect()
}

/// Full screen for the interactive session.
pub fn state(state: &CoordinatorState) -> String {
    if state.is_loading {
        return "Loading...\n".to_string();
    }

    let location = LocationCandidate::new(&state.selected_city, &state.selected_country);
    let mut out = match &state.current_result {
        Some(result) => forecast(&location, result),
        None => format!("{location}\n  no forecast loaded\n"),
    };

    if let Some(err) = &state.last_error {
        out.push_str(&format!("\n! {}\n", err.user_message()));
    }
    out
}
