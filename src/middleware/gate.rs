use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use chrono::{DateTime, Utc};

use crate::middleware::auth::session_from_request;
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    RedirectToLanding,
}

/// The gate rule: before the event instant nobody gets in, session or not;
/// from the instant on, only signed-in guests do.
pub fn gate_decision(now: DateTime<Utc>, starts_at: DateTime<Utc>, has_session: bool) -> GateDecision {
    if now < starts_at {
        return GateDecision::RedirectToLanding;
    }
    if !has_session {
        return GateDecision::RedirectToLanding;
    }
    GateDecision::Allow
}

/// Event gate middleware for the gallery surface (feed, posting, likes,
/// profile stats). Redirects to the landing path instead of failing with a
/// status, matching the app's countdown page flow.
pub async fn event_gate(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let session = session_from_request(&request, &state.config).ok();
    let decision = gate_decision(
        Utc::now(),
        state.config.event.starts_at_utc(),
        session.is_some(),
    );

    match decision {
        GateDecision::RedirectToLanding => {
            Redirect::temporary(&state.config.event.landing_path).into_response()
        }
        GateDecision::Allow => {
            // Checked above
            if let Some(session) = session {
                request.extensions_mut().insert(session);
            }
            next.run(request).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EventConfig;

    fn at(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    #[test]
    fn before_the_event_everyone_is_redirected() {
        let starts = at("2026-03-20T17:00:00Z");
        let before = at("2026-03-20T16:59:59Z");

        assert_eq!(gate_decision(before, starts, true), GateDecision::RedirectToLanding);
        assert_eq!(gate_decision(before, starts, false), GateDecision::RedirectToLanding);
    }

    #[test]
    fn after_the_event_only_guests_without_a_session_are_redirected() {
        let starts = at("2026-03-20T17:00:00Z");
        let after = at("2026-03-20T18:00:00Z");

        assert_eq!(gate_decision(after, starts, true), GateDecision::Allow);
        assert_eq!(gate_decision(after, starts, false), GateDecision::RedirectToLanding);
    }

    #[test]
    fn the_exact_instant_counts_as_open() {
        let starts = at("2026-03-20T17:00:00Z");
        assert_eq!(gate_decision(starts, starts, true), GateDecision::Allow);
    }

    #[test]
    fn offset_timestamps_compare_in_utc() {
        let config = EventConfig {
            starts_at: "2026-03-20T18:00:00+01:00".to_string(),
            landing_path: "/".to_string(),
        };
        assert_eq!(config.starts_at_utc(), at("2026-03-20T17:00:00Z"));
    }

    #[test]
    fn unparseable_instant_falls_back_to_open() {
        let config = EventConfig {
            starts_at: "not-a-date".to_string(),
            landing_path: "/".to_string(),
        };
        assert_eq!(config.starts_at_utc(), DateTime::<Utc>::UNIX_EPOCH);
    }
}
