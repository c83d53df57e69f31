//! Projects the backend's ambiguous progress representations into one
//! clamped percentage.

use scraper_client::{ProgressField, StatusResponse};

/// Resolve a response's progress. First match wins: top-level
/// `progressPercent`, then `progress.percentComplete`, then a bare-number
/// `progress`. Anything else — including non-finite numbers — retains
/// `prior` rather than downgrading to zero. Always clamped to [0, 100].
pub fn project(response: &StatusResponse, prior: f64) -> f64 {
    let resolved = bare_percent(response.progress_percent.as_ref())
        .or_else(|| nested_percent(response.progress.as_ref()))
        .or_else(|| bare_percent(response.progress.as_ref()));

    match resolved {
        Some(value) if value.is_finite() => value.clamp(0.0, 100.0),
        _ => prior.clamp(0.0, 100.0),
    }
}

fn bare_percent(field: Option<&ProgressField>) -> Option<f64> {
    match field {
        Some(ProgressField::Percent(value)) => Some(*value),
        _ => None,
    }
}

fn nested_percent(field: Option<&ProgressField>) -> Option<f64> {
    match field {
        Some(ProgressField::Detailed { percent_complete }) => Some(*percent_complete),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(body: serde_json::Value) -> StatusResponse {
        serde_json::from_value(body).expect("test body decodes")
    }

    #[test]
    fn nested_percent_complete_is_projected() {
        let resp = response(json!({"status": "processing", "progress": {"percentComplete": 42}}));
        assert_eq!(project(&resp, 0.0), 42.0);
    }

    #[test]
    fn top_level_progress_percent_wins_over_nested() {
        let resp = response(json!({
            "status": "processing",
            "progressPercent": 60,
            "progress": {"percentComplete": 10}
        }));
        assert_eq!(project(&resp, 0.0), 60.0);
    }

    #[test]
    fn bare_number_progress_is_accepted() {
        let resp = response(json!({"status": "processing", "progress": 33.5}));
        assert_eq!(project(&resp, 0.0), 33.5);
    }

    #[test]
    fn out_of_range_values_are_clamped() {
        let high = response(json!({"status": "processing", "progressPercent": 250}));
        assert_eq!(project(&high, 0.0), 100.0);

        let low = response(json!({"status": "processing", "progress": -3}));
        assert_eq!(project(&low, 40.0), 0.0);
    }

    #[test]
    fn ambiguous_payloads_retain_prior_progress() {
        for body in [
            json!({"status": "processing"}),
            json!({"status": "processing", "progress": "half"}),
            json!({"status": "processing", "progress": {"stage": "enriching"}}),
            json!({"status": "processing", "progressPercent": "80"}),
        ] {
            let resp = response(body);
            assert_eq!(project(&resp, 55.0), 55.0);
        }
    }
}
