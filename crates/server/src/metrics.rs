//! Request counters exposed at `/metrics`.

use std::fmt::Write;
use std::sync::atomic::{AtomicU64, Ordering};

use estate_core::PredictionError;

const KIND_COUNT: usize = PredictionError::KINDS.len();

/// Prediction request counters.
#[derive(Debug, Default)]
pub struct Metrics {
    requests: AtomicU64,
    successes: AtomicU64,
    failures: [AtomicU64; KIND_COUNT],
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self, err: &PredictionError) {
        if let Some(i) = PredictionError::KINDS.iter().position(|k| *k == err.kind()) {
            self.failures[i].fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn successes(&self) -> u64 {
        self.successes.load(Ordering::Relaxed)
    }

    pub fn failures(&self, kind: &str) -> u64 {
        PredictionError::KINDS
            .iter()
            .position(|k| *k == kind)
            .map_or(0, |i| self.failures[i].load(Ordering::Relaxed))
    }

    /// Prometheus text exposition.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = write!(
            out,
            "# HELP estate_prediction_requests_total Prediction requests received\n\
             # TYPE estate_prediction_requests_total counter\n\
             estate_prediction_requests_total {}\n\
             # HELP estate_predictions_total Successful predictions\n\
             # TYPE estate_predictions_total counter\n\
             estate_predictions_total {}\n\
             # HELP estate_prediction_failures_total Failed predictions by error kind\n\
             # TYPE estate_prediction_failures_total counter\n",
            self.requests(),
            self.successes(),
        );
        for kind in PredictionError::KINDS {
            let _ = writeln!(
                out,
                "estate_prediction_failures_total{{kind=\"{kind}\"}} {}",
                self.failures(kind)
            );
        }
        out
    }
}
