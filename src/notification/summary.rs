use std::iter::Sum;
use std::ops::Add;

use serde::Serialize;

use crate::directory::Endpoint;

/// Result of one delivery attempt to one endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// Push service reports the endpoint permanently gone
    Expired(Endpoint),
    Failed { endpoint: Endpoint, detail: String },
}

impl DeliveryOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DeliveryOutcome::Delivered => "delivered",
            DeliveryOutcome::Expired(_) => "expired",
            DeliveryOutcome::Failed { .. } => "failed",
        }
    }
}

/// Sent / expired / errored counts for a batch or part of one.
///
/// Combining summaries with `+` is associative and commutative, so partial
/// per-recipient summaries can be merged in completion order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub sent: u64,
    pub expired: u64,
    pub errors: u64,
}

impl BatchSummary {
    pub fn record(&mut self, outcome: &DeliveryOutcome) {
        match outcome {
            DeliveryOutcome::Delivered => self.sent += 1,
            DeliveryOutcome::Expired(_) => self.expired += 1,
            DeliveryOutcome::Failed { .. } => self.errors += 1,
        }
    }

    pub fn fold<'a, I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = &'a DeliveryOutcome>,
    {
        outcomes.into_iter().fold(Self::default(), |mut summary, outcome| {
            summary.record(outcome);
            summary
        })
    }

    /// Number of outcomes folded in.
    pub fn total(&self) -> u64 {
        self.sent + self.expired + self.errors
    }
}

impl Add for BatchSummary {
    type Output = BatchSummary;

    fn add(self, other: BatchSummary) -> BatchSummary {
        BatchSummary {
            sent: self.sent + other.sent,
            expired: self.expired + other.expired,
            errors: self.errors + other.errors,
        }
    }
}

impl Sum for BatchSummary {
    fn sum<I: Iterator<Item = BatchSummary>>(iter: I) -> Self {
        iter.fold(BatchSummary::default(), Add::add)
    }
}
