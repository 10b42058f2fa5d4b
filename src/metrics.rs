//! Prometheus metrics for transaction validation
//!
//! Counters and histograms live in a process-wide registry; `encode()` renders
//! them in the text exposition format for whatever scrapes the host process.
use crate::model::AxiomKind;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use prometheus_client::encoding::{EncodeLabelSet, text::encode};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{Histogram, exponential_buckets};
use prometheus_client::registry::Registry;
use std::sync::Arc;
use std::time::Duration;

/// Global metrics registry instance
pub static METRICS: Lazy<Arc<MetricsCollector>> = Lazy::new(|| Arc::new(MetricsCollector::new()));

/// How a transaction ended
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub enum TransactionOutcome {
    Committed,
    /// Rolled back because the schema was violated
    Violation,
    /// Rolled back on request
    RolledBack,
}

impl TransactionOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionOutcome::Committed => "committed",
            TransactionOutcome::Violation => "violation",
            TransactionOutcome::RolledBack => "rolled_back",
        }
    }
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct OutcomeLabels {
    pub outcome: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct AxiomLabels {
    /// Axiom kind, e.g. "functional", "max_cardinality"
    pub axiom: String,
}

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ErrorLabels {
    /// Error category as reported by `TxnError::category`
    pub category: String,
}

pub struct MetricsCollector {
    registry: RwLock<Registry>,

    /// Finished transactions by outcome
    pub transactions_total: Family<OutcomeLabels, Counter>,

    /// Violations found, by axiom kind
    pub violations_total: Family<AxiomLabels, Counter>,

    /// Time spent in each validator
    pub validator_duration_seconds: Family<AxiomLabels, Histogram>,

    /// Size of the anchor set computed at validation time
    pub anchor_set_size: Histogram,

    /// Failed transaction operations by error category
    pub errors_total: Family<ErrorLabels, Counter>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let transactions_total = Family::<OutcomeLabels, Counter>::default();
        registry.register(
            "owl_guard_transactions",
            "Finished transactions by outcome",
            transactions_total.clone(),
        );

        let violations_total = Family::<AxiomLabels, Counter>::default();
        registry.register(
            "owl_guard_violations",
            "Schema violations found by axiom kind",
            violations_total.clone(),
        );

        let validator_duration_seconds =
            Family::<AxiomLabels, Histogram>::new_with_constructor(|| {
                // 0.5ms .. ~4s
                Histogram::new(exponential_buckets(0.0005, 2.0, 14))
            });
        registry.register(
            "owl_guard_validator_duration_seconds",
            "Validator latency histogram in seconds",
            validator_duration_seconds.clone(),
        );

        let anchor_set_size = Histogram::new(exponential_buckets(1.0, 2.0, 16));
        registry.register(
            "owl_guard_anchor_set_size",
            "Number of anchors validated per commit",
            anchor_set_size.clone(),
        );

        let errors_total = Family::<ErrorLabels, Counter>::default();
        registry.register(
            "owl_guard_errors",
            "Failed transaction operations by error category",
            errors_total.clone(),
        );

        Self {
            registry: RwLock::new(registry),
            transactions_total,
            violations_total,
            validator_duration_seconds,
            anchor_set_size,
            errors_total,
        }
    }

    /// Encode metrics in Prometheus text format
    pub fn encode(&self) -> String {
        let mut buffer = String::new();
        let registry = self.registry.read();
        encode(&mut buffer, &registry).expect("encoding metrics into a String should succeed");
        buffer
    }

    pub fn record_transaction(&self, outcome: TransactionOutcome) {
        self.transactions_total
            .get_or_create(&OutcomeLabels {
                outcome: outcome.as_str().to_string(),
            })
            .inc();
    }

    pub fn record_validator(&self, axiom: AxiomKind, duration: Duration, violations: usize) {
        let labels = AxiomLabels {
            axiom: axiom.to_string(),
        };
        self.validator_duration_seconds
            .get_or_create(&labels)
            .observe(duration.as_secs_f64());
        if violations > 0 {
            self.violations_total
                .get_or_create(&labels)
                .inc_by(violations as u64);
        }
    }

    pub fn record_anchor_set(&self, size: usize) {
        self.anchor_set_size.observe(size as f64);
    }

    pub fn record_error(&self, category: &str) {
        self.errors_total
            .get_or_create(&ErrorLabels {
                category: category.to_string(),
            })
            .inc();
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}
