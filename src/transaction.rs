//! Schema-validated transactions.
//!
//! A [`Transaction`] applies mutations to the store immediately and records
//! every node they touch. `commit()` validates the closure of those nodes and
//! either commits the store transaction or rolls it back.

use crate::config::ValidationConfig;
use crate::error::TxnError;
use crate::logging::transaction_span;
use crate::metrics::{METRICS, TransactionOutcome};
use crate::model::{AffectedSet, Edge, Node, Value};
use crate::reachability::ReachabilityAnalyzer;
use crate::store::Repository;
use crate::validators::{ValidationMode, ValidationReport, ValidatorChain};
use anyhow::Context;
use chrono::{DateTime, Utc};
use oxigraph::model::NamedNode;
use std::sync::Arc;
use std::time::{Duration, Instant};
use strum::Display;
use tracing::{Span, debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum TransactionState {
    /// Accepting mutations.
    Open,
    /// `commit()` is running, or failed with a store error.
    Validating,
    Committed,
    RolledBack,
}

impl TransactionState {
    pub fn is_finished(&self) -> bool {
        matches!(self, TransactionState::Committed | TransactionState::RolledBack)
    }
}

/// What a successful commit reports back.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitReceipt {
    pub id: Uuid,
    pub committed_at: DateTime<Utc>,
    /// Size of the validated anchor set.
    pub anchors: usize,
    pub validators_run: usize,
    pub elapsed: Duration,
}

// =============================================================================
// TransactionCoordinator
// =============================================================================

/// Opens transactions against one repository with one validator chain.
pub struct TransactionCoordinator<R: Repository> {
    repo: Arc<R>,
    chain: Arc<ValidatorChain>,
    config: Arc<ValidationConfig>,
}

impl<R: Repository> TransactionCoordinator<R> {
    /// All ten validators, default settings.
    pub fn new(repo: Arc<R>) -> Self {
        Self::from_parts(repo, ValidationConfig::default())
    }

    /// Coordinator using `config`, which is rejected if it does not pass
    /// [`ValidationConfig::validate`].
    pub fn with_config(repo: Arc<R>, config: ValidationConfig) -> anyhow::Result<Self> {
        config
            .validate()
            .context("invalid validation configuration")?;
        Ok(Self::from_parts(repo, config))
    }

    fn from_parts(repo: Arc<R>, config: ValidationConfig) -> Self {
        let chain = ValidatorChain::from_config(&config);
        Self {
            repo,
            chain: Arc::new(chain),
            config: Arc::new(config),
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    pub fn chain(&self) -> &ValidatorChain {
        &self.chain
    }

    /// Open a store transaction and return it in state `Open`.
    pub fn begin(&self) -> Result<Transaction<R>, TxnError> {
        self.repo.begin()?;
        let txn = Transaction {
            repo: Arc::clone(&self.repo),
            chain: Arc::clone(&self.chain),
            config: Arc::clone(&self.config),
            state: TransactionState::Open,
            affected: AffectedSet::new(),
            id: Uuid::new_v4(),
            started: Instant::now(),
            span: Span::none(),
        };
        Ok(txn.with_span())
    }
}

impl<R: Repository> Clone for TransactionCoordinator<R> {
    fn clone(&self) -> Self {
        Self {
            repo: Arc::clone(&self.repo),
            chain: Arc::clone(&self.chain),
            config: Arc::clone(&self.config),
        }
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// One unit of work. Owns the set of nodes its mutations touched.
///
/// Dropping an unfinished transaction rolls the store back.
pub struct Transaction<R: Repository> {
    repo: Arc<R>,
    chain: Arc<ValidatorChain>,
    config: Arc<ValidationConfig>,
    state: TransactionState,
    affected: AffectedSet,
    id: Uuid,
    started: Instant,
    span: Span,
}

impl<R: Repository> Transaction<R> {
    fn with_span(mut self) -> Self {
        self.span = transaction_span(&self.id);
        self.span.in_scope(|| debug!("transaction opened"));
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn affected(&self) -> &AffectedSet {
        &self.affected
    }

    fn ensure_open(&self, operation: &'static str) -> Result<(), TxnError> {
        if self.state == TransactionState::Open {
            Ok(())
        } else {
            Err(TxnError::InvalidState {
                state: self.state,
                operation,
            })
        }
    }

    fn record_outcome(&self, outcome: TransactionOutcome) {
        if self.config.record_metrics {
            METRICS.record_transaction(outcome);
        }
    }

    fn record_error(&self, err: &TxnError) {
        if self.config.record_metrics {
            METRICS.record_error(err.category());
        }
    }

    /// Re-open a committed or rolled-back transaction with a fresh affected set.
    pub fn begin(&mut self) -> Result<(), TxnError> {
        if !self.state.is_finished() {
            return Err(TxnError::InvalidState {
                state: self.state,
                operation: "begin",
            });
        }
        self.repo.begin()?;
        self.affected.clear();
        self.id = Uuid::new_v4();
        self.started = Instant::now();
        self.state = TransactionState::Open;
        self.span = transaction_span(&self.id);
        self.span.in_scope(|| debug!("transaction re-opened"));
        Ok(())
    }

    /// Create a domain object of type `class`.
    pub fn create(&mut self, class: &NamedNode) -> Result<Node, TxnError> {
        self.ensure_open("create")?;
        let node = self.repo.create(class)?;
        self.affected.insert(node.clone());
        Ok(node)
    }

    /// Type the node `id` as `class`, creating it if needed.
    pub fn create_with_id(&mut self, class: &NamedNode, id: &str) -> Result<Node, TxnError> {
        self.ensure_open("create_with_id")?;
        let node = self.repo.create_with_id(class, id)?;
        self.affected.insert(node.clone());
        Ok(node)
    }

    /// Mark an object changed through other means so its constraints are
    /// validated on commit.
    pub fn persist(&mut self, node: Node) -> Result<(), TxnError> {
        self.ensure_open("persist")?;
        self.affected.insert(node);
        Ok(())
    }

    pub fn fetch_by_id(&mut self, class: &NamedNode, id: &str) -> Result<Option<Node>, TxnError> {
        self.ensure_open("fetch_by_id")?;
        let node = self.repo.fetch_by_id(class, id)?;
        if let Some(node) = &node {
            self.affected.insert(node.clone());
        }
        Ok(node)
    }

    pub fn fetch_all(&mut self, class: &NamedNode) -> Result<Vec<Node>, TxnError> {
        self.ensure_open("fetch_all")?;
        let nodes = self.repo.fetch_all(class)?;
        self.affected.extend(nodes.iter().cloned());
        Ok(nodes)
    }

    /// Add an edge. Returns `false` if it already existed.
    pub fn insert(&mut self, edge: Edge) -> Result<bool, TxnError> {
        self.ensure_open("insert")?;
        let inserted = self.repo.insert(&edge)?;
        self.affected.insert(edge.subject);
        Ok(inserted)
    }

    /// Remove an edge. Returns `false` if it was absent.
    ///
    /// A node-valued object is marked affected as well: after the removal it
    /// may no longer be reachable from the subject.
    pub fn remove(&mut self, edge: Edge) -> Result<bool, TxnError> {
        self.ensure_open("remove")?;
        let removed = self.repo.remove(&edge)?;
        self.affected.insert(edge.subject);
        if let Value::Node(object) = edge.object {
            self.affected.insert(object);
        }
        Ok(removed)
    }

    /// Validate the current uncommitted state without committing. Uses the
    /// configured mode, so it can report more than one violation.
    pub fn check(&self) -> Result<ValidationReport, TxnError> {
        self.ensure_open("check")?;
        let _guard = self.span.enter();
        let report = self.validate(self.config.validation_mode())?;
        debug!(summary = %report.summary(), "dry-run validation");
        Ok(report)
    }

    fn validate(&self, mode: ValidationMode) -> Result<ValidationReport, TxnError> {
        let repo = self.repo.as_ref();
        let anchors = ReachabilityAnalyzer::new(repo).reachable(&self.affected)?;
        if self.config.record_metrics {
            METRICS.record_anchor_set(anchors.len());
        }
        Ok(self.chain.run(repo, &anchors, mode)?)
    }

    /// Validate the closure of the affected nodes and commit.
    ///
    /// On the first violation the store is rolled back and the violation is
    /// returned as [`TxnError::ValidationFailed`]. A store error leaves the
    /// transaction in `Validating`; only `rollback()` is accepted afterwards.
    pub fn commit(&mut self) -> Result<CommitReceipt, TxnError> {
        self.ensure_open("commit")?;
        let span = self.span.clone();
        let _guard = span.enter();

        self.state = TransactionState::Validating;
        let report = match self.validate(ValidationMode::FailFast) {
            Ok(report) => report,
            Err(err) => {
                warn!(error = %err, "validation aborted by a store error");
                self.record_error(&err);
                return Err(err);
            }
        };

        if let Some(violation) = report.violations.into_iter().next() {
            if let Err(err) = self.repo.rollback() {
                let err = TxnError::from(err);
                warn!(error = %err, "rollback after a violation failed");
                self.record_error(&err);
                return Err(err);
            }
            self.state = TransactionState::RolledBack;
            self.record_outcome(TransactionOutcome::Violation);
            info!(
                axiom = %violation.axiom,
                subject = %violation.subject,
                anchors = report.anchor_count,
                "commit rejected"
            );
            return Err(TxnError::from(violation));
        }

        if let Err(err) = self.repo.commit() {
            let err = TxnError::from(err);
            warn!(error = %err, "store commit failed");
            self.record_error(&err);
            return Err(err);
        }
        self.state = TransactionState::Committed;
        self.record_outcome(TransactionOutcome::Committed);

        let receipt = CommitReceipt {
            id: self.id,
            committed_at: Utc::now(),
            anchors: report.anchor_count,
            validators_run: report.validators_run.len(),
            elapsed: self.started.elapsed(),
        };
        info!(
            anchors = receipt.anchors,
            validators = receipt.validators_run,
            elapsed_ms = receipt.elapsed.as_millis() as u64,
            "transaction committed"
        );
        Ok(receipt)
    }

    /// Discard every change. Accepted while `Open` or `Validating`.
    pub fn rollback(&mut self) -> Result<(), TxnError> {
        if self.state.is_finished() {
            return Err(TxnError::InvalidState {
                state: self.state,
                operation: "rollback",
            });
        }
        let _guard = self.span.enter();
        self.repo.rollback()?;
        self.state = TransactionState::RolledBack;
        self.record_outcome(TransactionOutcome::RolledBack);
        info!(affected = self.affected.len(), "transaction rolled back");
        Ok(())
    }
}

impl<R: Repository> Drop for Transaction<R> {
    fn drop(&mut self) {
        if self.state.is_finished() {
            return;
        }
        let _guard = self.span.enter();
        warn!(state = %self.state, "transaction dropped unfinished, rolling back");
        if let Err(err) = self.repo.rollback() {
            warn!(error = %err, "rollback on drop failed");
        }
    }
}
