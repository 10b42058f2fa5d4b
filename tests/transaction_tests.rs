//! Transaction protocol: commit, rollback and the state machine.

mod support;

use anyhow::Result;
use assert_matches::assert_matches;
use oxigraph::model::{Literal, NamedNode, Term};
use owl_guard::sparql::{ResultRow, SelectQuery};
use owl_guard::{
    AxiomKind, Edge, GraphQueryFacade, ModeSetting, Node, ObjectMapper, OxigraphRepository,
    StoreError, TransactionCoordinator, TransactionState, TransactionalStore, TxnError,
    ValidationConfig,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use support::{CARDINALITY_SCHEMA, SOCIAL_SCHEMA, TEAM_SCHEMA, coordinator, ex, node, repo};

#[test]
fn test_symmetric_edge_needs_its_mirror() -> Result<()> {
    let coordinator = coordinator(&[
        SOCIAL_SCHEMA,
        "ex:a a ex:Person . ex:b a ex:Person .",
    ])?;
    let person = ex("Person");
    let has_friend = ex("hasFriend");

    let mut txn = coordinator.begin()?;
    let a = txn.fetch_by_id(&person, "http://example.org/a")?.unwrap();
    let b = txn.fetch_by_id(&person, "http://example.org/b")?.unwrap();
    txn.insert(Edge::new(a.clone(), has_friend.clone(), b.clone()))?;

    let err = txn.commit().unwrap_err();
    let violation = err.violation().unwrap();
    assert_eq!(violation.axiom, AxiomKind::Symmetric);
    assert_eq!(violation.predicate, has_friend);
    assert_eq!(violation.subject, a);
    assert!(violation.mentions(&Term::from(b.clone())));
    assert_eq!(txn.state(), TransactionState::RolledBack);
    assert!(
        !coordinator
            .repository()
            .contains(&Edge::new(a.clone(), has_friend.clone(), b.clone()))?
    );

    txn.begin()?;
    txn.insert(Edge::new(a.clone(), has_friend.clone(), b.clone()))?;
    txn.insert(Edge::new(b.clone(), has_friend.clone(), a.clone()))?;
    let receipt = txn.commit()?;

    assert_eq!(txn.state(), TransactionState::Committed);
    assert_eq!(receipt.validators_run, 10);
    assert!(receipt.anchors >= 2);
    assert!(coordinator.repository().contains(&Edge::new(b, has_friend, a))?);
    Ok(())
}

#[test]
fn test_team_members_must_be_persons() -> Result<()> {
    let coordinator = coordinator(&[TEAM_SCHEMA])?;
    let member = ex("member");

    let mut txn = coordinator.begin()?;
    let team = txn.create(&ex("Team"))?;
    let robot = txn.create(&ex("Robot"))?;
    txn.insert(Edge::new(team.clone(), member.clone(), robot.clone()))?;

    let err = txn.commit().unwrap_err();
    assert_eq!(err.category(), "validation_failed");
    let violation = err.violation().unwrap();
    assert_eq!(violation.axiom, AxiomKind::AllValuesFrom);
    assert_eq!(violation.predicate, member);
    assert!(violation.mentions(&Term::from(robot.clone())));
    assert!(violation.mentions(&Term::from(ex("Person"))));
    assert!(coordinator.repository().fetch_all(&ex("Team"))?.is_empty());

    txn.begin()?;
    let team = txn.create(&ex("Team"))?;
    let employee = txn.create(&ex("Employee"))?;
    txn.insert(Edge::new(team, member, employee))?;
    txn.commit()?;
    assert_eq!(coordinator.repository().fetch_all(&ex("Team"))?.len(), 1);
    Ok(())
}

#[test]
fn test_removal_can_violate_min_cardinality() -> Result<()> {
    let coordinator = coordinator(&[
        CARDINALITY_SCHEMA,
        "ex:p a ex:Parent ; ex:child ex:c1, ex:c2 .",
    ])?;
    let dropped = Edge::new(node("p"), ex("child"), node("c2"));

    let mut txn = coordinator.begin()?;
    assert!(txn.remove(dropped.clone())?);
    assert!(txn.affected().contains(&node("c2")));

    let err = txn.commit().unwrap_err();
    assert_matches!(err, TxnError::ValidationFailed(ref v) if v.axiom == AxiomKind::MinCardinality);
    assert!(coordinator.repository().contains(&dropped)?);
    Ok(())
}

#[test]
fn test_state_machine() -> Result<()> {
    let coordinator = coordinator(&[SOCIAL_SCHEMA])?;
    let mut txn = coordinator.begin()?;
    assert_eq!(txn.state(), TransactionState::Open);

    assert_matches!(
        coordinator.begin().map(|_| ()),
        Err(TxnError::Store(StoreError::TransactionActive))
    );
    assert_matches!(
        txn.begin(),
        Err(TxnError::InvalidState {
            state: TransactionState::Open,
            operation: "begin"
        })
    );

    let receipt = txn.commit()?;
    assert_eq!(receipt.anchors, 0);
    assert_eq!(receipt.validators_run, 0);
    assert_eq!(txn.state(), TransactionState::Committed);

    let edge = Edge::new(node("a"), ex("name"), Literal::from("A"));
    assert_matches!(
        txn.insert(edge.clone()),
        Err(TxnError::InvalidState {
            state: TransactionState::Committed,
            operation: "insert"
        })
    );
    assert_matches!(
        txn.rollback(),
        Err(TxnError::InvalidState {
            state: TransactionState::Committed,
            ..
        })
    );

    txn.begin()?;
    assert_eq!(txn.state(), TransactionState::Open);
    assert!(txn.affected().is_empty());
    txn.insert(edge.clone())?;
    txn.rollback()?;
    assert_eq!(txn.state(), TransactionState::RolledBack);
    assert!(!coordinator.repository().contains(&edge)?);

    let err = txn.commit().unwrap_err();
    assert_eq!(err.category(), "invalid_state");
    assert_eq!(
        err.to_string(),
        "cannot commit a transaction in state rolled_back"
    );
    Ok(())
}

#[test]
fn test_lookups_mark_nodes_affected() -> Result<()> {
    let coordinator = coordinator(&["ex:a a ex:Person . ex:b a ex:Person . ex:c a ex:Robot ."])?;
    let mut txn = coordinator.begin()?;

    let people = txn.fetch_all(&ex("Person"))?;
    assert_eq!(people.len(), 2);
    assert!(txn.affected().contains(&node("a")));
    assert!(txn.affected().contains(&node("b")));
    assert!(!txn.affected().contains(&node("c")));

    assert_eq!(txn.fetch_by_id(&ex("Person"), "http://example.org/c")?, None);
    assert_matches!(
        txn.fetch_by_id(&ex("Person"), "not an iri"),
        Err(TxnError::Store(StoreError::InvalidIri { .. }))
    );
    assert_eq!(txn.state(), TransactionState::Open);
    txn.rollback()?;
    Ok(())
}

#[test]
fn test_create_with_id_marks_node_affected() -> Result<()> {
    let coordinator = coordinator(&[TEAM_SCHEMA, "ex:red a ex:Team ."])?;
    let mut txn = coordinator.begin()?;

    let bot = txn.create_with_id(&ex("Robot"), "http://example.org/bot")?;
    assert_eq!(bot, node("bot"));
    assert!(txn.affected().contains(&bot));
    assert_matches!(
        txn.create_with_id(&ex("Robot"), "not an iri"),
        Err(TxnError::Store(StoreError::InvalidIri { .. }))
    );

    txn.insert(Edge::new(node("red"), ex("member"), bot))?;
    let err = txn.commit().unwrap_err();
    assert_eq!(err.violation().unwrap().axiom, AxiomKind::AllValuesFrom);
    assert!(
        coordinator
            .repository()
            .fetch_by_id(&ex("Robot"), "http://example.org/bot")?
            .is_none()
    );
    Ok(())
}

#[test]
fn test_persist_validates_untouched_object() -> Result<()> {
    // loaded without validation: the member is not a person
    let coordinator = coordinator(&[TEAM_SCHEMA, "ex:red a ex:Team ; ex:member ex:bot ."])?;

    let mut txn = coordinator.begin()?;
    txn.commit()?;

    txn.begin()?;
    txn.persist(node("red"))?;
    assert!(txn.affected().contains(&node("red")));
    let err = txn.commit().unwrap_err();
    assert_eq!(err.violation().unwrap().axiom, AxiomKind::AllValuesFrom);
    assert_eq!(err.violation().unwrap().subject, node("red"));
    Ok(())
}

#[test]
fn test_invalid_config_is_rejected() -> Result<()> {
    let no_axioms = ValidationConfig {
        enabled_axioms: Vec::new(),
        ..ValidationConfig::default()
    };
    assert!(TransactionCoordinator::with_config(repo(&[])?, no_axioms).is_err());

    let zero_cap = ValidationConfig {
        mode: ModeSetting::CollectAll,
        max_violations: 0,
        ..ValidationConfig::default()
    };
    let err = TransactionCoordinator::with_config(repo(&[])?, zero_cap)
        .err()
        .unwrap();
    assert!(format!("{err:#}").contains("max_violations must be at least 1"));
    Ok(())
}

#[test]
fn test_check_collects_without_committing() -> Result<()> {
    let config = ValidationConfig {
        mode: ModeSetting::CollectAll,
        max_violations: 10,
        record_metrics: false,
        ..ValidationConfig::default()
    };
    let coordinator = TransactionCoordinator::with_config(repo(&[SOCIAL_SCHEMA])?, config)?;

    let mut txn = coordinator.begin()?;
    txn.insert(Edge::new(node("a"), ex("mother"), node("m1")))?;
    txn.insert(Edge::new(node("a"), ex("mother"), node("m2")))?;
    txn.insert(Edge::new(node("a"), ex("hasFriend"), node("b")))?;

    let report = txn.check()?;
    assert_eq!(report.count(AxiomKind::Functional), 1);
    assert_eq!(report.count(AxiomKind::Symmetric), 1);
    assert_eq!(report.violations.len(), 2);
    assert_eq!(txn.state(), TransactionState::Open);

    let err = txn.commit().unwrap_err();
    assert_eq!(err.violation().map(|v| v.axiom), Some(AxiomKind::Functional));
    Ok(())
}

#[test]
fn test_dropping_open_transaction_rolls_back() -> Result<()> {
    let coordinator = coordinator(&[])?;
    let edge = Edge::new(node("a"), ex("name"), Literal::from("A"));
    {
        let mut txn = coordinator.begin()?;
        txn.insert(edge.clone())?;
    }
    assert!(!coordinator.repository().contains(&edge)?);
    assert!(!coordinator.repository().in_transaction());
    Ok(())
}

// =============================================================================
// Store failures during validation
// =============================================================================

/// Repository whose queries start failing on demand.
struct FlakyRepository {
    inner: OxigraphRepository,
    fail_queries: AtomicBool,
}

impl GraphQueryFacade for FlakyRepository {
    fn evaluate(&self, query: &SelectQuery) -> Result<Vec<ResultRow>, StoreError> {
        if self.fail_queries.load(Ordering::SeqCst) {
            return Err(StoreError::Evaluation {
                query: query.to_string(),
                message: "store unavailable".to_string(),
            });
        }
        self.inner.evaluate(query)
    }
}

impl TransactionalStore for FlakyRepository {
    fn begin(&self) -> Result<(), StoreError> {
        self.inner.begin()
    }

    fn insert(&self, edge: &Edge) -> Result<bool, StoreError> {
        self.inner.insert(edge)
    }

    fn remove(&self, edge: &Edge) -> Result<bool, StoreError> {
        self.inner.remove(edge)
    }

    fn commit(&self) -> Result<(), StoreError> {
        self.inner.commit()
    }

    fn rollback(&self) -> Result<(), StoreError> {
        self.inner.rollback()
    }
}

impl ObjectMapper for FlakyRepository {
    fn create(&self, class: &NamedNode) -> Result<Node, StoreError> {
        self.inner.create(class)
    }

    fn create_with_id(&self, class: &NamedNode, id: &str) -> Result<Node, StoreError> {
        self.inner.create_with_id(class, id)
    }

    fn fetch_by_id(&self, class: &NamedNode, id: &str) -> Result<Option<Node>, StoreError> {
        self.inner.fetch_by_id(class, id)
    }

    fn fetch_all(&self, class: &NamedNode) -> Result<Vec<Node>, StoreError> {
        self.inner.fetch_all(class)
    }
}

#[test]
fn test_store_error_leaves_transaction_validating() -> Result<()> {
    let repo = Arc::new(FlakyRepository {
        inner: OxigraphRepository::new()?,
        fail_queries: AtomicBool::new(false),
    });
    let config = ValidationConfig {
        record_metrics: false,
        ..ValidationConfig::default()
    };
    let coordinator = TransactionCoordinator::with_config(Arc::clone(&repo), config)?;

    let mut txn = coordinator.begin()?;
    let edge = Edge::new(node("a"), ex("name"), Literal::from("A"));
    txn.insert(edge.clone())?;

    repo.fail_queries.store(true, Ordering::SeqCst);
    let err = txn.commit().unwrap_err();
    assert_matches!(err, TxnError::Store(StoreError::Evaluation { .. }));
    assert_eq!(err.category(), "evaluation_error");
    assert_eq!(txn.state(), TransactionState::Validating);
    assert_matches!(
        txn.insert(edge.clone()),
        Err(TxnError::InvalidState {
            state: TransactionState::Validating,
            ..
        })
    );

    txn.rollback()?;
    assert_eq!(txn.state(), TransactionState::RolledBack);
    assert!(!repo.inner.contains(&edge)?);
    Ok(())
}
