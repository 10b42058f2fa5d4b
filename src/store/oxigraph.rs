//! In-memory repository on top of an oxigraph [`Store`].
//!
//! Mutations are applied to the store immediately so that queries issued
//! during validation see the transaction's own changes. Each applied change
//! is journaled; rollback replays the journal backwards.

use super::journal::{Change, ChangeJournal};
use super::{GraphQueryFacade, ObjectMapper, TransactionalStore, query_as};
use crate::error::StoreError;
use crate::model::{Edge, Node};
use crate::sparql::rows::{NodeRow, vars};
use crate::sparql::{QueryBuilder, ResultRow, SelectQuery, Variable};
use crate::vocab::MINTED_IRI_PREFIX;
use oxigraph::io::RdfFormat;
use oxigraph::model::vocab::rdf;
use oxigraph::model::{GraphName, NamedNode, Quad, Term};
use oxigraph::sparql::QueryResults;
use oxigraph::store::{StorageError, Store};
use parking_lot::Mutex;
use tracing::{debug, trace};
use uuid::Uuid;

pub struct OxigraphRepository {
    store: Store,
    journal: Mutex<Option<ChangeJournal>>,
}

impl OxigraphRepository {
    pub fn new() -> Result<Self, StoreError> {
        let store = Store::new().map_err(|e| StoreError::Storage(e.to_string()))?;
        Ok(Self {
            store,
            journal: Mutex::new(None),
        })
    }

    /// Repository pre-loaded with a Turtle document.
    pub fn from_turtle(turtle: &str) -> Result<Self, StoreError> {
        let repo = Self::new()?;
        repo.load_turtle(turtle)?;
        Ok(repo)
    }

    /// Load Turtle into the default graph. Only allowed outside transactions,
    /// since loaded data is not journaled.
    pub fn load_turtle(&self, turtle: &str) -> Result<(), StoreError> {
        if self.journal.lock().is_some() {
            return Err(StoreError::TransactionActive);
        }
        self.store
            .load_from_reader(RdfFormat::Turtle, turtle.as_bytes())
            .map_err(|e| StoreError::Storage(format!("Failed to load Turtle: {}", e)))?;
        debug!(bytes = turtle.len(), "loaded turtle");
        Ok(())
    }

    pub fn contains(&self, edge: &Edge) -> Result<bool, StoreError> {
        self.store
            .contains(&edge.to_quad())
            .map_err(|e| StoreError::Storage(e.to_string()))
    }

    /// Number of triples in the store.
    pub fn len(&self) -> Result<usize, StoreError> {
        self.store
            .len()
            .map_err(|e| StoreError::Storage(e.to_string()))
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    pub fn in_transaction(&self) -> bool {
        self.journal.lock().is_some()
    }

    /// Apply a change and journal it if the store actually changed.
    fn apply(&self, change: Change) -> Result<bool, StoreError> {
        let mut guard = self.journal.lock();
        let journal = guard.as_mut().ok_or(StoreError::NoActiveTransaction)?;
        let changed = self.apply_unjournaled(&change)?;
        if changed {
            journal.record(change);
        }
        Ok(changed)
    }

    /// Write `change` unless the store is already in the target state.
    /// Returns whether anything was written.
    fn apply_unjournaled(&self, change: &Change) -> Result<bool, StoreError> {
        let storage = |e: StorageError| StoreError::Storage(e.to_string());
        match change {
            Change::Inserted(quad) => {
                if self.store.contains(quad).map_err(storage)? {
                    return Ok(false);
                }
                self.store.insert(quad).map_err(storage)?;
            }
            Change::Removed(quad) => {
                if !self.store.contains(quad).map_err(storage)? {
                    return Ok(false);
                }
                self.store.remove(quad).map_err(storage)?;
            }
        }
        Ok(true)
    }

    fn typed_insert(&self, node: NamedNode, class: &NamedNode) -> Result<Node, StoreError> {
        let quad = Quad::new(
            node.clone(),
            rdf::TYPE,
            class.clone(),
            GraphName::DefaultGraph,
        );
        self.apply(Change::Inserted(quad))?;
        Ok(Node::Iri(node))
    }

    fn typed_nodes(&self, class: &NamedNode, id: Option<NamedNode>) -> Result<Vec<Node>, StoreError> {
        let node = Variable::new(vars::NODE);
        let mut builder = QueryBuilder::select().distinct().variable(&node);
        if let Some(iri) = id {
            builder = builder.values(&node, [Term::from(iri)]).limit(1);
        }
        let query = builder.triple(&node, rdf::TYPE, class).build()?;
        let rows: Vec<NodeRow> = query_as(self, &query)?;
        Ok(rows.into_iter().map(|row| row.node).collect())
    }
}

impl GraphQueryFacade for OxigraphRepository {
    fn evaluate(&self, query: &SelectQuery) -> Result<Vec<ResultRow>, StoreError> {
        let text = query.to_string();
        trace!(query = %text, "evaluating query");

        let evaluation_error = |message: String| StoreError::Evaluation {
            query: text.clone(),
            message,
        };

        #[allow(deprecated)]
        let results = self
            .store
            .query(text.as_str())
            .map_err(|e| evaluation_error(e.to_string()))?;

        let QueryResults::Solutions(solutions) = results else {
            return Err(evaluation_error(
                "SELECT query did not produce solutions".to_string(),
            ));
        };

        let mut rows = Vec::new();
        for solution in solutions {
            let solution = solution.map_err(|e| evaluation_error(e.to_string()))?;
            let mut row = ResultRow::new();
            for column in query.columns() {
                if let Some(term) = solution.get(column.as_str()) {
                    row.insert(column.as_str(), term.clone());
                }
            }
            rows.push(row);
        }
        Ok(rows)
    }
}

impl TransactionalStore for OxigraphRepository {
    fn begin(&self) -> Result<(), StoreError> {
        let mut guard = self.journal.lock();
        if guard.is_some() {
            return Err(StoreError::TransactionActive);
        }
        *guard = Some(ChangeJournal::new());
        Ok(())
    }

    fn insert(&self, edge: &Edge) -> Result<bool, StoreError> {
        self.apply(Change::Inserted(edge.to_quad()))
    }

    fn remove(&self, edge: &Edge) -> Result<bool, StoreError> {
        self.apply(Change::Removed(edge.to_quad()))
    }

    fn commit(&self) -> Result<(), StoreError> {
        let journal = self
            .journal
            .lock()
            .take()
            .ok_or(StoreError::NoActiveTransaction)?;
        debug!(changes = journal.len(), "store transaction committed");
        Ok(())
    }

    fn rollback(&self) -> Result<(), StoreError> {
        let mut guard = self.journal.lock();
        let journal = guard.as_mut().ok_or(StoreError::NoActiveTransaction)?;
        // On failure the entries not yet undone stay journaled for a retry.
        let changes = journal.unwind(|undo| self.apply_unjournaled(undo).map(|_| ()))?;
        *guard = None;
        debug!(changes, "store transaction rolled back");
        Ok(())
    }
}

impl ObjectMapper for OxigraphRepository {
    fn create(&self, class: &NamedNode) -> Result<Node, StoreError> {
        let iri = format!("{}{}", MINTED_IRI_PREFIX, Uuid::new_v4());
        self.typed_insert(parse_iri(&iri)?, class)
    }

    fn create_with_id(&self, class: &NamedNode, id: &str) -> Result<Node, StoreError> {
        self.typed_insert(parse_iri(id)?, class)
    }

    fn fetch_by_id(&self, class: &NamedNode, id: &str) -> Result<Option<Node>, StoreError> {
        Ok(self.typed_nodes(class, Some(parse_iri(id)?))?.into_iter().next())
    }

    fn fetch_all(&self, class: &NamedNode) -> Result<Vec<Node>, StoreError> {
        self.typed_nodes(class, None)
    }
}

fn parse_iri(iri: &str) -> Result<NamedNode, StoreError> {
    NamedNode::new(iri).map_err(|e| StoreError::InvalidIri {
        iri: iri.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use oxigraph::model::Literal;

    fn nn(iri: &str) -> NamedNode {
        NamedNode::new(iri).unwrap()
    }

    fn edge(value: &str) -> Edge {
        Edge::new(
            nn("http://example.org/s"),
            nn("http://example.org/p"),
            Literal::new_simple_literal(value),
        )
    }

    #[test]
    fn test_rollback_restores_previous_state() {
        let repo = OxigraphRepository::new().unwrap();
        repo.begin().unwrap();
        repo.insert(&edge("kept")).unwrap();
        repo.commit().unwrap();

        repo.begin().unwrap();
        assert!(repo.insert(&edge("new")).unwrap());
        assert!(repo.remove(&edge("kept")).unwrap());
        assert!(repo.contains(&edge("new")).unwrap());
        repo.rollback().unwrap();

        assert!(repo.contains(&edge("kept")).unwrap());
        assert!(!repo.contains(&edge("new")).unwrap());
        assert_eq!(repo.len().unwrap(), 1);
    }

    #[test]
    fn test_redundant_changes_are_not_journaled() {
        let repo = OxigraphRepository::new().unwrap();
        repo.begin().unwrap();
        repo.insert(&edge("a")).unwrap();
        repo.commit().unwrap();

        repo.begin().unwrap();
        assert!(!repo.insert(&edge("a")).unwrap());
        assert!(!repo.remove(&edge("absent")).unwrap());
        assert!(repo.remove(&edge("a")).unwrap());
        assert!(!repo.remove(&edge("a")).unwrap());
        repo.rollback().unwrap();

        // re-inserting an existing edge must not delete it on rollback
        assert!(repo.contains(&edge("a")).unwrap());
        assert!(!repo.contains(&edge("absent")).unwrap());
        assert_eq!(repo.len().unwrap(), 1);
        assert!(!repo.in_transaction());
    }

    #[test]
    fn test_single_writer() {
        let repo = OxigraphRepository::new().unwrap();
        repo.begin().unwrap();
        assert_matches!(repo.begin(), Err(StoreError::TransactionActive));
        assert_matches!(repo.load_turtle(""), Err(StoreError::TransactionActive));
        repo.commit().unwrap();
        assert_matches!(repo.commit(), Err(StoreError::NoActiveTransaction));
        assert_matches!(repo.insert(&edge("x")), Err(StoreError::NoActiveTransaction));
    }

    #[test]
    fn test_object_mapping() {
        let person = nn("http://example.org/Person");
        let repo = OxigraphRepository::from_turtle(
            "<http://example.org/alice> a <http://example.org/Person> .",
        )
        .unwrap();

        repo.begin().unwrap();
        let created = repo.create(&person).unwrap();
        assert!(created.to_string().starts_with("<urn:uuid:"));

        let all = repo.fetch_all(&person).unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.contains(&created));

        let alice = repo.fetch_by_id(&person, "http://example.org/alice").unwrap();
        assert_eq!(alice, Some(Node::Iri(nn("http://example.org/alice"))));
        assert_eq!(repo.fetch_by_id(&person, "http://example.org/bob").unwrap(), None);
        assert_matches!(
            repo.fetch_by_id(&person, "not an iri"),
            Err(StoreError::InvalidIri { .. })
        );

        repo.rollback().unwrap();
        assert_eq!(repo.fetch_all(&person).unwrap().len(), 1);
    }

    #[test]
    fn test_create_with_caller_supplied_id() {
        let person = nn("http://example.org/Person");
        let repo = OxigraphRepository::from_turtle(
            "<http://example.org/alice> a <http://example.org/Person> .",
        )
        .unwrap();

        repo.begin().unwrap();
        let bob = repo.create_with_id(&person, "http://example.org/bob").unwrap();
        assert_eq!(bob, Node::Iri(nn("http://example.org/bob")));
        let alice = repo.create_with_id(&person, "http://example.org/alice").unwrap();
        assert_eq!(alice, Node::Iri(nn("http://example.org/alice")));
        assert_matches!(
            repo.create_with_id(&person, "not an iri"),
            Err(StoreError::InvalidIri { .. })
        );
        repo.rollback().unwrap();

        // alice was already typed, so rolling back must keep her
        let all = repo.fetch_all(&person).unwrap();
        assert_eq!(all, vec![Node::Iri(nn("http://example.org/alice"))]);
    }
}
