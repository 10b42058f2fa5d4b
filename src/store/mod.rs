//! Store boundary
//!
//! The validation and transaction layers only talk to the store through the
//! traits below. [`oxigraph::OxigraphRepository`] implements all of them over
//! an in-memory oxigraph store.

pub mod journal;
pub mod oxigraph;

use crate::error::StoreError;
use crate::model::{Edge, Node};
use crate::sparql::{FromSparql, ResultMapper, ResultRow, SelectQuery};
use ::oxigraph::model::NamedNode;

pub use self::journal::{Change, ChangeJournal};
pub use self::oxigraph::OxigraphRepository;

/// Pattern-matching query access to the current graph state, including
/// changes made by the active transaction.
pub trait GraphQueryFacade {
    /// Evaluate a SELECT query; rows come back in engine order.
    fn evaluate(&self, query: &SelectQuery) -> Result<Vec<ResultRow>, StoreError>;
}

/// Transaction control of the underlying store.
pub trait TransactionalStore {
    fn begin(&self) -> Result<(), StoreError>;

    /// Returns `true` if the edge was not present before.
    fn insert(&self, edge: &Edge) -> Result<bool, StoreError>;

    /// Returns `true` if the edge was present before.
    fn remove(&self, edge: &Edge) -> Result<bool, StoreError>;

    fn commit(&self) -> Result<(), StoreError>;

    fn rollback(&self) -> Result<(), StoreError>;
}

/// Domain-object view of the store: objects are nodes typed with a class.
pub trait ObjectMapper {
    /// Create a fresh node of type `class`.
    fn create(&self, class: &NamedNode) -> Result<Node, StoreError>;

    /// Type the node with IRI `id` as `class`. An existing typing is kept
    /// as is.
    fn create_with_id(&self, class: &NamedNode, id: &str) -> Result<Node, StoreError>;

    /// Look up the node with IRI `id`, if it is typed `class`.
    fn fetch_by_id(&self, class: &NamedNode, id: &str) -> Result<Option<Node>, StoreError>;

    /// All nodes typed `class`.
    fn fetch_all(&self, class: &NamedNode) -> Result<Vec<Node>, StoreError>;
}

/// Everything a transaction needs from a store.
pub trait Repository: GraphQueryFacade + TransactionalStore + ObjectMapper {}

impl<T> Repository for T where T: GraphQueryFacade + TransactionalStore + ObjectMapper {}

/// Evaluate `query` and map every row onto `T`.
pub fn query_as<T, F>(facade: &F, query: &SelectQuery) -> Result<Vec<T>, StoreError>
where
    T: FromSparql,
    F: GraphQueryFacade + ?Sized,
{
    let rows = facade.evaluate(query)?;
    Ok(ResultMapper::map_many(&rows)?)
}
