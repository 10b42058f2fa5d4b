//! SPARQL query construction and typed result extraction
//!
//! - [`query`]: declarative SELECT queries checked before rendering
//! - [`typed_binding`]: result rows and typed access to their bindings
//! - [`result_mapper`]: mapping rows onto row structs
//! - [`rows`]: the row structs used by validators and schema introspection

pub mod query;
pub mod result_mapper;
pub mod rows;
pub mod typed_binding;

pub use query::{
    Expression, GraphPattern, NegatedPredicate, Projection, PropertyPath, QueryBuildError,
    QueryBuilder, SelectQuery, TermPattern, TriplePattern, Variable, Verb,
};
pub use result_mapper::{FromSparql, MappingError, ResultMapper};
pub use typed_binding::{BindingError, ResultRow, TypedBinding};
