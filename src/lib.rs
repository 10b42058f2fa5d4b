pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod reachability;
pub mod schema;
pub mod sparql;
pub mod store;
pub mod transaction;
pub mod validators;
pub mod vocab;

pub use config::{ModeSetting, ValidationConfig};
pub use error::{StoreError, TxnError};
pub use logging::{LoggingConfig, init_logging};
pub use metrics::METRICS;
pub use model::{
    AffectedSet, AnchorSet, AxiomKind, Edge, Node, PropertyCharacteristic, Restriction,
    RestrictionKind, Value, Violation,
};
pub use reachability::ReachabilityAnalyzer;
pub use schema::SchemaInspector;
pub use store::{GraphQueryFacade, ObjectMapper, OxigraphRepository, Repository, TransactionalStore};
pub use transaction::{CommitReceipt, Transaction, TransactionCoordinator, TransactionState};
pub use validators::{ConstraintValidator, ValidationMode, ValidationReport, ValidatorChain};
