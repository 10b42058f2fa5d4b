//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use anyhow::Result;
use oxigraph::model::NamedNode;
use owl_guard::{Node, OxigraphRepository, TransactionCoordinator, ValidationConfig};
use std::sync::Arc;

pub const PREFIXES: &str = r#"
@prefix ex: <http://example.org/> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
@prefix xsd: <http://www.w3.org/2001/XMLSchema#> .
"#;

/// `hasFriend` is symmetric, `mother` functional.
pub const SOCIAL_SCHEMA: &str = r#"
ex:hasFriend a owl:SymmetricProperty .
ex:mother a owl:FunctionalProperty .
ex:email a owl:InverseFunctionalProperty .
"#;

/// Teams may only have persons as members.
pub const TEAM_SCHEMA: &str = r#"
ex:Team rdfs:subClassOf [
    a owl:Restriction ;
    owl:onProperty ex:member ;
    owl:allValuesFrom ex:Person
] .
ex:Employee rdfs:subClassOf ex:Person .
"#;

/// Parents need two children; a garage holds at most one car.
pub const CARDINALITY_SCHEMA: &str = r#"
ex:Parent rdfs:subClassOf [
    a owl:Restriction ;
    owl:onProperty ex:child ;
    owl:minCardinality "2"^^xsd:nonNegativeInteger
] .
ex:Garage rdfs:subClassOf [
    a owl:Restriction ;
    owl:onProperty ex:holds ;
    owl:maxCardinality "1"^^xsd:nonNegativeInteger ;
    owl:onClass ex:Car
] .
ex:SportsCar rdfs:subClassOf ex:Car .
"#;

pub fn ex(name: &str) -> NamedNode {
    NamedNode::new(format!("http://example.org/{name}")).unwrap()
}

pub fn node(name: &str) -> Node {
    Node::Iri(ex(name))
}

/// Repository holding the prefixed Turtle documents.
pub fn repo(documents: &[&str]) -> Result<Arc<OxigraphRepository>> {
    let repo = OxigraphRepository::new()?;
    for document in documents {
        repo.load_turtle(&format!("{PREFIXES}{document}"))?;
    }
    Ok(Arc::new(repo))
}

/// Coordinator that leaves the global metrics alone.
pub fn coordinator(documents: &[&str]) -> Result<TransactionCoordinator<OxigraphRepository>> {
    let config = ValidationConfig {
        record_metrics: false,
        ..ValidationConfig::default()
    };
    TransactionCoordinator::with_config(repo(documents)?, config)
}
