//! Anchor sets computed from transaction mutations.

mod support;

use anyhow::Result;
use oxigraph::model::Literal;
use owl_guard::{AffectedSet, Edge, ReachabilityAnalyzer, reachability::is_closed};
use support::{SOCIAL_SCHEMA, TEAM_SCHEMA, coordinator, ex, node, repo};

#[test]
fn test_closure_passes_through_blank_nodes() -> Result<()> {
    let repo = repo(&[TEAM_SCHEMA, "ex:t a ex:Team . ex:loner a ex:Hermit ."])?;
    let affected: AffectedSet = [node("t")].into_iter().collect();
    let anchors = ReachabilityAnalyzer::new(repo.as_ref()).reachable(&affected)?;

    // t -> Team -> [restriction] -> member / Person
    assert!(anchors.contains(&node("Team")));
    assert!(anchors.contains(&node("member")));
    assert!(anchors.contains(&node("Person")));
    assert!(anchors.contains(&node("Employee")));
    assert!(!anchors.contains(&node("loner")));
    assert!(anchors.iter().all(|n| n.is_iri()));
    assert!(is_closed(repo.as_ref(), &anchors)?);
    Ok(())
}

#[test]
fn test_disconnected_affected_nodes_keep_separate_components() -> Result<()> {
    let repo = repo(&["ex:a ex:knows ex:b . ex:c ex:knows ex:d . ex:e ex:knows ex:f ."])?;
    let affected: AffectedSet = [node("a"), node("d")].into_iter().collect();
    let anchors = ReachabilityAnalyzer::new(repo.as_ref()).reachable(&affected)?;

    assert_eq!(anchors.len(), 4);
    for name in ["a", "b", "c", "d"] {
        assert!(anchors.contains(&node(name)), "{name} missing");
    }
    assert!(!anchors.contains(&node("e")));
    Ok(())
}

#[test]
fn test_literal_objects_are_not_anchors() -> Result<()> {
    let repo = repo(&["ex:a ex:name \"Ann\" ; ex:age 41 ; ex:knows ex:b ."])?;
    let affected: AffectedSet = [node("a")].into_iter().collect();
    let anchors = ReachabilityAnalyzer::new(repo.as_ref()).reachable(&affected)?;

    assert_eq!(anchors.len(), 2);
    assert!(anchors.contains(&node("a")));
    assert!(anchors.contains(&node("b")));
    assert!(anchors.iter().all(|n| n.is_iri()));
    Ok(())
}

#[test]
fn test_literal_edge_only_anchors_its_subject() -> Result<()> {
    // b is invalid but unrelated to the new edge
    let coordinator = coordinator(&[SOCIAL_SCHEMA, "ex:b ex:mother ex:m1, ex:m2 ."])?;

    let mut txn = coordinator.begin()?;
    txn.insert(Edge::new(node("a"), ex("name"), Literal::from("Ann")))?;
    assert_eq!(txn.affected().len(), 1);
    let receipt = txn.commit()?;
    assert_eq!(receipt.anchors, 1);
    Ok(())
}
