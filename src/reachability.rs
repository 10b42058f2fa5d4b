//! Anchor computation: everything connected to the affected nodes.

use crate::error::StoreError;
use crate::model::{AffectedSet, AnchorSet};
use crate::sparql::rows::{NodeRow, vars};
use crate::sparql::{
    Expression, NegatedPredicate, PropertyPath, QueryBuilder, SelectQuery, Variable,
};
use crate::store::{GraphQueryFacade, query_as};
use crate::vocab::NO_PREDICATE;
use oxigraph::model::{NamedNode, Term};
use tracing::debug;

/// Expands an [`AffectedSet`] into its [`AnchorSet`].
pub struct ReachabilityAnalyzer<'a, F: GraphQueryFacade + ?Sized> {
    facade: &'a F,
}

impl<'a, F: GraphQueryFacade + ?Sized> ReachabilityAnalyzer<'a, F> {
    pub fn new(facade: &'a F) -> Self {
        Self { facade }
    }

    /// All IRI nodes connected to an affected node by a path of any length
    /// over edges of any predicate, followed in either direction. The
    /// affected nodes are always part of the result; blank nodes among them
    /// are kept but cannot seed the traversal.
    pub fn reachable(&self, affected: &AffectedSet) -> Result<AnchorSet, StoreError> {
        if affected.is_empty() {
            return Ok(AnchorSet::new());
        }

        let mut anchors: AnchorSet = affected.iter().cloned().collect();
        let seeds: Vec<NamedNode> = anchors.iri_vec();
        let skipped = anchors.len() - seeds.len();
        if skipped > 0 {
            debug!(skipped, "blank affected nodes do not seed reachability");
        }
        if seeds.is_empty() {
            return Ok(anchors);
        }

        let rows: Vec<NodeRow> = query_as(self.facade, &closure_query(seeds)?)?;
        for row in rows {
            anchors.insert(row.node);
        }

        debug!(
            affected = affected.len(),
            anchors = anchors.len(),
            "computed anchor set"
        );
        Ok(anchors)
    }
}

/// A negated property set over a predicate that never occurs matches every
/// edge; with both directions negated it walks the graph undirected.
pub(crate) fn any_edge() -> PropertyPath {
    let none = NO_PREDICATE.into_owned();
    PropertyPath::NegatedSet(vec![
        NegatedPredicate::Forward(none.clone()),
        NegatedPredicate::Inverse(none),
    ])
}

fn closure_query(seeds: Vec<NamedNode>) -> Result<SelectQuery, StoreError> {
    let seed = Variable::new(vars::ANCHOR);
    let node = Variable::new(vars::NODE);
    Ok(QueryBuilder::select()
        .distinct()
        .variable(&node)
        .values(&seed, seeds.into_iter().map(Term::from))
        .triple(&seed, any_edge().zero_or_more(), &node)
        .filter(Expression::IsIri(node.clone()))
        .build()?)
}

/// Whether `anchors` is closed: every neighbour of an anchor is an anchor.
pub fn is_closed<F: GraphQueryFacade + ?Sized>(
    facade: &F,
    anchors: &AnchorSet,
) -> Result<bool, StoreError> {
    let seeds = anchors.iri_vec();
    if seeds.is_empty() {
        return Ok(true);
    }
    let rows: Vec<NodeRow> = query_as(facade, &closure_query(seeds)?)?;
    Ok(rows.iter().all(|row| anchors.contains(&row.node)))
}
