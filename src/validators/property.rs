//! Symmetric, transitive, inverseOf and subPropertyOf: axioms that require an
//! edge to exist because another one does.

use super::{ConstraintValidator, ValidationContext, anchor_values, var};
use crate::error::StoreError;
use crate::model::{AxiomKind, Node, Violation};
use crate::sparql::rows::{
    AnchorPropertyRow, MissingEdgeRow, MissingImpliedEdgeRow, TransitiveGapRow, vars,
};
use crate::sparql::{Expression, GraphPattern, PropertyPath, QueryBuilder, TermPattern};
use crate::vocab::owl;
use oxigraph::model::NamedNode;
use oxigraph::model::vocab::{rdf, rdfs};
use tracing::debug;

pub struct SymmetricValidator;

impl ConstraintValidator for SymmetricValidator {
    fn axiom(&self) -> AxiomKind {
        AxiomKind::Symmetric
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Result<Vec<Violation>, StoreError> {
        let anchor = var(vars::ANCHOR);
        let property = var(vars::PROPERTY);
        let value = var(vars::VALUE);

        let query = QueryBuilder::select()
            .distinct()
            .variables([&anchor, &property, &value])
            .pattern(anchor_values(ctx))
            .triple(&property, rdf::TYPE, owl::SYMMETRIC_PROPERTY)
            .triple(&anchor, &property, &value)
            .filter(Expression::NotExists(vec![GraphPattern::triple(
                &value, &property, &anchor,
            )]))
            .limit_opt(ctx.row_limit())
            .build()?;

        let rows: Vec<MissingEdgeRow> = ctx.query(&query)?;
        let violations = rows
            .into_iter()
            .map(|row| {
                let message = format!(
                    "{} {} {} holds but the symmetric edge {} {} {} is missing",
                    row.anchor, row.property, row.value, row.value, row.property, row.anchor
                );
                Violation::new(AxiomKind::Symmetric, row.property, row.anchor, message)
                    .with_related(row.value)
            })
            .collect();
        Ok(ctx.finish(violations))
    }
}

/// Checked one `(anchor, property)` pair at a time: the path query is bound
/// to a concrete start node and predicate.
pub struct TransitiveValidator;

impl TransitiveValidator {
    fn outgoing_transitive(
        ctx: &ValidationContext<'_>,
    ) -> Result<Vec<AnchorPropertyRow>, StoreError> {
        let anchor = var(vars::ANCHOR);
        let property = var(vars::PROPERTY);
        let query = QueryBuilder::select()
            .distinct()
            .variables([&anchor, &property])
            .pattern(anchor_values(ctx))
            .triple(&property, rdf::TYPE, owl::TRANSITIVE_PROPERTY)
            .triple(&anchor, &property, var(vars::VALUE))
            .build()?;
        ctx.query(&query)
    }

    fn gaps(
        ctx: &ValidationContext<'_>,
        start: &NamedNode,
        property: &NamedNode,
    ) -> Result<Vec<TransitiveGapRow>, StoreError> {
        let intermediate = var(vars::INTERMEDIATE);
        let target = var(vars::TARGET);
        let start = TermPattern::from(start);
        let closure = || PropertyPath::predicate(property.clone()).one_or_more();

        let query = QueryBuilder::select()
            .distinct()
            .variables([&intermediate, &target])
            .triple(start.clone(), closure(), &intermediate)
            .triple(&intermediate, closure(), &target)
            .filter(Expression::NotExists(vec![GraphPattern::triple(
                start, property, &target,
            )]))
            .limit_opt(ctx.row_limit())
            .build()?;
        ctx.query(&query)
    }
}

impl ConstraintValidator for TransitiveValidator {
    fn axiom(&self) -> AxiomKind {
        AxiomKind::Transitive
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Result<Vec<Violation>, StoreError> {
        let pairs = Self::outgoing_transitive(ctx)?;
        debug!(pairs = pairs.len(), "transitive (anchor, property) pairs");

        let mut violations = Vec::new();
        for pair in pairs {
            let Node::Iri(start) = &pair.anchor else {
                continue;
            };
            for gap in Self::gaps(ctx, start, &pair.property)? {
                let message = format!(
                    "{} reaches {} through {} over transitive property {} but has no direct edge",
                    pair.anchor, gap.target, gap.intermediate, pair.property
                );
                violations.push(
                    Violation::new(
                        AxiomKind::Transitive,
                        pair.property.clone(),
                        pair.anchor.clone(),
                        message,
                    )
                    .with_related(gap.intermediate)
                    .with_related(gap.target),
                );
            }
            if violations.len() >= ctx.mode.max_violations() {
                break;
            }
        }
        Ok(ctx.finish(violations))
    }
}

pub struct InverseOfValidator;

impl ConstraintValidator for InverseOfValidator {
    fn axiom(&self) -> AxiomKind {
        AxiomKind::InverseOf
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Result<Vec<Violation>, StoreError> {
        let anchor = var(vars::ANCHOR);
        let property = var(vars::PROPERTY);
        let implied = var(vars::IMPLIED);
        let value = var(vars::VALUE);

        // owl:inverseOf is symmetric: either declaration direction counts
        let query = QueryBuilder::select()
            .distinct()
            .variables([&anchor, &property, &implied, &value])
            .pattern(anchor_values(ctx))
            .union(vec![
                vec![GraphPattern::triple(&property, owl::INVERSE_OF, &implied)],
                vec![GraphPattern::triple(&implied, owl::INVERSE_OF, &property)],
            ])
            .triple(&anchor, &property, &value)
            .filter(Expression::NotExists(vec![GraphPattern::triple(
                &value, &implied, &anchor,
            )]))
            .limit_opt(ctx.row_limit())
            .build()?;

        let rows: Vec<MissingImpliedEdgeRow> = ctx.query(&query)?;
        let violations = rows
            .into_iter()
            .map(|row| {
                let message = format!(
                    "{} {} {} holds but the inverse edge {} {} {} is missing",
                    row.anchor, row.property, row.value, row.value, row.implied, row.anchor
                );
                Violation::new(AxiomKind::InverseOf, row.property, row.anchor, message)
                    .with_related(row.value)
                    .with_related(row.implied)
            })
            .collect();
        Ok(ctx.finish(violations))
    }
}

pub struct SubPropertyOfValidator;

impl ConstraintValidator for SubPropertyOfValidator {
    fn axiom(&self) -> AxiomKind {
        AxiomKind::SubPropertyOf
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Result<Vec<Violation>, StoreError> {
        let anchor = var(vars::ANCHOR);
        let property = var(vars::PROPERTY);
        let implied = var(vars::IMPLIED);
        let value = var(vars::VALUE);

        let query = QueryBuilder::select()
            .distinct()
            .variables([&anchor, &property, &implied, &value])
            .pattern(anchor_values(ctx))
            .triple(&anchor, &property, &value)
            .triple(
                &property,
                PropertyPath::predicate(rdfs::SUB_PROPERTY_OF).one_or_more(),
                &implied,
            )
            .filter(Expression::NotExists(vec![GraphPattern::triple(
                &anchor, &implied, &value,
            )]))
            .limit_opt(ctx.row_limit())
            .build()?;

        let rows: Vec<MissingImpliedEdgeRow> = ctx.query(&query)?;
        let violations = rows
            .into_iter()
            .map(|row| {
                let message = format!(
                    "{} {} {} holds but the implied super-property edge via {} is missing",
                    row.anchor, row.property, row.value, row.implied
                );
                Violation::new(AxiomKind::SubPropertyOf, row.property, row.anchor, message)
                    .with_related(row.value)
                    .with_related(row.implied)
            })
            .collect();
        Ok(ctx.finish(violations))
    }
}
