//! Functional and inverse-functional properties.
//!
//! Two values (or two subjects) only conflict when they are different terms
//! and neither reaches the other over `owl:sameAs+`.

use super::{ConstraintValidator, ValidationContext, anchor_values, not_same_as, var};
use crate::error::StoreError;
use crate::model::{AxiomKind, Violation};
use crate::sparql::rows::{FunctionalConflictRow, SharedValueRow, vars};
use crate::sparql::{Expression, GraphPattern, QueryBuilder};
use crate::vocab::owl;
use oxigraph::model::Term;
use oxigraph::model::vocab::rdf;
use std::collections::HashSet;

/// Order-independent key of a term pair.
fn unordered(a: &Term, b: &Term) -> (String, String) {
    let (a, b) = (a.to_string(), b.to_string());
    if a <= b { (a, b) } else { (b, a) }
}

/// Rows come back twice per conflict (`v1,v2` and `v2,v1`), so the row limit
/// is doubled.
fn pair_limit(ctx: &ValidationContext<'_>) -> Option<usize> {
    ctx.row_limit().map(|n| n.saturating_mul(2))
}

pub struct FunctionalValidator;

impl ConstraintValidator for FunctionalValidator {
    fn axiom(&self) -> AxiomKind {
        AxiomKind::Functional
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Result<Vec<Violation>, StoreError> {
        let anchor = var(vars::ANCHOR);
        let property = var(vars::PROPERTY);
        let value = var(vars::VALUE);
        let other_value = var(vars::OTHER_VALUE);

        let query = QueryBuilder::select()
            .distinct()
            .variables([&anchor, &property, &value, &other_value])
            .pattern(anchor_values(ctx))
            .triple(&property, rdf::TYPE, owl::FUNCTIONAL_PROPERTY)
            .triple(&anchor, &property, &value)
            .triple(&anchor, &property, &other_value)
            .filter(Expression::same_term(&value, &other_value).negate())
            .patterns(not_same_as(&value, &other_value))
            .limit_opt(pair_limit(ctx))
            .build()?;

        let rows: Vec<FunctionalConflictRow> = ctx.query(&query)?;
        let mut seen = HashSet::new();
        let mut violations = Vec::new();
        for row in rows {
            let key = (
                row.anchor.clone(),
                row.property.clone(),
                unordered(&row.value, &row.other_value),
            );
            if !seen.insert(key) {
                continue;
            }
            let message = format!(
                "{} has two distinct values for functional property {}: {} and {}",
                row.anchor, row.property, row.value, row.other_value
            );
            violations.push(
                Violation::new(AxiomKind::Functional, row.property, row.anchor, message)
                    .with_related(row.value)
                    .with_related(row.other_value),
            );
        }
        Ok(ctx.finish(violations))
    }
}

pub struct InverseFunctionalValidator;

impl ConstraintValidator for InverseFunctionalValidator {
    fn axiom(&self) -> AxiomKind {
        AxiomKind::InverseFunctional
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Result<Vec<Violation>, StoreError> {
        let anchor = var(vars::ANCHOR);
        let property = var(vars::PROPERTY);
        let other = var(vars::OTHER);
        let value = var(vars::VALUE);

        let query = QueryBuilder::select()
            .distinct()
            .variables([&anchor, &property, &other, &value])
            .pattern(anchor_values(ctx))
            .triple(&property, rdf::TYPE, owl::INVERSE_FUNCTIONAL_PROPERTY)
            .triple(&anchor, &property, &value)
            .pattern(GraphPattern::triple(&other, &property, &value))
            .filter(Expression::same_term(&anchor, &other).negate())
            .patterns(not_same_as(&anchor, &other))
            .limit_opt(pair_limit(ctx))
            .build()?;

        let rows: Vec<SharedValueRow> = ctx.query(&query)?;
        let mut seen = HashSet::new();
        let mut violations = Vec::new();
        for row in rows {
            let key = (
                row.property.clone(),
                row.value.to_string(),
                unordered(
                    &Term::from(row.anchor.clone()),
                    &Term::from(row.other.clone()),
                ),
            );
            if !seen.insert(key) {
                continue;
            }
            let message = format!(
                "{} and {} share the value {} of inverse-functional property {}",
                row.anchor, row.other, row.value, row.property
            );
            violations.push(
                Violation::new(
                    AxiomKind::InverseFunctional,
                    row.property,
                    row.anchor,
                    message,
                )
                .with_related(row.other)
                .with_related(row.value),
            );
        }
        Ok(ctx.finish(violations))
    }
}
