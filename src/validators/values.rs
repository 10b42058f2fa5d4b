//! Value restrictions: `owl:allValuesFrom` and `owl:someValuesFrom`.
//!
//! Class membership follows `rdf:type/rdfs:subClassOf*`, so an instance of a
//! subclass satisfies a restriction on its superclass.

use super::{
    ConstraintValidator, ValidationContext, anchor_values, instance_of, restriction_on_property,
    var,
};
use crate::error::StoreError;
use crate::model::{AxiomKind, Violation};
use crate::sparql::rows::{ForeignValueRow, SomeValuesCountRow, vars};
use crate::sparql::{Expression, GraphPattern, QueryBuilder};
use crate::vocab::owl;
use oxigraph::model::Term;

pub struct AllValuesFromValidator;

impl ConstraintValidator for AllValuesFromValidator {
    fn axiom(&self) -> AxiomKind {
        AxiomKind::AllValuesFrom
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Result<Vec<Violation>, StoreError> {
        let anchor = var(vars::ANCHOR);
        let property = var(vars::PROPERTY);
        let class = var(vars::CLASS);
        let value = var(vars::VALUE);

        let query = QueryBuilder::select()
            .distinct()
            .variables([&anchor, &property, &class, &value])
            .pattern(anchor_values(ctx))
            .patterns(restriction_on_property())
            .triple(var(vars::RESTRICTION), owl::ALL_VALUES_FROM, &class)
            .triple(&anchor, &property, &value)
            .filter(Expression::NotExists(vec![instance_of(&value, &class)]))
            .limit_opt(ctx.row_limit())
            .build()?;

        let rows: Vec<ForeignValueRow> = ctx.query(&query)?;
        let violations = rows
            .into_iter()
            .map(|row| {
                let message = format!(
                    "value {} of {} on {} is not an instance of {}",
                    row.value, row.property, row.anchor, row.class
                );
                Violation::new(AxiomKind::AllValuesFrom, row.property, row.anchor, message)
                    .with_related(row.value)
                    .with_related(row.class)
            })
            .collect();
        Ok(ctx.finish(violations))
    }
}

/// Anchors with no value of the property at all are left alone; only a
/// non-empty value set without a single instance of the class is reported.
pub struct SomeValuesFromValidator;

impl ConstraintValidator for SomeValuesFromValidator {
    fn axiom(&self) -> AxiomKind {
        AxiomKind::SomeValuesFrom
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Result<Vec<Violation>, StoreError> {
        let anchor = var(vars::ANCHOR);
        let property = var(vars::PROPERTY);
        let class = var(vars::CLASS);
        let value = var(vars::VALUE);
        let matched = var(vars::MATCH);

        // Aggregated rows are not violations one-to-one, so no LIMIT here.
        let query = QueryBuilder::select()
            .variables([&anchor, &property, &class])
            .count(true, &value, &var(vars::TOTAL))
            .count(true, &matched, &var(vars::MATCHING))
            .pattern(anchor_values(ctx))
            .patterns(restriction_on_property())
            .triple(var(vars::RESTRICTION), owl::SOME_VALUES_FROM, &class)
            .triple(&anchor, &property, &value)
            .optional(vec![
                GraphPattern::triple(&anchor, &property, &matched),
                instance_of(&matched, &class),
            ])
            .group_by(&anchor)
            .group_by(&property)
            .group_by(&class)
            .build()?;

        let rows: Vec<SomeValuesCountRow> = ctx.query(&query)?;
        let violations = rows
            .into_iter()
            .filter(|row| row.total > 0 && row.matching == 0)
            .map(|row| {
                let message = format!(
                    "none of the {} values of {} on {} is an instance of {}",
                    row.total, row.property, row.anchor, row.class
                );
                Violation::new(AxiomKind::SomeValuesFrom, row.property, row.anchor, message)
                    .with_related(Term::from(row.class))
            })
            .collect();
        Ok(ctx.finish(violations))
    }
}
