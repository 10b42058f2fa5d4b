//! Cardinality restrictions.
//!
//! Values are counted per `(anchor, restriction, kind)` group after
//! collapsing `owl:sameAs` equivalents. A restriction with `owl:onClass`
//! counts only the values that are instances of that class.

use super::same_as::EquivalenceClasses;
use super::{
    ConstraintValidator, ValidationContext, anchor_values, instance_of, restriction_on_property,
    var,
};
use crate::error::StoreError;
use crate::model::{AxiomKind, Node, Violation};
use crate::sparql::rows::{CardinalityRow, QualifiedValueRow, vars};
use crate::sparql::{GraphPattern, QueryBuilder};
use crate::vocab::owl;
use indexmap::IndexMap;
use oxigraph::model::{Literal, NamedNode, NamedNodeRef, Term};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bound {
    Min,
    Max,
}

impl Bound {
    fn axiom(self) -> AxiomKind {
        match self {
            Bound::Min => AxiomKind::MinCardinality,
            Bound::Max => AxiomKind::MaxCardinality,
        }
    }

    /// Restriction predicates carrying this bound. `owl:cardinality` is both.
    fn predicates(self) -> [NamedNodeRef<'static>; 2] {
        match self {
            Bound::Min => [owl::MIN_CARDINALITY, owl::CARDINALITY],
            Bound::Max => [owl::MAX_CARDINALITY, owl::CARDINALITY],
        }
    }

    fn violated(self, count: usize, limit: u64) -> bool {
        let count = count as u64;
        match self {
            Bound::Min => count < limit,
            Bound::Max => count > limit,
        }
    }
}

type GroupKey = (Node, Node, NamedNode);

#[derive(Debug)]
struct Group {
    anchor: Node,
    property: NamedNode,
    kind: NamedNode,
    bound: Literal,
    on_class: Option<NamedNode>,
    values: Vec<Term>,
    qualified: Vec<Term>,
}

fn restriction_groups(
    ctx: &ValidationContext<'_>,
    bound: Bound,
) -> Result<IndexMap<GroupKey, Group>, StoreError> {
    let anchor = var(vars::ANCHOR);
    let restriction = var(vars::RESTRICTION);
    let property = var(vars::PROPERTY);
    let kind = var(vars::KIND);
    let limit = var(vars::BOUND);
    let on_class = var(vars::ON_CLASS);
    let value = var(vars::VALUE);

    let query = QueryBuilder::select()
        .distinct()
        .variables([
            &anchor,
            &restriction,
            &property,
            &kind,
            &limit,
            &on_class,
            &value,
        ])
        .pattern(anchor_values(ctx))
        .values(
            &kind,
            bound
                .predicates()
                .into_iter()
                .map(|p| Term::from(p.into_owned())),
        )
        .patterns(restriction_on_property())
        .triple(&restriction, &kind, &limit)
        .optional(vec![GraphPattern::triple(
            &restriction,
            owl::ON_CLASS,
            &on_class,
        )])
        .optional(vec![GraphPattern::triple(&anchor, &property, &value)])
        .build()?;

    let rows: Vec<CardinalityRow> = ctx.query(&query)?;
    let mut groups: IndexMap<GroupKey, Group> = IndexMap::new();
    for row in rows {
        let key = (row.anchor.clone(), row.restriction, row.kind.clone());
        let group = groups.entry(key).or_insert_with(|| Group {
            anchor: row.anchor,
            property: row.property,
            kind: row.kind,
            bound: row.bound,
            on_class: row.on_class,
            values: Vec::new(),
            qualified: Vec::new(),
        });
        if let Some(value) = row.value {
            if !group.values.contains(&value) {
                group.values.push(value);
            }
        }
    }
    Ok(groups)
}

/// Fill `qualified` with the values that belong to the group's `owl:onClass`.
fn attach_qualified_values(
    ctx: &ValidationContext<'_>,
    groups: &mut IndexMap<GroupKey, Group>,
) -> Result<(), StoreError> {
    if !groups.values().any(|g| g.on_class.is_some()) {
        return Ok(());
    }

    let anchor = var(vars::ANCHOR);
    let restriction = var(vars::RESTRICTION);
    let on_class = var(vars::ON_CLASS);
    let value = var(vars::VALUE);

    let query = QueryBuilder::select()
        .distinct()
        .variables([&anchor, &restriction, &value])
        .pattern(anchor_values(ctx))
        .patterns(restriction_on_property())
        .triple(&restriction, owl::ON_CLASS, &on_class)
        .triple(&anchor, var(vars::PROPERTY), &value)
        .pattern(instance_of(&value, &on_class))
        .build()?;

    let rows: Vec<QualifiedValueRow> = ctx.query(&query)?;
    for row in rows {
        for ((anchor, restriction, _), group) in groups.iter_mut() {
            if *anchor == row.anchor
                && *restriction == row.restriction
                && !group.qualified.contains(&row.value)
            {
                group.qualified.push(row.value.clone());
            }
        }
    }
    Ok(())
}

fn check(ctx: &ValidationContext<'_>, bound: Bound) -> Result<Vec<Violation>, StoreError> {
    let mut groups = restriction_groups(ctx, bound)?;
    if groups.is_empty() {
        return Ok(Vec::new());
    }
    attach_qualified_values(ctx, &mut groups)?;

    let all_values: Vec<Term> = groups.values().flat_map(|g| g.values.clone()).collect();
    let mut classes = EquivalenceClasses::load(ctx, &all_values)?;
    debug!(
        groups = groups.len(),
        tracked = classes.len(),
        "cardinality groups"
    );

    let mut violations = Vec::new();
    for group in groups.into_values() {
        let Ok(limit) = group.bound.value().parse::<u64>() else {
            warn!(
                property = %group.property,
                bound = %group.bound,
                "skipping restriction with a non-integer cardinality"
            );
            continue;
        };

        let counted = if group.on_class.is_some() {
            &group.qualified
        } else {
            &group.values
        };
        let count = classes.count_distinct(counted.iter());
        if !bound.violated(count, limit) {
            continue;
        }

        let qualifier = group
            .on_class
            .as_ref()
            .map(|c| format!(" in {c}"))
            .unwrap_or_default();
        let message = match bound {
            Bound::Min => format!(
                "{} has {} distinct values of {}{}, fewer than the {} of {}",
                group.anchor, count, group.property, qualifier, group.kind, limit
            ),
            Bound::Max => format!(
                "{} has {} distinct values of {}{}, more than the {} of {}",
                group.anchor, count, group.property, qualifier, group.kind, limit
            ),
        };

        let mut violation = Violation::new(bound.axiom(), group.property, group.anchor, message)
            .with_related(group.bound);
        if let Some(class) = group.on_class {
            violation = violation.with_related(class);
        }
        violations.push(violation);

        if violations.len() >= ctx.mode.max_violations() {
            break;
        }
    }
    Ok(ctx.finish(violations))
}

/// `owl:minCardinality` and the lower half of `owl:cardinality`. An anchor
/// with no value at all counts as zero.
pub struct MinCardinalityValidator;

impl ConstraintValidator for MinCardinalityValidator {
    fn axiom(&self) -> AxiomKind {
        AxiomKind::MinCardinality
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Result<Vec<Violation>, StoreError> {
        check(ctx, Bound::Min)
    }
}

/// `owl:maxCardinality` and the upper half of `owl:cardinality`.
pub struct MaxCardinalityValidator;

impl ConstraintValidator for MaxCardinalityValidator {
    fn axiom(&self) -> AxiomKind {
        AxiomKind::MaxCardinality
    }

    fn validate(&self, ctx: &ValidationContext<'_>) -> Result<Vec<Violation>, StoreError> {
        check(ctx, Bound::Max)
    }
}
