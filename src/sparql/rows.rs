// =============================================================================
// Typed Rows
// =============================================================================
// One row struct per query shape. Queries name their variables through `vars`,
// rows read them back through the same constants.

use super::result_mapper::{FromSparql, MappingError};
use super::typed_binding::{ResultRow, TypedBinding};
use crate::model::Node;
use oxigraph::model::{Literal, NamedNode, Term};

/// Variable names shared by query construction and row mapping.
pub mod vars {
    pub const ANCHOR: &str = "anchor";
    pub const NODE: &str = "node";
    pub const PROPERTY: &str = "property";
    pub const IMPLIED: &str = "implied";
    pub const VALUE: &str = "value";
    pub const OTHER_VALUE: &str = "otherValue";
    pub const OTHER: &str = "other";
    pub const CLASS: &str = "class";
    pub const TYPE: &str = "type";
    pub const RESTRICTION: &str = "restriction";
    pub const KIND: &str = "kind";
    pub const BOUND: &str = "bound";
    pub const FILLER: &str = "filler";
    pub const ON_CLASS: &str = "onClass";
    pub const INTERMEDIATE: &str = "intermediate";
    pub const TARGET: &str = "target";
    pub const MATCH: &str = "match";
    pub const TOTAL: &str = "total";
    pub const MATCHING: &str = "matching";
    pub const LEFT: &str = "left";
    pub const RIGHT: &str = "right";
}

// =============================================================================
// Single-column rows
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct NodeRow {
    pub node: Node,
}

impl FromSparql for NodeRow {
    fn from_row(row: &ResultRow) -> Result<Self, MappingError> {
        let binding = TypedBinding::new(row);
        Ok(Self {
            node: binding.get_node(vars::NODE)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyRow {
    pub property: NamedNode,
}

impl FromSparql for PropertyRow {
    fn from_row(row: &ResultRow) -> Result<Self, MappingError> {
        let binding = TypedBinding::new(row);
        Ok(Self {
            property: binding.get_iri(vars::PROPERTY)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnchorPropertyRow {
    pub anchor: Node,
    pub property: NamedNode,
}

impl FromSparql for AnchorPropertyRow {
    fn from_row(row: &ResultRow) -> Result<Self, MappingError> {
        let binding = TypedBinding::new(row);
        Ok(Self {
            anchor: binding.get_node(vars::ANCHOR)?,
            property: binding.get_iri(vars::PROPERTY)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassRow {
    pub class: NamedNode,
}

impl FromSparql for ClassRow {
    fn from_row(row: &ResultRow) -> Result<Self, MappingError> {
        let binding = TypedBinding::new(row);
        Ok(Self {
            class: binding.get_iri(vars::CLASS)?,
        })
    }
}

// =============================================================================
// Property characteristic violations
// =============================================================================

/// Two distinct values of a functional property on one anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionalConflictRow {
    pub anchor: Node,
    pub property: NamedNode,
    pub value: Term,
    pub other_value: Term,
}

impl FromSparql for FunctionalConflictRow {
    fn from_row(row: &ResultRow) -> Result<Self, MappingError> {
        let binding = TypedBinding::new(row);
        Ok(Self {
            anchor: binding.get_node(vars::ANCHOR)?,
            property: binding.get_iri(vars::PROPERTY)?,
            value: binding.get_term(vars::VALUE)?.clone(),
            other_value: binding.get_term(vars::OTHER_VALUE)?.clone(),
        })
    }
}

/// Another subject sharing a value of an inverse-functional property.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedValueRow {
    pub anchor: Node,
    pub property: NamedNode,
    pub other: Node,
    pub value: Term,
}

impl FromSparql for SharedValueRow {
    fn from_row(row: &ResultRow) -> Result<Self, MappingError> {
        let binding = TypedBinding::new(row);
        Ok(Self {
            anchor: binding.get_node(vars::ANCHOR)?,
            property: binding.get_iri(vars::PROPERTY)?,
            other: binding.get_node(vars::OTHER)?,
            value: binding.get_term(vars::VALUE)?.clone(),
        })
    }
}

/// An edge whose mirror edge is missing.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingEdgeRow {
    pub anchor: Node,
    pub property: NamedNode,
    pub value: Term,
}

impl FromSparql for MissingEdgeRow {
    fn from_row(row: &ResultRow) -> Result<Self, MappingError> {
        let binding = TypedBinding::new(row);
        Ok(Self {
            anchor: binding.get_node(vars::ANCHOR)?,
            property: binding.get_iri(vars::PROPERTY)?,
            value: binding.get_term(vars::VALUE)?.clone(),
        })
    }
}

/// An edge that implies another edge on `implied` which is absent.
#[derive(Debug, Clone, PartialEq)]
pub struct MissingImpliedEdgeRow {
    pub anchor: Node,
    pub property: NamedNode,
    pub implied: NamedNode,
    pub value: Term,
}

impl FromSparql for MissingImpliedEdgeRow {
    fn from_row(row: &ResultRow) -> Result<Self, MappingError> {
        let binding = TypedBinding::new(row);
        Ok(Self {
            anchor: binding.get_node(vars::ANCHOR)?,
            property: binding.get_iri(vars::PROPERTY)?,
            implied: binding.get_iri(vars::IMPLIED)?,
            value: binding.get_term(vars::VALUE)?.clone(),
        })
    }
}

/// A node reachable in two transitive steps without the direct edge.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitiveGapRow {
    pub intermediate: Term,
    pub target: Term,
}

impl FromSparql for TransitiveGapRow {
    fn from_row(row: &ResultRow) -> Result<Self, MappingError> {
        let binding = TypedBinding::new(row);
        Ok(Self {
            intermediate: binding.get_term(vars::INTERMEDIATE)?.clone(),
            target: binding.get_term(vars::TARGET)?.clone(),
        })
    }
}

// =============================================================================
// Restriction violations
// =============================================================================

/// A value outside the class required by `owl:allValuesFrom`.
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignValueRow {
    pub anchor: Node,
    pub property: NamedNode,
    pub class: NamedNode,
    pub value: Term,
}

impl FromSparql for ForeignValueRow {
    fn from_row(row: &ResultRow) -> Result<Self, MappingError> {
        let binding = TypedBinding::new(row);
        Ok(Self {
            anchor: binding.get_node(vars::ANCHOR)?,
            property: binding.get_iri(vars::PROPERTY)?,
            class: binding.get_iri(vars::CLASS)?,
            value: binding.get_term(vars::VALUE)?.clone(),
        })
    }
}

/// Value counts of one `(anchor, property, class)` someValuesFrom group.
#[derive(Debug, Clone, PartialEq)]
pub struct SomeValuesCountRow {
    pub anchor: Node,
    pub property: NamedNode,
    pub class: NamedNode,
    pub total: u64,
    pub matching: u64,
}

impl FromSparql for SomeValuesCountRow {
    fn from_row(row: &ResultRow) -> Result<Self, MappingError> {
        let binding = TypedBinding::new(row);
        Ok(Self {
            anchor: binding.get_node(vars::ANCHOR)?,
            property: binding.get_iri(vars::PROPERTY)?,
            class: binding.get_iri(vars::CLASS)?,
            total: binding.get_u64(vars::TOTAL)?,
            matching: binding.get_u64(vars::MATCHING)?,
        })
    }
}

/// One value (or the absence of any) of a restricted property on an anchor.
#[derive(Debug, Clone, PartialEq)]
pub struct CardinalityRow {
    pub anchor: Node,
    pub restriction: Node,
    pub property: NamedNode,
    pub kind: NamedNode,
    pub bound: Literal,
    pub on_class: Option<NamedNode>,
    pub value: Option<Term>,
}

impl FromSparql for CardinalityRow {
    fn from_row(row: &ResultRow) -> Result<Self, MappingError> {
        let binding = TypedBinding::new(row);
        Ok(Self {
            anchor: binding.get_node(vars::ANCHOR)?,
            restriction: binding.get_node(vars::RESTRICTION)?,
            property: binding.get_iri(vars::PROPERTY)?,
            kind: binding.get_iri(vars::KIND)?,
            bound: binding.get_literal(vars::BOUND)?,
            on_class: binding.get_iri_opt(vars::ON_CLASS)?,
            value: binding.get_term_opt(vars::VALUE).cloned(),
        })
    }
}

/// A value of a qualified restriction that belongs to the `owl:onClass` class.
#[derive(Debug, Clone, PartialEq)]
pub struct QualifiedValueRow {
    pub anchor: Node,
    pub restriction: Node,
    pub value: Term,
}

impl FromSparql for QualifiedValueRow {
    fn from_row(row: &ResultRow) -> Result<Self, MappingError> {
        let binding = TypedBinding::new(row);
        Ok(Self {
            anchor: binding.get_node(vars::ANCHOR)?,
            restriction: binding.get_node(vars::RESTRICTION)?,
            value: binding.get_term(vars::VALUE)?.clone(),
        })
    }
}

/// Two terms where `left` reaches `right` over `owl:sameAs+`.
#[derive(Debug, Clone, PartialEq)]
pub struct SameAsPairRow {
    pub left: Term,
    pub right: Term,
}

impl FromSparql for SameAsPairRow {
    fn from_row(row: &ResultRow) -> Result<Self, MappingError> {
        let binding = TypedBinding::new(row);
        Ok(Self {
            left: binding.get_term(vars::LEFT)?.clone(),
            right: binding.get_term(vars::RIGHT)?.clone(),
        })
    }
}

/// A restriction reachable from a class, as seen by schema introspection.
#[derive(Debug, Clone, PartialEq)]
pub struct RestrictionRow {
    pub restriction: Node,
    pub property: NamedNode,
    pub kind: NamedNode,
    pub filler: Term,
    pub on_class: Option<NamedNode>,
}

impl FromSparql for RestrictionRow {
    fn from_row(row: &ResultRow) -> Result<Self, MappingError> {
        let binding = TypedBinding::new(row);
        Ok(Self {
            restriction: binding.get_node(vars::RESTRICTION)?,
            property: binding.get_iri(vars::PROPERTY)?,
            kind: binding.get_iri(vars::KIND)?,
            filler: binding.get_term(vars::FILLER)?.clone(),
            on_class: binding.get_iri_opt(vars::ON_CLASS)?,
        })
    }
}
