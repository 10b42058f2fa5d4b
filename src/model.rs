//! Graph data model shared by the store, the validators and the transaction layer.

use indexmap::IndexSet;
use oxigraph::model::{BlankNode, GraphName, Literal, NamedNode, NamedOrBlankNode, Quad, Term};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoStaticStr};

// =============================================================================
// Nodes, values, edges
// =============================================================================

/// An opaque graph node: an IRI or a blank node.
///
/// Equality is identifier equality. Two nodes linked by `owl:sameAs` are still
/// different nodes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Node {
    Iri(NamedNode),
    Blank(BlankNode),
}

impl Node {
    /// Node for an IRI string, rejecting invalid IRIs.
    pub fn iri(iri: &str) -> Result<Self, oxigraph::model::IriParseError> {
        NamedNode::new(iri).map(Node::Iri)
    }

    /// Convert a query result term; literals are not nodes.
    pub fn from_term(term: &Term) -> Option<Self> {
        match term {
            Term::NamedNode(node) => Some(Node::Iri(node.clone())),
            Term::BlankNode(node) => Some(Node::Blank(node.clone())),
            _ => None,
        }
    }

    pub fn as_iri(&self) -> Option<&NamedNode> {
        match self {
            Node::Iri(node) => Some(node),
            Node::Blank(_) => None,
        }
    }

    pub fn is_iri(&self) -> bool {
        matches!(self, Node::Iri(_))
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Iri(node) => node.fmt(f),
            Node::Blank(node) => node.fmt(f),
        }
    }
}

impl From<NamedNode> for Node {
    fn from(node: NamedNode) -> Self {
        Node::Iri(node)
    }
}

impl From<BlankNode> for Node {
    fn from(node: BlankNode) -> Self {
        Node::Blank(node)
    }
}

impl From<Node> for NamedOrBlankNode {
    fn from(node: Node) -> Self {
        match node {
            Node::Iri(node) => node.into(),
            Node::Blank(node) => node.into(),
        }
    }
}

impl From<Node> for Term {
    fn from(node: Node) -> Self {
        match node {
            Node::Iri(node) => node.into(),
            Node::Blank(node) => node.into(),
        }
    }
}

/// Object position of an edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    Node(Node),
    Literal(Literal),
}

impl Value {
    pub fn as_node(&self) -> Option<&Node> {
        match self {
            Value::Node(node) => Some(node),
            Value::Literal(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Node(node) => node.fmt(f),
            Value::Literal(literal) => literal.fmt(f),
        }
    }
}

impl From<Node> for Value {
    fn from(node: Node) -> Self {
        Value::Node(node)
    }
}

impl From<NamedNode> for Value {
    fn from(node: NamedNode) -> Self {
        Value::Node(Node::Iri(node))
    }
}

impl From<BlankNode> for Value {
    fn from(node: BlankNode) -> Self {
        Value::Node(Node::Blank(node))
    }
}

impl From<Literal> for Value {
    fn from(literal: Literal) -> Self {
        Value::Literal(literal)
    }
}

impl From<Value> for Term {
    fn from(value: Value) -> Self {
        match value {
            Value::Node(node) => node.into(),
            Value::Literal(literal) => literal.into(),
        }
    }
}

/// A directed, labelled edge `(subject, predicate, object)` in the default graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
    pub subject: Node,
    pub predicate: NamedNode,
    pub object: Value,
}

impl Edge {
    pub fn new(subject: impl Into<Node>, predicate: NamedNode, object: impl Into<Value>) -> Self {
        Self {
            subject: subject.into(),
            predicate,
            object: object.into(),
        }
    }

    pub fn to_quad(&self) -> Quad {
        Quad::new(
            NamedOrBlankNode::from(self.subject.clone()),
            self.predicate.clone(),
            Term::from(self.object.clone()),
            GraphName::DefaultGraph,
        )
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.subject, self.predicate, self.object)
    }
}

// =============================================================================
// Transaction-scoped node sets
// =============================================================================

/// Nodes touched by the mutations of one transaction.
#[derive(Debug, Default)]
pub struct AffectedSet {
    nodes: IndexSet<Node>,
}

impl AffectedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the node was not tracked yet.
    pub fn insert(&mut self, node: Node) -> bool {
        self.nodes.insert(node)
    }

    pub fn contains(&self, node: &Node) -> bool {
        self.nodes.contains(node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }
}

impl Extend<Node> for AffectedSet {
    fn extend<T: IntoIterator<Item = Node>>(&mut self, iter: T) {
        self.nodes.extend(iter);
    }
}

impl FromIterator<Node> for AffectedSet {
    fn from_iter<T: IntoIterator<Item = Node>>(iter: T) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

/// Closure of an [`AffectedSet`] under undirected edge connectivity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnchorSet {
    nodes: IndexSet<Node>,
}

impl AnchorSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, node: Node) -> bool {
        self.nodes.insert(node)
    }

    pub fn contains(&self, node: &Node) -> bool {
        self.nodes.contains(node)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Anchors that can be named in a query. Blank nodes have no stable
    /// identity across queries and are skipped.
    pub fn iris(&self) -> impl Iterator<Item = &NamedNode> {
        self.nodes.iter().filter_map(Node::as_iri)
    }

    pub fn iri_vec(&self) -> Vec<NamedNode> {
        self.iris().cloned().collect()
    }

    pub fn contains_all(&self, affected: &AffectedSet) -> bool {
        affected.iter().all(|node| self.nodes.contains(node))
    }
}

impl FromIterator<Node> for AnchorSet {
    fn from_iter<T: IntoIterator<Item = Node>>(iter: T) -> Self {
        Self {
            nodes: iter.into_iter().collect(),
        }
    }
}

// =============================================================================
// Schema model
// =============================================================================

/// Characteristic attached to a predicate by schema edges.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyCharacteristic {
    Functional,
    InverseFunctional,
    Symmetric,
    Transitive,
    InverseOf(NamedNode),
    /// Transitively closed over `rdfs:subPropertyOf`.
    SubPropertyOf(NamedNode),
}

/// What a [`Restriction`] constrains.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RestrictionKind {
    AllValuesFrom(NamedNode),
    SomeValuesFrom(NamedNode),
    MinCardinality(u64),
    MaxCardinality(u64),
    /// `owl:cardinality`: both a minimum and a maximum.
    ExactCardinality(u64),
}

impl RestrictionKind {
    pub fn min_cardinality(&self) -> Option<u64> {
        match self {
            RestrictionKind::MinCardinality(n) | RestrictionKind::ExactCardinality(n) => Some(*n),
            _ => None,
        }
    }

    pub fn max_cardinality(&self) -> Option<u64> {
        match self {
            RestrictionKind::MaxCardinality(n) | RestrictionKind::ExactCardinality(n) => Some(*n),
            _ => None,
        }
    }
}

/// An `owl:Restriction` node reached from a class through `rdfs:subClassOf`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Restriction {
    /// The restriction node itself, usually a blank node.
    pub node: Node,
    pub on_property: NamedNode,
    pub kind: RestrictionKind,
    /// Qualifies cardinality restrictions to values of this class.
    pub on_class: Option<NamedNode>,
}

impl Restriction {
    pub fn is_qualified(&self) -> bool {
        self.on_class.is_some()
    }
}

// =============================================================================
// Violations
// =============================================================================

/// Axiom kinds in the order the commit protocol validates them.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumIter,
    EnumString,
    AsRefStr,
    IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AxiomKind {
    Functional,
    InverseFunctional,
    Symmetric,
    Transitive,
    InverseOf,
    SubPropertyOf,
    AllValuesFrom,
    SomeValuesFrom,
    MinCardinality,
    MaxCardinality,
}

impl AxiomKind {
    pub const VALIDATION_ORDER: [AxiomKind; 10] = [
        AxiomKind::Functional,
        AxiomKind::InverseFunctional,
        AxiomKind::Symmetric,
        AxiomKind::Transitive,
        AxiomKind::InverseOf,
        AxiomKind::SubPropertyOf,
        AxiomKind::AllValuesFrom,
        AxiomKind::SomeValuesFrom,
        AxiomKind::MinCardinality,
        AxiomKind::MaxCardinality,
    ];
}

/// A schema violation found in the graph state a transaction would produce.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub axiom: AxiomKind,
    /// The predicate whose axiom is violated.
    pub predicate: NamedNode,
    /// The anchor the violation was found from.
    pub subject: Node,
    /// Values, nodes or classes needed to diagnose the violation.
    pub related: Vec<Term>,
    pub message: String,
}

impl Violation {
    pub fn new(
        axiom: AxiomKind,
        predicate: NamedNode,
        subject: Node,
        message: impl Into<String>,
    ) -> Self {
        Self {
            axiom,
            predicate,
            subject,
            related: Vec::new(),
            message: message.into(),
        }
    }

    pub fn with_related(mut self, term: impl Into<Term>) -> Self {
        self.related.push(term.into());
        self
    }

    /// Whether `term` is among the related terms.
    pub fn mentions(&self, term: &Term) -> bool {
        self.related.iter().any(|related| related == term)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.axiom, self.message)
    }
}
