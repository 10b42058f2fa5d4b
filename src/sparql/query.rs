// =============================================================================
// Declarative SELECT Queries
// =============================================================================
// A small SPARQL algebra: patterns, property paths, filters and aggregates are
// assembled as values and rendered to query text only after `build()` checks
// them. IRIs and literals are written through oxigraph's escaping `Display`,
// so no caller-provided string is ever spliced into the query text.

use once_cell::sync::Lazy;
use oxigraph::model::{Literal, NamedNode, NamedNodeRef, Term};
use regex::Regex;
use std::collections::BTreeSet;
use std::fmt::{self, Write as _};
use thiserror::Error;

static VARIABLE_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,127}$").expect("variable name pattern is valid")
});

/// Errors raised while assembling a query.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryBuildError {
    #[error("invalid variable name '{name}': {reason}")]
    InvalidVariable { name: String, reason: String },

    #[error("query projects nothing")]
    EmptyProjection,

    #[error("projected variable ?{0} is not bound by any pattern")]
    UnboundProjection(String),

    #[error("projected variable ?{0} is neither grouped nor aggregated")]
    UngroupedProjection(String),

    #[error("aggregate alias ?{0} is already used in the query body")]
    AliasConflict(String),

    #[error("VALUES for ?{variable} contains a term that cannot be written inline: {term}")]
    UnsupportedValuesTerm { variable: String, term: String },

    #[error("negated property set is empty")]
    EmptyNegatedSet,

    #[error("UNION without branches")]
    EmptyUnion,
}

// =============================================================================
// Terms
// =============================================================================

/// A query variable, written without the leading `?`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variable(String);

impl Variable {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn check(&self) -> Result<(), QueryBuildError> {
        if self.0.starts_with('?') || self.0.starts_with('$') {
            return Err(QueryBuildError::InvalidVariable {
                name: self.0.clone(),
                reason: "leading sigil is added when rendering".to_string(),
            });
        }
        if !VARIABLE_NAME.is_match(&self.0) {
            return Err(QueryBuildError::InvalidVariable {
                name: self.0.clone(),
                reason: "expected 1-128 ASCII letters, digits or underscores".to_string(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

/// Subject or object position of a triple pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TermPattern {
    Variable(Variable),
    NamedNode(NamedNode),
    Literal(Literal),
}

impl fmt::Display for TermPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermPattern::Variable(v) => v.fmt(f),
            TermPattern::NamedNode(n) => n.fmt(f),
            TermPattern::Literal(l) => l.fmt(f),
        }
    }
}

impl From<Variable> for TermPattern {
    fn from(v: Variable) -> Self {
        TermPattern::Variable(v)
    }
}

impl From<&Variable> for TermPattern {
    fn from(v: &Variable) -> Self {
        TermPattern::Variable(v.clone())
    }
}

impl From<NamedNode> for TermPattern {
    fn from(n: NamedNode) -> Self {
        TermPattern::NamedNode(n)
    }
}

impl From<&NamedNode> for TermPattern {
    fn from(n: &NamedNode) -> Self {
        TermPattern::NamedNode(n.clone())
    }
}

impl From<NamedNodeRef<'_>> for TermPattern {
    fn from(n: NamedNodeRef<'_>) -> Self {
        TermPattern::NamedNode(n.into_owned())
    }
}

impl From<Literal> for TermPattern {
    fn from(l: Literal) -> Self {
        TermPattern::Literal(l)
    }
}

// =============================================================================
// Property paths
// =============================================================================

/// Member of a negated property set `!(...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NegatedPredicate {
    Forward(NamedNode),
    Inverse(NamedNode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyPath {
    Predicate(NamedNode),
    Inverse(Box<PropertyPath>),
    Sequence(Box<PropertyPath>, Box<PropertyPath>),
    Alternative(Box<PropertyPath>, Box<PropertyPath>),
    ZeroOrMore(Box<PropertyPath>),
    OneOrMore(Box<PropertyPath>),
    NegatedSet(Vec<NegatedPredicate>),
}

impl PropertyPath {
    pub fn predicate(p: impl Into<NamedNode>) -> Self {
        PropertyPath::Predicate(p.into())
    }

    pub fn inverse(self) -> Self {
        PropertyPath::Inverse(Box::new(self))
    }

    pub fn then(self, next: PropertyPath) -> Self {
        PropertyPath::Sequence(Box::new(self), Box::new(next))
    }

    pub fn or(self, other: PropertyPath) -> Self {
        PropertyPath::Alternative(Box::new(self), Box::new(other))
    }

    pub fn zero_or_more(self) -> Self {
        PropertyPath::ZeroOrMore(Box::new(self))
    }

    pub fn one_or_more(self) -> Self {
        PropertyPath::OneOrMore(Box::new(self))
    }

    fn check(&self) -> Result<(), QueryBuildError> {
        match self {
            PropertyPath::Predicate(_) => Ok(()),
            PropertyPath::NegatedSet(items) if items.is_empty() => {
                Err(QueryBuildError::EmptyNegatedSet)
            }
            PropertyPath::NegatedSet(_) => Ok(()),
            PropertyPath::Inverse(p) | PropertyPath::ZeroOrMore(p) | PropertyPath::OneOrMore(p) => {
                p.check()
            }
            PropertyPath::Sequence(a, b) | PropertyPath::Alternative(a, b) => {
                a.check()?;
                b.check()
            }
        }
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyPath::Predicate(p) => p.fmt(f),
            PropertyPath::Inverse(p) => write!(f, "^({p})"),
            PropertyPath::Sequence(a, b) => write!(f, "({a}/{b})"),
            PropertyPath::Alternative(a, b) => write!(f, "({a}|{b})"),
            PropertyPath::ZeroOrMore(p) => write!(f, "({p})*"),
            PropertyPath::OneOrMore(p) => write!(f, "({p})+"),
            PropertyPath::NegatedSet(items) => {
                f.write_str("!(")?;
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        f.write_char('|')?;
                    }
                    match item {
                        NegatedPredicate::Forward(p) => write!(f, "{p}")?,
                        NegatedPredicate::Inverse(p) => write!(f, "^{p}")?,
                    }
                }
                f.write_char(')')
            }
        }
    }
}

impl From<NamedNode> for PropertyPath {
    fn from(p: NamedNode) -> Self {
        PropertyPath::Predicate(p)
    }
}

impl From<NamedNodeRef<'_>> for PropertyPath {
    fn from(p: NamedNodeRef<'_>) -> Self {
        PropertyPath::Predicate(p.into_owned())
    }
}

/// Predicate position: a plain term or a property path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verb {
    Term(TermPattern),
    Path(PropertyPath),
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verb::Term(t) => t.fmt(f),
            Verb::Path(p) => p.fmt(f),
        }
    }
}

impl From<Variable> for Verb {
    fn from(v: Variable) -> Self {
        Verb::Term(v.into())
    }
}

impl From<&Variable> for Verb {
    fn from(v: &Variable) -> Self {
        Verb::Term(v.into())
    }
}

impl From<NamedNode> for Verb {
    fn from(n: NamedNode) -> Self {
        Verb::Term(n.into())
    }
}

impl From<&NamedNode> for Verb {
    fn from(n: &NamedNode) -> Self {
        Verb::Term(n.into())
    }
}

impl From<NamedNodeRef<'_>> for Verb {
    fn from(n: NamedNodeRef<'_>) -> Self {
        Verb::Term(n.into())
    }
}

impl From<PropertyPath> for Verb {
    fn from(p: PropertyPath) -> Self {
        Verb::Path(p)
    }
}

// =============================================================================
// Patterns and expressions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriplePattern {
    pub subject: TermPattern,
    pub verb: Verb,
    pub object: TermPattern,
}

impl TriplePattern {
    pub fn new(
        subject: impl Into<TermPattern>,
        verb: impl Into<Verb>,
        object: impl Into<TermPattern>,
    ) -> Self {
        Self {
            subject: subject.into(),
            verb: verb.into(),
            object: object.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GraphPattern {
    Triple(TriplePattern),
    /// Inline data: one variable, a list of IRIs or literals.
    Values { variable: Variable, terms: Vec<Term> },
    Optional(Vec<GraphPattern>),
    Union(Vec<Vec<GraphPattern>>),
    Minus(Vec<GraphPattern>),
    Filter(Expression),
}

impl GraphPattern {
    pub fn triple(
        subject: impl Into<TermPattern>,
        verb: impl Into<Verb>,
        object: impl Into<TermPattern>,
    ) -> Self {
        GraphPattern::Triple(TriplePattern::new(subject, verb, object))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expression {
    Not(Box<Expression>),
    SameTerm(TermPattern, TermPattern),
    IsIri(Variable),
    Exists(Vec<GraphPattern>),
    NotExists(Vec<GraphPattern>),
}

impl Expression {
    pub fn same_term(left: impl Into<TermPattern>, right: impl Into<TermPattern>) -> Self {
        Expression::SameTerm(left.into(), right.into())
    }

    pub fn negate(self) -> Self {
        Expression::Not(Box::new(self))
    }
}

/// An item of the SELECT clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    Variable(Variable),
    Count {
        distinct: bool,
        of: Variable,
        alias: Variable,
    },
}

impl Projection {
    /// Name of the result column.
    pub fn column(&self) -> &Variable {
        match self {
            Projection::Variable(v) => v,
            Projection::Count { alias, .. } => alias,
        }
    }
}

// =============================================================================
// SelectQuery
// =============================================================================

/// A checked SELECT query. Only [`QueryBuilder::build`] produces one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectQuery {
    distinct: bool,
    projection: Vec<Projection>,
    patterns: Vec<GraphPattern>,
    group_by: Vec<Variable>,
    limit: Option<usize>,
}

impl SelectQuery {
    pub fn projection(&self) -> &[Projection] {
        &self.projection
    }

    pub fn columns(&self) -> impl Iterator<Item = &Variable> {
        self.projection.iter().map(Projection::column)
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }
}

impl fmt::Display for SelectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SELECT ")?;
        if self.distinct {
            f.write_str("DISTINCT ")?;
        }
        for (idx, item) in self.projection.iter().enumerate() {
            if idx > 0 {
                f.write_char(' ')?;
            }
            match item {
                Projection::Variable(v) => write!(f, "{v}")?,
                Projection::Count {
                    distinct,
                    of,
                    alias,
                } => {
                    let modifier = if *distinct { "DISTINCT " } else { "" };
                    write!(f, "(COUNT({modifier}{of}) AS {alias})")?
                }
            }
        }
        f.write_str("\nWHERE ")?;
        write_group(f, &self.patterns, 0)?;
        f.write_char('\n')?;
        if !self.group_by.is_empty() {
            f.write_str("GROUP BY")?;
            for v in &self.group_by {
                write!(f, " {v}")?;
            }
            f.write_char('\n')?;
        }
        if let Some(limit) = self.limit {
            writeln!(f, "LIMIT {limit}")?;
        }
        Ok(())
    }
}

fn write_indent(f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
    for _ in 0..depth {
        f.write_str("  ")?;
    }
    Ok(())
}

fn write_group(f: &mut fmt::Formatter<'_>, patterns: &[GraphPattern], depth: usize) -> fmt::Result {
    f.write_str("{\n")?;
    for pattern in patterns {
        write_indent(f, depth + 1)?;
        write_pattern(f, pattern, depth + 1)?;
        f.write_char('\n')?;
    }
    write_indent(f, depth)?;
    f.write_char('}')
}

fn write_pattern(f: &mut fmt::Formatter<'_>, pattern: &GraphPattern, depth: usize) -> fmt::Result {
    match pattern {
        GraphPattern::Triple(t) => write!(f, "{} {} {} .", t.subject, t.verb, t.object),
        GraphPattern::Values { variable, terms } => {
            write!(f, "VALUES {variable} {{")?;
            for term in terms {
                write!(f, " {term}")?;
            }
            f.write_str(" }")
        }
        GraphPattern::Optional(inner) => {
            f.write_str("OPTIONAL ")?;
            write_group(f, inner, depth)
        }
        GraphPattern::Minus(inner) => {
            f.write_str("MINUS ")?;
            write_group(f, inner, depth)
        }
        GraphPattern::Union(branches) => {
            for (idx, branch) in branches.iter().enumerate() {
                if idx > 0 {
                    f.write_str(" UNION ")?;
                }
                write_group(f, branch, depth)?;
            }
            Ok(())
        }
        GraphPattern::Filter(expr) => {
            f.write_str("FILTER(")?;
            write_expression(f, expr, depth)?;
            f.write_char(')')
        }
    }
}

fn write_expression(f: &mut fmt::Formatter<'_>, expr: &Expression, depth: usize) -> fmt::Result {
    match expr {
        Expression::Not(inner) => {
            f.write_str("!(")?;
            write_expression(f, inner, depth)?;
            f.write_char(')')
        }
        Expression::SameTerm(a, b) => write!(f, "sameTerm({a}, {b})"),
        Expression::IsIri(v) => write!(f, "isIRI({v})"),
        Expression::Exists(inner) => {
            f.write_str("EXISTS ")?;
            write_group(f, inner, depth)
        }
        Expression::NotExists(inner) => {
            f.write_str("NOT EXISTS ")?;
            write_group(f, inner, depth)
        }
    }
}

// =============================================================================
// QueryBuilder
// =============================================================================

/// Builder for [`SelectQuery`].
///
/// ```rust
/// use owl_guard::sparql::query::{QueryBuilder, Variable};
/// use oxigraph::model::vocab::rdf;
///
/// let node = Variable::new("node");
/// let query = QueryBuilder::select()
///     .variable(&node)
///     .triple(&node, rdf::TYPE, Variable::new("class"))
///     .limit(10)
///     .build()
///     .unwrap();
/// assert!(query.to_string().starts_with("SELECT ?node"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    distinct: bool,
    projection: Vec<Projection>,
    patterns: Vec<GraphPattern>,
    group_by: Vec<Variable>,
    limit: Option<usize>,
}

impl QueryBuilder {
    pub fn select() -> Self {
        Self::default()
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn variable(mut self, var: &Variable) -> Self {
        self.projection.push(Projection::Variable(var.clone()));
        self
    }

    pub fn variables<'a>(mut self, vars: impl IntoIterator<Item = &'a Variable>) -> Self {
        self.projection
            .extend(vars.into_iter().cloned().map(Projection::Variable));
        self
    }

    /// Add `(COUNT([DISTINCT] ?of) AS ?alias)` to the projection.
    pub fn count(mut self, distinct: bool, of: &Variable, alias: &Variable) -> Self {
        self.projection.push(Projection::Count {
            distinct,
            of: of.clone(),
            alias: alias.clone(),
        });
        self
    }

    pub fn pattern(mut self, pattern: GraphPattern) -> Self {
        self.patterns.push(pattern);
        self
    }

    pub fn patterns(mut self, patterns: impl IntoIterator<Item = GraphPattern>) -> Self {
        self.patterns.extend(patterns);
        self
    }

    pub fn triple(
        self,
        subject: impl Into<TermPattern>,
        verb: impl Into<Verb>,
        object: impl Into<TermPattern>,
    ) -> Self {
        self.pattern(GraphPattern::triple(subject, verb, object))
    }

    pub fn values(self, variable: &Variable, terms: impl IntoIterator<Item = Term>) -> Self {
        self.pattern(GraphPattern::Values {
            variable: variable.clone(),
            terms: terms.into_iter().collect(),
        })
    }

    pub fn optional(self, patterns: Vec<GraphPattern>) -> Self {
        self.pattern(GraphPattern::Optional(patterns))
    }

    pub fn union(self, branches: Vec<Vec<GraphPattern>>) -> Self {
        self.pattern(GraphPattern::Union(branches))
    }

    pub fn minus(self, patterns: Vec<GraphPattern>) -> Self {
        self.pattern(GraphPattern::Minus(patterns))
    }

    pub fn filter(self, expression: Expression) -> Self {
        self.pattern(GraphPattern::Filter(expression))
    }

    pub fn group_by(mut self, var: &Variable) -> Self {
        self.group_by.push(var.clone());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn limit_opt(mut self, limit: Option<usize>) -> Self {
        self.limit = limit;
        self
    }

    /// Check the query and freeze it.
    ///
    /// Rejects malformed variable names, projected variables that no pattern
    /// binds, plain projections missing from GROUP BY in aggregate queries,
    /// aliases shadowing body variables, blank nodes in VALUES, empty
    /// negated property sets and empty unions.
    pub fn build(self) -> Result<SelectQuery, QueryBuildError> {
        if self.projection.is_empty() {
            return Err(QueryBuildError::EmptyProjection);
        }

        let mut bound = BTreeSet::new();
        let mut mentioned = BTreeSet::new();
        check_patterns(&self.patterns, &mut bound, &mut mentioned, true)?;

        for var in &self.group_by {
            var.check()?;
        }

        let aggregated = !self.group_by.is_empty()
            || self
                .projection
                .iter()
                .any(|p| matches!(p, Projection::Count { .. }));

        for item in &self.projection {
            match item {
                Projection::Variable(v) => {
                    v.check()?;
                    if !bound.contains(v) {
                        return Err(QueryBuildError::UnboundProjection(v.0.clone()));
                    }
                    if aggregated && !self.group_by.contains(v) {
                        return Err(QueryBuildError::UngroupedProjection(v.0.clone()));
                    }
                }
                Projection::Count { of, alias, .. } => {
                    of.check()?;
                    alias.check()?;
                    if !bound.contains(of) {
                        return Err(QueryBuildError::UnboundProjection(of.0.clone()));
                    }
                    if mentioned.contains(alias) {
                        return Err(QueryBuildError::AliasConflict(alias.0.clone()));
                    }
                }
            }
        }

        Ok(SelectQuery {
            distinct: self.distinct,
            projection: self.projection,
            patterns: self.patterns,
            group_by: self.group_by,
            limit: self.limit,
        })
    }
}

/// Walk patterns, validating every variable. `binds` is false inside MINUS
/// and filter bodies, whose variables never reach the solution.
fn check_patterns(
    patterns: &[GraphPattern],
    bound: &mut BTreeSet<Variable>,
    mentioned: &mut BTreeSet<Variable>,
    binds: bool,
) -> Result<(), QueryBuildError> {
    for pattern in patterns {
        match pattern {
            GraphPattern::Triple(t) => {
                if let TermPattern::Variable(v) = &t.subject {
                    record(v, bound, mentioned, binds)?;
                }
                match &t.verb {
                    Verb::Term(TermPattern::Variable(v)) => record(v, bound, mentioned, binds)?,
                    Verb::Term(_) => {}
                    Verb::Path(path) => path.check()?,
                }
                if let TermPattern::Variable(v) = &t.object {
                    record(v, bound, mentioned, binds)?;
                }
            }
            GraphPattern::Values { variable, terms } => {
                record(variable, bound, mentioned, binds)?;
                if let Some(term) = terms
                    .iter()
                    .find(|t| !matches!(t, Term::NamedNode(_) | Term::Literal(_)))
                {
                    return Err(QueryBuildError::UnsupportedValuesTerm {
                        variable: variable.0.clone(),
                        term: term.to_string(),
                    });
                }
            }
            GraphPattern::Optional(inner) => check_patterns(inner, bound, mentioned, binds)?,
            GraphPattern::Union(branches) => {
                if branches.is_empty() {
                    return Err(QueryBuildError::EmptyUnion);
                }
                for branch in branches {
                    check_patterns(branch, bound, mentioned, binds)?;
                }
            }
            GraphPattern::Minus(inner) => check_patterns(inner, bound, mentioned, false)?,
            GraphPattern::Filter(expr) => check_expression(expr, bound, mentioned)?,
        }
    }
    Ok(())
}

fn record(
    v: &Variable,
    bound: &mut BTreeSet<Variable>,
    mentioned: &mut BTreeSet<Variable>,
    binds: bool,
) -> Result<(), QueryBuildError> {
    v.check()?;
    mentioned.insert(v.clone());
    if binds {
        bound.insert(v.clone());
    }
    Ok(())
}

fn check_expression(
    expr: &Expression,
    bound: &mut BTreeSet<Variable>,
    mentioned: &mut BTreeSet<Variable>,
) -> Result<(), QueryBuildError> {
    match expr {
        Expression::Not(inner) => check_expression(inner, bound, mentioned),
        Expression::SameTerm(a, b) => {
            for side in [a, b] {
                if let TermPattern::Variable(v) = side {
                    v.check()?;
                    mentioned.insert(v.clone());
                }
            }
            Ok(())
        }
        Expression::IsIri(v) => {
            v.check()?;
            mentioned.insert(v.clone());
            Ok(())
        }
        Expression::Exists(inner) | Expression::NotExists(inner) => {
            check_patterns(inner, bound, mentioned, false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxigraph::model::BlankNode;
    use oxigraph::model::vocab::{rdf, rdfs};

    fn nn(iri: &str) -> NamedNode {
        NamedNode::new(iri).unwrap()
    }

    #[test]
    fn test_renders_values_paths_and_filters() {
        let anchor = Variable::new("anchor");
        let node = Variable::new("node");
        let query = QueryBuilder::select()
            .distinct()
            .variable(&node)
            .values(&anchor, [Term::from(nn("http://example.org/a"))])
            .triple(
                &anchor,
                PropertyPath::predicate(rdfs::SUB_CLASS_OF).one_or_more(),
                &node,
            )
            .filter(Expression::IsIri(node.clone()))
            .build()
            .unwrap();

        let text = query.to_string();
        assert!(text.starts_with("SELECT DISTINCT ?node\nWHERE {"));
        assert!(text.contains("VALUES ?anchor { <http://example.org/a> }"));
        assert!(text.contains(
            "?anchor (<http://www.w3.org/2000/01/rdf-schema#subClassOf>)+ ?node ."
        ));
        assert!(text.contains("FILTER(isIRI(?node))"));
    }

    #[test]
    fn test_negated_set_renders_inverse_members() {
        let path = PropertyPath::NegatedSet(vec![
            NegatedPredicate::Forward(nn("urn:x")),
            NegatedPredicate::Inverse(nn("urn:x")),
        ])
        .zero_or_more();
        assert_eq!(path.to_string(), "(!(<urn:x>|^<urn:x>))*");
    }

    #[test]
    fn test_literals_are_escaped() {
        let v = Variable::new("s");
        let query = QueryBuilder::select()
            .variable(&v)
            .triple(&v, nn("urn:p"), Literal::new_simple_literal("a\" } DROP ALL"))
            .build()
            .unwrap();
        assert!(query.to_string().contains(r#""a\" } DROP ALL""#));
    }

    #[test]
    fn test_rejects_unbound_projection() {
        let err = QueryBuilder::select()
            .variable(&Variable::new("missing"))
            .triple(Variable::new("s"), rdf::TYPE, Variable::new("t"))
            .build()
            .unwrap_err();
        assert_eq!(err, QueryBuildError::UnboundProjection("missing".into()));
    }

    #[test]
    fn test_minus_does_not_bind() {
        let s = Variable::new("s");
        let o = Variable::new("o");
        let err = QueryBuilder::select()
            .variable(&o)
            .triple(&s, rdf::TYPE, nn("urn:C"))
            .minus(vec![GraphPattern::triple(&s, nn("urn:p"), &o)])
            .build()
            .unwrap_err();
        assert_eq!(err, QueryBuildError::UnboundProjection("o".into()));
    }

    #[test]
    fn test_rejects_bad_variable_names() {
        let err = QueryBuilder::select()
            .variable(&Variable::new("?s"))
            .build()
            .unwrap_err();
        assert!(matches!(err, QueryBuildError::InvalidVariable { .. }));

        let err = QueryBuilder::select()
            .variable(&Variable::new("s"))
            .triple(Variable::new("s"), Variable::new("p x"), Variable::new("o"))
            .build()
            .unwrap_err();
        assert!(matches!(err, QueryBuildError::InvalidVariable { .. }));
    }

    #[test]
    fn test_group_by_coverage() {
        let s = Variable::new("s");
        let o = Variable::new("o");
        let total = Variable::new("total");
        let base = QueryBuilder::select()
            .variable(&s)
            .count(true, &o, &total)
            .triple(&s, nn("urn:p"), &o);

        assert_eq!(
            base.clone().build().unwrap_err(),
            QueryBuildError::UngroupedProjection("s".into())
        );

        let text = base.group_by(&s).build().unwrap().to_string();
        assert!(text.contains("(COUNT(DISTINCT ?o) AS ?total)"));
        assert!(text.contains("GROUP BY ?s"));
    }

    #[test]
    fn test_alias_must_be_fresh() {
        let s = Variable::new("s");
        let err = QueryBuilder::select()
            .count(false, &s, &s)
            .triple(&s, nn("urn:p"), Variable::new("o"))
            .build()
            .unwrap_err();
        assert_eq!(err, QueryBuildError::AliasConflict("s".into()));
    }

    #[test]
    fn test_values_reject_blank_nodes() {
        let s = Variable::new("s");
        let err = QueryBuilder::select()
            .variable(&s)
            .values(&s, [Term::from(BlankNode::default())])
            .build()
            .unwrap_err();
        assert!(matches!(err, QueryBuildError::UnsupportedValuesTerm { .. }));
    }

    #[test]
    fn test_empty_union_and_negated_set_rejected() {
        let s = Variable::new("s");
        let err = QueryBuilder::select()
            .variable(&s)
            .triple(&s, rdf::TYPE, nn("urn:C"))
            .union(vec![])
            .build()
            .unwrap_err();
        assert_eq!(err, QueryBuildError::EmptyUnion);

        let err = QueryBuilder::select()
            .variable(&s)
            .triple(&s, PropertyPath::NegatedSet(vec![]), Variable::new("o"))
            .build()
            .unwrap_err();
        assert_eq!(err, QueryBuildError::EmptyNegatedSet);
    }
}
