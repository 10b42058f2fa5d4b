// =============================================================================
// Type-Safe Result Bindings
// =============================================================================
// Extract typed values from result rows by variable name

use crate::model::Node;
use indexmap::IndexMap;
use oxigraph::model::{Literal, NamedNode, Term};
use thiserror::Error;

/// Errors that can occur when extracting typed bindings
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BindingError {
    #[error("Variable '{0}' is unbound")]
    Unbound(String),

    #[error("Expected {expected} for '{var}', got {actual}")]
    TypeMismatch {
        var: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Failed to convert '{var}' to {target_type}: {reason}")]
    ConversionFailed {
        var: String,
        target_type: &'static str,
        reason: String,
    },
}

/// One solution of a SELECT query: variable name to bound term, in
/// projection order. Unbound variables are absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultRow {
    bindings: IndexMap<String, Term>,
}

impl ResultRow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, var: impl Into<String>, term: Term) {
        self.bindings.insert(var.into(), term);
    }

    pub fn get(&self, var: &str) -> Option<&Term> {
        self.bindings.get(var)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Term)> {
        self.bindings.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl<K: Into<String>> FromIterator<(K, Term)> for ResultRow {
    fn from_iter<T: IntoIterator<Item = (K, Term)>>(iter: T) -> Self {
        Self {
            bindings: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Type-safe binding extractor for one [`ResultRow`]
pub struct TypedBinding<'a> {
    row: &'a ResultRow,
}

impl<'a> TypedBinding<'a> {
    pub fn new(row: &'a ResultRow) -> Self {
        Self { row }
    }

    /// Get raw term for a variable
    pub fn get_term(&self, var: &str) -> Result<&'a Term, BindingError> {
        self.row
            .get(var)
            .ok_or_else(|| BindingError::Unbound(var.to_string()))
    }

    pub fn get_term_opt(&self, var: &str) -> Option<&'a Term> {
        self.row.get(var)
    }

    /// Extract an IRI
    pub fn get_iri(&self, var: &str) -> Result<NamedNode, BindingError> {
        match self.get_term(var)? {
            Term::NamedNode(node) => Ok(node.clone()),
            term => Err(mismatch(var, "IRI", term)),
        }
    }

    pub fn get_iri_opt(&self, var: &str) -> Result<Option<NamedNode>, BindingError> {
        match self.get_term_opt(var) {
            Some(Term::NamedNode(node)) => Ok(Some(node.clone())),
            Some(term) => Err(mismatch(var, "IRI", term)),
            None => Ok(None),
        }
    }

    /// Extract an IRI or blank node
    pub fn get_node(&self, var: &str) -> Result<Node, BindingError> {
        let term = self.get_term(var)?;
        Node::from_term(term).ok_or_else(|| mismatch(var, "IRI or blank node", term))
    }

    pub fn get_literal(&self, var: &str) -> Result<Literal, BindingError> {
        match self.get_term(var)? {
            Term::Literal(lit) => Ok(lit.clone()),
            term => Err(mismatch(var, "Literal", term)),
        }
    }

    /// Extract a non-negative integer literal, e.g. a COUNT result
    pub fn get_u64(&self, var: &str) -> Result<u64, BindingError> {
        let literal = self.get_literal(var)?;
        literal
            .value()
            .parse::<u64>()
            .map_err(|e| BindingError::ConversionFailed {
                var: var.to_string(),
                target_type: "u64",
                reason: e.to_string(),
            })
    }
}

fn mismatch(var: &str, expected: &'static str, term: &Term) -> BindingError {
    BindingError::TypeMismatch {
        var: var.to_string(),
        expected,
        actual: term_type_name(term),
    }
}

/// Get human-readable type name for a term
pub fn term_type_name(term: &Term) -> &'static str {
    match term {
        Term::NamedNode(_) => "IRI",
        Term::BlankNode(_) => "BlankNode",
        Term::Literal(_) => "Literal",
        #[allow(unreachable_patterns)]
        _ => "Triple",
    }
}
