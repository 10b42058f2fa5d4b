// =============================================================================
// Result Mapper
// =============================================================================
// Map result rows to typed row structs with error accumulation

use super::typed_binding::{BindingError, ResultRow};
use thiserror::Error;

/// Errors that can occur during result mapping
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MappingError {
    #[error("Binding error: {0}")]
    Binding(#[from] BindingError),

    #[error("Multiple errors occurred:\n{}", .0.join("\n"))]
    Multiple(Vec<String>),
}

/// Types that can be constructed from one result row
pub trait FromSparql: Sized {
    fn from_row(row: &ResultRow) -> Result<Self, MappingError>;
}

pub struct ResultMapper;

impl ResultMapper {
    pub fn map_one<T: FromSparql>(row: &ResultRow) -> Result<T, MappingError> {
        T::from_row(row)
    }

    /// Map every row, reporting all failing rows together.
    pub fn map_many<T: FromSparql>(rows: &[ResultRow]) -> Result<Vec<T>, MappingError> {
        let mut results = Vec::with_capacity(rows.len());
        let mut errors = Vec::new();

        for (idx, row) in rows.iter().enumerate() {
            match T::from_row(row) {
                Ok(item) => results.push(item),
                Err(e) => errors.push(format!("Row {}: {}", idx, e)),
            }
        }

        if !errors.is_empty() {
            return Err(MappingError::Multiple(errors));
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparql::typed_binding::TypedBinding;
    use oxigraph::model::{Literal, NamedNode, Term};

    #[derive(Debug, PartialEq)]
    struct Named {
        iri: NamedNode,
    }

    impl FromSparql for Named {
        fn from_row(row: &ResultRow) -> Result<Self, MappingError> {
            let binding = TypedBinding::new(row);
            Ok(Self {
                iri: binding.get_iri("iri")?,
            })
        }
    }

    fn iri_row(term: Term) -> ResultRow {
        [("iri", term)].into_iter().collect()
    }

    #[test]
    fn test_map_many_success() {
        let rows = vec![
            iri_row(NamedNode::new("http://example.org/a").unwrap().into()),
            iri_row(NamedNode::new("http://example.org/b").unwrap().into()),
        ];
        let mapped: Vec<Named> = ResultMapper::map_many(&rows).unwrap();
        assert_eq!(mapped.len(), 2);
        assert_eq!(mapped[1].iri.as_str(), "http://example.org/b");
    }

    #[test]
    fn test_map_many_accumulates_errors() {
        let rows = vec![
            iri_row(Literal::new_simple_literal("x").into()),
            iri_row(NamedNode::new("http://example.org/a").unwrap().into()),
            ResultRow::new(),
        ];
        match ResultMapper::map_many::<Named>(&rows) {
            Err(MappingError::Multiple(errors)) => {
                assert_eq!(errors.len(), 2);
                assert!(errors[0].starts_with("Row 0"));
                assert!(errors[1].starts_with("Row 2"));
            }
            other => panic!("expected accumulated errors, got {:?}", other),
        }
    }
}
