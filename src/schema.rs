//! Schema introspection: what the store declares about a predicate or a class.

use crate::error::StoreError;
use crate::model::{PropertyCharacteristic, Restriction, RestrictionKind};
use crate::sparql::rows::{ClassRow, PropertyRow, RestrictionRow, vars};
use crate::sparql::{GraphPattern, PropertyPath, QueryBuilder, TermPattern, Variable};
use crate::store::{GraphQueryFacade, query_as};
use crate::vocab::owl;
use oxigraph::model::vocab::{rdf, rdfs};
use oxigraph::model::{NamedNode, Term};
use tracing::warn;

/// Read-only view of the schema edges held by a store.
pub struct SchemaInspector<'a, F: GraphQueryFacade + ?Sized> {
    facade: &'a F,
}

impl<'a, F: GraphQueryFacade + ?Sized> SchemaInspector<'a, F> {
    pub fn new(facade: &'a F) -> Self {
        Self { facade }
    }

    /// Characteristics declared on `property`. Super-properties are listed
    /// transitively; `owl:inverseOf` is read in both directions.
    pub fn characteristics(
        &self,
        property: &NamedNode,
    ) -> Result<Vec<PropertyCharacteristic>, StoreError> {
        let subject = TermPattern::from(property);
        let class = Variable::new(vars::CLASS);
        let other = Variable::new(vars::PROPERTY);

        let types = QueryBuilder::select()
            .distinct()
            .variable(&class)
            .triple(subject.clone(), rdf::TYPE, &class)
            .build()?;
        let mut characteristics: Vec<PropertyCharacteristic> =
            query_as::<ClassRow, _>(self.facade, &types)?
                .into_iter()
                .filter_map(|row| match row.class.as_ref() {
                    c if c == owl::FUNCTIONAL_PROPERTY => Some(PropertyCharacteristic::Functional),
                    c if c == owl::INVERSE_FUNCTIONAL_PROPERTY => {
                        Some(PropertyCharacteristic::InverseFunctional)
                    }
                    c if c == owl::SYMMETRIC_PROPERTY => Some(PropertyCharacteristic::Symmetric),
                    c if c == owl::TRANSITIVE_PROPERTY => Some(PropertyCharacteristic::Transitive),
                    _ => None,
                })
                .collect();

        let inverses = QueryBuilder::select()
            .distinct()
            .variable(&other)
            .union(vec![
                vec![GraphPattern::triple(subject.clone(), owl::INVERSE_OF, &other)],
                vec![GraphPattern::triple(&other, owl::INVERSE_OF, subject.clone())],
            ])
            .build()?;
        characteristics.extend(
            query_as::<PropertyRow, _>(self.facade, &inverses)?
                .into_iter()
                .map(|row| PropertyCharacteristic::InverseOf(row.property)),
        );

        let supers = QueryBuilder::select()
            .distinct()
            .variable(&other)
            .triple(
                subject,
                PropertyPath::predicate(rdfs::SUB_PROPERTY_OF).one_or_more(),
                &other,
            )
            .build()?;
        characteristics.extend(
            query_as::<PropertyRow, _>(self.facade, &supers)?
                .into_iter()
                .filter(|row| row.property != *property)
                .map(|row| PropertyCharacteristic::SubPropertyOf(row.property)),
        );

        Ok(characteristics)
    }

    /// Restrictions that apply to instances of `class`, found through
    /// `rdfs:subClassOf+`.
    pub fn restrictions(&self, class: &NamedNode) -> Result<Vec<Restriction>, StoreError> {
        let restriction = Variable::new(vars::RESTRICTION);
        let property = Variable::new(vars::PROPERTY);
        let kind = Variable::new(vars::KIND);
        let filler = Variable::new(vars::FILLER);
        let on_class = Variable::new(vars::ON_CLASS);

        let kinds = [
            owl::ALL_VALUES_FROM,
            owl::SOME_VALUES_FROM,
            owl::MIN_CARDINALITY,
            owl::MAX_CARDINALITY,
            owl::CARDINALITY,
        ];
        let query = QueryBuilder::select()
            .distinct()
            .variables([&restriction, &property, &kind, &filler, &on_class])
            .triple(
                class,
                PropertyPath::predicate(rdfs::SUB_CLASS_OF).one_or_more(),
                &restriction,
            )
            .triple(&restriction, rdf::TYPE, owl::RESTRICTION)
            .triple(&restriction, owl::ON_PROPERTY, &property)
            .values(&kind, kinds.map(|k| Term::from(k.into_owned())))
            .triple(&restriction, &kind, &filler)
            .optional(vec![GraphPattern::triple(
                &restriction,
                owl::ON_CLASS,
                &on_class,
            )])
            .build()?;

        let rows: Vec<RestrictionRow> = query_as(self.facade, &query)?;
        Ok(rows.into_iter().filter_map(restriction_from_row).collect())
    }
}

fn restriction_from_row(row: RestrictionRow) -> Option<Restriction> {
    let kind = match (row.kind.as_ref(), &row.filler) {
        (k, Term::NamedNode(c)) if k == owl::ALL_VALUES_FROM => {
            RestrictionKind::AllValuesFrom(c.clone())
        }
        (k, Term::NamedNode(c)) if k == owl::SOME_VALUES_FROM => {
            RestrictionKind::SomeValuesFrom(c.clone())
        }
        (k, Term::Literal(n)) => {
            let Ok(n) = n.value().parse::<u64>() else {
                warn!(restriction = %row.restriction, bound = %n, "non-integer cardinality");
                return None;
            };
            if k == owl::MIN_CARDINALITY {
                RestrictionKind::MinCardinality(n)
            } else if k == owl::MAX_CARDINALITY {
                RestrictionKind::MaxCardinality(n)
            } else if k == owl::CARDINALITY {
                RestrictionKind::ExactCardinality(n)
            } else {
                return None;
            }
        }
        _ => {
            warn!(
                restriction = %row.restriction,
                kind = %row.kind,
                filler = %row.filler,
                "unsupported restriction filler"
            );
            return None;
        }
    };
    Some(Restriction {
        node: row.restriction,
        on_property: row.property,
        kind,
        on_class: row.on_class,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::OxigraphRepository;

    const SCHEMA: &str = r#"
        @prefix ex: <http://example.org/> .
        @prefix owl: <http://www.w3.org/2002/07/owl#> .
        @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .
        @prefix xsd: <http://www.w3.org/2001/XMLSchema#> .

        ex:knows a owl:SymmetricProperty, owl:TransitiveProperty .
        ex:bestFriend rdfs:subPropertyOf ex:friend .
        ex:friend rdfs:subPropertyOf ex:knows .
        ex:childOf owl:inverseOf ex:parentOf .

        ex:Person rdfs:subClassOf ex:Agent .
        ex:Agent rdfs:subClassOf [
            a owl:Restriction ;
            owl:onProperty ex:name ;
            owl:cardinality "1"^^xsd:nonNegativeInteger
        ] .
        ex:Person rdfs:subClassOf [
            a owl:Restriction ;
            owl:onProperty ex:owns ;
            owl:maxCardinality "2"^^xsd:nonNegativeInteger ;
            owl:onClass ex:Car
        ] .
    "#;

    fn ex(name: &str) -> NamedNode {
        NamedNode::new(format!("http://example.org/{name}")).unwrap()
    }

    #[test]
    fn test_property_characteristics() {
        let repo = OxigraphRepository::from_turtle(SCHEMA).unwrap();
        let inspector = SchemaInspector::new(&repo);

        let knows = inspector.characteristics(&ex("knows")).unwrap();
        assert!(knows.contains(&PropertyCharacteristic::Symmetric));
        assert!(knows.contains(&PropertyCharacteristic::Transitive));
        assert!(!knows.contains(&PropertyCharacteristic::Functional));

        let best = inspector.characteristics(&ex("bestFriend")).unwrap();
        assert!(best.contains(&PropertyCharacteristic::SubPropertyOf(ex("friend"))));
        assert!(best.contains(&PropertyCharacteristic::SubPropertyOf(ex("knows"))));

        let parent = inspector.characteristics(&ex("parentOf")).unwrap();
        assert_eq!(
            parent,
            vec![PropertyCharacteristic::InverseOf(ex("childOf"))]
        );
    }

    #[test]
    fn test_inherited_restrictions() {
        let repo = OxigraphRepository::from_turtle(SCHEMA).unwrap();
        let restrictions = SchemaInspector::new(&repo)
            .restrictions(&ex("Person"))
            .unwrap();

        assert_eq!(restrictions.len(), 2);
        let name = restrictions
            .iter()
            .find(|r| r.on_property == ex("name"))
            .unwrap();
        assert_eq!(name.kind, RestrictionKind::ExactCardinality(1));
        assert!(!name.is_qualified());

        let owns = restrictions
            .iter()
            .find(|r| r.on_property == ex("owns"))
            .unwrap();
        assert_eq!(owns.kind.max_cardinality(), Some(2));
        assert_eq!(owns.on_class, Some(ex("Car")));
    }
}
