//! OWL vocabulary terms used by the validators.
//!
//! RDF and RDFS terms come from [`oxigraph::model::vocab`]; oxigraph does not
//! ship the OWL namespace, so the handful of terms the validators need live here.

pub mod owl {
    use oxigraph::model::NamedNodeRef;

    pub const NAMESPACE: &str = "http://www.w3.org/2002/07/owl#";

    /// owl:sameAs
    pub const SAME_AS: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#sameAs");
    /// owl:FunctionalProperty
    pub const FUNCTIONAL_PROPERTY: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#FunctionalProperty");
    /// owl:InverseFunctionalProperty
    pub const INVERSE_FUNCTIONAL_PROPERTY: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#InverseFunctionalProperty");
    /// owl:SymmetricProperty
    pub const SYMMETRIC_PROPERTY: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#SymmetricProperty");
    /// owl:TransitiveProperty
    pub const TRANSITIVE_PROPERTY: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#TransitiveProperty");
    /// owl:inverseOf
    pub const INVERSE_OF: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#inverseOf");
    /// owl:Restriction
    pub const RESTRICTION: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#Restriction");
    /// owl:onProperty
    pub const ON_PROPERTY: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#onProperty");
    /// owl:onClass
    pub const ON_CLASS: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#onClass");
    /// owl:allValuesFrom
    pub const ALL_VALUES_FROM: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#allValuesFrom");
    /// owl:someValuesFrom
    pub const SOME_VALUES_FROM: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#someValuesFrom");
    /// owl:minCardinality
    pub const MIN_CARDINALITY: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#minCardinality");
    /// owl:maxCardinality
    pub const MAX_CARDINALITY: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#maxCardinality");
    /// owl:cardinality
    pub const CARDINALITY: NamedNodeRef<'static> =
        NamedNodeRef::new_unchecked("http://www.w3.org/2002/07/owl#cardinality");
}

/// Predicate that never occurs in data. Negating it yields "any predicate"
/// inside a property path.
pub const NO_PREDICATE: oxigraph::model::NamedNodeRef<'static> =
    oxigraph::model::NamedNodeRef::new_unchecked("urn:owl-guard:no-predicate");

/// Prefix for IRIs minted by the object mapper.
pub const MINTED_IRI_PREFIX: &str = "urn:uuid:";
