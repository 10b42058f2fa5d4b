//! Schema validators
//!
//! One [`ConstraintValidator`] per axiom kind. Each one receives the anchor set
//! of a transaction and the query facade, and reports the [`Violation`]s it
//! finds among the anchors. [`ValidatorChain`] runs them in commit order.

pub mod cardinality;
pub mod property;
pub mod same_as;
pub mod uniqueness;
pub mod values;

use crate::config::ValidationConfig;
use crate::error::StoreError;
use crate::log_slow_operation;
use crate::logging::validator_span;
use crate::metrics::METRICS;
use crate::model::{AnchorSet, AxiomKind, Violation};
use crate::sparql::rows::vars;
use crate::sparql::{Expression, FromSparql, GraphPattern, PropertyPath, SelectQuery, Variable};
use crate::store::{GraphQueryFacade, query_as};
use crate::vocab::owl;
use oxigraph::model::Term;
use oxigraph::model::vocab::{rdf, rdfs};
use std::fmt;
use std::time::{Duration, Instant};

pub use cardinality::{MaxCardinalityValidator, MinCardinalityValidator};
pub use property::{
    InverseOfValidator, SubPropertyOfValidator, SymmetricValidator, TransitiveValidator,
};
pub use same_as::EquivalenceClasses;
pub use uniqueness::{FunctionalValidator, InverseFunctionalValidator};
pub use values::{AllValuesFromValidator, SomeValuesFromValidator};

/// How many violations a validation pass gathers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Stop at the first violation.
    FailFast,
    /// Gather up to `max` violations.
    CollectAll { max: usize },
}

impl ValidationMode {
    pub fn max_violations(&self) -> usize {
        match self {
            ValidationMode::FailFast => 1,
            ValidationMode::CollectAll { max } => *max,
        }
    }

    pub fn is_fail_fast(&self) -> bool {
        matches!(self, ValidationMode::FailFast)
    }
}

/// Input of one validator run.
pub struct ValidationContext<'a> {
    pub anchors: &'a AnchorSet,
    pub facade: &'a dyn GraphQueryFacade,
    pub mode: ValidationMode,
}

impl<'a> ValidationContext<'a> {
    pub fn new(
        anchors: &'a AnchorSet,
        facade: &'a dyn GraphQueryFacade,
        mode: ValidationMode,
    ) -> Self {
        Self {
            anchors,
            facade,
            mode,
        }
    }

    /// Anchors that can be written into a query.
    pub fn anchor_terms(&self) -> Vec<Term> {
        self.anchors.iris().cloned().map(Term::from).collect()
    }

    pub fn has_queryable_anchors(&self) -> bool {
        self.anchors.iris().next().is_some()
    }

    pub fn query<T: FromSparql>(&self, query: &SelectQuery) -> Result<Vec<T>, StoreError> {
        query_as(self.facade, query)
    }

    /// Row limit for queries where every row is a distinct violation.
    pub fn row_limit(&self) -> Option<usize> {
        Some(self.mode.max_violations())
    }

    /// Trim to what the mode asks for.
    pub fn finish(&self, mut violations: Vec<Violation>) -> Vec<Violation> {
        violations.truncate(self.mode.max_violations());
        violations
    }
}

/// Checks one axiom kind against the anchors of a transaction.
pub trait ConstraintValidator: Send + Sync {
    fn axiom(&self) -> AxiomKind;

    /// Violations among the anchors; empty when the axiom holds. Anchors are
    /// never empty when this is called.
    fn validate(&self, ctx: &ValidationContext<'_>) -> Result<Vec<Violation>, StoreError>;
}

fn validator_for(axiom: AxiomKind) -> Box<dyn ConstraintValidator> {
    match axiom {
        AxiomKind::Functional => Box::new(FunctionalValidator),
        AxiomKind::InverseFunctional => Box::new(InverseFunctionalValidator),
        AxiomKind::Symmetric => Box::new(SymmetricValidator),
        AxiomKind::Transitive => Box::new(TransitiveValidator),
        AxiomKind::InverseOf => Box::new(InverseOfValidator),
        AxiomKind::SubPropertyOf => Box::new(SubPropertyOfValidator),
        AxiomKind::AllValuesFrom => Box::new(AllValuesFromValidator),
        AxiomKind::SomeValuesFrom => Box::new(SomeValuesFromValidator),
        AxiomKind::MinCardinality => Box::new(MinCardinalityValidator),
        AxiomKind::MaxCardinality => Box::new(MaxCardinalityValidator),
    }
}

// =============================================================================
// ValidatorChain
// =============================================================================

/// Validators in commit order.
pub struct ValidatorChain {
    validators: Vec<Box<dyn ConstraintValidator>>,
    slow_threshold_ms: u64,
    record_metrics: bool,
}

impl ValidatorChain {
    /// All ten validators.
    pub fn standard() -> Self {
        Self::with_axioms(AxiomKind::VALIDATION_ORDER)
    }

    /// Only the given axioms, still in commit order.
    pub fn with_axioms(axioms: impl IntoIterator<Item = AxiomKind>) -> Self {
        let enabled: Vec<AxiomKind> = axioms.into_iter().collect();
        let validators = AxiomKind::VALIDATION_ORDER
            .into_iter()
            .filter(|axiom| enabled.contains(axiom))
            .map(validator_for)
            .collect();
        Self {
            validators,
            slow_threshold_ms: ValidationConfig::default().slow_validator_threshold_ms,
            record_metrics: true,
        }
    }

    pub fn from_config(config: &ValidationConfig) -> Self {
        Self::with_axioms(config.enabled_axioms.iter().copied())
            .with_slow_threshold(config.slow_validator_threshold())
            .with_metrics(config.record_metrics)
    }

    pub fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold_ms = threshold.as_millis() as u64;
        self
    }

    pub fn with_metrics(mut self, enabled: bool) -> Self {
        self.record_metrics = enabled;
        self
    }

    pub fn axioms(&self) -> Vec<AxiomKind> {
        self.validators.iter().map(|v| v.axiom()).collect()
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    /// Run the validators in order. In fail-fast mode the run stops after the
    /// first validator that reports a violation.
    pub fn run(
        &self,
        facade: &dyn GraphQueryFacade,
        anchors: &AnchorSet,
        mode: ValidationMode,
    ) -> Result<ValidationReport, StoreError> {
        let started = Instant::now();
        let mut report = ValidationReport {
            anchor_count: anchors.len(),
            ..ValidationReport::default()
        };

        let ctx = ValidationContext::new(anchors, facade, mode);
        if !ctx.has_queryable_anchors() {
            report.elapsed = started.elapsed();
            return Ok(report);
        }

        for validator in &self.validators {
            let axiom = validator.axiom();
            let _span = validator_span(axiom.into()).entered();

            let validator_started = Instant::now();
            let violations = validator.validate(&ctx)?;
            let duration = validator_started.elapsed();

            log_slow_operation!(
                duration,
                self.slow_threshold_ms,
                axiom = %axiom,
                violations = violations.len(),
                "validator finished"
            );
            if self.record_metrics {
                METRICS.record_validator(axiom, duration, violations.len());
            }

            report.validators_run.push(axiom);
            let room = mode.max_violations() - report.violations.len();
            if violations.len() > room {
                report.truncated = true;
            }
            report.violations.extend(violations.into_iter().take(room));

            if report.violations.len() >= mode.max_violations() {
                break;
            }
        }

        report.elapsed = started.elapsed();
        Ok(report)
    }
}

impl Default for ValidatorChain {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for ValidatorChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidatorChain")
            .field("axioms", &self.axioms())
            .field("slow_threshold_ms", &self.slow_threshold_ms)
            .field("record_metrics", &self.record_metrics)
            .finish()
    }
}

// =============================================================================
// ValidationReport
// =============================================================================

/// Outcome of one pass of the validator chain.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
    pub anchor_count: usize,
    pub validators_run: Vec<AxiomKind>,
    pub elapsed: Duration,
    /// Violations were dropped because the mode's cap was reached.
    pub truncated: bool,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn first(&self) -> Option<&Violation> {
        self.violations.first()
    }

    pub fn count(&self, axiom: AxiomKind) -> usize {
        self.violations.iter().filter(|v| v.axiom == axiom).count()
    }

    pub fn summary(&self) -> String {
        format!(
            "Validation Report: {} anchors, {} validators, {} violations{}",
            self.anchor_count,
            self.validators_run.len(),
            self.violations.len(),
            if self.truncated { " (truncated)" } else { "" }
        )
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.summary())?;
        if !self.violations.is_empty() {
            writeln!(f, "\nViolations:")?;
            for (i, v) in self.violations.iter().enumerate() {
                writeln!(f, "  {}. {}", i + 1, v)?;
                writeln!(f, "     subject: {}  predicate: {}", v.subject, v.predicate)?;
            }
        }
        Ok(())
    }
}

// =============================================================================
// Shared query fragments
// =============================================================================

pub(crate) fn var(name: &str) -> Variable {
    Variable::new(name)
}

/// `VALUES ?anchor { ... }` over the queryable anchors.
pub(crate) fn anchor_values(ctx: &ValidationContext<'_>) -> GraphPattern {
    GraphPattern::Values {
        variable: var(vars::ANCHOR),
        terms: ctx.anchor_terms(),
    }
}

/// The anchor's type is a subclass of an `owl:Restriction` on `?property`.
pub(crate) fn restriction_on_property() -> Vec<GraphPattern> {
    let anchor = var(vars::ANCHOR);
    let ty = var(vars::TYPE);
    let restriction = var(vars::RESTRICTION);
    vec![
        GraphPattern::triple(&anchor, rdf::TYPE, &ty),
        GraphPattern::triple(
            &ty,
            PropertyPath::predicate(rdfs::SUB_CLASS_OF).one_or_more(),
            &restriction,
        ),
        GraphPattern::triple(&restriction, rdf::TYPE, owl::RESTRICTION),
        GraphPattern::triple(&restriction, owl::ON_PROPERTY, var(vars::PROPERTY)),
    ]
}

/// `?node rdf:type/rdfs:subClassOf* ?class`
pub(crate) fn instance_of(node: &Variable, class: &Variable) -> GraphPattern {
    GraphPattern::triple(
        node,
        PropertyPath::predicate(rdf::TYPE)
            .then(PropertyPath::predicate(rdfs::SUB_CLASS_OF).zero_or_more()),
        class,
    )
}

/// Filters rejecting pairs where either node reaches the other over
/// `owl:sameAs+`.
pub(crate) fn not_same_as(left: &Variable, right: &Variable) -> Vec<GraphPattern> {
    let same_as = || PropertyPath::predicate(owl::SAME_AS).one_or_more();
    vec![
        GraphPattern::Filter(Expression::NotExists(vec![
            GraphPattern::triple(left, same_as(), right),
        ])),
        GraphPattern::Filter(Expression::NotExists(vec![
            GraphPattern::triple(right, same_as(), left),
        ])),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Node;
    use crate::store::OxigraphRepository;

    #[test]
    fn test_standard_chain_order() {
        let chain = ValidatorChain::standard();
        assert_eq!(chain.axioms(), AxiomKind::VALIDATION_ORDER.to_vec());
    }

    #[test]
    fn test_with_axioms_keeps_commit_order() {
        let chain = ValidatorChain::with_axioms([
            AxiomKind::MaxCardinality,
            AxiomKind::Functional,
            AxiomKind::Symmetric,
        ]);
        assert_eq!(
            chain.axioms(),
            vec![
                AxiomKind::Functional,
                AxiomKind::Symmetric,
                AxiomKind::MaxCardinality
            ]
        );
    }

    #[test]
    fn test_empty_anchor_set_is_valid() {
        let repo = OxigraphRepository::new().unwrap();
        let report = ValidatorChain::standard()
            .run(&repo, &AnchorSet::new(), ValidationMode::FailFast)
            .unwrap();
        assert!(report.is_valid());
        assert!(report.validators_run.is_empty());
    }

    #[test]
    fn test_fail_fast_stops_after_first_violation() {
        let repo = OxigraphRepository::from_turtle(
            r#"
            @prefix ex: <http://example.org/> .
            @prefix owl: <http://www.w3.org/2002/07/owl#> .
            ex:p a owl:FunctionalProperty, owl:SymmetricProperty .
            ex:a ex:p ex:b, ex:c .
            "#,
        )
        .unwrap();
        let anchors: AnchorSet = ["a", "b", "c"]
            .iter()
            .map(|n| Node::iri(&format!("http://example.org/{n}")).unwrap())
            .collect();

        let chain = ValidatorChain::standard().with_metrics(false);
        let report = chain.run(&repo, &anchors, ValidationMode::FailFast).unwrap();
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.validators_run, vec![AxiomKind::Functional]);

        let report = chain
            .run(&repo, &anchors, ValidationMode::CollectAll { max: 10 })
            .unwrap();
        assert_eq!(report.count(AxiomKind::Functional), 1);
        assert_eq!(report.count(AxiomKind::Symmetric), 2);
        assert_eq!(report.validators_run.len(), 10);
        assert!(report.summary().contains("3 violations"));
    }
}
