//! `owl:sameAs` equivalence classes over a set of values.
//!
//! Union-find with path compression and union-by-rank. Cardinality counts
//! one value per class, so `ex:m1 owl:sameAs ex:m2` counts once.
//!
//! Two values are linked when one reaches the other over `owl:sameAs+`,
//! the relation the functional validators test. Values that only share a
//! third node (`m1 sameAs hub . m2 sameAs hub`) stay apart unless that
//! node is itself one of the values.

use super::{ValidationContext, var};
use crate::error::StoreError;
use crate::sparql::rows::{SameAsPairRow, vars};
use crate::sparql::{PropertyPath, QueryBuilder};
use crate::vocab::owl;
use indexmap::IndexMap;
use oxigraph::model::Term;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct EquivalenceClasses {
    /// Term -> slot in `parent`/`rank`
    index: IndexMap<Term, usize>,
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl EquivalenceClasses {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classes for `values`, merged for every pair where one value reaches
    /// the other over `owl:sameAs+`.
    pub fn load(ctx: &ValidationContext<'_>, values: &[Term]) -> Result<Self, StoreError> {
        let mut classes = Self::new();
        let iris: Vec<Term> = values
            .iter()
            .filter(|t| matches!(t, Term::NamedNode(_)))
            .cloned()
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        if iris.is_empty() {
            return Ok(classes);
        }

        let left = var(vars::LEFT);
        let right = var(vars::RIGHT);
        let query = QueryBuilder::select()
            .distinct()
            .variables([&left, &right])
            .values(&left, iris.iter().cloned())
            .values(&right, iris)
            .triple(
                &left,
                PropertyPath::predicate(owl::SAME_AS).one_or_more(),
                &right,
            )
            .build()?;

        let rows: Vec<SameAsPairRow> = ctx.query(&query)?;
        for row in rows {
            classes.union(&row.left, &row.right);
        }
        Ok(classes)
    }

    fn slot(&mut self, term: &Term) -> usize {
        if let Some(slot) = self.index.get(term) {
            return *slot;
        }
        let slot = self.parent.len();
        self.index.insert(term.clone(), slot);
        self.parent.push(slot);
        self.rank.push(0);
        slot
    }

    fn root(&mut self, slot: usize) -> usize {
        let mut root = slot;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        let mut current = slot;
        while self.parent[current] != root {
            let next = self.parent[current];
            self.parent[current] = root;
            current = next;
        }
        root
    }

    /// Representative slot of the class holding `term`.
    pub fn find(&mut self, term: &Term) -> usize {
        let slot = self.slot(term);
        self.root(slot)
    }

    /// Merge the classes of `a` and `b`. Returns `false` when they already
    /// were one class.
    pub fn union(&mut self, a: &Term, b: &Term) -> bool {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return false;
        }
        match self.rank[root_a].cmp(&self.rank[root_b]) {
            std::cmp::Ordering::Less => self.parent[root_a] = root_b,
            std::cmp::Ordering::Greater => self.parent[root_b] = root_a,
            std::cmp::Ordering::Equal => {
                self.parent[root_b] = root_a;
                self.rank[root_a] += 1;
            }
        }
        true
    }

    pub fn same(&mut self, a: &Term, b: &Term) -> bool {
        self.find(a) == self.find(b)
    }

    /// Number of distinct classes among `terms`.
    pub fn count_distinct<'t>(&mut self, terms: impl IntoIterator<Item = &'t Term>) -> usize {
        let roots: HashSet<usize> = terms.into_iter().map(|t| self.find(t)).collect();
        roots.len()
    }

    /// Number of tracked terms.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}
