use super::{Env, SortModel};
use crate::{
    error::{Result, SolverError},
    formula::Formula,
    ids::TermId,
};

impl SortModel {
    /// Allocate cardinality 1. Must be called once, right after construction.
    pub fn initialize(&mut self, env: &mut Env<'_>) -> Result<()> {
        debug_assert_eq!(self.allocated, 0);
        self.allocate_cardinality(env)
    }

    /// The committed upper bound, if a cardinality literal is asserted true.
    pub fn cardinality(&self) -> Option<u32> {
        self.has_card.get().then(|| self.cardinality.get())
    }
    /// Highest cardinality with a literal so far. Never decreases.
    pub fn allocated_cardinality(&self) -> u32 {
        self.allocated
    }
    pub fn cardinality_literal(&self, k: u32) -> Option<&Formula> {
        self.card_literals.get(&k)
    }

    /// Create the literal for the next cardinality and ask the search to decide it.
    pub fn allocate_cardinality(&mut self, env: &mut Env<'_>) -> Result<()> {
        let next = self.allocated + 1;
        if let Some(limit) = self.config.abort_cardinality.filter(|&limit| next >= limit) {
            tracing::info!("sort {} reached cardinality limit {limit}", self.sort);
            return Err(SolverError::CardinalityLimit {
                sort: self.sort,
                limit,
            });
        }
        if self.allocated > 0 {
            tracing::info!("no model of size {} for sort {}", self.allocated, self.sort);
        }
        self.allocated = next;

        if self.config.apply_totality(next) {
            let witness = if next == 1 {
                self.card_term
            } else {
                env.ee.fresh_term(self.sort, &format!("_c_{next}"))
            };
            for &other in &self.totality_terms {
                env.out.lemma(Formula::neq(witness, other));
            }
            self.totality_terms.push(witness);
        }

        let literal = Formula::card(self.sort, next);
        self.card_literals.insert(next, literal.clone());
        env.out
            .lemma(Formula::or(vec![literal.clone(), literal.clone().negate()]));
        env.out.require_phase(literal, true);
        env.stats.max_model_size = env.stats.max_model_size.max(next);
        tracing::debug!("allocated cardinality {next} for sort {}", self.sort);

        if self.config.apply_totality(next) && !self.config.totality_lazy {
            let terms: Vec<TermId> = self.slots.keys().copied().collect();
            for n in terms {
                self.add_totality_axiom(n, next, env);
            }
        }
        Ok(())
    }

    /// The search assigned the literal for cardinality `k`.
    pub fn assert_cardinality(&mut self, k: u32, value: bool, env: &mut Env<'_>) -> Result<()> {
        if self.conflict.get() {
            return Ok(());
        }
        assert!(self.card_literals.contains_key(&k), "cardinality {k} not allocated");
        tracing::trace!("assert cardinality {k} = {value} for sort {}", self.sort);
        self.card_assertions.insert(self.level, k, value);
        if value {
            let first = !self.has_card.get();
            if first || k < self.cardinality.get() {
                self.cardinality.set(self.level, k);
            }
            self.has_card.set(self.level, true);
            if first {
                for ri in self.regions.ids_below(self.regions_index.get()) {
                    if self.regions[ri].valid() {
                        self.check_region(ri, true, env);
                        if self.conflict.get() {
                            break;
                        }
                    }
                }
            }
        } else if !self.has_card.get()
            && self
                .card_literals
                .keys()
                .all(|j| self.card_assertions.contains_key(j))
        {
            self.allocate_cardinality(env)?;
        }
        Ok(())
    }

    /// The lowest undecided cardinality literal worth deciding.
    pub fn next_decision_request(&self) -> Option<Formula> {
        let bound = self.cardinality();
        (1..=self.allocated)
            .filter(|&i| bound.is_none_or(|card| i < card))
            .find(|i| !self.card_assertions.contains_key(i))
            .map(|i| self.card_literals[&i].clone())
    }

    /// `card <= k` implies `n` equals one of the first `k` witnesses.
    pub(super) fn add_totality_axiom(&mut self, n: TermId, k: u32, env: &mut Env<'_>) {
        if !self.totality_sent.insert((n, k)) {
            return;
        }
        let witnesses: Vec<Formula> = self
            .totality_terms
            .iter()
            .take(k as usize)
            .map(|&w| Formula::eq(n, w))
            .collect();
        let lemma = Formula::implies(self.card_literals[&k].clone(), Formula::or(witnesses));
        tracing::trace!("totality axiom {lemma}");
        env.out.lemma(lemma);
        env.stats.totality_lemmas += 1;
    }
}
