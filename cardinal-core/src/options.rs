/// Knobs read by the strong solver.
#[allow(clippy::struct_excessive_bools)]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Configuration {
    /// Partition representatives into regions. When false everything lives in one region.
    pub regions: bool,
    /// Totality mode: no regions, every term is forced onto a witness.
    pub totality: bool,
    /// Use totality axioms for cardinalities up to this bound only.
    pub totality_limit: Option<u32>,
    /// Emit totality axioms at full effort instead of on registration.
    pub totality_lazy: bool,
    pub simple_cliques: bool,
    /// Build clique conflicts out of the asserted disequalities.
    pub explained_cliques: bool,
    /// Propose splits at standard effort too.
    pub eager_splits: bool,
    pub minimal_model: bool,
    /// Allocating this cardinality stops the search.
    pub abort_cardinality: Option<u32>,
    pub smart_splits: bool,
    pub disequality_propagation: bool,
    pub term_disambiguation: bool,
    pub sort_inference: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            regions: true,
            totality: false,
            totality_limit: None,
            totality_lazy: false,
            simple_cliques: true,
            explained_cliques: false,
            eager_splits: false,
            minimal_model: true,
            abort_cardinality: None,
            smart_splits: false,
            disequality_propagation: false,
            term_disambiguation: false,
            sort_inference: false,
        }
    }
}

impl Configuration {
    /// Whether totality axioms are used for cardinality `k`.
    pub fn apply_totality(&self, k: u32) -> bool {
        self.totality || self.totality_limit.is_some_and(|limit| k <= limit)
    }
    /// Whether clique lemmas are built from the recorded disequality reasons.
    pub fn explain_cliques(&self) -> bool {
        self.explained_cliques || !self.simple_cliques
    }
}
