use std::fmt;

/// Counters for one solver session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Statistics {
    pub clique_conflicts: u64,
    pub clique_lemmas: u64,
    pub split_lemmas: u64,
    pub disambiguation_lemmas: u64,
    pub totality_lemmas: u64,
    pub disequality_propagations: u64,
    pub max_model_size: u32,
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            clique_conflicts,
            clique_lemmas,
            split_lemmas,
            disambiguation_lemmas,
            totality_lemmas,
            disequality_propagations,
            max_model_size,
        } = self;
        writeln!(f, "clique conflicts: {clique_conflicts}")?;
        writeln!(f, "clique lemmas: {clique_lemmas}")?;
        writeln!(f, "split lemmas: {split_lemmas}")?;
        writeln!(f, "disambiguation lemmas: {disambiguation_lemmas}")?;
        writeln!(f, "totality lemmas: {totality_lemmas}")?;
        writeln!(f, "disequality propagations: {disequality_propagations}")?;
        write!(f, "max model size: {max_model_size}")
    }
}
