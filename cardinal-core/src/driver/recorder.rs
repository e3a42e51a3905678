use crate::{formula::Formula, host::OutputChannel};
use std::fmt::Write as _;

/// Output channel that keeps everything it is sent.
#[derive(Debug, Default)]
pub struct Recorder {
    pub lemmas: Vec<Formula>,
    pub conflicts: Vec<Formula>,
    /// `(literal, preferred phase)`
    pub splits: Vec<(Formula, bool)>,
    pub phases: Vec<(Formula, bool)>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn is_empty(&self) -> bool {
        self.lemmas.is_empty()
            && self.conflicts.is_empty()
            && self.splits.is_empty()
            && self.phases.is_empty()
    }
    pub fn clear(&mut self) {
        self.lemmas.clear();
        self.conflicts.clear();
        self.splits.clear();
        self.phases.clear();
    }
    /// Everything sent, one item per line.
    pub fn dbg_summary(&self) -> String {
        let mut out = String::new();
        for lemma in &self.lemmas {
            let _: std::fmt::Result = writeln!(out, "lemma {lemma}");
        }
        for conflict in &self.conflicts {
            let _: std::fmt::Result = writeln!(out, "conflict {conflict}");
        }
        for (literal, phase) in &self.splits {
            let _: std::fmt::Result = writeln!(out, "split {literal} {phase}");
        }
        for (literal, phase) in &self.phases {
            let _: std::fmt::Result = writeln!(out, "phase {literal} {phase}");
        }
        out
    }
}

impl OutputChannel for Recorder {
    fn lemma(&mut self, lemma: Formula) {
        self.lemmas.push(lemma);
    }
    fn conflict(&mut self, conflict: Formula) {
        self.conflicts.push(conflict);
    }
    fn propose_split(&mut self, literal: Formula, preferred_phase: bool) {
        self.splits.push((literal, preferred_phase));
    }
    fn require_phase(&mut self, literal: Formula, phase: bool) {
        self.phases.push((literal, phase));
    }
}
