//! Finite model finding for uninterpreted sorts.
//!
//! [`StrongSolver`] answers whether the equalities and disequalities asserted so far admit a
//! model where every uninterpreted sort has at most `k` elements, for a cardinality `k` decided
//! by the surrounding search. Representatives of each sort are kept in regions that partition
//! the disequality graph, and cliques of pairwise disequal terms larger than `k` are reported
//! as conflicts.

mod context;
mod error;
mod formula;
mod host;
mod ids;
mod options;
mod propagate;
mod region;
mod solver;
mod sort_model;
mod stats;
mod typed_vec;

pub mod driver;

pub use context::{CdMap, CdSet, CdValue, CdVec, Level};
pub use error::{Result, SolverError};
pub use formula::Formula;
pub use host::{Effort, EqualityEngine, Notification, OutputChannel, TermDatabase};
pub use ids::{OpId, RegionId, SortId, TermId};
pub use options::Configuration;
pub use propagate::{DisequalityPropagator, TermDisambiguator};
pub use region::{DiseqKind, DisequalityList, Region, RegionNodeInfo};
pub use solver::StrongSolver;
pub use sort_model::{Env, SortModel};
pub use stats::Statistics;

#[cfg(test)]
mod proptests;

/// Time a block, logging the elapsed time at trace level.
#[macro_export]
macro_rules! log_duration {
    ($literal:literal, $($tt:ident,)* $block:block) => {{
        let start = std::time::Instant::now();
        let res = $block;
        tracing::trace!(
            $literal,
            $($tt, )*
            format!("{:.3} ms", start.elapsed().as_secs_f64() * 1000.0)
        );
        res
    }};
}
