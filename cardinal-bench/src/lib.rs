//! Random graph coloring problems for the search driver.
//!
//! A problem is a set of constants of one sort with a disequality for every edge of a random
//! graph, so the smallest model has the chromatic number of the graph as its cardinality.

use cardinal_core::{Configuration, Result, SortId, TermId, driver::Search};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Problem {
    pub vertices: usize,
    pub edges: Vec<(usize, usize)>,
}

impl Problem {
    /// Each pair is an edge with probability `density` percent. The first `clique` vertices
    /// are pairwise connected.
    pub fn random(seed: u64, vertices: usize, density: u32, clique: usize) -> Self {
        let mut rng = oorandom::Rand32::new(seed);
        let mut edges = Vec::new();
        for i in 0..vertices {
            for j in i + 1..vertices {
                if j < clique || rng.rand_range(0..100) < density {
                    edges.push((i, j));
                }
            }
        }
        Self { vertices, edges }
    }

    /// Register the problem in a fresh search.
    pub fn build(&self, config: Configuration) -> Result<(Search, SortId, Vec<TermId>)> {
        let mut search = Search::new(config);
        let sort = search.add_sort("V");
        let terms = (0..self.vertices)
            .map(|i| search.add_constant(sort, &format!("v{i}")))
            .collect::<Result<Vec<_>>>()?;
        for &(a, b) in &self.edges {
            search.assert_distinct(terms[a], terms[b])?;
        }
        Ok((search, sort, terms))
    }

    /// Smallest model size, or `None` if the search gave up.
    pub fn solve(&self, config: Configuration) -> Option<u32> {
        let (mut search, sort, _) = self.build(config).ok()?;
        search.run().ok()?.cardinality(sort)
    }
}

/// `(name, seed, vertices, density, clique)`
pub const BENCHMARKS: [(&str, u64, usize, u32, usize); 5] = [
    ("sparse12", 1, 12, 15, 0),
    ("dense10", 2, 10, 60, 0),
    ("clique8", 3, 12, 10, 4),
    ("medium16", 4, 16, 25, 0),
    ("planted20", 5, 20, 10, 5),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planted_clique_is_complete() {
        let problem = Problem::random(7, 6, 0, 4);
        assert_eq!(
            problem.edges,
            [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]
        );
        assert_eq!(problem.solve(Configuration::default()), Some(4));
    }

    #[test]
    fn generation_is_deterministic() {
        assert_eq!(Problem::random(42, 10, 30, 0), Problem::random(42, 10, 30, 0));
        let full = Problem::random(42, 5, 100, 0);
        assert_eq!(full.edges.len(), 10);
        assert_eq!(full.solve(Configuration::default()), Some(5));
    }
}
