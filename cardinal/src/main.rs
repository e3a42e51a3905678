use cardinal_bench::Problem;
use cardinal_core::{Configuration, SolverError, driver::Outcome};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Find the smallest model of a random graph coloring problem.
#[derive(Parser)]
#[command(version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Number of constants.
    #[arg(short = 'n', long, default_value_t = 10)]
    terms: usize,

    /// Chance in percent that two constants are asserted distinct.
    #[arg(short, long, default_value_t = 30)]
    density: u32,

    #[arg(short, long, default_value_t = 0)]
    seed: u64,

    /// Make the first constants pairwise distinct.
    #[arg(short, long, default_value_t = 0)]
    clique: usize,

    /// Give up when this cardinality is reached.
    #[arg(long, value_name = "K")]
    abort_cardinality: Option<u32>,

    /// Keep all terms in a single region.
    #[arg(long)]
    no_regions: bool,

    /// Use totality axioms instead of regions.
    #[arg(long)]
    totality: bool,

    #[arg(long, value_name = "K")]
    totality_limit: Option<u32>,

    /// Send totality axioms at full effort only.
    #[arg(long)]
    totality_lazy: bool,

    /// Build clique lemmas from the asserted disequalities instead of pairwise equalities.
    #[arg(long)]
    no_simple_cliques: bool,

    #[arg(long)]
    explained_cliques: bool,

    #[arg(long)]
    eager_splits: bool,

    #[arg(long)]
    smart_splits: bool,

    /// Stop refuting cliques, which may report a model smaller than needed.
    #[arg(long)]
    no_minimal_model: bool,

    /// Derive argument disequalities from predicate polarity.
    #[arg(long)]
    disequality_propagation: bool,

    /// Split applications whose arguments are not yet known to differ.
    #[arg(long)]
    term_disambiguation: bool,

    /// Combine regions holding terms of the same inferred sort.
    #[arg(long)]
    sort_inference: bool,

    /// Print the regions of every sort after the search.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn config(&self) -> Configuration {
        Configuration {
            regions: !self.no_regions,
            totality: self.totality,
            totality_limit: self.totality_limit,
            totality_lazy: self.totality_lazy,
            simple_cliques: !self.no_simple_cliques,
            explained_cliques: self.explained_cliques,
            eager_splits: self.eager_splits,
            minimal_model: !self.no_minimal_model,
            abort_cardinality: self.abort_cardinality,
            smart_splits: self.smart_splits,
            disequality_propagation: self.disequality_propagation,
            term_disambiguation: self.term_disambiguation,
            sort_inference: self.sort_inference,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let problem = Problem::random(cli.seed, cli.terms, cli.density, cli.clique);
    tracing::info!(
        "{} constants, {} disequalities",
        problem.vertices,
        problem.edges.len()
    );

    let result = problem
        .build(cli.config())
        .and_then(|(mut search, sort, _)| Ok((search.run()?, search, sort)));
    match result {
        Ok((Outcome::Sat(sorts), search, _)) => {
            for summary in &sorts {
                println!(
                    "sort {}: cardinality {}, {} representatives",
                    search.engine().sort_name(summary.sort),
                    summary.cardinality,
                    summary.representatives.len()
                );
            }
            println!(
                "decisions: {}, backtracks: {}",
                search.decisions(),
                search.backtracks()
            );
            println!("{}", search.statistics());
            if cli.verbose {
                print!("{}", search.dbg_summary());
            }
            ExitCode::SUCCESS
        }
        Ok((Outcome::Unsat, _, _)) => {
            println!("unsat");
            ExitCode::SUCCESS
        }
        Err(err @ SolverError::CardinalityLimit { .. }) => {
            tracing::warn!("{err}");
            ExitCode::from(2)
        }
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
