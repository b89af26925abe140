use std::path::PathBuf;

use clap::Parser;
use log::info;

use tctl_rs::atom::{Atom, RelOp};
use tctl_rs::checker::{Checker, CheckerConfig, Specification};
use tctl_rs::formula::Formula;
use tctl_rs::materialize::{materialize, Ringlet, Snapshot};
use tctl_rs::quantity::{Cost, Quantity};
use tctl_rs::store::{MemoryStore, PendingOrder, StoreConfig};
use tctl_rs::window::Statement;

#[derive(Debug, Parser)]
#[command(author, version)]
struct Cli {
    /// Time budget (in ns) for the light to turn green after start.
    #[arg(long, value_name = "INT", default_value = "30")]
    green_within: u64,

    /// Energy budget (in nJ) for reaching the yellow phase.
    #[arg(long, value_name = "INT", default_value = "6")]
    yellow_energy: u64,

    /// Explore breadth-first (shortest counterexamples).
    #[clap(long)]
    breadth_first: bool,

    /// Write the graph (with the first counterexample highlighted) to this DOT file.
    #[clap(long, value_name = "PATH")]
    dot: Option<PathBuf>,
}

fn phase(state: &str, light: &str, go: bool) -> Snapshot {
    Snapshot::new(state, state).with_var("light", light).with_var("go", go)
}

fn leaving(state: &str, target: &str, light: &str, go: bool) -> Snapshot {
    Snapshot::new(state, target).with_var("light", light).with_var("go", go)
}

fn cost(ns: u64, pj: u64) -> Cost {
    Cost::new(Quantity::ns(ns), Quantity::pj(pj))
}

/// Simulated ringlets of a red -> green -> yellow -> red controller. Green may
/// hold for one extra step before switching.
fn ringlets() -> Vec<Ringlet> {
    vec![
        Ringlet::new(
            phase("red", "red", false).with_entry(true),
            leaving("red", "green", "green", true),
            cost(30, 2_000),
        ),
        Ringlet::new(
            phase("green", "green", true).with_entry(true),
            leaving("green", "green", "green", true),
            cost(10, 1_000),
        ),
        Ringlet::new(
            phase("green", "green", true).with_entry(true),
            leaving("green", "yellow", "yellow", false),
            cost(25, 3_000),
        ),
        Ringlet::new(
            phase("green", "green", true),
            leaving("green", "yellow", "yellow", false),
            cost(25, 3_000),
        ),
        Ringlet::new(
            phase("yellow", "yellow", false).with_entry(true),
            leaving("yellow", "red", "red", false),
            cost(5, 1_000),
        ),
    ]
}

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = std::time::Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let initial = [phase("red", "red", false).with_entry(true)];
    let graph = materialize(&ringlets(), &initial)?;
    println!("graph: {} nodes, {} edges", graph.len(), graph.edge_count());

    let light_is = |color: &str| Formula::atom(Atom::var("light", RelOp::Eq, color));
    let go = Formula::flag("go");
    let in_yellow = Formula::atom(Atom::InState("yellow".to_string()));

    let spec = Specification::new()
        // Safety: cars only go on green.
        .with(go.clone().implies(light_is("green")).ag())
        // Liveness: every phase keeps coming back.
        .with(light_is("green").af().ag())
        .with(light_is("red").af().ag())
        // Reachability.
        .with(in_yellow.clone().ef())
        .with(go.and(light_is("red")).ef().not())
        // Budgets.
        .with(
            light_is("green")
                .af()
                .within([Statement::time(RelOp::Le, Quantity::ns(args.green_within))]),
        )
        .with(
            in_yellow
                .af()
                .within([Statement::energy(RelOp::Le, Quantity::nj(args.yellow_energy))]),
        );

    let order = if args.breadth_first {
        PendingOrder::BreadthFirst
    } else {
        PendingOrder::DepthFirst
    };
    let store = MemoryStore::new(StoreConfig {
        order,
        ..StoreConfig::default()
    });
    let mut checker = Checker::new(&graph, store, CheckerConfig::default());

    let mut first_counterexample = None;
    for (i, requirement) in spec.requirements().iter().enumerate() {
        match checker.check_formula(requirement) {
            Ok(()) => println!("[{}] holds      {}", i, requirement),
            Err(err) => {
                println!("[{}] VIOLATED   {}", i, requirement);
                println!("    {}", err);
                if first_counterexample.is_none() {
                    first_counterexample = err.counterexample().cloned();
                }
            }
        }
        info!("stats = {:?}", checker.stats());
    }

    if let Some(path) = &args.dot {
        let dot = match &first_counterexample {
            Some(counterexample) => graph.counterexample_to_dot(counterexample)?,
            None => graph.to_dot()?,
        };
        std::fs::write(path, dot)?;
        println!("Wrote {}", path.display());
    }

    let time_total = time_total.elapsed();
    println!("Done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
