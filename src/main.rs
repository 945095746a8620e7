use anyhow::{bail, Result};
use clap::{Parser, ValueEnum};
use log::{error, info};

use junction_rules::network::{
    fix_junction, fix_roundabout, fix_roundabout_ring, mass_edit, NodeId, PrioritySignsMassEditMode,
    Scenario, SegmentId, SimRuleStore,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ScenarioKind {
    Crossroads,
    TJunction,
    Roundabout,
    Avenue,
    Grid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Action {
    /// Main road / yield split at a node
    FixJunction,
    /// Follow traffic straight ahead from a segment
    FixRoundabout,
    /// Main road rules around a one-way ring
    FixRoundaboutRing,
    /// Main/yield signs along a road in both directions
    MassEdit,
}

#[derive(Parser)]
#[command(name = "junction_rules")]
#[command(about = "Applies priority rules to a sample road network")]
struct Cli {
    /// Network to build
    #[arg(long, value_enum, default_value = "crossroads")]
    scenario: ScenarioKind,

    /// Operation to run
    #[arg(long, value_enum, default_value = "fix-junction")]
    action: Action,

    /// Node to operate on (defaults to the scenario's focus node)
    #[arg(long)]
    node: Option<u16>,

    /// Segment to operate on (defaults to the scenario's focus segment)
    #[arg(long)]
    segment: Option<u16>,

    /// Seed for the random grid
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Nodes per side of the random grid
    #[arg(long, default_value = "5")]
    size: usize,

    /// Apply the action this many times
    #[arg(long, default_value = "1")]
    repeat: u32,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let scenario = match cli.scenario {
        ScenarioKind::Crossroads => Scenario::crossroads()?,
        ScenarioKind::TJunction => Scenario::t_junction()?,
        ScenarioKind::Roundabout => Scenario::roundabout()?,
        ScenarioKind::Avenue => Scenario::avenue()?,
        ScenarioKind::Grid => Scenario::random_grid(cli.seed, cli.size)?,
    };

    let node = cli.node.map(NodeId).unwrap_or(scenario.focus_node);
    let segment = cli.segment.map(SegmentId).unwrap_or(scenario.focus_segment);

    if cli.node.is_some() && scenario.network.node(node).is_none() {
        bail!("{} does not exist in scenario {}", node, scenario.name);
    }
    if cli.segment.is_some() && scenario.network.segment(segment).is_none() {
        bail!("{} does not exist in scenario {}", segment, scenario.name);
    }

    let mut store = SimRuleStore::new(&scenario.network);
    let network = &scenario.network;

    let mut mass_edit_mode = PrioritySignsMassEditMode::default();
    let mut previous_mutations = 0;

    for pass in 1..=cli.repeat.max(1) {
        match cli.action {
            Action::FixJunction => {
                let classification = fix_junction(network, &mut store, node);
                info!("Pass {}: {} -> {:?}", pass, node, classification);
            }
            Action::FixRoundabout => {
                let visited = fix_roundabout(network, &mut store, segment);
                info!("Pass {}: fixed {} segments from {}", pass, visited, segment);
            }
            Action::FixRoundaboutRing => {
                let applied = fix_roundabout_ring(network, &mut store, segment);
                info!("Pass {}: ring from {} applied={}", pass, segment, applied);
            }
            Action::MassEdit => {
                let (primary, secondary) = mass_edit_mode.signs();
                let visited = mass_edit(network, &mut store, segment, primary, secondary);
                info!(
                    "Pass {}: mass edit {:?} from {} touched {} segments",
                    pass, mass_edit_mode, segment, visited
                );
                mass_edit_mode = mass_edit_mode.next();
            }
        }

        let mutations = store.mutation_count() - previous_mutations;
        previous_mutations = store.mutation_count();
        info!("Pass {}: {} rule changes", pass, mutations);
    }

    println!();
    scenario.print_summary(&store);

    Ok(())
}
