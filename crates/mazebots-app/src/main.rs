//! Command-line entry point for running MazeBots agents.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use mazebots_app::{builtin_layout, run_episode, Outcome};
use mazebots_brain::{Agent, MdpAgent, MdpConfig, RandomAgent, RandomishAgent, SensingAgent};
use mazebots_core::MazeSnapshot;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AgentKind {
    /// Value-iteration planner.
    Mdp,
    /// Uniform random baseline.
    Random,
    /// Heading-keeping random baseline.
    Randomish,
    /// Stand still and log percepts.
    Sensing,
}

/// Run maze agents over built-in or on-disk layouts.
#[derive(Debug, Parser)]
#[command(name = "mazebots", version, about)]
struct Cli {
    /// Agent driving the maze.
    #[arg(long, value_enum, default_value_t = AgentKind::Mdp)]
    agent: AgentKind,

    /// Built-in layout name (`small`, `medium`) or a path to a layout file.
    #[arg(long, default_value = "medium")]
    layout: String,

    /// Number of independent episodes.
    #[arg(long, default_value_t = 1)]
    episodes: u32,

    /// Turn cap per episode.
    #[arg(long, default_value_t = 300)]
    max_turns: u32,

    /// Base seed for world noise and agent randomness. Random when omitted.
    #[arg(long)]
    seed: Option<u64>,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn load_layout(source: &str) -> Result<String> {
    if let Some(builtin) = builtin_layout(source) {
        return Ok(builtin.to_owned());
    }
    std::fs::read_to_string(source).with_context(|| format!("reading layout file {source}"))
}

fn build_agent(kind: AgentKind, seed: u64) -> Result<Box<dyn Agent>> {
    Ok(match kind {
        AgentKind::Mdp => Box::new(MdpAgent::new(MdpConfig::default())?),
        AgentKind::Random => Box::new(RandomAgent::seeded(seed)),
        AgentKind::Randomish => Box::new(RandomishAgent::seeded(seed)),
        AgentKind::Sensing => Box::new(SensingAgent),
    })
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let layout = load_layout(&cli.layout)?;
    let base_seed = cli.seed.unwrap_or_else(rand::random);
    info!(
        layout = %cli.layout,
        agent = ?cli.agent,
        episodes = cli.episodes,
        seed = base_seed,
        "starting runs"
    );

    let mut cleared = 0u32;
    for episode in 0..cli.episodes {
        let seed = base_seed.wrapping_add(u64::from(episode));
        let mut world = MazeSnapshot::from_layout(&layout)
            .with_context(|| format!("parsing layout {}", cli.layout))?
            .with_seed(seed);
        let mut agent = build_agent(cli.agent, seed)?;
        let summary = run_episode(agent.as_mut(), &mut world, cli.max_turns)?;
        if summary.outcome == Outcome::Cleared {
            cleared += 1;
        }
        info!(
            episode,
            kind = agent.kind(),
            outcome = ?summary.outcome,
            turns = summary.turns,
            food_eaten = summary.food_eaten,
            "episode finished"
        );
    }
    info!(cleared, episodes = cli.episodes, "runs finished");
    Ok(())
}
