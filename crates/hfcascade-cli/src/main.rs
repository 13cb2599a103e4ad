//! hfcascade CLI: command-line interface for heavy-flavour candidate reconstruction.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use hfcascade::{
    reconstruct_events, CandidateRow, ChannelMasses, Event, EventStats, PdgTable,
    ReconstructionConfig,
};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "hfcascade")]
#[command(
    about = "Reconstruct and select heavy-flavour decay candidates (2-prong, 3-prong, B+ and Xicc cascades)"
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct candidates in a JSON file of events.
    Reconstruct(CliReconstructArgs),

    /// Print the default configuration as JSON.
    DefaultConfig,

    /// Print the built-in particle mass table.
    Masses,
}

#[derive(Debug, Clone, Args)]
struct CliReconstructArgs {
    /// Path to the input events (JSON array).
    #[arg(long)]
    events: PathBuf,

    /// Path to a reconstruction config (JSON); missing fields take defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to write the selected candidates (JSON).
    #[arg(long)]
    out: PathBuf,

    /// Override the solenoid field [kG]; the sign is the polarity.
    #[arg(long, allow_hyphen_values = true)]
    bz: Option<f64>,

    /// Minimize error-weighted instead of absolute distances in the vertex fit.
    #[arg(long)]
    no_abs_dca: bool,
}

impl CliReconstructArgs {
    fn to_config(&self) -> CliResult<ReconstructionConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("Loading config: {}", path.display());
                ReconstructionConfig::from_json_file(path)?
            }
            None => ReconstructionConfig::default(),
        };
        if let Some(bz) = self.bz {
            config.fitter.bz = bz;
        }
        if self.no_abs_dca {
            config.fitter.use_abs_dca = false;
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(serde::Serialize)]
struct EventSummary {
    collision_id: u64,
    stats: EventStats,
    candidates: Vec<CandidateRow>,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Reconstruct(args) => run_reconstruct(&args),
        Commands::DefaultConfig => run_default_config(),
        Commands::Masses => run_masses(),
    }
}

fn run_default_config() -> CliResult<()> {
    let json = serde_json::to_string_pretty(&ReconstructionConfig::default())?;
    println!("{json}");
    Ok(())
}

fn run_masses() -> CliResult<()> {
    let table = PdgTable::default();
    let mut entries = table.entries();
    entries.sort_by_key(|(pdg, _)| *pdg);
    println!("{:>8}  {:>12}", "pdg", "mass [GeV]");
    for (pdg, mass) in entries {
        println!("{pdg:>8}  {mass:>12.7}");
    }
    Ok(())
}

fn run_reconstruct(args: &CliReconstructArgs) -> CliResult<()> {
    let config = args.to_config()?;

    tracing::info!("Loading events: {}", args.events.display());
    let data = std::fs::read_to_string(&args.events)?;
    let events: Vec<Event> = serde_json::from_str(&data)?;
    tracing::info!("{} events, bz = {} kG", events.len(), config.fitter.bz);

    let table = PdgTable::default();
    let masses = ChannelMasses::resolve(&table)?;
    let outputs = reconstruct_events(&events, &config, &table)?;

    let mut totals = EventStats::default();
    let mut n_rows = 0;
    let summaries: Vec<EventSummary> = outputs
        .iter()
        .map(|out| {
            totals.merge(&out.stats);
            let candidates = out.rows(&masses);
            n_rows += candidates.len();
            EventSummary {
                collision_id: out.collision_id,
                stats: out.stats,
                candidates,
            }
        })
        .collect();

    tracing::info!(
        "Selected {} candidate rows (2-prong {}, 3-prong {}, B+ {}, Xicc {})",
        n_rows,
        totals.two_prong.accepted,
        totals.three_prong.accepted,
        totals.bplus.accepted,
        totals.xicc.accepted
    );
    if totals.tracks_rejected > 0 {
        tracing::warn!("{} track records could not be used", totals.tracks_rejected);
    }

    let json = serde_json::to_string_pretty(&summaries)?;
    std::fs::write(&args.out, &json)?;
    tracing::info!("Results written to {}", args.out.display());
    Ok(())
}
