use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use flowsentry::artifacts::ArtifactSet;
use flowsentry::config::Config;
use flowsentry::dataset::Dataset;
use flowsentry::stream::{JsonlFlowSource, StreamingScorer};
use flowsentry::trainer::Trainer;

#[derive(Parser)]
#[command(name = "flowsentry")]
#[command(author, version, about = "ML-based network flow classifier")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a model from a labeled flow dataset
    Train {
        /// Labeled CSV dataset
        dataset: PathBuf,

        /// Artifact output directory (overrides config)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Score live flows with a trained model
    Monitor {
        /// JSONL flow source; reads stdin when omitted
        #[arg(short, long)]
        source: Option<PathBuf>,

        /// Artifact directory (overrides config)
        #[arg(short, long)]
        artifacts: Option<PathBuf>,
    },

    /// Generate a default configuration file
    GenConfig {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

pub fn run_command(cli: Cli) -> Result<()> {
    let config = Config::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Commands::Train { dataset, out } => {
            let data = Dataset::load_csv(&dataset, &config.dataset)
                .with_context(|| format!("preparing dataset {}", dataset.display()))?;

            let dir = out.unwrap_or_else(|| config.artifacts.dir.clone());
            let outcome = Trainer::new(config).run(&data)?;
            outcome.artifacts.save(&dir)?;

            println!(
                "Artifacts saved to {} (generation {})",
                dir.display(),
                outcome.artifacts.generation
            );
            Ok(())
        }

        Commands::Monitor { source, artifacts } => {
            let dir = artifacts.unwrap_or_else(|| config.artifacts.dir.clone());
            let set = ArtifactSet::load(&dir)
                .with_context(|| format!("loading artifact generation from {}", dir.display()))?;

            let scorer = StreamingScorer::new(set);
            let pacing = Duration::from_millis(config.stream.pacing_ms);

            let stats = match source.or_else(|| config.stream.source.clone()) {
                Some(path) => {
                    let mut src = JsonlFlowSource::from_path(&path)
                        .with_context(|| format!("opening flow source {}", path.display()))?;
                    scorer.run(&mut src, pacing)
                }
                None => {
                    info!("Reading flow records from stdin");
                    let mut src = JsonlFlowSource::from_stdin();
                    scorer.run(&mut src, pacing)
                }
            };

            println!("{} flows scored, {} skipped", stats.scored, stats.skipped);
            Ok(())
        }

        Commands::GenConfig { output } => {
            let example = Config::example();
            match output {
                Some(path) => {
                    std::fs::write(&path, example)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Wrote {}", path.display());
                }
                None => print!("{}", example),
            }
            Ok(())
        }
    }
}
