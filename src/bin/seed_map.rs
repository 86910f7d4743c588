use clap::Parser;
use seedmap::{error::Error, prelude::*};
use std::path::PathBuf;
use tracing::{error, info};

/// Fit one regressor per seed from human demonstrations.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Optional JSON config. Flags below override its fields.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Demonstration batches, one JSON array per batch.
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Where to write the trained regressors.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Number of trees per forest.
    #[arg(long)]
    trees: Option<usize>,

    #[arg(long)]
    seed: Option<u64>,

    /// Grow the trees of each forest in parallel.
    #[arg(long)]
    parallel: bool,
}

impl Args {
    fn into_config(self) -> Result<Config, Error> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::default(),
        };

        if let Some(input) = self.input {
            config.input = input;
        }
        if let Some(output) = self.output {
            config.output = output;
        }
        if let Some(trees) = self.trees {
            config.forest.n_trees = trees;
        }
        if let Some(seed) = self.seed {
            config.forest.seed = seed;
        }
        if self.parallel {
            config.forest.parallel = true;
        }
        Ok(config)
    }
}

fn run(config: Config) -> Result<(), Error> {
    info!("reading demonstrations from {}", config.input.display());
    let aggregate = aggregate(BatchReader::open(&config.input)?)?;
    info!("aggregated {} batches", aggregate.batches());

    let tables = aggregate.tables()?;
    let run = Trainer::new(config.forest).train_all(tables.values())?;

    run.models.save(&config.output)?;
    info!(
        "wrote {} regressors to {}",
        run.models.len(),
        config.output.display()
    );
    Ok(())
}

fn main() {
    // Register an event subscriber that prints events to STDOUT.
    let subscriber = tracing_subscriber::FmtSubscriber::new();
    tracing::subscriber::set_global_default(subscriber)
        .expect("no other subscriber is registered");

    let result = Args::parse().into_config().and_then(run);
    if let Err(err) = result {
        error!("{err}");
        std::process::exit(1);
    }
}
