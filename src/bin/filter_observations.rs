use clap::Parser;
use seedmap::{error::Error, filter::filter_trajectories, prelude::*};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::PathBuf,
};
use tracing::{error, info};

/// Drop stereo observations that fail the left to right camera cross check.
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory holding the `traj_*` recordings.
    #[arg(short, long)]
    directory: PathBuf,

    /// JSON file with the `theta_l2r` camera map.
    #[arg(short, long)]
    params: PathBuf,

    /// Where to write the clean observations.
    #[arg(short, long)]
    output: PathBuf,

    /// Optional JSON config for the stereo tolerance.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Overrides the stereo tolerance in pixels.
    #[arg(long)]
    tolerance: Option<f64>,
}

fn run(args: Args) -> Result<(), Error> {
    let config = match &args.config {
        Some(path) => Config::from_json_file(path)?,
        None => Config::default(),
    };
    let tolerance = args.tolerance.unwrap_or(config.stereo_tolerance_px);

    let params = CameraParams::from_json_file(&args.params)?;
    let check = StereoCheck::new(params.left_to_right(), tolerance);
    let clean = filter_trajectories(&args.directory, &check)?;

    let mut writer = BufWriter::new(File::create(&args.output)?);
    serde_json::to_writer(&mut writer, &clean)?;
    writer.flush()?;
    info!(
        "wrote {} observations to {}",
        clean.len(),
        args.output.display()
    );
    Ok(())
}

fn main() {
    let subscriber = tracing_subscriber::FmtSubscriber::new();
    tracing::subscriber::set_global_default(subscriber)
        .expect("no other subscriber is registered");

    if let Err(err) = run(Args::parse()) {
        error!("{err}");
        std::process::exit(1);
    }
}
