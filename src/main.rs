use std::{
    error::Error,
    fs,
    path::{Path, PathBuf},
};

use clap::{ArgAction, Args, Parser, Subcommand};
use log::{info, warn};

use reco_bundles::{
    config::RecoConfig,
    geometry::resample_tractogram,
    io::{
        check_tractogram_format, load_affine, load_tractogram, read_cluster_map, save_tractogram,
        write_cluster_map,
    },
    recognition::recognize,
};

/// Recognition of white matter bundles by streamline clustering.
#[derive(Parser)]
#[clap(name = "reco_bundles", version)]
struct Cli {
    /// Verbosity, repeat for more (-v info, -vv debug).
    #[clap(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Extracts from a whole-brain tractogram the streamlines matching a model bundle.
    ///
    /// The transformation brings the model onto the input tractogram
    /// (use --inverse for a transformation going the other way).
    Recognize(RecognizeArgs),
    /// Resamples every streamline to a fixed number of points. Per-point data is not carried.
    Resample(ResampleArgs),
}

#[derive(Args)]
struct RecognizeArgs {
    /// Whole-brain tractogram (json).
    #[clap(value_parser)]
    in_tractogram: PathBuf,
    /// Model bundle to recognize (json).
    #[clap(value_parser)]
    in_model: PathBuf,
    /// 4x4 affine bringing the model onto the input tractogram.
    #[clap(value_parser)]
    transformation: PathBuf,
    /// Output tractogram (json).
    #[clap(value_parser)]
    output: PathBuf,
    /// JSON configuration used as defaults for the options below.
    #[clap(long, value_parser)]
    config: Option<PathBuf>,
    /// Clustering threshold used for the whole brain [8mm].
    #[clap(long, value_parser)]
    wb_clustering_thr: Option<f64>,
    /// Clustering threshold used for the model [4mm].
    #[clap(long, value_parser)]
    model_clustering_thr: Option<f64>,
    /// MDF threshold used for the final selection [6mm].
    #[clap(long, value_parser)]
    pruning_thr: Option<f64>,
    /// Number of worker threads [all].
    #[clap(long, value_parser)]
    threads: Option<usize>,
    /// Random number generator seed.
    #[clap(long, value_parser)]
    seed: Option<u64>,
    /// Use the inverse transformation.
    #[clap(long, action)]
    inverse: bool,
    /// Do not write the output if no streamline is recognized.
    #[clap(long, action)]
    no_empty: bool,
    /// Whole-brain cluster map to reuse, overrides the whole-brain clustering threshold.
    #[clap(long, value_parser, conflicts_with = "output_clusters")]
    input_clusters: Option<PathBuf>,
    /// Where to save the whole-brain cluster map.
    #[clap(long, value_parser)]
    output_clusters: Option<PathBuf>,
    /// Overwrite existing outputs.
    #[clap(short = 'f', long, action)]
    overwrite: bool,
}

#[derive(Args)]
struct ResampleArgs {
    /// Input tractogram (json).
    #[clap(value_parser)]
    in_tractogram: PathBuf,
    /// Number of points per streamline in the output.
    #[clap(value_parser)]
    nb_points: usize,
    /// Output tractogram (json).
    #[clap(value_parser)]
    output: PathBuf,
    /// Overwrite existing outputs.
    #[clap(short = 'f', long, action)]
    overwrite: bool,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    match cli.command {
        Command::Recognize(args) => run_recognize(args),
        Command::Resample(args) => run_resample(args),
    }
}

fn run_recognize(args: RecognizeArgs) -> Result<(), Box<dyn Error>> {
    check_output(&args.output, args.overwrite)?;
    check_tractogram_format(&args.output)?;
    if let Some(path) = &args.output_clusters {
        check_output(path, args.overwrite)?;
    }
    let config = build_config(&args)?;

    let wb = load_tractogram(&args.in_tractogram)?;
    let model = load_tractogram(&args.in_model)?;
    let affine = load_affine(&args.transformation)?;
    let cached = match &args.input_clusters {
        Some(path) => Some(read_cluster_map(path)?),
        None => None,
    };

    let result = recognize(&wb, &model, &affine, args.inverse, cached, &config)?;
    if let (Some(path), Some(cluster_map)) = (&args.output_clusters, &result.cluster_map) {
        write_cluster_map(path, cluster_map)?;
        info!("cluster map saved to {}", path.display());
    }

    let selected = wb.select(&result.indices)?;
    if args.no_empty && selected.is_empty() {
        warn!("no streamline recognized, {} not written", args.output.display());
        return Ok(());
    }
    save_tractogram(&selected, &args.output)?;
    info!("{} streamlines saved", selected.len());
    Ok(())
}

fn build_config(args: &RecognizeArgs) -> Result<RecoConfig, Box<dyn Error>> {
    let mut config: RecoConfig = match &args.config {
        Some(path) => serde_json::from_slice(&fs::read(path)?)?,
        None => RecoConfig::default(),
    };
    if let Some(thr) = args.wb_clustering_thr {
        config.wb_clustering_threshold = thr;
    }
    if let Some(thr) = args.model_clustering_thr {
        config.model_clustering_threshold = thr;
    }
    if let Some(thr) = args.pruning_thr {
        config.pruning_threshold = thr;
    }
    if args.threads.is_some() {
        config.threads = args.threads;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }
    config.validate()?;
    Ok(config)
}

fn run_resample(args: ResampleArgs) -> Result<(), Box<dyn Error>> {
    check_output(&args.output, args.overwrite)?;
    let tractogram = load_tractogram(&args.in_tractogram)?;
    if !tractogram.data_per_point().is_empty() {
        warn!("per-point data is not carried by resampling");
    }
    let resampled = resample_tractogram(&tractogram, args.nb_points)?;
    save_tractogram(&resampled, &args.output)?;
    Ok(())
}

fn check_output(path: &Path, overwrite: bool) -> Result<(), Box<dyn Error>> {
    if path.exists() && !overwrite {
        return Err(format!("{} already exists, use -f to overwrite", path.display()).into());
    }
    Ok(())
}
