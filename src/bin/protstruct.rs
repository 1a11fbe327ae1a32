use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use protstruct::archive::ArchiveReader;
use protstruct::batch::{BatchOptions, BatchProcessor, LogSink};
use protstruct::config::{ConfigLoader, ResolvedConfig};
use protstruct::domain::{ChainId, StructureId};
use protstruct::dssp::DsspAnnotator;
use protstruct::error::ProtError;
use protstruct::extract::ChainExtractor;
use protstruct::fetch::{Fetcher, StructureFetcher};
use protstruct::manifest::build_manifest;
use protstruct::output::{ExtractResult, FetchResult, JsonOutput};
use protstruct::rcsb::RcsbHttpClient;
use protstruct::store::Store;

#[derive(Parser)]
#[command(name = "protstruct")]
#[command(about = "Build per-chain secondary structure / solvent accessibility datasets from PDB entries")]
#[command(version, author)]
struct Cli {
    /// JSON config file (defaults to ./protstruct.json when present)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Parse a manifest and print the valid entries")]
    Manifest(ManifestArgs),
    #[command(about = "Download a structure into the local cache")]
    Fetch(FetchArgs),
    #[command(about = "Extract one chain's residue annotations from a structure file")]
    Extract(ExtractArgs),
    #[command(about = "Process a manifest into a dataset archive")]
    Process(ProcessArgs),
    #[command(about = "Print the index of a dataset archive")]
    Inspect(InspectArgs),
}

#[derive(Args)]
struct ManifestArgs {
    path: PathBuf,
}

#[derive(Args)]
struct FetchArgs {
    structure_id: String,

    #[arg(long)]
    compressed: bool,
}

#[derive(Args)]
struct ExtractArgs {
    path: PathBuf,
    chain_id: String,
}

#[derive(Args)]
struct ProcessArgs {
    manifest: PathBuf,
    output: PathBuf,

    #[arg(long)]
    min_len: Option<usize>,

    #[arg(long)]
    compressed: bool,
}

#[derive(Args)]
struct InspectArgs {
    archive: PathBuf,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<ProtError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &ProtError) -> u8 {
    match error {
        ProtError::InvalidStructureId(_)
        | ProtError::InvalidChainId(_)
        | ProtError::ManifestRead { .. }
        | ProtError::ChainNotFound { .. }
        | ProtError::StructureParse { .. } => 2,
        ProtError::RcsbHttp(_)
        | ProtError::RcsbStatus { .. }
        | ProtError::MissingTool(_)
        | ProtError::Annotator(_) => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Manifest(args) => {
            let entries = build_manifest(&args.path)?;
            JsonOutput::print_manifest(&entries).into_diagnostic()
        }
        Commands::Fetch(args) => {
            let config = ConfigLoader::resolve(cli.config.as_deref())?;
            run_fetch(args, &config)
        }
        Commands::Extract(args) => {
            let config = ConfigLoader::resolve(cli.config.as_deref())?;
            run_extract(args, &config)
        }
        Commands::Process(args) => {
            let config = ConfigLoader::resolve(cli.config.as_deref())?;
            run_process(args, &config)
        }
        Commands::Inspect(args) => {
            let mut reader = ArchiveReader::open(&args.archive)?;
            let index = reader.index()?;
            JsonOutput::print_index(&index).into_diagnostic()
        }
    }
}

fn run_fetch(args: FetchArgs, config: &ResolvedConfig) -> miette::Result<()> {
    let id = args.structure_id.parse::<StructureId>()?;
    let client = RcsbHttpClient::new(&config.base_url)?;
    let fetcher = Fetcher::new(Store::new(config), client);
    let path = fetcher.fetch(&id, args.compressed || config.compressed)?;
    JsonOutput::print_fetch(&FetchResult {
        structure_id: id.to_string(),
        path: path.display().to_string(),
    })
    .into_diagnostic()
}

fn run_extract(args: ExtractArgs, config: &ResolvedConfig) -> miette::Result<()> {
    let chain_id = args.chain_id.parse::<ChainId>()?;
    let annotator = DsspAnnotator::new(Store::new(config), config.dssp.clone());
    let residues = ChainExtractor::new(annotator)
        .extract_chain(&args.path, chain_id)?;
    JsonOutput::print_extract(&ExtractResult {
        path: args.path.display().to_string(),
        chain_id: chain_id.to_string(),
        residues,
    })
    .into_diagnostic()
}

fn run_process(args: ProcessArgs, config: &ResolvedConfig) -> miette::Result<()> {
    let entries = build_manifest(&args.manifest)?;
    let store = Store::new(config);
    let client = RcsbHttpClient::new(&config.base_url)?;
    let processor = BatchProcessor::new(
        Fetcher::new(store.clone(), client),
        DsspAnnotator::new(store, config.dssp.clone()),
    );
    let options = BatchOptions {
        min_chain_len: args.min_len.unwrap_or(config.min_chain_len),
        compressed: args.compressed || config.compressed,
    };

    let report = processor.process(&entries, &args.output, &options, &LogSink)?;
    tracing::info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        "batch finished"
    );
    JsonOutput::print_report(&report).into_diagnostic()
}
