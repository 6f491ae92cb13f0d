use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_saint::config::{CONFIG_FILE, ConfigLoader, ConfigOverrides, default_config};
use kira_saint::convert::{ConvertOptions, Converter, ProgressSink};
use kira_saint::domain::IntensityMode;
use kira_saint::error::KiraError;
use kira_saint::fasta::FastaSequenceService;
use kira_saint::maxquant::MaxquantReader;
use kira_saint::output::{HumanOutput, JsonOutput, OutputMode};

#[derive(Parser)]
#[command(name = "kira-saint")]
#[command(about = "Convert MaxQuant protein groups into SAINT bait, prey and interaction files")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Write bait.txt, prey.txt and interactions.txt next to the table")]
    Convert(ConvertArgs),
    #[command(about = "Write a default kira-saint.json in the current directory")]
    Init(InitArgs),
}

#[derive(Args)]
struct ConvertArgs {
    /// MaxQuant proteinGroups.txt (optionally .gz)
    table: PathBuf,

    /// FASTA file used in the MaxQuant search (optionally .gz)
    #[arg(long)]
    fasta: Option<PathBuf>,

    #[arg(long)]
    config: Option<String>,

    #[arg(long, value_enum)]
    intensity: Option<IntensityMode>,

    /// Regex matching whole control sample names
    #[arg(long)]
    control: Option<String>,

    /// Regex matching whole sample names, group 1 is the bait
    #[arg(long)]
    bait: Option<String>,

    #[arg(long)]
    dry_run: bool,
}

#[derive(Args)]
struct InitArgs {
    #[arg(long)]
    force: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(kira) = report.downcast_ref::<KiraError>() {
            return ExitCode::from(map_exit_code(kira));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &KiraError) -> u8 {
    match error {
        KiraError::MissingConfig(_)
        | KiraError::ConfigRead(_)
        | KiraError::ConfigParse(_)
        | KiraError::ConfigExists(_)
        | KiraError::InvalidPattern { .. }
        | KiraError::InvalidBaitMapping(_)
        | KiraError::InvalidDelimiter(_) => 2,
        KiraError::TableRead { .. }
        | KiraError::MissingColumn { .. }
        | KiraError::DuplicateSample { .. }
        | KiraError::InvalidNumber { .. }
        | KiraError::EmptyProteinIds { .. }
        | KiraError::NoProteinGroups(_)
        | KiraError::FastaRead { .. } => 3,
        KiraError::Write { .. } => 4,
        KiraError::Filesystem(_) => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let output_mode = if cli.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    match cli.command {
        Commands::Convert(args) => run_convert(args, output_mode),
        Commands::Init(args) => run_init(args),
    }
}

fn run_convert(args: ConvertArgs, output_mode: OutputMode) -> miette::Result<()> {
    let ConvertArgs {
        table,
        fasta,
        config,
        intensity,
        control,
        bait,
        dry_run,
    } = args;

    let overrides = ConfigOverrides {
        intensity,
        control,
        bait,
    };
    let resolved = ConfigLoader::resolve(config.as_deref(), overrides)?;

    let sequences = match resolved.fasta_id_pattern {
        Some(pattern) => FastaSequenceService::with_id_pattern(pattern),
        None => FastaSequenceService::new(),
    };
    let converter = Converter::new(
        MaxquantReader::new(resolved.layout),
        sequences,
        resolved.classifier,
    );
    let options = ConvertOptions { dry_run };

    let sink: &dyn ProgressSink = match output_mode {
        OutputMode::Json => &JsonOutput,
        OutputMode::Human => &HumanOutput,
    };
    let report = converter.convert(&table, fasta.as_deref(), options, sink)?;

    match output_mode {
        OutputMode::Json => JsonOutput::print_report(&report).into_diagnostic(),
        OutputMode::Human => HumanOutput::print_report(&report).into_diagnostic(),
    }
}

fn run_init(args: InitArgs) -> miette::Result<()> {
    let path = PathBuf::from(CONFIG_FILE);
    if path.exists() && !args.force {
        return Err(KiraError::ConfigExists(path).into());
    }
    let json = serde_json::to_string_pretty(&default_config()).into_diagnostic()?;
    fs::write(&path, format!("{json}\n")).into_diagnostic()?;
    println!("wrote {}", path.display());
    Ok(())
}
