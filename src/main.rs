use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use scoresheet_tools::{ProfileSet, Result, SortRequest, ToolError, sort_sheets};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(error) = run(cli) {
        eprintln!("error: {error}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose)?;
    match cli.command {
        Command::Sort(args) => execute_sort(args),
        Command::Profiles(args) => execute_profiles(args),
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| ToolError::Logging(error.to_string()))
}

fn execute_sort(args: SortArgs) -> Result<()> {
    if !args.input.exists() {
        return Err(ToolError::MissingInput(args.input));
    }

    let profiles = load_profiles(args.profiles.as_deref())?;
    let requests = SortRequest::expand(&profiles, &args.sheets, args.grouping());
    let reports = sort_sheets(&args.input, &args.output, &profiles, &requests)?;

    if args.report {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!("{}: {} rows re-ranked", report.sheet, report.rows);
        }
    }
    info!(output = %args.output.display(), "done");
    Ok(())
}

fn execute_profiles(args: ProfilesArgs) -> Result<()> {
    let profiles = load_profiles(args.profiles.as_deref())?;
    println!("{}", serde_json::to_string_pretty(&profiles)?);
    Ok(())
}

fn load_profiles(path: Option<&Path>) -> Result<ProfileSet> {
    match path {
        Some(path) => ProfileSet::from_json_file(path),
        None => Ok(ProfileSet::builtin()),
    }
}

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Re-rank rows of evaluation score sheets and rewrite their score formulas."
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sort one or more sheets and save the workbook.
    Sort(SortArgs),
    /// Print the effective sheet profiles as JSON.
    Profiles(ProfilesArgs),
}

#[derive(clap::Args)]
struct SortArgs {
    /// Workbook to read.
    #[arg(long)]
    input: PathBuf,

    /// Where to save the sorted workbook; may equal the input.
    #[arg(long)]
    output: PathBuf,

    /// Profile key, sheet name, or `all`. May be repeated.
    #[arg(long = "sheet", default_value = "staff")]
    sheets: Vec<String>,

    /// Group rows by unit regardless of the profile default.
    #[arg(long, conflicts_with = "no_group")]
    group: bool,

    /// Never group rows by unit.
    #[arg(long)]
    no_group: bool,

    /// JSON file with additional or replacement sheet profiles.
    #[arg(long)]
    profiles: Option<PathBuf>,

    /// Print the per-sheet reports as JSON.
    #[arg(long)]
    report: bool,
}

impl SortArgs {
    fn grouping(&self) -> Option<bool> {
        match (self.group, self.no_group) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        }
    }
}

#[derive(clap::Args)]
struct ProfilesArgs {
    /// JSON file with additional or replacement sheet profiles.
    #[arg(long)]
    profiles: Option<PathBuf>,
}
