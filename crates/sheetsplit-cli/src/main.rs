use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sheetsplit::{
    Exclusion, ExtractStrategy, FailurePolicy, LoadMode, SheetSplitter, SourceWorkbook,
    SplitConfig, SplitError, SplitOutput, validate,
};
use std::fs;
use std::path::{Path, PathBuf};

const MIB: u64 = 1024 * 1024;

#[derive(Parser, Debug)]
#[command(
    name = "sheetsplit",
    version,
    about = "Split a multi-sheet XLSX workbook into one workbook per visible sheet"
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Split a workbook and write the ZIP archive.
    Split(SplitArgs),
    /// List sheets and whether each would be extracted.
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
struct SplitArgs {
    /// Source .xlsx file.
    input: PathBuf,

    /// Where to write the archive.
    #[arg(short, long, default_value = "split_sheets.zip")]
    output: PathBuf,

    /// Refuse inputs larger than this many MiB.
    #[arg(long = "max-size-mib", default_value_t = 200)]
    max_size_mib: u64,

    #[arg(long, value_enum, default_value_t = StrategyArg::CloneAndPrune)]
    strategy: StrategyArg,

    #[arg(long = "load-mode", value_enum, default_value_t = LoadModeArg::SinglePass)]
    load_mode: LoadModeArg,

    /// Leave failing sheets out instead of aborting.
    #[arg(long = "skip-failed")]
    skip_failed: bool,

    /// Extract sheets in parallel.
    #[arg(long)]
    parallel: bool,

    /// Write a JSON report of entries, exclusions and failures to this path.
    #[arg(long)]
    report: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    input: PathBuf,

    #[arg(long = "max-size-mib", default_value_t = 200)]
    max_size_mib: u64,

    #[arg(long = "load-mode", value_enum, default_value_t = LoadModeArg::SinglePass)]
    load_mode: LoadModeArg,

    /// Print JSON instead of a table.
    #[arg(long)]
    json: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum StrategyArg {
    CloneAndPrune,
    Fresh,
}

impl From<StrategyArg> for ExtractStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::CloneAndPrune => ExtractStrategy::CloneAndPrune,
            StrategyArg::Fresh => ExtractStrategy::Fresh,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LoadModeArg {
    SinglePass,
    TwoPass,
}

impl From<LoadModeArg> for LoadMode {
    fn from(value: LoadModeArg) -> Self {
        match value {
            LoadModeArg::SinglePass => LoadMode::SinglePass,
            LoadModeArg::TwoPass => LoadMode::TwoPass,
        }
    }
}

#[derive(Serialize, Debug)]
struct InspectReport {
    eligible: Vec<String>,
    excluded: Vec<Exclusion>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Command::Split(args) => run_split(args),
        Command::Inspect(args) => run_inspect(args),
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "sheetsplit=info",
        _ => "sheetsplit=debug",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .init();
}

fn read_input(path: &Path, max_size_mib: u64) -> Result<Vec<u8>> {
    let size = fs::metadata(path)
        .with_context(|| format!("failed to stat input: {}", path.display()))?
        .len();
    if size > max_size_mib.saturating_mul(MIB) {
        bail!(
            "{} is {size} bytes, over the {max_size_mib} MiB limit",
            path.display()
        );
    }
    fs::read(path).with_context(|| format!("failed to read input: {}", path.display()))
}

fn split_config(args: &SplitArgs) -> SplitConfig {
    let policy = if args.skip_failed {
        FailurePolicy::SkipAndReport
    } else {
        FailurePolicy::FailFast
    };
    SplitConfig {
        strategy: args.strategy.into(),
        ..SplitConfig::default()
    }
    .with_load_mode(args.load_mode.into())
    .with_failure_policy(policy)
    .with_parallel(args.parallel)
}

fn run_split(args: SplitArgs) -> Result<()> {
    let bytes = read_input(&args.input, args.max_size_mib)?;
    let out = SheetSplitter::new(split_config(&args)).split(&bytes)?;

    fs::write(&args.output, &out.archive)
        .with_context(|| format!("failed to write archive: {}", args.output.display()))?;
    if let Some(path) = &args.report {
        write_report(path, &out)?;
    }
    print_summary(&args.output, &out);
    Ok(())
}

fn write_report(path: &Path, out: &SplitOutput) -> Result<()> {
    let json = serde_json::to_string_pretty(out)?;
    fs::write(path, json)
        .with_context(|| format!("failed to write report: {}", path.display()))?;
    println!("wrote JSON report: {}", path.display());
    Ok(())
}

fn print_summary(output: &Path, out: &SplitOutput) {
    println!(
        "wrote {} ({} entries, {} bytes)",
        output.display(),
        out.entries.len(),
        out.archive.len()
    );
    for entry in &out.entries {
        println!(
            "  {} <- {} ({} cached, {} as text)",
            entry.file_name, entry.sheet, entry.formulas.cached, entry.formulas.fallback
        );
    }
    for excluded in &out.excluded {
        println!("  skipped {}: {}", excluded.title, excluded.reason);
    }
    for failure in &out.failures {
        println!("  failed {}: {}", failure.sheet, failure.message);
    }
}

fn inspect(bytes: &[u8], mode: LoadMode) -> Result<InspectReport> {
    let source = SourceWorkbook::load(bytes, mode)?;
    match validate(&source) {
        Ok(validation) => Ok(InspectReport {
            eligible: validation.eligible.into_iter().map(|s| s.title).collect(),
            excluded: validation.excluded,
        }),
        Err(SplitError::NoEligibleSheets { excluded }) => Ok(InspectReport {
            eligible: Vec::new(),
            excluded,
        }),
        Err(e) => Err(e.into()),
    }
}

fn run_inspect(args: InspectArgs) -> Result<()> {
    let bytes = read_input(&args.input, args.max_size_mib)?;
    let report = inspect(&bytes, args.load_mode.into())?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("{}", args.input.display());
    for title in &report.eligible {
        println!("  extract {title}");
    }
    for excluded in &report.excluded {
        println!("  skip    {}: {}", excluded.title, excluded.reason);
    }
    Ok(())
}
