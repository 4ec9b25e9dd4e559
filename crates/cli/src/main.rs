mod commands;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

/// vhash — perceptual fingerprints for images and video.
#[derive(Parser)]
#[command(name = "vhash", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fingerprint every image/video under a directory.
    Hash(CommonArgs),
    /// Group files that share an identical fingerprint.
    Dup(CommonArgs),
    /// Inspect or maintain the persistent fingerprint cache.
    Cache(CacheArgs),
}

#[derive(Args)]
struct CommonArgs {
    /// Directory to scan.
    path: PathBuf,

    /// Comma-delimited extension whitelist (e.g. "jpg,png").
    #[arg(short = 'e', long = "ext")]
    ext: Option<String>,

    /// Path to the cache database.
    #[arg(short = 'c', long = "cache")]
    cache: Option<PathBuf>,

    /// Output file; stdout if omitted.
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Worker count; 0 selects hardware concurrency.
    #[arg(short = 'j', long = "jobs", default_value_t = 0)]
    jobs: usize,

    /// Read/write fingerprints through the persistent cache.
    #[arg(short = 'C', long = "use-cache")]
    use_cache: bool,

    /// Recurse into subdirectories.
    #[arg(short = 'r', long = "recursive")]
    recursive: bool,

    /// Suppress the progress bar.
    #[arg(short = 'P', long = "no-progress")]
    no_progress: bool,

    /// Suppress all log output.
    #[arg(short = 's', long = "silent")]
    silent: bool,
}

#[derive(Args)]
struct CacheArgs {
    /// Path to the cache database.
    #[arg(short = 'c', long = "cache")]
    cache: Option<PathBuf>,

    /// Print the cached fingerprint for this file.
    #[arg(short = 'f', long = "find")]
    find: Option<PathBuf>,

    /// Remove this file's cache entry.
    #[arg(short = 'd', long = "del")]
    del: Option<PathBuf>,

    /// Remove every cache entry.
    #[arg(short = 'C', long = "clear")]
    clear: bool,

    /// Evict entries older than --prune-period.
    #[arg(short = 'p', long = "prune")]
    prune: bool,

    /// Age, in seconds, used by --prune. Defaults to 7 days.
    #[arg(short = 'P', long = "prune-period", default_value_t = 604_800)]
    prune_period: i64,
}

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(exit_code_for(&err));
    }
}

/// Maps a failure to the original tool's stable negative-ordinal exit
/// code when the root cause is one of ours, else a generic failure.
fn exit_code_for(err: &anyhow::Error) -> i32 {
    err.downcast_ref::<vhash_core::Error>()
        .map(|e| e.code())
        .unwrap_or(1)
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let silent = match &cli.command {
        Command::Hash(a) | Command::Dup(a) => a.silent,
        Command::Cache(_) => false,
    };
    let mut builder = env_logger::Builder::from_default_env();
    if silent {
        builder.filter_level(log::LevelFilter::Off);
    }
    builder.init();

    match cli.command {
        Command::Hash(args) => commands::hash::run(args_to_options(&args)?, &args)?,
        Command::Dup(args) => commands::dup::run(args_to_options(&args)?, &args)?,
        Command::Cache(args) => commands::cache::run(&args)?,
    }

    Ok(())
}

fn args_to_options(args: &CommonArgs) -> Result<vhash_core::app::RunOptions> {
    if !args.path.is_dir() {
        anyhow::bail!("{} is not a directory", args.path.display());
    }

    let ext_white: Vec<String> = args
        .ext
        .as_deref()
        .map(|s| s.split(',').map(|e| e.trim().to_string()).collect())
        .unwrap_or_default();
    if ext_white.iter().any(|e| e.is_empty()) {
        anyhow::bail!("--ext contains an empty extension token");
    }

    Ok(vhash_core::app::RunOptions {
        recursive: args.recursive,
        use_builtin_filter: true,
        ext_white,
        ext_black: Vec::new(),
        jobs: args.jobs,
        hash_type: vhash_core::hasher::HashType::default(),
        use_cache: args.use_cache,
        cache_path: args.cache.clone(),
    })
}
