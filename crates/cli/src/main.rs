mod flags;

use anyhow::{Context as AnyhowContext, Result};
use clap::{Parser, Subcommand};
use contextpack_core::{
    pack, parse_budget, LensManager, PackConfig, PackOptions, PriorityStore, STORE_FILE_NAME,
};
use flags::{SortKeyFlag, SortOrderFlag, StrategyFlag, TruncateModeFlag};
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "contextpack")]
#[command(about = "Serialize a repository into one AI-consumable text artifact", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack a repository into the framed text format
    Pack {
        /// Root directory to serialize
        root: PathBuf,

        /// Output file path; stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration file (defaults to <root>/.contextpack_config.json)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Active lens name
        #[arg(short, long)]
        lens: Option<String>,

        /// Include globs (whitelist; overrides lens and config includes)
        #[arg(long, num_args = 0..)]
        include: Vec<String>,

        /// Exclude globs (added to lens and config excludes)
        #[arg(long, num_args = 0..)]
        exclude: Vec<String>,

        /// Token budget, with optional k/M suffix (e.g. 100k)
        #[arg(short, long)]
        budget: Option<String>,

        /// Budget strategy
        #[arg(long, value_enum)]
        strategy: Option<StrategyFlag>,

        /// Truncation mode override
        #[arg(long, value_enum)]
        truncate_mode: Option<TruncateModeFlag>,

        /// Truncation line limit override
        #[arg(long)]
        truncate: Option<usize>,

        /// Sort key override
        #[arg(long, value_enum)]
        sort_by: Option<SortKeyFlag>,

        /// Sort order override
        #[arg(long, value_enum)]
        sort_order: Option<SortOrderFlag>,

        /// Emit in traversal order with low time-to-first-byte
        #[arg(long)]
        streaming: bool,

        /// Per-file size ceiling in bytes
        #[arg(long)]
        max_file_size: Option<u64>,

        /// Drop files whose priority is below this floor
        #[arg(long)]
        priority_floor: Option<i64>,

        /// Emit the synthetic meta record first
        #[arg(long)]
        meta: bool,

        /// Priority store file (defaults to <root>/.contextpack_store.json)
        #[arg(long)]
        store: Option<PathBuf>,
    },

    /// List available lenses
    Lenses {
        /// Configuration file contributing custom lenses
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Stderr)
        .init();

    match cli.command {
        Commands::Pack {
            root,
            output,
            config,
            lens,
            include,
            exclude,
            budget,
            strategy,
            truncate_mode,
            truncate,
            sort_by,
            sort_order,
            streaming,
            max_file_size,
            priority_floor,
            meta,
            store,
        } => {
            if !root.is_dir() {
                anyhow::bail!("'{}' is not a valid directory", root.display());
            }

            let config = match config {
                Some(path) => PackConfig::load(&path)?,
                None => PackConfig::discover(&root)?,
            };

            let mut options = PackOptions {
                lens,
                include,
                exclude,
                streaming,
                priority_floor,
                emit_meta: meta,
                store: load_store(&root, store.as_deref()),
                config,
                ..Default::default()
            };
            if let Some(raw) = budget {
                options.budget = Some(parse_budget(&raw)?);
            }
            if let Some(flag) = strategy {
                options.strategy = flag.as_domain();
            }
            if let Some(flag) = truncate_mode {
                options.truncate_mode = Some(flag.as_domain());
            }
            options.truncate_lines = truncate;
            if let Some(flag) = sort_by {
                options.sort_by = Some(flag.as_domain());
            }
            if let Some(flag) = sort_order {
                options.sort_order = Some(flag.as_domain());
            }
            if let Some(limit) = max_file_size {
                options.max_file_size = limit;
            }

            cmd_pack(&root, &options, output.as_deref())?;
        }

        Commands::Lenses { config } => {
            cmd_lenses(config.as_deref())?;
        }
    }

    Ok(())
}

/// Load the priority store if one is available. Failure is never fatal:
/// the pipeline runs without learned priorities and the reason is logged
/// once.
fn load_store(root: &Path, explicit: Option<&Path>) -> Option<PriorityStore> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let default = root.join(STORE_FILE_NAME);
            if !default.is_file() {
                return None;
            }
            default
        }
    };

    match PriorityStore::load(&path) {
        Ok(store) => {
            log::debug!("loaded priority store ({} entries)", store.len());
            Some(store)
        }
        Err(e) => {
            log::warn!("priority store unavailable, continuing without: {e}");
            None
        }
    }
}

fn cmd_pack(root: &Path, options: &PackOptions, output: Option<&Path>) -> Result<()> {
    let summary = match output {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("cannot create {}", path.display()))?;
            let mut writer = std::io::BufWriter::new(file);
            let summary = pack(root, options, &mut writer)?;
            writer.flush()?;
            summary
        }
        None => {
            let stdout = std::io::stdout();
            let mut writer = std::io::BufWriter::new(stdout.lock());
            let summary = pack(root, options, &mut writer)?;
            writer.flush()?;
            summary
        }
    };

    log::info!(
        "packed {} files ({} skipped)",
        summary.emitted,
        summary.skipped
    );
    Ok(())
}

fn cmd_lenses(config: Option<&Path>) -> Result<()> {
    let mut manager = LensManager::new();
    if let Some(path) = config {
        let config = PackConfig::load(path)?;
        manager.load_custom(config.lenses);
    }

    for name in manager.available() {
        let description = manager
            .get(&name)
            .map(|lens| lens.description.clone())
            .unwrap_or_default();
        println!("{name:<14} {description}");
    }
    Ok(())
}
