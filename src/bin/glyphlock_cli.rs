//! GlyphLock CLI - Bridge interface for editors and scripts
//!
//! Commands: config, icon, regenerate-all
//! Outputs JSON to stdout (mutating commands print the drained action table)
//! Returns non-zero when any submitted action failed

use clap::{Parser, Subcommand};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use glyphlock_core::{
    compute_changes, ActionQueue, ActionStatus, AdapterError, AdapterRegistry, Change, Config,
    Executor, Icon, ProjectStore, TargetAdapter,
};

#[derive(Parser)]
#[command(name = "glyphlock-cli")]
#[command(about = "GlyphLock CLI - Reproducible Icon Catalog")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root holding the config and lock documents
    #[arg(short, long, default_value = ".")]
    root: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Read or change the declared configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Create, remove or regenerate a single icon
    Icon {
        #[command(subcommand)]
        command: IconCommands,
    },

    /// Re-run the content pipeline for every icon in the lock
    RegenerateAll,
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the current config
    Show,

    /// Compute the changes a new config would require
    Diff {
        /// JSON payload (Config)
        #[arg(short, long)]
        payload: String,
    },

    /// Persist a new config and run the required changes
    Apply {
        /// JSON payload (Config)
        #[arg(short, long)]
        payload: String,
    },
}

#[derive(Subcommand)]
enum IconCommands {
    Create {
        /// Icon name; the catalog key is derived from it
        #[arg(short, long)]
        name: String,

        /// Comma-separated search tags
        #[arg(short, long, default_value = "")]
        tags: String,

        /// Path to the raw SVG file
        #[arg(short, long)]
        svg: PathBuf,

        /// JSON object mapping literal colors to replacement expressions
        #[arg(short, long)]
        color_map: Option<String>,
    },

    Remove {
        #[arg(short, long)]
        key: String,
    },

    Regenerate {
        #[arg(short, long)]
        key: String,
    },
}

/// Debug adapter: copies the icon's canonical markup to the target path.
/// Real platform adapters (component emitters) live outside the engine and
/// register the same way.
struct SvgCopyAdapter {
    root: PathBuf,
}

impl TargetAdapter for SvgCopyAdapter {
    fn add_icon(&self, icon: &Icon, _icon_key: &str, file_path: &Path) -> Result<(), AdapterError> {
        let content = match icon.svg.file_path() {
            Some(relative) => fs::read_to_string(self.root.join(relative))
                .map_err(|e| AdapterError::new(e.to_string()))?,
            None => icon.svg.content.clone(),
        };
        if let Some(parent) = file_path.parent() {
            fs::create_dir_all(parent).map_err(|e| AdapterError::new(e.to_string()))?;
        }
        fs::write(file_path, content).map_err(|e| AdapterError::new(e.to_string()))
    }

    fn remove_icon(
        &self,
        _icon: &Icon,
        _icon_key: &str,
        file_path: &Path,
    ) -> Result<(), AdapterError> {
        if file_path.exists() {
            fs::remove_file(file_path).map_err(|e| AdapterError::new(e.to_string()))?;
        }
        Ok(())
    }
}

fn build_queue(root: &Path) -> ActionQueue {
    let mut adapters = AdapterRegistry::new();
    adapters.register("svg", Arc::new(SvgCopyAdapter { root: root.to_path_buf() }));
    ActionQueue::start(Executor::new(root, adapters))
}

/// Wait for the queue to drain, print every record, and map failures to the
/// action-failure exit code.
fn finish(queue: &ActionQueue) -> ExitCode {
    queue.wait_idle();
    let records = queue.records();
    println!("{}", serde_json::to_string_pretty(&records).unwrap_or_default());

    let failed = records.iter().any(|r| r.status == ActionStatus::Failed);
    if failed {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let store = ProjectStore::new(&cli.root);
                match store.read_config() {
                    Ok(Some(config)) => {
                        println!("{}", serde_json::to_string_pretty(&config).unwrap_or_default());
                        ExitCode::SUCCESS
                    }
                    Ok(None) => {
                        println!("null");
                        ExitCode::SUCCESS
                    }
                    Err(e) => {
                        eprintln!("{{\"error\": \"{}\"}}", e);
                        ExitCode::FAILURE
                    }
                }
            }

            ConfigCommands::Diff { payload } => {
                let config: Config = match serde_json::from_str(&payload) {
                    Ok(c) => c,
                    Err(e) => {
                        eprintln!("{{\"error\": \"Invalid payload: {}\"}}", e);
                        return ExitCode::FAILURE;
                    }
                };
                let store = ProjectStore::new(&cli.root);
                let old = match store.read_config() {
                    Ok(old) => old,
                    Err(e) => {
                        eprintln!("{{\"error\": \"{}\"}}", e);
                        return ExitCode::FAILURE;
                    }
                };
                let lock = match store.read_lock() {
                    Ok(lock) => lock.unwrap_or_default(),
                    Err(e) => {
                        eprintln!("{{\"error\": \"{}\"}}", e);
                        return ExitCode::FAILURE;
                    }
                };
                let changes = compute_changes(old.as_ref(), &config, &lock);
                println!("{}", serde_json::to_string_pretty(&changes).unwrap_or_default());
                ExitCode::SUCCESS
            }

            ConfigCommands::Apply { payload } => {
                let config: Config = match serde_json::from_str(&payload) {
                    Ok(c) => c,
                    Err(e) => {
                        eprintln!("{{\"error\": \"Invalid payload: {}\"}}", e);
                        return ExitCode::FAILURE;
                    }
                };
                let queue = build_queue(&cli.root);
                let changes = match queue.diff_config(&config) {
                    Ok(changes) => changes,
                    Err(e) => {
                        eprintln!("{{\"error\": \"{}\"}}", e);
                        return ExitCode::FAILURE;
                    }
                };
                if let Err(e) = queue.apply_config(&config, changes) {
                    eprintln!("{{\"error\": \"{}\"}}", e);
                    return ExitCode::FAILURE;
                }
                finish(&queue)
            }
        },

        Commands::Icon { command } => match command {
            IconCommands::Create { name, tags, svg, color_map } => {
                let content = match fs::read_to_string(&svg) {
                    Ok(content) => content,
                    Err(e) => {
                        eprintln!("{{\"error\": \"Could not read {}: {}\"}}", svg.display(), e);
                        return ExitCode::FAILURE;
                    }
                };
                let color_map: Option<BTreeMap<String, String>> = match color_map {
                    Some(raw) => match serde_json::from_str(&raw) {
                        Ok(map) => Some(map),
                        Err(e) => {
                            eprintln!("{{\"error\": \"Invalid color map: {}\"}}", e);
                            return ExitCode::FAILURE;
                        }
                    },
                    None => None,
                };
                let tags: Vec<String> = tags
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect();

                let queue = build_queue(&cli.root);
                queue.submit(Change::CreateIcon { name, tags, content, color_map });
                finish(&queue)
            }

            IconCommands::Remove { key } => {
                let queue = build_queue(&cli.root);
                queue.submit(Change::RemoveIcon { icon_key: key });
                finish(&queue)
            }

            IconCommands::Regenerate { key } => {
                let queue = build_queue(&cli.root);
                queue.submit(Change::RegenerateIcon { icon_key: key });
                finish(&queue)
            }
        },

        Commands::RegenerateAll => {
            let queue = build_queue(&cli.root);
            queue.submit(Change::RegenerateAll);
            finish(&queue)
        }
    }
}
