//! GlyphLock Core - Reproducible Icon Catalog
//!
//! # The Five Rules (Non-Negotiable)
//! 1. The Lock Is Truth
//! 2. Config Drives Reconciliation
//! 3. Hashes Gate Rebuilds
//! 4. One Action At A Time
//! 5. Failures Isolate, Never Poison

pub mod actions;
pub mod adapter;
pub mod color;
pub mod config;
pub mod diff;
pub mod error;
pub mod executor;
pub mod hashing;
pub mod lock;
pub mod naming;
pub mod queue;
pub mod store;
pub mod svg;

pub use actions::{ActionRecord, ActionStatus, ActionTable, Change};
pub use adapter::{AdapterError, AdapterRegistry, TargetAdapter};
pub use config::{Config, ExtraTarget, SvgStorage};
pub use diff::compute_changes;
pub use error::CoreError;
pub use executor::Executor;
pub use hashing::{canonical_json, config_hash, content_hash};
pub use lock::{BuiltFrom, Icon, LockFile, SvgRecord, Target};
pub use queue::ActionQueue;
pub use store::ProjectStore;
pub use svg::{DefaultOptimizer, StoredSvg, SvgOptimizer, SvgPipeline};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const MIN_CONFIG_VERSION: &str = "1.0.0";

/// Config document name under the project root.
pub const CONFIG_FILE: &str = "glyphlock.config.json";
/// Lock document name under the project root.
pub const LOCK_FILE: &str = "glyphlock.lock.json";
