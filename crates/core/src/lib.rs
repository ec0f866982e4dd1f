//! # contextpack-core
//!
//! Selection, budgeting and streaming emission: the pipeline that turns a
//! repository into a single framed text artifact.
//!
//! ## Architecture
//!
//! ```text
//! Walker ──> Priority Resolver ──> Budget Allocator ──> Truncator ──> Framing ──> sink
//!   │              │                     │
//!   │        lens groups +         drop | truncate | hybrid
//!   │        learned store
//!   └── contextpack-walker          (batch: sort-key order;
//!                                    streaming: traversal order)
//! ```
//!
//! Two caller surfaces exist: [`pack`] walks a directory and writes to a
//! sink; [`process`] runs the identical pipeline over in-memory
//! `(path, bytes)` pairs with no filesystem access. Both are
//! deterministic: identical inputs produce identical output bytes.
//!
//! Non-fatal problems (binary files, unreadable entries, dropped
//! candidates) go to the `log` diagnostic channel; only configuration
//! errors and sink write failures end a run.

mod budget;
mod config;
mod emitter;
mod error;
mod framing;
mod lens;
mod options;
mod priority;
mod store;

pub use budget::{
    allocate, format_number, Allocation, BudgetReport, Candidate, Decision, Disposition,
    HYBRID_THRESHOLD,
};
pub use config::{PackConfig, CONFIG_FILE_NAME, DEFAULT_IGNORE_PATTERNS};
pub use emitter::{pack, process, PackSummary, META_FILE_NAME};
pub use error::{PackError, Result};
pub use framing::{content_digest, render_record, write_record, EmissionRecord};
pub use lens::{build_plan, EffectivePlan, LensConfig, LensManager, PriorityGroup};
pub use options::{PackOptions, SortKey, SortOrder, Strategy};
pub use priority::{PriorityResolver, ResolvedPriority, DEFAULT_PRIORITY};
pub use store::{PriorityStore, StoreRecord, ALWAYS_INCLUDE_TAG, STORE_FILE_NAME};

// Re-exported so callers can name truncation modes and budgets without
// depending on the analyzer crate directly.
pub use contextpack_analyzers::{estimate_tokens, parse_budget, TruncateMode};
