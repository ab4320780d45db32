//! Health subsystem.
//!
//! Tracks which destinations of each backend group can actually serve
//! traffic, preferring the group's virtual address once it has been
//! verified end to end.
//!
//! # Data Flow
//! ```text
//! membership events
//!     → WatchManager (registry, one watcher per group)
//!     → GroupWatcher (latest-wins snapshot + retry ticks)
//!     → probes (vip first, then individual destinations)
//!     → aggregated DestsUpdate stream
//! ```
//!
//! # Design Decisions
//! - Snapshots travel over a latest-wins channel: a slow probe cycle never
//!   backs up the membership feed, it just sees the newest set when it
//!   finishes
//! - Probing state belongs to the watcher task alone; the manager never
//!   locks health state, only the registry
//! - The aggregated stream closes only after every watcher has stopped, so
//!   consumers can use end-of-stream as the drain barrier

pub mod manager;
pub mod update;
pub(crate) mod watcher;

pub use manager::WatchManager;
pub use update::DestsUpdate;
