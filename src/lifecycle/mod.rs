//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Validate → Seed topology → Start manager & watchers
//!
//! Shutdown (signals.rs):
//!     SIGTERM/SIGINT → cancel token → watchers drain → update stream closes
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop creating watchers, drain them, then close the
//!   update stream so consumers see a clean end
//! - One cancellation token tree; watchers hold child tokens

pub mod signals;
