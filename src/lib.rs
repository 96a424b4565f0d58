// src/lib.rs

//! aptsnap
//!
//! APT hook pair that brackets every package transaction with a linked
//! snapper pre/post snapshot pair, so the transaction can be audited or
//! rolled back with `snapper undochange`.
//!
//! # Architecture
//!
//! - Two invocations per transaction: `pre` before dpkg runs, `post` after
//! - Single-slot JSON record carries the pre snapshot number between them
//! - Removals are identified after the fact by diffing installed packages
//! - All external programs run behind the `CommandRunner` seam

pub mod apt;
pub mod config;
pub mod correlator;
pub mod description;
mod error;
pub mod exec;
pub mod snapper;
pub mod store;

pub use config::Config;
pub use correlator::{Correlator, Outcome, Phase};
pub use error::{Error, Result};
pub use store::{ActionKind, CorrelationRecord, CorrelationStore};
