//! Root of the `packtrack-core` library.
//!
//! The core tracks manufacturing customers from packing through shipment:
//! scan records are reconciled against panel rosters by suffix key, stage
//! changes run through a guarded state machine with an append-only audit
//! trail, and archiving snapshots a customer's working directory into a
//! compressed artifact coordinated against concurrent ingestion.

// User-visible output belongs to the shell on top of this crate; library
// code reports through the tracing stack.
#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod archive;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod locks;
pub mod reconcile;
pub mod scan;
pub mod store;
mod tracker;

pub use archive::ArtifactManifest;
pub use config::TrackerConfig;
pub use error::Result;
pub use error::TrackerError;
pub use locks::CustomerLocks;
pub use reconcile::ReconcileOutcome;
pub use reconcile::SUFFIX_KEY_LEN;
pub use reconcile::suffix_key;
pub use store::ArchiveStore;
pub use store::CustomerStore;
pub use store::PanelStore;
pub use tracker::Tracker;

// Re-export the protocol model so shells can depend on one crate.
pub use packtrack_protocol as protocol;
