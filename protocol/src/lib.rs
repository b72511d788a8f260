//! Shared data model for the packtrack workspace.
//!
//! Everything in this crate is plain serde data: the record shapes persisted
//! by `packtrack-core` and the values exchanged with shells (desktop UI,
//! CLI). No I/O happens here.

pub mod archive;
pub mod customer;
pub mod package;
pub mod stages;

pub use archive::ArchiveRecord;
pub use archive::ArchivesPage;
pub use archive::PackageArchiveEntry;
pub use archive::PartArchiveEntry;
pub use customer::Customer;
pub use customer::Panel;
pub use customer::RosterRecord;
pub use customer::StatusHistoryEntry;
pub use package::Package;
pub use package::PackageInfo;
pub use stages::PackStage;
pub use stages::ShipMode;
pub use stages::ShipmentStage;
