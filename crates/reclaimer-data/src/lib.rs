#![forbid(unsafe_code)]
#![warn(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! Storage gateway for the reclaimer: pending-record selection, path lookup and the
//! processed-flag update against the external `instance`/`image` tables.

pub mod error;
pub mod gateway;
pub mod model;

pub use error::{DataError, Result as DataResult};
pub use gateway::{GatewayOptions, MySqlGateway, StorageGateway};
pub use model::{ExistenceFlag, FilePaths, FileRole, InstanceKey, LocationCode, PendingRecord};
