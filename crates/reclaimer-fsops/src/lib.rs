#![forbid(unsafe_code)]
#![warn(
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    rustdoc::broken_intra_doc_links,
    missing_docs
)]

//! Filesystem side of reclamation: resolving stored relative paths under the
//! destination root and deleting them idempotently.

pub mod error;
pub mod service;

pub use error::{FsOpsError, FsOpsResult};
pub use service::{FileRemoval, FileRemover, RemoveOutcome};
