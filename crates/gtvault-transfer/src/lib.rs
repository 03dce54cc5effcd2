//! gtvault-transfer: client side of state export and import
//!
//! Save gathers live state into a [`gtvault_core::StateSnapshot`], seals it
//! through the pipeline, and writes a timestamped `.gt` file. Load validates a
//! `.gt` file locally, opens it through the pipeline, and drives a
//! [`LoadFlow`] that either applies directly (empty current state) or waits
//! for a [`MergeStrategy`] decision.

pub mod api;
pub mod client;
pub mod error;
pub mod file;
pub mod flow;
pub mod merge;
pub mod status;

pub use api::{ExportApi, HttpExportApi};
pub use client::{SavedExport, TransferClient};
pub use error::{TransferError, TransferResult};
pub use flow::{LoadFlow, TransitionError};
pub use merge::MergeStrategy;
pub use status::{user_message, TransferStatus};
