//! Share link transfers.

pub mod links;
mod processor;

pub use links::{detect_service, parse_share_link, ShareLink};
pub use processor::{TransferInput, TransferOutput, TransferProcessor, TRANSFER_TASK_TYPE};
