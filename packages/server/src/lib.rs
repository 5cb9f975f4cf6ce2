// Pansave - cloud drive re-share service
//
// Accepts batches of public cloud-drive share links, restores the shared
// files into the operator's own drive account and re-shares them, recording
// the resulting links. The background task engine lives in kernel/tasks;
// provider-specific transfer logic lives in domains/transfer and the
// xunlei-client crate.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;

pub use config::Config;
