//! reelx library
//!
//! Resolves video-sharing links into downloadable streams through a priority
//! list of public providers, downloads the payload through a chain of proxy
//! fallbacks, and exports time ranges of a local video as cropped vertical
//! clips.

pub mod acquire;
pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod locator;
pub mod network;
pub mod ports;
pub mod resolver;
pub mod utils;

// Re-export commonly used types
pub use domain::errors::{DomainError, DomainResult};
pub use domain::model::{ClipSpec, ExportSettings, Locator, MediaAsset, StreamDescriptor, TimeSpec};
