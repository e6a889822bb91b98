//! phrasecut media core
//!
//! Cuts spoken expressions out of long-form media and composes the resulting
//! clips, driving `ffprobe`/`ffmpeg` as external tools.
//!
//! # Features
//!
//! - Memoized media inspection keyed by file identity
//! - Copy-first joins with a filter-graph fallback that never drops audio
//! - Transcript-based expression alignment with a subtitle-window fallback
//! - Bounded, cancellable batch slicing

pub mod adapters;
pub mod align;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod engine;
pub mod error;
pub mod output;
pub mod planner;
pub mod ports;
pub mod probe;
pub mod streams;

// Re-export commonly used types
pub use app::{AppContainer, BatchManifest, BoundedSlicer, DefaultAppContainer};
pub use domain::config::CoreConfig;
pub use domain::errors::DomainError;
pub use domain::model::{MediaMetadata, SliceRequest, SliceResult};
pub use engine::{CompositionEngine, CompositionOutput};
pub use error::{PhraseCutError, PhraseCutResult};
pub use probe::ProbeCache;
