//! Explicit stream mapping for multi-input compositions
//!
//! A `StreamMap` names every source stream feeding a filter graph and every
//! stream leaving it. Outputs are always mapped by label, never left to the
//! encoder's automatic selection.

use serde::{Deserialize, Serialize};

use crate::domain::model::EncodeArgs;

pub mod mapper;

pub use mapper::StreamMapper;

/// Stream type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    /// Stream specifier letter used in `input:kind:index`
    pub fn specifier(&self) -> char {
        match self {
            StreamKind::Video => 'v',
            StreamKind::Audio => 'a',
        }
    }
}

/// Where a source stream comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamSource {
    /// Stream `index` of its kind in input `input`
    Input { input: usize, index: usize },
    /// Black frames or silence standing in for a stream the input lacks
    Generated { input: usize, duration_seconds: f64 },
}

/// One stream entering the filter graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceStream {
    pub kind: StreamKind,
    pub source: StreamSource,
    /// Filter graph label of the normalized stream (e.g. `v0`, `a1`)
    pub label: String,
}

impl SourceStream {
    /// Input position this stream belongs to
    pub fn input(&self) -> usize {
        match self.source {
            StreamSource::Input { input, .. } | StreamSource::Generated { input, .. } => input,
        }
    }

    /// `input:kind:index` specifier, `None` for generated streams
    pub fn specifier(&self) -> Option<String> {
        match self.source {
            StreamSource::Input { input, index } => {
                Some(format!("{}:{}:{}", input, self.kind.specifier(), index))
            }
            StreamSource::Generated { .. } => None,
        }
    }

    pub fn is_generated(&self) -> bool {
        matches!(self.source, StreamSource::Generated { .. })
    }
}

/// One stream leaving the filter graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputStream {
    pub kind: StreamKind,
    pub label: String,
}

/// Complete source-to-output mapping of a composition
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamMap {
    pub sources: Vec<SourceStream>,
    pub outputs: Vec<OutputStream>,
}

impl StreamMap {
    pub fn source_count(&self, kind: StreamKind) -> usize {
        self.sources.iter().filter(|s| s.kind == kind).count()
    }

    pub fn output_count(&self, kind: StreamKind) -> usize {
        self.outputs.iter().filter(|s| s.kind == kind).count()
    }

    /// Source streams of one kind, in input order
    pub fn sources_of(&self, kind: StreamKind) -> impl Iterator<Item = &SourceStream> {
        self.sources.iter().filter(move |s| s.kind == kind)
    }

    pub fn output_label(&self, kind: StreamKind) -> Option<&str> {
        self.outputs
            .iter()
            .find(|o| o.kind == kind)
            .map(|o| o.label.as_str())
    }

    /// `-map [label]` arguments for every output, video first
    pub fn map_args(&self) -> EncodeArgs {
        let mut args = EncodeArgs::new();
        for kind in [StreamKind::Video, StreamKind::Audio] {
            for output in self.outputs.iter().filter(|o| o.kind == kind) {
                args = args.opt("-map", format!("[{}]", output.label));
            }
        }
        args
    }
}
