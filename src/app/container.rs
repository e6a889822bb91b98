use std::sync::Arc;

use crate::adapters::{FfmpegToolchain, FsStorage, JsonTranscriptProvider};
use crate::app::slice_interactor::BoundedSlicer;
use crate::domain::config::CoreConfig;
use crate::domain::errors::DomainError;
use crate::engine::CompositionEngine;
use crate::ports::{MediaToolPort, StoragePort, TranscriptPort};
use crate::probe::{MediaProbe, ProbeCache};

pub trait AppContainer: Send + Sync {
    fn probe_cache(&self) -> Arc<ProbeCache>;
    fn composition_engine(&self) -> Arc<CompositionEngine>;
    fn slicer(&self) -> Arc<BoundedSlicer>;
}

/// Wires one shared probe cache into the engine and the slicer
pub struct DefaultAppContainer {
    config: CoreConfig,
    probe_cache: Arc<ProbeCache>,
    composition_engine: Arc<CompositionEngine>,
    slicer: Arc<BoundedSlicer>,
}

impl DefaultAppContainer {
    /// Production wiring with sidecar transcripts
    pub fn new(config: CoreConfig) -> Result<Self, DomainError> {
        Self::with_transcripts(config, Arc::new(JsonTranscriptProvider::sidecar()))
    }

    /// Production wiring with a caller-chosen transcript source
    pub fn with_transcripts(
        config: CoreConfig,
        transcripts: Arc<dyn TranscriptPort>,
    ) -> Result<Self, DomainError> {
        let tool = Arc::new(FfmpegToolchain::from_settings(&config.tools));
        let storage = Arc::new(FsStorage::new(&config.storage.root));
        Self::with_ports(config, tool, storage, transcripts)
    }

    pub fn with_ports(
        config: CoreConfig,
        tool: Arc<dyn MediaToolPort>,
        storage: Arc<dyn StoragePort>,
        transcripts: Arc<dyn TranscriptPort>,
    ) -> Result<Self, DomainError> {
        config.validate()?;

        let probe = MediaProbe::new(Arc::clone(&tool), config.probe.timeout());
        let probe_cache = Arc::new(ProbeCache::new(probe, config.probe.cache_capacity));

        let composition_engine = Arc::new(CompositionEngine::new(
            Arc::clone(&tool),
            Arc::clone(&probe_cache),
            &config.composition,
        )?);

        let slicer = Arc::new(BoundedSlicer::new(
            tool,
            Arc::clone(&probe_cache),
            storage,
            transcripts,
            config.alignment.clone(),
            &config.slicer,
        ));

        Ok(Self {
            config,
            probe_cache,
            composition_engine,
            slicer,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }
}

impl AppContainer for DefaultAppContainer {
    fn probe_cache(&self) -> Arc<ProbeCache> {
        Arc::clone(&self.probe_cache)
    }

    fn composition_engine(&self) -> Arc<CompositionEngine> {
        Arc::clone(&self.composition_engine)
    }

    fn slicer(&self) -> Arc<BoundedSlicer> {
        Arc::clone(&self.slicer)
    }
}
