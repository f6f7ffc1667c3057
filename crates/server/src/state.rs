//! Shared state behind both server surfaces.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use offerscout_client::{
    DirectSource, HttpValidator, OfferSource, OfferValidator, SearchCoordinator, SearchResult, SourceAdapter,
    build_adapters, default_launcher,
};
use offerscout_core::{AppConfig, Error, ResultCache, Source};

/// What every search on one source shares: the offer source and the cache
/// of settled results.
struct SearchPipeline {
    source: Arc<dyn OfferSource>,
    settled: Arc<ResultCache<SearchResult>>,
}

/// One adapter and one search pipeline per source.
pub struct AppState {
    adapters: HashMap<Source, Arc<dyn SourceAdapter>>,
    pipelines: HashMap<Source, SearchPipeline>,
    validator: Option<Arc<dyn OfferValidator>>,
}

impl AppState {
    pub fn new(
        adapters: HashMap<Source, Arc<dyn SourceAdapter>>, validator: Option<Arc<dyn OfferValidator>>,
        ttl: impl Fn(Source) -> Duration,
    ) -> Self {
        let pipelines = adapters
            .iter()
            .map(|(source, adapter)| {
                let pipeline = SearchPipeline {
                    source: Arc::new(DirectSource::new(Arc::clone(adapter))),
                    settled: Arc::new(ResultCache::new(format!("{source}-settled"), ttl(*source))),
                };
                (*source, pipeline)
            })
            .collect();
        Self { adapters, pipelines, validator }
    }

    /// Browser-backed adapters for every source plus the configured
    /// validator.
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let adapters = build_adapters(config, default_launcher(config));
        let validator = HttpValidator::from_config(config)?.map(|v| Arc::new(v) as Arc<dyn OfferValidator>);
        if validator.is_none() {
            tracing::warn!("no validator configured; searches return unvalidated offers");
        }
        Ok(Self::new(adapters, validator, |source| config.cache_ttl(source)))
    }

    pub fn adapter(&self, source: Source) -> Result<&Arc<dyn SourceAdapter>, Error> {
        self.adapters
            .get(&source)
            .ok_or_else(|| Error::UnknownSource(source.to_string()))
    }

    fn pipeline(&self, source: Source) -> Result<&SearchPipeline, Error> {
        self.pipelines
            .get(&source)
            .ok_or_else(|| Error::UnknownSource(source.to_string()))
    }

    /// A coordinator with a slot of its own for one caller. Callers never
    /// supersede each other; they only share settled results.
    pub fn coordinator(&self, source: Source) -> Result<SearchCoordinator, Error> {
        let pipeline = self.pipeline(source)?;
        Ok(SearchCoordinator::with_cache(
            Arc::clone(&pipeline.source),
            self.validator.clone(),
            Arc::clone(&pipeline.settled),
        ))
    }

    /// Clear the adapter's raw offers and the settled results.
    pub fn clear_cache(&self, source: Source) -> Result<usize, Error> {
        let cleared = self.adapter(source)?.clear_cache() + self.pipeline(source)?.settled.clear();
        Ok(cleared)
    }
}
