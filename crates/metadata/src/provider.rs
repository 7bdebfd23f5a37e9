use std::collections::HashMap;
use std::sync::Arc;

use showrunner_core::{IndexerKind, ShowId};

use crate::{CrossReferenceInfo, EpisodeInfo, MetadataError, SeriesMetadata};

/// A source of series and episode listings, keyed by that source's series id.
#[async_trait::async_trait]
pub trait Indexer: Send + Sync {
    fn kind(&self) -> IndexerKind;

    fn name(&self) -> &str;

    /// Get full metadata for a series.
    async fn get_series(&self, id: u64, language: &str) -> Result<SeriesMetadata, MetadataError>;

    /// Get every known episode of a series, specials included.
    async fn get_episodes(&self, id: u64, language: &str)
    -> Result<Vec<EpisodeInfo>, MetadataError>;
}

/// Optional enrichment from a second source (IMDb ids, ratings).
#[async_trait::async_trait]
pub trait CrossReference: Send + Sync {
    fn name(&self) -> &str;

    async fn lookup(
        &self,
        show: ShowId,
        series: &SeriesMetadata,
    ) -> Result<CrossReferenceInfo, MetadataError>;
}

/// The configured indexers, one per [`IndexerKind`].
#[derive(Clone, Default)]
pub struct Indexers {
    by_kind: HashMap<IndexerKind, Arc<dyn Indexer>>,
}

impl Indexers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, indexer: Arc<dyn Indexer>) -> Self {
        self.register(indexer);
        self
    }

    pub fn register(&mut self, indexer: Arc<dyn Indexer>) {
        self.by_kind.insert(indexer.kind(), indexer);
    }

    pub fn get(&self, kind: IndexerKind) -> Result<Arc<dyn Indexer>, MetadataError> {
        self.by_kind
            .get(&kind)
            .cloned()
            .ok_or_else(|| MetadataError::NotConfigured(kind.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.by_kind.is_empty()
    }
}
