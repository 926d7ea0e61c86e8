//! Application wiring.
//!
//! [`Engine`] owns one [`VectorIndex`] and hands it to the ingestor,
//! the retrieval gateway, and the context assembler. It is built once
//! per process from the loaded [`Config`].

use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use study_context_core::embedding::EmbeddingProvider;
use study_context_core::store::ChunkStore;
use study_context_core::strategy::{ChainReport, ContextRequest, StrategyChain};
use study_context_core::{ContextAssembler, Ingestor, RetrievalGateway, VectorIndex};

use crate::config::Config;
use crate::db;
use crate::embedding::create_provider;
use crate::migrate;
use crate::sqlite_store::SqliteStore;

pub struct Engine {
    config: Config,
    index: Arc<VectorIndex>,
    ingestor: Ingestor,
    gateway: Arc<RetrievalGateway>,
    assembler: Arc<ContextAssembler>,
}

impl Engine {
    /// Connect to the configured database, ensure the schema exists, and
    /// build the configured embedding provider.
    pub async fn open(config: Config) -> Result<Self> {
        let pool = db::connect(&config).await?;
        migrate::run_migrations(&pool).await?;
        let embedder = create_provider(&config.embedding)?;
        debug!(
            db = %config.db.path.display(),
            provider = %config.embedding.provider,
            model = embedder.model_name(),
            dims = embedder.dims(),
            "engine opened"
        );
        Ok(Self::with_backends(
            config,
            Arc::new(SqliteStore::new(pool)),
            embedder,
        ))
    }

    /// Build an engine over explicit backends.
    pub fn with_backends(
        config: Config,
        store: Arc<dyn ChunkStore>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        let index = Arc::new(
            VectorIndex::new(store, embedder)
                .with_batch_size(config.embedding.batch_size),
        );
        let ingestor = Ingestor::new(index.clone(), config.chunking.params());
        let gateway = Arc::new(RetrievalGateway::new(index.clone()));
        let assembler = Arc::new(ContextAssembler::new(
            index.clone(),
            config.assembler.sampling(),
        ));

        Self {
            config,
            index,
            ingestor,
            gateway,
            assembler,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    pub fn gateway(&self) -> &RetrievalGateway {
        &self.gateway
    }

    pub fn assembler(&self) -> &ContextAssembler {
        &self.assembler
    }

    /// Run the standard strategy chain for `request`.
    pub async fn build_context(&self, request: &ContextRequest) -> ChainReport {
        StrategyChain::standard(self.assembler.clone(), self.gateway.clone())
            .run(request)
            .await
    }
}
