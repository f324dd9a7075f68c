use std::sync::Arc;

use thiserror::Error;

use crate::adaptive::AdaptiveDifficultyManager;
use crate::config::EngineConfig;
use crate::content::{
    CatalogError, CompileError, QuestionCompiler, QuestionPool, SessionExposureTracker,
    TemplateCatalog,
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Compile(#[from] CompileError),
}

/// Owns every store the adaptive core needs. Build one per process (or per
/// test) and share it by reference or `Arc`.
pub struct AdaptiveEngine {
    config: EngineConfig,
    catalog: TemplateCatalog,
    compiler: QuestionCompiler,
    exposure: SessionExposureTracker,
    sessions: AdaptiveDifficultyManager,
}

impl AdaptiveEngine {
    pub fn from_config(config: EngineConfig) -> Result<Self, EngineError> {
        let catalog = match &config.template_path {
            Some(path) => TemplateCatalog::from_path(path)?,
            None => TemplateCatalog::builtin()?,
        };
        Self::with_catalog(config, catalog)
    }

    pub fn with_catalog(config: EngineConfig, catalog: TemplateCatalog) -> Result<Self, EngineError> {
        let compiler = QuestionCompiler::new(config.compiler.clone());
        let pool = QuestionPool::precompile(&catalog, &compiler, config.pool_per_template)?;
        let exposure = SessionExposureTracker::new(Arc::new(pool));
        let sessions = AdaptiveDifficultyManager::new(config.session.clone());

        Ok(Self {
            config,
            catalog,
            compiler,
            exposure,
            sessions,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &TemplateCatalog {
        &self.catalog
    }

    pub fn compiler(&self) -> &QuestionCompiler {
        &self.compiler
    }

    pub fn exposure(&self) -> &SessionExposureTracker {
        &self.exposure
    }

    pub fn sessions(&self) -> &AdaptiveDifficultyManager {
        &self.sessions
    }

    /// Evicts idle exposure sets and atom records. Returns `(sessions, atoms)`.
    pub fn evict_idle(&self) -> (usize, usize) {
        let ttl = self.config.idle_ttl;
        (self.exposure.evict_idle(ttl), self.sessions.evict_idle(ttl))
    }
}
