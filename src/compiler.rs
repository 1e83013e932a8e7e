//! Query compiler facade.
//!
//! Owns the metadata registry, the compiled-query cache and the statement
//! patterns, and is meant to be shared across threads behind an `Arc`.

use crate::cache::{CacheKey, CacheStats, MemoryQueryCache, NoopQueryCache, QueryCache};
use crate::compiled::{CompiledQuery, QueryLanguage};
use crate::config::CompilerConfig;
use crate::error::CompileResult;
use crate::hints::QueryHints;
use crate::metadata::MetadataRegistry;
use crate::transpiler::{self, Environment, PatternRegistry};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub struct QueryCompiler {
    metadata: Arc<dyn MetadataRegistry>,
    cache: Arc<dyn QueryCache>,
    config: CompilerConfig,
    patterns: PatternRegistry,
    compilations: AtomicU64,
}

impl QueryCompiler {
    /// Create a compiler. The cache is chosen by `config.cache.enabled`.
    pub fn new(metadata: Arc<dyn MetadataRegistry>, config: CompilerConfig) -> Self {
        let cache: Arc<dyn QueryCache> = if config.cache.enabled {
            Arc::new(MemoryQueryCache::new())
        } else {
            Arc::new(NoopQueryCache::default())
        };
        Self::with_cache(metadata, config, cache)
    }

    /// Create a compiler with an injected cache.
    pub fn with_cache(metadata: Arc<dyn MetadataRegistry>, config: CompilerConfig, cache: Arc<dyn QueryCache>) -> Self {
        Self {
            metadata,
            cache,
            config,
            patterns: PatternRegistry::new(),
            compilations: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Compile query text, consulting the cache first. Failures are never
    /// cached.
    pub fn compile(&self, text: &str, language: QueryLanguage, hints: &QueryHints) -> CompileResult<Arc<CompiledQuery>> {
        let key = CacheKey::new(text, language, hints);
        if let Some(compiled) = self.cache.get(&key) {
            tracing::debug!("Cache hit: {}", text);
            return Ok(compiled);
        }
        tracing::debug!("Cache miss: {}", text);

        let compiled = Arc::new(self.compile_uncached(text, language, hints)?);
        self.cache.insert(key, Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Compile with fetch overrides read from a hints map.
    pub fn compile_with_hints_map(
        &self,
        text: &str,
        language: QueryLanguage,
        hints: &HashMap<String, String>,
    ) -> CompileResult<Arc<CompiledQuery>> {
        let hints = QueryHints::from_map(hints)?;
        self.compile(text, language, &hints)
    }

    /// Compile without touching the cache.
    pub fn compile_uncached(&self, text: &str, language: QueryLanguage, hints: &QueryHints) -> CompileResult<CompiledQuery> {
        tracing::debug!("Compiling {:?} query: {}", language, text);
        self.compilations.fetch_add(1, Ordering::Relaxed);

        let result = match language {
            QueryLanguage::Object => {
                let env = Environment {
                    metadata: self.metadata.as_ref(),
                    labels: &self.config.labels,
                    patterns: &self.patterns,
                };
                transpiler::transpile(text, env, *hints)
            }
            QueryLanguage::Native => transpiler::transpile_native(text),
        };

        match &result {
            Ok(compiled) => tracing::debug!(
                "Compiled {} with {} parameter(s): {}",
                compiled.kind,
                compiled.parameter_count(),
                compiled.sql
            ),
            Err(e) => tracing::debug!("Rejected ({:?}): {}", e.kind(), e),
        }
        result
    }

    /// Number of compilations performed, cache hits excluded.
    pub fn compilations(&self) -> u64 {
        self.compilations.load(Ordering::Relaxed)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
