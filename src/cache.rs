// cache.rs — Compiled-program LRU cache
//
// Compiling a graph is cheap next to evaluating it, but editors and
// preview pipelines recompile the same graph constantly. Keyed by the
// graph's deterministic structural hash, hits return an `Arc` clone of
// the already-compiled runtime instead of compiling again.

use crate::graph::ProgramGraph;
use crate::runtime::{CompilationResult, GraphRuntime};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};

/// Thread-safe LRU over compiled runtimes. Only successful compilations
/// are cached; failures are returned to the caller and retried next time.
pub struct ProgramCache {
    cache: Mutex<LruCache<u64, Arc<GraphRuntime>>>,
}

impl ProgramCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("max(1) is non-zero");
        Self {
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Fetch the compiled runtime for `graph`, compiling on a miss.
    pub fn get_or_compile(
        &self,
        graph: &ProgramGraph,
        debug: bool,
    ) -> Result<Arc<GraphRuntime>, CompilationResult> {
        let key = graph.structural_hash();
        if let Some(hit) = self.cache.lock().expect("cache lock poisoned").get(&key) {
            return Ok(Arc::clone(hit));
        }

        let mut runtime = GraphRuntime::new();
        let result = runtime.compile(graph, debug);
        if !result.success {
            return Err(result);
        }
        let runtime = Arc::new(runtime);
        self.cache
            .lock()
            .expect("cache lock poisoned")
            .put(key, Arc::clone(&runtime));
        Ok(runtime)
    }

    pub fn len(&self) -> usize {
        self.cache.lock().expect("cache lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.cache.lock().expect("cache lock poisoned").clear();
    }
}

// ── Tests ───────────────────────────────────────────────────────────
