//! E2E test helpers for constructing the full application stack.
//!
//! Provides a fully-wired App over a real store (arena or SQLite) and a
//! scripted oracle that counts its calls.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mixit_domain::{Element, ElementId, OwnerId};

use crate::app::{App, Repositories};
use crate::infrastructure::clock::SystemClock;
use crate::infrastructure::config::ValidationLimits;
use crate::infrastructure::persistence::{MemoryStore, SqliteStore};
use crate::infrastructure::ports::{OracleClient, OracleError, RawOracleResponse};
use crate::infrastructure::retry::RetryConfig;
use crate::use_cases::SynthesisSettings;

// =============================================================================
// Scripted oracle
// =============================================================================

/// Oracle double: answers from a script, then from a fallback, optionally slowly.
pub struct ScriptedOracle {
    calls: AtomicUsize,
    delay: Duration,
    script: Mutex<VecDeque<Result<RawOracleResponse, OracleError>>>,
    fallback: Result<RawOracleResponse, OracleError>,
    goals: Mutex<VecDeque<String>>,
}

impl ScriptedOracle {
    pub fn answering(name: &str, icon: &str) -> Self {
        Self::with_fallback(Ok(RawOracleResponse::new(name, icon)))
    }

    pub fn failing(error: OracleError) -> Self {
        Self::with_fallback(Err(error))
    }

    fn with_fallback(fallback: Result<RawOracleResponse, OracleError>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            script: Mutex::new(VecDeque::new()),
            fallback,
            goals: Mutex::new(VecDeque::new()),
        }
    }

    /// Answer the next unscripted call with `response` before falling back.
    pub fn then(self, response: Result<RawOracleResponse, OracleError>) -> Self {
        self.script.lock().unwrap().push_back(response);
        self
    }

    /// Queue a goal proposal. Unscripted proposals fail with a connection error.
    pub fn with_goal(self, goal: &str) -> Self {
        self.goals.lock().unwrap().push_back(goal.to_string());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OracleClient for ScriptedOracle {
    async fn synthesize(
        &self,
        _element_a: &Element,
        _element_b: &Element,
    ) -> Result<RawOracleResponse, OracleError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }

    async fn propose_goal(&self, _excluded: &[String]) -> Result<String, OracleError> {
        self.goals
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| OracleError::connection("no goal scripted"))
    }
}

// =============================================================================
// Engine under test
// =============================================================================

pub fn settings(max_retries: u32, oracle_timeout: Duration) -> SynthesisSettings {
    SynthesisSettings {
        retry: RetryConfig::immediate(max_retries),
        oracle_timeout,
        limits: ValidationLimits::default(),
    }
}

/// Fully wired engine with starter elements seeded.
pub struct TestEngine {
    pub app: App,
    pub oracle: Arc<ScriptedOracle>,
    /// Present when backed by the arena store, for fault injection.
    pub memory: Option<Arc<MemoryStore>>,
}

impl TestEngine {
    pub async fn in_memory(oracle: ScriptedOracle) -> Self {
        Self::in_memory_with(oracle, settings(0, Duration::from_secs(5))).await
    }

    pub async fn in_memory_with(oracle: ScriptedOracle, settings: SynthesisSettings) -> Self {
        let store = Arc::new(MemoryStore::new());
        let engine = Self::build(Repositories::from_store(store.clone()), oracle, settings);
        engine.app.seed_starter_elements().await.unwrap();
        Self {
            memory: Some(store),
            ..engine
        }
    }

    pub async fn sqlite(oracle: ScriptedOracle) -> Self {
        let store = Arc::new(SqliteStore::in_memory().await.unwrap());
        Self::on_repositories(Repositories::from_store(store), oracle).await
    }

    /// A second engine (own in-flight registry) over an existing store, like
    /// another process sharing the database.
    pub async fn on_repositories(repositories: Repositories, oracle: ScriptedOracle) -> Self {
        let engine = Self::build(repositories, oracle, settings(0, Duration::from_secs(5)));
        engine.app.seed_starter_elements().await.unwrap();
        engine
    }

    fn build(
        repositories: Repositories,
        oracle: ScriptedOracle,
        settings: SynthesisSettings,
    ) -> Self {
        let oracle = Arc::new(oracle);
        let app = App::new(
            repositories,
            oracle.clone(),
            Arc::new(SystemClock::new()),
            settings,
        );
        Self {
            app,
            oracle,
            memory: None,
        }
    }

    pub async fn combination_count(&self) -> u64 {
        self.app.repositories.combinations.count().await.unwrap()
    }

    pub async fn inventory_names(&self, owner_id: OwnerId) -> Vec<String> {
        self.app
            .list_inventory(owner_id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name.to_string())
            .collect()
    }
}

/// Id of a starter (or any) element by name.
pub fn id_of(name: &str) -> ElementId {
    ElementId::for_normalized_name(&name.to_lowercase())
}
