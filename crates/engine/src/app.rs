//! Application state and composition.

use std::sync::Arc;

use anyhow::Context;
use mixit_domain::{CanonicalKey, Element, ElementId, ElementName, Goal, OwnerId};

use crate::entities::{Catalog, Inventory};
use crate::infrastructure::{
    clock::SystemClock,
    config::EngineConfig,
    openai::OpenAiOracle,
    persistence::SqliteStore,
    ports::{ClockPort, CombinationRepo, ElementRepo, InventoryRepo, OracleClient, RepoError},
};
use crate::use_cases::{
    self, InventoryStats, ResolutionError, ResolvedElement, SynthesisSettings,
};

/// Main application state.
///
/// Holds the storage ports and use cases. This is the surface the UI layer
/// calls into.
pub struct App {
    pub repositories: Repositories,
    pub use_cases: UseCases,
}

/// Container for the storage ports.
#[derive(Clone)]
pub struct Repositories {
    pub elements: Arc<dyn ElementRepo>,
    pub combinations: Arc<dyn CombinationRepo>,
    pub inventory: Arc<dyn InventoryRepo>,
}

impl Repositories {
    /// Use one store for all three ports.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: ElementRepo + CombinationRepo + InventoryRepo + 'static,
    {
        Self {
            elements: store.clone(),
            combinations: store.clone(),
            inventory: store,
        }
    }
}

/// Container for all use cases.
pub struct UseCases {
    pub resolve: Arc<use_cases::ResolveCombination>,
    pub inventory: Arc<use_cases::InventoryOps>,
    pub arcade: Arc<use_cases::ArcadeOps>,
}

impl App {
    /// Create a new App with all dependencies wired up.
    pub fn new(
        repositories: Repositories,
        oracle: Arc<dyn OracleClient>,
        clock: Arc<dyn ClockPort>,
        settings: SynthesisSettings,
    ) -> Self {
        let catalog = Arc::new(Catalog::new(
            repositories.elements.clone(),
            repositories.combinations.clone(),
        ));
        let inventory = Arc::new(Inventory::new(repositories.inventory.clone()));

        let arcade = Arc::new(use_cases::ArcadeOps::new(
            catalog.clone(),
            inventory.clone(),
            oracle.clone(),
            &settings,
        ));
        let resolve = Arc::new(use_cases::ResolveCombination::new(
            catalog.clone(),
            inventory.clone(),
            oracle,
            clock.clone(),
            settings,
        ));
        let inventory_ops = Arc::new(use_cases::InventoryOps::new(catalog, inventory, clock));

        Self {
            repositories,
            use_cases: UseCases {
                resolve,
                inventory: inventory_ops,
                arcade,
            },
        }
    }

    /// Connect to the configured database and oracle, and seed the starter elements.
    pub async fn from_config(config: EngineConfig) -> anyhow::Result<Self> {
        tracing::info!(
            database_url = %config.database_url,
            model = %config.oracle.model,
            "Starting engine"
        );

        let store = SqliteStore::connect(&config.database_url)
            .await
            .with_context(|| format!("Failed to open store at {}", config.database_url))?;
        let oracle = Arc::new(OpenAiOracle::from_config(&config.oracle));

        let app = Self::new(
            Repositories::from_store(Arc::new(store)),
            oracle,
            Arc::new(SystemClock::new()),
            SynthesisSettings::from_config(&config),
        );

        let starters = app
            .seed_starter_elements()
            .await
            .context("Failed to seed starter elements")?;
        tracing::info!(count = starters.len(), "Starter elements ready");

        Ok(app)
    }

    pub async fn resolve_combination(
        &self,
        owner_id: OwnerId,
        element_a: ElementId,
        element_b: ElementId,
    ) -> Result<ResolvedElement, ResolutionError> {
        self.use_cases
            .resolve
            .execute(owner_id, element_a, element_b)
            .await
    }

    pub async fn list_inventory(&self, owner_id: OwnerId) -> Result<Vec<Element>, ResolutionError> {
        self.use_cases.inventory.list_inventory(owner_id).await
    }

    pub async fn record_discovery(
        &self,
        owner_id: OwnerId,
        element_id: ElementId,
    ) -> Result<bool, ResolutionError> {
        self.use_cases
            .inventory
            .record_discovery(owner_id, element_id)
            .await
    }

    pub async fn start_session(&self, owner_id: OwnerId) -> Result<Vec<Element>, ResolutionError> {
        self.use_cases.inventory.start_session(owner_id).await
    }

    pub async fn seed_starter_elements(&self) -> Result<Vec<Element>, RepoError> {
        self.use_cases.inventory.seed_starter_elements().await
    }

    pub async fn recipes_for(
        &self,
        element_id: ElementId,
    ) -> Result<Vec<CanonicalKey>, ResolutionError> {
        self.use_cases.inventory.recipes_for(element_id).await
    }

    pub async fn inventory_stats(
        &self,
        owner_id: OwnerId,
    ) -> Result<InventoryStats, ResolutionError> {
        self.use_cases.inventory.inventory_stats(owner_id).await
    }

    pub async fn list_elements(&self) -> Result<Vec<Element>, ResolutionError> {
        self.use_cases.inventory.list_elements().await
    }

    /// Ask the oracle for an arcade goal that is neither a starter nor one of `recent_goals`.
    pub async fn new_goal(&self, recent_goals: &[ElementName]) -> Result<Goal, ResolutionError> {
        self.use_cases.arcade.new_goal(recent_goals).await
    }

    pub async fn goal_reached(
        &self,
        goal: &Goal,
        owner_id: OwnerId,
        element_id: ElementId,
    ) -> Result<bool, ResolutionError> {
        self.use_cases
            .arcade
            .goal_reached(goal, owner_id, element_id)
            .await
    }

    pub fn in_flight_count(&self) -> usize {
        self.use_cases.resolve.in_flight_count()
    }
}
