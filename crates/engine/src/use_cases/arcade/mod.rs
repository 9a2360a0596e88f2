//! Arcade use cases.
//!
//! Asks the oracle for a goal word and checks discoveries against it.

use std::sync::Arc;
use std::time::Duration;

use mixit_domain::{ElementId, ElementName, Goal, OwnerId, STARTER_ELEMENTS};
use tracing::{info, warn};

use crate::entities::{Catalog, Inventory};
use crate::infrastructure::ports::{OracleClient, OracleError};
use crate::infrastructure::retry::RetryConfig;
use crate::use_cases::combination::{OracleResponseValidator, ResolutionError, SynthesisSettings};

/// Arcade operations.
pub struct ArcadeOps {
    catalog: Arc<Catalog>,
    inventory: Arc<Inventory>,
    oracle: Arc<dyn OracleClient>,
    validator: OracleResponseValidator,
    retry: RetryConfig,
    oracle_timeout: Duration,
}

impl ArcadeOps {
    pub fn new(
        catalog: Arc<Catalog>,
        inventory: Arc<Inventory>,
        oracle: Arc<dyn OracleClient>,
        settings: &SynthesisSettings,
    ) -> Self {
        Self {
            catalog,
            inventory,
            oracle,
            validator: OracleResponseValidator::new(settings.limits),
            retry: settings.retry.clone(),
            oracle_timeout: settings.oracle_timeout,
        }
    }

    /// Ask the oracle for a new goal.
    ///
    /// Neither a starter element nor any of `recent_goals` is chosen as the
    /// goal word. Failed or malformed proposals are retried like combination
    /// requests.
    pub async fn new_goal(&self, recent_goals: &[ElementName]) -> Result<Goal, ResolutionError> {
        let excluded: Vec<ElementName> = STARTER_ELEMENTS
            .iter()
            .filter_map(|(name, _)| ElementName::new(*name).ok())
            .chain(recent_goals.iter().cloned())
            .collect();
        let prompt_words: Vec<String> = excluded.iter().map(ToString::to_string).collect();

        let mut attempt = 1;
        loop {
            match self.ask(&prompt_words, &excluded).await {
                Ok(goal) => {
                    info!(goal = %goal.word(), attempt, "New arcade goal");
                    return Ok(goal);
                }
                Err(error) if error.is_retryable() && attempt < self.retry.max_attempts() => {
                    warn!(attempt, error = %error, "Goal proposal failed");
                    tokio::time::sleep(self.retry.delay_for(attempt)).await;
                    attempt += 1;
                }
                Err(error) => {
                    warn!(attempt, error = %error, "Giving up on goal proposal");
                    return Err(ResolutionError::from_oracle(error, attempt));
                }
            }
        }
    }

    /// Whether the owner has discovered `element_id` and it reaches `goal`.
    pub async fn goal_reached(
        &self,
        goal: &Goal,
        owner_id: OwnerId,
        element_id: ElementId,
    ) -> Result<bool, ResolutionError> {
        let element = self
            .catalog
            .get_element(element_id)
            .await?
            .ok_or(ResolutionError::ElementNotFound(element_id))?;

        if !goal.is_reached_by(&element.name) {
            return Ok(false);
        }
        Ok(self.inventory.contains(owner_id, element_id).await?)
    }

    async fn ask(
        &self,
        prompt_words: &[String],
        excluded: &[ElementName],
    ) -> Result<Goal, OracleError> {
        let raw = tokio::time::timeout(self.oracle_timeout, self.oracle.propose_goal(prompt_words))
            .await
            .map_err(|_| {
                OracleError::timeout(format!(
                    "no goal within {} ms",
                    self.oracle_timeout.as_millis()
                ))
            })??;

        self.validator.validate_goal(&raw, excluded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::Utc;
    use mixit_domain::{Element, ElementIcon};

    use crate::infrastructure::config::ValidationLimits;
    use crate::infrastructure::ports::{
        MockCombinationRepo, MockElementRepo, MockInventoryRepo, MockOracleClient,
    };

    fn element(name: &str, icon: &str) -> Element {
        Element::new(
            ElementName::new(name).unwrap(),
            ElementIcon::new(icon).unwrap(),
            Utc::now(),
        )
    }

    fn ops(
        elements: MockElementRepo,
        inventory: MockInventoryRepo,
        oracle: MockOracleClient,
        max_retries: u32,
    ) -> ArcadeOps {
        let settings = SynthesisSettings {
            retry: RetryConfig::immediate(max_retries),
            oracle_timeout: Duration::from_secs(5),
            limits: ValidationLimits::default(),
        };
        ArcadeOps::new(
            Arc::new(Catalog::new(
                Arc::new(elements),
                Arc::new(MockCombinationRepo::new()),
            )),
            Arc::new(Inventory::new(Arc::new(inventory))),
            Arc::new(oracle),
            &settings,
        )
    }

    #[tokio::test]
    async fn new_goal_excludes_starters_and_recent_goals() {
        let mut oracle = MockOracleClient::new();
        oracle
            .expect_propose_goal()
            .withf(|excluded| {
                ["Water", "Earth", "Fire", "Air", "Volcano"]
                    .iter()
                    .all(|w| excluded.iter().any(|e| e.as_str() == *w))
            })
            .times(1)
            .returning(|_| Ok("Rainbow, Rainbows, Moonbow".to_string()));

        let goal = ops(MockElementRepo::new(), MockInventoryRepo::new(), oracle, 0)
            .new_goal(&[ElementName::new("Volcano").unwrap()])
            .await
            .unwrap();

        assert_eq!(goal.word().as_str(), "Rainbow");
        assert_eq!(goal.variants().len(), 2);
    }

    #[tokio::test]
    async fn malformed_or_excluded_proposals_are_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut oracle = MockOracleClient::new();
        oracle.expect_propose_goal().times(3).returning(move |_| {
            match calls.fetch_add(1, Ordering::SeqCst) {
                0 => Ok("🌈 Rainbow".to_string()),
                1 => Ok("Fire, Fires, Flames".to_string()),
                _ => Ok("Glacier, Glaciers".to_string()),
            }
        });

        let goal = ops(MockElementRepo::new(), MockInventoryRepo::new(), oracle, 2)
            .new_goal(&[])
            .await
            .unwrap();

        assert_eq!(goal.word().as_str(), "Glacier");
    }

    #[tokio::test]
    async fn exhausted_goal_proposals_keep_their_kind() {
        let mut oracle = MockOracleClient::new();
        oracle
            .expect_propose_goal()
            .times(2)
            .returning(|_| Ok("Rainbow".to_string()));

        let err = ops(MockElementRepo::new(), MockInventoryRepo::new(), oracle, 1)
            .new_goal(&[])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ResolutionError::OracleValidation { attempts: 2, .. }
        ));
    }

    #[tokio::test]
    async fn unauthorized_goal_request_is_not_retried() {
        let mut oracle = MockOracleClient::new();
        oracle
            .expect_propose_goal()
            .times(1)
            .returning(|_| Err(OracleError::status(401, "bad key")));

        let err = ops(MockElementRepo::new(), MockInventoryRepo::new(), oracle, 3)
            .new_goal(&[])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ResolutionError::OracleTransport { attempts: 1, .. }
        ));
    }

    #[tokio::test]
    async fn discovered_variant_reaches_goal() {
        let candles = element("candles", "🕯️");
        let stored = candles.clone();
        let mut elements = MockElementRepo::new();
        elements
            .expect_get()
            .returning(move |_| Ok(Some(stored.clone())));
        let mut inventory = MockInventoryRepo::new();
        inventory.expect_contains().times(1).returning(|_, _| Ok(true));

        let goal = Goal::new(
            ElementName::new("Candle").unwrap(),
            [ElementName::new("Candles").unwrap()],
        );
        let reached = ops(elements, inventory, MockOracleClient::new(), 0)
            .goal_reached(&goal, OwnerId::new(), candles.id)
            .await
            .unwrap();

        assert!(reached);
    }

    #[tokio::test]
    async fn other_element_does_not_reach_goal() {
        let lamp = element("Lamp", "💡");
        let stored = lamp.clone();
        let mut elements = MockElementRepo::new();
        elements
            .expect_get()
            .returning(move |_| Ok(Some(stored.clone())));
        let mut inventory = MockInventoryRepo::new();
        inventory.expect_contains().never();

        let goal = Goal::new(ElementName::new("Candle").unwrap(), []);
        let reached = ops(elements, inventory, MockOracleClient::new(), 0)
            .goal_reached(&goal, OwnerId::new(), lamp.id)
            .await
            .unwrap();

        assert!(!reached);
    }

    #[tokio::test]
    async fn undiscovered_match_does_not_reach_goal() {
        let candle = element("Candle", "🕯️");
        let stored = candle.clone();
        let mut elements = MockElementRepo::new();
        elements
            .expect_get()
            .returning(move |_| Ok(Some(stored.clone())));
        let mut inventory = MockInventoryRepo::new();
        inventory.expect_contains().returning(|_, _| Ok(false));

        let goal = Goal::new(ElementName::new("Candle").unwrap(), []);
        let reached = ops(elements, inventory, MockOracleClient::new(), 0)
            .goal_reached(&goal, OwnerId::new(), candle.id)
            .await
            .unwrap();

        assert!(!reached);
    }
}
