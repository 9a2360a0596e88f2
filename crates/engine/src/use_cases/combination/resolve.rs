//! Resolve combination use case.
//!
//! Looks the pair up in the combination store and, on a miss, makes sure
//! exactly one caller asks the oracle while every concurrent caller for the
//! same pair waits for that answer.

use std::sync::Arc;
use std::time::Duration;

use mixit_domain::{normalize, CanonicalKey, Combination, Element, ElementId, OwnerId};
use tracing::{debug, info, warn};

use crate::entities::{Catalog, Inventory};
use crate::infrastructure::config::{EngineConfig, ValidationLimits};
use crate::infrastructure::ports::{ClockPort, OracleClient, OracleError};
use crate::infrastructure::retry::RetryConfig;

use super::error::{ResolutionError, ResolutionSource, ResolvedElement};
use super::in_flight::{InFlightRegistry, Outcome, Registration, Settled};
use super::validate::{OracleResponseValidator, ValidatedResponse};

/// Oracle call policy used while synthesizing a new combination.
#[derive(Debug, Clone)]
pub struct SynthesisSettings {
    pub retry: RetryConfig,
    /// Upper bound for a single oracle call, checked independently of the client.
    pub oracle_timeout: Duration,
    pub limits: ValidationLimits,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            oracle_timeout: Duration::from_secs(30),
            limits: ValidationLimits::default(),
        }
    }
}

impl SynthesisSettings {
    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            retry: config.retry.clone(),
            oracle_timeout: config.oracle.timeout,
            limits: config.validation,
        }
    }
}

/// Resolve a pair of elements for an owner and record the discovery.
pub struct ResolveCombination {
    catalog: Arc<Catalog>,
    inventory: Arc<Inventory>,
    synthesizer: Arc<Synthesizer>,
    in_flight: Arc<InFlightRegistry>,
    clock: Arc<dyn ClockPort>,
}

impl ResolveCombination {
    pub fn new(
        catalog: Arc<Catalog>,
        inventory: Arc<Inventory>,
        oracle: Arc<dyn OracleClient>,
        clock: Arc<dyn ClockPort>,
        settings: SynthesisSettings,
    ) -> Self {
        let synthesizer = Synthesizer {
            catalog: catalog.clone(),
            oracle,
            validator: OracleResponseValidator::new(settings.limits),
            retry: settings.retry,
            oracle_timeout: settings.oracle_timeout,
            clock: clock.clone(),
        };

        Self {
            catalog,
            inventory,
            synthesizer: Arc::new(synthesizer),
            in_flight: Arc::new(InFlightRegistry::new()),
            clock,
        }
    }

    /// Resolve `element_a + element_b` for `owner_id`.
    ///
    /// Argument order does not matter. A stored pair is answered without
    /// calling the oracle. The result is added to the owner's inventory.
    pub async fn execute(
        &self,
        owner_id: OwnerId,
        element_a: ElementId,
        element_b: ElementId,
    ) -> Result<ResolvedElement, ResolutionError> {
        let key = normalize(element_a, element_b);

        let (element, source) = match self.catalog.lookup(key).await? {
            Some(combination) => {
                debug!(key = %key, "Combination cache hit");
                (
                    self.synthesizer.result_of(&combination).await?,
                    ResolutionSource::Cached,
                )
            }
            None => self.resolve_miss(key).await?,
        };

        let newly_discovered = self
            .inventory
            .record(owner_id, element.id, self.clock.now())
            .await?;
        if newly_discovered {
            info!(owner_id = %owner_id, element = %element, "New discovery");
        }
        self.inventory.count_combination(owner_id).await?;

        Ok(ResolvedElement {
            element,
            source,
            newly_discovered,
        })
    }

    /// Number of pairs currently being synthesized.
    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    async fn resolve_miss(
        &self,
        key: CanonicalKey,
    ) -> Result<(Element, ResolutionSource), ResolutionError> {
        let first = self.load_input(key.first()).await?;
        let second = if key.is_self_pair() {
            first.clone()
        } else {
            self.load_input(key.second()).await?
        };

        match self.in_flight.register(key) {
            Registration::Elected(election, waiter) => {
                debug!(key = %key, "Combination cache miss, synthesizing");
                // The synthesis runs detached so an abandoned caller does not
                // cancel it for the others.
                let synthesizer = Arc::clone(&self.synthesizer);
                tokio::spawn(async move {
                    let outcome = synthesizer.run(election.key(), &first, &second).await;
                    election.complete(outcome);
                });

                let settled = waiter.outcome().await?;
                let source = if settled.synthesized {
                    ResolutionSource::Synthesized
                } else {
                    ResolutionSource::Cached
                };
                Ok((settled.element, source))
            }
            Registration::Attached(waiter) => {
                debug!(key = %key, "Attached to in-flight resolution");
                let settled = waiter.outcome().await?;
                Ok((settled.element, ResolutionSource::Joined))
            }
        }
    }

    async fn load_input(&self, id: ElementId) -> Result<Element, ResolutionError> {
        self.catalog
            .get_element(id)
            .await?
            .ok_or(ResolutionError::ElementNotFound(id))
    }
}

// =============================================================================
// Synthesis
// =============================================================================

/// States of one elected resolution. Terminal outcomes are returned, not stored.
enum Step {
    Lookup,
    Synthesizing { attempt: u32 },
    Backoff { attempt: u32 },
    Persisting(ValidatedResponse),
}

/// Runs an elected resolution: oracle call, validation, retries, persistence.
struct Synthesizer {
    catalog: Arc<Catalog>,
    oracle: Arc<dyn OracleClient>,
    validator: OracleResponseValidator,
    retry: RetryConfig,
    oracle_timeout: Duration,
    clock: Arc<dyn ClockPort>,
}

impl Synthesizer {
    async fn run(&self, key: CanonicalKey, first: &Element, second: &Element) -> Outcome {
        let mut step = Step::Lookup;
        loop {
            step = match step {
                // Another writer (or process) may have stored the pair between
                // the caller's lookup and the election.
                Step::Lookup => match self.catalog.lookup(key).await? {
                    Some(combination) => {
                        debug!(key = %key, "Combination stored before synthesis started");
                        return Ok(Settled {
                            element: self.result_of(&combination).await?,
                            synthesized: false,
                        });
                    }
                    None => Step::Synthesizing { attempt: 1 },
                },
                Step::Synthesizing { attempt } => match self.ask_oracle(first, second).await {
                    Ok(response) => Step::Persisting(response),
                    Err(error) if error.is_retryable() && attempt < self.retry.max_attempts() => {
                        warn!(key = %key, attempt, error = %error, "Oracle attempt failed");
                        Step::Backoff { attempt }
                    }
                    Err(error) => {
                        warn!(key = %key, attempt, error = %error, "Giving up on oracle");
                        return Err(ResolutionError::from_oracle(error, attempt));
                    }
                },
                Step::Backoff { attempt } => {
                    let delay = self.retry.delay_for(attempt);
                    debug!(
                        key = %key,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "Retrying oracle after delay"
                    );
                    tokio::time::sleep(delay).await;
                    Step::Synthesizing {
                        attempt: attempt + 1,
                    }
                }
                Step::Persisting(response) => return self.persist(key, response).await,
            };
        }
    }

    async fn ask_oracle(
        &self,
        first: &Element,
        second: &Element,
    ) -> Result<ValidatedResponse, OracleError> {
        let raw = tokio::time::timeout(self.oracle_timeout, self.oracle.synthesize(first, second))
            .await
            .map_err(|_| {
                OracleError::timeout(format!(
                    "no answer within {} ms",
                    self.oracle_timeout.as_millis()
                ))
            })??;

        self.validator.validate(raw)
    }

    async fn persist(&self, key: CanonicalKey, response: ValidatedResponse) -> Outcome {
        let now = self.clock.now();

        let stored = match self.catalog.find_by_name(&response.name).await? {
            Some(existing) => {
                info!(key = %key, element = %existing, "Oracle answer matches an existing element");
                self.catalog
                    .create_combination(key, existing.id, now)
                    .await
                    .map(|_| existing)
            }
            None => {
                let candidate = Element::new(response.name, response.icon, now);
                self.catalog
                    .create_element_and_combination(key, &candidate, now)
                    .await
                    .map(|(element, _)| element)
            }
        };

        match stored {
            Ok(element) => {
                info!(key = %key, element = %element, "Combination stored");
                Ok(Settled {
                    element,
                    synthesized: true,
                })
            }
            Err(e) if e.is_conflict() => {
                info!(key = %key, "Combination was stored by another writer, using theirs");
                let combination = self.catalog.lookup(key).await?.ok_or_else(|| {
                    ResolutionError::internal(format!("conflicting combination {key} not readable"))
                })?;
                Ok(Settled {
                    element: self.result_of(&combination).await?,
                    synthesized: false,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn result_of(&self, combination: &Combination) -> Result<Element, ResolutionError> {
        self.catalog
            .get_element(combination.result_element_id)
            .await?
            .ok_or_else(|| {
                ResolutionError::internal(format!(
                    "combination {} references missing element {}",
                    combination.key, combination.result_element_id
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{TimeZone, Utc};
    use mixit_domain::{ElementIcon, ElementName};

    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::ports::{
        MockCombinationRepo, MockElementRepo, MockInventoryRepo, MockOracleClient,
        RawOracleResponse, RepoError,
    };

    fn element(name: &str, icon: &str) -> Element {
        Element::new(
            ElementName::new(name).unwrap(),
            ElementIcon::new(icon).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        )
    }

    fn known_elements(mut repo: MockElementRepo, known: Vec<Element>) -> MockElementRepo {
        repo.expect_get()
            .returning(move |id| Ok(known.iter().find(|e| e.id == id).cloned()));
        repo
    }

    fn recording_inventory() -> MockInventoryRepo {
        let mut inventory = MockInventoryRepo::new();
        inventory.expect_record().returning(|_| Ok(true));
        inventory.expect_count_combination().returning(|_| Ok(1));
        inventory
    }

    fn build(
        elements: MockElementRepo,
        combinations: MockCombinationRepo,
        inventory: MockInventoryRepo,
        oracle: MockOracleClient,
        max_retries: u32,
    ) -> ResolveCombination {
        let catalog = Arc::new(Catalog::new(Arc::new(elements), Arc::new(combinations)));
        let inventory = Arc::new(Inventory::new(Arc::new(inventory)));
        let clock = Arc::new(FixedClock(Utc::now()));
        let settings = SynthesisSettings {
            retry: RetryConfig::immediate(max_retries),
            oracle_timeout: Duration::from_secs(5),
            limits: ValidationLimits::default(),
        };
        ResolveCombination::new(catalog, inventory, Arc::new(oracle), clock, settings)
    }

    #[tokio::test]
    async fn when_pair_is_stored_returns_it_without_oracle() {
        let water = element("Water", "💧");
        let fire = element("Fire", "🔥");
        let steam = element("Steam", "💨");
        let steam_id = steam.id;

        let elements = known_elements(
            MockElementRepo::new(),
            vec![water.clone(), fire.clone(), steam],
        );
        let mut combinations = MockCombinationRepo::new();
        combinations
            .expect_get()
            .times(1)
            .returning(move |key| Ok(Some(Combination::new(key, steam_id, Utc::now()))));
        let mut oracle = MockOracleClient::new();
        oracle.expect_synthesize().never();

        let use_case = build(elements, combinations, recording_inventory(), oracle, 2);
        let resolved = use_case
            .execute(OwnerId::new(), fire.id, water.id)
            .await
            .unwrap();

        assert_eq!(resolved.element.id, steam_id);
        assert_eq!(resolved.source, ResolutionSource::Cached);
        assert!(resolved.newly_discovered);
    }

    #[tokio::test]
    async fn when_pair_is_new_synthesizes_and_stores_element() {
        let water = element("Water", "💧");
        let fire = element("Fire", "🔥");

        let mut elements =
            known_elements(MockElementRepo::new(), vec![water.clone(), fire.clone()]);
        elements.expect_find_by_name().returning(|_| Ok(None));

        let mut combinations = MockCombinationRepo::new();
        combinations.expect_get().returning(|_| Ok(None));
        combinations
            .expect_create_element_and_combination()
            .times(1)
            .returning(|key, candidate, at| {
                Ok((candidate.clone(), Combination::new(key, candidate.id, at)))
            });
        combinations.expect_create_combination().never();

        let mut oracle = MockOracleClient::new();
        oracle
            .expect_synthesize()
            .times(1)
            .returning(|_, _| Ok(RawOracleResponse::new("Steam", "💨")));

        let use_case = build(elements, combinations, recording_inventory(), oracle, 2);
        let resolved = use_case
            .execute(OwnerId::new(), water.id, fire.id)
            .await
            .unwrap();

        assert_eq!(resolved.element.name.as_str(), "Steam");
        assert_eq!(resolved.element.icon.as_str(), "💨");
        assert_eq!(resolved.source, ResolutionSource::Synthesized);
        assert_eq!(use_case.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn when_oracle_names_existing_element_reuses_it() {
        let water = element("Water", "💧");
        let earth = element("Earth", "🌍");
        let mud = element("Mud", "🟤");
        let mud_id = mud.id;

        let mut elements =
            known_elements(MockElementRepo::new(), vec![water.clone(), earth.clone()]);
        let existing = mud.clone();
        elements
            .expect_find_by_name()
            .returning(move |_| Ok(Some(existing.clone())));

        let mut combinations = MockCombinationRepo::new();
        combinations.expect_get().returning(|_| Ok(None));
        combinations.expect_create_element_and_combination().never();
        combinations
            .expect_create_combination()
            .withf(move |_, id, _| *id == mud_id)
            .times(1)
            .returning(|key, id, at| Ok(Combination::new(key, id, at)));

        let mut oracle = MockOracleClient::new();
        oracle
            .expect_synthesize()
            .returning(|_, _| Ok(RawOracleResponse::new("MUD", "🟫")));

        let use_case = build(elements, combinations, recording_inventory(), oracle, 0);
        let resolved = use_case
            .execute(OwnerId::new(), water.id, earth.id)
            .await
            .unwrap();

        assert_eq!(resolved.element, mud);
    }

    #[tokio::test]
    async fn when_another_writer_wins_returns_their_result() {
        let water = element("Water", "💧");
        let fire = element("Fire", "🔥");
        let fog = element("Fog", "🌫️");
        let fog_id = fog.id;

        let mut elements = known_elements(
            MockElementRepo::new(),
            vec![water.clone(), fire.clone(), fog.clone()],
        );
        elements.expect_find_by_name().returning(|_| Ok(None));

        let lookups = Arc::new(AtomicUsize::new(0));
        let mut combinations = MockCombinationRepo::new();
        combinations.expect_get().returning(move |key| {
            // Caller lookup and double-check miss; the re-read after the conflict hits.
            if lookups.fetch_add(1, Ordering::SeqCst) < 2 {
                Ok(None)
            } else {
                Ok(Some(Combination::new(key, fog_id, Utc::now())))
            }
        });
        combinations
            .expect_create_element_and_combination()
            .times(1)
            .returning(|key, _, _| Err(RepoError::conflict("Combination", key)));

        let mut oracle = MockOracleClient::new();
        oracle
            .expect_synthesize()
            .times(1)
            .returning(|_, _| Ok(RawOracleResponse::new("Steam", "💨")));

        let use_case = build(elements, combinations, recording_inventory(), oracle, 0);
        let resolved = use_case
            .execute(OwnerId::new(), water.id, fire.id)
            .await
            .unwrap();

        assert_eq!(resolved.element, fog);
        assert_eq!(resolved.source, ResolutionSource::Cached);
    }

    #[tokio::test]
    async fn transient_failures_are_retried_until_success() {
        let water = element("Water", "💧");
        let fire = element("Fire", "🔥");

        let mut elements =
            known_elements(MockElementRepo::new(), vec![water.clone(), fire.clone()]);
        elements.expect_find_by_name().returning(|_| Ok(None));
        let mut combinations = MockCombinationRepo::new();
        combinations.expect_get().returning(|_| Ok(None));
        combinations
            .expect_create_element_and_combination()
            .returning(|key, candidate, at| {
                Ok((candidate.clone(), Combination::new(key, candidate.id, at)))
            });

        let calls = Arc::new(AtomicUsize::new(0));
        let mut oracle = MockOracleClient::new();
        oracle.expect_synthesize().times(3).returning(move |_, _| {
            match calls.fetch_add(1, Ordering::SeqCst) {
                0 => Err(OracleError::status(503, "overloaded")),
                1 => Ok(RawOracleResponse::default()),
                _ => Ok(RawOracleResponse::new("Steam", "💨")),
            }
        });

        let use_case = build(elements, combinations, recording_inventory(), oracle, 2);
        let resolved = use_case
            .execute(OwnerId::new(), water.id, fire.id)
            .await
            .unwrap();

        assert_eq!(resolved.element.name.as_str(), "Steam");
    }

    #[tokio::test]
    async fn exhausted_validation_failures_are_reported_as_validation() {
        let water = element("Water", "💧");
        let fire = element("Fire", "🔥");

        let elements = known_elements(MockElementRepo::new(), vec![water.clone(), fire.clone()]);
        let mut combinations = MockCombinationRepo::new();
        combinations.expect_get().returning(|_| Ok(None));
        combinations.expect_create_element_and_combination().never();
        combinations.expect_create_combination().never();
        let mut inventory = MockInventoryRepo::new();
        inventory.expect_record().never();

        let mut oracle = MockOracleClient::new();
        oracle
            .expect_synthesize()
            .times(3)
            .returning(|_, _| Ok(RawOracleResponse::new("", "💨")));

        let use_case = build(elements, combinations, inventory, oracle, 2);
        let err = use_case
            .execute(OwnerId::new(), water.id, fire.id)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ResolutionError::OracleValidation { attempts: 3, .. }
        ));
        assert_eq!(use_case.in_flight_count(), 0);
    }

    #[tokio::test]
    async fn unauthorized_oracle_is_not_retried() {
        let water = element("Water", "💧");
        let fire = element("Fire", "🔥");

        let elements = known_elements(MockElementRepo::new(), vec![water.clone(), fire.clone()]);
        let mut combinations = MockCombinationRepo::new();
        combinations.expect_get().returning(|_| Ok(None));

        let mut oracle = MockOracleClient::new();
        oracle
            .expect_synthesize()
            .times(1)
            .returning(|_, _| Err(OracleError::status(401, "bad key")));

        let use_case = build(elements, combinations, MockInventoryRepo::new(), oracle, 3);
        let err = use_case
            .execute(OwnerId::new(), water.id, fire.id)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ResolutionError::OracleTransport { attempts: 1, .. }
        ));
    }

    #[tokio::test]
    async fn when_input_element_unknown_returns_not_found() {
        let water = element("Water", "💧");
        let ghost = ElementId::new();

        let elements = known_elements(MockElementRepo::new(), vec![water.clone()]);
        let mut combinations = MockCombinationRepo::new();
        combinations.expect_get().returning(|_| Ok(None));
        let mut oracle = MockOracleClient::new();
        oracle.expect_synthesize().never();

        let use_case = build(elements, combinations, MockInventoryRepo::new(), oracle, 2);
        let err = use_case
            .execute(OwnerId::new(), water.id, ghost)
            .await
            .unwrap_err();

        assert_eq!(err, ResolutionError::ElementNotFound(ghost));
    }

    #[tokio::test]
    async fn when_store_is_down_fails_without_oracle() {
        let mut combinations = MockCombinationRepo::new();
        combinations.expect_get().returning(|_| {
            Err(RepoError::database(
                "get_combination",
                "unable to open database file",
            ))
        });
        let mut oracle = MockOracleClient::new();
        oracle.expect_synthesize().never();

        let use_case = build(
            MockElementRepo::new(),
            combinations,
            MockInventoryRepo::new(),
            oracle,
            2,
        );
        let err = use_case
            .execute(OwnerId::new(), ElementId::new(), ElementId::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ResolutionError::StoreUnavailable(_)));
    }
}
