//! Catalog entity operations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mixit_domain::{
    starter_elements, CanonicalKey, Combination, Element, ElementId, ElementName,
};

use crate::infrastructure::ports::{CombinationRepo, ElementRepo, RepoError};

/// Catalog entity operations.
///
/// The shared, global record of every element and every resolved pair.
pub struct Catalog {
    elements: Arc<dyn ElementRepo>,
    combinations: Arc<dyn CombinationRepo>,
}

impl Catalog {
    pub fn new(elements: Arc<dyn ElementRepo>, combinations: Arc<dyn CombinationRepo>) -> Self {
        Self {
            elements,
            combinations,
        }
    }

    pub async fn get_element(&self, id: ElementId) -> Result<Option<Element>, RepoError> {
        self.elements.get(id).await
    }

    pub async fn find_by_name(&self, name: &ElementName) -> Result<Option<Element>, RepoError> {
        self.elements.find_by_name(name).await
    }

    pub async fn list_elements(&self) -> Result<Vec<Element>, RepoError> {
        self.elements.list_all().await
    }

    pub async fn lookup(&self, key: CanonicalKey) -> Result<Option<Combination>, RepoError> {
        self.combinations.get(key).await
    }

    pub async fn create_element_and_combination(
        &self,
        key: CanonicalKey,
        candidate: &Element,
        created_at: DateTime<Utc>,
    ) -> Result<(Element, Combination), RepoError> {
        self.combinations
            .create_element_and_combination(key, candidate, created_at)
            .await
    }

    pub async fn create_combination(
        &self,
        key: CanonicalKey,
        result_element_id: ElementId,
        created_at: DateTime<Utc>,
    ) -> Result<Combination, RepoError> {
        self.combinations
            .create_combination(key, result_element_id, created_at)
            .await
    }

    /// Stored combinations that yield `element_id`.
    pub async fn recipes_for(&self, element_id: ElementId) -> Result<Vec<Combination>, RepoError> {
        self.combinations.list_producing(element_id).await
    }

    pub async fn combination_count(&self) -> Result<u64, RepoError> {
        self.combinations.count().await
    }

    /// Make sure the starter elements exist. Returns them as stored.
    pub async fn seed_starters(&self, now: DateTime<Utc>) -> Result<Vec<Element>, RepoError> {
        let starters = starter_elements(now).map_err(RepoError::constraint)?;

        let mut stored = Vec::with_capacity(starters.len());
        for starter in starters {
            if self.elements.insert_if_absent(&starter).await? {
                tracing::info!(element = %starter, "Seeded starter element");
            }
            let element = self
                .elements
                .find_by_name(&starter.name)
                .await?
                .ok_or_else(|| RepoError::not_found("Element", starter.name.as_str()))?;
            stored.push(element);
        }
        Ok(stored)
    }
}
