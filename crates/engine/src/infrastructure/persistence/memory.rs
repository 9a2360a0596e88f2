//! In-process arena store.
//!
//! Elements live in a single vector and are referenced by index from the
//! name, combination and inventory maps. Useful for tests and for embedding
//! the engine without a database file.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mixit_domain::{
    CanonicalKey, Combination, Discovery, Element, ElementId, ElementName, OwnerId,
};

use crate::infrastructure::ports::{CombinationRepo, ElementRepo, InventoryRepo, RepoError};

#[derive(Default)]
struct Arena {
    elements: Vec<Element>,
    by_id: HashMap<ElementId, usize>,
    by_name: HashMap<String, usize>,
    combinations: HashMap<CanonicalKey, Combination>,
    combination_order: Vec<CanonicalKey>,
    inventories: HashMap<OwnerId, Vec<usize>>,
    discovered: HashSet<(OwnerId, ElementId)>,
    combinations_made: HashMap<OwnerId, u64>,
}

impl Arena {
    fn element_index(&self, element: &Element) -> Option<usize> {
        self.by_name.get(&element.normalized_name()).copied()
    }

    /// Returns the index of the stored element and whether it was inserted.
    fn insert_element(&mut self, element: &Element) -> (usize, bool) {
        if let Some(index) = self.element_index(element) {
            return (index, false);
        }
        let index = self.elements.len();
        self.elements.push(element.clone());
        self.by_id.insert(element.id, index);
        self.by_name.insert(element.normalized_name(), index);
        (index, true)
    }

    fn insert_combination(&mut self, combination: Combination) {
        self.combination_order.push(combination.key);
        self.combinations.insert(combination.key, combination);
    }
}

/// Thread-safe in-memory implementation of all three storage ports.
#[derive(Default)]
pub struct MemoryStore {
    arena: Mutex<Arena>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent operation fail with a database error until reset.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn lock(&self, operation: &'static str) -> Result<MutexGuard<'_, Arena>, RepoError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepoError::database(operation, "store unavailable"));
        }
        self.arena
            .lock()
            .map_err(|_| RepoError::database(operation, "store lock poisoned"))
    }
}

#[async_trait]
impl ElementRepo for MemoryStore {
    async fn get(&self, id: ElementId) -> Result<Option<Element>, RepoError> {
        let arena = self.lock("get_element")?;
        Ok(arena.by_id.get(&id).map(|&i| arena.elements[i].clone()))
    }

    async fn find_by_name(&self, name: &ElementName) -> Result<Option<Element>, RepoError> {
        let arena = self.lock("find_element_by_name")?;
        Ok(arena
            .by_name
            .get(&name.normalized())
            .map(|&i| arena.elements[i].clone()))
    }

    async fn list_all(&self) -> Result<Vec<Element>, RepoError> {
        Ok(self.lock("list_elements")?.elements.clone())
    }

    async fn insert_if_absent(&self, element: &Element) -> Result<bool, RepoError> {
        let mut arena = self.lock("insert_element")?;
        Ok(arena.insert_element(element).1)
    }
}

#[async_trait]
impl CombinationRepo for MemoryStore {
    async fn get(&self, key: CanonicalKey) -> Result<Option<Combination>, RepoError> {
        Ok(self.lock("get_combination")?.combinations.get(&key).cloned())
    }

    async fn create_element_and_combination(
        &self,
        key: CanonicalKey,
        candidate: &Element,
        created_at: DateTime<Utc>,
    ) -> Result<(Element, Combination), RepoError> {
        let mut arena = self.lock("create_element_and_combination")?;
        if arena.combinations.contains_key(&key) {
            return Err(RepoError::conflict("Combination", key));
        }

        let (index, _) = arena.insert_element(candidate);
        let element = arena.elements[index].clone();
        let combination = Combination::new(key, element.id, created_at);
        arena.insert_combination(combination.clone());
        Ok((element, combination))
    }

    async fn create_combination(
        &self,
        key: CanonicalKey,
        result_element_id: ElementId,
        created_at: DateTime<Utc>,
    ) -> Result<Combination, RepoError> {
        let mut arena = self.lock("insert_combination")?;
        if arena.combinations.contains_key(&key) {
            return Err(RepoError::conflict("Combination", key));
        }
        if !arena.by_id.contains_key(&result_element_id) {
            return Err(RepoError::not_found("Element", result_element_id));
        }

        let combination = Combination::new(key, result_element_id, created_at);
        arena.insert_combination(combination.clone());
        Ok(combination)
    }

    async fn list_producing(&self, element_id: ElementId) -> Result<Vec<Combination>, RepoError> {
        let arena = self.lock("list_producing")?;
        Ok(arena
            .combination_order
            .iter()
            .filter_map(|key| arena.combinations.get(key))
            .filter(|c| c.result_element_id == element_id)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<u64, RepoError> {
        Ok(self.lock("count_combinations")?.combinations.len() as u64)
    }
}

#[async_trait]
impl InventoryRepo for MemoryStore {
    async fn record(&self, discovery: &Discovery) -> Result<bool, RepoError> {
        let mut arena = self.lock("record_discovery")?;
        let Some(&index) = arena.by_id.get(&discovery.element_id) else {
            return Err(RepoError::not_found("Element", discovery.element_id));
        };
        if !arena
            .discovered
            .insert((discovery.owner_id, discovery.element_id))
        {
            return Ok(false);
        }
        arena
            .inventories
            .entry(discovery.owner_id)
            .or_default()
            .push(index);
        Ok(true)
    }

    async fn list_elements(&self, owner_id: OwnerId) -> Result<Vec<Element>, RepoError> {
        let arena = self.lock("list_inventory")?;
        Ok(arena
            .inventories
            .get(&owner_id)
            .map(|indices| indices.iter().map(|&i| arena.elements[i].clone()).collect())
            .unwrap_or_default())
    }

    async fn contains(&self, owner_id: OwnerId, element_id: ElementId) -> Result<bool, RepoError> {
        Ok(self
            .lock("contains_discovery")?
            .discovered
            .contains(&(owner_id, element_id)))
    }

    async fn count_combination(&self, owner_id: OwnerId) -> Result<u64, RepoError> {
        let mut arena = self.lock("count_combination")?;
        let total = arena.combinations_made.entry(owner_id).or_default();
        *total += 1;
        Ok(*total)
    }

    async fn combinations_made(&self, owner_id: OwnerId) -> Result<u64, RepoError> {
        Ok(self
            .lock("combinations_made")?
            .combinations_made
            .get(&owner_id)
            .copied()
            .unwrap_or(0))
    }
}
