use std::cmp::Ordering;
use std::fmt::{Debug, Formatter};
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

use ahash::{AHashMap, RandomState};

/// Typed index into one of the run's entity tables (nodes, links, streetlights).
///
/// The internal value is the slot of the entity in its owning vector, so lookups are plain
/// indexing. Ids are only meaningful together with the table that created them.
pub struct Id<T> {
    internal: u32,
    _type_marker: PhantomData<T>,
}

impl<T> Id<T> {
    pub(crate) fn new(internal: u32) -> Self {
        Self {
            internal,
            _type_marker: PhantomData,
        }
    }

    pub fn internal(&self) -> usize {
        self.internal as usize
    }
}

/// Mark Id as enabled for the nohash_hasher::NoHashHasher trait
impl<T> nohash_hasher::IsEnabled for Id<T> {}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.internal == other.internal
    }
}

impl<T> Eq for Id<T> {}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        // use write u64 directly, so that we can use NoHashHasher with ids
        state.write_u64(self.internal as u64);
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.internal.cmp(&other.internal)
    }
}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Debug for Id<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Id({})", self.internal)
    }
}

/// Maps external (string) ids to internal ids and back. Owned by whatever owns the entities.
#[derive(Debug)]
pub struct IdStore<T> {
    external: Vec<String>,
    // use ahasher algorithm with fixed random state, to get predictable
    mapping: AHashMap<String, u32>,
    _type_marker: PhantomData<T>,
}

impl<T> Default for IdStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IdStore<T> {
    pub fn new() -> Self {
        Self {
            external: Vec::new(),
            mapping: AHashMap::with_hasher(RandomState::with_seed(42)),
            _type_marker: PhantomData,
        }
    }

    /// Returns the id for `external`, creating it if it does not exist yet. The bool is true
    /// if the id was newly created.
    pub fn create_id(&mut self, external: &str) -> (Id<T>, bool) {
        if let Some(&internal) = self.mapping.get(external) {
            return (Id::new(internal), false);
        }
        let internal = self.external.len() as u32;
        self.external.push(external.to_string());
        self.mapping.insert(external.to_string(), internal);
        (Id::new(internal), true)
    }

    pub fn get(&self, external: &str) -> Option<Id<T>> {
        self.mapping.get(external).map(|&internal| Id::new(internal))
    }

    pub fn external(&self, id: Id<T>) -> &str {
        &self.external[id.internal()]
    }

    pub fn len(&self) -> usize {
        self.external.len()
    }

    pub fn is_empty(&self) -> bool {
        self.external.is_empty()
    }
}
