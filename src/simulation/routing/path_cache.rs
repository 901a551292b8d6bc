use std::sync::Arc;

use ahash::{AHashMap, RandomState};
use nohash_hasher::IntMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::simulation::error::{Result, SimError};
use crate::simulation::id::Id;
use crate::simulation::network::{Link, Network, Node};
use crate::simulation::routing::dijkstra::{Dijkstra, ShortestPathTree};

/// One shortest path between two intersections. Paths are handed out as `Arc`, so every
/// lookup of the same pair yields the same allocation.
#[derive(Debug, PartialEq)]
pub struct CachedPath {
    pub nodes: Vec<Id<Node>>,
    pub links: Vec<Id<Link>>,
    /// Sum of static road weights along the path.
    pub weight: f64,
}

impl CachedPath {
    pub fn origin(&self) -> Id<Node> {
        self.nodes[0]
    }

    pub fn destination(&self) -> Id<Node> {
        self.nodes[self.nodes.len() - 1]
    }

    /// Renders the path with external node names, e.g. `A1→A2→B2`.
    pub fn format(&self, network: &Network) -> String {
        self.nodes
            .iter()
            .map(|n| network.node_name(*n))
            .collect::<Vec<_>>()
            .join("→")
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Number of one-to-all searches. At most one per origin.
    pub searches: u64,
    pub unreachable: u64,
}

/// Memoized shortest paths for one pipeline run.
///
/// A miss triggers at most one Dijkstra search per origin; the resulting tree is kept, so
/// later misses from the same origin only walk predecessor links. Unreachable pairs are
/// remembered as well. Since the network does not change during a run, entries never
/// expire and the cache is shared by all time slices.
#[derive(Debug)]
pub struct PathCache {
    trees: IntMap<Id<Node>, ShortestPathTree>,
    paths: AHashMap<(Id<Node>, Id<Node>), Option<Arc<CachedPath>>>,
    stats: CacheStats,
}

impl Default for PathCache {
    fn default() -> Self {
        PathCache::new()
    }
}

impl PathCache {
    pub fn new() -> Self {
        PathCache {
            trees: IntMap::default(),
            paths: AHashMap::with_hasher(RandomState::with_seed(42)),
            stats: CacheStats::default(),
        }
    }

    /// Returns the shortest path from `origin` to `destination`. Fails with
    /// [`SimError::Unreachable`] if there is none.
    pub fn resolve(
        &mut self,
        network: &Network,
        origin: Id<Node>,
        destination: Id<Node>,
    ) -> Result<Arc<CachedPath>> {
        let entry = if let Some(entry) = self.paths.get(&(origin, destination)) {
            self.stats.hits += 1;
            entry.clone()
        } else {
            self.stats.misses += 1;
            let entry = self.compute(network, origin, destination);
            self.paths.insert((origin, destination), entry.clone());
            entry
        };

        entry.ok_or_else(|| {
            self.stats.unreachable += 1;
            SimError::Unreachable {
                from: network.node_name(origin).to_string(),
                to: network.node_name(destination).to_string(),
            }
        })
    }

    fn compute(
        &mut self,
        network: &Network,
        origin: Id<Node>,
        destination: Id<Node>,
    ) -> Option<Arc<CachedPath>> {
        let tree = self.tree(network, origin);
        let weight = tree.distance(destination)?;
        let (nodes, links) = tree.path_to(network, destination)?;
        Some(Arc::new(CachedPath {
            nodes,
            links,
            weight,
        }))
    }

    /// The shortest path tree rooted at `origin`, searched on first use.
    pub fn tree(&mut self, network: &Network, origin: Id<Node>) -> &ShortestPathTree {
        let stats = &mut self.stats;
        self.trees.entry(origin).or_insert_with(|| {
            stats.searches += 1;
            debug!("Searching shortest paths from {}", network.node_name(origin));
            Dijkstra::one_to_all(network, origin)
        })
    }

    /// Reachable intersections other than `origin` whose shortest path from `origin` uses at
    /// most `max_hops` roads.
    pub fn nearby(&mut self, network: &Network, origin: Id<Node>, max_hops: u32) -> Vec<Id<Node>> {
        let tree = self.tree(network, origin);
        network
            .nodes
            .iter()
            .map(|n| n.id)
            .filter(|id| *id != origin)
            .filter(|id| tree.hops(*id).is_some_and(|h| h <= max_hops))
            .collect()
    }

    /// Runs the one-to-all search for every intersection up front.
    pub fn precompute_all(&mut self, network: &Network) {
        info!(
            "Precomputing shortest paths from {} intersections",
            network.node_count()
        );
        for node in &network.nodes {
            self.tree(network, node.id);
        }
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
