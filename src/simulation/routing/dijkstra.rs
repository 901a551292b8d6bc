use std::cmp::Ordering;

use keyed_priority_queue::KeyedPriorityQueue;

use crate::simulation::id::Id;
use crate::simulation::network::{Link, Network, Node};

/// Priority of a node in the queue. Ordering is reversed, so that the max-queue pops the
/// smallest distance first.
#[derive(Debug, Clone, Copy)]
pub struct Distance(pub f64);

impl PartialEq for Distance {
    fn eq(&self, other: &Self) -> bool {
        self.0.total_cmp(&other.0).is_eq()
    }
}

impl Eq for Distance {}

impl Ord for Distance {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0).reverse()
    }
}

impl PartialOrd for Distance {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Result of a one-to-all search: distances, number of roads and the last road on the
/// shortest path to every node.
#[derive(Debug, Clone)]
pub struct ShortestPathTree {
    origin: Id<Node>,
    distances: Vec<f64>,
    hops: Vec<u32>,
    predecessors: Vec<Option<Id<Link>>>,
}

impl ShortestPathTree {
    pub fn origin(&self) -> Id<Node> {
        self.origin
    }

    pub fn is_reachable(&self, node: Id<Node>) -> bool {
        self.distances[node.internal()].is_finite()
    }

    pub fn distance(&self, node: Id<Node>) -> Option<f64> {
        let d = self.distances[node.internal()];
        d.is_finite().then_some(d)
    }

    pub fn hops(&self, node: Id<Node>) -> Option<u32> {
        self.is_reachable(node).then(|| self.hops[node.internal()])
    }

    /// Walks the predecessor links back from `destination`. Returns the nodes and links of the
    /// path in travel order, or None if `destination` is not reachable.
    pub fn path_to(
        &self,
        network: &Network,
        destination: Id<Node>,
    ) -> Option<(Vec<Id<Node>>, Vec<Id<Link>>)> {
        if !self.is_reachable(destination) {
            return None;
        }

        let mut nodes = vec![destination];
        let mut links = Vec::new();
        let mut current = destination;
        while let Some(link_id) = self.predecessors[current.internal()] {
            links.push(link_id);
            current = network.link(link_id).from;
            nodes.push(current);
        }
        nodes.reverse();
        links.reverse();
        Some((nodes, links))
    }
}

pub struct Dijkstra {}

impl Dijkstra {
    /// Computes shortest paths by static road weight from `origin` to all nodes.
    pub fn one_to_all(network: &Network, origin: Id<Node>) -> ShortestPathTree {
        let node_count = network.node_count();
        let mut distances = vec![f64::INFINITY; node_count];
        let mut hops = vec![0; node_count];
        let mut predecessors = vec![None; node_count];
        let mut settled = vec![false; node_count];

        let mut queue: KeyedPriorityQueue<Id<Node>, Distance> = KeyedPriorityQueue::new();
        distances[origin.internal()] = 0.;
        queue.push(origin, Distance(0.));

        while let Some((current, current_distance)) = queue.pop() {
            settled[current.internal()] = true;

            for (link, neighbour) in network.neighbors(current) {
                if settled[neighbour.internal()] {
                    continue;
                }
                let candidate = current_distance.0 + link.weight;
                if candidate < distances[neighbour.internal()] {
                    distances[neighbour.internal()] = candidate;
                    hops[neighbour.internal()] = hops[current.internal()] + 1;
                    predecessors[neighbour.internal()] = Some(link.id);
                    // inserts the neighbour or decreases its priority
                    queue.push(neighbour, Distance(candidate));
                }
            }
        }

        ShortestPathTree {
            origin,
            distances,
            hops,
            predecessors,
        }
    }
}
