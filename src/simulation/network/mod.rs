pub mod streetlight;

use std::fmt::{Display, Formatter};

use ahash::{AHashMap, RandomState};
use serde::{Deserialize, Serialize};

use crate::simulation::error::{Result, SimError};
use crate::simulation::id::{Id, IdStore};

pub use streetlight::{Streetlight, Streetlights};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Zone {
    #[default]
    Residential,
    Commercial,
    Industrial,
    Park,
}

impl Zone {
    pub const ALL: [Zone; 4] = [
        Zone::Residential,
        Zone::Commercial,
        Zone::Industrial,
        Zone::Park,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Zone::Residential => "residential",
            Zone::Commercial => "commercial",
            Zone::Industrial => "industrial",
            Zone::Park => "park",
        }
    }
}

impl Display for Zone {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct Node {
    pub id: Id<Node>,
    pub zone: Zone,
    /// Delay in seconds added for every trip leaving this intersection. None if the
    /// intersection has no traffic light.
    pub traffic_light_delay: Option<f64>,
    pub in_links: Vec<Id<Link>>,
    pub out_links: Vec<Id<Link>>,
}

#[derive(Debug)]
pub struct Link {
    pub id: Id<Link>,
    pub from: Id<Node>,
    pub to: Id<Node>,
    pub length: f64,
    pub lanes: u32,
    /// Static travel weight used for shortest paths.
    pub weight: f64,
    /// Explicit capacity in vehicles per hour. If None, capacity is derived from the lane count.
    pub capacity: Option<f64>,
    pub delay: f64,
    /// Road class of the generator, e.g. major or minor. Only used for reporting.
    pub road_type: Option<String>,
}

/// Attributes of a road as handed over by the graph input.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkAttributes {
    pub length: f64,
    pub lanes: u32,
    pub weight: f64,
    pub capacity: Option<f64>,
    pub delay: f64,
    pub road_type: Option<String>,
}

impl LinkAttributes {
    pub fn new(length: f64, lanes: u32, weight: f64) -> Self {
        LinkAttributes {
            length,
            lanes,
            weight,
            capacity: None,
            delay: 0.,
            road_type: None,
        }
    }
}

/// The static road graph. It is built once from the input and never mutated while a
/// simulation runs.
#[derive(Debug)]
pub struct Network {
    pub node_ids: IdStore<Node>,
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    link_by_endpoints: AHashMap<(Id<Node>, Id<Node>), Id<Link>>,
}

impl Default for Network {
    fn default() -> Self {
        Network::new()
    }
}

impl Network {
    pub fn new() -> Self {
        Network {
            node_ids: IdStore::new(),
            nodes: Vec::new(),
            links: Vec::new(),
            link_by_endpoints: AHashMap::with_hasher(RandomState::with_seed(42)),
        }
    }

    pub fn add_node(
        &mut self,
        external: &str,
        zone: Zone,
        traffic_light_delay: Option<f64>,
    ) -> Result<Id<Node>> {
        if let Some(delay) = traffic_light_delay {
            if !delay.is_finite() || delay < 0. {
                return Err(SimError::InvalidGraph(format!(
                    "Node {external} has an invalid traffic light delay {delay}"
                )));
            }
        }
        let (id, created) = self.node_ids.create_id(external);
        if !created {
            return Err(SimError::InvalidGraph(format!(
                "Node {external} exists more than once"
            )));
        }
        self.nodes.push(Node {
            id,
            zone,
            traffic_light_delay,
            in_links: Vec::new(),
            out_links: Vec::new(),
        });
        Ok(id)
    }

    /// Adds a directed road from `from` to `to`. Both intersections must exist already.
    pub fn add_link(&mut self, from: &str, to: &str, attrs: LinkAttributes) -> Result<Id<Link>> {
        let from_id = self.node_id(from)?;
        let to_id = self.node_id(to)?;

        if self.link_by_endpoints.contains_key(&(from_id, to_id)) {
            return Err(SimError::InvalidGraph(format!(
                "Road {from} -> {to} exists more than once"
            )));
        }
        if !attrs.weight.is_finite() || attrs.weight < 0. {
            return Err(SimError::InvalidGraph(format!(
                "Road {from} -> {to} has an invalid weight {}",
                attrs.weight
            )));
        }
        let valid = |v: f64| v.is_finite() && v >= 0.;
        if !valid(attrs.length) || !valid(attrs.delay) {
            return Err(SimError::InvalidGraph(format!(
                "Road {from} -> {to} has an invalid length or delay"
            )));
        }
        if attrs.lanes == 0 {
            return Err(SimError::InvalidGraph(format!(
                "Road {from} -> {to} has no lanes"
            )));
        }

        // roads are identified by their endpoints; the id is the slot in `links`
        let id = Id::new(self.links.len() as u32);
        // wire up in and out links and push link to the links vec
        self.nodes[from_id.internal()].out_links.push(id);
        self.nodes[to_id.internal()].in_links.push(id);
        self.link_by_endpoints.insert((from_id, to_id), id);
        self.links.push(Link {
            id,
            from: from_id,
            to: to_id,
            length: attrs.length,
            lanes: attrs.lanes,
            weight: attrs.weight,
            capacity: attrs.capacity,
            delay: attrs.delay,
            road_type: attrs.road_type,
        });
        Ok(id)
    }

    fn node_id(&self, external: &str) -> Result<Id<Node>> {
        self.node_ids.get(external).ok_or_else(|| {
            SimError::InvalidGraph(format!("Road references unknown intersection {external}"))
        })
    }

    pub fn node(&self, id: Id<Node>) -> &Node {
        &self.nodes[id.internal()]
    }

    pub fn link(&self, id: Id<Link>) -> &Link {
        &self.links[id.internal()]
    }

    pub fn find_node(&self, external: &str) -> Option<Id<Node>> {
        self.node_ids.get(external)
    }

    pub fn node_name(&self, id: Id<Node>) -> &str {
        self.node_ids.external(id)
    }

    pub fn link_between(&self, from: Id<Node>, to: Id<Node>) -> Option<&Link> {
        self.link_by_endpoints
            .get(&(from, to))
            .map(|id| self.link(*id))
    }

    /// Outgoing roads of `node` paired with the intersection they lead to.
    pub fn neighbors(&self, node: Id<Node>) -> impl Iterator<Item = (&Link, Id<Node>)> + '_ {
        self.node(node).out_links.iter().map(move |id| {
            let link = self.link(*id);
            (link, link.to)
        })
    }

    pub fn weight(&self, link: Id<Link>) -> f64 {
        self.link(link).weight
    }

    pub fn nodes_in_zone(&self, zone: Zone) -> Vec<Id<Node>> {
        self.nodes
            .iter()
            .filter(|n| n.zone == zone)
            .map(|n| n.id)
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Checks the graph against the configured size bounds. An empty graph is never valid.
    pub fn validate(&self, max_nodes: Option<usize>, max_links: Option<usize>) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(SimError::InvalidGraph("The graph has no intersections".into()));
        }
        if let Some(max) = max_nodes {
            if self.nodes.len() > max {
                return Err(SimError::InvalidGraph(format!(
                    "The graph has {} intersections, at most {max} are allowed",
                    self.nodes.len()
                )));
            }
        }
        if let Some(max) = max_links {
            if self.links.len() > max {
                return Err(SimError::InvalidGraph(format!(
                    "The graph has {} roads, at most {max} are allowed",
                    self.links.len()
                )));
            }
        }
        Ok(())
    }
}
