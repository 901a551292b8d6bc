use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::simulation::error::{Result, SimError};
use crate::simulation::network::{LinkAttributes, Network, Zone};

/// City graph in node-link JSON, the format the grid generator exports.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct IONetwork {
    #[serde(default)]
    pub directed: Option<bool>,
    pub nodes: Vec<IONode>,
    #[serde(alias = "edges")]
    pub links: Vec<IOLink>,
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct IONode {
    pub id: String,
    #[serde(default)]
    pub zone: Zone,
    #[serde(default)]
    pub traffic_light: Option<bool>,
    #[serde(default)]
    pub traffic_light_delay: Option<f64>,
}

#[derive(Debug, Deserialize, Serialize, PartialEq, Default, Clone)]
pub struct IOLink {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub weight: Option<f64>,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(default)]
    pub length: Option<f64>,
    #[serde(default)]
    pub lanes: Option<u32>,
    #[serde(default)]
    pub capacity: Option<f64>,
    #[serde(default)]
    pub delay: Option<f64>,
    #[serde(default)]
    pub road_type: Option<String>,
}

impl IONode {
    fn traffic_light_delay(&self) -> Option<f64> {
        if self.traffic_light == Some(false) {
            return None;
        }
        self.traffic_light_delay.filter(|d| *d > 0.)
    }
}

impl IOLink {
    fn attributes(&self) -> Result<LinkAttributes> {
        let delay = self.delay.unwrap_or(0.);
        let length = self.length.or(self.distance);
        let weight = match (self.weight, length) {
            (Some(w), _) => w,
            (None, Some(l)) => l + delay,
            (None, None) => {
                return Err(SimError::InvalidGraph(format!(
                    "Road {} -> {} has neither a weight nor a length",
                    self.source, self.target
                )))
            }
        };
        Ok(LinkAttributes {
            length: length.unwrap_or(weight),
            lanes: self.lanes.unwrap_or(1),
            weight,
            capacity: self.capacity,
            delay,
            road_type: self.road_type.clone(),
        })
    }
}

impl IONetwork {
    pub fn from_file(file_path: &Path) -> Result<Self> {
        info!("Loading city graph from {file_path:?}");
        let reader = BufReader::new(File::open(file_path)?);
        let io_network: IONetwork = serde_json::from_reader(reader)?;
        Ok(io_network)
    }

    /// Builds the network. Undirected input graphs get one road per direction.
    pub fn into_network(self) -> Result<Network> {
        let mut network = Network::new();
        for node in &self.nodes {
            network.add_node(&node.id, node.zone, node.traffic_light_delay())?;
        }

        let undirected = self.directed == Some(false);
        for link in &self.links {
            let attrs = link.attributes()?;
            if undirected {
                network.add_link(&link.target, &link.source, attrs.clone())?;
            }
            network.add_link(&link.source, &link.target, attrs)?;
        }
        Ok(network)
    }
}

impl Network {
    pub fn from_file(file_path: &Path) -> Result<Self> {
        IONetwork::from_file(file_path)?.into_network()
    }
}
