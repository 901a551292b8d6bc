mod edge_loads;

pub use edge_loads::EdgeLoads;

use crate::simulation::config::{Congestion, CongestionCurve};
use crate::simulation::network::{Link, Network};
use crate::simulation::routing::CachedPath;
use crate::simulation::traffic::Trip;

/// Turns the road loads of a slice into trip penalties.
///
/// Penalties depend on the loads of the whole slice. Callers account every trip of a slice
/// in [`EdgeLoads`] first and evaluate penalties afterwards with [`CongestionModel::apply`].
#[derive(Debug, Clone)]
pub struct CongestionModel {
    curve: CongestionCurve,
    major_capacity: f64,
    capacity_per_lane: f64,
    max_penalty: f64,
}

impl CongestionModel {
    pub fn new(config: &Congestion) -> Self {
        CongestionModel {
            curve: config.curve,
            major_capacity: config.major_capacity,
            capacity_per_lane: config.capacity_per_lane,
            max_penalty: config.max_penalty,
        }
    }

    pub fn capacity(&self, link: &Link) -> f64 {
        link.capacity.unwrap_or(link.lanes as f64 * self.capacity_per_lane)
    }

    /// Load dependent part of the penalty of `link`. Non-negative and non-decreasing in `load`.
    pub fn edge_penalty(&self, link: &Link, load: u32) -> f64 {
        let capacity = self.capacity(link);
        let load = load as f64;
        match self.curve {
            CongestionCurve::Linear {
                major_base,
                minor_base,
                per_trip,
            } => {
                let base = if capacity >= self.major_capacity {
                    major_base
                } else {
                    minor_base
                };
                base * (1. + load * per_trip)
            }
            CongestionCurve::Threshold {
                threshold,
                exponent,
                scale,
            } => {
                let excess = (load / capacity - threshold).max(0.);
                scale * excess.powf(exponent)
            }
        }
    }

    /// Penalty of a trip along `path`: for every road the load dependent part, the road's
    /// own delay and the traffic light delay at its start. Capped at the configured maximum.
    pub fn path_congestion_penalty(
        &self,
        network: &Network,
        path: &CachedPath,
        loads: &EdgeLoads,
    ) -> f64 {
        let penalty: f64 = path
            .links
            .iter()
            .map(|id| {
                let link = network.link(*id);
                let light = network.node(link.from).traffic_light_delay.unwrap_or(0.);
                self.edge_penalty(link, loads.load(*id)) + link.delay + light
            })
            .sum();
        penalty.clamp(0., self.max_penalty)
    }

    /// Sets the penalty of every trip. `loads` must contain all trips of their slice.
    pub fn apply(&self, network: &Network, trips: &mut [Trip], loads: &EdgeLoads) {
        for trip in trips {
            trip.congestion_penalty = self.path_congestion_penalty(network, &trip.path, loads);
        }
    }
}
