use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::simulation::network::Network;
use crate::simulation::traffic::SliceTrips;

pub const TRAFFIC_DATA_JSON: &str = "traffic_data.json";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourCounts {
    pub vehicle: u64,
    pub pedestrian: u64,
}

/// Trips per origin intersection and hour of day, summed over all simulated days.
/// Serializes as `{intersection: {hour: {vehicle, pedestrian}}}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TrafficCounts {
    per_intersection: BTreeMap<String, BTreeMap<u32, HourCounts>>,
}

impl TrafficCounts {
    pub fn add_slice(&mut self, network: &Network, slice_trips: &SliceTrips) {
        let hour = slice_trips.slice.hour;
        for trip in &slice_trips.trips {
            let counts = self
                .per_intersection
                .entry(network.node_name(trip.origin).to_string())
                .or_default()
                .entry(hour)
                .or_default();
            if trip.is_vehicle() {
                counts.vehicle += 1;
            } else {
                counts.pedestrian += 1;
            }
        }
    }

    pub fn get(&self, intersection: &str, hour: u32) -> HourCounts {
        self.per_intersection
            .get(intersection)
            .and_then(|hours| hours.get(&hour))
            .copied()
            .unwrap_or_default()
    }

    pub fn total(&self) -> HourCounts {
        self.per_intersection
            .values()
            .flat_map(|hours| hours.values())
            .fold(HourCounts::default(), |acc, c| HourCounts {
                vehicle: acc.vehicle + c.vehicle,
                pedestrian: acc.pedestrian + c.pedestrian,
            })
    }
}
