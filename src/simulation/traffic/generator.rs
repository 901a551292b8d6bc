use std::sync::Arc;

use rand::distr::weighted::WeightedIndex;
use rand::distr::Distribution;
use rand::seq::IndexedRandom;
use rand::Rng;
use tracing::trace;

use crate::simulation::config::Traffic;
use crate::simulation::error::{Result, SimError};
use crate::simulation::id::Id;
use crate::simulation::network::{Network, Node, Zone};
use crate::simulation::routing::PathCache;
use crate::simulation::traffic::demand::simulate_count;
use crate::simulation::traffic::destinations::{other_nodes, vehicle_destinations};
use crate::simulation::traffic::trip::{Trip, TripIdGenerator, TripKind, VehicleType};
use crate::simulation::traffic::TimeSlice;

/// Trips of one slice. Trips without a path are not part of it, only counted.
#[derive(Debug)]
pub struct SliceTrips {
    pub slice: TimeSlice,
    pub trips: Vec<Trip>,
    pub dropped: usize,
}

impl SliceTrips {
    pub fn vehicles(&self) -> usize {
        self.trips.iter().filter(|t| t.is_vehicle()).count()
    }

    pub fn pedestrians(&self) -> usize {
        self.trips.len() - self.vehicles()
    }
}

pub struct TrafficGenerator<'n> {
    network: &'n Network,
    traffic: &'n Traffic,
    intersections_per_hour: usize,
    residential: Vec<Id<Node>>,
    all_nodes: Vec<Id<Node>>,
    vehicle_types: Vec<VehicleType>,
    vehicle_type_index: WeightedIndex<f64>,
}

impl<'n> TrafficGenerator<'n> {
    pub fn new(
        network: &'n Network,
        traffic: &'n Traffic,
        intersections_per_hour: usize,
    ) -> Result<Self> {
        let vehicle_types = traffic
            .vehicle_types
            .iter()
            .map(|t| VehicleType {
                name: Arc::from(t.name.as_str()),
                wheels: t.wheels,
            })
            .collect();
        let vehicle_type_index = WeightedIndex::new(traffic.vehicle_types.iter().map(|t| t.weight))
            .map_err(|e| SimError::InvalidConfig(format!("Invalid vehicle type weights: {e}")))?;

        Ok(TrafficGenerator {
            network,
            traffic,
            intersections_per_hour,
            residential: network.nodes_in_zone(Zone::Residential),
            all_nodes: network.nodes.iter().map(|n| n.id).collect(),
            vehicle_types,
            vehicle_type_index,
        })
    }

    /// Draws the distinct origins of one slice. Most of the time they come from residential
    /// intersections; if there are too few of those, or otherwise, from all intersections.
    pub fn select_origins<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<Id<Node>> {
        let from_residential = rng.random::<f64>() < self.traffic.residential_origin_share;
        let population = if from_residential && self.residential.len() >= self.intersections_per_hour
        {
            &self.residential
        } else {
            &self.all_nodes
        };
        population
            .choose_multiple(rng, self.intersections_per_hour)
            .copied()
            .collect()
    }

    fn vehicle_type<R: Rng + ?Sized>(&self, rng: &mut R) -> VehicleType {
        self.vehicle_types[self.vehicle_type_index.sample(rng)].clone()
    }

    /// Generates all trips of `slice`. Paths come from `cache`; trips whose destination is
    /// unreachable are dropped. Congestion penalties are left at zero.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        slice: TimeSlice,
        rng: &mut R,
        cache: &mut PathCache,
        ids: &mut TripIdGenerator,
    ) -> Result<SliceTrips> {
        let mut result = SliceTrips {
            slice,
            trips: Vec::new(),
            dropped: 0,
        };

        for origin in self.select_origins(rng) {
            let zone = self.network.node(origin).zone;
            let vehicles = simulate_count(
                self.traffic,
                slice,
                zone,
                self.traffic.max_vehicles_per_origin,
                rng,
            )?;
            let pedestrians = simulate_count(
                self.traffic,
                slice,
                zone,
                self.traffic.max_pedestrians_per_origin,
                rng,
            )?;

            if vehicles > 0 {
                let destinations = vehicle_destinations(self.network, origin, slice);
                for _ in 0..vehicles {
                    let Some(&destination) = destinations.choose(rng) else {
                        break;
                    };
                    let kind = TripKind::Vehicle(self.vehicle_type(rng));
                    self.add_trip(&mut result, kind, origin, destination, cache, ids)?;
                }
            }

            if pedestrians > 0 {
                let mut destinations =
                    cache.nearby(self.network, origin, self.traffic.max_pedestrian_hops);
                if destinations.is_empty() {
                    destinations = other_nodes(self.network, origin);
                }
                for _ in 0..pedestrians {
                    let Some(&destination) = destinations.choose(rng) else {
                        break;
                    };
                    self.add_trip(
                        &mut result,
                        TripKind::Pedestrian,
                        origin,
                        destination,
                        cache,
                        ids,
                    )?;
                }
            }
        }
        Ok(result)
    }

    fn add_trip(
        &self,
        result: &mut SliceTrips,
        kind: TripKind,
        origin: Id<Node>,
        destination: Id<Node>,
        cache: &mut PathCache,
        ids: &mut TripIdGenerator,
    ) -> Result<()> {
        match cache.resolve(self.network, origin, destination) {
            Ok(path) => {
                result.trips.push(Trip {
                    id: ids.next_id(&kind),
                    kind,
                    origin,
                    destination,
                    path,
                    slice: result.slice,
                    congestion_penalty: 0.,
                });
                Ok(())
            }
            Err(e) if e.is_unreachable() => {
                trace!("Dropping trip: {e}");
                result.dropped += 1;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}
