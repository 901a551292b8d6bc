use crate::simulation::id::Id;
use crate::simulation::network::{Network, Node, Zone};
use crate::simulation::traffic::TimeSlice;

/// Zones vehicles prefer to drive to, given where they start and when.
pub fn preferred_zones(origin_zone: Zone, slice: TimeSlice) -> &'static [Zone] {
    if slice.is_weekend() {
        return &[Zone::Park, Zone::Commercial];
    }
    match slice.hour {
        7..=9 => match origin_zone {
            Zone::Residential => &[Zone::Commercial, Zone::Industrial],
            _ => &[Zone::Residential],
        },
        17..=20 => match origin_zone {
            Zone::Commercial | Zone::Industrial => &[Zone::Residential],
            _ => &[Zone::Commercial],
        },
        _ => &[Zone::Commercial, Zone::Residential, Zone::Park],
    }
}

/// Candidate destinations for vehicles leaving `origin`. Falls back to every other
/// intersection if no intersection lies in a preferred zone.
pub fn vehicle_destinations(network: &Network, origin: Id<Node>, slice: TimeSlice) -> Vec<Id<Node>> {
    let zones = preferred_zones(network.node(origin).zone, slice);
    let preferred: Vec<Id<Node>> = network
        .nodes
        .iter()
        .filter(|n| n.id != origin && zones.contains(&n.zone))
        .map(|n| n.id)
        .collect();

    if preferred.is_empty() {
        other_nodes(network, origin)
    } else {
        preferred
    }
}

pub fn other_nodes(network: &Network, origin: Id<Node>) -> Vec<Id<Node>> {
    network
        .nodes
        .iter()
        .map(|n| n.id)
        .filter(|id| *id != origin)
        .collect()
}
