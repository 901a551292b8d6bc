use std::sync::Arc;

use crate::simulation::id::Id;
use crate::simulation::network::Node;
use crate::simulation::routing::CachedPath;
use crate::simulation::traffic::TimeSlice;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleType {
    pub name: Arc<str>,
    pub wheels: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TripKind {
    Vehicle(VehicleType),
    Pedestrian,
}

impl TripKind {
    pub fn id_prefix(&self) -> &'static str {
        match self {
            TripKind::Vehicle(_) => "veh",
            TripKind::Pedestrian => "ped",
        }
    }
}

/// One simulated vehicle or pedestrian. Trips live for one slice; they are logged and then
/// dropped.
#[derive(Debug, Clone)]
pub struct Trip {
    pub id: String,
    pub kind: TripKind,
    pub origin: Id<Node>,
    pub destination: Id<Node>,
    pub path: Arc<CachedPath>,
    pub slice: TimeSlice,
    /// Filled in by the congestion model once all trips of the slice are known.
    pub congestion_penalty: f64,
}

impl Trip {
    pub fn is_vehicle(&self) -> bool {
        matches!(self.kind, TripKind::Vehicle(_))
    }

    pub fn type_name(&self) -> &str {
        match &self.kind {
            TripKind::Vehicle(vehicle_type) => vehicle_type.name.as_ref(),
            TripKind::Pedestrian => "pedestrian",
        }
    }

    /// Number of wheels, 0 for pedestrians.
    pub fn weight(&self) -> u32 {
        match &self.kind {
            TripKind::Vehicle(vehicle_type) => vehicle_type.wheels,
            TripKind::Pedestrian => 0,
        }
    }
}

/// Hands out trip ids. Vehicles and pedestrians share one counter per run.
#[derive(Debug, Default)]
pub struct TripIdGenerator {
    issued: u64,
}

impl TripIdGenerator {
    pub fn next_id(&mut self, kind: &TripKind) -> String {
        self.issued += 1;
        format!("{}_{:05}", kind.id_prefix(), self.issued)
    }

    pub fn issued(&self) -> u64 {
        self.issued
    }
}
