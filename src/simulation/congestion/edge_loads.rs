use crate::simulation::id::Id;
use crate::simulation::network::{Link, Network};
use crate::simulation::routing::CachedPath;
use crate::simulation::traffic::TimeSlice;

/// Number of trips using each road during one slice.
#[derive(Debug, Clone)]
pub struct EdgeLoads {
    slice: Option<TimeSlice>,
    loads: Vec<u32>,
    trips: usize,
}

impl EdgeLoads {
    pub fn new(network: &Network) -> Self {
        EdgeLoads {
            slice: None,
            loads: vec![0; network.link_count()],
            trips: 0,
        }
    }

    /// Clears all counters and starts accounting for `slice`.
    pub fn reset(&mut self, slice: TimeSlice) {
        self.loads.fill(0);
        self.trips = 0;
        self.slice = Some(slice);
    }

    pub fn slice(&self) -> Option<TimeSlice> {
        self.slice
    }

    /// Counts one trip on every road of `path`.
    pub fn add_path(&mut self, path: &CachedPath) {
        for link in &path.links {
            self.loads[link.internal()] += 1;
        }
        self.trips += 1;
    }

    pub fn load(&self, link: Id<Link>) -> u32 {
        self.loads[link.internal()]
    }

    /// Number of trips accounted for in the current slice.
    pub fn trips(&self) -> usize {
        self.trips
    }

    /// Sum of all road loads, i.e. the number of road traversals in the current slice.
    pub fn total(&self) -> u64 {
        self.loads.iter().map(|l| *l as u64).sum()
    }

    pub fn max(&self) -> u32 {
        self.loads.iter().copied().max().unwrap_or(0)
    }
}
