use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::simulation::config::Simulation;
use crate::simulation::error::{Result, SimError};

/// One simulated hour of one day. Slices order by day first, then by hour, which is the
/// order in which a run processes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TimeSlice {
    pub day: u32,
    pub hour: u32,
}

impl TimeSlice {
    /// Creates a slice inside the configured days and hours.
    pub fn new(day: u32, hour: u32, simulation: &Simulation) -> Result<Self> {
        let days = simulation.start_day..=simulation.end_day.min(simulation.max_day);
        let hours = simulation.start_hour..=simulation.end_hour.min(23);
        if day < 1 || !days.contains(&day) || !hours.contains(&hour) {
            return Err(SimError::InvalidTimeRange { day, hour });
        }
        Ok(TimeSlice { day, hour })
    }

    /// All slices of the configured time range in processing order.
    pub fn all(simulation: &Simulation) -> Result<Vec<TimeSlice>> {
        let mut slices = Vec::new();
        for day in simulation.start_day..=simulation.end_day {
            for hour in simulation.start_hour..=simulation.end_hour {
                slices.push(TimeSlice::new(day, hour, simulation)?);
            }
        }
        Ok(slices)
    }

    /// Days 6 and 7 of every week are weekend days.
    pub fn is_weekend(&self) -> bool {
        matches!(self.day % 7, 6 | 0)
    }
}

impl Display for TimeSlice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "day {} hour {:02}", self.day, self.hour)
    }
}
