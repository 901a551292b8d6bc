use std::collections::BTreeMap;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::simulation::traffic::TimeSlice;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub streetlight_id: String,
    pub from: String,
    pub to: String,
    pub day: u32,
    pub hour: u32,
    pub raw_voltage: f64,
    pub smoothed_voltage: f64,
}

impl ScheduleEntry {
    pub fn slice(&self) -> TimeSlice {
        TimeSlice {
            day: self.day,
            hour: self.hour,
        }
    }
}

/// Nested `from -> to -> hour -> voltage` view of a schedule.
pub type RoadSchedule = BTreeMap<String, BTreeMap<String, BTreeMap<u32, f64>>>;

/// The final voltage schedule. Entries are grouped by streetlight and ordered by slice
/// within each streetlight.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VoltageSchedule {
    entries: Vec<ScheduleEntry>,
}

impl VoltageSchedule {
    pub(crate) fn new(entries: Vec<ScheduleEntry>) -> Self {
        VoltageSchedule { entries }
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, streetlight_id: &str, slice: TimeSlice) -> Option<&ScheduleEntry> {
        self.entries
            .iter()
            .find(|e| e.streetlight_id == streetlight_id && e.slice() == slice)
    }

    /// Smoothed voltage per road and hour of the day, averaged over the road's streetlights
    /// and all simulated days.
    pub fn by_road(&self) -> RoadSchedule {
        let groups = self
            .entries
            .iter()
            .into_group_map_by(|e| (e.from.as_str(), e.to.as_str(), e.hour));

        let mut result = RoadSchedule::new();
        for ((from, to, hour), entries) in groups {
            let mean = entries.iter().map(|e| e.smoothed_voltage).sum::<f64>() / entries.len() as f64;
            result
                .entry(from.to_string())
                .or_default()
                .entry(to.to_string())
                .or_default()
                .insert(hour, mean);
        }
        result
    }
}
