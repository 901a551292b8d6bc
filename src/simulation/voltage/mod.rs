pub mod schedule;
pub mod smoothing;

pub use schedule::{ScheduleEntry, VoltageSchedule};

use tracing::info;

use crate::simulation::config::{Smoothing, Voltage};
use crate::simulation::congestion::EdgeLoads;
use crate::simulation::error::{Result, SimError};
use crate::simulation::network::{Network, Streetlights};
use crate::simulation::traffic::TimeSlice;

/// Builds the voltage schedule of a run. Raw voltages are recorded slice by slice from the
/// road loads; smoothing runs once all slices are known.
#[derive(Debug)]
pub struct VoltageOptimizer {
    min_voltage: f64,
    max_voltage: f64,
    saturation_load: f64,
    smoothing: Smoothing,
    slices: Vec<TimeSlice>,
    /// Raw voltages per streetlight, in slice order.
    raw: Vec<Vec<f64>>,
}

impl VoltageOptimizer {
    pub fn new(config: &Voltage, streetlights: &Streetlights) -> Self {
        VoltageOptimizer {
            min_voltage: config.min_voltage,
            max_voltage: config.max_voltage,
            saturation_load: config.saturation_load,
            smoothing: config.smoothing,
            slices: Vec::new(),
            raw: vec![Vec::new(); streetlights.len()],
        }
    }

    /// Maps the load of a road to a voltage. No load gives the floor voltage, loads at or
    /// above the saturation load give the ceiling, in between it grows linearly.
    pub fn raw_voltage(&self, load: u32) -> f64 {
        let share = (load as f64 / self.saturation_load).min(1.);
        let voltage = self.min_voltage + (self.max_voltage - self.min_voltage) * share;
        voltage.clamp(self.min_voltage, self.max_voltage)
    }

    /// Records the raw voltages of all streetlights for `slice`. The loads must be complete
    /// for that slice, and slices have to be recorded in increasing order.
    pub fn record_slice(
        &mut self,
        slice: TimeSlice,
        streetlights: &Streetlights,
        loads: &EdgeLoads,
    ) -> Result<()> {
        let in_order = self.slices.last().map_or(true, |last| *last < slice);
        if !in_order || loads.slice() != Some(slice) {
            return Err(SimError::InvalidTimeRange {
                day: slice.day,
                hour: slice.hour,
            });
        }
        for light in streetlights.iter() {
            let voltage = self.raw_voltage(loads.load(light.link));
            self.raw[light.id.internal()].push(voltage);
        }
        self.slices.push(slice);
        Ok(())
    }

    pub fn recorded_slices(&self) -> &[TimeSlice] {
        &self.slices
    }

    /// Smooths every streetlight's series and returns the final schedule.
    pub fn finalize(self, network: &Network, streetlights: &Streetlights) -> VoltageSchedule {
        let mut entries = Vec::with_capacity(self.slices.len() * streetlights.len());
        for light in streetlights.iter() {
            let raw = &self.raw[light.id.internal()];
            let smoothed = smoothing::smooth(&self.smoothing, raw);
            let link = network.link(light.link);
            for ((slice, raw_voltage), smoothed_voltage) in
                self.slices.iter().zip(raw).zip(smoothed)
            {
                entries.push(ScheduleEntry {
                    streetlight_id: streetlights.name(light.id).to_string(),
                    from: network.node_name(link.from).to_string(),
                    to: network.node_name(link.to).to_string(),
                    day: slice.day,
                    hour: slice.hour,
                    raw_voltage: *raw_voltage,
                    smoothed_voltage: smoothed_voltage.clamp(self.min_voltage, self.max_voltage),
                });
            }
        }
        info!(
            "Voltage schedule has {} entries for {} streetlights and {} slices",
            entries.len(),
            streetlights.len(),
            self.slices.len()
        );
        VoltageSchedule::new(entries)
    }
}

#[cfg(test)]
mod tests {
    use assert_approx_eq::assert_approx_eq;

    use crate::simulation::config::{Smoothing, Voltage};
    use crate::simulation::congestion::EdgeLoads;
    use crate::simulation::error::SimError;
    use crate::simulation::network::{LinkAttributes, Network, Streetlights, Zone};
    use crate::simulation::routing::PathCache;
    use crate::simulation::traffic::TimeSlice;
    use crate::simulation::voltage::VoltageOptimizer;

    fn scenario() -> (Network, Streetlights) {
        let mut network = Network::new();
        network.add_node("a", Zone::Residential, None).unwrap();
        network.add_node("b", Zone::Commercial, None).unwrap();
        network.add_node("c", Zone::Park, None).unwrap();
        let ab = network
            .add_link("a", "b", LinkAttributes::new(1., 1, 1.))
            .unwrap();
        let bc = network
            .add_link("b", "c", LinkAttributes::new(1., 1, 1.))
            .unwrap();
        let mut lights = Streetlights::default();
        lights.add(ab, Some(0.5));
        lights.add(bc, None);
        (network, lights)
    }

    fn config(smoothing: Smoothing) -> Voltage {
        Voltage {
            min_voltage: 30.,
            max_voltage: 100.,
            saturation_load: 10.,
            smoothing,
        }
    }

    /// Loads `trips` trips onto a -> b for `slice`.
    fn loads(network: &Network, slice: TimeSlice, trips: usize) -> EdgeLoads {
        let mut cache = PathCache::new();
        let a = network.find_node("a").unwrap();
        let b = network.find_node("b").unwrap();
        let path = cache.resolve(network, a, b).unwrap();
        let mut loads = EdgeLoads::new(network);
        loads.reset(slice);
        for _ in 0..trips {
            loads.add_path(&path);
        }
        loads
    }

    #[test]
    fn raw_voltage_is_clamped() {
        let (_, lights) = scenario();
        let optimizer = VoltageOptimizer::new(&config(Smoothing::Exponential { alpha: 1. }), &lights);
        assert_eq!(30., optimizer.raw_voltage(0));
        assert_approx_eq!(65., optimizer.raw_voltage(5));
        assert_eq!(100., optimizer.raw_voltage(10));
        assert_eq!(100., optimizer.raw_voltage(1000));
    }

    #[test]
    fn unused_road_gets_floor_voltage() {
        let (network, lights) = scenario();
        let mut optimizer =
            VoltageOptimizer::new(&config(Smoothing::MovingAverage { window: 3 }), &lights);
        for hour in 0..5 {
            let slice = TimeSlice { day: 1, hour };
            optimizer
                .record_slice(slice, &lights, &loads(&network, slice, hour as usize * 4))
                .unwrap();
        }
        let schedule = optimizer.finalize(&network, &lights);

        assert_eq!(10, schedule.len());
        for entry in schedule.entries().iter().filter(|e| e.streetlight_id == "sl_00002") {
            assert_eq!(30., entry.raw_voltage);
            assert_eq!(30., entry.smoothed_voltage);
            assert_eq!("b", entry.from);
        }
    }

    #[test]
    fn smoothed_voltage_within_bounds() {
        let (network, lights) = scenario();
        let mut optimizer =
            VoltageOptimizer::new(&config(Smoothing::Exponential { alpha: 0.3 }), &lights);
        let load_pattern = [0, 40, 0, 3, 25, 7, 0, 0, 12, 1];
        for (hour, trips) in load_pattern.iter().enumerate() {
            let slice = TimeSlice {
                day: 2,
                hour: hour as u32,
            };
            optimizer
                .record_slice(slice, &lights, &loads(&network, slice, *trips))
                .unwrap();
        }
        let schedule = optimizer.finalize(&network, &lights);

        for entry in schedule.entries() {
            assert!((30. ..=100.).contains(&entry.raw_voltage));
            assert!((30. ..=100.).contains(&entry.smoothed_voltage));
        }
        let spike = schedule
            .get("sl_00001", TimeSlice { day: 2, hour: 1 })
            .unwrap();
        assert_eq!(100., spike.raw_voltage);
        assert!(spike.smoothed_voltage < spike.raw_voltage);
    }

    #[test]
    fn slices_must_increase() {
        let (network, lights) = scenario();
        let mut optimizer =
            VoltageOptimizer::new(&config(Smoothing::Exponential { alpha: 0.5 }), &lights);
        let later = TimeSlice { day: 1, hour: 5 };
        let earlier = TimeSlice { day: 1, hour: 4 };

        optimizer
            .record_slice(later, &lights, &loads(&network, later, 1))
            .unwrap();
        let result = optimizer.record_slice(earlier, &lights, &loads(&network, earlier, 1));
        assert!(matches!(result, Err(SimError::InvalidTimeRange { day: 1, hour: 4 })));
        let result = optimizer.record_slice(later, &lights, &loads(&network, later, 1));
        assert!(result.is_err());
        assert_eq!(1, optimizer.recorded_slices().len());
    }

    #[test]
    fn loads_must_belong_to_slice() {
        let (network, lights) = scenario();
        let mut optimizer =
            VoltageOptimizer::new(&config(Smoothing::Exponential { alpha: 0.5 }), &lights);
        let slice = TimeSlice { day: 1, hour: 5 };
        let other = TimeSlice { day: 1, hour: 6 };

        let result = optimizer.record_slice(slice, &lights, &loads(&network, other, 1));
        assert!(result.is_err());
    }
}
