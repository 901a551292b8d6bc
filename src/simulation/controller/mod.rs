pub mod local_controller;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::simulation::congestion::{CongestionModel, EdgeLoads};
use crate::simulation::error::Result;
use crate::simulation::random::get_rnd;
use crate::simulation::routing::{CacheStats, PathCache};
use crate::simulation::scenario::Scenario;
use crate::simulation::traffic::{
    SliceTrips, TimeSlice, TrafficCounts, TrafficGenerator, TripIdGenerator,
};
use crate::simulation::voltage::{VoltageOptimizer, VoltageSchedule};

pub use local_controller::{LocalController, LocalControllerBuilder, RunOutput};

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub slices: usize,
    pub vehicle_trips: usize,
    pub pedestrian_trips: usize,
    pub dropped_trips: usize,
    pub streetlights: usize,
    pub schedule_entries: usize,
    pub path_cache: CacheStats,
}

/// Owns all mutable state of one run: the path cache, the road loads of the current slice,
/// the voltage optimizer and the per-intersection trip counts. Slices are simulated one after the other; each slice is
/// complete before the next one starts.
pub struct RunContext<'s> {
    scenario: &'s Scenario,
    generator: TrafficGenerator<'s>,
    congestion: CongestionModel,
    cache: PathCache,
    loads: EdgeLoads,
    optimizer: VoltageOptimizer,
    trip_ids: TripIdGenerator,
    traffic: TrafficCounts,
    summary: RunSummary,
}

impl<'s> RunContext<'s> {
    pub fn new(scenario: &'s Scenario) -> Result<Self> {
        let config = &scenario.config;
        config.validate()?;
        let generator = TrafficGenerator::new(
            &scenario.network,
            config.traffic(),
            config.simulation().intersections_per_hour,
        )?;

        let mut cache = PathCache::new();
        if config.simulation().precompute_paths {
            cache.precompute_all(&scenario.network);
        }

        Ok(RunContext {
            scenario,
            generator,
            congestion: CongestionModel::new(config.congestion()),
            cache,
            loads: EdgeLoads::new(&scenario.network),
            optimizer: VoltageOptimizer::new(config.voltage(), &scenario.streetlights),
            trip_ids: TripIdGenerator::default(),
            traffic: TrafficCounts::default(),
            summary: RunSummary {
                streetlights: scenario.streetlights.len(),
                ..RunSummary::default()
            },
        })
    }

    /// Simulates one slice: generates its trips, accounts all of them on the roads, then
    /// computes the congestion penalties and records the streetlight voltages. Slices
    /// outside the configured range are rejected before any trip is generated.
    #[instrument(level = "debug", skip(self))]
    pub fn simulate_slice(&mut self, day: u32, hour: u32) -> Result<SliceTrips> {
        let slice = TimeSlice::new(day, hour, self.scenario.config.simulation())?;
        let network = &self.scenario.network;

        let mut rnd = get_rnd(self.scenario.config.simulation().random_seed, slice);
        let mut trips = self
            .generator
            .generate(slice, &mut rnd, &mut self.cache, &mut self.trip_ids)?;

        self.loads.reset(slice);
        for trip in &trips.trips {
            self.loads.add_path(&trip.path);
        }
        self.congestion.apply(network, &mut trips.trips, &self.loads);
        self.optimizer
            .record_slice(slice, &self.scenario.streetlights, &self.loads)?;
        self.traffic.add_slice(network, &trips);

        self.summary.slices += 1;
        self.summary.vehicle_trips += trips.vehicles();
        self.summary.pedestrian_trips += trips.pedestrians();
        self.summary.dropped_trips += trips.dropped;
        debug!(
            "{slice}: {} trips, {} dropped, max road load {}",
            trips.trips.len(),
            trips.dropped,
            self.loads.max()
        );
        Ok(trips)
    }

    pub fn scenario(&self) -> &'s Scenario {
        self.scenario
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn traffic(&self) -> &TrafficCounts {
        &self.traffic
    }

    /// Ends the run and smooths the recorded voltages into the final schedule.
    pub fn finish(self) -> (VoltageSchedule, TrafficCounts, RunSummary) {
        let schedule = self
            .optimizer
            .finalize(&self.scenario.network, &self.scenario.streetlights);
        let summary = RunSummary {
            schedule_entries: schedule.len(),
            path_cache: self.cache.stats(),
            ..self.summary
        };
        (schedule, self.traffic, summary)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use crate::simulation::config::{Config, Input, Modules, Simulation};
    use crate::simulation::controller::RunContext;
    use crate::simulation::error::SimError;
    use crate::simulation::network::{LinkAttributes, Network, Streetlights, Zone};
    use crate::simulation::scenario::Scenario;

    fn scenario(simulation: Simulation) -> Scenario {
        let mut network = Network::new();
        for (name, zone) in [
            ("h1", Zone::Residential),
            ("h2", Zone::Residential),
            ("shop", Zone::Commercial),
            ("plant", Zone::Industrial),
        ] {
            network.add_node(name, zone, None).unwrap();
        }
        let mut lights = Streetlights::default();
        for (from, to) in [
            ("h1", "shop"),
            ("shop", "h1"),
            ("h2", "shop"),
            ("shop", "h2"),
            ("shop", "plant"),
            ("plant", "shop"),
        ] {
            let link = network
                .add_link(from, to, LinkAttributes::new(1., 1, 1.))
                .unwrap();
            lights.add(link, Some(0.5));
        }
        let config = Config::new(Modules {
            input: Input {
                network: PathBuf::from("unused.json"),
                streetlights: PathBuf::from("unused.json"),
            },
            output: Default::default(),
            simulation,
            traffic: Default::default(),
            congestion: Default::default(),
            voltage: Default::default(),
        });
        Scenario::new(Arc::new(config), network, lights).unwrap()
    }

    #[test]
    fn simulate_day() {
        let scenario = scenario(Simulation {
            intersections_per_hour: 2,
            ..Simulation::default()
        });
        let mut context = RunContext::new(&scenario).unwrap();

        let mut trips = 0;
        for hour in 0..24 {
            let slice_trips = context.simulate_slice(1, hour).unwrap();
            for trip in &slice_trips.trips {
                assert!(trip.congestion_penalty > 0.);
                assert_eq!(hour, trip.slice.hour);
            }
            trips += slice_trips.trips.len();
        }
        assert_eq!(24, context.summary().slices);
        assert_eq!(
            trips,
            context.summary().vehicle_trips + context.summary().pedestrian_trips
        );
        // 4 intersections means at most 4 searches, no matter how many trips
        assert!(context.cache_stats().searches <= 4);

        let (schedule, traffic, summary) = context.finish();
        let counted = traffic.total();
        assert_eq!(summary.vehicle_trips as u64, counted.vehicle);
        assert_eq!(summary.pedestrian_trips as u64, counted.pedestrian);
        assert_eq!(6 * 24, schedule.len());
        assert_eq!(6 * 24, summary.schedule_entries);
        assert_eq!(6, summary.streetlights);
        for entry in schedule.entries() {
            assert!(entry.smoothed_voltage >= 30. && entry.smoothed_voltage <= 100.);
        }
    }

    #[test]
    fn slice_outside_range_is_rejected() {
        let scenario = scenario(Simulation {
            start_hour: 18,
            end_hour: 23,
            ..Simulation::default()
        });
        let mut context = RunContext::new(&scenario).unwrap();

        let result = context.simulate_slice(1, 7);
        assert!(matches!(result, Err(SimError::InvalidTimeRange { day: 1, hour: 7 })));
        let result = context.simulate_slice(2, 18);
        assert!(matches!(result, Err(SimError::InvalidTimeRange { day: 2, hour: 18 })));
        assert_eq!(0, context.summary().slices);
        assert_eq!(0, context.cache_stats().misses);
    }

    #[test]
    fn invalid_config_is_rejected_before_the_run() {
        let valid = scenario(Simulation::default());
        let mut config = valid.config.as_ref().clone();
        config.modules.traffic.hour_multipliers.weekday.truncate(3);
        let scenario = Scenario {
            network: valid.network.clone(),
            streetlights: valid.streetlights.clone(),
            config: Arc::new(config),
        };

        let result = RunContext::new(&scenario);
        assert!(matches!(result, Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn slices_run_in_order() {
        let scenario = scenario(Simulation::default());
        let mut context = RunContext::new(&scenario).unwrap();

        context.simulate_slice(1, 5).unwrap();
        assert!(context.simulate_slice(1, 4).is_err());
    }

    #[test]
    fn precompute_paths() {
        let scenario = scenario(Simulation {
            precompute_paths: true,
            ..Simulation::default()
        });
        let context = RunContext::new(&scenario).unwrap();
        assert_eq!(4, context.cache_stats().searches);
    }
}
