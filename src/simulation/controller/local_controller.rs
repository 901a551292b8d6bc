use std::fs;
use std::path::PathBuf;

use derive_builder::Builder;
use itertools::Itertools;
use tracing::{info, instrument};

use crate::simulation::analysis::{CityAnalysis, CITY_ANALYSIS_JSON};
use crate::simulation::config::write_config;
use crate::simulation::controller::{RunContext, RunSummary};
use crate::simulation::error::{Result, SimError};
use crate::simulation::io;
use crate::simulation::io::schedule::{write_json, write_schedule};
use crate::simulation::io::trips::TripLogWriter;
use crate::simulation::scenario::Scenario;
use crate::simulation::traffic::counts::TRAFFIC_DATA_JSON;
use crate::simulation::traffic::{TimeSlice, TrafficCounts};
use crate::simulation::voltage::VoltageSchedule;

pub const RUN_SUMMARY: &str = "run_summary.json";

#[derive(Debug)]
pub struct RunOutput {
    pub schedule: VoltageSchedule,
    pub traffic: TrafficCounts,
    pub summary: RunSummary,
    pub output_dir: PathBuf,
}

#[derive(Debug, Builder)]
#[builder(pattern = "owned", build_fn(skip))]
pub struct LocalController {
    scenario: Scenario,
    /// Replaces the output directory of the config.
    #[builder(setter(strip_option), default)]
    output_dir: Option<PathBuf>,
}

impl LocalControllerBuilder {
    // Implementing a custom build function in order to fall back to the configured output directory.
    pub fn build(self) -> Result<LocalController> {
        let scenario = self
            .scenario
            .ok_or_else(|| SimError::InvalidConfig("scenario is required".into()))?;

        Ok(LocalController {
            scenario,
            output_dir: self.output_dir.flatten(),
        })
    }
}

impl LocalController {
    pub fn output_dir(&self) -> PathBuf {
        match &self.output_dir {
            Some(dir) => dir.clone(),
            None => io::resolve_path(
                self.scenario.config.context(),
                &self.scenario.config.output().output_dir,
            ),
        }
    }

    /// Runs all configured slices. The city analysis is written up front; all other outputs
    /// only once every slice succeeded. Trip logs keep their `.partial` suffix if the run
    /// fails midway.
    pub fn run(self) -> Result<RunOutput> {
        let output_path = self.output_dir();
        fs::create_dir_all(&output_path)?;

        let analysis = CityAnalysis::new(&self.scenario);
        analysis.log_summary();
        write_json(&analysis, &output_path.join(CITY_ANALYSIS_JSON))?;

        let config = &self.scenario.config;
        let mut trip_log = if config.output().write_trips {
            Some(TripLogWriter::new(&output_path)?)
        } else {
            None
        };

        info!("=========== Start Simulation ===========");
        let mut context = RunContext::new(&self.scenario)?;
        let slices = TimeSlice::all(config.simulation())?;
        for (day, day_slices) in &slices.iter().chunk_by(|slice| slice.day) {
            Self::simulate_day(&mut context, day, day_slices, trip_log.as_mut())?;
        }
        let (schedule, traffic, summary) = context.finish();
        info!("=========== End Simulation ===========");
        info!(
            "Path cache: {} hits, {} misses, {} searches, {} unreachable lookups",
            summary.path_cache.hits,
            summary.path_cache.misses,
            summary.path_cache.searches,
            summary.path_cache.unreachable
        );

        info!("Writing output files:");
        if let Some(log) = trip_log {
            info!("    ... Trip logs ...");
            log.finish()?;
        }
        info!("    ... Voltage schedule ...");
        write_schedule(&schedule, &output_path)?;
        info!("    ... Traffic counts ...");
        write_json(&traffic, &output_path.join(TRAFFIC_DATA_JSON))?;
        info!("    ... Run summary ...");
        write_json(&summary, &output_path.join(RUN_SUMMARY))?;
        info!("    ... Config ...");
        write_config(config, &output_path)?;

        Ok(RunOutput {
            schedule,
            traffic,
            summary,
            output_dir: output_path,
        })
    }

    #[instrument(level = "info", skip(context, slices, trip_log))]
    fn simulate_day<'a>(
        context: &mut RunContext<'_>,
        day: u32,
        slices: impl Iterator<Item = &'a TimeSlice>,
        mut trip_log: Option<&mut TripLogWriter>,
    ) -> Result<()> {
        let scenario = context.scenario();
        let (mut trips, mut dropped) = (0, 0);
        for slice in slices {
            let slice_trips = context.simulate_slice(slice.day, slice.hour)?;
            if let Some(log) = trip_log.as_deref_mut() {
                log.write_slice(&scenario.network, &slice_trips.trips)?;
            }
            trips += slice_trips.trips.len();
            dropped += slice_trips.dropped;
        }
        info!("Day {day}: {trips} trips, {dropped} dropped");
        Ok(())
    }
}
