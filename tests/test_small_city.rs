use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use itertools::Itertools;
use streetlight_sim::simulation::config::{CommandLineArgs, Config};
use streetlight_sim::simulation::controller::{LocalControllerBuilder, RunOutput, RunSummary};
use streetlight_sim::simulation::error::SimError;
use streetlight_sim::simulation::io::trips::{read_trip_log, TripRecord};
use streetlight_sim::simulation::logging::init_std_out_logging_thread_local;
use streetlight_sim::simulation::scenario::Scenario;
use streetlight_sim::simulation::traffic::TrafficCounts;
use streetlight_sim::simulation::voltage::ScheduleEntry;

const CONFIG: &str = "./tests/resources/small_city/config.yml";

fn run(args: CommandLineArgs, output_dir: &Path) -> RunOutput {
    let config = Arc::new(Config::from_args(&args).unwrap());
    let scenario = Scenario::load(config).unwrap();
    LocalControllerBuilder::default()
        .scenario(scenario)
        .output_dir(output_dir.to_path_buf())
        .build()
        .unwrap()
        .run()
        .unwrap()
}

fn uses_road(record: &TripRecord, from: &str, to: &str) -> bool {
    record
        .path
        .split('→')
        .tuple_windows()
        .any(|(a, b)| a == from && b == to)
}

#[test]
fn run_small_city() {
    let _guard = init_std_out_logging_thread_local();
    let dir = tempfile::tempdir().unwrap();
    let output = run(CommandLineArgs::new_with_path(CONFIG), dir.path());

    for file in [
        "vehicles_log.csv",
        "pedestrians_log.csv",
        "voltage_schedule.json",
        "voltage_schedule.csv",
        "smoothed_voltage_schedule.json",
        "traffic_data.json",
        "city_analysis.json",
        "run_summary.json",
        "output_config.yml",
    ] {
        assert!(dir.path().join(file).exists(), "{file} is missing");
    }
    assert!(!dir.path().join("vehicles_log.csv.partial").exists());

    // 12 streetlights, 2 days with 24 hours each
    assert_eq!(12 * 48, output.schedule.len());
    assert_eq!(48, output.summary.slices);

    let vehicles = read_trip_log(&dir.path().join("vehicles_log.csv")).unwrap();
    let pedestrians = read_trip_log(&dir.path().join("pedestrians_log.csv")).unwrap();
    assert_eq!(output.summary.vehicle_trips, vehicles.len());
    assert_eq!(output.summary.pedestrian_trips, pedestrians.len());
    assert!(!vehicles.is_empty());

    let trips: Vec<&TripRecord> = vehicles.iter().chain(pedestrians.iter()).collect();
    let ids: HashSet<&str> = trips.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(trips.len(), ids.len());
    for trip in &trips {
        assert!(trip.path.starts_with(&trip.from));
        assert!(trip.path.ends_with(&trip.to));
        assert!(trip.congestion_penalty > 0. && trip.congestion_penalty <= 50.);
        assert!((5..=6).contains(&trip.day));
    }
    assert!(vehicles.iter().all(|v| v.id.starts_with("veh_") && v.weight >= 2));
    assert!(pedestrians
        .iter()
        .all(|p| p.id.starts_with("ped_") && p.trip_type == "pedestrian"));

    // the raw voltage of every streetlight reflects the trips logged on its road
    for entry in output.schedule.entries() {
        let load = trips
            .iter()
            .filter(|t| t.day == entry.day && t.hour == entry.hour)
            .filter(|t| uses_road(t, &entry.from, &entry.to))
            .count();
        let expected = 30. + 70. * (load as f64 / 15.).min(1.);
        assert!(
            (expected - entry.raw_voltage).abs() < 1e-9,
            "{entry:?} has load {load}"
        );
        assert!(entry.smoothed_voltage >= 30. && entry.smoothed_voltage <= 100.);
    }

    let json = fs::read_to_string(dir.path().join("voltage_schedule.json")).unwrap();
    let entries: Vec<ScheduleEntry> = serde_json::from_str(&json).unwrap();
    assert_eq!(output.schedule.len(), entries.len());
    for (written, read) in output.schedule.entries().iter().zip(&entries) {
        assert_eq!(written.streetlight_id, read.streetlight_id);
        assert_eq!(written.slice(), read.slice());
        assert!((written.smoothed_voltage - read.smoothed_voltage).abs() < 1e-9);
    }

    // trips per origin and hour, summed over both days
    let json = fs::read_to_string(dir.path().join("traffic_data.json")).unwrap();
    let traffic: TrafficCounts = serde_json::from_str(&json).unwrap();
    assert_eq!(output.traffic, traffic);
    assert_eq!(output.summary.vehicle_trips as u64, traffic.total().vehicle);
    for ((from, hour), records) in &vehicles.iter().into_group_map_by(|v| (v.from.clone(), v.hour)) {
        assert_eq!(records.len() as u64, traffic.get(from, *hour).vehicle);
    }

    let json = fs::read_to_string(dir.path().join("city_analysis.json")).unwrap();
    let analysis: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(9, analysis["total_intersections"]);
    assert_eq!(24, analysis["total_roads"]);
    assert_eq!(12, analysis["total_streetlights"]);
    assert_eq!(
        12,
        analysis["roads_without_streetlights"].as_array().unwrap().len()
    );

    let json = fs::read_to_string(dir.path().join("run_summary.json")).unwrap();
    let summary: RunSummary = serde_json::from_str(&json).unwrap();
    assert_eq!(output.summary, summary);
    assert!(summary.path_cache.searches <= 9);
    assert!(summary.path_cache.hits > 0);
}

#[test]
fn same_seed_same_schedule() {
    let _guard = init_std_out_logging_thread_local();
    let first_dir = tempfile::tempdir().unwrap();
    let second_dir = tempfile::tempdir().unwrap();

    let first = run(CommandLineArgs::new_with_path(CONFIG), first_dir.path());
    let second = run(CommandLineArgs::new_with_path(CONFIG), second_dir.path());

    assert_eq!(first.schedule, second.schedule);
    assert_eq!(first.summary, second.summary);
    assert_eq!(
        fs::read_to_string(first_dir.path().join("vehicles_log.csv")).unwrap(),
        fs::read_to_string(second_dir.path().join("vehicles_log.csv")).unwrap()
    );
}

#[test]
fn overrides_apply() {
    let _guard = init_std_out_logging_thread_local();
    let dir = tempfile::tempdir().unwrap();
    let mut args = CommandLineArgs::new_with_path(CONFIG);
    args.overrides = vec![
        ("simulation.start_day".to_string(), "6".to_string()),
        ("simulation.start_hour".to_string(), "20".to_string()),
        ("output.write_trips".to_string(), "false".to_string()),
    ];
    let output = run(args, dir.path());

    assert_eq!(4, output.summary.slices);
    assert_eq!(12 * 4, output.schedule.len());
    assert!(!dir.path().join("vehicles_log.csv").exists());

    let written = Config::from_file(&dir.path().join("output_config.yml")).unwrap();
    assert_eq!(6, written.simulation().start_day);
    assert!(!written.output().write_trips);
}

#[test]
fn invalid_override_is_rejected() {
    let mut args = CommandLineArgs::new_with_path(CONFIG);
    args.overrides = vec![("simulation.end_day".to_string(), "16".to_string())];
    assert!(matches!(
        Config::from_args(&args),
        Err(SimError::InvalidConfig(_))
    ));

    args.overrides = vec![("voltage.max_voltage".to_string(), "20".to_string())];
    assert!(matches!(
        Config::from_args(&args),
        Err(SimError::InvalidConfig(_))
    ));
}

#[test]
fn graph_bounds_are_validated_before_simulation() {
    let mut args = CommandLineArgs::new_with_path(CONFIG);
    args.overrides = vec![("simulation.max_nodes".to_string(), "8".to_string())];
    let config = Arc::new(Config::from_args(&args).unwrap());
    assert!(matches!(
        Scenario::load(config),
        Err(SimError::InvalidGraph(_))
    ));
}
