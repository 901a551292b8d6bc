use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::simulation::error::{Result, SimError};
use crate::simulation::io::create_parent_dirs;
use crate::simulation::network::Zone;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineArgs {
    #[arg(long, short)]
    pub config: String,
    #[arg(long = "set", value_parser = parse_key_val)]
    pub overrides: Vec<(String, String)>,
}

impl CommandLineArgs {
    pub fn new_with_path(path: impl ToString) -> Self {
        CommandLineArgs {
            config: path.to_string(),
            overrides: Vec::new(),
        }
    }
}

fn parse_key_val(s: &str) -> std::result::Result<(String, String), String> {
    let pos = s.find('=');
    match pos {
        Some(pos) => Ok((s[..pos].to_string(), s[pos + 1..].to_string())),
        None => Err(format!("invalid KEY=VALUE: no `=` found in `{}`", s)),
    }
}

struct OverrideHandler {
    key: &'static str,
    apply: fn(config: &mut Config, value: &str) -> Result<()>,
}

fn parse<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| SimError::InvalidConfig(format!("Cannot parse value '{value}' for {key}")))
}

static OVERRIDES: &[OverrideHandler] = &[
    OverrideHandler {
        key: "input.network",
        apply: |config, value| {
            config.modules.input.network = PathBuf::from(value);
            Ok(())
        },
    },
    OverrideHandler {
        key: "input.streetlights",
        apply: |config, value| {
            config.modules.input.streetlights = PathBuf::from(value);
            Ok(())
        },
    },
    OverrideHandler {
        key: "output.output_dir",
        apply: |config, value| {
            config.modules.output.output_dir = PathBuf::from(value);
            Ok(())
        },
    },
    OverrideHandler {
        key: "output.logging",
        apply: |config, value| {
            config.modules.output.logging = match value.to_lowercase().as_str() {
                "none" => Logging::None,
                "info" => Logging::Info,
                _ => {
                    return Err(SimError::InvalidConfig(format!(
                        "Invalid logging mode: {value}"
                    )))
                }
            };
            Ok(())
        },
    },
    OverrideHandler {
        key: "output.write_trips",
        apply: |config, value| {
            config.modules.output.write_trips = parse("output.write_trips", value)?;
            Ok(())
        },
    },
    OverrideHandler {
        key: "simulation.start_day",
        apply: |config, value| {
            config.modules.simulation.start_day = parse("simulation.start_day", value)?;
            Ok(())
        },
    },
    OverrideHandler {
        key: "simulation.end_day",
        apply: |config, value| {
            config.modules.simulation.end_day = parse("simulation.end_day", value)?;
            Ok(())
        },
    },
    OverrideHandler {
        key: "simulation.start_hour",
        apply: |config, value| {
            config.modules.simulation.start_hour = parse("simulation.start_hour", value)?;
            Ok(())
        },
    },
    OverrideHandler {
        key: "simulation.end_hour",
        apply: |config, value| {
            config.modules.simulation.end_hour = parse("simulation.end_hour", value)?;
            Ok(())
        },
    },
    OverrideHandler {
        key: "simulation.intersections_per_hour",
        apply: |config, value| {
            config.modules.simulation.intersections_per_hour =
                parse("simulation.intersections_per_hour", value)?;
            Ok(())
        },
    },
    OverrideHandler {
        key: "simulation.random_seed",
        apply: |config, value| {
            config.modules.simulation.random_seed = parse("simulation.random_seed", value)?;
            Ok(())
        },
    },
    OverrideHandler {
        key: "simulation.precompute_paths",
        apply: |config, value| {
            config.modules.simulation.precompute_paths =
                parse("simulation.precompute_paths", value)?;
            Ok(())
        },
    },
    OverrideHandler {
        key: "simulation.max_nodes",
        apply: |config, value| {
            config.modules.simulation.max_nodes = Some(parse("simulation.max_nodes", value)?);
            Ok(())
        },
    },
    OverrideHandler {
        key: "simulation.max_links",
        apply: |config, value| {
            config.modules.simulation.max_links = Some(parse("simulation.max_links", value)?);
            Ok(())
        },
    },
    OverrideHandler {
        key: "traffic.max_vehicles_per_origin",
        apply: |config, value| {
            config.modules.traffic.max_vehicles_per_origin =
                parse("traffic.max_vehicles_per_origin", value)?;
            Ok(())
        },
    },
    OverrideHandler {
        key: "traffic.max_pedestrians_per_origin",
        apply: |config, value| {
            config.modules.traffic.max_pedestrians_per_origin =
                parse("traffic.max_pedestrians_per_origin", value)?;
            Ok(())
        },
    },
    OverrideHandler {
        key: "traffic.residential_origin_share",
        apply: |config, value| {
            config.modules.traffic.residential_origin_share =
                parse("traffic.residential_origin_share", value)?;
            Ok(())
        },
    },
    OverrideHandler {
        key: "traffic.max_pedestrian_hops",
        apply: |config, value| {
            config.modules.traffic.max_pedestrian_hops =
                parse("traffic.max_pedestrian_hops", value)?;
            Ok(())
        },
    },
    OverrideHandler {
        key: "congestion.max_penalty",
        apply: |config, value| {
            config.modules.congestion.max_penalty = parse("congestion.max_penalty", value)?;
            Ok(())
        },
    },
    OverrideHandler {
        key: "voltage.min_voltage",
        apply: |config, value| {
            config.modules.voltage.min_voltage = parse("voltage.min_voltage", value)?;
            Ok(())
        },
    },
    OverrideHandler {
        key: "voltage.max_voltage",
        apply: |config, value| {
            config.modules.voltage.max_voltage = parse("voltage.max_voltage", value)?;
            Ok(())
        },
    },
    OverrideHandler {
        key: "voltage.saturation_load",
        apply: |config, value| {
            config.modules.voltage.saturation_load = parse("voltage.saturation_load", value)?;
            Ok(())
        },
    },
];

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    pub modules: Modules,
    #[serde(skip)]
    context: Option<PathBuf>,
}

/// Config modules. `input`, `traffic` and `voltage` have to be present in the file; the
/// others fall back to their defaults.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Modules {
    pub input: Input,
    #[serde(default)]
    pub output: Output,
    #[serde(default)]
    pub simulation: Simulation,
    pub traffic: Traffic,
    #[serde(default)]
    pub congestion: Congestion,
    pub voltage: Voltage,
}

impl Config {
    pub fn new(modules: Modules) -> Self {
        Config {
            modules,
            context: None,
        }
    }

    pub fn from_file(config_path: &Path) -> Result<Self> {
        let file = File::open(config_path).map_err(|e| {
            SimError::InvalidConfig(format!(
                "Failed to open config file at {config_path:?}. Original error was {e}"
            ))
        })?;
        let mut config: Config = serde_yaml::from_reader(BufReader::new(file))?;
        config.set_context(Some(config_path.to_path_buf()));
        Ok(config)
    }

    /// Reads the config file named on the command line, applies `--set` overrides and
    /// validates the result.
    pub fn from_args(args: &CommandLineArgs) -> Result<Self> {
        let mut config = Config::from_file(&PathBuf::from(&args.config))?;
        config.apply_overrides(&args.overrides)?;
        config.validate()?;
        Ok(config)
    }

    pub fn set_context(&mut self, context: Option<PathBuf>) {
        self.context = context;
    }

    pub fn context(&self) -> &Option<PathBuf> {
        &self.context
    }

    /// Apply generic key-value overrides to the config, e.g. simulation.random_seed=7
    pub fn apply_overrides(&mut self, overrides: &[(String, String)]) -> Result<()> {
        if overrides.is_empty() {
            return Ok(());
        }
        info!("Applying overrides: {:?}", overrides);

        for (key, value) in overrides {
            if let Some(handler) = OVERRIDES.iter().find(|h| h.key == key.as_str()) {
                (handler.apply)(self, value)?;
            } else {
                warn!("No override handler found for key: {}", key);
            }
        }
        Ok(())
    }

    pub fn input(&self) -> &Input {
        &self.modules.input
    }

    pub fn output(&self) -> &Output {
        &self.modules.output
    }

    pub fn simulation(&self) -> &Simulation {
        &self.modules.simulation
    }

    pub fn traffic(&self) -> &Traffic {
        &self.modules.traffic
    }

    pub fn congestion(&self) -> &Congestion {
        &self.modules.congestion
    }

    pub fn voltage(&self) -> &Voltage {
        &self.modules.voltage
    }

    pub fn validate(&self) -> Result<()> {
        self.modules.simulation.validate()?;
        self.modules.traffic.validate()?;
        self.modules.congestion.validate()?;
        self.modules.voltage.validate()
    }
}

pub fn write_config(config: &Config, output_path: &Path) -> Result<()> {
    let output_config = output_path.join("output_config.yml");
    create_parent_dirs(&output_config)?;
    let writer = BufWriter::new(File::create(&output_config)?);
    serde_yaml::to_writer(writer, config)?;
    Ok(())
}

fn invalid<T>(message: String) -> Result<T> {
    Err(SimError::InvalidConfig(message))
}

fn check_finite(name: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        invalid(format!("{name} must be a finite number, got {value}"))
    }
}

fn check_non_negative(name: &str, value: f64) -> Result<()> {
    check_finite(name, value)?;
    if value < 0. {
        return invalid(format!("{name} must not be negative, got {value}"));
    }
    Ok(())
}

fn check_positive(name: &str, value: f64) -> Result<()> {
    check_finite(name, value)?;
    if value <= 0. {
        return invalid(format!("{name} must be positive, got {value}"));
    }
    Ok(())
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Input {
    /// City graph in node-link JSON.
    pub network: PathBuf,
    pub streetlights: PathBuf,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Output {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default = "default_true")]
    pub write_trips: bool,
}

impl Default for Output {
    fn default() -> Self {
        Output {
            output_dir: default_output_dir(),
            logging: Logging::default(),
            write_trips: true,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./output")
}

fn default_true() -> bool {
    true
}

/// Have this extra layer of log level enum, as tracing subscriber has no
/// off/none option by default. At least it can't be parsed
#[derive(PartialEq, Debug, Clone, Copy, Serialize, Deserialize, Default)]
pub enum Logging {
    #[default]
    None,
    Info,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Simulation {
    pub start_day: u32,
    pub end_day: u32,
    /// Upper bound for simulated days.
    pub max_day: u32,
    pub start_hour: u32,
    pub end_hour: u32,
    /// Number of distinct origins drawn per slice.
    pub intersections_per_hour: usize,
    pub random_seed: u64,
    pub max_nodes: Option<usize>,
    pub max_links: Option<usize>,
    /// Run the shortest path search from every intersection before the first slice.
    pub precompute_paths: bool,
}

impl Default for Simulation {
    fn default() -> Self {
        Simulation {
            start_day: 1,
            end_day: 1,
            max_day: 15,
            start_hour: 0,
            end_hour: 23,
            intersections_per_hour: 5,
            random_seed: 42,
            max_nodes: None,
            max_links: None,
            precompute_paths: false,
        }
    }
}

impl Simulation {
    fn validate(&self) -> Result<()> {
        if self.start_day < 1 || self.start_day > self.end_day || self.end_day > self.max_day {
            return invalid(format!(
                "Days {}..={} must be a non-empty range within 1..={}",
                self.start_day, self.end_day, self.max_day
            ));
        }
        if self.start_hour > self.end_hour || self.end_hour > 23 {
            return invalid(format!(
                "Hours {}..={} must be a non-empty range within 0..=23",
                self.start_hour, self.end_hour
            ));
        }
        if self.intersections_per_hour == 0 {
            return invalid("simulation.intersections_per_hour must be at least 1".into());
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Traffic {
    #[serde(default = "default_max_vehicles")]
    pub max_vehicles_per_origin: u32,
    #[serde(default = "default_max_pedestrians")]
    pub max_pedestrians_per_origin: u32,
    /// Probability that the origins of a slice are drawn from residential intersections.
    #[serde(default = "default_residential_share")]
    pub residential_origin_share: f64,
    #[serde(default = "default_max_pedestrian_hops")]
    pub max_pedestrian_hops: u32,
    pub hour_multipliers: HourMultipliers,
    #[serde(default)]
    pub zone_factors: ZoneFactors,
    #[serde(default = "default_vehicle_types")]
    pub vehicle_types: Vec<VehicleTypeConfig>,
}

fn default_max_vehicles() -> u32 {
    10
}

fn default_max_pedestrians() -> u32 {
    6
}

fn default_residential_share() -> f64 {
    0.8
}

fn default_max_pedestrian_hops() -> u32 {
    3
}

impl Default for Traffic {
    fn default() -> Self {
        Traffic {
            max_vehicles_per_origin: default_max_vehicles(),
            max_pedestrians_per_origin: default_max_pedestrians(),
            residential_origin_share: default_residential_share(),
            max_pedestrian_hops: default_max_pedestrian_hops(),
            hour_multipliers: HourMultipliers::default(),
            zone_factors: ZoneFactors::default(),
            vehicle_types: default_vehicle_types(),
        }
    }
}

impl Traffic {
    fn validate(&self) -> Result<()> {
        let share = self.residential_origin_share;
        if !(0. ..=1.).contains(&share) {
            return invalid(format!(
                "traffic.residential_origin_share must be within [0, 1], got {share}"
            ));
        }
        self.hour_multipliers.validate()?;
        self.zone_factors.validate()?;

        if self.vehicle_types.is_empty() {
            return invalid("traffic.vehicle_types must not be empty".into());
        }
        for vehicle_type in &self.vehicle_types {
            check_positive(
                &format!("Weight of vehicle type {}", vehicle_type.name),
                vehicle_type.weight,
            )?;
        }
        Ok(())
    }
}

/// Time-of-day traffic multipliers, one value per hour of the day.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct HourMultipliers {
    pub weekday: Vec<f64>,
    pub weekend: Vec<f64>,
}

impl Default for HourMultipliers {
    /// Commute peaks on weekdays, an afternoon peak on weekends.
    fn default() -> Self {
        let weekday = (0..24)
            .map(|hour| match hour {
                7..=9 => 2.0,
                17..=20 => 2.5,
                12..=14 => 0.7,
                0..=5 => 0.3,
                _ => 0.5,
            })
            .collect();
        let weekend = (0..24)
            .map(|hour| match hour {
                14..=18 => 1.5,
                _ => 0.6,
            })
            .collect();
        HourMultipliers { weekday, weekend }
    }
}

impl HourMultipliers {
    pub fn multiplier(&self, hour: u32, is_weekend: bool) -> Result<f64> {
        let (name, table) = if is_weekend {
            ("weekend", &self.weekend)
        } else {
            ("weekday", &self.weekday)
        };
        table.get(hour as usize).copied().ok_or_else(|| {
            SimError::InvalidConfig(format!(
                "traffic.hour_multipliers.{name} has no entry for hour {hour}"
            ))
        })
    }

    fn validate(&self) -> Result<()> {
        for (name, table) in [("weekday", &self.weekday), ("weekend", &self.weekend)] {
            if table.len() != 24 {
                return invalid(format!(
                    "traffic.hour_multipliers.{name} needs 24 entries, got {}",
                    table.len()
                ));
            }
            for (hour, value) in table.iter().enumerate() {
                check_non_negative(
                    &format!("traffic.hour_multipliers.{name}[{hour}]"),
                    *value,
                )?;
            }
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct ZoneFactors {
    pub residential: f64,
    pub commercial: f64,
    pub industrial: f64,
    pub park: f64,
}

impl Default for ZoneFactors {
    fn default() -> Self {
        ZoneFactors {
            residential: 1.0,
            commercial: 1.2,
            industrial: 0.8,
            park: 0.5,
        }
    }
}

impl ZoneFactors {
    pub fn factor(&self, zone: Zone) -> f64 {
        match zone {
            Zone::Residential => self.residential,
            Zone::Commercial => self.commercial,
            Zone::Industrial => self.industrial,
            Zone::Park => self.park,
        }
    }

    fn validate(&self) -> Result<()> {
        for zone in Zone::ALL {
            check_non_negative(&format!("traffic.zone_factors.{zone}"), self.factor(zone))?;
        }
        Ok(())
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct VehicleTypeConfig {
    pub name: String,
    pub wheels: u32,
    /// Relative frequency of this type among vehicle trips.
    pub weight: f64,
}

impl VehicleTypeConfig {
    pub fn new(name: &str, wheels: u32, weight: f64) -> Self {
        VehicleTypeConfig {
            name: name.to_string(),
            wheels,
            weight,
        }
    }
}

fn default_vehicle_types() -> Vec<VehicleTypeConfig> {
    vec![
        VehicleTypeConfig::new("4-wheeler", 4, 70.),
        VehicleTypeConfig::new("2-wheeler", 2, 15.),
        VehicleTypeConfig::new("6-wheeler", 6, 5.),
        VehicleTypeConfig::new("3-wheeler", 3, 5.),
        VehicleTypeConfig::new("8-wheeler", 8, 3.),
        VehicleTypeConfig::new("10-wheeler", 10, 2.),
    ]
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Congestion {
    pub curve: CongestionCurve,
    /// Roads with at least this capacity count as major roads.
    pub major_capacity: f64,
    /// Capacity per lane for roads without an explicit capacity.
    pub capacity_per_lane: f64,
    /// Upper bound for the penalty of a single trip.
    pub max_penalty: f64,
}

impl Default for Congestion {
    fn default() -> Self {
        Congestion {
            curve: CongestionCurve::default(),
            major_capacity: 300.,
            capacity_per_lane: 300.,
            max_penalty: 100.,
        }
    }
}

impl Congestion {
    fn validate(&self) -> Result<()> {
        check_positive("congestion.major_capacity", self.major_capacity)?;
        check_positive("congestion.capacity_per_lane", self.capacity_per_lane)?;
        check_non_negative("congestion.max_penalty", self.max_penalty)?;
        match self.curve {
            CongestionCurve::Linear {
                major_base,
                minor_base,
                per_trip,
            } => {
                check_non_negative("congestion.curve.major_base", major_base)?;
                check_non_negative("congestion.curve.minor_base", minor_base)?;
                check_non_negative("congestion.curve.per_trip", per_trip)
            }
            CongestionCurve::Threshold {
                threshold,
                exponent,
                scale,
            } => {
                check_non_negative("congestion.curve.threshold", threshold)?;
                check_positive("congestion.curve.exponent", exponent)?;
                check_non_negative("congestion.curve.scale", scale)
            }
        }
    }
}

/// Penalty of one road as a function of its load.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum CongestionCurve {
    /// `base * (1 + load * per_trip)`, where the base depends on whether the road is major.
    Linear {
        major_base: f64,
        minor_base: f64,
        per_trip: f64,
    },
    /// `scale * max(0, load / capacity - threshold) ^ exponent`
    Threshold {
        threshold: f64,
        exponent: f64,
        scale: f64,
    },
}

impl Default for CongestionCurve {
    fn default() -> Self {
        CongestionCurve::Linear {
            major_base: 0.2,
            minor_base: 0.5,
            per_trip: 0.05,
        }
    }
}

/// Voltages are given in percent of the rated output of a streetlight.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Voltage {
    pub min_voltage: f64,
    pub max_voltage: f64,
    /// Road load at which a streetlight reaches `max_voltage`.
    #[serde(default = "default_saturation_load")]
    pub saturation_load: f64,
    pub smoothing: Smoothing,
}

fn default_saturation_load() -> f64 {
    20.
}

impl Default for Voltage {
    fn default() -> Self {
        Voltage {
            min_voltage: 30.,
            max_voltage: 100.,
            saturation_load: default_saturation_load(),
            smoothing: Smoothing::Exponential { alpha: 0.5 },
        }
    }
}

impl Voltage {
    fn validate(&self) -> Result<()> {
        check_finite("voltage.min_voltage", self.min_voltage)?;
        check_finite("voltage.max_voltage", self.max_voltage)?;
        if self.min_voltage >= self.max_voltage {
            return invalid(format!(
                "voltage.min_voltage ({}) must be lower than voltage.max_voltage ({})",
                self.min_voltage, self.max_voltage
            ));
        }
        check_positive("voltage.saturation_load", self.saturation_load)?;
        match self.smoothing {
            Smoothing::Exponential { alpha } => {
                if !(alpha > 0. && alpha <= 1.) {
                    return invalid(format!(
                        "voltage.smoothing.alpha must be within (0, 1], got {alpha}"
                    ));
                }
            }
            Smoothing::MovingAverage { window } => {
                if window == 0 {
                    return invalid("voltage.smoothing.window must be at least 1".into());
                }
            }
        }
        Ok(())
    }
}

/// Temporal filter applied to the raw voltages of each streetlight.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(tag = "type")]
pub enum Smoothing {
    /// `s_t = s_(t-1) + alpha * (raw_t - s_(t-1))`, starting at the first raw value.
    Exponential { alpha: f64 },
    /// Mean over the current and up to `window - 1` preceding slices.
    MovingAverage { window: usize },
}
