use std::collections::BTreeMap;

use nohash_hasher::IntMap;
use serde::Serialize;
use tracing::info;

use crate::simulation::congestion::CongestionModel;
use crate::simulation::id::Id;
use crate::simulation::network::{Link, Zone};
use crate::simulation::scenario::Scenario;

pub const CITY_ANALYSIS_JSON: &str = "city_analysis.json";

const UNKNOWN_ROAD_TYPE: &str = "unknown";

/// Static report on a city: how its roads, streetlights and traffic lights are distributed.
/// Computed once from the scenario, before anything is simulated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityAnalysis {
    pub total_intersections: usize,
    pub total_roads: usize,
    pub total_streetlights: usize,
    pub intersections_with_traffic_lights: usize,
    /// `(from, to)` of every road without a single streetlight.
    pub roads_without_streetlights: Vec<(String, String)>,
    /// Keyed by `from→to`.
    pub road_stats: BTreeMap<String, RoadStats>,
    pub type_stats: BTreeMap<String, RoadTypeStats>,
    pub zone_stats: BTreeMap<Zone, ZoneStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoadStats {
    pub length_km: f64,
    pub road_type: String,
    pub streetlights: usize,
    pub lights_per_km: f64,
    pub capacity: f64,
    pub delay: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RoadTypeStats {
    pub count: usize,
    pub lights: usize,
    pub length: f64,
    pub capacity: f64,
    pub avg_lights_per_km: f64,
    pub avg_capacity: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ZoneStats {
    pub intersections: usize,
    /// Roads starting in this zone.
    pub roads: usize,
    pub traffic_lights: usize,
    pub avg_traffic_light_delay: f64,
}

impl CityAnalysis {
    pub fn new(scenario: &Scenario) -> Self {
        let network = &scenario.network;
        let congestion = CongestionModel::new(scenario.config.congestion());

        let mut lights_per_link: IntMap<Id<Link>, usize> = IntMap::default();
        for light in scenario.streetlights.iter() {
            *lights_per_link.entry(light.link).or_default() += 1;
        }

        let mut zone_stats: BTreeMap<Zone, ZoneStats> = BTreeMap::new();
        for node in &network.nodes {
            let stats = zone_stats.entry(node.zone).or_default();
            stats.intersections += 1;
            if let Some(delay) = node.traffic_light_delay {
                stats.traffic_lights += 1;
                stats.avg_traffic_light_delay += delay;
            }
        }

        let mut road_stats = BTreeMap::new();
        let mut type_stats: BTreeMap<String, RoadTypeStats> = BTreeMap::new();
        let mut roads_without_streetlights = Vec::new();
        for link in &network.links {
            let from = network.node_name(link.from);
            let to = network.node_name(link.to);
            let lights = lights_per_link.get(&link.id).copied().unwrap_or(0);
            let capacity = congestion.capacity(link);
            let road_type = link
                .road_type
                .clone()
                .unwrap_or_else(|| UNKNOWN_ROAD_TYPE.to_string());

            let per_type = type_stats.entry(road_type.clone()).or_default();
            per_type.count += 1;
            per_type.lights += lights;
            per_type.length += link.length;
            per_type.capacity += capacity;

            zone_stats
                .entry(network.node(link.from).zone)
                .or_default()
                .roads += 1;

            if lights == 0 {
                roads_without_streetlights.push((from.to_string(), to.to_string()));
            }
            road_stats.insert(
                format!("{from}→{to}"),
                RoadStats {
                    length_km: link.length,
                    road_type,
                    streetlights: lights,
                    lights_per_km: ratio(lights as f64, link.length),
                    capacity,
                    delay: link.delay,
                },
            );
        }

        for stats in type_stats.values_mut() {
            stats.avg_lights_per_km = ratio(stats.lights as f64, stats.length);
            stats.avg_capacity = ratio(stats.capacity, stats.count as f64);
        }
        for stats in zone_stats.values_mut() {
            stats.avg_traffic_light_delay =
                ratio(stats.avg_traffic_light_delay, stats.traffic_lights as f64);
        }

        CityAnalysis {
            total_intersections: network.node_count(),
            total_roads: network.link_count(),
            total_streetlights: scenario.streetlights.len(),
            intersections_with_traffic_lights: zone_stats.values().map(|z| z.traffic_lights).sum(),
            roads_without_streetlights,
            road_stats,
            type_stats,
            zone_stats,
        }
    }

    pub fn log_summary(&self) {
        info!(
            "City: {} intersections ({} with traffic lights), {} roads, {} streetlights, {} roads without streetlights",
            self.total_intersections,
            self.intersections_with_traffic_lights,
            self.total_roads,
            self.total_streetlights,
            self.roads_without_streetlights.len()
        );
        for (road_type, stats) in &self.type_stats {
            info!(
                "    {road_type} roads: {} total, {} lights, {} lights/km, {} avg capacity",
                stats.count, stats.lights, stats.avg_lights_per_km, stats.avg_capacity
            );
        }
    }
}

/// `value / per`, rounded to two decimals. Zero if `per` is zero.
fn ratio(value: f64, per: f64) -> f64 {
    if per > 0. {
        (value / per * 100.).round() / 100.
    } else {
        0.
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use crate::simulation::analysis::CityAnalysis;
    use crate::simulation::config::{Config, Input, Modules};
    use crate::simulation::network::{LinkAttributes, Network, Streetlights, Zone};
    use crate::simulation::scenario::Scenario;

    fn scenario() -> Scenario {
        let mut network = Network::new();
        network.add_node("a", Zone::Residential, Some(0.2)).unwrap();
        network.add_node("b", Zone::Residential, Some(0.4)).unwrap();
        network.add_node("c", Zone::Park, None).unwrap();
        let major = network
            .add_link(
                "a",
                "b",
                LinkAttributes {
                    capacity: Some(600.),
                    road_type: Some("major".into()),
                    ..LinkAttributes::new(4., 2, 4.)
                },
            )
            .unwrap();
        network
            .add_link(
                "b",
                "c",
                LinkAttributes {
                    capacity: Some(200.),
                    road_type: Some("minor".into()),
                    ..LinkAttributes::new(1.5, 1, 1.5)
                },
            )
            .unwrap();
        network
            .add_link("c", "a", LinkAttributes::new(2., 1, 2.))
            .unwrap();

        let mut lights = Streetlights::default();
        for _ in 0..3 {
            lights.add(major, None);
        }

        let config = Config::new(Modules {
            input: Input {
                network: PathBuf::from("city_grid.json"),
                streetlights: PathBuf::from("streetlights.json"),
            },
            output: Default::default(),
            simulation: Default::default(),
            traffic: Default::default(),
            congestion: Default::default(),
            voltage: Default::default(),
        });
        Scenario::new(Arc::new(config), network, lights).unwrap()
    }

    #[test]
    fn totals_and_roads_without_lights() {
        let analysis = CityAnalysis::new(&scenario());

        assert_eq!(3, analysis.total_intersections);
        assert_eq!(3, analysis.total_roads);
        assert_eq!(3, analysis.total_streetlights);
        assert_eq!(2, analysis.intersections_with_traffic_lights);
        assert_eq!(
            vec![
                ("b".to_string(), "c".to_string()),
                ("c".to_string(), "a".to_string())
            ],
            analysis.roads_without_streetlights
        );

        let major = &analysis.road_stats["a→b"];
        assert_eq!(3, major.streetlights);
        assert_eq!(0.75, major.lights_per_km);
        assert_eq!(600., major.capacity);
    }

    #[test]
    fn per_type_and_zone_stats() {
        let analysis = CityAnalysis::new(&scenario());

        assert_eq!(0.75, analysis.type_stats["major"].avg_lights_per_km);
        assert_eq!(200., analysis.type_stats["minor"].avg_capacity);
        // no explicit capacity: one lane at the default capacity per lane
        let unknown = &analysis.type_stats["unknown"];
        assert_eq!(1, unknown.count);
        assert_eq!(300., unknown.avg_capacity);

        let residential = &analysis.zone_stats[&Zone::Residential];
        assert_eq!(2, residential.intersections);
        assert_eq!(2, residential.roads);
        assert_eq!(2, residential.traffic_lights);
        assert_eq!(0.3, residential.avg_traffic_light_delay);
        assert_eq!(0, analysis.zone_stats[&Zone::Park].traffic_lights);
    }

    #[test]
    fn report_uses_road_keys() {
        let json = serde_json::to_value(CityAnalysis::new(&scenario())).unwrap();
        assert_eq!(3, json["road_stats"]["a→b"]["streetlights"]);
        assert_eq!(2, json["zone_stats"]["residential"]["intersections"]);
        assert_eq!("b", json["roads_without_streetlights"][0][0]);
    }
}
