use std::sync::Arc;

use tracing::info;

use crate::simulation::config::Config;
use crate::simulation::error::Result;
use crate::simulation::io;
use crate::simulation::io::streetlights::load_streetlights;
use crate::simulation::network::{Network, Streetlights};

/// The inputs of one run. Everything in here is read-only while the simulation runs.
#[derive(Debug)]
pub struct Scenario {
    pub network: Arc<Network>,
    pub streetlights: Arc<Streetlights>,
    pub config: Arc<Config>,
}

impl Scenario {
    /// Loads the city graph and the streetlights named in the config. Fails if the config is
    /// invalid, the graph is empty or exceeds the configured bounds, or a streetlight sits on
    /// a road that does not exist.
    pub fn load(config: Arc<Config>) -> Result<Self> {
        config.validate()?;
        info!("Start loading scenario.");

        let net_in_path = io::resolve_path(config.context(), &config.input().network);
        let network = Network::from_file(&net_in_path)?;

        let lights_in_path = io::resolve_path(config.context(), &config.input().streetlights);
        let streetlights = Streetlights::from_io(&network, load_streetlights(&lights_in_path)?)?;

        Self::new(config, network, streetlights)
    }

    /// Creates a scenario from inputs that are already in memory.
    pub fn new(config: Arc<Config>, network: Network, streetlights: Streetlights) -> Result<Self> {
        config.validate()?;
        let simulation = config.simulation();
        network.validate(simulation.max_nodes, simulation.max_links)?;

        info!(
            "Loaded scenario with {} intersections, {} roads and {} streetlights.",
            network.node_count(),
            network.link_count(),
            streetlights.len()
        );

        Ok(Scenario {
            network: Arc::new(network),
            streetlights: Arc::new(streetlights),
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use crate::simulation::config::{Config, Input, Modules, Simulation};
    use crate::simulation::error::SimError;
    use crate::simulation::network::{LinkAttributes, Network, Streetlights, Zone};
    use crate::simulation::scenario::Scenario;

    fn config(simulation: Simulation) -> Arc<Config> {
        Arc::new(Config::new(Modules {
            input: Input {
                network: PathBuf::from("city_grid.json"),
                streetlights: PathBuf::from("streetlights.json"),
            },
            output: Default::default(),
            simulation,
            traffic: Default::default(),
            congestion: Default::default(),
            voltage: Default::default(),
        }))
    }

    #[test]
    fn empty_graph_is_rejected() {
        let result = Scenario::new(
            config(Simulation::default()),
            Network::new(),
            Streetlights::default(),
        );
        assert!(matches!(result, Err(SimError::InvalidGraph(_))));
    }

    #[test]
    fn graph_bounds_are_checked() {
        let mut network = Network::new();
        network.add_node("a", Zone::Park, None).unwrap();
        network.add_node("b", Zone::Park, None).unwrap();
        network
            .add_link("a", "b", LinkAttributes::new(1., 1, 1.))
            .unwrap();

        let simulation = Simulation {
            max_links: Some(0),
            ..Simulation::default()
        };
        let result = Scenario::new(config(simulation), network, Streetlights::default());
        assert!(matches!(result, Err(SimError::InvalidGraph(_))));
    }

    #[test]
    fn unvalidated_config_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.yml");
        std::fs::write(
            &config_path,
            r#"
modules:
  input:
    network: city_grid.json
    streetlights: streetlights.json
  traffic:
    hour_multipliers:
      weekday: [0.3, 0.3, 0.3]
      weekend: [0.6, 0.6, 0.6]
  voltage:
    min_voltage: 30
    max_voltage: 100
    smoothing:
      type: Exponential
      alpha: 0.5
"#,
        )
        .unwrap();

        let config = Config::from_file(&config_path).unwrap();
        let result = Scenario::load(Arc::new(config));
        assert!(matches!(result, Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn zero_saturation_load_is_rejected() {
        let mut config = config(Simulation::default()).as_ref().clone();
        config.modules.voltage.saturation_load = 0.;

        let mut network = Network::new();
        network.add_node("a", Zone::Park, None).unwrap();
        network.add_node("b", Zone::Park, None).unwrap();
        network
            .add_link("a", "b", LinkAttributes::new(1., 1, 1.))
            .unwrap();

        let result = Scenario::new(Arc::new(config), network, Streetlights::default());
        assert!(matches!(result, Err(SimError::InvalidConfig(_))));
    }

    #[test]
    fn missing_input_file() {
        let result = Scenario::load(config(Simulation::default()));
        assert!(matches!(result, Err(SimError::Io(_))));
    }
}
