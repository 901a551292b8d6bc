use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::simulation::error::Result;

/// One streetlight as exported by the grid generator. The generator writes drawing
/// coordinates (x, y); a relative position along the road is optional.
#[derive(Debug, Deserialize, Serialize, PartialEq, Clone)]
pub struct IOStreetlight {
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub position: Option<f64>,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub y: Option<f64>,
}

pub fn load_streetlights(file_path: &Path) -> Result<Vec<IOStreetlight>> {
    info!("Loading streetlights from {file_path:?}");
    let reader = BufReader::new(File::open(file_path)?);
    let lights: Vec<IOStreetlight> = serde_json::from_reader(reader)?;
    Ok(lights)
}
