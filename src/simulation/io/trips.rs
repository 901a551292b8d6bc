use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::simulation::error::Result;
use crate::simulation::io::create_parent_dirs;
use crate::simulation::network::Network;
use crate::simulation::traffic::Trip;

pub const VEHICLES_LOG: &str = "vehicles_log.csv";
pub const PEDESTRIANS_LOG: &str = "pedestrians_log.csv";

/// One row of a trip log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TripRecord {
    pub id: String,
    #[serde(rename = "type")]
    pub trip_type: String,
    pub weight: u32,
    pub from: String,
    pub to: String,
    pub path: String,
    pub hour: u32,
    pub day: u32,
    pub congestion_penalty: f64,
}

impl TripRecord {
    pub fn new(network: &Network, trip: &Trip) -> Self {
        TripRecord {
            id: trip.id.clone(),
            trip_type: trip.type_name().to_string(),
            weight: trip.weight(),
            from: network.node_name(trip.origin).to_string(),
            to: network.node_name(trip.destination).to_string(),
            path: trip.path.format(network),
            hour: trip.slice.hour,
            day: trip.slice.day,
            congestion_penalty: (trip.congestion_penalty * 100.).round() / 100.,
        }
    }
}

struct LogFile {
    writer: csv::Writer<File>,
    partial: PathBuf,
    target: PathBuf,
}

impl LogFile {
    fn create(target: PathBuf) -> Result<Self> {
        create_parent_dirs(&target)?;
        let mut partial = target.clone().into_os_string();
        partial.push(".partial");
        let partial = PathBuf::from(partial);
        let writer = csv::Writer::from_path(&partial)?;
        Ok(LogFile {
            writer,
            partial,
            target,
        })
    }

    fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        drop(self.writer);
        fs::rename(&self.partial, &self.target)?;
        Ok(())
    }
}

/// Appends the trips of every slice to the vehicle and pedestrian logs. The logs only get
/// their final names once [`TripLogWriter::finish`] is called, so an aborted run leaves
/// `*.csv.partial` files behind.
pub struct TripLogWriter {
    vehicles: LogFile,
    pedestrians: LogFile,
    written: usize,
}

impl TripLogWriter {
    pub fn new(output_dir: &Path) -> Result<Self> {
        Ok(TripLogWriter {
            vehicles: LogFile::create(output_dir.join(VEHICLES_LOG))?,
            pedestrians: LogFile::create(output_dir.join(PEDESTRIANS_LOG))?,
            written: 0,
        })
    }

    pub fn write_slice(&mut self, network: &Network, trips: &[Trip]) -> Result<()> {
        for trip in trips {
            let log = if trip.is_vehicle() {
                &mut self.vehicles
            } else {
                &mut self.pedestrians
            };
            log.writer.serialize(TripRecord::new(network, trip))?;
        }
        self.vehicles.writer.flush()?;
        self.pedestrians.writer.flush()?;
        self.written += trips.len();
        Ok(())
    }

    pub fn finish(self) -> Result<()> {
        debug!("Finishing trip logs with {} trips", self.written);
        self.vehicles.finish()?;
        self.pedestrians.finish()
    }
}

pub fn read_trip_log(file_path: &Path) -> Result<Vec<TripRecord>> {
    let mut reader = csv::Reader::from_path(file_path)?;
    let records = reader.deserialize().collect::<std::result::Result<Vec<TripRecord>, _>>()?;
    Ok(records)
}
