use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use crate::simulation::error::Result;
use crate::simulation::io::create_parent_dirs;
use crate::simulation::voltage::VoltageSchedule;

pub const SCHEDULE_JSON: &str = "voltage_schedule.json";
pub const SCHEDULE_CSV: &str = "voltage_schedule.csv";
pub const ROAD_SCHEDULE_JSON: &str = "smoothed_voltage_schedule.json";

pub fn write_json<T: Serialize + ?Sized>(value: &T, file_path: &Path) -> Result<()> {
    create_parent_dirs(file_path)?;
    let writer = BufWriter::new(File::create(file_path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

/// Writes the schedule as JSON list, as flat CSV table and as the nested per-road view.
pub fn write_schedule(schedule: &VoltageSchedule, output_dir: &Path) -> Result<()> {
    info!("Writing voltage schedule to {output_dir:?}");
    write_json(schedule.entries(), &output_dir.join(SCHEDULE_JSON))?;
    write_schedule_csv(schedule, &output_dir.join(SCHEDULE_CSV))?;
    write_json(&schedule.by_road(), &output_dir.join(ROAD_SCHEDULE_JSON))
}

pub fn write_schedule_csv(schedule: &VoltageSchedule, file_path: &Path) -> Result<()> {
    create_parent_dirs(file_path)?;
    let mut writer = csv::Writer::from_path(file_path)?;
    for entry in schedule.entries() {
        writer.serialize(entry)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::simulation::io::schedule::{write_schedule, ROAD_SCHEDULE_JSON, SCHEDULE_CSV, SCHEDULE_JSON};
    use crate::simulation::voltage::{ScheduleEntry, VoltageSchedule};

    #[test]
    fn write_all_formats() {
        let schedule = VoltageSchedule::new(vec![ScheduleEntry {
            streetlight_id: "sl_00001".to_string(),
            from: "A1".to_string(),
            to: "A2".to_string(),
            day: 1,
            hour: 22,
            raw_voltage: 44.,
            smoothed_voltage: 40.,
        }]);
        let dir = tempfile::tempdir().unwrap();
        write_schedule(&schedule, dir.path()).unwrap();

        let json = fs::read_to_string(dir.path().join(SCHEDULE_JSON)).unwrap();
        let entries: Vec<ScheduleEntry> = serde_json::from_str(&json).unwrap();
        assert_eq!(schedule.entries(), entries.as_slice());

        let csv = fs::read_to_string(dir.path().join(SCHEDULE_CSV)).unwrap();
        let mut lines = csv.lines();
        assert_eq!(
            Some("streetlight_id,from,to,day,hour,raw_voltage,smoothed_voltage"),
            lines.next()
        );
        assert_eq!(Some("sl_00001,A1,A2,1,22,44.0,40.0"), lines.next());

        let nested: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join(ROAD_SCHEDULE_JSON)).unwrap())
                .unwrap();
        assert_eq!(40., nested["A1"]["A2"]["22"].as_f64().unwrap());
    }
}
