use rapid_time::Duration;
use serde::Deserialize;

use std::fs;
use std::io;

use crate::base_types::InspectorIdx;
use crate::errors::ModelError;
use crate::inspectors::{Inspector, Inspectors};
use crate::network::{Network, NetworkBuilder};
use crate::stations::Stations;

/// Parses a forward-star arc file into a network builder.
///
/// One arc per line:
/// `from_station from_time to_station to_time passengers travel_time_seconds`
/// with ISO timestamps. Blank lines are skipped.
pub fn parse_forward_star(contents: &str) -> Result<NetworkBuilder, ModelError> {
    let mut builder = NetworkBuilder::new();
    for (i, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        builder.add_edge_record(line, i + 1)?;
    }
    Ok(builder)
}

pub fn load_forward_star_file(path: &str) -> Result<NetworkBuilder, ModelError> {
    let contents = fs::read_to_string(path)?;
    parse_forward_star(&contents)
}

#[derive(Debug, Deserialize)]
struct InspectorRecord {
    #[serde(rename = "Inspector_ID")]
    inspector_id: String,
    #[serde(rename = "Depot")]
    depot: String,
    #[serde(rename = "Max_Hours")]
    max_hours: u32,
}

/// Reads the inspector roster (`Inspector_ID,Depot,Max_Hours`).
///
/// Depot stations are interned even when they never appear in the
/// timetable; such isolated depots are surfaced later as warnings, not
/// errors.
pub fn read_inspectors<R: io::Read>(
    reader: R,
    stations: &mut Stations,
) -> Result<Inspectors, ModelError> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut inspectors = Vec::new();
    for record in csv_reader.deserialize() {
        let record: InspectorRecord = record?;
        let depot = stations.intern(&record.depot);
        inspectors.push(Inspector::new(
            InspectorIdx::from(inspectors.len() as u32),
            record.inspector_id,
            depot,
            Duration::from_seconds(u64::from(record.max_hours) * 3600),
        ));
    }
    Ok(Inspectors::new(inspectors))
}

pub fn load_inspectors_file(
    path: &str,
    stations: &mut Stations,
) -> Result<Inspectors, ModelError> {
    let file = fs::File::open(path)?;
    read_inspectors(file, stations)
}

/// Full two-phase load: base graph from the arc file, roster from the CSV,
/// depot terminals attached, network frozen.
pub fn load_instance(
    arcs_path: &str,
    inspectors_path: &str,
) -> Result<(Network, Inspectors), ModelError> {
    let mut builder = load_forward_star_file(arcs_path)?;
    let inspectors = load_inspectors_file(inspectors_path, builder.stations_mut())?;
    builder.add_depot_terminals(&inspectors);
    Ok((builder.freeze(), inspectors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapid_time::DateTime;

    #[test]
    fn forward_star_parsing_skips_blank_lines() {
        let contents = "\
AA 2019-07-01T06:00:00 BB 2019-07-01T06:30:00 10 1800

BB 2019-07-01T06:30:00 CC 2019-07-01T07:00:00 6 1800
";
        let network = parse_forward_star(contents).unwrap().freeze();
        assert_eq!(network.number_of_nodes(), 3);
        assert_eq!(network.number_of_edges(), 2);
        assert!(network
            .event_at("CC", DateTime::new("2019-07-01T07:00:00"))
            .is_some());
    }

    #[test]
    fn forward_star_parsing_reports_the_offending_line() {
        let contents = "\
AA 2019-07-01T06:00:00 BB 2019-07-01T06:30:00 10 1800
BB 2019-07-01T06:30:00 CC 7am 6 1800
";
        let err = parse_forward_star(contents).unwrap_err();
        assert!(matches!(err, ModelError::InvalidTimestamp { line: 2, .. }));
    }

    #[test]
    fn roster_reading_interns_unknown_depots() {
        let csv = "Inspector_ID,Depot,Max_Hours\nI1,AA,8\nI2,ZZ,6\n";
        let mut stations = Stations::new();
        stations.intern("AA");
        let inspectors = read_inspectors(csv.as_bytes(), &mut stations).unwrap();

        assert_eq!(inspectors.len(), 2);
        let second = inspectors.get(InspectorIdx::from(1));
        assert_eq!(second.name(), "I2");
        assert_eq!(stations.name(second.depot()), "ZZ");
        assert_eq!(second.max_working_time(), Duration::from_seconds(6 * 3600));
    }
}
