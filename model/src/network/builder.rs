use rapid_time::{DateTime, Duration};

use std::collections::{BTreeMap, HashMap};

use super::nodes::{Event, Node, Terminal};
use super::{Edge, Network};
use crate::base_types::{EdgeIdx, InspectorIdx, NodeIdx, PassengerCount, StationIdx};
use crate::errors::ModelError;
use crate::inspectors::Inspectors;
use crate::stations::Stations;

/// Mutable first phase of the network.
///
/// Records are upserted one by one, the depot terminals are attached once,
/// and `freeze` then consumes the builder into the read-only [`Network`].
#[derive(Debug)]
pub struct NetworkBuilder {
    stations: Stations,
    nodes: Vec<Node>,
    event_lookup: BTreeMap<(StationIdx, DateTime), NodeIdx>,
    edges: Vec<Edge>,
    edge_lookup: HashMap<(NodeIdx, NodeIdx), EdgeIdx>,
    terminals: HashMap<InspectorIdx, (NodeIdx, NodeIdx)>,
}

// static functions
impl NetworkBuilder {
    pub fn new() -> NetworkBuilder {
        NetworkBuilder {
            stations: Stations::new(),
            nodes: Vec::new(),
            event_lookup: BTreeMap::new(),
            edges: Vec::new(),
            edge_lookup: HashMap::new(),
            terminals: HashMap::new(),
        }
    }
}

impl Default for NetworkBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// methods
impl NetworkBuilder {
    pub fn stations(&self) -> &Stations {
        &self.stations
    }

    /// Depots without timetable events still need a station index, so the
    /// roster loader can intern them here before the freeze.
    pub fn stations_mut(&mut self) -> &mut Stations {
        &mut self.stations
    }

    /// one line of the forward-star arc file:
    /// `from_station from_time to_station to_time passengers travel_time_seconds`
    pub fn add_edge_record(&mut self, line: &str, line_number: usize) -> Result<(), ModelError> {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() != 6 {
            return Err(ModelError::InvalidEdgeRecord {
                line: line_number,
                found: fields.len(),
            });
        }

        let departure = parse_timestamp(line_number, fields[1])?;
        let arrival = parse_timestamp(line_number, fields[3])?;
        let passengers = parse_count(line_number, fields[4], "passenger count")?;
        let travel_seconds = parse_count(line_number, fields[5], "travel time")?;

        self.add_travel_edge(
            fields[0],
            departure,
            fields[2],
            arrival,
            passengers,
            Duration::from_seconds(travel_seconds),
        );
        Ok(())
    }

    /// Upserts both endpoint events and inserts the arc unless the ordered
    /// (from, to) pair is already present (first occurrence wins).
    /// Returns the new arc, or None for an ignored duplicate.
    pub fn add_travel_edge(
        &mut self,
        from_station: &str,
        departure: DateTime,
        to_station: &str,
        arrival: DateTime,
        passengers: PassengerCount,
        travel_time: Duration,
    ) -> Option<EdgeIdx> {
        let from = self.upsert_event(from_station, departure);
        let to = self.upsert_event(to_station, arrival);
        self.insert_edge(from, to, passengers, travel_time)
    }

    /// Attaches one source and one sink node per inspector to every
    /// timestamped event at the inspector's home depot (zero passengers,
    /// zero travel time). Must be called exactly once per inspector, after
    /// all travel edges are in place.
    pub fn add_depot_terminals(&mut self, inspectors: &Inspectors) {
        for inspector in inspectors.iter() {
            assert!(
                !self.terminals.contains_key(&inspector),
                "depot terminals were already added for {}",
                inspector
            );
            let depot = inspectors.get(inspector).depot();
            let depot_events: Vec<NodeIdx> = self
                .event_lookup
                .range((depot, DateTime::Earliest)..=(depot, DateTime::Latest))
                .map(|(_, &node)| node)
                .collect();

            if depot_events.is_empty() {
                log::warn!(
                    "depot '{}' of {} has no timetable events; the inspector can only receive the empty route",
                    self.stations.name(depot),
                    inspectors.get(inspector)
                );
            }

            let source = self.push_node(Node::Source(Terminal::new(inspector, depot)));
            let sink = self.push_node(Node::Sink(Terminal::new(inspector, depot)));
            self.terminals.insert(inspector, (source, sink));

            for event in depot_events {
                self.insert_edge(source, event, 0, Duration::from_seconds(0));
                self.insert_edge(event, sink, 0, Duration::from_seconds(0));
            }
        }
    }

    /// consumes the builder; the resulting network is immutable
    pub fn freeze(self) -> Network {
        let mut outgoing: Vec<Vec<EdgeIdx>> = vec![Vec::new(); self.nodes.len()];
        let mut incoming: Vec<Vec<EdgeIdx>> = vec![Vec::new(); self.nodes.len()];
        for (i, edge) in self.edges.iter().enumerate() {
            let idx = EdgeIdx::from(i as u32);
            outgoing[edge.from().idx()].push(idx);
            incoming[edge.to().idx()].push(idx);
        }

        let mut events_of_station: Vec<Vec<NodeIdx>> = vec![Vec::new(); self.stations.len()];
        // event_lookup is ordered by (station, time), so these lists come out
        // sorted by time
        for (&(station, _), &node) in self.event_lookup.iter() {
            events_of_station[station.idx()].push(node);
        }

        let first_event_time = self
            .event_lookup
            .keys()
            .map(|&(_, time)| time)
            .min()
            .unwrap_or(DateTime::Earliest);

        Network {
            nodes: self.nodes,
            edges: self.edges,
            edge_lookup: self.edge_lookup,
            outgoing,
            incoming,
            events_of_station,
            terminals: self.terminals,
            stations: self.stations,
            first_event_time,
        }
    }

    fn upsert_event(&mut self, station: &str, time: DateTime) -> NodeIdx {
        let station = self.stations.intern(station);
        if let Some(&node) = self.event_lookup.get(&(station, time)) {
            return node;
        }
        let node = self.push_node(Node::Event(Event::new(station, time)));
        self.event_lookup.insert((station, time), node);
        node
    }

    fn push_node(&mut self, node: Node) -> NodeIdx {
        let idx = NodeIdx::from(self.nodes.len() as u32);
        self.nodes.push(node);
        idx
    }

    fn insert_edge(
        &mut self,
        from: NodeIdx,
        to: NodeIdx,
        passengers: PassengerCount,
        travel_time: Duration,
    ) -> Option<EdgeIdx> {
        if self.edge_lookup.contains_key(&(from, to)) {
            return None;
        }
        let idx = EdgeIdx::from(self.edges.len() as u32);
        self.edges.push(Edge::new(from, to, passengers, travel_time));
        self.edge_lookup.insert((from, to), idx);
        Some(idx)
    }
}

fn parse_timestamp(line: usize, value: &str) -> Result<DateTime, ModelError> {
    parse_iso_timestamp(value).ok_or_else(|| ModelError::InvalidTimestamp {
        line,
        value: String::from(value),
    })
}

/// strict "YYYY-MM-DDTHH:MM" or "YYYY-MM-DDTHH:MM:SS"; None on anything else
pub fn parse_iso_timestamp(value: &str) -> Option<DateTime> {
    let fields: Vec<&str> = value.split(&['-', 'T', ' ', ':'][..]).collect();
    if fields.len() < 5 || fields.len() > 6 {
        return None;
    }
    let numbers: Vec<u32> = fields
        .iter()
        .map(|f| f.parse::<u32>().ok())
        .collect::<Option<_>>()?;

    let (year, month, day, hour, minute) = (
        numbers[0], numbers[1], numbers[2], numbers[3], numbers[4],
    );
    let second = numbers.get(5).copied().unwrap_or(0);
    if !(1..=12).contains(&month)
        || !(1..=days_in_month(year, month)).contains(&day)
        || hour > 23
        || minute > 59
        || second > 59
    {
        return None;
    }

    Some(DateTime::new(value))
}

fn parse_count(line: usize, value: &str, field: &'static str) -> Result<u64, ModelError> {
    value.parse::<u64>().map_err(|_| ModelError::InvalidNumber {
        line,
        value: String::from(value),
        field,
    })
}

fn days_in_month(year: u32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if year % 4 == 0 && (year % 100 != 0 || year % 400 == 0) {
                29
            } else {
                28
            }
        }
        _ => 0,
    }
}
