mod builder;
pub mod nodes;

pub use builder::{parse_iso_timestamp, NetworkBuilder};

use nodes::Node;
use rapid_time::{DateTime, Duration};

use std::collections::HashMap;

use crate::base_types::{EdgeIdx, InspectorIdx, NodeIdx, PassengerCount, StationIdx};
use crate::stations::Stations;

/// A directed travel or waiting segment between two nodes.
/// Zero passengers marks a waiting arc (or a synthetic depot arc).
#[derive(Debug, PartialEq, Eq)]
pub struct Edge {
    from: NodeIdx,
    to: NodeIdx,
    passengers: PassengerCount,
    travel_time: Duration,
}

impl Edge {
    pub(crate) fn new(
        from: NodeIdx,
        to: NodeIdx,
        passengers: PassengerCount,
        travel_time: Duration,
    ) -> Edge {
        Edge {
            from,
            to,
            passengers,
            travel_time,
        }
    }

    pub fn from(&self) -> NodeIdx {
        self.from
    }

    pub fn to(&self) -> NodeIdx {
        self.to
    }

    pub fn passengers(&self) -> PassengerCount {
        self.passengers
    }

    pub fn travel_time(&self) -> Duration {
        self.travel_time
    }

    /// travel time in whole seconds
    pub fn travel_seconds(&self) -> u64 {
        self.travel_time.in_sec().expect("travel times are finite")
    }
}

/// The frozen time-expanded network.
///
/// Created by consuming a [`NetworkBuilder`]; there is no mutating API, so
/// the builder's two phases (base construction, depot augmentation) are the
/// only points where the graph can change.
pub struct Network {
    nodes: Vec<Node>,
    edges: Vec<Edge>,
    edge_lookup: HashMap<(NodeIdx, NodeIdx), EdgeIdx>,
    outgoing: Vec<Vec<EdgeIdx>>,
    incoming: Vec<Vec<EdgeIdx>>,
    events_of_station: Vec<Vec<NodeIdx>>, // indexed by StationIdx, sorted by time
    terminals: HashMap<InspectorIdx, (NodeIdx, NodeIdx)>, // (source, sink)
    stations: Stations,
    first_event_time: DateTime, // reference point for second offsets
}

// methods
impl Network {
    pub fn node(&self, node: NodeIdx) -> &Node {
        &self.nodes[node.idx()]
    }

    pub fn number_of_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn number_of_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes_iter(&self) -> impl Iterator<Item = NodeIdx> + '_ {
        (0..self.nodes.len() as u32).map(NodeIdx::from)
    }

    pub fn event_nodes(&self) -> impl Iterator<Item = NodeIdx> + '_ {
        self.nodes_iter().filter(move |&n| self.node(n).is_event())
    }

    pub fn edge(&self, edge: EdgeIdx) -> &Edge {
        &self.edges[edge.idx()]
    }

    pub fn edges_iter(&self) -> impl Iterator<Item = EdgeIdx> + '_ {
        (0..self.edges.len() as u32).map(EdgeIdx::from)
    }

    pub fn edge_between(&self, from: NodeIdx, to: NodeIdx) -> Option<EdgeIdx> {
        self.edge_lookup.get(&(from, to)).copied()
    }

    /// arcs that actually carry passengers, i.e. the demand subgraph;
    /// waiting arcs and synthetic depot arcs are excluded
    pub fn passenger_edges(&self) -> impl Iterator<Item = EdgeIdx> + '_ {
        self.edges_iter().filter(move |&e| {
            let edge = self.edge(e);
            edge.passengers() > 0
                && self.node(edge.from()).is_event()
                && self.node(edge.to()).is_event()
        })
    }

    pub fn outgoing_edges(&self, node: NodeIdx) -> &[EdgeIdx] {
        &self.outgoing[node.idx()]
    }

    pub fn incoming_edges(&self, node: NodeIdx) -> &[EdgeIdx] {
        &self.incoming[node.idx()]
    }

    /// timestamped events at a station, sorted by time; empty for stations
    /// without any timetable event (isolated depots)
    pub fn events_at(&self, station: StationIdx) -> &[NodeIdx] {
        &self.events_of_station[station.idx()]
    }

    pub fn source_of(&self, inspector: InspectorIdx) -> NodeIdx {
        self.terminals[&inspector].0
    }

    pub fn sink_of(&self, inspector: InspectorIdx) -> NodeIdx {
        self.terminals[&inspector].1
    }

    pub fn stations(&self) -> &Stations {
        &self.stations
    }

    /// seconds between the first event of the timetable and the given time;
    /// used as linear coefficients in the working-hours constraint
    pub fn seconds_since_start(&self, time: DateTime) -> u64 {
        (time - self.first_event_time)
            .in_sec()
            .expect("event offsets are finite")
    }

    pub fn node_name(&self, node: NodeIdx) -> String {
        match self.node(node) {
            Node::Event(event) => format!(
                "{}@{}",
                self.stations.name(event.station()),
                event.time().as_iso()
            ),
            Node::Source(terminal) => format!("source_{}", terminal.inspector()),
            Node::Sink(terminal) => format!("sink_{}", terminal.inspector()),
        }
    }

    /// event node for a station name and timestamp, if present
    pub fn event_at(&self, station: &str, time: DateTime) -> Option<NodeIdx> {
        let station = self.stations.get(station)?;
        self.events_at(station)
            .iter()
            .copied()
            .find(|&n| self.node(n).time() == Some(time))
    }
}
