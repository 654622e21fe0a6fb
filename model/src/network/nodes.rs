use rapid_time::DateTime;

use crate::base_types::{InspectorIdx, StationIdx};

/// A node of the time-expanded network.
///
/// `Event` nodes are (station, timestamp) points from the timetable.
/// `Source`/`Sink` nodes are synthetic per-inspector terminals tagged with
/// the inspector's home depot; they carry no timestamp and are not part of
/// the passenger network.
#[derive(Debug, PartialEq, Eq)]
pub enum Node {
    Event(Event),
    Source(Terminal),
    Sink(Terminal),
}

#[derive(Debug, PartialEq, Eq)]
pub struct Event {
    station: StationIdx,
    time: DateTime,
}

#[derive(Debug, PartialEq, Eq)]
pub struct Terminal {
    inspector: InspectorIdx,
    depot: StationIdx,
}

impl Event {
    pub(crate) fn new(station: StationIdx, time: DateTime) -> Event {
        Event { station, time }
    }

    pub fn station(&self) -> StationIdx {
        self.station
    }

    pub fn time(&self) -> DateTime {
        self.time
    }
}

impl Terminal {
    pub(crate) fn new(inspector: InspectorIdx, depot: StationIdx) -> Terminal {
        Terminal { inspector, depot }
    }

    pub fn inspector(&self) -> InspectorIdx {
        self.inspector
    }

    pub fn depot(&self) -> StationIdx {
        self.depot
    }
}

// methods
impl Node {
    pub fn is_event(&self) -> bool {
        matches!(self, Node::Event(_))
    }

    pub fn is_source(&self) -> bool {
        matches!(self, Node::Source(_))
    }

    pub fn is_sink(&self) -> bool {
        matches!(self, Node::Sink(_))
    }

    pub fn station(&self) -> StationIdx {
        match self {
            Node::Event(event) => event.station(),
            Node::Source(terminal) | Node::Sink(terminal) => terminal.depot(),
        }
    }

    /// timestamp of the node; None for the synthetic terminals
    pub fn time(&self) -> Option<DateTime> {
        match self {
            Node::Event(event) => Some(event.time()),
            _ => None,
        }
    }

    pub fn as_event(&self) -> &Event {
        match self {
            Node::Event(event) => event,
            _ => panic!("Node is not an event."),
        }
    }
}
