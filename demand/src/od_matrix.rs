use model::base_types::NodeIdx;
use model::network::{parse_iso_timestamp, Network};
use serde::{Deserialize, Serialize};

use std::collections::BTreeMap;

use crate::biproportional::BiproportionalFit;
use crate::errors::DemandError;
use crate::shortest_paths::{EventPair, ShortestPathIndex};

/// Sparse estimated passenger demand between event pairs.
///
/// There is an entry for every connected (origin, destination) pair with
/// origin != destination; everything else is implicitly zero demand. The
/// entries feed the objective of the scheduling model and are immutable
/// once derived.
pub struct OdMatrix {
    entries: BTreeMap<EventPair, f64>,
}

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    origin: String,
    destination: String,
    demand: f64,
}

// static functions
impl OdMatrix {
    /// demand of a pair is the product of the fitted scale factors along
    /// its shortest path
    pub fn estimate(index: &ShortestPathIndex, fit: &BiproportionalFit) -> OdMatrix {
        let entries = index
            .paths_iter()
            .map(|(pair, path)| (pair, fit.demand_along(path)))
            .collect();
        OdMatrix { entries }
    }

    /// reads a matrix previously written by [`OdMatrix::to_json`];
    /// event names must resolve against the given network
    pub fn from_json(value: &serde_json::Value, network: &Network) -> Result<OdMatrix, DemandError> {
        let cache: Vec<CacheEntry> =
            serde_json::from_value(value.clone()).map_err(|e| DemandError::InvalidCache {
                details: e.to_string(),
            })?;
        let mut entries = BTreeMap::new();
        for entry in cache {
            let origin = resolve_event(network, &entry.origin)?;
            let destination = resolve_event(network, &entry.destination)?;
            entries.insert((origin, destination), entry.demand);
        }
        Ok(OdMatrix { entries })
    }
}

// methods
impl OdMatrix {
    /// zero for pairs without a path
    pub fn demand(&self, origin: NodeIdx, destination: NodeIdx) -> f64 {
        self.entries.get(&(origin, destination)).copied().unwrap_or(0.0)
    }

    pub fn entries_iter(&self) -> impl Iterator<Item = (EventPair, f64)> + '_ {
        self.entries.iter().map(|(&pair, &demand)| (pair, demand))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// approximate number of passengers in the system; used to report the
    /// inspected share of the final schedule
    pub fn total_demand(&self) -> f64 {
        self.entries.values().sum()
    }

    pub fn to_json(&self, network: &Network) -> serde_json::Value {
        let cache: Vec<CacheEntry> = self
            .entries
            .iter()
            .map(|(&(origin, destination), &demand)| CacheEntry {
                origin: network.node_name(origin),
                destination: network.node_name(destination),
                demand,
            })
            .collect();
        serde_json::to_value(cache).expect("od-matrix serialization cannot fail")
    }
}

fn resolve_event(network: &Network, name: &str) -> Result<NodeIdx, DemandError> {
    let unknown = || DemandError::UnknownEvent {
        event: String::from(name),
    };
    let (station, timestamp) = name.split_once('@').ok_or_else(unknown)?;
    let time = parse_iso_timestamp(timestamp).ok_or_else(unknown)?;
    network.event_at(station, time).ok_or_else(unknown)
}
