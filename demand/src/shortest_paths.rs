use itertools::Itertools;
use model::base_types::{NodeIdx, PassengerCount};
use model::network::Network;

use std::collections::{BTreeMap, HashMap, VecDeque};

/// ordered (origin, destination) pair of event nodes
pub type EventPair = (NodeIdx, NodeIdx);

/// All-pairs shortest paths over the passenger subgraph, plus for every
/// passenger-carrying arc the set of shortest paths that traverse it.
///
/// Waiting arcs and depot arcs never carry demand and are excluded before
/// the search. Paths are minimum-hop-count walks; BFS expands neighbors in
/// ascending node index, so ties between equal-hop-count alternatives
/// resolve deterministically to the first-found path and recomputing on the
/// same frozen network yields an identical index.
pub struct ShortestPathIndex {
    paths: BTreeMap<EventPair, Vec<NodeIdx>>,
    arc_paths: BTreeMap<EventPair, ArcPaths>,
}

/// observed volume of one arc together with the shortest paths crossing it
/// (stored as keys into the path table)
pub struct ArcPaths {
    observed: PassengerCount,
    paths: Vec<EventPair>,
}

impl ArcPaths {
    pub fn observed(&self) -> PassengerCount {
        self.observed
    }

    pub fn paths(&self) -> &[EventPair] {
        &self.paths
    }
}

// static functions
impl ShortestPathIndex {
    pub fn compute(network: &Network) -> ShortestPathIndex {
        let mut adjacency: HashMap<NodeIdx, Vec<NodeIdx>> = HashMap::new();
        let mut arc_paths: BTreeMap<EventPair, ArcPaths> = BTreeMap::new();

        for edge_idx in network.passenger_edges() {
            let edge = network.edge(edge_idx);
            adjacency.entry(edge.from()).or_default().push(edge.to());
            adjacency.entry(edge.to()).or_default();
            arc_paths.insert(
                (edge.from(), edge.to()),
                ArcPaths {
                    observed: edge.passengers(),
                    paths: Vec::new(),
                },
            );
        }
        // ascending neighbor order fixes the tie-break
        for neighbors in adjacency.values_mut() {
            neighbors.sort();
        }

        let mut sources: Vec<NodeIdx> = adjacency.keys().copied().collect();
        sources.sort();

        let mut paths: BTreeMap<EventPair, Vec<NodeIdx>> = BTreeMap::new();
        for &source in sources.iter() {
            for (sink, path) in bfs_paths(source, &adjacency) {
                paths.insert((source, sink), path);
            }
        }

        for ((source, sink), path) in paths.iter() {
            for (&u, &v) in path.iter().tuple_windows() {
                let entry = arc_paths
                    .get_mut(&(u, v))
                    .expect("shortest path uses an arc that is not in the passenger subgraph");
                entry.paths.push((*source, *sink));
            }
        }

        ShortestPathIndex { paths, arc_paths }
    }

    #[cfg(test)]
    pub(crate) fn from_parts(
        paths: BTreeMap<EventPair, Vec<NodeIdx>>,
        arc_paths: BTreeMap<EventPair, (PassengerCount, Vec<EventPair>)>,
    ) -> ShortestPathIndex {
        ShortestPathIndex {
            paths,
            arc_paths: arc_paths
                .into_iter()
                .map(|(arc, (observed, paths))| (arc, ArcPaths { observed, paths }))
                .collect(),
        }
    }
}

// methods
impl ShortestPathIndex {
    /// node sequence of the shortest path, if the pair is connected
    pub fn path_between(&self, origin: NodeIdx, destination: NodeIdx) -> Option<&[NodeIdx]> {
        self.paths
            .get(&(origin, destination))
            .map(|path| path.as_slice())
    }

    pub fn paths_iter(&self) -> impl Iterator<Item = (EventPair, &[NodeIdx])> + '_ {
        self.paths
            .iter()
            .map(|(&pair, path)| (pair, path.as_slice()))
    }

    pub fn arcs_iter(&self) -> impl Iterator<Item = (EventPair, &ArcPaths)> + '_ {
        self.arc_paths.iter().map(|(&arc, entry)| (arc, entry))
    }

    pub fn arc(&self, arc: EventPair) -> Option<&ArcPaths> {
        self.arc_paths.get(&arc)
    }

    pub fn number_of_arcs(&self) -> usize {
        self.arc_paths.len()
    }

    pub fn number_of_paths(&self) -> usize {
        self.paths.len()
    }
}

/// BFS from `source`; returns the first-found shortest path to every other
/// reachable node (the trivial source-to-source path is not reported)
fn bfs_paths(
    source: NodeIdx,
    adjacency: &HashMap<NodeIdx, Vec<NodeIdx>>,
) -> Vec<(NodeIdx, Vec<NodeIdx>)> {
    let mut parent: HashMap<NodeIdx, NodeIdx> = HashMap::new();
    let mut queue: VecDeque<NodeIdx> = VecDeque::new();
    queue.push_back(source);
    parent.insert(source, source);

    let mut order: Vec<NodeIdx> = Vec::new();
    while let Some(node) = queue.pop_front() {
        if let Some(neighbors) = adjacency.get(&node) {
            for &next in neighbors.iter() {
                if !parent.contains_key(&next) {
                    parent.insert(next, node);
                    queue.push_back(next);
                    order.push(next);
                }
            }
        }
    }

    order
        .into_iter()
        .map(|sink| {
            let mut path = vec![sink];
            let mut current = sink;
            while current != source {
                current = parent[&current];
                path.push(current);
            }
            path.reverse();
            (sink, path)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::input::parse_forward_star;

    fn chain_network() -> Network {
        // AA -> BB -> CC plus a waiting arc at BB
        let contents = "\
AA 2019-07-01T06:00:00 BB 2019-07-01T06:30:00 20 1800
BB 2019-07-01T06:30:00 CC 2019-07-01T07:00:00 20 1800
BB 2019-07-01T06:30:00 BB 2019-07-01T07:15:00 0 2700
";
        parse_forward_star(contents).unwrap().freeze()
    }

    #[test]
    fn index_contains_every_connected_pair_once() {
        let network = chain_network();
        let index = ShortestPathIndex::compute(&network);

        // AA->BB, BB->CC, AA->CC; no self pairs, nothing into AA
        assert_eq!(index.number_of_paths(), 3);
        assert_eq!(index.number_of_arcs(), 2);

        let aa = network.events_at(network.stations().get("AA").unwrap())[0];
        let cc = network.events_at(network.stations().get("CC").unwrap())[0];
        let path = index.path_between(aa, cc).unwrap();
        assert_eq!(path.len(), 3);
        assert!(index.path_between(cc, aa).is_none());
        assert!(index.path_between(aa, aa).is_none());
    }

    #[test]
    fn every_indexed_path_contains_its_arc_as_consecutive_pair() {
        let network = chain_network();
        let index = ShortestPathIndex::compute(&network);

        for ((u, v), entry) in index.arcs_iter() {
            assert!(entry.observed() > 0);
            assert!(!entry.paths().is_empty());
            for &pair in entry.paths() {
                let path = index.path_between(pair.0, pair.1).unwrap();
                assert!(
                    path.windows(2).any(|w| w[0] == u && w[1] == v),
                    "path {:?} does not contain arc ({}, {})",
                    path,
                    u,
                    v
                );
            }
        }
    }

    #[test]
    fn waiting_arcs_are_not_indexed() {
        let network = chain_network();
        let index = ShortestPathIndex::compute(&network);
        let bb_events = network.events_at(network.stations().get("BB").unwrap());
        assert_eq!(bb_events.len(), 2);
        assert!(index.arc((bb_events[0], bb_events[1])).is_none());
    }

    #[test]
    fn recomputation_is_idempotent() {
        let network = chain_network();
        let first = ShortestPathIndex::compute(&network);
        let second = ShortestPathIndex::compute(&network);

        assert_eq!(first.number_of_paths(), second.number_of_paths());
        for ((pair, path), (other_pair, other_path)) in
            first.paths_iter().zip(second.paths_iter())
        {
            assert_eq!(pair, other_pair);
            assert_eq!(path, other_path);
        }
        for ((arc, entry), (other_arc, other_entry)) in
            first.arcs_iter().zip(second.arcs_iter())
        {
            assert_eq!(arc, other_arc);
            assert_eq!(entry.observed(), other_entry.observed());
            assert_eq!(entry.paths(), other_entry.paths());
        }
    }
}
