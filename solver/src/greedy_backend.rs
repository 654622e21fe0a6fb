use model::base_types::{EdgeIdx, InspectorIdx, NodeIdx, PassengerCount};
use model::inspectors::Inspectors;
use model::network::Network;

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::flow_model::{flow_vars_of, FlowModel, VariableId, HEADCOUNT_CONSTRAINT};
use crate::milp::{Assignment, MilpSolver, SolveError};

/// A greedy stand-in for an external mixed-integer solver.
///
/// Routes inspectors one at a time, each along the arcs with the most
/// not-yet-covered passengers that still allow a return to the depot within
/// the working-hour budget. Honors the warm-start protocol: inspectors whose
/// departure arcs are pinned to zero stay home, inspectors with a cached
/// route keep it. Every returned assignment satisfies all model rows, it is
/// just not necessarily optimal.
pub struct GreedyBackend {
    network: Arc<Network>,
    inspectors: Arc<Inspectors>,
}

pub struct GreedyModel {
    model: FlowModel,
    headcount: f64,
}

impl GreedyModel {
    pub fn flow_model(&self) -> &FlowModel {
        &self.model
    }
}

// static functions
impl GreedyBackend {
    pub fn new(network: Arc<Network>, inspectors: Arc<Inspectors>) -> GreedyBackend {
        GreedyBackend {
            network,
            inspectors,
        }
    }
}

impl MilpSolver for GreedyBackend {
    type Model = GreedyModel;

    fn submit_model(&mut self, model: FlowModel) -> GreedyModel {
        let headcount = model
            .constraint(HEADCOUNT_CONSTRAINT)
            .map(|c| c.rhs())
            .unwrap_or(self.inspectors.len() as f64);
        GreedyModel { model, headcount }
    }

    fn update_bound(
        &mut self,
        model: &mut GreedyModel,
        constraint: &str,
        rhs: f64,
    ) -> Result<(), SolveError> {
        if !model.model.set_constraint_rhs(constraint, rhs) {
            return Err(SolveError::UnknownConstraint {
                name: String::from(constraint),
            });
        }
        if constraint == HEADCOUNT_CONSTRAINT {
            model.headcount = rhs;
        }
        Ok(())
    }

    fn solve(
        &mut self,
        model: &GreedyModel,
        warm_start: &Assignment,
    ) -> Result<Assignment, SolveError> {
        let network = &self.network;
        let mut assignment = Assignment::empty();
        let mut covered: HashSet<EdgeIdx> = HashSet::new();
        let mut routed = 0usize;
        let mut free: Vec<InspectorIdx> = Vec::new();

        for inspector in self.inspectors.iter() {
            let source = network.source_of(inspector);
            let departures: Vec<VariableId> = network
                .outgoing_edges(source)
                .iter()
                .map(|&e| {
                    let edge = network.edge(e);
                    VariableId::Flow {
                        from: edge.from(),
                        to: edge.to(),
                        inspector,
                    }
                })
                .collect();
            if departures.is_empty() {
                // isolated depot, nothing to route
                continue;
            }
            let warm_outflow: f64 = departures.iter().map(|id| warm_start.value(id)).sum();
            if warm_outflow >= 0.5 {
                // keep the cached route unchanged
                for id in flow_vars_of(network, inspector) {
                    if warm_start.value(&id) > 0.5 {
                        assignment.set(id, 1.0);
                        if let VariableId::Flow { from, to, .. } = id {
                            if let Some(e) = network.edge_between(from, to) {
                                covered.insert(e);
                            }
                        }
                    }
                }
                routed += 1;
            } else if !departures.iter().all(|id| warm_start.contains(id)) {
                free.push(inspector);
            }
        }

        if routed as f64 > model.headcount + 0.5 {
            return Err(SolveError::Infeasible {
                bound: model.headcount,
            });
        }

        let budget = ((model.headcount + 1e-9).floor() as usize).saturating_sub(routed);
        free.sort_by_key(|&k| (Reverse(self.inspectors.get(k).max_working_time()), k));
        for inspector in free.into_iter().take(budget) {
            if let Some(route) = self.route_for(inspector, &covered) {
                for window in route.windows(2) {
                    assignment.set(
                        VariableId::Flow {
                            from: window[0],
                            to: window[1],
                            inspector,
                        },
                        1.0,
                    );
                    if let Some(e) = network.edge_between(window[0], window[1]) {
                        covered.insert(e);
                    }
                }
            }
        }

        // read the inspected portions off the linking rows
        for constraint in model.model.constraints_iter() {
            let portion = constraint
                .terms()
                .iter()
                .find(|(id, _)| matches!(id, VariableId::InspectedPortion { .. }));
            if let Some(&(id, _)) = portion {
                let coverage: f64 = constraint
                    .terms()
                    .iter()
                    .filter(|(id, _)| matches!(id, VariableId::Flow { .. }))
                    .map(|(id, coefficient)| -coefficient * assignment.value(id))
                    .sum();
                assignment.set(id, coverage.clamp(0.0, 1.0));
            }
        }

        Ok(assignment)
    }
}

// methods
impl GreedyBackend {
    /// greedy walk from the inspector's depot: always take the arc with the
    /// most uncovered passengers that still permits returning home in time
    fn route_for(&self, inspector: InspectorIdx, covered: &HashSet<EdgeIdx>) -> Option<Vec<NodeIdx>> {
        let network = &self.network;
        let source = network.source_of(inspector);
        let sink = network.sink_of(inspector);
        let budget = self.inspectors.get(inspector).max_working_seconds();

        // earliest departure leaves the most of the day usable
        let start = network
            .outgoing_edges(source)
            .iter()
            .map(|&e| network.edge(e).to())
            .min_by_key(|&n| network.node(n).as_event().time())?;
        let start_offset = network.seconds_since_start(network.node(start).as_event().time());
        let deadline = start_offset + budget;

        let way_home = self.return_table(sink);

        let mut route = vec![source, start];
        let mut current = start;
        for _ in 0..network.number_of_edges() {
            let current_time = network.node(current).as_event().time();
            let mut best: Option<(PassengerCount, u64, NodeIdx)> = None;
            for &e in network.outgoing_edges(current) {
                let edge = network.edge(e);
                if !network.node(edge.to()).is_event() {
                    continue;
                }
                let arrival = network.node(edge.to()).as_event().time();
                if arrival <= current_time {
                    continue;
                }
                match way_home.get(&edge.to()) {
                    Some(&(completion, _)) if completion <= deadline => {}
                    _ => continue,
                }
                let value = if covered.contains(&e) { 0 } else { edge.passengers() };
                let arrival_offset = network.seconds_since_start(arrival);
                let better = match best {
                    None => true,
                    Some((best_value, best_arrival, best_node)) => {
                        (value, Reverse(arrival_offset), Reverse(edge.to()))
                            > (best_value, Reverse(best_arrival), Reverse(best_node))
                    }
                };
                if better {
                    best = Some((value, arrival_offset, edge.to()));
                }
            }
            match best {
                Some((value, _, next)) => {
                    if value == 0 && network.edge_between(current, sink).is_some() {
                        break;
                    }
                    route.push(next);
                    current = next;
                }
                None => break,
            }
        }

        // walk home along the precomputed earliest return
        while network.edge_between(current, sink).is_none() {
            let (_, next) = way_home[&current];
            let next = next?;
            route.push(next);
            current = next;
        }
        route.push(sink);
        Some(route)
    }

    /// per event node: earliest second offset at which an inspector standing
    /// there can be back at a depot event, plus the next hop towards it
    /// (None when the node itself connects to the sink). Nodes without an
    /// entry cannot reach the depot at all.
    fn return_table(&self, sink: NodeIdx) -> HashMap<NodeIdx, (u64, Option<NodeIdx>)> {
        let network = &self.network;
        let mut nodes: Vec<NodeIdx> = network.event_nodes().collect();
        nodes.sort_by_key(|&n| Reverse(network.node(n).as_event().time()));

        // descending time order: every strictly-later successor is done
        let mut table: HashMap<NodeIdx, (u64, Option<NodeIdx>)> = HashMap::new();
        for &node in nodes.iter() {
            let time = network.node(node).as_event().time();
            let mut best: Option<(u64, Option<NodeIdx>)> =
                if network.edge_between(node, sink).is_some() {
                    Some((network.seconds_since_start(time), None))
                } else {
                    None
                };
            for &e in network.outgoing_edges(node) {
                let edge = network.edge(e);
                if !network.node(edge.to()).is_event()
                    || network.node(edge.to()).as_event().time() <= time
                {
                    continue;
                }
                if let Some(&(completion, _)) = table.get(&edge.to()) {
                    if best.is_none() || completion < best.unwrap().0 {
                        best = Some((completion, Some(edge.to())));
                    }
                }
            }
            if let Some(entry) = best {
                table.insert(node, entry);
            }
        }
        table
    }
}
