use demand::{OdMatrix, ShortestPathIndex};
use itertools::Itertools;
use model::base_types::{EdgeIdx, InspectorCount, InspectorIdx, NodeIdx};
use model::config::ConfigScheduling;
use model::inspectors::Inspectors;
use model::network::nodes::Node;
use model::network::Network;

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::milp::Assignment;

/// name of the mutable headcount row; the scheduler tightens and relaxes
/// its right-hand side between solves instead of rebuilding the model
pub const HEADCOUNT_CONSTRAINT: &str = "max_inspectors";

/// A decision variable of the inspection flow model.
///
/// `Flow` is the binary choice of one inspector riding one arc; terminal
/// arcs only exist for the inspector owning the terminal. `InspectedPortion`
/// is the fraction of an od pair's demand that gets inspected along its
/// shortest path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VariableId {
    Flow {
        from: NodeIdx,
        to: NodeIdx,
        inspector: InspectorIdx,
    },
    InspectedPortion {
        origin: NodeIdx,
        destination: NodeIdx,
    },
}

impl fmt::Display for VariableId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VariableId::Flow {
                from,
                to,
                inspector,
            } => write!(f, "x_{}_{}_{}", from, to, inspector),
            VariableId::InspectedPortion {
                origin,
                destination,
            } => write!(f, "m_{}_{}", origin, destination),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    Binary,
    Continuous,
}

pub struct VariableDef {
    id: VariableId,
    kind: VariableKind,
    lower_bound: f64,
    upper_bound: f64,
    objective_coefficient: f64,
}

impl VariableDef {
    fn binary(id: VariableId) -> VariableDef {
        VariableDef {
            id,
            kind: VariableKind::Binary,
            lower_bound: 0.0,
            upper_bound: 1.0,
            objective_coefficient: 0.0,
        }
    }

    fn continuous(id: VariableId, objective_coefficient: f64) -> VariableDef {
        VariableDef {
            id,
            kind: VariableKind::Continuous,
            lower_bound: 0.0,
            upper_bound: 1.0,
            objective_coefficient,
        }
    }

    pub fn id(&self) -> VariableId {
        self.id
    }

    pub fn kind(&self) -> VariableKind {
        self.kind
    }

    pub fn lower_bound(&self) -> f64 {
        self.lower_bound
    }

    pub fn upper_bound(&self) -> f64 {
        self.upper_bound
    }

    pub fn objective_coefficient(&self) -> f64 {
        self.objective_coefficient
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Equal,
    LessEqual,
}

pub struct Constraint {
    name: String,
    terms: Vec<(VariableId, f64)>,
    sense: Sense,
    rhs: f64,
}

impl Constraint {
    fn equal(name: String, terms: Vec<(VariableId, f64)>, rhs: f64) -> Constraint {
        Constraint {
            name,
            terms,
            sense: Sense::Equal,
            rhs,
        }
    }

    fn less_equal(name: String, terms: Vec<(VariableId, f64)>, rhs: f64) -> Constraint {
        Constraint {
            name,
            terms,
            sense: Sense::LessEqual,
            rhs,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn terms(&self) -> &[(VariableId, f64)] {
        &self.terms
    }

    pub fn sense(&self) -> Sense {
        self.sense
    }

    pub fn rhs(&self) -> f64 {
        self.rhs
    }
}

/// The mixed-integer inspection model in backend-neutral form.
///
/// Maximizes the demand-weighted inspected portions subject to per-inspector
/// unit flows from source to sink, working-hour budgets and the mutable
/// headcount row. Built once per run; only right-hand sides change
/// afterwards.
pub struct FlowModel {
    variables: BTreeMap<VariableId, VariableDef>,
    constraints: Vec<Constraint>,
    constraint_lookup: HashMap<String, usize>,
}

// static functions
impl FlowModel {
    pub fn build(
        network: &Network,
        inspectors: &Inspectors,
        od: &OdMatrix,
        index: &ShortestPathIndex,
        config: &ConfigScheduling,
        max_inspectors: InspectorCount,
    ) -> FlowModel {
        let mut variables: BTreeMap<VariableId, VariableDef> = BTreeMap::new();
        let mut constraints: Vec<Constraint> = Vec::new();

        for edge_idx in network.edges_iter() {
            let edge = network.edge(edge_idx);
            match (network.node(edge.from()), network.node(edge.to())) {
                (Node::Event(_), Node::Event(_)) => {
                    for inspector in inspectors.iter() {
                        let id = VariableId::Flow {
                            from: edge.from(),
                            to: edge.to(),
                            inspector,
                        };
                        variables.insert(id, VariableDef::binary(id));
                    }
                }
                (Node::Source(terminal), _) | (_, Node::Sink(terminal)) => {
                    let id = VariableId::Flow {
                        from: edge.from(),
                        to: edge.to(),
                        inspector: terminal.inspector(),
                    };
                    variables.insert(id, VariableDef::binary(id));
                }
                _ => {}
            }
        }

        // one inspected-portion variable per connected od pair, linked to
        // the flows on its shortest path; riding an arc for t minutes checks
        // at most inspection_rate * t of the arc's passengers
        for ((origin, destination), demand) in od.entries_iter() {
            let path = match index.path_between(origin, destination) {
                Some(path) => path,
                None => {
                    log::debug!(
                        "od entry {} -> {} has no shortest path; dropped from the model",
                        origin,
                        destination
                    );
                    continue;
                }
            };
            let id = VariableId::InspectedPortion {
                origin,
                destination,
            };
            variables.insert(id, VariableDef::continuous(id, demand));

            let mut terms = vec![(id, 1.0)];
            for (&u, &v) in path.iter().tuple_windows() {
                let edge_idx = network
                    .edge_between(u, v)
                    .expect("shortest path arc is missing from the network");
                let edge = network.edge(edge_idx);
                let minutes = edge.travel_seconds() as f64 / 60.0;
                let weight = -config.inspection_rate * minutes / edge.passengers() as f64;
                for inspector in inspectors.iter() {
                    terms.push((
                        VariableId::Flow {
                            from: u,
                            to: v,
                            inspector,
                        },
                        weight,
                    ));
                }
            }
            constraints.push(Constraint::less_equal(
                format!("min_portion_{}_{}", origin, destination),
                terms,
                0.0,
            ));
        }

        // flow conservation at every timetable event, per inspector
        for node in network.event_nodes() {
            for inspector in inspectors.iter() {
                let mut terms = Vec::new();
                for &e in network.incoming_edges(node) {
                    if let Some(id) = flow_var(network, e, inspector) {
                        terms.push((id, 1.0));
                    }
                }
                for &e in network.outgoing_edges(node) {
                    if let Some(id) = flow_var(network, e, inspector) {
                        terms.push((id, -1.0));
                    }
                }
                constraints.push(Constraint::equal(
                    format!("mass_balance_{}_{}", node, inspector),
                    terms,
                    0.0,
                ));
            }
        }

        let mut headcount_terms = Vec::new();
        for inspector in inspectors.iter() {
            let source = network.source_of(inspector);
            let sink = network.sink_of(inspector);

            let departures: Vec<(VariableId, NodeIdx)> = network
                .outgoing_edges(source)
                .iter()
                .map(|&e| {
                    let edge = network.edge(e);
                    (
                        VariableId::Flow {
                            from: edge.from(),
                            to: edge.to(),
                            inspector,
                        },
                        edge.to(),
                    )
                })
                .collect();
            let arrivals: Vec<(VariableId, NodeIdx)> = network
                .incoming_edges(sink)
                .iter()
                .map(|&e| {
                    let edge = network.edge(e);
                    (
                        VariableId::Flow {
                            from: edge.from(),
                            to: edge.to(),
                            inspector,
                        },
                        edge.from(),
                    )
                })
                .collect();

            constraints.push(Constraint::less_equal(
                format!("single_departure_{}", inspector),
                departures.iter().map(|&(id, _)| (id, 1.0)).collect(),
                1.0,
            ));

            // whoever leaves the depot must come back
            let mut coupling: Vec<(VariableId, f64)> =
                arrivals.iter().map(|&(id, _)| (id, 1.0)).collect();
            coupling.extend(departures.iter().map(|&(id, _)| (id, -1.0)));
            constraints.push(Constraint::equal(
                format!("return_to_depot_{}", inspector),
                coupling,
                0.0,
            ));

            // arrival minus departure time, in seconds since the first event
            let mut hours: Vec<(VariableId, f64)> = arrivals
                .iter()
                .map(|&(id, node)| (id, event_seconds(network, node)))
                .collect();
            hours.extend(
                departures
                    .iter()
                    .map(|&(id, node)| (id, -event_seconds(network, node))),
            );
            constraints.push(Constraint::less_equal(
                format!("working_hours_{}", inspector),
                hours,
                inspectors.get(inspector).max_working_seconds() as f64,
            ));

            headcount_terms.extend(departures.iter().map(|&(id, _)| (id, 1.0)));
        }

        constraints.push(Constraint::less_equal(
            String::from(HEADCOUNT_CONSTRAINT),
            headcount_terms,
            max_inspectors as f64,
        ));

        let constraint_lookup = constraints
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();
        FlowModel {
            variables,
            constraints,
            constraint_lookup,
        }
    }
}

// methods
impl FlowModel {
    pub fn variable(&self, id: &VariableId) -> Option<&VariableDef> {
        self.variables.get(id)
    }

    pub fn variables_iter(&self) -> impl Iterator<Item = &VariableDef> + '_ {
        self.variables.values()
    }

    pub fn number_of_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraint_lookup
            .get(name)
            .map(|&i| &self.constraints[i])
    }

    pub fn constraints_iter(&self) -> impl Iterator<Item = &Constraint> + '_ {
        self.constraints.iter()
    }

    pub fn number_of_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// changes the right-hand side of a named row; false if there is no
    /// such row
    pub fn set_constraint_rhs(&mut self, name: &str, rhs: f64) -> bool {
        match self.constraint_lookup.get(name) {
            Some(&i) => {
                self.constraints[i].rhs = rhs;
                true
            }
            None => false,
        }
    }

    /// demand-weighted inspected portion of the assignment
    pub fn objective_value(&self, assignment: &Assignment) -> f64 {
        self.variables
            .values()
            .map(|def| def.objective_coefficient * assignment.value(&def.id))
            .sum()
    }
}

/// the flow variable of an inspector on an edge; None for terminal edges of
/// other inspectors
pub fn flow_var(network: &Network, edge: EdgeIdx, inspector: InspectorIdx) -> Option<VariableId> {
    let edge = network.edge(edge);
    let id = VariableId::Flow {
        from: edge.from(),
        to: edge.to(),
        inspector,
    };
    match (network.node(edge.from()), network.node(edge.to())) {
        (Node::Event(_), Node::Event(_)) => Some(id),
        (Node::Source(terminal), _) | (_, Node::Sink(terminal)) => {
            (terminal.inspector() == inspector).then_some(id)
        }
        _ => None,
    }
}

/// all flow variables an inspector has in the model, in edge order
pub fn flow_vars_of<'a>(
    network: &'a Network,
    inspector: InspectorIdx,
) -> impl Iterator<Item = VariableId> + 'a {
    network
        .edges_iter()
        .filter_map(move |e| flow_var(network, e, inspector))
}

fn event_seconds(network: &Network, node: NodeIdx) -> f64 {
    network.seconds_since_start(network.node(node).as_event().time()) as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utilities::{default_instance, scheduling_config};

    #[test]
    fn model_has_the_expected_variable_families() {
        let (network, inspectors, od, index) = default_instance();
        let model = FlowModel::build(
            &network,
            &inspectors,
            &od,
            &index,
            &scheduling_config(),
            3,
        );

        let event_edges = network
            .edges_iter()
            .filter(|&e| {
                let edge = network.edge(e);
                network.node(edge.from()).is_event() && network.node(edge.to()).is_event()
            })
            .count();
        let terminal_edges = network.number_of_edges() - event_edges;
        let expected_flows = event_edges * inspectors.len() + terminal_edges;

        let flows = model
            .variables_iter()
            .filter(|def| matches!(def.id(), VariableId::Flow { .. }))
            .count();
        let portions = model
            .variables_iter()
            .filter(|def| matches!(def.id(), VariableId::InspectedPortion { .. }))
            .count();

        assert_eq!(flows, expected_flows);
        assert_eq!(portions, od.len());
    }

    #[test]
    fn headcount_row_is_mutable_by_name() {
        let (network, inspectors, od, index) = default_instance();
        let mut model = FlowModel::build(
            &network,
            &inspectors,
            &od,
            &index,
            &scheduling_config(),
            3,
        );

        assert_eq!(model.constraint(HEADCOUNT_CONSTRAINT).unwrap().rhs(), 3.0);
        assert!(model.set_constraint_rhs(HEADCOUNT_CONSTRAINT, 5.0));
        assert_eq!(model.constraint(HEADCOUNT_CONSTRAINT).unwrap().rhs(), 5.0);
        assert!(!model.set_constraint_rhs("no_such_row", 1.0));
    }

    #[test]
    fn portion_rows_scale_with_riding_time_and_passenger_count() {
        let (network, inspectors, od, index) = default_instance();
        let config = scheduling_config();
        let model = FlowModel::build(&network, &inspectors, &od, &index, &config, 3);

        for constraint in model.constraints_iter() {
            if !constraint.name().starts_with("min_portion_") {
                continue;
            }
            assert_eq!(constraint.sense(), Sense::LessEqual);
            assert_eq!(constraint.rhs(), 0.0);
            for &(id, coefficient) in constraint.terms() {
                match id {
                    VariableId::InspectedPortion { .. } => assert_eq!(coefficient, 1.0),
                    VariableId::Flow { from, to, .. } => {
                        let edge = network.edge(network.edge_between(from, to).unwrap());
                        let expected = -config.inspection_rate
                            * (edge.travel_seconds() as f64 / 60.0)
                            / edge.passengers() as f64;
                        assert!((coefficient - expected).abs() < 1e-12);
                    }
                }
            }
        }
    }

    #[test]
    fn working_hours_rows_carry_the_budget_in_seconds() {
        let (network, inspectors, od, index) = default_instance();
        let model = FlowModel::build(
            &network,
            &inspectors,
            &od,
            &index,
            &scheduling_config(),
            3,
        );

        for inspector in inspectors.iter() {
            let row = model
                .constraint(&format!("working_hours_{}", inspector))
                .unwrap();
            assert_eq!(
                row.rhs(),
                inspectors.get(inspector).max_working_seconds() as f64
            );
        }
    }

    #[test]
    fn terminal_flows_exist_only_for_their_owner() {
        let (network, inspectors, od, index) = default_instance();
        let model = FlowModel::build(
            &network,
            &inspectors,
            &od,
            &index,
            &scheduling_config(),
            3,
        );

        for inspector in inspectors.iter() {
            let source = network.source_of(inspector);
            for &e in network.outgoing_edges(source) {
                let edge = network.edge(e);
                for other in inspectors.iter() {
                    let id = VariableId::Flow {
                        from: edge.from(),
                        to: edge.to(),
                        inspector: other,
                    };
                    assert_eq!(model.variable(&id).is_some(), other == inspector);
                }
            }
        }
    }
}
