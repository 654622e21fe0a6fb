use model::base_types::{InspectorIdx, NodeIdx};
use model::network::Network;
use thiserror::Error;

use crate::flow_model::{FlowModel, VariableId};

/// Interface of the mixed-integer backend the scheduler talks to.
///
/// The protocol is deliberately narrow: hand over a model once, nudge named
/// right-hand sides between solves, and solve with a warm start. Variables
/// the warm start pins to zero must stay at zero; positive warm values are
/// prior routes the backend should keep.
pub trait MilpSolver {
    type Model;

    fn submit_model(&mut self, model: FlowModel) -> Self::Model;

    fn update_bound(
        &mut self,
        model: &mut Self::Model,
        constraint: &str,
        rhs: f64,
    ) -> Result<(), SolveError>;

    fn solve(&mut self, model: &Self::Model, warm_start: &Assignment)
        -> Result<Assignment, SolveError>;
}

#[derive(Error, Debug)]
pub enum SolveError {
    #[error("no feasible assignment under headcount bound {bound}")]
    Infeasible { bound: f64 },

    #[error("model has no constraint named '{name}'")]
    UnknownConstraint { name: String },

    #[error("solver backend failed: {details}")]
    Backend { details: String },
}

/// A (partial) variable assignment.
///
/// Doubles as solution and warm start; unmentioned variables read as zero,
/// which matches the convention that an unrouted inspector has no flow.
/// Backed by a persistent map so the scheduler can keep cheap snapshots of
/// earlier iterations.
#[derive(Clone, Default)]
pub struct Assignment {
    values: im::HashMap<VariableId, f64>,
}

// static functions
impl Assignment {
    pub fn empty() -> Assignment {
        Assignment {
            values: im::HashMap::new(),
        }
    }
}

// methods
impl Assignment {
    pub fn value(&self, id: &VariableId) -> f64 {
        self.values.get(id).copied().unwrap_or(0.0)
    }

    /// distinguishes an explicit zero (a pin) from an absent variable
    pub fn contains(&self, id: &VariableId) -> bool {
        self.values.contains_key(id)
    }

    pub fn set(&mut self, id: VariableId, value: f64) {
        self.values.insert(id, value);
    }

    pub fn unset(&mut self, id: &VariableId) {
        self.values.remove(id);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&VariableId, &f64)> + '_ {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// node sequence of the inspector's route from source to sink; empty
    /// when the inspector stays home (or the flow does not reach the sink)
    pub fn route_of(&self, network: &Network, inspector: InspectorIdx) -> Vec<NodeIdx> {
        let sink = network.sink_of(inspector);
        let mut route = vec![network.source_of(inspector)];
        let mut current = route[0];
        for _ in 0..=network.number_of_edges() {
            if current == sink {
                return route;
            }
            let next = network
                .outgoing_edges(current)
                .iter()
                .map(|&e| network.edge(e))
                .find(|edge| {
                    self.value(&VariableId::Flow {
                        from: edge.from(),
                        to: edge.to(),
                        inspector,
                    }) > 0.5
                });
            match next {
                Some(edge) => {
                    route.push(edge.to());
                    current = edge.to();
                }
                None => return Vec::new(),
            }
        }
        Vec::new()
    }

    /// total flow leaving the inspector's source terminal; 1.0 means the
    /// inspector is routed, 0.0 unrouted
    pub fn source_outflow(&self, network: &Network, inspector: InspectorIdx) -> f64 {
        let source = network.source_of(inspector);
        network
            .outgoing_edges(source)
            .iter()
            .map(|&e| {
                let edge = network.edge(e);
                self.value(&VariableId::Flow {
                    from: edge.from(),
                    to: edge.to(),
                    inspector,
                })
            })
            .sum()
    }
}
