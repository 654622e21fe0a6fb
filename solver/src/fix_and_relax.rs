use log::{debug, info, warn};
use model::base_types::{InspectorCount, InspectorIdx, StationIdx};
use model::config::ConfigScheduling;
use model::inspectors::Inspectors;
use model::network::Network;

use std::sync::Arc;

use crate::flow_model::{flow_vars_of, FlowModel, HEADCOUNT_CONSTRAINT};
use crate::milp::{Assignment, MilpSolver, SolveError};

/// Partition of the roster during fix-and-relax.
///
/// Every inspector is in exactly one of three groups: `known` (route fixed),
/// `unknown` (decided by the next solve) or `dont_care` (pinned to zero for
/// now). Inspectors based at a depot without timetable events are stranded
/// and stay in `dont_care` for the whole run. Backed by persistent
/// collections, so every transition yields a new state and old ones remain
/// valid snapshots.
#[derive(Clone)]
pub struct PartitionState {
    known: im::Vector<InspectorIdx>,
    unknown: im::Vector<InspectorIdx>,
    dont_care: im::Vector<InspectorIdx>,
    // per depot: inspectors not yet known, in scheduling order
    remaining: im::OrdMap<StationIdx, im::Vector<InspectorIdx>>,
    stranded: im::Vector<InspectorIdx>,
}

// static functions
impl PartitionState {
    pub fn new(network: &Network, inspectors: &Inspectors) -> PartitionState {
        let mut remaining: im::OrdMap<StationIdx, im::Vector<InspectorIdx>> = im::OrdMap::new();
        let mut stranded: im::Vector<InspectorIdx> = im::Vector::new();
        for (depot, group) in inspectors.grouped_by_depot() {
            if network.events_at(depot).is_empty() {
                warn!(
                    "depot {} has no timetable events; its {} inspector(s) can never be routed",
                    network.stations().name(depot),
                    group.len()
                );
                stranded.extend(group);
            } else {
                remaining.insert(depot, group.into_iter().collect());
            }
        }

        let mut dont_care = stranded.clone();
        for group in remaining.values() {
            dont_care.extend(group.iter().copied());
        }
        PartitionState {
            known: im::Vector::new(),
            unknown: im::Vector::new(),
            dont_care,
            remaining,
            stranded,
        }
    }
}

// methods
impl PartitionState {
    /// draws up to `batch` inspectors per depot into `unknown`, parks the
    /// rest; `known` is untouched
    pub fn refill(&self, batch: InspectorCount) -> PartitionState {
        let mut unknown = im::Vector::new();
        let mut dont_care = self.stranded.clone();
        for group in self.remaining.values() {
            for (i, &inspector) in group.iter().enumerate() {
                if (i as InspectorCount) < batch {
                    unknown.push_back(inspector);
                } else {
                    dont_care.push_back(inspector);
                }
            }
        }
        PartitionState {
            known: self.known.clone(),
            unknown,
            dont_care,
            remaining: self.remaining.clone(),
            stranded: self.stranded.clone(),
        }
    }

    /// fixes an `unknown` inspector and drains it from its depot group
    pub fn promote(&self, inspector: InspectorIdx, depot: StationIdx) -> PartitionState {
        let mut remaining = self.remaining.clone();
        if let Some(group) = remaining.get(&depot) {
            let group: im::Vector<InspectorIdx> =
                group.iter().copied().filter(|&k| k != inspector).collect();
            if group.is_empty() {
                remaining.remove(&depot);
            } else {
                remaining.insert(depot, group);
            }
        }
        let mut known = self.known.clone();
        known.push_back(inspector);
        PartitionState {
            known,
            unknown: self
                .unknown
                .iter()
                .copied()
                .filter(|&k| k != inspector)
                .collect(),
            dont_care: self.dont_care.clone(),
            remaining,
            stranded: self.stranded.clone(),
        }
    }

    pub fn known(&self) -> impl Iterator<Item = InspectorIdx> + '_ {
        self.known.iter().copied()
    }

    pub fn unknown(&self) -> impl Iterator<Item = InspectorIdx> + '_ {
        self.unknown.iter().copied()
    }

    pub fn dont_care(&self) -> impl Iterator<Item = InspectorIdx> + '_ {
        self.dont_care.iter().copied()
    }

    pub fn known_count(&self) -> usize {
        self.known.len()
    }

    /// no depot has undecided inspectors left
    pub fn is_drained(&self) -> bool {
        self.remaining.is_empty()
    }

    fn check_partition(&self, total: usize) {
        debug_assert_eq!(
            self.known.len() + self.unknown.len() + self.dont_care.len(),
            total
        );
        debug_assert_eq!(
            self.known()
                .chain(self.unknown())
                .chain(self.dont_care())
                .collect::<std::collections::HashSet<InspectorIdx>>()
                .len(),
            total
        );
    }
}

pub struct ScheduleOutcome {
    assignment: Assignment,
    state: PartitionState,
    iterations: u32,
    failure: Option<SolveError>,
}

impl ScheduleOutcome {
    pub fn assignment(&self) -> &Assignment {
        &self.assignment
    }

    pub fn state(&self) -> &PartitionState {
        &self.state
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// the backend error that cut the run short, if any; the assignment and
    /// partition still reflect everything fixed before it
    pub fn failure(&self) -> Option<&SolveError> {
        self.failure.as_ref()
    }
}

/// Fix-and-relax scheduling around a mixed-integer backend.
///
/// Instead of solving for the whole roster at once, the run keeps a small
/// `unknown` window per depot, solves, fixes everyone whose source outflow
/// clears the acceptance threshold, refills the window and relaxes the
/// headcount bound, until the target number of inspectors is scheduled or
/// the depots are drained. Fixed routes and zero pins travel between solves
/// in the warm-start cache.
pub struct FixAndRelax<S: MilpSolver> {
    network: Arc<Network>,
    inspectors: Arc<Inspectors>,
    config: ConfigScheduling,
    backend: S,
}

// static functions
impl<S: MilpSolver> FixAndRelax<S> {
    pub fn new(
        network: Arc<Network>,
        inspectors: Arc<Inspectors>,
        config: ConfigScheduling,
        backend: S,
    ) -> FixAndRelax<S> {
        FixAndRelax {
            network,
            inspectors,
            config,
            backend,
        }
    }
}

// methods
impl<S: MilpSolver> FixAndRelax<S> {
    pub fn run(
        &mut self,
        model: FlowModel,
        target: InspectorCount,
    ) -> Result<ScheduleOutcome, SolveError> {
        let target = target.min(self.inspectors.len() as InspectorCount);
        let batch = self.config.batch_size.max(1);

        let mut state = PartitionState::new(&self.network, &self.inspectors).refill(batch);
        let mut warm = Assignment::empty();
        let mut handle = self.backend.submit_model(model);
        let mut bound = batch.min(target);
        let mut iterations = 0u32;
        let mut assignment = Assignment::empty();
        let mut failure = None;

        while (state.known_count() as InspectorCount) < target && !state.is_drained() {
            iterations += 1;

            // the window is free to move, everyone parked is pinned to zero
            for inspector in state.unknown() {
                for id in flow_vars_of(&self.network, inspector) {
                    warm.unset(&id);
                }
            }
            for inspector in state.dont_care() {
                for id in flow_vars_of(&self.network, inspector) {
                    warm.set(id, 0.0);
                }
            }

            self.backend
                .update_bound(&mut handle, HEADCOUNT_CONSTRAINT, bound as f64)?;
            // a failing solve ends the run; the inspectors fixed in earlier
            // rounds stay known and the last good assignment stays reported
            assignment = match self.backend.solve(&handle, &warm) {
                Ok(assignment) => assignment,
                Err(error) => {
                    warn!(
                        "solve failed at headcount bound {}: {}; keeping the {} inspector(s) fixed so far",
                        bound,
                        error,
                        state.known_count()
                    );
                    failure = Some(error);
                    break;
                }
            };

            let candidates: Vec<InspectorIdx> = state.unknown().collect();
            let mut promoted = 0;
            for inspector in candidates {
                let outflow = assignment.source_outflow(&self.network, inspector);
                if outflow >= self.config.acceptance_threshold {
                    // freeze the route into the warm-start cache
                    for id in flow_vars_of(&self.network, inspector) {
                        warm.set(id, assignment.value(&id));
                    }
                    state = state.promote(inspector, self.inspectors.get(inspector).depot());
                    promoted += 1;
                    debug!(
                        "fixed {} with source outflow {:.3}",
                        self.inspectors.get(inspector),
                        outflow
                    );
                }
            }
            state.check_partition(self.inspectors.len());

            if promoted == 0 {
                warn!(
                    "no inspector reached the acceptance threshold {} at headcount bound {}; \
                     stopping with {} scheduled",
                    self.config.acceptance_threshold,
                    bound,
                    state.known_count()
                );
                break;
            }

            state = state.refill(batch);
            bound = (state.known_count() as InspectorCount + batch).min(target);
        }

        info!(
            "fix-and-relax finished after {} iteration(s) with {} of {} inspectors scheduled",
            iterations,
            state.known_count(),
            target
        );
        Ok(ScheduleOutcome {
            assignment,
            state,
            iterations,
            failure,
        })
    }
}
