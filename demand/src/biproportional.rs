use itertools::Itertools;
use model::config::ConfigOdEstimation;

use std::collections::BTreeMap;

use crate::errors::DemandError;
use crate::shortest_paths::{EventPair, ShortestPathIndex};

/// Result of the biproportional (iterative proportional fitting) procedure:
/// one positive scale factor per passenger-carrying arc such that the
/// reconstructed volume of every arc (sum over the shortest paths crossing
/// it of the product of the scale factors along the path) matches its
/// observed passenger count within the configured relative tolerance.
pub struct BiproportionalFit {
    scale: BTreeMap<EventPair, f64>,
    iterations: u32,
}

// static functions
impl BiproportionalFit {
    pub fn fit(
        index: &ShortestPathIndex,
        config: &ConfigOdEstimation,
    ) -> Result<BiproportionalFit, DemandError> {
        let mut observed: BTreeMap<EventPair, f64> = BTreeMap::new();
        for (arc, entry) in index.arcs_iter() {
            if entry.observed() == 0 {
                return Err(DemandError::ZeroObservedVolume {
                    arc: format!("{}->{}", arc.0, arc.1),
                });
            }
            observed.insert(arc, entry.observed() as f64);
        }

        let mut scale: BTreeMap<EventPair, f64> =
            observed.keys().map(|&arc| (arc, 1.0)).collect();

        let mut worst_error = f64::INFINITY;
        for iteration in 1..=config.max_iterations {
            // one sweep: correct every arc against its observed volume,
            // using the scale factors as they are at that moment
            for (arc, entry) in index.arcs_iter() {
                let total: f64 = entry
                    .paths()
                    .iter()
                    .map(|&(origin, destination)| {
                        path_product(&scale, index.path_between(origin, destination).unwrap())
                    })
                    .sum();
                let correction = observed[&arc] / total;
                *scale.get_mut(&arc).unwrap() *= correction;
            }

            // convergence is judged on volumes reconstructed from the
            // factors as they stand after the sweep, so a convergent fit
            // really does reproduce every marginal
            worst_error = index
                .arcs_iter()
                .map(|(arc, entry)| {
                    let synthetic: f64 = entry
                        .paths()
                        .iter()
                        .map(|&(origin, destination)| {
                            path_product(&scale, index.path_between(origin, destination).unwrap())
                        })
                        .sum();
                    (observed[&arc] - synthetic).abs() / observed[&arc]
                })
                .fold(0.0, f64::max);
            if worst_error < config.relative_tolerance {
                log::debug!(
                    "biproportional fitting converged after {} iteration(s), worst relative error {:.4}",
                    iteration,
                    worst_error
                );
                return Ok(BiproportionalFit {
                    scale,
                    iterations: iteration,
                });
            }
        }

        Err(DemandError::NoConvergence {
            iterations: config.max_iterations,
            worst_error,
        })
    }
}

// methods
impl BiproportionalFit {
    pub fn scale_of(&self, arc: EventPair) -> f64 {
        self.scale[&arc]
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// product of the scale factors of all arcs along a path
    pub fn demand_along(&self, path: &[model::base_types::NodeIdx]) -> f64 {
        path_product(&self.scale, path)
    }
}

fn path_product(
    scale: &BTreeMap<EventPair, f64>,
    path: &[model::base_types::NodeIdx],
) -> f64 {
    path.iter()
        .tuple_windows()
        .map(|(&u, &v)| scale[&(u, v)])
        .product()
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::base_types::NodeIdx;
    use model::input::parse_forward_star;

    fn od_config() -> ConfigOdEstimation {
        ConfigOdEstimation {
            relative_tolerance: 0.03,
            max_iterations: 1000,
        }
    }

    #[test]
    fn independent_arcs_converge_in_one_iteration() {
        // two disjoint arcs: every path is the arc itself, so the first
        // sweep already sets each factor to its observed volume
        let contents = "\
AA 2019-07-01T06:00:00 BB 2019-07-01T06:30:00 10 1800
CC 2019-07-01T08:00:00 DD 2019-07-01T08:30:00 6 1800
";
        let network = parse_forward_star(contents).unwrap().freeze();
        let index = ShortestPathIndex::compute(&network);

        let fit = BiproportionalFit::fit(&index, &od_config()).unwrap();
        assert_eq!(fit.iterations(), 1);

        let mut factors: Vec<f64> = index.arcs_iter().map(|(arc, _)| fit.scale_of(arc)).collect();
        factors.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert!((factors[0] - 6.0).abs() < 1e-9);
        assert!((factors[1] - 10.0).abs() < 1e-9);
    }

    #[test]
    fn chain_reconstruction_matches_observed_volumes() {
        let contents = "\
AA 2019-07-01T06:00:00 BB 2019-07-01T06:30:00 20 1800
BB 2019-07-01T06:30:00 CC 2019-07-01T07:00:00 20 1800
";
        let network = parse_forward_star(contents).unwrap().freeze();
        let index = ShortestPathIndex::compute(&network);
        let config = od_config();

        let fit = BiproportionalFit::fit(&index, &config).unwrap();

        // core numerical guarantee: the synthetic volume of every arc is
        // within the tolerance of the observed one
        for (arc, entry) in index.arcs_iter() {
            let synthetic: f64 = entry
                .paths()
                .iter()
                .map(|&(o, d)| fit.demand_along(index.path_between(o, d).unwrap()))
                .sum();
            let observed = entry.observed() as f64;
            assert!(
                (observed - synthetic).abs() / observed < config.relative_tolerance,
                "arc {:?}: observed {} but reconstructed {}",
                arc,
                observed,
                synthetic
            );
        }
    }

    #[test]
    fn single_path_through_both_arcs_explains_both_marginals() {
        // hand-built index where the only shortest path crosses both arcs;
        // the fitted factors must multiply to the shared volume of 20
        let a = NodeIdx::from(0);
        let b = NodeIdx::from(1);
        let c = NodeIdx::from(2);
        let mut paths = BTreeMap::new();
        paths.insert((a, c), vec![a, b, c]);
        let mut arc_paths = BTreeMap::new();
        arc_paths.insert((a, b), (20, vec![(a, c)]));
        arc_paths.insert((b, c), (20, vec![(a, c)]));
        let index = ShortestPathIndex::from_parts(paths, arc_paths);

        let fit = BiproportionalFit::fit(&index, &od_config()).unwrap();
        let od_demand = fit.demand_along(&[a, b, c]);
        assert!(
            (od_demand - 20.0).abs() / 20.0 < od_config().relative_tolerance,
            "expected demand of 20 along the only path, got {}",
            od_demand
        );
    }

    #[test]
    fn zero_observed_volume_is_rejected() {
        let a = NodeIdx::from(0);
        let b = NodeIdx::from(1);
        let mut paths = BTreeMap::new();
        paths.insert((a, b), vec![a, b]);
        let mut arc_paths = BTreeMap::new();
        arc_paths.insert((a, b), (0, vec![(a, b)]));
        let index = ShortestPathIndex::from_parts(paths, arc_paths);

        let result = BiproportionalFit::fit(&index, &od_config());
        assert!(matches!(
            result,
            Err(DemandError::ZeroObservedVolume { .. })
        ));
    }

    #[test]
    fn iteration_cap_reports_non_convergence() {
        let contents = "\
AA 2019-07-01T06:00:00 BB 2019-07-01T06:30:00 20 1800
BB 2019-07-01T06:30:00 CC 2019-07-01T07:00:00 20 1800
";
        let network = parse_forward_star(contents).unwrap().freeze();
        let index = ShortestPathIndex::compute(&network);
        let config = ConfigOdEstimation {
            relative_tolerance: 1e-9,
            max_iterations: 1,
        };

        let result = BiproportionalFit::fit(&index, &config);
        assert!(matches!(
            result,
            Err(DemandError::NoConvergence { iterations: 1, .. })
        ));
    }
}
