use crate::base_types::InspectorCount;

#[derive(Clone)]
pub struct Config {
    pub od_estimation: ConfigOdEstimation,
    pub scheduling: ConfigScheduling,
}

#[derive(Clone)]
pub struct ConfigOdEstimation {
    /// relative error allowed between observed and reconstructed arc volumes
    pub relative_tolerance: f64,
    /// hard cap on biproportional-fitting sweeps; exceeding it is reported
    /// as a non-convergence error
    pub max_iterations: u32,
}

#[derive(Clone)]
pub struct ConfigScheduling {
    /// number of inspectors drawn per depot per refill (delta)
    pub batch_size: InspectorCount,
    /// source-outflow level at which an inspector counts as resolved;
    /// below 1.0 to tolerate solver numerical slack
    pub acceptance_threshold: f64,
    /// passengers an inspector can check per minute of riding (kappa);
    /// scales the inspected-portion linking constraints
    pub inspection_rate: f64,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            od_estimation: ConfigOdEstimation {
                relative_tolerance: 0.03,
                max_iterations: 1000,
            },
            scheduling: ConfigScheduling {
                batch_size: 1,
                acceptance_threshold: 0.9,
                inspection_rate: 12.0,
            },
        }
    }
}
