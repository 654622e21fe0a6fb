use thiserror::Error;

#[derive(Error, Debug)]
pub enum DemandError {
    /// the index is built from positive-count arcs only, so this indicates a
    /// broken caller, but it must never turn into a silent division by zero
    #[error("arc {arc} has zero observed volume; biproportional fitting is undefined")]
    ZeroObservedVolume { arc: String },

    #[error(
        "biproportional fitting did not converge after {iterations} iterations \
         (worst relative error {worst_error:.4})"
    )]
    NoConvergence { iterations: u32, worst_error: f64 },

    #[error("od-matrix cache refers to unknown event '{event}'")]
    UnknownEvent { event: String },

    #[error("invalid od-matrix cache: {details}")]
    InvalidCache { details: String },
}
