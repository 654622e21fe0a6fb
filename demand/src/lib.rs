pub mod biproportional;
pub mod errors;
pub mod od_matrix;
pub mod shortest_paths;

pub use biproportional::BiproportionalFit;
pub use errors::DemandError;
pub use od_matrix::OdMatrix;
pub use shortest_paths::ShortestPathIndex;
