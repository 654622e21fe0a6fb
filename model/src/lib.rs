pub mod base_types;
pub mod config;
pub mod errors;
pub mod input;
pub mod inspectors;
pub mod network;
pub mod stations;
