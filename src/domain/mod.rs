// Domain layer - Core types, configuration, errors and decision rules

pub mod config;
pub mod errors;
pub mod model;
pub mod rules;
