//! UI components.

pub mod perturbation_map;
