//! Orbit geometry: trajectory tracing and derived shape parameters.

pub mod derived;
pub mod trajectory;

pub use derived::DerivedParameters;
pub use trajectory::{
    earth_reference_elements, generate_planar_trajectory, generate_trajectory,
    trajectories_for, OrbitTrajectory, Resolution,
};
