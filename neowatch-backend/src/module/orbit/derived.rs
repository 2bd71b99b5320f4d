//! Orbit-shape quantities derived from `a` and `e`

use neowatch_common::OrbitalElementSet;
use serde::{Deserialize, Serialize};

fn is_closed(a: f64, e: f64) -> bool {
    a.is_finite() && a > 0.0 && e.is_finite() && (0.0..1.0).contains(&e)
}

/// `b = a·sqrt(1 - e²)`, for closed orbits only.
pub fn semi_minor_axis(a: f64, e: f64) -> Option<f64> {
    is_closed(a, e).then(|| a * (1.0 - e * e).sqrt())
}

/// `q = a(1 - e)` (AU)
pub fn perihelion_distance(a: f64, e: f64) -> f64 {
    a * (1.0 - e)
}

/// `Q = a(1 + e)` (AU)
pub fn aphelion_distance(a: f64, e: f64) -> f64 {
    a * (1.0 + e)
}

/// Kepler's third law for a heliocentric orbit, `a` in AU.
pub fn orbital_period_years(a: f64) -> Option<f64> {
    (a.is_finite() && a > 0.0).then(|| a.powf(1.5))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedParameters {
    pub semi_minor_axis: Option<f64>,
    pub perihelion: Option<f64>,
    pub aphelion: Option<f64>,
    pub period_years: Option<f64>,
}

impl DerivedParameters {
    /// All fields are `None` unless the elements describe a closed orbit.
    pub fn from_elements(elements: &OrbitalElementSet) -> Self {
        match (elements.a, elements.e) {
            (Some(a), Some(e)) if is_closed(a, e) => Self {
                semi_minor_axis: semi_minor_axis(a, e),
                perihelion: Some(perihelion_distance(a, e)),
                aphelion: Some(aphelion_distance(a, e)),
                period_years: orbital_period_years(a),
            },
            _ => Self::default(),
        }
    }
}
