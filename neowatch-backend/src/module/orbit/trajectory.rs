//! Orbit tracing
//!
//! Turns one osculating element set into a closed loop of points, sampled at uniform
//! true-anomaly steps over `[0, 2π]` (both endpoints included, so the first and last
//! points coincide).
//!
//! The in-plane position `(r cos θ, r sin θ, 0)` with `r = a(1 - e²) / (1 + e cos θ)`
//! is mapped to the reference frame by the 3-1-3 rotation `Rz(Ω) · Rx(i) · Rz(ω)`.
//! This is a static geometric projection: no time propagation, no perturbations.

use nalgebra::{Rotation2, Rotation3, Vector2, Vector3};
use neowatch_common::{CatalogRecord, OrbitalElementSet, PlanarPoint, TrajectoryPoint};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

use super::derived::DerivedParameters;
use crate::error::{CatalogError, Result};

/// Number of samples per traced orbit.
///
/// Written in configuration as `"fine"`, `"coarse"` or a sample count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Resolution {
    /// 360 samples
    #[default]
    Fine,
    /// 180 samples
    Coarse,
    Custom(usize),
}

impl Resolution {
    pub fn samples(&self) -> usize {
        match self {
            Resolution::Fine => 360,
            Resolution::Coarse => 180,
            Resolution::Custom(n) => *n,
        }
    }
}

impl std::str::FromStr for Resolution {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fine" => Ok(Resolution::Fine),
            "coarse" => Ok(Resolution::Coarse),
            other => other
                .parse::<usize>()
                .map(Resolution::Custom)
                .map_err(|_| format!("Invalid resolution: {}", s)),
        }
    }
}

impl TryFrom<String> for Resolution {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resolution::Fine => f.write_str("fine"),
            Resolution::Coarse => f.write_str("coarse"),
            Resolution::Custom(n) => write!(f, "{}", n),
        }
    }
}

impl From<Resolution> for String {
    fn from(resolution: Resolution) -> Self {
        resolution.to_string()
    }
}

/// One traced orbit, ready to hand to a plotting collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitTrajectory {
    pub identifier: String,
    pub derived: DerivedParameters,
    pub points: Vec<TrajectoryPoint>,
}

impl OrbitTrajectory {
    pub fn trace(
        identifier: impl Into<String>,
        elements: &OrbitalElementSet,
        samples: usize,
    ) -> Result<Self> {
        let points = generate_trajectory(elements, samples)?;
        Ok(Self {
            identifier: identifier.into(),
            derived: DerivedParameters::from_elements(elements),
            points,
        })
    }
}

/// Validated orbit shape and orientation, angles in radians.
struct Conic {
    a: f64,
    e: f64,
    i: f64,
    om: f64,
    w: f64,
}

impl Conic {
    fn from_elements(elements: &OrbitalElementSet) -> Result<Self> {
        let (a, e) = match (elements.a, elements.e) {
            (Some(a), Some(e)) => (a, e),
            (a, e) => {
                return Err(CatalogError::IncompleteElements(format!(
                    "a = {:?}, e = {:?}",
                    a, e
                )));
            }
        };

        if !a.is_finite() || a <= 0.0 {
            return Err(CatalogError::InvalidOrbit(format!(
                "semi-major axis must be positive, got {}",
                a
            )));
        }
        if !e.is_finite() || e < 0.0 {
            return Err(CatalogError::InvalidOrbit(format!(
                "eccentricity must be non-negative, got {}",
                e
            )));
        }
        if e >= 1.0 {
            return Err(CatalogError::InvalidOrbit(format!(
                "open orbit (e = {}) cannot be traced as a closed loop",
                e
            )));
        }

        let angle = |name: &str, value: Option<f64>| -> Result<f64> {
            let degrees = value.unwrap_or(0.0);
            if degrees.is_finite() {
                Ok(degrees.to_radians())
            } else {
                Err(CatalogError::InvalidOrbit(format!("{} is not finite", name)))
            }
        };

        Ok(Self {
            a,
            e,
            i: angle("inclination", elements.i)?,
            om: angle("ascending node", elements.om)?,
            w: angle("argument of periapsis", elements.w)?,
        })
    }

    fn radius(&self, theta: f64) -> f64 {
        self.a * (1.0 - self.e * self.e) / (1.0 + self.e * theta.cos())
    }

    fn in_plane(&self, theta: f64) -> Vector2<f64> {
        let r = self.radius(theta);
        Vector2::new(r * theta.cos(), r * theta.sin())
    }
}

fn anomalies(samples: usize) -> Result<impl Iterator<Item = f64>> {
    if samples < 2 {
        return Err(CatalogError::InvalidSampleCount(samples));
    }
    let step = TAU / (samples - 1) as f64;
    Ok((0..samples).map(move |k| k as f64 * step))
}

/// Trace one full revolution in the reference frame (AU).
pub fn generate_trajectory(
    elements: &OrbitalElementSet,
    samples: usize,
) -> Result<Vec<TrajectoryPoint>> {
    let conic = Conic::from_elements(elements)?;
    let rotation = Rotation3::from_axis_angle(&Vector3::z_axis(), conic.om)
        * Rotation3::from_axis_angle(&Vector3::x_axis(), conic.i)
        * Rotation3::from_axis_angle(&Vector3::z_axis(), conic.w);

    Ok(anomalies(samples)?
        .map(|theta| {
            let p = conic.in_plane(theta);
            let v = rotation * Vector3::new(p.x, p.y, 0.0);
            TrajectoryPoint {
                x: v.x,
                y: v.y,
                z: v.z,
            }
        })
        .collect())
}

/// Trace one revolution in the orbital plane, oriented by the argument of periapsis only.
pub fn generate_planar_trajectory(
    elements: &OrbitalElementSet,
    samples: usize,
) -> Result<Vec<PlanarPoint>> {
    let conic = Conic::from_elements(elements)?;
    let rotation = Rotation2::new(conic.w);

    Ok(anomalies(samples)?
        .map(|theta| {
            let v = rotation * conic.in_plane(theta);
            PlanarPoint { x: v.x, y: v.y }
        })
        .collect())
}

/// Approximate Earth orbit, drawn as a reference next to traced objects.
pub fn earth_reference_elements() -> OrbitalElementSet {
    OrbitalElementSet::new(1.0, 0.0167, 0.0, 0.0, 102.9)
}

/// Trace the first `max` records that carry both `a` and `e`.
///
/// Records rejected by the generator are logged and left out; they never fail the batch.
pub fn trajectories_for<'a, I>(
    records: I,
    resolution: Resolution,
    max: usize,
) -> Vec<OrbitTrajectory>
where
    I: IntoIterator<Item = &'a CatalogRecord>,
{
    let samples = resolution.samples();
    let mut traced = Vec::new();
    let mut rejected = 0;

    for record in records
        .into_iter()
        .filter(|r| r.is_trajectory_eligible())
        .take(max)
    {
        match OrbitTrajectory::trace(&record.identifier, &record.elements, samples) {
            Ok(trajectory) => traced.push(trajectory),
            Err(e) => {
                rejected += 1;
                tracing::warn!("Skipping trajectory for '{}': {}", record.identifier, e);
            }
        }
    }

    tracing::info!(
        "Traced {} orbits at {} samples ({} rejected)",
        traced.len(),
        samples,
        rejected
    );
    traced
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    fn eros() -> OrbitalElementSet {
        OrbitalElementSet::new(1.458, 0.2227, 10.83, 304.3, 178.9)
    }

    fn norm(p: &TrajectoryPoint) -> f64 {
        (p.x * p.x + p.y * p.y + p.z * p.z).sqrt()
    }

    #[test]
    fn test_returns_closed_loop_of_n_points() {
        for samples in [2, 180, 360, 1000] {
            let points = generate_trajectory(&eros(), samples).unwrap();
            assert_eq!(points.len(), samples);

            let first = points[0];
            let last = points[samples - 1];
            assert_abs_diff_eq!(first.x, last.x, epsilon = 1e-12);
            assert_abs_diff_eq!(first.y, last.y, epsilon = 1e-12);
            assert_abs_diff_eq!(first.z, last.z, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_zero_inclination_is_flat() {
        for (e, om, w) in [(0.0, 0.0, 0.0), (0.5, 73.0, 201.0), (0.95, 359.0, 12.5)] {
            let elements = OrbitalElementSet::new(2.2, e, 0.0, om, w);
            let points = generate_trajectory(&elements, 360).unwrap();
            for p in &points {
                assert_abs_diff_eq!(p.z, 0.0, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_circular_orbit_has_constant_radius() {
        let elements = OrbitalElementSet::new(3.1, 0.0, 27.0, 140.0, 66.0);
        for p in generate_trajectory(&elements, 360).unwrap() {
            assert_relative_eq!(norm(&p), 3.1, max_relative = 1e-12);
        }
    }

    #[test]
    fn test_perihelion_and_aphelion_distances() {
        let elements = eros();
        let points = generate_trajectory(&elements, 361).unwrap();
        let a = 1.458;
        let e = 0.2227;

        // θ = 0 is perihelion, θ = π is the middle sample
        assert_relative_eq!(norm(&points[0]), a * (1.0 - e), max_relative = 1e-12);
        assert_relative_eq!(norm(&points[180]), a * (1.0 + e), max_relative = 1e-12);
    }

    #[test]
    fn test_matches_explicit_rotation_formulas() {
        let elements = OrbitalElementSet::new(1.7, 0.31, 23.0, 47.0, 112.0);
        let (a, e) = (1.7_f64, 0.31_f64);
        let (i, om, w) = (23.0_f64.to_radians(), 47.0_f64.to_radians(), 112.0_f64.to_radians());
        let samples = 37;

        let points = generate_trajectory(&elements, samples).unwrap();

        for (k, p) in points.iter().enumerate() {
            let theta = TAU * k as f64 / (samples - 1) as f64;
            let r = a * (1.0 - e * e) / (1.0 + e * theta.cos());
            let (xp, yp) = (r * theta.cos(), r * theta.sin());

            let x = xp * (om.cos() * w.cos() - om.sin() * w.sin() * i.cos())
                - yp * (om.cos() * w.sin() + om.sin() * w.cos() * i.cos());
            let y = xp * (om.sin() * w.cos() + om.cos() * w.sin() * i.cos())
                + yp * (-om.sin() * w.sin() + om.cos() * w.cos() * i.cos());
            let z = xp * (w.sin() * i.sin()) + yp * (w.cos() * i.sin());

            assert_abs_diff_eq!(p.x, x, epsilon = 1e-12);
            assert_abs_diff_eq!(p.y, y, epsilon = 1e-12);
            assert_abs_diff_eq!(p.z, z, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_open_orbits_are_rejected() {
        for e in [1.0, 1.5] {
            let elements = OrbitalElementSet::new(1.0, e, 5.0, 0.0, 0.0);
            let err = generate_trajectory(&elements, 360).unwrap_err();
            assert!(matches!(err, CatalogError::InvalidOrbit(_)));
            assert!(generate_planar_trajectory(&elements, 360).is_err());
        }
    }

    #[test]
    fn test_degenerate_shapes_are_rejected() {
        let bad = [
            OrbitalElementSet::new(0.0, 0.1, 0.0, 0.0, 0.0),
            OrbitalElementSet::new(-2.0, 0.1, 0.0, 0.0, 0.0),
            OrbitalElementSet::new(f64::INFINITY, 0.1, 0.0, 0.0, 0.0),
            OrbitalElementSet::new(1.0, -0.1, 0.0, 0.0, 0.0),
            OrbitalElementSet::new(1.0, 0.1, f64::NAN, 0.0, 0.0),
        ];
        for elements in bad {
            let err = generate_trajectory(&elements, 10).unwrap_err();
            assert!(matches!(err, CatalogError::InvalidOrbit(_)), "{:?}", elements);
        }
    }

    #[test]
    fn test_missing_shape_is_incomplete() {
        let mut elements = eros();
        elements.e = None;
        let err = generate_trajectory(&elements, 360).unwrap_err();
        assert!(matches!(err, CatalogError::IncompleteElements(_)));
        assert!(err.is_orbit_rejection());
    }

    #[test]
    fn test_missing_angles_default_to_zero() {
        let elements = OrbitalElementSet {
            a: Some(1.2),
            e: Some(0.1),
            ..Default::default()
        };
        let points = generate_trajectory(&elements, 5).unwrap();
        assert_relative_eq!(points[0].x, 1.2 * 0.9, max_relative = 1e-12);
        assert_abs_diff_eq!(points[0].y, 0.0, epsilon = 1e-12);
        assert!(points.iter().all(|p| p.z == 0.0));
    }

    #[test]
    fn test_sample_count_below_two_is_rejected() {
        for samples in [0, 1] {
            let err = generate_trajectory(&eros(), samples).unwrap_err();
            assert!(matches!(err, CatalogError::InvalidSampleCount(n) if n == samples));
        }
    }

    #[test]
    fn test_planar_trajectory_matches_flat_3d_orbit() {
        let mut elements = eros();
        elements.i = Some(0.0);
        elements.om = Some(0.0);

        let flat = generate_trajectory(&elements, 90).unwrap();
        let planar = generate_planar_trajectory(&eros(), 90).unwrap();

        assert_eq!(planar.len(), 90);
        for (p, q) in flat.iter().zip(&planar) {
            assert_abs_diff_eq!(p.x, q.x, epsilon = 1e-12);
            assert_abs_diff_eq!(p.y, q.y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_earth_reference_is_traceable() {
        let points = generate_trajectory(&earth_reference_elements(), Resolution::Coarse.samples())
            .unwrap();
        assert_eq!(points.len(), 180);
        for p in &points {
            assert!((0.98..1.02).contains(&norm(p)));
        }
    }

    #[test]
    fn test_resolution_parsing() {
        assert_eq!("fine".parse::<Resolution>(), Ok(Resolution::Fine));
        assert_eq!(" Coarse ".parse::<Resolution>(), Ok(Resolution::Coarse));
        assert_eq!("72".parse::<Resolution>(), Ok(Resolution::Custom(72)));
        assert!("ultra".parse::<Resolution>().is_err());
        assert_eq!(Resolution::default().samples(), 360);
        assert_eq!(String::from(Resolution::Coarse), "coarse");
        assert_eq!(Resolution::Custom(72).to_string(), "72");
    }

    #[test]
    fn test_trajectories_for_skips_ineligible_and_invalid() {
        let mut good = CatalogRecord::new("433 Eros");
        good.elements = eros();
        let no_shape = CatalogRecord::new("no elements");
        let mut open = CatalogRecord::new("1I/'Oumuamua");
        open.elements = OrbitalElementSet::new(-1.27, 1.2, 122.7, 24.6, 241.8);
        let mut second = CatalogRecord::new("1566 Icarus");
        second.elements = OrbitalElementSet::new(1.078, 0.827, 22.8, 87.9, 31.4);
        let mut third = CatalogRecord::new("4179 Toutatis");
        third.elements = OrbitalElementSet::new(2.54, 0.62, 0.45, 125.4, 277.9);

        let records = vec![good, no_shape, open, second, third];
        let traced = trajectories_for(&records, Resolution::Custom(16), 3);

        // the first three eligible records are Eros, 'Oumuamua and Icarus
        let ids: Vec<&str> = traced.iter().map(|t| t.identifier.as_str()).collect();
        assert_eq!(ids, vec!["433 Eros", "1566 Icarus"]);
        assert!(traced.iter().all(|t| t.points.len() == 16));
        let period = traced[0].derived.period_years.unwrap();
        assert!((period - 1.458f64.powf(1.5)).abs() < 1e-9);
    }
}
