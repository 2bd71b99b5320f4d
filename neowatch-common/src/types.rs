use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Keplerian elements of a small body at a single osculating epoch.
///
/// Units:
/// * `a`: AU
/// * `e`: unitless
/// * `i`, `om`, `w`, `ma`: degrees
///
/// Every element is optional because catalog sources routinely omit some of them.
/// Missing angles are read as 0 by consumers; missing `a`/`e` make the set unusable
/// for trajectory generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OrbitalElementSet {
    /// Semi-major axis (AU)
    #[serde(default)]
    pub a: Option<f64>,
    /// Eccentricity
    #[serde(default)]
    pub e: Option<f64>,
    /// Inclination (deg)
    #[serde(default)]
    pub i: Option<f64>,
    /// Longitude of the ascending node (deg)
    #[serde(default)]
    pub om: Option<f64>,
    /// Argument of periapsis (deg)
    #[serde(default)]
    pub w: Option<f64>,
    /// Mean anomaly (deg)
    #[serde(default)]
    pub ma: Option<f64>,
}

impl OrbitalElementSet {
    /// Build a complete element set (mean anomaly left unknown).
    pub fn new(a: f64, e: f64, i: f64, om: f64, w: f64) -> Self {
        Self {
            a: Some(a),
            e: Some(e),
            i: Some(i),
            om: Some(om),
            w: Some(w),
            ma: None,
        }
    }

    /// True when both `a` and `e` are known.
    pub fn has_shape(&self) -> bool {
        self.a.is_some() && self.e.is_some()
    }

    /// Fill every missing element from `other`; elements already present win.
    pub fn or(&self, other: &OrbitalElementSet) -> OrbitalElementSet {
        OrbitalElementSet {
            a: self.a.or(other.a),
            e: self.e.or(other.e),
            i: self.i.or(other.i),
            om: self.om.or(other.om),
            w: self.w.or(other.w),
            ma: self.ma.or(other.ma),
        }
    }
}

/// Physical attributes of a small body. All of them are frequently unknown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhysicalAttributes {
    /// Estimated diameter (km)
    #[serde(default)]
    pub diameter: Option<f64>,
    /// Geometric albedo
    #[serde(default)]
    pub albedo: Option<f64>,
    /// Absolute magnitude H
    #[serde(default)]
    pub h: Option<f64>,
    /// Rotation period (hours)
    #[serde(default)]
    pub rot_per: Option<f64>,
}

/// One object of a small-body catalog.
///
/// Serialized record-oriented: element and physical fields are flattened into the
/// same JSON object, so a catalog is a plain array of flat rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    /// Unique, never empty. Full name when known, otherwise the numeric SPK-ID.
    pub identifier: String,

    #[serde(default)]
    pub full_name: Option<String>,

    /// Small-body numeric key (SPK-ID)
    #[serde(default)]
    pub spkid: Option<String>,

    #[serde(flatten)]
    pub elements: OrbitalElementSet,

    #[serde(flatten)]
    pub physical: PhysicalAttributes,

    /// Potentially hazardous asteroid flag (`None` = unknown)
    #[serde(default)]
    pub pha: Option<bool>,

    /// Near-Earth object flag (`None` = unknown)
    #[serde(default)]
    pub neo: Option<bool>,

    /// Minimum orbit intersection distance with Earth (AU)
    #[serde(default)]
    pub moid: Option<f64>,

    /// Perihelion distance (AU)
    #[serde(default)]
    pub q: Option<f64>,

    /// Aphelion distance (AU)
    #[serde(default)]
    pub ad: Option<f64>,

    /// Orbital period (years)
    #[serde(default)]
    pub per_y: Option<f64>,

    /// Observation arc (days)
    #[serde(default)]
    pub data_arc: Option<f64>,
}

impl CatalogRecord {
    /// Create an otherwise empty record.
    pub fn new(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            full_name: None,
            spkid: None,
            elements: OrbitalElementSet::default(),
            physical: PhysicalAttributes::default(),
            pha: None,
            neo: None,
            moid: None,
            q: None,
            ad: None,
            per_y: None,
            data_arc: None,
        }
    }

    /// Key used for per-object remote lookups: the SPK-ID when known,
    /// otherwise the identifier itself.
    pub fn lookup_key(&self) -> &str {
        self.spkid.as_deref().unwrap_or(&self.identifier)
    }

    /// Hazard flag with unknown treated as "not hazardous".
    pub fn is_hazardous(&self) -> bool {
        self.pha == Some(true)
    }

    /// Whether `a` and `e` are present, i.e. a trajectory can be attempted.
    pub fn is_trajectory_eligible(&self) -> bool {
        self.elements.has_shape()
    }
}

/// Pick the identifier of a row: trimmed full name, then SPK-ID, then
/// the provisional designation. Returns `None` when every candidate is blank.
pub fn resolve_identifier(
    full_name: Option<&str>,
    spkid: Option<&str>,
    pdes: Option<&str>,
) -> Option<String> {
    [full_name, spkid, pdes]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

/// Ordered collection of records, unique by identifier.
///
/// Construction always deduplicates with a first-occurrence-wins policy, so callers
/// control precedence purely through input order. This also holds when a catalog is
/// deserialized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<CatalogRecord>", into = "Vec<CatalogRecord>")]
pub struct Catalog {
    records: Vec<CatalogRecord>,
}

impl Catalog {
    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = CatalogRecord>,
    {
        let mut seen = HashSet::new();
        let records = records
            .into_iter()
            .filter(|r| seen.insert(r.identifier.clone()))
            .collect();
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CatalogRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CatalogRecord> {
        self.records.iter()
    }

    pub fn get(&self, identifier: &str) -> Option<&CatalogRecord> {
        self.records.iter().find(|r| r.identifier == identifier)
    }

    pub fn into_records(self) -> Vec<CatalogRecord> {
        self.records
    }

    /// Records with both `a` and `e`, in catalog order.
    pub fn trajectory_eligible(&self) -> impl Iterator<Item = &CatalogRecord> {
        self.records.iter().filter(|r| r.is_trajectory_eligible())
    }
}

impl From<Vec<CatalogRecord>> for Catalog {
    fn from(records: Vec<CatalogRecord>) -> Self {
        Catalog::from_records(records)
    }
}

impl From<Catalog> for Vec<CatalogRecord> {
    fn from(catalog: Catalog) -> Self {
        catalog.records
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a CatalogRecord;
    type IntoIter = std::slice::Iter<'a, CatalogRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// A point of a traced orbit in the heliocentric reference frame (AU).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrajectoryPoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl From<TrajectoryPoint> for [f64; 3] {
    fn from(p: TrajectoryPoint) -> Self {
        [p.x, p.y, p.z]
    }
}

/// A point of an orbit projected on the reference plane (AU).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlanarPoint {
    pub x: f64,
    pub y: f64,
}

impl From<PlanarPoint> for [f64; 2] {
    fn from(p: PlanarPoint) -> Self {
        [p.x, p.y]
    }
}
