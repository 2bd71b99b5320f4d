//! Proximity ranking
//!
//! Orders records by minimum orbit intersection distance (MOID) with Earth, or by a
//! composite interest ordering for catalog curation. Every sort is stable and puts
//! missing values last.

use neowatch_common::CatalogRecord;
use neowatch_common::ordering::{asc_nulls_last, desc_nulls_last, flag_true_first};
use serde::{Deserialize, Serialize};

/// Lunar distances per astronomical unit.
pub const AU_TO_LUNAR_DISTANCE: f64 = 389.17;

pub fn au_to_lunar_distance(au: f64) -> f64 {
    au * AU_TO_LUNAR_DISTANCE
}

/// A hazardous object with a known MOID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedObject {
    pub identifier: String,
    pub moid_au: f64,
    pub moid_ld: f64,
    pub diameter_km: Option<f64>,
    pub record: CatalogRecord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", content = "objects", rename_all = "snake_case")]
pub enum RiskRanking {
    /// Closest first
    Ranked(Vec<RankedObject>),
    /// No record is flagged hazardous with a known MOID
    NoQualifyingObjects,
}

impl RiskRanking {
    pub fn objects(&self) -> &[RankedObject] {
        match self {
            RiskRanking::Ranked(objects) => objects,
            RiskRanking::NoQualifyingObjects => &[],
        }
    }
}

/// Stable ascending MOID order, unknown MOID last.
pub fn sort_by_moid<'a, I>(records: I) -> Vec<&'a CatalogRecord>
where
    I: IntoIterator<Item = &'a CatalogRecord>,
{
    let mut sorted: Vec<&CatalogRecord> = records.into_iter().collect();
    sorted.sort_by(|a, b| asc_nulls_last(a.moid, b.moid));
    sorted
}

/// The `n` hazardous records closest to Earth's orbit.
///
/// Only records flagged hazardous with a known MOID qualify. An empty result is
/// reported as `NoQualifyingObjects`, not as an error.
pub fn rank_by_moid<'a, I>(records: I, n: usize) -> RiskRanking
where
    I: IntoIterator<Item = &'a CatalogRecord>,
{
    let candidates = records
        .into_iter()
        .filter(|r| r.is_hazardous() && r.moid.is_some());

    let ranked: Vec<RankedObject> = sort_by_moid(candidates)
        .into_iter()
        .take(n)
        .filter_map(|record| {
            let moid_au = record.moid?;
            Some(RankedObject {
                identifier: record.identifier.clone(),
                moid_au,
                moid_ld: au_to_lunar_distance(moid_au),
                diameter_km: record.physical.diameter,
                record: record.clone(),
            })
        })
        .collect();

    if ranked.is_empty() {
        tracing::info!("No hazardous objects with a known MOID to rank");
        RiskRanking::NoQualifyingObjects
    } else {
        tracing::debug!("Ranked {} hazardous objects by MOID", ranked.len());
        RiskRanking::Ranked(ranked)
    }
}

/// Catalog curation order: hazardous first, then largest diameter, then smallest
/// MOID. Unknown values sort last within their tier; ties keep input order.
pub fn curate_by_interest<'a, I>(records: I, k: usize) -> Vec<&'a CatalogRecord>
where
    I: IntoIterator<Item = &'a CatalogRecord>,
{
    let mut sorted: Vec<&CatalogRecord> = records.into_iter().collect();
    sorted.sort_by(|a, b| {
        flag_true_first(a.pha, b.pha)
            .then_with(|| desc_nulls_last(a.physical.diameter, b.physical.diameter))
            .then_with(|| asc_nulls_last(a.moid, b.moid))
    });
    sorted.truncate(k);
    sorted
}

/// Records whose diameter is known and strictly greater than `min_diameter_km`.
pub fn filter_large_objects<'a, I>(records: I, min_diameter_km: f64) -> Vec<&'a CatalogRecord>
where
    I: IntoIterator<Item = &'a CatalogRecord>,
{
    records
        .into_iter()
        .filter(|r| r.physical.diameter.is_some_and(|d| d > min_diameter_km))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn record(
        id: &str,
        pha: Option<bool>,
        moid: Option<f64>,
        diameter: Option<f64>,
    ) -> CatalogRecord {
        let mut r = CatalogRecord::new(id);
        r.pha = pha;
        r.moid = moid;
        r.physical.diameter = diameter;
        r
    }

    fn ids<'a>(records: &[&'a CatalogRecord]) -> Vec<&'a str> {
        records.iter().map(|r| r.identifier.as_str()).collect()
    }

    #[test]
    fn test_sort_by_moid_puts_null_last() {
        let records = vec![
            record("a", Some(true), Some(0.01), None),
            record("b", Some(true), Some(0.05), None),
            record("c", Some(true), None, None),
            record("d", Some(true), Some(0.002), None),
        ];

        let sorted = sort_by_moid(&records);
        let moids: Vec<Option<f64>> = sorted.iter().map(|r| r.moid).collect();
        assert_eq!(moids, vec![Some(0.002), Some(0.01), Some(0.05), None]);
    }

    #[test]
    fn test_lunar_distance_conversion() {
        assert_relative_eq!(au_to_lunar_distance(1.0), 389.17);
        assert_relative_eq!(au_to_lunar_distance(0.05), 19.4585, max_relative = 1e-12);
    }

    #[test]
    fn test_rank_filters_hazardous_with_moid() {
        let records = vec![
            record("far pha", Some(true), Some(0.04), Some(1.2)),
            record("safe", Some(false), Some(0.0001), None),
            record("unknown flag", None, Some(0.0002), None),
            record("pha no moid", Some(true), None, Some(3.0)),
            record("close pha", Some(true), Some(0.0003), None),
        ];

        let ranking = rank_by_moid(&records, 10);
        let objects = ranking.objects();

        assert_eq!(objects.len(), 2);
        assert_eq!(objects[0].identifier, "close pha");
        assert_relative_eq!(objects[0].moid_ld, 0.0003 * 389.17, max_relative = 1e-12);
        assert_eq!(objects[1].identifier, "far pha");
        assert_eq!(objects[1].diameter_km, Some(1.2));
    }

    #[test]
    fn test_rank_takes_top_n() {
        let records: Vec<CatalogRecord> = (0..20)
            .map(|k| record(&format!("pha {}", k), Some(true), Some(0.05 - k as f64 * 0.001), None))
            .collect();

        let ranking = rank_by_moid(&records, 10);
        assert_eq!(ranking.objects().len(), 10);
        assert_eq!(ranking.objects()[0].identifier, "pha 19");
        assert!(ranking
            .objects()
            .windows(2)
            .all(|w| w[0].moid_au <= w[1].moid_au));
    }

    #[test]
    fn test_no_qualifying_objects() {
        let records = vec![
            record("safe", Some(false), Some(0.01), None),
            record("pha no moid", Some(true), None, None),
        ];
        assert_eq!(rank_by_moid(&records, 10), RiskRanking::NoQualifyingObjects);
        assert_eq!(
            rank_by_moid(&Vec::<CatalogRecord>::new(), 10),
            RiskRanking::NoQualifyingObjects
        );
        assert!(RiskRanking::NoQualifyingObjects.objects().is_empty());
    }

    #[test]
    fn test_curation_order_with_null_tiers() {
        let records = vec![
            record("small safe", Some(false), Some(0.3), Some(0.2)),
            record("pha unknown size", Some(true), Some(0.01), None),
            record("big pha", Some(true), Some(0.04), Some(5.0)),
            record("unflagged", None, Some(0.001), Some(50.0)),
            record("big pha closer", Some(true), Some(0.02), Some(5.0)),
            record("mid pha", Some(true), None, Some(1.0)),
            record("big safe", Some(false), None, Some(9.0)),
        ];

        let curated = curate_by_interest(&records, 100);
        assert_eq!(
            ids(&curated),
            vec![
                "big pha closer",
                "big pha",
                "mid pha",
                "pha unknown size",
                "big safe",
                "small safe",
                "unflagged",
            ]
        );
    }

    #[test]
    fn test_curation_is_stable_and_truncates() {
        let records = vec![
            record("first", Some(true), None, None),
            record("second", Some(true), None, None),
            record("third", Some(true), None, None),
        ];

        assert_eq!(ids(&curate_by_interest(&records, 2)), vec!["first", "second"]);
    }

    #[test]
    fn test_large_objects_threshold_is_strict() {
        let records = vec![
            record("exactly one", None, None, Some(1.0)),
            record("bigger", None, None, Some(1.01)),
            record("unknown", None, None, None),
            record("tiny", None, None, Some(0.1)),
        ];

        assert_eq!(ids(&filter_large_objects(&records, 1.0)), vec!["bigger"]);
    }
}
