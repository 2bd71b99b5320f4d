//! Close-approach risk ranking.

pub mod ranker;

pub use ranker::{
    au_to_lunar_distance, curate_by_interest, filter_large_objects, rank_by_moid, sort_by_moid,
    RankedObject, RiskRanking, AU_TO_LUNAR_DISTANCE,
};
