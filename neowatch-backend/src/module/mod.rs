pub mod orbit;
pub mod risk;
