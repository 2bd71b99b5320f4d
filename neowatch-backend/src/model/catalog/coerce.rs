//! Cell coercion for remote tables and CSV dumps
//!
//! Identifier and flag columns are read as text; every other known column is
//! parsed as a number. A cell that cannot be read becomes `None`; coercion never fails.

use neowatch_common::{resolve_identifier, CatalogRecord};
use serde_json::Value;
use std::collections::HashMap;

use super::types::OrbitEnrichment;

/// One raw cell, independent of where it came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell<'a> {
    Missing,
    Number(f64),
    Bool(bool),
    Text(&'a str),
}

impl<'a> From<&'a Value> for Cell<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::Null => Cell::Missing,
            Value::Bool(b) => Cell::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(Cell::Missing, Cell::Number),
            Value::String(s) => Cell::Text(s.as_str()),
            Value::Array(_) | Value::Object(_) => Cell::Missing,
        }
    }
}

impl<'a> From<&'a str> for Cell<'a> {
    fn from(s: &'a str) -> Self {
        Cell::Text(s)
    }
}

impl Cell<'_> {
    /// Finite number, or `None`.
    pub fn numeric(&self) -> Option<f64> {
        let value = match self {
            Cell::Number(n) => *n,
            Cell::Text(s) => s.trim().parse::<f64>().ok()?,
            Cell::Missing | Cell::Bool(_) => return None,
        };
        value.is_finite().then_some(value)
    }

    /// Y/N style flag; anything unrecognized is unknown.
    pub fn flag(&self) -> Option<bool> {
        match self {
            Cell::Bool(b) => Some(*b),
            Cell::Number(n) if *n == 1.0 => Some(true),
            Cell::Number(n) if *n == 0.0 => Some(false),
            Cell::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "y" | "yes" | "true" | "1" => Some(true),
                "n" | "no" | "false" | "0" => Some(false),
                _ => None,
            },
            _ => None,
        }
    }

    /// Trimmed non-empty text. Integral numbers print without a fraction
    /// so numeric SPK-IDs keep their usual form.
    pub fn text(&self) -> Option<String> {
        match self {
            Cell::Text(s) => {
                let s = s.trim();
                (!s.is_empty()).then(|| s.to_string())
            }
            Cell::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            Cell::Number(n) => Some(n.to_string()),
            Cell::Bool(b) => Some(b.to_string()),
            Cell::Missing => None,
        }
    }
}

/// Map source column names onto the canonical record field names.
pub fn canonical_field(name: &str) -> String {
    let name = name.trim().to_ascii_lowercase();
    match name.as_str() {
        "fullname" => "full_name".to_string(),
        "spk" | "spk_id" => "spkid".to_string(),
        _ => name,
    }
}

struct Row<'a> {
    cells: HashMap<String, Cell<'a>>,
}

impl<'a> Row<'a> {
    fn new<I>(cells: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, Cell<'a>)>,
    {
        let mut map = HashMap::new();
        for (name, cell) in cells {
            // first column wins if a source repeats a name
            map.entry(canonical_field(name)).or_insert(cell);
        }
        Self { cells: map }
    }

    fn cell(&self, field: &str) -> Cell<'a> {
        self.cells.get(field).copied().unwrap_or(Cell::Missing)
    }

    fn num(&self, field: &str) -> Option<f64> {
        self.cell(field).numeric()
    }

    fn flag(&self, field: &str) -> Option<bool> {
        self.cell(field).flag()
    }

    fn text(&self, field: &str) -> Option<String> {
        self.cell(field).text()
    }
}

/// Build a record from one row. Returns `None` when the row has no usable
/// identifier.
pub fn record_from_cells<'a, I>(cells: I) -> Option<CatalogRecord>
where
    I: IntoIterator<Item = (&'a str, Cell<'a>)>,
{
    let row = Row::new(cells);

    let full_name = row.text("full_name");
    let spkid = row.text("spkid");
    let pdes = row.text("pdes");
    let identifier = resolve_identifier(full_name.as_deref(), spkid.as_deref(), pdes.as_deref())?;

    let mut record = CatalogRecord::new(identifier);
    record.full_name = full_name;
    record.spkid = spkid;

    record.elements.a = row.num("a");
    record.elements.e = row.num("e");
    record.elements.i = row.num("i");
    record.elements.om = row.num("om");
    record.elements.w = row.num("w");
    record.elements.ma = row.num("ma");

    record.physical.diameter = row.num("diameter");
    record.physical.albedo = row.num("albedo");
    record.physical.h = row.num("h");
    record.physical.rot_per = row.num("rot_per");

    record.pha = row.flag("pha");
    record.neo = row.flag("neo");
    record.moid = row.num("moid");
    record.q = row.num("q");
    record.ad = row.num("ad");
    record.per_y = row.num("per_y");
    record.data_arc = row.num("data_arc");

    Some(record)
}

/// Read the enrichment columns of a lookup row. Absent fields stay `None`.
pub fn enrichment_from_cells<'a, I>(cells: I) -> OrbitEnrichment
where
    I: IntoIterator<Item = (&'a str, Cell<'a>)>,
{
    let row = Row::new(cells);
    OrbitEnrichment {
        a: row.num("a"),
        e: row.num("e"),
        i: row.num("i"),
        om: row.num("om"),
        w: row.num("w"),
        ma: row.num("ma"),
        q: row.num("q"),
        ad: row.num("ad"),
        per_y: row.num("per_y"),
        moid: row.num("moid"),
        pha: row.flag("pha"),
    }
}

/// Adapt a remote table row to the cell iterator the builders expect.
pub fn json_cells<'a>(row: &[(&'a str, &'a Value)]) -> Vec<(&'a str, Cell<'a>)> {
    row.iter()
        .map(|(name, value)| (*name, Cell::from(*value)))
        .collect()
}
