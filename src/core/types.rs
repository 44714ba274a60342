/// Core types used throughout csv2pprof: the profile model and the conversion error
use std::fmt;

use thiserror::Error;

/// The semantic meaning and unit of one position in every sample's value vector.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct ValueType {
    pub r#type: String,
    pub unit: String,
}

#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Function {
    pub id: u64,
    pub name: String,
}

/// A single frame occurrence. Each location maps to exactly one function.
#[derive(Debug, PartialEq, Eq, Hash, Clone)]
pub struct Location {
    pub id: u64,
    pub function_id: u64,
}

/// One input row: the stack in column order and the values in column-plan order.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Sample {
    pub location_ids: Vec<u64>,
    pub values: Vec<i64>,
}

#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct Profile {
    pub comments: Vec<String>,
    pub sample_types: Vec<ValueType>,
    pub functions: Vec<Function>,
    pub locations: Vec<Location>,
    pub samples: Vec<Sample>,
}

/// Renders a header row as a quoted list, e.g. `["stack", "time/ms"]`
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct HeaderRow(pub Vec<String>);

#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("expected \"stack\" in CSV header row, got: {header}")]
    MissingStackColumn { header: HeaderRow },
    #[error("expected columns with weights in CSV header row, got {header}")]
    NoWeightColumns { header: HeaderRow },
    #[error("error reading CSV: record on line {line}: wrong number of fields")]
    RowShape { line: u64 },
    #[error("on line {line}, couldn't parse number {text:?}: {source}")]
    ValueParse {
        line: u64,
        text: String,
        source: std::num::ParseIntError,
    },
    #[error("error reading CSV{}: {source}", on_line(.line))]
    Csv {
        line: Option<u64>,
        source: csv::Error,
    },
    #[error("expected a CSV header row, got empty input")]
    EmptyInput,
}

fn on_line(line: &Option<u64>) -> String {
    match line {
        Some(line) => format!(" on line {}", line),
        None => String::new(),
    }
}

impl ValueType {
    pub fn new(r#type: &str, unit: &str) -> ValueType {
        ValueType {
            r#type: r#type.to_owned(),
            unit: unit.to_owned(),
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}/{}", self.r#type, self.unit)
    }
}

impl fmt::Display for HeaderRow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

// Converted profiles number ids densely from 1, so the entry for `id` normally sits at
// `id - 1`. Anything else falls back to a linear scan.
fn by_id<T>(entries: &[T], id: u64, id_of: impl Fn(&T) -> u64) -> Option<&T> {
    let slot = id
        .checked_sub(1)
        .and_then(|i| usize::try_from(i).ok())
        .and_then(|i| entries.get(i))
        .filter(|entry| id_of(*entry) == id);
    slot.or_else(|| entries.iter().find(|entry| id_of(*entry) == id))
}

impl Profile {
    pub fn function(&self, id: u64) -> Option<&Function> {
        by_id(&self.functions, id, |f| f.id)
    }

    pub fn location(&self, id: u64) -> Option<&Location> {
        by_id(&self.locations, id, |l| l.id)
    }

    /// Frame names of a sample's stack, in stack order. Unknown ids are skipped.
    pub fn frame_names(&self, sample: &Sample) -> Vec<&str> {
        sample
            .location_ids
            .iter()
            .filter_map(|id| self.location(*id))
            .filter_map(|loc| self.function(loc.function_id))
            .map(|f| f.name.as_str())
            .collect()
    }
}
