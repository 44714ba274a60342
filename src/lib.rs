//! csv2pprof converts a CSV table of weighted stack traces into a pprof profile.
//!
//! The first row of the table is a header. Exactly one column must be labelled `stack`; its cells
//! hold `;`-separated frame names. Every other column is a weight column labelled `type/unit`
//! (or just `type`, in which case the unit is `count`). Each data row becomes one sample.
//!
//! ```text
//! stack,samples/count,time/ms
//! main;parse;read,1,1000
//! main;render,2,2000
//! ```
//!
//! [`convert`] returns the in-memory [`Profile`]; [`ui::pprof::write`] encodes it.

use std::io::Read;

use log::debug;

pub mod core;
pub mod ui;

pub use crate::core::header::ColumnPlan;
pub use crate::core::reader::Config;
pub use crate::core::types::{ConvertError, Function, Location, Profile, Sample, ValueType};

/// Name recorded in the comment of every generated profile
pub const GENERATOR: &str = "csv2pprof";

/// Converts a comma-separated table into a profile.
pub fn convert<R: Read>(reader: R) -> Result<Profile, ConvertError> {
    convert_with_config(reader, &Config::default())
}

/// Converts a table into a profile. Conversion stops at the first bad record; no partial profile
/// is returned.
pub fn convert_with_config<R: Read>(reader: R, config: &Config) -> Result<Profile, ConvertError> {
    let mut records = crate::core::reader::records(reader, config);

    let header = records.next().ok_or(ConvertError::EmptyInput)??;
    let labels: Vec<&str> = header.fields.iter().collect();
    let plan = ColumnPlan::parse(&labels[..])?;
    debug!(
        "stack in column {}, sample types: {:?}",
        plan.stack_index,
        plan.weights
            .iter()
            .map(|w| w.value_type.to_string())
            .collect::<Vec<String>>()
    );

    let comments = vec![format!("Generated by {}", GENERATOR)];
    crate::core::translate::Translator::new(plan, comments).translate(records)
}
