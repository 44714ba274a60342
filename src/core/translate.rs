use std::collections::HashMap;

use log::{debug, trace};

use crate::core::header::ColumnPlan;
use crate::core::reader::Record;
use crate::core::types::{ConvertError, Function, Location, Profile, Sample};

/// Separates frames inside the stack column, e.g. `main;parse;read`
pub const FRAME_DELIMITER: char = ';';

/// Frame name to id lookup. Function and location ids are both assigned from the same counter,
/// starting at 1, in order of first sight.
#[derive(Debug, Default)]
pub struct FrameTable {
    known_frames: HashMap<String, u64>,
}

impl FrameTable {
    pub fn new() -> FrameTable {
        FrameTable::default()
    }

    pub fn len(&self) -> usize {
        self.known_frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known_frames.is_empty()
    }

    /// Returns the location id for `name`, adding a function and location to `profile` the first
    /// time a name is seen.
    pub fn get_or_create_location_id(&mut self, name: &str, profile: &mut Profile) -> u64 {
        if let Some(id) = self.known_frames.get(name) {
            return *id;
        }
        let next_id = self.known_frames.len() as u64 + 1; // ids must be non-0
        self.known_frames.insert(name.to_owned(), next_id);
        profile.functions.push(Function {
            id: next_id,
            name: name.to_owned(),
        });
        profile.locations.push(Location {
            id: next_id,
            function_id: next_id,
        });
        trace!("new frame {} -> {}", next_id, name);
        next_id
    }
}

/// Splits a stack cell into frame names, left to right. Empty names are dropped.
pub fn split_stack(cell: &str) -> impl Iterator<Item = &str> {
    cell.split(FRAME_DELIMITER).filter(|frame| !frame.is_empty())
}

/// Folds data records into a profile. Built from a `ColumnPlan`; feed it every record after the
/// header with `add_record`, then call `finish`.
pub struct Translator {
    plan: ColumnPlan,
    profile: Profile,
    frames: FrameTable,
}

impl Translator {
    pub fn new(plan: ColumnPlan, comments: Vec<String>) -> Translator {
        let profile = Profile {
            comments,
            sample_types: plan.value_types(),
            ..Profile::default()
        };
        Translator {
            plan,
            profile,
            frames: FrameTable::new(),
        }
    }

    pub fn add_record(&mut self, record: &Record) -> Result<(), ConvertError> {
        if record.fields.len() != self.plan.width {
            return Err(ConvertError::RowShape { line: record.line });
        }

        let mut values = Vec::with_capacity(self.plan.weights.len());
        for column in &self.plan.weights {
            let text = &record.fields[column.index];
            let value = text
                .parse::<i64>()
                .map_err(|source| ConvertError::ValueParse {
                    line: record.line,
                    text: text.to_owned(),
                    source,
                })?;
            values.push(value);
        }

        let location_ids = split_stack(&record.fields[self.plan.stack_index])
            .map(|frame| {
                self.frames
                    .get_or_create_location_id(frame, &mut self.profile)
            })
            .collect();

        self.profile.samples.push(Sample {
            location_ids,
            values,
        });
        Ok(())
    }

    pub fn finish(self) -> Profile {
        debug!(
            "translated {} samples over {} distinct frames",
            self.profile.samples.len(),
            self.frames.len()
        );
        self.profile
    }

    /// Runs the whole fold, stopping at the first error.
    pub fn translate<I>(mut self, records: I) -> Result<Profile, ConvertError>
    where
        I: IntoIterator<Item = Result<Record, ConvertError>>,
    {
        for record in records {
            self.add_record(&record?)?;
        }
        Ok(self.finish())
    }
}

#[cfg(test)]
mod tests {
    use crate::core::header::ColumnPlan;
    use crate::core::translate::*;
    use crate::core::types::ValueType;

    // Build a test record
    fn r(line: u64, fields: &[&str]) -> Result<Record, ConvertError> {
        Ok(Record {
            line,
            fields: csv::StringRecord::from(fields.to_vec()),
        })
    }

    fn translator(header: &[&str]) -> Translator {
        Translator::new(ColumnPlan::parse(header).unwrap(), vec![])
    }

    #[test]
    fn split_stack_keeps_order_and_drops_empty_frames() {
        let frames: Vec<&str> = split_stack("foo;;bar;").collect();
        assert_eq!(frames, vec!["foo", "bar"]);
        assert_eq!(split_stack("").count(), 0);
    }

    #[test]
    fn frame_table_reuses_ids() {
        let mut profile = Profile::default();
        let mut table = FrameTable::new();
        assert!(table.is_empty());
        assert_eq!(table.get_or_create_location_id("foo", &mut profile), 1);
        assert_eq!(table.get_or_create_location_id("bar", &mut profile), 2);
        assert_eq!(table.get_or_create_location_id("foo", &mut profile), 1);
        assert_eq!(table.len(), 2);
        assert_eq!(profile.functions.len(), 2);
        assert_eq!(
            profile.locations,
            vec![
                Location {
                    id: 1,
                    function_id: 1
                },
                Location {
                    id: 2,
                    function_id: 2
                },
            ]
        );
    }

    #[test]
    fn shared_frames_across_rows() {
        let profile = translator(&["stack", "samples/count", "time/ms"])
            .translate(vec![
                r(2, &["foo;bar", "1", "1000"]),
                r(3, &["foo", "2", "2000"]),
            ])
            .unwrap();

        assert_eq!(
            profile.sample_types,
            vec![ValueType::new("samples", "count"), ValueType::new("time", "ms")]
        );
        assert_eq!(
            profile.samples,
            vec![
                Sample {
                    location_ids: vec![1, 2],
                    values: vec![1, 1000],
                },
                Sample {
                    location_ids: vec![1],
                    values: vec![2, 2000],
                },
            ]
        );
        assert_eq!(profile.frame_names(&profile.samples[0]), vec!["foo", "bar"]);
    }

    #[test]
    fn values_follow_column_plan_order() {
        let profile = translator(&["time/seconds", "stack", "age/years"])
            .translate(vec![r(2, &["1", "foo;bar", "18"])])
            .unwrap();
        assert_eq!(profile.samples[0].values, vec![1, 18]);
        assert_eq!(profile.frame_names(&profile.samples[0]), vec!["foo", "bar"]);
    }

    #[test]
    fn negative_and_signed_values() {
        let profile = translator(&["stack", "delta"])
            .translate(vec![r(2, &["foo", "-5"]), r(3, &["foo", "+7"])])
            .unwrap();
        assert_eq!(profile.samples[0].values, vec![-5]);
        assert_eq!(profile.samples[1].values, vec![7]);
    }

    #[test]
    fn unparsable_value() {
        let err = translator(&["stack", "weight"])
            .translate(vec![r(2, &["foo;bar", "not-a-number"])])
            .unwrap_err();
        match err {
            ConvertError::ValueParse { line, ref text, .. } => {
                assert_eq!(line, 2);
                assert_eq!(text, "not-a-number");
            }
            other => panic!("expected a value parse error, got {:?}", other),
        }
    }

    #[test]
    fn first_error_aborts() {
        let err = translator(&["stack", "weight"])
            .translate(vec![
                r(2, &["foo", "1"]),
                r(3, &["foo", "x"]),
                r(4, &["foo", "y"]),
            ])
            .unwrap_err();
        assert!(matches!(err, ConvertError::ValueParse { line: 3, .. }));
    }

    #[test]
    fn record_with_wrong_width() {
        let mut t = translator(&["stack", "weight"]);
        let err = t.add_record(&r(2, &["foo"]).unwrap()).unwrap_err();
        assert!(matches!(err, ConvertError::RowShape { line: 2 }));
    }

    #[test]
    fn empty_stack_cell() {
        let profile = translator(&["stack", "weight"])
            .translate(vec![r(2, &["", "3"])])
            .unwrap();
        assert!(profile.samples[0].location_ids.is_empty());
        assert!(profile.functions.is_empty());
    }
}
