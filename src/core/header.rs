use crate::core::types::{ConvertError, HeaderRow, ValueType};

/// Label of the column holding the stack trace. Matched case-sensitively.
pub const STACK_COLUMN: &str = "stack";
/// Separates type from unit inside a weight column label, e.g. `time/ms`
pub const UNIT_DELIMITER: char = '/';
/// Unit assumed for weight columns that don't name one
pub const DEFAULT_UNIT: &str = "count";

/// A weighted column: where it sits in the record and what its values mean.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct WeightColumn {
    pub index: usize,
    pub value_type: ValueType,
}

/// The parsed header row. Weight columns are kept in header order, which fixes the layout of
/// every sample's value vector.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ColumnPlan {
    pub stack_index: usize,
    pub weights: Vec<WeightColumn>,
    pub width: usize,
}

impl ColumnPlan {
    pub fn parse<S: AsRef<str>>(header: &[S]) -> Result<ColumnPlan, ConvertError> {
        let mut stack_index = None;
        let mut stack_columns = 0;
        let mut weights = Vec::new();

        for (index, label) in header.iter().enumerate() {
            let label = label.as_ref();
            if label == STACK_COLUMN {
                stack_columns += 1;
                stack_index = Some(index);
            } else {
                weights.push(WeightColumn {
                    index,
                    value_type: parse_value_type(label),
                });
            }
        }

        let stack_index = match (stack_index, stack_columns) {
            (Some(index), 1) => index,
            _ => {
                return Err(ConvertError::MissingStackColumn {
                    header: header_row(header),
                })
            }
        };
        if weights.is_empty() {
            return Err(ConvertError::NoWeightColumns {
                header: header_row(header),
            });
        }

        Ok(ColumnPlan {
            stack_index,
            weights,
            width: header.len(),
        })
    }

    pub fn value_types(&self) -> Vec<ValueType> {
        self.weights.iter().map(|w| w.value_type.clone()).collect()
    }
}

/// Splits a weight column label into type and unit. The last `/`-separated segment is the unit
/// and everything before it, delimiters included, is the type. Labels without a delimiter get
/// the `count` unit.
pub fn parse_value_type(label: &str) -> ValueType {
    match label.rsplit_once(UNIT_DELIMITER) {
        Some((r#type, unit)) => ValueType::new(r#type, unit),
        None => ValueType::new(label, DEFAULT_UNIT),
    }
}

fn header_row<S: AsRef<str>>(header: &[S]) -> HeaderRow {
    HeaderRow(header.iter().map(|s| s.as_ref().to_owned()).collect())
}
