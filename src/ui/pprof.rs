use flate2::{write::GzEncoder, Compression};
use std::collections::HashMap;
use std::io::prelude::*;

use crate::core::types::Profile;

use anyhow::Result;

use prost::Message; // for encode and decode methods below

pub mod pprofs {
    include!("perftools.profiles.rs");
}
use self::pprofs::{Function, Line, Location, Sample, ValueType};

/// Builds the pprof message for a profile. Strings go into a shared table; every other message
/// refers to them by index.
#[derive(Default)]
pub struct Encoder {
    profile: pprofs::Profile,
    known_strings: HashMap<String, i64>,
}

impl Encoder {
    pub fn new() -> Encoder {
        let mut encoder = Encoder::default();
        // string index 0 must point to "" according to the .proto spec
        encoder.string_id("");
        encoder
    }

    pub fn encode(mut self, profile: &Profile) -> pprofs::Profile {
        self.profile.sample_type = profile
            .sample_types
            .iter()
            .map(|vt| ValueType {
                r#type: self.string_id(&vt.r#type),
                unit: self.string_id(&vt.unit),
            })
            .collect();

        for function in &profile.functions {
            let f = Function {
                id: function.id,
                name: self.string_id(&function.name),
                ..Function::default()
            };
            self.profile.function.push(f);
        }

        self.profile.location = profile
            .locations
            .iter()
            .map(|location| Location {
                id: location.id,
                line: vec![Line {
                    function_id: location.function_id,
                    line: 0,
                }],
                ..Location::default()
            })
            .collect();

        self.profile.sample = profile
            .samples
            .iter()
            .map(|sample| Sample {
                location_id: sample.location_ids.clone(),
                value: sample.values.clone(),
                label: vec![],
            })
            .collect();

        self.profile.comment = profile
            .comments
            .iter()
            .map(|comment| self.string_id(comment))
            .collect();

        self.profile
    }

    fn string_id(&mut self, text: &str) -> i64 {
        if let Some(id) = self.known_strings.get(text) {
            return *id;
        }
        let strings = &mut self.profile.string_table;
        let next_id = strings.len() as i64;
        strings.push(text.to_owned());
        self.known_strings.insert(text.to_owned(), next_id);
        next_id
    }
}

pub fn encode(profile: &Profile) -> pprofs::Profile {
    Encoder::new().encode(profile)
}

/// Writes the profile in pprof's protobuf format, gzipped unless `gzip` is false.
pub fn write(profile: &Profile, w: &mut dyn Write, gzip: bool) -> Result<()> {
    let mut pprof_data = Vec::new();
    encode(profile).encode(&mut pprof_data)?;

    if gzip {
        let mut gzip = GzEncoder::new(Vec::new(), Compression::default());
        gzip.write_all(&pprof_data)?;
        w.write_all(&gzip.finish()?)?;
    } else {
        w.write_all(&pprof_data)?;
    }
    w.flush()?;

    Ok(())
}
