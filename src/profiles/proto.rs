//! Hand-built pprof protobufs for profiles that are not CPU samples.

use flate2::write::GzEncoder;
use flate2::Compression;
use pprof::protos::{Label, Message, Profile, Sample, ValueType};
use std::collections::HashMap;
use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

/// gzip `bytes` the way pprof tools expect `.pb.gz` files.
pub(crate) fn gzip(bytes: &[u8]) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(bytes.len() / 2 + 64), Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()
}

/// Encode and gzip a profile.
pub(crate) fn encode_gzipped(profile: &Profile) -> io::Result<Vec<u8>> {
    let mut raw = Vec::with_capacity(profile.encoded_len());
    profile.encode(&mut raw).map_err(io::Error::other)?;
    gzip(&raw)
}

/// Builder that owns the string table.
pub(crate) struct ProfileBuilder {
    profile: Profile,
    strings: HashMap<String, i64>,
}

impl ProfileBuilder {
    /// `sample_types` are `(type, unit)` pairs; the first is the default.
    pub(crate) fn new(sample_types: &[(&str, &str)]) -> Self {
        let mut builder = Self {
            profile: Profile::default(),
            strings: HashMap::new(),
        };
        // index 0 must be the empty string
        builder.intern("");
        let types: Vec<ValueType> = sample_types
            .iter()
            .map(|(ty, unit)| builder.value_type(ty, unit))
            .collect();
        builder.profile.sample_type = types;
        builder.profile.time_nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos() as i64)
            .unwrap_or_default();
        builder
    }

    fn intern(&mut self, s: &str) -> i64 {
        if let Some(&id) = self.strings.get(s) {
            return id;
        }
        let id = self.profile.string_table.len() as i64;
        self.profile.string_table.push(s.to_string());
        self.strings.insert(s.to_string(), id);
        id
    }

    fn value_type(&mut self, ty: &str, unit: &str) -> ValueType {
        ValueType {
            r#type: self.intern(ty),
            unit: self.intern(unit),
        }
    }

    pub(crate) fn period(mut self, ty: &str, unit: &str, period: i64) -> Self {
        self.profile.period_type = Some(self.value_type(ty, unit));
        self.profile.period = period;
        self
    }

    /// Add a sample with string labels and one value per sample type.
    pub(crate) fn sample(&mut self, values: Vec<i64>, labels: &[(&str, &str)]) {
        let label = labels
            .iter()
            .map(|(key, value)| Label {
                key: self.intern(key),
                str: self.intern(value),
                ..Label::default()
            })
            .collect();
        self.profile.sample.push(Sample {
            location_id: Vec::new(),
            value: values,
            label,
        });
    }

    pub(crate) fn build(self) -> Profile {
        self.profile
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;

    #[test]
    fn test_string_table_starts_empty_and_dedups() {
        let mut builder = ProfileBuilder::new(&[("threads", "count")]).period("threads", "count", 1);
        builder.sample(vec![1], &[("thread", "main")]);
        builder.sample(vec![1], &[("thread", "main")]);
        let profile = builder.build();
        assert_eq!(profile.string_table[0], "");
        assert_eq!(
            profile.string_table,
            vec!["", "threads", "count", "thread", "main"]
        );
        assert_eq!(profile.sample.len(), 2);
        assert_eq!(profile.period, 1);
    }

    #[test]
    fn test_gzipped_profile_decodes() {
        let profile = ProfileBuilder::new(&[("space", "bytes")]).build();
        let bytes = encode_gzipped(&profile).unwrap();
        assert_eq!(&bytes[..2], &[0x1f, 0x8b]);

        let mut raw = Vec::new();
        GzDecoder::new(bytes.as_slice()).read_to_end(&mut raw).unwrap();
        let decoded = Profile::decode(raw.as_slice()).unwrap();
        assert_eq!(decoded.sample_type.len(), 1);
    }
}
