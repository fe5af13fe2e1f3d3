//! The `Record` trait a caller implements over its own decoded record.

use vfilter_parse::Unpack;

/// A site-level (INFO) field's decoded value.
///
/// Already resolved out of whatever binary/text encoding the real record
/// format uses — parsing that encoding is explicitly the caller's job, not
/// this crate's. A missing numeric element is `f64::NAN`, matching
/// [`crate::ValueSlot`]'s convention.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Missing,
    Flag(bool),
    Numbers(Vec<f64>),
    Strings(Vec<Option<String>>),
}

/// A FORMAT (per-sample) field's decoded value: row-major, `nsamples *
/// per_sample_arity` entries, sample-major (`numbers[s * arity + k]`).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FormatValues {
    pub per_sample_arity: usize,
    pub numbers: Option<Vec<f64>>,
    pub strings: Option<Vec<Option<String>>>,
}

impl FormatValues {
    pub fn missing() -> Self {
        Self::default()
    }
}

/// One variant-call record, described only by the interface it exposes.
///
/// A real implementation sits on top of a parsed header/record pair;
/// `vfilter-eval` never touches the underlying encoding, only this trait.
pub trait Record {
    fn qual(&self) -> Option<f64>;
    fn variant_type_bits(&self) -> i64;
    fn applied_filters(&self) -> &[u32];
    fn info_value(&self, id: u32) -> FieldValue;
    fn format_values(&self, id: u32) -> FormatValues;
    fn unpack(&mut self, mask: Unpack);
}

/// In-memory [`Record`] used by this workspace's own test suite.
#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    use super::*;
    use rustc_hash::FxHashMap;

    #[derive(Default)]
    pub struct RecordStub {
        pub qual: Option<f64>,
        pub variant_type_bits: i64,
        pub applied_filters: Vec<u32>,
        pub info: FxHashMap<u32, FieldValue>,
        pub format: FxHashMap<u32, FormatValues>,
        pub unpacked: Unpack,
    }

    impl RecordStub {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_qual(mut self, qual: f64) -> Self {
            self.qual = Some(qual);
            self
        }

        pub fn with_variant_type(mut self, bits: i64) -> Self {
            self.variant_type_bits = bits;
            self
        }

        pub fn with_filter(mut self, id: u32) -> Self {
            self.applied_filters.push(id);
            self
        }

        pub fn with_info(mut self, id: u32, value: FieldValue) -> Self {
            self.info.insert(id, value);
            self
        }

        pub fn with_format(mut self, id: u32, value: FormatValues) -> Self {
            self.format.insert(id, value);
            self
        }
    }

    impl Record for RecordStub {
        fn qual(&self) -> Option<f64> {
            self.qual
        }

        fn variant_type_bits(&self) -> i64 {
            self.variant_type_bits
        }

        fn applied_filters(&self) -> &[u32] {
            &self.applied_filters
        }

        fn info_value(&self, id: u32) -> FieldValue {
            self.info.get(&id).cloned().unwrap_or(FieldValue::Missing)
        }

        fn format_values(&self, id: u32) -> FormatValues {
            self.format.get(&id).cloned().unwrap_or_default()
        }

        fn unpack(&mut self, mask: Unpack) {
            self.unpacked.merge(mask);
        }
    }
}
