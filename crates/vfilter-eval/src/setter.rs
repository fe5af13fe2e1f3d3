//! Pulls a run-time [`ValueSlot`] for one tag reference out of a `Record`.

use crate::record::{FieldValue, Record};
use crate::value::ValueSlot;
use vfilter_parse::{Binding, Namespace};
use vfilter_util::{FilterError, Result};

/// Extracts the run-time value a [`Binding`] describes out of `record`.
///
/// Dispatches on `(namespace, index.is_some(), flatten)` rather than a
/// function-pointer or trait-object per tag — the small enum-free match
/// below is the whole dispatcher.
pub fn extract_tag(record: &dyn Record, binding: &Binding, nsamples: usize) -> Result<ValueSlot> {
    match binding.namespace {
        Namespace::Info => extract_info(record, binding),
        Namespace::Format => extract_format(record, binding, nsamples),
        Namespace::Filter => unreachable!("%FILTER is bound through Node::Special, not TagRef"),
    }
}

fn extract_info(record: &dyn Record, binding: &Binding) -> Result<ValueSlot> {
    match record.info_value(binding.header_id) {
        FieldValue::Missing => Ok(ValueSlot::empty()),
        FieldValue::Flag(present) => Ok(ValueSlot::scalar(if present { 1.0 } else { 0.0 })),
        FieldValue::Numbers(nums) => Ok(match binding.index {
            Some(idx) => ValueSlot::scalar(nums.get(idx).copied().unwrap_or(f64::NAN)),
            None if binding.flatten => ValueSlot::raw(nums),
            None => ValueSlot::scalar(nums.first().copied().unwrap_or(f64::NAN)),
        }),
        FieldValue::Strings(strs) => {
            if binding.flatten {
                return Err(FilterError::Type(
                    "cannot reduce a string-valued field".to_string(),
                ));
            }
            let s = match binding.index {
                Some(idx) => strs.get(idx).cloned().flatten(),
                None => strs.into_iter().next().flatten(),
            };
            Ok(ValueSlot::string_scalar(s))
        }
    }
}

fn extract_format(record: &dyn Record, binding: &Binding, nsamples: usize) -> Result<ValueSlot> {
    let fv = record.format_values(binding.header_id);
    let arity = fv.per_sample_arity.max(1);

    if let Some(nums) = fv.numbers {
        return Ok(match binding.index {
            Some(idx) => {
                let vals: Vec<f64> = (0..nsamples)
                    .map(|s| nums.get(s * arity + idx).copied().unwrap_or(f64::NAN))
                    .collect();
                ValueSlot::sample_vector(vals)
            }
            None if binding.flatten => ValueSlot::raw(nums),
            None => ValueSlot::sample_vector(nums),
        });
    }

    if let Some(strs) = fv.strings {
        if binding.flatten {
            return Err(FilterError::Type(
                "cannot reduce a string-valued field".to_string(),
            ));
        }
        let vals: Vec<Option<String>> = match binding.index {
            Some(idx) => (0..nsamples).map(|s| strs.get(s * arity + idx).cloned().flatten()).collect(),
            None => (0..nsamples).map(|s| strs.get(s * arity).cloned().flatten()).collect(),
        };
        return Ok(ValueSlot::string_vector(vals));
    }

    Ok(ValueSlot::empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::test_support::RecordStub;
    use vfilter_parse::ValueType;

    fn binding(namespace: Namespace, index: Option<usize>, flatten: bool) -> Binding {
        Binding {
            namespace,
            header_id: 0,
            value_type: ValueType::Int,
            index,
            flatten,
        }
    }

    #[test]
    fn info_scalar_missing_is_empty() {
        let record = RecordStub::new();
        let slot = extract_tag(&record, &binding(Namespace::Info, None, false), 1).unwrap();
        assert!(slot.is_empty());
    }

    #[test]
    fn info_indexed_out_of_range_is_missing() {
        let record = RecordStub::new().with_info(0, FieldValue::Numbers(vec![1.0, 2.0]));
        let slot = extract_tag(&record, &binding(Namespace::Info, Some(5), false), 1).unwrap();
        assert!(slot.is_empty());
    }

    #[test]
    fn info_indexed_in_range_is_scalar() {
        let record = RecordStub::new().with_info(0, FieldValue::Numbers(vec![1.0, 2.0, 3.0, 4.0]));
        let slot = extract_tag(&record, &binding(Namespace::Info, Some(1), false), 1).unwrap();
        assert_eq!(slot.values, vec![2.0]);
    }

    #[test]
    fn format_scalar_reads_one_value_per_sample() {
        let record = RecordStub::new().with_format(
            0,
            FormatValues {
                per_sample_arity: 1,
                numbers: Some(vec![376.0]),
                strings: None,
            },
        );
        let slot = extract_tag(&record, &binding(Namespace::Format, None, false), 1).unwrap();
        assert_eq!(slot.sample_count, 1);
        assert_eq!(slot.values, vec![376.0]);
    }

    #[test]
    fn format_flatten_keeps_whole_reduction_buffer() {
        let record = RecordStub::new().with_format(
            0,
            FormatValues {
                per_sample_arity: 3,
                numbers: Some(vec![-10.0, 0.0, -10.0]),
                strings: None,
            },
        );
        let slot = extract_tag(&record, &binding(Namespace::Format, None, true), 1).unwrap();
        assert_eq!(slot.sample_count, 0);
        assert_eq!(slot.values, vec![-10.0, 0.0, -10.0]);
    }

    #[test]
    fn format_all_missing_collapses_to_empty() {
        let record = RecordStub::new().with_format(
            0,
            FormatValues {
                per_sample_arity: 1,
                numbers: Some(vec![f64::NAN, f64::NAN]),
                strings: None,
            },
        );
        let slot = extract_tag(&record, &binding(Namespace::Format, None, false), 2).unwrap();
        assert!(slot.is_empty());
    }
}
