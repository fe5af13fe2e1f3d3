//! The mutable per-evaluation value domain: [`Tri`] and [`ValueSlot`].

use vfilter_util::BitSet;

/// Three-valued verdict: missing data is neither a pass nor a fail.
///
/// `Unknown` only ever appears transiently — every operator resolves it
/// to `Fail` or `Pass` before the value leaves its hands, matching the
/// contract that a finished evaluation never reports "unknown" upward.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tri {
    Unknown,
    Fail,
    Pass,
}

impl Tri {
    pub fn from_bool(b: bool) -> Self {
        if b {
            Tri::Pass
        } else {
            Tri::Fail
        }
    }

    pub fn as_bool(self) -> bool {
        matches!(self, Tri::Pass)
    }
}

/// The mutable run-time value attached to one RPN node during a single
/// evaluation.
///
/// `values` holds the numeric payload; `f64::NAN` marks a single missing
/// element (IEEE754 already propagates it through arithmetic and fails
/// every ordered comparison, which is exactly the semantics missing data
/// needs — no separate per-element `Option` bookkeeping required). An
/// *entirely* empty `values` means "fully missing": every setter and
/// operator collapses an all-NaN result down to empty rather than leaving
/// a vector of NaNs around.
///
/// `sample_count` distinguishes a site-level scalar (`0`) from a
/// per-sample vector (`nsamples`); a `flatten`-bound reduction argument is
/// a third, in-between shape that isn't either — see [`ValueSlot::raw`].
#[derive(Clone, Debug, Default)]
pub struct ValueSlot {
    pub values: Vec<f64>,
    pub strings: Vec<Option<String>>,
    pub is_string: bool,
    pub sample_count: usize,
    pub pass_site: Option<Tri>,
    pub pass_samples: BitSet,
}

impl ValueSlot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn scalar(v: f64) -> Self {
        if v.is_nan() {
            return Self::empty();
        }
        Self {
            values: vec![v],
            ..Default::default()
        }
    }

    pub fn sample_vector(values: Vec<f64>) -> Self {
        if values.iter().all(|v| v.is_nan()) {
            return Self::empty();
        }
        let sample_count = values.len();
        Self {
            values,
            sample_count,
            ..Default::default()
        }
    }

    /// A raw, unshaped numeric vector — the argument to a reduction
    /// function before it's been collapsed to a scalar. `sample_count`
    /// stays `0` even though this isn't a site scalar; only `Func`
    /// consumes a slot in this shape.
    pub fn raw(values: Vec<f64>) -> Self {
        if values.iter().all(|v| v.is_nan()) {
            return Self::empty();
        }
        Self {
            values,
            ..Default::default()
        }
    }

    pub fn string_scalar(s: Option<String>) -> Self {
        match s {
            None => Self::empty_string(),
            Some(s) => Self {
                strings: vec![Some(s)],
                is_string: true,
                ..Default::default()
            },
        }
    }

    pub fn string_vector(strings: Vec<Option<String>>) -> Self {
        if strings.iter().all(Option::is_none) {
            return Self::empty_string();
        }
        let sample_count = strings.len();
        Self {
            strings,
            is_string: true,
            sample_count,
            ..Default::default()
        }
    }

    fn empty_string() -> Self {
        Self {
            is_string: true,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        if self.is_string {
            self.strings.is_empty()
        } else {
            self.values.is_empty()
        }
    }

    pub fn len(&self) -> usize {
        if self.is_string {
            self.strings.len()
        } else {
            self.values.len()
        }
    }
}
