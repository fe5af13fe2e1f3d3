//! The stack machine that walks a compiled RPN program against one record.

use crate::record::Record;
use crate::setter::extract_tag;
use crate::value::{Tri, ValueSlot};
use vfilter_parse::{FuncKind, Literal, Node, OpKind, SpecialKind};
use vfilter_util::{BitSet, FilterError, Result};

/// Runs the compiled RPN program once against `record` and returns the
/// single surviving stack slot.
///
/// A stack machine: every node either pushes a value or pops its operands
/// and pushes their combination. `Program::evaluate` (the public entry
/// point) turns the returned slot into a `Verdict`; this function only
/// knows about `ValueSlot`s.
/// Derives the `(site_pass, sample_pass)` pair the public API reports from
/// the program's final stack slot. When the slot never carried a
/// per-sample shape (e.g. the whole expression reduced to a site-level
/// comparison), the site verdict is broadcast across every sample —
/// matching the source's fallback for a scalar result reaching the top.
pub fn finalize(slot: &ValueSlot, nsamples: usize) -> (bool, BitSet) {
    (site_bool(slot), sample_bits(slot, nsamples))
}

pub fn evaluate_nodes(nodes: &[Node], record: &dyn Record, nsamples: usize) -> Result<ValueSlot> {
    let mut stack: Vec<ValueSlot> = Vec::with_capacity(nodes.len());

    for node in nodes {
        let slot = match node {
            Node::Literal(Literal::Number(n)) => ValueSlot::scalar(*n),
            Node::Literal(Literal::Str(s)) => ValueSlot::string_scalar(Some(s.clone())),
            Node::TypeLiteral(code) => ValueSlot::scalar(*code as f64),
            Node::FilterLiteral(id) => ValueSlot::scalar(id.map(|i| i as f64).unwrap_or(-1.0)),
            Node::TagRef(binding) => extract_tag(record, binding, nsamples)?,
            Node::Special(SpecialKind::Qual) => ValueSlot::scalar(record.qual().unwrap_or(f64::NAN)),
            Node::Special(SpecialKind::Type) => ValueSlot::scalar(record.variant_type_bits() as f64),
            Node::Special(SpecialKind::Filter) => ValueSlot::empty(),
            Node::Func(kind) => {
                let arg = pop(&mut stack)?;
                reduce(*kind, arg)
            }
            Node::BinOp(kind) => {
                let b = pop(&mut stack)?;
                let a = pop(&mut stack)?;
                apply_binop(*kind, a, b, record, nsamples)?
            }
        };
        stack.push(slot);
    }

    if stack.len() != 1 {
        return Err(FilterError::Arity(format!(
            "program left {} values on the stack, expected 1",
            stack.len()
        )));
    }
    Ok(stack.pop().unwrap())
}

fn pop(stack: &mut Vec<ValueSlot>) -> Result<ValueSlot> {
    stack
        .pop()
        .ok_or_else(|| FilterError::Arity("operator applied to an empty stack".to_string()))
}

fn reduce(kind: FuncKind, arg: ValueSlot) -> ValueSlot {
    if arg.is_string {
        // Never reachable through the parser (string fields reject `flatten`
        // binding in `extract_tag`), kept as a safe fallback.
        return ValueSlot::empty();
    }
    let present: Vec<f64> = arg.values.iter().copied().filter(|v| !v.is_nan()).collect();
    if present.is_empty() {
        return ValueSlot::empty();
    }
    let result = match kind {
        FuncKind::Max => present.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        FuncKind::Min => present.iter().copied().fold(f64::INFINITY, f64::min),
        FuncKind::Avg => present.iter().sum::<f64>() / present.len() as f64,
    };
    ValueSlot::scalar(result)
}

fn apply_binop(
    kind: OpKind,
    a: ValueSlot,
    b: ValueSlot,
    record: &dyn Record,
    nsamples: usize,
) -> Result<ValueSlot> {
    use OpKind::*;
    match kind {
        Add | Sub | Mul | Div => apply_arith(kind, a, b),
        Lt | Le | Gt | Ge | Eq | Ne => apply_compare(kind, a, b, nsamples),
        TypeEq | TypeNe => Ok(apply_type_compare(kind, a, b)),
        FilterEq | FilterNe => Ok(apply_filter_compare(kind, b, record)),
        Or | And | OrVec | AndVec => Ok(combine_logical(kind, &a, &b, nsamples)),
    }
}

fn arith_op(kind: OpKind, x: f64, y: f64) -> f64 {
    match kind {
        OpKind::Add => x + y,
        OpKind::Sub => x - y,
        OpKind::Mul => x * y,
        OpKind::Div => x / y,
        _ => unreachable!(),
    }
}

fn apply_arith(kind: OpKind, a: ValueSlot, b: ValueSlot) -> Result<ValueSlot> {
    if a.is_string || b.is_string {
        return Err(FilterError::Type("arithmetic on a string operand".to_string()));
    }
    if a.is_empty() || b.is_empty() {
        return Ok(ValueSlot::empty());
    }
    match (a.sample_count, b.sample_count) {
        (0, 0) => Ok(ValueSlot::scalar(arith_op(kind, a.values[0], b.values[0]))),
        (0, n) if n > 0 => {
            let sv = a.values[0];
            Ok(ValueSlot::sample_vector(
                b.values.iter().map(|&y| arith_op(kind, sv, y)).collect(),
            ))
        }
        (n, 0) if n > 0 => {
            let sv = b.values[0];
            Ok(ValueSlot::sample_vector(
                a.values.iter().map(|&x| arith_op(kind, x, sv)).collect(),
            ))
        }
        (na, nb) if na == nb => Ok(ValueSlot::sample_vector(
            a.values
                .iter()
                .zip(b.values.iter())
                .map(|(&x, &y)| arith_op(kind, x, y))
                .collect(),
        )),
        _ => Err(FilterError::Type(
            "mismatched per-sample vector lengths".to_string(),
        )),
    }
}

fn numeric_compare(kind: OpKind, x: f64, y: f64) -> bool {
    match kind {
        OpKind::Lt => x < y,
        OpKind::Le => x <= y,
        OpKind::Gt => x > y,
        OpKind::Ge => x >= y,
        OpKind::Eq => x == y,
        OpKind::Ne => x != y,
        _ => unreachable!(),
    }
}

fn string_compare(kind: OpKind, x: &Option<String>, y: &Option<String>) -> bool {
    let eq = matches!((x, y), (Some(x), Some(y)) if x == y);
    if kind == OpKind::Ne {
        !eq
    } else {
        eq
    }
}

fn apply_compare(kind: OpKind, a: ValueSlot, b: ValueSlot, nsamples: usize) -> Result<ValueSlot> {
    if a.is_string || b.is_string {
        if !matches!(kind, OpKind::Eq | OpKind::Ne) {
            return Err(FilterError::Type(
                "only == and != are supported on string operands".to_string(),
            ));
        }
        return compare_strings(kind, a, b, nsamples);
    }

    if a.is_empty() || b.is_empty() {
        let mut slot = ValueSlot::empty();
        slot.pass_site = Some(Tri::Fail);
        return Ok(slot);
    }

    match (a.sample_count, b.sample_count) {
        (0, 0) => {
            let mut slot = ValueSlot::empty();
            slot.pass_site = Some(Tri::from_bool(numeric_compare(kind, a.values[0], b.values[0])));
            Ok(slot)
        }
        (0, n) if n > 0 => {
            let sv = a.values[0];
            let bits = b.values.iter().map(|&y| numeric_compare(kind, sv, y)).collect();
            Ok(vector_pass(bits, nsamples))
        }
        (n, 0) if n > 0 => {
            let sv = b.values[0];
            let bits = a.values.iter().map(|&x| numeric_compare(kind, x, sv)).collect();
            Ok(vector_pass(bits, nsamples))
        }
        (na, nb) if na == nb => {
            let bits = a
                .values
                .iter()
                .zip(b.values.iter())
                .map(|(&x, &y)| numeric_compare(kind, x, y))
                .collect();
            Ok(vector_pass(bits, nsamples))
        }
        _ => Err(FilterError::Type(
            "mismatched per-sample vector lengths".to_string(),
        )),
    }
}

fn compare_strings(kind: OpKind, a: ValueSlot, b: ValueSlot, nsamples: usize) -> Result<ValueSlot> {
    if a.is_empty() || b.is_empty() {
        let mut slot = ValueSlot::empty();
        slot.pass_site = Some(Tri::Fail);
        return Ok(slot);
    }
    match (a.sample_count, b.sample_count) {
        (0, 0) => {
            let mut slot = ValueSlot::empty();
            slot.pass_site = Some(Tri::from_bool(string_compare(kind, &a.strings[0], &b.strings[0])));
            Ok(slot)
        }
        (0, n) if n > 0 => {
            let sv = &a.strings[0];
            let bits = b.strings.iter().map(|y| string_compare(kind, sv, y)).collect();
            Ok(vector_pass(bits, nsamples))
        }
        (n, 0) if n > 0 => {
            let sv = &b.strings[0];
            let bits = a.strings.iter().map(|x| string_compare(kind, x, sv)).collect();
            Ok(vector_pass(bits, nsamples))
        }
        (na, nb) if na == nb => {
            let bits = a
                .strings
                .iter()
                .zip(b.strings.iter())
                .map(|(x, y)| string_compare(kind, x, y))
                .collect();
            Ok(vector_pass(bits, nsamples))
        }
        _ => Err(FilterError::Type(
            "cannot compare vectors of different length".to_string(),
        )),
    }
}

fn vector_pass(bits_vals: Vec<bool>, nsamples: usize) -> ValueSlot {
    let mut slot = ValueSlot::empty();
    slot.sample_count = nsamples;
    let mut bits = BitSet::with_len(nsamples);
    for (i, v) in bits_vals.into_iter().enumerate().take(nsamples) {
        bits.set(i, v);
    }
    slot.pass_site = Some(Tri::from_bool(bits.any()));
    slot.pass_samples = bits;
    slot
}

fn apply_type_compare(kind: OpKind, a: ValueSlot, b: ValueSlot) -> ValueSlot {
    let bits = a.values.first().copied().unwrap_or(0.0) as i64;
    let code = b.values.first().copied().unwrap_or(0.0) as i64;
    let matches = if code == 0 { bits == 0 } else { bits & code != 0 };
    let v = if kind == OpKind::TypeNe { !matches } else { matches };
    let mut slot = ValueSlot::empty();
    slot.pass_site = Some(Tri::from_bool(v));
    slot
}

fn apply_filter_compare(kind: OpKind, literal: ValueSlot, record: &dyn Record) -> ValueSlot {
    let id: Option<u32> = literal
        .values
        .first()
        .copied()
        .filter(|v| *v >= 0.0)
        .map(|v| v.round() as u32);
    let filters = record.applied_filters();
    let eq_result = match id {
        None => filters.is_empty(),
        Some(id) => filters.contains(&id),
    };
    let v = if kind == OpKind::FilterNe { !eq_result } else { eq_result };
    let mut slot = ValueSlot::empty();
    slot.pass_site = Some(Tri::from_bool(v));
    slot
}

fn site_bool(slot: &ValueSlot) -> bool {
    match slot.pass_site {
        Some(t) => t.as_bool(),
        None if slot.sample_count > 0 => slot.values.iter().any(|&v| !v.is_nan() && v != 0.0),
        None => slot
            .values
            .first()
            .map(|&v| !v.is_nan() && v != 0.0)
            .unwrap_or(false),
    }
}

fn sample_bits(slot: &ValueSlot, nsamples: usize) -> BitSet {
    if slot.sample_count > 0 {
        if slot.pass_samples.len() == nsamples {
            return slot.pass_samples.clone();
        }
        return slot
            .values
            .iter()
            .take(nsamples)
            .map(|&v| !v.is_nan() && v != 0.0)
            .collect();
    }
    let b = site_bool(slot);
    (0..nsamples).map(|_| b).collect()
}

/// `And`/`Or` (`&`/`|`) reduce both sides to a site boolean before
/// combining, discarding any per-sample shape. `AndVec`/`OrVec` (`&&`/
/// `||`) instead combine pointwise per sample and derive the site bit from
/// whether any combined sample passed.
fn combine_logical(kind: OpKind, a: &ValueSlot, b: &ValueSlot, nsamples: usize) -> ValueSlot {
    let is_and = matches!(kind, OpKind::And | OpKind::AndVec);

    if matches!(kind, OpKind::And | OpKind::Or) {
        let sa = site_bool(a);
        let sb = site_bool(b);
        let v = if is_and { sa && sb } else { sa || sb };
        let mut slot = ValueSlot::empty();
        slot.pass_site = Some(Tri::from_bool(v));
        return slot;
    }

    let bits_a = sample_bits(a, nsamples);
    let bits_b = sample_bits(b, nsamples);
    let mut bits = BitSet::with_len(nsamples);
    let mut any = false;
    for i in 0..nsamples {
        let v = if is_and {
            bits_a.get(i) && bits_b.get(i)
        } else {
            bits_a.get(i) || bits_b.get(i)
        };
        bits.set(i, v);
        any |= v;
    }
    let mut slot = ValueSlot::empty();
    slot.sample_count = nsamples;
    slot.pass_samples = bits;
    slot.pass_site = Some(Tri::from_bool(any));
    slot
}
