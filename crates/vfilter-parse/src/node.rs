//! The RPN node types a compiled program is built from.

use crate::schema::{Namespace, ValueType};

/// A compile-time literal: either spelling resolves to one of these before
/// the RPN program is built, never re-parsed at evaluation time.
#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Number(f64),
    Str(String),
}

/// `%QUAL`, `%TYPE`, `%FILTER` — tags that bypass ordinary header lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SpecialKind {
    Qual,
    Type,
    Filter,
}

/// A resolved tag reference: namespace, header id, optional subscript, and
/// enough type information for the evaluator to pick an extractor without
/// touching the schema again.
#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    pub namespace: Namespace,
    pub header_id: u32,
    pub value_type: ValueType,
    /// `Some(i)` for a `TAG[i]` subscript.
    pub index: Option<usize>,
    /// Set when this reference sits inside a reduction function with no
    /// explicit subscript; permits binding to a declared arity other than
    /// `One` by flattening the whole field instead of indexing into it.
    pub flatten: bool,
}

/// Binary operators as they appear in the RPN program.
///
/// `TypeEq`/`TypeNe` and `FilterEq`/`FilterNe` are produced by the parser's
/// symbolic post-pass from plain `Eq`/`Ne`; the evaluator never sees a
/// generic `Eq`/`Ne` whose operand is `%TYPE` or `%FILTER`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OpKind {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    TypeEq,
    TypeNe,
    FilterEq,
    FilterNe,
    Add,
    Sub,
    Mul,
    Div,
    Or,
    And,
    OrVec,
    AndVec,
}

/// Reduction functions, lowered from `Max`/`Min`/`Avg` tokens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FuncKind {
    Max,
    Min,
    Avg,
}

/// One element of the compiled RPN program.
///
/// Value slots (the mutable per-evaluation scratch) live in a separate
/// arena indexed in parallel with this array; `Node` itself is inert and
/// shared read-only across evaluations of the same `Program`.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Literal(Literal),
    TagRef(Binding),
    Special(SpecialKind),
    /// The resolved filter-id operand of a `%FILTER` comparison; `None` is
    /// the `.` sentinel ("no filter").
    FilterLiteral(Option<u32>),
    /// The resolved variant-type bitmask operand of a `%TYPE` comparison.
    TypeLiteral(i64),
    BinOp(OpKind),
    Func(FuncKind),
}

/// Which parts of a record a compiled program actually touches, so a
/// caller can skip decoding columns the expression never reads.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Unpack {
    pub qual: bool,
    pub info: bool,
    pub format: bool,
    pub filter: bool,
}

impl Unpack {
    pub fn merge(&mut self, other: Unpack) {
        self.qual |= other.qual;
        self.info |= other.info;
        self.format |= other.format;
        self.filter |= other.filter;
    }
}
