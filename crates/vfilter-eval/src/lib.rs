//! Evaluates a compiled filter expression against one record at a time.
//!
//! Compile an expression once with [`Program::compile`] against a caller's
//! [`Schema`], then call [`Program::evaluate`] per record.

mod eval;
mod program;
mod record;
mod setter;
mod value;

pub use program::{Program, Verdict};
pub use record::{FieldValue, FormatValues, Record};

pub use vfilter_parse::{Arity, CompileOptions, Namespace, Schema, UnknownTagPolicy, ValueType};

#[cfg(any(test, feature = "test-support"))]
pub use record::test_support::RecordStub;
