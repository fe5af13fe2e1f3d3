//! Shunting-Yard parser and header binding for filter expressions.
//!
//! Turns a [`vfilter_lex::Token`] stream into a compiled [`RpnProgram`]:
//! tag references are resolved against a [`Schema`] as they're seen, and a
//! post-pass rewires `%TYPE`/`%FILTER` string comparisons onto their
//! dedicated operators. `vfilter-eval` consumes the resulting node array;
//! this crate never evaluates a record.

mod binder;
mod node;
mod options;
mod parser;
mod schema;

pub use node::{Binding, FuncKind, Literal, Node, OpKind, SpecialKind, Unpack};
pub use options::{CompileOptions, UnknownTagPolicy};
pub use parser::{parse, RpnProgram};
pub use schema::{Arity, Namespace, Schema, ValueType};

#[cfg(any(test, feature = "test-support"))]
pub use schema::test_support::StaticSchema;
