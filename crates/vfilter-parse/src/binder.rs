//! Header binding: turns a `Value` token's text into a schema-resolved node.

use crate::node::{Binding, Literal, Node, SpecialKind, Unpack};
use crate::options::{CompileOptions, UnknownTagPolicy};
use crate::schema::{Arity, Namespace, Schema};
use vfilter_util::{FilterError, Result};

/// Resolves one lexer `Value` token's raw text into a compiled [`Node`].
///
/// `function_depth` is the parser's current reduction-nesting counter: a
/// bare tag (no `INFO/`/`FORMAT/`/`FMT/` prefix) defaults to FORMAT when
/// nonzero, INFO otherwise (§4.3 rule). It also relaxes the "arity must be
/// 1 unless indexed" rule, since `%MAX`/`%MIN`/`%AVG` exist precisely to
/// reduce a multi-valued field to a scalar.
pub fn bind(
    text: &str,
    function_depth: usize,
    schema: &dyn Schema,
    options: &CompileOptions,
) -> Result<(Node, Unpack)> {
    if let Some(stripped) = strip_quotes(text) {
        return Ok((Node::Literal(Literal::Str(stripped.to_string())), Unpack::default()));
    }

    match text {
        "%QUAL" => {
            return Ok((
                Node::Special(SpecialKind::Qual),
                Unpack {
                    qual: true,
                    ..Default::default()
                },
            ))
        }
        "%TYPE" => {
            return Ok((
                Node::Special(SpecialKind::Type),
                Unpack {
                    info: true,
                    ..Default::default()
                },
            ))
        }
        "%FILTER" => {
            return Ok((
                Node::Special(SpecialKind::Filter),
                Unpack {
                    filter: true,
                    ..Default::default()
                },
            ))
        }
        _ => {}
    }

    let (namespace, rest) = strip_namespace_prefix(text);
    let (name, index) = strip_subscript(rest);

    if let Some(namespace) = namespace.or_else(|| implicit_namespace(function_depth)) {
        if let Some(id) = schema.id_of(namespace, name) {
            let arity = schema.declared_arity(namespace, id);
            let flatten = index.is_none() && !arity.is_unary();
            if !arity.is_unary() && index.is_none() && !(function_depth > 0) {
                return Err(FilterError::Name(format!(
                    "tag `{name}` has arity other than 1 and was used without a `[i]` subscript"
                )));
            }
            let value_type = schema.declared_type(namespace, id);
            let unpack = match namespace {
                Namespace::Info => Unpack {
                    info: true,
                    ..Default::default()
                },
                Namespace::Format => Unpack {
                    format: true,
                    ..Default::default()
                },
                Namespace::Filter => unreachable!(),
            };
            return Ok((
                Node::TagRef(Binding {
                    namespace,
                    header_id: id,
                    value_type,
                    index,
                    flatten,
                }),
                unpack,
            ));
        }
    }

    if let Ok(n) = text.parse::<f64>() {
        tracing::warn!(tag = text, "tag not defined in header; treating as numeric literal");
        return Ok((Node::Literal(Literal::Number(n)), Unpack::default()));
    }

    if options.unknown_tag == UnknownTagPolicy::WarnAndMissing {
        tracing::warn!(tag = text, "tag not defined in header; treating as always-missing");
        return Ok((Node::Literal(Literal::Number(f64::NAN)), Unpack::default()));
    }

    Err(FilterError::Name(format!("tag `{text}` not defined in the header")))
}

fn implicit_namespace(function_depth: usize) -> Option<Namespace> {
    Some(if function_depth > 0 {
        Namespace::Format
    } else {
        Namespace::Info
    })
}

fn strip_namespace_prefix(text: &str) -> (Option<Namespace>, &str) {
    for (prefix, ns) in [
        ("INFO/", Namespace::Info),
        ("FORMAT/", Namespace::Format),
        ("FMT/", Namespace::Format),
    ] {
        if let Some(rest) = text.strip_prefix(prefix) {
            return (Some(ns), rest);
        }
    }
    (None, text)
}

fn strip_subscript(name: &str) -> (&str, Option<usize>) {
    if name.ends_with(']') {
        if let Some(lb) = name.rfind('[') {
            if let Ok(idx) = name[lb + 1..name.len() - 1].parse::<usize>() {
                return (&name[..lb], Some(idx));
            }
        }
    }
    (name, None)
}

fn strip_quotes(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    if bytes.len() >= 2 && (bytes[0] == b'"' || bytes[0] == b'\'') && bytes[bytes.len() - 1] == bytes[0] {
        Some(&text[1..text.len() - 1])
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::test_support::StaticSchema;
    use crate::schema::ValueType;

    fn schema() -> StaticSchema {
        StaticSchema::new(1)
            .with_info("DP", ValueType::Int, Arity::One)
            .with_info("DP4", ValueType::Int, Arity::RefAlt)
            .with_format("GQ", ValueType::Int, Arity::One)
            .with_format("GL", ValueType::Float, Arity::Genotype)
    }

    #[test]
    fn resolves_bare_info_tag() {
        let (node, unpack) = bind("DP", 0, &schema(), &CompileOptions::default()).unwrap();
        assert!(matches!(node, Node::TagRef(b) if b.namespace == Namespace::Info && !b.flatten));
        assert!(unpack.info);
    }

    #[test]
    fn resolves_indexed_site_vector() {
        let (node, _) = bind("DP4[1]", 0, &schema(), &CompileOptions::default()).unwrap();
        match node {
            Node::TagRef(b) => assert_eq!(b.index, Some(1)),
            _ => panic!("expected TagRef"),
        }
    }

    #[test]
    fn multivalued_tag_without_index_outside_reduction_is_name_error() {
        let err = bind("DP4", 0, &schema(), &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, FilterError::Name(_)));
    }

    #[test]
    fn multivalued_tag_without_index_inside_reduction_flattens() {
        let (node, _) = bind("GL", 1, &schema(), &CompileOptions::default()).unwrap();
        match node {
            Node::TagRef(b) => {
                assert!(b.flatten);
                assert_eq!(b.namespace, Namespace::Format);
            }
            _ => panic!("expected TagRef"),
        }
    }

    #[test]
    fn unresolved_non_numeric_tag_is_name_error() {
        let err = bind("NOPE", 0, &schema(), &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, FilterError::Name(_)));
    }

    #[test]
    fn unresolved_numeric_text_falls_back_to_literal() {
        let (node, _) = bind("42.5", 0, &schema(), &CompileOptions::default()).unwrap();
        assert_eq!(node, Node::Literal(Literal::Number(42.5)));
    }

    #[test]
    fn quoted_literal_strips_quotes() {
        let (node, _) = bind("\"snp\"", 0, &schema(), &CompileOptions::default()).unwrap();
        assert_eq!(node, Node::Literal(Literal::Str("snp".to_string())));
    }

    #[test]
    fn specials_bind_without_schema_lookup() {
        let (node, unpack) = bind("%QUAL", 0, &schema(), &CompileOptions::default()).unwrap();
        assert_eq!(node, Node::Special(SpecialKind::Qual));
        assert!(unpack.qual);
    }

    #[test]
    fn warn_and_missing_policy_tolerates_unknown_tag() {
        let options = CompileOptions {
            unknown_tag: UnknownTagPolicy::WarnAndMissing,
        };
        let (node, _) = bind("NOPE", 0, &schema(), &options).unwrap();
        match node {
            Node::Literal(Literal::Number(n)) => assert!(n.is_nan()),
            other => panic!("expected an always-missing literal, got {other:?}"),
        }
    }
}
