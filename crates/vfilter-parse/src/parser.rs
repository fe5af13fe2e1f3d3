//! The Shunting-Yard compiler: token stream in, [`RpnProgram`] out.

use crate::binder::bind;
use crate::node::{FuncKind, Literal, Node, OpKind, SpecialKind, Unpack};
use crate::options::CompileOptions;
use crate::schema::{Namespace, Schema};
use vfilter_lex::{Lexer, TokenKind};
use vfilter_util::{variant_type, FilterError, Result};

/// A compiled expression: the RPN node array plus the record-access mask
/// it requires and the sample count it was compiled against.
#[derive(Clone, Debug, PartialEq)]
pub struct RpnProgram {
    pub nodes: Vec<Node>,
    pub unpack: Unpack,
    pub nsamples: usize,
}

/// Parses `text` into an [`RpnProgram`], resolving every tag reference
/// against `schema` along the way.
///
/// Shunting-Yard over the token stream: operands are appended to `out`
/// as they're resolved; operators sit on `ops` until a tighter-or-equal
/// precedence forces a pop. `function_depth` tracks reduction nesting so
/// bare tags default to the right namespace and may skip the "arity must
/// be 1" rule; the symbolic post-pass then rewires `%TYPE`/`%FILTER`
/// comparisons onto their dedicated operators.
pub fn parse(text: &str, schema: &dyn Schema, options: &CompileOptions) -> Result<RpnProgram> {
    let tokens = Lexer::tokenize(text)?;

    let mut out: Vec<Node> = Vec::new();
    let mut ops: Vec<TokenKind> = Vec::new();
    let mut last_op: Option<TokenKind> = None;
    let mut function_depth: usize = 0;
    let mut unpack = Unpack::default();

    for tok in &tokens {
        match tok.kind {
            TokenKind::Value => {
                let (node, u) = bind(&tok.text, function_depth, schema, options)?;
                unpack.merge(u);
                out.push(node);
                last_op = Some(TokenKind::Value);
            }
            TokenKind::LParen => {
                ops.push(TokenKind::LParen);
                last_op = Some(TokenKind::LParen);
            }
            TokenKind::RParen => {
                loop {
                    match ops.pop() {
                        Some(TokenKind::LParen) => break,
                        Some(top) => emit_operator(top, &mut out, &mut function_depth),
                        None => {
                            return Err(FilterError::Syntax {
                                offset: tok.offset,
                                message: "unbalanced parentheses".to_string(),
                            })
                        }
                    }
                }
                last_op = Some(TokenKind::RParen);
            }
            mut kind => {
                if kind == TokenKind::Sub
                    && !matches!(last_op, Some(TokenKind::Value) | Some(TokenKind::RParen))
                {
                    out.push(Node::Literal(Literal::Number(-1.0)));
                    kind = TokenKind::Mul;
                }
                let prec = kind.precedence().expect("operator token always has a precedence");
                while let Some(&top) = ops.last() {
                    match top.precedence() {
                        Some(top_prec) if top_prec > prec => {
                            ops.pop();
                            emit_operator(top, &mut out, &mut function_depth);
                        }
                        _ => break,
                    }
                }
                if kind.is_reduction() {
                    function_depth += 1;
                }
                ops.push(kind);
                last_op = Some(kind);
            }
        }
    }

    while let Some(top) = ops.pop() {
        if top == TokenKind::LParen {
            return Err(FilterError::Syntax {
                offset: text.len(),
                message: "unbalanced parentheses".to_string(),
            });
        }
        emit_operator(top, &mut out, &mut function_depth);
    }

    rewrite_symbolic_operands(&mut out, schema)?;

    tracing::debug!(rpn_len = out.len(), "compiled filter expression");

    Ok(RpnProgram {
        nodes: out,
        unpack,
        nsamples: schema.nsamples(),
    })
}

fn emit_operator(kind: TokenKind, out: &mut Vec<Node>, function_depth: &mut usize) {
    use TokenKind::*;
    let node = match kind {
        Max => {
            *function_depth -= 1;
            Node::Func(FuncKind::Max)
        }
        Min => {
            *function_depth -= 1;
            Node::Func(FuncKind::Min)
        }
        Avg => {
            *function_depth -= 1;
            Node::Func(FuncKind::Avg)
        }
        Le => Node::BinOp(OpKind::Le),
        Lt => Node::BinOp(OpKind::Lt),
        Eq => Node::BinOp(OpKind::Eq),
        Gt => Node::BinOp(OpKind::Gt),
        Ge => Node::BinOp(OpKind::Ge),
        Ne => Node::BinOp(OpKind::Ne),
        Or => Node::BinOp(OpKind::Or),
        And => Node::BinOp(OpKind::And),
        OrVec => Node::BinOp(OpKind::OrVec),
        AndVec => Node::BinOp(OpKind::AndVec),
        Add => Node::BinOp(OpKind::Add),
        Sub => Node::BinOp(OpKind::Sub),
        Mul => Node::BinOp(OpKind::Mul),
        Div => Node::BinOp(OpKind::Div),
        Value | LParen | RParen => unreachable!("never pushed onto the operator stack"),
    };
    out.push(node);
}

/// Rewires `%TYPE`/`%FILTER` comparisons: the string literal compared
/// against becomes a resolved code, and the generic `Eq`/`Ne` operator
/// consuming it becomes the dedicated `Type*`/`Filter*` variant.
fn rewrite_symbolic_operands(out: &mut [Node], schema: &dyn Schema) -> Result<()> {
    for i in 0..out.len() {
        let special = match &out[i] {
            Node::Special(SpecialKind::Type) => SpecialKind::Type,
            Node::Special(SpecialKind::Filter) => SpecialKind::Filter,
            _ => continue,
        };

        let lit_idx = if matches!(out.get(i + 1), Some(Node::Literal(Literal::Str(_)))) {
            i + 1
        } else if i > 0 && matches!(out.get(i - 1), Some(Node::Literal(Literal::Str(_)))) {
            i - 1
        } else {
            return Err(FilterError::Syntax {
                offset: 0,
                message: format!("{special:?} must be compared against a string literal"),
            });
        };

        let text = match &out[lit_idx] {
            Node::Literal(Literal::Str(s)) => s.clone(),
            _ => unreachable!(),
        };

        // Normalise operand order: the evaluator always treats the `a`
        // operand (lower RPN index, popped second) as the special's own
        // runtime value and `b` (higher index, popped first) as the
        // resolved code, regardless of which way round the source wrote
        // the comparison (`%TYPE="snp"` vs `"snp"==%TYPE`).
        let lower = lit_idx.min(i);
        let upper = lit_idx.max(i);
        if lower != i {
            out[lower] = Node::Special(special);
        }
        let op_idx = upper + 1;

        match special {
            SpecialKind::Type => {
                let code = variant_type::code_for(&text).ok_or_else(|| FilterError::Syntax {
                    offset: 0,
                    message: format!("unrecognised %TYPE literal `{text}`"),
                })?;
                out[upper] = Node::TypeLiteral(code);
                match out.get(op_idx) {
                    Some(Node::BinOp(OpKind::Eq)) => out[op_idx] = Node::BinOp(OpKind::TypeEq),
                    Some(Node::BinOp(OpKind::Ne)) => out[op_idx] = Node::BinOp(OpKind::TypeNe),
                    _ => {
                        return Err(FilterError::Syntax {
                            offset: 0,
                            message: "%TYPE only supports == and !=".to_string(),
                        })
                    }
                }
            }
            SpecialKind::Filter => {
                let id = if text == "." {
                    None
                } else {
                    Some(schema.id_of(Namespace::Filter, &text).ok_or_else(|| {
                        FilterError::Name(format!("filter `{text}` not defined in the header"))
                    })?)
                };
                out[upper] = Node::FilterLiteral(id);
                match out.get(op_idx) {
                    Some(Node::BinOp(OpKind::Eq)) => out[op_idx] = Node::BinOp(OpKind::FilterEq),
                    Some(Node::BinOp(OpKind::Ne)) => out[op_idx] = Node::BinOp(OpKind::FilterNe),
                    _ => {
                        return Err(FilterError::Syntax {
                            offset: 0,
                            message: "%FILTER only supports == and !=".to_string(),
                        })
                    }
                }
            }
            SpecialKind::Qual => unreachable!("%QUAL has no symbolic operand"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::test_support::StaticSchema;
    use crate::schema::{Arity, ValueType};
    use pretty_assertions::assert_eq;

    fn schema() -> StaticSchema {
        StaticSchema::new(1)
            .with_info("DP", ValueType::Int, Arity::One)
            .with_info("AN", ValueType::Int, Arity::One)
            .with_info("DP4", ValueType::Int, Arity::RefAlt)
            .with_info("XAF", ValueType::Float, Arity::One)
            .with_format("GQ", ValueType::Int, Arity::One)
            .with_format("GL", ValueType::Float, Arity::Genotype)
            .with_filter("PASS")
            .with_filter("q20")
    }

    #[test]
    fn simple_comparison_compiles() {
        let prog = parse("DP>13", &schema(), &CompileOptions::default()).unwrap();
        assert_eq!(prog.nodes.len(), 3);
        assert!(matches!(prog.nodes[2], Node::BinOp(OpKind::Gt)));
    }

    #[test]
    fn and_binds_looser_than_comparison() {
        let prog = parse("DP>13 & AN=2", &schema(), &CompileOptions::default()).unwrap();
        // DP 13 > AN 2 = And  -> 7 nodes
        assert_eq!(prog.nodes.len(), 7);
        assert_eq!(prog.nodes[6], Node::BinOp(OpKind::And));
    }

    #[test]
    fn unary_minus_rewrites_to_literal_and_mul() {
        let prog = parse("-DP>1", &schema(), &CompileOptions::default()).unwrap();
        assert_eq!(prog.nodes[0], Node::Literal(Literal::Number(-1.0)));
        assert!(matches!(prog.nodes[2], Node::BinOp(OpKind::Mul)));
    }

    #[test]
    fn reduction_function_lowers_to_func_node() {
        let prog = parse("%MIN(GL)>-5", &schema(), &CompileOptions::default()).unwrap();
        assert!(prog.nodes.iter().any(|n| matches!(n, Node::Func(FuncKind::Min))));
        match &prog.nodes[0] {
            Node::TagRef(b) => assert!(b.flatten),
            other => panic!("expected TagRef, got {other:?}"),
        }
    }

    #[test]
    fn type_comparison_rewrites_to_dedicated_operator() {
        let prog = parse("%TYPE=\"indel\"", &schema(), &CompileOptions::default()).unwrap();
        assert_eq!(prog.nodes[0], Node::Special(SpecialKind::Type));
        assert_eq!(
            prog.nodes[1],
            Node::TypeLiteral(vfilter_util::variant_type::INDEL)
        );
        assert_eq!(prog.nodes[2], Node::BinOp(OpKind::TypeEq));
    }

    #[test]
    fn type_comparison_normalises_reversed_operand_order() {
        let prog = parse("\"indel\"==%TYPE", &schema(), &CompileOptions::default()).unwrap();
        assert_eq!(prog.nodes[0], Node::Special(SpecialKind::Type));
        assert_eq!(
            prog.nodes[1],
            Node::TypeLiteral(vfilter_util::variant_type::INDEL)
        );
        assert_eq!(prog.nodes[2], Node::BinOp(OpKind::TypeEq));
    }

    #[test]
    fn filter_comparison_resolves_id_and_dot_sentinel() {
        let prog = parse("%FILTER=\"q20\"", &schema(), &CompileOptions::default()).unwrap();
        assert!(matches!(prog.nodes[1], Node::FilterLiteral(Some(_))));
        assert_eq!(prog.nodes[2], Node::BinOp(OpKind::FilterEq));

        let prog = parse("%FILTER!=\".\"", &schema(), &CompileOptions::default()).unwrap();
        assert_eq!(prog.nodes[1], Node::FilterLiteral(None));
        assert_eq!(prog.nodes[2], Node::BinOp(OpKind::FilterNe));
    }

    #[test]
    fn unbalanced_parens_is_syntax_error() {
        let err = parse("(DP>1", &schema(), &CompileOptions::default()).unwrap_err();
        assert!(matches!(err, FilterError::Syntax { .. }));
    }

    #[test]
    fn indexed_arithmetic_compiles_grouped_expression() {
        let prog = parse("(DP4[0]+DP4[1])/(DP4[2]+DP4[3])>0.3", &schema(), &CompileOptions::default()).unwrap();
        assert!(matches!(prog.nodes.last(), Some(Node::BinOp(OpKind::Gt))));
    }

    #[test]
    fn bare_equals_and_double_equals_compile_to_the_same_program() {
        let with_bare = parse("AN=2", &schema(), &CompileOptions::default()).unwrap();
        let with_double = parse("AN==2", &schema(), &CompileOptions::default()).unwrap();
        assert_eq!(with_bare, with_double);
    }
}
