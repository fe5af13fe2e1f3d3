use crate::cursor::Cursor;
use crate::token::{Token, TokenKind};
use vfilter_util::{FilterError, Result};

fn is_ident_delim(b: u8) -> bool {
    matches!(
        b,
        b' ' | b'\t' | b'\n' | b'\r' | b'"' | b'\'' | b'<' | b'>' | b'=' | b'!' | b'&' | b'|'
            | b'(' | b')' | b'+' | b'-' | b'*' | b'/'
    ) || b == 0
}

/// Scans expression text into a flat token stream.
///
/// Holds no state beyond the cursor; `Lexer::tokenize` is the only entry
/// point callers need, but `next_token` is exposed for the parser to pull
/// tokens one at a time if a future caller wants a streaming interface.
pub struct Lexer<'a> {
    cursor: Cursor<'a>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            cursor: Cursor::new(source),
        }
    }

    pub fn tokenize(source: &'a str) -> Result<Vec<Token>> {
        let mut lexer = Lexer::new(source);
        let mut tokens = Vec::new();
        while let Some(tok) = lexer.next_token()? {
            tokens.push(tok);
        }
        Ok(tokens)
    }

    /// Returns the next token, or `None` at end of input.
    pub fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_whitespace();
        if self.cursor.is_at_end() {
            return Ok(None);
        }

        let offset = self.cursor.offset();
        let c = self.cursor.current();

        if c.is_ascii_digit() || (c == b'.' && self.cursor.peek(1).is_ascii_digit()) {
            return Ok(Some(self.scan_number(offset)));
        }

        if c == b'%' {
            if let Some(kind) = self.match_reduction_prefix() {
                // The `(` is intentionally left for the next call to re-scan.
                return Ok(Some(Token {
                    kind,
                    text: self.cursor.slice_from(offset).to_string(),
                    offset,
                }));
            }
            return Ok(Some(self.scan_identifier(offset)));
        }

        if c == b'"' || c == b'\'' {
            return Ok(Some(self.scan_string(offset, c)?));
        }

        if let Some(tok) = self.match_composite_operator(offset) {
            return Ok(Some(tok));
        }

        if self.match_namespace_prefix() {
            return Ok(Some(self.scan_identifier(offset)));
        }

        if c.is_ascii_alphabetic() || c == b'_' {
            return Ok(Some(self.scan_identifier(offset)));
        }

        self.match_single_char_operator(offset)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.cursor.current(), b' ' | b'\t' | b'\n' | b'\r') {
            self.cursor.advance();
        }
    }

    /// `%MAX(`, `%MIN(`, `%AVG(` — matched by literal prefix, consuming only
    /// the 4-byte function name so the `(` is re-scanned as `LParen` next turn.
    fn match_reduction_prefix(&mut self) -> Option<TokenKind> {
        for (prefix, kind) in [
            ("%MAX", TokenKind::Max),
            ("%MIN", TokenKind::Min),
            ("%AVG", TokenKind::Avg),
        ] {
            if self.cursor.starts_with(prefix) && self.cursor.peek(prefix.len()) == b'(' {
                self.cursor.advance_n(prefix.len());
                return Some(kind);
            }
        }
        None
    }

    /// Recognises `INFO/`, `FORMAT/`, `FMT/` immediately before an identifier
    /// so the following `scan_identifier` call doesn't stop at the `/`
    /// delimiter. Does not itself produce a token — the prefix becomes part
    /// of the `Value` token's text, and header binding strips it later.
    fn match_namespace_prefix(&mut self) -> bool {
        for prefix in ["INFO/", "FORMAT/", "FMT/"] {
            if self.cursor.starts_with(prefix) {
                self.cursor.advance_n(prefix.len());
                return true;
            }
        }
        false
    }

    fn scan_identifier(&mut self, offset: usize) -> Token {
        // `%` (specials) is only valid as the first byte; the rest of the
        // scan is plain tag-name characters plus an optional `[idx]`.
        if self.cursor.current() == b'%' {
            self.cursor.advance();
        }
        while !is_ident_delim(self.cursor.current()) || self.cursor.current() == b'[' {
            if self.cursor.current() == b'[' {
                self.cursor.advance();
                while self.cursor.current() != b']' && !self.cursor.is_at_end() {
                    self.cursor.advance();
                }
                if self.cursor.current() == b']' {
                    self.cursor.advance();
                }
                continue;
            }
            self.cursor.advance();
        }
        Token {
            kind: TokenKind::Value,
            text: self.cursor.slice_from(offset).to_string(),
            offset,
        }
    }

    fn scan_number(&mut self, offset: usize) -> Token {
        while self.cursor.current().is_ascii_digit() {
            self.cursor.advance();
        }
        if self.cursor.current() == b'.' && self.cursor.peek(1).is_ascii_digit() {
            self.cursor.advance();
            while self.cursor.current().is_ascii_digit() {
                self.cursor.advance();
            }
        }
        if matches!(self.cursor.current(), b'e' | b'E') {
            let mut lookahead = 1;
            if matches!(self.cursor.peek(lookahead), b'+' | b'-') {
                lookahead += 1;
            }
            if self.cursor.peek(lookahead).is_ascii_digit() {
                self.cursor.advance_n(lookahead);
                while self.cursor.current().is_ascii_digit() {
                    self.cursor.advance();
                }
            }
            // Otherwise the `e`/`E` isn't part of a valid exponent (e.g. a
            // trailing letter before an operator) and is left unconsumed.
        }
        Token {
            kind: TokenKind::Value,
            text: self.cursor.slice_from(offset).to_string(),
            offset,
        }
    }

    fn scan_string(&mut self, offset: usize, quote: u8) -> Result<Token> {
        self.cursor.advance(); // opening quote
        loop {
            if self.cursor.is_at_end() {
                return Err(FilterError::Syntax {
                    offset,
                    message: "missing quotes".to_string(),
                });
            }
            if self.cursor.current() == quote {
                self.cursor.advance();
                break;
            }
            self.cursor.advance();
        }
        Ok(Token {
            kind: TokenKind::Value,
            text: self.cursor.slice_from(offset).to_string(),
            offset,
        })
    }

    fn match_composite_operator(&mut self, offset: usize) -> Option<Token> {
        let kind = match (self.cursor.current(), self.cursor.peek(1)) {
            (b'=', b'=') => TokenKind::Eq,
            (b'!', b'=') => TokenKind::Ne,
            (b'<', b'=') => TokenKind::Le,
            (b'>', b'=') => TokenKind::Ge,
            (b'&', b'&') => TokenKind::AndVec,
            (b'|', b'|') => TokenKind::OrVec,
            _ => return None,
        };
        self.cursor.advance_n(2);
        Some(Token {
            kind,
            text: self.cursor.slice_from(offset).to_string(),
            offset,
        })
    }

    fn match_single_char_operator(&mut self, offset: usize) -> Result<Option<Token>> {
        let c = self.cursor.current();
        let kind = match c {
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'<' => TokenKind::Lt,
            b'>' => TokenKind::Gt,
            b'=' => TokenKind::Eq,
            b'!' => {
                return Err(FilterError::Syntax {
                    offset,
                    message: "`!` must be followed by `=`".to_string(),
                })
            }
            b'&' => TokenKind::And,
            b'|' => TokenKind::Or,
            b'+' => TokenKind::Add,
            b'-' => TokenKind::Sub,
            b'*' => TokenKind::Mul,
            b'/' => TokenKind::Div,
            other => {
                return Err(FilterError::Syntax {
                    offset,
                    message: format!("unrecognised character {:?}", other as char),
                })
            }
        };
        self.cursor.advance();
        Ok(Some(Token {
            kind,
            text: self.cursor.slice_from(offset).to_string(),
            offset,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        Lexer::tokenize(src)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn simple_comparison() {
        assert_eq!(
            kinds("DP>10"),
            vec![TokenKind::Value, TokenKind::Gt, TokenKind::Value]
        );
    }

    #[test]
    fn namespaced_tag_keeps_slash_out_of_div() {
        let toks = Lexer::tokenize("INFO/DP>10").unwrap();
        assert_eq!(toks[0].kind, TokenKind::Value);
        assert_eq!(toks[0].text, "INFO/DP");
    }

    #[test]
    fn indexed_tag_keeps_brackets() {
        let toks = Lexer::tokenize("DP4[0]+DP4[1]").unwrap();
        assert_eq!(toks[0].text, "DP4[0]");
        assert_eq!(toks[1].kind, TokenKind::Add);
        assert_eq!(toks[2].text, "DP4[1]");
    }

    #[test]
    fn reduction_function_reemits_open_paren() {
        let toks = Lexer::tokenize("%MIN(GL)>-5").unwrap();
        assert_eq!(toks[0].kind, TokenKind::Min);
        assert_eq!(toks[1].kind, TokenKind::LParen);
        assert_eq!(toks[2].text, "GL");
        assert_eq!(toks[3].kind, TokenKind::RParen);
        assert_eq!(toks[4].kind, TokenKind::Gt);
        assert_eq!(toks[5].kind, TokenKind::Sub);
        assert_eq!(toks[6].text, "5");
    }

    #[test]
    fn specials_are_plain_value_tokens() {
        let toks = Lexer::tokenize("%QUAL>50").unwrap();
        assert_eq!(toks[0].kind, TokenKind::Value);
        assert_eq!(toks[0].text, "%QUAL");
    }

    #[test]
    fn composite_operators_before_single_char() {
        assert_eq!(kinds("a==b"), vec![TokenKind::Value, TokenKind::Eq, TokenKind::Value]);
        assert_eq!(kinds("a!=b"), vec![TokenKind::Value, TokenKind::Ne, TokenKind::Value]);
        assert_eq!(kinds("a<=b"), vec![TokenKind::Value, TokenKind::Le, TokenKind::Value]);
        assert_eq!(kinds("a>=b"), vec![TokenKind::Value, TokenKind::Ge, TokenKind::Value]);
        assert_eq!(kinds("a&&b"), vec![TokenKind::Value, TokenKind::AndVec, TokenKind::Value]);
        assert_eq!(kinds("a||b"), vec![TokenKind::Value, TokenKind::OrVec, TokenKind::Value]);
    }

    #[test]
    fn bare_equals_is_eq() {
        assert_eq!(kinds("AN=2"), vec![TokenKind::Value, TokenKind::Eq, TokenKind::Value]);
    }

    #[test]
    fn unterminated_quote_is_syntax_error() {
        let err = Lexer::tokenize("%TYPE=\"snp").unwrap_err();
        assert!(matches!(err, FilterError::Syntax { .. }));
    }

    #[test]
    fn scientific_notation_literal() {
        let toks = Lexer::tokenize("XAF>5e5").unwrap();
        assert_eq!(toks[2].text, "5e5");
    }

    #[test]
    fn quoted_string_literal_round_trips_text() {
        let toks = Lexer::tokenize("%FILTER=\"PASS\"").unwrap();
        assert_eq!(toks[2].text, "\"PASS\"");
    }

    proptest::proptest! {
        #[test]
        fn never_panics_on_arbitrary_printable_ascii(s in "[ -~]{0,80}") {
            let _ = Lexer::tokenize(&s);
        }
    }
}
