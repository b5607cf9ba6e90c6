//! Tracks `for` clause headers in a token stream.
//!
//! Inside `for init; cond; post {` a doubled terminator is meaningful
//! (`for i := 0; ; i++`), anywhere else it is not. The tracker follows
//! bracket nesting so that braces of function literals, struct and interface
//! types inside the header do not end it. Unparenthesized composite literals
//! are legal in a header only when their type is a type literal
//! (`[]T{}`, `[N]T{}`, `map[K]V{}`); those are tracked as well.

use smallvec::SmallVec;

use crate::lexer::Tok;

#[derive(Debug, Default, Clone)]
pub struct ForHeader {
    active: bool,
    /// `(` and `[` nesting inside the header.
    depth: u32,
    /// Braces opened inside the header and not yet closed.
    braces: u32,
    /// Nesting depths at which a `func`, `struct` or `interface` keyword
    /// still expects its `{`.
    owed: SmallVec<[u32; 4]>,
    /// An array, slice or map type started at depth zero; its `{` opens a
    /// composite literal.
    type_lit: bool,
    prev: Option<Tok>,
}

impl ForHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Between `for` and the `{` opening the loop body, outside any nested
    /// braces.
    #[inline]
    pub fn in_header(&self) -> bool {
        self.active && self.braces == 0
    }

    /// Feed the next token; call once per token in stream order.
    pub fn observe(&mut self, tok: Tok) {
        if !self.active {
            if tok == Tok::KwFor {
                *self = Self {
                    active: true,
                    prev: Some(tok),
                    ..Self::default()
                };
            }
            return;
        }

        if self.depth == 0 && self.braces == 0 {
            self.track_type_literal(tok);
        }

        match tok {
            Tok::LParen | Tok::LBrack => self.depth += 1,
            Tok::RParen | Tok::RBrack => {
                self.depth = self.depth.saturating_sub(1);
                let depth = self.depth;
                self.owed.retain(|d| *d <= depth);
            }
            Tok::KwFunc | Tok::KwStruct | Tok::KwInterface if self.braces == 0 => {
                self.owed.push(self.depth);
            }
            Tok::LBrace => {
                if self.braces > 0 {
                    self.braces += 1;
                } else if self.owed.last() == Some(&self.depth) {
                    self.owed.pop();
                    self.braces = 1;
                } else if self.depth > 0 || self.type_lit {
                    // composite literal
                    self.type_lit = false;
                    self.braces = 1;
                } else {
                    // loop body
                    self.active = false;
                }
            }
            Tok::RBrace => self.braces = self.braces.saturating_sub(1),
            // A `func` type without a body, e.g. a parameter type.
            Tok::Semi | Tok::Comma if self.braces == 0 => {
                let depth = self.depth;
                self.owed.retain(|d| *d < depth);
            }
            _ => {}
        }
        self.prev = Some(tok);
    }

    fn track_type_literal(&mut self, tok: Tok) {
        let prev = self.prev;
        match tok {
            Tok::KwMap => self.type_lit = true,
            Tok::LBrack => {
                let operand_start = matches!(prev, Some(Tok::KwFor | Tok::KwRange))
                    || prev.is_some_and(|p| p.is_operator() && !p.is_closing());
                if operand_start {
                    self.type_lit = true;
                }
            }
            // A conversion such as `[]byte(s)`, not a literal.
            Tok::LParen if prev != Some(Tok::KwFunc) => self.type_lit = false,
            Tok::Comma | Tok::Semi => self.type_lit = false,
            Tok::LBrace | Tok::Dot => {}
            _ if tok.is_operator() && !tok.is_closing() => {
                let operand_end = prev
                    .is_some_and(|p| p.is_literal() || matches!(p, Tok::RParen | Tok::RBrace));
                if operand_end {
                    self.type_lit = false;
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    /// For every token, whether the tracker considered it part of a header
    /// before seeing it.
    fn trace(src: &str) -> Vec<(String, bool)> {
        let mut h = ForHeader::new();
        Lexer::new(src)
            .map(|t| {
                let inside = h.in_header();
                h.observe(t.kind);
                (t.text().to_string(), inside)
            })
            .collect()
    }

    fn header_text(src: &str) -> String {
        trace(src)
            .into_iter()
            .filter(|(_, inside)| *inside)
            .map(|(t, _)| t)
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn plain_three_clause_header() {
        assert_eq!(
            header_text("for i := 0; i < n; i++ { x; }"),
            "i := 0 ; i < n ; i ++ {"
        );
    }

    #[test]
    fn func_literal_braces_stay_in_header() {
        let text = header_text("for f := func() int { return 1 }; f() > 0; { }");
        assert!(text.ends_with("f ( ) > 0 ; {"), "{text}");
        assert!(!text.contains("return"), "{text}");
    }

    #[test]
    fn struct_type_in_range_header() {
        let text = header_text("for _, v := range []struct{ a int }{} { }");
        assert!(text.contains("struct {"), "{text}");
    }

    #[test]
    fn type_literal_composites_stay_in_header() {
        let text = header_text("for s := []int{1}; ; s = s[1:] { }");
        assert_eq!(text, "s := [ ] int { ; ; s = s [ 1 : ] {");

        let text = header_text("for k := range map[string]int{\"a\": 1} { x;; }");
        assert!(text.ends_with("int { {"), "{text}");
        assert!(!text.contains('x'), "{text}");

        let text = header_text("for a := b; a != [2]int{}; { }");
        assert!(text.ends_with("int { ; {"), "{text}");
    }

    #[test]
    fn index_and_conversion_are_not_literals() {
        let text = header_text("for i := a[0]; i < n; i++ { x }");
        assert!(!text.contains('x'), "{text}");

        let text = header_text("for b := []byte(s); len(b) > 0; { x }");
        assert!(!text.contains('x'), "{text}");
    }

    #[test]
    fn body_is_not_header() {
        let toks = trace("for { a;; b }");
        assert!(toks.iter().skip(2).all(|(_, inside)| !inside));
    }
}
