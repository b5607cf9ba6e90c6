//! Check that a compacted buffer cannot lose another byte.
//!
//! The buffer is re-tokenized with comments and every pair of neighbouring
//! tokens is checked against the gap between them.

use tracing::trace;

use crate::error::{MinimalityViolation, ViolationReason};
use crate::header::ForHeader;
use crate::lexer::{operators_merge, Lexer, Tok, Token};
use crate::literal::import_path_pragma;

/// `Ok(())` when `src` is one line with no removable space, separator or
/// comment; otherwise the first offending token pair.
pub fn examine(src: &[u8]) -> Result<(), MinimalityViolation> {
    let src = std::str::from_utf8(src).map_err(|e| MinimalityViolation {
        pos: e.valid_up_to(),
        reason: ViolationReason::Illegal,
        prev: String::new(),
        next: String::new(),
    })?;

    let mut lexer = Lexer::with_comments(src);
    let mut prev: Option<Token<'_>> = None;
    let mut header = ForHeader::new();
    // 1 after `for;`, 2 after `for;;`
    let mut for_semis = 0u8;
    let mut leading: Vec<Tok> = Vec::with_capacity(4);

    while let Some(tok) = lexer.next() {
        if tok.kind == Tok::Eof {
            break;
        }
        if tok.is_injected() && tok.pos == src.len() {
            continue;
        }

        let violation = |reason| {
            trace!(pos = tok.pos, %reason, "not minimal");
            MinimalityViolation {
                pos: tok.pos,
                reason,
                prev: prev.map(|p| p.text().to_string()).unwrap_or_default(),
                next: tok.text().to_string(),
            }
        };

        if tok.kind == Tok::Error || lexer.error_count() > 0 {
            return Err(violation(ViolationReason::Illegal));
        }
        if tok.is_injected() {
            return Err(violation(ViolationReason::LineBreak));
        }

        let end = prev.map_or(0, |p| p.end);
        let gap = tok.pos.saturating_sub(end);
        if gap > 1 || (gap == 1 && prev.is_none()) {
            return Err(violation(ViolationReason::Whitespace));
        }

        if tok.kind == Tok::Comment {
            let pragma_slot = matches!(
                leading.as_slice(),
                [Tok::KwPackage, Tok::Ident] | [Tok::KwPackage, Tok::Ident, Tok::Semi]
            );
            if !pragma_slot || import_path_pragma(tok.lit).is_none() {
                return Err(violation(ViolationReason::Comment));
            }
        }

        if let Some(p) = prev {
            if gap == 1 {
                if src.as_bytes()[end] != b' ' {
                    return Err(violation(ViolationReason::Whitespace));
                }
                let (a, b) = (p.kind, tok.kind);
                let needed = a.is_keyword()
                    || b.is_keyword()
                    || (a.is_word() && b.is_word())
                    || operators_merge(a, b);
                if !needed {
                    return Err(violation(ViolationReason::Space));
                }
                if a == Tok::KwFor && matches!(b, Tok::Semi | Tok::LBrace) {
                    return Err(violation(ViolationReason::SpaceAfterFor));
                }
                if b.is_opening() {
                    return Err(violation(ViolationReason::SpaceBeforeOpening));
                }
            } else {
                let (a, b) = (p.kind, tok.kind);
                if for_semis == 2 && b == Tok::LBrace {
                    return Err(violation(ViolationReason::EmptyLoopHeader));
                }
                if a.is_separator() && (b == a || b.is_closing()) {
                    let loop_header_semis = a == Tok::Semi
                        && b == Tok::Semi
                        && (for_semis == 1 || header.in_header());
                    if !loop_header_semis {
                        let reason = if b == a {
                            ViolationReason::RepeatedSeparator
                        } else {
                            ViolationReason::SeparatorBeforeClosing
                        };
                        return Err(violation(reason));
                    }
                }
            }

            for_semis = match (p.kind, tok.kind, gap, for_semis) {
                (Tok::KwFor, Tok::Semi, 0, _) => 1,
                (_, Tok::Semi, 0, 1) => 2,
                _ => 0,
            };
        }

        if tok.kind != Tok::Comment {
            header.observe(tok.kind);
        }
        if leading.len() < 4 {
            leading.push(tok.kind);
        }
        prev = Some(tok);
    }
    Ok(())
}
