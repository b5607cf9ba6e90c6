//! Literal rewriting shared by the compactor and the equivalence checker.

use std::fmt::Write;

/// Rewrite a raw string literal (backticks included) as an interpreted one.
///
/// Carriage returns are dropped, as Go drops them from raw string values.
/// Everything that could break the single output line is escaped.
pub fn quote_raw(raw: &str) -> String {
    let body = raw
        .strip_prefix('`')
        .and_then(|s| s.strip_suffix('`'))
        .unwrap_or(raw);

    let mut out = String::with_capacity(body.len() + 2);
    out.push('"');
    for c in body.chars() {
        match c {
            '\r' => {}
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\u{7}' => out.push_str("\\a"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            '\u{b}' => out.push_str("\\v"),
            c if (c as u32) < 0x80 && (c.is_ascii_control()) => {
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c if c.is_control() || (c.is_whitespace() && c != ' ') || c == '\u{feff}' => {
                if (c as u32) < 0x1_0000 {
                    let _ = write!(out, "\\u{:04x}", c as u32);
                } else {
                    let _ = write!(out, "\\U{:08x}", c as u32);
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Canonical text of a string literal: raw literals are re-quoted,
/// interpreted ones are returned unchanged.
pub fn normalize_string(lit: &str) -> std::borrow::Cow<'_, str> {
    if lit.starts_with('`') {
        quote_raw(lit).into()
    } else {
        lit.into()
    }
}

/// Extract `import "path"` from an import-path pragma comment.
///
/// Accepts `// import "path"` and `/* import "path" */` with any spacing
/// around the keyword; the path must be a quoted string of at least one byte.
pub fn import_path_pragma(comment: &str) -> Option<String> {
    const IMPORT: &str = "import ";

    if comment.len() < 2 {
        return None;
    }
    let body = if comment.as_bytes()[1] == b'*' {
        let inner = &comment[2..];
        inner.strip_suffix("*/").unwrap_or(inner)
    } else {
        &comment[2..]
    };

    let rest = body.trim_matches(' ').strip_prefix(IMPORT)?;
    let path = rest.trim_start_matches(' ');
    let quoted = path.len() >= 3 && path.starts_with('"') && path.ends_with('"');
    quoted.then(|| format!("{IMPORT}{path}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_strings_become_single_line() {
        assert_eq!(quote_raw("`a\nb`"), r#""a\nb""#);
        assert_eq!(quote_raw("`a\r\nb`"), r#""a\nb""#);
        assert_eq!(quote_raw(r#"`say "hi" \o/`"#), r#""say \"hi\" \\o/""#);
        assert_eq!(quote_raw("`\u{1}`"), r#""\x01""#);
        assert_eq!(quote_raw("`\u{2028}`"), r#""\u2028""#);
        assert_eq!(quote_raw("`héllo`"), "\"héllo\"");
    }

    #[test]
    fn pragma_text_is_extracted() {
        assert_eq!(
            import_path_pragma(r#"// import "example.com/x""#).as_deref(),
            Some(r#"import "example.com/x""#)
        );
        assert_eq!(
            import_path_pragma(r#"/*  import   "x"  */"#).as_deref(),
            Some(r#"import "x""#)
        );
        assert_eq!(import_path_pragma(r#"// import """#), None);
        assert_eq!(import_path_pragma(r#"// importx "x""#), None);
        assert_eq!(import_path_pragma("// just a comment"), None);
        assert_eq!(import_path_pragma("/"), None);
    }
}
