use gomini::syntax::NodeId;
use gomini::{
    compact_str, compare, diff, divergence, parse_file, CompactOptions, NodeKind, Span,
    SyntaxTree, TreeBuilder,
};
use pretty_assertions::assert_eq;

fn tree(src: &str) -> SyntaxTree {
    match parse_file(src) {
        Ok(t) => t,
        Err(f) => panic!("{src:?} does not parse: {:#?}", f.diags),
    }
}

fn equivalent(a: &str, b: &str) -> bool {
    let (a, b) = (tree(a), tree(b));
    compare(Some(a.root()), Some(b.root()))
}

/// Both sides of the first divergence, described.
fn first_difference(a: &str, b: &str) -> (Option<String>, Option<String>) {
    let (a, b) = (tree(a), tree(b));
    let (x, y) = diff(Some(a.root()), Some(b.root()));
    (x.map(|n| n.describe()), y.map(|n| n.describe()))
}

#[test]
fn formatting_does_not_matter() {
    let formatted = r#"// Package p.
package p

import (
	"fmt"
)

// F prints.
func F(xs ...int) {
	for i := 0; ; i++ {
		if i >= len(xs) {
			break
		}
		fmt.Println(xs[i]) // each
	}
}
"#;
    let compacted = compact_str(formatted, CompactOptions::default()).expect("compacts");
    assert!(equivalent(formatted, &compacted));
    assert!(equivalent(&compacted, formatted));
    assert_eq!(first_difference(formatted, &compacted), (None, None));
}

#[test]
fn identifiers_must_match() {
    assert_eq!(
        first_difference("package p\nvar x = a", "package p\nvar x = b"),
        (Some("Ident a".to_string()), Some("Ident b".to_string()))
    );
}

#[test]
fn operators_must_match() {
    assert_eq!(
        first_difference("package p\nvar x = a + b", "package p\nvar x = a - b"),
        (Some("BinaryExpr +".to_string()), Some("BinaryExpr -".to_string()))
    );
    assert!(!equivalent("package p\nfunc f() { x += 1 }", "package p\nfunc f() { x -= 1 }"));
    assert!(!equivalent("package p\nvar x = -a", "package p\nvar x = !a"));
}

#[test]
fn declaration_kinds_must_match() {
    assert!(!equivalent("package p\nvar x = 1", "package p\nconst x = 1"));
}

#[test]
fn literals_compare_by_text() {
    assert!(!equivalent("package p\nvar x = 1", "package p\nvar x = 2"));
    assert!(!equivalent("package p\nvar x = 0x1", "package p\nvar x = 1"));
    assert!(!equivalent("package p\nvar s = \"\\x41\"", "package p\nvar s = \"A\""));
}

#[test]
fn raw_and_interpreted_strings_with_the_same_value_match() {
    assert!(equivalent(
        "package p\nvar s = `a\"b\\n`",
        "package p\nvar s = \"a\\\"b\\\\n\""
    ));
    assert!(equivalent("package p\nvar s = `x\ny`", "package p\nvar s = \"x\\ny\""));
    assert!(!equivalent("package p\nvar s = `a`", "package p\nvar s = \"b\""));
}

#[test]
fn spread_arguments_must_match() {
    assert_eq!(
        first_difference("package p\nvar _ = f(xs...)", "package p\nvar _ = f(xs)"),
        (Some("CallExpr ...".to_string()), Some("CallExpr".to_string()))
    );
}

#[test]
fn extra_statement_leaves_one_side_empty() {
    assert_eq!(
        first_difference("package p\nfunc f() { a() }", "package p\nfunc f() { a(); b() }"),
        (None, Some("ExprStmt".to_string()))
    );
    assert_eq!(
        first_difference("package p\nfunc f() { a(); b() }", "package p\nfunc f() { a() }"),
        (Some("ExprStmt".to_string()), None)
    );
}

#[test]
fn missing_trees() {
    let t = tree("package p\n");
    assert!(compare(None, None));
    assert!(!compare(Some(t.root()), None));
    assert!(!compare(None, Some(t.root())));

    let (left, right) = diff(Some(t.root()), None);
    assert_eq!(left.map(|n| n.describe()), Some("File".to_string()));
    assert!(right.is_none());
}

fn struct_tree(incomplete: bool) -> SyntaxTree {
    let mut b = TreeBuilder::new();
    let list: NodeId = b.node(NodeKind::FieldList, Span::new(6, 8), &[]);
    let st = b.node(NodeKind::StructType { incomplete }, Span::new(0, 8), &[list]);
    b.finish(st)
}

#[test]
fn incomplete_types_never_match() {
    let (a, b) = (struct_tree(false), struct_tree(false));
    assert!(compare(Some(a.root()), Some(b.root())));

    let (a, b) = (struct_tree(true), struct_tree(false));
    assert!(!compare(Some(a.root()), Some(b.root())));

    let (a, b) = (struct_tree(true), struct_tree(true));
    assert!(!compare(Some(a.root()), Some(b.root())));
}

#[test]
fn import_path_pragmas() {
    let pragma = "package p // import \"x\"\n";
    assert!(equivalent(pragma, "package p/*import \"x\"*/"));
    assert!(equivalent(pragma, "package p;/*import \"x\"*/"));
    assert!(equivalent("package p\n// import \"x\"\n", pragma));

    // A pragma against none, or a different path.
    assert!(!equivalent(pragma, "package p\n"));
    assert!(!equivalent(pragma, "package p // import \"y\"\n"));

    // Ordinary comments after the name are not pragmas.
    assert!(equivalent("package p // hello\n", "package p\n"));
}

#[test]
fn distant_pragma_is_never_equivalent() {
    let src = "package p\n\n// import \"x\"\n";
    assert!(!equivalent(src, src));
}

#[test]
fn divergence_reports_both_sides() {
    let (a, b) = (tree("package p\nvar x = a"), tree("package p\nvar x = b"));
    let d = divergence(&a, &b).expect("trees differ");
    assert_eq!(d.to_string(), "(Ident a) at 18..19 vs (Ident b) at 18..19");

    let c = tree("package p\nvar x = a\n");
    assert!(divergence(&a, &c).is_none());

    let e = tree("package p\nvar x = a\nvar y = 2\n");
    let d = divergence(&a, &e).expect("extra declaration");
    assert!(d.left.is_none());
    assert!(d.to_string().starts_with("nothing vs (GenDecl var)"), "{d}");
}
