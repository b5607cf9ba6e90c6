use gomini::walk::dump;
use gomini::{parse_file, parse_package, NodeKind};
use pretty_assertions::assert_eq;

fn assert_parses(src: &str) {
    if let Err(f) = parse_file(src) {
        panic!("expected parse ok, got diagnostics: {:#?}", f.diags);
    }
}

fn dumped(src: &str) -> String {
    match parse_file(src) {
        Ok(tree) => dump(&tree),
        Err(f) => panic!("expected parse ok, got diagnostics: {:#?}", f.diags),
    }
}

#[test]
fn parses_imports_and_decls() {
    assert_parses(
        r#"
package main

import (
    "fmt"
    . "math"
    _ "net/http"
)

const (
    A = 1
    B int = 2
)

var (
    x = 1
    y, z int
)

type (
    T = int
    U[T any] struct { F T }
    V interface {
        M(x int) int
        ~int | ~string
    }
)

func main() {
    fmt.Println(Sqrt(4))
}
"#,
    );
}

#[test]
fn parses_statements() {
    assert_parses(
        r#"
package p

func f(x int) int {
    if x < 0 { return -x }
    for i := 0; i < 10; i++ {
        if i == 5 { break }
        continue
    }
    for range []int{1,2,3} {
    }
    switch x {
    case 0, 1:
        x++
    default:
        x = 3
    }
    select {
    case ch <- x:
        return x
    default:
        return 0
    }
}
"#,
    );
}

#[test]
fn parses_expressions() {
    assert_parses(
        r#"
package p

func f(a, b, c int, ch chan<- int) {
    _ = a + b*c - (a<<2)
    _ = a == b || a < c && b <= c
    _ = &a
    _ = <-ch
    _ = []int{1,2,3}[0]
    _ = []int{1,2,3}[1:]
    _ = []int{1,2,3}[:2]
    _ = []int{1,2,3}[0:2:3]
    _ = map[string]int{"a":1, "b":2}["a"]
    _ = f(a, b, c)
    _ = f(a, b, c...)
}
"#,
    );
}

#[test]
fn parses_compacted_source() {
    assert_parses(
        r#"package p;import("fmt";"os");func main(){for i:=0;;i++{if i>3{break}};fmt.Println(os.Args)}"#,
    );
}

#[test]
fn dumps_function() {
    assert_eq!(
        dumped("package p\nfunc f() { return 1 }"),
        "(File (Ident p) (FuncDecl (Ident f) (FuncType (FieldList)) (BlockStmt (ReturnStmt (BasicLit INT 1)))))"
    );
}

#[test]
fn doc_comments_are_not_dumped() {
    assert_eq!(
        dumped("// Package p.\npackage p\n\n// X is one.\nvar x = 1 // trailing\n"),
        "(File (Ident p) (GenDecl var (ValueSpec (Ident x) (BasicLit INT 1))))"
    );
}

#[test]
fn dumps_value_spec() {
    assert_eq!(
        dumped("package p\nvar x, y int = 1, 2"),
        "(File (Ident p) (GenDecl var (ValueSpec (Ident x) (Ident y) (Ident int) (BasicLit INT 1) (BasicLit INT 2))))"
    );
}

#[test]
fn dumps_generic_signature() {
    assert_eq!(
        dumped("package p\nfunc Id[T any](x T) T { return x }"),
        "(File (Ident p) (FuncDecl (Ident Id) (FuncType (FieldList (Field (Ident T) (Ident any))) \
         (FieldList (Field (Ident x) (Ident T))) (FieldList (Field (Ident T)))) \
         (BlockStmt (ReturnStmt (Ident x)))))"
    );
}

#[test]
fn dumps_loops() {
    assert_eq!(
        dumped("package p\nfunc f() { for i := 0; i < n; i++ {} }"),
        "(File (Ident p) (FuncDecl (Ident f) (FuncType (FieldList)) (BlockStmt \
         (ForStmt (AssignStmt := (Ident i) (BasicLit INT 0)) (BinaryExpr < (Ident i) (Ident n)) \
         (IncDecStmt ++ (Ident i)) (BlockStmt)))))"
    );
    assert_eq!(
        dumped("package p\nfunc f() { for k, v := range m {} }"),
        "(File (Ident p) (FuncDecl (Ident f) (FuncType (FieldList)) (BlockStmt \
         (RangeStmt := (Ident k) (Ident v) (Ident m) (BlockStmt)))))"
    );
}

#[test]
fn empty_loop_headers_parse_alike() {
    let a = dumped("package p\nfunc f() { for ;; {} }");
    let b = dumped("package p\nfunc f() { for {} }");
    assert_eq!(a, b);
}

#[test]
fn call_with_ellipsis_is_marked() {
    let text = dumped("package p\nvar _ = f(xs...)");
    assert!(text.contains("(CallExpr ... (Ident f) (Ident xs))"), "{text}");
}

#[test]
fn underscore_package_name_is_rejected() {
    let err = parse_file("package _\n").expect_err("blank package name");
    assert!(err.to_string().contains("invalid package name _"), "{err}");
}

#[test]
fn lexical_errors_stop_parsing() {
    let err = parse_file("package p\nvar x = 1 @ 2\n").expect_err("illegal token");
    assert!(!err.diags.is_empty());
}

#[test]
fn missing_package_clause_is_an_error() {
    assert!(parse_file("func f() {}\n").is_err());
}

#[test]
fn package_of_files() {
    let tree = parse_package(&[
        ("a.go", "package p\nvar a = 1\n"),
        ("b.go", "package p\nvar b = 2\n"),
    ])
    .expect("same package");
    let root = tree.root();
    assert!(matches!(root.kind(), NodeKind::Package(_)));
    assert_eq!(root.text(), Some("p"));
    assert_eq!(root.children().count(), 2);
}

#[test]
fn package_name_mismatch() {
    let err = parse_package(&[
        ("a.go", "package p\n"),
        ("b.go", "package q\n"),
    ])
    .expect_err("different packages");
    let msg = err.to_string();
    assert!(msg.contains("b.go: package q; expected package p (from a.go)"), "{msg}");
}

#[test]
fn parse_errors_name_the_file_in_a_package() {
    let err = parse_package(&[("a.go", "package p\n"), ("b.go", "package p\nvar\n")])
        .expect_err("bad declaration");
    assert!(err.diags[0].message.starts_with("b.go: "), "{err}");
}
