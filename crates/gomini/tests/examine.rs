use gomini::{examine, MinimalityViolation, ViolationReason};
use pretty_assertions::assert_eq;

fn reason(src: &str) -> ViolationReason {
    match examine(src.as_bytes()) {
        Ok(()) => panic!("{src:?} passed"),
        Err(v) => v.reason,
    }
}

fn passes(src: &str) {
    if let Err(v) = examine(src.as_bytes()) {
        panic!("{src:?}: {v}");
    }
}

#[test]
fn minimal_sources_pass() {
    passes("");
    passes("package p");
    passes("package p;func f(){return 1}");
    passes("for{}");
    passes("for;;i++{}");
    passes("for i:=0;;i++{}");
    passes("x=a+ +b;y=a< <-c;z=a/ *p");
    passes("switch x{case\"a\":return'b'}");
    passes("switch x{case \"a\":return 'b'}");
    passes("import \"fmt\"");
    passes("for s:=[]int{1};;s=s[1:]{}");
    passes("var x,y int=1,2");
}

#[test]
fn pragma_directly_after_package_clause_passes() {
    passes("package p/*import \"x\"*/");
    passes("package p;/*import \"x\"*/");
    passes("package p/*import \"example.com/p\"*/;var x int");
}

#[test]
fn illegal_tokens() {
    assert_eq!(reason("x@y"), ViolationReason::Illegal);
    assert_eq!(reason("s=\"\\q\""), ViolationReason::Illegal);
}

#[test]
fn invalid_utf8_is_illegal() {
    let err = examine(b"x=\"\xff\"").expect_err("not utf-8");
    assert_eq!(
        err,
        MinimalityViolation {
            pos: 3,
            reason: ViolationReason::Illegal,
            prev: String::new(),
            next: String::new(),
        }
    );
}

#[test]
fn line_breaks() {
    assert_eq!(reason("package p\nvar x int"), ViolationReason::LineBreak);
    // A trailing newline is a line break too.
    assert_eq!(reason("package p\n"), ViolationReason::LineBreak);
}

#[test]
fn redundant_whitespace() {
    assert_eq!(reason("package  p"), ViolationReason::Whitespace);
    assert_eq!(reason(" package p"), ViolationReason::Whitespace);
    assert_eq!(reason("package\tp"), ViolationReason::Whitespace);
}

#[test]
fn unnecessary_space() {
    let err = examine(b"x= 1").expect_err("space after =");
    assert_eq!(err.reason, ViolationReason::Space);
    assert_eq!(err.pos, 3);
    assert_eq!((err.prev.as_str(), err.next.as_str()), ("=", "1"));
    assert_eq!(err.to_string(), r#"3: unnecessary space: "=" -> "1""#);

    assert_eq!(reason("f (x)"), ViolationReason::Space);
    assert_eq!(reason("a+ -b"), ViolationReason::Space);
}

#[test]
fn space_before_opening_bracket() {
    assert_eq!(reason("switch {}"), ViolationReason::SpaceBeforeOpening);
    assert_eq!(reason("import (\"fmt\")"), ViolationReason::SpaceBeforeOpening);
}

#[test]
fn space_after_for() {
    assert_eq!(reason("for {}"), ViolationReason::SpaceAfterFor);
    assert_eq!(reason("for ;;i++{}"), ViolationReason::SpaceAfterFor);
}

#[test]
fn repeated_separators() {
    assert_eq!(reason("f(a,,b)"), ViolationReason::RepeatedSeparator);
    assert_eq!(reason("x=1;;y=2"), ViolationReason::RepeatedSeparator);
}

#[test]
fn separator_before_closing_bracket() {
    assert_eq!(reason("f(a,)"), ViolationReason::SeparatorBeforeClosing);
    assert_eq!(reason("{x=1;}"), ViolationReason::SeparatorBeforeClosing);
}

#[test]
fn collapsible_loop_header() {
    let err = examine(b"for;;{}").expect_err("for;;{");
    assert_eq!(err.reason, ViolationReason::EmptyLoopHeader);
    assert_eq!(err.pos, 5);
}

#[test]
fn comments() {
    assert_eq!(reason("x=1/*c*/"), ViolationReason::Comment);
    assert_eq!(reason("package p/*c*/"), ViolationReason::Comment);
    assert_eq!(
        reason("package p;var x int/*import \"x\"*/"),
        ViolationReason::Comment
    );
}

#[test]
fn first_violation_wins() {
    let err = examine(b"x = 1\ny").expect_err("several problems");
    assert_eq!(err.pos, 2);
    assert_eq!(err.reason, ViolationReason::Space);
}
