use std::io;

use gomini::{
    compact, compact_str, compact_to_vec, compare, examine, parse_file, CompactError,
    CompactOptions, Compactor,
};
use pretty_assertions::assert_eq;

fn mini(src: &str) -> String {
    compact_str(src, CompactOptions::default()).expect("compacts")
}

fn mini_without_pragma(src: &str) -> String {
    compact_str(
        src,
        CompactOptions {
            omit_import_path: true,
        },
    )
    .expect("compacts")
}

#[test]
fn return_in_function() {
    assert_eq!(
        mini("package p\n\nfunc f() {\n\treturn 1\n}\n"),
        "package p;func f(){return 1}"
    );
}

#[test]
fn empty_for_header_collapses() {
    assert_eq!(mini("for {\n}\n"), "for{}");
    assert_eq!(mini("for ;; {\n}\n"), "for{}");
    assert_eq!(mini("for ; ; {\n}\n"), "for{}");
}

#[test]
fn for_header_with_post_keeps_both_terminators() {
    assert_eq!(mini("for i := 0; ; i++ {\n}\n"), "for i:=0;;i++{}");
    assert_eq!(mini("for ; ; i++ {\n}\n"), "for;;i++{}");
    assert_eq!(mini("for i := 0; i < n; i++ {\n}\n"), "for i:=0;i<n;i++{}");
}

#[test]
fn loop_header_with_type_literal_composite() {
    let src = "package p\n\nfunc f() {\n\tfor s := []int{1}; ; s = s[1:] {\n\t}\n}\n";
    let out = mini(src);
    assert_eq!(out, "package p;func f(){for s:=[]int{1};;s=s[1:]{}}");

    let a = parse_file(src).expect("original parses");
    let b = parse_file(&out).expect("compacted parses");
    assert!(compare(Some(a.root()), Some(b.root())));

    assert_eq!(
        mini("for m := map[string]int{\"a\": 1}; ; m = nil {\n}\n"),
        "for m:=map[string]int{\"a\":1};;m=nil{}"
    );
    assert_eq!(
        mini("for _, v := range [2]struct{ a int }{} {\n\tf(v)\n}\n"),
        "for _,v:=range[2]struct{a int}{}{f(v)}"
    );
}

#[test]
fn loop_header_with_func_literal() {
    assert_eq!(
        mini("for f := func() int { return 1 }; ; f() {\n}\n"),
        "for f:=func()int{return 1};;f(){}"
    );
}

#[test]
fn pragma_is_kept_as_block_comment() {
    let src = "package name\n// import \"name\"\n";
    let out = mini(src);
    assert_eq!(out, "package name;/*import \"name\"*/");

    let a = parse_file(src).expect("original parses");
    let b = parse_file(&out).expect("compacted parses");
    assert!(compare(Some(a.root()), Some(b.root())));
}

#[test]
fn trailing_pragma_comment() {
    assert_eq!(
        mini("package p // import \"example.com/p\"\n\nvar x int\n"),
        "package p/*import \"example.com/p\"*/;var x int"
    );
}

#[test]
fn pragma_can_be_omitted() {
    assert_eq!(
        mini_without_pragma("package p // import \"example.com/p\"\n"),
        "package p"
    );
}

#[test]
fn ordinary_comments_are_dropped() {
    let src = r#"// Package p does things.
package p // not a pragma

/* block
   comment */
import "fmt" // trailing

// Doc.
func main() {
	fmt.Println("hi") /* inline */
}
"#;
    assert_eq!(mini(src), r#"package p;import "fmt";func main(){fmt.Println("hi")}"#);
}

#[test]
fn pragma_after_first_declaration_is_ignored() {
    assert_eq!(
        mini("package p\n\nvar x int // import \"x\"\n"),
        "package p;var x int"
    );
}

#[test]
fn raw_strings_become_interpreted() {
    assert_eq!(
        mini("package p\n\nvar s = `a\n\"b\"\\`\n"),
        r#"package p;var s="a\n\"b\"\\""#
    );
}

#[test]
fn keywords_keep_one_space_before_strings_and_runes() {
    assert_eq!(
        mini("switch x {\ncase \"a\":\n\treturn 'b'\n}\n"),
        "switch x{case \"a\":return 'b'}"
    );
    assert_eq!(mini("import . \"math\""), "import.\"math\"");
    assert_eq!(mini("go f(`raw`)"), "go f(\"raw\")");
}

#[test]
fn strings_and_runes_after_other_tokens_need_no_space() {
    assert_eq!(mini("x := \"a\" + 'b'"), "x:=\"a\"+'b'");
    assert_eq!(
        mini("type T struct {\n\tA int `json:\"a\"`\n}\n"),
        r#"type T struct{A int"json:\"a\""}"#
    );
    assert_eq!(mini("f(\"a\", \"b\")"), "f(\"a\",\"b\")");
}

#[test]
fn operators_use_canonical_spelling_and_guard_merges() {
    assert_eq!(mini("x = a + +b"), "x=a+ +b");
    assert_eq!(mini("x = a - --b"), "x=a- --b");
    assert_eq!(mini("x = a | |b"), "x=a| |b");
    assert_eq!(mini("x = a < <-ch"), "x=a< <-ch");
    // The longest match already splits these.
    assert_eq!(mini("x = a && &b"), "x=a&&&b");
    assert_eq!(mini("x = a &^ ^b"), "x=a&^^b");
    assert_eq!(mini("ch <- <-in"), "ch<-<-in");
    assert_eq!(mini("x = a / *p"), "x=a/ *p");
    assert_eq!(mini("x = a + -b"), "x=a+-b");
}

#[test]
fn words_keep_one_space() {
    assert_eq!(mini("var x, y int = 1, 2"), "var x,y int=1,2");
    assert_eq!(mini("go func() {}()"), "go func(){}()");
    assert_eq!(mini("x := 1.5 + .5i"), "x:=1.5+.5i");
    assert_eq!(mini("type T map[string]chan<- int"), "type T map[string]chan<-int");
}

#[test]
fn trailing_commas_and_semicolons_before_closing_are_dropped() {
    let src = "x := []int{\n\t1,\n\t2,\n}\nf(\n\ta,\n\tb,\n)\n";
    assert_eq!(mini(src), "x:=[]int{1,2};f(a,b)");
}

#[test]
fn grouped_declarations() {
    let src = "import (\n\t\"fmt\"\n\t\"os\"\n)\n\nconst (\n\tA = iota\n\tB\n)\n";
    assert_eq!(mini(src), "import(\"fmt\";\"os\");const(A=iota;B)");
}

#[test]
fn break_before_default_keeps_its_separator() {
    let src = "switch {\ncase x:\n\tbreak\ndefault:\n}\n";
    assert_eq!(mini(src), "switch{case x:break;default:}");
}

#[test]
fn labels_and_goto() {
    let src = "L:\n\tfor {\n\t\tcontinue L\n\t}\n\tgoto L\n";
    assert_eq!(mini(src), "L:for{continue L};goto L");
}

#[test]
fn output_is_one_line() {
    let src = include_str!("data/sample.go");
    let out = mini(src);
    assert!(!out.contains('\n'), "{out}");
    assert!(out.len() < src.len());
}

#[test]
fn compacting_is_idempotent() {
    let src = include_str!("data/sample.go");
    let once = mini(src);
    assert_eq!(mini(&once), once);
}

#[test]
fn compacted_sample_is_minimal_and_equivalent() {
    let src = include_str!("data/sample.go");
    let out = mini(src);
    examine(out.as_bytes()).expect("minimal");

    let a = parse_file(src).expect("original parses");
    let b = parse_file(&out).expect("compacted parses");
    assert!(compare(Some(a.root()), Some(b.root())));
}

#[test]
fn returns_bytes_written() {
    let mut sink = Vec::new();
    let n = compact(b"package p\n", CompactOptions::default(), &mut sink).expect("compacts");
    assert_eq!(n, sink.len());
    assert_eq!(sink, b"package p");
}

#[test]
fn illegal_token_is_a_lexical_error() {
    let err = compact_to_vec(b"package p\nvar x = 1 @ 2\n", CompactOptions::default())
        .expect_err("illegal token");
    match err {
        CompactError::Lexical { pos, .. } => assert_eq!(pos, 20),
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn recovered_scan_errors_are_aggregated() {
    // A bad escape still lexes as a string, so no single illegal token.
    let err = compact_to_vec(b"package p\nvar s = \"\\q\"\n", CompactOptions::default())
        .expect_err("bad escape");
    assert!(matches!(err, CompactError::Aggregate { count: 1 }), "{err:?}");
    assert_eq!(err.to_string(), "Scanner.ErrorCount: 1");
}

#[test]
fn invalid_utf8_is_rejected() {
    let err = compact_to_vec(b"package p\nvar s = \"\xff\"\n", CompactOptions::default())
        .expect_err("not utf-8");
    assert!(matches!(err, CompactError::Lexical { pos: 19, .. }), "{err:?}");
}

/// Accepts `limit` bytes, then fails.
struct ShortWriter {
    buf: Vec<u8>,
    limit: usize,
}

impl io::Write for ShortWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if self.buf.len() + data.len() > self.limit {
            return Err(io::Error::new(io::ErrorKind::WriteZero, "sink full"));
        }
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn each_compact_call_starts_fresh() {
    let mut c = Compactor::new(Vec::new(), CompactOptions::default());
    c.compact(b"package a // import \"a\"\n\nvar x = 1\n")
        .expect("first source");
    let first = c.get_ref().len();
    let total = c
        .compact(b"package b // import \"b\"\n")
        .expect("second source");
    assert_eq!(total, c.written());
    assert_eq!(
        &c.get_ref()[first..],
        b"package b/*import \"b\"*/".as_slice()
    );
    assert_eq!(total, first + 23);
}

#[test]
fn write_failure_is_surfaced_and_partial_output_kept() {
    let sink = ShortWriter {
        buf: Vec::new(),
        limit: 9,
    };
    let mut c = Compactor::new(sink, CompactOptions::default());
    let err = c
        .compact(b"package p\n\nfunc f() {}\n")
        .expect_err("sink fills up");
    assert!(matches!(err, CompactError::Io(_)), "{err:?}");
    assert_eq!(c.written(), 9);
    assert_eq!(c.get_ref().buf, b"package p");
}
