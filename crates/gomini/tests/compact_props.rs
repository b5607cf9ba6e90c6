use gomini::{compact_str, compare, examine, parse_file, CompactOptions};
use proptest::prelude::*;

// Raw strings are left out: re-quoting may lengthen them.

fn ident() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "x1", "_", "ch", "v"]).prop_map(str::to_string)
}

fn expr() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        ident(),
        (0u32..1000).prop_map(|n| n.to_string()),
        Just("1.5".to_string()),
        Just("2i".to_string()),
        Just("\"s t\"".to_string()),
        Just("'c'".to_string()),
    ];
    leaf.prop_recursive(3, 16, 2, |inner| {
        let binop = prop::sample::select(vec![
            "+", "-", "*", "/", "%", "&", "&^", "|", "^", "<<", "==", "<", "&&", "||",
        ]);
        let unop = prop::sample::select(vec!["-", "+", "!", "^", "*", "&", "<-"]);
        prop_oneof![
            (inner.clone(), binop, inner.clone()).prop_map(|(l, op, r)| format!("{l} {op} {r}")),
            (unop, inner.clone()).prop_map(|(op, e)| format!("{op} {e}")),
            inner.clone().prop_map(|e| format!("({e})")),
            (ident(), inner).prop_map(|(f, e)| format!("{f}({e}, )")),
        ]
    })
}

/// A trailing comment, or nothing.
fn noise() -> impl Strategy<Value = &'static str> {
    prop::sample::select(vec!["", "", " // note", " /* c */", " /*\n*/"])
}

fn stmt() -> impl Strategy<Value = String> {
    let simple = prop_oneof![
        (ident(), expr()).prop_map(|(x, e)| format!("{x} = {e}")),
        (ident(), expr()).prop_map(|(x, e)| format!("{x} := {e}")),
        ident().prop_map(|x| format!("{x}++")),
        expr().prop_map(|e| format!("return {e}")),
        (ident(), expr()).prop_map(|(x, e)| format!("var {x} int = {e}")),
        expr().prop_map(|e| format!("go f({e})")),
        Just("defer f()".to_string()),
        (ident(), expr()).prop_map(|(c, e)| format!("{c} <- {e}")),
    ];
    let simple = (simple, noise()).prop_map(|(s, n)| format!("{s}{n}"));

    simple.prop_recursive(3, 24, 4, |inner| {
        let block = prop::collection::vec(inner, 0..4).prop_map(|s| s.join("\n\t"));
        prop_oneof![
            (expr(), block.clone()).prop_map(|(c, b)| format!("if {c} {{\n\t{b}\n}}")),
            (expr(), block.clone(), block.clone())
                .prop_map(|(c, b, e)| format!("if {c} {{\n\t{b}\n}} else {{\n\t{e}\n}}")),
            block.clone().prop_map(|b| format!("for {{\n\t{b}\n}}")),
            block.clone().prop_map(|b| format!("for ; ; {{\n\t{b}\n}}")),
            block
                .clone()
                .prop_map(|b| format!("for i := 0; ; i++ {{\n\t{b}\n}}")),
            (expr(), block.clone()).prop_map(|(c, b)| format!("for {c} {{\n\t{b}\n}}")),
            (ident(), block.clone())
                .prop_map(|(x, b)| format!("for _, v := range {x} {{\n\t{b}\n}}")),
            (ident(), expr(), block).prop_map(|(x, e, b)| {
                format!("switch {x} {{\ncase {e}:\n\t{b}\n\tbreak\ndefault:\n}}")
            }),
        ]
    })
}

fn go_file() -> impl Strategy<Value = String> {
    prop::collection::vec(stmt(), 0..6).prop_map(|body| {
        format!(
            "// Package p is generated.\npackage p\n\nfunc f() {{\n\t{}\n}}\n",
            body.join("\n\t")
        )
    })
}

fn mini(src: &str) -> String {
    compact_str(src, CompactOptions::default()).expect("generated source compacts")
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn compaction_is_idempotent_and_never_grows(src in go_file()) {
        let once = mini(&src);
        prop_assert!(once.len() <= src.len(), "grew: {src:?} -> {once:?}");
        prop_assert!(!once.contains('\n'));
        prop_assert_eq!(mini(&once), once);
    }

    #[test]
    fn compacted_output_is_minimal(src in go_file()) {
        let out = mini(&src);
        let verdict = examine(out.as_bytes());
        prop_assert!(verdict.is_ok(), "{:?} in {out:?} from {src:?}", verdict);
    }

    #[test]
    fn compacted_output_is_equivalent(src in go_file()) {
        // Some generated operator sequences are not valid Go.
        let Ok(original) = parse_file(&src) else {
            return Ok(());
        };
        let out = mini(&src);
        let compacted = parse_file(&out);
        prop_assert!(compacted.is_ok(), "compacted source does not parse: {:?}\n{out}", compacted.as_ref().err());
        let compacted = compacted.unwrap();
        prop_assert!(
            compare(Some(original.root()), Some(compacted.root())),
            "{src}\n=> {out}"
        );
    }
}
