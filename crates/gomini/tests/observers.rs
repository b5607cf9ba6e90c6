use gomini::lexer::{Lexer, Tok, Token, TokenObserver};
use gomini::{CompactOptions, Compactor};

#[test]
fn observers_see_every_token_in_order() {
    let mut seen = Vec::new();
    let mut record = |t: &Token<'_>| {
        seen.push(t.kind);
        true
    };
    let observers: Vec<&mut dyn TokenObserver> = vec![&mut record];
    let yielded: Vec<Tok> = Lexer::new("x := 1\n")
        .observed(observers)
        .map(|t| t.kind)
        .collect();

    let want = [Tok::Ident, Tok::Define, Tok::Int, Tok::Semi, Tok::Eof];
    assert_eq!(yielded, want);
    assert_eq!(seen, want);
}

#[test]
fn first_false_stops_the_scan_after_that_token() {
    let mut calls_after = 0usize;
    let mut stop_at_define = |t: &Token<'_>| t.kind != Tok::Define;
    let mut count = |_: &Token<'_>| {
        calls_after += 1;
        true
    };

    let observers: Vec<&mut dyn TokenObserver> = vec![&mut stop_at_define, &mut count];
    let mut it = Lexer::new("x := 1\n").observed(observers);
    let yielded: Vec<Tok> = it.by_ref().map(|t| t.kind).collect();
    assert!(it.is_stopped());
    drop(it);

    // `:=` is still yielded, the second observer never saw it.
    assert_eq!(yielded, [Tok::Ident, Tok::Define]);
    assert_eq!(calls_after, 1);
}

#[test]
fn compactor_can_drive_an_observed_scan() {
    let src = "package p\n\nvar x = 1 // one\n";
    let mut c = Compactor::new(Vec::new(), CompactOptions::default());
    {
        let observers: Vec<&mut dyn TokenObserver> = vec![&mut c];
        let n = Lexer::with_comments(src).observed(observers).count();
        assert!(n > 0);
    }
    let out = c.finish().expect("no error");
    assert_eq!(String::from_utf8(out).unwrap(), "package p;var x=1");
}

#[test]
fn compactor_stops_the_scan_on_an_illegal_token() {
    let mut c = Compactor::new(Vec::new(), CompactOptions::default());
    let kinds: Vec<Tok> = {
        let observers: Vec<&mut dyn TokenObserver> = vec![&mut c];
        Lexer::new("a @ b c d").observed(observers).map(|t| t.kind).collect()
    };
    assert_eq!(kinds, [Tok::Ident, Tok::Error]);
    assert!(c.finish().is_err());
}
