#![no_main]

use gomini::lexer::{Lexer, Tok};
use gomini::{compact_to_vec, examine, parse_file, CompactOptions};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Lexing arbitrary text must terminate with exactly one Eof and never
    // move backwards.
    let s = String::from_utf8_lossy(data);
    let mut last_end = 0usize;
    let mut eofs = 0usize;
    let mut steps = 0usize;
    for tok in Lexer::with_comments(&s) {
        assert!(tok.pos <= tok.end && tok.end <= s.len());
        if !tok.is_injected() && tok.kind != Tok::Eof {
            assert!(tok.pos >= last_end);
            last_end = tok.end;
        }
        eofs += usize::from(tok.kind == Tok::Eof);
        steps += 1;
        assert!(steps <= s.len() * 4 + 64);
    }
    assert_eq!(eofs, 1);

    // Compaction must not panic; if the input was a valid file, the output
    // has to be minimal.
    let Ok(out) = compact_to_vec(data, CompactOptions::default()) else {
        return;
    };
    if parse_file(&s).is_ok() {
        if let Err(v) = examine(&out) {
            panic!("compacted output not minimal: {v}");
        }
    }
});
