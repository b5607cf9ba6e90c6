//! Go tokenizer: Logos DFA underneath, Go semicolon insertion on top.
//!
//! - `Lexer::new` drops comments, `Lexer::with_comments` yields them as `Tok::Comment`.
//! - Every stream ends with exactly one `Tok::Eof`, even after lexical errors.
//! - Injected semicolons have an empty span and the literal `"\n"`, or `""` at
//!   end of input.
//! - `Lexer::observed` interposes per-token callbacks that may stop the scan.

use crate::error::{Diag, LexError, LexErrorKind, Span};
use logos::{Lexer as LogosLexer, Logos};
use std::fmt;
use std::ops::Range;

// =============================================================================
// 0. Byte helpers
// =============================================================================

#[inline(always)]
const fn first_newline_offset(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        if matches!(bytes[i], b'\n' | b'\r') {
            return Some(i);
        }
        i += 1;
    }

    None
}

#[inline(always)]
const fn in_u8_inclusive(x: u8, lo: u8, hi: u8) -> bool {
    x >= lo && x <= hi
}

#[inline(always)]
const fn is_dec_digit(b: u8) -> bool {
    in_u8_inclusive(b, b'0', b'9')
}

// One hex LUT for escapes, runes and number munch.
const HEX_LUT: [u8; 256] = {
    let mut t = [0xFFu8; 256];

    let mut i = b'0';
    while i <= b'9' {
        t[i as usize] = i - b'0';
        i += 1;
    }

    let mut i = b'a';
    while i <= b'f' {
        t[i as usize] = (i - b'a') + 10;
        i += 1;
    }

    let mut i = b'A';
    while i <= b'F' {
        t[i as usize] = (i - b'A') + 10;
        i += 1;
    }

    t
};

#[inline(always)]
const fn is_hex_digit(b: u8) -> bool {
    HEX_LUT[b as usize] != 0xFF
}

#[inline(always)]
const fn hex_value(b: u8) -> u32 {
    HEX_LUT[b as usize] as u32
}

#[inline(always)]
const fn is_valid_unicode_scalar(x: u32) -> bool {
    x <= 0x10_FFFF && !(x >= 0xD800 && x <= 0xDFFF)
}

/// `0129i` is a valid imaginary literal even though `0129` is not a valid int.
#[inline(always)]
const fn is_decimal_digits_with_underscores(bytes: &[u8]) -> bool {
    if bytes.is_empty() || !is_dec_digit(bytes[0]) {
        return false;
    }

    let mut prev_was_digit = true;
    let mut i = 1;
    while i < bytes.len() {
        let b = bytes[i];
        if b == b'_' {
            if !prev_was_digit || i + 1 >= bytes.len() || !is_dec_digit(bytes[i + 1]) {
                return false;
            }
            prev_was_digit = false;
        } else if is_dec_digit(b) {
            prev_was_digit = true;
        } else {
            return false;
        }
        i += 1;
    }

    prev_was_digit
}

// =============================================================================
// 1. Comment scanners
// =============================================================================

#[inline]
fn lex_block_comment(lex: &mut LogosLexer<'_, RawTok>) -> Result<(), LexErrorKind> {
    let rem = lex.remainder().as_bytes();
    let mut search_start = 0;

    while let Some(star_pos) = memchr::memchr(b'*', &rem[search_start..]) {
        let abs_pos = search_start + star_pos;
        if rem.get(abs_pos + 1) == Some(&b'/') {
            lex.bump(abs_pos + 2);
            return Ok(());
        }
        search_start = abs_pos + 1;
    }

    lex.bump(rem.len());
    Err(LexErrorKind::UnterminatedComment)
}

/// A line comment stops before the line break so the break can still
/// trigger semicolon insertion.
#[inline]
fn lex_line_comment(lex: &mut LogosLexer<'_, RawTok>) {
    let rem = lex.remainder().as_bytes();
    let n = memchr::memchr2(b'\n', b'\r', rem).unwrap_or(rem.len());
    lex.bump(n);
}

// =============================================================================
// 2. Interpreted string escape validation
// =============================================================================

mod esc {
    use super::*;

    #[repr(u8)]
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum EscState {
        Normal = 0,
        Escape = 1,
        Hex1 = 2,
        Hex2 = 3,
        Uni1 = 4,
        Uni2 = 5,
        Uni3 = 6,
        Uni4 = 7,
        Long1 = 8,
        Long2 = 9,
        Long3 = 10,
        Long4 = 11,
        Long5 = 12,
        Long6 = 13,
        Long7 = 14,
        Long8 = 15,
        Oct2 = 16,
        Oct3 = 17,
        Error = 255,
    }

    #[repr(u8)]
    #[derive(Clone, Copy, PartialEq, Eq)]
    enum EscCharClass {
        Other = 0,
        Backslash = 1,
        Simple = 2, // a b f n r t v "
        X = 3,
        U = 4,
        BigU = 5,
        Oct = 6, // 0-7
        Hex = 7, // 8-9 c d e A-F (a/b/f remapped in hex states)
    }

    const ESC_CLASS: [u8; 256] = {
        use EscCharClass as ECC;

        let mut t = [ECC::Other as u8; 256];
        t[b'\\' as usize] = ECC::Backslash as u8;

        let simple = b"abfnrtv\"";
        let mut i = 0;
        while i < simple.len() {
            t[simple[i] as usize] = ECC::Simple as u8;
            i += 1;
        }

        t[b'x' as usize] = ECC::X as u8;
        t[b'u' as usize] = ECC::U as u8;
        t[b'U' as usize] = ECC::BigU as u8;

        let mut i = b'0';
        while i <= b'7' {
            t[i as usize] = ECC::Oct as u8;
            i += 1;
        }

        // hex letters except a/b/f, which must stay Simple for \a \b \f
        let hex = b"89cdeABCDEF";
        let mut i = 0;
        while i < hex.len() {
            t[hex[i] as usize] = ECC::Hex as u8;
            i += 1;
        }

        t
    };

    const ESC_TRANS: [[u8; 8]; 18] = {
        use EscCharClass as ECC;
        use EscState as ES;

        let mut t = [[ES::Error as u8; 8]; 18];

        const fn set(t: &mut [[u8; 8]; 18], st: ES, cc: ECC, nx: ES) {
            t[st as usize][cc as usize] = nx as u8;
        }

        set(&mut t, ES::Normal, ECC::Other, ES::Normal);
        set(&mut t, ES::Normal, ECC::Simple, ES::Normal);
        set(&mut t, ES::Normal, ECC::X, ES::Normal);
        set(&mut t, ES::Normal, ECC::U, ES::Normal);
        set(&mut t, ES::Normal, ECC::BigU, ES::Normal);
        set(&mut t, ES::Normal, ECC::Oct, ES::Normal);
        set(&mut t, ES::Normal, ECC::Hex, ES::Normal);
        set(&mut t, ES::Normal, ECC::Backslash, ES::Escape);

        set(&mut t, ES::Escape, ECC::Simple, ES::Normal);
        set(&mut t, ES::Escape, ECC::Backslash, ES::Normal);
        set(&mut t, ES::Escape, ECC::X, ES::Hex1);
        set(&mut t, ES::Escape, ECC::U, ES::Uni1);
        set(&mut t, ES::Escape, ECC::BigU, ES::Long1);
        set(&mut t, ES::Escape, ECC::Oct, ES::Oct2);

        // digit chains: \xHH, \uHHHH, \UHHHHHHHH
        const CHAINS: [(EscState, EscState); 13] = [
            (ES::Hex1, ES::Hex2),
            (ES::Hex2, ES::Normal),
            (ES::Uni1, ES::Uni2),
            (ES::Uni2, ES::Uni3),
            (ES::Uni3, ES::Uni4),
            (ES::Uni4, ES::Normal),
            (ES::Long1, ES::Long2),
            (ES::Long2, ES::Long3),
            (ES::Long3, ES::Long4),
            (ES::Long4, ES::Long5),
            (ES::Long5, ES::Long6),
            (ES::Long6, ES::Long7),
            (ES::Long7, ES::Long8),
        ];
        let mut i = 0;
        while i < CHAINS.len() {
            set(&mut t, CHAINS[i].0, ECC::Oct, CHAINS[i].1);
            set(&mut t, CHAINS[i].0, ECC::Hex, CHAINS[i].1);
            i += 1;
        }
        set(&mut t, ES::Long8, ECC::Oct, ES::Normal);
        set(&mut t, ES::Long8, ECC::Hex, ES::Normal);

        // \OOO
        set(&mut t, ES::Oct2, ECC::Oct, ES::Oct3);
        set(&mut t, ES::Oct3, ECC::Oct, ES::Normal);

        t
    };

    #[inline(always)]
    const fn state_expects_hex(st: u8) -> bool {
        (st >= EscState::Hex1 as u8 && st <= EscState::Hex2 as u8)
            | (st >= EscState::Uni1 as u8 && st <= EscState::Uni4 as u8)
            | (st >= EscState::Long1 as u8 && st <= EscState::Long8 as u8)
    }

    pub fn validate_escapes_interpreted_body(body: &[u8]) -> Result<(), LexErrorKind> {
        use EscCharClass as ECC;
        use EscState as ES;

        let mut state = ES::Normal as u8;
        let mut acc_hex = 0u32;
        let mut acc_oct = 0u32;

        for &byte in body {
            let mut cc = ESC_CLASS[byte as usize];
            if state_expects_hex(state) && is_hex_digit(byte) {
                cc = ECC::Hex as u8;
            }

            let next = ESC_TRANS[state as usize][cc as usize];
            if next == ES::Error as u8 {
                return Err(LexErrorKind::InvalidEscape);
            }

            let is_hex_class = (cc == ECC::Hex as u8) | (cc == ECC::Oct as u8);
            let is_oct_class = cc == ECC::Oct as u8;

            if state_expects_hex(state) && is_hex_class {
                let first =
                    state == ES::Hex1 as u8 || state == ES::Uni1 as u8 || state == ES::Long1 as u8;
                acc_hex = (if first { 0 } else { acc_hex << 4 }) | hex_value(byte);
            }

            let in_oct =
                state == ES::Escape as u8 || state == ES::Oct2 as u8 || state == ES::Oct3 as u8;
            if in_oct && is_oct_class {
                let base = if state == ES::Escape as u8 { 0 } else { acc_oct * 8 };
                acc_oct = base + (byte - b'0') as u32;
            }

            let completes_unicode =
                (state == ES::Uni4 as u8 || state == ES::Long8 as u8) && is_hex_class;
            if completes_unicode && !is_valid_unicode_scalar(acc_hex) {
                return Err(LexErrorKind::InvalidEscape);
            }
            if state == ES::Oct3 as u8 && is_oct_class && acc_oct > 255 {
                return Err(LexErrorKind::InvalidEscape);
            }

            state = next;
        }

        if state != ES::Normal as u8 {
            return Err(LexErrorKind::InvalidEscape);
        }
        Ok(())
    }

    pub fn validate_interpreted_string(
        lex: &mut LogosLexer<'_, super::RawTok>,
    ) -> Result<(), LexErrorKind> {
        let s = lex.slice().as_bytes();
        if s.len() < 2 || s[0] != b'"' || s[s.len() - 1] != b'"' {
            return Err(LexErrorKind::UnterminatedString);
        }
        validate_escapes_interpreted_body(&s[1..s.len() - 1])
    }
}

// =============================================================================
// 3. Rune literal validation (UTF-8 + escapes)
// =============================================================================

mod rune {
    use super::*;

    #[repr(u8)]
    enum RuneEsc {
        Invalid = 0,
        Simple = 1,   // \n, \t, ... and \' \\
        Hex = 2,      // \xHH
        Unicode4 = 3, // \uHHHH
        Unicode8 = 4, // \UHHHHHHHH
        Octal = 5,    // \OOO
    }

    const RUNE_ESC: [u8; 256] = {
        let mut t = [RuneEsc::Invalid as u8; 256];

        let simple = b"abfnrtv\\'";
        let mut i = 0;
        while i < simple.len() {
            t[simple[i] as usize] = RuneEsc::Simple as u8;
            i += 1;
        }

        t[b'x' as usize] = RuneEsc::Hex as u8;
        t[b'u' as usize] = RuneEsc::Unicode4 as u8;
        t[b'U' as usize] = RuneEsc::Unicode8 as u8;

        let mut i = b'0';
        while i <= b'7' {
            t[i as usize] = RuneEsc::Octal as u8;
            i += 1;
        }

        t
    };

    // bytes consumed after the backslash, escape letter included
    const RUNE_ESC_CONSUME: [usize; 6] = [0, 1, 3, 5, 9, 3];

    fn validate_escape(body: &[u8], start: usize) -> Result<usize, LexErrorKind> {
        let esc_ch = *body.get(start).ok_or(LexErrorKind::InvalidEscape)?;
        let ty = RUNE_ESC[esc_ch as usize];
        if ty == RuneEsc::Invalid as u8 {
            return Err(LexErrorKind::InvalidEscape);
        }

        let consume = RUNE_ESC_CONSUME[ty as usize];
        let digits = body
            .get(start..start + consume)
            .ok_or(LexErrorKind::InvalidEscape)?;

        if ty == RuneEsc::Octal as u8 {
            let mut v = 0u32;
            for &d in digits {
                if !in_u8_inclusive(d, b'0', b'7') {
                    return Err(LexErrorKind::InvalidEscape);
                }
                v = v * 8 + (d - b'0') as u32;
            }
            if v > 255 {
                return Err(LexErrorKind::InvalidEscape);
            }
        } else if ty != RuneEsc::Simple as u8 {
            let mut v = 0u32;
            for &d in &digits[1..] {
                if !is_hex_digit(d) {
                    return Err(LexErrorKind::InvalidEscape);
                }
                v = (v << 4) | hex_value(d);
            }
            let checks_scalar = ty == RuneEsc::Unicode4 as u8 || ty == RuneEsc::Unicode8 as u8;
            if checks_scalar && !is_valid_unicode_scalar(v) {
                return Err(LexErrorKind::InvalidEscape);
            }
        }

        Ok(consume)
    }

    pub fn validate_rune_lit(lex: &mut LogosLexer<'_, super::RawTok>) -> Result<(), LexErrorKind> {
        let slice = lex.slice();
        let body = slice
            .strip_prefix('\'')
            .and_then(|s| s.strip_suffix('\''))
            .ok_or(LexErrorKind::InvalidToken)?;

        let consumed = match body.as_bytes().first() {
            None => return Err(LexErrorKind::InvalidToken),
            Some(b'\\') => 1 + validate_escape(body.as_bytes(), 1)?,
            // the source is a &str, so one char is one well-formed scalar
            Some(_) => body.chars().next().map_or(0, char::len_utf8),
        };

        if consumed != body.len() {
            return Err(LexErrorKind::InvalidToken);
        }
        Ok(())
    }
}

// =============================================================================
// 4. Number scanning/validation (Go-style DFA)
//   - classify_number(): validation + int/float classification
//   - lex_number(): maximal munch
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NumKind {
    Int,
    Float,
}

mod num {
    use super::*;

    #[repr(u8)]
    #[derive(Clone, Copy)]
    enum NumCharClass {
        Other = 0,
        Zero = 1, // '0'
        One = 2,  // '1'
        Oct = 3,  // '2'..'7'
        Dec = 4,  // '8'..'9'
        Dot = 5,  // '.'
        Us = 6,   // '_'
        E = 7,    // e/E
        P = 8,    // p/P
        X = 9,    // x/X
        O = 10,   // o/O
        B = 11,   // b/B
        Hex = 12, // a,c,d,f (+ uppercase)
        Sign = 13,
    }
    const NCLASS: usize = 14;

    #[repr(u8)]
    #[derive(Clone, Copy, PartialEq)]
    enum NumState {
        Err = 0,
        Start = 1,

        Zero = 2,
        DecInt = 3,
        DecIntUs = 4,

        LegacyOct = 5,
        LegacyOctUs = 6,

        BadLead = 7,
        BadLeadUs = 8,

        PreHex = 9,
        HexInt = 10,
        HexIntUs = 11,
        HexDotNoDig = 12,
        HexDotHaveDig = 13,
        HexFrac = 14,
        HexFracUs = 15,
        HexExpStart = 16,
        HexExpSign = 17,
        HexExp = 18,
        HexExpUs = 19,

        PreOct = 20,
        OctInt = 21,
        OctIntUs = 22,

        PreBin = 23,
        BinInt = 24,
        BinIntUs = 25,

        DotStart = 26,
        DecDot = 27,
        DecFrac = 28,
        DecFracUs = 29,
        DecExpStart = 30,
        DecExpSign = 31,
        DecExp = 32,
        DecExpUs = 33,
    }
    const NSTATE: usize = 34;

    const NUM_CLASS: [u8; 256] = {
        use NumCharClass as NCC;

        let mut t = [NCC::Other as u8; 256];

        t[b'0' as usize] = NCC::Zero as u8;
        t[b'1' as usize] = NCC::One as u8;
        let mut i = b'2';
        while i <= b'7' {
            t[i as usize] = NCC::Oct as u8;
            i += 1;
        }
        t[b'8' as usize] = NCC::Dec as u8;
        t[b'9' as usize] = NCC::Dec as u8;
        t[b'.' as usize] = NCC::Dot as u8;
        t[b'_' as usize] = NCC::Us as u8;

        let pairs: [(u8, NumCharClass); 9] = [
            (b'a', NCC::Hex),
            (b'c', NCC::Hex),
            (b'd', NCC::Hex),
            (b'f', NCC::Hex),
            (b'e', NCC::E),
            (b'p', NCC::P),
            (b'x', NCC::X),
            (b'o', NCC::O),
            (b'b', NCC::B),
        ];
        let mut i = 0;
        while i < pairs.len() {
            let (lower, class) = pairs[i];
            t[lower as usize] = class as u8;
            t[(lower - 32) as usize] = class as u8;
            i += 1;
        }

        t[b'+' as usize] = NCC::Sign as u8;
        t[b'-' as usize] = NCC::Sign as u8;

        t
    };

    static NUM_TRANS: [[u8; NCLASS]; NSTATE] = {
        let mut t = [[NumState::Err as u8; NCLASS]; NSTATE];

        macro_rules! tr {
            ($st:expr, [$($c:expr),+ $(,)?] => $to:expr) => {{
                $( t[$st as u8 as usize][$c as u8 as usize] = $to as u8; )+
            }};
        }

        use NumCharClass as NCC;
        use NumState as NS;

        tr!(NS::Start, [NCC::Zero] => NS::Zero);
        tr!(NS::Start, [NCC::One, NCC::Oct, NCC::Dec] => NS::DecInt);
        tr!(NS::Start, [NCC::Dot] => NS::DotStart);

        tr!(NS::Zero, [NCC::X] => NS::PreHex);
        tr!(NS::Zero, [NCC::O] => NS::PreOct);
        tr!(NS::Zero, [NCC::B] => NS::PreBin);
        tr!(NS::Zero, [NCC::Dot] => NS::DecDot);
        tr!(NS::Zero, [NCC::E] => NS::DecExpStart);
        tr!(NS::Zero, [NCC::Zero, NCC::One, NCC::Oct] => NS::LegacyOct);
        tr!(NS::Zero, [NCC::Us] => NS::LegacyOctUs);
        tr!(NS::Zero, [NCC::Dec] => NS::BadLead);

        tr!(NS::DecInt, [NCC::Zero, NCC::One, NCC::Oct, NCC::Dec] => NS::DecInt);
        tr!(NS::DecInt, [NCC::Us] => NS::DecIntUs);
        tr!(NS::DecInt, [NCC::Dot] => NS::DecDot);
        tr!(NS::DecInt, [NCC::E] => NS::DecExpStart);
        tr!(NS::DecIntUs, [NCC::Zero, NCC::One, NCC::Oct, NCC::Dec] => NS::DecInt);

        tr!(NS::LegacyOct, [NCC::Zero, NCC::One, NCC::Oct] => NS::LegacyOct);
        tr!(NS::LegacyOct, [NCC::Us] => NS::LegacyOctUs);
        tr!(NS::LegacyOct, [NCC::Dec] => NS::BadLead);
        tr!(NS::LegacyOct, [NCC::Dot] => NS::DecDot);
        tr!(NS::LegacyOct, [NCC::E] => NS::DecExpStart);
        tr!(NS::LegacyOctUs, [NCC::Zero, NCC::One, NCC::Oct] => NS::LegacyOct);
        tr!(NS::LegacyOctUs, [NCC::Dec] => NS::BadLead);

        // 09 is only valid if a '.' or exponent follows
        tr!(NS::BadLead, [NCC::Zero, NCC::One, NCC::Oct, NCC::Dec] => NS::BadLead);
        tr!(NS::BadLead, [NCC::Us] => NS::BadLeadUs);
        tr!(NS::BadLead, [NCC::Dot] => NS::DecDot);
        tr!(NS::BadLead, [NCC::E] => NS::DecExpStart);
        tr!(NS::BadLeadUs, [NCC::Zero, NCC::One, NCC::Oct, NCC::Dec] => NS::BadLead);

        tr!(NS::DotStart, [NCC::Zero, NCC::One, NCC::Oct, NCC::Dec] => NS::DecFrac);

        tr!(NS::DecDot, [NCC::Zero, NCC::One, NCC::Oct, NCC::Dec] => NS::DecFrac);
        tr!(NS::DecDot, [NCC::E] => NS::DecExpStart);

        tr!(NS::DecFrac, [NCC::Zero, NCC::One, NCC::Oct, NCC::Dec] => NS::DecFrac);
        tr!(NS::DecFrac, [NCC::Us] => NS::DecFracUs);
        tr!(NS::DecFrac, [NCC::E] => NS::DecExpStart);
        tr!(NS::DecFracUs, [NCC::Zero, NCC::One, NCC::Oct, NCC::Dec] => NS::DecFrac);

        tr!(NS::DecExpStart, [NCC::Sign] => NS::DecExpSign);
        tr!(NS::DecExpStart, [NCC::Zero, NCC::One, NCC::Oct, NCC::Dec] => NS::DecExp);
        tr!(NS::DecExpSign, [NCC::Zero, NCC::One, NCC::Oct, NCC::Dec] => NS::DecExp);
        tr!(NS::DecExp, [NCC::Zero, NCC::One, NCC::Oct, NCC::Dec] => NS::DecExp);
        tr!(NS::DecExp, [NCC::Us] => NS::DecExpUs);
        tr!(NS::DecExpUs, [NCC::Zero, NCC::One, NCC::Oct, NCC::Dec] => NS::DecExp);

        tr!(NS::PreHex, [NCC::Us] => NS::HexIntUs);
        tr!(NS::PreHex, [NCC::Zero, NCC::One, NCC::Oct, NCC::Dec, NCC::Hex, NCC::B, NCC::E] => NS::HexInt);
        tr!(NS::PreHex, [NCC::Dot] => NS::HexDotNoDig);

        tr!(NS::HexInt, [NCC::Zero, NCC::One, NCC::Oct, NCC::Dec, NCC::Hex, NCC::B, NCC::E] => NS::HexInt);
        tr!(NS::HexInt, [NCC::Us] => NS::HexIntUs);
        tr!(NS::HexInt, [NCC::Dot] => NS::HexDotHaveDig);
        tr!(NS::HexInt, [NCC::P] => NS::HexExpStart);
        tr!(NS::HexIntUs, [NCC::Zero, NCC::One, NCC::Oct, NCC::Dec, NCC::Hex, NCC::B, NCC::E] => NS::HexInt);

        tr!(NS::HexDotNoDig, [NCC::Zero, NCC::One, NCC::Oct, NCC::Dec, NCC::Hex, NCC::B, NCC::E] => NS::HexFrac);

        tr!(NS::HexDotHaveDig, [NCC::Zero, NCC::One, NCC::Oct, NCC::Dec, NCC::Hex, NCC::B, NCC::E] => NS::HexFrac);
        tr!(NS::HexDotHaveDig, [NCC::P] => NS::HexExpStart);

        tr!(NS::HexFrac, [NCC::Zero, NCC::One, NCC::Oct, NCC::Dec, NCC::Hex, NCC::B, NCC::E] => NS::HexFrac);
        tr!(NS::HexFrac, [NCC::Us] => NS::HexFracUs);
        tr!(NS::HexFrac, [NCC::P] => NS::HexExpStart);
        tr!(NS::HexFracUs, [NCC::Zero, NCC::One, NCC::Oct, NCC::Dec, NCC::Hex, NCC::B, NCC::E] => NS::HexFrac);

        tr!(NS::HexExpStart, [NCC::Sign] => NS::HexExpSign);
        tr!(NS::HexExpStart, [NCC::Zero, NCC::One, NCC::Oct, NCC::Dec] => NS::HexExp);
        tr!(NS::HexExpSign, [NCC::Zero, NCC::One, NCC::Oct, NCC::Dec] => NS::HexExp);
        tr!(NS::HexExp, [NCC::Zero, NCC::One, NCC::Oct, NCC::Dec] => NS::HexExp);
        tr!(NS::HexExp, [NCC::Us] => NS::HexExpUs);
        tr!(NS::HexExpUs, [NCC::Zero, NCC::One, NCC::Oct, NCC::Dec] => NS::HexExp);

        tr!(NS::PreOct, [NCC::Us] => NS::OctIntUs);
        tr!(NS::PreOct, [NCC::Zero, NCC::One, NCC::Oct] => NS::OctInt);
        tr!(NS::OctInt, [NCC::Zero, NCC::One, NCC::Oct] => NS::OctInt);
        tr!(NS::OctInt, [NCC::Us] => NS::OctIntUs);
        tr!(NS::OctIntUs, [NCC::Zero, NCC::One, NCC::Oct] => NS::OctInt);

        tr!(NS::PreBin, [NCC::Us] => NS::BinIntUs);
        tr!(NS::PreBin, [NCC::Zero, NCC::One] => NS::BinInt);
        tr!(NS::BinInt, [NCC::Zero, NCC::One] => NS::BinInt);
        tr!(NS::BinInt, [NCC::Us] => NS::BinIntUs);
        tr!(NS::BinIntUs, [NCC::Zero, NCC::One] => NS::BinInt);

        t
    };

    // bit0: accept, bit1: float
    static STATE_PROPS: [u8; NSTATE] = {
        let mut t = [0u8; NSTATE];

        t[NumState::Zero as usize] = 1;
        t[NumState::DecInt as usize] = 1;
        t[NumState::LegacyOct as usize] = 1;
        t[NumState::HexInt as usize] = 1;
        t[NumState::OctInt as usize] = 1;
        t[NumState::BinInt as usize] = 1;

        t[NumState::DecDot as usize] = 3;
        t[NumState::DecFrac as usize] = 3;
        t[NumState::DecExp as usize] = 3;

        // hex float: accept only once exponent digits exist
        t[NumState::HexExp as usize] = 3;

        t
    };

    pub const fn classify_number(lit: &[u8]) -> Result<NumKind, LexErrorKind> {
        if lit.is_empty() {
            return Err(LexErrorKind::InvalidNumber);
        }

        let mut state = NumState::Start as u8;
        let mut i = 0;
        while i < lit.len() {
            state = NUM_TRANS[state as usize][NUM_CLASS[lit[i] as usize] as usize];
            if state == NumState::Err as u8 {
                return Err(LexErrorKind::InvalidNumber);
            }
            i += 1;
        }

        match STATE_PROPS[state as usize] {
            0 => Err(LexErrorKind::InvalidNumber),
            1 => Ok(NumKind::Int),
            _ => Ok(NumKind::Float),
        }
    }

    // Maximal munch must not restrict digit ranges for base 2/8, otherwise
    // "0b2" splits into "0b" + "2". Validation is the DFA's job.
    #[inline]
    const fn consume_digits(src: &[u8], mut i: usize, hex: bool) -> usize {
        while i < src.len() {
            let b = src[i];
            let digit = if hex { is_hex_digit(b) } else { is_dec_digit(b) };
            if !(digit || b == b'_') {
                break;
            }
            i += 1;
        }
        i
    }

    /// Logos callback: extend a number token to its maximal munch.
    /// `0b2`, `09` and `0o9` stay one token and are rejected by `classify_number`.
    pub fn lex_number(lex: &mut LogosLexer<'_, super::RawTok>) {
        let src = lex.source().as_bytes();
        let start = lex.span().start;
        let n = src.len();
        if start >= n {
            return;
        }

        let mut i = start;
        let mut hex = false;

        if src[i] != b'.' {
            let first = src[i];
            i += 1;
            if first == b'0' && i < n {
                match src[i] | 0x20 {
                    b'x' => {
                        hex = true;
                        i += 1;
                    }
                    b'o' | b'b' => i += 1,
                    _ => {}
                }
            }
            i = consume_digits(src, i, hex);
        } else {
            // ".<digit>" (the regex guarantees one digit)
            i = consume_digits(src, i + 1, false);
        }

        // fraction; don't steal ".." / "..."
        if i < n && src[i] == b'.' && !(i + 1 < n && src[i + 1] == b'.') {
            i = consume_digits(src, i + 1, hex);
        }

        // exponent: the scanner is permissive, the DFA checks e vs p
        if i < n && matches!(src[i] | 0x20, b'e' | b'p') {
            i += 1;
            if i < n && matches!(src[i], b'+' | b'-') {
                i += 1;
            }
            i = consume_digits(src, i, false);
        }

        let already = lex.span().end;
        if i > already {
            lex.bump(i - already);
        }
    }
}

// =============================================================================
// 5. Raw token definition (Logos DFA)
// =============================================================================

#[repr(u8)]
#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(error = LexErrorKind)]
#[logos(skip r"[ \t]+")]
#[rustfmt::skip]
enum RawTok {
    #[token("\u{FEFF}")] Bom,

    // Trivia
    #[regex(r"\r\n|\n|\r")] Newline,
    #[token("//", lex_line_comment)] LineComment,
    #[token("/*", lex_block_comment)] BlockComment,

    // Keywords (before Ident)
    #[token("break")] KwBreak,
    #[token("case")] KwCase,
    #[token("chan")] KwChan,
    #[token("const")] KwConst,
    #[token("continue")] KwContinue,
    #[token("default")] KwDefault,
    #[token("defer")] KwDefer,
    #[token("else")] KwElse,
    #[token("fallthrough")] KwFallthrough,
    #[token("for")] KwFor,
    #[token("func")] KwFunc,
    #[token("go")] KwGo,
    #[token("goto")] KwGoto,
    #[token("if")] KwIf,
    #[token("import")] KwImport,
    #[token("interface")] KwInterface,
    #[token("map")] KwMap,
    #[token("package")] KwPackage,
    #[token("range")] KwRange,
    #[token("return")] KwReturn,
    #[token("select")] KwSelect,
    #[token("struct")] KwStruct,
    #[token("switch")] KwSwitch,
    #[token("type")] KwType,
    #[token("var")] KwVar,

    #[regex(r"[_\p{L}][_\p{L}\p{Nd}]*")] Ident,

    // Numbers (maximal munch in callback)
    #[regex(r"[0-9]|\.[0-9]", num::lex_number)] Number,

    #[regex(r"`[^`]*`")] RawString,
    #[regex(r#""([^"\\\n\r]|\\.)*""#, esc::validate_interpreted_string)] String,
    #[regex(r"'([^'\\\n\r]|\\.)+'", rune::validate_rune_lit)] Rune,

    #[token("...")] Ellipsis,
    #[token("<<=")] ShlAssign,
    #[token(">>=")] ShrAssign,
    #[token("&^=")] AndNotAssign,
    #[token("+=")] AddAssign,
    #[token("-=")] SubAssign,
    #[token("*=")] MulAssign,
    #[token("/=")] DivAssign,
    #[token("%=")] ModAssign,
    #[token("&=")] AndAssign,
    #[token("|=")] OrAssign,
    #[token("^=")] XorAssign,
    #[token("<<")] Shl,
    #[token(">>")] Shr,
    #[token("&^")] AndNot,
    #[token("&&")] LAnd,
    #[token("||")] LOr,
    #[token("==")] EqEq,
    #[token("!=")] NotEq,
    #[token("<=")] Le,
    #[token(">=")] Ge,
    #[token("++")] Inc,
    #[token("--")] Dec,
    #[token(":=")] Define,
    #[token("<-")] Arrow,
    #[token("=")] Assign,
    #[token("+")] Plus,
    #[token("-")] Minus,
    #[token("*")] Star,
    #[token("/")] Slash,
    #[token("%")] Percent,
    #[token("&")] Amp,
    #[token("|")] Pipe,
    #[token("^")] Caret,
    #[token("~")] Tilde,
    #[token("!")] Bang,
    #[token("<")] Lt,
    #[token(">")] Gt,

    #[token("(")] LParen,
    #[token(")")] RParen,
    #[token("[")] LBrack,
    #[token("]")] RBrack,
    #[token("{")] LBrace,
    #[token("}")] RBrace,
    #[token(",")] Comma,
    #[token(";")] Semi,
    #[token(":")] Colon,
    #[token(".")] Dot,

    // Catch-all (lowest priority)
    #[regex(r".", priority = 0)] Error,
}

impl RawTok {
    /// Fixed-spelling tokens map one-to-one onto `Tok`.
    fn fixed(self) -> Option<Tok> {
        macro_rules! same {
            ($($v:ident),* $(,)?) => {
                match self {
                    $(Self::$v => Some(Tok::$v),)*
                    _ => None,
                }
            };
        }

        same! {
            KwBreak, KwCase, KwChan, KwConst, KwContinue, KwDefault, KwDefer, KwElse,
            KwFallthrough, KwFor, KwFunc, KwGo, KwGoto, KwIf, KwImport, KwInterface,
            KwMap, KwPackage, KwRange, KwReturn, KwSelect, KwStruct, KwSwitch, KwType, KwVar,

            Ellipsis, ShlAssign, ShrAssign, AndNotAssign, AddAssign, SubAssign, MulAssign,
            DivAssign, ModAssign, AndAssign, OrAssign, XorAssign, Shl, Shr, AndNot, LAnd, LOr,
            EqEq, NotEq, Le, Ge, Inc, Dec, Define, Arrow, Assign, Plus, Minus, Star, Slash,
            Percent, Amp, Pipe, Caret, Tilde, Bang, Lt, Gt,

            LParen, RParen, LBrack, RBrack, LBrace, RBrace, Comma, Semi, Colon, Dot,
            Ident, Rune, String, RawString,
        }
    }
}

// =============================================================================
// 6. Public token kinds
// =============================================================================

/// Token kind. Fieldless; the source text lives in [`Token::lit`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tok {
    Ident,
    Int,
    Float,
    Imag,
    Rune,
    String,
    RawString,
    Comment,

    // Keywords
    KwBreak,
    KwCase,
    KwChan,
    KwConst,
    KwContinue,
    KwDefault,
    KwDefer,
    KwElse,
    KwFallthrough,
    KwFor,
    KwFunc,
    KwGo,
    KwGoto,
    KwIf,
    KwImport,
    KwInterface,
    KwMap,
    KwPackage,
    KwRange,
    KwReturn,
    KwSelect,
    KwStruct,
    KwSwitch,
    KwType,
    KwVar,

    // Operators
    Ellipsis,
    ShlAssign,
    ShrAssign,
    AndNotAssign,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    ModAssign,
    AndAssign,
    OrAssign,
    XorAssign,
    Shl,
    Shr,
    AndNot,
    LAnd,
    LOr,
    EqEq,
    NotEq,
    Le,
    Ge,
    Inc,
    Dec,
    Define,
    Arrow,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Bang,
    Lt,
    Gt,

    // Punctuation (operators too, in Go's classification)
    LParen,
    RParen,
    LBrack,
    RBrack,
    LBrace,
    RBrace,
    Comma,
    Semi,
    Colon,
    Dot,

    Error,
    Eof,
}

const TOK_COUNT: usize = Tok::Eof as usize + 1;

/// Every operator and punctuation kind.
pub const OPERATORS: [Tok; 48] = [
    Tok::Ellipsis,
    Tok::ShlAssign,
    Tok::ShrAssign,
    Tok::AndNotAssign,
    Tok::AddAssign,
    Tok::SubAssign,
    Tok::MulAssign,
    Tok::DivAssign,
    Tok::ModAssign,
    Tok::AndAssign,
    Tok::OrAssign,
    Tok::XorAssign,
    Tok::Shl,
    Tok::Shr,
    Tok::AndNot,
    Tok::LAnd,
    Tok::LOr,
    Tok::EqEq,
    Tok::NotEq,
    Tok::Le,
    Tok::Ge,
    Tok::Inc,
    Tok::Dec,
    Tok::Define,
    Tok::Arrow,
    Tok::Assign,
    Tok::Plus,
    Tok::Minus,
    Tok::Star,
    Tok::Slash,
    Tok::Percent,
    Tok::Amp,
    Tok::Pipe,
    Tok::Caret,
    Tok::Tilde,
    Tok::Bang,
    Tok::Lt,
    Tok::Gt,
    Tok::LParen,
    Tok::RParen,
    Tok::LBrack,
    Tok::RBrack,
    Tok::LBrace,
    Tok::RBrace,
    Tok::Comma,
    Tok::Semi,
    Tok::Colon,
    Tok::Dot,
];

macro_rules! gen_lookup_table {
    ($($variant:ident),* $(,)?) => {{
        let mut table = [false; TOK_COUNT];
        $(table[Tok::$variant as usize] = true;)*
        table
    }};
}

const SEMI_INSERT_TABLE: [bool; TOK_COUNT] = gen_lookup_table!(
    Ident,
    Int,
    Float,
    Imag,
    Rune,
    String,
    RawString,
    KwBreak,
    KwContinue,
    KwFallthrough,
    KwReturn,
    Inc,
    Dec,
    RParen,
    RBrack,
    RBrace,
);

const WORD_TABLE: [bool; TOK_COUNT] = gen_lookup_table!(Ident, Int, Float, Imag);

impl Tok {
    #[inline(always)]
    pub const fn can_insert_semicolon(self) -> bool {
        SEMI_INSERT_TABLE[self as usize]
    }

    #[inline]
    pub const fn is_keyword(self) -> bool {
        self as u8 >= Tok::KwBreak as u8 && self as u8 <= Tok::KwVar as u8
    }

    /// Identifier or basic literal, as in Go's `token.IsLiteral`.
    #[inline]
    pub const fn is_literal(self) -> bool {
        self as u8 <= Tok::RawString as u8
    }

    /// Operators and punctuation, as in Go's `token.IsOperator`.
    #[inline]
    pub const fn is_operator(self) -> bool {
        self as u8 >= Tok::Ellipsis as u8 && self as u8 <= Tok::Dot as u8
    }

    /// Tokens that merge with an adjacent word: `x y`, `return x`, `case 1`.
    #[inline]
    pub const fn is_word(self) -> bool {
        self.is_keyword() || WORD_TABLE[self as usize]
    }

    #[inline]
    pub const fn is_opening(self) -> bool {
        matches!(self, Tok::LParen | Tok::LBrack | Tok::LBrace)
    }

    #[inline]
    pub const fn is_closing(self) -> bool {
        matches!(self, Tok::RParen | Tok::RBrack | Tok::RBrace)
    }

    #[inline]
    pub const fn is_separator(self) -> bool {
        matches!(self, Tok::Comma | Tok::Semi)
    }

    #[inline]
    pub const fn is_string(self) -> bool {
        matches!(self, Tok::String | Tok::RawString)
    }

    /// Canonical spelling of fixed tokens; a class name for the others.
    pub const fn as_str(self) -> &'static str {
        match self {
            Tok::Ident => "IDENT",
            Tok::Int => "INT",
            Tok::Float => "FLOAT",
            Tok::Imag => "IMAG",
            Tok::Rune => "CHAR",
            Tok::String | Tok::RawString => "STRING",
            Tok::Comment => "COMMENT",

            Tok::KwBreak => "break",
            Tok::KwCase => "case",
            Tok::KwChan => "chan",
            Tok::KwConst => "const",
            Tok::KwContinue => "continue",
            Tok::KwDefault => "default",
            Tok::KwDefer => "defer",
            Tok::KwElse => "else",
            Tok::KwFallthrough => "fallthrough",
            Tok::KwFor => "for",
            Tok::KwFunc => "func",
            Tok::KwGo => "go",
            Tok::KwGoto => "goto",
            Tok::KwIf => "if",
            Tok::KwImport => "import",
            Tok::KwInterface => "interface",
            Tok::KwMap => "map",
            Tok::KwPackage => "package",
            Tok::KwRange => "range",
            Tok::KwReturn => "return",
            Tok::KwSelect => "select",
            Tok::KwStruct => "struct",
            Tok::KwSwitch => "switch",
            Tok::KwType => "type",
            Tok::KwVar => "var",

            Tok::Ellipsis => "...",
            Tok::ShlAssign => "<<=",
            Tok::ShrAssign => ">>=",
            Tok::AndNotAssign => "&^=",
            Tok::AddAssign => "+=",
            Tok::SubAssign => "-=",
            Tok::MulAssign => "*=",
            Tok::DivAssign => "/=",
            Tok::ModAssign => "%=",
            Tok::AndAssign => "&=",
            Tok::OrAssign => "|=",
            Tok::XorAssign => "^=",
            Tok::Shl => "<<",
            Tok::Shr => ">>",
            Tok::AndNot => "&^",
            Tok::LAnd => "&&",
            Tok::LOr => "||",
            Tok::EqEq => "==",
            Tok::NotEq => "!=",
            Tok::Le => "<=",
            Tok::Ge => ">=",
            Tok::Inc => "++",
            Tok::Dec => "--",
            Tok::Define => ":=",
            Tok::Arrow => "<-",
            Tok::Assign => "=",
            Tok::Plus => "+",
            Tok::Minus => "-",
            Tok::Star => "*",
            Tok::Slash => "/",
            Tok::Percent => "%",
            Tok::Amp => "&",
            Tok::Pipe => "|",
            Tok::Caret => "^",
            Tok::Tilde => "~",
            Tok::Bang => "!",
            Tok::Lt => "<",
            Tok::Gt => ">",

            Tok::LParen => "(",
            Tok::RParen => ")",
            Tok::LBrack => "[",
            Tok::RBrack => "]",
            Tok::LBrace => "{",
            Tok::RBrace => "}",
            Tok::Comma => ",",
            Tok::Semi => ";",
            Tok::Colon => ":",
            Tok::Dot => ".",

            Tok::Error => "ILLEGAL",
            Tok::Eof => "EOF",
        }
    }
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// True when writing `prev` directly followed by `next` would lex as
/// something other than those two tokens (`+ +` vs `++`, `/ *` vs `/*`).
pub fn operators_merge(prev: Tok, next: Tok) -> bool {
    if !prev.is_operator() || !next.is_operator() {
        return false;
    }
    let (a, b) = (prev.as_str(), next.as_str());
    if a == "/" && (b.starts_with('*') || b.starts_with('/')) {
        return true;
    }
    OPERATORS.iter().any(|op| {
        let s = op.as_str();
        s.len() > a.len() && s.starts_with(a) && b.starts_with(&s[a.len()..])
    })
}

/// One lexed token. `lit` is the exact source slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'src> {
    pub pos: usize,
    pub end: usize,
    pub kind: Tok,
    pub lit: &'src str,
}

impl<'src> Token<'src> {
    /// Semicolon produced by a line break or end of input.
    #[inline]
    pub fn is_injected(&self) -> bool {
        self.kind == Tok::Semi && self.pos == self.end
    }

    /// Source text for literals, canonical spelling for everything else.
    #[inline]
    pub fn text(&self) -> &'src str {
        match self.kind {
            Tok::Ident
            | Tok::Int
            | Tok::Float
            | Tok::Imag
            | Tok::Rune
            | Tok::String
            | Tok::RawString
            | Tok::Comment
            | Tok::Error => self.lit,
            _ if self.is_injected() => self.lit,
            kind => kind.as_str(),
        }
    }

    #[inline]
    pub fn span(&self) -> Span {
        Span::new(self.pos, self.end)
    }
}

// =============================================================================
// 7. Lexer wrapper: semicolon insertion, imag lookahead, comments, diags
// =============================================================================

pub struct Lexer<'src> {
    logos: LogosLexer<'src, RawTok>,
    pending: Option<Token<'src>>,
    diags: Vec<Diag>,
    error_count: usize,
    emit_comments: bool,
    last_can_insert_semi: bool,
    src_len: usize,
    eof_done: bool,
    eof_emitted: bool,
}

impl<'src> Lexer<'src> {
    pub fn new(input: &'src str) -> Self {
        Self {
            logos: RawTok::lexer(input),
            pending: None,
            diags: Vec::with_capacity(16),
            error_count: 0,
            emit_comments: false,
            last_can_insert_semi: false,
            src_len: input.len(),
            eof_done: false,
            eof_emitted: false,
        }
    }

    /// Like [`Lexer::new`] but yields comments as `Tok::Comment`.
    pub fn with_comments(input: &'src str) -> Self {
        Self {
            emit_comments: true,
            ..Self::new(input)
        }
    }

    /// Interpose observers; see [`Observed`].
    pub fn observed<'obs>(self, observers: Vec<&'obs mut dyn TokenObserver>) -> Observed<'src, 'obs> {
        Observed {
            lexer: self,
            observers,
            stopped: false,
        }
    }

    pub fn source(&self) -> &'src str {
        self.logos.source()
    }

    /// Number of lexical errors so far; it only ever grows.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn take_diags(&mut self) -> Vec<Diag> {
        std::mem::take(&mut self.diags)
    }

    #[inline]
    fn push_lex_diag(&mut self, kind: LexErrorKind, span: Range<usize>) {
        self.error_count += 1;
        let span = Span::from_range(span);
        self.diags.push(LexError { kind, span }.diag());
    }

    #[inline]
    fn token(&self, kind: Tok, span: Range<usize>) -> Token<'src> {
        let lit = self.logos.source().get(span.clone()).unwrap_or("");
        Token {
            pos: span.start,
            end: span.end,
            kind,
            lit,
        }
    }

    #[inline]
    fn semi_at(pos: usize) -> Token<'src> {
        Token {
            pos,
            end: pos,
            kind: Tok::Semi,
            lit: "\n",
        }
    }

    /// Newlines and comments. Returns `None` when the raw token was not trivia,
    /// `Some(None)` when it was consumed silently.
    #[inline]
    fn handle_trivia(&mut self, raw: RawTok, span: Range<usize>) -> Option<Option<Token<'src>>> {
        match raw {
            RawTok::Newline => {
                if self.last_can_insert_semi {
                    self.last_can_insert_semi = false;
                    return Some(Some(Self::semi_at(span.start)));
                }
                Some(None)
            }
            RawTok::LineComment => Some(self.comment(span)),
            RawTok::BlockComment => {
                if self.last_can_insert_semi {
                    if let Some(off) = first_newline_offset(self.logos.slice()) {
                        self.last_can_insert_semi = false;
                        self.pending = Some(Self::semi_at(span.start + off));
                    }
                }
                Some(self.comment(span))
            }
            _ => None,
        }
    }

    #[inline]
    fn comment(&self, span: Range<usize>) -> Option<Token<'src>> {
        self.emit_comments.then(|| self.token(Tok::Comment, span))
    }
}

impl<'src> Iterator for Lexer<'src> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            // 1) Emit pending token (an injected ';')
            if let Some(tok) = self.pending.take() {
                return Some(tok);
            }

            // 2) End marker, once
            if self.eof_done {
                if self.eof_emitted {
                    return None;
                }
                self.eof_emitted = true;
                return Some(Token {
                    pos: self.src_len,
                    end: self.src_len,
                    kind: Tok::Eof,
                    lit: "",
                });
            }

            // 3) Next raw token
            let item = match self.logos.next() {
                None => {
                    // the pending ';' goes out before the end marker
                    self.handle_eof();
                    continue;
                }
                Some(Err(kind)) => self.handle_lex_error(kind),
                Some(Ok(raw)) => self.handle_raw_token(raw),
            };

            if let Some(tok) = item {
                return Some(tok);
            }
        }
    }
}

impl<'src> Lexer<'src> {
    #[inline]
    fn handle_eof(&mut self) {
        self.eof_done = true;
        if self.last_can_insert_semi {
            self.last_can_insert_semi = false;
            self.pending = Some(Token {
                lit: "",
                ..Self::semi_at(self.src_len)
            });
        }
    }

    /// Callback failures. Malformed strings, runes and comments keep their
    /// kind so a caller can keep going; the error is counted either way.
    fn handle_lex_error(&mut self, kind: LexErrorKind) -> Option<Token<'src>> {
        let span = self.logos.span();
        self.push_lex_diag(kind, span.clone());

        let slice = self.logos.slice();
        let recovered = match slice.as_bytes().first() {
            Some(b'"') if slice.len() > 1 => Some(Tok::String),
            Some(b'\'') if slice.len() > 1 => Some(Tok::Rune),
            Some(b'/') if kind == LexErrorKind::UnterminatedComment => {
                return self.comment(span);
            }
            _ => None,
        };

        match recovered {
            Some(tok) => {
                self.last_can_insert_semi = true;
                Some(self.token(tok, span))
            }
            None => {
                self.last_can_insert_semi = false;
                Some(self.token(Tok::Error, span))
            }
        }
    }

    fn handle_raw_token(&mut self, raw: RawTok) -> Option<Token<'src>> {
        let span = self.logos.span();

        if raw == RawTok::Bom {
            if span.start == 0 {
                return None;
            }
            self.push_lex_diag(LexErrorKind::MisplacedBom, span.clone());
            self.last_can_insert_semi = false;
            return Some(self.token(Tok::Error, span));
        }

        if let Some(out) = self.handle_trivia(raw, span.clone()) {
            return out;
        }

        if raw == RawTok::Error {
            let kind = match self.logos.slice() {
                "\"" | "`" => LexErrorKind::UnterminatedString,
                _ => LexErrorKind::InvalidToken,
            };
            self.push_lex_diag(kind, span.clone());
            self.last_can_insert_semi = false;
            return Some(self.token(Tok::Error, span));
        }

        if raw == RawTok::Number {
            return Some(self.handle_number_token(span));
        }

        let tok = raw.fixed().unwrap_or(Tok::Error);
        self.last_can_insert_semi = tok.can_insert_semicolon();
        Some(self.token(tok, span))
    }

    fn handle_number_token(&mut self, span: Range<usize>) -> Token<'src> {
        let src = self.logos.source().as_bytes();
        let bytes = &src[span.clone()];
        self.last_can_insert_semi = true;

        if src.get(span.end) == Some(&b'i') {
            let is_valid =
                num::classify_number(bytes).is_ok() || is_decimal_digits_with_underscores(bytes);
            self.logos.bump(1);
            let span = span.start..span.end + 1;
            if !is_valid {
                self.push_lex_diag(LexErrorKind::InvalidNumber, span.clone());
            }
            return self.token(Tok::Imag, span);
        }

        match num::classify_number(bytes) {
            Ok(NumKind::Int) => self.token(Tok::Int, span),
            Ok(NumKind::Float) => self.token(Tok::Float, span),
            Err(kind) => {
                self.push_lex_diag(kind, span.clone());
                let guess = if bytes.contains(&b'.') {
                    Tok::Float
                } else {
                    Tok::Int
                };
                self.token(guess, span)
            }
        }
    }
}

// =============================================================================
// 8. Observers
// =============================================================================

/// Per-token callback. Returning `false` ends the scan after this token.
pub trait TokenObserver {
    fn observe(&mut self, tok: &Token<'_>) -> bool;
}

impl<F> TokenObserver for F
where
    F: FnMut(&Token<'_>) -> bool,
{
    #[inline]
    fn observe(&mut self, tok: &Token<'_>) -> bool {
        self(tok)
    }
}

/// A [`Lexer`] whose tokens are shown to observers before being yielded.
///
/// Observers run in order and the first `false` short-circuits the rest.
/// The token that triggered the stop is still yielded; the stream then ends.
pub struct Observed<'src, 'obs> {
    lexer: Lexer<'src>,
    observers: Vec<&'obs mut dyn TokenObserver>,
    stopped: bool,
}

impl<'src, 'obs> Observed<'src, 'obs> {
    pub fn lexer(&self) -> &Lexer<'src> {
        &self.lexer
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn into_inner(self) -> Lexer<'src> {
        self.lexer
    }
}

impl<'src, 'obs> Iterator for Observed<'src, 'obs> {
    type Item = Token<'src>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.stopped {
            return None;
        }
        let tok = self.lexer.next()?;
        if !self.observers.iter_mut().all(|o| o.observe(&tok)) {
            self.stopped = true;
        }
        Some(tok)
    }
}
