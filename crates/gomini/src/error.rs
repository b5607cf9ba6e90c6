use std::fmt;
use std::io;

use thiserror::Error;

/// Compact byte-span used across the crate.
///
/// Token offsets are `usize`; we convert to `u32` for compactness.
/// If you need >4GiB inputs, change to `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Span {
    pub start: u32,
    pub end: u32, // exclusive
}

impl Span {
    #[inline]
    pub const fn new(start: usize, end: usize) -> Self {
        // Clamp rather than panic.
        let s = if start > u32::MAX as usize {
            u32::MAX
        } else {
            start as u32
        };
        let e = if end > u32::MAX as usize {
            u32::MAX
        } else {
            end as u32
        };
        Self { start: s, end: e }
    }

    #[inline]
    pub const fn empty_at(pos: usize) -> Self {
        Self::new(pos, pos)
    }

    #[inline]
    pub const fn single_at(pos: usize) -> Self {
        // A one-byte span at pos (best-effort; used for InvalidToken).
        let s = Self::empty_at(pos);
        Self {
            start: s.start,
            end: s.start.saturating_add(1),
        }
    }

    pub const fn from_range(range: std::ops::Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }

    /// Smallest span covering both.
    #[inline]
    pub const fn to(self, other: Span) -> Self {
        let start = if self.start < other.start {
            self.start
        } else {
            other.start
        };
        let end = if self.end > other.end {
            self.end
        } else {
            other.end
        };
        Self { start, end }
    }

    #[inline]
    pub const fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start as usize..self.end as usize
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagKind {
    Lex,
    Parse,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diag {
    pub kind: DiagKind,
    pub span: Span,
    pub message: String,
}

impl Diag {
    pub fn parse(span: Span, message: impl Into<String>) -> Self {
        Self {
            kind: DiagKind::Parse,
            span,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            DiagKind::Lex => "lex",
            DiagKind::Parse => "parse",
        };
        write!(f, "{kind} error at {}: {}", self.span, self.message)
    }
}

/// Parsing gave up; no partial tree is kept.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", .diags.first().map(ToString::to_string).unwrap_or_else(|| "parse failed".to_string()))]
pub struct ParseFailure {
    pub diags: Vec<Diag>,
}

impl ParseFailure {
    pub fn single(diag: Diag) -> Self {
        Self { diags: vec![diag] }
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Default)]
pub enum LexErrorKind {
    #[default]
    #[error("invalid token")]
    InvalidToken,
    #[error("invalid numeric literal")]
    InvalidNumber,
    #[error("invalid escape")]
    InvalidEscape,
    #[error("unterminated string")]
    UnterminatedString,
    #[error("unterminated comment")]
    UnterminatedComment,
    #[error("misplaced byte order mark")]
    MisplacedBom,
}

#[derive(Debug, Error, Clone, PartialEq, Eq, Default)]
#[error("{kind}: {span:?}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
}

impl LexError {
    #[inline]
    pub fn diag(&self) -> Diag {
        Diag {
            kind: DiagKind::Lex,
            span: self.span,
            message: self.kind.to_string(),
        }
    }
}

/// Failure of a compaction run. Bytes already written stay in the sink.
#[derive(Debug, Error)]
pub enum CompactError {
    /// An illegal token, or input that is not UTF-8.
    #[error("scanner: offset {pos}: {message}")]
    Lexical { pos: usize, message: String },

    /// The scan finished but reported errors without an illegal token.
    #[error("Scanner.ErrorCount: {count}")]
    Aggregate { count: usize },

    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Why a compacted buffer is not minimal.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ViolationReason {
    #[error("illegal token")]
    Illegal,
    #[error("line break")]
    LineBreak,
    #[error("redundant whitespace")]
    Whitespace,
    #[error("unnecessary space")]
    Space,
    #[error("space before opening bracket")]
    SpaceBeforeOpening,
    #[error("space after for")]
    SpaceAfterFor,
    #[error("repeated separator")]
    RepeatedSeparator,
    #[error("separator before closing bracket")]
    SeparatorBeforeClosing,
    #[error("collapsible loop header")]
    EmptyLoopHeader,
    #[error("comment")]
    Comment,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{pos}: {reason}: {prev:?} -> {next:?}")]
pub struct MinimalityViolation {
    pub pos: usize,
    pub reason: ViolationReason,
    pub prev: String,
    pub next: String,
}
