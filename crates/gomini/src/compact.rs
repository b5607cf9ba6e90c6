//! Single-line Go output with every removable byte removed.
//!
//! The compactor is a [`TokenObserver`]: it sees tokens one at a time and
//! writes to an [`io::Write`] sink as it goes. Commas and terminators are
//! held back until the next token shows whether they are needed.

use std::io;

use tracing::{debug, trace};

use crate::error::CompactError;
use crate::header::ForHeader;
use crate::lexer::{operators_merge, Lexer, Tok, Token, TokenObserver};
use crate::literal::{import_path_pragma, quote_raw};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CompactOptions {
    /// Drop the `// import "path"` pragma after the package clause. When kept,
    /// it is written as the block comment `/*import "path"*/`.
    pub omit_import_path: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Separator {
    Comma,
    Terminator,
}

impl Separator {
    fn as_str(self) -> &'static str {
        match self {
            Self::Comma => ",",
            Self::Terminator => ";",
        }
    }
}

/// Progress towards the import-path pragma: `package name // import "path"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PragmaPhase {
    Disabled,
    AwaitingKeyword,
    AwaitingName,
    /// After the package name; the comment may trail the clause or follow
    /// its terminator.
    AwaitingComment {
        terminators: u8,
    },
}

pub struct Compactor<W: io::Write> {
    sink: W,
    options: CompactOptions,
    written: usize,
    error: Option<CompactError>,
    done: bool,

    prev: Option<Tok>,
    pending: Option<Separator>,
    /// Terminators seen directly after `for`.
    for_semis: u8,
    header: ForHeader,
    pragma: PragmaPhase,
}

impl<W: io::Write> Compactor<W> {
    pub fn new(sink: W, options: CompactOptions) -> Self {
        Self {
            sink,
            options,
            written: 0,
            error: None,
            done: false,
            prev: None,
            pending: None,
            for_semis: 0,
            header: ForHeader::new(),
            pragma: Self::initial_pragma(options),
        }
    }

    fn initial_pragma(options: CompactOptions) -> PragmaPhase {
        if options.omit_import_path {
            PragmaPhase::Disabled
        } else {
            PragmaPhase::AwaitingKeyword
        }
    }

    /// Forget the previous source; the sink and the byte count are kept.
    fn reset(&mut self) {
        self.error = None;
        self.done = false;
        self.prev = None;
        self.pending = None;
        self.for_semis = 0;
        self.header = ForHeader::new();
        self.pragma = Self::initial_pragma(self.options);
    }

    /// Bytes written to the sink so far, also after a failure.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Flush and return the sink.
    pub fn finish(mut self) -> Result<W, CompactError> {
        if let Some(err) = self.error.take() {
            return Err(err);
        }
        self.sink.flush()?;
        Ok(self.sink)
    }

    /// Tokenize `src` and write its compact form. Each call starts from a
    /// fresh state. Returns the total number of bytes written by this
    /// compactor.
    pub fn compact(&mut self, src: &[u8]) -> Result<usize, CompactError> {
        self.reset();
        let src = std::str::from_utf8(src).map_err(|e| {
            debug!(pos = e.valid_up_to(), "input is not UTF-8");
            CompactError::Lexical {
                pos: e.valid_up_to(),
                message: "invalid UTF-8 encoding".to_string(),
            }
        })?;

        let lex_errors = {
            let observers: Vec<&mut dyn TokenObserver> = vec![&mut *self];
            let mut tokens = Lexer::with_comments(src).observed(observers);
            while tokens.next().is_some() {
                if tokens.lexer().error_count() > 0 {
                    break;
                }
            }
            tokens.lexer().error_count()
        };

        if let Some(err) = self.error.take() {
            return Err(err);
        }
        if lex_errors > 0 {
            debug!(count = lex_errors, "scan reported errors");
            return Err(CompactError::Aggregate { count: lex_errors });
        }
        Ok(self.written)
    }

    /// Process one token. Returns `false` once the caller should stop:
    /// end of input, an illegal token, or a failed write.
    pub fn write_token(&mut self, tok: &Token<'_>) -> bool {
        if self.done || self.error.is_some() {
            return false;
        }

        match tok.kind {
            Tok::Eof => {
                self.done = true;
                return false;
            }
            Tok::Error => {
                debug!(pos = tok.pos, lit = tok.lit, "illegal token");
                self.error = Some(CompactError::Lexical {
                    pos: tok.pos,
                    message: format!("illegal token {:?}", tok.lit),
                });
                return false;
            }
            Tok::Comment => {
                self.comment(tok.lit);
                return self.error.is_none();
            }
            _ => {}
        }

        self.advance_pragma(tok.kind);
        let inside_header = self.header.in_header();
        self.header.observe(tok.kind);

        match tok.kind {
            Tok::Comma => {
                if self.pending.is_none() {
                    self.pending = Some(Separator::Comma);
                }
                return true;
            }
            Tok::Semi => {
                self.terminator(inside_header);
                return self.error.is_none();
            }
            kind if kind.is_closing() => {
                self.pending = None;
                self.for_semis = 0;
            }
            Tok::LBrace if self.for_semis == 2 => {
                trace!(pos = tok.pos, "empty loop header");
                self.for_semis = 0;
            }
            kind => {
                let separated = self.flush_separators();
                if !separated {
                    if let Some(prev) = self.prev {
                        let needs_space = (prev.is_word() && kind.is_word())
                            || (prev.is_keyword() && !kind.is_operator())
                            || operators_merge(prev, kind);
                        if needs_space {
                            self.emit(" ");
                        }
                    }
                }
            }
        }

        match tok.kind {
            Tok::RawString => {
                let quoted = quote_raw(tok.lit);
                self.emit(&quoted);
            }
            kind if kind.is_operator() => self.emit(kind.as_str()),
            _ => self.emit(tok.lit),
        }
        self.prev = Some(tok.kind);
        self.error.is_none()
    }

    fn terminator(&mut self, inside_header: bool) {
        if self.prev == Some(Tok::KwFor) && self.pending.is_none() {
            self.for_semis = (self.for_semis + 1).min(2);
            return;
        }
        match self.pending {
            None => self.pending = Some(Separator::Terminator),
            // `for init; ; post`: the empty condition needs both.
            Some(Separator::Terminator) if inside_header => self.emit(";"),
            Some(_) => {}
        }
    }

    /// Write held-back separators. Returns whether anything was written.
    fn flush_separators(&mut self) -> bool {
        let mut wrote = false;
        for _ in 0..std::mem::take(&mut self.for_semis) {
            self.emit(";");
            wrote = true;
        }
        if let Some(sep) = self.pending.take() {
            self.emit(sep.as_str());
            wrote = true;
        }
        wrote
    }

    fn advance_pragma(&mut self, kind: Tok) {
        self.pragma = match (self.pragma, kind) {
            (PragmaPhase::AwaitingKeyword, Tok::KwPackage) => PragmaPhase::AwaitingName,
            (PragmaPhase::AwaitingKeyword, _) => PragmaPhase::AwaitingKeyword,
            (PragmaPhase::AwaitingName, Tok::Ident) => {
                PragmaPhase::AwaitingComment { terminators: 0 }
            }
            (PragmaPhase::AwaitingComment { terminators: 0 }, Tok::Semi) => {
                PragmaPhase::AwaitingComment { terminators: 1 }
            }
            _ => PragmaPhase::Disabled,
        };
    }

    fn comment(&mut self, text: &str) {
        if !matches!(self.pragma, PragmaPhase::AwaitingComment { .. }) {
            return;
        }
        self.pragma = PragmaPhase::Disabled;

        let Some(pragma) = import_path_pragma(text) else {
            return;
        };
        if pragma.contains("*/") {
            debug!(%pragma, "import path cannot be re-commented, dropped");
            return;
        }
        trace!(%pragma, "import path pragma");
        self.flush_separators();
        self.emit("/*");
        self.emit(&pragma);
        self.emit("*/");
        self.prev = Some(Tok::Comment);
    }

    fn emit(&mut self, s: &str) {
        if self.error.is_some() {
            return;
        }
        match self.sink.write_all(s.as_bytes()) {
            Ok(()) => self.written += s.len(),
            Err(err) => {
                debug!(%err, written = self.written, "sink write failed");
                self.error = Some(CompactError::Io(err));
            }
        }
    }
}

impl<W: io::Write> TokenObserver for Compactor<W> {
    #[inline]
    fn observe(&mut self, tok: &Token<'_>) -> bool {
        self.write_token(tok)
    }
}

/// Compact `src` into `sink`; returns the number of bytes written.
pub fn compact<W: io::Write>(
    src: &[u8],
    options: CompactOptions,
    sink: W,
) -> Result<usize, CompactError> {
    let mut c = Compactor::new(sink, options);
    let n = c.compact(src)?;
    c.finish()?;
    Ok(n)
}

pub fn compact_to_vec(src: &[u8], options: CompactOptions) -> Result<Vec<u8>, CompactError> {
    let mut c = Compactor::new(Vec::with_capacity(src.len()), options);
    c.compact(src)?;
    c.finish()
}

pub fn compact_str(src: &str, options: CompactOptions) -> Result<String, CompactError> {
    let bytes = compact_to_vec(src.as_bytes(), options)?;
    String::from_utf8(bytes).map_err(|e| CompactError::Lexical {
        pos: e.utf8_error().valid_up_to(),
        message: "invalid UTF-8 encoding".to_string(),
    })
}
