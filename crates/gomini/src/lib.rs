//! Go source compaction with equivalence and minimality checks.
//!
//! - [`compact`] rewrites formatted Go into the shortest single line that
//!   tokenizes to the same program.
//! - [`compare`] diffs two syntax trees modulo comments.
//! - [`examine`] confirms a compacted buffer has no removable byte left.
//!
//! The lexer (Logos + Go semicolon insertion) and a recursive-descent parser
//! back all three.

pub mod compact;
pub mod compare;
pub mod error;
pub mod examine;
pub mod header;
pub mod lexer;
pub mod literal;
pub mod parser;
pub mod stack;
pub mod syntax;
pub mod walk;

use thiserror::Error;
use tracing::debug;

pub use compact::{compact, compact_str, compact_to_vec, CompactOptions, Compactor};
pub use compare::{compare, diff, divergence, Divergence};
pub use error::{CompactError, MinimalityViolation, ParseFailure, Span, ViolationReason};
pub use examine::examine;
pub use lexer::{Lexer, Tok, Token, TokenObserver};
pub use parser::{parse_file, parse_package};
pub use syntax::{NodeKind, NodeRef, SyntaxTree, TreeBuilder};

/// Which stage of [`verify_round_trip`] rejected the input.
#[derive(Debug, Error)]
pub enum RoundTripError {
    #[error("compact: {0}")]
    Compact(#[from] CompactError),

    #[error("not minimal: {0}")]
    NotMinimal(#[from] MinimalityViolation),

    #[error("parse original: {0}")]
    ParseOriginal(#[source] ParseFailure),

    #[error("parse compacted: {0}")]
    ParseCompacted(#[source] ParseFailure),

    /// The compacted form parses to a different program.
    #[error("trees differ: {0}")]
    Diverged(String),
}

/// Compact `src`, then check the result is minimal and parses to a tree
/// equivalent to the original. Returns the compacted bytes.
pub fn verify_round_trip(src: &str, options: CompactOptions) -> Result<Vec<u8>, RoundTripError> {
    let out = compact_to_vec(src.as_bytes(), options)?;
    examine(&out)?;

    let original = parse_file(src).map_err(RoundTripError::ParseOriginal)?;
    // compaction only ever writes UTF-8 when the input was UTF-8
    let text = String::from_utf8_lossy(&out);
    let compacted = parse_file(&text).map_err(RoundTripError::ParseCompacted)?;

    if let Some(d) = divergence(&original, &compacted) {
        debug!(%d, "round trip diverged");
        return Err(RoundTripError::Diverged(d.to_string()));
    }
    Ok(out)
}
