//! Structural equivalence of two syntax trees.
//!
//! Both trees are walked in lock step, comments skipped. Nodes match when
//! their kinds match and, for the kinds that carry one, their discriminating
//! data matches; spans and other formatting details never matter.

use std::fmt;
use std::mem::discriminant;

use tracing::debug;

use crate::literal::{import_path_pragma, normalize_string};
use crate::stack::ensure_sufficient_stack;
use crate::syntax::{BasicLitKind, NodeKind, NodeRef, SyntaxTree};

/// Offset assumed for a missing pragma comment; anything `>= 2` disqualifies.
const NO_COMMENT_OFFSET: u32 = 10;

/// First pair of nodes that differ, `(None, None)` if the trees are
/// equivalent. One side is `None` when the other has an unmatched child.
///
/// If either input is absent, both inputs are returned unchanged.
pub fn diff<'a, 'b>(
    a: Option<NodeRef<'a>>,
    b: Option<NodeRef<'b>>,
) -> (Option<NodeRef<'a>>, Option<NodeRef<'b>>) {
    match (a, b) {
        (Some(x), Some(y)) => match diff_nodes(x, y) {
            Some(pair) => {
                debug!(left = ?pair.0, right = ?pair.1, "trees diverge");
                pair
            }
            None => (None, None),
        },
        inputs => inputs,
    }
}

/// `diff(a, b) == (None, None)`. Note `compare(None, None)` is `true`.
pub fn compare(a: Option<NodeRef<'_>>, b: Option<NodeRef<'_>>) -> bool {
    matches!(diff(a, b), (None, None))
}

/// The divergence between two whole trees, if any.
pub fn divergence<'a, 'b>(a: &'a SyntaxTree, b: &'b SyntaxTree) -> Option<Divergence<'a, 'b>> {
    match diff(Some(a.root()), Some(b.root())) {
        (None, None) => None,
        (left, right) => Some(Divergence { left, right }),
    }
}

/// A reportable pair of differing nodes.
#[derive(Debug, Clone, Copy)]
pub struct Divergence<'a, 'b> {
    pub left: Option<NodeRef<'a>>,
    pub right: Option<NodeRef<'b>>,
}

impl fmt::Display for Divergence<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn side(f: &mut fmt::Formatter<'_>, n: Option<NodeRef<'_>>) -> fmt::Result {
            match n {
                Some(n) => write!(f, "({}) at {}", n.describe(), n.span()),
                None => f.write_str("nothing"),
            }
        }
        side(f, self.left)?;
        f.write_str(" vs ")?;
        side(f, self.right)
    }
}

type Pair<'a, 'b> = (Option<NodeRef<'a>>, Option<NodeRef<'b>>);

fn diff_nodes<'a, 'b>(a: NodeRef<'a>, b: NodeRef<'b>) -> Option<Pair<'a, 'b>> {
    ensure_sufficient_stack(|| {
        if !same_node(a, b) {
            return Some((Some(a), Some(b)));
        }
        let mut ac = a.children();
        let mut bc = b.children();
        loop {
            match (ac.next(), bc.next()) {
                (None, None) => return None,
                (Some(x), Some(y)) => {
                    if let Some(pair) = diff_nodes(x, y) {
                        return Some(pair);
                    }
                }
                unmatched => return Some(unmatched),
            }
        }
    })
}

fn same_node(a: NodeRef<'_>, b: NodeRef<'_>) -> bool {
    let (ka, kb) = (a.kind(), b.kind());
    if discriminant(&ka) != discriminant(&kb) {
        return false;
    }

    match (ka, kb) {
        (NodeKind::AssignStmt(x), NodeKind::AssignStmt(y)) => x == y,
        (NodeKind::BasicLit { kind: x, .. }, NodeKind::BasicLit { kind: y, .. }) => {
            x == y && same_literal(x, a.text().unwrap_or(""), b.text().unwrap_or(""))
        }
        (NodeKind::BinaryExpr(x), NodeKind::BinaryExpr(y)) => x == y,
        (NodeKind::UnaryExpr(x), NodeKind::UnaryExpr(y)) => x == y,
        (NodeKind::IncDecStmt(x), NodeKind::IncDecStmt(y)) => x == y,
        (NodeKind::BranchStmt(x), NodeKind::BranchStmt(y)) => x == y,
        (NodeKind::CallExpr { ellipsis: x }, NodeKind::CallExpr { ellipsis: y }) => x == y,
        (NodeKind::ChanType(x), NodeKind::ChanType(y)) => x == y,
        (NodeKind::GenDecl(x), NodeKind::GenDecl(y)) => x == y,
        (NodeKind::RangeStmt(x), NodeKind::RangeStmt(y)) => x == y,
        (NodeKind::Ident(_), NodeKind::Ident(_)) | (NodeKind::Package(_), NodeKind::Package(_)) => {
            a.text() == b.text()
        }
        (
            NodeKind::InterfaceType { incomplete: x },
            NodeKind::InterfaceType { incomplete: y },
        )
        | (NodeKind::StructType { incomplete: x }, NodeKind::StructType { incomplete: y }) => {
            !(x || y)
        }
        (NodeKind::File { .. }, NodeKind::File { .. }) => same_pragma(a, b),
        _ => true,
    }
}

fn same_literal(kind: BasicLitKind, x: &str, y: &str) -> bool {
    if x == y {
        return true;
    }
    if kind != BasicLitKind::String || x.as_bytes().first() == y.as_bytes().first() {
        return false;
    }
    normalize_string(x) == normalize_string(y)
}

/// The first comment starting at or after the end of the package name, as
/// `(distance from the name, text)`.
fn pragma_comment<'t>(file: NodeRef<'t>) -> Option<(u32, &'t str)> {
    let NodeKind::File { name_end, comments } = file.kind() else {
        return None;
    };
    let tree = file.tree();
    tree.comment_list(comments).iter().find_map(|&c| {
        let start = tree.comment_span(c).start;
        (start >= name_end).then(|| (start - name_end, tree.comment_text(c)))
    })
}

fn same_pragma(a: NodeRef<'_>, b: NodeRef<'_>) -> bool {
    let (ca, cb) = (pragma_comment(a), pragma_comment(b));
    if ca.is_none() && cb.is_none() {
        return true;
    }

    let path = |c: Option<(u32, &str)>| c.and_then(|(_, text)| import_path_pragma(text));
    let offset = |c: Option<(u32, &str)>| c.map_or(NO_COMMENT_OFFSET, |(off, _)| off);

    let (pa, pb) = (path(ca), path(cb));
    if pa != pb {
        return false;
    }
    if pa.is_none() {
        return true;
    }
    offset(ca) < 2 && offset(cb) < 2
}
