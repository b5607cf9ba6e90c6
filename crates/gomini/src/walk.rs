use std::fmt::Write;

use crate::stack::ensure_sufficient_stack;
use crate::syntax::{NodeRef, SyntaxTree};

/// What a [`Visitor`] wants after entering a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    SkipChildren,
    Stop,
}

pub trait Visitor<'t> {
    #[inline(always)]
    fn enter(&mut self, _node: NodeRef<'t>) -> Flow {
        Flow::Continue
    }

    /// Called after the children of a node that was entered with `Continue`.
    #[inline(always)]
    fn leave(&mut self, _node: NodeRef<'t>) {}
}

/// Pre-order walk from `node`, doc comments skipped.
/// Returns [`Flow::Stop`] if the visitor stopped early.
pub fn walk<'t, V: Visitor<'t> + ?Sized>(node: NodeRef<'t>, v: &mut V) -> Flow {
    ensure_sufficient_stack(|| match v.enter(node) {
        Flow::Stop => Flow::Stop,
        Flow::SkipChildren => Flow::Continue,
        Flow::Continue => {
            for child in node.children() {
                if walk(child, v) == Flow::Stop {
                    return Flow::Stop;
                }
            }
            v.leave(node);
            Flow::Continue
        }
    })
}

/// Render the tree as an S-expression, one parenthesized form per node.
pub fn dump(tree: &SyntaxTree) -> String {
    struct Dumper {
        out: String,
    }

    impl<'t> Visitor<'t> for Dumper {
        fn enter(&mut self, node: NodeRef<'t>) -> Flow {
            if !self.out.is_empty() {
                self.out.push(' ');
            }
            let _ = write!(self.out, "({}", node.describe());
            Flow::Continue
        }

        fn leave(&mut self, _node: NodeRef<'t>) {
            self.out.push(')');
        }
    }

    let mut d = Dumper { out: String::new() };
    walk(tree.root(), &mut d);
    d.out
}
