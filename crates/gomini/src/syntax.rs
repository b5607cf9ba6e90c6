//! # Go syntax trees
//!
//! A uniform, arena-allocated tree shaped after Go's own `go/ast`: every node
//! has a [`NodeKind`], a byte [`Span`] and an ordered child list. Children are
//! stored in the order `go/ast.Inspect` visits them, which is what the
//! equivalence checker walks.
//!
//! ## Layout
//!
//! - **Nodes** live in a [`SpannedArena`]; spans sit in a parallel side table.
//! - **Children** are [`ListRef`]s into one shared buffer, no per-node `Vec`.
//! - **Names and literal text** are interned as [`Symbol`]s.
//! - **Comments** are kept twice: as a flat, source-ordered list on the file
//!   node (for pragma lookup) and as `CommentGroup`/`Comment` nodes attached
//!   as doc comments. Walks skip the latter.

use core::marker::PhantomData;
use core::ops::{Index, IndexMut};
use std::collections::HashMap;
use std::fmt;
use std::hash::{BuildHasher, BuildHasherDefault, Hasher, RandomState};

use smallvec::SmallVec;

pub use crate::error::Span;

// =============================================================================
// Core Foundation Types
// =============================================================================

/// Type-safe identifier for arena-allocated items.
#[derive(Debug, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Id<T> {
    raw: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Copy for Id<T> {}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Id<T> {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self {
            raw,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub const fn to_usize(&self) -> usize {
        self.raw as usize
    }

    #[inline]
    pub const fn raw(&self) -> u32 {
        self.raw
    }
}

/// Typed reference into a centralized list buffer.
#[derive(Debug, PartialEq, Eq)]
pub struct ListRef<T> {
    start: u32,
    len: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Copy for ListRef<T> {}

impl<T> Clone for ListRef<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Default for ListRef<T> {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl<T> ListRef<T> {
    pub const EMPTY: Self = Self {
        start: 0,
        len: 0,
        _marker: PhantomData,
    };

    #[inline]
    pub const fn new(start: u32, len: u32) -> Self {
        Self {
            start,
            len,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub const fn len(&self) -> u32 {
        self.len
    }

    #[inline]
    fn range(&self) -> core::ops::Range<usize> {
        self.start as usize..(self.start + self.len) as usize
    }
}

#[inline]
fn push_list<T>(buf: &mut Vec<T>, items: impl IntoIterator<Item = T>) -> ListRef<T> {
    let start = buf.len();
    buf.extend(items);
    let len = buf.len() - start;
    debug_assert!(start <= u32::MAX as usize);
    debug_assert!(len <= u32::MAX as usize);
    ListRef::new(start as u32, len as u32)
}

// =============================================================================
// Symbol Interning
// =============================================================================

/// Interned string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Symbol(u32);

impl Symbol {
    #[inline]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

/// Identity hasher for pre-hashed `u64` keys.
#[derive(Default)]
struct U64IdentityHasher(u64);

impl Hasher for U64IdentityHasher {
    fn write(&mut self, bytes: &[u8]) {
        // Only `write_u64` is used; fold anything else in rather than panic.
        for &b in bytes {
            self.0 = self.0.rotate_left(8) ^ u64::from(b);
        }
    }

    #[inline]
    fn write_u64(&mut self, i: u64) {
        self.0 = i;
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }
}

type U64IdentityBuild = BuildHasherDefault<U64IdentityHasher>;

/// String interner. Each distinct string is stored once.
#[derive(Debug, Default)]
pub struct Interner {
    strings: Vec<Box<str>>,
    buckets: HashMap<u64, SmallVec<[Symbol; 1]>, U64IdentityBuild>,
    state: RandomState,
}

impl Interner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn intern(&mut self, s: &str) -> Symbol {
        let h = self.state.hash_one(s);
        let entry = self.buckets.entry(h).or_default();

        for &sym in entry.iter() {
            if self.strings[sym.0 as usize].as_ref() == s {
                return sym;
            }
        }

        let sym = Symbol(self.strings.len() as u32);
        self.strings.push(s.into());
        entry.push(sym);
        sym
    }

    /// # Panics
    /// Panics on a symbol from a different interner.
    #[inline]
    pub fn resolve(&self, sym: Symbol) -> &str {
        &self.strings[sym.0 as usize]
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

// =============================================================================
// Arena Allocation
// =============================================================================

/// Arena for items with associated spans, stored in parallel vectors.
#[derive(Debug)]
pub struct SpannedArena<T> {
    data: Vec<T>,
    spans: Vec<Span>,
}

impl<T> Default for SpannedArena<T> {
    fn default() -> Self {
        Self {
            data: Vec::new(),
            spans: Vec::new(),
        }
    }
}

impl<T> SpannedArena<T> {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc(&mut self, item: T, span: Span) -> Id<T> {
        let id = Id::from_raw(self.data.len() as u32);
        self.data.push(item);
        self.spans.push(span);
        id
    }

    #[inline]
    pub fn get(&self, id: Id<T>) -> &T {
        &self.data[id.to_usize()]
    }

    #[inline]
    pub fn get_mut(&mut self, id: Id<T>) -> &mut T {
        &mut self.data[id.to_usize()]
    }

    #[inline]
    pub fn span(&self, id: Id<T>) -> Span {
        self.spans[id.to_usize()]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<T> Index<Id<T>> for SpannedArena<T> {
    type Output = T;
    fn index(&self, id: Id<T>) -> &T {
        self.get(id)
    }
}

impl<T> IndexMut<Id<T>> for SpannedArena<T> {
    fn index_mut(&mut self, id: Id<T>) -> &mut T {
        self.get_mut(id)
    }
}

pub type NodeId = Id<Node>;
pub type CommentId = Id<Comment>;

// =============================================================================
// Node kinds
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicLitKind {
    Int,
    Float,
    Imag,
    Char,
    String,
}

impl BasicLitKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Int => "INT",
            Self::Float => "FLOAT",
            Self::Imag => "IMAG",
            Self::Char => "CHAR",
            Self::String => "STRING",
        }
    }
}

macro_rules! op_enum {
    ($(#[$m:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$m])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

op_enum!(
    /// Binary operators, including `|` joining union terms in constraints.
    BinaryOp {
        LOr => "||",
        LAnd => "&&",
        Eq => "==",
        Ne => "!=",
        Lt => "<",
        Le => "<=",
        Gt => ">",
        Ge => ">=",
        Add => "+",
        Sub => "-",
        Or => "|",
        Xor => "^",
        Mul => "*",
        Quo => "/",
        Rem => "%",
        Shl => "<<",
        Shr => ">>",
        And => "&",
        AndNot => "&^",
    }
);

op_enum!(UnaryOp {
    Add => "+",
    Sub => "-",
    Not => "!",
    Xor => "^",
    And => "&",
    Recv => "<-",
    Tilde => "~",
});

op_enum!(AssignOp {
    Assign => "=",
    Define => ":=",
    Add => "+=",
    Sub => "-=",
    Mul => "*=",
    Quo => "/=",
    Rem => "%=",
    And => "&=",
    Or => "|=",
    Xor => "^=",
    Shl => "<<=",
    Shr => ">>=",
    AndNot => "&^=",
});

op_enum!(IncDecOp {
    Inc => "++",
    Dec => "--",
});

op_enum!(BranchKind {
    Break => "break",
    Continue => "continue",
    Goto => "goto",
    Fallthrough => "fallthrough",
});

op_enum!(GenDeclKind {
    Import => "import",
    Const => "const",
    Type => "type",
    Var => "var",
});

op_enum!(
    /// Token between the range variables and `range`; `None` for `for range x`.
    RangeTok {
        None => "",
        Define => ":=",
        Assign => "=",
    }
);

op_enum!(ChanDir {
    Both => "chan",
    Send => "chan<-",
    Recv => "<-chan",
});

/// What a node is, plus the data that distinguishes nodes of the same shape.
///
/// Child order per kind (optional children are simply absent):
///
/// | kind | children |
/// |------|----------|
/// | `File` | doc, package name, decls |
/// | `FuncDecl` | doc, recv, name, type, body |
/// | `GenDecl` | doc, specs |
/// | `ImportSpec` | doc, name, path |
/// | `ValueSpec` | doc, names, type, values |
/// | `TypeSpec` | doc, name, type params, type |
/// | `Field` | doc, names, type, tag |
/// | `FuncType` | type params, params, results |
/// | `IfStmt` | init, cond, body, else |
/// | `ForStmt` | init, cond, post, body |
/// | `RangeStmt` | key, value, x, body |
/// | `SwitchStmt` | init, tag, body |
/// | `TypeSwitchStmt` | init, assign, body |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Comment(CommentId),
    CommentGroup,
    Field,
    FieldList,

    Ident(Symbol),
    Ellipsis,
    BasicLit { kind: BasicLitKind, value: Symbol },
    FuncLit,
    CompositeLit,
    ParenExpr,
    SelectorExpr,
    IndexExpr,
    IndexListExpr,
    SliceExpr { slice3: bool },
    TypeAssertExpr,
    CallExpr { ellipsis: bool },
    StarExpr,
    UnaryExpr(UnaryOp),
    BinaryExpr(BinaryOp),
    KeyValueExpr,

    ArrayType,
    StructType { incomplete: bool },
    FuncType,
    InterfaceType { incomplete: bool },
    MapType,
    ChanType(ChanDir),

    DeclStmt,
    EmptyStmt,
    LabeledStmt,
    ExprStmt,
    SendStmt,
    IncDecStmt(IncDecOp),
    AssignStmt(AssignOp),
    GoStmt,
    DeferStmt,
    ReturnStmt,
    BranchStmt(BranchKind),
    BlockStmt,
    IfStmt,
    CaseClause,
    SwitchStmt,
    TypeSwitchStmt,
    CommClause,
    SelectStmt,
    ForStmt,
    RangeStmt(RangeTok),

    ImportSpec,
    ValueSpec,
    TypeSpec,
    GenDecl(GenDeclKind),
    FuncDecl,

    /// `name_end` is the offset just past the package name.
    File {
        name_end: u32,
        comments: ListRef<CommentId>,
    },
    Package(Symbol),
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Comment(_) => "Comment",
            Self::CommentGroup => "CommentGroup",
            Self::Field => "Field",
            Self::FieldList => "FieldList",
            Self::Ident(_) => "Ident",
            Self::Ellipsis => "Ellipsis",
            Self::BasicLit { .. } => "BasicLit",
            Self::FuncLit => "FuncLit",
            Self::CompositeLit => "CompositeLit",
            Self::ParenExpr => "ParenExpr",
            Self::SelectorExpr => "SelectorExpr",
            Self::IndexExpr => "IndexExpr",
            Self::IndexListExpr => "IndexListExpr",
            Self::SliceExpr { .. } => "SliceExpr",
            Self::TypeAssertExpr => "TypeAssertExpr",
            Self::CallExpr { .. } => "CallExpr",
            Self::StarExpr => "StarExpr",
            Self::UnaryExpr(_) => "UnaryExpr",
            Self::BinaryExpr(_) => "BinaryExpr",
            Self::KeyValueExpr => "KeyValueExpr",
            Self::ArrayType => "ArrayType",
            Self::StructType { .. } => "StructType",
            Self::FuncType => "FuncType",
            Self::InterfaceType { .. } => "InterfaceType",
            Self::MapType => "MapType",
            Self::ChanType(_) => "ChanType",
            Self::DeclStmt => "DeclStmt",
            Self::EmptyStmt => "EmptyStmt",
            Self::LabeledStmt => "LabeledStmt",
            Self::ExprStmt => "ExprStmt",
            Self::SendStmt => "SendStmt",
            Self::IncDecStmt(_) => "IncDecStmt",
            Self::AssignStmt(_) => "AssignStmt",
            Self::GoStmt => "GoStmt",
            Self::DeferStmt => "DeferStmt",
            Self::ReturnStmt => "ReturnStmt",
            Self::BranchStmt(_) => "BranchStmt",
            Self::BlockStmt => "BlockStmt",
            Self::IfStmt => "IfStmt",
            Self::CaseClause => "CaseClause",
            Self::SwitchStmt => "SwitchStmt",
            Self::TypeSwitchStmt => "TypeSwitchStmt",
            Self::CommClause => "CommClause",
            Self::SelectStmt => "SelectStmt",
            Self::ForStmt => "ForStmt",
            Self::RangeStmt(_) => "RangeStmt",
            Self::ImportSpec => "ImportSpec",
            Self::ValueSpec => "ValueSpec",
            Self::TypeSpec => "TypeSpec",
            Self::GenDecl(_) => "GenDecl",
            Self::FuncDecl => "FuncDecl",
            Self::File { .. } => "File",
            Self::Package(_) => "Package",
        }
    }

    /// Comment nodes hang off declarations as docs; tree walks skip them.
    #[inline]
    pub fn is_comment(&self) -> bool {
        matches!(self, Self::Comment(_) | Self::CommentGroup)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Node {
    pub kind: NodeKind,
    children: ListRef<NodeId>,
}

/// One `//` or `/* */` comment, text included delimiters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comment {
    pub text: Symbol,
}

// =============================================================================
// Tree
// =============================================================================

/// An immutable parsed tree. Build one with [`TreeBuilder`] or the parser.
#[derive(Debug)]
pub struct SyntaxTree {
    nodes: SpannedArena<Node>,
    child_buf: Vec<NodeId>,
    comments: SpannedArena<Comment>,
    comment_buf: Vec<CommentId>,
    interner: Interner,
    root: NodeId,
}

impl SyntaxTree {
    #[inline]
    pub fn root(&self) -> NodeRef<'_> {
        self.node(self.root)
    }

    #[inline]
    pub fn node(&self, id: NodeId) -> NodeRef<'_> {
        NodeRef { tree: self, id }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[inline]
    pub fn resolve(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    pub fn comment_text(&self, id: CommentId) -> &str {
        self.resolve(self.comments[id].text)
    }

    pub fn comment_span(&self, id: CommentId) -> Span {
        self.comments.span(id)
    }

    pub fn comment_list(&self, list: ListRef<CommentId>) -> &[CommentId] {
        &self.comment_buf[list.range()]
    }

    fn children_of(&self, id: NodeId) -> &[NodeId] {
        &self.child_buf[self.nodes[id].children.range()]
    }
}

/// A node together with the tree it lives in.
#[derive(Clone, Copy)]
pub struct NodeRef<'t> {
    tree: &'t SyntaxTree,
    id: NodeId,
}

impl PartialEq for NodeRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self.tree, other.tree) && self.id == other.id
    }
}

impl Eq for NodeRef<'_> {}

impl fmt::Debug for NodeRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.describe(), self.span())
    }
}

impl<'t> NodeRef<'t> {
    #[inline]
    pub fn id(&self) -> NodeId {
        self.id
    }

    #[inline]
    pub fn tree(&self) -> &'t SyntaxTree {
        self.tree
    }

    #[inline]
    pub fn kind(&self) -> NodeKind {
        self.tree.nodes[self.id].kind
    }

    #[inline]
    pub fn span(&self) -> Span {
        self.tree.nodes.span(self.id)
    }

    /// All children in walk order, comment groups included.
    pub fn all_children(&self) -> impl Iterator<Item = NodeRef<'t>> + 't {
        let tree = self.tree;
        tree.children_of(self.id)
            .iter()
            .map(move |&id| NodeRef { tree, id })
    }

    /// Children in walk order, without doc comments.
    pub fn children(&self) -> impl Iterator<Item = NodeRef<'t>> + 't {
        self.all_children().filter(|c| !c.kind().is_comment())
    }

    /// The identifier name, literal text or comment text, if any.
    pub fn text(&self) -> Option<&'t str> {
        match self.kind() {
            NodeKind::Ident(sym) | NodeKind::Package(sym) => Some(self.tree.resolve(sym)),
            NodeKind::BasicLit { value, .. } => Some(self.tree.resolve(value)),
            NodeKind::Comment(c) => Some(self.tree.comment_text(c)),
            _ => None,
        }
    }

    /// Kind name plus the attributes that tell nodes of that kind apart,
    /// e.g. `Ident x`, `BasicLit INT 1`, `BinaryExpr +`.
    pub fn describe(&self) -> String {
        let kind = self.kind();
        let name = kind.name();
        let attr: Option<std::borrow::Cow<'_, str>> = match kind {
            NodeKind::Ident(_) | NodeKind::Package(_) | NodeKind::Comment(_) => {
                self.text().map(Into::into)
            }
            NodeKind::BasicLit { kind, value } => {
                Some(format!("{} {}", kind.as_str(), self.tree.resolve(value)).into())
            }
            NodeKind::UnaryExpr(op) => Some(op.as_str().into()),
            NodeKind::BinaryExpr(op) => Some(op.as_str().into()),
            NodeKind::AssignStmt(op) => Some(op.as_str().into()),
            NodeKind::IncDecStmt(op) => Some(op.as_str().into()),
            NodeKind::BranchStmt(k) => Some(k.as_str().into()),
            NodeKind::GenDecl(k) => Some(k.as_str().into()),
            NodeKind::ChanType(d) => Some(d.as_str().into()),
            NodeKind::RangeStmt(RangeTok::None) => None,
            NodeKind::RangeStmt(t) => Some(t.as_str().into()),
            NodeKind::CallExpr { ellipsis: true } => Some("...".into()),
            NodeKind::SliceExpr { slice3: true } => Some("3".into()),
            NodeKind::StructType { incomplete: true }
            | NodeKind::InterfaceType { incomplete: true } => Some("incomplete".into()),
            _ => None,
        };
        match attr {
            Some(a) => format!("{name} {a}"),
            None => name.to_string(),
        }
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Incrementally allocates nodes; children must exist before their parent.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: SpannedArena<Node>,
    child_buf: Vec<NodeId>,
    comments: SpannedArena<Comment>,
    comment_buf: Vec<CommentId>,
    interner: Interner,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn intern(&mut self, s: &str) -> Symbol {
        self.interner.intern(s)
    }

    pub fn node(&mut self, kind: NodeKind, span: Span, children: &[NodeId]) -> NodeId {
        let children = push_list(&mut self.child_buf, children.iter().copied());
        self.nodes.alloc(Node { kind, children }, span)
    }

    pub fn ident(&mut self, name: &str, span: Span) -> NodeId {
        let sym = self.intern(name);
        self.node(NodeKind::Ident(sym), span, &[])
    }

    pub fn comment(&mut self, text: &str, span: Span) -> CommentId {
        let text = self.intern(text);
        self.comments.alloc(Comment { text }, span)
    }

    pub fn comment_list(&mut self, ids: impl IntoIterator<Item = CommentId>) -> ListRef<CommentId> {
        push_list(&mut self.comment_buf, ids)
    }

    #[inline]
    pub fn comment_span(&self, id: CommentId) -> Span {
        self.comments.span(id)
    }

    #[inline]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.nodes[id].kind
    }

    #[inline]
    pub fn set_kind(&mut self, id: NodeId, kind: NodeKind) {
        self.nodes[id].kind = kind;
    }

    #[inline]
    pub fn span(&self, id: NodeId) -> Span {
        self.nodes.span(id)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.child_buf[self.nodes[id].children.range()]
    }

    pub fn resolve(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    /// Freeze the builder into a tree rooted at `root`.
    pub fn finish(self, root: NodeId) -> SyntaxTree {
        SyntaxTree {
            nodes: self.nodes,
            child_buf: self.child_buf,
            comments: self.comments,
            comment_buf: self.comment_buf,
            interner: self.interner,
            root,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interner_dedups() {
        let mut i = Interner::new();
        let a = i.intern("main");
        let b = i.intern("fmt");
        assert_eq!(i.intern("main"), a);
        assert_ne!(a, b);
        assert_eq!(i.resolve(b), "fmt");
        assert_eq!(i.len(), 2);
    }

    #[test]
    fn builder_keeps_child_order() {
        let mut b = TreeBuilder::new();
        let x = b.ident("x", Span::new(0, 1));
        let one = {
            let value = b.intern("1");
            b.node(
                NodeKind::BasicLit {
                    kind: BasicLitKind::Int,
                    value,
                },
                Span::new(4, 5),
                &[],
            )
        };
        let sum = b.node(NodeKind::BinaryExpr(BinaryOp::Add), Span::new(0, 5), &[x, one]);
        let tree = b.finish(sum);

        let root = tree.root();
        assert_eq!(root.describe(), "BinaryExpr +");
        let kids: Vec<_> = root.children().map(|c| c.describe()).collect();
        assert_eq!(kids, ["Ident x", "BasicLit INT 1"]);
    }
}
