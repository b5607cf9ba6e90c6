//! Recursive-descent parser for Go source files.
//!
//! The whole file is tokenized up front; comments are split off into a side
//! table and grouped so declarations can pick up their doc comments. The
//! parser stops at the first error.

use std::collections::HashMap;

use memchr::memchr_iter;
use smallvec::{smallvec, SmallVec};
use tracing::{debug, trace};

use crate::error::{Diag, ParseFailure, Span};
use crate::lexer::{Lexer, Tok, Token};
use crate::stack::ensure_sufficient_stack;
use crate::syntax::{
    AssignOp, BasicLitKind, BinaryOp, BranchKind, ChanDir, CommentId, GenDeclKind, IncDecOp,
    NodeId, NodeKind, RangeTok, Symbol, SyntaxTree, TreeBuilder, UnaryOp,
};

type PResult<T> = Result<T, Diag>;
type Nodes = SmallVec<[NodeId; 4]>;

/// Parse one Go source file.
pub fn parse_file(src: &str) -> Result<SyntaxTree, ParseFailure> {
    let mut b = TreeBuilder::new();
    let (file, _) = parse_into(&mut b, src)?;
    Ok(b.finish(file))
}

/// Parse the files of one package, given as `(name, source)` pairs, into a
/// tree rooted at a `Package` node.
pub fn parse_package(files: &[(&str, &str)]) -> Result<SyntaxTree, ParseFailure> {
    let mut b = TreeBuilder::new();
    let mut kids = Vec::with_capacity(files.len());
    let mut package: Option<(Symbol, &str)> = None;
    let mut span = Span::default();

    for &(name, src) in files {
        let (file, pkg) = parse_into(&mut b, src).map_err(|mut failure| {
            for d in &mut failure.diags {
                d.message = format!("{name}: {}", d.message);
            }
            failure
        })?;

        match package {
            None => package = Some((pkg, name)),
            Some((first, first_file)) if first != pkg => {
                let msg = format!(
                    "{name}: package {}; expected package {} (from {first_file})",
                    b.resolve(pkg),
                    b.resolve(first),
                );
                return Err(ParseFailure::single(Diag::parse(b.span(file), msg)));
            }
            Some(_) => {}
        }
        span = span.to(b.span(file));
        kids.push(file);
    }

    let pkg = match package {
        Some((sym, _)) => sym,
        None => b.intern(""),
    };
    let root = b.node(NodeKind::Package(pkg), span, &kids);
    Ok(b.finish(root))
}

fn parse_into(b: &mut TreeBuilder, src: &str) -> Result<(NodeId, Symbol), ParseFailure> {
    let mut lexer = Lexer::with_comments(src);
    let mut toks = Vec::with_capacity(src.len() / 4);
    let mut comments = Vec::new();
    for tok in lexer.by_ref() {
        if tok.kind == Tok::Comment {
            comments.push(tok);
        } else {
            toks.push(tok);
        }
    }
    if lexer.error_count() > 0 {
        let diags = lexer.take_diags();
        debug!(errors = diags.len(), "lexical errors, not parsing");
        return Err(ParseFailure { diags });
    }

    let mut p = Parser::new(src, b, toks, &comments);
    p.parse_file().map_err(|diag| {
        debug!(%diag, "parse failed");
        ParseFailure::single(diag)
    })
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum StmtMode {
    Basic,
    LabelOk,
    RangeOk,
}

/// Result of a simple statement. Bare expressions stay unwrapped so `if`,
/// `for` and `switch` headers can use them as conditions or tags.
enum Simple {
    Expr(NodeId),
    Stmt(NodeId),
    Range {
        lhs: Nodes,
        tok: RangeTok,
        x: NodeId,
    },
}

/// Parameter list entry before names and types are told apart.
enum Param {
    /// A lone identifier: a name or a type, depending on its neighbours.
    Bare(NodeId),
    Named(NodeId, NodeId),
    Type(NodeId),
}

struct Parser<'src, 'b> {
    b: &'b mut TreeBuilder,
    toks: Vec<Token<'src>>,
    pos: usize,
    prev_end: usize,
    expr_lev: i32,
    comment_ids: Vec<CommentId>,
    /// Doc comment group by index of the token it precedes.
    leads: HashMap<usize, SmallVec<[CommentId; 2]>>,
}

impl<'src, 'b> Parser<'src, 'b> {
    fn new(
        src: &'src str,
        b: &'b mut TreeBuilder,
        toks: Vec<Token<'src>>,
        comments: &[Token<'src>],
    ) -> Self {
        let newlines: Vec<usize> = memchr_iter(b'\n', src.as_bytes()).collect();
        let line = |off: usize| newlines.partition_point(|&nl| nl < off);

        let comment_ids: Vec<CommentId> =
            comments.iter().map(|c| b.comment(c.lit, c.span())).collect();

        // Group comments the way go/parser does: a group sharing the line of
        // the previous token is a line comment; the last group ending on the
        // line right before the next token is that token's lead comment.
        let mut leads = HashMap::new();
        let mut ci = 0;
        for (ti, tok) in toks.iter().enumerate() {
            let run_start = ci;
            while ci < comments.len() && comments[ci].pos < tok.pos {
                ci += 1;
            }
            if run_start == ci {
                continue;
            }
            let run = run_start..ci;
            let prev_line = ti.checked_sub(1).map(|i| line(toks[i].pos));

            let mut k = run.start;
            if prev_line == Some(line(comments[k].pos)) {
                let mut end_line = line(comments[k].end);
                k += 1;
                while k < run.end && line(comments[k].pos) <= end_line {
                    end_line = line(comments[k].end);
                    k += 1;
                }
            }

            let mut last: Option<(usize, usize, usize)> = None;
            while k < run.end {
                let first = k;
                let mut end_line = line(comments[k].end);
                k += 1;
                while k < run.end && line(comments[k].pos) <= end_line + 1 {
                    end_line = line(comments[k].end);
                    k += 1;
                }
                last = Some((first, k, end_line));
            }

            if let Some((first, end, end_line)) = last {
                if end_line + 1 == line(tok.pos) {
                    leads.insert(ti, comment_ids[first..end].iter().copied().collect());
                }
            }
        }
        trace!(tokens = toks.len(), comments = comments.len(), leads = leads.len(), "tokenized");

        Self {
            b,
            toks,
            pos: 0,
            prev_end: 0,
            expr_lev: 0,
            comment_ids,
            leads,
        }
    }

    // =========================================================================
    // Token cursor
    // =========================================================================

    #[inline]
    fn cur(&self) -> Token<'src> {
        // The stream always ends in Eof and the cursor never moves past it.
        self.toks[self.pos.min(self.toks.len() - 1)]
    }

    #[inline]
    fn tok(&self) -> Tok {
        self.cur().kind
    }

    #[inline]
    fn peek(&self, n: usize) -> Tok {
        self.toks
            .get(self.pos + n)
            .map_or(Tok::Eof, |t| t.kind)
    }

    #[inline]
    fn start(&self) -> usize {
        self.cur().pos
    }

    fn next(&mut self) -> Token<'src> {
        let t = self.cur();
        if t.kind != Tok::Eof {
            self.pos += 1;
            if !t.is_injected() {
                self.prev_end = t.end;
            }
        }
        t
    }

    fn got(&mut self, kind: Tok) -> bool {
        if self.tok() == kind {
            self.next();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: Tok) -> PResult<Token<'src>> {
        if self.tok() == kind {
            Ok(self.next())
        } else {
            Err(self.error_expected(&format!("'{}'", kind.as_str())))
        }
    }

    /// `;` or a closing `)`/`}` that lets the semicolon be omitted.
    fn expect_semi(&mut self) -> PResult<()> {
        match self.tok() {
            Tok::RParen | Tok::RBrace => Ok(()),
            Tok::Semi => {
                self.next();
                Ok(())
            }
            _ => Err(self.error_expected("';'")),
        }
    }

    fn error_expected(&self, what: &str) -> Diag {
        let t = self.cur();
        let found = match t.kind {
            Tok::Semi if t.is_injected() => "newline".to_string(),
            Tok::Eof => "EOF".to_string(),
            k if k.is_literal() => t.lit.to_string(),
            k => format!("'{}'", k.as_str()),
        };
        Diag::parse(t.span(), format!("expected {what}, found {found}"))
    }

    #[inline]
    fn finish(&mut self, kind: NodeKind, start: usize, children: &[NodeId]) -> NodeId {
        let end = self.prev_end.max(start);
        self.b.node(kind, Span::new(start, end), children)
    }

    fn take_lead(&mut self) -> Option<NodeId> {
        let group = self.leads.remove(&self.pos)?;
        let mut kids: Nodes = SmallVec::with_capacity(group.len());
        let mut span: Option<Span> = None;
        for cid in group {
            let s = self.b.comment_span(cid);
            span = Some(span.map_or(s, |acc| acc.to(s)));
            kids.push(self.b.node(NodeKind::Comment(cid), s, &[]));
        }
        let span = span.unwrap_or_default();
        Some(self.b.node(NodeKind::CommentGroup, span, &kids))
    }

    // =========================================================================
    // File and declarations
    // =========================================================================

    fn parse_file(&mut self) -> PResult<(NodeId, Symbol)> {
        let start = self.start();
        let mut kids: Vec<NodeId> = Vec::new();
        kids.extend(self.take_lead());

        self.expect(Tok::KwPackage)?;
        let name = self.parse_ident()?;
        let name_end = self.b.span(name).end;
        let pkg = match self.b.kind(name) {
            NodeKind::Ident(sym) => sym,
            _ => self.b.intern(""),
        };
        if self.b.resolve(pkg) == "_" {
            return Err(Diag::parse(self.b.span(name), "invalid package name _"));
        }
        kids.push(name);
        self.expect_semi()?;

        while self.tok() != Tok::Eof {
            let decl = self.parse_decl()?;
            kids.push(decl);
        }

        let comments = self.b.comment_list(self.comment_ids.iter().copied());
        let span_end = self.cur().pos;
        let file = self.b.node(
            NodeKind::File { name_end, comments },
            Span::new(start.min(span_end), span_end),
            &kids,
        );
        Ok((file, pkg))
    }

    fn parse_decl(&mut self) -> PResult<NodeId> {
        match self.tok() {
            Tok::KwImport => self.parse_gen_decl(GenDeclKind::Import),
            Tok::KwConst => self.parse_gen_decl(GenDeclKind::Const),
            Tok::KwType => self.parse_gen_decl(GenDeclKind::Type),
            Tok::KwVar => self.parse_gen_decl(GenDeclKind::Var),
            Tok::KwFunc => self.parse_func_decl(),
            _ => Err(self.error_expected("declaration")),
        }
    }

    fn parse_gen_decl(&mut self, kind: GenDeclKind) -> PResult<NodeId> {
        let doc = self.take_lead();
        let start = self.start();
        self.next();

        let mut kids: Vec<NodeId> = Vec::new();
        kids.extend(doc);
        if self.got(Tok::LParen) {
            while self.tok() != Tok::RParen && self.tok() != Tok::Eof {
                let doc = self.take_lead();
                let spec = self.parse_spec(kind, doc)?;
                kids.push(spec);
            }
            self.expect(Tok::RParen)?;
            self.expect_semi()?;
        } else {
            let spec = self.parse_spec(kind, None)?;
            kids.push(spec);
        }
        Ok(self.finish(NodeKind::GenDecl(kind), start, &kids))
    }

    fn parse_spec(&mut self, kind: GenDeclKind, doc: Option<NodeId>) -> PResult<NodeId> {
        match kind {
            GenDeclKind::Import => self.parse_import_spec(doc),
            GenDeclKind::Type => self.parse_type_spec(doc),
            GenDeclKind::Const | GenDeclKind::Var => self.parse_value_spec(kind, doc),
        }
    }

    fn parse_import_spec(&mut self, doc: Option<NodeId>) -> PResult<NodeId> {
        let start = self.start();
        let mut kids: Nodes = doc.into_iter().collect();
        match self.tok() {
            Tok::Ident => kids.push(self.parse_ident()?),
            Tok::Dot => {
                let t = self.next();
                kids.push(self.b.ident(".", t.span()));
            }
            _ => {}
        }
        if !self.tok().is_string() {
            return Err(self.error_expected("import path"));
        }
        kids.push(self.parse_basic_lit());
        self.expect_semi()?;
        Ok(self.finish(NodeKind::ImportSpec, start, &kids))
    }

    fn parse_value_spec(&mut self, kind: GenDeclKind, doc: Option<NodeId>) -> PResult<NodeId> {
        let start = self.start();
        let mut kids: Nodes = doc.into_iter().collect();
        kids.extend(self.parse_ident_list()?);

        match kind {
            GenDeclKind::Const => {
                if !matches!(self.tok(), Tok::Eof | Tok::Semi | Tok::RParen) {
                    if self.tok() != Tok::Assign {
                        kids.push(self.parse_type()?);
                    }
                    if self.got(Tok::Assign) {
                        kids.extend(self.parse_expr_list()?);
                    }
                }
            }
            _ => {
                if self.tok() != Tok::Assign {
                    kids.push(self.parse_type()?);
                }
                if self.got(Tok::Assign) {
                    kids.extend(self.parse_expr_list()?);
                }
            }
        }
        self.expect_semi()?;
        Ok(self.finish(NodeKind::ValueSpec, start, &kids))
    }

    fn parse_type_spec(&mut self, doc: Option<NodeId>) -> PResult<NodeId> {
        let start = self.start();
        let mut kids: Nodes = doc.into_iter().collect();
        let name = self.parse_ident()?;
        kids.push(name);

        if self.tok() == Tok::LBrack && self.type_params_ahead() {
            kids.push(self.parse_param_list(Tok::LBrack, Tok::RBrack, true)?);
        }

        self.got(Tok::Assign);
        kids.push(self.parse_type()?);
        self.expect_semi()?;
        Ok(self.finish(NodeKind::TypeSpec, start, &kids))
    }

    /// At `[` after a type name: does a type parameter list follow, or an
    /// array length? `[N]T`, `[a.b]T`, `[N*M]T` and `[int(n)]T` are arrays;
    /// `[P any]`, `[P ~int]` and `[P *C,]` are parameter lists.
    fn type_params_ahead(&self) -> bool {
        if self.peek(1) != Tok::Ident {
            return false;
        }
        match self.peek(2) {
            Tok::Ident
            | Tok::LBrack
            | Tok::Comma
            | Tok::Tilde
            | Tok::Arrow
            | Tok::KwInterface
            | Tok::KwStruct
            | Tok::KwFunc
            | Tok::KwMap
            | Tok::KwChan => true,
            Tok::Star => {
                if self.peek(3) != Tok::Ident {
                    return true;
                }
                // `[P *C]` is an array of length P*C unless a comma follows.
                let mut depth = 0usize;
                for t in &self.toks[self.pos + 1..] {
                    match t.kind {
                        Tok::LParen | Tok::LBrack | Tok::LBrace => depth += 1,
                        Tok::RParen | Tok::RBrace => depth = depth.saturating_sub(1),
                        Tok::RBrack if depth == 0 => return false,
                        Tok::RBrack => depth -= 1,
                        Tok::Comma if depth == 0 => return true,
                        Tok::Semi | Tok::Eof => return false,
                        _ => {}
                    }
                }
                false
            }
            _ => false,
        }
    }

    fn parse_func_decl(&mut self) -> PResult<NodeId> {
        let doc = self.take_lead();
        let start = self.start();
        self.expect(Tok::KwFunc)?;

        let mut kids: Nodes = doc.into_iter().collect();
        if self.tok() == Tok::LParen {
            kids.push(self.parse_param_list(Tok::LParen, Tok::RParen, false)?);
        }
        kids.push(self.parse_ident()?);

        let mut sig: Nodes = SmallVec::new();
        if self.tok() == Tok::LBrack {
            sig.push(self.parse_param_list(Tok::LBrack, Tok::RBrack, true)?);
        }
        sig.extend(self.parse_signature()?);
        let ftype = self.finish(NodeKind::FuncType, start, &sig);
        kids.push(ftype);

        if self.tok() == Tok::LBrace {
            let lev = std::mem::replace(&mut self.expr_lev, 0);
            let body = self.parse_block();
            self.expr_lev = lev;
            kids.push(body?);
        }
        self.expect_semi()?;
        Ok(self.finish(NodeKind::FuncDecl, start, &kids))
    }

    // =========================================================================
    // Signatures and parameters
    // =========================================================================

    /// Parameters and optional results.
    fn parse_signature(&mut self) -> PResult<Nodes> {
        let mut out: Nodes = smallvec![self.parse_param_list(Tok::LParen, Tok::RParen, false)?];
        if self.tok() == Tok::LParen {
            out.push(self.parse_param_list(Tok::LParen, Tok::RParen, false)?);
        } else if self.at_type_start() {
            let start = self.start();
            let t = self.parse_type()?;
            let field = self.finish(NodeKind::Field, start, &[t]);
            out.push(self.finish(NodeKind::FieldList, start, &[field]));
        }
        Ok(out)
    }

    fn parse_param_list(&mut self, open: Tok, close: Tok, type_params: bool) -> PResult<NodeId> {
        let start = self.start();
        self.expect(open)?;
        let mut entries: Vec<(usize, Param)> = Vec::new();
        while self.tok() != close && self.tok() != Tok::Eof {
            let entry_start = self.start();
            entries.push((entry_start, self.parse_param(type_params)?));
            if !self.got(Tok::Comma) {
                break;
            }
        }
        self.expect(close)?;
        if type_params && entries.is_empty() {
            return Err(Diag::parse(
                Span::new(start, self.prev_end),
                "empty type parameter list",
            ));
        }

        let fields = self.resolve_params(entries, type_params)?;
        Ok(self.finish(NodeKind::FieldList, start, &fields))
    }

    fn parse_param(&mut self, type_params: bool) -> PResult<Param> {
        let start = self.start();
        match self.tok() {
            Tok::Ident => {
                let name = self.parse_ident()?;
                match self.tok() {
                    Tok::Comma | Tok::RParen | Tok::RBrack => Ok(Param::Bare(name)),
                    Tok::Dot => {
                        let t = self.parse_qualified(name, start)?;
                        let t = self.parse_type_args_opt(t, start)?;
                        Ok(Param::Type(t))
                    }
                    Tok::LBrack if !type_params => {
                        let (name, t) = self.parse_array_field_or_instance(name, start)?;
                        Ok(match name {
                            Some(name) => Param::Named(name, t),
                            None => Param::Type(t),
                        })
                    }
                    Tok::Ellipsis => {
                        let t = self.parse_variadic()?;
                        Ok(Param::Named(name, t))
                    }
                    _ if type_params => Ok(Param::Named(name, self.parse_type_elem()?)),
                    _ => Ok(Param::Named(name, self.parse_type()?)),
                }
            }
            Tok::Ellipsis => Ok(Param::Type(self.parse_variadic()?)),
            _ if type_params => Ok(Param::Type(self.parse_type_elem()?)),
            _ => Ok(Param::Type(self.parse_type()?)),
        }
    }

    fn parse_variadic(&mut self) -> PResult<NodeId> {
        let start = self.start();
        self.expect(Tok::Ellipsis)?;
        let elt = self.parse_type()?;
        Ok(self.finish(NodeKind::Ellipsis, start, &[elt]))
    }

    /// Either every entry is a type, or names are grouped with the type that
    /// follows them: `(a, b int, c string)`.
    fn resolve_params(&mut self, entries: Vec<(usize, Param)>, type_params: bool) -> PResult<Nodes> {
        let named = type_params || entries.iter().any(|(_, p)| matches!(p, Param::Named(..)));
        let mut fields: Nodes = SmallVec::new();

        if !named {
            for (start, p) in entries {
                let t = match p {
                    Param::Bare(t) | Param::Type(t) | Param::Named(_, t) => t,
                };
                fields.push(self.field_at(start, &[t]));
            }
            return Ok(fields);
        }

        let mut pending: Nodes = SmallVec::new();
        let mut pending_start = None;
        for (start, p) in entries {
            match p {
                Param::Bare(name) => {
                    pending_start.get_or_insert(start);
                    pending.push(name);
                }
                Param::Named(name, t) => {
                    let field_start = pending_start.take().unwrap_or(start);
                    pending.push(name);
                    pending.push(t);
                    let field = self.field_span(field_start, self.b.span(t).end, &pending);
                    fields.push(field);
                    pending.clear();
                }
                Param::Type(t) => {
                    return Err(Diag::parse(
                        self.b.span(t),
                        "mixed named and unnamed parameters",
                    ));
                }
            }
        }
        if let Some(&last) = pending.last() {
            let msg = if type_params {
                "missing type constraint"
            } else {
                "mixed named and unnamed parameters"
            };
            return Err(Diag::parse(self.b.span(last), msg));
        }
        Ok(fields)
    }

    fn field_at(&mut self, start: usize, kids: &[NodeId]) -> NodeId {
        let end = kids.last().map_or(start, |&k| self.b.span(k).end as usize);
        self.field_span(start, end as u32, kids)
    }

    fn field_span(&mut self, start: usize, end: u32, kids: &[NodeId]) -> NodeId {
        self.b
            .node(NodeKind::Field, Span::new(start, end as usize), kids)
    }

    /// After `name [`: an array or slice field (`a [4]int`, `a []int`) or a
    /// generic instance (`List[T]`). Returns the name only in the first case.
    fn parse_array_field_or_instance(
        &mut self,
        name: NodeId,
        start: usize,
    ) -> PResult<(Option<NodeId>, NodeId)> {
        let lbrack = self.start();
        self.expect(Tok::LBrack)?;
        if self.got(Tok::RBrack) {
            let elt = self.parse_type()?;
            let t = self.finish(NodeKind::ArrayType, lbrack, &[elt]);
            return Ok((Some(name), t));
        }

        let mut args: Nodes = SmallVec::new();
        self.expr_lev += 1;
        let first = if self.tok() == Tok::Ellipsis {
            let s = self.start();
            self.next();
            Ok(self.finish(NodeKind::Ellipsis, s, &[]))
        } else {
            self.parse_type_or_expr()
        };
        let first = first.and_then(|a| {
            args.push(a);
            while self.got(Tok::Comma) {
                if self.tok() == Tok::RBrack {
                    break;
                }
                args.push(self.parse_type()?);
            }
            Ok(())
        });
        self.expr_lev -= 1;
        first?;
        self.expect(Tok::RBrack)?;

        if args.len() == 1 && self.at_type_start() {
            let elt = self.parse_type()?;
            let t = self.finish(NodeKind::ArrayType, lbrack, &[args[0], elt]);
            return Ok((Some(name), t));
        }
        Ok((None, self.instance(name, start, &args)))
    }

    fn instance(&mut self, x: NodeId, start: usize, args: &[NodeId]) -> NodeId {
        let mut kids: Nodes = smallvec![x];
        kids.extend_from_slice(args);
        let kind = if args.len() == 1 {
            NodeKind::IndexExpr
        } else {
            NodeKind::IndexListExpr
        };
        self.finish(kind, start, &kids)
    }

    // =========================================================================
    // Types
    // =========================================================================

    fn at_type_start(&self) -> bool {
        matches!(
            self.tok(),
            Tok::Ident
                | Tok::LBrack
                | Tok::KwStruct
                | Tok::Star
                | Tok::KwFunc
                | Tok::KwInterface
                | Tok::KwMap
                | Tok::KwChan
                | Tok::LParen
                | Tok::Arrow
        )
    }

    fn parse_type(&mut self) -> PResult<NodeId> {
        ensure_sufficient_stack(|| self.parse_type_inner())
    }

    fn parse_type_inner(&mut self) -> PResult<NodeId> {
        let start = self.start();
        match self.tok() {
            Tok::Ident => {
                let name = self.parse_ident()?;
                let t = if self.tok() == Tok::Dot {
                    self.parse_qualified(name, start)?
                } else {
                    name
                };
                self.parse_type_args_opt(t, start)
            }
            Tok::LBrack => {
                self.next();
                let mut kids: Nodes = SmallVec::new();
                if self.tok() == Tok::Ellipsis {
                    let s = self.start();
                    self.next();
                    kids.push(self.finish(NodeKind::Ellipsis, s, &[]));
                } else if self.tok() != Tok::RBrack {
                    self.expr_lev += 1;
                    let len = self.parse_expr();
                    self.expr_lev -= 1;
                    kids.push(len?);
                }
                self.expect(Tok::RBrack)?;
                kids.push(self.parse_type()?);
                Ok(self.finish(NodeKind::ArrayType, start, &kids))
            }
            Tok::KwStruct => self.parse_struct_type(),
            Tok::Star => {
                self.next();
                let elt = self.parse_type()?;
                Ok(self.finish(NodeKind::StarExpr, start, &[elt]))
            }
            Tok::KwFunc => {
                self.next();
                let sig = self.parse_signature()?;
                Ok(self.finish(NodeKind::FuncType, start, &sig))
            }
            Tok::KwInterface => self.parse_interface_type(),
            Tok::KwMap => {
                self.next();
                self.expect(Tok::LBrack)?;
                let key = self.parse_type()?;
                self.expect(Tok::RBrack)?;
                let value = self.parse_type()?;
                Ok(self.finish(NodeKind::MapType, start, &[key, value]))
            }
            Tok::KwChan => {
                self.next();
                let dir = if self.got(Tok::Arrow) {
                    ChanDir::Send
                } else {
                    ChanDir::Both
                };
                let elt = self.parse_type()?;
                Ok(self.finish(NodeKind::ChanType(dir), start, &[elt]))
            }
            Tok::Arrow => {
                self.next();
                self.expect(Tok::KwChan)?;
                let elt = self.parse_type()?;
                Ok(self.finish(NodeKind::ChanType(ChanDir::Recv), start, &[elt]))
            }
            Tok::LParen => {
                self.next();
                let t = self.parse_type()?;
                self.expect(Tok::RParen)?;
                Ok(self.finish(NodeKind::ParenExpr, start, &[t]))
            }
            _ => Err(self.error_expected("type")),
        }
    }

    fn parse_qualified(&mut self, x: NodeId, start: usize) -> PResult<NodeId> {
        self.expect(Tok::Dot)?;
        let sel = self.parse_ident()?;
        Ok(self.finish(NodeKind::SelectorExpr, start, &[x, sel]))
    }

    fn parse_type_args_opt(&mut self, t: NodeId, start: usize) -> PResult<NodeId> {
        if self.tok() != Tok::LBrack {
            return Ok(t);
        }
        self.next();
        self.expr_lev += 1;
        let mut args: Nodes = SmallVec::new();
        let res = (|| {
            while self.tok() != Tok::RBrack && self.tok() != Tok::Eof {
                args.push(self.parse_type()?);
                if !self.got(Tok::Comma) {
                    break;
                }
            }
            Ok::<_, Diag>(())
        })();
        self.expr_lev -= 1;
        res?;
        self.expect(Tok::RBrack)?;
        if args.is_empty() {
            return Err(Diag::parse(
                Span::new(start, self.prev_end),
                "expected type argument list",
            ));
        }
        Ok(self.instance(t, start, &args))
    }

    /// A constraint term or union: `~int | string`.
    fn parse_type_elem(&mut self) -> PResult<NodeId> {
        let start = self.start();
        let mut x = self.parse_type_term()?;
        while self.got(Tok::Pipe) {
            let y = self.parse_type_term()?;
            x = self.finish(NodeKind::BinaryExpr(BinaryOp::Or), start, &[x, y]);
        }
        Ok(x)
    }

    fn parse_type_term(&mut self) -> PResult<NodeId> {
        let start = self.start();
        if self.got(Tok::Tilde) {
            let t = self.parse_type()?;
            return Ok(self.finish(NodeKind::UnaryExpr(UnaryOp::Tilde), start, &[t]));
        }
        self.parse_type()
    }

    fn parse_struct_type(&mut self) -> PResult<NodeId> {
        let start = self.start();
        self.expect(Tok::KwStruct)?;
        let list_start = self.start();
        self.expect(Tok::LBrace)?;
        let mut fields: Nodes = SmallVec::new();
        while matches!(self.tok(), Tok::Ident | Tok::Star | Tok::LParen) {
            fields.push(self.parse_field_decl()?);
        }
        self.expect(Tok::RBrace)?;
        let list = self.finish(NodeKind::FieldList, list_start, &fields);
        Ok(self.finish(NodeKind::StructType { incomplete: false }, start, &[list]))
    }

    fn parse_field_decl(&mut self) -> PResult<NodeId> {
        let doc = self.take_lead();
        let start = self.start();
        let mut kids: Nodes = doc.into_iter().collect();

        match self.tok() {
            Tok::Ident => {
                let name = self.parse_ident()?;
                match self.tok() {
                    Tok::Dot | Tok::String | Tok::RawString | Tok::Semi | Tok::RBrace => {
                        // embedded type
                        let t = if self.tok() == Tok::Dot {
                            self.parse_qualified(name, start)?
                        } else {
                            name
                        };
                        kids.push(self.parse_type_args_opt(t, start)?);
                    }
                    Tok::LBrack => {
                        let (name, t) = self.parse_array_field_or_instance(name, start)?;
                        kids.extend(name);
                        kids.push(t);
                    }
                    _ => {
                        kids.push(name);
                        while self.got(Tok::Comma) {
                            kids.push(self.parse_ident()?);
                        }
                        kids.push(self.parse_type()?);
                    }
                }
            }
            Tok::Star => {
                self.next();
                let name_start = self.start();
                let name = self.parse_ident()?;
                let t = if self.tok() == Tok::Dot {
                    self.parse_qualified(name, name_start)?
                } else {
                    name
                };
                let t = self.parse_type_args_opt(t, name_start)?;
                kids.push(self.finish(NodeKind::StarExpr, start, &[t]));
            }
            _ => return Err(self.error_expected("field name or embedded type")),
        }

        if self.tok().is_string() {
            kids.push(self.parse_basic_lit());
        }
        self.expect_semi()?;
        Ok(self.finish(NodeKind::Field, start, &kids))
    }

    fn parse_interface_type(&mut self) -> PResult<NodeId> {
        let start = self.start();
        self.expect(Tok::KwInterface)?;
        let list_start = self.start();
        self.expect(Tok::LBrace)?;
        let mut fields: Nodes = SmallVec::new();
        loop {
            let doc = self.take_lead();
            let field_start = self.start();
            let mut kids: Nodes = doc.into_iter().collect();
            match self.tok() {
                Tok::Ident if self.peek(1) == Tok::LParen => {
                    kids.push(self.parse_ident()?);
                    let sig_start = self.start();
                    let sig = self.parse_signature()?;
                    kids.push(self.finish(NodeKind::FuncType, sig_start, &sig));
                }
                Tok::Tilde => kids.push(self.parse_type_elem()?),
                _ if self.at_type_start() => kids.push(self.parse_type_elem()?),
                _ => break,
            }
            self.expect_semi()?;
            fields.push(self.finish(NodeKind::Field, field_start, &kids));
        }
        self.expect(Tok::RBrace)?;
        let list = self.finish(NodeKind::FieldList, list_start, &fields);
        Ok(self.finish(NodeKind::InterfaceType { incomplete: false }, start, &[list]))
    }

    // =========================================================================
    // Expressions
    // =========================================================================

    fn parse_ident(&mut self) -> PResult<NodeId> {
        let t = self.expect(Tok::Ident)?;
        Ok(self.b.ident(t.lit, t.span()))
    }

    fn parse_ident_list(&mut self) -> PResult<Nodes> {
        let mut out: Nodes = smallvec![self.parse_ident()?];
        while self.got(Tok::Comma) {
            out.push(self.parse_ident()?);
        }
        Ok(out)
    }

    fn parse_basic_lit(&mut self) -> NodeId {
        let t = self.next();
        let kind = match t.kind {
            Tok::Int => BasicLitKind::Int,
            Tok::Float => BasicLitKind::Float,
            Tok::Imag => BasicLitKind::Imag,
            Tok::Rune => BasicLitKind::Char,
            _ => BasicLitKind::String,
        };
        let value = self.b.intern(t.lit);
        self.b.node(NodeKind::BasicLit { kind, value }, t.span(), &[])
    }

    fn parse_expr_list(&mut self) -> PResult<Nodes> {
        let mut out: Nodes = smallvec![self.parse_expr()?];
        while self.got(Tok::Comma) {
            out.push(self.parse_expr()?);
        }
        Ok(out)
    }

    fn parse_expr(&mut self) -> PResult<NodeId> {
        ensure_sufficient_stack(|| self.parse_binary_expr(1))
    }

    /// Expressions where a type is also acceptable (call arguments, index
    /// operands). Types already parse as operands, so this is `parse_expr`.
    #[inline]
    fn parse_type_or_expr(&mut self) -> PResult<NodeId> {
        self.parse_expr()
    }

    fn parse_binary_expr(&mut self, prec1: u8) -> PResult<NodeId> {
        let start = self.start();
        let mut x = self.parse_unary_expr()?;
        loop {
            let Some((op, prec)) = binary_op(self.tok()) else {
                return Ok(x);
            };
            if prec < prec1 {
                return Ok(x);
            }
            self.next();
            let y = ensure_sufficient_stack(|| self.parse_binary_expr(prec + 1))?;
            x = self.finish(NodeKind::BinaryExpr(op), start, &[x, y]);
        }
    }

    fn parse_unary_expr(&mut self) -> PResult<NodeId> {
        ensure_sufficient_stack(|| self.parse_unary_expr_inner())
    }

    fn parse_unary_expr_inner(&mut self) -> PResult<NodeId> {
        let start = self.start();
        let op = match self.tok() {
            Tok::Plus => Some(UnaryOp::Add),
            Tok::Minus => Some(UnaryOp::Sub),
            Tok::Bang => Some(UnaryOp::Not),
            Tok::Caret => Some(UnaryOp::Xor),
            Tok::Amp => Some(UnaryOp::And),
            Tok::Tilde => Some(UnaryOp::Tilde),
            _ => None,
        };
        if let Some(op) = op {
            self.next();
            let x = self.parse_unary_expr()?;
            return Ok(self.finish(NodeKind::UnaryExpr(op), start, &[x]));
        }

        match self.tok() {
            Tok::Arrow => {
                self.next();
                if self.tok() == Tok::KwChan {
                    // `<-chan T` as an operand
                    let t = self.parse_type()?;
                    if let NodeKind::ChanType(ChanDir::Both) = self.b.kind(t) {
                        self.b.set_kind(t, NodeKind::ChanType(ChanDir::Recv));
                    }
                    return Ok(t);
                }
                let x = self.parse_unary_expr()?;
                Ok(self.finish(NodeKind::UnaryExpr(UnaryOp::Recv), start, &[x]))
            }
            Tok::Star => {
                self.next();
                let x = self.parse_unary_expr()?;
                Ok(self.finish(NodeKind::StarExpr, start, &[x]))
            }
            _ => self.parse_primary_expr(None, start),
        }
    }

    fn parse_operand(&mut self) -> PResult<NodeId> {
        let start = self.start();
        match self.tok() {
            Tok::Ident => self.parse_ident(),
            Tok::Int | Tok::Float | Tok::Imag | Tok::Rune | Tok::String | Tok::RawString => {
                Ok(self.parse_basic_lit())
            }
            Tok::LParen => {
                self.next();
                self.expr_lev += 1;
                let x = self.parse_type_or_expr();
                self.expr_lev -= 1;
                let x = x?;
                self.expect(Tok::RParen)?;
                Ok(self.finish(NodeKind::ParenExpr, start, &[x]))
            }
            Tok::KwFunc => {
                self.next();
                let sig = self.parse_signature()?;
                let ftype = self.finish(NodeKind::FuncType, start, &sig);
                if self.tok() != Tok::LBrace {
                    return Ok(ftype);
                }
                self.expr_lev += 1;
                let body = self.parse_block();
                self.expr_lev -= 1;
                let body = body?;
                Ok(self.finish(NodeKind::FuncLit, start, &[ftype, body]))
            }
            Tok::LBrack | Tok::KwStruct | Tok::KwMap | Tok::KwChan | Tok::KwInterface => {
                self.parse_type()
            }
            _ => Err(self.error_expected("operand")),
        }
    }

    fn parse_primary_expr(&mut self, x: Option<NodeId>, start: usize) -> PResult<NodeId> {
        let mut x = match x {
            Some(x) => x,
            None => self.parse_operand()?,
        };
        loop {
            match self.tok() {
                Tok::Dot => {
                    self.next();
                    match self.tok() {
                        Tok::Ident => {
                            let sel = self.parse_ident()?;
                            x = self.finish(NodeKind::SelectorExpr, start, &[x, sel]);
                        }
                        Tok::LParen => {
                            self.next();
                            if self.got(Tok::KwType) {
                                self.expect(Tok::RParen)?;
                                x = self.finish(NodeKind::TypeAssertExpr, start, &[x]);
                            } else {
                                let t = self.parse_type()?;
                                self.expect(Tok::RParen)?;
                                x = self.finish(NodeKind::TypeAssertExpr, start, &[x, t]);
                            }
                        }
                        _ => return Err(self.error_expected("selector or type assertion")),
                    }
                }
                Tok::LBrack => x = self.parse_index_or_slice(x, start)?,
                Tok::LParen => x = self.parse_call(x, start)?,
                Tok::LBrace => {
                    if !self.is_literal_type(x) {
                        return Ok(x);
                    }
                    x = self.parse_literal_value(Some(x), start)?;
                }
                _ => return Ok(x),
            }
        }
    }

    /// Whether `{` after `x` opens a composite literal. Inside control clause
    /// headers (`expr_lev < 0`) only unambiguous literal types qualify.
    fn is_literal_type(&self, x: NodeId) -> bool {
        let mut t = x;
        while self.b.kind(t) == NodeKind::ParenExpr {
            match self.b.children(t).first() {
                Some(&inner) => t = inner,
                None => break,
            }
        }
        match self.b.kind(t) {
            NodeKind::Ident(_)
            | NodeKind::SelectorExpr
            | NodeKind::IndexExpr
            | NodeKind::IndexListExpr => self.expr_lev >= 0,
            NodeKind::ArrayType | NodeKind::StructType { .. } | NodeKind::MapType => true,
            _ => false,
        }
    }

    fn parse_index_or_slice(&mut self, x: NodeId, start: usize) -> PResult<NodeId> {
        self.expect(Tok::LBrack)?;
        if self.tok() == Tok::RBrack {
            return Err(self.error_expected("operand"));
        }
        self.expr_lev += 1;
        let res = self.parse_index_tail();
        self.expr_lev -= 1;
        let (index, ncolons, args) = res?;
        self.expect(Tok::RBrack)?;

        if ncolons > 0 {
            let mut kids: Nodes = smallvec![x];
            kids.extend(index.into_iter().flatten());
            return Ok(self.finish(NodeKind::SliceExpr { slice3: ncolons == 2 }, start, &kids));
        }
        if args.is_empty() {
            let mut kids: Nodes = smallvec![x];
            kids.extend(index[0]);
            return Ok(self.finish(NodeKind::IndexExpr, start, &kids));
        }
        Ok(self.instance(x, start, &args))
    }

    #[allow(clippy::type_complexity)]
    fn parse_index_tail(&mut self) -> PResult<([Option<NodeId>; 3], usize, Nodes)> {
        let mut index: [Option<NodeId>; 3] = [None; 3];
        let mut args: Nodes = SmallVec::new();
        let mut ncolons = 0;

        if self.tok() != Tok::Colon {
            index[0] = Some(self.parse_type_or_expr()?);
        }
        match self.tok() {
            Tok::Colon => {
                while self.tok() == Tok::Colon && ncolons < 2 {
                    ncolons += 1;
                    self.next();
                    if !matches!(self.tok(), Tok::Colon | Tok::RBrack | Tok::Eof) {
                        index[ncolons] = Some(self.parse_expr()?);
                    }
                }
                if ncolons == 2 && (index[1].is_none() || index[2].is_none()) {
                    return Err(Diag::parse(
                        self.cur().span(),
                        "middle and final index required in 3-index slice",
                    ));
                }
            }
            Tok::Comma => {
                args.extend(index[0]);
                while self.got(Tok::Comma) {
                    if matches!(self.tok(), Tok::RBrack | Tok::Eof) {
                        break;
                    }
                    args.push(self.parse_type()?);
                }
            }
            _ => {}
        }
        Ok((index, ncolons, args))
    }

    fn parse_call(&mut self, fun: NodeId, start: usize) -> PResult<NodeId> {
        self.expect(Tok::LParen)?;
        self.expr_lev += 1;
        let mut kids: Nodes = smallvec![fun];
        let mut ellipsis = false;
        let res = (|| {
            while self.tok() != Tok::RParen && self.tok() != Tok::Eof && !ellipsis {
                kids.push(self.parse_type_or_expr()?);
                ellipsis = self.got(Tok::Ellipsis);
                if !self.got(Tok::Comma) {
                    break;
                }
            }
            Ok::<_, Diag>(())
        })();
        self.expr_lev -= 1;
        res?;
        self.expect(Tok::RParen)?;
        Ok(self.finish(NodeKind::CallExpr { ellipsis }, start, &kids))
    }

    fn parse_literal_value(&mut self, typ: Option<NodeId>, start: usize) -> PResult<NodeId> {
        self.expect(Tok::LBrace)?;
        self.expr_lev += 1;
        let mut kids: Nodes = typ.into_iter().collect();
        let res = (|| {
            while self.tok() != Tok::RBrace && self.tok() != Tok::Eof {
                kids.push(self.parse_element()?);
                if !self.got(Tok::Comma) {
                    break;
                }
            }
            Ok::<_, Diag>(())
        })();
        self.expr_lev -= 1;
        res?;
        self.expect(Tok::RBrace)?;
        Ok(self.finish(NodeKind::CompositeLit, start, &kids))
    }

    fn parse_element(&mut self) -> PResult<NodeId> {
        let start = self.start();
        let x = self.parse_element_value()?;
        if self.got(Tok::Colon) {
            let y = self.parse_element_value()?;
            return Ok(self.finish(NodeKind::KeyValueExpr, start, &[x, y]));
        }
        Ok(x)
    }

    fn parse_element_value(&mut self) -> PResult<NodeId> {
        if self.tok() == Tok::LBrace {
            let start = self.start();
            return ensure_sufficient_stack(|| self.parse_literal_value(None, start));
        }
        self.parse_expr()
    }

    // =========================================================================
    // Statements
    // =========================================================================

    fn parse_block(&mut self) -> PResult<NodeId> {
        let start = self.start();
        self.expect(Tok::LBrace)?;
        let stmts = self.parse_stmt_list()?;
        self.expect(Tok::RBrace)?;
        Ok(self.finish(NodeKind::BlockStmt, start, &stmts))
    }

    fn parse_stmt_list(&mut self) -> PResult<Vec<NodeId>> {
        let mut out = Vec::new();
        while !matches!(
            self.tok(),
            Tok::KwCase | Tok::KwDefault | Tok::RBrace | Tok::Eof
        ) {
            out.push(self.parse_stmt()?);
        }
        Ok(out)
    }

    fn parse_stmt(&mut self) -> PResult<NodeId> {
        ensure_sufficient_stack(|| self.parse_stmt_inner())
    }

    fn parse_stmt_inner(&mut self) -> PResult<NodeId> {
        let start = self.start();
        match self.tok() {
            Tok::KwConst | Tok::KwType | Tok::KwVar => {
                let decl = self.parse_decl()?;
                Ok(self.finish(NodeKind::DeclStmt, start, &[decl]))
            }
            Tok::Ident
            | Tok::Int
            | Tok::Float
            | Tok::Imag
            | Tok::Rune
            | Tok::String
            | Tok::RawString
            | Tok::KwFunc
            | Tok::LParen
            | Tok::LBrack
            | Tok::KwStruct
            | Tok::KwMap
            | Tok::KwChan
            | Tok::KwInterface
            | Tok::Plus
            | Tok::Minus
            | Tok::Star
            | Tok::Amp
            | Tok::Caret
            | Tok::Arrow
            | Tok::Bang
            | Tok::Tilde => {
                let s = self.parse_simple_stmt(StmtMode::LabelOk)?;
                let s = self.into_stmt(s, start)?;
                if self.b.kind(s) != NodeKind::LabeledStmt {
                    self.expect_semi()?;
                }
                Ok(s)
            }
            Tok::KwGo | Tok::KwDefer => {
                let kind = if self.tok() == Tok::KwGo {
                    NodeKind::GoStmt
                } else {
                    NodeKind::DeferStmt
                };
                self.next();
                let call = self.parse_expr()?;
                if !matches!(self.b.kind(call), NodeKind::CallExpr { .. }) {
                    return Err(Diag::parse(
                        self.b.span(call),
                        "expression in go/defer must be function call",
                    ));
                }
                self.expect_semi()?;
                Ok(self.finish(kind, start, &[call]))
            }
            Tok::KwReturn => {
                self.next();
                let mut kids: Nodes = SmallVec::new();
                if !matches!(self.tok(), Tok::Semi | Tok::RBrace) {
                    kids = self.parse_expr_list()?;
                }
                self.expect_semi()?;
                Ok(self.finish(NodeKind::ReturnStmt, start, &kids))
            }
            Tok::KwBreak | Tok::KwContinue | Tok::KwGoto | Tok::KwFallthrough => {
                let kind = match self.next().kind {
                    Tok::KwBreak => BranchKind::Break,
                    Tok::KwContinue => BranchKind::Continue,
                    Tok::KwGoto => BranchKind::Goto,
                    _ => BranchKind::Fallthrough,
                };
                let mut kids: Nodes = SmallVec::new();
                if kind != BranchKind::Fallthrough && self.tok() == Tok::Ident {
                    kids.push(self.parse_ident()?);
                }
                self.expect_semi()?;
                Ok(self.finish(NodeKind::BranchStmt(kind), start, &kids))
            }
            Tok::LBrace => {
                let block = self.parse_block()?;
                self.expect_semi()?;
                Ok(block)
            }
            Tok::KwIf => self.parse_if_stmt(),
            Tok::KwSwitch => self.parse_switch_stmt(),
            Tok::KwSelect => self.parse_select_stmt(),
            Tok::KwFor => self.parse_for_stmt(),
            Tok::Semi => {
                let t = self.next();
                Ok(self.b.node(NodeKind::EmptyStmt, Span::empty_at(t.pos), &[]))
            }
            Tok::RBrace => Ok(self.b.node(NodeKind::EmptyStmt, Span::empty_at(start), &[])),
            _ => Err(self.error_expected("statement")),
        }
    }

    fn into_stmt(&mut self, s: Simple, start: usize) -> PResult<NodeId> {
        match s {
            Simple::Expr(x) => Ok(self.finish(NodeKind::ExprStmt, start, &[x])),
            Simple::Stmt(s) => Ok(s),
            Simple::Range { x, .. } => Err(Diag::parse(self.b.span(x), "unexpected range")),
        }
    }

    fn parse_simple_stmt(&mut self, mode: StmtMode) -> PResult<Simple> {
        let start = self.start();
        let lhs = self.parse_expr_list()?;

        let assign = match self.tok() {
            Tok::Define => Some(AssignOp::Define),
            Tok::Assign => Some(AssignOp::Assign),
            Tok::AddAssign => Some(AssignOp::Add),
            Tok::SubAssign => Some(AssignOp::Sub),
            Tok::MulAssign => Some(AssignOp::Mul),
            Tok::DivAssign => Some(AssignOp::Quo),
            Tok::ModAssign => Some(AssignOp::Rem),
            Tok::AndAssign => Some(AssignOp::And),
            Tok::OrAssign => Some(AssignOp::Or),
            Tok::XorAssign => Some(AssignOp::Xor),
            Tok::ShlAssign => Some(AssignOp::Shl),
            Tok::ShrAssign => Some(AssignOp::Shr),
            Tok::AndNotAssign => Some(AssignOp::AndNot),
            _ => None,
        };
        if let Some(op) = assign {
            self.next();
            if mode == StmtMode::RangeOk
                && self.tok() == Tok::KwRange
                && matches!(op, AssignOp::Define | AssignOp::Assign)
            {
                self.next();
                let x = self.parse_expr()?;
                let tok = if op == AssignOp::Define {
                    RangeTok::Define
                } else {
                    RangeTok::Assign
                };
                return Ok(Simple::Range { lhs, tok, x });
            }
            let rhs = self.parse_expr_list()?;
            let mut kids = lhs;
            kids.extend(rhs);
            return Ok(Simple::Stmt(self.finish(
                NodeKind::AssignStmt(op),
                start,
                &kids,
            )));
        }

        if lhs.len() > 1 {
            return Err(self.error_expected("1 expression"));
        }
        let x = lhs[0];

        match self.tok() {
            Tok::Colon
                if mode == StmtMode::LabelOk && matches!(self.b.kind(x), NodeKind::Ident(_)) =>
            {
                self.next();
                let stmt = self.parse_stmt()?;
                Ok(Simple::Stmt(self.finish(NodeKind::LabeledStmt, start, &[x, stmt])))
            }
            Tok::Arrow => {
                self.next();
                let y = self.parse_expr()?;
                Ok(Simple::Stmt(self.finish(NodeKind::SendStmt, start, &[x, y])))
            }
            Tok::Inc | Tok::Dec => {
                let op = if self.next().kind == Tok::Inc {
                    IncDecOp::Inc
                } else {
                    IncDecOp::Dec
                };
                Ok(Simple::Stmt(self.finish(NodeKind::IncDecStmt(op), start, &[x])))
            }
            _ => Ok(Simple::Expr(x)),
        }
    }

    fn expr_of(&self, s: Simple, what: &str) -> PResult<NodeId> {
        match s {
            Simple::Expr(x) => Ok(x),
            Simple::Stmt(s) => Err(Diag::parse(
                self.b.span(s),
                format!("expected {what}, found simple statement"),
            )),
            Simple::Range { x, .. } => Err(Diag::parse(self.b.span(x), "unexpected range")),
        }
    }

    fn parse_if_stmt(&mut self) -> PResult<NodeId> {
        let start = self.start();
        self.expect(Tok::KwIf)?;
        let mut kids: Nodes = self.parse_if_header()?;
        kids.push(self.parse_block()?);

        if self.got(Tok::KwElse) {
            match self.tok() {
                Tok::KwIf => kids.push(self.parse_if_stmt()?),
                Tok::LBrace => {
                    kids.push(self.parse_block()?);
                    self.expect_semi()?;
                }
                _ => return Err(self.error_expected("if statement or block")),
            }
        } else {
            self.expect_semi()?;
        }
        Ok(self.finish(NodeKind::IfStmt, start, &kids))
    }

    /// `[init;] cond`, returned as `[init?, cond]`.
    fn parse_if_header(&mut self) -> PResult<Nodes> {
        if self.tok() == Tok::LBrace {
            return Err(self.error_expected("condition"));
        }
        let lev = std::mem::replace(&mut self.expr_lev, -1);
        let res: PResult<Nodes> = (|| {
            let mut init = None;
            if self.tok() != Tok::Semi {
                let s_start = self.start();
                init = Some((self.parse_simple_stmt(StmtMode::Basic)?, s_start));
            }
            let cond = if self.tok() != Tok::LBrace {
                self.expect(Tok::Semi)?;
                if self.tok() == Tok::LBrace {
                    return Err(self.error_expected("condition"));
                }
                let s = self.parse_simple_stmt(StmtMode::Basic)?;
                self.expr_of(s, "boolean expression")?
            } else {
                let (s, _) = init
                    .take()
                    .ok_or_else(|| self.error_expected("condition"))?;
                self.expr_of(s, "boolean expression")?
            };

            let mut out: Nodes = SmallVec::new();
            if let Some((s, s_start)) = init {
                out.push(self.into_stmt(s, s_start)?);
            }
            out.push(cond);
            Ok(out)
        })();
        self.expr_lev = lev;
        res
    }

    fn parse_switch_stmt(&mut self) -> PResult<NodeId> {
        let start = self.start();
        self.expect(Tok::KwSwitch)?;

        let lev = std::mem::replace(&mut self.expr_lev, -1);
        let res = (|| {
            let mut s1: Option<(Simple, usize)> = None;
            let mut s2: Option<(Simple, usize)> = None;
            if self.tok() != Tok::LBrace {
                if self.tok() != Tok::Semi {
                    let s = self.start();
                    s2 = Some((self.parse_simple_stmt(StmtMode::Basic)?, s));
                }
                if self.got(Tok::Semi) {
                    s1 = s2.take();
                    if self.tok() != Tok::LBrace {
                        let s = self.start();
                        s2 = Some((self.parse_simple_stmt(StmtMode::Basic)?, s));
                    }
                }
            }
            Ok::<_, Diag>((s1, s2))
        })();
        self.expr_lev = lev;
        let (s1, s2) = res?;

        let type_switch = match &s2 {
            Some((Simple::Expr(x), _)) => self.is_type_guard(*x),
            Some((Simple::Stmt(s), _)) => {
                self.b.kind(*s) == NodeKind::AssignStmt(AssignOp::Define)
                    && self.b.children(*s).len() == 2
                    && self.is_type_guard(self.b.children(*s)[1])
            }
            _ => false,
        };

        let mut kids: Nodes = SmallVec::new();
        if let Some((s, s_start)) = s1 {
            kids.push(self.into_stmt(s, s_start)?);
        }
        if let Some((s, s_start)) = s2 {
            if type_switch {
                kids.push(self.into_stmt(s, s_start)?);
            } else {
                kids.push(self.expr_of(s, "switch expression")?);
            }
        }

        let body_start = self.start();
        self.expect(Tok::LBrace)?;
        let mut clauses: Vec<NodeId> = Vec::new();
        while matches!(self.tok(), Tok::KwCase | Tok::KwDefault) {
            clauses.push(self.parse_case_clause(type_switch)?);
        }
        self.expect(Tok::RBrace)?;
        self.expect_semi()?;
        kids.push(self.finish(NodeKind::BlockStmt, body_start, &clauses));

        let kind = if type_switch {
            NodeKind::TypeSwitchStmt
        } else {
            NodeKind::SwitchStmt
        };
        Ok(self.finish(kind, start, &kids))
    }

    fn is_type_guard(&self, x: NodeId) -> bool {
        self.b.kind(x) == NodeKind::TypeAssertExpr && self.b.children(x).len() == 1
    }

    fn parse_case_clause(&mut self, type_switch: bool) -> PResult<NodeId> {
        let start = self.start();
        let mut kids: Vec<NodeId> = Vec::new();
        if self.got(Tok::KwCase) {
            if type_switch {
                kids.push(self.parse_type()?);
                while self.got(Tok::Comma) {
                    kids.push(self.parse_type()?);
                }
            } else {
                kids.extend(self.parse_expr_list()?);
            }
        } else {
            self.expect(Tok::KwDefault)?;
        }
        self.expect(Tok::Colon)?;
        kids.extend(self.parse_stmt_list()?);
        Ok(self.finish(NodeKind::CaseClause, start, &kids))
    }

    fn parse_select_stmt(&mut self) -> PResult<NodeId> {
        let start = self.start();
        self.expect(Tok::KwSelect)?;
        let body_start = self.start();
        self.expect(Tok::LBrace)?;
        let mut clauses: Vec<NodeId> = Vec::new();
        while matches!(self.tok(), Tok::KwCase | Tok::KwDefault) {
            let clause_start = self.start();
            let mut kids: Vec<NodeId> = Vec::new();
            if self.got(Tok::KwCase) {
                let s_start = self.start();
                let s = self.parse_simple_stmt(StmtMode::Basic)?;
                kids.push(self.into_stmt(s, s_start)?);
            } else {
                self.expect(Tok::KwDefault)?;
            }
            self.expect(Tok::Colon)?;
            kids.extend(self.parse_stmt_list()?);
            clauses.push(self.finish(NodeKind::CommClause, clause_start, &kids));
        }
        self.expect(Tok::RBrace)?;
        self.expect_semi()?;
        let body = self.finish(NodeKind::BlockStmt, body_start, &clauses);
        Ok(self.finish(NodeKind::SelectStmt, start, &[body]))
    }

    fn parse_for_stmt(&mut self) -> PResult<NodeId> {
        let start = self.start();
        self.expect(Tok::KwFor)?;

        let lev = std::mem::replace(&mut self.expr_lev, -1);
        let header = self.parse_for_header();
        self.expr_lev = lev;
        let (range, init, cond, post) = header?;

        let body = self.parse_block()?;
        self.expect_semi()?;

        if let Some((lhs, tok, x)) = range {
            let mut kids: Nodes = lhs;
            kids.push(x);
            kids.push(body);
            return Ok(self.finish(NodeKind::RangeStmt(tok), start, &kids));
        }

        let mut kids: Nodes = SmallVec::new();
        kids.extend(init);
        kids.extend(cond);
        kids.extend(post);
        kids.push(body);
        Ok(self.finish(NodeKind::ForStmt, start, &kids))
    }

    #[allow(clippy::type_complexity)]
    fn parse_for_header(
        &mut self,
    ) -> PResult<(
        Option<(Nodes, RangeTok, NodeId)>,
        Option<NodeId>,
        Option<NodeId>,
        Option<NodeId>,
    )> {
        if self.tok() == Tok::LBrace {
            return Ok((None, None, None, None));
        }

        let mut s2: Option<(Simple, usize)> = None;
        if self.tok() != Tok::Semi {
            if self.got(Tok::KwRange) {
                let x = self.parse_expr()?;
                return Ok((Some((SmallVec::new(), RangeTok::None, x)), None, None, None));
            }
            let s_start = self.start();
            match self.parse_simple_stmt(StmtMode::RangeOk)? {
                Simple::Range { lhs, tok, x } => {
                    if lhs.len() > 2 {
                        return Err(Diag::parse(
                            self.b.span(lhs[2]),
                            "range clause permits at most two iteration variables",
                        ));
                    }
                    return Ok((Some((lhs, tok, x)), None, None, None));
                }
                s => s2 = Some((s, s_start)),
            }
        }

        if self.tok() != Tok::Semi {
            // `for cond {`
            let cond = match s2 {
                Some((s, _)) => Some(self.expr_of(s, "for loop condition")?),
                None => None,
            };
            return Ok((None, None, cond, None));
        }

        self.next();
        let init = match s2.take() {
            Some((s, s_start)) => Some(self.into_stmt(s, s_start)?),
            None => None,
        };
        let mut cond = None;
        if self.tok() != Tok::Semi {
            let s = self.parse_simple_stmt(StmtMode::Basic)?;
            cond = Some(self.expr_of(s, "for loop condition")?);
        }
        self.expect_semi()?;
        let mut post = None;
        if self.tok() != Tok::LBrace {
            let s_start = self.start();
            let s = self.parse_simple_stmt(StmtMode::Basic)?;
            post = Some(self.into_stmt(s, s_start)?);
        }
        Ok((None, init, cond, post))
    }
}

/// Binary operator and precedence for a token.
fn binary_op(tok: Tok) -> Option<(BinaryOp, u8)> {
    Some(match tok {
        Tok::LOr => (BinaryOp::LOr, 1),
        Tok::LAnd => (BinaryOp::LAnd, 2),
        Tok::EqEq => (BinaryOp::Eq, 3),
        Tok::NotEq => (BinaryOp::Ne, 3),
        Tok::Lt => (BinaryOp::Lt, 3),
        Tok::Le => (BinaryOp::Le, 3),
        Tok::Gt => (BinaryOp::Gt, 3),
        Tok::Ge => (BinaryOp::Ge, 3),
        Tok::Plus => (BinaryOp::Add, 4),
        Tok::Minus => (BinaryOp::Sub, 4),
        Tok::Pipe => (BinaryOp::Or, 4),
        Tok::Caret => (BinaryOp::Xor, 4),
        Tok::Star => (BinaryOp::Mul, 5),
        Tok::Slash => (BinaryOp::Quo, 5),
        Tok::Percent => (BinaryOp::Rem, 5),
        Tok::Shl => (BinaryOp::Shl, 5),
        Tok::Shr => (BinaryOp::Shr, 5),
        Tok::Amp => (BinaryOp::And, 5),
        Tok::AndNot => (BinaryOp::AndNot, 5),
        _ => return None,
    })
}
