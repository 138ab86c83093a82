//! Parser: token stream to the raw tagged tree.
//!
//! This is the first stage of the two-stage pipeline. Nodes carry only a
//! tag, children, an optional literal payload and a source span; the
//! transformer lowers them into typed AST values and enforces the
//! constraints the grammar alone cannot.
//!
//! Path assembly is driven by token gluing: a `[`, `.`, `:` or `#(`
//! immediately following a path token extends the path (query segment, name
//! segment, set marker, configuration), while the same token after
//! whitespace starts a fresh term.

use crate::{
    error::{CodeLoc, Error, ErrorKind},
    lex::{Token, TokKind, lex},
};

/// Maximum nesting depth for bracketed structures during parsing.
/// Prevents stack overflow from deeply nested input like `((((x))))`.
pub const MAX_NESTING_DEPTH: u16 = 200;

/// Tags of the raw tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawTag {
    Program,
    Expr,
    Int,
    Float,
    Bool,
    NoneLit,
    RawString,
    IString,
    // path flavours
    GetPath,
    SetPath,
    DelPath,
    PipedPath,
    PostPath,
    PathLit,
    MultiSet,
    // path segments
    SegRoot,
    SegParent,
    SegItem,
    SegScheme,
    SegName,
    SegGroup,
    // query segments
    QuerySimple,
    QuerySlice,
    QueryCompare,
    QueryPredicate,
    // path configuration
    Config,
    ConfigEntry,
    // literals
    Code,
    List,
    Dict,
    DictEntry,
    Sig,
    SigPositional,
    SigKeyword,
    SigRest,
    SigReturn,
    Group,
    Bytes,
}

/// Literal payload of a raw node.
#[derive(Debug, Clone, PartialEq)]
pub enum RawLit {
    Int(i64),
    Float(f64),
    Str(String),
}

/// One node of the raw tagged tree.
#[derive(Debug, Clone)]
pub struct RawNode {
    pub tag: RawTag,
    pub children: Vec<RawNode>,
    pub lit: Option<RawLit>,
    pub loc: CodeLoc,
}

impl RawNode {
    fn new(tag: RawTag, loc: CodeLoc) -> Self {
        Self {
            tag,
            children: Vec::new(),
            lit: None,
            loc,
        }
    }

    fn with_lit(tag: RawTag, lit: RawLit, loc: CodeLoc) -> Self {
        Self {
            tag,
            children: Vec::new(),
            lit: Some(lit),
            loc,
        }
    }

    fn with_children(tag: RawTag, children: Vec<Self>, loc: CodeLoc) -> Self {
        Self {
            tag,
            children,
            lit: None,
            loc,
        }
    }

    /// Str payload, for tags that always carry one.
    pub fn text(&self) -> &str {
        match &self.lit {
            Some(RawLit::Str(s)) => s,
            _ => "",
        }
    }
}

/// Parses source text into a raw `Program` tree.
pub fn parse(source: &str) -> Result<RawNode, Error> {
    let tokens = lex(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    parser.parse_program()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: u16,
}

impl Parser {
    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind(&self) -> &TokKind {
        &self.peek().kind
    }

    fn glued(&self) -> bool {
        self.peek().glued
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn loc(&self) -> CodeLoc {
        self.peek().loc
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::new(ErrorKind::SyntaxError, message).with_location(self.loc())
    }

    fn expect(&mut self, kind: &TokKind, what: &str) -> Result<Token, Error> {
        if self.peek_kind() == kind {
            Ok(self.bump())
        } else {
            Err(self.error(format!("expected {what}, found {:?}", self.peek_kind())))
        }
    }

    fn enter(&mut self) -> Result<(), Error> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(self.error("nesting too deep"));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek_kind(), TokKind::Newline | TokKind::Semicolon) {
            self.bump();
        }
    }

    fn skip_newlines(&mut self) {
        while matches!(self.peek_kind(), TokKind::Newline) {
            self.bump();
        }
    }

    fn parse_program(&mut self) -> Result<RawNode, Error> {
        let loc = self.loc();
        let exprs = self.parse_expr_list(&TokKind::Eof)?;
        Ok(RawNode::with_children(RawTag::Program, exprs, loc))
    }

    /// Expressions separated by newlines/semicolons, up to `closer`
    /// (which is left unconsumed).
    fn parse_expr_list(&mut self, closer: &TokKind) -> Result<Vec<RawNode>, Error> {
        let mut exprs = Vec::new();
        loop {
            self.skip_separators();
            if self.peek_kind() == closer || matches!(self.peek_kind(), TokKind::Eof) {
                break;
            }
            exprs.push(self.parse_expr(closer)?);
        }
        Ok(exprs)
    }

    /// One expression: an ordered list of terms, with assignment forms
    /// recognized at the first term.
    fn parse_expr(&mut self, closer: &TokKind) -> Result<RawNode, Error> {
        let loc = self.loc();
        let mut terms = Vec::new();
        let first = self.parse_term()?;
        let first = self.finish_expr_head(first)?;
        terms.push(first);
        while !self.at_expr_end(closer) {
            terms.push(self.parse_term()?);
        }
        Ok(RawNode::with_children(RawTag::Expr, terms, loc))
    }

    fn at_expr_end(&self, closer: &TokKind) -> bool {
        matches!(
            self.peek_kind(),
            TokKind::Newline | TokKind::Semicolon | TokKind::Eof
        ) || self.peek_kind() == closer
    }

    /// Upgrades the first term into a set / multi-set / post form when a
    /// glued marker follows it.
    fn finish_expr_head(&mut self, first: RawNode) -> Result<RawNode, Error> {
        if first.tag != RawTag::GetPath {
            return Ok(first);
        }
        match self.peek_kind() {
            TokKind::Colon if self.glued() => {
                self.bump();
                let mut node = first;
                node.tag = RawTag::SetPath;
                Ok(node)
            }
            TokKind::PostMark if self.glued() => {
                self.bump();
                let mut node = first;
                node.tag = RawTag::PostPath;
                Ok(node)
            }
            TokKind::Comma => {
                // destructuring: `a, b, c: rhs`
                let loc = first.loc;
                let mut targets = vec![first];
                while matches!(self.peek_kind(), TokKind::Comma) {
                    self.bump();
                    self.skip_newlines();
                    let next = self.parse_term()?;
                    if next.tag != RawTag::GetPath {
                        return Err(Error::new(
                            ErrorKind::SyntaxError,
                            "destructuring target must be a path",
                        )
                        .with_location(next.loc));
                    }
                    targets.push(next);
                }
                if matches!(self.peek_kind(), TokKind::Colon) && self.glued() {
                    self.bump();
                    Ok(RawNode::with_children(RawTag::MultiSet, targets, loc))
                } else {
                    Err(self.error("expected `:` after destructuring targets"))
                }
            }
            _ => Ok(first),
        }
    }

    fn parse_term(&mut self) -> Result<RawNode, Error> {
        let loc = self.loc();
        match self.peek_kind().clone() {
            TokKind::Int(v) => {
                self.bump();
                Ok(RawNode::with_lit(RawTag::Int, RawLit::Int(v), loc))
            }
            TokKind::Float(v) => {
                self.bump();
                Ok(RawNode::with_lit(RawTag::Float, RawLit::Float(v), loc))
            }
            TokKind::RawStr(s) => {
                self.bump();
                Ok(RawNode::with_lit(RawTag::RawString, RawLit::Str(s), loc))
            }
            TokKind::IStr(s) => {
                self.bump();
                Ok(RawNode::with_lit(RawTag::IString, RawLit::Str(s), loc))
            }
            TokKind::Name(name) if name == "true" || name == "false" => {
                self.bump();
                Ok(RawNode::with_lit(RawTag::Bool, RawLit::Str(name), loc))
            }
            TokKind::Name(name) if name == "none" => {
                self.bump();
                Ok(RawNode::new(RawTag::NoneLit, loc))
            }
            TokKind::Name(_) | TokKind::SchemePath { .. } | TokKind::ParentMark => {
                self.parse_path(RawTag::GetPath)
            }
            TokKind::Slash => {
                // glued follower makes it a rooted path; bare `/` is the
                // division operator name
                if self.tokens[self.pos + 1].glued
                    && matches!(
                        self.tokens[self.pos + 1].kind,
                        TokKind::Name(_) | TokKind::LParen
                    )
                {
                    self.parse_path(RawTag::GetPath)
                } else {
                    self.bump();
                    let mut node = RawNode::new(RawTag::GetPath, loc);
                    node.children.push(RawNode::with_lit(
                        RawTag::SegName,
                        RawLit::Str("/".into()),
                        loc,
                    ));
                    Ok(node)
                }
            }
            TokKind::Dot => {
                // `.name` - item-scoped path inside filter predicates
                self.parse_path(RawTag::GetPath)
            }
            TokKind::Backtick => {
                self.bump();
                if !self.glued() {
                    return Err(self.error("expected a path after ` "));
                }
                let mut node = self.parse_path(RawTag::PathLit)?;
                node.loc = loc;
                Ok(node)
            }
            TokKind::Tilde => {
                self.bump();
                if !self.glued() {
                    return Err(self.error("expected a path after `~`"));
                }
                let mut node = self.parse_path(RawTag::DelPath)?;
                node.loc = loc;
                Ok(node)
            }
            TokKind::Pipe => {
                self.bump();
                if !self.glued() {
                    return Err(self.error("expected a path after `|`"));
                }
                let mut node = self.parse_path(RawTag::PipedPath)?;
                node.loc = loc;
                Ok(node)
            }
            TokKind::LParen => self.parse_group(),
            TokKind::LBracket => self.parse_code(),
            TokKind::HashBracket => self.parse_list(),
            TokKind::HashBrace => self.parse_dict(),
            TokKind::LBrace => self.parse_sig(),
            TokKind::BytesOpen(tag) => self.parse_bytes(tag),
            other => Err(self.error(format!("unexpected token {other:?}"))),
        }
    }

    /// Assembles a path from the current position: leading root / parent /
    /// scheme markers, then glued name / group / query segments, then an
    /// optional glued `#(...)` configuration.
    fn parse_path(&mut self, tag: RawTag) -> Result<RawNode, Error> {
        let loc = self.loc();
        let mut node = RawNode::new(tag, loc);
        match self.peek_kind().clone() {
            TokKind::Slash => {
                self.bump();
                node.children.push(RawNode::new(RawTag::SegRoot, loc));
            }
            TokKind::ParentMark => {
                while matches!(self.peek_kind(), TokKind::ParentMark) {
                    let ploc = self.loc();
                    self.bump();
                    node.children.push(RawNode::new(RawTag::SegParent, ploc));
                }
            }
            TokKind::Dot => {
                self.bump();
                node.children.push(RawNode::new(RawTag::SegItem, loc));
                if !(self.glued() && matches!(self.peek_kind(), TokKind::Name(_))) {
                    return Err(self.error("expected a name after `.`"));
                }
            }
            TokKind::SchemePath { scheme, rest } => {
                self.bump();
                node.children
                    .push(RawNode::with_lit(RawTag::SegScheme, RawLit::Str(scheme), loc));
                if !rest.is_empty() {
                    node.children
                        .push(RawNode::with_lit(RawTag::SegName, RawLit::Str(rest), loc));
                }
                self.parse_path_tail(&mut node)?;
                return Ok(node);
            }
            _ => {}
        }
        // first name segment (root/parent/item prefixes fall through here)
        if let TokKind::Name(name) = self.peek_kind().clone() {
            let nloc = self.loc();
            self.bump();
            node.children
                .push(RawNode::with_lit(RawTag::SegName, RawLit::Str(name), nloc));
        } else if matches!(self.peek_kind(), TokKind::LParen) {
            let group = self.parse_group_segment()?;
            node.children.push(group);
        } else if node.children.is_empty() {
            return Err(self.error("expected a path"));
        }
        self.parse_path_tail(&mut node)?;
        Ok(node)
    }

    fn parse_path_tail(&mut self, node: &mut RawNode) -> Result<(), Error> {
        loop {
            if !self.glued() {
                break;
            }
            match self.peek_kind() {
                TokKind::Dot => {
                    self.bump();
                    if !self.glued() {
                        return Err(self.error("expected a segment after `.`"));
                    }
                    match self.peek_kind().clone() {
                        TokKind::Name(name) => {
                            let loc = self.loc();
                            self.bump();
                            node.children.push(RawNode::with_lit(
                                RawTag::SegName,
                                RawLit::Str(name),
                                loc,
                            ));
                        }
                        TokKind::LParen => {
                            let group = self.parse_group_segment()?;
                            node.children.push(group);
                        }
                        other => {
                            return Err(self.error(format!("invalid path segment {other:?}")));
                        }
                    }
                }
                TokKind::LBracket => {
                    let query = self.parse_query()?;
                    node.children.push(query);
                }
                TokKind::HashParen => {
                    let config = self.parse_config()?;
                    node.children.push(config);
                    break; // configuration is always last
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn parse_group_segment(&mut self) -> Result<RawNode, Error> {
        let loc = self.loc();
        self.enter()?;
        self.expect(&TokKind::LParen, "`(`")?;
        self.skip_newlines();
        let expr = self.parse_expr(&TokKind::RParen)?;
        self.skip_newlines();
        self.expect(&TokKind::RParen, "`)`")?;
        self.leave();
        Ok(RawNode::with_children(RawTag::SegGroup, vec![expr], loc))
    }

    /// `[...]` after a path token: slice > filter > simple.
    fn parse_query(&mut self) -> Result<RawNode, Error> {
        let loc = self.loc();
        self.enter()?;
        self.expect(&TokKind::LBracket, "`[`")?;
        self.skip_newlines();

        // Slice detection: a top-level `:` before the closing bracket.
        if self.scan_top_level_colon() {
            let start = if matches!(self.peek_kind(), TokKind::Colon) {
                RawNode::new(RawTag::Expr, self.loc())
            } else {
                self.parse_expr_until_any(&[TokKind::Colon, TokKind::RBracket])?
            };
            self.expect(&TokKind::Colon, "`:`")?;
            self.skip_newlines();
            let end = if matches!(self.peek_kind(), TokKind::RBracket) {
                RawNode::new(RawTag::Expr, self.loc())
            } else {
                self.parse_expr_until_any(&[TokKind::RBracket])?
            };
            self.expect(&TokKind::RBracket, "`]`")?;
            self.leave();
            return Ok(RawNode::with_children(RawTag::QuerySlice, vec![start, end], loc));
        }

        // Filter shorthand: a leading comparison operator.
        if let TokKind::Name(name) = self.peek_kind()
            && matches!(name.as_str(), "=" | "!=" | "<" | "<=" | ">" | ">=")
        {
            let op = name.clone();
            self.bump();
            let rhs = self.parse_expr_until_any(&[TokKind::RBracket])?;
            self.expect(&TokKind::RBracket, "`]`")?;
            self.leave();
            let mut node = RawNode::with_children(RawTag::QueryCompare, vec![rhs], loc);
            node.lit = Some(RawLit::Str(op));
            return Ok(node);
        }

        let expr = self.parse_expr_until_any(&[TokKind::RBracket])?;
        self.expect(&TokKind::RBracket, "`]`")?;
        self.leave();
        let tag = if is_predicate_expr(&expr) {
            RawTag::QueryPredicate
        } else {
            RawTag::QuerySimple
        };
        Ok(RawNode::with_children(tag, vec![expr], loc))
    }

    /// True if a `:` appears at the current bracket level before `]`.
    fn scan_top_level_colon(&self) -> bool {
        let mut depth = 0usize;
        for tok in &self.tokens[self.pos..] {
            match tok.kind {
                TokKind::LBracket | TokKind::HashBracket | TokKind::HashBrace | TokKind::LParen
                | TokKind::HashParen | TokKind::LBrace => depth += 1,
                TokKind::RBracket if depth == 0 => return false,
                TokKind::RBracket | TokKind::RParen | TokKind::RBrace => {
                    depth = depth.saturating_sub(1);
                }
                TokKind::Colon if depth == 0 => return true,
                TokKind::Eof => return false,
                _ => {}
            }
        }
        false
    }

    fn parse_expr_until_any(&mut self, closers: &[TokKind]) -> Result<RawNode, Error> {
        let loc = self.loc();
        let mut terms = Vec::new();
        loop {
            self.skip_newlines();
            if closers.contains(self.peek_kind()) || matches!(self.peek_kind(), TokKind::Eof) {
                break;
            }
            terms.push(self.parse_term()?);
        }
        Ok(RawNode::with_children(RawTag::Expr, terms, loc))
    }

    fn parse_config(&mut self) -> Result<RawNode, Error> {
        let loc = self.loc();
        self.enter()?;
        self.expect(&TokKind::HashParen, "`#(`")?;
        let mut node = RawNode::new(RawTag::Config, loc);
        loop {
            self.skip_newlines();
            if matches!(self.peek_kind(), TokKind::RParen) {
                break;
            }
            let eloc = self.loc();
            let key = match self.peek_kind().clone() {
                TokKind::Name(name) => {
                    self.bump();
                    name
                }
                TokKind::RawStr(s) | TokKind::IStr(s) => {
                    self.bump();
                    s
                }
                other => return Err(self.error(format!("invalid configuration key {other:?}"))),
            };
            self.expect(&TokKind::Colon, "`:`")?;
            self.skip_newlines();
            let value = self.parse_expr_until_any(&[TokKind::Comma, TokKind::RParen])?;
            let mut entry = RawNode::with_children(RawTag::ConfigEntry, vec![value], eloc);
            entry.lit = Some(RawLit::Str(key));
            node.children.push(entry);
            if matches!(self.peek_kind(), TokKind::Comma) {
                self.bump();
            }
        }
        self.expect(&TokKind::RParen, "`)`")?;
        self.leave();
        Ok(node)
    }

    fn parse_group(&mut self) -> Result<RawNode, Error> {
        let loc = self.loc();
        self.enter()?;
        self.expect(&TokKind::LParen, "`(`")?;
        self.skip_newlines();
        let expr = self.parse_expr(&TokKind::RParen)?;
        self.skip_newlines();
        self.expect(&TokKind::RParen, "`)`")?;
        self.leave();

        // A glued continuation turns the group into a dynamic path head:
        // `(expr).name`, `(expr)[0]`, `(expr): v`.
        if self.glued()
            && matches!(
                self.peek_kind(),
                TokKind::Dot | TokKind::LBracket | TokKind::Colon | TokKind::HashParen | TokKind::PostMark
            )
        {
            let seg = RawNode::with_children(RawTag::SegGroup, vec![expr], loc);
            let mut node = RawNode::with_children(RawTag::GetPath, vec![seg], loc);
            if matches!(self.peek_kind(), TokKind::Dot | TokKind::LBracket | TokKind::HashParen) {
                self.parse_path_tail(&mut node)?;
            }
            return Ok(node);
        }
        Ok(RawNode::with_children(RawTag::Group, vec![expr], loc))
    }

    fn parse_code(&mut self) -> Result<RawNode, Error> {
        let loc = self.loc();
        self.enter()?;
        self.expect(&TokKind::LBracket, "`[`")?;
        let exprs = self.parse_expr_list(&TokKind::RBracket)?;
        self.expect(&TokKind::RBracket, "`]`")?;
        self.leave();
        Ok(RawNode::with_children(RawTag::Code, exprs, loc))
    }

    fn parse_list(&mut self) -> Result<RawNode, Error> {
        let loc = self.loc();
        self.enter()?;
        self.expect(&TokKind::HashBracket, "`#[`")?;
        let mut items = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.peek_kind(), TokKind::RBracket) {
                break;
            }
            items.push(self.parse_expr_until_any(&[TokKind::Comma, TokKind::RBracket])?);
            if matches!(self.peek_kind(), TokKind::Comma) {
                self.bump();
            }
        }
        self.expect(&TokKind::RBracket, "`]`")?;
        self.leave();
        Ok(RawNode::with_children(RawTag::List, items, loc))
    }

    fn parse_dict(&mut self) -> Result<RawNode, Error> {
        let loc = self.loc();
        self.enter()?;
        self.expect(&TokKind::HashBrace, "`#{`")?;
        let mut entries = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.peek_kind(), TokKind::RBrace) {
                break;
            }
            let eloc = self.loc();
            let key = match self.peek_kind().clone() {
                TokKind::Name(name) => {
                    self.bump();
                    name
                }
                TokKind::RawStr(s) | TokKind::IStr(s) => {
                    self.bump();
                    s
                }
                other => return Err(self.error(format!("invalid dict key {other:?}"))),
            };
            self.expect(&TokKind::Colon, "`:`")?;
            self.skip_newlines();
            let value = self.parse_expr_until_any(&[TokKind::Comma, TokKind::RBrace])?;
            let mut entry = RawNode::with_children(RawTag::DictEntry, vec![value], eloc);
            entry.lit = Some(RawLit::Str(key));
            entries.push(entry);
            if matches!(self.peek_kind(), TokKind::Comma) {
                self.bump();
            }
        }
        self.expect(&TokKind::RBrace, "`}`")?;
        self.leave();
        Ok(RawNode::with_children(RawTag::Dict, entries, loc))
    }

    /// Sig literal: `{ a, b: Spec, rest... -> Ret }`.
    fn parse_sig(&mut self) -> Result<RawNode, Error> {
        let loc = self.loc();
        self.enter()?;
        self.expect(&TokKind::LBrace, "`{`")?;
        let mut node = RawNode::new(RawTag::Sig, loc);
        loop {
            self.skip_newlines();
            match self.peek_kind().clone() {
                TokKind::RBrace => break,
                TokKind::Arrow => {
                    self.bump();
                    self.skip_newlines();
                    let value = self.parse_sig_value()?;
                    let rloc = value.loc;
                    node.children
                        .push(RawNode::with_children(RawTag::SigReturn, vec![value], rloc));
                    self.skip_newlines();
                    break;
                }
                TokKind::Name(name) => {
                    let eloc = self.loc();
                    self.bump();
                    match self.peek_kind() {
                        TokKind::Colon if self.glued() => {
                            self.bump();
                            self.skip_newlines();
                            let value = self.parse_sig_value()?;
                            let mut entry =
                                RawNode::with_children(RawTag::SigKeyword, vec![value], eloc);
                            entry.lit = Some(RawLit::Str(name));
                            node.children.push(entry);
                        }
                        TokKind::Ellipsis if self.glued() => {
                            self.bump();
                            node.children.push(RawNode::with_lit(
                                RawTag::SigRest,
                                RawLit::Str(name),
                                eloc,
                            ));
                        }
                        _ => {
                            node.children.push(RawNode::with_lit(
                                RawTag::SigPositional,
                                RawLit::Str(name),
                                eloc,
                            ));
                        }
                    }
                    if matches!(self.peek_kind(), TokKind::Comma) {
                        self.bump();
                    }
                }
                other => return Err(self.error(format!("invalid sig entry {other:?}"))),
            }
        }
        self.expect(&TokKind::RBrace, "`}`")?;
        self.leave();
        Ok(node)
    }

    /// Sig values are restricted: literal, simple path, or a nested sig
    /// (a union annotation).
    fn parse_sig_value(&mut self) -> Result<RawNode, Error> {
        let loc = self.loc();
        match self.peek_kind().clone() {
            TokKind::Int(v) => {
                self.bump();
                Ok(RawNode::with_lit(RawTag::Int, RawLit::Int(v), loc))
            }
            TokKind::Float(v) => {
                self.bump();
                Ok(RawNode::with_lit(RawTag::Float, RawLit::Float(v), loc))
            }
            TokKind::RawStr(s) => {
                self.bump();
                Ok(RawNode::with_lit(RawTag::RawString, RawLit::Str(s), loc))
            }
            TokKind::IStr(s) => {
                self.bump();
                Ok(RawNode::with_lit(RawTag::IString, RawLit::Str(s), loc))
            }
            TokKind::Name(name) if name == "true" || name == "false" => {
                self.bump();
                Ok(RawNode::with_lit(RawTag::Bool, RawLit::Str(name), loc))
            }
            TokKind::Name(name) if name == "none" => {
                self.bump();
                Ok(RawNode::new(RawTag::NoneLit, loc))
            }
            TokKind::Name(_) => {
                let mut node = RawNode::new(RawTag::GetPath, loc);
                let TokKind::Name(name) = self.bump().kind else {
                    unreachable!()
                };
                node.children
                    .push(RawNode::with_lit(RawTag::SegName, RawLit::Str(name), loc));
                // simple dotted path only
                while matches!(self.peek_kind(), TokKind::Dot) && self.glued() {
                    self.bump();
                    if let TokKind::Name(name) = self.peek_kind().clone() {
                        let nloc = self.loc();
                        self.bump();
                        node.children
                            .push(RawNode::with_lit(RawTag::SegName, RawLit::Str(name), nloc));
                    } else {
                        return Err(self.error("expected a name after `.` in sig value"));
                    }
                }
                Ok(node)
            }
            TokKind::LBrace => self.parse_sig(),
            other => Err(self.error(format!(
                "sig values must be literals, simple paths or unions, found {other:?}"
            ))),
        }
    }

    fn parse_bytes(&mut self, tag: String) -> Result<RawNode, Error> {
        let loc = self.loc();
        self.enter()?;
        self.bump(); // BytesOpen
        let mut items = Vec::new();
        loop {
            self.skip_newlines();
            if matches!(self.peek_kind(), TokKind::RBracket) {
                break;
            }
            items.push(self.parse_expr_until_any(&[TokKind::Comma, TokKind::RBracket])?);
            if matches!(self.peek_kind(), TokKind::Comma) {
                self.bump();
            }
        }
        self.expect(&TokKind::RBracket, "`]`")?;
        self.leave();
        let mut node = RawNode::with_children(RawTag::Bytes, items, loc);
        node.lit = Some(RawLit::Str(tag));
        Ok(node)
    }
}

/// A query expression is a predicate (not a simple index) when it mentions
/// an item-scoped path or combines terms with comparison / logical
/// operators at the top level.
fn is_predicate_expr(expr: &RawNode) -> bool {
    expr.children.iter().any(|term| match term.tag {
        RawTag::GetPath => {
            term.children.first().is_some_and(|c| c.tag == RawTag::SegItem)
                || term.children.len() == 1
                    && matches!(
                        term.children[0].lit.as_ref(),
                        Some(RawLit::Str(name)) if matches!(
                            name.as_str(),
                            "=" | "!=" | "<" | "<=" | ">" | ">=" | "and" | "or"
                        )
                    )
        }
        _ => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(src: &str) -> RawNode {
        parse(src).unwrap()
    }

    fn first_expr(src: &str) -> RawNode {
        program(src).children.into_iter().next().unwrap()
    }

    #[test]
    fn set_path_with_remainder() {
        let expr = first_expr("result: 10 + 5 * 2");
        assert_eq!(expr.children[0].tag, RawTag::SetPath);
        assert_eq!(expr.children.len(), 6);
    }

    #[test]
    fn call_terms_stay_flat() {
        let expr = first_expr("interact some-player some-weapon");
        assert_eq!(expr.children.len(), 3);
        assert!(expr.children.iter().all(|t| t.tag == RawTag::GetPath));
    }

    #[test]
    fn query_kinds() {
        let expr = first_expr("players.hp[< 50]");
        let path = &expr.children[0];
        assert_eq!(path.tag, RawTag::GetPath);
        assert_eq!(path.children[2].tag, RawTag::QueryCompare);

        let expr = first_expr("items[1:3]");
        assert_eq!(expr.children[0].children[1].tag, RawTag::QuerySlice);

        let expr = first_expr("items[0]");
        assert_eq!(expr.children[0].children[1].tag, RawTag::QuerySimple);

        let expr = first_expr("items[.hp > 50]");
        assert_eq!(expr.children[0].children[1].tag, RawTag::QueryPredicate);
    }

    #[test]
    fn spaced_bracket_is_a_code_literal() {
        let expr = first_expr("while [true] [ x ]");
        assert_eq!(expr.children.len(), 3);
        assert_eq!(expr.children[1].tag, RawTag::Code);
        assert_eq!(expr.children[2].tag, RawTag::Code);
    }

    #[test]
    fn multi_set_targets() {
        let expr = first_expr("a, b: #[1, 2]");
        assert_eq!(expr.children[0].tag, RawTag::MultiSet);
        assert_eq!(expr.children[0].children.len(), 2);
        assert_eq!(expr.children[1].tag, RawTag::List);
    }

    #[test]
    fn del_and_literal_and_piped() {
        assert_eq!(first_expr("~x").children[0].tag, RawTag::DelPath);
        assert_eq!(first_expr("`ok").children[0].tag, RawTag::PathLit);
        let expr = first_expr("f |example { a: 2 -> 5 }");
        assert_eq!(expr.children[1].tag, RawTag::PipedPath);
        assert_eq!(expr.children[2].tag, RawTag::Sig);
    }

    #[test]
    fn post_path_takes_body() {
        let expr = first_expr("http://api/users<- #{ name: 'x' }");
        assert_eq!(expr.children[0].tag, RawTag::PostPath);
        assert_eq!(expr.children[1].tag, RawTag::Dict);
    }

    #[test]
    fn sig_shapes() {
        let expr = first_expr("fn {p: Player, i: Item} [ 'A' ]");
        let sig = &expr.children[1];
        assert_eq!(sig.tag, RawTag::Sig);
        assert_eq!(sig.children[0].tag, RawTag::SigKeyword);
        let expr = first_expr("fn {a, rest...} [ a ]");
        let sig = &expr.children[1];
        assert_eq!(sig.children[0].tag, RawTag::SigPositional);
        assert_eq!(sig.children[1].tag, RawTag::SigRest);
    }

    #[test]
    fn example_sig_with_return() {
        let expr = first_expr("f |example { a: 2, b: 3 -> 5 }");
        let sig = &expr.children[2];
        assert_eq!(sig.children.len(), 3);
        assert_eq!(sig.children[2].tag, RawTag::SigReturn);
    }

    #[test]
    fn dynamic_set_head() {
        let expr = first_expr("(target): 5");
        assert_eq!(expr.children[0].tag, RawTag::SetPath);
        assert_eq!(expr.children[0].children[0].tag, RawTag::SegGroup);
    }

    #[test]
    fn config_block_attaches_to_path() {
        let expr = first_expr("file://x.json#(lite: true, timeout: 30)");
        let path = &expr.children[0];
        let config = path.children.last().unwrap();
        assert_eq!(config.tag, RawTag::Config);
        assert_eq!(config.children.len(), 2);
        assert_eq!(config.children[0].text(), "lite");
    }

    #[test]
    fn parent_paths() {
        let expr = first_expr("../../x");
        let path = &expr.children[0];
        assert_eq!(path.children[0].tag, RawTag::SegParent);
        assert_eq!(path.children[1].tag, RawTag::SegParent);
        assert_eq!(path.children[2].tag, RawTag::SegName);
    }

    #[test]
    fn unterminated_code_is_a_syntax_error() {
        let err = parse("run [ 1 + 2").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::SyntaxError);
        assert!(err.location().is_some());
    }
}
