//! Structured path identifiers and query nodes.
//!
//! A [`Path`] is an ordered sequence of [`Segment`]s plus an optional
//! transient configuration block (`#(...)`). The same segment list backs
//! every path flavour - get, set, delete, post, piped, literal - the flavour
//! itself is carried by the [`Value`](crate::value::Value) variant wrapping
//! the path.
//!
//! Equality follows the canonical textual form: two paths are equal when
//! they print the same.

use std::fmt;

use smallvec::SmallVec;

use crate::value::{Expr, Value};

/// One step of a path.
#[derive(Debug, Clone)]
pub enum Segment {
    /// Leading `/`: start resolution at the designated root scope.
    Root,
    /// Leading `../`: step to the lexical parent.
    Parent,
    /// A scheme prefix such as `file://` - always the first segment; the
    /// remainder of the scheme path is the following `Name` segment.
    Scheme(String),
    /// A plain name segment.
    Name(String),
    /// A `[...]` query segment.
    Query(QueryNode),
    /// A `(...)` group segment; the expression's value becomes the key.
    Group(Expr),
}

/// A query inside a path: `[expr]`, `[a:b]` or a filter.
///
/// Precedence at parse time is slice > filter > simple.
#[derive(Debug, Clone)]
pub enum QueryNode {
    /// Index or key lookup: `[0]`, `[name]`, `[(expr)]`.
    Simple(Expr),
    /// Slice with optional bounds: `[1:3]`, `[:2]`, `[1:]`.
    Slice { start: Option<Expr>, end: Option<Expr> },
    /// Element filter: shorthand `[< 50]` or a full predicate expression.
    Filter(Filter),
}

/// Filter forms accepted inside a query segment.
#[derive(Debug, Clone)]
pub enum Filter {
    /// `[op rhs]`: keep items where `item op rhs` holds.
    Compare(CompareOp, Expr),
    /// A predicate expression; dot-prefixed names read item properties,
    /// bare names resolve in the enclosing lexical scope.
    Predicate(Expr),
}

/// Comparison operators usable in filter shorthand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CompareOp {
    /// The operator's source spelling.
    #[must_use]
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }

    /// Looks up an operator by its source spelling.
    #[must_use]
    pub fn from_symbol(sym: &str) -> Option<Self> {
        match sym {
            "=" => Some(Self::Eq),
            "!=" => Some(Self::Ne),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            _ => None,
        }
    }
}

/// A structured identifier referring to a location or operation.
///
/// `configuration` holds the `#(...)` block as unevaluated `(key, expr)`
/// pairs; it is transient and never part of the path's identity.
/// `item_scoped` marks `.field` paths inside filter predicates, which
/// resolve against the filtered item instead of the lexical chain.
#[derive(Debug, Clone, Default)]
pub struct Path {
    pub segments: SmallVec<[Segment; 4]>,
    pub configuration: Vec<(String, Value)>,
    pub item_scoped: bool,
}

impl Path {
    #[must_use]
    pub fn from_segments(segments: impl IntoIterator<Item = Segment>) -> Self {
        Self {
            segments: segments.into_iter().collect(),
            configuration: Vec::new(),
            item_scoped: false,
        }
    }

    /// A single-name path, the common case for plain bindings.
    #[must_use]
    pub fn name(name: impl Into<String>) -> Self {
        Self::from_segments([Segment::Name(name.into())])
    }

    /// The scheme name when the path is scheme-prefixed (`file://...`).
    #[must_use]
    pub fn scheme(&self) -> Option<&str> {
        match self.segments.first() {
            Some(Segment::Scheme(s)) => Some(s),
            _ => None,
        }
    }

    /// The sole name of a single-`Name`-segment path.
    #[must_use]
    pub fn simple_name(&self) -> Option<&str> {
        match self.segments.as_slice() {
            [Segment::Name(name)] => Some(name),
            _ => None,
        }
    }

    /// The trailing name segment, used for christening and generic naming.
    #[must_use]
    pub fn last_name(&self) -> Option<&str> {
        self.segments.iter().rev().find_map(|seg| match seg {
            Segment::Name(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Dotted join of all `Name` segments, the canonical registry key.
    #[must_use]
    pub fn dotted_names(&self) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            if let Segment::Name(name) = seg {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(name);
            }
        }
        out
    }

    /// Canonical textual form, identical to `Display`.
    #[must_use]
    pub fn canonical(&self) -> String {
        self.to_string()
    }
}

impl PartialEq for Path {
    fn eq(&self, other: &Self) -> bool {
        self.item_scoped == other.item_scoped && self.canonical() == other.canonical()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut after_scheme = false;
        let mut need_dot = false;
        if self.item_scoped {
            f.write_str(".")?;
        }
        for seg in &self.segments {
            match seg {
                Segment::Root => {
                    f.write_str("/")?;
                    need_dot = false;
                }
                Segment::Parent => {
                    f.write_str("../")?;
                    need_dot = false;
                }
                Segment::Scheme(s) => {
                    write!(f, "{s}://")?;
                    after_scheme = true;
                    need_dot = false;
                }
                Segment::Name(name) => {
                    if need_dot && !after_scheme {
                        f.write_str(".")?;
                    }
                    f.write_str(name)?;
                    after_scheme = false;
                    need_dot = true;
                }
                Segment::Query(q) => {
                    write!(f, "{q}")?;
                    need_dot = true;
                }
                Segment::Group(expr) => {
                    if need_dot {
                        f.write_str(".")?;
                    }
                    write!(f, "({})", fmt_expr(expr))?;
                    need_dot = true;
                }
            }
        }
        Ok(())
    }
}

impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Simple(expr) => write!(f, "[{}]", fmt_expr(expr)),
            Self::Slice { start, end } => {
                f.write_str("[")?;
                if let Some(expr) = start {
                    f.write_str(&fmt_expr(expr))?;
                }
                f.write_str(":")?;
                if let Some(expr) = end {
                    f.write_str(&fmt_expr(expr))?;
                }
                f.write_str("]")
            }
            Self::Filter(Filter::Compare(op, rhs)) => write!(f, "[{} {}]", op.symbol(), fmt_expr(rhs)),
            Self::Filter(Filter::Predicate(expr)) => write!(f, "[{}]", fmt_expr(expr)),
        }
    }
}

fn fmt_expr(expr: &Expr) -> String {
    let parts: Vec<String> = expr.terms.iter().map(ToString::to_string).collect();
    parts.join(" ")
}

/// Destructuring target list: `a, b, c: rhs`.
#[derive(Debug, Clone)]
pub struct MultiSetPath {
    pub targets: Vec<Path>,
}

impl fmt::Display for MultiSetPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.targets.iter().map(ToString::to_string).collect();
        write!(f, "{}", parts.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_form_joins_names_with_dots() {
        let path = Path::from_segments([
            Segment::Name("players".into()),
            Segment::Name("hp".into()),
        ]);
        assert_eq!(path.canonical(), "players.hp");
    }

    #[test]
    fn root_and_parent_prefixes() {
        let root = Path::from_segments([Segment::Root, Segment::Name("config".into())]);
        assert_eq!(root.canonical(), "/config");
        let up = Path::from_segments([
            Segment::Parent,
            Segment::Parent,
            Segment::Name("x".into()),
        ]);
        assert_eq!(up.canonical(), "../../x");
    }

    #[test]
    fn scheme_paths_print_with_separator() {
        let path = Path::from_segments([
            Segment::Scheme("file".into()),
            Segment::Name("data/users.json".into()),
        ]);
        assert_eq!(path.canonical(), "file://data/users.json");
        assert_eq!(path.scheme(), Some("file"));
    }

    #[test]
    fn equality_is_canonical_text() {
        let a = Path::name("hp");
        let b = Path::from_segments([Segment::Name("hp".into())]);
        assert_eq!(a, b);
    }
}
