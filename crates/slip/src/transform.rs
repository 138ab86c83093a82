//! Transformer: raw tagged tree to typed AST values.
//!
//! The second stage of the pipeline. Produces the concrete path, code, sig
//! and literal values the evaluator walks, and enforces the structural
//! constraints the grammar cannot: sig ordering rules, root-segment
//! placement, and the restricted shapes of configuration blocks and union
//! annotations.

use std::{rc::Rc, str::FromStr};

use crate::{
    error::{Error, ErrorKind},
    parse::{RawLit, RawNode, RawTag, parse},
    path::{CompareOp, Filter, MultiSetPath, Path, QueryNode, Segment},
    signature::{Sig, SigSpec},
    value::{BytesCtor, BytesTag, Code, Expr, Value, dedent},
};

/// Parses and lowers a whole script.
pub fn lower(source: &str) -> Result<Code, Error> {
    let raw = parse(source)?;
    let mut exprs = Vec::with_capacity(raw.children.len());
    for child in &raw.children {
        exprs.push(transform_expr(child)?);
    }
    Ok(Code::new(exprs))
}

/// Parses a path from text using the main grammar - the first-class path
/// parser behind `parse-path` and string-to-path reflection.
pub fn path_from_text(text: &str) -> Result<Path, Error> {
    let code = lower(text)?;
    let [expr] = code.exprs.as_slice() else {
        return Err(Error::new(ErrorKind::SyntaxError, "expected a single path"));
    };
    match expr.terms.as_slice() {
        [Value::GetPath(path) | Value::PathLiteral(path)] => Ok((**path).clone()),
        _ => Err(Error::new(ErrorKind::SyntaxError, "expected a single path")),
    }
}

fn err(node: &RawNode, message: impl Into<String>) -> Error {
    Error::new(ErrorKind::SyntaxError, message).with_location(node.loc)
}

fn transform_expr(node: &RawNode) -> Result<Expr, Error> {
    debug_assert_eq!(node.tag, RawTag::Expr);
    let mut terms = Vec::with_capacity(node.children.len());
    for child in &node.children {
        terms.push(transform_term(child)?);
    }
    Ok(Expr::at(terms, node.loc))
}

fn transform_term(node: &RawNode) -> Result<Value, Error> {
    match node.tag {
        RawTag::Int => match node.lit {
            Some(RawLit::Int(v)) => Ok(Value::Int(v)),
            _ => Err(err(node, "malformed int node")),
        },
        RawTag::Float => match node.lit {
            Some(RawLit::Float(v)) => Ok(Value::Float(v)),
            _ => Err(err(node, "malformed float node")),
        },
        RawTag::Bool => Ok(Value::Bool(node.text() == "true")),
        RawTag::NoneLit => Ok(Value::None),
        RawTag::RawString => Ok(Value::Str(Rc::from(dedent(node.text())))),
        RawTag::IString => Ok(Value::IStr(Rc::from(dedent(node.text())))),
        RawTag::GetPath => Ok(Value::GetPath(Rc::new(transform_path(node)?))),
        RawTag::SetPath => Ok(Value::SetPath(Rc::new(transform_path(node)?))),
        RawTag::DelPath => Ok(Value::DelPath(Rc::new(transform_path(node)?))),
        RawTag::PipedPath => Ok(Value::PipedPath(Rc::new(transform_path(node)?))),
        RawTag::PostPath => Ok(Value::PostPath(Rc::new(transform_path(node)?))),
        RawTag::PathLit => Ok(Value::PathLiteral(Rc::new(transform_path(node)?))),
        RawTag::MultiSet => {
            let mut targets = Vec::with_capacity(node.children.len());
            for child in &node.children {
                targets.push(transform_path(child)?);
            }
            Ok(Value::MultiSetPath(Rc::new(MultiSetPath { targets })))
        }
        RawTag::Code => {
            let mut exprs = Vec::with_capacity(node.children.len());
            for child in &node.children {
                exprs.push(transform_expr(child)?);
            }
            Ok(Value::Code(Rc::new(Code::new(exprs))))
        }
        RawTag::Group => {
            let expr = transform_expr(&node.children[0])?;
            Ok(Value::Group(Rc::new(expr)))
        }
        RawTag::List => {
            let mut items = Vec::with_capacity(node.children.len());
            for child in &node.children {
                items.push(transform_expr(child)?);
            }
            Ok(Value::ListCtor(Rc::new(items)))
        }
        RawTag::Dict => {
            let mut entries = Vec::with_capacity(node.children.len());
            for child in &node.children {
                debug_assert_eq!(child.tag, RawTag::DictEntry);
                let value = transform_expr(&child.children[0])?;
                entries.push((child.text().to_owned(), value));
            }
            Ok(Value::DictCtor(Rc::new(entries)))
        }
        RawTag::Sig => Ok(Value::Sig(Rc::new(transform_sig(node)?))),
        RawTag::Bytes => {
            let tag = BytesTag::from_str(node.text())
                .map_err(|_| err(node, format!("unknown byte-stream tag `{}`", node.text())))?;
            let mut items = Vec::with_capacity(node.children.len());
            for child in &node.children {
                items.push(transform_expr(child)?);
            }
            Ok(Value::BytesCtor(Rc::new(BytesCtor { tag, items })))
        }
        other => Err(err(node, format!("unexpected node {other:?} in expression"))),
    }
}

fn transform_path(node: &RawNode) -> Result<Path, Error> {
    let mut path = Path::default();
    for (index, child) in node.children.iter().enumerate() {
        match child.tag {
            RawTag::SegRoot => {
                if index != 0 {
                    return Err(err(child, "root segment must come first"));
                }
                path.segments.push(Segment::Root);
            }
            RawTag::SegParent => {
                if !matches!(
                    path.segments.last(),
                    None | Some(Segment::Parent)
                ) {
                    return Err(err(child, "parent segments must lead the path"));
                }
                path.segments.push(Segment::Parent);
            }
            RawTag::SegItem => {
                if index != 0 {
                    return Err(err(child, "`.name` form must start the path"));
                }
                path.item_scoped = true;
            }
            RawTag::SegScheme => {
                if index != 0 {
                    return Err(err(child, "scheme must come first"));
                }
                path.segments.push(Segment::Scheme(child.text().to_owned()));
            }
            RawTag::SegName => path.segments.push(Segment::Name(child.text().to_owned())),
            RawTag::SegGroup => {
                let expr = transform_expr(&child.children[0])?;
                path.segments.push(Segment::Group(expr));
            }
            RawTag::QuerySimple | RawTag::QuerySlice | RawTag::QueryCompare | RawTag::QueryPredicate => {
                path.segments.push(Segment::Query(transform_query(child)?));
            }
            RawTag::Config => {
                for entry in &child.children {
                    debug_assert_eq!(entry.tag, RawTag::ConfigEntry);
                    let expr = transform_expr(&entry.children[0])?;
                    let value = match expr.terms.as_slice() {
                        [single] => single.clone(),
                        _ => Value::Group(Rc::new(expr)),
                    };
                    path.configuration.push((entry.text().to_owned(), value));
                }
            }
            other => return Err(err(child, format!("unexpected path segment {other:?}"))),
        }
    }
    if path.segments.is_empty() && !path.item_scoped {
        return Err(err(node, "empty path"));
    }
    Ok(path)
}

fn transform_query(node: &RawNode) -> Result<QueryNode, Error> {
    match node.tag {
        RawTag::QuerySimple => Ok(QueryNode::Simple(transform_expr(&node.children[0])?)),
        RawTag::QuerySlice => {
            let start = transform_expr(&node.children[0])?;
            let end = transform_expr(&node.children[1])?;
            Ok(QueryNode::Slice {
                start: (!start.terms.is_empty()).then_some(start),
                end: (!end.terms.is_empty()).then_some(end),
            })
        }
        RawTag::QueryCompare => {
            let op = CompareOp::from_symbol(node.text())
                .ok_or_else(|| err(node, format!("unknown filter operator `{}`", node.text())))?;
            let rhs = transform_expr(&node.children[0])?;
            Ok(QueryNode::Filter(Filter::Compare(op, rhs)))
        }
        RawTag::QueryPredicate => Ok(QueryNode::Filter(Filter::Predicate(transform_expr(
            &node.children[0],
        )?))),
        other => Err(err(node, format!("unexpected query node {other:?}"))),
    }
}

fn transform_sig(node: &RawNode) -> Result<Sig, Error> {
    let mut sig = Sig::default();
    let mut seen_keyword = false;
    let mut names: Vec<&str> = Vec::new();
    for child in &node.children {
        match child.tag {
            RawTag::SigPositional => {
                if seen_keyword {
                    return Err(err(child, "positional parameters must precede keywords"));
                }
                if sig.rest.is_some() {
                    return Err(err(child, "rest parameter must be last"));
                }
                check_duplicate(child, &mut names)?;
                sig.positional.push(child.text().to_owned());
            }
            RawTag::SigKeyword => {
                if sig.rest.is_some() {
                    return Err(err(child, "rest parameter must be last"));
                }
                seen_keyword = true;
                check_duplicate(child, &mut names)?;
                let spec = transform_sig_spec(&child.children[0])?;
                sig.keywords.push((child.text().to_owned(), spec));
            }
            RawTag::SigRest => {
                if sig.rest.is_some() {
                    return Err(err(child, "only one rest parameter is allowed"));
                }
                check_duplicate(child, &mut names)?;
                sig.rest = Some(child.text().to_owned());
            }
            RawTag::SigReturn => {
                if sig.ret.is_some() {
                    return Err(err(child, "only one return annotation is allowed"));
                }
                sig.ret = Some(transform_sig_spec(&child.children[0])?);
            }
            other => return Err(err(child, format!("unexpected sig node {other:?}"))),
        }
    }
    Ok(sig)
}

fn check_duplicate<'a>(child: &'a RawNode, names: &mut Vec<&'a str>) -> Result<(), Error> {
    let name = child.text();
    if names.contains(&name) {
        return Err(err(child, format!("duplicate parameter `{name}`")));
    }
    names.push(name);
    Ok(())
}

fn transform_sig_spec(node: &RawNode) -> Result<SigSpec, Error> {
    match node.tag {
        RawTag::GetPath => {
            let path = transform_path(node)?;
            Ok(SigSpec::Name(path.dotted_names()))
        }
        RawTag::Sig => {
            let inner = transform_sig(node)?;
            if !inner.keywords.is_empty() || inner.rest.is_some() || inner.ret.is_some() {
                return Err(err(node, "union annotations may contain only names"));
            }
            Ok(SigSpec::Union(
                inner.positional.into_iter().map(SigSpec::Name).collect(),
            ))
        }
        _ => Ok(SigSpec::Literal(transform_term(node)?)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_expr(src: &str) -> Expr {
        let code = lower(src).unwrap();
        code.exprs.into_iter().next().unwrap()
    }

    #[test]
    fn set_path_head_lowers() {
        let expr = one_expr("result: 10 + 5 * 2");
        assert!(matches!(&expr.terms[0], Value::SetPath(p) if p.canonical() == "result"));
        assert_eq!(expr.terms.len(), 6);
    }

    #[test]
    fn query_path_lowers_to_filter() {
        let expr = one_expr("players.hp[< 50]");
        let Value::GetPath(path) = &expr.terms[0] else {
            panic!("expected get path");
        };
        assert!(matches!(
            &path.segments[2],
            Segment::Query(QueryNode::Filter(Filter::Compare(CompareOp::Lt, _)))
        ));
    }

    #[test]
    fn strings_are_dedented() {
        let expr = one_expr("'  a\n    b\n  c'");
        assert!(matches!(&expr.terms[0], Value::Str(s) if &**s == "a\n  b\nc"));
    }

    #[test]
    fn sig_rules_are_enforced() {
        assert!(lower("fn {a: int, b} [ a ]").is_err(), "positional after keyword");
        assert!(lower("fn {a, a} [ a ]").is_err(), "duplicate name");
        assert!(lower("fn {a..., b} [ a ]").is_err(), "rest must be last");
    }

    #[test]
    fn union_annotation() {
        let expr = one_expr("fn {x: {A, B}} [ x ]");
        let Value::Sig(sig) = &expr.terms[1] else {
            panic!("expected sig");
        };
        assert!(matches!(&sig.keywords[0].1, SigSpec::Union(parts) if parts.len() == 2));
    }

    #[test]
    fn example_sig_keeps_literals_and_return() {
        let expr = one_expr("f |example { a: 2, b: 3 -> 5 }");
        let Value::Sig(sig) = &expr.terms[2] else {
            panic!("expected sig");
        };
        assert!(matches!(&sig.keywords[0].1, SigSpec::Literal(Value::Int(2))));
        assert!(matches!(&sig.ret, Some(SigSpec::Literal(Value::Int(5)))));
    }

    #[test]
    fn config_is_transient_options() {
        let expr = one_expr("file://x.json#(lite: true)");
        let Value::GetPath(path) = &expr.terms[0] else {
            panic!("expected get path");
        };
        assert_eq!(path.scheme(), Some("file"));
        assert_eq!(path.configuration.len(), 1);
        assert_eq!(path.configuration[0].0, "lite");
        assert_eq!(path.configuration[0].1, Value::Bool(true));
    }

    #[test]
    fn path_from_text_round_trips() {
        let path = path_from_text("user.name").unwrap();
        assert_eq!(path.canonical(), "user.name");
        let again = path_from_text(&path.canonical()).unwrap();
        assert_eq!(path, again);
    }

    #[test]
    fn item_scoped_paths() {
        let expr = one_expr("items[.hp > 50]");
        let Value::GetPath(path) = &expr.terms[0] else {
            panic!("expected get path");
        };
        let Segment::Query(QueryNode::Filter(Filter::Predicate(pred))) = &path.segments[1] else {
            panic!("expected predicate query");
        };
        assert!(matches!(&pred.terms[0], Value::GetPath(p) if p.item_scoped));
    }
}
