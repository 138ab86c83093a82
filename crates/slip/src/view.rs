//! Lazy query views.
//!
//! A [`View`] pairs a source collection with a list of query nodes and the
//! scope current when the query was written (predicates and index
//! expressions evaluate there at resolve time). Constructing or chaining a
//! view never executes the query; materialization happens on demand, either
//! to values (`resolve_view`) or to write-locations (`view_locations`).
//!
//! Location resolution tracks provenance: each surviving item keeps the
//! pointer into the collection it came from, so `list[1:3][> 5]` writes
//! land in the original list and an in-order read-back of the locations
//! equals materialization to values.

use std::fmt;

use crate::{
    error::{ErrorKind, RunError, RunResult},
    interp::Evaluator,
    path::{CompareOp, Filter, QueryNode},
    scope::ScopeRef,
    value::{ListRef, Value},
};

/// A lazy, immutable query object over a collection.
#[derive(Debug, Clone)]
pub struct View {
    pub source: Value,
    pub query: Vec<QueryNode>,
    pub(crate) env: ScopeRef,
}

impl View {
    #[must_use]
    pub(crate) fn new(source: Value, node: QueryNode, env: ScopeRef) -> Self {
        Self {
            source,
            query: vec![node],
            env,
        }
    }

    /// Chaining returns a new view with the node appended; the original is
    /// untouched.
    #[must_use]
    pub(crate) fn chained(&self, node: QueryNode) -> Self {
        let mut query = self.query.clone();
        query.push(node);
        Self {
            source: self.source.clone(),
            query,
            env: self.env.clone(),
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "view over {} ({} quer{})",
            self.source.type_name(),
            self.query.len(),
            if self.query.len() == 1 { "y" } else { "ies" }
        )
    }
}

/// A writable pointer into a collection.
#[derive(Debug, Clone)]
pub(crate) enum Location {
    List(ListRef, usize),
    Dict(crate::value::DictRef, String),
    Scope(ScopeRef, String),
}

impl Location {
    pub fn read(&self) -> RunResult<Value> {
        match self {
            Self::List(list, index) => list.borrow().get(*index).cloned().ok_or_else(|| {
                RunError::runtime(format!("list index {index} out of range"))
            }),
            Self::Dict(dict, key) => dict
                .borrow()
                .get(key)
                .cloned()
                .ok_or_else(|| RunError::path_not_found(key)),
            Self::Scope(scope, name) => scope
                .lookup_property(name)
                .ok_or_else(|| RunError::path_not_found(name)),
        }
    }

    pub fn write(&self, value: Value) -> RunResult<()> {
        match self {
            Self::List(list, index) => {
                let mut items = list.borrow_mut();
                let slot = items.get_mut(*index).ok_or_else(|| {
                    RunError::runtime(format!("list index {index} out of range"))
                })?;
                *slot = value;
            }
            Self::Dict(dict, key) => {
                dict.borrow_mut().insert(key.clone(), value);
            }
            Self::Scope(scope, name) => scope.set_own(name, value),
        }
        Ok(())
    }
}

/// Resolves a possibly-negative index against `len`; `None` when out of
/// range.
pub(crate) fn normalize_index(index: i64, len: usize) -> Option<usize> {
    let len = len as i64;
    let resolved = if index < 0 { len + index } else { index };
    (0..len).contains(&resolved).then_some(resolved as usize)
}

/// Clamped slice bounds; an inverted range yields an empty slice.
pub(crate) fn slice_bounds(start: Option<i64>, end: Option<i64>, len: usize) -> (usize, usize) {
    let clamp = |index: i64| -> usize {
        let len = len as i64;
        let resolved = if index < 0 { len + index } else { index };
        resolved.clamp(0, len) as usize
    };
    let lo = start.map_or(0, clamp);
    let hi = end.map_or(len, clamp);
    if lo > hi { (lo, lo) } else { (lo, hi) }
}

impl Evaluator {
    /// Materializes a view to values, applying each query node left to
    /// right against fresh data from the source.
    #[async_recursion::async_recursion(?Send)]
    pub(crate) async fn resolve_view(&self, view: &View) -> RunResult<Value> {
        let mut current = view.source.clone();
        for node in &view.query {
            current = self.apply_query_node(current, node, &view.env).await?;
        }
        Ok(current)
    }

    /// Materializes a view to write-locations. Pointers keep provenance
    /// through slices and filters so their in-order read-back equals
    /// materialization to values.
    pub(crate) async fn view_locations(&self, view: &View) -> RunResult<Vec<Location>> {
        let mut pairs = self.location_pairs(&view.source)?;
        for node in &view.query {
            pairs = self.narrow_pairs(pairs, node, &view.env).await?;
        }
        Ok(pairs.into_iter().map(|(loc, _)| loc).collect())
    }

    pub(crate) fn location_pairs(&self, source: &Value) -> RunResult<Vec<(Location, Value)>> {
        match source {
            Value::List(list) => Ok(list
                .borrow()
                .iter()
                .enumerate()
                .map(|(i, v)| (Location::List(list.clone(), i), v.clone()))
                .collect()),
            Value::Dict(dict) => Ok(dict
                .borrow()
                .iter()
                .map(|(k, v)| (Location::Dict(dict.clone(), k.clone()), v.clone()))
                .collect()),
            Value::Scope(scope) => Ok(scope
                .data_keys()
                .into_iter()
                .filter_map(|k| {
                    scope
                        .get_own(&k)
                        .map(|v| (Location::Scope(scope.clone(), k), v))
                })
                .collect()),
            other => Err(RunError::type_error(format!(
                "cannot take write locations of {}",
                other.type_name()
            ))),
        }
    }

    pub(crate) async fn narrow_pairs(
        &self,
        pairs: Vec<(Location, Value)>,
        node: &QueryNode,
        env: &ScopeRef,
    ) -> RunResult<Vec<(Location, Value)>> {
        match node {
            QueryNode::Simple(expr) => {
                let key = self.eval_expr_materialized(expr, env).await?;
                let Value::Int(index) = key else {
                    return Err(RunError::type_error(
                        "writable simple query requires an integer index",
                    ));
                };
                let Some(at) = normalize_index(index, pairs.len()) else {
                    return Err(RunError::runtime(format!("index {index} out of range")));
                };
                Ok(vec![pairs.into_iter().nth(at).expect("index checked")])
            }
            QueryNode::Slice { start, end } => {
                let (lo, hi) = self.eval_slice_bounds(start, end, pairs.len(), env).await?;
                Ok(pairs.into_iter().take(hi).skip(lo).collect())
            }
            QueryNode::Filter(filter) => {
                let mut kept = Vec::new();
                for (loc, value) in pairs {
                    if self.filter_matches(filter, &value, env).await? {
                        kept.push((loc, value));
                    }
                }
                Ok(kept)
            }
        }
    }

    pub(crate) async fn eval_slice_bounds(
        &self,
        start: &Option<crate::value::Expr>,
        end: &Option<crate::value::Expr>,
        len: usize,
        env: &ScopeRef,
    ) -> RunResult<(usize, usize)> {
        let lo = match start {
            Some(expr) => match self.eval_expr_materialized(expr, env).await? {
                Value::Int(n) => Some(n),
                _ => return Err(RunError::type_error("slice bounds must be integers")),
            },
            None => None,
        };
        let hi = match end {
            Some(expr) => match self.eval_expr_materialized(expr, env).await? {
                Value::Int(n) => Some(n),
                _ => return Err(RunError::type_error("slice bounds must be integers")),
            },
            None => None,
        };
        Ok(slice_bounds(lo, hi, len))
    }

    /// Applies one query node to a concrete value (materialization path).
    pub(crate) async fn apply_query_node(
        &self,
        current: Value,
        node: &QueryNode,
        env: &ScopeRef,
    ) -> RunResult<Value> {
        match node {
            QueryNode::Simple(expr) => {
                let key = self.eval_expr_materialized(expr, env).await?;
                self.index_value(&current, &key)
            }
            QueryNode::Slice { start, end } => match &current {
                Value::List(list) => {
                    let len = list.borrow().len();
                    let (lo, hi) = self.eval_slice_bounds(start, end, len, env).await?;
                    Ok(Value::list(list.borrow()[lo..hi].to_vec()))
                }
                Value::Str(s) | Value::IStr(s) => {
                    let chars: Vec<char> = s.chars().collect();
                    let (lo, hi) = self.eval_slice_bounds(start, end, chars.len(), env).await?;
                    Ok(Value::str(chars[lo..hi].iter().collect::<String>()))
                }
                other => Err(RunError::type_error(format!(
                    "cannot slice {}",
                    other.type_name()
                ))),
            },
            QueryNode::Filter(filter) => {
                let items: Vec<Value> = match &current {
                    Value::List(list) => list.borrow().clone(),
                    Value::Dict(dict) => dict.borrow().values().cloned().collect(),
                    other => {
                        return Err(RunError::type_error(format!(
                            "cannot filter {}",
                            other.type_name()
                        )));
                    }
                };
                let mut kept = Vec::new();
                for item in items {
                    if self.filter_matches(filter, &item, env).await? {
                        kept.push(item);
                    }
                }
                Ok(Value::list(kept))
            }
        }
    }

    /// Index/key application for simple queries and group segments.
    pub(crate) fn index_value(&self, current: &Value, key: &Value) -> RunResult<Value> {
        match current {
            Value::List(list) => {
                let Value::Int(index) = key else {
                    return Err(RunError::type_error(format!(
                        "list index must be an int, found {}",
                        key.type_name()
                    )));
                };
                let items = list.borrow();
                let Some(at) = normalize_index(*index, items.len()) else {
                    return Err(RunError::runtime(format!("index {index} out of range")));
                };
                Ok(items[at].clone())
            }
            Value::Dict(dict) => {
                let Some(name) = key.as_str() else {
                    return Err(RunError::type_error("dict key must be a string"));
                };
                dict.borrow()
                    .get(name)
                    .cloned()
                    .ok_or_else(|| RunError::path_not_found(name))
            }
            Value::Scope(scope) => {
                let Some(name) = key.as_str() else {
                    return Err(RunError::type_error("scope key must be a string"));
                };
                scope
                    .lookup_property(name)
                    .ok_or_else(|| RunError::path_not_found(name))
            }
            Value::Str(s) | Value::IStr(s) => {
                let Value::Int(index) = key else {
                    return Err(RunError::type_error("string index must be an int"));
                };
                let chars: Vec<char> = s.chars().collect();
                let Some(at) = normalize_index(*index, chars.len()) else {
                    return Err(RunError::runtime(format!("index {index} out of range")));
                };
                Ok(Value::str(chars[at].to_string()))
            }
            other => Err(RunError::type_error(format!(
                "cannot index {}",
                other.type_name()
            ))),
        }
    }

    /// Evaluates a filter against one item.
    ///
    /// Shorthand compares the item itself; predicate expressions run in an
    /// overlay where `.field` paths read the item's properties and bare
    /// names resolve in the enclosing lexical scope.
    pub(crate) async fn filter_matches(
        &self,
        filter: &Filter,
        item: &Value,
        env: &ScopeRef,
    ) -> RunResult<bool> {
        match filter {
            Filter::Compare(op, rhs) => {
                let rhs = self.eval_expr_materialized(rhs, env).await?;
                compare_values(*op, item, &rhs)
            }
            Filter::Predicate(expr) => {
                let overlay = ScopeRef::child_of(env);
                let inner = self.with_item(item.clone());
                let result = inner.eval_expr_materialized(expr, &overlay).await?;
                Ok(result.is_truthy())
            }
        }
    }
}

/// Ordered comparison used by filter shorthand and comparison builtins.
pub(crate) fn compare_values(op: CompareOp, left: &Value, right: &Value) -> RunResult<bool> {
    match op {
        CompareOp::Eq => Ok(left == right),
        CompareOp::Ne => Ok(left != right),
        _ => {
            let order = if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
                a.partial_cmp(&b)
            } else if let (Some(a), Some(b)) = (left.as_str(), right.as_str()) {
                Some(a.cmp(b))
            } else {
                None
            };
            let Some(order) = order else {
                return Err(RunError::new(
                    ErrorKind::TypeError,
                    format!(
                        "cannot compare {} with {}",
                        left.type_name(),
                        right.type_name()
                    ),
                ));
            };
            Ok(match op {
                CompareOp::Lt => order == std::cmp::Ordering::Less,
                CompareOp::Le => order != std::cmp::Ordering::Greater,
                CompareOp::Gt => order == std::cmp::Ordering::Greater,
                CompareOp::Ge => order != std::cmp::Ordering::Less,
                CompareOp::Eq | CompareOp::Ne => unreachable!("handled above"),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_normalization() {
        assert_eq!(normalize_index(0, 3), Some(0));
        assert_eq!(normalize_index(-1, 3), Some(2));
        assert_eq!(normalize_index(3, 3), None);
        assert_eq!(normalize_index(-4, 3), None);
    }

    #[test]
    fn slice_bounds_clamp_and_default() {
        assert_eq!(slice_bounds(None, None, 5), (0, 5));
        assert_eq!(slice_bounds(Some(1), Some(3), 5), (1, 3));
        assert_eq!(slice_bounds(Some(-2), None, 5), (3, 5));
        assert_eq!(slice_bounds(Some(4), Some(2), 5), (4, 4));
        assert_eq!(slice_bounds(Some(0), Some(99), 5), (0, 5));
    }

    #[test]
    fn comparisons_cover_numbers_and_strings() {
        assert!(compare_values(CompareOp::Lt, &Value::Int(1), &Value::Float(1.5)).unwrap());
        assert!(compare_values(CompareOp::Ge, &Value::str("b"), &Value::str("a")).unwrap());
        assert!(compare_values(CompareOp::Ne, &Value::Int(1), &Value::str("1")).unwrap());
        assert!(compare_values(CompareOp::Gt, &Value::Int(1), &Value::None).is_err());
    }
}
