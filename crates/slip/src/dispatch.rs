//! Multiple dispatch: generic functions, applicability and ranking.
//!
//! A [`GenericFunction`] is the single callable bound at a name; it holds an
//! ordered list of methods. Selection happens in three stages:
//!
//! 1. candidate collection - arity tiers (typed exact > typed variadic >
//!    untyped last-resort) and per-parameter applicability gates;
//! 2. ranking - lexicographic comparison of per-position score vectors
//!    `|S_j| / |A_j|`, where `S_j` is the union of the annotation's family
//!    sets and `A_j` the argument's family set;
//! 3. tie-break - guarded beats unguarded, then greater annotation detail,
//!    then larger signature family union, then definition order.
//!
//! Guard evaluation runs user code and therefore lives in the evaluator;
//! this module exposes the synchronous machinery around it.

use std::rc::Rc;

use ahash::AHashSet;

use crate::{
    error::{ErrorKind, RunError, RunResult},
    function::Function,
    registry::TypeId,
    scope::ScopeRef,
    signature::SigSpec,
    value::Value,
};

/// Primitive annotation names recognized by the dispatcher.
pub const PRIMITIVE_NAMES: &[&str] = &[
    "int", "float", "string", "i-string", "list", "dict", "scope", "function", "code", "path",
    "boolean", "none",
];

/// A callable container holding an ordered list of method implementations.
#[derive(Debug)]
pub struct GenericFunction {
    pub name: String,
    pub methods: Vec<Rc<Function>>,
}

impl GenericFunction {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    /// Appends a method; definition order is the final dispatch tie-break.
    pub fn add_method(&mut self, method: Rc<Function>) {
        self.methods.push(method);
    }
}

/// A member of a family set: a christened type or a primitive type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum FamilyMember {
    Primitive(&'static str),
    Type(TypeId),
}

/// The family set of an argument value.
///
/// Non-scopes contribute their primitive type name (i-strings additionally
/// belong to `string`). Scopes contribute every christened type reachable
/// through the prototype-parent chain and mixins, transitively and
/// de-duplicated; an un-christened scope contributes only its ancestors.
pub(crate) fn family_of_value(value: &Value) -> AHashSet<FamilyMember> {
    let mut family = AHashSet::new();
    match value {
        Value::Scope(scope) => {
            let mut visited = AHashSet::new();
            collect_scope_family(scope, &mut family, &mut visited);
        }
        Value::IStr(_) => {
            family.insert(FamilyMember::Primitive("i-string"));
            family.insert(FamilyMember::Primitive("string"));
        }
        other => {
            family.insert(FamilyMember::Primitive(primitive_name_of(other)));
        }
    }
    family
}

fn collect_scope_family(
    scope: &ScopeRef,
    family: &mut AHashSet<FamilyMember>,
    visited: &mut AHashSet<usize>,
) {
    if !visited.insert(scope.addr()) {
        return;
    }
    if let Some(id) = scope.type_id() {
        family.insert(FamilyMember::Type(id));
    }
    if let Some(parent) = scope.proto_parent() {
        collect_scope_family(&parent, family, visited);
    }
    for mixin in scope.mixins() {
        collect_scope_family(&mixin, family, visited);
    }
}

/// The primitive name used when inferring annotations from concrete values
/// (example-driven synthesis). Unknown shapes map to `string`.
pub(crate) fn primitive_name_of(value: &Value) -> &'static str {
    match value.type_name() {
        name if PRIMITIVE_NAMES.contains(&name) => name,
        _ => "string",
    }
}

/// An annotation resolved to its required types.
#[derive(Debug, Clone)]
pub(crate) enum ResolvedType {
    Primitive(&'static str),
    Scope(ScopeRef),
}

impl ResolvedType {
    fn family(&self) -> AHashSet<FamilyMember> {
        match self {
            Self::Primitive(name) => {
                let mut set = AHashSet::new();
                set.insert(FamilyMember::Primitive(*name));
                set
            }
            Self::Scope(scope) => {
                let mut set = AHashSet::new();
                let mut visited = AHashSet::new();
                collect_scope_family(scope, &mut set, &mut visited);
                set
            }
        }
    }

    fn matches(&self, arg_family: &AHashSet<FamilyMember>) -> bool {
        match self {
            Self::Primitive(name) => arg_family.contains(&FamilyMember::Primitive(*name)),
            Self::Scope(scope) => scope
                .type_id()
                .is_some_and(|id| arg_family.contains(&FamilyMember::Type(id))),
        }
    }
}

/// Resolves an annotation spec in `scope` (the method's closure at dispatch
/// time - inner type redefinitions shadow outer ones). Primitive names win
/// over lexical bindings; sig aliases flatten to unions.
pub(crate) fn resolve_spec(spec: &SigSpec, scope: &ScopeRef) -> RunResult<Vec<ResolvedType>> {
    resolve_spec_inner(spec, scope, 0)
}

fn resolve_spec_inner(spec: &SigSpec, scope: &ScopeRef, depth: u8) -> RunResult<Vec<ResolvedType>> {
    if depth > 16 {
        return Err(RunError::new(
            ErrorKind::DispatchError,
            "annotation alias chain too deep",
        ));
    }
    match spec {
        SigSpec::Name(name) => {
            if let Some(idx) = PRIMITIVE_NAMES.iter().position(|p| *p == name.as_str()) {
                return Ok(vec![ResolvedType::Primitive(PRIMITIVE_NAMES[idx])]);
            }
            match scope.lookup(name) {
                Some(Value::Scope(s)) => Ok(vec![ResolvedType::Scope(s)]),
                Some(Value::Sig(alias)) => {
                    let mut out = Vec::new();
                    for part in alias.positional.iter() {
                        out.extend(resolve_spec_inner(
                            &SigSpec::Name(part.clone()),
                            scope,
                            depth + 1,
                        )?);
                    }
                    Ok(out)
                }
                Some(other) => Err(RunError::new(
                    ErrorKind::DispatchError,
                    format!("annotation `{name}` is not a type (found {})", other.type_name()),
                )),
                None => Err(RunError::new(
                    ErrorKind::DispatchError,
                    format!("annotation `{name}` not found"),
                )),
            }
        }
        SigSpec::Union(parts) => {
            let mut out = Vec::new();
            for part in parts {
                out.extend(resolve_spec_inner(part, scope, depth + 1)?);
            }
            Ok(out)
        }
        SigSpec::Literal(value) => Err(RunError::new(
            ErrorKind::DispatchError,
            format!("literal `{value}` is not a type annotation"),
        )),
    }
}

/// Arity tiers in preference order: typed exact, typed variadic, untyped
/// exact, untyped variadic. Untyped methods are strictly lower priority
/// than any applicable typed method.
pub(crate) fn candidate_tiers(methods: &[Rc<Function>], argc: usize) -> Vec<Vec<Rc<Function>>> {
    let mut typed_exact = Vec::new();
    let mut typed_variadic = Vec::new();
    let mut untyped_exact = Vec::new();
    let mut untyped_variadic = Vec::new();
    for method in methods {
        let fixed = method.sig.fixed_arity();
        let exact = argc == fixed && !method.sig.has_rest();
        let variadic = method.sig.has_rest() && argc >= fixed;
        if !exact && !variadic {
            continue;
        }
        match (method.sig.is_untyped(), exact) {
            (false, true) => typed_exact.push(Rc::clone(method)),
            (false, false) => typed_variadic.push(Rc::clone(method)),
            (true, true) => untyped_exact.push(Rc::clone(method)),
            (true, false) => untyped_variadic.push(Rc::clone(method)),
        }
    }
    [typed_exact, typed_variadic, untyped_exact, untyped_variadic]
        .into_iter()
        .filter(|tier| !tier.is_empty())
        .collect()
}

/// Per-parameter applicability: every explicitly typed non-variadic
/// parameter must accept its argument (union annotations accept any
/// branch). An unresolvable annotation disqualifies the method rather than
/// failing the call.
pub(crate) fn is_applicable(method: &Function, args: &[Value]) -> bool {
    for (index, arg) in args.iter().enumerate() {
        let Some(spec) = method.sig.annotation_at(index) else {
            continue;
        };
        let Ok(required) = resolve_spec(spec, &method.closure) else {
            return false;
        };
        let family = family_of_value(arg);
        if !required.iter().any(|ty| ty.matches(&family)) {
            return false;
        }
    }
    true
}

/// Builds the lexicographic score vector for an applicable method: one
/// entry per call argument, `|S_j| / |A_j|` for explicitly typed positions
/// and 0.0 for untyped or variadic-covered positions.
pub(crate) fn score_vector(method: &Function, args: &[Value]) -> RunResult<Vec<f64>> {
    let mut vector = Vec::with_capacity(args.len());
    for (index, arg) in args.iter().enumerate() {
        let Some(spec) = method.sig.annotation_at(index) else {
            vector.push(0.0);
            continue;
        };
        let required = resolve_spec(spec, &method.closure)?;
        let mut sig_family: AHashSet<FamilyMember> = AHashSet::new();
        for ty in &required {
            sig_family.extend(ty.family());
        }
        let arg_family = family_of_value(arg);
        let score = if arg_family.is_empty() {
            0.0
        } else {
            sig_family.len() as f64 / arg_family.len() as f64
        };
        vector.push(score);
    }
    Ok(vector)
}

/// Total annotation detail: the sum of required-type counts across
/// parameters (tie-break 2).
fn annotation_detail(method: &Function) -> usize {
    method
        .sig
        .keywords
        .iter()
        .map(|(_, spec)| spec_width(spec))
        .sum()
}

fn spec_width(spec: &SigSpec) -> usize {
    match spec {
        SigSpec::Union(parts) => parts.iter().map(spec_width).sum(),
        _ => 1,
    }
}

/// Union of signature family sizes across parameters (tie-break 3).
fn signature_family_size(method: &Function) -> usize {
    let mut family: AHashSet<FamilyMember> = AHashSet::new();
    for (_, spec) in &method.sig.keywords {
        if let Ok(required) = resolve_spec(spec, &method.closure) {
            for ty in &required {
                family.extend(ty.family());
            }
        }
    }
    family.len()
}

/// Picks the winner among scored candidates (already guard-filtered).
///
/// `order` carries each candidate's definition index for the final
/// tie-break. Returns a dispatch error when the remaining candidates cannot
/// be distinguished.
pub(crate) fn pick_best(
    mut candidates: Vec<(Rc<Function>, Vec<f64>, usize)>,
    generic_name: &str,
) -> RunResult<Rc<Function>> {
    if candidates.is_empty() {
        return Err(RunError::new(
            ErrorKind::DispatchError,
            format!("no matching method for `{generic_name}`"),
        ));
    }
    // Lexicographic, left to right; greater value wins at the first
    // differing index.
    let best = candidates
        .iter()
        .map(|(_, v, _)| v.clone())
        .max_by(|a, b| compare_vectors(a, b))
        .expect("candidates checked non-empty");
    candidates.retain(|(_, v, _)| compare_vectors(v, &best) == std::cmp::Ordering::Equal);
    if candidates.len() > 1 {
        // 1. guarded methods beat unguarded
        if candidates.iter().any(|(m, _, _)| m.is_guarded()) {
            candidates.retain(|(m, _, _)| m.is_guarded());
        }
    }
    if candidates.len() > 1 {
        // 2. greater total annotation detail
        let max_detail = candidates
            .iter()
            .map(|(m, _, _)| annotation_detail(m))
            .max()
            .unwrap_or(0);
        candidates.retain(|(m, _, _)| annotation_detail(m) == max_detail);
    }
    if candidates.len() > 1 {
        // 3. larger union of signature family sizes
        let max_family = candidates
            .iter()
            .map(|(m, _, _)| signature_family_size(m))
            .max()
            .unwrap_or(0);
        candidates.retain(|(m, _, _)| signature_family_size(m) == max_family);
    }
    // 4. earlier definition order
    candidates.sort_by_key(|(_, _, order)| *order);
    match candidates.as_slice() {
        [] => Err(RunError::new(
            ErrorKind::DispatchError,
            format!("ambiguous method call for `{generic_name}`"),
        )),
        [(winner, _, _), ..] => Ok(Rc::clone(winner)),
    }
}

fn compare_vectors(a: &[f64], b: &[f64]) -> std::cmp::Ordering {
    for (x, y) in a.iter().zip(b.iter()) {
        match x.partial_cmp(y) {
            Some(std::cmp::Ordering::Equal) | None => continue,
            Some(order) => return order,
        }
    }
    a.len().cmp(&b.len())
}

/// Human-readable candidate summary for dispatch errors.
pub(crate) fn candidate_summary(methods: &[Rc<Function>]) -> String {
    let sigs: Vec<String> = methods.iter().map(|m| m.sig.to_string()).collect();
    sigs.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        registry::TypeRegistry,
        signature::Sig,
        value::{Code, Expr},
    };

    fn christened(reg: &mut TypeRegistry, name: &str, parent: Option<&ScopeRef>) -> ScopeRef {
        let scope = ScopeRef::new();
        if let Some(p) = parent {
            assert!(scope.set_proto_parent(p.clone()));
        }
        scope.christen(name.to_owned(), reg.register(name));
        scope
    }

    fn method(closure: &ScopeRef, keywords: Vec<(&str, &str)>) -> Rc<Function> {
        let sig = Sig {
            positional: vec![],
            keywords: keywords
                .into_iter()
                .map(|(n, t)| (n.to_owned(), SigSpec::Name(t.to_owned())))
                .collect(),
            rest: None,
            ret: None,
        };
        Rc::new(Function::new(
            Rc::new(sig),
            Rc::new(Code::new(vec![Expr::new(vec![Value::Int(0)])])),
            closure.clone(),
        ))
    }

    #[test]
    fn scope_families_walk_parents_and_mixins() {
        let mut reg = TypeRegistry::new();
        let being = christened(&mut reg, "Being", None);
        let character = christened(&mut reg, "Character", Some(&being));
        let swimmer = christened(&mut reg, "Swimmer", None);
        let player = christened(&mut reg, "Player", Some(&character));
        player.push_mixin(swimmer.clone());

        let family = family_of_value(&Value::Scope(player));
        assert_eq!(family.len(), 4);
        assert!(family.contains(&FamilyMember::Type(swimmer.type_id().unwrap())));
    }

    #[test]
    fn unchristened_instance_contributes_only_ancestors() {
        let mut reg = TypeRegistry::new();
        let being = christened(&mut reg, "Being", None);
        let player = christened(&mut reg, "Player", Some(&being));
        let instance = ScopeRef::new();
        assert!(instance.set_proto_parent(player));
        let family = family_of_value(&Value::Scope(instance));
        assert_eq!(family.len(), 2);
    }

    #[test]
    fn istring_belongs_to_both_string_families() {
        let family = family_of_value(&Value::IStr("x".into()));
        assert!(family.contains(&FamilyMember::Primitive("string")));
        assert!(family.contains(&FamilyMember::Primitive("i-string")));
    }

    #[test]
    fn specific_annotation_outscores_general() {
        // Being <- Character <- Player ; Item <- Weapon
        let mut reg = TypeRegistry::new();
        let root = ScopeRef::new();
        let being = christened(&mut reg, "Being", None);
        let character = christened(&mut reg, "Character", Some(&being));
        let player_ty = christened(&mut reg, "Player", Some(&character));
        let item = christened(&mut reg, "Item", None);
        let weapon = christened(&mut reg, "Weapon", Some(&item));
        root.set_own("Being", Value::Scope(being.clone()));
        root.set_own("Player", Value::Scope(player_ty.clone()));
        root.set_own("Item", Value::Scope(item.clone()));
        root.set_own("Weapon", Value::Scope(weapon.clone()));

        let some_player = ScopeRef::new();
        assert!(some_player.set_proto_parent(player_ty));
        let some_weapon = ScopeRef::new();
        assert!(some_weapon.set_proto_parent(weapon));
        let args = vec![Value::Scope(some_player), Value::Scope(some_weapon)];

        let m1 = method(&root, vec![("p", "Player"), ("i", "Item")]);
        let m2 = method(&root, vec![("p", "Being"), ("w", "Weapon")]);
        assert!(is_applicable(&m1, &args));
        assert!(is_applicable(&m2, &args));

        let v1 = score_vector(&m1, &args).unwrap();
        let v2 = score_vector(&m2, &args).unwrap();
        // position 0 decides: Player family 3/3 = 1.0 vs Being family 1/3
        assert!((v1[0] - 1.0).abs() < 1e-9);
        assert!(v2[0] < v1[0]);

        let winner = pick_best(vec![(Rc::clone(&m1), v1, 0), (m2, v2, 1)], "interact").unwrap();
        assert!(Rc::ptr_eq(&winner, &m1));
    }

    #[test]
    fn typed_tiers_precede_untyped() {
        let root = ScopeRef::new();
        let untyped = Rc::new(Function::new(
            Rc::new(Sig {
                positional: vec!["a".into()],
                ..Sig::default()
            }),
            Rc::new(Code::new(vec![])),
            root.clone(),
        ));
        let typed = method(&root, vec![("a", "int")]);
        let tiers = candidate_tiers(&[Rc::clone(&untyped), Rc::clone(&typed)], 1);
        assert_eq!(tiers.len(), 2);
        assert!(Rc::ptr_eq(&tiers[0][0], &typed));
        assert!(Rc::ptr_eq(&tiers[1][0], &untyped));
    }

    #[test]
    fn union_annotations_accept_any_branch() {
        let root = ScopeRef::new();
        let sig = Sig {
            positional: vec![],
            keywords: vec![(
                "x".into(),
                SigSpec::Union(vec![
                    SigSpec::Name("int".into()),
                    SigSpec::Name("float".into()),
                ]),
            )],
            rest: None,
            ret: None,
        };
        let m = Rc::new(Function::new(
            Rc::new(sig),
            Rc::new(Code::new(vec![])),
            root,
        ));
        assert!(is_applicable(&m, &[Value::Float(1.5)]));
        assert!(is_applicable(&m, &[Value::Int(1)]));
        assert!(!is_applicable(&m, &[Value::str("no")]));
    }

    #[test]
    fn no_matching_method_error_names_the_generic() {
        let err = pick_best(vec![], "frobnicate").unwrap_err();
        let RunError::Error(e) = err else {
            panic!("expected error");
        };
        assert!(e.message().contains("frobnicate"));
    }
}
