//! Scopes: live, mutable, lexically linked environments.
//!
//! A scope holds user `data` (ordered), reserved `meta` slots, and an
//! optional lexical parent link. Scopes are shared-reference values:
//! aliasing shares identity, and closures keep their defining scope alive.
//!
//! The property-lookup chain (own data, then mixins in order, then the
//! prototype parent) lives here because both path resolution and dispatch
//! family computation walk it.

use std::{cell::RefCell, fmt, rc::Rc};

use ahash::AHashSet;
use indexmap::IndexMap;

use crate::{registry::TypeId, value::Value};

/// Reserved metadata of a scope.
///
/// `parent` obeys the inherit-once rule: it is set at most once over the
/// scope's lifetime. `mixins` is an ordered list of scope references and is
/// never copied into the target.
#[derive(Debug, Default)]
pub struct ScopeMeta {
    pub parent: Option<ScopeRef>,
    pub mixins: Vec<ScopeRef>,
    pub name: Option<String>,
    pub type_id: Option<TypeId>,
    pub doc: Option<String>,
}

#[derive(Debug, Default)]
pub struct ScopeData {
    pub data: IndexMap<String, Value>,
    pub meta: ScopeMeta,
    pub lexical_parent: Option<ScopeRef>,
}

/// Shared handle to a scope. Identity is pointer identity.
#[derive(Debug, Clone)]
pub struct ScopeRef(Rc<RefCell<ScopeData>>);

impl ScopeRef {
    #[must_use]
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(ScopeData::default())))
    }

    #[must_use]
    pub fn child_of(parent: &Self) -> Self {
        let scope = Self::new();
        scope.0.borrow_mut().lexical_parent = Some(parent.clone());
        scope
    }

    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Stable identity for cycle guards and family sets.
    #[must_use]
    pub(crate) fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    pub fn lexical_parent(&self) -> Option<Self> {
        self.0.borrow().lexical_parent.clone()
    }

    pub fn set_lexical_parent(&self, parent: Option<Self>) {
        self.0.borrow_mut().lexical_parent = parent;
    }

    pub fn proto_parent(&self) -> Option<Self> {
        self.0.borrow().meta.parent.clone()
    }

    pub fn mixins(&self) -> Vec<Self> {
        self.0.borrow().meta.mixins.clone()
    }

    pub fn push_mixin(&self, mixin: Self) {
        self.0.borrow_mut().meta.mixins.push(mixin);
    }

    pub fn type_id(&self) -> Option<TypeId> {
        self.0.borrow().meta.type_id
    }

    pub fn type_name(&self) -> Option<String> {
        self.0.borrow().meta.name.clone()
    }

    /// Installs christening metadata (canonical name and fresh type id).
    pub fn christen(&self, name: String, type_id: TypeId) {
        let mut data = self.0.borrow_mut();
        data.meta.name = Some(name);
        data.meta.type_id = Some(type_id);
    }

    /// Sets the prototype parent, enforcing inherit-once.
    ///
    /// Returns `false` when a parent was already set.
    pub fn set_proto_parent(&self, parent: Self) -> bool {
        let mut data = self.0.borrow_mut();
        if data.meta.parent.is_some() {
            return false;
        }
        data.meta.parent = Some(parent);
        true
    }

    pub fn get_own(&self, name: &str) -> Option<Value> {
        self.0.borrow().data.get(name).cloned()
    }

    pub fn set_own(&self, name: &str, value: Value) {
        self.0.borrow_mut().data.insert(name.to_owned(), value);
    }

    pub fn remove_own(&self, name: &str) -> Option<Value> {
        self.0.borrow_mut().data.shift_remove(name)
    }

    pub fn data_len(&self) -> usize {
        self.0.borrow().data.len()
    }

    pub fn data_keys(&self) -> Vec<String> {
        self.0.borrow().data.keys().cloned().collect()
    }

    pub fn data_values(&self) -> Vec<Value> {
        self.0.borrow().data.values().cloned().collect()
    }

    /// True when the scope holds no user data.
    ///
    /// Used by delete-path pruning of cascading-empty intermediates.
    pub fn is_empty(&self) -> bool {
        self.0.borrow().data.is_empty()
    }

    /// Property lookup: own data, then each mixin in order (recursively,
    /// applying the same chain), then the prototype parent.
    ///
    /// A visited-set bounds recursion if user code has built a cyclic
    /// mixin/parent graph.
    pub fn lookup_property(&self, name: &str) -> Option<Value> {
        let mut visited = AHashSet::new();
        self.lookup_property_inner(name, &mut visited)
    }

    fn lookup_property_inner(&self, name: &str, visited: &mut AHashSet<usize>) -> Option<Value> {
        if !visited.insert(self.addr()) {
            return None;
        }
        if let Some(value) = self.get_own(name) {
            return Some(value);
        }
        for mixin in self.mixins() {
            if let Some(value) = mixin.lookup_property_inner(name, visited) {
                return Some(value);
            }
        }
        if let Some(parent) = self.proto_parent() {
            return parent.lookup_property_inner(name, visited);
        }
        None
    }

    /// Lexical lookup: the property chain of this scope, then each lexical
    /// ancestor in turn. This is the get-path rule and the key-lookup
    /// protocol the template engine sees.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            if let Some(value) = scope.lookup_property(name) {
                return Some(value);
            }
            current = scope.lexical_parent();
        }
        None
    }

    /// The scope that owns `name` along the lexical chain, if any.
    pub fn owner_of(&self, name: &str) -> Option<Self> {
        let mut current = Some(self.clone());
        while let Some(scope) = current {
            if scope.get_own(name).is_some() {
                return Some(scope);
            }
            current = scope.lexical_parent();
        }
        None
    }

    /// Deep copy: data values are copied recursively with fresh interior
    /// mutability. Type links (prototype parent, mixins) are carried by
    /// reference so the clone keeps its family; christening identity is not
    /// copied.
    #[must_use]
    pub fn deep_clone(&self) -> Self {
        let src = self.0.borrow();
        let copy = Self::new();
        {
            let mut data = copy.0.borrow_mut();
            data.data = src.data.iter().map(|(k, v)| (k.clone(), v.deep_clone())).collect();
            data.meta.parent = src.meta.parent.clone();
            data.meta.mixins = src.meta.mixins.clone();
            data.meta.doc = src.meta.doc.clone();
            data.lexical_parent = src.lexical_parent.clone();
        }
        copy
    }
}

impl Default for ScopeRef {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ScopeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.type_name() {
            Some(name) => write!(f, "scope {name}"),
            None => {
                let keys = self.data_keys();
                write!(f, "scope {{{}}}", keys.join(", "))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn own_data_shadows_parent() {
        let parent = ScopeRef::new();
        parent.set_own("x", Value::Int(1));
        let child = ScopeRef::child_of(&parent);
        child.set_own("x", Value::Int(2));
        assert_eq!(child.lookup("x"), Some(Value::Int(2)));
    }

    #[test]
    fn property_chain_order_is_data_mixins_parent() {
        let proto = ScopeRef::new();
        proto.set_own("hp", Value::Int(10));
        let mixin = ScopeRef::new();
        mixin.set_own("hp", Value::Int(20));
        mixin.set_own("mp", Value::Int(5));

        let obj = ScopeRef::new();
        assert!(obj.set_proto_parent(proto));
        obj.push_mixin(mixin);

        // mixin beats prototype parent
        assert_eq!(obj.lookup_property("hp"), Some(Value::Int(20)));
        assert_eq!(obj.lookup_property("mp"), Some(Value::Int(5)));

        obj.set_own("hp", Value::Int(1));
        assert_eq!(obj.lookup_property("hp"), Some(Value::Int(1)));
    }

    #[test]
    fn inherit_once() {
        let a = ScopeRef::new();
        let b = ScopeRef::new();
        let c = ScopeRef::new();
        assert!(a.set_proto_parent(b));
        assert!(!a.set_proto_parent(c));
    }

    #[test]
    fn cyclic_mixins_do_not_hang_lookup() {
        let a = ScopeRef::new();
        let b = ScopeRef::new();
        a.push_mixin(b.clone());
        b.push_mixin(a.clone());
        assert_eq!(a.lookup_property("missing"), None);
    }

    #[test]
    fn deep_clone_copies_data_but_keeps_family() {
        let proto = ScopeRef::new();
        let scope = ScopeRef::new();
        assert!(scope.set_proto_parent(proto.clone()));
        scope.set_own("items", Value::list(vec![Value::Int(1)]));

        let copy = scope.deep_clone();
        copy.set_own("items", Value::list(vec![Value::Int(2)]));
        assert_eq!(
            scope.get_own("items"),
            Some(Value::list(vec![Value::Int(1)]))
        );
        assert!(copy.proto_parent().unwrap().same(&proto));
    }
}
