use core::fmt;
use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use dashmap::DashMap;
use thiserror::Error;
use tracing::trace;

use crate::object::{Closure, Hash, Object};

/// Binding name of the extra-arguments array inside a call frame.
pub const CURRENT_ARGS: &str = "...";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutability {
    Constant,
    Mutable,
}

#[derive(Debug, Clone)]
struct Binding {
    value: Object,
    mutability: Mutability,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssignError {
    #[error("cannot assign to undeclared identifier: {name}")]
    Undeclared { name: String },
    #[error("cannot assign to constant: {name}")]
    Constant { name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScopeKind {
    Global,
    /// Scope of one function call.
    Frame,
    /// Loop bodies and builtin calls.
    Block,
}

/// One lexical scope. Lookups walk outwards through `outer`.
///
/// Closures hold their defining scope strongly, so a frame that stores a
/// closure over itself forms a cycle. Once the call has returned
/// ([`Environment::release`]) the frame is audited again whenever a handle
/// to one of its closures is dropped, and cleared as soon as nothing
/// outside the frame can reach it.
pub struct Environment {
    store: DashMap<String, Binding>,
    outer: Option<Arc<Environment>>,
    call_depth: usize,
    kind: ScopeKind,
    open: AtomicBool,
}

impl Environment {
    fn with_kind(outer: Option<&Arc<Environment>>, call_depth: usize, kind: ScopeKind) -> Arc<Self> {
        Arc::new(Self {
            store: DashMap::new(),
            outer: outer.map(Arc::clone),
            call_depth,
            kind,
            open: AtomicBool::new(true),
        })
    }

    pub fn new_global() -> Arc<Self> {
        Self::with_kind(None, 0, ScopeKind::Global)
    }

    /// Child scope for loop bodies and builtin calls.
    pub fn new_enclosed(outer: &Arc<Environment>) -> Arc<Self> {
        Self::with_kind(Some(outer), outer.call_depth, ScopeKind::Block)
    }

    /// Scope of a function call at the given nesting depth.
    pub fn new_frame(outer: &Arc<Environment>, call_depth: usize) -> Arc<Self> {
        Self::with_kind(Some(outer), call_depth, ScopeKind::Frame)
    }

    pub fn outer(&self) -> Option<&Arc<Environment>> {
        self.outer.as_ref()
    }

    pub fn call_depth(&self) -> usize {
        self.call_depth
    }

    /// False once the call owning this frame has returned.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub fn get(&self, name: &str) -> Option<Object> {
        if let Some(binding) = self.store.get(name) {
            return Some(binding.value.clone());
        }
        self.outer.as_ref()?.get(name)
    }

    /// Binds `name` in this scope, shadowing any outer binding.
    pub fn define(&self, name: impl Into<String>, value: Object, mutability: Mutability) {
        let previous = self.store.insert(name.into(), Binding { value, mutability });
        drop(previous);
    }

    /// Rebinds the nearest visible `name`.
    pub fn assign(&self, name: &str, value: Object) -> Result<(), AssignError> {
        if let Some(mut binding) = self.store.get_mut(name) {
            if binding.mutability == Mutability::Constant {
                return Err(AssignError::Constant {
                    name: name.to_string(),
                });
            }
            let previous = std::mem::replace(&mut binding.value, value);
            // Dropping a closure may audit this scope, so not under the lock.
            drop(binding);
            drop(previous);
            return Ok(());
        }
        match &self.outer {
            Some(outer) => outer.assign(name, value),
            None => Err(AssignError::Undeclared {
                name: name.to_string(),
            }),
        }
    }

    pub fn contains_local(&self, name: &str) -> bool {
        self.store.contains_key(name)
    }

    /// Local binding names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.store.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Local bindings as a hash keyed by name, in name order. The call
    /// frame's `...` array is left out.
    pub fn to_hash(&self) -> Hash {
        let mut bindings: Vec<(String, Object)> = self
            .store
            .iter()
            .filter(|e| e.key() != CURRENT_ARGS)
            .map(|e| (e.key().clone(), e.value().value.clone()))
            .collect();
        bindings.sort_by(|a, b| a.0.cmp(&b.0));

        let mut hash = Hash::new();
        for (name, value) in bindings {
            hash.insert_str(&name, value);
        }
        hash
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Drops every local binding. Values are dropped after they have left
    /// the map.
    pub fn clear(&self) {
        let names: Vec<String> = self.store.iter().map(|e| e.key().clone()).collect();
        let removed: Vec<Binding> = names
            .iter()
            .filter_map(|name| self.store.remove(name))
            .map(|(_, binding)| binding)
            .collect();
        drop(removed);
    }

    /// Called when the call owning this frame returns.
    ///
    /// Marks the frame closed and clears it if every remaining reference
    /// comes from closures and scopes the frame itself holds. A frame that
    /// escaped through a returned closure, a container or a running task is
    /// kept, and audited again when handles to its closures are dropped.
    pub fn release(self: Arc<Self>) {
        self.open.store(false, Ordering::Release);
        if Arc::strong_count(&self) == 1 {
            return;
        }
        let address = Arc::as_ptr(&self) as usize;
        Self::reclaim(&self, address, None);
    }

    /// Hook for [`Closure`]'s `Drop`.
    pub(crate) fn closure_dropped(closure: &Closure) {
        let scope = closure.env();
        let Some(frame) = Self::enclosing_frame(scope) else {
            return;
        };
        if frame.is_open() {
            return;
        }
        if Closure::handle_count(closure) > 1 {
            Self::reclaim(frame, Closure::address(closure), None);
        } else {
            // The function goes with this handle, and so does its hold on
            // the scope it captured.
            Self::reclaim(frame, Arc::as_ptr(scope) as usize, Some(scope));
        }
    }

    /// Audits `frame` while one reference to the node at `released` is on
    /// its way out.
    fn reclaim(frame: &Arc<Environment>, released: usize, scope: Option<&Arc<Environment>>) {
        let mut census = Census::new(frame);
        census.scope(frame);
        if let Some(scope) = scope.filter(|scope| Self::is_within(scope, frame)) {
            census.scope(scope);
        }

        let garbage = census.garbage(released);
        if garbage.is_empty() {
            return;
        }
        trace!(scopes = garbage.len(), "reclaiming call frame");
        for scope in &garbage {
            scope.clear();
        }
    }

    fn enclosing_frame(scope: &Arc<Environment>) -> Option<&Arc<Environment>> {
        let mut current = scope;
        loop {
            match current.kind {
                ScopeKind::Frame => return Some(current),
                ScopeKind::Global => return None,
                ScopeKind::Block => current = current.outer.as_ref()?,
            }
        }
    }

    /// Whether `scope` is `frame` or nested inside it.
    fn is_within(scope: &Arc<Environment>, frame: &Arc<Environment>) -> bool {
        let mut current = Some(scope);
        while let Some(env) = current {
            if Arc::ptr_eq(env, frame) {
                return true;
            }
            current = env.outer.as_ref();
        }
        false
    }
}

#[derive(Default)]
struct Node {
    strong: usize,
    /// References held by other nodes of the census.
    internal: usize,
    edges: Vec<usize>,
    scope: Option<Arc<Environment>>,
}

impl Node {
    fn counted(strong: usize) -> Self {
        Self {
            strong,
            ..Default::default()
        }
    }
}

/// Trial deletion over the scopes, closures and containers reachable from
/// one finished frame. A node referenced more often than the census can
/// account for is held from outside, and so is everything it reaches.
/// Scopes nothing outside can reach are garbage.
struct Census<'a> {
    frame: &'a Arc<Environment>,
    /// Keyed by allocation address.
    nodes: HashMap<usize, Node>,
}

impl<'a> Census<'a> {
    fn new(frame: &'a Arc<Environment>) -> Self {
        Self {
            frame,
            nodes: HashMap::new(),
        }
    }

    fn scope(&mut self, env: &Arc<Environment>) -> usize {
        let address = Arc::as_ptr(env) as usize;
        if self.nodes.contains_key(&address) {
            return address;
        }
        let strong = Arc::strong_count(env);
        self.nodes.insert(
            address,
            Node {
                strong,
                scope: Some(Arc::clone(env)),
                ..Default::default()
            },
        );

        for entry in env.store.iter() {
            if let Some(target) = self.object(&entry.value().value) {
                self.link(address, target);
            }
        }
        if let Some(outer) = env.outer.as_ref() {
            if Environment::is_within(outer, self.frame) {
                let target = self.scope(outer);
                self.link(address, target);
            }
        }
        address
    }

    fn object(&mut self, object: &Object) -> Option<usize> {
        match object {
            Object::Function(function) => {
                let address = Closure::address(function);
                if !self.nodes.contains_key(&address) {
                    self.nodes
                        .insert(address, Node::counted(Closure::handle_count(function)));
                    if Environment::is_within(function.env(), self.frame) {
                        let target = self.scope(function.env());
                        self.link(address, target);
                    }
                }
                Some(address)
            }
            Object::Array(array) => {
                let address = Arc::as_ptr(array) as usize;
                if !self.nodes.contains_key(&address) {
                    self.nodes.insert(address, Node::counted(Arc::strong_count(array)));
                    for element in &array.elements {
                        if let Some(target) = self.object(element) {
                            self.link(address, target);
                        }
                    }
                }
                Some(address)
            }
            Object::Hash(hash) => {
                let address = Arc::as_ptr(hash) as usize;
                if !self.nodes.contains_key(&address) {
                    self.nodes.insert(address, Node::counted(Arc::strong_count(hash)));
                    for value in hash.values() {
                        if let Some(target) = self.object(value) {
                            self.link(address, target);
                        }
                    }
                }
                Some(address)
            }
            _ => None,
        }
    }

    fn link(&mut self, from: usize, to: usize) {
        if let Some(node) = self.nodes.get_mut(&to) {
            node.internal += 1;
        }
        if let Some(node) = self.nodes.get_mut(&from) {
            node.edges.push(to);
        }
    }

    /// Scopes left unreachable once one reference to `released` is gone.
    /// Empty while the frame itself is still reachable.
    fn garbage(mut self, released: usize) -> Vec<Arc<Environment>> {
        if let Some(node) = self.nodes.get_mut(&released) {
            node.strong = node.strong.saturating_sub(1);
        }

        let mut reachable = HashSet::new();
        let mut pending: Vec<usize> = self
            .nodes
            .iter()
            .filter(|(_, node)| node.strong > node.internal)
            .map(|(address, _)| *address)
            .collect();
        while let Some(address) = pending.pop() {
            if !reachable.insert(address) {
                continue;
            }
            if let Some(node) = self.nodes.get(&address) {
                pending.extend(node.edges.iter().copied());
            }
        }

        if reachable.contains(&(Arc::as_ptr(self.frame) as usize)) {
            return Vec::new();
        }
        self.nodes
            .into_iter()
            .filter(|(address, _)| !reachable.contains(address))
            .filter_map(|(_, node)| node.scope)
            .collect()
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("names", &self.names())
            .field("call_depth", &self.call_depth)
            .field("has_outer", &self.outer.is_some())
            .finish()
    }
}
