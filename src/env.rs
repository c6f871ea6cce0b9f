use std::collections::HashMap;

use crate::error::SchemeResult;
use crate::heap::Heap;
use crate::value::{Builtin, Context, ObjPtr, ObjRef, Object, Scope};

/// Build the top-level context: a single scope binding every built-in name.
pub fn build_global_context(heap: &mut Heap) -> ObjRef {
    let mut bindings = HashMap::new();
    for &(name, op) in Builtin::TABLE.iter() {
        let builtin = heap.alloc(Object::Builtin(op));
        bindings.insert(name.to_string(), Some(builtin));
    }
    let scope = heap.alloc(Object::Scope(Scope { bindings }));
    heap.alloc(Object::Context(Context {
        scopes: vec![scope],
    }))
}

fn scopes(heap: &Heap, ctx: ObjRef) -> &[ObjRef] {
    match heap.get(ctx) {
        Object::Context(context) => &context.scopes,
        _ => unreachable!("context handle must refer to a context"),
    }
}

fn scope_bindings(heap: &Heap, scope: ObjRef) -> &HashMap<String, ObjPtr> {
    match heap.get(scope) {
        Object::Scope(scope) => &scope.bindings,
        _ => unreachable!("scope handle must refer to a scope"),
    }
}

fn scope_bindings_mut(heap: &mut Heap, scope: ObjRef) -> &mut HashMap<String, ObjPtr> {
    match heap.get_mut(scope) {
        Object::Scope(scope) => &mut scope.bindings,
        _ => unreachable!("scope handle must refer to a scope"),
    }
}

/// True if any scope of the context binds the name.
pub fn context_contains(heap: &Heap, ctx: ObjRef, name: &str) -> bool {
    scopes(heap, ctx)
        .iter()
        .any(|&scope| scope_bindings(heap, scope).contains_key(name))
}

/// The bound value from the innermost scope containing the name, or `None`
/// if nothing binds it. The inner `ObjPtr` may itself be null.
pub fn context_lookup(heap: &Heap, ctx: ObjRef, name: &str) -> Option<ObjPtr> {
    for &scope in scopes(heap, ctx).iter().rev() {
        if let Some(&value) = scope_bindings(heap, scope).get(name) {
            return Some(value);
        }
    }
    None
}

/// Bind a name in the innermost scope. The value is cloned first so later
/// mutation of the original does not reach through the binding.
pub fn context_define(
    heap: &mut Heap,
    ctx: ObjRef,
    name: &str,
    value: ObjPtr,
) -> SchemeResult<()> {
    let innermost = *scopes(heap, ctx)
        .last()
        .expect("a context always holds at least one scope");
    let cloned = heap.clone_value(value)?;
    scope_bindings_mut(heap, innermost).insert(name.to_string(), cloned);
    Ok(())
}

/// Replace an existing binding in the innermost scope that contains the
/// name; silently does nothing when no scope does. The caller is expected
/// to have checked `context_contains` first.
pub fn context_change(
    heap: &mut Heap,
    ctx: ObjRef,
    name: &str,
    value: ObjPtr,
) -> SchemeResult<()> {
    let target = scopes(heap, ctx)
        .iter()
        .rev()
        .copied()
        .find(|&scope| scope_bindings(heap, scope).contains_key(name));
    if let Some(scope) = target {
        let cloned = heap.clone_value(value)?;
        scope_bindings_mut(heap, scope).insert(name.to_string(), cloned);
    }
    Ok(())
}

/// Push a fresh empty scope for a lambda activation.
pub fn push_empty_scope(heap: &mut Heap, ctx: ObjRef) {
    let scope = heap.alloc(Object::Scope(Scope::default()));
    match heap.get_mut(ctx) {
        Object::Context(context) => context.scopes.push(scope),
        _ => unreachable!("context handle must refer to a context"),
    }
}

/// Pop the innermost scope. The scope object itself stays on the heap
/// until the collector finds it unreachable.
pub fn pop_scope(heap: &mut Heap, ctx: ObjRef) {
    match heap.get_mut(ctx) {
        Object::Context(context) => {
            context.scopes.pop();
        }
        _ => unreachable!("context handle must refer to a context"),
    }
}

/// Allocate a new context holding the same scope handles. Used when a
/// lambda captures its defining environment: the frames are shared, the
/// chain itself is not.
pub fn copy_context(heap: &mut Heap, ctx: ObjRef) -> ObjRef {
    let scopes = scopes(heap, ctx).to_vec();
    heap.alloc(Object::Context(Context { scopes }))
}
