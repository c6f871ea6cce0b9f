use crate::error::{SchemeError, SchemeResult};
use crate::value::{Cell, Lambda, ObjPtr, ObjRef, Object, Symbol};

/// One heap slot. Freed slots hold `None` until the free list hands them
/// out again.
struct Slot {
    object: Option<Object>,
    mark: bool,
}

/// The object heap. Every runtime value is allocated here and addressed by
/// an `ObjRef` index; the collector owns the only path to deallocation.
pub struct Heap {
    slots: Vec<Slot>,
    free_list: Vec<ObjRef>,
    root: Option<ObjRef>,
}

impl Heap {
    pub fn new() -> Self {
        Heap {
            slots: Vec::with_capacity(1024),
            free_list: Vec::new(),
            root: None,
        }
    }

    /// Allocate an object, reusing a freed slot when one is available.
    pub fn alloc(&mut self, object: Object) -> ObjRef {
        if let Some(r) = self.free_list.pop() {
            let slot = &mut self.slots[r.0 as usize];
            slot.object = Some(object);
            slot.mark = false;
            return r;
        }
        let r = ObjRef(self.slots.len() as u32);
        self.slots.push(Slot {
            object: Some(object),
            mark: false,
        });
        r
    }

    /// Dereference a handle. A dangling handle is an interpreter bug.
    pub fn get(&self, r: ObjRef) -> &Object {
        self.slots[r.0 as usize]
            .object
            .as_ref()
            .expect("dangling object handle")
    }

    pub fn get_mut(&mut self, r: ObjRef) -> &mut Object {
        self.slots[r.0 as usize]
            .object
            .as_mut()
            .expect("dangling object handle")
    }

    /// Designate the unique trace root (the top-level context).
    pub fn set_root(&mut self, root: ObjRef) {
        self.root = Some(root);
    }

    // === Typed accessors ===

    /// The integer payload, if the value is a number.
    pub fn number(&self, ptr: ObjPtr) -> Option<i64> {
        match ptr {
            Some(r) => match self.get(r) {
                Object::Number(n) => Some(*n),
                _ => None,
            },
            None => None,
        }
    }

    pub fn as_cell(&self, ptr: ObjPtr) -> Option<&Cell> {
        match ptr {
            Some(r) => match self.get(r) {
                Object::Cell(cell) => Some(cell),
                _ => None,
            },
            None => None,
        }
    }

    pub fn is_cell(&self, ptr: ObjPtr) -> bool {
        self.as_cell(ptr).is_some()
    }

    /// The symbol's name, if the value is a symbol.
    pub fn symbol_name(&self, ptr: ObjPtr) -> Option<&str> {
        match ptr {
            Some(r) => match self.get(r) {
                Object::Symbol(symbol) => Some(symbol.name.as_str()),
                _ => None,
            },
            None => None,
        }
    }

    // === List helpers ===

    /// Flatten a cell chain into a vector of elements. A non-null improper
    /// tail becomes the final element; a non-cell non-null input becomes a
    /// one-element vector.
    pub fn list_to_vec(&self, ptr: ObjPtr) -> Vec<ObjPtr> {
        let mut items = Vec::new();
        let mut current = ptr;
        while let Some(r) = current {
            match self.get(r) {
                Object::Cell(cell) => {
                    items.push(cell.first);
                    current = cell.second;
                }
                _ => {
                    items.push(Some(r));
                    return items;
                }
            }
        }
        items
    }

    /// Build a proper list from a slice of values, null for an empty slice.
    pub fn list_from_vec(&mut self, items: &[ObjPtr]) -> ObjPtr {
        let mut result = None;
        for &item in items.iter().rev() {
            let cell = self.alloc(Object::Cell(Cell {
                first: item,
                second: result,
            }));
            result = Some(cell);
        }
        result
    }

    /// True for null and for null-terminated cell chains.
    pub fn is_proper_list(&self, ptr: ObjPtr) -> bool {
        let mut current = ptr;
        while let Some(r) = current {
            match self.get(r) {
                Object::Cell(cell) => current = cell.second,
                _ => return false,
            }
        }
        true
    }

    // === Clone ===

    /// Clone a value for insertion into a scope binding, so later mutation
    /// of the original does not alter the binding. Deep-recursive on cells,
    /// shallow on lambdas (the captured environment handle is shared),
    /// fresh allocations for atoms. The clone of null is null.
    pub fn clone_value(&mut self, ptr: ObjPtr) -> SchemeResult<ObjPtr> {
        let Some(r) = ptr else {
            return Ok(None);
        };
        if let Object::Cell(cell) = self.get(r) {
            let (first, second) = (cell.first, cell.second);
            let first = self.clone_value(first)?;
            let second = self.clone_value(second)?;
            let cloned = self.alloc(Object::Cell(Cell { first, second }));
            return Ok(Some(cloned));
        }
        let cloned = match self.get(r) {
            Object::Number(n) => Object::Number(*n),
            Object::Boolean(b) => Object::Boolean(*b),
            Object::Symbol(symbol) => Object::Symbol(Symbol {
                name: symbol.name.clone(),
                context: symbol.context,
            }),
            Object::Builtin(op) => Object::Builtin(*op),
            Object::Lambda(lambda) => Object::Lambda(Lambda {
                params: lambda.params.clone(),
                body: lambda.body.clone(),
                captured: lambda.captured,
                context: lambda.context,
            }),
            Object::Cell(_) => unreachable!("cells are cloned above"),
            Object::Scope(_) | Object::Context(_) => {
                return Err(SchemeError::runtime("clone is not implemented"));
            }
        };
        Ok(Some(self.alloc(cloned)))
    }

    // === Mark and sweep ===

    /// Run one mark-and-sweep cycle from the registered root. With no root
    /// registered, nothing is reachable and every slot is reclaimed.
    pub fn collect(&mut self) {
        for slot in &mut self.slots {
            slot.mark = false;
        }

        let mut worklist = Vec::new();
        if let Some(root) = self.root {
            self.mark_ref(root, &mut worklist);
        }
        while let Some(r) = worklist.pop() {
            self.mark_children(r, &mut worklist);
        }

        let mut freed = 0usize;
        for i in 0..self.slots.len() {
            let slot = &mut self.slots[i];
            if slot.mark {
                slot.mark = false;
            } else if slot.object.is_some() {
                slot.object = None;
                self.free_list.push(ObjRef(i as u32));
                freed += 1;
            }
        }
        tracing::debug!(freed, live = self.live_count(), "collection cycle");
    }

    /// Mark a single object and queue it for edge traversal. The mark flag
    /// short-circuits cycles.
    fn mark_ref(&mut self, r: ObjRef, worklist: &mut Vec<ObjRef>) {
        let slot = &mut self.slots[r.0 as usize];
        if !slot.mark && slot.object.is_some() {
            slot.mark = true;
            worklist.push(r);
        }
    }

    /// Push the variant-specific outgoing edges of one object. The
    /// remembered contexts of symbols and lambdas are not edges.
    fn mark_children(&mut self, r: ObjRef, worklist: &mut Vec<ObjRef>) {
        let mut edges = Vec::new();
        match self.get(r) {
            Object::Cell(cell) => {
                edges.extend(cell.first);
                edges.extend(cell.second);
            }
            Object::Lambda(lambda) => {
                edges.extend_from_slice(&lambda.params);
                edges.extend(lambda.body.iter().flatten());
                edges.push(lambda.captured);
            }
            Object::Scope(scope) => {
                edges.extend(scope.bindings.values().flatten());
            }
            Object::Context(context) => {
                edges.extend_from_slice(&context.scopes);
            }
            Object::Number(_) | Object::Boolean(_) | Object::Symbol(_) | Object::Builtin(_) => {}
        }
        for edge in edges {
            self.mark_ref(edge, worklist);
        }
    }

    // === Statistics ===

    /// Number of slots holding a live object.
    pub fn live_count(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    /// Number of slots ever allocated, freed ones included.
    pub fn total_slots(&self) -> usize {
        self.slots.len()
    }

    pub fn free_count(&self) -> usize {
        self.free_list.len()
    }
}

impl Default for Heap {
    fn default() -> Self {
        Heap::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collect_without_root_frees_everything() {
        let mut heap = Heap::new();
        heap.alloc(Object::Number(1));
        heap.alloc(Object::Number(2));
        assert_eq!(heap.live_count(), 2);
        heap.collect();
        assert_eq!(heap.live_count(), 0);
        assert_eq!(heap.free_count(), 2);
    }

    #[test]
    fn collect_keeps_the_root_chain() {
        let mut heap = Heap::new();
        let a = heap.alloc(Object::Number(1));
        let garbage = heap.alloc(Object::Number(2));
        let cell = heap.alloc(Object::Cell(Cell {
            first: Some(a),
            second: None,
        }));
        heap.set_root(cell);
        heap.collect();
        assert_eq!(heap.live_count(), 2);
        assert!(matches!(heap.get(a), Object::Number(1)));
        assert_eq!(heap.free_count(), 1);
        let _ = garbage; // swept
    }

    #[test]
    fn collect_tolerates_cycles() {
        let mut heap = Heap::new();
        let cell = heap.alloc(Object::Cell(Cell {
            first: None,
            second: None,
        }));
        if let Object::Cell(c) = heap.get_mut(cell) {
            c.first = Some(cell);
            c.second = Some(cell);
        }
        heap.set_root(cell);
        heap.collect();
        assert_eq!(heap.live_count(), 1);
    }

    #[test]
    fn freed_slots_are_reused() {
        let mut heap = Heap::new();
        heap.alloc(Object::Number(1));
        heap.collect();
        let r = heap.alloc(Object::Number(2));
        assert_eq!(r.0, 0);
        assert_eq!(heap.total_slots(), 1);
    }

    #[test]
    fn clone_is_deep_on_cells() {
        let mut heap = Heap::new();
        let n = heap.alloc(Object::Number(7));
        let inner = heap.alloc(Object::Cell(Cell {
            first: Some(n),
            second: None,
        }));
        let cloned = heap.clone_value(Some(inner)).unwrap().unwrap();
        assert_ne!(cloned, inner);
        let (first, _) = match heap.get(cloned) {
            Object::Cell(c) => (c.first.unwrap(), c.second),
            other => panic!("expected a cell, got {other:?}"),
        };
        assert_ne!(first, n);
        assert!(matches!(heap.get(first), Object::Number(7)));
    }

    #[test]
    fn clone_is_shallow_on_lambdas() {
        let mut heap = Heap::new();
        let captured = heap.alloc(Object::Context(crate::value::Context { scopes: vec![] }));
        let lambda = heap.alloc(Object::Lambda(Lambda {
            params: vec![],
            body: vec![None],
            captured,
            context: None,
        }));
        let cloned = heap.clone_value(Some(lambda)).unwrap().unwrap();
        match heap.get(cloned) {
            Object::Lambda(l) => assert_eq!(l.captured, captured),
            other => panic!("expected a lambda, got {other:?}"),
        }
    }
}
