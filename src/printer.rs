use crate::error::{SchemeError, SchemeResult};
use crate::heap::Heap;
use crate::value::{ObjPtr, ObjRef, Object};

/// Serialize a value to its textual form. Null renders as `()`.
/// Procedures, scopes, and contexts have no textual form; serializing one
/// is a runtime error.
pub fn serialize(value: ObjPtr, heap: &Heap) -> SchemeResult<String> {
    match value {
        None => Ok("()".to_string()),
        Some(r) => {
            let mut out = String::new();
            write_object(r, heap, &mut out)?;
            Ok(out)
        }
    }
}

fn write_ptr(ptr: ObjPtr, heap: &Heap, out: &mut String) -> SchemeResult<()> {
    match ptr {
        None => {
            out.push_str("()");
            Ok(())
        }
        Some(r) => write_object(r, heap, out),
    }
}

fn write_object(r: ObjRef, heap: &Heap, out: &mut String) -> SchemeResult<()> {
    match heap.get(r) {
        Object::Number(value) => {
            out.push_str(&value.to_string());
            Ok(())
        }
        Object::Boolean(value) => {
            out.push_str(if *value { "#t" } else { "#f" });
            Ok(())
        }
        Object::Symbol(symbol) => {
            out.push_str(&symbol.name);
            Ok(())
        }
        Object::Cell(cell) => {
            out.push('(');
            write_ptr(cell.first, heap, out)?;
            let mut current = cell.second;
            while let Some(next) = current {
                match heap.get(next) {
                    Object::Cell(cell) => {
                        out.push(' ');
                        write_ptr(cell.first, heap, out)?;
                        current = cell.second;
                    }
                    _ => {
                        out.push_str(" . ");
                        write_object(next, heap, out)?;
                        current = None;
                    }
                }
            }
            out.push(')');
            Ok(())
        }
        Object::Builtin(_) | Object::Lambda(_) | Object::Scope(_) | Object::Context(_) => {
            Err(SchemeError::runtime("not implemented"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::{Builtin, Cell};

    #[test]
    fn dotted_tail_only_when_improper() {
        let mut heap = Heap::new();
        let one = heap.alloc(Object::Number(1));
        let two = heap.alloc(Object::Number(2));
        let improper = heap.alloc(Object::Cell(Cell {
            first: Some(one),
            second: Some(two),
        }));
        assert_eq!(serialize(Some(improper), &heap).unwrap(), "(1 . 2)");

        let proper = heap.list_from_vec(&[Some(one), Some(two)]);
        assert_eq!(serialize(proper, &heap).unwrap(), "(1 2)");
    }

    #[test]
    fn null_fields_render_as_empty_lists() {
        let mut heap = Heap::new();
        let cell = heap.alloc(Object::Cell(Cell {
            first: None,
            second: None,
        }));
        assert_eq!(serialize(Some(cell), &heap).unwrap(), "(())");
        assert_eq!(serialize(None, &heap).unwrap(), "()");
    }

    #[test]
    fn procedures_do_not_serialize() {
        let mut heap = Heap::new();
        let builtin = heap.alloc(Object::Builtin(Builtin::Add));
        assert!(matches!(
            serialize(Some(builtin), &heap),
            Err(SchemeError::Runtime(_))
        ));
    }
}
