use crate::error::{SchemeError, SchemeResult};
use crate::heap::Heap;
use crate::value::{Builtin, Cell, ObjPtr, Object};

/// Dispatch a regular built-in over already-evaluated argument values.
/// Special forms never reach this point; the evaluator handles them before
/// argument evaluation.
pub fn call_builtin(heap: &mut Heap, op: Builtin, args: &[ObjPtr]) -> SchemeResult<ObjPtr> {
    match op {
        Builtin::Add | Builtin::Sub | Builtin::Mul | Builtin::Div | Builtin::Min | Builtin::Max => {
            prim_fold(heap, op, args)
        }
        Builtin::Lt | Builtin::Le | Builtin::NumEq | Builtin::Gt | Builtin::Ge => {
            prim_compare(heap, op, args)
        }
        Builtin::Abs => prim_abs(heap, args),
        Builtin::IsNumber | Builtin::IsBoolean | Builtin::IsPair | Builtin::IsSymbol => {
            prim_predicate(heap, op, args)
        }
        Builtin::IsNull => prim_is_null(heap, args),
        Builtin::IsList => prim_is_list(heap, args),
        Builtin::Not => prim_not(heap, args),
        Builtin::Cons => prim_cons(heap, args),
        Builtin::Car => prim_car(heap, args),
        Builtin::Cdr => prim_cdr(heap, args),
        Builtin::List => Ok(heap.list_from_vec(args)),
        Builtin::ListRef => prim_list_ref(heap, args),
        Builtin::ListTail => prim_list_tail(heap, args),
        _ => unreachable!("special forms are dispatched in the evaluator"),
    }
}

fn expect_arity(args: &[ObjPtr], count: usize, what: &str) -> SchemeResult<()> {
    if args.len() != count {
        return Err(SchemeError::runtime(format!(
            "{what} takes exactly {count} argument(s)"
        )));
    }
    Ok(())
}

fn numbers(heap: &Heap, args: &[ObjPtr]) -> SchemeResult<Vec<i64>> {
    args.iter()
        .map(|&arg| {
            heap.number(arg)
                .ok_or_else(|| SchemeError::runtime("operands must be numbers"))
        })
        .collect()
}

fn number(heap: &mut Heap, value: i64) -> ObjPtr {
    Some(heap.alloc(Object::Number(value)))
}

fn boolean(heap: &mut Heap, value: bool) -> ObjPtr {
    Some(heap.alloc(Object::Boolean(value)))
}

/// Binary fold over a list of numbers. Zero-argument `+` and `*` yield
/// their identities; the other folds require at least one operand. `/`
/// rejects a zero anywhere after the first operand.
fn prim_fold(heap: &mut Heap, op: Builtin, args: &[ObjPtr]) -> SchemeResult<ObjPtr> {
    let values = numbers(heap, args)?;
    if op == Builtin::Div && values.iter().skip(1).any(|&value| value == 0) {
        return Err(SchemeError::runtime("division by zero"));
    }
    let Some((&first, rest)) = values.split_first() else {
        return match op {
            Builtin::Add => Ok(number(heap, 0)),
            Builtin::Mul => Ok(number(heap, 1)),
            _ => Err(SchemeError::runtime(format!(
                "few arguments for {}",
                op.name()
            ))),
        };
    };
    let mut result = first;
    for &value in rest {
        result = match op {
            Builtin::Add => result.checked_add(value),
            Builtin::Sub => result.checked_sub(value),
            Builtin::Mul => result.checked_mul(value),
            Builtin::Div => result.checked_div(value),
            Builtin::Min => Some(result.min(value)),
            Builtin::Max => Some(result.max(value)),
            _ => unreachable!("not a fold"),
        }
        .ok_or_else(|| SchemeError::runtime("integer overflow"))?;
    }
    Ok(number(heap, result))
}

/// `#t` when every adjacent pair satisfies the relation; vacuously true
/// for zero or one operand.
fn prim_compare(heap: &mut Heap, op: Builtin, args: &[ObjPtr]) -> SchemeResult<ObjPtr> {
    let values = numbers(heap, args)?;
    let holds = values.windows(2).all(|pair| match op {
        Builtin::Lt => pair[0] < pair[1],
        Builtin::Le => pair[0] <= pair[1],
        Builtin::NumEq => pair[0] == pair[1],
        Builtin::Gt => pair[0] > pair[1],
        Builtin::Ge => pair[0] >= pair[1],
        _ => unreachable!("not a comparison"),
    });
    Ok(boolean(heap, holds))
}

fn prim_abs(heap: &mut Heap, args: &[ObjPtr]) -> SchemeResult<ObjPtr> {
    expect_arity(args, 1, "abs")?;
    let value = heap
        .number(args[0])
        .ok_or_else(|| SchemeError::runtime("operands must be numbers"))?;
    let result = value
        .checked_abs()
        .ok_or_else(|| SchemeError::runtime("integer overflow"))?;
    Ok(number(heap, result))
}

fn prim_predicate(heap: &mut Heap, op: Builtin, args: &[ObjPtr]) -> SchemeResult<ObjPtr> {
    expect_arity(args, 1, op.name())?;
    let holds = match args[0] {
        Some(r) => matches!(
            (op, heap.get(r)),
            (Builtin::IsNumber, Object::Number(_))
                | (Builtin::IsBoolean, Object::Boolean(_))
                | (Builtin::IsPair, Object::Cell(_))
                | (Builtin::IsSymbol, Object::Symbol(_))
        ),
        None => false,
    };
    Ok(boolean(heap, holds))
}

fn prim_is_null(heap: &mut Heap, args: &[ObjPtr]) -> SchemeResult<ObjPtr> {
    expect_arity(args, 1, "null?")?;
    let holds = args[0].is_none();
    Ok(boolean(heap, holds))
}

fn prim_is_list(heap: &mut Heap, args: &[ObjPtr]) -> SchemeResult<ObjPtr> {
    expect_arity(args, 1, "list?")?;
    let holds = heap.is_proper_list(args[0]);
    Ok(boolean(heap, holds))
}

/// `#t` only for `#f`; everything else, null included, is truthy.
fn prim_not(heap: &mut Heap, args: &[ObjPtr]) -> SchemeResult<ObjPtr> {
    expect_arity(args, 1, "not")?;
    let holds = matches!(
        args[0].map(|r| heap.get(r)),
        Some(Object::Boolean(false))
    );
    Ok(boolean(heap, holds))
}

fn prim_cons(heap: &mut Heap, args: &[ObjPtr]) -> SchemeResult<ObjPtr> {
    expect_arity(args, 2, "cons")?;
    let cell = heap.alloc(Object::Cell(Cell {
        first: args[0],
        second: args[1],
    }));
    Ok(Some(cell))
}

fn prim_car(heap: &mut Heap, args: &[ObjPtr]) -> SchemeResult<ObjPtr> {
    expect_arity(args, 1, "car")?;
    let cell = heap
        .as_cell(args[0])
        .ok_or_else(|| SchemeError::runtime("operand must be a pair"))?;
    Ok(cell.first)
}

fn prim_cdr(heap: &mut Heap, args: &[ObjPtr]) -> SchemeResult<ObjPtr> {
    expect_arity(args, 1, "cdr")?;
    let cell = heap
        .as_cell(args[0])
        .ok_or_else(|| SchemeError::runtime("operand must be a pair"))?;
    Ok(cell.second)
}

/// Shared validation for `list-ref` and `list-tail`: two arguments, a
/// proper list and a non-negative index.
fn list_index_args(heap: &Heap, args: &[ObjPtr], what: &str) -> SchemeResult<(ObjPtr, i64)> {
    expect_arity(args, 2, what)?;
    if !heap.is_proper_list(args[0]) {
        return Err(SchemeError::runtime(format!(
            "first operand for {what} must be a list"
        )));
    }
    let index = heap.number(args[1]).ok_or_else(|| {
        SchemeError::runtime(format!("second operand for {what} must be a number"))
    })?;
    if index < 0 {
        return Err(SchemeError::runtime(format!(
            "second operand for {what} must be non-negative"
        )));
    }
    Ok((args[0], index))
}

fn prim_list_ref(heap: &mut Heap, args: &[ObjPtr]) -> SchemeResult<ObjPtr> {
    let (list, index) = list_index_args(heap, args, "list-ref")?;
    let mut current =
        list.ok_or_else(|| SchemeError::runtime("list-ref index out of range"))?;
    let mut count = 0;
    loop {
        let cell = match heap.get(current) {
            Object::Cell(cell) => cell,
            _ => unreachable!("validated as a proper list"),
        };
        if count == index {
            return Ok(cell.first);
        }
        match cell.second {
            Some(next) => {
                current = next;
                count += 1;
            }
            None => return Err(SchemeError::runtime("list-ref index out of range")),
        }
    }
}

/// The sublist starting at the index. The walk stops at the last cell, so
/// an index equal to the list length yields null; the out-of-range error
/// starts one past that.
fn prim_list_tail(heap: &mut Heap, args: &[ObjPtr]) -> SchemeResult<ObjPtr> {
    let (list, index) = list_index_args(heap, args, "list-tail")?;
    let mut current = list;
    let mut count = 0;
    while count != index {
        let Some(r) = current else { break };
        let Object::Cell(cell) = heap.get(r) else {
            break;
        };
        match cell.second {
            Some(next) => {
                current = Some(next);
                count += 1;
            }
            None => break,
        }
    }
    if count == index {
        Ok(current)
    } else if count == index - 1 {
        Ok(None)
    } else {
        Err(SchemeError::runtime("list-tail index out of range"))
    }
}
