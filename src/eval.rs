use crate::env;
use crate::error::{SchemeError, SchemeResult};
use crate::heap::Heap;
use crate::primitives;
use crate::printer;
use crate::reader;
use crate::value::{Builtin, Lambda, ObjPtr, ObjRef, Object};

/// The interpreter: an object heap plus the rooted top-level context.
/// Each instance is fully independent; tests may construct as many as they
/// like.
pub struct Interpreter {
    heap: Heap,
    /// The top-level context. Registered as the collector's single root at
    /// construction and never replaced.
    context: ObjRef,
}

impl Interpreter {
    pub fn new() -> Self {
        let mut heap = Heap::new();
        let context = env::build_global_context(&mut heap);
        heap.set_root(context);
        Interpreter { heap, context }
    }

    /// Evaluate one expression and return its serialized result.
    ///
    /// Serialization happens before collection, since it dereferences
    /// handles; the collector then reclaims everything the run left
    /// unreachable from the top-level context. A failed run skips the
    /// collection; the next successful run picks up its garbage.
    pub fn run(&mut self, source: &str) -> SchemeResult<String> {
        tracing::trace!(source, "run");
        let ast = reader::read_expression(source, &mut self.heap)?;
        let value = self.evaluate(ast, self.context)?;
        let rendered = printer::serialize(value, &self.heap)?;
        self.heap.collect();
        Ok(rendered)
    }

    /// Heap statistics, for tests and diagnostics.
    pub fn heap(&self) -> &Heap {
        &self.heap
    }

    // === Core dispatch ===

    fn evaluate(&mut self, ast: ObjPtr, ctx: ObjRef) -> SchemeResult<ObjPtr> {
        let Some(expr) = ast else {
            return Err(SchemeError::runtime("cannot evaluate this expression"));
        };
        match self.heap.get(expr) {
            Object::Number(value) => {
                let value = *value;
                Ok(Some(self.heap.alloc(Object::Number(value))))
            }
            Object::Boolean(value) => {
                let value = *value;
                Ok(Some(self.heap.alloc(Object::Boolean(value))))
            }
            Object::Symbol(symbol) => {
                let name = symbol.name.clone();
                self.evaluate_symbol(&name, ctx)
            }
            Object::Cell(cell) => {
                let (head, tail) = (cell.first, cell.second);
                self.evaluate_application(head, tail, ctx)
            }
            _ => Err(SchemeError::runtime("cannot evaluate this expression")),
        }
    }

    /// Look a name up in the context. The bound object itself is returned
    /// (not a clone), after its remembered environment is pointed at the
    /// current one.
    fn evaluate_symbol(&mut self, name: &str, ctx: ObjRef) -> SchemeResult<ObjPtr> {
        match env::context_lookup(&self.heap, ctx, name) {
            Some(value) => {
                if let Some(r) = value {
                    self.set_context(r, ctx);
                }
                Ok(value)
            }
            None => Err(SchemeError::name(format!("unbound name '{name}'"))),
        }
    }

    /// Observable only for symbols and lambdas; a no-op everywhere else.
    fn set_context(&mut self, r: ObjRef, ctx: ObjRef) {
        match self.heap.get_mut(r) {
            Object::Symbol(symbol) => symbol.context = Some(ctx),
            Object::Lambda(lambda) => lambda.context = Some(ctx),
            _ => {}
        }
    }

    fn evaluate_application(
        &mut self,
        head: ObjPtr,
        tail: ObjPtr,
        ctx: ObjRef,
    ) -> SchemeResult<ObjPtr> {
        let callee = self.evaluate(head, ctx)?;
        let Some(callee) = callee else {
            return Err(SchemeError::runtime(
                "first element of a form must be applicable",
            ));
        };
        let args = self.heap.list_to_vec(tail);
        self.apply(callee, &args, ctx)
    }

    /// Apply a callable to raw argument ASTs. Special forms receive them
    /// unevaluated; regular built-ins and lambdas get each argument
    /// evaluated in the caller's environment.
    fn apply(&mut self, target: ObjRef, args: &[ObjPtr], ctx: ObjRef) -> SchemeResult<ObjPtr> {
        match self.heap.get(target) {
            Object::Builtin(op) => {
                let op = *op;
                if op.is_special_form() {
                    self.apply_form(op, args, ctx)
                } else {
                    let mut values = Vec::with_capacity(args.len());
                    for &arg in args {
                        values.push(self.evaluate(arg, ctx)?);
                    }
                    primitives::call_builtin(&mut self.heap, op, &values)
                }
            }
            Object::Lambda(lambda) => {
                let params = lambda.params.clone();
                let body = lambda.body.clone();
                let captured = lambda.captured;
                self.apply_lambda(&params, &body, captured, args, ctx)
            }
            _ => Err(SchemeError::runtime("this object cannot be applied")),
        }
    }

    // === Special forms ===

    fn apply_form(&mut self, op: Builtin, args: &[ObjPtr], ctx: ObjRef) -> SchemeResult<ObjPtr> {
        match op {
            Builtin::Quote => self.form_quote(args),
            Builtin::If => self.form_if(args, ctx),
            Builtin::And => self.form_and(args, ctx),
            Builtin::Or => self.form_or(args, ctx),
            Builtin::Define => self.form_define(args, ctx),
            Builtin::Set => self.form_set(args, ctx),
            Builtin::SetCar => self.form_set_cell(args, ctx, true, "set-car!"),
            Builtin::SetCdr => self.form_set_cell(args, ctx, false, "set-cdr!"),
            Builtin::Lambda => self.form_lambda(args, ctx),
            _ => unreachable!("not a special form"),
        }
    }

    /// `(quote x)` returns its argument AST verbatim.
    fn form_quote(&mut self, args: &[ObjPtr]) -> SchemeResult<ObjPtr> {
        if args.len() != 1 {
            return Err(SchemeError::runtime("quote takes exactly 1 argument"));
        }
        Ok(args[0])
    }

    fn form_if(&mut self, args: &[ObjPtr], ctx: ObjRef) -> SchemeResult<ObjPtr> {
        if args.len() != 2 && args.len() != 3 {
            return Err(SchemeError::syntax("wrong number of arguments for if"));
        }
        let condition = self.evaluate(args[0], ctx)?;
        if self.is_truthy(condition) {
            self.evaluate(args[1], ctx)
        } else if args.len() == 3 {
            self.evaluate(args[2], ctx)
        } else {
            Ok(None)
        }
    }

    /// Short-circuit conjunction: the first falsy value, else the last.
    fn form_and(&mut self, args: &[ObjPtr], ctx: ObjRef) -> SchemeResult<ObjPtr> {
        let mut last = None;
        for (i, &arg) in args.iter().enumerate() {
            let value = self.evaluate(arg, ctx)?;
            if !self.is_truthy(value) {
                return Ok(value);
            }
            if i == args.len() - 1 {
                last = Some(value);
            }
        }
        match last {
            Some(value) => Ok(value),
            None => Ok(Some(self.heap.alloc(Object::Boolean(true)))),
        }
    }

    /// Short-circuit disjunction: the first truthy value, else the last.
    fn form_or(&mut self, args: &[ObjPtr], ctx: ObjRef) -> SchemeResult<ObjPtr> {
        let mut last = None;
        for (i, &arg) in args.iter().enumerate() {
            let value = self.evaluate(arg, ctx)?;
            if self.is_truthy(value) {
                return Ok(value);
            }
            if i == args.len() - 1 {
                last = Some(value);
            }
        }
        match last {
            Some(value) => Ok(value),
            None => Ok(Some(self.heap.alloc(Object::Boolean(false)))),
        }
    }

    /// `(define name expr)` binds in the innermost scope;
    /// `(define (f p...) body...)` is sugar for binding a lambda.
    fn form_define(&mut self, args: &[ObjPtr], ctx: ObjRef) -> SchemeResult<ObjPtr> {
        if args.len() < 2 {
            return Err(SchemeError::syntax("wrong shape for define"));
        }
        let variable = match args[0].map(|r| self.heap.get(r)) {
            Some(Object::Symbol(symbol)) => Some(symbol.name.clone()),
            Some(Object::Cell(_)) => None,
            _ => return Err(SchemeError::syntax("wrong shape for define")),
        };
        match variable {
            Some(name) => {
                if args.len() != 2 {
                    return Err(SchemeError::syntax("wrong shape for define"));
                }
                let value = self.evaluate(args[1], ctx)?;
                env::context_define(&mut self.heap, ctx, &name, value)?;
            }
            None => {
                let signature = self.heap.list_to_vec(args[0]);
                let name = self
                    .heap
                    .symbol_name(signature[0])
                    .ok_or_else(|| SchemeError::syntax("wrong shape for define"))?
                    .to_string();
                let params = self.check_params(&signature[1..])?;
                let lambda = self.make_lambda(params, args[1..].to_vec(), ctx);
                env::context_define(&mut self.heap, ctx, &name, Some(lambda))?;
            }
        }
        Ok(None)
    }

    /// `(set! name expr)` requires an existing binding; the innermost one
    /// is replaced.
    fn form_set(&mut self, args: &[ObjPtr], ctx: ObjRef) -> SchemeResult<ObjPtr> {
        if args.len() != 2 {
            return Err(SchemeError::syntax("wrong shape for set!"));
        }
        let name = match args[0].map(|r| self.heap.get(r)) {
            Some(Object::Symbol(symbol)) => symbol.name.clone(),
            _ => {
                return Err(SchemeError::syntax(
                    "first argument for set! must be a symbol",
                ));
            }
        };
        if !env::context_contains(&self.heap, ctx, &name) {
            return Err(SchemeError::name(format!(
                "set! on an undefined name '{name}'"
            )));
        }
        let value = self.evaluate(args[1], ctx)?;
        env::context_change(&mut self.heap, ctx, &name, value)?;
        Ok(None)
    }

    /// `set-car!` / `set-cdr!`: mutate a cell in place. The single source
    /// of cycles in the object graph.
    fn form_set_cell(
        &mut self,
        args: &[ObjPtr],
        ctx: ObjRef,
        set_first: bool,
        what: &str,
    ) -> SchemeResult<ObjPtr> {
        if args.len() != 2 {
            return Err(SchemeError::syntax(format!("wrong shape for {what}")));
        }
        let target = self.evaluate(args[0], ctx)?;
        let Some(target) = target else {
            return Err(SchemeError::runtime(format!(
                "first operand for {what} must be a pair"
            )));
        };
        if !matches!(self.heap.get(target), Object::Cell(_)) {
            return Err(SchemeError::runtime(format!(
                "first operand for {what} must be a pair"
            )));
        }
        let value = self.evaluate(args[1], ctx)?;
        match self.heap.get_mut(target) {
            Object::Cell(cell) => {
                if set_first {
                    cell.first = value;
                } else {
                    cell.second = value;
                }
            }
            _ => unreachable!("checked to be a cell above"),
        }
        Ok(None)
    }

    /// `(lambda (p...) body...)` captures the defining environment.
    fn form_lambda(&mut self, args: &[ObjPtr], ctx: ObjRef) -> SchemeResult<ObjPtr> {
        if args.len() < 2 {
            return Err(SchemeError::syntax("wrong shape for lambda"));
        }
        if args[0].is_some() && !self.heap.is_cell(args[0]) {
            return Err(SchemeError::syntax(
                "wrong shape for the lambda parameter list",
            ));
        }
        let raw = self.heap.list_to_vec(args[0]);
        let params = self.check_params(&raw)?;
        let lambda = self.make_lambda(params, args[1..].to_vec(), ctx);
        Ok(Some(lambda))
    }

    fn check_params(&self, raw: &[ObjPtr]) -> SchemeResult<Vec<ObjRef>> {
        let mut params = Vec::with_capacity(raw.len());
        for &param in raw {
            match param {
                Some(r) if matches!(self.heap.get(r), Object::Symbol(_)) => params.push(r),
                _ => {
                    return Err(SchemeError::syntax("lambda parameters must be symbols"));
                }
            }
        }
        Ok(params)
    }

    /// The captured environment is a copy of the defining context sharing
    /// its scope frames, so bindings added to a shared frame later remain
    /// visible (mutual recursion through the global scope relies on this).
    fn make_lambda(&mut self, params: Vec<ObjRef>, body: Vec<ObjPtr>, ctx: ObjRef) -> ObjRef {
        let captured = env::copy_context(&mut self.heap, ctx);
        self.heap.alloc(Object::Lambda(Lambda {
            params,
            body,
            captured,
            context: Some(ctx),
        }))
    }

    // === Lambda application ===

    /// One activation: push a scope on the captured environment, bind the
    /// parameters, evaluate the body, and pop the scope on every exit path.
    fn apply_lambda(
        &mut self,
        params: &[ObjRef],
        body: &[ObjPtr],
        captured: ObjRef,
        args: &[ObjPtr],
        caller: ObjRef,
    ) -> SchemeResult<ObjPtr> {
        env::push_empty_scope(&mut self.heap, captured);
        let result = self.call_lambda_frame(params, body, captured, args, caller);
        env::pop_scope(&mut self.heap, captured);
        result
    }

    fn call_lambda_frame(
        &mut self,
        params: &[ObjRef],
        body: &[ObjPtr],
        captured: ObjRef,
        args: &[ObjPtr],
        caller: ObjRef,
    ) -> SchemeResult<ObjPtr> {
        if params.len() != args.len() {
            return Err(SchemeError::runtime(
                "wrong number of arguments for lambda call",
            ));
        }
        for (&param, &arg) in params.iter().zip(args) {
            let name = match self.heap.get(param) {
                Object::Symbol(symbol) => symbol.name.clone(),
                _ => unreachable!("lambda parameters are symbols"),
            };
            let value = self.evaluate(arg, caller)?;
            env::context_define(&mut self.heap, captured, &name, value)?;
        }
        let Some((&last, leading)) = body.split_last() else {
            return Ok(None);
        };
        for &expr in leading {
            self.evaluate(expr, captured)?;
        }
        self.evaluate(last, captured)
    }

    /// Only `#f` is false; every other value, null included, is true.
    fn is_truthy(&self, value: ObjPtr) -> bool {
        !matches!(
            value.map(|r| self.heap.get(r)),
            Some(Object::Boolean(false))
        )
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}
