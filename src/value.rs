use std::collections::HashMap;
use std::fmt;

/// Index into the object heap. This is the GC handle.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef(pub u32);

/// A possibly-null handle. `None` is the empty list `()`.
pub type ObjPtr = Option<ObjRef>;

/// The runtime value. Every variant lives in a heap slot and is addressed
/// by `ObjRef`; values hold each other only through handles so the
/// collector can walk the graph without chasing Rust references.
#[derive(Debug)]
pub enum Object {
    Number(i64),
    Boolean(bool),
    Symbol(Symbol),
    Cell(Cell),
    Builtin(Builtin),
    Lambda(Lambda),
    Scope(Scope),
    Context(Context),
}

/// A name, plus the environment it was last looked up in. The remembered
/// context is an evaluation artifact: it is copied by `clone`, never
/// dereferenced, and never traced.
#[derive(Debug)]
pub struct Symbol {
    pub name: String,
    pub context: Option<ObjRef>,
}

/// A mutable cons pair. Either field may be any handle or null; cycles are
/// possible through `set-car!`/`set-cdr!`.
#[derive(Debug)]
pub struct Cell {
    pub first: ObjPtr,
    pub second: ObjPtr,
}

/// A user procedure: parameter symbols, body expressions, and the captured
/// defining-time environment. `context` remembers the call-site environment
/// the same way `Symbol::context` does.
#[derive(Debug)]
pub struct Lambda {
    pub params: Vec<ObjRef>,
    pub body: Vec<ObjPtr>,
    pub captured: ObjRef,
    pub context: Option<ObjRef>,
}

/// One frame of name-to-value bindings.
#[derive(Debug, Default)]
pub struct Scope {
    pub bindings: HashMap<String, ObjPtr>,
}

/// An ordered chain of scopes, outermost first. Lookup is innermost-first;
/// `define` always targets the innermost scope.
#[derive(Debug)]
pub struct Context {
    pub scopes: Vec<ObjRef>,
}

/// Identity of a built-in procedure. Builtins carry no state; the caller's
/// environment is passed to `apply` directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Add,
    Sub,
    Mul,
    Div,
    Min,
    Max,
    Abs,
    Lt,
    Le,
    NumEq,
    Gt,
    Ge,
    IsNumber,
    IsBoolean,
    IsPair,
    IsSymbol,
    IsNull,
    IsList,
    Quote,
    Not,
    And,
    Or,
    Cons,
    Car,
    Cdr,
    List,
    ListRef,
    ListTail,
    Define,
    Set,
    SetCar,
    SetCdr,
    If,
    Lambda,
}

impl Builtin {
    /// Every built-in name bound in the global scope, in the order the
    /// external interface lists them.
    pub const TABLE: [(&'static str, Builtin); 34] = [
        ("+", Builtin::Add),
        ("-", Builtin::Sub),
        ("*", Builtin::Mul),
        ("/", Builtin::Div),
        ("min", Builtin::Min),
        ("max", Builtin::Max),
        ("abs", Builtin::Abs),
        ("<", Builtin::Lt),
        ("<=", Builtin::Le),
        ("=", Builtin::NumEq),
        (">", Builtin::Gt),
        (">=", Builtin::Ge),
        ("number?", Builtin::IsNumber),
        ("boolean?", Builtin::IsBoolean),
        ("pair?", Builtin::IsPair),
        ("symbol?", Builtin::IsSymbol),
        ("null?", Builtin::IsNull),
        ("list?", Builtin::IsList),
        ("quote", Builtin::Quote),
        ("not", Builtin::Not),
        ("and", Builtin::And),
        ("or", Builtin::Or),
        ("cons", Builtin::Cons),
        ("car", Builtin::Car),
        ("cdr", Builtin::Cdr),
        ("list", Builtin::List),
        ("list-ref", Builtin::ListRef),
        ("list-tail", Builtin::ListTail),
        ("define", Builtin::Define),
        ("set!", Builtin::Set),
        ("set-car!", Builtin::SetCar),
        ("set-cdr!", Builtin::SetCdr),
        ("if", Builtin::If),
        ("lambda", Builtin::Lambda),
    ];

    /// Special forms receive their argument ASTs unevaluated and decide
    /// what to evaluate themselves. Everything else gets evaluated
    /// arguments.
    pub fn is_special_form(self) -> bool {
        matches!(
            self,
            Builtin::Quote
                | Builtin::And
                | Builtin::Or
                | Builtin::Define
                | Builtin::Set
                | Builtin::SetCar
                | Builtin::SetCdr
                | Builtin::If
                | Builtin::Lambda
        )
    }

    pub fn name(self) -> &'static str {
        Builtin::TABLE
            .iter()
            .find(|(_, op)| *op == self)
            .map(|(name, _)| *name)
            .unwrap_or("builtin")
    }
}

impl fmt::Debug for ObjRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjRef({})", self.0)
    }
}
