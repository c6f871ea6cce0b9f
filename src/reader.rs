use crate::error::{SchemeError, SchemeResult};
use crate::heap::Heap;
use crate::token::{Token, Tokenizer};
use crate::value::{Cell, ObjPtr, ObjRef, Object, Symbol};

/// Recursive-descent reader: builds the cons-cell AST directly on the heap.
pub struct Reader<'a, 'h> {
    tokens: Tokenizer<'a>,
    heap: &'h mut Heap,
}

impl<'a, 'h> Reader<'a, 'h> {
    pub fn new(input: &'a str, heap: &'h mut Heap) -> SchemeResult<Self> {
        Ok(Reader {
            tokens: Tokenizer::new(input)?,
            heap,
        })
    }

    pub fn at_end(&self) -> bool {
        self.tokens.at_end()
    }

    /// Read one datum. Dispatches on the next token.
    pub fn read_datum(&mut self) -> SchemeResult<ObjPtr> {
        match self.tokens.take()? {
            Token::Integer(value) => Ok(Some(self.heap.alloc(Object::Number(value)))),
            Token::Symbol(name) => {
                let object = if name == "#t" || name == "#f" {
                    Object::Boolean(name == "#t")
                } else {
                    Object::Symbol(Symbol {
                        name,
                        context: None,
                    })
                };
                Ok(Some(self.heap.alloc(object)))
            }
            Token::Quote => {
                if self.tokens.at_end() {
                    return Err(SchemeError::syntax("quote without a datum"));
                }
                let datum = self.read_datum()?;
                Ok(Some(self.quote(datum)))
            }
            Token::OpenParen => {
                let list = self.read_list()?;
                if !matches!(self.tokens.peek(), Some(Token::CloseParen)) {
                    return Err(SchemeError::syntax("expected ')' to close a list"));
                }
                self.tokens.advance()?;
                Ok(list)
            }
            Token::CloseParen => Err(SchemeError::syntax("unexpected ')'")),
            Token::Dot => Err(SchemeError::syntax("'.' outside a list tail")),
        }
    }

    /// Read list elements up to (but not consuming) the closing paren.
    /// A dot between elements reads exactly one more datum as the improper
    /// tail; the caller then requires the close paren, so anything after
    /// the tail datum is rejected there.
    fn read_list(&mut self) -> SchemeResult<ObjPtr> {
        if matches!(self.tokens.peek(), Some(Token::CloseParen)) {
            return Ok(None);
        }
        let first = self.read_datum()?;
        let second = match self.tokens.peek() {
            Some(Token::CloseParen) => None,
            Some(Token::Dot) => {
                self.tokens.advance()?;
                self.read_datum()?
            }
            _ => self.read_list()?,
        };
        Ok(Some(self.heap.alloc(Object::Cell(Cell { first, second }))))
    }

    /// Wrap a datum as the two-cell list `(quote datum)`.
    fn quote(&mut self, datum: ObjPtr) -> ObjRef {
        let quote = self.heap.alloc(Object::Symbol(Symbol {
            name: "quote".to_string(),
            context: None,
        }));
        let inner = self.heap.alloc(Object::Cell(Cell {
            first: datum,
            second: None,
        }));
        self.heap.alloc(Object::Cell(Cell {
            first: Some(quote),
            second: Some(inner),
        }))
    }
}

/// Read exactly one expression from a source string. Leftover tokens after
/// the datum are a syntax error.
pub fn read_expression(input: &str, heap: &mut Heap) -> SchemeResult<ObjPtr> {
    let mut reader = Reader::new(input, heap)?;
    let datum = reader.read_datum()?;
    if !reader.at_end() {
        return Err(SchemeError::syntax("leftover tokens after the expression"));
    }
    Ok(datum)
}
