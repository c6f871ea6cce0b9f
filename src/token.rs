use crate::error::{SchemeError, SchemeResult};

/// A classified source token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    OpenParen,
    CloseParen,
    Quote,
    Dot,
    Integer(i64),
    Symbol(String),
}

/// Byte-level scanner with one token of lookahead. Constructing the
/// tokenizer scans the first token, so construction can fail on a lexical
/// error.
pub struct Tokenizer<'a> {
    input: &'a [u8],
    pos: usize,
    current: Option<Token>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: &'a str) -> SchemeResult<Self> {
        let mut tokenizer = Tokenizer {
            input: input.as_bytes(),
            pos: 0,
            current: None,
        };
        tokenizer.scan()?;
        Ok(tokenizer)
    }

    /// True once the input is exhausted. Consumers must check this before
    /// calling `advance`.
    pub fn at_end(&self) -> bool {
        self.current.is_none()
    }

    /// The current token, without consuming it.
    pub fn peek(&self) -> Option<&Token> {
        self.current.as_ref()
    }

    /// Move to the next token. Advancing past end-of-input is a lexical
    /// error.
    pub fn advance(&mut self) -> SchemeResult<()> {
        if self.current.is_none() {
            return Err(SchemeError::syntax("no more tokens"));
        }
        self.scan()
    }

    /// Take the current token and advance over it.
    pub fn take(&mut self) -> SchemeResult<Token> {
        let token = self
            .current
            .take()
            .ok_or_else(|| SchemeError::syntax("no tokens to read"))?;
        self.scan()?;
        Ok(token)
    }

    fn scan(&mut self) -> SchemeResult<()> {
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
        if self.pos >= self.input.len() {
            self.current = None;
            return Ok(());
        }

        let ch = self.input[self.pos];
        self.pos += 1;
        self.current = Some(match ch {
            b'(' => Token::OpenParen,
            b')' => Token::CloseParen,
            b'\'' => Token::Quote,
            b'.' => Token::Dot,
            b'+' | b'-' => self.scan_signed(ch)?,
            c if c.is_ascii_digit() => self.scan_integer(self.pos - 1)?,
            c if is_symbol_start(c) => self.scan_symbol(self.pos - 1),
            other => {
                return Err(SchemeError::syntax(format!(
                    "cannot tokenize character '{}'",
                    other as char
                )));
            }
        });
        Ok(())
    }

    /// A `+` or `-` followed by digits is an integer; bare, it is a symbol.
    fn scan_signed(&mut self, sign: u8) -> SchemeResult<Token> {
        if self.pos < self.input.len() && self.input[self.pos].is_ascii_digit() {
            self.scan_integer(self.pos - 1)
        } else {
            Ok(Token::Symbol((sign as char).to_string()))
        }
    }

    fn scan_integer(&mut self, start: usize) -> SchemeResult<Token> {
        while self.pos < self.input.len() && self.input[self.pos].is_ascii_digit() {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.input[start..self.pos])
            .expect("integer tokens are ASCII");
        let value = text
            .parse::<i64>()
            .map_err(|_| SchemeError::syntax(format!("integer literal out of range: {text}")))?;
        Ok(Token::Integer(value))
    }

    fn scan_symbol(&mut self, start: usize) -> Token {
        while self.pos < self.input.len() && is_symbol_part(self.input[self.pos]) {
            self.pos += 1;
        }
        let text = std::str::from_utf8(&self.input[start..self.pos])
            .expect("symbol tokens are ASCII");
        Token::Symbol(text.to_string())
    }
}

fn is_symbol_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || matches!(c, b'<' | b'=' | b'>' | b'*' | b'/' | b'#')
}

fn is_symbol_part(c: u8) -> bool {
    is_symbol_start(c) || c.is_ascii_digit() || matches!(c, b'-' | b'?' | b'!')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_tokens(input: &str) -> Vec<Token> {
        let mut tokenizer = Tokenizer::new(input).unwrap();
        let mut tokens = Vec::new();
        while !tokenizer.at_end() {
            tokens.push(tokenizer.take().unwrap());
        }
        tokens
    }

    #[test]
    fn classifies_structural_tokens() {
        assert_eq!(
            all_tokens("(') ."),
            vec![
                Token::OpenParen,
                Token::Quote,
                Token::CloseParen,
                Token::Dot,
            ]
        );
    }

    #[test]
    fn signed_integers_and_bare_signs() {
        assert_eq!(
            all_tokens("+12 -3 + - 7"),
            vec![
                Token::Integer(12),
                Token::Integer(-3),
                Token::Symbol("+".into()),
                Token::Symbol("-".into()),
                Token::Integer(7),
            ]
        );
    }

    #[test]
    fn symbols_with_extended_characters() {
        assert_eq!(
            all_tokens("#t <= set-car! list? x2"),
            vec![
                Token::Symbol("#t".into()),
                Token::Symbol("<=".into()),
                Token::Symbol("set-car!".into()),
                Token::Symbol("list?".into()),
                Token::Symbol("x2".into()),
            ]
        );
    }

    #[test]
    fn dot_splits_adjacent_digits() {
        assert_eq!(
            all_tokens("1.5"),
            vec![Token::Integer(1), Token::Dot, Token::Integer(5)]
        );
    }

    #[test]
    fn rejects_unclassifiable_characters() {
        assert!(matches!(Tokenizer::new("@"), Err(SchemeError::Syntax(_))));
        let mut tokenizer = Tokenizer::new("(a , b)").unwrap();
        tokenizer.advance().unwrap();
        assert!(matches!(tokenizer.advance(), Err(SchemeError::Syntax(_))));
    }

    #[test]
    fn advancing_past_the_end_is_an_error() {
        let mut tokenizer = Tokenizer::new("x").unwrap();
        tokenizer.advance().unwrap();
        assert!(tokenizer.at_end());
        assert!(matches!(
            tokenizer.advance(),
            Err(SchemeError::Syntax(_))
        ));
    }

    #[test]
    fn integer_overflow_is_a_lexical_error() {
        assert!(matches!(
            Tokenizer::new("99999999999999999999"),
            Err(SchemeError::Syntax(_))
        ));
    }
}
