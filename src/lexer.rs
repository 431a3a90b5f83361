use crate::ast::Token;
use crate::duration::Duration;
use std::fmt;
use thiserror::Error;

/// Line and column of a character in the query text, both starting at 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, char {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LexError {
    #[error("found unexpected character '{ch}' at {position}")]
    UnexpectedChar { ch: char, position: Position },

    #[error("unterminated string starting at {position}")]
    UnterminatedString { position: Position },

    #[error("unterminated quoted identifier starting at {position}")]
    UnterminatedIdentifier { position: Position },

    #[error("unterminated regex starting at {position}")]
    UnterminatedRegex { position: Position },

    #[error("bad escape sequence '\\{ch}' at {position}")]
    InvalidEscape { ch: char, position: Position },

    #[error("unable to parse number '{text}' at {position}")]
    InvalidNumber { text: String, position: Position },

    #[error("invalid duration '{text}' at {position}")]
    InvalidDuration { text: String, position: Position },
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    line: usize,
    column: usize,
    token_start: Position,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            token_start: Position { line: 1, column: 1 },
        }
    }

    /// Where the most recently returned token begins.
    pub fn token_position(&self) -> Position {
        self.token_start
    }

    fn here(&self) -> Position {
        Position {
            line: self.line,
            column: self.column,
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).copied()
    }

    fn advance(&mut self) {
        if self.current_char() == Some('\n') {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        self.position += 1;
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.current_char() {
                Some(ch) if ch.is_whitespace() => self.advance(),
                Some('-') if self.peek_char(1) == Some('-') => {
                    while let Some(ch) = self.current_char() {
                        if ch == '\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    /// Read a quoted run of characters; the opening quote is the current character.
    fn read_quoted(&mut self, quote: char) -> Result<String, LexError> {
        let start = self.here();
        let mut result = String::new();
        self.advance();

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    let escape_at = self.here();
                    self.advance();
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('\\') => result.push('\\'),
                        Some('\'') => result.push('\''),
                        Some('"') => result.push('"'),
                        Some(ch) => {
                            return Err(LexError::InvalidEscape {
                                ch,
                                position: escape_at,
                            });
                        }
                        None => break,
                    }
                    self.advance();
                }
                '\n' if quote == '\'' => break,
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        if quote == '"' {
            Err(LexError::UnterminatedIdentifier { position: start })
        } else {
            Err(LexError::UnterminatedString { position: start })
        }
    }

    /// Read the body of a `/regex/` literal.
    ///
    /// Called by the parser after it has seen the opening slash in operand
    /// position. Only `\/` is unescaped; every other escape is kept for the
    /// regex engine.
    pub fn read_regex(&mut self) -> Result<String, LexError> {
        let start = self.token_start;
        let mut result = String::new();

        while let Some(ch) = self.current_char() {
            match ch {
                '/' => {
                    self.advance();
                    return Ok(result);
                }
                '\\' if self.peek_char(1) == Some('/') => {
                    result.push('/');
                    self.advance();
                    self.advance();
                }
                '\\' => {
                    result.push('\\');
                    self.advance();
                    if let Some(next) = self.current_char() {
                        result.push(next);
                        self.advance();
                    }
                }
                '\n' => break,
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError::UnterminatedRegex { position: start })
    }

    fn read_unit(&mut self) -> String {
        let mut unit = String::new();
        while let Some(ch) = self.current_char() {
            if is_unit_start(ch) {
                unit.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        unit
    }

    fn read_digits(&mut self) -> String {
        let mut digits = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                digits.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        digits
    }

    /// Read a number written right after a unary minus, sign included, so
    /// that `-9223372036854775808` fits an `i64`.
    ///
    /// Called by the parser once it has seen the minus. Returns `None`, and
    /// consumes nothing but whitespace, when no number follows.
    pub fn read_negative_number(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_whitespace_and_comments();
        let starts_number = match self.current_char() {
            Some(ch) if ch.is_ascii_digit() => true,
            Some('.') => self.peek_char(1).is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        };
        if !starts_number {
            return Ok(None);
        }
        self.token_start = self.here();
        self.read_signed_number(true).map(Some)
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        self.read_signed_number(false)
    }

    fn read_signed_number(&mut self, negative: bool) -> Result<Token, LexError> {
        let start = self.here();
        let mut number = if negative { String::from("-") } else { String::new() };
        number.push_str(&self.read_digits());
        let mut is_float = false;

        if self.current_char() == Some('.') && self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            number.push('.');
            self.advance();
            number.push_str(&self.read_digits());
        }

        if self.current_char().is_some_and(is_unit_start) {
            if is_float {
                let unit = self.read_unit();
                return Err(LexError::InvalidDuration {
                    text: format!("{}{}", number, unit),
                    position: start,
                });
            }
            let digits = number.trim_start_matches('-').to_string();
            let duration = self.read_duration(digits, start)?;
            if negative {
                return Ok(Token::Duration(Duration::from_nanos(-duration.nanos())));
            }
            return Ok(Token::Duration(duration));
        }

        if is_float {
            number
                .parse::<f64>()
                .map(Token::Float)
                .map_err(|_| LexError::InvalidNumber {
                    text: number,
                    position: start,
                })
        } else {
            number
                .parse::<i64>()
                .map(Token::Integer)
                .map_err(|_| LexError::InvalidNumber {
                    text: number,
                    position: start,
                })
        }
    }

    /// Read the unit of a duration and any further `<int><unit>` segments (`1h30m`).
    fn read_duration(&mut self, first: String, start: Position) -> Result<Duration, LexError> {
        let mut text = first.clone();
        let mut digits = first;
        let mut total = Duration::ZERO;

        loop {
            let unit = self.read_unit();
            text.push_str(&unit);
            let segment = digits
                .parse::<i64>()
                .ok()
                .and_then(|value| Duration::from_unit(value, &unit))
                .and_then(|segment| total.checked_add(segment));
            total = match segment {
                Some(total) => total,
                None => {
                    return Err(LexError::InvalidDuration {
                        text,
                        position: start,
                    });
                }
            };

            if !self.current_char().is_some_and(|c| c.is_ascii_digit()) {
                return Ok(total);
            }
            digits = self.read_digits();
            text.push_str(&digits);
            if !self.current_char().is_some_and(is_unit_start) {
                return Err(LexError::InvalidDuration {
                    text,
                    position: start,
                });
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace_and_comments();
        self.token_start = self.here();

        let token = match self.current_char() {
            None => Token::Eof,
            Some(',') => {
                self.advance();
                Token::Comma
            }
            Some(';') => {
                self.advance();
                Token::Semicolon
            }
            Some('(') => {
                self.advance();
                Token::LParen
            }
            Some(')') => {
                self.advance();
                Token::RParen
            }
            Some('+') => {
                self.advance();
                Token::Plus
            }
            Some('-') => {
                self.advance();
                Token::Minus
            }
            Some('*') => {
                self.advance();
                Token::Star
            }
            Some('/') => {
                self.advance();
                Token::Slash
            }
            Some('%') => {
                self.advance();
                Token::Percent
            }
            Some('.') if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) => {
                self.read_number()?
            }
            Some('.') => {
                self.advance();
                Token::Dot
            }
            Some(':') if self.peek_char(1) == Some(':') => {
                self.advance();
                self.advance();
                Token::DoubleColon
            }
            Some('=') => {
                self.advance();
                if self.current_char() == Some('~') {
                    self.advance();
                    Token::EqRegex
                } else {
                    Token::Eq
                }
            }
            Some('!') => match self.peek_char(1) {
                Some('=') => {
                    self.advance();
                    self.advance();
                    Token::NotEq
                }
                Some('~') => {
                    self.advance();
                    self.advance();
                    Token::NotEqRegex
                }
                _ => {
                    return Err(LexError::UnexpectedChar {
                        ch: '!',
                        position: self.token_start,
                    });
                }
            },
            Some('<') => match self.peek_char(1) {
                Some('=') => {
                    self.advance();
                    self.advance();
                    Token::LtEq
                }
                Some('>') => {
                    self.advance();
                    self.advance();
                    Token::NotEq
                }
                _ => {
                    self.advance();
                    Token::Lt
                }
            },
            Some('>') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Token::GtEq
                } else {
                    self.advance();
                    Token::Gt
                }
            }
            Some('\'') => Token::String(self.read_quoted('\'')?),
            Some('"') => Token::Identifier(self.read_quoted('"')?),
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let ident = self.read_identifier();
                Token::keyword(&ident).unwrap_or(Token::Identifier(ident))
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number()?,
            Some(ch) => {
                return Err(LexError::UnexpectedChar {
                    ch,
                    position: self.token_start,
                });
            }
        };
        Ok(token)
    }
}

fn is_unit_start(ch: char) -> bool {
    ch.is_ascii_alphabetic() || ch == 'µ'
}

#[test]
fn test_keywords_are_case_insensitive() {
    let mut lexer = Lexer::new("select FROM Where and OR true");
    assert_eq!(lexer.next_token(), Ok(Token::Select));
    assert_eq!(lexer.next_token(), Ok(Token::From));
    assert_eq!(lexer.next_token(), Ok(Token::Where));
    assert_eq!(lexer.next_token(), Ok(Token::And));
    assert_eq!(lexer.next_token(), Ok(Token::Or));
    assert_eq!(lexer.next_token(), Ok(Token::Boolean(true)));
    assert_eq!(lexer.next_token(), Ok(Token::Eof));
}

#[test]
fn test_compound_duration() {
    let mut lexer = Lexer::new("1h30m");
    assert_eq!(
        lexer.next_token(),
        Ok(Token::Duration(Duration::from_nanos(90 * crate::duration::MINUTE)))
    );
}

#[test]
fn test_regex_is_read_on_demand() {
    let mut lexer = Lexer::new(r"/^cpu\/\d+$/ x");
    assert_eq!(lexer.next_token(), Ok(Token::Slash));
    assert_eq!(lexer.read_regex(), Ok(r"^cpu/\d+$".to_string()));
    assert_eq!(lexer.next_token(), Ok(Token::Identifier("x".to_string())));
}
