use crate::error::{LexError, ParseError, Position};
use std::fmt;

/// A lexical token. Strings are kept raw: no escape processing happens.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Number(f64),
    String(String),
    Ident(String),
    // Keywords
    Let,
    If,
    Then,
    Else,
    // Punctuation
    Semicolon,
    Backslash,
    Colon,
    Pipe,
    Dot,
    Star,
    Slash,
    Plus,
    Minus,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    LBracket,
    RBracket,
    Percent,
    Assign,
    EqEq,
}

impl Token {
    /// The token's kind as used in parser diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Token::Number(_) => "number",
            Token::String(_) => "string",
            Token::Ident(_) => "ident",
            Token::Let => "let",
            Token::If => "if",
            Token::Then => "then",
            Token::Else => "else",
            Token::Semicolon => ";",
            Token::Backslash => "\\",
            Token::Colon => ":",
            Token::Pipe => "|",
            Token::Dot => ".",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBrace => "{",
            Token::RBrace => "}",
            Token::Comma => ",",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::Percent => "%",
            Token::Assign => "=",
            Token::EqEq => "==",
        }
    }

    fn keyword(word: &str) -> Option<Token> {
        match word {
            "let" => Some(Token::Let),
            "if" => Some(Token::If),
            "then" => Some(Token::Then),
            "else" => Some(Token::Else),
            _ => None,
        }
    }

    fn punctuation(ch: char) -> Option<Token> {
        let token = match ch {
            ';' => Token::Semicolon,
            '\\' => Token::Backslash,
            ':' => Token::Colon,
            '|' => Token::Pipe,
            '.' => Token::Dot,
            '*' => Token::Star,
            '/' => Token::Slash,
            '+' => Token::Plus,
            '-' => Token::Minus,
            '(' => Token::LParen,
            ')' => Token::RParen,
            '{' => Token::LBrace,
            '}' => Token::RBrace,
            ',' => Token::Comma,
            '[' => Token::LBracket,
            ']' => Token::RBracket,
            '%' => Token::Percent,
            _ => return None,
        };
        Some(token)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

fn is_ws(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\r' | '\n' | '\u{a0}')
}

fn is_ident_continue(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Lexer state over the characters of the input.
struct Lexer {
    chars: Vec<char>,
    pos: usize,
}

/// Split source text into tokens, failing on the first character that
/// belongs to no token.
pub fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer {
        chars: input.chars().collect(),
        pos: 0,
    };
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    log::trace!("lexed {} token(s)", tokens.len());
    Ok(tokens)
}

impl Lexer {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn position(&self) -> Position {
        let consumed = &self.chars[..self.pos];
        let line = consumed.iter().filter(|&&c| c == '\n').count();
        let last_newline = consumed
            .iter()
            .rposition(|&c| c == '\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        Position {
            line,
            column: self.pos - last_newline,
            offset: self.pos,
        }
    }

    /// Skip whitespace and `#` line comments.
    fn skip_trivia(&mut self) {
        loop {
            while self.peek().is_some_and(is_ws) {
                self.pos += 1;
            }
            if self.peek() == Some('#') {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.pos += 1;
                }
            } else {
                break;
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, LexError> {
        self.skip_trivia();
        let ch = match self.peek() {
            Some(ch) => ch,
            None => return Ok(None),
        };

        let token = if ch.is_ascii_digit() {
            self.lex_number()
        } else if ch == '"' {
            self.lex_string()
        } else if ch.is_ascii_lowercase() {
            self.lex_word()
        } else if ch == '=' {
            if self.peek_at(1) == Some('=') {
                self.pos += 2;
                Token::EqEq
            } else {
                self.pos += 1;
                Token::Assign
            }
        } else if let Some(token) = Token::punctuation(ch) {
            self.pos += 1;
            token
        } else {
            return Err(LexError {
                character: ch,
                position: self.position(),
            });
        };
        Ok(Some(token))
    }

    /// Digits with at most one `.`; a second `.` ends the number.
    fn lex_number(&mut self) -> Token {
        let start = self.pos;
        let mut seen_dot = false;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                self.pos += 1;
            } else if ch == '.' && !seen_dot {
                seen_dot = true;
                self.pos += 1;
            } else {
                break;
            }
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        // Only digits and one dot were consumed, so this always parses.
        Token::Number(text.parse().unwrap_or(f64::NAN))
    }

    /// An unterminated string yields whatever was read before the end of input.
    fn lex_string(&mut self) -> Token {
        self.pos += 1;
        let start = self.pos;
        while self.peek().is_some_and(|c| c != '"') {
            self.pos += 1;
        }
        let text: String = self.chars[start..self.pos].iter().collect();
        if self.peek() == Some('"') {
            self.pos += 1;
        }
        Token::String(text)
    }

    fn lex_word(&mut self) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_continue) {
            self.pos += 1;
        }
        let word: String = self.chars[start..self.pos].iter().collect();
        Token::keyword(&word).unwrap_or(Token::Ident(word))
    }
}

/// Cursor over a token sequence, used by the parser.
pub struct TokenStream {
    tokens: Vec<Token>,
    pos: usize,
}

impl TokenStream {
    pub fn new(tokens: Vec<Token>) -> Self {
        TokenStream { tokens, pos: 0 }
    }

    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    pub fn advance(&mut self) {
        self.pos += 1;
    }

    /// Consume the next token if it equals `expected` (payload-free tokens only).
    pub fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, expected: &Token) -> Result<(), ParseError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.unexpected(expected.kind()))
        }
    }

    pub fn expect_ident(&mut self) -> Result<String, ParseError> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("ident")),
        }
    }

    /// Build an error describing the current token against `expected`.
    pub fn unexpected(&self, expected: &str) -> ParseError {
        ParseError {
            found: self.peek().map(|t| t.kind().to_string()),
            expected: expected.to_string(),
        }
    }

    /// Tokens not consumed by the parser.
    pub fn remaining(&self) -> &[Token] {
        &self.tokens[self.pos.min(self.tokens.len())..]
    }
}
