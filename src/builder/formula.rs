//! Formula tokenizer.
//!
//! Splits a formula into typed tokens. It recognizes enough of the grammar to
//! find references, literals and function names reliably; it does not build an
//! expression tree. Text inside string literals never yields references or
//! numbers.

use crate::model::Reference;

/// Kind of a formula token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Number,
    Text,
    Bool,
    Error,
    Reference,
    /// Function name; the opening parenthesis is a separate token
    Function,
    /// A defined name or anything else that looks like an identifier
    Name,
    Operator,
    Separator,
    OpenParen,
    CloseParen,
}

/// One token with its source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
}

impl Token {
    fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
        }
    }

    /// Parsed reference, for `Reference` tokens.
    #[must_use]
    pub fn reference(&self) -> Option<Reference> {
        if self.kind == TokenKind::Reference {
            Reference::parse(&self.text)
        } else {
            None
        }
    }

    /// Numeric value, for `Number` tokens.
    #[must_use]
    pub fn number(&self) -> Option<f64> {
        if self.kind == TokenKind::Number {
            self.text.parse().ok()
        } else {
            None
        }
    }
}

const ERROR_LITERALS: &[&str] = &[
    "#DIV/0!", "#N/A", "#NAME?", "#NULL!", "#NUM!", "#REF!", "#VALUE!", "#GETTING_DATA",
];

/// Tokenize a formula. A leading `=` is optional. Never fails: unknown
/// characters become single-character operators.
#[must_use]
pub fn tokenize(formula: &str) -> Vec<Token> {
    Lexer::new(formula).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(formula: &str) -> Self {
        let body = formula.trim_start();
        let body = body.strip_prefix('=').unwrap_or(body);
        Self {
            chars: body.chars().collect(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn slice(&self, start: usize) -> String {
        self.chars[start..self.pos].iter().collect()
    }

    fn push(&mut self, kind: TokenKind, text: impl Into<String>) {
        self.tokens.push(Token::new(kind, text));
    }

    fn run(mut self) -> Vec<Token> {
        while let Some(c) = self.peek() {
            match c {
                c if c.is_whitespace() => self.pos += 1,
                '"' => self.string_literal(),
                '\'' => self.quoted_reference(),
                '[' => self.external_reference(),
                '#' => self.error_literal(),
                '0'..='9' => self.number_or_rows(),
                '.' if self.peek_at(1).is_some_and(|n| n.is_ascii_digit()) => self.number_or_rows(),
                '(' => {
                    self.pos += 1;
                    self.push(TokenKind::OpenParen, "(");
                }
                ')' => {
                    self.pos += 1;
                    self.push(TokenKind::CloseParen, ")");
                }
                ',' | ';' | '{' | '}' => {
                    self.pos += 1;
                    self.push(TokenKind::Separator, c.to_string());
                }
                c if is_identifier_start(c) => self.identifier(),
                _ => self.operator(),
            }
        }
        self.tokens
    }

    fn string_literal(&mut self) {
        self.pos += 1;
        let mut text = String::new();
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == '"' {
                if self.peek() == Some('"') {
                    text.push('"');
                    self.pos += 1;
                    continue;
                }
                break;
            }
            text.push(c);
        }
        self.push(TokenKind::Text, text);
    }

    /// `'Sheet name'!A1` or `'[Book]Sheet'!A1`.
    fn quoted_reference(&mut self) {
        let start = self.pos;
        self.pos += 1;
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == '\'' {
                if self.peek() == Some('\'') {
                    self.pos += 1;
                    continue;
                }
                break;
            }
        }
        if self.peek() == Some('!') {
            self.pos += 1;
            self.reference_tail();
            self.push_reference_or_name(start);
        } else {
            let text = self.slice(start);
            self.push(TokenKind::Name, text);
        }
    }

    /// `[Book.xlsx]Sheet!A1`.
    fn external_reference(&mut self) {
        let start = self.pos;
        while let Some(c) = self.peek() {
            self.pos += 1;
            if c == ']' {
                break;
            }
        }
        while self.peek().is_some_and(is_identifier_char) {
            self.pos += 1;
        }
        if self.peek() == Some('!') {
            self.pos += 1;
            self.reference_tail();
        }
        self.push_reference_or_name(start);
    }

    fn error_literal(&mut self) {
        let rest: String = self.chars[self.pos..].iter().collect();
        let upper = rest.to_ascii_uppercase();
        if let Some(code) = ERROR_LITERALS.iter().find(|code| upper.starts_with(*code)) {
            self.pos += code.chars().count();
            self.push(TokenKind::Error, *code);
        } else {
            self.operator();
        }
    }

    /// A number, or a whole-row reference such as `3:5`.
    fn number_or_rows(&mut self) {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.pos += 1;
        }
        let integer_end = self.pos;
        if self.peek() == Some(':') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit() || c == '$') {
            self.pos += 1;
            self.reference_tail();
            let text = self.slice(start);
            if Reference::parse(&text).is_some() {
                self.push(TokenKind::Reference, text);
                return;
            }
            self.pos = integer_end;
        }

        if self.peek() == Some('.') {
            self.pos += 1;
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let mark = self.pos;
            self.pos += 1;
            if matches!(self.peek(), Some('+' | '-')) {
                self.pos += 1;
            }
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.pos += 1;
                }
            } else {
                self.pos = mark;
            }
        }
        let text = self.slice(start);
        self.push(TokenKind::Number, text);
    }

    fn identifier(&mut self) {
        let start = self.pos;
        while self.peek().is_some_and(is_identifier_char) {
            self.pos += 1;
        }
        let word = self.slice(start);

        match self.peek() {
            Some('(') => {
                self.push(TokenKind::Function, word.to_ascii_uppercase());
                return;
            }
            Some('!') => {
                self.pos += 1;
                self.reference_tail();
                self.push_reference_or_name(start);
                return;
            }
            _ => {}
        }

        if word.eq_ignore_ascii_case("TRUE") || word.eq_ignore_ascii_case("FALSE") {
            self.push(TokenKind::Bool, word.to_ascii_uppercase());
            return;
        }

        // A1:B2 or A:C
        if self.peek() == Some(':') {
            let mark = self.pos;
            self.pos += 1;
            let tail_start = self.pos;
            while self.peek().is_some_and(|c| c.is_ascii_alphanumeric() || c == '$') {
                self.pos += 1;
            }
            if self.pos > tail_start {
                let text = self.slice(start);
                if Reference::parse(&text).is_some() {
                    self.push(TokenKind::Reference, text);
                    return;
                }
            }
            self.pos = mark;
        }

        if Reference::parse(&word).is_some() {
            self.push(TokenKind::Reference, word);
        } else {
            self.push(TokenKind::Name, word);
        }
    }

    /// Consume the cell part after `!`: `A1`, `$A$1:B2`, `A:A`, `1:3`.
    fn reference_tail(&mut self) {
        let part = |c: char| c.is_ascii_alphanumeric() || c == '$';
        while self.peek().is_some_and(part) {
            self.pos += 1;
        }
        if self.peek() == Some(':') && self.peek_at(1).is_some_and(part) {
            self.pos += 1;
            while self.peek().is_some_and(part) {
                self.pos += 1;
            }
        }
    }

    fn push_reference_or_name(&mut self, start: usize) {
        let text = self.slice(start);
        if Reference::parse(&text).is_some() {
            self.push(TokenKind::Reference, text);
        } else {
            self.push(TokenKind::Name, text);
        }
    }

    fn operator(&mut self) {
        let c = self.chars[self.pos];
        self.pos += 1;
        let two = match (c, self.peek()) {
            ('<', Some('=')) | ('>', Some('=')) | ('<', Some('>')) => {
                self.pos += 1;
                true
            }
            _ => false,
        };
        let text = if two {
            self.slice(self.pos - 2)
        } else {
            c.to_string()
        };
        self.push(TokenKind::Operator, text);
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$' || c == '\\'
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$' || c == '.' || c == '\\'
}

/// Numeric literal tokens of a formula.
#[must_use]
pub fn numeric_literals(tokens: &[Token]) -> Vec<f64> {
    tokens.iter().filter_map(Token::number).collect()
}

/// Whether parentheses balance. Unbalanced formulas are still used for
/// dependency extraction but recorded as build issues.
#[must_use]
pub fn is_balanced(tokens: &[Token]) -> bool {
    let mut depth: i64 = 0;
    for token in tokens {
        match token.kind {
            TokenKind::OpenParen => depth += 1,
            TokenKind::CloseParen => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}

/// Function names called by a formula, upper-cased.
pub fn functions(tokens: &[Token]) -> impl Iterator<Item = &str> {
    tokens
        .iter()
        .filter(|t| t.kind == TokenKind::Function)
        .map(|t| t.text.as_str())
}
