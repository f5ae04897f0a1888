//! Minimal evaluator for compiled filter text, standing in for the store

use aerotable::query::parse_literal;
use aerotable::value::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Open,
    Close,
    Word(String),
}

fn tokenize(filter: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut word = String::new();
    let mut in_quote = false;

    for c in filter.chars() {
        if in_quote {
            word.push(c);
            if c == '\'' {
                in_quote = false;
            }
            continue;
        }
        match c {
            '\'' => {
                word.push(c);
                in_quote = true;
            }
            '(' | ')' | ' ' => {
                if !word.is_empty() {
                    tokens.push(Token::Word(std::mem::take(&mut word)));
                }
                match c {
                    '(' => tokens.push(Token::Open),
                    ')' => tokens.push(Token::Close),
                    _ => {}
                }
            }
            other => word.push(other),
        }
    }
    if !word.is_empty() {
        tokens.push(Token::Word(word));
    }
    tokens
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    row: &'a Value,
}

impl Parser<'_> {
    fn peek_word(&self) -> Option<&str> {
        match self.tokens.get(self.pos) {
            Some(Token::Word(w)) => Some(w),
            _ => None,
        }
    }

    fn next(&mut self) -> Token {
        let token = self.tokens[self.pos].clone();
        self.pos += 1;
        token
    }

    fn or_expr(&mut self) -> bool {
        let mut result = self.and_expr();
        while self.peek_word() == Some("or") {
            self.pos += 1;
            let rhs = self.and_expr();
            result = result || rhs;
        }
        result
    }

    fn and_expr(&mut self) -> bool {
        let mut result = self.unary();
        while self.peek_word() == Some("and") {
            self.pos += 1;
            let rhs = self.unary();
            result = result && rhs;
        }
        result
    }

    fn unary(&mut self) -> bool {
        if self.peek_word() == Some("not") {
            self.pos += 1;
            return !self.unary();
        }
        match self.next() {
            Token::Open => {
                let inner = self.or_expr();
                assert_eq!(self.next(), Token::Close, "unbalanced filter");
                inner
            }
            Token::Word(column) => self.comparison(&column),
            Token::Close => panic!("unexpected ')'"),
        }
    }

    fn comparison(&mut self, column: &str) -> bool {
        let actual = self.row.member(column).cloned().unwrap_or(Value::Null);
        let op = match self.peek_word() {
            Some(op @ ("eq" | "ne" | "lt" | "le" | "gt" | "ge")) => op.to_string(),
            _ => return actual == Value::Bool(true),
        };
        self.pos += 1;
        let Token::Word(text) = self.next() else {
            panic!("comparison without a literal");
        };
        let literal = parse_literal(&text).unwrap();

        match op.as_str() {
            "eq" => actual.loosely_equals(&literal),
            "ne" => !actual.loosely_equals(&literal),
            _ => match actual.compare(&literal) {
                Some(ordering) => match op.as_str() {
                    "lt" => ordering == Ordering::Less,
                    "le" => ordering != Ordering::Greater,
                    "gt" => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                },
                None => false,
            },
        }
    }
}

/// Whether `row` satisfies `filter`
pub fn matches(filter: &str, row: &Value) -> bool {
    let mut parser = Parser {
        tokens: tokenize(filter),
        pos: 0,
        row,
    };
    let result = parser.or_expr();
    assert_eq!(parser.pos, parser.tokens.len(), "trailing tokens in {}", filter);
    result
}
