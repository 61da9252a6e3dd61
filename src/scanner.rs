// Scanner/tokenizer for LOWL source.

//! Consumes a byte buffer and produces tokens with line/column positions.
//! Newlines are tokens, not whitespace; `\r\n` and a bare `\r` both count
//! as a single newline. A parenthesized expression is returned whole,
//! closing paren included, for the `OF` macro evaluator to take apart.

use crate::core::op::Opcode;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Comma,
    EndOfLine,
    EndOfInput,
    /// Bracketed label placement, e.g. `[BEGIN]`. Payload excludes brackets.
    Label(String),
    Op(Opcode),
    Variable(String),
    Number(i64),
    /// Single-quoted text. Payload excludes the quotes; `$` is kept verbatim.
    QuotedText(String),
    Macro(String),
    /// A whole parenthesized expression, parens included.
    Expression(String),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub line: u32,
    pub col: u32,
    pub kind: TokenKind,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            TokenKind::Comma => f.write_str(","),
            TokenKind::EndOfLine => f.write_str("\n"),
            TokenKind::EndOfInput => Ok(()),
            TokenKind::Label(name) => write!(f, "[{name}]"),
            TokenKind::Op(code) => f.write_str(code.mnemonic()),
            TokenKind::Variable(name) => f.write_str(name),
            TokenKind::Number(n) => write!(f, "{n}"),
            TokenKind::QuotedText(text) => write!(f, "'{text}'"),
            TokenKind::Macro(name) => f.write_str(name),
            TokenKind::Expression(expr) => f.write_str(expr),
            TokenKind::Error(msg) => write!(f, "?{msg}?"),
        }
    }
}

/// Render a token stream back to source text with canonical delimiters:
/// one space between tokens, none around commas or newlines.
pub fn render_tokens(tokens: &[Token]) -> String {
    let mut out = String::new();
    let mut needs_space = false;
    let mut after_macro = false;
    for tok in tokens {
        match &tok.kind {
            TokenKind::EndOfInput => break,
            TokenKind::EndOfLine => {
                out.push('\n');
                needs_space = false;
            }
            TokenKind::Comma => {
                out.push(',');
                needs_space = false;
            }
            TokenKind::Expression(expr) if after_macro => {
                // an expression glues onto the macro that owns it
                out.push_str(expr);
                needs_space = true;
            }
            _ => {
                if needs_space {
                    out.push(' ');
                }
                out.push_str(&tok.to_string());
                needs_space = true;
            }
        }
        after_macro = matches!(tok.kind, TokenKind::Macro(_));
    }
    out
}

pub struct Scanner<'a> {
    input: &'a [u8],
    pos: usize,
    line: u32,
    col: u32,
    finished: bool,
}

impl<'a> Scanner<'a> {
    pub fn new(input: &'a [u8]) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
            col: 0,
            finished: false,
        }
    }

    /// Collect tokens up to and including the first error or end of input.
    pub fn tokens(input: &'a [u8]) -> Vec<Token> {
        let mut tokens = Vec::new();
        for tok in Scanner::new(input) {
            let stop = matches!(tok.kind, TokenKind::Error(_) | TokenKind::EndOfInput);
            tokens.push(tok);
            if stop {
                break;
            }
        }
        tokens
    }

    pub fn next_token(&mut self) -> Token {
        while let Some(b' ') | Some(b'\t') = self.peek_byte() {
            self.next_byte();
        }

        let (line, col) = self.peek_position();
        let ch = match self.next_byte() {
            Some(ch) => ch,
            None => return token(line, col, TokenKind::EndOfInput),
        };

        match ch {
            b'\n' => token(line, col, TokenKind::EndOfLine),
            b',' => token(line, col, TokenKind::Comma),
            b'\'' => self.scan_quoted(line, col),
            b'[' => self.scan_label(line, col),
            b'(' => self.scan_expression(line, col),
            _ if ch.is_ascii_alphabetic() => self.scan_identifier(line, col, ch),
            _ if ch.is_ascii_digit() => self.scan_number(line, col, ch),
            b'-' if self.peek_byte().is_some_and(|b| b.is_ascii_digit()) => {
                self.scan_number(line, col, ch)
            }
            _ => token(
                line,
                col,
                TokenKind::Error(format!("unexpected input {:?}", ch as char)),
            ),
        }
    }

    fn scan_identifier(&mut self, line: u32, col: u32, first: u8) -> Token {
        let mut text = String::from(first as char);
        while let Some(ch) = self.peek_byte() {
            if !ch.is_ascii_alphanumeric() {
                break;
            }
            self.next_byte();
            text.push(ch as char);
        }
        let kind = if text == "OF" {
            TokenKind::Macro(text)
        } else if first.is_ascii_uppercase() {
            match Opcode::lookup(&text) {
                Some(code) => TokenKind::Op(code),
                None => TokenKind::Variable(text),
            }
        } else {
            TokenKind::Variable(text)
        };
        token(line, col, kind)
    }

    fn scan_number(&mut self, line: u32, col: u32, first: u8) -> Token {
        let mut text = String::from(first as char);
        while let Some(ch) = self.peek_byte() {
            if !ch.is_ascii_digit() {
                break;
            }
            self.next_byte();
            text.push(ch as char);
        }
        match text.parse::<i64>() {
            Ok(n) => token(line, col, TokenKind::Number(n)),
            Err(err) => token(line, col, TokenKind::Error(format!("bad number: {err}"))),
        }
    }

    fn scan_quoted(&mut self, line: u32, col: u32) -> Token {
        let mut text = String::new();
        loop {
            match self.next_byte() {
                Some(b'\'') => return token(line, col, TokenKind::QuotedText(text)),
                Some(b'\n') | None => {
                    return token(
                        line,
                        col,
                        TokenKind::Error("unterminated quoted text".to_string()),
                    )
                }
                Some(ch) => text.push(ch as char),
            }
        }
    }

    fn scan_label(&mut self, line: u32, col: u32) -> Token {
        let mut name = String::new();
        match self.next_byte() {
            Some(ch) if ch.is_ascii_alphabetic() => name.push(ch as char),
            _ => return token(line, col, TokenKind::Error("invalid label".to_string())),
        }
        loop {
            match self.next_byte() {
                Some(b']') => return token(line, col, TokenKind::Label(name)),
                Some(ch) if ch.is_ascii_alphanumeric() => name.push(ch as char),
                _ => return token(line, col, TokenKind::Error("invalid label".to_string())),
            }
        }
    }

    fn scan_expression(&mut self, line: u32, col: u32) -> Token {
        let mut expr = String::from("(");
        loop {
            match self.next_byte() {
                Some(b'\n') | None => {
                    return token(
                        line,
                        col,
                        TokenKind::Error("unterminated expression".to_string()),
                    )
                }
                Some(ch) => {
                    expr.push(ch as char);
                    if ch == b')' {
                        return token(line, col, TokenKind::Expression(expr));
                    }
                }
            }
        }
    }

    /// Position the next byte will carry, without consuming it.
    fn peek_position(&self) -> (u32, u32) {
        (self.line, self.col + 1)
    }

    fn peek_byte(&self) -> Option<u8> {
        match self.input.get(self.pos).copied() {
            Some(b'\r') => Some(b'\n'),
            other => other,
        }
    }

    fn next_byte(&mut self) -> Option<u8> {
        let mut ch = self.input.get(self.pos).copied()?;
        self.pos += 1;
        if ch == b'\r' {
            if self.input.get(self.pos) == Some(&b'\n') {
                self.pos += 1;
            }
            ch = b'\n';
        }
        if ch == b'\n' {
            self.line += 1;
            self.col = 0;
        } else {
            self.col += 1;
        }
        Some(ch)
    }
}

fn token(line: u32, col: u32, kind: TokenKind) -> Token {
    Token { line, col, kind }
}

impl Iterator for Scanner<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        let tok = self.next_token();
        if tok.kind == TokenKind::EndOfInput {
            self.finished = true;
        }
        Some(tok)
    }
}
