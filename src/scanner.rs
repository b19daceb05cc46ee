//! Module `scanner` implements a one‑pass, streaming lexer for the Mani language.
//!
//! It transforms source text into a sequence of [`Token`]s, skipping whitespace
//! and comments, and emitting exactly one `EOF` token at the end. Designed as a
//! `FusedIterator`, it can be chained safely with other iterator adapters.
//!
//! # Public API
//!
//! - `Scanner::new(src, file_name) -> Scanner<'a>`
//!   Create a new lexer over the input text.
//!
//! - `impl Iterator for Scanner<'a>`
//!   Yields `Result<Token, ManiError>` on each `.next()`. An `Err` reports a
//!   lexing error with line information; scanning resumes right after it so a
//!   single pass surfaces every lexical error in the file.
//!
//! - `scan(src, file_name, diagnostics) -> Vec<Token>`
//!   Drains a scanner, routing errors into a [`Diagnostics`] collector.
//!
//! # Token Recognition
//!
//! - Single‑character tokens: `(`, `)`, `{`, `}`, `[`, `]`, `,`, `.`, `;`.
//! - Greedy two‑character operators: `!=`, `==`, `<=`, `>=`, `+=`, `-=`, `*=`,
//!   `/=`, `++`, `--`, `->`.
//! - Comments: `//` to end of line (bulk skipped with `memchr`) and `/* … */`.
//! - String literals with `\n \t \r \" \\ \0` escapes; unterminated strings are
//!   reported.
//! - Numeric literals: integer with optional fractional part, one token kind.
//! - Identifiers/keywords: alphanumeric/_ sequences resolved via a perfect‑hash
//!   `KEYWORDS` map.

use std::iter::FusedIterator;
use std::rc::Rc;

use log::{debug, info, trace};
use memchr::{memchr, memchr2};
use phf::phf_map;

use crate::diagnostics::Diagnostics;
use crate::error::{ManiError, Result};
use crate::token::{Token, TokenType};

// ─────────────────────────────────────────────────────────────────────────────
// Static keyword map (compile‑time perfect hash)
// ─────────────────────────────────────────────────────────────────────────────

static KEYWORDS: phf::Map<&'static [u8], TokenType> = phf_map! {
    b"and"    => TokenType::AND,
    b"break"  => TokenType::BREAK,
    b"class"  => TokenType::CLASS,
    b"else"   => TokenType::ELSE,
    b"false"  => TokenType::FALSE,
    b"fn"     => TokenType::FN,
    b"for"    => TokenType::FOR,
    b"fun"    => TokenType::RESERVED,
    b"if"     => TokenType::IF,
    b"let"    => TokenType::LET,
    b"loop"   => TokenType::LOOP,
    b"nil"    => TokenType::NIL,
    b"or"     => TokenType::OR,
    b"print"  => TokenType::PRINT,
    b"return" => TokenType::RETURN,
    b"super"  => TokenType::SUPER,
    b"this"   => TokenType::THIS,
    b"true"   => TokenType::TRUE,
    b"while"  => TokenType::WHILE,
};

/// A single pass **scanner / lexer** that converts source text into a
/// sequence of [`Token`]s stamped with line and file name.
pub struct Scanner<'a> {
    src: &'a str,               // entire source text
    bytes: &'a [u8],            // byte view of `src` used for matching
    file: Rc<str>,              // stamped onto every token
    start: usize,               // index of the *first* byte of the current lexeme
    curr: usize,                // index *one past* the last byte examined
    line: usize,                // 1‑based line counter (\n increments)
    pending: Option<TokenType>, // recognised token kind waiting to be emitted
}

impl<'a> Scanner<'a> {
    /// Create a new lexer over `src`, attributing tokens to `file_name`.
    #[inline]
    pub fn new(src: &'a str, file_name: &str) -> Self {
        info!("Scanner created over {} bytes of {}", src.len(), file_name);

        Self {
            src,
            bytes: src.as_bytes(),
            file: Rc::from(file_name),
            start: 0,
            curr: 0,
            line: 1,
            pending: None,
        }
    }

    // ───────────────────────────── primitive helpers ────────────────────────

    #[inline(always)]
    const fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline(always)]
    fn is_at_end(&self) -> bool {
        self.curr >= self.len()
    }

    /// Advance one byte and return it. Callers guard with [`is_at_end`].
    #[inline(always)]
    fn advance(&mut self) -> u8 {
        let b = self.bytes[self.curr];
        self.curr += 1;
        b
    }

    /// Peek at the current byte without consuming it. `0` past EOF.
    #[inline(always)]
    fn peek(&self) -> u8 {
        if self.is_at_end() {
            0
        } else {
            self.bytes[self.curr]
        }
    }

    #[inline(always)]
    fn peek_next(&self) -> u8 {
        if self.curr + 1 >= self.len() {
            0
        } else {
            self.bytes[self.curr + 1]
        }
    }

    /// Conditionally consume a byte **iff** it matches `expected`.
    #[inline(always)]
    fn match_byte(&mut self, expected: u8) -> bool {
        if !self.is_at_end() && self.peek() == expected {
            self.advance();
            true
        } else {
            false
        }
    }

    #[inline]
    fn error<S: Into<String>>(&self, msg: S) -> ManiError {
        ManiError::lex(self.line, &self.file, msg)
    }

    // ───────────────────────────── core lexing ─────────────────────────────

    /// Scan a *single* token starting at `self.curr`. If the lexeme produces an
    /// actual token its kind is stored in `self.pending`. Whitespace and
    /// comments leave `pending = None`.
    fn scan_token(&mut self) -> Result<()> {
        let b = self.advance();

        let tt = match b {
            // ── single‑character punctuators ──────────────────────────────
            b'(' => TokenType::LEFT_PAREN,
            b')' => TokenType::RIGHT_PAREN,
            b'{' => TokenType::LEFT_BRACE,
            b'}' => TokenType::RIGHT_BRACE,
            b'[' => TokenType::LEFT_SQUARE,
            b']' => TokenType::RIGHT_SQUARE,
            b',' => TokenType::COMMA,
            b'.' => TokenType::DOT,
            b';' => TokenType::SEMICOLON,

            // ── operators with a greedy second character ─────────────────
            b'+' => {
                if self.match_byte(b'+') {
                    TokenType::PLUS_PLUS
                } else if self.match_byte(b'=') {
                    TokenType::PLUS_EQUAL
                } else {
                    TokenType::PLUS
                }
            }

            b'-' => {
                if self.match_byte(b'-') {
                    TokenType::MINUS_MINUS
                } else if self.match_byte(b'=') {
                    TokenType::MINUS_EQUAL
                } else if self.match_byte(b'>') {
                    TokenType::VAR_ARROW
                } else {
                    TokenType::MINUS
                }
            }

            b'*' => {
                if self.match_byte(b'=') {
                    TokenType::STAR_EQUAL
                } else {
                    TokenType::STAR
                }
            }

            b'!' => {
                if self.match_byte(b'=') {
                    TokenType::BANG_EQUAL
                } else {
                    TokenType::BANG
                }
            }

            b'=' => {
                if self.match_byte(b'=') {
                    TokenType::EQUAL_EQUAL
                } else {
                    TokenType::EQUAL
                }
            }

            b'<' => {
                if self.match_byte(b'=') {
                    TokenType::LESS_EQUAL
                } else {
                    TokenType::LESS
                }
            }

            b'>' => {
                if self.match_byte(b'=') {
                    TokenType::GREATER_EQUAL
                } else {
                    TokenType::GREATER
                }
            }

            // ── comments (// … until newline, /* … */) or slash ─────────
            b'/' => {
                if self.match_byte(b'/') {
                    // Fast‑forward to next newline; if none, skip to EOF.
                    match memchr(b'\n', &self.bytes[self.curr..]) {
                        Some(pos) => self.curr += pos,
                        None => self.curr = self.len(),
                    }

                    return Ok(());
                }

                if self.match_byte(b'*') {
                    return self.skip_block_comment();
                }

                if self.match_byte(b'=') {
                    TokenType::SLASH_EQUAL
                } else {
                    TokenType::SLASH
                }
            }

            // ── whitespace / newline ─────────────────────────────────────
            b' ' | b'\r' | b'\t' => return Ok(()),

            b'\n' => {
                self.line += 1;

                return Ok(());
            }

            b'"' => return self.parse_string(),

            b'0'..=b'9' => self.parse_number(),

            b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.parse_identifier(),

            // ── unexpected character ─────────────────────────────────────
            _ => {
                // Step over the whole code point so one stray character is
                // reported once, not once per UTF‑8 byte.
                let ch = self.src[self.start..].chars().next().unwrap_or('\u{fffd}');
                self.curr = self.start + ch.len_utf8();

                return Err(self.error(format!("Unexpected character '{}'.", ch)));
            }
        };

        self.pending = Some(tt);

        Ok(())
    }

    /// Skip a `/* … */` comment; `self.curr` sits just past the opening `/*`.
    fn skip_block_comment(&mut self) -> Result<()> {
        loop {
            match memchr2(b'*', b'\n', &self.bytes[self.curr..]) {
                Some(pos) => {
                    self.curr += pos;

                    if self.advance() == b'\n' {
                        self.line += 1;
                    } else if self.match_byte(b'/') {
                        return Ok(());
                    }
                }

                None => {
                    self.curr = self.len();

                    return Err(self.error("Unterminated block comment."));
                }
            }
        }
    }

    /// Parse a double‑quoted string literal, decoding escapes.
    ///
    /// * `self.start` points to the opening `"`.
    /// * When we return, `self.curr` points **past** the closing `"`.
    fn parse_string(&mut self) -> Result<()> {
        let mut value = String::new();
        let mut bad_escape: Option<char> = None;
        let mut run_start = self.curr;

        while !self.is_at_end() && self.peek() != b'"' {
            match self.advance() {
                b'\n' => self.line += 1, // multi‑line strings are allowed
                b'\\' => {
                    value.push_str(&self.src[run_start..self.curr - 1]);

                    let decoded = match self.peek() {
                        b'n' => Some('\n'),
                        b't' => Some('\t'),
                        b'r' => Some('\r'),
                        b'"' => Some('"'),
                        b'\\' => Some('\\'),
                        b'0' => Some('\0'),
                        _ => None,
                    };

                    match decoded {
                        Some(ch) => {
                            value.push(ch);
                            self.advance();
                        }
                        None if !self.is_at_end() => {
                            let ch = self.src[self.curr..].chars().next().unwrap_or('\u{fffd}');
                            bad_escape.get_or_insert(ch);
                            self.curr += ch.len_utf8();

                            if ch == '\n' {
                                self.line += 1;
                            }
                        }
                        None => {}
                    }

                    run_start = self.curr;
                }
                _ => {}
            }
        }

        if self.is_at_end() {
            return Err(self.error("Unterminated string."));
        }

        value.push_str(&self.src[run_start..self.curr]);
        self.advance(); // closing quote

        if let Some(ch) = bad_escape {
            return Err(self.error(format!("Invalid escape sequence '\\{}'.", ch)));
        }

        self.pending = Some(TokenType::STRING(value));

        Ok(())
    }

    /// Parse a numeric literal (`123`, `3.14`). Fractions are optional.
    fn parse_number(&mut self) -> TokenType {
        while self.peek().is_ascii_digit() {
            self.advance();
        }

        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.advance(); // consume "."

            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        // Only ASCII digits and one '.' were consumed, so this cannot fail.
        let n: f64 = self.src[self.start..self.curr].parse::<f64>().unwrap_or(0.0);

        TokenType::NUMBER(n)
    }

    /// Parse an identifier and decide if it is a **keyword**.
    fn parse_identifier(&mut self) -> TokenType {
        while {
            let c: u8 = self.peek();
            c.is_ascii_alphanumeric() || c == b'_'
        } {
            self.advance();
        }

        KEYWORDS
            .get(&self.bytes[self.start..self.curr])
            .cloned()
            .unwrap_or(TokenType::IDENTIFIER)
    }
}

// ───────────────────────── Iterator implementation ─────────────────────────

impl<'a> Iterator for Scanner<'a> {
    type Item = Result<Token>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.curr <= self.len() {
            // EOF guard – emit exactly one EOF then terminate.
            if self.curr == self.len() {
                self.curr += 1;
                return Some(Ok(Token::new(
                    TokenType::EOF,
                    "",
                    self.line,
                    Rc::clone(&self.file),
                )));
            }

            self.start = self.curr;
            self.pending = None;

            // Remember where the lexeme began; strings may span lines.
            let line = self.line;

            if let Err(e) = self.scan_token() {
                return Some(Err(e));
            }

            if let Some(tt) = self.pending.take() {
                let lexeme = &self.src[self.start..self.curr];
                trace!("Scanned token ({:?}) on line {}", tt, line);

                return Some(Ok(Token::new(tt, lexeme, line, Rc::clone(&self.file))));
            }
            // Otherwise it was whitespace / comment → continue loop.
        }

        None
    }
}

impl<'a> FusedIterator for Scanner<'a> {}

/// Scan `src` completely. Lexical errors go to `diagnostics`; the returned
/// vector always ends with the `EOF` token.
pub fn scan(src: &str, file_name: &str, diagnostics: &mut Diagnostics) -> Vec<Token> {
    let mut tokens = Vec::new();

    for result in Scanner::new(src, file_name) {
        match result {
            Ok(token) => tokens.push(token),
            Err(e) => diagnostics.report(e),
        }
    }

    debug!("Scanned {} tokens from {}", tokens.len(), file_name);

    tokens
}
