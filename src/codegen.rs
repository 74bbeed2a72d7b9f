//! The code-generating back-end: renders a compiled program as the Rust
//! source text of a standalone recognizer module.
//!
//! The emitted text is an artifact for the caller to write out; this crate
//! never compiles it. The direct-execution back-end in
//! [`recognizer`](crate::recognizer) is the behavioral reference; the two
//! implement the same match/backtrack contract.
use std::fmt::Write;

use crate::ir::{Inst, Program, RuleId};
use crate::utils;

/// Render `program` as a standalone Rust module: token kinds, the lexer with
/// the keyword and symbol sets as literals, the parser with one
/// `parse_<rule>` method per retained rule, and the built-in predicates.
pub fn generate_source(program: &Program) -> String {
    let mut out = String::new();
    emit_header(&mut out, program);
    emit_lexer(&mut out);
    emit_parser_base(&mut out, program);
    for (index, rule) in program.rules().iter().enumerate() {
        let name = sanitize(program.rule_name(RuleId(index as u32)).unwrap_or("rule"));
        let _ = writeln!(out, "    fn parse_{name}(&mut self) -> bool {{");
        let _ = writeln!(out, "        self.attempt(|p| {})", gen_expr(&rule.body, program));
        out.push_str("    }\n\n");
    }
    out.truncate(out.trim_end().len());
    out.push_str("\n}\n");
    out
}

fn emit_header(out: &mut String, program: &Program) {
    let start = program.rule_name(program.start()).unwrap_or("start");
    let _ = writeln!(
        out,
        "//! Recognizer for the grammar starting at `{start}`. Generated by rdgen; do not edit."
    );
    out.push_str(
        "#![allow(dead_code, non_snake_case)]\n\
         \n\
         #[derive(Debug, Clone, Copy, PartialEq, Eq)]\n\
         pub enum TokenKind {\n\
         \x20   Identifier,\n\
         \x20   Integer,\n\
         \x20   String,\n\
         \x20   Keyword,\n\
         \x20   Symbol,\n\
         \x20   Eof,\n\
         }\n\
         \n",
    );
    let _ = writeln!(
        out,
        "impl TokenKind {{\n\
         \x20   fn label(&self) -> &'static str {{\n\
         \x20       match self {{\n\
         \x20           TokenKind::Identifier => \"IDENTIFIER\",\n\
         \x20           TokenKind::Integer => \"INTEGER\",\n\
         \x20           TokenKind::String => \"STRING\",\n\
         \x20           TokenKind::Keyword => {:?},\n\
         \x20           TokenKind::Symbol => {:?},\n\
         \x20           TokenKind::Eof => \"EOF\",\n\
         \x20       }}\n\
         \x20   }}\n\
         }}\n",
        program.keyword_label(),
        program.symbol_label(),
    );
    out.push_str(
        "#[derive(Debug, Clone, PartialEq, Eq)]\n\
         pub struct Token {\n\
         \x20   pub kind: TokenKind,\n\
         \x20   pub lexeme: String,\n\
         \x20   pub line: u32,\n\
         \x20   pub col: u32,\n\
         }\n\
         \n",
    );
    let keywords = utils::sorted_from_hash_set(program.keywords())
        .iter()
        .map(|k| format!("{k:?}"))
        .collect::<Vec<_>>()
        .join(", ");
    let symbols = program
        .symbol_matcher()
        .iter()
        .map(|s| format!("{s:?}"))
        .collect::<Vec<_>>()
        .join(", ");
    let _ = writeln!(out, "pub const KEYWORDS: &[&str] = &[{keywords}];");
    let _ = writeln!(out, "/// Longest first, so prefix scanning longest-matches.");
    let _ = writeln!(out, "pub const SYMBOLS: &[&str] = &[{symbols}];");
    out.push('\n');
}

fn emit_lexer(out: &mut String) {
    out.push_str(
        r#"struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    col: u32,
}

impl Lexer {
    fn new(text: &str) -> Self {
        Self { chars: text.chars().collect(), pos: 0, line: 1, col: 1 }
    }

    fn state(&self) -> (usize, u32, u32) {
        (self.pos, self.line, self.col)
    }

    fn restore(&mut self, state: (usize, u32, u32)) {
        self.pos = state.0;
        self.line = state.1;
        self.col = state.2;
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos + 1).copied()
    }

    fn advance(&mut self) {
        if let Some(c) = self.current() {
            if c == '\n' {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
            self.pos += 1;
        }
    }

    fn token(&self, kind: TokenKind, lexeme: String, line: u32, col: u32) -> Token {
        Token { kind, lexeme, line, col }
    }

    fn next_token(&mut self) -> Result<Token, String> {
        while let Some(c) = self.current() {
            if c.is_ascii_whitespace() {
                self.advance();
                continue;
            }
            if c == '/' && matches!(self.peek(), Some('/') | Some('*')) {
                self.skip_comment()?;
                continue;
            }
            let (line, col) = (self.line, self.col);
            if c.is_ascii_alphabetic() || c == '_' {
                let mut lexeme = String::new();
                while let Some(c) = self.current() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        lexeme.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
                let kind = if KEYWORDS.contains(&lexeme.as_str()) {
                    TokenKind::Keyword
                } else {
                    TokenKind::Identifier
                };
                return Ok(self.token(kind, lexeme, line, col));
            }
            if c.is_ascii_digit() {
                let mut lexeme = String::new();
                while let Some(c) = self.current() {
                    if c.is_ascii_digit() {
                        lexeme.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
                return Ok(self.token(TokenKind::Integer, lexeme, line, col));
            }
            if c == '"' {
                self.advance();
                let mut lexeme = String::new();
                loop {
                    match self.current() {
                        Some('"') => {
                            self.advance();
                            return Ok(self.token(TokenKind::String, lexeme, line, col));
                        }
                        Some('\\') => {
                            self.advance();
                            if let Some(escaped) = self.current() {
                                lexeme.push(escaped);
                                self.advance();
                            }
                        }
                        Some(c) => {
                            lexeme.push(c);
                            self.advance();
                        }
                        None => {
                            return Err(format!(
                                "unterminated string literal at line {line}, column {col}"
                            ))
                        }
                    }
                }
            }
            if let Some(sym) = SYMBOLS.iter().find(|sym| self.input_starts_with(sym)) {
                for _ in 0..sym.chars().count() {
                    self.advance();
                }
                return Ok(self.token(TokenKind::Symbol, sym.to_string(), line, col));
            }
            return Err(format!(
                "invalid character {c:?} at line {line}, column {col}"
            ));
        }
        Ok(self.token(TokenKind::Eof, String::new(), self.line, self.col))
    }

    fn skip_comment(&mut self) -> Result<(), String> {
        let (line, col) = (self.line, self.col);
        if self.peek() == Some('/') {
            while let Some(c) = self.current() {
                if c == '\n' {
                    break;
                }
                self.advance();
            }
            return Ok(());
        }
        self.advance();
        self.advance();
        while let Some(c) = self.current() {
            if c == '*' && self.peek() == Some('/') {
                self.advance();
                self.advance();
                return Ok(());
            }
            self.advance();
        }
        Err(format!(
            "unterminated block comment at line {line}, column {col}"
        ))
    }

    fn input_starts_with(&self, literal: &str) -> bool {
        literal
            .chars()
            .enumerate()
            .all(|(i, c)| self.chars.get(self.pos + i) == Some(&c))
    }
}

"#,
    );
}

fn emit_parser_base(out: &mut String, program: &Program) {
    out.push_str(
        r#"pub struct Parser {
    lexer: Lexer,
    lookahead: Token,
    lex_error: Option<String>,
}

impl Parser {
    pub fn new(text: &str) -> Self {
        let mut lexer = Lexer::new(text);
        let mut lex_error = None;
        let lookahead = match lexer.next_token() {
            Ok(token) => token,
            Err(error) => {
                let token = Token {
                    kind: TokenKind::Eof,
                    lexeme: String::new(),
                    line: lexer.line,
                    col: lexer.col,
                };
                lex_error = Some(error);
                token
            }
        };
        Self { lexer, lookahead, lex_error }
    }

    fn bump(&mut self) {
        match self.lexer.next_token() {
            Ok(token) => self.lookahead = token,
            Err(error) => {
                if self.lex_error.is_none() {
                    self.lex_error = Some(error);
                }
                self.lookahead = Token {
                    kind: TokenKind::Eof,
                    lexeme: String::new(),
                    line: self.lexer.line,
                    col: self.lexer.col,
                };
            }
        }
    }

    fn checkpoint(&self) -> ((usize, u32, u32), Token) {
        (self.lexer.state(), self.lookahead.clone())
    }

    fn restore(&mut self, checkpoint: ((usize, u32, u32), Token)) {
        self.lexer.restore(checkpoint.0);
        self.lookahead = checkpoint.1;
    }

    fn matches(&mut self, kind: TokenKind, value: Option<&str>) -> bool {
        if self.lookahead.kind == kind && value.map_or(true, |v| self.lookahead.lexeme == v) {
            self.bump();
            return true;
        }
        false
    }

    fn attempt(&mut self, body: impl FnOnce(&mut Self) -> bool) -> bool {
        let checkpoint = self.checkpoint();
        if body(self) {
            true
        } else {
            self.restore(checkpoint);
            false
        }
    }

    fn star(&mut self, mut body: impl FnMut(&mut Self) -> bool) -> bool {
        loop {
            let checkpoint = self.checkpoint();
            let before = (self.lookahead.line, self.lookahead.col);
            if !body(self) {
                self.restore(checkpoint);
                break;
            }
            if (self.lookahead.line, self.lookahead.col) == before {
                break;
            }
        }
        true
    }

    fn opt(&mut self, body: impl FnOnce(&mut Self) -> bool) -> bool {
        self.attempt(body);
        true
    }

    fn error(&self, expected: &str) -> String {
        format!(
            "syntax error at line {}, column {}: expected {}, got {}({:?})",
            self.lookahead.line,
            self.lookahead.col,
            expected,
            self.lookahead.kind.label(),
            self.lookahead.lexeme
        )
    }

"#,
    );
    let start = sanitize(program.rule_name(program.start()).unwrap_or("start"));
    let start_desc = program.rule_name(program.start()).unwrap_or("start");
    let _ = writeln!(
        out,
        "    pub fn parse(&mut self) -> Result<(), String> {{\n\
         \x20       if !self.parse_{start}() {{\n\
         \x20           return Err(self.error(\"valid {start_desc}\"));\n\
         \x20       }}\n\
         \x20       if let Some(error) = self.lex_error.take() {{\n\
         \x20           return Err(error);\n\
         \x20       }}\n\
         \x20       if self.lookahead.kind != TokenKind::Eof {{\n\
         \x20           return Err(self.error(\"end of input\"));\n\
         \x20       }}\n\
         \x20       Ok(())\n\
         \x20   }}\n"
    );
    for special in program.specials() {
        let predicate = sanitize(&special.predicate);
        let _ = writeln!(
            out,
            "    fn {predicate}(&mut self) -> bool {{\n\
             \x20       self.matches(TokenKind::{:?}, None)\n\
             \x20   }}\n",
            special.kind
        );
    }
}

/// Render one instruction as a boolean expression over `p: &mut Parser`.
fn gen_expr(inst: &Inst, program: &Program) -> String {
    match inst {
        Inst::Accept => "true".to_string(),
        Inst::Keyword(value) => {
            format!("p.matches(TokenKind::Keyword, Some({value:?}))")
        }
        Inst::Symbol(value) => {
            format!("p.matches(TokenKind::Symbol, Some({value:?}))")
        }
        Inst::Builtin(id) => {
            let predicate = sanitize(&program.specials()[id.0 as usize].predicate);
            format!("p.{predicate}()")
        }
        Inst::Call(id) => {
            let name = sanitize(program.rule_name(*id).unwrap_or("rule"));
            format!("p.parse_{name}()")
        }
        Inst::Seq(items) => items
            .iter()
            .map(|item| {
                let rendered = gen_expr(item, program);
                // `&&` binds tighter than `||`; a nested choice needs parens.
                if matches!(item, Inst::Alt(_)) {
                    format!("({rendered})")
                } else {
                    rendered
                }
            })
            .collect::<Vec<_>>()
            .join(" && "),
        Inst::Alt(options) => options
            .iter()
            .map(|option| format!("p.attempt(|p| {})", gen_expr(option, program)))
            .collect::<Vec<_>>()
            .join(" || "),
        Inst::Star(body) => format!("p.star(|p| {})", gen_expr(body, program)),
        Inst::Opt(body) => format!("p.opt(|p| {})", gen_expr(body, program)),
    }
}

/// Rule names may contain hyphens in the EBNF surface; method names cannot.
fn sanitize(name: &str) -> String {
    name.replace('-', "_")
}
