//! The recursive descent runtime that drives compiled programs over the
//! target token stream.
//!
//! Evaluation recurses over the instruction tree plus one frame per rule
//! invocation, so stack depth is proportional to the grammar's nesting depth
//! times the deepest rule chain on the input. Left-recursive chains, which
//! would make that unbounded, are rejected during analysis.
use std::fmt;

use ahash::{AHashMap, AHashSet};

use crate::ir::{Inst, Program, RuleId};
use crate::lexer::{LexError, Lexer, LexerState, Token, TokenKind};
use crate::utils;

/// The saved cursor of a paused attempt: the lexer position and the current
/// lookahead token. Backtracking restores the whole tuple atomically.
#[derive(Debug, Clone)]
pub struct Checkpoint {
    pub(crate) lexer: LexerState,
    pub(crate) lookahead: Token,
}

/// A rendered rejection: position, expectation, offending token and a source
/// context line with a caret under the column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// 1-based line of the rejection.
    pub line: u32,
    /// 1-based column of the rejection.
    pub col: u32,
    /// What was expected at that point.
    pub expected: String,
    /// What was seen instead, as `KIND("lexeme")`.
    pub found: String,
    /// The offending source line with a caret under the column.
    pub context: String,
    /// Whether a forward scan reached a configured sync point. The verdict
    /// is still failure.
    pub recovered: bool,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "syntax error at line {}, column {}\nexpected: {}\ngot: {}",
            self.line, self.col, self.expected, self.found
        )?;
        if !self.context.is_empty() {
            write!(f, "\n{}", self.context)?;
        }
        if self.recovered {
            write!(
                f,
                "\nerror recovery reached a sync point; the parse still failed"
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
/// The error type for a rejected or unreadable input.
pub enum RecognizeError {
    #[error("{0}")]
    /// A wrapper for the [`LexError`] error type; surfaces from within a
    /// match attempt.
    LexError(#[from] LexError),
    #[error("input does not match the start rule\n{0}")]
    /// The start rule did not match the input.
    NoMatch(Diagnostic),
    #[error("input continues past a complete match\n{0}")]
    /// The start rule matched a proper prefix of the input.
    TrailingInput(Diagnostic),
}

impl RecognizeError {
    /// The diagnostic carried by a rejection, if any.
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            RecognizeError::NoMatch(diag) | RecognizeError::TrailingInput(diag) => Some(diag),
            RecognizeError::LexError(_) => None,
        }
    }
}

/// The furthest input position at which a token match failed, with every
/// description expected there. Backtracking rewinds the cursor, so top-level
/// diagnostics report this high-water mark instead of the rewound position.
struct Expectation {
    line: u32,
    col: u32,
    found: Token,
    expected: Vec<String>,
}

/// One recognition run over one input. Not reentrant; create one instance
/// per parse. The memoization cache lives and dies with the instance, which
/// keeps it transparent across parses.
pub struct Recognizer<'a> {
    program: &'a Program,
    lexer: Lexer<'a>,
    lookahead: Token,
    memo: Option<AHashMap<(RuleId, (u32, u32)), (bool, Checkpoint)>>,
    furthest: Option<Expectation>,
    sync_points: &'a AHashSet<String>,
}

impl<'a> Recognizer<'a> {
    /// Create a recognizer for one input string and prime the lookahead.
    ///
    /// # Errors
    ///
    /// Returns a [`RecognizeError`] if the first token cannot be lexed.
    pub fn new(
        program: &'a Program,
        input: &'a str,
        memoize: bool,
        sync_points: &'a AHashSet<String>,
    ) -> Result<Self, RecognizeError> {
        let mut lexer = Lexer::new(input, program.keywords(), program.symbol_matcher());
        let lookahead = lexer.next_token()?;
        Ok(Self {
            program,
            lexer,
            lookahead,
            memo: memoize.then(AHashMap::default),
            furthest: None,
            sync_points,
        })
    }

    /// Run the start rule against the whole input.
    ///
    /// # Errors
    ///
    /// Returns [`RecognizeError::NoMatch`] if the start rule does not match,
    /// [`RecognizeError::TrailingInput`] if it matches a proper prefix, and
    /// [`RecognizeError::LexError`] if the input cannot be tokenized.
    pub fn recognize(&mut self) -> Result<(), RecognizeError> {
        let start = self.program.start();
        if !self.call(start)? {
            let fallback = format!("valid {}", self.program.rule_name(start).unwrap_or("start"));
            let diagnostic = self.failure_diagnostic(&fallback);
            return Err(RecognizeError::NoMatch(diagnostic));
        }
        if self.lookahead.kind != TokenKind::Eof {
            let diagnostic = self.trailing_diagnostic();
            return Err(RecognizeError::TrailingInput(diagnostic));
        }
        Ok(())
    }

    fn advance(&mut self) -> Result<(), LexError> {
        self.lookahead = self.lexer.next_token()?;
        Ok(())
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            lexer: self.lexer.state(),
            lookahead: self.lookahead.clone(),
        }
    }

    fn restore(&mut self, checkpoint: Checkpoint) {
        self.lexer.restore(checkpoint.lexer);
        self.lookahead = checkpoint.lookahead;
    }

    /// The lookahead token's source position, used both as the memoization
    /// key and as the zero-consumption probe.
    fn cursor(&self) -> (u32, u32) {
        (self.lookahead.line, self.lookahead.col)
    }

    fn match_token(
        &mut self,
        kind: TokenKind,
        value: Option<&str>,
        expected: &str,
    ) -> Result<bool, RecognizeError> {
        let matched =
            self.lookahead.kind == kind && value.map_or(true, |v| self.lookahead.lexeme == v);
        if matched {
            self.advance()?;
            return Ok(true);
        }
        self.record_expectation(expected);
        Ok(false)
    }

    fn record_expectation(&mut self, expected: &str) {
        let at = self.cursor();
        match &mut self.furthest {
            Some(exp) if (exp.line, exp.col) == at => {
                exp.expected.push(expected.to_string());
            }
            Some(exp) if (exp.line, exp.col) > at => {}
            _ => {
                self.furthest = Some(Expectation {
                    line: at.0,
                    col: at.1,
                    found: self.lookahead.clone(),
                    expected: vec![expected.to_string()],
                });
            }
        }
    }

    fn call(&mut self, id: RuleId) -> Result<bool, RecognizeError> {
        let key = (id, self.cursor());
        if let Some(memo) = &self.memo {
            if let Some((matched, end)) = memo.get(&key) {
                let matched = *matched;
                let end = end.clone();
                if matched {
                    self.restore(end);
                }
                return Ok(matched);
            }
        }
        let program = self.program;
        let checkpoint = self.checkpoint();
        let matched = self.eval(program.body(id))?;
        if !matched {
            self.restore(checkpoint);
        }
        if let Some(memo) = &mut self.memo {
            let end = Checkpoint {
                lexer: self.lexer.state(),
                lookahead: self.lookahead.clone(),
            };
            memo.insert(key, (matched, end));
        }
        Ok(matched)
    }

    /// Evaluate one instruction. Every path that returns `false` leaves the
    /// cursor exactly where it was on entry.
    fn eval(&mut self, inst: &Inst) -> Result<bool, RecognizeError> {
        match inst {
            Inst::Accept => Ok(true),
            Inst::Keyword(value) => {
                let expected = format!("\"{value}\"");
                self.match_token(TokenKind::Keyword, Some(value.as_str()), &expected)
            }
            Inst::Symbol(value) => {
                let expected = format!("\"{value}\"");
                self.match_token(TokenKind::Symbol, Some(value.as_str()), &expected)
            }
            Inst::Builtin(id) => {
                let spec = &self.program.specials()[id.0 as usize];
                let (kind, name) = (spec.kind, spec.name.clone());
                self.match_token(kind, None, &name)
            }
            Inst::Call(id) => self.call(*id),
            Inst::Seq(items) => {
                let checkpoint = self.checkpoint();
                for item in items {
                    if !self.eval(item)? {
                        self.restore(checkpoint);
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Inst::Alt(options) => {
                for option in options {
                    if self.eval(option)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Inst::Star(body) => {
                loop {
                    let before = self.cursor();
                    if !self.eval(body)? {
                        break;
                    }
                    if self.cursor() == before {
                        // The body matched without consuming; looping again
                        // would never terminate.
                        break;
                    }
                }
                Ok(true)
            }
            Inst::Opt(body) => {
                self.eval(body)?;
                Ok(true)
            }
        }
    }

    fn failure_diagnostic(&mut self, fallback_expected: &str) -> Diagnostic {
        let (line, col, found, expected) = match &self.furthest {
            Some(exp) => (
                exp.line,
                exp.col,
                exp.found.clone(),
                utils::join_expected(&exp.expected),
            ),
            None => (
                self.lookahead.line,
                self.lookahead.col,
                self.lookahead.clone(),
                fallback_expected.to_string(),
            ),
        };
        self.build_diagnostic(line, col, &found, expected)
    }

    /// Trailing garbage reports "end of input" at the first garbage token,
    /// unless a match attempt failed beyond it; the furthest failure then
    /// names what could have extended the parse.
    fn trailing_diagnostic(&mut self) -> Diagnostic {
        let beyond = self
            .furthest
            .as_ref()
            .filter(|exp| (exp.line, exp.col) > self.cursor())
            .map(|exp| {
                (
                    exp.line,
                    exp.col,
                    exp.found.clone(),
                    utils::join_expected(&exp.expected),
                )
            });
        let (line, col, found, expected) = beyond.unwrap_or((
            self.lookahead.line,
            self.lookahead.col,
            self.lookahead.clone(),
            "end of input".to_string(),
        ));
        self.build_diagnostic(line, col, &found, expected)
    }

    fn build_diagnostic(
        &mut self,
        line: u32,
        col: u32,
        found: &Token,
        expected: String,
    ) -> Diagnostic {
        let found = if found.kind == TokenKind::Eof {
            "EOF".to_string()
        } else {
            format!("{}({:?})", found.kind, found.lexeme)
        };
        let context = match self.lexer.line_text(line) {
            Some(text) => {
                let caret_pad = " ".repeat(col.saturating_sub(1) as usize);
                format!("{text}\n{caret_pad}^")
            }
            None => String::new(),
        };
        let recovered = self.attempt_recovery();
        Diagnostic {
            line,
            col,
            expected,
            found,
            context,
            recovered,
        }
    }

    /// Best-effort resynchronization: scan forward for a configured sync
    /// token. Only affects the diagnostic, never the verdict.
    fn attempt_recovery(&mut self) -> bool {
        if self.sync_points.is_empty() {
            return false;
        }
        while self.lookahead.kind != TokenKind::Eof {
            if self.sync_points.contains(&self.lookahead.lexeme) {
                let _ = self.advance();
                return true;
            }
            if self.advance().is_err() {
                break;
            }
        }
        false
    }
}
