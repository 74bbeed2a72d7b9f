//! The target-language tokenizer that feeds generated recognizers.
use ahash::AHashSet;

/// The classification of one target-language token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
pub enum TokenKind {
    /// A name: a letter or `_` followed by letters, digits or `_`.
    #[strum(serialize = "IDENTIFIER")]
    Identifier,
    /// A run of decimal digits.
    #[strum(serialize = "INTEGER")]
    Integer,
    /// A double-quoted string literal.
    #[strum(serialize = "STRING")]
    String,
    /// An identifier that is listed in the grammar's keyword set.
    #[strum(serialize = "KEYWORD")]
    Keyword,
    /// A literal from the grammar's symbol set.
    #[strum(serialize = "SYMBOL")]
    Symbol,
    /// End of input. Repeatable: the lexer keeps returning it.
    #[strum(serialize = "EOF")]
    Eof,
}

/// One token of the target language, tagged with its 1-based source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The token classification.
    pub kind: TokenKind,
    /// The token text. Quotes are stripped from string literals.
    pub lexeme: String,
    /// 1-based line of the first character.
    pub line: u32,
    /// 1-based column of the first character.
    pub col: u32,
}

#[derive(Debug, thiserror::Error)]
/// The error type for failures while tokenizing target-language input.
pub enum LexError {
    #[error("invalid character {found:?} at line {line}, column {col}")]
    /// A character that starts no token of the target language.
    InvalidCharacter {
        /// The offending character.
        found: char,
        /// 1-based line of the character.
        line: u32,
        /// 1-based column of the character.
        col: u32,
    },
    #[error("unterminated string literal starting at line {line}, column {col}")]
    /// A `"` with no matching closing quote before end of input.
    UnterminatedString {
        /// 1-based line of the opening quote.
        line: u32,
        /// 1-based column of the opening quote.
        col: u32,
    },
    #[error("unterminated block comment starting at line {line}, column {col}")]
    /// A `/*` with no matching `*/` before end of input.
    UnterminatedComment {
        /// 1-based line of the `/*`.
        line: u32,
        /// 1-based column of the `/*`.
        col: u32,
    },
}

/// A resumable cursor position inside a [`Lexer`]. Restoring a state is O(1):
/// the position index and the line/column counters are reinstated directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LexerState {
    pub(crate) pos: usize,
    pub(crate) line: u32,
    pub(crate) col: u32,
}

/// The tokenizer over one input string. One instance serves one parse; the
/// keyword and symbol sets are borrowed from the compiled grammar so they
/// always match the classification the analyzer produced.
pub struct Lexer<'a> {
    text: &'a str,
    chars: Vec<char>,
    pos: usize,
    line: u32,
    col: u32,
    keywords: &'a AHashSet<String>,
    /// Symbol literals sorted longest first, so iteration order implements
    /// longest match for multi-character operators.
    symbols: &'a [String],
}

impl<'a> Lexer<'a> {
    /// Create a lexer over `text` with the given keyword set and the symbol
    /// list sorted longest first.
    pub fn new(
        text: &'a str,
        keywords: &'a AHashSet<String>,
        symbols: &'a [String],
    ) -> Self {
        Self {
            text,
            chars: text.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            keywords,
            symbols,
        }
    }

    /// Capture the cursor so it can be restored after a failed attempt.
    pub fn state(&self) -> LexerState {
        LexerState {
            pos: self.pos,
            line: self.line,
            col: self.col,
        }
    }

    /// Reposition the cursor to a previously captured state.
    pub fn restore(&mut self, state: LexerState) {
        self.pos = state.pos;
        self.line = state.line;
        self.col = state.col;
    }

    /// The source line with the given 1-based number, for diagnostics.
    pub fn line_text(&self, line: u32) -> Option<&'a str> {
        self.text.lines().nth(line.saturating_sub(1) as usize)
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

    /// Produce the next token, skipping whitespace and `//`/`/* */` comments.
    ///
    /// # Errors
    ///
    /// Returns a [`LexError`] on an invalid character, an unterminated string
    /// literal or an unterminated block comment.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        while let Some(c) = self.current() {
            if c.is_ascii_whitespace() {
                self.advance();
                continue;
            }
            if c == '/' && matches!(self.peek(), Some('/') | Some('*')) {
                self.skip_comment()?;
                continue;
            }
            if c.is_ascii_alphabetic() || c == '_' {
                return Ok(self.identifier());
            }
            if c.is_ascii_digit() {
                return Ok(self.integer());
            }
            if c == '"' {
                return self.string();
            }
            if let Some(token) = self.symbol() {
                return Ok(token);
            }
            return Err(LexError::InvalidCharacter {
                found: c,
                line: self.line,
                col: self.col,
            });
        }
        Ok(Token {
            kind: TokenKind::Eof,
            lexeme: String::new(),
            line: self.line,
            col: self.col,
        })
    }

    fn skip_comment(&mut self) -> Result<(), LexError> {
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
        Err(LexError::UnterminatedComment { line, col })
    }

    fn identifier(&mut self) -> Token {
        let (line, col) = (self.line, self.col);
        let mut lexeme = String::new();
        while let Some(c) = self.current() {
            if c.is_ascii_alphanumeric() || c == '_' {
                lexeme.push(c);
                self.advance();
            } else {
                break;
            }
        }
        let kind = if self.keywords.contains(&lexeme) {
            TokenKind::Keyword
        } else {
            TokenKind::Identifier
        };
        Token {
            kind,
            lexeme,
            line,
            col,
        }
    }

    fn integer(&mut self) -> Token {
        let (line, col) = (self.line, self.col);
        let mut lexeme = String::new();
        while let Some(c) = self.current() {
            if c.is_ascii_digit() {
                lexeme.push(c);
                self.advance();
            } else {
                break;
            }
        }
        Token {
            kind: TokenKind::Integer,
            lexeme,
            line,
            col,
        }
    }

    fn string(&mut self) -> Result<Token, LexError> {
        let (line, col) = (self.line, self.col);
        self.advance();
        let mut lexeme = String::new();
        while let Some(c) = self.current() {
            match c {
                '"' => {
                    self.advance();
                    return Ok(Token {
                        kind: TokenKind::String,
                        lexeme,
                        line,
                        col,
                    });
                }
                '\\' => {
                    self.advance();
                    if let Some(escaped) = self.current() {
                        lexeme.push(escaped);
                        self.advance();
                    }
                }
                _ => {
                    lexeme.push(c);
                    self.advance();
                }
            }
        }
        Err(LexError::UnterminatedString { line, col })
    }

    fn symbol(&mut self) -> Option<Token> {
        let (line, col) = (self.line, self.col);
        let symbols = self.symbols;
        for sym in symbols {
            if self.input_starts_with(sym) {
                for _ in 0..sym.chars().count() {
                    self.advance();
                }
                return Some(Token {
                    kind: TokenKind::Symbol,
                    lexeme: sym.clone(),
                    line,
                    col,
                });
            }
        }
        None
    }

    fn input_starts_with(&self, literal: &str) -> bool {
        literal
            .chars()
            .enumerate()
            .all(|(i, c)| self.chars.get(self.pos + i) == Some(&c))
    }
}
