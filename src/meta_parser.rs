//! The parser that builds the grammar AST from meta-grammar tokens.
use crate::grammar::{Node, Rule};
use crate::meta_lexer::{MetaLexError, MetaLexer, MetaToken, MetaTokenKind};

#[derive(Debug, thiserror::Error)]
/// The error type for failures while parsing the meta-grammar.
pub enum MetaParseError {
    #[error("{0}")]
    /// A wrapper for the [`MetaLexError`] error type.
    LexError(#[from] MetaLexError),
    #[error(
        "syntax error in grammar at line {line}, column {col}: \
         expected {expected}, got {found}({lexeme:?})"
    )]
    /// A token other than the one the meta-grammar calls for.
    UnexpectedToken {
        /// A textual description of what was expected.
        expected: String,
        /// The kind of the token actually seen.
        found: MetaTokenKind,
        /// The text of the token actually seen.
        lexeme: String,
        /// 1-based line of the token.
        line: u32,
        /// 1-based column of the token.
        col: u32,
    },
}

/// The recursive descent parser over the meta-grammar:
///
/// ```text
/// grammar    = { rule } EOF
/// rule       = IDENT '=' expression ';'
/// expression = sequence { '|' sequence }
/// sequence   = term { ',' term }
/// term       = atom [ '*' | '+' | '?' ]
/// atom       = TERMINAL | IDENT | '(' expression ')'
///            | '{' expression '}' | '[' expression ']'
/// ```
///
/// A missing rule-terminating `;` is tolerated when end of input or another
/// rule head follows. A `sequence` with one term and an `expression` with one
/// alternative are stored unwrapped.
pub struct MetaParser {
    lexer: MetaLexer,
    current: MetaToken,
}

impl MetaParser {
    /// Create a parser over the meta-grammar text and prime the lookahead.
    ///
    /// # Errors
    ///
    /// Returns a [`MetaParseError`] if the first token cannot be lexed.
    pub fn new(text: &str) -> Result<Self, MetaParseError> {
        let mut lexer = MetaLexer::new(text);
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    fn bump(&mut self) -> Result<(), MetaParseError> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn unexpected<T>(&self, expected: &str) -> Result<T, MetaParseError> {
        Err(MetaParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: self.current.kind,
            lexeme: self.current.lexeme.clone(),
            line: self.current.line,
            col: self.current.col,
        })
    }

    fn expect(&mut self, kind: MetaTokenKind, expected: &str) -> Result<MetaToken, MetaParseError> {
        if self.current.kind != kind {
            return self.unexpected(expected);
        }
        let token = self.current.clone();
        self.bump()?;
        Ok(token)
    }

    /// Parse the whole grammar into its list of rules.
    ///
    /// # Errors
    ///
    /// Returns a [`MetaParseError`] on the first token that does not fit the
    /// meta-grammar, with the position and a description of what was expected.
    pub fn parse_grammar(mut self) -> Result<Vec<Rule>, MetaParseError> {
        let mut rules = Vec::new();
        while self.current.kind != MetaTokenKind::Eof {
            rules.push(self.parse_rule()?);
        }
        Ok(rules)
    }

    fn parse_rule(&mut self) -> Result<Rule, MetaParseError> {
        let name = self.expect(MetaTokenKind::Ident, "a rule name")?.lexeme;
        self.expect(MetaTokenKind::Equals, "\"=\"")?;
        let definition = self.parse_expression()?;
        if self.current.kind == MetaTokenKind::Semicolon {
            self.bump()?;
        }
        Ok(Rule { name, definition })
    }

    fn parse_expression(&mut self) -> Result<Node, MetaParseError> {
        let mut options = vec![self.parse_sequence()?];
        while self.current.kind == MetaTokenKind::Pipe {
            self.bump()?;
            options.push(self.parse_sequence()?);
        }
        Ok(if options.len() == 1 {
            options.remove(0)
        } else {
            Node::Alternative(options)
        })
    }

    fn parse_sequence(&mut self) -> Result<Node, MetaParseError> {
        let mut items = vec![self.parse_term()?];
        while self.current.kind == MetaTokenKind::Comma {
            self.bump()?;
            items.push(self.parse_term()?);
        }
        Ok(if items.len() == 1 {
            items.remove(0)
        } else {
            Node::Sequence(items)
        })
    }

    fn parse_term(&mut self) -> Result<Node, MetaParseError> {
        let atom = self.parse_atom()?;
        match self.current.kind {
            MetaTokenKind::Star => {
                self.bump()?;
                Ok(Node::Repetition(Box::new(atom)))
            }
            MetaTokenKind::Plus => {
                self.bump()?;
                let repeated = Node::Repetition(Box::new(atom.clone()));
                Ok(Node::Sequence(vec![atom, repeated]))
            }
            MetaTokenKind::Question => {
                self.bump()?;
                Ok(Node::Optional(Box::new(atom)))
            }
            _ => Ok(atom),
        }
    }

    fn parse_atom(&mut self) -> Result<Node, MetaParseError> {
        match self.current.kind {
            MetaTokenKind::Terminal => {
                let value = self.current.lexeme.clone();
                self.bump()?;
                Ok(Node::Terminal(value))
            }
            MetaTokenKind::Ident => {
                let name = self.current.lexeme.clone();
                self.bump()?;
                Ok(Node::Nonterminal(name))
            }
            MetaTokenKind::LParen => {
                self.bump()?;
                let inner = self.parse_expression()?;
                self.expect(MetaTokenKind::RParen, "\")\"")?;
                Ok(inner)
            }
            MetaTokenKind::LBrace => {
                self.bump()?;
                let inner = self.parse_expression()?;
                self.expect(MetaTokenKind::RBrace, "\"}\"")?;
                Ok(Node::Repetition(Box::new(inner)))
            }
            MetaTokenKind::LBracket => {
                self.bump()?;
                let inner = self.parse_expression()?;
                self.expect(MetaTokenKind::RBracket, "\"]\"")?;
                Ok(Node::Optional(Box::new(inner)))
            }
            _ => self.unexpected("a term"),
        }
    }
}
