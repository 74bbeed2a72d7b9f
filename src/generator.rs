//! The main module that contains the [`Generator`] struct and its related types.
use std::borrow::Cow;

use ahash::AHashSet;

use crate::bnf::{BnfNormalizer, Dialect};
use crate::codegen;
use crate::config::Config;
use crate::grammar::{Grammar, GrammarError};
use crate::ir::{CompileError, Program};
use crate::meta_parser::{MetaParseError, MetaParser};
use crate::recognizer::{RecognizeError, Recognizer};
use crate::utils;

#[derive(Debug, thiserror::Error)]
/// Represents the error type for the [`Generator`] creation. Any of these
/// aborts generation; no partial artifact is produced.
pub enum CreateGeneratorError {
    #[error("{0}")] // inherits the message from the meta front-end
    /// A wrapper for the [`MetaParseError`] error type (which also carries
    /// meta-lexing failures).
    ParseError(#[from] MetaParseError),
    #[error("{0}")] // inherits the message from the analyzer
    /// A wrapper for the [`GrammarError`] error type.
    GrammarError(#[from] GrammarError),
    #[error("{0}")] // inherits the message from the compiler
    /// A wrapper for the [`CompileError`] error type.
    CompileError(#[from] CompileError),
}

/// The parser generator: one grammar, analyzed and compiled, ready to hand
/// out per-parse recognizers or to render the source back-end.
#[derive(Debug)]
pub struct Generator {
    grammar: Grammar,
    program: Program,
    memoization: bool,
    sync_points: AHashSet<String>,
}

impl Generator {
    /// Create a new [`Generator`] from a grammar string with the default
    /// configuration. The BNF dialect is detected and normalized first.
    ///
    /// # Errors
    ///
    /// Returns a [`CreateGeneratorError`] when the meta-grammar does not
    /// lex or parse, or the grammar fails analysis or compilation.
    pub fn new(grammar_text: &str) -> Result<Generator, CreateGeneratorError> {
        Self::with_config(grammar_text, Config::default())
    }

    /// Create a new [`Generator`] from a grammar string and a [`Config`].
    ///
    /// # Errors
    ///
    /// Returns a [`CreateGeneratorError`] when the meta-grammar does not
    /// lex or parse, or the grammar fails analysis or compilation.
    pub fn with_config(
        grammar_text: &str,
        config: Config,
    ) -> Result<Generator, CreateGeneratorError> {
        let normalizer = BnfNormalizer::new();
        let grammar_text = match normalizer.detect(grammar_text) {
            Dialect::Bnf => Cow::Owned(normalizer.normalize(grammar_text)),
            Dialect::Ebnf => Cow::Borrowed(grammar_text),
        };
        let rules = MetaParser::new(&grammar_text)?.parse_grammar()?;
        let reserved: AHashSet<String> = config.special_tokens.keys().cloned().collect();
        let grammar = Grammar::analyze(rules, &reserved, config.start_rule.as_deref())?;
        let program = Program::compile(&grammar, &config)?;
        let sync_points = config.runtime.sync_points.iter().cloned().collect();
        Ok(Generator {
            grammar,
            program,
            memoization: config.runtime.memoization,
            sync_points,
        })
    }

    /// Create a recognizer instance for one input string. Instances share no
    /// state; distinct instances may run on distinct threads.
    ///
    /// # Errors
    ///
    /// Returns a [`RecognizeError`] if the first input token cannot be lexed.
    pub fn recognizer<'a>(&'a self, input: &'a str) -> Result<Recognizer<'a>, RecognizeError> {
        Recognizer::new(&self.program, input, self.memoization, &self.sync_points)
    }

    /// Recognize one input string: `Ok(())` exactly when the start rule
    /// matches the whole token stream up to EOF.
    ///
    /// # Errors
    ///
    /// Returns a [`RecognizeError`] carrying a
    /// [`Diagnostic`](crate::recognizer::Diagnostic) when the input is
    /// rejected, or a lexing failure when it cannot be tokenized.
    pub fn recognize(&self, input: &str) -> Result<(), RecognizeError> {
        self.recognizer(input)?.recognize()
    }

    /// Render the source back-end: a standalone Rust recognizer module for
    /// this grammar.
    pub fn generate_source(&self) -> String {
        codegen::generate_source(&self.program)
    }

    /// The analyzed grammar.
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    /// The compiled program both back-ends consume.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// The name of the start rule.
    pub fn start_rule(&self) -> &str {
        &self.grammar.start_rule().name
    }

    /// The keyword set in stable order.
    pub fn keywords(&self) -> Vec<String> {
        utils::sorted_from_hash_set(self.grammar.keywords())
    }

    /// The symbol set in stable order.
    pub fn symbols(&self) -> Vec<String> {
        utils::sorted_from_hash_set(self.grammar.symbols())
    }

    /// Operator precedence levels harvested from expression-tier rules.
    /// See [`Grammar::precedence`].
    pub fn precedence(&self) -> &ahash::AHashMap<String, u32> {
        self.grammar.precedence()
    }
}
