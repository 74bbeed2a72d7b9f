//! The configuration module of the parser generator.
use ahash::AHashMap;
use serde::{Deserialize, Serialize};

/// The target-token binding of one reserved nonterminal name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SpecialToken {
    /// The kind label of the target token the name matches, e.g. `"INTEGER"`.
    /// The label must parse as a [`TokenKind`](crate::lexer::TokenKind).
    pub token_kind: String,
    /// The name of the predicate emitted for it, e.g. `"parse_integerConstant"`.
    pub predicate: String,
}

/// The configuration of the per-parse runtime.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Whether predicate results are memoized per `(rule, position)`.
    /// Memoization turns worst-case exponential backtracking into
    /// O(rules × positions) at the cost of a per-parse cache, and is
    /// transparent to the verdict. It is enabled by default.
    pub memoization: bool,
    /// Token lexemes used as resynchronization anchors when reporting
    /// errors. When non-empty, a failed parse scans forward for one of these
    /// and notes in the diagnostic that recovery was attempted; the verdict
    /// is still failure. Empty by default.
    pub sync_points: Vec<String>,
}

/// The configuration of the [`Generator`](crate::generator::Generator)
/// struct. This should suffice most scenarios.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// The reserved nonterminal names resolved by the target lexer instead of
    /// a rule, mapped to their token bindings. The defaults are `identifier`,
    /// `integerConstant` and `stringLiteral`.
    pub special_tokens: AHashMap<String, SpecialToken>,
    /// The kind label emitted for entirely-alphabetic terminals.
    /// The default is `KEYWORD`.
    pub keyword_type: String,
    /// The kind label emitted for all other terminals.
    /// The default is `SYMBOL`.
    pub symbol_type: String,
    /// The name of the start rule. The default is `None`, which selects the
    /// first rule of the grammar.
    pub start_rule: Option<String>,
    /// The configuration of the recognizer runtime.
    pub runtime: RuntimeConfig,
}

impl Default for Config {
    fn default() -> Self {
        let mut special_tokens = AHashMap::default();
        special_tokens.insert(
            "identifier".to_string(),
            SpecialToken {
                token_kind: "IDENTIFIER".to_string(),
                predicate: "parse_identifier".to_string(),
            },
        );
        special_tokens.insert(
            "integerConstant".to_string(),
            SpecialToken {
                token_kind: "INTEGER".to_string(),
                predicate: "parse_integerConstant".to_string(),
            },
        );
        special_tokens.insert(
            "stringLiteral".to_string(),
            SpecialToken {
                token_kind: "STRING".to_string(),
                predicate: "parse_stringLiteral".to_string(),
            },
        );
        Self {
            special_tokens,
            keyword_type: "KEYWORD".to_string(),
            symbol_type: "SYMBOL".to_string(),
            start_rule: None,
            runtime: RuntimeConfig {
                memoization: true,
                sync_points: Vec::new(),
            },
        }
    }
}
