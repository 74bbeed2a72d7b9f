//! The instruction tree both back-ends consume: the direct-execution
//! recognizer interprets it, the code generator renders it as source text.
use std::fmt::Debug;
use std::str::FromStr;

use ahash::{AHashMap, AHashSet};
use string_interner::{DefaultStringInterner, DefaultSymbol};

use crate::config::Config;
use crate::grammar::{Grammar, Node};
use crate::lexer::TokenKind;
use crate::utils;

/// The wrapper struct that represents a retained rule's id in the program.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct RuleId(pub u32);

/// The wrapper struct that represents a built-in predicate's id in the program.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct SpecialId(pub u8);

/// The target-token binding of one reserved name, resolved from the
/// configuration's labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecialSpec {
    /// The reserved nonterminal name, e.g. `integerConstant`.
    pub name: String,
    /// The target-token kind the built-in matches.
    pub kind: TokenKind,
    /// The predicate name used by the code-generating back-end.
    pub predicate: String,
}

/// One instruction of a compiled rule body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inst {
    /// Succeed without consuming a token (the empty terminal).
    Accept,
    /// Match one `KEYWORD` token with this lexeme.
    Keyword(String),
    /// Match one `SYMBOL` token with this lexeme.
    Symbol(String),
    /// Match one token of a built-in's kind, any lexeme.
    Builtin(SpecialId),
    /// Invoke another rule's predicate.
    Call(RuleId),
    /// Short-circuit conjunction in order.
    Seq(Vec<Inst>),
    /// Ordered choice: first success commits.
    Alt(Vec<Inst>),
    /// Zero-or-more loop with per-attempt rollback.
    Star(Box<Inst>),
    /// Zero-or-one with rollback.
    Opt(Box<Inst>),
}

#[derive(Debug, thiserror::Error)]
/// The error type for failures while compiling a grammar to instructions.
pub enum CompileError {
    #[error("special token {name} maps to unknown token kind label {label:?}")]
    /// A configured kind label that names no [`TokenKind`].
    UnknownTokenKind {
        /// The reserved name being bound.
        name: String,
        /// The label that failed to parse.
        label: String,
    },
    #[error("rule {rule} references {name}, which was not compiled")]
    /// A reference that survived analysis but resolves to no retained rule.
    UnresolvedReference {
        /// The rule containing the reference.
        rule: String,
        /// The unresolved name.
        name: String,
    },
}

/// One retained rule, compiled.
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub(crate) name: DefaultSymbol,
    pub(crate) body: Inst,
}

/// The compiled program: one body per retained rule, the start rule id, the
/// built-in bindings, and the keyword/symbol sets the target lexer needs.
#[derive(Clone)]
pub struct Program {
    names: DefaultStringInterner,
    rules: Vec<CompiledRule>,
    start: RuleId,
    specials: Vec<SpecialSpec>,
    keywords: AHashSet<String>,
    symbols: AHashSet<String>,
    /// Symbol literals sorted longest first for the lexer's longest match.
    symbol_matcher: Vec<String>,
    keyword_label: String,
    symbol_label: String,
}

impl Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rules: Vec<(String, &Inst)> = self
            .rules
            .iter()
            .map(|rule| {
                (
                    self.names.resolve(rule.name).unwrap_or("?").to_string(),
                    &rule.body,
                )
            })
            .collect();
        f.debug_struct("Program")
            .field("start", &self.rule_name(self.start).unwrap_or("?"))
            .field("rules", &rules)
            .field("specials", &self.specials)
            .field("keywords", &utils::sorted_from_hash_set(&self.keywords))
            .field("symbols", &utils::sorted_from_hash_set(&self.symbols))
            .finish()
    }
}

impl Program {
    /// Compile an analyzed grammar against a configuration. Suppressed rules
    /// are not compiled; every retained rule keeps its source order.
    ///
    /// # Errors
    ///
    /// Returns a [`CompileError`] if a configured kind label does not parse
    /// or a reference resolves to no retained rule.
    pub fn compile(grammar: &Grammar, config: &Config) -> Result<Program, CompileError> {
        let mut specials = Vec::new();
        let mut special_ids: AHashMap<&str, SpecialId> = AHashMap::default();
        let mut names: Vec<&String> = config.special_tokens.keys().collect();
        names.sort();
        for name in names {
            let binding = &config.special_tokens[name];
            let kind = TokenKind::from_str(&binding.token_kind).map_err(|_| {
                CompileError::UnknownTokenKind {
                    name: name.clone(),
                    label: binding.token_kind.clone(),
                }
            })?;
            special_ids.insert(name.as_str(), SpecialId(specials.len() as u8));
            specials.push(SpecialSpec {
                name: name.clone(),
                kind,
                predicate: binding.predicate.clone(),
            });
        }
        let mut interner = DefaultStringInterner::default();
        let mut rule_ids: AHashMap<&str, RuleId> = AHashMap::default();
        let mut compiled: Vec<(DefaultSymbol, &Node, &str)> = Vec::new();
        for rule in grammar.rules() {
            if grammar.is_suppressed(&rule.name) {
                continue;
            }
            rule_ids.insert(&rule.name, RuleId(compiled.len() as u32));
            compiled.push((
                interner.get_or_intern(&rule.name),
                &rule.definition,
                &rule.name,
            ));
        }
        let mut rules = Vec::with_capacity(compiled.len());
        for (name, definition, rule_name) in compiled {
            let body = lower(definition, rule_name, &special_ids, &rule_ids)?;
            rules.push(CompiledRule { name, body });
        }
        let start = rule_ids[grammar.start_rule().name.as_str()];
        let keywords = grammar.keywords().clone();
        let symbols = grammar.symbols().clone();
        let mut symbol_matcher = utils::sorted_from_hash_set(&symbols);
        symbol_matcher.sort_by_key(|s| std::cmp::Reverse(s.chars().count()));
        Ok(Program {
            names: interner,
            rules,
            start,
            specials,
            keywords,
            symbols,
            symbol_matcher,
            keyword_label: config.keyword_type.clone(),
            symbol_label: config.symbol_type.clone(),
        })
    }

    #[inline]
    /// Get the start rule id.
    pub fn start(&self) -> RuleId {
        self.start
    }

    #[inline]
    /// Get all retained rules in emission order.
    pub fn rules(&self) -> &[CompiledRule] {
        &self.rules
    }

    #[inline]
    /// Get a retained rule's body.
    pub fn body(&self, id: RuleId) -> &Inst {
        &self.rules[id.0 as usize].body
    }

    #[inline]
    /// Get a retained rule's name.
    pub fn rule_name(&self, id: RuleId) -> Option<&str> {
        self.names.resolve(self.rules[id.0 as usize].name)
    }

    #[inline]
    /// Get the built-in bindings.
    pub fn specials(&self) -> &[SpecialSpec] {
        &self.specials
    }

    #[inline]
    /// Get the keyword set.
    pub fn keywords(&self) -> &AHashSet<String> {
        &self.keywords
    }

    #[inline]
    /// Get the symbol set.
    pub fn symbols(&self) -> &AHashSet<String> {
        &self.symbols
    }

    #[inline]
    /// Get the symbol literals sorted longest first.
    pub fn symbol_matcher(&self) -> &[String] {
        &self.symbol_matcher
    }

    #[inline]
    /// Get the kind label emitted for keyword matches.
    pub fn keyword_label(&self) -> &str {
        &self.keyword_label
    }

    #[inline]
    /// Get the kind label emitted for symbol matches.
    pub fn symbol_label(&self) -> &str {
        &self.symbol_label
    }
}

fn lower(
    node: &Node,
    rule: &str,
    special_ids: &AHashMap<&str, SpecialId>,
    rule_ids: &AHashMap<&str, RuleId>,
) -> Result<Inst, CompileError> {
    Ok(match node {
        Node::Terminal(value) => {
            if value.is_empty() {
                Inst::Accept
            } else if let Some(&id) = special_ids.get(value.as_str()) {
                Inst::Builtin(id)
            } else if value.chars().all(|c| c.is_ascii_alphabetic()) {
                Inst::Keyword(value.clone())
            } else {
                Inst::Symbol(value.clone())
            }
        }
        Node::Nonterminal(name) => {
            if let Some(&id) = special_ids.get(name.as_str()) {
                Inst::Builtin(id)
            } else if let Some(&id) = rule_ids.get(name.as_str()) {
                Inst::Call(id)
            } else {
                return Err(CompileError::UnresolvedReference {
                    rule: rule.to_string(),
                    name: name.clone(),
                });
            }
        }
        Node::Sequence(items) => Inst::Seq(
            items
                .iter()
                .map(|item| lower(item, rule, special_ids, rule_ids))
                .collect::<Result<_, _>>()?,
        ),
        Node::Alternative(options) => Inst::Alt(
            options
                .iter()
                .map(|option| lower(option, rule, special_ids, rule_ids))
                .collect::<Result<_, _>>()?,
        ),
        Node::Repetition(item) => {
            if nullable(item) {
                log::warn!(
                    "rule {rule}: a repetition body that can match empty input \
                     relies on the zero-consumption guard to terminate"
                );
            }
            Inst::Star(Box::new(lower(item, rule, special_ids, rule_ids)?))
        }
        Node::Optional(item) => Inst::Opt(Box::new(lower(item, rule, special_ids, rule_ids)?)),
    })
}

/// Whether a node can match without consuming a token. References are
/// conservatively treated as consuming; the runtime guard covers the rest.
fn nullable(node: &Node) -> bool {
    match node {
        Node::Terminal(value) => value.is_empty(),
        Node::Nonterminal(_) => false,
        Node::Sequence(items) => items.iter().all(nullable),
        Node::Alternative(options) => options.iter().any(nullable),
        Node::Repetition(_) | Node::Optional(_) => true,
    }
}
