//! The grammar AST and the analysis passes that prepare it for emission.
use std::fmt;

use ahash::{AHashMap, AHashSet};

use crate::utils;

/// The reserved built-in name that the digit idiom rewrites to.
pub(crate) const INTEGER_CONSTANT: &str = "integerConstant";

/// One node of the grammar AST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Matches the literal value in the input. The empty value always
    /// succeeds without consuming a token.
    Terminal(String),
    /// A reference to another rule, or to a reserved built-in name.
    Nonterminal(String),
    /// All items must match in order.
    Sequence(Vec<Node>),
    /// Ordered choice: the first option that matches wins.
    Alternative(Vec<Node>),
    /// Zero or more matches of the item.
    Repetition(Box<Node>),
    /// Zero or one match of the item.
    Optional(Box<Node>),
}

/// A named top-level grammar rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// The rule name.
    pub name: String,
    /// The right-hand side.
    pub definition: Node,
}

#[derive(Debug, thiserror::Error)]
/// The error type for defects found while analyzing a grammar.
pub enum GrammarError {
    #[error("the grammar contains no rules")]
    /// The rule list is empty.
    EmptyGrammar,
    #[error("rule {0} is defined more than once")]
    /// Two rules share a name.
    DuplicateRule(String),
    #[error("start rule {0} is not defined in the grammar")]
    /// The configured start rule does not exist.
    UnknownStartRule(String),
    #[error("rule {rule} references {name}, which is neither a rule nor a built-in token")]
    /// A nonterminal that resolves to no rule and no reserved name.
    DanglingReference {
        /// The rule containing the reference.
        rule: String,
        /// The unresolved name.
        name: String,
    },
    #[error(
        "rule {name} is directly left-recursive and the recognizer would never \
         terminate; rewrite the recursion as an iteration, \
         e.g. {name} = operand , {{ op , operand }}"
    )]
    /// A rule whose expansion can begin with the rule itself.
    LeftRecursion {
        /// The left-recursive rule.
        name: String,
    },
}

/// The analyzed grammar: the rule list plus the terminal classification and
/// the set of rules suppressed from emission. Built once from the parsed
/// rules, then read-only for emission.
pub struct Grammar {
    rules: Vec<Rule>,
    keywords: AHashSet<String>,
    symbols: AHashSet<String>,
    suppressed: AHashSet<String>,
    precedence: AHashMap<String, u32>,
    start: usize,
}

impl Grammar {
    /// Analyze the parsed rules: rewrite the empty-terminal and digit idioms,
    /// classify terminals into keywords and symbols, and validate references,
    /// uniqueness and the absence of direct left recursion.
    ///
    /// # Arguments
    ///
    /// * `rules` - The rules from the meta-parser, in source order.
    /// * `reserved` - The built-in nonterminal names (from the configuration).
    /// * `start_rule` - An explicit start rule name, or `None` for the first.
    ///
    /// # Errors
    ///
    /// Returns a [`GrammarError`] for an empty grammar, a duplicate rule
    /// name, an unknown start rule, a dangling reference, or direct left
    /// recursion.
    pub fn analyze(
        mut rules: Vec<Rule>,
        reserved: &AHashSet<String>,
        start_rule: Option<&str>,
    ) -> Result<Grammar, GrammarError> {
        if rules.is_empty() {
            return Err(GrammarError::EmptyGrammar);
        }
        let mut seen = AHashSet::default();
        for rule in &rules {
            if !seen.insert(rule.name.clone()) {
                return Err(GrammarError::DuplicateRule(rule.name.clone()));
            }
        }
        for rule in &mut rules {
            let definition = std::mem::replace(&mut rule.definition, Node::Terminal(String::new()));
            rule.definition = rewrite_empty_alternatives(definition, &rule.name);
        }
        let start = match start_rule {
            Some(name) => rules
                .iter()
                .position(|r| r.name == name)
                .ok_or_else(|| GrammarError::UnknownStartRule(name.to_string()))?,
            None => 0,
        };
        let suppressed = rewrite_digit_idiom(&mut rules, start);
        let precedence = collect_precedence(&rules);
        let mut grammar = Grammar {
            rules,
            keywords: AHashSet::default(),
            symbols: AHashSet::default(),
            suppressed,
            precedence,
            start,
        };
        grammar.collect_terminals(reserved);
        grammar.check_references(reserved)?;
        grammar.check_left_recursion()?;
        Ok(grammar)
    }

    /// All rules in source order, including suppressed ones.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The start rule.
    pub fn start_rule(&self) -> &Rule {
        &self.rules[self.start]
    }

    /// The keyword set: entirely-alphabetic terminals.
    pub fn keywords(&self) -> &AHashSet<String> {
        &self.keywords
    }

    /// The symbol set: all other terminals except empty strings, single
    /// decimal digits and reserved names.
    pub fn symbols(&self) -> &AHashSet<String> {
        &self.symbols
    }

    /// The names of rules excluded from emission by the digit-idiom rewrite.
    pub fn suppressed(&self) -> &AHashSet<String> {
        &self.suppressed
    }

    /// Whether the named rule is excluded from emission.
    pub fn is_suppressed(&self, name: &str) -> bool {
        self.suppressed.contains(name)
    }

    /// Operator precedence levels harvested from expression-tier rules:
    /// every non-alphabetic terminal alternative of a rule whose name ends in
    /// `Expression` (or `_expression`) is assigned that rule's tier, counted
    /// from the top of the grammar. Informational; downstream code
    /// generators can use it to build operator tables.
    pub fn precedence(&self) -> &AHashMap<String, u32> {
        &self.precedence
    }

    fn collect_terminals(&mut self, reserved: &AHashSet<String>) {
        fn visit(
            node: &Node,
            reserved: &AHashSet<String>,
            keywords: &mut AHashSet<String>,
            symbols: &mut AHashSet<String>,
        ) {
            match node {
                Node::Terminal(value) => {
                    if reserved.contains(value) {
                        return;
                    }
                    if !value.is_empty() && value.chars().all(|c| c.is_ascii_alphabetic()) {
                        keywords.insert(value.clone());
                    } else if !value.is_empty() && !is_single_digit(value) {
                        symbols.insert(value.clone());
                    }
                }
                Node::Nonterminal(_) => {}
                Node::Sequence(items) | Node::Alternative(items) => {
                    for item in items {
                        visit(item, reserved, keywords, symbols);
                    }
                }
                Node::Repetition(item) | Node::Optional(item) => {
                    visit(item, reserved, keywords, symbols);
                }
            }
        }
        let mut keywords = AHashSet::default();
        let mut symbols = AHashSet::default();
        for rule in &self.rules {
            if self.suppressed.contains(&rule.name) {
                continue;
            }
            visit(&rule.definition, reserved, &mut keywords, &mut symbols);
        }
        self.keywords = keywords;
        self.symbols = symbols;
    }

    fn check_references(&self, reserved: &AHashSet<String>) -> Result<(), GrammarError> {
        let defined: AHashSet<&str> = self.rules.iter().map(|r| r.name.as_str()).collect();
        fn visit(
            node: &Node,
            rule: &str,
            defined: &AHashSet<&str>,
            reserved: &AHashSet<String>,
        ) -> Result<(), GrammarError> {
            match node {
                Node::Nonterminal(name) => {
                    if !defined.contains(name.as_str()) && !reserved.contains(name) {
                        return Err(GrammarError::DanglingReference {
                            rule: rule.to_string(),
                            name: name.clone(),
                        });
                    }
                    Ok(())
                }
                Node::Terminal(_) => Ok(()),
                Node::Sequence(items) | Node::Alternative(items) => {
                    items.iter().try_for_each(|item| visit(item, rule, defined, reserved))
                }
                Node::Repetition(item) | Node::Optional(item) => {
                    visit(item, rule, defined, reserved)
                }
            }
        }
        for rule in &self.rules {
            if self.suppressed.contains(&rule.name) {
                continue;
            }
            visit(&rule.definition, &rule.name, &defined, reserved)?;
        }
        Ok(())
    }

    fn check_left_recursion(&self) -> Result<(), GrammarError> {
        for rule in &self.rules {
            if self.suppressed.contains(&rule.name) {
                continue;
            }
            let mut heads = Vec::new();
            collect_heads(&rule.definition, &mut heads);
            if heads.iter().any(|head| *head == rule.name) {
                return Err(GrammarError::LeftRecursion {
                    name: rule.name.clone(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grammar")
            .field("start", &self.start_rule().name)
            .field("rules", &format!("{self}"))
            .field("keywords", &utils::sorted_from_hash_set(&self.keywords))
            .field("symbols", &utils::sorted_from_hash_set(&self.symbols))
            .field("suppressed", &utils::sorted_from_hash_set(&self.suppressed))
            .field("precedence", &{
                let mut levels: Vec<_> = self.precedence.iter().collect();
                levels.sort();
                levels
            })
            .finish()
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rule in &self.rules {
            writeln!(f, "{rule}")?;
        }
        Ok(())
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {} ;", self.name, self.definition)
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_grouped(f, Surround::Top)
    }
}

/// The printing context of a node, which decides whether it needs parentheses
/// to reparse into the same shape.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Surround {
    Top,
    Sequence,
    Alternative,
}

impl Node {
    /// Pretty-print as parseable EBNF. An alternative nested in a sequence
    /// (or another alternative) and a sequence nested in a sequence are
    /// parenthesized; braces and brackets group on their own.
    fn fmt_grouped(&self, f: &mut fmt::Formatter<'_>, surround: Surround) -> fmt::Result {
        match self {
            Node::Terminal(value) => {
                write!(f, "\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
            }
            Node::Nonterminal(name) => write!(f, "{name}"),
            Node::Sequence(items) => {
                let grouped = surround == Surround::Sequence;
                if grouped {
                    write!(f, "( ")?;
                }
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, " , ")?;
                    }
                    item.fmt_grouped(f, Surround::Sequence)?;
                }
                if grouped {
                    write!(f, " )")?;
                }
                Ok(())
            }
            Node::Alternative(options) => {
                let grouped = surround != Surround::Top;
                if grouped {
                    write!(f, "( ")?;
                }
                for (i, option) in options.iter().enumerate() {
                    if i > 0 {
                        write!(f, " | ")?;
                    }
                    option.fmt_grouped(f, Surround::Alternative)?;
                }
                if grouped {
                    write!(f, " )")?;
                }
                Ok(())
            }
            Node::Repetition(item) => write!(f, "{{ {item} }}"),
            Node::Optional(item) => write!(f, "[ {item} ]"),
        }
    }
}

fn is_single_digit(value: &str) -> bool {
    let mut chars = value.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_digit())
}

/// First nonterminals a node can expand to without consuming a token.
/// Sequences contribute only their head; repetitions and optionals may start
/// with their item. Cross-rule (indirect) recursion is not followed.
fn collect_heads<'n>(node: &'n Node, out: &mut Vec<&'n str>) {
    match node {
        Node::Terminal(_) => {}
        Node::Nonterminal(name) => out.push(name),
        Node::Sequence(items) => {
            if let Some(first) = items.first() {
                collect_heads(first, out);
            }
        }
        Node::Alternative(options) => {
            for option in options {
                collect_heads(option, out);
            }
        }
        Node::Repetition(item) | Node::Optional(item) => collect_heads(item, out),
    }
}

/// Rewrite `a | "" ` alternatives into `[ a ]`. An empty terminal commits the
/// choice, so options after it can never match; they are dropped with a
/// warning.
fn rewrite_empty_alternatives(node: Node, rule: &str) -> Node {
    match node {
        Node::Alternative(options) => {
            let mut options: Vec<Node> = options
                .into_iter()
                .map(|o| rewrite_empty_alternatives(o, rule))
                .collect();
            let empty_at = options
                .iter()
                .position(|o| matches!(o, Node::Terminal(v) if v.is_empty()));
            match empty_at {
                None => Node::Alternative(options),
                Some(0) => {
                    log::warn!(
                        "rule {rule}: an empty terminal is the first alternative, \
                         so the remaining options are unreachable"
                    );
                    Node::Terminal(String::new())
                }
                Some(index) => {
                    if index + 1 < options.len() {
                        log::warn!(
                            "rule {rule}: alternatives after an empty terminal \
                             are unreachable and were dropped"
                        );
                    }
                    options.truncate(index);
                    let inner = if options.len() == 1 {
                        options.remove(0)
                    } else {
                        Node::Alternative(options)
                    };
                    Node::Optional(Box::new(inner))
                }
            }
        }
        Node::Sequence(items) => Node::Sequence(
            items
                .into_iter()
                .map(|i| rewrite_empty_alternatives(i, rule))
                .collect(),
        ),
        Node::Repetition(item) => {
            Node::Repetition(Box::new(rewrite_empty_alternatives(*item, rule)))
        }
        Node::Optional(item) => Node::Optional(Box::new(rewrite_empty_alternatives(*item, rule))),
        other => other,
    }
}

/// Detect the hand-written numeric idiom `number = digit , { digit } ;` (or
/// `number = digit ;`) and rewrite every `number` reference to the
/// `integerConstant` built-in. Character-by-character digit rules cannot work
/// against a tokenizing runtime that returns whole `INTEGER` tokens, so both
/// helper rules are suppressed from emission. Returns the suppressed names.
fn rewrite_digit_idiom(rules: &mut [Rule], start: usize) -> AHashSet<String> {
    let mut suppressed = AHashSet::default();
    let number = rules.iter().find(|r| r.name == "number");
    let has_digit = rules.iter().any(|r| r.name == "digit");
    let matches_idiom = match number {
        Some(rule) if has_digit => is_digit_sequence(&rule.definition),
        _ => false,
    };
    if !matches_idiom {
        return suppressed;
    }
    for rule in rules.iter_mut() {
        replace_number_refs(&mut rule.definition);
    }
    suppressed.insert("digit".to_string());
    suppressed.insert("number".to_string());
    // The start rule cannot be suppressed. A `number` start is redirected to
    // the built-in; a `digit` start keeps its own definition.
    if rules[start].name == "number" {
        suppressed.remove("number");
        rules[start].definition = Node::Terminal(INTEGER_CONSTANT.to_string());
    } else {
        suppressed.remove(&rules[start].name);
    }
    // A digit rule still referenced outside the idiom must keep being emitted.
    let referenced = rules
        .iter()
        .filter(|r| !suppressed.contains(&r.name))
        .any(|r| references(&r.definition, "digit"));
    if referenced {
        suppressed.remove("digit");
    }
    suppressed
}

fn is_digit_sequence(definition: &Node) -> bool {
    let is_digit_ref = |node: &Node| matches!(node, Node::Nonterminal(n) if n == "digit");
    match definition {
        Node::Nonterminal(name) => name == "digit",
        Node::Sequence(items) => match items.as_slice() {
            [first] => is_digit_ref(first),
            [first, Node::Repetition(rest)] => is_digit_ref(first) && is_digit_ref(rest),
            _ => false,
        },
        _ => false,
    }
}

fn replace_number_refs(node: &mut Node) {
    match node {
        Node::Nonterminal(name) if name == "number" => {
            *node = Node::Terminal(INTEGER_CONSTANT.to_string());
        }
        Node::Sequence(items) | Node::Alternative(items) => {
            items.iter_mut().for_each(replace_number_refs);
        }
        Node::Repetition(item) | Node::Optional(item) => replace_number_refs(item),
        _ => {}
    }
}

/// Walk the expression-tier rules in source order and record which level
/// each operator terminal sits at. Earlier tiers bind looser, matching the
/// usual top-down layering of expression grammars.
fn collect_precedence(rules: &[Rule]) -> AHashMap<String, u32> {
    let mut precedence = AHashMap::default();
    let mut level = 0;
    for rule in rules {
        if !rule.name.ends_with("Expression") && !rule.name.ends_with("_expression") {
            continue;
        }
        let mut operators = Vec::new();
        extract_operators(&rule.definition, &mut operators);
        for operator in operators {
            precedence.entry(operator).or_insert(level);
        }
        level += 1;
    }
    precedence
}

fn extract_operators(node: &Node, out: &mut Vec<String>) {
    match node {
        Node::Alternative(options) => {
            for option in options {
                if let Node::Terminal(value) = option {
                    if !value.is_empty() && !value.chars().all(|c| c.is_ascii_alphabetic()) {
                        out.push(value.clone());
                    }
                }
            }
            for option in options {
                extract_operators(option, out);
            }
        }
        Node::Sequence(items) => {
            for item in items {
                extract_operators(item, out);
            }
        }
        Node::Repetition(item) | Node::Optional(item) => extract_operators(item, out),
        _ => {}
    }
}

fn references(node: &Node, name: &str) -> bool {
    match node {
        Node::Nonterminal(n) => n == name,
        Node::Terminal(_) => false,
        Node::Sequence(items) | Node::Alternative(items) => {
            items.iter().any(|item| references(item, name))
        }
        Node::Repetition(item) | Node::Optional(item) => references(item, name),
    }
}
