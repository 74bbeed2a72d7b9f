/*!
# rdgen

This crate is a parser generator: it ingests a context-free grammar written in
an EBNF-like meta-language (with an optional angle-bracket BNF front-end) and
produces a self-contained recursive descent recognizer for the described
language. Applying the recognizer to an input string yields a pass/fail
verdict with line/column diagnostics. Here is a quick example of how this
crate works:

```rust
use rdgen::Generator;

let grammar = r#"
expr   = term , { ( "+" | "-" ) , term } ;
term   = factor , { ( "*" | "/" ) , factor } ;
factor = integerConstant | "(" , expr , ")" ;
"#;
let generator = Generator::new(grammar).unwrap();
assert!(generator.recognize("4*(5+6)").is_ok());
assert!(generator.recognize("3+*6").is_err());
```

# Overview

The primary type in this crate is [Generator]. The most important methods are:
- [Generator::new]: builds a generator from a grammar string with the default
  configuration. [Generator::with_config] allows a custom [Config].
- [Generator::recognize]: runs the direct-execution recognizer over an input
  string and returns `Ok(())` on acceptance or a [RecognizeError] carrying a
  [Diagnostic](recognizer::Diagnostic) on rejection.
- [Generator::generate_source]: renders the grammar as the Rust source text of
  a standalone recognizer module (the code-generating back-end).

Grammar text flows through the stages in [meta_lexer] and [meta_parser] (with
[bnf] normalizing the BNF dialect first when detected), is analyzed by
[grammar], compiled to the instruction tree in [ir], and finally either
interpreted by [recognizer] over the token stream of [lexer], or rendered as
source text by [codegen].

# Grammar syntax

Rules terminate with `;` (a missing final `;` is tolerated). Sequencing is
`,`, alternation is `|`, grouping is `( … )`. Repetition is `{ … }` or
postfix `*`, one-or-more is postfix `+`, option is `[ … ]` or postfix `?`.
Terminals are single- or double-quoted; a backslash escapes the next
character. Identifiers match `[A-Za-z_][A-Za-z0-9_-]*` and `#` starts a line
comment.

```ebnf
sentence = subject , verb , object ;
subject  = article , noun ;
article  = "the" | "a" ;
```

The first rule is the start symbol unless [Config::start_rule] names another.

## Built-in nonterminals

`identifier`, `integerConstant` and `stringLiteral` are reserved names that
match one target token of the corresponding kind (see [lexer::TokenKind])
instead of referring to a rule. Grammars that spell out numbers character by
character as `number = digit , { digit } ;` are rewritten to use the
`integerConstant` built-in, because the tokenizing runtime returns whole
integer tokens.

## BNF front-end

Input containing `::=` definitions with `<angle-bracket>` nonterminals is
first normalized to the EBNF surface: brackets are stripped (hyphens in names
fold to `_`), `{x}*`/`{x}+` become `{ x }`, `{x}?` becomes `[ x ]`, unquoted
C-style punctuators are quoted, sequence commas are inserted and each rule
gains a terminating `;`. The pass is purely textual and best-effort.

# Semantics

The generated recognizer implements ordered choice: alternatives are tried
left to right and the first success commits. Every predicate restores the
token cursor on failure, so backtracking is transparent. Zero-or-more loops
roll back the final failing attempt and stop as soon as an iteration consumes
no input. Left recursion is rejected at generation time with a rewrite
suggestion rather than looping at parse time.

Per-rule memoization of `(result, end position)` keyed by `(rule, start
position)` is enabled by default and can be switched off through
[config::RuntimeConfig]; it is transparent to the verdict and lives only for
the duration of one parse.
*/
#![warn(missing_docs)]
#![warn(rustdoc::broken_intra_doc_links)]
pub mod bnf;
pub mod codegen;
pub mod config;
pub mod generator;
pub mod grammar;
pub mod ir;
pub mod lexer;
pub mod meta_lexer;
pub mod meta_parser;
pub mod recognizer;
pub mod utils;
pub use config::Config;
pub use generator::CreateGeneratorError;
pub use generator::Generator;
pub use grammar::Grammar;
pub use lexer::Token;
pub use lexer::TokenKind;
pub use recognizer::RecognizeError;
pub use recognizer::Recognizer;
