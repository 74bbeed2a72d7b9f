//! Best-effort textual normalizer for the angle-bracket BNF dialect.
//!
//! Grammars written as `<name> ::= …` with brace repetition postfixes are
//! rewritten into the EBNF surface the meta-parser understands. The pass is
//! purely textual: names are folded, punctuators quoted, sequence commas
//! inserted and rule terminators appended. It makes no attempt to validate
//! the result; that is the meta-parser's job.
use regex::Regex;

/// The meta-grammar dialect of an input text.
#[derive(Debug, displaydoc::Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// EBNF
    Ebnf,
    /// BNF
    Bnf,
}

/// Unquoted target-language punctuators the normalizer wraps in quotes.
/// Matched longest first so `<<=` wins over `<<` and `<`.
const C_PUNCTUATORS: &[&str] = &[
    "<<=", ">>=", "...", "++", "--", "->", "<<", ">>", "<=", ">=", "==", "!=", "&&", "||", "+=",
    "-=", "*=", "/=", "%=", "&=", "|=", "^=", "+", "-", "*", "/", "%", "<", ">", "&", "^", "!",
    "~", "(", ")", ".", ":", ";", "=",
];

enum Piece {
    Word(String),
    Quoted(String),
    Open(char),
    Close(char),
    Pipe,
    Comma,
    Def,
    Postfix(char),
}

/// The BNF-to-EBNF rewriter. Construct once, reuse for any number of texts.
pub struct BnfNormalizer {
    angle_name: Regex,
}

impl Default for BnfNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl BnfNormalizer {
    /// Create a normalizer.
    pub fn new() -> Self {
        Self {
            angle_name: Regex::new(r"<([A-Za-z][A-Za-z0-9_-]*)>").expect("angle name pattern"),
        }
    }

    /// Decide which meta-grammar dialect `text` is written in: `::=` together
    /// with angle-bracketed names selects BNF, everything else is treated as
    /// the EBNF surface.
    pub fn detect(&self, text: &str) -> Dialect {
        if text.contains("::=") && self.angle_name.is_match(text) {
            Dialect::Bnf
        } else {
            Dialect::Ebnf
        }
    }

    /// Rewrite a BNF text into the EBNF surface, rule by rule.
    pub fn normalize(&self, text: &str) -> String {
        let mut rules: Vec<String> = Vec::new();
        let mut current: Option<String> = None;
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line.contains("::=") {
                if let Some(done) = current.take() {
                    rules.push(self.process_rule(&done));
                }
                current = Some(line.to_string());
            } else if let Some(rule) = current.as_mut() {
                // Continuation lines (usually starting with `|`) are stitched
                // onto the rule they extend.
                rule.push(' ');
                rule.push_str(line);
            } else {
                log::warn!("ignoring BNF line outside any rule: {line:?}");
            }
        }
        if let Some(done) = current.take() {
            rules.push(self.process_rule(&done));
        }
        rules.join("\n")
    }

    fn process_rule(&self, line: &str) -> String {
        let line = self
            .angle_name
            .replace_all(line, |caps: &regex::Captures<'_>| caps[1].replace('-', "_"))
            .into_owned();
        let pieces = scan_pieces(&line);
        emit_pieces(&pieces)
    }
}

fn scan_pieces(line: &str) -> Vec<Piece> {
    let chars: Vec<char> = line.chars().collect();
    let mut pieces: Vec<Piece> = Vec::new();
    // Stack of indices of open braces/brackets, so `{x}?` can retroactively
    // turn its opener into `[`.
    let mut opens: Vec<usize> = Vec::new();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if starts_with_at(&chars, i, "::=") {
            pieces.push(Piece::Def);
            i += 3;
            continue;
        }
        if c.is_ascii_alphabetic() || c == '_' {
            let (word, next) = scan_word(&chars, i);
            pieces.push(Piece::Word(word.replace('-', "_")));
            i = next;
            continue;
        }
        if c.is_ascii_digit() {
            let mut digits = String::new();
            while i < chars.len() && chars[i].is_ascii_digit() {
                digits.push(chars[i]);
                i += 1;
            }
            pieces.push(Piece::Quoted(format!("\"{digits}\"")));
            continue;
        }
        if c == '"' || c == '\'' {
            let (content, next) = scan_quoted(&chars, i, c);
            pieces.push(Piece::Quoted(format!(
                "\"{}\"",
                content.replace('\\', "\\\\").replace('"', "\\\"")
            )));
            i = next;
            continue;
        }
        if c == '{' || c == '[' {
            opens.push(pieces.len());
            pieces.push(Piece::Open(c));
            i += 1;
            continue;
        }
        if c == '}' || c == ']' {
            let open_idx = opens.pop();
            let mut j = i + 1;
            while j < chars.len() && chars[j].is_ascii_whitespace() {
                j += 1;
            }
            match (c, chars.get(j).copied()) {
                ('}', Some('*')) | ('}', Some('+')) => {
                    // `{x}*` and `{x}+` both collapse to plain repetition.
                    pieces.push(Piece::Close('}'));
                    i = j + 1;
                }
                ('}', Some('?')) => {
                    if let Some(idx) = open_idx {
                        pieces[idx] = Piece::Open('[');
                    }
                    pieces.push(Piece::Close(']'));
                    i = j + 1;
                }
                _ => {
                    pieces.push(Piece::Close(c));
                    i += 1;
                }
            }
            continue;
        }
        if let Some(sym) = C_PUNCTUATORS
            .iter()
            .find(|sym| starts_with_at(&chars, i, sym))
        {
            pieces.push(Piece::Quoted(format!("\"{sym}\"")));
            i += sym.chars().count();
            continue;
        }
        if c == '|' {
            pieces.push(Piece::Pipe);
            i += 1;
            continue;
        }
        if c == ',' {
            pieces.push(Piece::Comma);
            i += 1;
            continue;
        }
        if c == '?' {
            pieces.push(Piece::Postfix('?'));
            i += 1;
            continue;
        }
        log::warn!("dropping unrecognized BNF character {c:?}");
        i += 1;
    }
    pieces
}

fn emit_pieces(pieces: &[Piece]) -> String {
    let mut out = String::new();
    let mut prev_element_end = false;
    let mut has_def = false;
    for piece in pieces {
        let element_start = matches!(
            piece,
            Piece::Word(_) | Piece::Quoted(_) | Piece::Open(_)
        );
        if !out.is_empty() {
            if element_start && prev_element_end {
                out.push_str(" , ");
            } else {
                out.push(' ');
            }
        }
        match piece {
            Piece::Word(word) => out.push_str(word),
            Piece::Quoted(quoted) => out.push_str(quoted),
            Piece::Open(c) | Piece::Close(c) | Piece::Postfix(c) => out.push(*c),
            Piece::Pipe => out.push('|'),
            Piece::Comma => out.push(','),
            Piece::Def => {
                out.push('=');
                has_def = true;
            }
        }
        prev_element_end = matches!(piece, Piece::Word(_) | Piece::Quoted(_) | Piece::Close(_));
    }
    if has_def && !out.ends_with(';') {
        out.push_str(" ;");
    }
    out
}

fn starts_with_at(chars: &[char], at: usize, literal: &str) -> bool {
    literal
        .chars()
        .enumerate()
        .all(|(k, c)| chars.get(at + k) == Some(&c))
}

/// A word is `[A-Za-z_]` followed by `[A-Za-z0-9_]`, taking a `-` only when
/// another word character follows, so trailing operators like `->` survive.
fn scan_word(chars: &[char], at: usize) -> (String, usize) {
    let mut word = String::new();
    let mut i = at;
    while i < chars.len() {
        let c = chars[i];
        if c.is_ascii_alphanumeric() || c == '_' {
            word.push(c);
            i += 1;
        } else if c == '-'
            && chars
                .get(i + 1)
                .is_some_and(|n| n.is_ascii_alphanumeric() || *n == '_')
        {
            word.push(c);
            i += 1;
        } else {
            break;
        }
    }
    (word, i)
}

fn scan_quoted(chars: &[char], at: usize, quote: char) -> (String, usize) {
    let mut content = String::new();
    let mut i = at + 1;
    while i < chars.len() {
        let c = chars[i];
        if c == quote {
            return (content, i + 1);
        }
        if c == '\\' {
            if let Some(escaped) = chars.get(i + 1) {
                content.push(*escaped);
                i += 2;
                continue;
            }
        }
        content.push(c);
        i += 1;
    }
    log::warn!("unterminated quote in BNF rule; taking the rest of the line");
    (content, i)
}
