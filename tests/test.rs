#[cfg(test)]
mod tests {
    use insta::assert_snapshot;
    use rdgen::bnf::BnfNormalizer;
    use rdgen::config::RuntimeConfig;
    use rdgen::grammar::{GrammarError, Node};
    use rdgen::meta_parser::MetaParser;
    use rdgen::recognizer::RecognizeError;
    use rdgen::{Config, CreateGeneratorError, Generator};

    const ARITHMETIC: &str = r#"
expr   = term , { ( "+" | "-" ) , term } ;
term   = factor , { ( "*" | "/" ) , factor } ;
factor = integerConstant | "(" , expr , ")" ;
"#;

    const SENTENCE: &str = r#"
sentence = subject , verb , object ;
subject  = article , noun ;
article  = "the" | "a" ;
noun     = "cat" | "dog" | "bird" ;
verb     = "chases" | "catches" | "watches" ;
object   = article , noun ;
"#;

    const JSONISH: &str = r#"
value  = stringLiteral | integerConstant | object | array | "true" | "false" | "null" ;
object = "{" , [ member , { "," , member } ] , "}" ;
member = stringLiteral , ":" , value ;
array  = "[" , [ value , { "," , value } ] , "]" ;
"#;

    fn generator(grammar: &str) -> Generator {
        Generator::new(grammar).expect("grammar should generate")
    }

    fn reject_message(generator: &Generator, input: &str) -> String {
        generator
            .recognize(input)
            .expect_err("input should be rejected")
            .to_string()
    }

    #[test]
    fn arithmetic_accepts() {
        let generator = generator(ARITHMETIC);
        for input in ["4*(5+6)", "1", "1+2*3-4/5", "((((7))))", "10 + 20"] {
            assert!(
                generator.recognize(input).is_ok(),
                "failed to accept {input:?}"
            );
        }
    }

    #[test]
    fn arithmetic_rejects_with_position() {
        let generator = generator(ARITHMETIC);
        let message = reject_message(&generator, "3+*6");
        assert!(
            message.contains("column 3"),
            "diagnostic should point at the `*`: {message}"
        );
        assert!(
            message.contains(r#"integerConstant or "(""#),
            "diagnostic should list both factor alternatives: {message}"
        );
    }

    #[test]
    fn sentence_accepts_and_rejects_at_verb() {
        let generator = generator(SENTENCE);
        assert!(generator.recognize("the cat watches the bird").is_ok());
        assert!(generator.recognize("a dog chases a cat").is_ok());
        let message = reject_message(&generator, "the cat the dog");
        assert!(
            message.contains("column 9"),
            "diagnostic should point at the second `the`: {message}"
        );
        assert!(
            message.contains("chases") && message.contains("watches"),
            "diagnostic should expect a verb keyword: {message}"
        );
    }

    #[test]
    fn jsonish_accepts_and_rejects_missing_value() {
        let generator = generator(JSONISH);
        assert!(generator.recognize(r#"{"a":[1,2,3]}"#).is_ok());
        assert!(generator.recognize(r#"{}"#).is_ok());
        assert!(generator.recognize(r#"[true,false,null]"#).is_ok());
        let message = reject_message(&generator, r#"{"a":}"#);
        assert!(
            message.contains("column 6"),
            "diagnostic should point at the `}}`: {message}"
        );
        assert!(
            message.contains("stringLiteral"),
            "diagnostic should expect a value: {message}"
        );
    }

    #[test]
    fn keyword_and_symbol_classification() {
        let generator1 = generator(SENTENCE);
        let keywords = generator1.keywords();
        assert!(keywords.iter().any(|k| k == "the"));
        assert!(keywords.iter().any(|k| k == "watches"));
        assert!(generator1.symbols().is_empty());

        let generator2 = generator(ARITHMETIC);
        assert!(generator2.keywords().is_empty());
        let symbols = generator2.symbols();
        for sym in ["+", "-", "*", "/", "(", ")"] {
            assert!(symbols.iter().any(|s| s == sym), "missing symbol {sym}");
        }
    }

    #[test]
    fn single_digit_terminals_never_become_symbols() {
        let generator = generator(r#"s = "x" , "0" ;"#);
        assert!(generator.symbols().iter().all(|s| s != "0"));
    }

    #[test]
    fn digit_idiom_rewrites_to_integer_builtin() {
        let grammar = r#"
number = digit , { digit } ;
digit  = "0" | "1" | "2" | "3" | "4" | "5" | "6" | "7" | "8" | "9" ;
"#;
        let generator = generator(grammar);
        assert!(generator.recognize("123").is_ok());
        assert!(generator.recognize("0").is_ok());
        assert!(generator.recognize("x").is_err());
        let source = generator.generate_source();
        assert!(
            !source.contains("fn parse_digit"),
            "the digit rule must be suppressed from emission"
        );
        assert!(
            source.contains("parse_integerConstant"),
            "the integer built-in must be called instead"
        );
    }

    #[test]
    fn digit_idiom_rewrites_references_in_other_rules() {
        let grammar = r#"
expr   = number , { "+" , number } ;
number = digit , { digit } ;
digit  = "0" | "1" | "2" | "3" | "4" | "5" | "6" | "7" | "8" | "9" ;
"#;
        let generator = generator(grammar);
        assert!(generator.recognize("12+345+6").is_ok());
        assert!(generator.recognize("12+").is_err());
        let source = generator.generate_source();
        assert!(!source.contains("fn parse_digit"));
        assert!(!source.contains("fn parse_number"));
    }

    #[test]
    fn digit_rule_survives_when_referenced_directly() {
        let grammar = r#"
value  = digit | "x" ;
number = digit , { digit } ;
digit  = "0" | "1" ;
"#;
        let generator = generator(grammar);
        let source = generator.generate_source();
        assert!(source.contains("fn parse_digit"));
        assert!(!source.contains("fn parse_number"));
    }

    #[test]
    fn bnf_normalizer_translates_repetition() {
        let bnf = r#"
<translation-unit> ::= {<external-declaration>}*

<external-declaration> ::= <function-definition>
                         | <declaration>
"#;
        let normalizer = BnfNormalizer::new();
        let normalized = normalizer.normalize(bnf);
        assert_eq!(
            normalized,
            "translation_unit = { external_declaration } ;\n\
             external_declaration = function_definition | declaration ;"
        );
        let rules = MetaParser::new(&normalized)
            .and_then(MetaParser::parse_grammar)
            .expect("normalized BNF should parse as EBNF");
        assert_eq!(rules.len(), 2);
        assert_eq!(
            rules[0].definition,
            Node::Repetition(Box::new(Node::Nonterminal(
                "external_declaration".to_string()
            )))
        );
    }

    #[test]
    fn bnf_normalizer_quotes_punctuators_and_folds_options() {
        let bnf = r#"
<pointer> ::= * {<type-qualifier>}* {<pointer>}?
"#;
        let normalized = BnfNormalizer::new().normalize(bnf);
        assert_eq!(
            normalized,
            "pointer = \"*\" , { type_qualifier } , [ pointer ] ;"
        );
    }

    #[test]
    fn bnf_dialect_detection() {
        let normalizer = BnfNormalizer::new();
        assert_eq!(
            normalizer.detect("<a> ::= <b>"),
            rdgen::bnf::Dialect::Bnf
        );
        assert_eq!(normalizer.detect(ARITHMETIC), rdgen::bnf::Dialect::Ebnf);
    }

    #[test]
    fn end_to_end_bnf_grammar() {
        let bnf = r#"
<list> ::= ( {<item>}* )
<item> ::= "a" | "b"
"#;
        let generator = generator(bnf);
        assert!(generator.recognize("(a b a)").is_ok());
        assert!(generator.recognize("()").is_ok());
        assert!(generator.recognize("(c)").is_err());
    }

    #[test]
    fn backtracking_across_alternatives() {
        let generator1 = generator(r#"s = "<" , ">" | "<" , "=" ;"#);
        assert!(generator1.recognize("<=").is_ok());
        assert!(generator1.recognize("<>").is_ok());
        assert!(generator1.recognize("<").is_err());

        let generator2 = generator(r#"s = "a" , "b" | "a" , "c" ;"#);
        assert!(generator2.recognize("a c").is_ok());
        assert!(generator2.recognize("a b").is_ok());
    }

    #[test]
    fn failed_alternative_restores_the_cursor() {
        let generator = generator(r#"s = "a" , "b" | "a" ;"#);
        assert!(generator.recognize("a").is_ok());
    }

    #[test]
    fn ordered_choice_commits_to_the_first_match() {
        let generator = generator(r#"s = "a" | "a" , "b" ;"#);
        let message = reject_message(&generator, "a b");
        assert!(
            message.contains("end of input"),
            "the first alternative commits, so `b` is trailing input: {message}"
        );
    }

    #[test]
    fn empty_input_boundaries() {
        let admits_empty = generator(r#"s = { "x" } ;"#);
        assert!(admits_empty.recognize("").is_ok());
        assert!(admits_empty.recognize("   // comment\n/* block */  ").is_ok());

        let requires_token = generator(r#"s = "x" ;"#);
        let message = reject_message(&requires_token, "");
        assert!(
            message.contains("line 1, column 1"),
            "empty input should reject at the origin: {message}"
        );
        assert!(requires_token.recognize("  /* only trivia */ ").is_err());
    }

    #[test]
    fn trailing_garbage_reports_end_of_input() {
        let generator = generator(r#"s = "x" ;"#);
        let message = reject_message(&generator, "x y");
        assert!(message.contains("end of input"), "{message}");
        assert!(
            message.contains("column 3"),
            "diagnostic should point at the first garbage token: {message}"
        );
    }

    #[test]
    fn repetition_always_terminates() {
        let generator = generator(r#"s = { [ "x" ] } ;"#);
        for input in ["", "x", "x x", "x x x x"] {
            assert!(
                generator.recognize(input).is_ok(),
                "zero-width repetition bodies must not loop on {input:?}"
            );
        }
    }

    #[test]
    fn one_or_more_postfix() {
        let generator = generator(r#"s = "x"+ ;"#);
        assert!(generator.recognize("x").is_ok());
        assert!(generator.recognize("x x x").is_ok());
        assert!(generator.recognize("").is_err());
    }

    #[test]
    fn empty_terminal_alternative_becomes_optional() {
        let generator = generator(r#"s = "x" , ( "y" | "" ) ;"#);
        assert!(generator.recognize("x").is_ok());
        assert!(generator.recognize("x y").is_ok());
        assert_eq!(
            generator.grammar().rules()[0].to_string(),
            r#"s = "x" , [ "y" ] ;"#
        );
    }

    #[test]
    fn multi_character_symbols_longest_match() {
        let generator1 = generator(r#"s = "==" , identifier ;"#);
        assert!(generator1.recognize("== foo").is_ok());
        assert!(generator1.recognize("==bar").is_ok());

        let generator2 = generator(r#"s = "=" | "==" ;"#);
        assert!(
            generator2.recognize("==").is_ok(),
            "the lexer must produce one `==` token, not two `=` tokens"
        );
        assert!(generator2.recognize("=").is_ok());
    }

    #[test]
    fn invalid_character_is_a_hard_error() {
        let generator = generator(r#"s = "x" ;"#);
        let error = generator
            .recognize("x @")
            .expect_err("`@` is not in the symbol set");
        assert!(matches!(error, RecognizeError::LexError(_)));
        assert!(error.to_string().contains("invalid character"));
    }

    #[test]
    fn unterminated_target_literals_are_hard_errors() {
        let generator = generator(r#"s = stringLiteral ;"#);
        let error = generator.recognize("\"open").expect_err("unterminated");
        assert!(error.to_string().contains("unterminated string"));

        let error = generator.recognize("/* open").expect_err("unterminated");
        assert!(error.to_string().contains("unterminated block comment"));
    }

    #[test]
    fn memoization_is_transparent() {
        let mut config = Config::default();
        config.runtime.memoization = false;
        let memoized = generator(ARITHMETIC);
        let plain = Generator::with_config(ARITHMETIC, config).unwrap();
        assert!(memoized.recognize("4*(5+6)").is_ok());
        assert!(plain.recognize("4*(5+6)").is_ok());
        assert_eq!(
            reject_message(&memoized, "3+*6"),
            reject_message(&plain, "3+*6"),
            "memoization must not change verdicts or diagnostics"
        );
    }

    #[test]
    fn sync_points_mark_attempted_recovery() {
        let config = Config {
            runtime: RuntimeConfig {
                memoization: true,
                sync_points: vec![";".to_string()],
            },
            ..Config::default()
        };
        let generator = Generator::with_config(r#"s = "x" , ";" ;"#, config).unwrap();
        let message = reject_message(&generator, "y ;");
        assert!(
            message.contains("recovery"),
            "the diagnostic should note the sync-point scan: {message}"
        );
    }

    #[test]
    fn start_rule_override() {
        let config = Config {
            start_rule: Some("b".to_string()),
            ..Config::default()
        };
        let generator =
            Generator::with_config(r#"a = "x" ; b = "y" ;"#, config).unwrap();
        assert_eq!(generator.start_rule(), "b");
        assert!(generator.recognize("y").is_ok());
        assert!(generator.recognize("x").is_err());
    }

    #[test]
    fn missing_semicolon_is_tolerated() {
        let generator1 = generator("a = \"x\"\nb = \"y\" ;");
        assert!(generator1.recognize("x").is_ok());
        let generator2 = generator(r#"a = "x""#);
        assert!(generator2.recognize("x").is_ok());
    }

    #[test]
    fn meta_lex_errors_carry_positions() {
        let error = Generator::new("a = $ ;").expect_err("`$` is not meta syntax");
        assert!(
            error.to_string().contains("line 1, column 5"),
            "unexpected message: {error}"
        );
        let error = Generator::new("a = \"x ;").expect_err("unterminated terminal");
        assert!(error.to_string().contains("unterminated terminal"));
    }

    #[test]
    fn meta_parse_errors_describe_expectations() {
        let error = Generator::new("a = ;").expect_err("missing right-hand side");
        assert!(
            error.to_string().contains("expected a term"),
            "unexpected message: {error}"
        );
        let error = Generator::new("a \"x\" ;").expect_err("missing equals");
        assert!(error.to_string().contains("\"=\""));
    }

    #[test]
    fn dangling_references_are_rejected() {
        let error = Generator::new("a = b ;").expect_err("b is undefined");
        match error {
            CreateGeneratorError::GrammarError(GrammarError::DanglingReference {
                rule,
                name,
            }) => {
                assert_eq!(rule, "a");
                assert_eq!(name, "b");
            }
            other => panic!("expected a dangling reference error, got {other}"),
        }
    }

    #[test]
    fn duplicate_rules_are_rejected() {
        let error = Generator::new(r#"a = "x" ; a = "y" ;"#).expect_err("duplicate");
        assert!(matches!(
            error,
            CreateGeneratorError::GrammarError(GrammarError::DuplicateRule(_))
        ));
    }

    #[test]
    fn empty_grammars_are_rejected() {
        let error = Generator::new("").expect_err("no rules");
        assert!(matches!(
            error,
            CreateGeneratorError::GrammarError(GrammarError::EmptyGrammar)
        ));
    }

    #[test]
    fn direct_left_recursion_is_rejected_with_a_suggestion() {
        let error =
            Generator::new(r#"a = a , "+" , b | b ; b = "x" ;"#).expect_err("left recursion");
        match &error {
            CreateGeneratorError::GrammarError(GrammarError::LeftRecursion { name }) => {
                assert_eq!(name, "a");
            }
            other => panic!("expected a left recursion error, got {other}"),
        }
        let message = error.to_string();
        assert!(message.contains("left-recursive"));
        assert!(
            message.contains("{ op , operand }"),
            "the error should suggest the iterative rewrite: {message}"
        );
    }

    #[test]
    fn pretty_print_round_trips() {
        let generator1 = generator(ARITHMETIC);
        let printed = generator1.grammar().to_string();
        let reparsed = generator(&printed);
        assert_eq!(
            generator1.grammar().rules(),
            reparsed.grammar().rules(),
            "parsing the pretty-print must yield the same grammar"
        );
        assert_snapshot!(
            generator1.grammar().rules()[0].to_string(),
            @r###"expr = term , { ( "+" | "-" ) , term } ;"###
        );
    }

    #[test]
    fn generated_source_mirrors_the_grammar() {
        let generator = generator(ARITHMETIC);
        let source = generator.generate_source();
        for needle in [
            "fn parse_expr(&mut self) -> bool",
            "fn parse_term(&mut self) -> bool",
            "fn parse_factor(&mut self) -> bool",
            "fn parse_integerConstant(&mut self) -> bool",
            "pub const SYMBOLS: &[&str]",
            "pub fn parse(&mut self) -> Result<(), String>",
            "valid expr",
            "end of input",
        ] {
            assert!(source.contains(needle), "generated source lacks {needle:?}");
        }
        assert!(
            !source.contains("parse_identifier()")
                || source.contains("fn parse_identifier(&mut self)"),
            "built-ins must be defined when referenced"
        );
    }

    #[test]
    fn generated_source_emits_hyphen_free_method_names() {
        let generator = generator("list-of-x = { \"x\" } ;");
        let source = generator.generate_source();
        assert!(source.contains("fn parse_list_of_x"));
        assert!(!source.contains("fn parse_list-of-x"));
    }

    #[test]
    fn precedence_levels_follow_expression_tiers() {
        let grammar = r#"
additiveExpression       = multiplicativeExpression , { ( "+" | "-" ) , multiplicativeExpression } ;
multiplicativeExpression = primaryExpression , { ( "*" | "/" ) , primaryExpression } ;
primaryExpression        = integerConstant | "(" , additiveExpression , ")" ;
"#;
        let generator = generator(grammar);
        let precedence = generator.precedence();
        assert_eq!(precedence.get("+"), Some(&0));
        assert_eq!(precedence.get("-"), Some(&0));
        assert_eq!(precedence.get("*"), Some(&1));
        assert_eq!(precedence.get("/"), Some(&1));
        assert!(
            precedence.get("(").is_none(),
            "terminals inside sequences are not tier operators"
        );
    }

    #[test]
    fn diagnostics_carry_a_caret_context_line() {
        let generator = generator(SENTENCE);
        let error = generator
            .recognize("the cat the dog")
            .expect_err("missing verb");
        let diagnostic = error.diagnostic().expect("rejections carry diagnostics");
        assert_eq!((diagnostic.line, diagnostic.col), (1, 9));
        assert_eq!(diagnostic.context, "the cat the dog\n        ^");
        assert!(diagnostic.found.contains("the"));
    }

    #[test]
    fn bnf_front_end_quotes_multi_char_operators() {
        let bnf = r#"
<jump> ::= <ident> -> <ident>
         | <ident> ++
"#;
        let normalized = BnfNormalizer::new().normalize(bnf);
        assert_eq!(
            normalized,
            "jump = ident , \"->\" , ident | ident , \"++\" ;"
        );
        let generator = generator(
            r#"
jump  = ident , "->" , ident | ident , "++" ;
ident = identifier ;
"#,
        );
        assert!(generator.recognize("a -> b").is_ok());
        assert!(generator.recognize("a->b").is_ok());
        assert!(generator.recognize("a ++").is_ok());
        assert!(generator.recognize("a + +").is_err());
    }

    #[test]
    fn generated_source_carries_the_token_sets() {
        let generator = generator(SENTENCE);
        let source = generator.generate_source();
        assert!(source.contains("pub const KEYWORDS: &[&str]"));
        for keyword in ["\"the\"", "\"cat\"", "\"watches\""] {
            assert!(
                source.contains(keyword),
                "generated keyword set lacks {keyword}"
            );
        }
        assert!(source.contains("pub const SYMBOLS: &[&str] = &[];"));
    }

    #[test]
    fn config_serde_round_trip() {
        let config = Config::default();
        let json = serde_json::to_string(&config).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }

    #[test]
    fn distinct_recognizers_share_no_state() {
        let generator = generator(ARITHMETIC);
        assert!(generator.recognize("3+*6").is_err());
        assert!(
            generator.recognize("4*(5+6)").is_ok(),
            "a failed parse must not poison later parses"
        );
        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| assert!(generator.recognize("1+2*3").is_ok()));
            }
        });
    }
}
