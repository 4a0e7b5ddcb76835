use proptest::prelude::*;

use lush_reader::{read_program, Lexer};

proptest! {
    #[test]
    fn reader_never_panics(input in "\\PC*") {
        // Any arbitrary string should produce Ok or Err, never panic.
        let _ = read_program("fuzz", &input);
    }

    #[test]
    fn lexer_never_panics(input in "\\PC*") {
        let mut lexer = Lexer::new("fuzz");
        lexer.scan(&input);
        while lexer.token().is_some() {}
    }
}

fn word() -> impl Strategy<Value = String> {
    prop_oneof![
        // Plain symbols
        "[a-z][a-z0-9_-]{0,8}".prop_map(|s| s),
        // Quoted strings
        "[a-zA-Z0-9 ]{0,10}".prop_map(|s| format!("'{s}'")),
        "[a-zA-Z0-9 ]{0,10}".prop_map(|s| format!("\"{s}\"")),
        // Variable references
        "[a-z][a-z0-9]{0,6}".prop_map(|s| format!("${s}")),
    ]
}

fn command() -> impl Strategy<Value = String> {
    prop::collection::vec(word(), 1..5).prop_map(|ws| ws.join(" "))
}

fn line() -> impl Strategy<Value = String> {
    prop_oneof![
        command(),
        (command(), command()).prop_map(|(a, b)| format!("{a} | {b}")),
        (command(), command()).prop_map(|(a, b)| format!("{a} && {b}")),
        (command(), command()).prop_map(|(a, b)| format!("{a}; {b}")),
        (command(), command()).prop_map(|(a, b)| format!("{a} > {b}")),
        command().prop_map(|c| format!("{c} &")),
        command().prop_map(|c| format!("{{ {c} }}")),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn well_formed_input_parses(lines in prop::collection::vec(line(), 1..4)) {
        let input = format!("{}\n", lines.join("\n"));
        let forms = read_program("fuzz", &input).unwrap();
        prop_assert!(!forms.is_empty());
    }

    #[test]
    fn byte_at_a_time_scan_matches(lines in prop::collection::vec(line(), 1..3)) {
        let input = format!("{}\n", lines.join("\n"));

        let mut whole = Lexer::new("fuzz");
        whole.scan(&input);
        let mut expected = Vec::new();
        while let Some(t) = whole.token() {
            expected.push(t);
        }

        let mut pieces = Lexer::new("fuzz");
        let mut actual = Vec::new();
        let mut i = 0;
        while i < input.len() {
            let w = input[i..].chars().next().unwrap().len_utf8();
            pieces.scan(&input[i..i + w]);
            while let Some(t) = pieces.token() {
                actual.push(t);
            }
            i += w;
        }

        prop_assert_eq!(expected.len(), actual.len());
        for (a, b) in expected.iter().zip(actual.iter()) {
            prop_assert_eq!(a.class(), b.class());
            prop_assert_eq!(a.value(), b.value());
            prop_assert_eq!(a.source().line, b.source().line);
            prop_assert_eq!(a.source().char, b.source().char);
        }
    }
}
