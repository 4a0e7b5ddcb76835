//! End-to-end scenarios: source text in, top-level forms out.

use lush_core::Cell;
use lush_reader::{read_program, Lexer, Parser};

fn forms(input: &str) -> Vec<String> {
    read_program("test", input)
        .unwrap()
        .iter()
        .map(|c| c.to_string())
        .collect()
}

#[test]
fn test_basic_scenarios() {
    assert_eq!(forms("a b c\n"), vec!["a b c"]);
    assert_eq!(
        forms("a | b | c\n"),
        vec!["pipe-output-to (a) (pipe-output-to (b) (c))"]
    );
    assert_eq!(forms("a && b || c\n"), vec!["or (and (a) (b)) (c)"]);
    assert_eq!(forms("a > out\n"), vec!["output-to (a) out"]);
    assert_eq!(forms("cmd &\n"), vec!["spawn (cmd)"]);
    assert_eq!(forms("{ a; b }\n"), vec!["block (a) (b)"]);
    assert_eq!(
        forms("echo \"hi $name\"\n"),
        vec!["echo (interpolate hi $name)"]
    );
    assert_eq!(
        forms("echo `date`\n"),
        vec!["echo (splice (capture (date)))"]
    );
}

#[test]
fn test_assignment_scenario() {
    assert_eq!(
        forms("x = 1\ncmd\n"),
        vec!["block (export x 1)", "cmd"]
    );
}

#[test]
fn test_meta_number_value() {
    let parsed = read_program("test", "(| number 3/4 |)\n").unwrap();
    assert!(parsed[0].car().equal(&Cell::number("3/4").unwrap()));
}

#[test]
fn test_forms_survive_literal_round_trip() {
    let inputs = [
        "a b c\n",
        "a | b | c\n",
        "a && b || c\n",
        "a > out\n",
        "cmd &\n",
        "{ a; b }\n",
        "echo `date`\n",
        "x = 1\n",
        "(| number 3/4 |)\n",
        "(| cons a b |)\n",
    ];

    for input in inputs {
        let first = read_program("test", input).unwrap();
        let mut text = String::new();
        for f in &first {
            text.push_str(&f.literal().unwrap());
            text.push('\n');
        }
        let second = read_program("test", &text).unwrap();
        assert_eq!(first.len(), second.len(), "for {input:?}");
        for (a, b) in first.iter().zip(second.iter()) {
            assert!(a.equal(b), "{a} != {b} (from {input:?} via {text:?})");
        }
    }
}

#[test]
fn test_incremental_feeding_matches_whole_buffer() {
    let input = "x = 1\necho $x | grep 1 > out\n";

    let whole = read_program("test", input).unwrap();

    let mut lexer = Lexer::new("test");
    let mut parsed = Vec::new();
    // Feed one line at a time, as an interactive session would.
    for line in input.split_inclusive('\n') {
        lexer.scan(line);
    }
    let mut parser = Parser::new(lexer);
    parser.parse(&mut |c| parsed.push(c)).unwrap();

    assert_eq!(whole.len(), parsed.len());
    for (a, b) in whole.iter().zip(parsed.iter()) {
        assert!(a.equal(b));
    }
}
