use color_eyre::eyre::{Context, Result};
use proptest::prelude::*;
use std::{
    fs::{read_dir, read_to_string},
    path::Path,
};

use grpl::lexer::is_keyword;
use grpl::parser::{
    formatter::{BasicFormatter, ParserFormatter, ToFormatter},
    statement::{IfStatement, Statement},
    Parser,
};

fn check(input: &str, expected: &str, test_name: &str) {
    let mut parser = Parser::new(input);
    let result = parser.parse();
    let formatter: BasicFormatter = parser.create_formatter();
    let actual = match result {
        Ok(ref statements) => formatter.format(statements),
        Err(ref e) => formatter.format_error(e),
    };

    assert_eq!(
        actual.trim_end(),
        expected.trim_end(),
        "Failed the test {test_name}"
    );
}

fn canonical(input: &str) -> Option<String> {
    let mut parser = Parser::new(input);
    let statements = parser.parse().ok()?;
    let formatter: BasicFormatter = parser.create_formatter();
    Some(formatter.format(&statements))
}

#[test]
fn smoke_test() {
    check("", "", "smoke");
    check("end", "[1:1] Expected end of input but got END.", "stray end");
}

#[test]
fn test_all() -> Result<()> {
    let input_dir = Path::new("./test_data/parser/in");
    let output_dir = Path::new("./test_data/parser/out");

    let mut succeeded = true;
    for entry in read_dir(input_dir).context("Failed to open input test data folder")? {
        let entry = entry?;
        let path = entry.path();

        let Some(extension) = path.extension() else {
            continue;
        };

        if extension != "grpl" {
            continue;
        }

        let test_name = AsRef::<Path>::as_ref(
            path.file_name()
                .expect("File name can't be none as the path is to a real file."),
        );

        let input = read_to_string(&path).context("Failed to open input test data file")?;

        let expected = {
            let output_file_name = test_name.with_extension("txt");
            let output_path = output_dir.join(output_file_name);
            read_to_string(&output_path).context("Failed to open output test data file")?
        };

        let res = std::panic::catch_unwind(|| {
            check(&input, &expected, &test_name.to_string_lossy());
        });
        if res.is_err() {
            succeeded = false;
        }
    }

    assert!(succeeded, "Some parser test cases failed");

    Ok(())
}

#[test]
fn if_statement_shape() {
    let statements = grpl::parser::parse("if $a then 1 elif $b then 2 else 3 end")
        .expect("valid source");
    let [Statement::If(IfStatement {
        branches,
        otherwise,
    })] = statements.as_slice()
    else {
        panic!("expected a single if statement, got {statements:?}");
    };
    assert_eq!(branches.len(), 2);
    assert_eq!(branches[1].condition.len(), 1);
    assert_eq!(otherwise.as_ref().map(|body| body.len()), Some(1));
}

#[test]
fn spans_point_at_the_source() {
    let source = "  dup $x";
    let statements = grpl::parser::parse(source).expect("valid source");
    let spans: Vec<_> = statements
        .iter()
        .filter_map(Statement::span)
        .map(|span| &source[span.range()])
        .collect();
    assert_eq!(spans, ["dup", "$x"]);
}

// Property-based tests

fn name_strategy() -> impl Strategy<Value = String> {
    "[a-z_][a-z0-9_]{0,6}".prop_filter("names can't be keywords", |s| !is_keyword(s))
}

fn atom_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[0-9]{1,4}".prop_map(|s| s),
        "[0-9]{1,3}\\.[0-9]{1,3}".prop_map(|s| s),
        "[a-z ]{0,8}".prop_map(|s| format!("\"{s}\"")),
        Just("true".to_string()),
        Just("false".to_string()),
        Just("+".to_string()),
        Just(">=".to_string()),
        Just("!".to_string()),
        name_strategy(),
        name_strategy().prop_map(|s| format!("${s}")),
        name_strategy().prop_map(|s| format!(">{s}")),
        name_strategy().prop_map(|s| format!("!{s}")),
    ]
}

fn program_strategy() -> impl Strategy<Value = String> {
    let leaf = prop::collection::vec(atom_strategy(), 0..5).prop_map(|atoms| atoms.join(" "));
    leaf.prop_recursive(4, 64, 4, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone()).prop_map(|(c, b)| format!("if {c} then {b} end")),
            (inner.clone(), inner.clone(), inner.clone())
                .prop_map(|(c, b, e)| format!("if {c} then {b} else {e} end")),
            (inner.clone(), inner.clone()).prop_map(|(c, b)| format!("while {c} do {b} end")),
            inner.clone().prop_map(|b| format!("{{ {b} }}")),
            (name_strategy(), inner.clone()).prop_map(|(n, b)| format!("fun {n} {b} end")),
            (inner.clone(), inner).prop_map(|(a, b)| format!("{a}\n{b}")),
        ]
    })
}

proptest! {
    #[test]
    fn canonical_source_is_stable(input in program_strategy()) {
        let first = canonical(&input);
        prop_assert!(first.is_some(), "failed to parse {input:?}");
        let first = first.unwrap();
        let second = canonical(&first);
        prop_assert_eq!(Some(first), second);
    }

    #[test]
    fn parser_never_panics(input in any::<String>()) {
        let _ = grpl::parser::parse(&input);
    }
}
