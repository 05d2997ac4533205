use assert_cmd::Command;
use astcfg_test_helpers::fixtures;
use indoc::indoc;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

fn astcfg_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("astcfg"))
}

#[test]
fn test_text_dump_of_if_else() {
    let temp_dir = TempDir::new().unwrap();
    let input = fixtures::write_ast_json(temp_dir.path(), "if.json", &fixtures::if_else());

    astcfg_cmd()
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("F0 "))
        .stdout(predicate::str::contains("entry=bb1 exit=bb2"))
        .stdout(predicate::str::contains("bb3 Branch"))
        .stdout(predicate::str::contains("-> bb4 bb5"));
}

#[test]
fn test_dot_output() {
    let temp_dir = TempDir::new().unwrap();
    let input = fixtures::write_ast_json(
        temp_dir.path(),
        "loop.json",
        &fixtures::while_with_break(),
    );

    astcfg_cmd()
        .arg("--format")
        .arg("dot")
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::starts_with("digraph cfg {"))
        .stdout(predicate::str::contains("LoopHeader"));
}

#[test]
fn test_validate_passes_on_kitchen_sink() {
    let temp_dir = TempDir::new().unwrap();
    let input = fixtures::write_ast_json(temp_dir.path(), "all.json", &fixtures::kitchen_sink());

    astcfg_cmd()
        .arg("--validate")
        .arg(&input)
        .assert()
        .success()
        .stderr(predicate::str::contains("violation").not());
}

#[test]
fn test_kitchen_sink_lists_nested_function() {
    let temp_dir = TempDir::new().unwrap();
    let input = fixtures::write_ast_json(temp_dir.path(), "all.json", &fixtures::kitchen_sink());

    astcfg_cmd()
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("nested=[F1]"))
        .stdout(predicate::str::contains("Function(helper)"));
}

#[test]
fn test_config_file_changes_switch_shape() {
    let temp_dir = TempDir::new().unwrap();
    let input = fixtures::write_ast_json(
        temp_dir.path(),
        "switch.json",
        &fixtures::switch_with_default_at(2),
    );
    let config = fixtures::write_file(
        temp_dir.path(),
        "astcfg.yaml",
        indoc! {"
            reuse_default_case_block: false
        "},
    );

    // The default case gets its own body block, so one more block than the
    // reused layout.
    astcfg_cmd()
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("last=9"));

    astcfg_cmd()
        .arg("--config")
        .arg(&config)
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::contains("last=10"));
}

#[test]
fn test_invalid_config_is_reported() {
    let temp_dir = TempDir::new().unwrap();
    let input = fixtures::write_ast_json(temp_dir.path(), "if.json", &fixtures::if_else());
    let config = fixtures::write_file(temp_dir.path(), "bad.yaml", "deep_call_scan: [oops");

    astcfg_cmd()
        .arg("--config")
        .arg(&config)
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}

#[test]
fn test_malformed_json_fails() {
    let temp_dir = TempDir::new().unwrap();
    let input = fixtures::write_file(temp_dir.path(), "broken.json", "{ \"nodes\": [");

    astcfg_cmd()
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load AST"));
}

#[test]
fn test_unresolved_break_is_an_internal_error() {
    let temp_dir = TempDir::new().unwrap();
    let mut b = astcfg_core::AstBuilder::new();
    let brk = b.break_(None);
    let ast = b.finish_module("stray_break", vec![brk]);
    let input = fixtures::write_ast_json(temp_dir.path(), "break.json", &ast);

    astcfg_cmd()
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("internal compiler error"))
        .stderr(predicate::str::contains("unresolved break target"));
}

#[test]
fn test_cyclic_ast_fails() {
    let temp_dir = TempDir::new().unwrap();
    let input = fixtures::write_file(
        temp_dir.path(),
        "cycle.json",
        indoc! {r#"
            {
                "nodes": [
                    { "kind": "Unary", "op": "-", "operand": 0 },
                    { "kind": "Module", "name": "m", "body": [0] }
                ],
                "root": 1
            }
        "#},
    );

    astcfg_cmd()
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("is its own ancestor"));
}

#[test]
fn test_missing_input_file_fails() {
    let temp_dir = TempDir::new().unwrap();

    astcfg_cmd()
        .arg(temp_dir.path().join("nope.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

#[test]
fn test_output_file() {
    let temp_dir = TempDir::new().unwrap();
    let input = fixtures::write_ast_json(temp_dir.path(), "if.json", &fixtures::if_else());
    let output = temp_dir.path().join("out.txt");

    astcfg_cmd()
        .arg("-o")
        .arg(&output)
        .arg(&input)
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let written = fs::read_to_string(&output).unwrap();
    assert!(written.contains("bb3 Branch"), "got: {}", written);
}

#[test]
fn test_multiple_inputs_keep_input_order() {
    let temp_dir = TempDir::new().unwrap();
    let first = fixtures::write_ast_json(temp_dir.path(), "b.json", &fixtures::kitchen_sink());
    let second = fixtures::write_ast_json(temp_dir.path(), "a.json", &fixtures::if_else());

    let output = astcfg_cmd().arg(&first).arg(&second).output().unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let first_at = stdout.find("b.json").expect("first input header");
    let second_at = stdout.find("a.json").expect("second input header");
    assert!(first_at < second_at, "inputs out of order:\n{}", stdout);
}

#[test]
fn test_verbose_logs_to_stderr() {
    let temp_dir = TempDir::new().unwrap();
    let input = fixtures::write_ast_json(temp_dir.path(), "if.json", &fixtures::if_else());

    astcfg_cmd()
        .arg("-v")
        .arg(&input)
        .env_remove("RUST_LOG")
        .assert()
        .success()
        .stderr(predicate::str::contains("built CFG"));
}

#[test]
fn test_requires_an_input() {
    astcfg_cmd().assert().failure();
}
