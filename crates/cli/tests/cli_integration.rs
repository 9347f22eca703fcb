//! CLI integration tests for all subcommands.
//!
//! Uses `assert_cmd` to spawn the `scriptc` binary and verify exit codes,
//! stdout content, and stderr content.
//!
//! Every test runs inside its own temporary directory so that a
//! `scriptc.toml` is only picked up when the test writes one.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Helper: create a Command for the `scriptc` binary, rooted at `dir`.
fn scriptc(dir: &Path) -> Command {
    let mut cmd = cargo_bin_cmd!("scriptc");
    cmd.current_dir(dir);
    cmd
}

fn write(dir: &Path, name: &str, text: &str) {
    if let Some(parent) = dir.join(name).parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(dir.join(name), text).unwrap();
}

const SHADOWS: &str = "base_shadow { colour \"blue\" intensity \"1\" }\n\
                       shadow_caster : base_shadow { colour \"red\" }\n";

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    let tmp = TempDir::new().unwrap();
    scriptc(tmp.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Script compiler toolchain"));
}

#[test]
fn version_exits_0() {
    let tmp = TempDir::new().unwrap();
    scriptc(tmp.path())
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("scriptc"));
}

// ──────────────────────────────────────────────
// 2. Resolve subcommand
// ──────────────────────────────────────────────

#[test]
fn resolve_applies_imports_inheritance_and_variables() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "base.material", "material base { lighting off }\n");
    write(
        tmp.path(),
        "main.material",
        "import base from base.material\n\
         $amb := \"0.5 0.5 0.5\"\n\
         material m : base {\n    ambient $amb\n}\n",
    );

    scriptc(tmp.path())
        .args(["resolve", "main.material"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "material m\n{\n    lighting off\n    ambient 0.5 0.5 0.5\n}\n",
        ))
        .stdout(predicate::str::contains("import").not());
}

#[test]
fn resolve_finds_imports_next_to_the_script() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "scripts/lib.material", "material lib { depth_write off }\n");
    write(
        tmp.path(),
        "scripts/main.material",
        "import * from lib.material\nmaterial m : lib { }\n",
    );

    scriptc(tmp.path())
        .args(["resolve", "scripts/main.material"])
        .assert()
        .success()
        .stdout(predicate::str::contains("    depth_write off"));
}

#[test]
fn resolve_json_output_is_node_tree() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "m.material", "material m { lighting off }\n");

    let out = scriptc(tmp.path())
        .args(["--output", "json", "resolve", "m.material"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let tree: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(tree[0]["kind"], "word");
    assert_eq!(tree[0]["token"], "material");
    assert_eq!(tree[0]["is_object"], true);
    assert_eq!(tree[0]["children"][1]["kind"], "l_brace");
}

#[test]
fn resolve_prints_partial_tree_and_fails_on_diagnostics() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "bad.material", "material m { ambient $missing }\n");

    scriptc(tmp.path())
        .args(["resolve", "bad.material"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("ambient $missing"))
        .stderr(predicate::str::contains(
            "bad.material:1:22: undefined_variable error: undefined variable 'missing'",
        ));
}

#[test]
fn resolve_nonexistent_file_exits_1() {
    let tmp = TempDir::new().unwrap();
    scriptc(tmp.path())
        .args(["resolve", "nonexistent_file_xyz.material"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("could not read"));
}

// ──────────────────────────────────────────────
// 3. Check subcommand
// ──────────────────────────────────────────────

#[test]
fn check_valid_script_exits_0() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "ok.material", "material m { lighting off }\n");

    scriptc(tmp.path())
        .args(["check", "ok.material"])
        .assert()
        .success()
        .stdout(predicate::str::contains("ok.material: ok"));
}

#[test]
fn check_reports_every_diagnostic_in_order() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "bad.material", "material m : \"p\" { }\n}\nuse $x\n");

    scriptc(tmp.path())
        .args(["check", "bad.material"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("syntax error"))
        .stderr(predicate::str::contains("object_name_expected error"))
        .stderr(predicate::str::contains("undefined_variable error"));
}

#[test]
fn check_json_diagnostics_carry_every_field() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "bad.material", "use $x\n");

    let out = scriptc(tmp.path())
        .args(["--output", "json", "check", "bad.material"])
        .output()
        .unwrap();
    assert_eq!(out.status.code(), Some(1));
    let errors: serde_json::Value = serde_json::from_slice(&out.stderr).unwrap();
    let first = &errors[0];
    assert_eq!(first["kind"], "undefined_variable");
    assert_eq!(first["file"], "bad.material");
    assert_eq!(first["line"], 1);
    assert_eq!(first["column"], 5);
    assert!(first["code"].is_null());
}

#[test]
fn check_quiet_suppresses_text_output() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "bad.material", "use $x\n");

    scriptc(tmp.path())
        .args(["--quiet", "check", "bad.material"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::is_empty());
}

// ──────────────────────────────────────────────
// 4. Configuration
// ──────────────────────────────────────────────

#[test]
fn nontyped_lookup_is_off_by_default() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "s.material", SHADOWS);

    scriptc(tmp.path())
        .args(["resolve", "s.material"])
        .assert()
        .success()
        .stdout(predicate::str::contains("shadow_caster\n{\n    colour \"red\"\n}\n"));
}

#[test]
fn default_config_file_enables_nontyped_lookup() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "s.material", SHADOWS);
    write(tmp.path(), "scriptc.toml", "allow_nontyped_objects = true\n");

    scriptc(tmp.path())
        .args(["resolve", "s.material"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "shadow_caster\n{\n    colour \"blue\"\n    intensity \"1\"\n    colour \"red\"\n}\n",
        ));
}

#[test]
fn flag_enables_nontyped_lookup() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "s.material", SHADOWS);

    scriptc(tmp.path())
        .args(["resolve", "--allow-nontyped", "s.material"])
        .assert()
        .success()
        .stdout(predicate::str::contains("    intensity \"1\"\n    colour \"red\""));
}

#[test]
fn config_search_paths_are_relative_to_config_file() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "conf/shared/common.material", "material common { cull none }\n");
    write(tmp.path(), "conf/scriptc.toml", "search_paths = [\"shared\"]\n");
    write(
        tmp.path(),
        "main.material",
        "import common from common.material\nmaterial m : common { }\n",
    );

    scriptc(tmp.path())
        .args(["--config", "conf/scriptc.toml", "resolve", "main.material"])
        .assert()
        .success()
        .stdout(predicate::str::contains("    cull none"));
}

#[test]
fn missing_explicit_config_exits_1() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "m.material", "material m { }\n");

    scriptc(tmp.path())
        .args(["--config", "absent.toml", "check", "m.material"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("could not read 'absent.toml'"));
}

#[test]
fn malformed_config_exits_1() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "m.material", "material m { }\n");
    write(tmp.path(), "scriptc.toml", "allow_nontyped_objects = \"maybe\"\n");

    scriptc(tmp.path())
        .args(["check", "m.material"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("could not parse"));
}

// ──────────────────────────────────────────────
// 5. Tokens subcommand
// ──────────────────────────────────────────────

const SET_GRAMMAR: &str = "// set statements\n\
                           <script> ::= {<stmt>} ;\n\
                           <stmt>   ::= 'set' <#value> ;\n";

#[test]
fn tokens_lists_token_instances_with_values() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "set.bnf", SET_GRAMMAR);
    write(tmp.path(), "input.txt", "set 1\nset 2.5\n");

    scriptc(tmp.path())
        .args(["tokens", "--grammar", "set.bnf", "input.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("1:1"))
        .stdout(predicate::str::contains("set"))
        .stdout(predicate::str::contains("2:5"))
        .stdout(predicate::str::contains("= 2.5"));
}

#[test]
fn tokens_json_output() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "set.bnf", SET_GRAMMAR);
    write(tmp.path(), "input.txt", "set 7");

    let out = scriptc(tmp.path())
        .args(["--output", "json", "tokens", "--grammar", "set.bnf", "input.txt"])
        .output()
        .unwrap();
    assert!(out.status.success());
    let rows: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(rows.as_array().unwrap().len(), 2);
    assert_eq!(rows[0]["text"], "set");
    assert_eq!(rows[1]["value"], 7.0);
    assert_eq!(rows[1]["column"], 5);
}

#[test]
fn tokens_reports_and_marks_failures() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "set.bnf", SET_GRAMMAR);
    write(tmp.path(), "input.txt", "set 1\nset x\nset 2\n");

    scriptc(tmp.path())
        .args(["tokens", "--grammar", "set.bnf", "input.txt"])
        .assert()
        .failure()
        .code(1)
        .stdout(predicate::str::contains("(missing)"))
        .stderr(predicate::str::contains(
            "input.txt:2:5: unknown_token error",
        ))
        .stderr(predicate::str::contains("expected one of: '<#value>'"));
}

#[test]
fn tokens_bad_grammar_exits_1() {
    let tmp = TempDir::new().unwrap();
    write(tmp.path(), "bad.bnf", "<script> ::= <undefined> ;\n");
    write(tmp.path(), "input.txt", "");

    scriptc(tmp.path())
        .args(["tokens", "--grammar", "bad.bnf", "input.txt"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("grammar error in 'bad.bnf'"));
}
