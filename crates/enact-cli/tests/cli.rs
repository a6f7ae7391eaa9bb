//! End-to-end runs of the `enact` binary against scripts written into temp dirs.

use assert_cmd::Command;
use enact_test_util::{mask_prefix, normalize_nondeterministic};
use predicates::prelude::*;
use serde_json::{Value, json};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[allow(deprecated)]
fn enact_cmd(cwd: &Path) -> Command {
    let mut cmd = Command::cargo_bin("enact").expect("enact binary not found - run `cargo build` first");
    cmd.current_dir(cwd).env_remove("ENACT_LOG");
    cmd
}

fn write(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, text).expect("write file");
    path
}

fn file_step(path: &Path) -> String {
    format!(
        "[[step]]\nresource = \"file\"\nname = '{}'\nparams = {{ ensure = \"file\", content = \"managed\" }}\n\n",
        path.display()
    )
}

#[test]
fn two_files_are_managed_without_failures() {
    let tmp = TempDir::new().expect("temp dir");
    let a = tmp.path().join("a.txt");
    let b = tmp.path().join("b.txt");
    write(&tmp, "site.toml", &(file_step(&a) + &file_step(&b)));

    enact_cmd(tmp.path())
        .arg("site.toml")
        .assert()
        .success()
        .stdout(predicate::str::contains("Managed 2 resources with 0 failures."));

    assert_eq!(std::fs::read_to_string(&a).expect("read a"), "managed");
    assert_eq!(std::fs::read_to_string(&b).expect("read b"), "managed");
}

#[test]
fn first_failure_stops_the_run() {
    let tmp = TempDir::new().expect("temp dir");
    let a = tmp.path().join("a.txt");
    let c = tmp.path().join("c.txt");
    let script = file_step(&a)
        + "[[step]]\nresource = \"file\"\nname = \"relative.txt\"\n\n"
        + &file_step(&c);
    write(&tmp, "site.toml", &script);

    enact_cmd(tmp.path())
        .arg("site.toml")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Managed 1 resources with 1 failures."))
        .stderr(predicate::str::contains("Failed enforcing File[relative.txt]"))
        .stderr(predicate::str::contains(
            "File paths must be fully qualified, not 'relative.txt'",
        ));

    assert!(a.exists());
    assert!(!c.exists(), "resources after the failure must not be enforced");
}

#[test]
fn keep_going_enforces_everything_and_counts_failures() {
    let tmp = TempDir::new().expect("temp dir");
    let c = tmp.path().join("c.txt");
    let script = "[[step]]\nresource = \"file\"\nname = \"relative.txt\"\n\n".to_string()
        + &file_step(&c);
    write(&tmp, "site.toml", &script);

    enact_cmd(tmp.path())
        .args(["-k", "site.toml"])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Managed 2 resources with 1 failures."))
        .stderr(predicate::str::contains("Failed enforcing").not());

    assert!(c.exists());
}

#[test]
fn missing_script_is_fatal() {
    let tmp = TempDir::new().expect("temp dir");
    enact_cmd(tmp.path())
        .arg("nope.toml")
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(
            "enact error: Could not find script file nope.toml",
        ));
}

#[test]
fn extra_scripts_are_skipped_with_a_warning() {
    let tmp = TempDir::new().expect("temp dir");
    write(&tmp, "a.toml", "[[step]]\nresource = \"notify\"\nname = \"a\"\n");

    enact_cmd(tmp.path())
        .args(["a.toml", "b.toml", "c.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Managed 1 resources with 0 failures."))
        .stderr(predicate::str::contains(
            "Only one script will be executed per run. Skipping b.toml, c.toml",
        ));
}

#[test]
fn verbose_logs_each_resource() {
    let tmp = TempDir::new().expect("temp dir");
    write(
        &tmp,
        "a.toml",
        "[[step]]\nresource = \"notify\"\nname = \"a\"\n\n[[step]]\napply = \"notify { 'b': }\"\n",
    );

    enact_cmd(tmp.path())
        .args(["--verbose", "a.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Enforcing Notify[a]"))
        .stdout(predicate::str::contains("Running code block"));
}

#[test]
fn config_file_sets_options() {
    let tmp = TempDir::new().expect("temp dir");
    write(&tmp, "enact.toml", "keep_going = true\n");
    write(
        &tmp,
        "a.toml",
        "[[step]]\nresource = \"file\"\nname = \"x\"\n\n[[step]]\nresource = \"notify\"\nname = \"after\"\n",
    );

    enact_cmd(tmp.path())
        .arg("a.toml")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Managed 2 resources with 1 failures."));
}

#[test]
fn invalid_config_is_fatal() {
    let tmp = TempDir::new().expect("temp dir");
    write(&tmp, "custom.toml", "backend = \"carrier-pigeon\"\n");
    write(&tmp, "a.toml", "");

    enact_cmd(tmp.path())
        .args(["--config", "custom.toml", "a.toml"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("enact error: resolve config"));
}

#[test]
fn script_faults_count_as_failures() {
    let tmp = TempDir::new().expect("temp dir");
    write(&tmp, "bad.toml", "[[step]]\nresource = \"notify\"\nname = \"${nope}\"\n");

    enact_cmd(tmp.path())
        .arg("bad.toml")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Managed 0 resources with 1 failures."))
        .stderr(predicate::str::contains("step 1: undefined variable 'nope'").count(1));
}

#[test]
fn exit_code_is_capped() {
    let tmp = TempDir::new().expect("temp dir");
    let names: Vec<String> = (0..300).map(|i| format!("\"r{i}\"")).collect();
    let script = format!(
        "[vars]\nnames = [{}]\n\n[[step]]\nforeach = \"names\"\nresource = \"file\"\nname = \"${{item}}\"\n",
        names.join(", ")
    );
    write(&tmp, "many.toml", &script);

    enact_cmd(tmp.path())
        .args(["--keep-going", "many.toml"])
        .assert()
        .code(255)
        .stdout(predicate::str::contains("Managed 300 resources with 300 failures."));
}

#[test]
fn report_out_writes_a_receipt() {
    let tmp = TempDir::new().expect("temp dir");
    let a = tmp.path().join("a.txt");
    write(&tmp, "site.toml", &file_step(&a));
    let report = tmp.path().join("out").join("receipt.json");

    enact_cmd(tmp.path())
        .arg("site.toml")
        .arg("--report-out")
        .arg(&report)
        .assert()
        .success();

    let receipt: Value =
        serde_json::from_str(&std::fs::read_to_string(&report).expect("read receipt"))
            .expect("parse receipt");
    let receipt = mask_prefix(
        normalize_nondeterministic(receipt),
        &tmp.path().display().to_string(),
        "<tmp>",
    );

    assert_eq!(
        receipt,
        json!({
            "schema": "enact.run.v1",
            "tool": { "name": "enact", "version": "__VERSION__" },
            "run": {
                "started_at": "__TIMESTAMP__",
                "ended_at": "__TIMESTAMP__",
                "duration_ms": 0
            },
            "script": "site.toml",
            "backend": "in-process",
            "options": { "debug": false, "keep_going": false, "verbose": false },
            "managed": ["File[<tmp>/a.txt]"],
            "failures": [],
            "summary": { "managed": 1, "failures": 0 },
            "exit_code": 0
        })
    );
}

#[cfg(unix)]
mod delegating {
    use super::*;

    #[test]
    fn resources_are_rendered_and_handed_to_the_enforcer() {
        let tmp = TempDir::new().expect("temp dir");
        write(
            &tmp,
            "a.toml",
            "[[step]]\nresource = \"notify\"\nname = \"x\"\nparams = { message = \"hi\" }\n",
        );

        enact_cmd(tmp.path())
            .args(["--backend", "delegating", "--enforcer", "sh"])
            .args(["--enforcer-arg", "-c", "--enforcer-arg", "echo \"delegated: $0\""])
            .arg("a.toml")
            .assert()
            .success()
            .stdout(predicate::str::contains(
                "delegated: notify { 'x': message => 'hi' }",
            ))
            .stdout(predicate::str::contains("Managed 1 resources with 0 failures."));
    }

    #[test]
    fn enforcer_failures_are_reported_with_its_output() {
        let tmp = TempDir::new().expect("temp dir");
        write(
            &tmp,
            "enact.toml",
            "backend = \"delegating\"\n\n[enforcer]\nprogram = \"sh\"\nargs = [\"-c\", \"echo broken >&2; exit 4\"]\n",
        );
        write(
            &tmp,
            "a.toml",
            "[[step]]\napply = \"notify { 'x': }\"\n\n[[step]]\nresource = \"notify\"\nname = \"after\"\n",
        );

        enact_cmd(tmp.path())
            .arg("a.toml")
            .assert()
            .code(1)
            .stdout(predicate::str::contains("broken"))
            .stdout(predicate::str::contains("Managed 0 resources with 1 failures."));
    }
}

#[test]
fn debug_dumps_the_engine_results() {
    let tmp = TempDir::new().expect("temp dir");
    let a = tmp.path().join("a.txt");
    let script = file_step(&a) + "[[step]]\napply = \"notify { 'block': }\"\n";
    write(&tmp, "site.toml", &script);

    enact_cmd(tmp.path())
        .args(["-d", "site.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains("SaveResult"))
        .stdout(predicate::str::contains("resource_statuses"))
        .stdout(predicate::str::contains("Managed 2 resources with 0 failures."));
}

#[test]
fn without_debug_nothing_is_dumped() {
    let tmp = TempDir::new().expect("temp dir");
    let a = tmp.path().join("a.txt");
    write(&tmp, "site.toml", &file_step(&a));

    enact_cmd(tmp.path())
        .arg("site.toml")
        .assert()
        .success()
        .stdout(predicate::str::contains("SaveResult").not());
}

#[test]
fn environment_variables_are_visible_to_scripts() {
    let tmp = TempDir::new().expect("temp dir");
    let target = tmp.path().join("greeting.txt");
    let script = format!(
        "[[step]]\nwhen = {{ var = \"env.ENACT_GREETING\", exists = true }}\nresource = \"file\"\nname = '{}'\nparams = {{ content = \"${{env.ENACT_GREETING}}, world\" }}\n",
        target.display()
    );
    write(&tmp, "site.toml", &script);

    enact_cmd(tmp.path())
        .arg("site.toml")
        .env("ENACT_GREETING", "hello")
        .assert()
        .success()
        .stdout(predicate::str::contains("Managed 1 resources with 0 failures."));

    assert_eq!(
        std::fs::read_to_string(&target).expect("read greeting"),
        "hello, world"
    );
}
