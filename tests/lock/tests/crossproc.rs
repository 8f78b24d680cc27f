//! Cross-process determinism.
//!
//! Spawns the `search_fixture` binary under several working directories and
//! environments and asserts identical output, then checks that output
//! against the same run made in-process.

use std::path::Path;
use std::process::Command;

use arbor_harness::run_to_completion;
use arbor_search::SearchPolicy;
use lock_tests::engine_helpers::queens;

fn workspace_root() -> String {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../..")
        .to_string_lossy()
        .into_owned()
}

fn run_variant(args: &[&str], work_dir: &str, env_overrides: &[(&str, &str)]) -> String {
    let bin = env!("CARGO_BIN_EXE_search_fixture");
    let mut command = Command::new(bin);
    command
        .args(args)
        .current_dir(work_dir)
        .env_remove("LC_ALL")
        .env_remove("LANG")
        .env_remove("RUST_LOG");
    for &(key, val) in env_overrides {
        command.env(key, val);
    }

    let output = command.output().unwrap_or_else(|e| {
        panic!("failed to spawn {bin} (work_dir={work_dir}, overrides={env_overrides:?}): {e}")
    });
    assert!(
        output.status.success(),
        "search_fixture exited with {}: stderr={}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout).expect("stdout is valid UTF-8")
}

fn field<'a>(output: &'a str, key: &str) -> &'a str {
    output
        .lines()
        .find_map(|l| l.strip_prefix(key)?.strip_prefix('='))
        .unwrap_or_else(|| panic!("missing {key} in:\n{output}"))
}

#[test]
fn output_is_identical_across_environments() {
    let root = workspace_root();
    let tmp = std::env::temp_dir();
    let tmp = tmp.to_string_lossy();

    for args in [&[][..], &["3"][..]] {
        let baseline = run_variant(args, &root, &[]);
        assert!(field(&baseline, "trace_digest").starts_with("sha256:"));
        assert_eq!(field(&baseline, "state"), "exhausted");
        assert_eq!(field(&baseline, "solutions"), "4");

        let variants = [
            run_variant(args, &tmp, &[]),
            run_variant(args, &root, &[("LC_ALL", "C"), ("TZ", "UTC")]),
            run_variant(args, &root, &[("LANG", "tr_TR.UTF-8"), ("RUST_LOG", "trace")]),
        ];
        for (i, variant) in variants.iter().enumerate() {
            assert_eq!(&baseline, variant, "variant {i} with args {args:?} diverged");
        }
    }
}

#[test]
fn subprocess_matches_in_process_run() {
    let output = run_variant(&[], &workspace_root(), &[]);
    let policy = SearchPolicy::default().with_seed(11);
    let report = run_to_completion(queens(6, policy), None).unwrap();

    assert_eq!(field(&output, "report_digest"), report.digest().unwrap().as_str());
    assert_eq!(field(&output, "trace_digest"), report.trace_digest.as_str());
    assert_eq!(field(&output, "expanded"), report.stats.expanded.to_string());
    assert_eq!(field(&output, "created"), report.stats.created.to_string());
}
