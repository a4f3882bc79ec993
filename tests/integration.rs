use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn fixture() -> PathBuf {
    return Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/site");
}

fn mdxref(root: &Path) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_mdxref"));
    cmd.arg("--root").arg(root);
    return cmd;
}

fn stdout(output: &Output) -> String {
    return String::from_utf8_lossy(&output.stdout).into_owned();
}

fn stderr(output: &Output) -> String {
    return String::from_utf8_lossy(&output.stderr).into_owned();
}

/// Copy the fixture site into a temp dir so commands that write can run on it.
fn writable_site() -> tempfile::TempDir {
    fn copy_dir(from: &Path, to: &Path) {
        std::fs::create_dir_all(to).unwrap();
        for entry in std::fs::read_dir(from).unwrap() {
            let entry = entry.unwrap();
            let target = to.join(entry.file_name());
            if entry.file_type().unwrap().is_dir() {
                copy_dir(&entry.path(), &target);
            } else {
                std::fs::copy(entry.path(), &target).unwrap();
            }
        }
    }
    let dir = tempfile::tempdir().unwrap();
    copy_dir(&fixture(), dir.path());
    return dir;
}

#[test]
fn healthy_instances_pass() {
    let output = mdxref(&fixture())
        .args(["check", "--instance", "server-zh", "--instance", "client-zh"])
        .output()
        .unwrap();
    assert!(output.status.success(), "check failed: {}{}", stdout(&output), stderr(&output));
    let out = stdout(&output);
    assert!(out.contains("Checked 3 documents."), "{out}");
    assert!(out.contains("No broken references found."), "{out}");
}

#[test]
fn broken_references_fail_with_exit_one() {
    let output = mdxref(&fixture()).args(["check", "--locale", "zh"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1), "{}", stderr(&output));

    let out = stdout(&output);
    assert!(out.contains("Checked 5 documents."), "{out}");
    assert!(out.contains("file not found: 3"), "{out}");
    assert!(out.contains("anchor not found: 1"), "{out}");
    assert!(out.contains("no instance for route: 1"), "{out}");
    assert!(out.contains("mixed-language link: 1"), "{out}");
    assert!(out.contains("./Missing.mdx"), "{out}");
    assert!(out.contains("removed-page"), "{out}");
    assert!(!out.contains("Ignored.mdx"), "fenced link was reported: {out}");
}

#[test]
fn warn_only_exits_zero() {
    let output = mdxref(&fixture()).args(["check", "--locale", "zh", "--warn-only"]).output().unwrap();
    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).contains("Summary:"));
}

#[test]
fn json_report_lists_problems() {
    let output = mdxref(&fixture()).args(["check", "--locale", "en", "--format", "json"]).output().unwrap();
    assert_eq!(output.status.code(), Some(1), "{}", stderr(&output));

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["files_checked"], 1);
    let problems = report["problems"].as_array().unwrap();
    assert_eq!(problems.len(), 1, "{report:#}");
    assert_eq!(problems[0]["kind"], "mixed-language");
    assert_eq!(problems[0]["target"], "https://doc-zh.zego.im/article/1");
    assert_eq!(problems[0]["line"], 3);
}

#[test]
fn unknown_instance_is_a_fatal_error() {
    let output = mdxref(&fixture()).args(["check", "--instance", "nope"]).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Unknown Instance"), "{}", stderr(&output));
}

#[test]
fn missing_config_is_a_fatal_error() {
    let empty = tempfile::tempdir().unwrap();
    let output = mdxref(empty.path()).arg("check").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("Config Not Found"), "{}", stderr(&output));
}

#[test]
fn instances_are_grouped() {
    let output = mdxref(&fixture()).args(["instances", "--locale", "zh"]).output().unwrap();
    assert!(output.status.success(), "{}", stderr(&output));

    let out = stdout(&output);
    let group = out.find("AI Agent").unwrap();
    let ungrouped = out.find("Ungrouped").unwrap();
    assert!(group < ungrouped, "{out}");
    assert!(out.contains("服务端 API (Server)"), "{out}");
    assert!(out.contains("https://help.example.com/zh"), "{out}");
    assert!(!out.contains("server-en"), "{out}");
}

#[test]
fn id_prints_route() {
    let file = fixture().join("docs/zh/server/01-Guide/02-Install SDK.mdx");
    let output = mdxref(&fixture()).arg("id").arg(&file).output().unwrap();
    assert!(output.status.success(), "{}", stderr(&output));

    let out = stdout(&output);
    assert!(out.contains("instance: server-zh"), "{out}");
    assert!(out.contains("id:       guide/install-sdk"), "{out}");
    assert!(out.contains("route:    /server/guide/install-sdk"), "{out}");
}

#[test]
fn anchors_skip_frontmatter_and_fences() {
    let file = fixture().join("docs/zh/server/Quick Start.mdx");
    let output = mdxref(&fixture()).arg("anchors").arg(&file).output().unwrap();
    assert!(output.status.success(), "{}", stderr(&output));

    let anchors: Vec<String> = stdout(&output).lines().map(String::from).collect();
    assert_eq!(anchors, vec!["quickstart", "prerequisites"]);
}

#[test]
fn mv_rewrites_every_reference() {
    let site = writable_site();
    let root = site.path();
    let old = root.join("docs/zh/server/01-Guide/02-Install SDK.mdx");
    let new = root.join("docs/zh/server/setup/Install SDK.mdx");

    let output = mdxref(root).arg("mv").arg(&old).arg(&new).output().unwrap();
    assert!(output.status.success(), "mv failed: {}", stderr(&output));
    assert!(!old.exists());
    assert!(new.is_file());

    let quick_start = std::fs::read_to_string(root.join("docs/zh/server/Quick Start.mdx")).unwrap();
    assert!(quick_start.contains("(./setup/Install%20SDK.mdx)"), "{quick_start}");
    let overview = std::fs::read_to_string(root.join("docs/zh/client/Overview.mdx")).unwrap();
    assert!(overview.contains("(/server/setup/install-sdk#download)"), "{overview}");
    let sidebar = std::fs::read_to_string(root.join("docs/zh/server/sidebars.json")).unwrap();
    assert!(sidebar.contains("\"setup/install-sdk\""), "{sidebar}");
    assert!(sidebar.contains("\"collapsed\": false"), "{sidebar}");

    let check = mdxref(root)
        .args(["check", "--instance", "server-zh", "--instance", "client-zh"])
        .output()
        .unwrap();
    assert!(check.status.success(), "check after mv: {}", stdout(&check));
}

#[test]
fn mv_there_and_back_restores_every_file() {
    let site = writable_site();
    let root = site.path();
    let touched = [
        "docs/zh/server/Quick Start.mdx",
        "docs/zh/client/Overview.mdx",
        "docs/zh/server/sidebars.json",
    ];
    let before: Vec<String> = touched.iter().map(|rel| std::fs::read_to_string(root.join(rel)).unwrap()).collect();

    let old = root.join("docs/zh/server/01-Guide/02-Install SDK.mdx");
    let new = root.join("docs/zh/server/setup/Install SDK.mdx");
    let there = mdxref(root).arg("mv").arg(&old).arg(&new).output().unwrap();
    assert!(there.status.success(), "{}", stderr(&there));
    let back = mdxref(root).arg("mv").arg(&new).arg(&old).output().unwrap();
    assert!(back.status.success(), "{}", stderr(&back));

    for (rel, original) in touched.iter().zip(&before) {
        assert_eq!(&std::fs::read_to_string(root.join(rel)).unwrap(), original, "{rel}");
    }
}

#[test]
fn mv_refuses_paths_outside_root() {
    let site = writable_site();
    let root = site.path();
    let elsewhere = tempfile::tempdir().unwrap();

    let output = mdxref(root)
        .arg("mv")
        .arg(root.join("docs/zh/faq/Fine.mdx"))
        .arg(elsewhere.path().join("Fine.mdx"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(root.join("docs/zh/faq/Fine.mdx").is_file());
}

#[test]
fn rename_plan_runs_and_logs() {
    let site = writable_site();
    let root = site.path();
    std::fs::write(
        root.join("rename.json"),
        r#"{
            "target": ["docs/zh/faq", "docs/zh/missing"],
            "action": ["mkdir archive", "mv Fine.mdx archive/Fine.mdx", "mv Absent.mdx Other.mdx"]
        }"#,
    )
    .unwrap();
    let log = root.join("rename-log.json");

    let output = mdxref(root).arg("rename").arg("--log").arg(&log).output().unwrap();
    assert!(output.status.success(), "rename failed: {}{}", stdout(&output), stderr(&output));
    assert!(root.join("docs/zh/faq/archive/Fine.mdx").is_file());

    let problems = std::fs::read_to_string(root.join("docs/zh/faq/Problems.mdx")).unwrap();
    assert!(problems.contains("(./archive/Fine.mdx#nowhere)"), "{problems}");

    let written: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&log).unwrap()).unwrap();
    assert_eq!(written["summary"]["total_success"], 2);
    assert_eq!(written["summary"]["total_skipped"], 2);
    assert_eq!(written["summary"]["total_failed"], 0);
    assert_eq!(written["details"]["docs/zh/missing"]["skipped"][0]["action"], "all");
}

#[test]
fn malformed_plan_runs_nothing() {
    let site = writable_site();
    let root = site.path();
    std::fs::write(
        root.join("rename.json"),
        r#"{"target": ["docs/zh/faq"], "action": ["mkdir archive", "cp Fine.mdx Copy.mdx"]}"#,
    )
    .unwrap();

    let output = mdxref(root).arg("rename").output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(!root.join("docs/zh/faq/archive").exists());
}
