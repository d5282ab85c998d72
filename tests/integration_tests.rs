//! Integration tests: library pipeline scenarios and CLI end-to-end runs.

mod common;

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::TempDir;

use scene_vaccine_sweeper::cleaner::batch::{BatchCleaner, FileOutcome};
use scene_vaccine_sweeper::cleaner::blocks::segment_bytes;
use scene_vaccine_sweeper::cleaner::replace::{ReplaceOptions, backup_path_for, replace};
use scene_vaccine_sweeper::cleaner::sanitizer::sanitize;
use scene_vaccine_sweeper::core::config::Config;
use scene_vaccine_sweeper::logger::sink::{ActivityEvent, JsonlSink, MemorySink, NullSink};
use scene_vaccine_sweeper::scanner::walker::{DirectoryWalker, WalkerConfig};

const INFECTED_SCENE: &[u8] = b"//Maya ASCII 2022 scene\n\
requires maya \"2022\";\n\
createNode transform -n \"pCube1\";\n\
\tsetAttr \".t\" -type \"double3\" 0 1 0 ;\n\
createNode script -n \"vaccine_gene\";\n\
\taddAttr -ci true -sn \"nts\" -ln \"notes\" -dt \"string\";\n\
\tsetAttr \".b\" -type \"string\" \"import base64; exec(...)\";\n\
\n\
createNode script -n \"breed_gene\";\n\
\tsetAttr \".b\" -type \"string\" \"python(\\\"import vaccine\\\")\";\n\
select -ne :time1;\n";

const CLEANED_SCENE: &[u8] = b"//Maya ASCII 2022 scene\n\
requires maya \"2022\";\n\
createNode transform -n \"pCube1\";\n\
\tsetAttr \".t\" -type \"double3\" 0 1 0 ;\n\
select -ne :time1;\n";

struct Workspace {
    scenes: TempDir,
    tmp: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            scenes: TempDir::new().unwrap(),
            tmp: TempDir::new().unwrap(),
        }
    }

    fn root(&self) -> PathBuf {
        fs::canonicalize(self.scenes.path()).unwrap()
    }

    fn write(&self, rel: &str, content: &[u8]) -> PathBuf {
        let path = self.root().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(&path, content).unwrap();
        path
    }

    fn tmp_arg(&self) -> String {
        self.tmp.path().display().to_string()
    }

    fn config(&self) -> Config {
        let mut config = Config::default();
        config.cleaner.temp_dir = Some(self.tmp.path().to_path_buf());
        config
    }
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

// ──────────────────── library pipeline ────────────────────

#[test]
fn realistic_scene_loses_only_script_nodes() {
    let ws = Workspace::new();
    let scene = ws.write("shot.ma", INFECTED_SCENE);

    let cleaned = sanitize(&scene, Some(ws.tmp.path()), &NullSink)
        .unwrap()
        .expect("scene carries the marker");
    assert_eq!(fs::read(&cleaned).unwrap(), CLEANED_SCENE);
    assert_eq!(fs::read(&scene).unwrap(), INFECTED_SCENE);
}

#[test]
fn sanitized_output_segments_into_the_surviving_blocks() {
    let blocks = segment_bytes(INFECTED_SCENE);
    assert_eq!(blocks.len(), 6);
    let survivors: Vec<_> = blocks.iter().filter(|b| !b.contains(b"vaccine")).collect();
    assert_eq!(survivors.len(), 4);

    let mut rejoined = Vec::new();
    for block in survivors {
        rejoined.extend_from_slice(block.as_bytes());
        rejoined.push(b'\n');
    }
    assert_eq!(rejoined, CLEANED_SCENE);
}

#[test]
fn replacement_with_and_without_backup() {
    let ws = Workspace::new();

    let with_backup = ws.write("f.ma", INFECTED_SCENE);
    let sanitized = sanitize(&with_backup, Some(ws.tmp.path()), &NullSink)
        .unwrap()
        .unwrap();
    replace(
        &with_backup,
        &sanitized,
        ReplaceOptions {
            backup: true,
            verify: true,
        },
        &NullSink,
    )
    .unwrap();
    assert_eq!(fs::read(&with_backup).unwrap(), CLEANED_SCENE);
    assert_eq!(fs::read(backup_path_for(&with_backup)).unwrap(), INFECTED_SCENE);

    let without_backup = ws.write("g.ma", INFECTED_SCENE);
    let sanitized = sanitize(&without_backup, Some(ws.tmp.path()), &NullSink)
        .unwrap()
        .unwrap();
    replace(&without_backup, &sanitized, ReplaceOptions::default(), &NullSink).unwrap();
    assert_eq!(fs::read(&without_backup).unwrap(), CLEANED_SCENE);
    assert!(!backup_path_for(&without_backup).exists());
}

#[cfg(unix)]
#[test]
fn sweep_counts_one_clean_one_failure() {
    let ws = Workspace::new();
    ws.write("a/ok.ma", b"requires maya \"2022\";\n");
    let infected = ws.write("b/infected.ma", INFECTED_SCENE);
    std::os::unix::fs::symlink(ws.root().join("nowhere.ma"), ws.root().join("broken.ma"))
        .unwrap();

    let sink = MemorySink::new();
    let cleaner = BatchCleaner::new(&ws.config(), &sink);
    let walker = DirectoryWalker::new(WalkerConfig::default());
    let report = cleaner.sweep(&walker, &ws.root()).unwrap();

    assert_eq!(report.cleaned.len(), 1);
    assert_eq!(report.failed_count(), 1);
    assert_eq!(
        report.cleaned[0],
        PathBuf::from(format!("{}.clean", infected.display()))
    );
    assert_eq!(fs::read(&report.cleaned[0]).unwrap(), CLEANED_SCENE);
    assert!(
        sink.events()
            .iter()
            .any(|e| matches!(e, ActivityEvent::FileFailed { path, .. } if path.ends_with("broken.ma")))
    );
}

#[test]
fn second_sweep_in_place_finds_nothing() {
    let ws = Workspace::new();
    let scene = ws.write("s.ma", INFECTED_SCENE);
    let mut config = ws.config();
    config.replace.in_place = true;

    let cleaner = BatchCleaner::new(&config, &NullSink);
    assert_eq!(
        cleaner.clean_file(&scene),
        FileOutcome::Cleaned {
            output: scene.clone()
        }
    );
    assert_eq!(cleaner.clean_file(&scene), FileOutcome::Untouched);
    assert_eq!(fs::read(&scene).unwrap(), CLEANED_SCENE);
}

#[test]
fn jsonl_sink_records_the_run() {
    let ws = Workspace::new();
    ws.write("x.ma", INFECTED_SCENE);
    let log = ws.tmp.path().join("logs").join("svs.jsonl");

    {
        let sink = JsonlSink::open(&log);
        let cleaner = BatchCleaner::new(&ws.config(), &sink);
        let walker = DirectoryWalker::new(WalkerConfig::default());
        cleaner.sweep(&walker, &ws.root()).unwrap();
        sink.flush();
    }

    let events: Vec<Value> = fs::read_to_string(&log)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    let kinds: Vec<&str> = events.iter().map(|e| e["event"].as_str().unwrap()).collect();
    assert_eq!(kinds.first(), Some(&"sweep_start"));
    assert!(kinds.contains(&"file_cleared"));
    assert!(kinds.contains(&"clean_copy_placed"));
    assert_eq!(kinds.last(), Some(&"sweep_complete"));
    assert_eq!(events.last().unwrap()["cleaned"], 1);
}

// ──────────────────── CLI ────────────────────

#[test]
fn help_command_prints_usage() {
    let result = common::run_cli_case("help_command_prints_usage", &["--help"]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("Usage: svs [OPTIONS]"),
        "missing help banner; log: {}",
        result.log_path.display()
    );
}

#[test]
fn version_command_prints_version() {
    let result = common::run_cli_case("version_command_prints_version", &["--version"]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("svs"),
        "missing version output; log: {}",
        result.log_path.display()
    );
}

#[test]
fn completions_generate_shell_script() {
    let result = common::run_cli_case("completions_bash", &["--completions", "bash"]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert!(
        result.stdout.contains("svs"),
        "missing completion script; log: {}",
        result.log_path.display()
    );
}

#[test]
fn directory_run_prints_clean_siblings() {
    let ws = Workspace::new();
    let infected = ws.write("shots/s010.ma", INFECTED_SCENE);
    ws.write("shots/s020.ma", CLEANED_SCENE);
    let tmp = ws.tmp_arg();
    let root = path_arg(&ws.root());

    let result = common::run_cli_case(
        "directory_run_prints_clean_siblings",
        &["--temp-dir", &tmp, &root],
    );
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    let clean = format!("{}.clean", infected.display());
    assert_eq!(
        result.stdout.lines().collect::<Vec<_>>(),
        vec![clean.as_str()],
        "log: {}",
        result.log_path.display()
    );
    assert_eq!(fs::read(&clean).unwrap(), CLEANED_SCENE);
    assert_eq!(fs::read(&infected).unwrap(), INFECTED_SCENE);
    assert!(result.stderr.contains("INFO:svs:"));
}

#[test]
fn replace_with_backup_flags() {
    let ws = Workspace::new();
    let scene = ws.write("f.ma", INFECTED_SCENE);
    let tmp = ws.tmp_arg();
    let root = path_arg(&ws.root());

    let result = common::run_cli_case("replace_with_backup_flags", &["-r", "-b", "--temp-dir", &tmp, &root]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert_eq!(result.stdout.trim(), scene.display().to_string());
    assert_eq!(fs::read(&scene).unwrap(), CLEANED_SCENE);
    assert_eq!(fs::read(backup_path_for(&scene)).unwrap(), INFECTED_SCENE);
}

#[test]
fn scene_file_argument_is_cleaned_directly() {
    let ws = Workspace::new();
    let scene = ws.write("solo.ma", INFECTED_SCENE);
    let tmp = ws.tmp_arg();
    let arg = path_arg(&scene);

    let result = common::run_cli_case("scene_file_argument", &["--replace", "--temp-dir", &tmp, &arg]);
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    assert_eq!(fs::read(&scene).unwrap(), CLEANED_SCENE);
    assert!(!backup_path_for(&scene).exists());
}

#[test]
fn json_mode_and_missing_paths_keep_exit_zero() {
    let ws = Workspace::new();
    ws.write("x.ma", INFECTED_SCENE);
    let tmp = ws.tmp_arg();
    let root = path_arg(&ws.root());
    let missing = path_arg(&ws.root().join("does-not-exist"));

    let result = common::run_cli_case(
        "json_mode_and_missing_paths",
        &["--json", "-q", "--temp-dir", &tmp, &root, &missing],
    );
    assert!(
        result.status.success(),
        "expected success; log: {}",
        result.log_path.display()
    );
    let payload: Value = serde_json::from_str(result.stdout.trim()).unwrap();
    assert_eq!(payload["command"], "clean");
    assert_eq!(payload["files_seen"], 1);
    assert_eq!(payload["cleaned"].as_array().unwrap().len(), 1);
    assert_eq!(payload["skipped"][0]["path"], missing.as_str());
}

#[test]
fn output_format_env_selects_json() {
    let ws = Workspace::new();
    ws.write("clean.ma", CLEANED_SCENE);
    let tmp = ws.tmp_arg();
    let root = path_arg(&ws.root());

    let result = common::run_cli_case_with_env(
        "output_format_env_selects_json",
        &["--temp-dir", &tmp, &root],
        &[("SVS_OUTPUT_FORMAT", "json")],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let payload: Value = serde_json::from_str(result.stdout.trim()).unwrap();
    assert_eq!(payload["untouched"], 1);
    assert!(payload["cleaned"].as_array().unwrap().is_empty());
}

#[test]
fn log_file_flag_writes_jsonl() {
    let ws = Workspace::new();
    ws.write("x.ma", INFECTED_SCENE);
    let tmp = ws.tmp_arg();
    let root = path_arg(&ws.root());
    let log = ws.tmp.path().join("run.jsonl");
    let log_arg = path_arg(&log);

    let result = common::run_cli_case(
        "log_file_flag_writes_jsonl",
        &["-q", "--temp-dir", &tmp, "--log-file", &log_arg, &root],
    );
    assert!(result.status.success(), "log: {}", result.log_path.display());
    let contents = fs::read_to_string(&log).unwrap();
    assert!(contents.lines().count() >= 3);
    assert!(contents.contains("\"file_cleared\""));
}

#[test]
fn missing_explicit_config_is_a_user_error() {
    let ws = Workspace::new();
    let root = path_arg(&ws.root());
    let config = path_arg(&ws.root().join("absent.toml"));

    let result = common::run_cli_case("missing_explicit_config", &["--config", &config, &root]);
    assert_eq!(
        result.status.code(),
        Some(1),
        "log: {}",
        result.log_path.display()
    );
    assert!(result.stderr.contains("SVS-1002"));
}

#[test]
fn config_file_enables_in_place_replacement() {
    let ws = Workspace::new();
    let scene = ws.write("cfg.ma", INFECTED_SCENE);
    let config_path = ws.tmp.path().join("svs.toml");
    fs::write(
        &config_path,
        format!(
            "[cleaner]\ntemp_dir = \"{}\"\n\n[replace]\nin_place = true\nbackup = true\n",
            ws.tmp.path().display()
        ),
    )
    .unwrap();
    let config_arg = path_arg(&config_path);
    let root = path_arg(&ws.root());

    let result = common::run_cli_case("config_file_in_place", &["--config", &config_arg, &root]);
    assert!(result.status.success(), "log: {}", result.log_path.display());
    assert_eq!(fs::read(&scene).unwrap(), CLEANED_SCENE);
    assert_eq!(fs::read(backup_path_for(&scene)).unwrap(), INFECTED_SCENE);
}
