use serde_json::Value;
use spvremap_core::binary::{encode_instruction, encode_string};
use spvremap_core::rspirv::spirv::Op;
use spvremap_core::{MAGIC_NUMBER, words_to_bytes};
use std::ffi::OsStr;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

struct TempDirGuard {
    path: PathBuf,
}

impl TempDirGuard {
    fn new(prefix: &str) -> Self {
        let unique = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "spvremap-cli-{prefix}-{}-{unique}",
            std::process::id()
        ));
        fs::create_dir_all(&path).expect("temp dir should be created");
        Self { path }
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempDirGuard {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

fn run_spvremap<I, S>(args: I) -> Output
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let bin = env!("CARGO_BIN_EXE_spvremap");
    Command::new(bin)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("spvremap command should execute")
}

fn assert_success(output: &Output) {
    if !output.status.success() {
        panic!(
            "command failed with status {:?}\nstdout:\n{}\nstderr:\n{}",
            output.status.code(),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
}

fn assert_failure(output: &Output) {
    if output.status.success() {
        panic!(
            "command unexpectedly succeeded\nstdout:\n{}\nstderr:\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr),
        );
    }
    assert_eq!(output.status.code(), Some(1));
}

fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn parse_json_stdout(output: &Output) -> Value {
    serde_json::from_slice::<Value>(&output.stdout).unwrap_or_else(|e| {
        panic!(
            "stdout should be json: {e}\nstdout:\n{}",
            String::from_utf8_lossy(&output.stdout)
        )
    })
}

/// Compute shader with one debug name and one unreachable function. 48 words.
fn compute_shader_bytes() -> Vec<u8> {
    let mut words = vec![MAGIC_NUMBER, 0x0001_0000, 0, 8, 0];
    let mut push = |op: Op, operands: &[u32]| words.extend(encode_instruction(op, operands));
    push(Op::Capability, &[1]);
    push(Op::MemoryModel, &[0, 1]);
    let mut entry = vec![5, 3];
    entry.extend(encode_string("main"));
    push(Op::EntryPoint, &entry);
    push(Op::ExecutionMode, &[3, 17, 1, 1, 1]);
    let mut name = vec![3];
    name.extend(encode_string("main"));
    push(Op::Name, &name);
    push(Op::TypeVoid, &[1]);
    push(Op::TypeFunction, &[2, 1]);
    push(Op::Function, &[1, 3, 0, 2]);
    push(Op::Label, &[4]);
    push(Op::Return, &[]);
    push(Op::FunctionEnd, &[]);
    push(Op::Function, &[1, 5, 0, 2]);
    push(Op::Label, &[6]);
    push(Op::Return, &[]);
    push(Op::FunctionEnd, &[]);
    words_to_bytes(&words)
}

fn write_shader(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, compute_shader_bytes()).expect("shader should be written");
    path
}

#[test]
fn remap_to_output_file_reports_json() {
    let tmp = TempDirGuard::new("remap-output");
    let input = write_shader(tmp.path(), "shader.spv");
    let output_path = tmp.path().join("out.spv");

    let output = run_spvremap([
        OsStr::new("remap"),
        input.as_os_str(),
        OsStr::new("-o"),
        output_path.as_os_str(),
        OsStr::new("--json"),
    ]);
    assert_success(&output);

    let payload = parse_json_stdout(&output);
    assert_eq!(payload["optionBits"], 511);
    let report = &payload["files"][0]["report"];
    assert_eq!(report["inputWords"], 48);
    assert_eq!(report["inputBound"], 8);
    assert_eq!(report["outputBound"], 5);
    assert_eq!(report["removedFunctions"], 1);
    assert_eq!(report["strippedInstructions"], 1);
    assert_eq!(report["renumbered"], true);

    let written = fs::read(&output_path).expect("output should exist");
    assert_eq!(
        Some(written.len() as u64),
        report["outputWords"].as_u64().map(|words| words * 4)
    );
    assert_eq!(
        fs::read(&input).expect("input should still exist"),
        compute_shader_bytes()
    );
}

#[test]
fn remap_without_output_overwrites_inputs() {
    let tmp = TempDirGuard::new("remap-in-place");
    let a = write_shader(tmp.path(), "a.spv");
    let b = write_shader(tmp.path(), "b.spv");

    let output = run_spvremap([OsStr::new("remap"), a.as_os_str(), b.as_os_str()]);
    assert_success(&output);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("words: 48 -> "), "unexpected stdout: {stdout}");

    let a_bytes = fs::read(&a).expect("a should exist");
    assert!(a_bytes.len() < compute_shader_bytes().len());
    assert_eq!(a_bytes, fs::read(&b).expect("b should exist"));

    // A second run finds nothing left to remove.
    let again = run_spvremap([OsStr::new("remap"), a.as_os_str(), OsStr::new("--json")]);
    assert_success(&again);
    let payload = parse_json_stdout(&again);
    assert_eq!(
        payload["files"][0]["report"]["outputWords"].as_u64(),
        Some(a_bytes.len() as u64 / 4)
    );
}

#[test]
fn remap_into_output_dir() {
    let tmp = TempDirGuard::new("remap-dir");
    let input = write_shader(tmp.path(), "shader.spv");
    let out_dir = tmp.path().join("out");

    let output = run_spvremap([
        OsStr::new("remap"),
        input.as_os_str(),
        OsStr::new("--output-dir"),
        out_dir.as_os_str(),
    ]);
    assert_success(&output);

    assert!(out_dir.join("shader.spv").is_file());
    assert_eq!(
        fs::read(&input).expect("input should exist"),
        compute_shader_bytes()
    );
}

#[test]
fn config_file_and_flags_select_passes() {
    let tmp = TempDirGuard::new("remap-config");
    let input = write_shader(tmp.path(), "shader.spv");
    let config = tmp.path().join("spvremap.toml");
    fs::write(&config, "[remap]\nstrip = false\n").expect("config should be written");

    let output = run_spvremap([
        OsStr::new("remap"),
        input.as_os_str(),
        OsStr::new("--config"),
        config.as_os_str(),
        OsStr::new("--map"),
        OsStr::new("none"),
        OsStr::new("--json"),
    ]);
    assert_success(&output);

    let payload = parse_json_stdout(&output);
    assert_eq!(payload["options"]["strip"], false);
    assert_eq!(payload["options"]["map_types"], false);
    assert_eq!(payload["optionBits"], 496);
    let report = &payload["files"][0]["report"];
    assert_eq!(report["strippedInstructions"], 0);
    assert_eq!(report["renumbered"], false);
    assert_eq!(report["outputBound"], 8);
    assert_eq!(report["outputWords"], 39);
}

#[test]
fn inspect_reports_header_and_counts() {
    let tmp = TempDirGuard::new("inspect");
    let input = write_shader(tmp.path(), "shader.spv");

    let output = run_spvremap([OsStr::new("inspect"), input.as_os_str(), OsStr::new("--json")]);
    assert_success(&output);

    let payload = parse_json_stdout(&output);
    assert_eq!(payload["words"], 48);
    assert_eq!(payload["version"], "1.0");
    assert_eq!(payload["bound"], 8);
    assert_eq!(payload["counts"]["total"], 15);
    assert_eq!(payload["counts"]["debug"], 1);
    assert_eq!(payload["counts"]["entryPoints"], 1);
    assert_eq!(payload["counts"]["functions"], 2);
    assert_eq!(payload["counts"]["functionInstructions"], 8);
}

#[test]
fn errors_exit_with_status_one() {
    let tmp = TempDirGuard::new("errors");
    let a = write_shader(tmp.path(), "a.spv");
    let b = write_shader(tmp.path(), "b.spv");

    let two_inputs_one_output = run_spvremap([
        OsStr::new("remap"),
        a.as_os_str(),
        b.as_os_str(),
        OsStr::new("-o"),
        tmp.path().join("out.spv").as_os_str(),
    ]);
    assert_failure(&two_inputs_one_output);
    assert!(stderr_text(&two_inputs_one_output).contains("error: --output takes a single input"));

    let garbage = tmp.path().join("garbage.spv");
    fs::write(&garbage, b"not spir-v at all").expect("garbage should be written");
    let bad_module = run_spvremap([OsStr::new("remap"), garbage.as_os_str()]);
    assert_failure(&bad_module);
    assert!(stderr_text(&bad_module).starts_with("error: "));

    let config = tmp.path().join("bad.toml");
    fs::write(&config, "[remap]\nstrp = true\n").expect("config should be written");
    let bad_config = run_spvremap([
        OsStr::new("remap"),
        a.as_os_str(),
        OsStr::new("--config"),
        config.as_os_str(),
    ]);
    assert_failure(&bad_config);
    assert!(stderr_text(&bad_config).contains("invalid config"));
    assert_eq!(
        fs::read(&a).expect("a should exist"),
        compute_shader_bytes()
    );

    let missing = run_spvremap([
        OsStr::new("inspect"),
        tmp.path().join("missing.spv").as_os_str(),
    ]);
    assert_failure(&missing);
}
