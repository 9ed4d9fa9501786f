//! End-to-end runs of the glint-check-rs binary against temporary projects.

use camino::Utf8PathBuf;
use pretty_assertions::assert_eq;
use serde::Deserialize;
use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

#[derive(Debug, Deserialize)]
struct JsonDiagnostic {
    #[serde(rename = "type")]
    diagnostic_type: String,
    filename: String,
    start: JsonPosition,
    message: String,
    code: u32,
}

#[derive(Debug, Deserialize)]
struct JsonPosition {
    line: u32,
    column: u32,
}

struct Project {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Project {
    fn new(files: &[(&str, &str)]) -> Self {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        for (path, contents) in files {
            let path = root.join(path);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, contents).unwrap();
        }
        Self { _dir: dir, root }
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_glint-check-rs"))
            .arg("--workspace")
            .arg(self.root.as_str())
            .args(args)
            .output()
            .unwrap()
    }

    fn run_json(&self, args: &[&str]) -> (Output, Vec<JsonDiagnostic>) {
        let mut all = vec!["--output", "json"];
        all.extend_from_slice(args);
        let output = self.run(&all);
        let diagnostics = serde_json::from_slice(&output.stdout).unwrap();
        (output, diagnostics)
    }
}

#[test]
fn clean_project_succeeds() {
    let project = Project::new(&[
        ("app/components/hello.gts", "export default <template>Hello, {{@name}}!</template>\n"),
        ("app/util.ts", "export const answer = 42;\n"),
    ]);

    let output = project.run(&[]);
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("glint-check found 0 errors and 0 warnings in 2 files"));
}

#[test]
fn template_errors_fail_the_run() {
    let project = Project::new(&[(
        "app/components/bad.gts",
        "<template>\n  {{! @glint-bogus }}\n</template>\n",
    )]);

    let (output, diagnostics) = project.run_json(&[]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(diagnostics.len(), 1);
    let diagnostic = &diagnostics[0];
    assert_eq!(diagnostic.diagnostic_type, "Error");
    assert_eq!(diagnostic.filename, "app/components/bad.gts");
    assert_eq!((diagnostic.start.line, diagnostic.start.column), (2, 3));
    assert_eq!(diagnostic.message, "Unknown directive @glint-bogus");
}

#[test]
fn checker_diagnostics_map_into_companion_templates() {
    let project = Project::new(&[
        ("app/components/card.ts", "export default class Card {}\n"),
        ("app/components/card.hbs", "<h1>\n  {{@title}}\n</h1>\n"),
    ]);

    // Learn where the generated code puts the argument reference.
    let output = project.run(&["--emit-ts"]);
    let stderr = String::from_utf8(output.stderr).unwrap();
    let generated = stderr
        .split_once("=== TypeScript for app/components/card.ts ===\n")
        .map(|(_, rest)| rest)
        .unwrap();
    let at = generated.find("args.title").unwrap() + "args.".len();

    let diagnostics = format!(
        r#"[{{"file":"app/components/card.ts","start":{at},"length":5,"message":"Property 'title' does not exist.","code":2339}}]"#
    );
    fs::write(project.root.join("tsc.json"), diagnostics).unwrap();
    let tsc = project.root.join("tsc.json");

    let (output, diagnostics) = project.run_json(&["--diagnostics", tsc.as_str()]);
    assert_eq!(output.status.code(), Some(1));
    assert_eq!(diagnostics.len(), 1);
    let diagnostic = &diagnostics[0];
    assert_eq!(diagnostic.filename, "app/components/card.hbs");
    assert_eq!((diagnostic.start.line, diagnostic.start.column), (2, 6));
    assert_eq!(diagnostic.code, 2339);
}

#[test]
fn expect_error_suppresses_and_reports_unused() {
    let source = "<template>\n  {{! @glint-expect-error }}\n  {{@missing}}\n  {{! @glint-expect-error }}\n  {{@fine}}\n</template>\n";
    let project = Project::new(&[("app/components/demo.gts", source)]);

    let output = project.run(&["--emit-ts"]);
    let stderr = String::from_utf8(output.stderr).unwrap();
    let generated = stderr
        .split_once("=== TypeScript for app/components/demo.gts ===\n")
        .map(|(_, rest)| rest)
        .unwrap();
    let at = generated.find("args.missing").unwrap() + "args.".len();

    fs::write(
        project.root.join("tsc.json"),
        format!(r#"[{{"file":"app/components/demo.gts","start":{at},"length":7,"message":"nope","code":2339}}]"#),
    )
    .unwrap();
    let tsc = project.root.join("tsc.json");

    let (_, diagnostics) = project.run_json(&["--diagnostics", tsc.as_str()]);
    let messages: Vec<_> = diagnostics.iter().map(|d| d.message.as_str()).collect();
    assert_eq!(messages, vec!["Unused '@glint-expect-error' directive."]);
    assert_eq!(diagnostics[0].start.line, 4);
}

#[test]
fn machine_output_and_config_excludes() {
    let project = Project::new(&[
        (
            "glint.config.json",
            r#"{
                // native templates only
                "nativeTemplate": { "typesModule": "@glint/environment-ember-template-imports/-private/dsl" },
                "exclude": ["legacy/**"]
            }"#,
        ),
        ("legacy/old.gts", "<template>{{! @glint-bogus }}</template>\n"),
        ("app/new.gts", "<template>{{! @glint-unknown }}</template>\n"),
    ]);

    let output = project.run(&["--output", "machine"]);
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert_eq!(
        stdout,
        "ERROR app/new.gts:1:11:1:32 Unknown directive @glint-unknown (0)\n"
    );
}

#[test]
fn debug_mapping_prints_the_tree() {
    let project = Project::new(&[("a.gts", "<template>{{@a}}</template>\n")]);
    let output = project.run(&["--debug-mapping"]);
    assert!(output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("=== Mapping for a.gts ==="));
    assert!(stderr.contains("Mapping:"));
}

#[test]
fn invalid_explicit_config_is_reported() {
    let project = Project::new(&[("broken.json", "{")]);
    let output = project.run(&["--config", "broken.json"]);
    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("broken.json"));
}
