use std::fs;
use std::path::Path;

use clap::Parser;
use stache::{run, Cli};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, content: &str) -> String {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path.to_str().unwrap().to_string()
}

fn run_args(args: &[&str]) -> (bool, String) {
    let cli = Cli::try_parse_from(args).unwrap();
    let mut out = Vec::new();
    let ok = run(&cli, &mut out).unwrap();
    (ok, String::from_utf8(out).unwrap())
}

#[test]
fn renders_with_yaml_data_and_partials() {
    let dir = TempDir::new().unwrap();
    let partials = dir.path().join("templates");
    write(
        &partials,
        "mod_quiz/row.mustache",
        "<tr><th>{{title}}</th><td>{{{content}}}</td></tr>\n",
    );
    let page = write(
        dir.path(),
        "page.mustache",
        "<table>\n{{#items}}\n  {{> mod_quiz/row}}\n{{/items}}\n</table>\n",
    );
    let data = write(
        dir.path(),
        "data.yaml",
        "items:\n  - title: Status\n    content: <b>Finished</b>\n  - title: A & B\n    content: ok\n",
    );

    let (ok, out) = run_args(&[
        "stache",
        "render",
        &page,
        "--data",
        &data,
        "--partials",
        partials.to_str().unwrap(),
    ]);
    assert!(ok);
    assert_eq!(
        out,
        "<table>\n  <tr><th>Status</th><td><b>Finished</b></td></tr>\n  <tr><th>A &amp; B</th><td>ok</td></tr>\n</table>\n"
    );
}

#[test]
fn raw_disables_escaping() {
    let dir = TempDir::new().unwrap();
    let page = write(dir.path(), "page.txt", "{{v}}");
    let data = write(dir.path(), "data.json", r#"{"v": "<i>x</i>"}"#);

    let (_, escaped) = run_args(&["stache", "render", &page, "-d", &data]);
    assert_eq!(escaped, "&lt;i&gt;x&lt;/i&gt;");

    let (_, raw) = run_args(&["stache", "render", &page, "-d", &data, "--raw"]);
    assert_eq!(raw, "<i>x</i>");
}

#[test]
fn writes_output_file() {
    let dir = TempDir::new().unwrap();
    let page = write(dir.path(), "page.mustache", "Hello {{name}}{{^name}}world{{/name}}\n");
    let target = dir.path().join("out.html");

    let (ok, out) = run_args(&[
        "stache",
        "render",
        &page,
        "--output",
        target.to_str().unwrap(),
    ]);
    assert!(ok);
    assert_eq!(out, "");
    assert_eq!(fs::read_to_string(target).unwrap(), "Hello world\n");
}

#[test]
fn missing_partial_directory_fails() {
    let dir = TempDir::new().unwrap();
    let page = write(dir.path(), "page.mustache", "{{> row}}");
    let missing = dir.path().join("nope");

    let cli = Cli::try_parse_from([
        "stache",
        "render",
        page.as_str(),
        "--partials",
        missing.to_str().unwrap(),
    ])
    .unwrap();
    let err = run(&cli, &mut Vec::new()).unwrap_err();
    assert!(format!("{:#}", err).contains("failed to load partials"));
}

#[test]
fn compile_error_names_the_template() {
    let dir = TempDir::new().unwrap();
    let page = write(dir.path(), "page.mustache", "{{#open}}never closed");

    let cli = Cli::try_parse_from(["stache", "render", page.as_str()]).unwrap();
    let err = run(&cli, &mut Vec::new()).unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("page.mustache"));
    assert!(message.contains("unclosed section `open`"));
}

#[test]
fn check_passes_on_valid_templates() {
    let dir = TempDir::new().unwrap();
    let a = write(dir.path(), "a.mustache", "{{=<% %>=}}<%#x%><%y%><%/x%>");
    let b = write(dir.path(), "b.mustache", "{{< layout}}{{$title}}T{{/title}}{{/layout}}");

    let (ok, out) = run_args(&["stache", "check", &a, &b]);
    assert!(ok);
    assert_eq!(out.lines().count(), 2);
    assert!(out.lines().all(|line| line.starts_with("ok")));
}
