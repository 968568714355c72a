mod common;

use std::fs;
use std::process::{Command, Output};

use common::Project;
use pretty_assertions::assert_eq;

/// Runs the binary inside `project`, isolated from any user or system configuration.
fn run_luapack(project: &Project, args: &[&str]) -> Output {
    let isolated = project.path(".config-home");
    Command::new(env!("CARGO_BIN_EXE_luapack"))
        .args(args)
        .current_dir(&project.root)
        .env("RUST_LOG", "off")
        .env("XDG_CONFIG_HOME", &isolated)
        .env("XDG_CONFIG_DIRS", &isolated)
        .env("HOME", &isolated)
        .env("APPDATA", &isolated)
        .env_remove("LUAPACK_MINIFY")
        .env_remove("LUAPACK_METADATA")
        .env_remove("LUAPACK_EXTENSION")
        .env_remove("LUAPACK_DEPENDENCY_DIRS")
        .output()
        .expect("Failed to execute luapack")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

fn simple_project() -> anyhow::Result<Project> {
    Project::new(&[
        ("main.lua", "local m = require('mod')\nprint(m)"),
        ("mod.lua", "return 42"),
    ])
}

#[test]
fn test_stdout_output() -> anyhow::Result<()> {
    let project = simple_project()?;
    let output = run_luapack(&project, &["main.lua", "--stdout"]);

    assert!(output.status.success(), "{}", stderr(&output));
    assert_eq!(
        stdout(&output),
        "local __luapack_require local __luapack_packages={[1]=function(...)return 42 end}\
         local __luapack_cache={}__luapack_require=function(id)local cached=__luapack_cache[id]\
         if cached~=nil then return cached end local loaded=__luapack_packages[id]()\
         if loaded==nil then loaded=true end __luapack_cache[id]=loaded return loaded end \
         local m=__luapack_require(1)print(m)\n"
    );
    Ok(())
}

#[test]
fn test_no_minify_and_metadata_flags() -> anyhow::Result<()> {
    let project = simple_project()?;
    let output = run_luapack(&project, &["main.lua", "--stdout", "--no-minify", "-m"]);

    assert!(output.status.success(), "{}", stderr(&output));
    let text = stdout(&output);
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some(format!("-- Bundled by luapack {} from main.lua (1 module)", env!("CARGO_PKG_VERSION")).as_str())
    );
    assert_eq!(lines.next(), Some("local __luapack_require"));
    assert!(text.contains("\n    [1] = function(...)\n        return 42\n    end,\n"));
    Ok(())
}

#[test]
fn test_output_file_with_missing_parent() -> anyhow::Result<()> {
    let project = simple_project()?;
    let output = run_luapack(&project, &["main.lua", "-o", "dist/nested/bundle.lua"]);

    assert!(output.status.success(), "{}", stderr(&output));
    let written = fs::read_to_string(project.path("dist/nested/bundle.lua"))?;
    assert!(written.ends_with("print(m)\n"));
    Ok(())
}

#[test]
fn test_project_manifest_output_and_options() -> anyhow::Result<()> {
    let project = Project::new(&[
        (
            "package.json",
            r#"{"name": "demo", "luapack": {"main": "src/main.lua", "output": "build/demo.lua", "metadata": true}}"#,
        ),
        ("src/main.lua", "return require('lib')"),
        ("src/lib.lua", "return {}"),
    ])?;
    let output = run_luapack(&project, &["."]);

    assert!(output.status.success(), "{}", stderr(&output));
    let written = fs::read_to_string(project.path("build/demo.lua"))?;
    assert!(written.starts_with("-- Bundled by luapack "));
    assert!(written.contains(" from main.lua (1 module)\n"));
    Ok(())
}

#[test]
fn test_project_config_file_is_honoured() -> anyhow::Result<()> {
    let project = simple_project()?;
    project.write("luapack.toml", "minify = false\n")?;
    let output = run_luapack(&project, &["main.lua", "--stdout"]);

    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).starts_with("local __luapack_require\nlocal __luapack_packages = {\n"));
    Ok(())
}

#[test]
fn test_explicit_config_flag() -> anyhow::Result<()> {
    let project = simple_project()?;
    project.write("custom.toml", "metadata = true\n")?;
    let output = run_luapack(&project, &["main.lua", "--stdout", "-c", "custom.toml"]);

    assert!(output.status.success(), "{}", stderr(&output));
    assert!(stdout(&output).starts_with("-- Bundled by luapack "));
    Ok(())
}

#[test]
fn test_file_input_requires_an_output() -> anyhow::Result<()> {
    let project = simple_project()?;
    let output = run_luapack(&project, &["main.lua"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("no output path"));
    Ok(())
}

#[test]
fn test_missing_source_fails() -> anyhow::Result<()> {
    let project = simple_project()?;
    let output = run_luapack(&project, &["absent.lua", "--stdout"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("source path does not exist"));
    assert!(stdout(&output).is_empty());
    Ok(())
}

#[test]
fn test_unresolvable_require_fails() -> anyhow::Result<()> {
    let project = Project::new(&[("main.lua", "require('missing')")])?;
    let output = run_luapack(&project, &["main.lua", "--stdout"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("cannot resolve module 'missing'"));
    Ok(())
}

#[test]
fn test_stdout_conflicts_with_output() -> anyhow::Result<()> {
    let project = simple_project()?;
    let output = run_luapack(&project, &["main.lua", "--stdout", "-o", "out.lua"]);

    assert!(!output.status.success());
    assert!(stderr(&output).contains("cannot be used with"));
    Ok(())
}
