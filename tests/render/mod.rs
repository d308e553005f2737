// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::path::PathBuf;

use anyhow::{bail, Result};
use cfgforge::*;
use serde::{Deserialize, Serialize};
use test_generator::test_resources;

#[derive(Serialize, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct TestCase {
    note: String,
    #[serde(default)]
    vars: Option<Value>,
    template: Value,
    /// Extra template files, by name, available to `include`.
    #[serde(default)]
    files: Option<Value>,
    #[serde(default)]
    settings: Option<Settings>,
    #[serde(default)]
    want_lines: Option<Vec<String>>,
    #[serde(default)]
    want_warnings: Option<Vec<String>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
struct YamlTest {
    cases: Vec<TestCase>,
}

fn run_case(case: &TestCase) -> Result<()> {
    let dir = tempfile::tempdir()?;
    if let Some(files) = &case.files {
        for (name, contents) in files.as_object()?.iter() {
            let path = dir.path().join(&**name);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, serde_yaml::to_string(contents)?)?;
        }
    }

    let mut settings = case.settings.clone().unwrap_or_default();
    settings.search_paths = vec![PathBuf::from(dir.path())];
    let mut engine = Engine::with_settings(settings);
    if let Some(vars) = &case.vars {
        engine.add_variables(vars.clone())?;
    }

    let result = Directive::list_from_value(&case.template).and_then(|directives| {
        let env = engine.env()?;
        engine.render(&directives, &env)
    });

    match (result, &case.error) {
        (Ok(rendered), None) => {
            if let Some(want) = &case.want_lines {
                if &rendered.lines != want {
                    bail!("lines mismatch\nleft  = {:?}\nright = {:?}", rendered.lines, want);
                }
                if rendered.text != want.join("\n") {
                    bail!("text does not match lines: {:?}", rendered.text);
                }
            }
            if let Some(want) = &case.want_warnings {
                let warnings: Vec<String> = engine
                    .diagnostics()
                    .iter()
                    .filter(|d| d.level == Level::Warning)
                    .map(|d| d.message.clone())
                    .collect();
                if &warnings != want {
                    bail!("warnings mismatch\nleft  = {warnings:?}\nright = {want:?}");
                }
            }
        }
        (Ok(rendered), Some(e)) => bail!("expected error `{e}`, got {:?}", rendered.lines),
        (Err(actual), Some(e)) => {
            let actual = actual.to_string();
            if !actual.contains(e.as_str()) {
                bail!("expected error containing `{e}`, got `{actual}`");
            }
        }
        (Err(e), None) => return Err(e),
    }
    Ok(())
}

fn yaml_test_impl(file: &str) -> Result<()> {
    println!("\nrunning {file}");

    let yaml_str = std::fs::read_to_string(file)?;
    let test: YamlTest = serde_yaml::from_str(&yaml_str)?;

    for case in &test.cases {
        print!("\ncase {} ", case.note);
        if let Err(e) = run_case(case) {
            bail!("case `{}` failed: {e}", case.note);
        }
        println!("passed");
    }
    Ok(())
}

fn yaml_test(file: &str) -> Result<()> {
    match yaml_test_impl(file) {
        Ok(_) => Ok(()),
        Err(e) => {
            // If Err is returned, it doesn't always get printed by cargo test.
            // Therefore, panic with the error.
            panic!("{}", e);
        }
    }
}

#[test_resources("tests/render/**/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}
