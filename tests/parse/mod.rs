// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use anyhow::{bail, Result};
use cfgforge::*;
use serde::{Deserialize, Serialize};
use test_generator::test_resources;

#[derive(Serialize, Deserialize, Debug)]
#[serde(deny_unknown_fields)]
struct TestCase {
    note: String,
    config: String,
    parser: Value,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    want: Option<Value>,
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
    let mut engine = Engine::new();
    let tags: Vec<&str> = case.tags.iter().map(|t| t.as_str()).collect();
    let result = FactDefinition::list_from_value(&case.parser)
        .and_then(|definitions| engine.parse(&definitions, &case.config, &tags));

    match (result, &case.error) {
        (Ok(facts), None) => {
            if let Some(want) = &case.want {
                if &facts != want {
                    bail!("facts mismatch\nleft  = {facts}\nright = {want}");
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
        (Ok(facts), Some(e)) => bail!("expected error `{e}`, got {facts}"),
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

#[test_resources("tests/parse/**/*.yaml")]
fn run(path: &str) {
    yaml_test(path).unwrap()
}
