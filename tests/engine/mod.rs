// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use cfgforge::*;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, contents).unwrap();
    path
}

fn engine_in(dir: &Path) -> Engine {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut engine = Engine::new();
    engine.set_search_paths(vec![dir.to_path_buf()]);
    engine
}

#[test]
fn render_file_records_included_files() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let base = write(
        dir.path(),
        "templates/base.yaml",
        "- lines: hostname {{ hostname }}\n- include: ntp.yaml\n",
    );
    let ntp = write(
        dir.path(),
        "templates/ntp.yaml",
        "- lines: ntp server {{ item }}\n  loop: ntp_servers\n",
    );

    let mut engine = engine_in(dir.path());
    engine.add_variables(Value::from_yaml_str(
        "hostname: leaf1\nntp_servers: [10.0.0.1]\n",
    )?)?;

    let rendered = engine.render_file("base.yaml")?;
    assert_eq!(rendered.lines, vec!["hostname leaf1", "ntp server 10.0.0.1"]);
    assert_eq!(rendered.text, "hostname leaf1\nntp server 10.0.0.1");
    assert_eq!(rendered.included_files, vec![base.clone(), ntp.clone()]);

    let infos: Vec<&str> = engine
        .diagnostics()
        .iter()
        .filter(|d| d.level == Level::Info)
        .map(|d| d.message.as_str())
        .collect();
    assert_eq!(
        infos,
        vec![
            format!("including file {}", base.display()),
            format!("including file {}", ntp.display())
        ]
    );

    let json = serde_json::to_value(&rendered)?;
    assert_eq!(json["lines"][1], "ntp server 10.0.0.1");
    Ok(())
}

#[test]
fn private_variables_override_host_facts() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write(dir.path(), "hostname.yaml", "- lines: hostname {{ hostname }}\n");
    let facts = write(dir.path(), "facts.json", r#"{"hostname": "from-facts", "site": "lab"}"#);

    let mut engine = engine_in(dir.path());
    engine.add_variables_from_file(&facts)?;
    engine.add_variables(Value::from_yaml_str("hostname: private")?)?;

    assert_eq!(engine.render_file("hostname.yaml")?.lines, vec!["hostname private"]);
    assert_eq!(engine.variables()["site"], Value::from("lab"));

    assert!(engine.add_variables(Value::from("not a map")).is_err());
    Ok(())
}

#[test]
fn render_directory_concatenates_in_name_order() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let src = dir.path().join("site");
    write(&src, "20-interfaces.yaml", "- lines: interface Ethernet1\n");
    write(&src, "10-system.yaml", "- lines: hostname leaf1\n");
    write(&src, "99-draft.yaml", "- lines: draft\n");
    write(&src, "README.md", "not a template\n");

    let mut engine = engine_in(dir.path());
    let rendered = engine.render_directory(
        &src,
        &Value::from(r"\.yaml$"),
        &Value::from("draft"),
    )?;
    assert_eq!(rendered.lines, vec!["hostname leaf1", "interface Ethernet1"]);
    assert_eq!(
        rendered.included_files,
        vec![src.join("10-system.yaml"), src.join("20-interfaces.yaml")]
    );

    let warnings: Vec<&Diagnostic> = engine
        .diagnostics()
        .iter()
        .filter(|d| d.level == Level::Warning)
        .collect();
    assert_eq!(warnings.len(), 2);
    Ok(())
}

#[test]
fn render_directory_rejects_files() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let file = write(dir.path(), "base.yaml", "- lines: x\n");
    let mut engine = engine_in(dir.path());
    let err = engine
        .render_directory(&file, &Value::Null, &Value::Null)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RenderError>(),
        Some(RenderError::InvalidSourceDir { .. })
    ));
    Ok(())
}

#[test]
fn parse_file_from_parsers_dir() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write(
        dir.path(),
        "parsers/system.yaml",
        r#"
- name: hostname
  tags: [system]
  matches:
    - pattern: 'hostname (\S+)'
      match_var: hostname
  facts:
    hostname: "{{ hostname[0] }}"
- name: vlans
  tags: [vlans]
  matches:
    - pattern: 'vlan (\d+)'
      match_all: true
      match_var: vlans
  facts:
    vlans: "{{ vlans }}"
"#,
    );

    let mut engine = engine_in(dir.path());
    let config = "hostname leaf1\nvlan 10\nvlan 20\n";

    let facts = engine.parse_file("system.yaml", config, &[])?;
    assert_eq!(
        facts,
        Value::from_json_str(r#"{"hostname": "leaf1", "vlans": ["10", "20"]}"#)?
    );

    let facts = engine.parse_file("system.yaml", config, &["vlans"])?;
    assert_eq!(facts, Value::from_json_str(r#"{"vlans": ["10", "20"]}"#)?);

    let err = engine.parse_file("missing.yaml", config, &[]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "unable to find 'missing.yaml' in expected paths for parsers"
    );
    Ok(())
}

#[test]
fn engine_usable_after_failure() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write(
        dir.path(),
        "strict.yaml",
        "- name: banner\n  lines: banner {{ banner }}\n  required: true\n",
    );

    let mut engine = engine_in(dir.path());
    let err = engine.render_file("strict.yaml").unwrap_err();
    assert_eq!(
        err.downcast_ref::<RenderError>(),
        Some(&RenderError::MissingRequiredValue {
            name: "banner".to_string()
        })
    );

    engine.add_variables(Value::from_yaml_str("banner: welcome")?)?;
    assert_eq!(engine.render_file("strict.yaml")?.text, "banner welcome");
    Ok(())
}

#[test]
fn settings_setters() -> Result<()> {
    let mut engine = Engine::new();
    assert!(engine.set_default_missing_key("sometimes").is_err());
    engine.set_default_missing_key("fail")?;
    engine.set_default_join_delimiter(",");

    let directives = Directive::list_from_value(&Value::from_yaml_str(
        "- lines: [a, b]\n  join: true\n- lines: \"{{ x }}\"\n",
    )?)?;
    let err = engine.render(&directives, &Env::new()).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<RenderError>(),
        Some(RenderError::UndefinedReference { .. })
    ));

    let env = Env::new().bind("x", Value::from("c"));
    assert_eq!(engine.render(&directives, &env)?.lines, vec!["a,b", "c"]);

    engine.set_action_warnings(false);
    let skipped = Directive::list_from_value(&Value::from_yaml_str(
        "- lines: x\n  loop: nothing\n",
    )?)?;
    engine.take_diagnostics();
    assert!(engine.render(&skipped, &Env::new())?.lines.is_empty());
    assert!(engine.diagnostics().is_empty());
    Ok(())
}
