//! Runs the built-in plugins as real `nuoca plugin` processes.

use nuoca::plugins::builtin_catalog;
use nuoca_config::PluginSpec;
use nuoca_core::{PluginDiscovery, ProcessSpawner};
use nuoca_logger::Logger;
use nuoca_protocol::{PluginConfig, Record, Value};
use nuoca_runtime::{Agent, AgentSettings};
use serde_json::json;
use std::path::PathBuf;
use std::process::Command;
use std::sync::Arc;
use std::time::Duration;

const NUOCA: &str = env!("CARGO_BIN_EXE_nuoca");

fn scratch_dir(test: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("nuoca-{test}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn read_records(path: &PathBuf) -> Vec<Record> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn plugin_config(value: serde_json::Value) -> PluginConfig {
    match value {
        serde_json::Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_static_to_json_lines_over_processes() {
    let dir = scratch_dir("agent");
    let out = dir.join("records.jsonl");

    let mut settings = AgentSettings::default();
    settings.collection_interval = 1;
    settings.selftest_loop_count = 2;
    settings.plugin_pipe_timeout = Duration::from_secs(5);
    settings.reap_poll_interval = Duration::from_millis(50);
    settings
        .output_values
        .insert("env".into(), Value::String("ci".into()));
    settings.input_plugins = vec![PluginSpec::with_config(
        "Static",
        plugin_config(json!({"collected_values": [{"x": 1, "host": "db-1"}]})),
    )];
    settings.output_plugins = vec![PluginSpec::with_config(
        "JsonLines",
        plugin_config(json!({"path": out.display().to_string()})),
    )];

    let sources: Vec<Box<dyn PluginDiscovery + Send + Sync>> = vec![Box::new(builtin_catalog())];
    let mut agent = Agent::new(
        settings.self_test(),
        Arc::new(ProcessSpawner::new(NUOCA).with_log_level("warn")),
        sources,
        Logger::new(),
    );

    let report = agent.start().await.unwrap();
    assert_eq!(report.started.len(), 2);
    assert!(report.failed.is_empty());

    let cycles = agent.run_until(std::future::pending()).await.unwrap();
    assert_eq!(cycles, 2);

    let reaped = agent.shutdown().await;
    assert!(reaped.stuck.is_empty());
    assert!(agent.registry().is_empty());

    let records = read_records(&out);
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].timestamp - records[0].timestamp, 1000);
    for record in &records {
        assert_eq!(record.collection_interval, 1);
        assert_eq!(record.get("Static.x"), Some(&Value::Integer(1)));
        assert_eq!(
            record.get("Static.host"),
            Some(&Value::String("db-1".into()))
        );
        assert_eq!(record.get("env"), Some(&Value::String("ci".into())));
    }

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_self_test_run_from_config_file() {
    let dir = scratch_dir("selftest");
    let out = dir.join("records.jsonl");
    let config = dir.join("nuoca.yml");
    std::fs::write(
        &config,
        format!(
            r#"
SELFTEST_LOOP_COUNT: 2
OUTPUT_VALUES:
  region: eu
INPUT_PLUGINS:
  - Static:
      collected_values:
        - nuocaCollectionName: Disk
          used: 0.5
OUTPUT_PLUGINS:
  - JsonLines:
      path: "{}"
"#,
            out.display()
        ),
    )
    .unwrap();

    let output = Command::new(NUOCA)
        .arg("--config-file")
        .arg(&config)
        .args(["--collection-interval", "1", "--self-test", "--log-level", "warn"])
        .env_remove("NUOCA_LOG")
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "nuoca failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let records = read_records(&out);
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].get("Disk.used"), Some(&Value::Float(0.5)));
    assert_eq!(records[0].get("region"), Some(&Value::String("eu".into())));
    assert!(records[0].get("Disk.nuocaCollectionName").is_none());

    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn test_config_file_required() {
    let output = Command::new(NUOCA)
        .env_remove("NUOCA_CONFIG_FILE")
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("You must provide a NuoCA Config file"));
}

#[test]
fn test_unknown_builtin_plugin() {
    let output = Command::new(NUOCA)
        .args(["plugin", "--category", "input", "--name", "Nope"])
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no built-in input plugin named 'Nope'"));
}
