use nuoca_core::{Category, EntryPoint, PluginCandidate, PluginSpawner, ProcessSpawner};
use nuoca_protocol::{ChannelError, PluginConfig, Request};
use std::path::PathBuf;
use std::time::{Duration, Instant};

fn executable(name: &str, path: impl Into<PathBuf>) -> PluginCandidate {
    PluginCandidate {
        name: name.to_string(),
        category: Category::Input,
        entry: EntryPoint::Executable(path.into()),
    }
}

#[cfg(unix)]
fn script(name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let dir = std::env::temp_dir().join(format!("nuoca-host-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

#[tokio::test]
async fn test_spawn_missing_executable_fails() {
    let spawner = ProcessSpawner::new("unused");
    let result = spawner.spawn(&executable("ghost", "/nonexistent/nuoca/ghost"));
    assert!(result.is_err());
}

#[cfg(unix)]
#[tokio::test]
async fn test_echoing_plugin_is_missing_status() {
    // cat echoes the request frame back; it decodes as a response without a status
    let spawner = ProcessSpawner::new("unused");
    let (mut process, mut channel) = spawner.spawn(&executable("echo", "/bin/cat")).unwrap();
    assert!(process.is_alive());

    let resp = channel
        .round_trip(
            Request::Startup {
                config: PluginConfig::new(),
            },
            Duration::from_secs(5),
        )
        .await
        .unwrap();
    assert!(!resp.is_success());
    assert_eq!(
        resp.failure_reason().as_deref(),
        Some("response is missing status_code")
    );

    process.terminate().await.unwrap();
    assert!(!process.is_alive());
}

#[cfg(unix)]
#[tokio::test]
async fn test_silent_plugin_times_out_and_is_killed() {
    let path = script("silent", "exec sleep 30");
    let spawner = ProcessSpawner::new("unused");
    let (mut process, mut channel) = spawner.spawn(&executable("silent", path)).unwrap();

    let started = Instant::now();
    let err = channel
        .round_trip(Request::Shutdown, Duration::from_millis(200))
        .await
        .unwrap_err();
    assert!(matches!(err, ChannelError::Timeout(_)));
    assert!(started.elapsed() < Duration::from_secs(5));

    process.terminate().await.unwrap();
    assert!(!process.is_alive());
    // terminating twice is harmless
    process.terminate().await.unwrap();
}
