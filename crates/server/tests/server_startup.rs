use std::io::Write;
use std::net::TcpListener;
use std::time::Duration;

use reqwest::Client;
use tempfile::{NamedTempFile, TempDir};
use tokio::time::{sleep, timeout};

/// Find an available port
fn get_available_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// A definitions directory with one site
fn definitions_dir() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("demo.toml"),
        r#"
id = "demo"
name = "Demo"
urls = ["https://tracker.example/"]

[search.requestConfig]
url = "/torrents.php"
"#,
    )
    .unwrap();
    dir
}

fn config(port: u16, definitions: &std::path::Path, site: &str) -> String {
    format!(
        r#"
[server]
host = "127.0.0.1"
port = {}

[registry]
definitions = "{}"

[[sites]]
id = "{}"

[sites.user_input]
passkey = "secret-passkey"
"#,
        port,
        definitions.display(),
        site
    )
}

fn write_config(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    temp_file.write_all(content.as_bytes()).unwrap();
    temp_file.flush().unwrap();
    temp_file
}

/// Spawn the server and return a handle
async fn spawn_server(config_path: &std::path::Path) -> tokio::process::Child {
    tokio::process::Command::new(env!("CARGO_BIN_EXE_trackhub"))
        .env("TRACKHUB_CONFIG", config_path)
        .env("RUST_LOG", "error") // Quiet logs during tests
        .kill_on_drop(true)
        .spawn()
        .expect("Failed to spawn server")
}

/// Wait for server to be ready
async fn wait_for_server(port: u16, max_attempts: u32) -> bool {
    let client = Client::new();
    for _ in 0..max_attempts {
        if client
            .get(format!("http://127.0.0.1:{}/api/v1/health", port))
            .send()
            .await
            .is_ok()
        {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
async fn test_server_serves_configured_sites() {
    let port = get_available_port();
    let definitions = definitions_dir();
    let temp_file = write_config(&config(port, definitions.path(), "demo"));

    let mut server = spawn_server(temp_file.path()).await;
    assert!(
        wait_for_server(port, 100).await,
        "Server did not start in time"
    );

    let client = Client::new();
    let health: serde_json::Value = client
        .get(format!("http://127.0.0.1:{}/api/v1/health", port))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(health["status"], "ok");
    assert_eq!(health["sites"], 1);

    let config: serde_json::Value = client
        .get(format!("http://127.0.0.1:{}/api/v1/config", port))
        .send()
        .await
        .expect("Failed to send request")
        .json()
        .await
        .expect("Failed to parse JSON");
    assert_eq!(config["server"]["port"], port);
    assert!(!config.to_string().contains("secret-passkey"));

    // Cleanup
    server.kill().await.ok();
}

#[tokio::test]
async fn test_missing_config_file_exits_with_error() {
    let result = timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_trackhub"))
            .env("TRACKHUB_CONFIG", "/nonexistent/config.toml")
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Server did not exit in time")
    .expect("Failed to run server");

    assert!(!result.status.success());
}

#[tokio::test]
async fn test_site_without_definition_exits_with_error() {
    let port = get_available_port();
    let definitions = definitions_dir();
    let temp_file = write_config(&config(port, definitions.path(), "unknown"));

    let result = timeout(
        Duration::from_secs(5),
        tokio::process::Command::new(env!("CARGO_BIN_EXE_trackhub"))
            .env("TRACKHUB_CONFIG", temp_file.path())
            .env("RUST_LOG", "error")
            .output(),
    )
    .await
    .expect("Server did not exit in time")
    .expect("Failed to run server");

    assert!(!result.status.success());
}
