use anyhow::Context as _;
use std::path::Path;
use std::process::{Child, Command};

pub use unrelated_test_support::{KillOnDrop, MockServer, pick_unused_port, wait_http_ok};

/// Start the server binary on the HTTP transport.
pub fn spawn_server(config_path: &Path, port: u16, extra_args: &[&str]) -> anyhow::Result<Child> {
    let bin = env!("CARGO_BIN_EXE_unrelated-deploy-mcp");
    Command::new(bin)
        .arg("--config")
        .arg(config_path)
        .arg("--transport")
        .arg("http")
        .arg("--bind")
        .arg(format!("127.0.0.1:{port}"))
        .arg("--log-level")
        .arg("info")
        .args(extra_args)
        .env_remove("RUST_LOG")
        .spawn()
        .context("spawn deploy server")
}
