use anyhow::{Context, Result, anyhow};
use serde_json::{Value, json};
use std::process::Stdio;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    process::{ChildStdin, ChildStdout, Command},
};
use tool_catalog::domain::revision::LEGACY_PROTOCOL_VERSION;

async fn exchange(
    stdin: &mut ChildStdin,
    stdout: &mut BufReader<ChildStdout>,
    message: Value,
) -> Result<Value> {
    let mut line = serde_json::to_string(&message)?;
    line.push('\n');
    stdin.write_all(line.as_bytes()).await?;
    let mut reply = String::new();
    if stdout.read_line(&mut reply).await? == 0 {
        return Err(anyhow!("server closed stdout"));
    }
    serde_json::from_str(&reply).context("decode server reply")
}

#[tokio::main]
async fn main() -> Result<()> {
    let target_dir = std::env::var("CARGO_TARGET_DIR").unwrap_or_else(|_| "target".into());
    let profile = if cfg!(debug_assertions) {
        "debug"
    } else {
        "release"
    };
    let server_bin = format!("{}/{}/tool-catalog", target_dir, profile);
    let revision = std::env::args()
        .nth(1)
        .unwrap_or_else(|| LEGACY_PROTOCOL_VERSION.to_string());

    let mut child = Command::new(&server_bin)
        .env("RUST_LOG", "trace")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("spawn {server_bin}"))?;
    let mut stdin = child.stdin.take().context("child stdin")?;
    let mut stdout = BufReader::new(child.stdout.take().context("child stdout")?);

    let init = exchange(
        &mut stdin,
        &mut stdout,
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize",
               "params": {"protocolVersion": revision,
                          "clientInfo": {"name": "smoketest", "version": "0"}}}),
    )
    .await?;
    println!(
        "negotiated={}",
        init["result"]["protocolVersion"].as_str().unwrap_or("?")
    );

    let tools = exchange(
        &mut stdin,
        &mut stdout,
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
    )
    .await?;
    let listed = tools["result"]["tools"].as_array().cloned().unwrap_or_default();
    println!(
        "tools_count={} names={:?}",
        listed.len(),
        listed
            .iter()
            .filter_map(|tool| tool["name"].as_str())
            .collect::<Vec<_>>()
    );

    let echo = exchange(
        &mut stdin,
        &mut stdout,
        json!({"jsonrpc": "2.0", "id": 3, "method": "tools/call",
               "params": {"name": "echo", "arguments": {"msg": "smoke"}}}),
    )
    .await?;
    println!("echo={}", echo["result"]["structuredContent"]);

    drop(stdin);
    child.wait().await?;
    Ok(())
}
