use std::io::ErrorKind;
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::CommandRunner;

/// Spawns real child processes, killing them once `timeout` elapses.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    timeout: Duration,
}

impl ProcessRunner {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self::new(Self::DEFAULT_TIMEOUT)
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[&str], stdin: Option<&str>) -> Result<Vec<u8>> {
        debug!(program, ?args, with_stdin = stdin.is_some(), "Running command");

        let mut child = Command::new(program)
            .args(args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start '{program}'"))?;

        let pipe = child.stdin.take();
        let feed = async move {
            if let (Some(input), Some(mut pipe)) = (stdin, pipe) {
                match pipe.write_all(input.as_bytes()).await {
                    Ok(()) => {}
                    // The child exited without reading; its status and stderr tell why.
                    Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                        debug!(program, "Child closed stdin before reading it all");
                    }
                    Err(e) => {
                        return Err(e)
                            .with_context(|| format!("failed to write to '{program}' stdin"));
                    }
                }
                // `pipe` drops here, giving the child EOF
            }
            Ok::<_, anyhow::Error>(())
        };

        // Writing stdin while draining stdout/stderr keeps large values from
        // blocking on full pipes.
        let (fed, output) = tokio::time::timeout(self.timeout, async {
            tokio::join!(feed, child.wait_with_output())
        })
        .await
        .map_err(|_| {
            anyhow::anyhow!(
                "'{program}' timed out after {}s",
                self.timeout.as_secs_f64()
            )
        })?;
        let output = output.with_context(|| format!("failed to wait for '{program}'"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "'{program} {}' failed with {}: {}",
                args.join(" "),
                output.status,
                stderr.trim()
            );
        }
        fed?;

        Ok(output.stdout)
    }
}
