use std::{future::Future, process::Stdio, time::Instant};

use anyhow::Context;
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, BufReader},
    process::Command,
};
use tracing::{debug, trace, warn};

/// Column template handed to `docker stats --format`.
pub const STATS_FORMAT: &str =
    "{{.ID}}\t{{.Name}}\t{{.CPUPerc}}\t{{.MemUsage}}\t{{.NetIO}}\t{{.BlockIO}}";

/// Produces one snapshot of per-container usage as raw text, one container per line.
pub trait Sampler: Send + Sync {
    fn sample(&self) -> impl Future<Output = anyhow::Result<String>> + Send;
}

/// Runs `docker stats --no-stream` once per sample.
#[derive(Debug, Clone)]
pub struct DockerStats {
    program: String,
}
impl DockerStats {
    pub fn new(program: String) -> Self {
        Self { program }
    }
}
impl Default for DockerStats {
    fn default() -> Self {
        Self::new("docker".into())
    }
}
impl Sampler for DockerStats {
    async fn sample(&self) -> anyhow::Result<String> {
        let started = Instant::now();
        let mut child = Command::new(&self.program)
            .args(["stats", "--no-stream", "--format", STATS_FORMAT])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to spawn `{} stats`", self.program))?;
        let mut stdout = child.stdout.take().context("sampler stdout not captured")?;
        let stderr = child.stderr.take().context("sampler stderr not captured")?;

        let stderr = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                warn!(%line, "sampler stderr");
            }
        });

        let mut output = vec![];
        let mut chunk = [0; 4096];
        loop {
            let n = stdout.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            trace!(chunk = %String::from_utf8_lossy(&chunk[..n]), "sampler stdout");
            output.extend_from_slice(&chunk[..n]);
        }
        let status = child.wait().await?;
        if let Err(e) = stderr.await {
            debug!(error = %e, "sampler stderr reader failed");
        }

        debug!(elapsed = ?started.elapsed(), %status, "sampled container stats");
        if !status.success() {
            anyhow::bail!("`{} stats` exited with {status}", self.program);
        }
        Ok(String::from_utf8_lossy(&output).into_owned())
    }
}

/// Non-blank lines of a sampler's output.
pub fn split_lines(output: &str) -> impl Iterator<Item = &str> {
    output.lines().filter(|line| !line.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_lines_are_dropped() {
        let output = "a\tb\n\n  \nc\td\r\n";
        let lines: Vec<&str> = split_lines(output).collect();
        assert_eq!(lines, vec!["a\tb", "c\td"]);
        assert_eq!(split_lines("").count(), 0);
    }

    #[test]
    fn format_has_six_columns() {
        assert_eq!(STATS_FORMAT.split('\t').count(), 6);
    }

    #[tokio::test]
    async fn missing_program_fails_sample() {
        let sampler = DockerStats::new("stats-publisher-no-such-program".into());
        let error = sampler.sample().await.unwrap_err();
        assert!(error.to_string().contains("failed to spawn"));
    }

    #[tokio::test]
    async fn nonzero_exit_fails_sample() {
        let sampler = DockerStats::new("false".into());
        let error = sampler.sample().await.unwrap_err();
        assert!(error.to_string().contains("exited with"), "{error:#}");
    }
}
