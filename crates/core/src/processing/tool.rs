//! External tool invocation with output capture, tee and timeout.

use std::collections::VecDeque;
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, info};

use super::ProcessingError;

const STDERR_TAIL: usize = 20;

/// A single tool run.
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<OsString>,
    timeout_secs: u64,
    log_file: Option<PathBuf>,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout_secs,
            log_file: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    /// Copy every output line to `path` and log it at info level.
    pub fn log_to(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    fn tool_name(&self) -> String {
        self.program
            .file_name()
            .unwrap_or(self.program.as_os_str())
            .to_string_lossy()
            .into_owned()
    }

    /// Run to completion. Returns captured stdout.
    pub async fn run(self) -> Result<String, ProcessingError> {
        let tool = self.tool_name();
        debug!(tool = %tool, args = ?self.args, "Running tool");

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ProcessingError::ToolNotFound {
                        path: self.program.clone(),
                    }
                } else {
                    ProcessingError::Io(e)
                }
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ProcessingError::InvalidOutput("stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ProcessingError::InvalidOutput("stderr not captured".to_string()))?;

        let mut log = match &self.log_file {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    tokio::fs::create_dir_all(parent).await?;
                }
                Some(File::create(path).await?)
            }
            None => None,
        };
        let echo = log.is_some();

        let result = timeout(Duration::from_secs(self.timeout_secs), async {
            let mut out_lines = BufReader::new(stdout).lines();
            let mut err_lines = BufReader::new(stderr).lines();
            let mut captured = String::new();
            let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL);
            let (mut out_done, mut err_done) = (false, false);

            while !(out_done && err_done) {
                tokio::select! {
                    line = out_lines.next_line(), if !out_done => match line? {
                        Some(line) => {
                            tee(&tool, &mut log, &line, echo).await?;
                            captured.push_str(&line);
                            captured.push('\n');
                        }
                        None => out_done = true,
                    },
                    line = err_lines.next_line(), if !err_done => match line? {
                        Some(line) => {
                            tee(&tool, &mut log, &line, echo).await?;
                            if tail.len() == STDERR_TAIL {
                                tail.pop_front();
                            }
                            tail.push_back(line);
                        }
                        None => err_done = true,
                    },
                }
            }

            if let Some(file) = log.as_mut() {
                file.flush().await?;
            }
            let status = child.wait().await?;
            Ok::<_, std::io::Error>((status, captured, tail))
        })
        .await;

        match result {
            Ok(Ok((status, captured, tail))) => {
                if status.success() {
                    Ok(captured)
                } else {
                    let stderr = (!tail.is_empty()).then(|| Vec::from(tail).join("\n"));
                    Err(ProcessingError::tool_failed(tool, status.code(), stderr))
                }
            }
            Ok(Err(e)) => Err(ProcessingError::Io(e)),
            Err(_) => {
                let _ = child.kill().await;
                Err(ProcessingError::Timeout {
                    tool,
                    timeout_secs: self.timeout_secs,
                })
            }
        }
    }
}

async fn tee(tool: &str, log: &mut Option<File>, line: &str, echo: bool) -> std::io::Result<()> {
    if echo {
        info!(tool, "{}", line);
    } else {
        debug!(tool, "{}", line);
    }
    if let Some(file) = log.as_mut() {
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
    }
    Ok(())
}

/// Verify a tool can be spawned at all.
pub async fn probe_tool(program: &Path) -> Result<(), ProcessingError> {
    match Command::new(program)
        .arg("--version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await
    {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ProcessingError::ToolNotFound {
            path: program.to_path_buf(),
        }),
        Err(e) => Err(ProcessingError::Io(e)),
    }
}
