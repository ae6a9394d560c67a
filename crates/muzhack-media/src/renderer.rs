//! External document renderer command builder and runner.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};

/// Default renderer program.
pub const DEFAULT_RENDERER: &str = "pandoc";

/// Maximum number of stderr bytes kept in a render error.
const MAX_STDERR_BYTES: usize = 4096;

/// Builder for renderer invocations (`{program} [args] -o <output> <input>`).
#[derive(Debug, Clone)]
pub struct RenderCommand {
    /// Renderer executable
    program: String,
    /// Document source
    input: PathBuf,
    /// Rendered document
    output: PathBuf,
    /// Extra arguments placed before `-o`
    args: Vec<String>,
    /// Working directory of the child process
    working_dir: Option<PathBuf>,
}

impl RenderCommand {
    /// Create a new render command.
    pub fn new(program: impl Into<String>, input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            program: program.into(),
            input: input.as_ref().to_path_buf(),
            output: output.as_ref().to_path_buf(),
            args: Vec::new(),
            working_dir: None,
        }
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Run the child in `dir` instead of inheriting the process directory.
    pub fn working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = self.args.clone();
        args.push("-o".to_string());
        args.push(self.output.to_string_lossy().to_string());
        args.push(self.input.to_string_lossy().to_string());
        args
    }
}

/// Runner for render commands with an optional timeout.
#[derive(Debug, Clone, Default)]
pub struct RendererRunner {
    timeout_secs: Option<u64>,
}

impl RendererRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Run a render command and verify that it produced its output.
    ///
    /// Returns the wall time spent in the renderer.
    pub async fn run(&self, cmd: &RenderCommand) -> MediaResult<Duration> {
        check_renderer(cmd.program())?;

        let args = cmd.build_args();
        debug!("Running renderer: {} {}", cmd.program(), args.join(" "));

        let mut command = Command::new(cmd.program());
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &cmd.working_dir {
            command.current_dir(dir);
        }

        let started = Instant::now();
        let child = command.spawn()?;

        let output = match self.timeout_secs {
            Some(secs) => {
                match tokio::time::timeout(Duration::from_secs(secs), child.wait_with_output()).await {
                    Ok(result) => result?,
                    Err(_) => {
                        // Dropping the child future kills the process
                        warn!("Renderer timed out after {} seconds, killing process", secs);
                        return Err(MediaError::Timeout(secs));
                    }
                }
            }
            None => child.wait_with_output().await?,
        };
        let elapsed = started.elapsed();

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let stderr = stderr.trim();
            let tail = if stderr.len() > MAX_STDERR_BYTES {
                let mut start = stderr.len() - MAX_STDERR_BYTES;
                while !stderr.is_char_boundary(start) {
                    start += 1;
                }
                &stderr[start..]
            } else {
                stderr
            };
            return Err(MediaError::render_failed(
                format!("{} exited with {}", cmd.program(), output.status),
                (!tail.is_empty()).then(|| tail.to_string()),
                output.status.code(),
            ));
        }

        if !cmd.output().exists() {
            return Err(MediaError::RenderOutputMissing(cmd.output().to_path_buf()));
        }

        info!(
            elapsed_ms = elapsed.as_millis() as u64,
            "Rendered {}",
            cmd.output().display()
        );
        Ok(elapsed)
    }
}

/// Turns an assembled document source into a rendered document.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    /// Render `input` into `output`. Returns the time spent rendering.
    async fn render(&self, input: &Path, output: &Path) -> MediaResult<Duration>;

    /// Whether the renderer can currently be invoked.
    fn is_available(&self) -> bool {
        true
    }
}

/// Renders documents by invoking pandoc (or a compatible program).
#[derive(Debug, Clone)]
pub struct PandocRenderer {
    program: String,
    extra_args: Vec<String>,
    timeout_secs: Option<u64>,
}

impl Default for PandocRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_RENDERER)
    }
}

impl PandocRenderer {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
            timeout_secs: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }
}

#[async_trait]
impl DocumentRenderer for PandocRenderer {
    async fn render(&self, input: &Path, output: &Path) -> MediaResult<Duration> {
        // The child runs inside the input's directory, so relative paths would resolve twice.
        let input = std::path::absolute(input)?;
        let output = std::path::absolute(output)?;

        let mut cmd = RenderCommand::new(&self.program, &input, &output).args(self.extra_args.clone());
        if let Some(dir) = input.parent() {
            cmd = cmd.working_dir(dir);
        }

        let mut runner = RendererRunner::new();
        if let Some(secs) = self.timeout_secs {
            runner = runner.with_timeout(secs);
        }
        runner.run(&cmd).await
    }

    fn is_available(&self) -> bool {
        check_renderer(&self.program).is_ok()
    }
}

/// Check if the renderer program is available.
pub fn check_renderer(program: &str) -> MediaResult<PathBuf> {
    which::which(program).map_err(|_| MediaError::RendererNotFound(program.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_command_builder() {
        let cmd = RenderCommand::new("pandoc", "/w/instructions.md", "/w/instructions.pdf")
            .arg("--pdf-engine=xelatex");

        assert_eq!(
            cmd.build_args(),
            vec![
                "--pdf-engine=xelatex".to_string(),
                "-o".to_string(),
                "/w/instructions.pdf".to_string(),
                "/w/instructions.md".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_program() {
        let cmd = RenderCommand::new("muzhack-no-such-renderer", "in.md", "out.pdf");
        let err = RendererRunner::new().run(&cmd).await.unwrap_err();
        assert!(matches!(err, MediaError::RendererNotFound(_)));
        assert!(err.is_render_error());
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_render_failure() {
        let dir = TempDir::new().unwrap();
        let renderer = PandocRenderer::new("false").with_timeout(10);
        let err = renderer
            .render(&dir.path().join("in.md"), &dir.path().join("out.pdf"))
            .await
            .unwrap_err();

        match err {
            MediaError::RenderFailed { exit_code, .. } => assert_eq!(exit_code, Some(1)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_success_without_output_is_reported() {
        let dir = TempDir::new().unwrap();
        let renderer = PandocRenderer::new("true");
        let err = renderer
            .render(&dir.path().join("in.md"), &dir.path().join("out.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::RenderOutputMissing(_)));
    }
}
