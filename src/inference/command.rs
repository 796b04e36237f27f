use anyhow::{anyhow, Context, Result};
use futures::StreamExt;
use std::process::Stdio;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdout, Command};

use super::{render_prompt, FragmentStream, GenerationConfig, HistoryTurn, InferenceEngine};
use crate::config::InferenceConfig;

const READ_CHUNK: usize = 4096;

/// Runs an external program per generation: the rendered prompt goes to stdin,
/// stdout chunks come back as fragments.
///
/// Sampling parameters are exported as `SOLACE_TEMPERATURE`, `SOLACE_MAX_TOKENS`
/// and `SOLACE_TOP_P`. A non-zero exit status ends the stream with an error.
#[derive(Debug, Clone)]
pub struct CommandEngine {
    program: String,
    args: Vec<String>,
}

impl CommandEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// `None` when no command is configured.
    pub fn from_config(config: &InferenceConfig) -> Option<Self> {
        config
            .command
            .as_ref()
            .map(|program| Self::new(program.clone(), config.args.clone()))
    }
}

impl InferenceEngine for CommandEngine {
    fn generate(
        &self,
        history: Vec<HistoryTurn>,
        config: GenerationConfig,
        system_prompt: Option<String>,
    ) -> FragmentStream {
        let prompt = render_prompt(&history, system_prompt.as_deref());

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env("SOLACE_TEMPERATURE", config.temperature.to_string())
            .env("SOLACE_MAX_TOKENS", config.max_tokens.to_string())
            .env("SOLACE_TOP_P", config.top_p.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        tracing::debug!(program = %self.program, prompt_len = prompt.len(), "starting inference command");
        futures::stream::unfold(State::Pending { command, prompt }, step).boxed()
    }
}

enum State {
    Pending { command: Command, prompt: String },
    Reading { child: Child, stdout: ChildStdout, pending: Vec<u8> },
    Done,
}

async fn step(state: State) -> Option<(Result<String>, State)> {
    match state {
        State::Pending { command, prompt } => match spawn(command, prompt).await {
            Ok((child, stdout)) => read_chunk(child, stdout, Vec::new()).await,
            Err(e) => Some((Err(e), State::Done)),
        },
        State::Reading {
            child,
            stdout,
            pending,
        } => read_chunk(child, stdout, pending).await,
        State::Done => None,
    }
}

async fn spawn(mut command: Command, prompt: String) -> Result<(Child, ChildStdout)> {
    let mut child = command.spawn().context("failed to start inference command")?;

    let mut stdin = child.stdin.take().context("inference command has no stdin")?;
    let stdout = child.stdout.take().context("inference command has no stdout")?;

    // The child may write output before it has read the whole prompt, so
    // stdin is fed from its own task while the caller drains stdout.
    tokio::spawn(async move {
        if let Err(e) = stdin.write_all(prompt.as_bytes()).await {
            tracing::warn!(error = %e, "failed to write prompt to inference command");
        }
        // Dropping stdin closes it and signals end of prompt.
    });

    Ok((child, stdout))
}

async fn read_chunk(
    mut child: Child,
    mut stdout: ChildStdout,
    mut pending: Vec<u8>,
) -> Option<(Result<String>, State)> {
    let mut buf = [0u8; READ_CHUNK];
    match stdout.read(&mut buf).await {
        Ok(0) => {
            let status = child.wait().await;
            match status {
                Ok(status) if status.success() => {
                    if pending.is_empty() {
                        None
                    } else {
                        let tail = String::from_utf8_lossy(&pending).into_owned();
                        Some((Ok(tail), State::Done))
                    }
                }
                Ok(status) => Some((
                    Err(anyhow!("inference command exited with {status}")),
                    State::Done,
                )),
                Err(e) => Some((Err(e.into()), State::Done)),
            }
        }
        Ok(n) => {
            pending.extend_from_slice(&buf[..n]);
            let text = take_utf8(&mut pending);
            Some((
                Ok(text),
                State::Reading {
                    child,
                    stdout,
                    pending,
                },
            ))
        }
        Err(e) => Some((
            Err(anyhow::Error::new(e).context("failed to read inference output")),
            State::Done,
        )),
    }
}

/// Split off the longest valid UTF-8 prefix, leaving an incomplete trailing
/// sequence in `pending` for the next chunk.
fn take_utf8(pending: &mut Vec<u8>) -> String {
    let valid = match std::str::from_utf8(pending) {
        Ok(_) => pending.len(),
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        // Genuinely invalid bytes: emit everything lossily rather than stall.
        Err(_) => pending.len(),
    };
    let rest = pending.split_off(valid);
    let text = String::from_utf8_lossy(pending).into_owned();
    *pending = rest;
    text
}
