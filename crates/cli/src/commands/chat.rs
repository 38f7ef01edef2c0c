use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use gardenquote_core::config::LoadOptions;
use gardenquote_core::{
    AuditSink, DeterministicEstimator, Estimator, Session, TracingAuditSink,
};
use tracing::info;
use uuid::Uuid;

use crate::commands::{load_runtime, CommandResult};

const PROMPT: &str = "> ";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatEnd {
    /// The conversation reached its final stage.
    Ended,
    /// Input ran out before that.
    InputClosed,
}

pub fn run(options: LoadOptions) -> CommandResult {
    let (config, prices) = match load_runtime("chat", options) {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };
    let estimator = DeterministicEstimator::new(Arc::clone(&prices), config.estimate.clone());
    let session_id = Uuid::new_v4().to_string();
    let mut session = Session::new(
        session_id.clone(),
        &prices,
        estimator,
        config.savings.max_applied_changes,
        TracingAuditSink,
    );

    let stdin = io::stdin();
    let stdout = io::stdout();
    match converse(&mut session, stdin.lock(), stdout.lock()) {
        Ok(end) => {
            info!(
                event_name = "cli.chat.finished",
                session_id = %session_id,
                ended = end == ChatEnd::Ended,
                "chat session finished"
            );
            CommandResult::text(String::new())
        }
        Err(error) => CommandResult::failure("chat", "io", format!("{error:#}"), 1),
    }
}

/// Drives `session` line by line until it ends or `input` is exhausted.
pub fn converse<E, S, R, W>(
    session: &mut Session<E, S>,
    input: R,
    mut output: W,
) -> Result<ChatEnd>
where
    E: Estimator,
    S: AuditSink,
    R: BufRead,
    W: Write,
{
    writeln!(output, "{}", session.greeting()).context("failed to write greeting")?;

    let mut lines = input.lines();
    loop {
        write!(output, "{PROMPT}").context("failed to write prompt")?;
        output.flush().context("failed to flush output")?;

        let Some(line) = lines.next() else {
            writeln!(output).context("failed to write output")?;
            return Ok(ChatEnd::InputClosed);
        };
        let line = line.context("failed to read input")?;

        let reply = session.handle(&line);
        writeln!(output, "{}\n", reply.text()).context("failed to write reply")?;
        if reply.ended {
            return Ok(ChatEnd::Ended);
        }
    }
}
