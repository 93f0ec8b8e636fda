//! Operator console: stdin commands in, session events out.
//!
//! Debug output goes to stdout exactly as received; logs go to stderr.

use std::io::{BufRead, Write};

use ccmirror_client::SessionEvent;
use ccmirror_core::DebugOutcome;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Forward stdin lines to the session.
///
/// Runs on a plain thread: a blocked terminal read must not keep the
/// runtime alive after the session ends.
pub fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("stdin read failed: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

/// Print session events until the session drops its sender.
pub fn spawn_printer(mut events: mpsc::UnboundedReceiver<SessionEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let mut out = std::io::stdout().lock();
            if let Err(e) = out
                .write_all(render(&event).as_bytes())
                .and_then(|()| out.flush())
            {
                tracing::warn!("stdout write failed: {}", e);
            }
        }
    })
}

/// Terminal text for an event. Debug output is passed through untouched.
pub fn render(event: &SessionEvent) -> String {
    match event {
        SessionEvent::DebugOutput(text) => text.clone(),
        SessionEvent::DebugStarted { target } => format!("[DEBUG] started {}\n", target),
        SessionEvent::DebugStopped { target, outcome } => match outcome {
            DebugOutcome::Completed => format!("[DEBUG] {} finished\n", target),
            DebugOutcome::Failed(Some(reason)) => {
                format!("[DEBUG] {} stopped: {}\n", target, reason)
            }
            DebugOutcome::Failed(None) => format!("[DEBUG] {} failed\n", target),
        },
        SessionEvent::DebugRejected(error) => format!("[DEBUG] {}\n", error),
        SessionEvent::UnknownCommand(text) => {
            format!("unknown command {:?}; use `d <target>` or `dc`\n", text)
        }
    }
}
