//! Operator decisions
//!
//! The orphan workflow asks yes/no questions. The answer source is pluggable:
//! an interactive console, a fixed answer for unattended runs, or a scripted
//! queue for tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::Mutex;

use crate::error::{Error, Result};

/// Source of yes/no answers
#[async_trait]
pub trait DecisionProvider: Send + Sync {
    async fn ask(&self, question: &str) -> Result<bool>;
}

/// Interactive prompt on stdin/stdout
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePrompt;

#[async_trait]
impl DecisionProvider for ConsolePrompt {
    async fn ask(&self, question: &str) -> Result<bool> {
        let question = question.to_string();

        tokio::task::spawn_blocking(move || -> Result<bool> {
            let stdin = io::stdin();
            let mut stdout = io::stdout();

            loop {
                write!(stdout, "{} [y/n] ", question)?;
                stdout.flush()?;

                let mut line = String::new();
                if stdin.lock().read_line(&mut line)? == 0 {
                    return Err(Error::PromptError("stdin closed".to_string()));
                }

                if let Some(answer) = parse_answer(&line) {
                    return Ok(answer);
                }
            }
        })
        .await
        .map_err(|e| Error::PromptError(e.to_string()))?
    }
}

fn parse_answer(line: &str) -> Option<bool> {
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Answers every question the same way
#[derive(Debug, Clone, Copy)]
pub struct StaticDecision(pub bool);

#[async_trait]
impl DecisionProvider for StaticDecision {
    async fn ask(&self, question: &str) -> Result<bool> {
        tracing::info!(question, answer = self.0, "Answered automatically");
        Ok(self.0)
    }
}

/// Answers from a queue, recording every question asked
#[derive(Debug, Default)]
pub struct ScriptedDecisions {
    answers: Mutex<VecDeque<bool>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedDecisions {
    pub fn new<I: IntoIterator<Item = bool>>(answers: I) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Questions asked so far, in order
    pub fn asked(&self) -> Vec<String> {
        self.asked
            .lock()
            .map(|asked| asked.clone())
            .unwrap_or_default()
    }

    /// Answers not consumed yet
    pub fn remaining(&self) -> usize {
        self.answers.lock().map(|a| a.len()).unwrap_or_default()
    }
}

#[async_trait]
impl DecisionProvider for ScriptedDecisions {
    async fn ask(&self, question: &str) -> Result<bool> {
        self.asked
            .lock()
            .map_err(|e| Error::PromptError(e.to_string()))?
            .push(question.to_string());

        self.answers
            .lock()
            .map_err(|e| Error::PromptError(e.to_string()))?
            .pop_front()
            .ok_or_else(|| Error::PromptError(format!("No scripted answer for: {}", question)))
    }
}
