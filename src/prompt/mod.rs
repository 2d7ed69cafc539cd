// ABOUTME: Operator input provider used for interactive decisions in the pipeline.
// ABOUTME: Terminal, non-interactive, and scripted implementations.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};

use crate::types::SecretValue;

/// Source of operator answers.
pub trait OperatorInput: Send + Sync {
    /// Ask a free-form question. An empty answer yields `default`.
    fn ask(&self, question: &str, default: Option<&str>) -> Option<String>;

    /// Ask a yes/no question.
    fn confirm(&self, question: &str, default: bool) -> bool;

    /// Ask for a sensitive value without echoing it. Empty input yields None.
    fn secret(&self, question: &str) -> Option<SecretValue>;
}

fn non_empty(answer: String, default: Option<&str>) -> Option<String> {
    let answer = answer.trim();
    if answer.is_empty() {
        default.map(str::to_string)
    } else {
        Some(answer.to_string())
    }
}

/// Reads answers from the terminal. Questions go to stderr.
#[derive(Debug, Default)]
pub struct TerminalInput;

impl TerminalInput {
    fn read_line(prompt: &str) -> String {
        eprint!("{prompt}");
        let _ = io::stderr().flush();

        let mut line = String::new();
        if let Err(e) = io::stdin().lock().read_line(&mut line) {
            tracing::debug!("failed to read operator input: {}", e);
        }
        line
    }
}

impl OperatorInput for TerminalInput {
    fn ask(&self, question: &str, default: Option<&str>) -> Option<String> {
        let prompt = match default {
            Some(d) => format!("{question} [{d}]: "),
            None => format!("{question}: "),
        };
        non_empty(Self::read_line(&prompt), default)
    }

    fn confirm(&self, question: &str, default: bool) -> bool {
        let hint = if default { "Y/n" } else { "y/N" };
        let answer = Self::read_line(&format!("{question} [{hint}]: "));
        match answer.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => true,
            "n" | "no" => false,
            _ => default,
        }
    }

    fn secret(&self, question: &str) -> Option<SecretValue> {
        match rpassword::prompt_password(format!("{question}: ")) {
            Ok(value) if !value.is_empty() => Some(SecretValue::new(value)),
            Ok(_) => None,
            Err(e) => {
                tracing::debug!("failed to read secret input: {}", e);
                None
            }
        }
    }
}

/// Takes every default; never supplies a secret. For CI runs.
#[derive(Debug, Default)]
pub struct NonInteractive;

impl OperatorInput for NonInteractive {
    fn ask(&self, question: &str, default: Option<&str>) -> Option<String> {
        tracing::debug!(question, ?default, "non-interactive: using default");
        default.map(str::to_string)
    }

    fn confirm(&self, question: &str, default: bool) -> bool {
        tracing::debug!(question, default, "non-interactive: using default");
        default
    }

    fn secret(&self, _question: &str) -> Option<SecretValue> {
        None
    }
}

/// A pre-recorded operator answer.
#[derive(Debug, Clone)]
pub enum Answer {
    Text(String),
    /// Press enter: take the default.
    Empty,
    Yes,
    No,
    Secret(String),
}

/// Replays answers in order, falling back to defaults when exhausted.
/// Records every question asked.
#[derive(Debug, Default)]
pub struct ScriptedInput {
    answers: Mutex<VecDeque<Answer>>,
    questions: Mutex<Vec<String>>,
}

impl ScriptedInput {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            questions: Mutex::new(Vec::new()),
        }
    }

    /// Questions asked so far, in order.
    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().clone()
    }

    fn next(&self, question: &str) -> Option<Answer> {
        self.questions.lock().push(question.to_string());
        self.answers.lock().pop_front()
    }
}

impl OperatorInput for ScriptedInput {
    fn ask(&self, question: &str, default: Option<&str>) -> Option<String> {
        match self.next(question) {
            Some(Answer::Text(text)) | Some(Answer::Secret(text)) => non_empty(text, default),
            _ => default.map(str::to_string),
        }
    }

    fn confirm(&self, question: &str, default: bool) -> bool {
        match self.next(question) {
            Some(Answer::Yes) => true,
            Some(Answer::No) => false,
            _ => default,
        }
    }

    fn secret(&self, question: &str) -> Option<SecretValue> {
        match self.next(question) {
            Some(Answer::Secret(value)) | Some(Answer::Text(value)) if !value.is_empty() => {
                Some(SecretValue::new(value))
            }
            _ => None,
        }
    }
}
