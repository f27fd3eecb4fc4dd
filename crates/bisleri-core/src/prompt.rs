//! Interactive input, abstracted so flows can run headless.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::PromptError;

/// The narrow terminal capability the order and login flows need.
///
/// Implementations wait indefinitely for an answer. Callers that need a
/// bounded wait (the reauthentication consent window) race the future
/// against their own timer and drop it on expiry.
#[allow(async_fn_in_trait)]
pub trait Prompter {
    /// Asks for one line of input and returns it trimmed. May be empty.
    async fn ask(&self, label: &str) -> Result<String, PromptError>;

    /// Asks a yes/no question.
    async fn confirm(&self, question: &str) -> Result<bool, PromptError>;

    /// Shows an informational line (menus, hints).
    fn notify(&self, message: &str);
}

/// 1-based menu index parsing: `"2"` with `max = 3` yields `Some(1)`.
#[must_use]
pub fn parse_index(value: &str, max: usize) -> Option<usize> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let n: usize = value.parse().ok()?;
    (1..=max).contains(&n).then(|| n - 1)
}

/// Lists `options` as a numbered menu and asks until a valid index is given.
///
/// # Errors
///
/// Propagates any [`PromptError`] from the underlying prompter.
pub async fn choose<P: Prompter>(
    prompter: &P,
    header: &str,
    options: &[String],
) -> Result<usize, PromptError> {
    prompter.notify(header);
    for (i, option) in options.iter().enumerate() {
        prompter.notify(&format!("  {}) {option}", i + 1));
    }
    let label = format!("Choose [1-{}]", options.len());
    loop {
        let answer = prompter.ask(&label).await?;
        if let Some(index) = parse_index(&answer, options.len()) {
            return Ok(index);
        }
    }
}

/// A [`Prompter`] that replays canned answers, for tests and unattended runs.
///
/// A `None` confirmation never resolves, which simulates an operator who
/// does not respond.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<String>>,
    confirmations: Mutex<VecDeque<Option<bool>>>,
    asked: Mutex<Vec<String>>,
    notices: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_answers<I, S>(self, answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        lock(&self.answers).extend(answers.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_confirmations<I>(self, confirmations: I) -> Self
    where
        I: IntoIterator<Item = Option<bool>>,
    {
        lock(&self.confirmations).extend(confirmations);
        self
    }

    /// Every label and question seen so far, in order.
    pub fn asked(&self) -> Vec<String> {
        lock(&self.asked).clone()
    }

    pub fn notices(&self) -> Vec<String> {
        lock(&self.notices).clone()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

impl Prompter for ScriptedPrompter {
    async fn ask(&self, label: &str) -> Result<String, PromptError> {
        lock(&self.asked).push(label.to_string());
        let next = lock(&self.answers).pop_front();
        next.map(|a| a.trim().to_string())
            .ok_or_else(|| PromptError::Exhausted(label.to_string()))
    }

    async fn confirm(&self, question: &str) -> Result<bool, PromptError> {
        lock(&self.asked).push(question.to_string());
        let next = lock(&self.confirmations).pop_front();
        match next {
            Some(Some(answer)) => Ok(answer),
            Some(None) => std::future::pending().await,
            None => Err(PromptError::Exhausted(question.to_string())),
        }
    }

    fn notify(&self, message: &str) {
        lock(&self.notices).push(message.to_string());
    }
}
