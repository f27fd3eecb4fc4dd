//! Stdin/stdout implementation of the prompt capability.
//!
//! Lines are read on a plain thread and handed over through a channel. An
//! abandoned prompt (consent window or run deadline) then leaves nothing on
//! the runtime's blocking pool, so shutdown does not wait for Enter.

use std::io::{BufRead, Write as _};

use bisleri_core::{PromptError, Prompter};
use tokio::sync::{mpsc, Mutex};

pub(crate) struct TerminalPrompter {
    lines: Mutex<mpsc::Receiver<std::io::Result<String>>>,
}

impl TerminalPrompter {
    pub(crate) fn new() -> Self {
        Self::from_reader(std::io::BufReader::new(std::io::stdin()))
    }

    fn from_reader<R: BufRead + Send + 'static>(reader: R) -> Self {
        let (tx, rx) = mpsc::channel(1);
        std::thread::spawn(move || {
            for line in reader.lines() {
                let failed = line.is_err();
                if tx.blocking_send(line).is_err() || failed {
                    break;
                }
            }
        });
        Self {
            lines: Mutex::new(rx),
        }
    }

    async fn read_line(&self, label: &str) -> Result<String, PromptError> {
        print!("{label}: ");
        std::io::stdout().flush()?;
        let mut lines = self.lines.lock().await;
        match lines.recv().await {
            Some(line) => Ok(line?.trim().to_string()),
            None => Err(PromptError::Closed),
        }
    }
}

impl Prompter for TerminalPrompter {
    async fn ask(&self, label: &str) -> Result<String, PromptError> {
        self.read_line(label).await
    }

    async fn confirm(&self, question: &str) -> Result<bool, PromptError> {
        let answer = self.read_line(&format!("{question} [y/N]")).await?;
        Ok(is_yes(&answer))
    }

    fn notify(&self, message: &str) {
        println!("{message}");
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};
    use std::sync::mpsc as std_mpsc;
    use std::time::{Duration, Instant};

    use bisleri_checkout::{ask_consent, Consent};
    use bisleri_client::Deadline;

    use super::*;

    /// A terminal nobody types into: reads block until the sender drops.
    struct SilentTerminal(std_mpsc::Receiver<Vec<u8>>);

    impl Read for SilentTerminal {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.0.recv() {
                Ok(bytes) => {
                    let n = bytes.len().min(buf.len());
                    buf[..n].copy_from_slice(&bytes[..n]);
                    Ok(n)
                }
                Err(_) => Ok(0),
            }
        }
    }

    #[test]
    fn only_explicit_yes_confirms() {
        assert!(is_yes("y"));
        assert!(is_yes(" YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("yep"));
    }

    #[tokio::test]
    async fn lines_are_trimmed_then_input_closes() {
        let prompter = TerminalPrompter::from_reader(Cursor::new("  9876543210 \ny\n"));
        assert_eq!(prompter.ask("Phone").await.unwrap(), "9876543210");
        assert!(prompter.confirm("Continue?").await.unwrap());
        assert!(matches!(prompter.ask("Again").await, Err(PromptError::Closed)));
    }

    #[test]
    fn unanswered_consent_does_not_hold_runtime_shutdown() {
        let (_keep_open, rx) = std_mpsc::channel::<Vec<u8>>();
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();

        let consent = runtime.block_on(async {
            let prompter =
                TerminalPrompter::from_reader(std::io::BufReader::new(SilentTerminal(rx)));
            ask_consent(&prompter, Duration::from_millis(50), &Deadline::unbounded()).await
        });
        assert_eq!(consent.unwrap(), Consent::TimedOut);

        let started = Instant::now();
        drop(runtime);
        assert!(
            started.elapsed() < Duration::from_secs(2),
            "runtime shutdown took {:?}",
            started.elapsed()
        );
    }
}
