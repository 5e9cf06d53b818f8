//! Asking the person at the terminal for names.

use bannr_library::{ConflictChoice, NameDecider};
use std::io::{BufRead, BufReader, Stderr, Stdin, Write};
use tokio::runtime::{Handle, RuntimeFlavor};

/// Reads answers line by line from `input`, writing questions to `output`.
pub struct Prompt<R, W> {
    input: R,
    output: W,
}

impl Prompt<BufReader<Stdin>, Stderr> {
    pub fn terminal() -> Self {
        Self::new(BufReader::new(std::io::stdin()), std::io::stderr())
    }
}

impl<R: BufRead, W: Write> Prompt<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    fn ask(&mut self, question: &str) -> Option<String> {
        write!(self.output, "{question}").ok()?;
        self.output.flush().ok()?;
        let mut line = String::new();
        let input = &mut self.input;
        match off_worker(|| input.read_line(&mut line)) {
            Ok(0) | Err(_) => None,
            Ok(_) => Some(line.trim().to_string()),
        }
    }
}

/// Run a blocking read without stalling other tasks on a multi-thread
/// runtime. Elsewhere it runs in place.
fn off_worker<T>(read: impl FnOnce() -> T) -> T {
    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => tokio::task::block_in_place(read),
        _ => read(),
    }
}

impl<R: BufRead + Send, W: Write + Send> NameDecider for Prompt<R, W> {
    fn name_for(&mut self, original: &str) -> Option<String> {
        self.ask(&format!("New name for {original:?} without extension (blank keeps it): "))
            .filter(|answer| !answer.is_empty())
    }

    fn on_conflict(&mut self, _original: &str, candidate: &str) -> ConflictChoice {
        match self.ask(&format!("{candidate:?} already exists. Overwrite it? [y/N] ")).as_deref() {
            Some("y" | "Y" | "yes") => ConflictChoice::Overwrite,
            _ => ConflictChoice::Retry,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn prompt(input: &str) -> Prompt<&[u8], Vec<u8>> {
        Prompt::new(input.as_bytes(), Vec::new())
    }

    #[rstest]
    #[case("Team A\n", Some("Team A"))]
    #[case("  \n", None)]
    #[case("", None)]
    fn test_name_for(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(prompt(input).name_for("x.png").as_deref(), expected);
    }

    #[rstest]
    #[case("y\n", ConflictChoice::Overwrite)]
    #[case("yes\n", ConflictChoice::Overwrite)]
    #[case("n\n", ConflictChoice::Retry)]
    #[case("\n", ConflictChoice::Retry)]
    #[case("", ConflictChoice::Retry)]
    fn test_on_conflict(#[case] input: &str, #[case] expected: ConflictChoice) {
        assert_eq!(prompt(input).on_conflict("x.png", "T.png"), expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_reads_inside_multi_thread_runtime() {
        let mut prompt = prompt("Team B\n");
        let answer = prompt.name_for("x.png");
        tokio::task::yield_now().await;
        assert_eq!(answer.as_deref(), Some("Team B"));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_reads_inside_current_thread_runtime() {
        assert_eq!(prompt("y\n").on_conflict("x.png", "T.png"), ConflictChoice::Overwrite);
    }

    #[test]
    fn test_question_written() {
        let mut prompt = prompt("\n");
        prompt.name_for("x.png");
        assert!(String::from_utf8(prompt.output).unwrap().contains("\"x.png\""));
    }
}
