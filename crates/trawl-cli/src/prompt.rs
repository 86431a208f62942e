//! Terminal prompt for manual scroll mode.

use async_trait::async_trait;
use tracing::warn;
use trawl_collector::ScrollPrompt;

/// Asks the operator on stdin before each capture.
///
/// An empty line continues; `done` (or end of input) finishes the run.
pub struct StdinPrompt;

#[async_trait]
impl ScrollPrompt for StdinPrompt {
    async fn confirm(&mut self, round: u32, collected: usize) -> bool {
        println!(
            "[round {round}] {collected} records so far. Scroll the page in the browser, \
             then press Enter to capture (type 'done' to finish):"
        );

        let input = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|read| (read, line))
        })
        .await;

        match input {
            Ok(Ok((0, _))) => false,
            Ok(Ok((_, line))) => !is_done(&line),
            Ok(Err(e)) => {
                warn!(error = %e, "failed to read operator input");
                false
            }
            Err(e) => {
                warn!(error = %e, "operator input task failed");
                false
            }
        }
    }
}

fn is_done(input: &str) -> bool {
    matches!(
        input.trim().to_lowercase().as_str(),
        "done" | "q" | "quit" | "exit"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_done_words() {
        assert!(is_done("done\n"));
        assert!(is_done("  DONE "));
        assert!(is_done("q"));
    }

    #[test]
    fn test_enter_continues() {
        assert!(!is_done("\n"));
        assert!(!is_done(""));
        assert!(!is_done("more"));
    }
}
