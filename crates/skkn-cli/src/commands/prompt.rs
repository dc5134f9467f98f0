//! Line-based questions on stdin.

use anyhow::{Result, bail};
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Prints `question` and returns the trimmed answer.
pub async fn ask(question: &str) -> Result<String> {
    print!("{question} ");
    std::io::stdout().flush()?;

    let mut line = String::new();
    let read = BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    if read == 0 {
        bail!("stdin closed");
    }
    Ok(line.trim().to_string())
}

/// Yes/no question where an empty answer means yes.
pub async fn confirm(question: &str) -> Result<bool> {
    let answer = ask(&format!("{question} [Y/n]")).await?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(
        answer.to_lowercase().as_str(),
        "" | "y" | "yes" | "c" | "có" | "co"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes(""));
        assert!(is_yes("Y"));
        assert!(is_yes("có"));
        assert!(!is_yes("n"));
        assert!(!is_yes("không"));
    }
}
