//! Console I/O: banners, colored output, blocking prompt reads

use std::io::Write;

use async_trait::async_trait;

use crate::{Error, Result};

// ANSI escape codes, same palette as the legacy console helper
const HEADER: &str = "\x1b[95m";
const BLUE: &str = "\x1b[94m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

const RULE: &str = "==============================================";

/// Reads one line of text per call
#[async_trait]
pub trait PromptSource: Send {
    /// Read the next prompt; `None` means end of input (normal session end)
    ///
    /// # Errors
    ///
    /// Returns `Error::Input` if the input source fails
    async fn read_prompt(&mut self) -> Result<Option<String>>;
}

/// Interactive stdin prompt with the framing banners
pub struct StdinPrompt;

#[async_trait]
impl PromptSource for StdinPrompt {
    async fn read_prompt(&mut self) -> Result<Option<String>> {
        println!("\n{HEADER}{BOLD}{RULE}");
        println!("                  USER PROMPT                 ");
        println!("{RULE}{RESET}");
        print!("{BLUE}Enter your prompt: {RESET}");
        std::io::stdout().flush()?;

        let line = tokio::task::spawn_blocking(|| {
            let mut buf = String::new();
            std::io::stdin()
                .read_line(&mut buf)
                .map(|read| (read, buf))
        })
        .await
        .map_err(|e| Error::Input(format!("stdin task failed: {e}")))?
        .map_err(|e| Error::Input(format!("failed to read prompt: {e}")))?;

        println!("{HEADER}{BOLD}{RULE}");
        println!("                END OF USER PROMPT            ");
        println!("{RULE}{RESET}\n");

        let (read, buf) = line;
        if read == 0 {
            // EOF
            return Ok(None);
        }
        Ok(Some(buf.trim_end_matches(['\n', '\r']).to_string()))
    }
}

/// Destination for the assistant's reply text
pub trait ReplySink: Send + Sync {
    /// Show one filtered reply to the user
    fn show(&self, text: &str);
}

/// Writes replies to the terminal inside the standard banner
pub struct ConsoleOutput;

impl ReplySink for ConsoleOutput {
    fn show(&self, text: &str) {
        println!("\n\n{HEADER}{BOLD}{RULE}");
        println!("                  TEXT TO SPEECH                ");
        println!("{RULE}{RESET}\n");
        println!("{text}");
        println!("\n{HEADER}{RULE}");
        println!("                  END OF SPEECH               ");
        println!("{RULE}{RESET}");
    }
}

/// Print the farewell banner
pub fn print_farewell() {
    println!("{HEADER}{RULE}");
    println!("               Thank you for using             ");
    println!("                Our Application!               ");
    println!("                Exiting program...             ");
    println!("{RULE}{RESET}\n");
}
