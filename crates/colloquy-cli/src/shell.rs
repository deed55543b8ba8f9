use anyhow::Result;
use colloquy_llm::{ChatBackend, ChatError, Fragment, Role, Session, Transcript};
use console::style;
use std::io::{BufRead, Write};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::history::HistoryStore;

/// One line of user input, interpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    Clear,
    History,
    Empty,
    Prompt(String),
}

impl Command {
    pub fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        let lowered = trimmed.to_lowercase();

        if lowered == "exit" || lowered == "quit" {
            Command::Exit
        } else if trimmed.starts_with("/clear") {
            Command::Clear
        } else if trimmed.starts_with("/history") {
            Command::History
        } else if trimmed.is_empty() {
            Command::Empty
        } else {
            Command::Prompt(trimmed.to_string())
        }
    }
}

fn role_label(role: Role) -> String {
    match role {
        Role::User => style("You:").blue().bold().to_string(),
        Role::Assistant => style("Assistant:").green().bold().to_string(),
        Role::System => style("System:").yellow().bold().to_string(),
    }
}

/// Printable view of the conversation for `/history`
pub fn render_history(transcript: &Transcript) -> String {
    let mut out = format!("\n{}\n", style("=== Conversation History ===").cyan());
    if transcript.is_empty() {
        out.push_str("(empty)\n");
    }
    for turn in transcript.turns() {
        out.push_str(&format!("{}\n{}\n\n", role_label(turn.role()), turn.content()));
    }
    out
}

/// Read lines on a dedicated thread and hand them over a channel
///
/// A blocking read cannot be cancelled. Keeping it off the runtime's
/// blocking pool lets the runtime shut down while the read is still pending.
pub fn spawn_line_reader<R>(reader: R) -> mpsc::Receiver<std::io::Result<String>>
where
    R: BufRead + Send + 'static,
{
    let (tx, rx) = mpsc::channel(1);
    std::thread::spawn(move || {
        for line in reader.lines() {
            if tx.blocking_send(line).is_err() {
                break;
            }
        }
    });
    rx
}

/// Interactive read-send-print loop around a [`Session`]
pub struct Shell<B> {
    session: Session<B>,
    history: Option<HistoryStore>,
    system_prompt: Option<String>,
}

impl<B: ChatBackend> Shell<B> {
    pub fn new(session: Session<B>) -> Self {
        Self {
            session,
            history: None,
            system_prompt: None,
        }
    }

    pub fn with_history(mut self, history: HistoryStore) -> Self {
        self.history = Some(history);
        self
    }

    /// System prompt re-seeded after every `/clear`
    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt;
        self
    }

    pub fn session(&self) -> &Session<B> {
        &self.session
    }

    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();

        let mut lines = spawn_line_reader(std::io::BufReader::new(std::io::stdin()));

        loop {
            print!("{} ", role_label(Role::User));
            std::io::stdout().flush()?;

            let line = tokio::select! {
                line = lines.recv() => line.transpose()?,
                _ = tokio::signal::ctrl_c() => None,
            };
            // EOF (Ctrl+D) or Ctrl+C at the prompt
            let Some(line) = line else { break };

            match Command::parse(&line) {
                Command::Exit => break,
                Command::Empty => continue,
                Command::Clear => {
                    self.clear();
                    println!("{}", style("Conversation cleared.").yellow());
                }
                Command::History => print!("{}", render_history(self.session.transcript())),
                Command::Prompt(text) => self.exchange(text).await,
            }
        }

        println!("\nThank you for using Colloquy!");
        Ok(())
    }

    fn print_banner(&self) {
        println!("{}", style("Colloquy").cyan().bold());
        println!("Using model: {}", self.session.options().model);
        println!("Type 'exit', 'quit', or press Ctrl+D to exit.");
        println!("Type '/clear' to clear conversation history.");
        println!("Type '/history' to show conversation history.");
        println!("Press Ctrl+C while a reply streams to cancel it.");
        println!();
    }

    fn clear(&mut self) {
        let transcript = self.session.transcript_mut();
        transcript.clear();
        if let Some(prompt) = &self.system_prompt {
            transcript.set_system_prompt(prompt.clone());
        }
        self.persist();
    }

    async fn exchange(&mut self, text: String) {
        let cancel = CancellationToken::new();
        let watcher = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    cancel.cancel();
                }
            })
        };

        print!("\n{} ", role_label(Role::Assistant));
        let _ = std::io::stdout().flush();

        let result = self
            .session
            .send_prompt_with_cancel(text, &cancel, |fragment: &Fragment| {
                print!("{}", fragment);
                let _ = std::io::stdout().flush();
            })
            .await;
        watcher.abort();
        println!("\n");

        match result {
            Ok(_) => self.persist(),
            Err(ChatError::Cancelled) => {
                println!("{}", style("Reply cancelled; nothing was saved.").yellow());
            }
            Err(e) => eprintln!("{}", style(format!("Error: {}", e)).red()),
        }
    }

    fn persist(&self) {
        if let Some(history) = &self.history {
            if let Err(e) = history.save(self.session.transcript()) {
                eprintln!("{}", style(format!("Error: {:#}", e)).red());
            }
        }
    }
}
