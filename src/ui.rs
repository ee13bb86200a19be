// UI layer: every interaction with the terminal goes through `Prompter`.
// `TerminalPrompter` is the real thing (dialoguer prompts, crossterm
// colors, indicatif spinners); the workflow only ever sees the trait.

use std::fmt;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event};
use crossterm::style::Stylize;
use crossterm::terminal;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, MultiSelect, Select};
use indicatif::{ProgressBar, ProgressStyle};

/// How a status line is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Bold red.
    Error,
    /// Bold yellow.
    Warning,
    /// Bold green.
    Success,
    /// Italic green, for step-by-step progress.
    Progress,
}

impl Tone {
    pub fn paint(self, text: &str) -> String {
        match self {
            Tone::Error => text.bold().red().to_string(),
            Tone::Warning => text.bold().yellow().to_string(),
            Tone::Success => text.bold().green().to_string(),
            Tone::Progress => text.italic().green().to_string(),
        }
    }
}

impl fmt::Display for Tone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Tone::Error => "error",
            Tone::Warning => "warning",
            Tone::Success => "success",
            Tone::Progress => "progress",
        };
        f.write_str(name)
    }
}

/// Terminal interactions needed by the archive workflow.
pub trait Prompter {
    /// Print a styled status line.
    fn say(&self, tone: Tone, text: &str);
    /// Block until the user presses a key.
    fn pause(&self) -> Result<()>;
    /// Indices of the checked items.
    fn multi_select(&self, prompt: &str, items: &[String]) -> Result<Vec<usize>>;
    fn select(&self, prompt: &str, items: &[String], default: usize) -> Result<usize>;
    /// Yes/no question. Implementations must default to "no".
    fn confirm(&self, prompt: &str) -> Result<bool>;
    /// Free text; may be empty.
    fn input(&self, prompt: &str) -> Result<String>;
    /// A running spinner; the caller finishes it.
    fn spinner(&self, message: &str) -> ProgressBar;
}

/// `Prompter` drawing on the real terminal.
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        TerminalPrompter {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Default for TerminalPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TerminalPrompter {
    fn say(&self, tone: Tone, text: &str) {
        println!("{}", tone.paint(text));
    }

    fn pause(&self) -> Result<()> {
        println!("Press any key to continue...");
        terminal::enable_raw_mode()?;
        // Read until the first key event; mouse/resize events are ignored.
        let read = loop {
            match event::read() {
                Ok(Event::Key(_)) => break Ok(()),
                Ok(_) => continue,
                Err(e) => break Err(e),
            }
        };
        terminal::disable_raw_mode()?;
        read?;
        Ok(())
    }

    fn multi_select(&self, prompt: &str, items: &[String]) -> Result<Vec<usize>> {
        // `MultiSelect` toggles with space and confirms with Enter.
        let chosen = MultiSelect::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .interact()?;
        Ok(chosen)
    }

    fn select(&self, prompt: &str, items: &[String], default: usize) -> Result<usize> {
        let chosen = Select::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(items)
            .default(default)
            .interact()?;
        Ok(chosen)
    }

    fn confirm(&self, prompt: &str) -> Result<bool> {
        let yes = Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(false)
            .interact()?;
        Ok(yes)
    }

    fn input(&self, prompt: &str) -> Result<String> {
        let text: String = Input::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()?;
        Ok(text)
    }

    fn spinner(&self, message: &str) -> ProgressBar {
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.green} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paint_keeps_text() {
        for tone in [Tone::Error, Tone::Warning, Tone::Success, Tone::Progress] {
            let painted = tone.paint("Deleted project x");
            assert!(painted.contains("Deleted project x"), "{tone}: {painted}");
        }
    }
}
