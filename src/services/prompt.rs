use dialoguer::{Confirm as ConfirmPrompt, Select};

/// Answer to a "proceed? (y/n/f)" question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Answer {
    Yes,
    No,
    /// Apply the asset's own name instead of the proposed match.
    Force,
}

const ANSWER_OPTIONS: [&str; 3] = ["yes", "no", "force (use own name)"];

/// Human decision points. Every prompt in the pipeline goes through here so
/// the policy can be driven by scripted answers.
pub trait Confirm {
    fn ask(&self, prompt: &str, default_yes: bool) -> bool;

    /// Index into `options` of the chosen entry.
    fn choose(&self, prompt: &str, options: &[&str], default: usize) -> usize;

    fn answer(&self, prompt: &str) -> Answer {
        match self.choose(prompt, &ANSWER_OPTIONS, 0) {
            0 => Answer::Yes,
            2 => Answer::Force,
            _ => Answer::No,
        }
    }
}

/// Terminal prompts. An interrupted or non-interactive prompt counts as a
/// decline.
pub struct TerminalConfirm;

impl TerminalConfirm {
    pub fn new() -> Self {
        Self
    }
}

impl Default for TerminalConfirm {
    fn default() -> Self {
        Self::new()
    }
}

impl Confirm for TerminalConfirm {
    fn ask(&self, prompt: &str, default_yes: bool) -> bool {
        ConfirmPrompt::new()
            .with_prompt(prompt)
            .default(default_yes)
            .interact()
            .unwrap_or_else(|e| {
                log::warn!("Prompt failed ({e}); treating as no");
                false
            })
    }

    fn choose(&self, prompt: &str, options: &[&str], default: usize) -> usize {
        Select::new()
            .with_prompt(prompt)
            .items(options)
            .default(default)
            .interact()
            .unwrap_or_else(|e| {
                log::warn!("Prompt failed ({e}); treating as no");
                // past the end: never a valid choice
                options.len()
            })
    }
}
