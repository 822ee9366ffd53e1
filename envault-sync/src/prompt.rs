//! Interactive yes/no decisions.

/// Asks the user a yes/no question.
///
/// Implementations block the calling flow until an answer is given. An
/// unanswerable prompt (no terminal, read error) counts as "no".
pub trait Prompter {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Prompter for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

/// Ask `prompt` unless `force` is set, in which case the answer is yes.
pub(crate) fn confirm_unless_forced(prompter: &dyn Prompter, force: bool, prompt: &str) -> bool {
    force || prompter.confirm(prompt)
}
