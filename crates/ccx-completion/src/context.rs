// SPDX-License-Identifier: MIT OR Apache-2.0
//! Parsing a shell's completion request (the full command line plus where
//! the cursor sits) into something the specialized completers can act on.

/// One in-flight completion request: the full argv the user has typed so
/// far, and which word the cursor is currently in (the word being
/// completed may be empty, if the cursor sits right after a space).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionContext {
    pub argv: Vec<String>,
    pub cursor_index: usize,
}

impl CompletionContext {
    #[must_use]
    pub fn new(argv: Vec<String>, cursor_index: usize) -> Self {
        CompletionContext { argv, cursor_index }
    }

    /// The word currently being completed.
    #[must_use]
    pub fn current_word(&self) -> &str {
        self.argv.get(self.cursor_index).map_or("", String::as_str)
    }

    /// The word immediately before the one being completed, if any — the
    /// flag name when completing that flag's value (e.g. `--region` when
    /// completing the region code).
    #[must_use]
    pub fn previous_word(&self) -> Option<&str> {
        self.cursor_index
            .checked_sub(1)
            .and_then(|i| self.argv.get(i))
            .map(String::as_str)
    }

    /// The service/operation path: every word before the flags start
    /// (the first word beginning with `-`), e.g. `["ec2",
    /// "describe-instances"]`.
    #[must_use]
    pub fn command_path(&self) -> Vec<&str> {
        self.argv
            .iter()
            .take(self.cursor_index)
            .take_while(|w| !w.starts_with('-'))
            .map(String::as_str)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_and_previous_word_track_cursor() {
        let ctx = CompletionContext::new(
            vec!["ec2".into(), "describe-instances".into(), "--region".into(), "us-".into()],
            3,
        );
        assert_eq!(ctx.current_word(), "us-");
        assert_eq!(ctx.previous_word(), Some("--region"));
        assert_eq!(ctx.command_path(), vec!["ec2", "describe-instances"]);
    }

    #[test]
    fn empty_current_word_when_cursor_past_argv() {
        let ctx = CompletionContext::new(vec!["ec2".into()], 1);
        assert_eq!(ctx.current_word(), "");
    }
}
