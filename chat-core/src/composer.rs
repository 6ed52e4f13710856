/// Draft text behind the message input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Composer {
    draft: String,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn can_submit(&self, disabled: bool) -> bool {
        !disabled && !self.draft.trim().is_empty()
    }

    /// Emits the trimmed draft and clears the field. Returns `None` and keeps
    /// the draft when the input is disabled or blank.
    pub fn submit(&mut self, disabled: bool) -> Option<String> {
        if !self.can_submit(disabled) {
            return None;
        }
        let text = self.draft.trim().to_string();
        self.draft.clear();
        Some(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_trims_and_clears() {
        let mut composer = Composer::new();
        composer.set_draft("  hello there \n");
        assert_eq!(composer.submit(false).as_deref(), Some("hello there"));
        assert_eq!(composer.draft(), "");
    }

    #[test]
    fn blank_draft_is_not_submitted() {
        let mut composer = Composer::new();
        composer.set_draft(" \t ");
        assert!(!composer.can_submit(false));
        assert_eq!(composer.submit(false), None);
        assert_eq!(composer.draft(), " \t ");
    }

    #[test]
    fn disabled_composer_keeps_draft() {
        let mut composer = Composer::new();
        composer.set_draft("wait");
        assert_eq!(composer.submit(true), None);
        assert_eq!(composer.draft(), "wait");
    }
}
