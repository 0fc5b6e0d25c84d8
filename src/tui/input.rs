//! Input field handling for the terminal user interface.

/// A single-line text input. `cursor` counts characters, not bytes.
#[derive(Clone, Debug, Default)]
pub struct InputField {
    pub value: String,
    pub cursor: usize,
}

impl InputField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an input field with initial text value.
    pub fn with_value(value: &str) -> Self {
        Self {
            value: value.to_string(),
            cursor: value.chars().count(),
        }
    }

    fn byte_index(&self, cursor: usize) -> usize {
        self.value
            .char_indices()
            .nth(cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    /// Insert a character at the current cursor position.
    pub fn handle_char(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    /// Delete the character before the cursor.
    pub fn handle_backspace(&mut self) {
        if self.cursor > 0 {
            let at = self.byte_index(self.cursor - 1);
            self.value.remove(at);
            self.cursor -= 1;
        }
    }

    /// Delete the character at the cursor position.
    pub fn handle_delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let at = self.byte_index(self.cursor);
            self.value.remove(at);
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor < self.value.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn edits_at_the_cursor() {
        let mut field = InputField::with_value("Pars");
        field.move_cursor_left();
        field.handle_char('i');
        assert_eq!(field.value, "Paris");
        field.handle_backspace();
        field.handle_backspace();
        assert_eq!(field.value, "Pas");
        field.handle_delete();
        assert_eq!(field.value, "Pa");
        field.move_cursor_right();
        field.move_cursor_right();
        assert_eq!(field.cursor, 2);
    }

    #[rstest]
    fn handles_multibyte_text() {
        let mut field = InputField::with_value("Zürich");
        assert_eq!(field.cursor, 6);
        for _ in 0..4 {
            field.move_cursor_left();
        }
        field.handle_backspace();
        assert_eq!(field.value, "Zrich");
        field.handle_char('ü');
        assert_eq!(field.value, "Zürich");
        field.clear();
        assert!(field.value.is_empty());
        assert_eq!(field.cursor, 0);
    }
}
