/// Cursor-addressed content of the block currently being edited.
///
/// Stores chars rather than bytes so cursor arithmetic stays unicode-safe.
#[derive(Debug, Clone, PartialEq)]
pub struct EditBuffer {
    pub chars: Vec<char>,
    pub cursor: usize,
}

impl EditBuffer {
    pub fn new(text: &str) -> Self {
        let chars: Vec<char> = text.chars().collect();
        let cursor = chars.len();
        Self { chars, cursor }
    }

    pub fn new_at_start(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            cursor: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn insert_char(&mut self, ch: char) {
        self.chars.insert(self.cursor, ch);
        self.cursor += 1;
    }

    pub fn delete_back(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            self.chars.remove(self.cursor);
        }
    }

    pub fn delete_forward(&mut self) {
        if self.cursor < self.chars.len() {
            self.chars.remove(self.cursor);
        }
    }

    pub fn move_left(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    pub fn move_right(&mut self) {
        if self.cursor < self.chars.len() {
            self.cursor += 1;
        }
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.chars.len();
    }

    pub fn move_up(&mut self) {
        let current_line_start = self.current_line_start();
        if current_line_start == 0 {
            self.cursor = 0;
            return;
        }

        let col = self.cursor - current_line_start;
        let prev_line_end = current_line_start - 1; // the \n before current line
        let prev_line_start = self.chars[..prev_line_end]
            .iter()
            .rposition(|&c| c == '\n')
            .map(|p| p + 1)
            .unwrap_or(0);
        let prev_line_len = prev_line_end - prev_line_start;
        self.cursor = prev_line_start + col.min(prev_line_len);
    }

    pub fn move_down(&mut self) {
        let current_line_start = self.current_line_start();
        let current_line_end = self.current_line_end();
        if current_line_end >= self.chars.len() {
            self.cursor = self.chars.len();
            return;
        }

        let col = self.cursor - current_line_start;
        let next_line_start = current_line_end + 1;
        let next_line_end = self.chars[next_line_start..]
            .iter()
            .position(|&c| c == '\n')
            .map(|p| next_line_start + p)
            .unwrap_or(self.chars.len());
        let next_line_len = next_line_end - next_line_start;
        self.cursor = next_line_start + col.min(next_line_len);
    }

    // --- Line predicates for block-to-block navigation ---
    //
    // Single-line content counts as both the first and the last line.

    pub fn on_first_line(&self) -> bool {
        self.current_line_start() == 0
    }

    pub fn on_last_line(&self) -> bool {
        self.current_line_end() >= self.chars.len()
    }

    pub fn at_line_start(&self) -> bool {
        self.cursor == self.current_line_start()
    }

    pub fn at_line_end(&self) -> bool {
        self.cursor == self.current_line_end()
    }

    fn current_line_start(&self) -> usize {
        self.chars[..self.cursor]
            .iter()
            .rposition(|&c| c == '\n')
            .map(|p| p + 1)
            .unwrap_or(0)
    }

    fn current_line_end(&self) -> usize {
        self.chars[self.cursor..]
            .iter()
            .position(|&c| c == '\n')
            .map(|p| self.cursor + p)
            .unwrap_or(self.chars.len())
    }
}

impl std::fmt::Display for EditBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for ch in &self.chars {
            write!(f, "{}", ch)?;
        }
        Ok(())
    }
}
