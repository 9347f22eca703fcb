//! Character cursor over pass-1 source text.

/// Saved cursor state for backtracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ScanPos {
    pub pos: usize,
    pub line: u32,
    pub line_start: usize,
}

pub(crate) struct Scanner<'c> {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    line_start: usize,
    line_comments: &'c [String],
}

impl<'c> Scanner<'c> {
    pub fn new(src: &str, line_comments: &'c [String]) -> Self {
        Scanner {
            chars: src.chars().collect(),
            pos: 0,
            line: 1,
            line_start: 0,
            line_comments,
        }
    }

    pub fn save(&self) -> ScanPos {
        ScanPos {
            pos: self.pos,
            line: self.line,
            line_start: self.line_start,
        }
    }

    pub fn restore(&mut self, at: ScanPos) {
        self.pos = at.pos;
        self.line = at.line;
        self.line_start = at.line_start;
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    /// 1-based column of the cursor.
    pub fn column(&self) -> u32 {
        (self.pos - self.line_start + 1) as u32
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.chars.len()
    }

    pub fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn starts_with_at(&self, at: usize, text: &str) -> bool {
        let mut i = at;
        for c in text.chars() {
            if self.chars.get(i) != Some(&c) {
                return false;
            }
            i += 1;
        }
        true
    }

    /// Advances over `n` characters, keeping line bookkeeping current.
    pub fn advance(&mut self, n: usize) {
        for _ in 0..n {
            match self.chars.get(self.pos) {
                Some('\n') => {
                    self.pos += 1;
                    self.line += 1;
                    self.line_start = self.pos;
                }
                Some(_) => self.pos += 1,
                None => break,
            }
        }
    }

    fn skip_eol(&mut self) {
        while let Some(c) = self.peek() {
            if c == '\n' {
                self.advance(1);
                break;
            }
            self.pos += 1;
        }
    }

    fn skip_comments(&mut self) -> bool {
        let is_comment = self
            .line_comments
            .iter()
            .any(|m| !m.is_empty() && self.starts_with_at(self.pos, m));
        if is_comment {
            self.skip_eol();
        }
        is_comment
    }

    fn skip_whitespace(&mut self) -> bool {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if !c.is_whitespace() {
                break;
            }
            self.advance(1);
        }
        self.pos != start
    }

    /// Skips whitespace, line ends and comments. Returns false at end of
    /// source.
    pub fn position_to_next_symbol(&mut self) -> bool {
        loop {
            let moved = self.skip_whitespace();
            let commented = self.skip_comments();
            if !moved && !commented {
                break;
            }
        }
        !self.at_end()
    }

    /// Skips the run of non-whitespace characters at the cursor, used to
    /// resynchronize after a failed root rule.
    pub fn skip_symbol(&mut self) {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                break;
            }
            self.advance(1);
        }
        if self.pos == start {
            self.advance(1);
        }
    }

    /// Text from the cursor to the next whitespace, for diagnostics.
    pub fn current_symbol_text(&self) -> String {
        self.chars[self.pos.min(self.chars.len())..]
            .iter()
            .take_while(|c| !c.is_whitespace())
            .take(32)
            .collect()
    }

    /// Up to `limit` characters of remaining text from the cursor.
    pub fn rest(&self, limit: usize) -> String {
        self.chars[self.pos.min(self.chars.len())..]
            .iter()
            .take(limit)
            .collect()
    }

    /// Length in chars of `symbol` if it appears literally at the cursor.
    pub fn is_symbol(&self, symbol: &str) -> Option<usize> {
        if !symbol.is_empty() && self.starts_with_at(self.pos, symbol) {
            Some(symbol.chars().count())
        } else {
            None
        }
    }

    /// Scans a floating point literal at the cursor:
    /// `[+-]? digits [. digits] [(e|E) [+-]? digits]`, or `[+-]? . digits`.
    /// Returns the value and the number of characters it spans.
    pub fn is_float_value(&self) -> Option<(f32, usize)> {
        let mut i = self.pos;
        let at = |i: usize| self.chars.get(i).copied();
        if matches!(at(i), Some('+') | Some('-')) {
            i += 1;
        }
        let int_start = i;
        while at(i).is_some_and(|c| c.is_ascii_digit()) {
            i += 1;
        }
        let mut digits = i - int_start;
        if at(i) == Some('.') {
            let frac_start = i + 1;
            let mut j = frac_start;
            while at(j).is_some_and(|c| c.is_ascii_digit()) {
                j += 1;
            }
            if j > frac_start || digits > 0 {
                digits += j - frac_start;
                i = j;
            }
        }
        if digits == 0 {
            return None;
        }
        if matches!(at(i), Some('e') | Some('E')) {
            let mut j = i + 1;
            if matches!(at(j), Some('+') | Some('-')) {
                j += 1;
            }
            let exp_start = j;
            while at(j).is_some_and(|c| c.is_ascii_digit()) {
                j += 1;
            }
            if j > exp_start {
                i = j;
            }
        }
        let text: String = self.chars[self.pos..i].iter().collect();
        text.parse::<f32>().ok().map(|v| (v, i - self.pos))
    }
}
