use std::collections::VecDeque;

pub(crate) const MESSAGE_LOG_LINES: usize = 5;

#[derive(Debug, Clone, Default)]
pub(crate) struct MessageLog {
    lines: VecDeque<String>,
}

impl MessageLog {
    pub(crate) fn push(&mut self, line: impl Into<String>) {
        if self.lines.len() == MESSAGE_LOG_LINES {
            self.lines.pop_front();
        }
        self.lines.push_back(line.into());
    }

    /// Oldest first.
    pub(crate) fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub(crate) fn last(&self) -> Option<&str> {
        self.lines.back().map(String::as_str)
    }
}
