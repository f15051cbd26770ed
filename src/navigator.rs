//! Cursor over a loaded block sequence.

/// Where the navigator stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    /// No block sequence is loaded.
    Idle,
    /// Showing block `i` (zero based).
    Viewing(usize),
    /// Every block has been consumed; the cursor sits one past the end.
    Exhausted,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum NavError {
    #[error("no valid text blocks found")]
    NoBlocks,
    #[error("no file is loaded")]
    NotLoaded,
    #[error("already at the first block")]
    AlreadyFirst,
    #[error("already at the last block")]
    AlreadyLast,
    #[error("block {requested} is out of range, valid blocks are 1-{len}")]
    OutOfRange { requested: usize, len: usize },
}

/// Block sequence plus cursor, with `0 <= cursor <= len`.
#[derive(Debug, Clone, Default)]
pub struct Navigator {
    blocks: Vec<String>,
    cursor: usize,
}

impl Navigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the sequence and move to the first block.
    ///
    /// An empty sequence leaves the navigator idle and returns `NoBlocks`.
    pub fn load(&mut self, blocks: Vec<String>) -> Result<NavState, NavError> {
        if blocks.is_empty() {
            self.reset();
            return Err(NavError::NoBlocks);
        }
        log::debug!("navigator loaded {} blocks", blocks.len());
        self.blocks = blocks;
        self.cursor = 0;
        Ok(self.state())
    }

    pub fn state(&self) -> NavState {
        if self.blocks.is_empty() {
            NavState::Idle
        } else if self.cursor >= self.blocks.len() {
            NavState::Exhausted
        } else {
            NavState::Viewing(self.cursor)
        }
    }

    pub fn is_active(&self) -> bool {
        !self.blocks.is_empty()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn blocks(&self) -> &[String] {
        &self.blocks
    }

    /// The block under the cursor, if any.
    pub fn current(&self) -> Option<(usize, &str)> {
        self.blocks
            .get(self.cursor)
            .map(|b| (self.cursor, b.as_str()))
    }

    /// Move past the current block, possibly into `Exhausted`.
    pub fn advance(&mut self) -> Result<NavState, NavError> {
        match self.state() {
            NavState::Idle => Err(NavError::NotLoaded),
            NavState::Exhausted => Ok(NavState::Exhausted),
            NavState::Viewing(i) => {
                self.cursor = i + 1;
                Ok(self.state())
            }
        }
    }

    /// Move to the next block without ever leaving the sequence.
    pub fn step_forward(&mut self) -> Result<NavState, NavError> {
        match self.state() {
            NavState::Idle => Err(NavError::NotLoaded),
            NavState::Viewing(i) if i + 1 < self.blocks.len() => {
                self.cursor = i + 1;
                Ok(self.state())
            }
            _ => Err(NavError::AlreadyLast),
        }
    }

    /// Move to the previous block.
    pub fn back(&mut self) -> Result<NavState, NavError> {
        match self.state() {
            NavState::Idle => Err(NavError::NotLoaded),
            NavState::Viewing(0) => Err(NavError::AlreadyFirst),
            NavState::Viewing(i) => {
                self.cursor = i - 1;
                Ok(self.state())
            }
            NavState::Exhausted => {
                self.cursor = self.blocks.len() - 1;
                Ok(self.state())
            }
        }
    }

    /// Jump to block `n`, counted from 1.
    pub fn goto(&mut self, n: usize) -> Result<NavState, NavError> {
        if self.blocks.is_empty() {
            return Err(NavError::NotLoaded);
        }
        if n == 0 || n > self.blocks.len() {
            return Err(NavError::OutOfRange {
                requested: n,
                len: self.blocks.len(),
            });
        }
        self.cursor = n - 1;
        Ok(self.state())
    }

    /// Drop the sequence and return to idle.
    pub fn reset(&mut self) {
        self.blocks.clear();
        self.cursor = 0;
    }

    /// Short preview of block `index`.
    pub fn summary(&self, index: usize) -> Option<String> {
        self.blocks.get(index).map(|b| summarize(b, SUMMARY_CHARS))
    }
}

const SUMMARY_CHARS: usize = 50;

fn summarize(text: &str, max_chars: usize) -> String {
    let mut chars = text.char_indices();
    match chars.nth(max_chars) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
