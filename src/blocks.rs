//! Splitting text into speakable blocks.
//!
//! A block is a run of non-blank lines. Any line that is empty or holds only
//! whitespace ends the current block; runs of such lines collapse into one
//! boundary.

/// Split `text` into trimmed, non-empty blocks in source order.
pub fn split_blocks(text: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.trim().is_empty() {
            flush_block(&mut blocks, &mut current);
        } else {
            current.push(line);
        }
    }
    flush_block(&mut blocks, &mut current);

    blocks
}

fn flush_block(blocks: &mut Vec<String>, current: &mut Vec<&str>) {
    if current.is_empty() {
        return;
    }
    let joined = current.join("\n");
    let trimmed = joined.trim();
    if !trimmed.is_empty() {
        blocks.push(trimmed.to_string());
    }
    current.clear();
}

/// An ordered block sequence assembled from one or more sources.
///
/// Each source is split on its own and appended; sources are never re-split
/// together, so a block never spans two files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockSequence {
    blocks: Vec<String>,
}

impl BlockSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split `text` and append its blocks. Returns how many blocks it added.
    pub fn extend_from_text(&mut self, text: &str) -> usize {
        let added = split_blocks(text);
        let count = added.len();
        self.blocks.extend(added);
        count
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn as_slice(&self) -> &[String] {
        &self.blocks
    }

    pub fn into_vec(self) -> Vec<String> {
        self.blocks
    }
}
