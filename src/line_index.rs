// Copyright 2018-2024 the Deno authors. MIT license.

use crate::graph::Position;

/// Lazily maps 1-based line numbers to the byte offset of the first
/// character of that line.
///
/// The index only ever grows. Lines are terminated by `\n`, so a `\r\n`
/// pair ends its line at the `\n`, which is how the parser numbers lines.
pub struct LineOffsetIndex<'a> {
  text: &'a str,
  starts: Vec<usize>,
  scanned: usize,
}

impl<'a> LineOffsetIndex<'a> {
  pub fn new(text: &'a str) -> Self {
    Self {
      text,
      starts: vec![0],
      scanned: 0,
    }
  }

  /// Gets the byte offset of the start of the 1-based `line`.
  ///
  /// A line past the end of the text resolves to the start of the last
  /// line found.
  pub fn offset_of_line(&mut self, line: usize) -> usize {
    let index = line.saturating_sub(1);
    while self.starts.len() <= index && self.scanned < self.text.len() {
      match self.text[self.scanned..].find('\n') {
        Some(found) => {
          let next_start = self.scanned + found + 1;
          self.starts.push(next_start);
          self.scanned = next_start;
        }
        None => self.scanned = self.text.len(),
      }
    }
    match self.starts.get(index) {
      Some(offset) => *offset,
      None => self.starts[self.starts.len() - 1],
    }
  }

  /// Resolves a 0-indexed line and byte column to an absolute byte offset.
  pub fn offset_of(&mut self, position: &Position) -> usize {
    let line_start = self.offset_of_line(position.line + 1);
    (line_start + position.character).min(self.text.len())
  }

  /// Number of line starts found so far.
  pub fn indexed_lines(&self) -> usize {
    self.starts.len()
  }
}
