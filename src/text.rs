//! Immutable line-oriented text values.

use serde::{Deserialize, Serialize};

/// An ordered sequence of lines. Lines never contain embedded breaks; the
/// original line terminators are not retained.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TextBlob {
    lines: Vec<String>,
}

impl TextBlob {
    /// Split text into lines on `\n`, tolerating `\r\n`.
    ///
    /// A trailing newline does not produce a phantom empty final line, so
    /// `"a\n"` and `"a"` compare equal. Flat-file content is otherwise taken
    /// verbatim: interior whitespace and case are significant.
    pub fn from_text(text: &str) -> TextBlob {
        let mut lines: Vec<String> = text
            .split('\n')
            .map(|l| l.strip_suffix('\r').unwrap_or(l).to_string())
            .collect();
        if lines.last().is_some_and(|l| l.is_empty()) {
            lines.pop();
        }
        TextBlob { lines }
    }

    pub fn from_lines(lines: Vec<String>) -> TextBlob {
        debug_assert!(lines.iter().all(|l| !l.contains('\n')));
        TextBlob { lines }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl std::fmt::Display for TextBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (idx, line) in self.lines.iter().enumerate() {
            if idx > 0 {
                f.write_str("\n")?;
            }
            f.write_str(line)?;
        }
        Ok(())
    }
}
