//! Line-indexed model of an env file.
//!
//! Each line keeps its original text. A line is tagged with whatever precedes
//! its first `=`, so a key matches only lines starting with `KEY=` verbatim (no
//! leading whitespace, no `export`). Only tagged lines are ever rewritten.
//! Everything else round-trips byte for byte.

#[derive(Debug, Clone, PartialEq, Eq)]
struct EnvLine {
    text: String,
    key: Option<String>,
}

impl EnvLine {
    fn new(text: String) -> Self {
        let key = text
            .split_once('=')
            .map(|(key, _)| key)
            .filter(|key| !key.is_empty())
            .map(str::to_string);
        Self { text, key }
    }
}

/// An env file as an ordered list of lines.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnvDocument {
    lines: Vec<EnvLine>,
    trailing_newline: bool,
}

impl EnvDocument {
    pub fn parse(content: &str) -> Self {
        if content.is_empty() {
            return Self::default();
        }

        let mut raw: Vec<&str> = content.split('\n').collect();
        let trailing_newline = content.ends_with('\n');
        if trailing_newline {
            raw.pop();
        }

        Self {
            lines: raw
                .into_iter()
                .map(|line| EnvLine::new(line.to_string()))
                .collect(),
            trailing_newline,
        }
    }

    /// A fresh document with one empty `KEY=` line per key.
    pub fn with_empty_keys<'a>(keys: impl IntoIterator<Item = &'a str>) -> Self {
        let mut doc = Self::default();
        for key in keys {
            doc.push(format!("{key}="));
        }
        doc
    }

    /// Number of lines tagged with `key`.
    pub fn count_key(&self, key: &str) -> usize {
        self.lines
            .iter()
            .filter(|line| line.key.as_deref() == Some(key))
            .count()
    }

    /// Raw text after `key=` on the last line tagged with `key`.
    pub fn raw_value(&self, key: &str) -> Option<&str> {
        self.lines
            .iter()
            .rev()
            .find(|line| line.key.as_deref() == Some(key))
            .and_then(|line| line.text.split_once('='))
            .map(|(_, value)| value.strip_suffix('\r').unwrap_or(value))
    }

    /// Rewrite every line tagged with `key` to `key=value`, or append one line
    /// when none exists. Returns the number of rewritten lines (0 = appended).
    ///
    /// When several lines carry the same key they are all rewritten.
    pub fn set(&mut self, key: &str, value: &str) -> usize {
        let mut rewritten = 0;
        for line in self
            .lines
            .iter_mut()
            .filter(|line| line.key.as_deref() == Some(key))
        {
            let cr = if line.text.ends_with('\r') { "\r" } else { "" };
            line.text = format!("{key}={value}{cr}");
            rewritten += 1;
        }

        if rewritten == 0 {
            self.push(format!("{key}={value}"));
        }
        rewritten
    }

    pub fn render(&self) -> String {
        let mut out = self
            .lines
            .iter()
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        if self.trailing_newline {
            out.push('\n');
        }
        out
    }

    fn push(&mut self, text: String) {
        self.lines.push(EnvLine::new(text));
        self.trailing_newline = true;
    }
}
