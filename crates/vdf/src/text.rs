//! Lookups over text KeyValues (`.vdf`/`.acf` manifests and config files).
//!
//! ```text
//! "AppState"
//! {
//!     "appid"      "220"
//!     "name"       "Half-Life 2"
//! }
//! ```
//!
//! There is no document tree: every lookup rescans the text, comparing the
//! path of open sections against the requested one. Paths compare ASCII
//! case-insensitively and must match exactly, so a key is never attributed to
//! a same-named key at another depth.
//!
//! Text with unbalanced braces is rejected outright; every lookup on it comes
//! back empty.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use std::path::Path;
use tracing::instrument;

/// Joins path components internally; never valid inside a key.
const PATH_SENTINEL: char = '\u{1}';

/// Text plus the lookups that can be run over it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValues {
    text: String,
}
impl KeyValues {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    /// Reads `path`; a missing or unreadable file gives empty text.
    pub fn read(path: impl AsRef<Path>) -> Self {
        Self::new(read_file(path))
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_balanced(&self) -> bool {
        is_balanced(&self.text)
    }

    pub fn value<P: AsRef<str>>(&self, path: &[P], key: &str) -> String {
        get_value(&self.text, path, key)
    }

    pub fn keys<P: AsRef<str>>(&self, path: &[P]) -> (Vec<String>, Vec<String>) {
        get_keys(&self.text, path)
    }

    pub fn sections<P: AsRef<str>>(&self, path: &[P]) -> Vec<String> {
        get_sections(&self.text, path)
    }
}
impl From<String> for KeyValues {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}
impl From<&str> for KeyValues {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

/// Value of `key` directly inside the section at `path`, or empty.
pub fn get_value<P: AsRef<str>>(text: &str, path: &[P], key: &str) -> String {
    let mut found = None;
    scan(text, path, |entry| match entry {
        Entry::Pair(k, v) if k.eq_ignore_ascii_case(key) => {
            found = Some(v.to_string());
            false
        },
        _ => true,
    });
    found.unwrap_or_default()
}

/// All keys and values directly inside the section at `path`, in declaration order.
pub fn get_keys<P: AsRef<str>>(text: &str, path: &[P]) -> (Vec<String>, Vec<String>) {
    let mut keys = Vec::new();
    let mut values = Vec::new();
    scan(text, path, |entry| {
        if let Entry::Pair(k, v) = entry {
            keys.push(k.to_string());
            values.push(v.to_string());
        }
        true
    });
    (keys, values)
}

/// Names of the sections directly inside the section at `path`, in declaration order.
pub fn get_sections<P: AsRef<str>>(text: &str, path: &[P]) -> Vec<String> {
    let mut names = Vec::new();
    scan(text, path, |entry| {
        if let Entry::Section(name) = entry {
            names.push(name.to_string());
        }
        true
    });
    names
}

/// `true` if opening and closing braces outside quoted tokens are equal in number.
pub fn is_balanced(text: &str) -> bool {
    let mut depth: i64 = 0;
    for lexeme in Lexer::new(text) {
        match lexeme {
            Lexeme::Open => depth += 1,
            Lexeme::Close => depth -= 1,
            _ => {},
        }
    }
    depth == 0
}

/// Like [`is_balanced`], as an error for callers that want to report it.
pub fn validate(text: &str) -> Result<()> {
    if !is_balanced(text) {
        exn::bail!(ErrorKind::CorruptSection("unbalanced braces".to_string()));
    }
    Ok(())
}

/// Reads a text KeyValues file, raising [`ErrorKind::NotFound`] or [`ErrorKind::Io`].
pub fn try_read_file(path: impl AsRef<Path>) -> Result<String> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).or_raise(|| {
        if path.exists() {
            ErrorKind::Io(path.to_path_buf())
        } else {
            ErrorKind::NotFound(path.to_path_buf())
        }
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Reads a text KeyValues file, treating any failure as empty text.
#[instrument(level = "debug", skip_all, fields(path = %path.as_ref().display()))]
pub fn read_file(path: impl AsRef<Path>) -> String {
    match try_read_file(path) {
        Ok(text) => text,
        Err(err) => {
            tracing::debug!(error = %*err, "Unable to read KeyValues file; treating as empty");
            String::new()
        },
    }
}

enum Entry<'t> {
    Pair(&'t str, &'t str),
    Section(&'t str),
}

/// Walks `text`, handing `visit` every pair and section opened directly
/// inside `path`. Stops early when `visit` returns `false`.
fn scan<P: AsRef<str>>(text: &str, path: &[P], mut visit: impl FnMut(Entry<'_>) -> bool) {
    if !is_balanced(text) {
        tracing::debug!("Unbalanced braces in KeyValues text; ignoring it");
        return;
    }
    let wanted = join(path.iter().map(|p| p.as_ref()));
    let mut current = String::new();
    let mut lengths: Vec<usize> = Vec::new();
    // Quote characters seen in the current entry: two close the key, four
    // close the value.
    let mut quotes = 0u8;
    let mut name = String::new();
    for lexeme in Lexer::new(text) {
        match lexeme {
            Lexeme::Quoted(token) => {
                quotes += 2;
                if quotes == 2 {
                    name = token;
                    continue;
                }
                quotes = 0;
                if current.eq_ignore_ascii_case(&wanted) && !visit(Entry::Pair(&name, &token)) {
                    return;
                }
            },
            // A key alone on its line is a section name waiting for its
            // brace; the next quoted token starts a new entry.
            Lexeme::Newline => {
                if quotes == 2 {
                    quotes = 0;
                }
            },
            Lexeme::Open => {
                quotes = 0;
                if current.eq_ignore_ascii_case(&wanted) && !visit(Entry::Section(&name)) {
                    return;
                }
                let depth = lengths.len();
                lengths.push(current.len());
                if depth > 0 {
                    current.push(PATH_SENTINEL);
                }
                current.push_str(&name);
            },
            Lexeme::Close => {
                quotes = 0;
                match lengths.pop() {
                    Some(len) => current.truncate(len),
                    None => tracing::debug!("Closing brace without an open section; ignoring"),
                }
            },
        }
    }
}

fn join<'p>(components: impl Iterator<Item = &'p str>) -> String {
    let mut joined = String::new();
    for (i, component) in components.enumerate() {
        if i > 0 {
            joined.push(PATH_SENTINEL);
        }
        joined.push_str(component);
    }
    joined
}

enum Lexeme {
    Quoted(String),
    Open,
    Close,
    Newline,
}

/// Splits text into quoted tokens and structural characters, skipping
/// whitespace, unquoted junk and `//` comments.
struct Lexer<'t> {
    chars: std::iter::Peekable<std::str::Chars<'t>>,
}
impl<'t> Lexer<'t> {
    fn new(text: &'t str) -> Self {
        Self { chars: text.chars().peekable() }
    }

    fn quoted(&mut self) -> String {
        let mut token = String::new();
        while let Some(c) = self.chars.next() {
            match c {
                '"' => break,
                '\\' if matches!(self.chars.peek(), Some('"' | '\\')) => {
                    if let Some(escaped) = self.chars.next() {
                        token.push(escaped);
                    }
                },
                _ => token.push(c),
            }
        }
        token
    }
}
impl Iterator for Lexer<'_> {
    type Item = Lexeme;
    fn next(&mut self) -> Option<Lexeme> {
        while let Some(c) = self.chars.next() {
            match c {
                '"' => return Some(Lexeme::Quoted(self.quoted())),
                '{' => return Some(Lexeme::Open),
                '}' => return Some(Lexeme::Close),
                '\n' => return Some(Lexeme::Newline),
                '/' if self.chars.peek() == Some(&'/') => {
                    for c in self.chars.by_ref() {
                        if c == '\n' {
                            return Some(Lexeme::Newline);
                        }
                    }
                },
                _ => {},
            }
        }
        None
    }
}
