//! Tokenizer for binary KeyValues blobs, as found in the appinfo cache.
//!
//! A blob is a flat stream of one-byte opcodes. Section begins and ends nest;
//! every other token is a key/value pair belonging to the innermost open
//! section. There is no length prefix or end marker; the caller supplies the
//! exact blob.

use crate::error::ErrorKind;
use crate::reader::Reader;
use crate::section::{Section, TypedValue};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::instrument;

/// Set the first time any blob turns out to be corrupt, so the warning is
/// only logged once per process.
static CORRUPTION_REPORTED: AtomicBool = AtomicBool::new(false);

/// Returns `true` if corrupt binary data has been seen by this process.
pub fn corruption_detected() -> bool {
    CORRUPTION_REPORTED.load(Ordering::Relaxed)
}

/// Binary KeyValues opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Token {
    SectionBegin = 0x00,
    String = 0x01,
    Int32 = 0x02,
    /// Unsigned in the source format; stored bit-for-bit as [`TypedValue::Int64`].
    UInt64 = 0x07,
    SectionEnd = 0x08,
    Int64 = 0x0A,
}
impl Token {
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            0x00 => Self::SectionBegin,
            0x01 => Self::String,
            0x02 => Self::Int32,
            0x07 => Self::UInt64,
            0x08 => Self::SectionEnd,
            0x0A => Self::Int64,
            _ => return None,
        })
    }

    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// What happened during the most recent [`Tokenizer::tokenize`] call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Report {
    /// Section begin tokens consumed.
    pub begins: usize,
    /// Section end tokens that closed an open section.
    pub ends: usize,
    /// Section end tokens seen with no open section (excluding a trailing terminator).
    pub unmatched_ends: usize,
    /// Sections still open when the blob ran out; these are not returned.
    pub unclosed: usize,
    /// Set when tokenizing stopped early.
    pub error: Option<ErrorKind>,
}
impl Report {
    /// `true` when the blob was consumed completely with balanced nesting.
    pub fn is_clean(&self) -> bool {
        self.error.is_none() && self.unmatched_ends == 0 && self.unclosed == 0 && self.begins == self.ends
    }
}

#[derive(Debug)]
struct Frame {
    name: String,
    slot: usize,
}

#[derive(Debug)]
struct Slot {
    section: Section,
    closed: bool,
}

/// Reusable tokenizer.
///
/// Holds the open-section stack and section accumulator between calls so
/// that resolving thousands of applications doesn't reallocate them each
/// time. Not meant to be shared between threads; give each worker its own.
#[derive(Debug, Default)]
pub struct Tokenizer {
    stack: Vec<Frame>,
    slots: Vec<Slot>,
    report: Report,
}
impl Tokenizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report for the most recent call to [`tokenize`](Self::tokenize).
    pub fn report(&self) -> &Report {
        &self.report
    }

    /// Number of sections left open by the most recent call.
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Scans `blob` into its sections, in declaration order.
    ///
    /// Never fails: on an unknown opcode or truncated token the scan stops and
    /// the sections closed so far are returned. A section's slot is reserved
    /// when it begins, so parents precede their children.
    #[instrument(level = "trace", skip_all, fields(blob_size = blob.len()))]
    pub fn tokenize(&mut self, blob: &[u8]) -> Vec<Section> {
        self.stack.clear();
        self.slots.clear();
        self.report = Report::default();
        let mut reader = Reader::new(blob);
        while let Some(byte) = reader.u8() {
            let offset = reader.position() - 1;
            let Some(token) = Token::from_byte(byte) else {
                self.corrupt(format!("unknown token {byte:#04x} at offset {offset}"));
                break;
            };
            if self.step(token, &mut reader).is_none() {
                self.corrupt(format!("truncated {token:?} token at offset {offset}"));
                break;
            }
        }
        self.report.unclosed = self.stack.len();
        if self.report.unclosed > 0 {
            tracing::debug!(unclosed = self.report.unclosed, "Blob ended with open sections; dropping them");
        }
        self.slots.drain(..).filter(|slot| slot.closed).map(|slot| slot.section).collect()
    }

    /// Consumes one token's payload. Returns `None` if the payload is truncated.
    fn step(&mut self, token: Token, reader: &mut Reader<'_>) -> Option<()> {
        match token {
            Token::SectionBegin => {
                let name = lossy(reader.cstr()?);
                let start = reader.position();
                let mut components: Vec<String> = self.stack.iter().map(|frame| frame.name.clone()).collect();
                components.push(name.clone());
                self.stack.push(Frame { name, slot: self.slots.len() });
                self.slots.push(Slot {
                    section: Section::with_extent(components, start..start),
                    closed: false,
                });
                self.report.begins += 1;
            },
            Token::SectionEnd => {
                let offset = reader.position() - 1;
                match self.stack.pop() {
                    Some(frame) => {
                        if let Some(slot) = self.slots.get_mut(frame.slot) {
                            slot.section.close(offset);
                            slot.closed = true;
                        }
                        self.report.ends += 1;
                    },
                    // The outermost object is terminated by one more end token
                    // than there are named sections.
                    None if reader.is_empty() => {
                        tracing::trace!(offset, "Trailing end-of-object token");
                    },
                    None => {
                        // Best effort only: the remainder of the blob may be
                        // attributed to the wrong sections.
                        self.report.unmatched_ends += 1;
                        tracing::warn!(offset, "Section end without an open section; continuing");
                    },
                }
            },
            Token::String => {
                let key = lossy(reader.cstr()?);
                let value = lossy(reader.cstr()?);
                self.append(key, TypedValue::String(value));
            },
            Token::Int32 => {
                let key = lossy(reader.cstr()?);
                let value = reader.i32_le()?;
                self.append(key, TypedValue::Int32(value));
            },
            Token::UInt64 | Token::Int64 => {
                let key = lossy(reader.cstr()?);
                let value = reader.i64_le()?;
                self.append(key, TypedValue::Int64(value));
            },
        }
        Some(())
    }

    fn append(&mut self, key: String, value: TypedValue) {
        let Some(frame) = self.stack.last() else {
            tracing::trace!(key = %key, "Value outside of any section; ignoring");
            return;
        };
        if let Some(slot) = self.slots.get_mut(frame.slot) {
            slot.section.push(key, value);
        }
    }

    fn corrupt(&mut self, detail: String) {
        if CORRUPTION_REPORTED.swap(true, Ordering::Relaxed) {
            tracing::debug!(%detail, "Corrupt binary section data");
        } else {
            tracing::warn!(%detail, "Corrupt binary section data; further occurrences are logged at debug level");
        }
        self.report.error = Some(ErrorKind::CorruptSection(detail));
    }
}

/// Tokenizes a blob with a throwaway [`Tokenizer`].
pub fn parse(blob: &[u8]) -> Vec<Section> {
    Tokenizer::new().tokenize(blob)
}

fn lossy(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Encoder for binary KeyValues.
///
/// Nothing in the read path needs this; it exists to build blobs for tests
/// and tooling.
#[derive(Debug, Default, Clone)]
pub struct Writer {
    buffer: Vec<u8>,
}
impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(mut self, token: Token, key: &str) -> Self {
        self.buffer.push(token.as_byte());
        self.buffer.extend_from_slice(key.as_bytes());
        self.buffer.push(0);
        self
    }

    pub fn begin(self, name: &str) -> Self {
        self.key(Token::SectionBegin, name)
    }

    pub fn end(mut self) -> Self {
        self.buffer.push(Token::SectionEnd.as_byte());
        self
    }

    pub fn string(self, key: &str, value: &str) -> Self {
        let mut this = self.key(Token::String, key);
        this.buffer.extend_from_slice(value.as_bytes());
        this.buffer.push(0);
        this
    }

    pub fn int32(self, key: &str, value: i32) -> Self {
        let mut this = self.key(Token::Int32, key);
        this.buffer.extend_from_slice(&value.to_le_bytes());
        this
    }

    pub fn int64(self, key: &str, value: i64) -> Self {
        let mut this = self.key(Token::Int64, key);
        this.buffer.extend_from_slice(&value.to_le_bytes());
        this
    }

    /// Appends arbitrary bytes, e.g. to produce deliberately broken input.
    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.buffer.extend_from_slice(bytes);
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn single_section_round_trip() {
        let blob = Writer::new().begin("common").string("type", "game").end().finish();
        let sections = parse(&blob);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].path(), "common");
        assert_eq!(sections[0].pairs(), &[("type".to_string(), TypedValue::from("game"))]);
        assert_eq!(sections[0].raw(&blob), Some(&blob[8..blob.len() - 1]));
    }

    #[test]
    fn nested_sections_keep_declaration_order() {
        let blob = Writer::new()
            .begin("appinfo")
            .int32("appid", 440)
            .begin("common")
            .string("name", "Team Fortress 2")
            .end()
            .begin("config")
            .begin("launch")
            .begin("0")
            .string("executable", "hl2.exe")
            .end()
            .end()
            .end()
            .end()
            .end()
            .finish();
        let mut tokenizer = Tokenizer::new();
        let sections = tokenizer.tokenize(&blob);
        let paths: Vec<_> = sections.iter().map(Section::path).collect();
        assert_eq!(
            paths,
            ["appinfo", "appinfo.common", "appinfo.config", "appinfo.config.launch", "appinfo.config.launch.0"]
        );
        assert_eq!(sections[0].get_integer("appid"), Some(440));
        let report = tokenizer.report();
        assert_eq!(report.begins, report.ends);
        assert_eq!(tokenizer.depth(), 0);
        assert!(report.is_clean());
    }

    #[test]
    fn dotted_section_names_are_one_component() {
        let blob = Writer::new()
            .begin("440")
            .begin("depots")
            .begin("branches")
            .begin("1.2.3")
            .string("buildid", "90")
            .end()
            .end()
            .end()
            .end()
            .finish();
        let sections = parse(&blob);
        let branch = sections.last().unwrap();
        assert_eq!(branch.name(), "1.2.3");
        assert_eq!(branch.depth(), 4);
        assert_eq!(branch.components().collect::<Vec<_>>(), ["440", "depots", "branches", "1.2.3"]);
    }

    #[test]
    fn values_outside_sections_are_ignored() {
        let blob = Writer::new().string("k", "v").begin("s").end().finish();
        let mut tokenizer = Tokenizer::new();
        let sections = tokenizer.tokenize(&blob);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].path(), "s");
        assert!(sections[0].is_empty());
        assert!(tokenizer.report().is_clean());
    }

    #[test]
    fn integer_tokens() {
        let blob = Writer::new()
            .begin("s")
            .int32("small", -7)
            .int64("big", 76561197960265728)
            .raw(&[Token::UInt64.as_byte()])
            .raw(b"unsigned\0")
            .raw(&u64::MAX.to_le_bytes())
            .end()
            .finish();
        let sections = parse(&blob);
        assert_eq!(sections[0].get("small"), Some(&TypedValue::Int32(-7)));
        assert_eq!(sections[0].get("big"), Some(&TypedValue::Int64(76561197960265728)));
        assert_eq!(sections[0].get("unsigned"), Some(&TypedValue::Int64(-1)));
    }

    #[test]
    fn unknown_token_stops_but_keeps_closed_sections() {
        let blob = Writer::new()
            .begin("appinfo")
            .begin("common")
            .string("type", "game")
            .end()
            .raw(&[0x05])
            .string("ignored", "value")
            .end()
            .finish();
        let mut tokenizer = Tokenizer::new();
        let sections = tokenizer.tokenize(&blob);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].path(), "appinfo.common");
        assert!(matches!(tokenizer.report().error, Some(ErrorKind::CorruptSection(_))));
        assert_eq!(tokenizer.report().unclosed, 1);
        assert!(corruption_detected());
    }

    #[rstest]
    #[case::truncated_name(Writer::new().begin("s").raw(&[Token::String.as_byte()]).raw(b"key").finish())]
    #[case::truncated_value(Writer::new().begin("s").raw(&[Token::String.as_byte()]).raw(b"key\0val").finish())]
    #[case::truncated_int(Writer::new().begin("s").raw(&[Token::Int32.as_byte()]).raw(b"key\0\x01\x02").finish())]
    fn truncated_payload_is_corrupt(#[case] blob: Vec<u8>) {
        let mut tokenizer = Tokenizer::new();
        let sections = tokenizer.tokenize(&blob);
        assert!(sections.is_empty());
        assert!(tokenizer.report().error.is_some());
    }

    #[test]
    fn unmatched_end_is_skipped() {
        let blob = Writer::new().end().begin("common").string("type", "game").end().finish();
        let mut tokenizer = Tokenizer::new();
        let sections = tokenizer.tokenize(&blob);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].get_str("type"), Some("game"));
        assert_eq!(tokenizer.report().unmatched_ends, 1);
        assert!(!tokenizer.report().is_clean());
    }

    #[test]
    fn trailing_terminator_is_not_unmatched() {
        let blob = Writer::new().begin("appinfo").end().end().finish();
        let mut tokenizer = Tokenizer::new();
        assert_eq!(tokenizer.tokenize(&blob).len(), 1);
        assert!(tokenizer.report().is_clean());
    }

    #[test]
    fn tokenizer_is_reusable() {
        let mut tokenizer = Tokenizer::new();
        let first = Writer::new().begin("a").end().finish();
        let broken = Writer::new().begin("b").finish();
        assert_eq!(tokenizer.tokenize(&broken).len(), 0);
        assert_eq!(tokenizer.depth(), 1);
        assert_eq!(tokenizer.tokenize(&first).len(), 1);
        assert_eq!(tokenizer.depth(), 0);
        assert!(tokenizer.report().is_clean());
    }

    #[test]
    fn empty_blob() {
        assert!(parse(&[]).is_empty());
    }
}
