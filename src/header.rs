//! Recognition of the headers that decide message framing.
//!
//! Only a closed set of headers matters to the lexer: Content-Length,
//! Transfer-Encoding, Connection and Upgrade. Everything else streams
//! through as opaque FIELD/VALUE tokens. Names and values are matched
//! byte by byte while they are being lexed, so nothing is copied and
//! the matcher state stays bounded.

use crate::error::{Error, Result};
use crate::util::is_ows;

const FRAMING_NAMES: &[&str] = &["content-length", "transfer-encoding", "connection", "upgrade"];

const TE_TARGETS: &[&str] = &["chunked"];
const TE_CHUNKED: usize = 0;

const CONN_TARGETS: &[&str] = &["close", "keep-alive", "upgrade"];
const CONN_CLOSE: usize = 0;
const CONN_KEEP_ALIVE: usize = 1;
const CONN_UPGRADE: usize = 2;

/// One of the headers that affect framing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FramingHeader {
    ContentLength,
    TransferEncoding,
    Connection,
    Upgrade,
}

/// Case-insensitive match of a streaming field name against the
/// framing header set.
///
/// Holds a cursor and an alive-bitmask instead of the name bytes, so
/// the state is a few bytes no matter how long the field name gets.
/// Once the name diverges from every target the header is known to be
/// non-framing and further bytes only advance the cursor.
#[derive(Debug, Clone, Copy)]
pub(crate) struct NameMatch {
    pos: u16,
    alive: u8,
}

impl NameMatch {
    pub fn new() -> Self {
        NameMatch {
            pos: 0,
            alive: (1 << FRAMING_NAMES.len()) - 1,
        }
    }

    pub fn push(&mut self, c: u8) {
        if self.alive != 0 {
            let c = c.to_ascii_lowercase();
            let pos = self.pos as usize;
            for (i, name) in FRAMING_NAMES.iter().enumerate() {
                let bit = 1 << i;
                if self.alive & bit != 0 && name.as_bytes().get(pos) != Some(&c) {
                    self.alive &= !bit;
                }
            }
        }
        self.pos = self.pos.saturating_add(1);
    }

    /// The framing header the complete name equals, if any.
    pub fn matched(&self) -> Option<FramingHeader> {
        let pos = self.pos as usize;
        for (i, name) in FRAMING_NAMES.iter().enumerate() {
            if self.alive & (1 << i) != 0 && name.len() == pos {
                return Some(match i {
                    0 => FramingHeader::ContentLength,
                    1 => FramingHeader::TransferEncoding,
                    2 => FramingHeader::Connection,
                    _ => FramingHeader::Upgrade,
                });
            }
        }
        None
    }
}

/// Match the comma-separated elements of a list-valued header against
/// a fixed target set, byte by byte.
///
/// Whitespace around elements is skipped; an element with internal
/// whitespace matches nothing. Re-feeding whitespace that the lexer
/// held back over a buffer boundary is harmless.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ListMatch {
    targets: &'static [&'static str],
    pos: u16,
    alive: u8,
    gap: bool,
    matched: u8,
    last: Option<u8>,
}

impl ListMatch {
    fn new(targets: &'static [&'static str]) -> Self {
        ListMatch {
            targets,
            pos: 0,
            alive: (1 << targets.len()) - 1,
            gap: false,
            matched: 0,
            last: None,
        }
    }

    fn push(&mut self, c: u8) {
        if c == b',' {
            self.end_element();
            return;
        }

        if is_ows(c) {
            if self.pos > 0 {
                self.gap = true;
            }
            return;
        }

        if self.gap {
            // Bytes after internal whitespace: the element cannot match.
            self.alive = 0;
        } else if self.alive != 0 {
            let c = c.to_ascii_lowercase();
            let pos = self.pos as usize;
            for (i, t) in self.targets.iter().enumerate() {
                let bit = 1 << i;
                if self.alive & bit != 0 && t.as_bytes().get(pos) != Some(&c) {
                    self.alive &= !bit;
                }
            }
        }
        self.pos = self.pos.saturating_add(1);
    }

    fn finish(&mut self) {
        self.end_element();
    }

    fn end_element(&mut self) {
        let pos = self.pos as usize;
        let mut hit = None;
        for (i, t) in self.targets.iter().enumerate() {
            if self.alive & (1 << i) != 0 && t.len() == pos {
                hit = Some(i as u8);
            }
        }

        // Empty elements (",," and trailing commas) do not count.
        if self.pos > 0 {
            self.last = hit;
            if let Some(i) = hit {
                self.matched |= 1 << i;
            }
        }

        self.pos = 0;
        self.alive = (1 << self.targets.len()) - 1;
        self.gap = false;
    }

    fn contains(&self, i: usize) -> bool {
        self.matched & (1 << i) != 0
    }

    fn last(&self) -> Option<u8> {
        self.last
    }
}

/// Inspects the value of a recognized framing header while the VALUE
/// token streams through the lexer.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ValueProbe {
    None,
    ContentLength {
        value: u64,
        seen_digit: bool,
        done: bool,
    },
    TransferEncoding(ListMatch),
    Connection(ListMatch),
    Upgrade {
        seen: bool,
    },
}

impl ValueProbe {
    pub fn for_header(header: Option<FramingHeader>) -> ValueProbe {
        match header {
            None => ValueProbe::None,
            Some(FramingHeader::ContentLength) => ValueProbe::ContentLength {
                value: 0,
                seen_digit: false,
                done: false,
            },
            Some(FramingHeader::TransferEncoding) => {
                ValueProbe::TransferEncoding(ListMatch::new(TE_TARGETS))
            }
            Some(FramingHeader::Connection) => ValueProbe::Connection(ListMatch::new(CONN_TARGETS)),
            Some(FramingHeader::Upgrade) => ValueProbe::Upgrade { seen: false },
        }
    }

    /// Feed one value byte. Leading whitespace never reaches the probe;
    /// trailing whitespace may be fed more than once when the lexer
    /// holds it back over a buffer boundary.
    pub fn push(&mut self, c: u8) -> Result<()> {
        match self {
            ValueProbe::None => Ok(()),
            ValueProbe::ContentLength {
                value,
                seen_digit,
                done,
            } => {
                if c.is_ascii_digit() {
                    if *done {
                        return Err(Error::BadContentLength);
                    }
                    let d = (c - b'0') as u64;
                    *value = value
                        .checked_mul(10)
                        .and_then(|v| v.checked_add(d))
                        .ok_or(Error::ContentLengthOverflow)?;
                    *seen_digit = true;
                    Ok(())
                } else if is_ows(c) {
                    if *seen_digit {
                        *done = true;
                    }
                    Ok(())
                } else {
                    Err(Error::BadContentLength)
                }
            }
            ValueProbe::TransferEncoding(m) | ValueProbe::Connection(m) => {
                m.push(c);
                Ok(())
            }
            ValueProbe::Upgrade { seen } => {
                if !is_ows(c) {
                    *seen = true;
                }
                Ok(())
            }
        }
    }

    /// Fold the complete value into the framing facts.
    pub fn finish(self, info: &mut FramingInfo) -> Result<()> {
        match self {
            ValueProbe::None => Ok(()),
            ValueProbe::ContentLength {
                value, seen_digit, ..
            } => {
                if !seen_digit {
                    return Err(Error::BadContentLength);
                }
                if info.content_length.is_some() {
                    return Err(Error::DuplicateContentLength);
                }
                info.content_length = Some(value);
                Ok(())
            }
            ValueProbe::TransferEncoding(mut m) => {
                m.finish();
                info.te_present = true;
                // Repeated headers fold into one list: the last element
                // of the last header decides.
                info.te_chunked_last = m.last() == Some(TE_CHUNKED as u8);
                Ok(())
            }
            ValueProbe::Connection(mut m) => {
                m.finish();
                info.conn_close |= m.contains(CONN_CLOSE);
                info.conn_keep_alive |= m.contains(CONN_KEEP_ALIVE);
                info.conn_upgrade |= m.contains(CONN_UPGRADE);
                Ok(())
            }
            ValueProbe::Upgrade { seen } => {
                info.upgrade_requested |= seen;
                Ok(())
            }
        }
    }
}

/// Framing facts accumulated while the headers stream through.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct FramingInfo {
    pub content_length: Option<u64>,
    pub te_present: bool,
    pub te_chunked_last: bool,
    pub conn_close: bool,
    pub conn_keep_alive: bool,
    pub conn_upgrade: bool,
    pub upgrade_requested: bool,
}

/// How the message body is framed, decided once the header block ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyMode {
    /// Delimited by content-length. 0 is a valid value: the message
    /// has a body of zero bytes.
    LengthDelimited(u64),

    /// Chunked transfer encoding, possibly followed by trailers.
    Chunked,

    /// The connection turns into an opaque tunnel after the headers.
    Upgrade,

    /// No framing header present: the message has no body.
    NoBody,
}

impl BodyMode {
    // https://datatracker.ietf.org/doc/html/rfc7230#section-3.3.3
    // Transfer-Encoding trumps Content-Length; an upgrade tunnel trumps
    // both.
    pub(crate) fn from_info(info: &FramingInfo) -> Result<BodyMode> {
        if info.upgrade_requested && info.conn_upgrade {
            return Ok(BodyMode::Upgrade);
        }

        if info.te_present {
            return if info.te_chunked_last {
                Ok(BodyMode::Chunked)
            } else {
                Err(Error::UnsupportedTransferEncoding)
            };
        }

        if let Some(n) = info.content_length {
            return Ok(BodyMode::LengthDelimited(n));
        }

        Ok(BodyMode::NoBody)
    }
}

/// Keep-alive per RFC 7230 section 6.3: on by default for 1.1, opt-in
/// for 1.0, `close` wins over everything.
pub(crate) fn keep_alive(major: u8, minor: u8, info: &FramingInfo) -> Result<bool> {
    match (major, minor) {
        (1, 1) => Ok(!info.conn_close),
        (1, 0) => Ok(info.conn_keep_alive && !info.conn_close),
        _ => Err(Error::UnsupportedVersion),
    }
}
