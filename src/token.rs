use core::fmt;
use core::str;

/// Classification of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Zero-width marker emitted before anything else of a message.
    MsgStart,

    /// The request method.
    Method,

    /// The request target.
    Url,

    /// A header (or trailer) field name, colon excluded.
    Field,

    /// A header (or trailer) field value, surrounding whitespace
    /// stripped.
    Value,

    /// Zero-width marker emitted once the empty line ending the header
    /// block is recognized.
    HeaderEnd,

    /// A slice of body data.
    Body,

    /// Zero-width marker emitted once the message is complete.
    MsgEnd,

    /// The lexer needs more input to make progress.
    Again,

    /// No further request follows on this connection. After a protocol
    /// upgrade the token spans the tunneled payload.
    Eof,
}

impl Kind {
    /// Whether tokens of this kind carry a span of content. The other
    /// kinds are zero-width markers.
    pub fn is_content(&self) -> bool {
        matches!(
            self,
            Kind::Method | Kind::Url | Kind::Field | Kind::Value | Kind::Body
        )
    }
}

/// A classified view into the input of one [`step`][crate::Lexer::step]
/// call.
///
/// The span borrows from the caller's buffer. Nothing is copied: a
/// caller that needs the bytes past the next `step` call copies them
/// out itself.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    kind: Kind,
    data: &'a [u8],
    input_used: usize,
    partial: bool,
}

impl<'a> Token<'a> {
    pub(crate) fn new(kind: Kind, data: &'a [u8], input_used: usize, partial: bool) -> Token<'a> {
        Token {
            kind,
            data,
            input_used,
            partial,
        }
    }

    pub(crate) fn marker(kind: Kind, input: &'a [u8], at: usize) -> Token<'a> {
        Token {
            kind,
            data: &input[at..at],
            input_used: at,
            partial: false,
        }
    }

    /// What the span is.
    #[inline(always)]
    pub fn kind(&self) -> Kind {
        self.kind
    }

    /// The semantic span, borrowed from the input buffer. Empty for
    /// marker tokens. Grammar delimiters (spaces, colons, CRLF) are
    /// never part of a span.
    #[inline(always)]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// How many bytes of the input buffer were consumed. The caller
    /// re-presents the rest, possibly with fresh bytes appended, on the
    /// next call.
    #[inline(always)]
    pub fn input_used(&self) -> usize {
        self.input_used
    }

    /// True when the span is a prefix of a unit that continues in the
    /// next call because input ran out. Consumers concatenate the spans
    /// of consecutive tokens of the same kind.
    #[inline(always)]
    pub fn is_partial(&self) -> bool {
        self.partial
    }
}

impl<'a> fmt::Debug for Token<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_struct("Token");
        f.field("kind", &self.kind);
        if let Ok(data) = str::from_utf8(self.data) {
            f.field("data", &data);
        } else {
            f.field("data", &self.data);
        }
        f.field("partial", &self.partial);
        f.finish()
    }
}
