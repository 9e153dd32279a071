use core::fmt;

/// Errors surfaced by [`Lexer::step`][crate::Lexer::step].
///
/// Errors are sticky: once `step` has returned one, the lexer refuses
/// further progress and every later call returns the same error. The
/// caller should discard the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// Invalid byte where a token (method or field name) is required.
    Token,

    /// Invalid byte in the request target.
    Url,

    /// Malformed HTTP version in the request line.
    Version,

    /// The HTTP version is not 1.0 or 1.1.
    UnsupportedVersion,

    /// Invalid CR/LF sequencing.
    NewLine,

    /// Invalid byte in a header value.
    HeaderValue,

    /// Obsolete line folding (leading whitespace on a header line).
    ObsoleteLineFolding,

    /// Content-Length value is not a decimal number.
    BadContentLength,

    /// Content-Length value does not fit in 64 bits.
    ContentLengthOverflow,

    /// More than one Content-Length header in a message.
    DuplicateContentLength,

    /// Transfer-Encoding whose final encoding is not chunked.
    UnsupportedTransferEncoding,

    /// Malformed chunk size line.
    ChunkSize,

    /// Chunk size does not fit in 64 bits.
    ChunkSizeOverflow,

    /// Chunk data not followed by CRLF.
    ChunkExpectedCrLf,

    /// The configured header size limit was exceeded.
    HeaderOverflow,
}

/// Shorthand for results with the crate [`Error`].
pub type Result<T> = core::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use Error::*;
        let s = match self {
            Token => "invalid token byte",
            Url => "invalid request target byte",
            Version => "invalid http version",
            UnsupportedVersion => "unsupported http version",
            NewLine => "invalid new line",
            HeaderValue => "invalid header value byte",
            ObsoleteLineFolding => "obsolete line folding",
            BadContentLength => "content-length not a number",
            ContentLengthOverflow => "content-length overflow",
            DuplicateContentLength => "multiple content-length headers",
            UnsupportedTransferEncoding => "unsupported transfer-encoding",
            ChunkSize => "invalid chunk size line",
            ChunkSizeOverflow => "chunk size overflow",
            ChunkExpectedCrLf => "chunk expected crlf after data",
            HeaderOverflow => "header section too large",
        };

        write!(f, "{}", s)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
