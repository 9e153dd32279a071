use crate::chunk::Dechunker;
use crate::error::{Error, Result};
use crate::header::{keep_alive, BodyMode, FramingInfo, NameMatch, ValueProbe};
use crate::token::{Kind, Token};
use crate::util::{is_ows, is_tchar, is_url_char, is_value_char};

/// Position in the request grammar.
///
/// Content units (method, target, field name, field value, body data)
/// have their own states so a unit can stretch over any number of
/// buffers. Delimiters get one state per byte: a buffer may end between
/// any two bytes, including in the middle of a CRLF.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Waiting for the first byte of a message.
    Start,
    /// Lexing the method.
    Method,
    /// The SP after the method.
    MethodSp,
    /// Lexing the request target.
    Url,
    /// The SP after the request target.
    UrlSp,
    /// The "HTTP/" literal, index of the expected byte.
    VersionLit(u8),
    VersionMajor,
    VersionDot,
    VersionMinor,
    /// CR ending the request line.
    LineCr,
    /// LF ending the request line.
    LineLf,
    /// Start of a header (or trailer) line. Also recognizes the empty
    /// line ending the block.
    FieldStart,
    /// Lexing a field name.
    Field,
    /// The colon after a field name.
    FieldColon,
    /// Optional whitespace before a field value.
    ValueOws,
    /// Lexing a field value.
    Value,
    /// Trailing whitespace and CR after a field value.
    ValueCr,
    /// LF ending a field line.
    ValueLf,
    /// LF of the empty line ending the header (or trailer) block.
    HeaderEndLf,
    /// Identity body, counted down by `remaining`.
    Body,
    /// Chunked body, driven by the dechunker.
    ChunkedBody,
    /// The message end marker is due.
    MsgEnd,
    /// Keep-alive was off: the stream is done.
    Closed,
    /// Upgrade tunnel: remaining bytes belong to another protocol.
    Tunnel,
}

/// An incremental, zero-copy lexer over an HTTP/1.1 request stream.
///
/// The lexer owns no buffers and allocates nothing. The caller reads
/// from its transport into a buffer of its choosing and hands the
/// unconsumed part to [`step`][Lexer::step], which classifies the
/// longest prefix it can and returns one [`Token`] borrowing from that
/// buffer. The state is a small struct, so a server can keep one lexer
/// per connection for any number of connections and resume each one in
/// constant time.
///
/// A message produces tokens in grammar order: `MsgStart`, `Method`,
/// `Url`, (`Field`, `Value`)\*, `HeaderEnd`, `Body`\*, trailing
/// (`Field`, `Value`)\* for chunked messages, `MsgEnd`. After `MsgEnd`
/// of a keep-alive message the lexer re-enters the request line by
/// itself, so pipelined requests need no re-initialization.
#[derive(Debug, Clone)]
pub struct Lexer {
    state: State,
    version_major: u8,
    version_minor: u8,
    keep_alive: bool,
    info: FramingInfo,
    mode: Option<BodyMode>,
    names: NameMatch,
    probe: ValueProbe,
    dechunker: Dechunker,
    remaining: u64,
    in_trailers: bool,
    in_token: bool,
    header_used: usize,
    header_limit: usize,
    failed: Option<Error>,
}

impl Lexer {
    /// Create a lexer positioned at the start of a request stream.
    pub fn new() -> Lexer {
        Lexer {
            state: State::Start,
            version_major: 0,
            version_minor: 0,
            keep_alive: false,
            info: FramingInfo::default(),
            mode: None,
            names: NameMatch::new(),
            probe: ValueProbe::None,
            dechunker: Dechunker::new(),
            remaining: 0,
            in_trailers: false,
            in_token: false,
            header_used: 0,
            header_limit: usize::MAX,
            failed: None,
        }
    }

    /// Reset to the start of a fresh stream, keeping the configured
    /// header limit. Not needed between pipelined requests.
    pub fn reset(&mut self) {
        let header_limit = self.header_limit;
        *self = Lexer::new();
        self.header_limit = header_limit;
    }

    /// Cap the number of bytes one message may spend on its request
    /// line, headers and trailers. Exceeding the cap fails the lexer
    /// with [`Error::HeaderOverflow`]. Unlimited by default.
    pub fn set_header_limit(&mut self, limit: usize) {
        self.header_limit = limit;
    }

    /// Major version from the request line. Valid once the request
    /// line has been consumed, until the next message starts.
    pub fn version_major(&self) -> u8 {
        self.version_major
    }

    /// Minor version from the request line. See [`Lexer::version_major`].
    pub fn version_minor(&self) -> u8 {
        self.version_minor
    }

    /// Whether the connection should be reused after the current
    /// message. Meaningful once [`Kind::HeaderEnd`] has been emitted.
    pub fn is_keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// How the current message's body is framed. `None` until
    /// [`Kind::HeaderEnd`] has been emitted.
    pub fn body_mode(&self) -> Option<BodyMode> {
        self.mode
    }

    /// Advance over `input` and classify the longest prefix possible.
    ///
    /// Returns exactly one token per call. `token.input_used()` bytes
    /// of `input` are consumed; the caller re-presents the rest,
    /// appending fresh bytes as they arrive, on the next call. With an
    /// empty `input` the call returns [`Kind::Again`] without a state
    /// change, except at a message boundary where a pending
    /// [`Kind::MsgEnd`] or [`Kind::Eof`] is delivered first.
    ///
    /// Errors are sticky. Tokens emitted before an error remain valid.
    pub fn step<'a>(&mut self, input: &'a [u8]) -> Result<Token<'a>> {
        if let Some(e) = self.failed {
            return Err(e);
        }

        let in_header = self.in_header_section();

        let token = match self.do_step(input) {
            Ok(t) => t,
            Err(e) => {
                self.failed = Some(e);
                return Err(e);
            }
        };

        if in_header {
            self.header_used = self.header_used.saturating_add(token.input_used());
            if self.header_used > self.header_limit {
                let e = Error::HeaderOverflow;
                self.failed = Some(e);
                return Err(e);
            }
        }

        Ok(token)
    }

    fn in_header_section(&self) -> bool {
        !matches!(
            self.state,
            State::Body | State::ChunkedBody | State::MsgEnd | State::Closed | State::Tunnel
        )
    }

    fn do_step<'a>(&mut self, input: &'a [u8]) -> Result<Token<'a>> {
        // Boundary transitions first. These fire also on empty input.
        match self.state {
            State::MsgEnd => return Ok(self.msg_end(input, 0)),
            State::Closed => return Ok(Token::marker(Kind::Eof, input, 0)),
            State::Tunnel => {
                // Whatever is in the buffer belongs to the upgraded
                // protocol. Hand it over wholesale.
                return Ok(Token::new(Kind::Eof, input, input.len(), false));
            }
            State::Start => {
                if input.is_empty() {
                    return Ok(Token::marker(Kind::Again, input, 0));
                }
                trace!("Message start");
                self.begin_message();
                self.state = State::Method;
                return Ok(Token::marker(Kind::MsgStart, input, 0));
            }
            _ => {}
        }

        let mut pos = 0;

        loop {
            let c = match input.get(pos) {
                Some(c) => *c,
                None => return Ok(Token::marker(Kind::Again, input, pos)),
            };

            match self.state {
                State::Method => return self.lex_method(input, pos),
                State::Url => return self.lex_url(input, pos),
                State::Field => return self.lex_field(input, pos),
                State::Value => return self.lex_value(input, pos),
                State::Body => return self.lex_body(input, pos),

                State::MethodSp => {
                    if c != b' ' {
                        return Err(Error::Token);
                    }
                    pos += 1;
                    self.in_token = false;
                    self.state = State::Url;
                }

                State::UrlSp => {
                    if c != b' ' {
                        return Err(Error::Url);
                    }
                    pos += 1;
                    self.state = State::VersionLit(0);
                }

                State::VersionLit(i) => {
                    if c != b"HTTP/"[i as usize] {
                        return Err(Error::Version);
                    }
                    pos += 1;
                    self.state = if i == 4 {
                        State::VersionMajor
                    } else {
                        State::VersionLit(i + 1)
                    };
                }

                State::VersionMajor => {
                    if !c.is_ascii_digit() {
                        return Err(Error::Version);
                    }
                    self.version_major = c - b'0';
                    pos += 1;
                    self.state = State::VersionDot;
                }

                State::VersionDot => {
                    if c != b'.' {
                        return Err(Error::Version);
                    }
                    pos += 1;
                    self.state = State::VersionMinor;
                }

                State::VersionMinor => {
                    if !c.is_ascii_digit() {
                        return Err(Error::Version);
                    }
                    self.version_minor = c - b'0';
                    trace!(
                        "Request line version: {}.{}",
                        self.version_major,
                        self.version_minor
                    );
                    pos += 1;
                    self.state = State::LineCr;
                }

                State::LineCr => {
                    if c != b'\r' {
                        return Err(Error::Version);
                    }
                    pos += 1;
                    self.state = State::LineLf;
                }

                State::LineLf => {
                    if c != b'\n' {
                        return Err(Error::NewLine);
                    }
                    pos += 1;
                    self.state = State::FieldStart;
                }

                State::FieldStart => {
                    if c == b'\r' {
                        pos += 1;
                        self.state = State::HeaderEndLf;
                    } else if is_ows(c) {
                        return Err(Error::ObsoleteLineFolding);
                    } else if is_tchar(c) {
                        // Not consumed: the field arm takes over at pos.
                        self.in_token = false;
                        self.state = State::Field;
                    } else {
                        return Err(Error::Token);
                    }
                }

                State::FieldColon => {
                    if c != b':' {
                        return Err(Error::Token);
                    }
                    pos += 1;
                    self.state = State::ValueOws;
                }

                State::ValueOws => {
                    if is_ows(c) {
                        pos += 1;
                    } else {
                        // Not consumed: the value arm takes over, also
                        // when the value is empty (c is the CR).
                        self.state = State::Value;
                    }
                }

                State::ValueCr => {
                    if is_ows(c) {
                        pos += 1;
                    } else if c == b'\r' {
                        pos += 1;
                        self.state = State::ValueLf;
                    } else {
                        return Err(Error::HeaderValue);
                    }
                }

                State::ValueLf => {
                    if c != b'\n' {
                        return Err(Error::NewLine);
                    }
                    pos += 1;
                    self.names = NameMatch::new();
                    self.state = State::FieldStart;
                }

                State::HeaderEndLf => {
                    if c != b'\n' {
                        return Err(Error::NewLine);
                    }
                    pos += 1;
                    if self.in_trailers {
                        return Ok(self.msg_end(input, pos));
                    }
                    return self.header_end(input, pos);
                }

                State::ChunkedBody => {
                    if let Some(left) = self.dechunker.data_left() {
                        return self.lex_chunk_data(input, pos, left);
                    }
                    self.dechunker.push_control(c)?;
                    pos += 1;
                    if self.dechunker.is_trailers() {
                        self.in_trailers = true;
                        self.state = State::FieldStart;
                    }
                }

                State::Start | State::MsgEnd | State::Closed | State::Tunnel => {
                    unreachable!("boundary state in scan loop")
                }
            }
        }
    }

    /// Reset the per-message parts of the state.
    fn begin_message(&mut self) {
        self.version_major = 0;
        self.version_minor = 0;
        self.keep_alive = false;
        self.info = FramingInfo::default();
        self.mode = None;
        self.names = NameMatch::new();
        self.probe = ValueProbe::None;
        self.dechunker = Dechunker::new();
        self.remaining = 0;
        self.in_trailers = false;
        self.in_token = false;
        self.header_used = 0;
    }

    /// The empty header line is consumed: settle framing and keep-alive
    /// and emit the header end marker.
    fn header_end<'a>(&mut self, input: &'a [u8], pos: usize) -> Result<Token<'a>> {
        self.keep_alive = keep_alive(self.version_major, self.version_minor, &self.info)?;
        let mode = BodyMode::from_info(&self.info)?;
        self.mode = Some(mode);
        trace!("Body mode: {:?}, keep_alive: {}", mode, self.keep_alive);

        self.state = match mode {
            BodyMode::LengthDelimited(0) | BodyMode::NoBody | BodyMode::Upgrade => State::MsgEnd,
            BodyMode::LengthDelimited(n) => {
                self.remaining = n;
                State::Body
            }
            BodyMode::Chunked => State::ChunkedBody,
        };

        Ok(Token::marker(Kind::HeaderEnd, input, pos))
    }

    fn msg_end<'a>(&mut self, input: &'a [u8], at: usize) -> Token<'a> {
        trace!("Message end, keep_alive: {}", self.keep_alive);

        self.state = match self.mode {
            Some(BodyMode::Upgrade) => State::Tunnel,
            _ if self.keep_alive => State::Start,
            _ => State::Closed,
        };

        Token::marker(Kind::MsgEnd, input, at)
    }

    fn lex_method<'a>(&mut self, input: &'a [u8], start: usize) -> Result<Token<'a>> {
        let mut i = start;

        while i < input.len() {
            let c = input[i];
            if c == b' ' {
                if i == start && !self.in_token {
                    return Err(Error::Token);
                }
                self.state = State::MethodSp;
                return Ok(Token::new(Kind::Method, &input[start..i], i, false));
            }
            if !is_tchar(c) {
                return Err(Error::Token);
            }
            i += 1;
        }

        // Input ran out mid-method.
        self.in_token = true;
        Ok(Token::new(Kind::Method, &input[start..], input.len(), true))
    }

    fn lex_url<'a>(&mut self, input: &'a [u8], start: usize) -> Result<Token<'a>> {
        let mut i = start;

        while i < input.len() {
            let c = input[i];
            if c == b' ' {
                if i == start && !self.in_token {
                    return Err(Error::Url);
                }
                self.state = State::UrlSp;
                return Ok(Token::new(Kind::Url, &input[start..i], i, false));
            }
            if !is_url_char(c) {
                return Err(Error::Url);
            }
            i += 1;
        }

        self.in_token = true;
        Ok(Token::new(Kind::Url, &input[start..], input.len(), true))
    }

    fn lex_field<'a>(&mut self, input: &'a [u8], start: usize) -> Result<Token<'a>> {
        let mut i = start;

        while i < input.len() {
            let c = input[i];
            if c == b':' {
                if i == start && !self.in_token {
                    return Err(Error::Token);
                }
                if !self.in_trailers {
                    self.probe = ValueProbe::for_header(self.names.matched());
                }
                self.state = State::FieldColon;
                return Ok(Token::new(Kind::Field, &input[start..i], i, false));
            }
            if !is_tchar(c) {
                return Err(Error::Token);
            }
            if !self.in_trailers {
                self.names.push(c);
            }
            i += 1;
        }

        self.in_token = true;
        Ok(Token::new(Kind::Field, &input[start..], input.len(), true))
    }

    fn lex_value<'a>(&mut self, input: &'a [u8], start: usize) -> Result<Token<'a>> {
        let mut i = start;
        // Span end with trailing whitespace excluded.
        let mut end = start;

        while i < input.len() {
            let c = input[i];
            if c == b'\r' {
                let probe = self.probe;
                self.probe = ValueProbe::None;
                probe.finish(&mut self.info)?;
                self.state = State::ValueCr;
                return Ok(Token::new(Kind::Value, &input[start..end], end, false));
            }
            if !is_value_char(c) {
                return Err(Error::HeaderValue);
            }
            self.probe.push(c)?;
            if !is_ows(c) {
                end = i + 1;
            }
            i += 1;
        }

        // Input ran out mid-value. Hold trailing whitespace back: it is
        // skipped if the value ends here, re-presented and included if
        // the value continues.
        if end == start {
            return Ok(Token::marker(Kind::Again, input, start));
        }
        self.in_token = true;
        Ok(Token::new(Kind::Value, &input[start..end], end, true))
    }

    fn lex_body<'a>(&mut self, input: &'a [u8], start: usize) -> Result<Token<'a>> {
        let avail = (input.len() - start) as u64;
        let n = avail.min(self.remaining);
        self.remaining -= n;

        if self.remaining == 0 {
            self.state = State::MsgEnd;
        }

        let end = start + n as usize;
        Ok(Token::new(
            Kind::Body,
            &input[start..end],
            end,
            self.remaining > 0,
        ))
    }

    fn lex_chunk_data<'a>(&mut self, input: &'a [u8], start: usize, left: u64) -> Result<Token<'a>> {
        let avail = (input.len() - start) as u64;
        let n = avail.min(left);
        self.dechunker.take_data(n);

        let end = start + n as usize;
        Ok(Token::new(Kind::Body, &input[start..end], end, n < left))
    }
}

impl Default for Lexer {
    fn default() -> Self {
        Lexer::new()
    }
}
