#![allow(dead_code)]

use core::mem;

use hlex::{Kind, Lexer};

/// One expected request, in the shape of a captured wire exchange.
#[derive(Debug)]
pub struct Message {
    pub raw: &'static [u8],
    pub method: &'static str,
    pub url: &'static str,
    pub version: (u8, u8),
    /// Headers and trailers, in wire order.
    pub headers: &'static [(&'static str, &'static str)],
    pub body: &'static [u8],
    pub keep_alive: bool,
    pub upgrade: Option<&'static [u8]>,
}

/// Everything collected from one message's token stream.
#[derive(Debug, Default)]
pub struct Collected {
    pub method: Vec<u8>,
    pub url: Vec<u8>,
    pub headers: Vec<(Vec<u8>, Vec<u8>)>,
    pub body: Vec<u8>,
    pub header_ends: usize,
}

#[derive(Debug)]
pub struct Driven {
    pub lexer: Lexer,
    pub msgs: Vec<Collected>,
    pub upgrade: Vec<u8>,
    pub eof: bool,
}

/// Feed `raw` to a fresh lexer the way a server would: present the
/// unconsumed window, and fetch `chunk` more bytes whenever the lexer
/// asks for input. Collect the token stream per message.
pub fn drive(raw: &[u8], chunk: usize) -> Driven {
    let mut lexer = Lexer::new();
    let mut msgs: Vec<Collected> = Vec::new();
    let mut cur = Collected::default();
    let mut field: Vec<u8> = Vec::new();
    let mut value: Vec<u8> = Vec::new();
    let mut upgrade: Vec<u8> = Vec::new();
    let mut eof = false;

    let mut consumed = 0;
    let mut fetched = chunk.min(raw.len());
    let mut steps = 0;

    loop {
        steps += 1;
        assert!(steps <= 8 * raw.len() + 64, "lexer stalled");

        let buf = &raw[consumed..fetched];
        let token = lexer.step(buf).unwrap();

        // Spans always point into the presented buffer.
        assert!(token.input_used() <= buf.len());
        if !token.data().is_empty() {
            let lo = buf.as_ptr() as usize;
            let start = token.data().as_ptr() as usize;
            assert!(start >= lo && start + token.data().len() <= lo + buf.len());
        }

        consumed += token.input_used();

        match token.kind() {
            Kind::MsgStart => cur = Collected::default(),
            Kind::Method => cur.method.extend_from_slice(token.data()),
            Kind::Url => cur.url.extend_from_slice(token.data()),
            Kind::Field => field.extend_from_slice(token.data()),
            Kind::Value => {
                value.extend_from_slice(token.data());
                if !token.is_partial() {
                    cur.headers
                        .push((mem::take(&mut field), mem::take(&mut value)));
                }
            }
            Kind::HeaderEnd => cur.header_ends += 1,
            Kind::Body => {
                assert_eq!(cur.header_ends, 1, "body before header end");
                cur.body.extend_from_slice(token.data());
            }
            Kind::MsgEnd => {
                assert_eq!(cur.header_ends, 1);
                msgs.push(mem::take(&mut cur));
            }
            Kind::Again => {
                if fetched == raw.len() {
                    break;
                }
                fetched = fetched.saturating_add(chunk).min(raw.len());
            }
            Kind::Eof => {
                eof = true;
                upgrade.extend_from_slice(token.data());
                if fetched == raw.len() {
                    break;
                }
                fetched = fetched.saturating_add(chunk).min(raw.len());
            }
        }
    }

    Driven {
        lexer,
        msgs,
        upgrade,
        eof,
    }
}

/// Lex `msg.raw` in `chunk`-sized deliveries and compare the token
/// stream against the expectations.
pub fn check(msg: &Message, chunk: usize) {
    let d = drive(msg.raw, chunk);

    assert_eq!(d.msgs.len(), 1, "chunk={}", chunk);
    let got = &d.msgs[0];

    assert_eq!(got.method, msg.method.as_bytes(), "chunk={}", chunk);
    assert_eq!(got.url, msg.url.as_bytes(), "chunk={}", chunk);
    assert_eq!(got.headers.len(), msg.headers.len(), "chunk={}", chunk);
    for (i, (name, value)) in msg.headers.iter().enumerate() {
        assert_eq!(got.headers[i].0, name.as_bytes(), "chunk={}", chunk);
        assert_eq!(got.headers[i].1, value.as_bytes(), "chunk={}", chunk);
    }
    assert_eq!(got.body, msg.body, "chunk={}", chunk);

    assert_eq!(d.lexer.version_major(), msg.version.0);
    assert_eq!(d.lexer.version_minor(), msg.version.1);

    match msg.upgrade {
        Some(payload) => {
            assert!(d.eof);
            assert_eq!(d.upgrade, payload, "chunk={}", chunk);
        }
        None => {
            assert_eq!(d.lexer.is_keep_alive(), msg.keep_alive);
            // A closing message ends in EOF, a keep-alive one in AGAIN.
            assert_eq!(d.eof, !msg.keep_alive, "chunk={}", chunk);
        }
    }
}

pub static CURL_GET: Message = Message {
    raw: b"GET /test HTTP/1.1\r\n\
        User-Agent: curl/7.18.0 (i486-pc-linux-gnu) libcurl/7.18.0 OpenSSL/0.9.8g zlib/1.2.3.3 libidn/1.1\r\n\
        Host: 0.0.0.0=5000\r\n\
        Accept: */*\r\n\
        \r\n",
    method: "GET",
    url: "/test",
    version: (1, 1),
    headers: &[
        (
            "User-Agent",
            "curl/7.18.0 (i486-pc-linux-gnu) libcurl/7.18.0 OpenSSL/0.9.8g zlib/1.2.3.3 libidn/1.1",
        ),
        ("Host", "0.0.0.0=5000"),
        ("Accept", "*/*"),
    ],
    body: b"",
    keep_alive: true,
    upgrade: None,
};

pub static FIREFOX_GET: Message = Message {
    raw: b"GET /favicon.ico HTTP/1.1\r\n\
        Host: 0.0.0.0=5000\r\n\
        User-Agent: Mozilla/5.0 (X11; U; Linux i686; en-US; rv:1.9) Gecko/2008061015 Firefox/3.0\r\n\
        Accept: text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8\r\n\
        Accept-Language: en-us,en;q=0.5\r\n\
        Accept-Encoding: gzip,deflate\r\n\
        Accept-Charset: ISO-8859-1,utf-8;q=0.7,*;q=0.7\r\n\
        Keep-Alive: 300\r\n\
        Connection: keep-alive\r\n\
        \r\n",
    method: "GET",
    url: "/favicon.ico",
    version: (1, 1),
    headers: &[
        ("Host", "0.0.0.0=5000"),
        (
            "User-Agent",
            "Mozilla/5.0 (X11; U; Linux i686; en-US; rv:1.9) Gecko/2008061015 Firefox/3.0",
        ),
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        ),
        ("Accept-Language", "en-us,en;q=0.5"),
        ("Accept-Encoding", "gzip,deflate"),
        ("Accept-Charset", "ISO-8859-1,utf-8;q=0.7,*;q=0.7"),
        ("Keep-Alive", "300"),
        ("Connection", "keep-alive"),
    ],
    body: b"",
    keep_alive: true,
    upgrade: None,
};

pub static POST_IDENTITY: Message = Message {
    raw: b"POST /post_identity_body_world?q=search#hey HTTP/1.1\r\n\
        Accept: */*\r\n\
        Content-Length: 5\r\n\
        \r\n\
        World",
    method: "POST",
    url: "/post_identity_body_world?q=search#hey",
    version: (1, 1),
    headers: &[("Accept", "*/*"), ("Content-Length", "5")],
    body: b"World",
    keep_alive: true,
    upgrade: None,
};

pub static POST_CHUNKED: Message = Message {
    raw: b"POST /post_chunked_all_your_base HTTP/1.1\r\n\
        Transfer-Encoding: chunked\r\n\
        \r\n\
        1e\r\nall your base are belong to us\r\n\
        0\r\n\
        \r\n",
    method: "POST",
    url: "/post_chunked_all_your_base",
    version: (1, 1),
    headers: &[("Transfer-Encoding", "chunked")],
    body: b"all your base are belong to us",
    keep_alive: true,
    upgrade: None,
};

pub static CHUNKED_TRAILERS: Message = Message {
    raw: b"POST /chunked_w_trailing_headers HTTP/1.1\r\n\
        Transfer-Encoding: chunked\r\n\
        \r\n\
        5\r\nhello\r\n\
        6\r\n world\r\n\
        0\r\n\
        Vary: *\r\n\
        Content-Type: text/plain\r\n\
        \r\n",
    method: "POST",
    url: "/chunked_w_trailing_headers",
    version: (1, 1),
    headers: &[
        ("Transfer-Encoding", "chunked"),
        ("Vary", "*"),
        ("Content-Type", "text/plain"),
    ],
    body: b"hello world",
    keep_alive: true,
    upgrade: None,
};

pub static CHUNKED_EXTENSIONS: Message = Message {
    raw: b"POST /chunked_w_extensions HTTP/1.1\r\n\
        Transfer-Encoding: chunked\r\n\
        \r\n\
        5;someext=value\r\nhello\r\n\
        6\r\n world\r\n\
        0\r\n\
        \r\n",
    method: "POST",
    url: "/chunked_w_extensions",
    version: (1, 1),
    headers: &[("Transfer-Encoding", "chunked")],
    body: b"hello world",
    keep_alive: true,
    upgrade: None,
};

pub static UPGRADE_WEBSOCKET: Message = Message {
    raw: b"GET /demo HTTP/1.1\r\n\
        Host: example.com\r\n\
        Connection: Upgrade\r\n\
        Sec-WebSocket-Key2: 12998 5 Y3 1  .P00\r\n\
        Sec-WebSocket-Protocol: sample\r\n\
        Upgrade: WebSocket\r\n\
        Sec-WebSocket-Key1: 4 @1  46546xW%0l 1 5\r\n\
        Origin: http://example.com\r\n\
        \r\n\
        Hot diggity dogg",
    method: "GET",
    url: "/demo",
    version: (1, 1),
    headers: &[
        ("Host", "example.com"),
        ("Connection", "Upgrade"),
        ("Sec-WebSocket-Key2", "12998 5 Y3 1  .P00"),
        ("Sec-WebSocket-Protocol", "sample"),
        ("Upgrade", "WebSocket"),
        ("Sec-WebSocket-Key1", "4 @1  46546xW%0l 1 5"),
        ("Origin", "http://example.com"),
    ],
    body: b"",
    keep_alive: true,
    upgrade: Some(b"Hot diggity dogg"),
};

pub static HTTP10_GET: Message = Message {
    raw: b"GET /get_no_headers_no_body/world HTTP/1.0\r\n\r\n",
    method: "GET",
    url: "/get_no_headers_no_body/world",
    version: (1, 0),
    headers: &[],
    body: b"",
    keep_alive: false,
    upgrade: None,
};

pub static HTTP10_KEEPALIVE: Message = Message {
    raw: b"GET /keep HTTP/1.0\r\nConnection: keep-alive\r\n\r\n",
    method: "GET",
    url: "/keep",
    version: (1, 0),
    headers: &[("Connection", "keep-alive")],
    body: b"",
    keep_alive: true,
    upgrade: None,
};

pub static HTTP11_CLOSE: Message = Message {
    raw: b"GET /close HTTP/1.1\r\nConnection: close\r\n\r\n",
    method: "GET",
    url: "/close",
    version: (1, 1),
    headers: &[("Connection", "close")],
    body: b"",
    keep_alive: false,
    upgrade: None,
};

pub static CONTENT_LENGTH_ZERO: Message = Message {
    raw: b"POST /empty HTTP/1.1\r\nContent-Length: 0\r\n\r\n",
    method: "POST",
    url: "/empty",
    version: (1, 1),
    headers: &[("Content-Length", "0")],
    body: b"",
    keep_alive: true,
    upgrade: None,
};

pub static EMPTY_VALUE: Message = Message {
    raw: b"GET / HTTP/1.1\r\nX-Empty:\r\nHost: x\r\n\r\n",
    method: "GET",
    url: "/",
    version: (1, 1),
    headers: &[("X-Empty", ""), ("Host", "x")],
    body: b"",
    keep_alive: true,
    upgrade: None,
};

pub static PADDED_VALUE: Message = Message {
    raw: b"GET / HTTP/1.1\r\nPad: \t spaced out \t \r\nHost: x\r\n\r\n",
    method: "GET",
    url: "/",
    version: (1, 1),
    headers: &[("Pad", "spaced out"), ("Host", "x")],
    body: b"",
    keep_alive: true,
    upgrade: None,
};

pub static TE_OVERRIDES_CONTENT_LENGTH: Message = Message {
    raw: b"POST /smuggle HTTP/1.1\r\n\
        Content-Length: 9999\r\n\
        Transfer-Encoding: chunked\r\n\
        \r\n\
        3\r\nabc\r\n\
        0\r\n\
        \r\n",
    method: "POST",
    url: "/smuggle",
    version: (1, 1),
    headers: &[
        ("Content-Length", "9999"),
        ("Transfer-Encoding", "chunked"),
    ],
    body: b"abc",
    keep_alive: true,
    upgrade: None,
};

pub static TE_LIST: Message = Message {
    raw: b"POST /list HTTP/1.1\r\n\
        Transfer-Encoding: gzip, chunked\r\n\
        \r\n\
        3\r\nabc\r\n\
        0\r\n\
        \r\n",
    method: "POST",
    url: "/list",
    version: (1, 1),
    headers: &[("Transfer-Encoding", "gzip, chunked")],
    body: b"abc",
    keep_alive: true,
    upgrade: None,
};

pub static QUERY_URL: Message = Message {
    raw: b"GET /test.cgi?foo=bar?baz HTTP/1.1\r\n\r\n",
    method: "GET",
    url: "/test.cgi?foo=bar?baz",
    version: (1, 1),
    headers: &[],
    body: b"",
    keep_alive: true,
    upgrade: None,
};

pub static FIXTURES: &[&Message] = &[
    &CURL_GET,
    &FIREFOX_GET,
    &POST_IDENTITY,
    &POST_CHUNKED,
    &CHUNKED_TRAILERS,
    &CHUNKED_EXTENSIONS,
    &UPGRADE_WEBSOCKET,
    &HTTP10_GET,
    &HTTP10_KEEPALIVE,
    &HTTP11_CLOSE,
    &CONTENT_LENGTH_ZERO,
    &EMPTY_VALUE,
    &PADDED_VALUE,
    &TE_OVERRIDES_CONTENT_LENGTH,
    &TE_LIST,
    &QUERY_URL,
];
