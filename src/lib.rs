//! Incremental, zero-copy lexer for HTTP/1.1 request streams.
//!
//! hlex consumes arbitrarily fragmented request bytes, as they arrive
//! from a transport, and emits typed tokens pointing back into the
//! caller's buffer. It never allocates, copies or buffers input: the
//! lexer state is a small struct, and "suspension" is the caller
//! re-entering [`Lexer::step`] with more bytes.
//!
//! # In scope:
//!
//! * Request line, header and trailer tokenization
//! * Message framing: content-length, transfer-encoding: chunked,
//!   keep-alive and protocol upgrades
//! * Pipelined requests on one connection
//!
//! # Out of scope:
//!
//! * Opening/closing sockets and reading from them
//! * Response parsing
//! * Header semantics beyond framing (cookies, content types, ...)
//! * Validating request targets beyond the grammar
//!
//! ```
//! use hlex::{Kind, Lexer};
//!
//! let mut lexer = Lexer::new();
//! let mut buf: &[u8] = b"GET /hello HTTP/1.1\r\nHost: example.com\r\n\r\n";
//!
//! loop {
//!     let token = lexer.step(buf).unwrap();
//!
//!     if token.kind() == Kind::Method {
//!         assert_eq!(token.data(), b"GET");
//!     }
//!
//!     buf = &buf[token.input_used()..];
//!
//!     if token.kind() == Kind::MsgEnd {
//!         break;
//!     }
//! }
//! ```

#![no_std]
#![forbid(unsafe_code)]
#![warn(clippy::all)]
#![allow(clippy::uninlined_format_args)]
#![deny(missing_docs)]

#[cfg(feature = "std")]
extern crate std;

#[macro_use]
extern crate log;

mod error;
pub use error::{Error, Result};

mod chunk;
mod util;

mod header;
pub use header::BodyMode;

mod token;
pub use token::{Kind, Token};

mod lexer;
pub use lexer::Lexer;
