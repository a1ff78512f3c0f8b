//! Credential extraction from a packet's textual dump.
//!
//! Pure substring heuristic over whitespace-separated tokens: it misses values split
//! across token boundaries and reports unrelated tokens that happen to contain a
//! marker. No protocol parsing happens here.

use std::fmt;

/// Marker of an RTMP server URL.
pub const SERVER_MARKER: &str = "rtmp://";

/// Marker of a stream key.
pub const STREAM_KEY_MARKER: &str = "stream-";

/// Tokens found in one packet. Either side may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub server: Option<String>,
    pub stream_key: Option<String>,
}

impl Extraction {
    pub fn is_empty(&self) -> bool {
        self.server.is_none() && self.stream_key.is_none()
    }

    /// Found tokens in reporting order: server first, then stream key.
    pub fn into_credentials(self) -> impl Iterator<Item = Credential> {
        self.server
            .map(Credential::Server)
            .into_iter()
            .chain(self.stream_key.map(Credential::StreamKey))
    }
}

/// A single discovery reported by the capture loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Server(String),
    StreamKey(String),
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Server(s) => write!(f, "Server: {s}"),
            Credential::StreamKey(k) => write!(f, "Stream key: {k}"),
        }
    }
}

/// First whitespace-delimited token of `text` containing `marker`.
pub fn find_token<'a>(text: &'a str, marker: &str) -> Option<&'a str> {
    text.split_whitespace().find(|token| token.contains(marker))
}

pub fn extract(text: &str) -> Extraction {
    let server = find_token(text, SERVER_MARKER).map(str::to_string);
    let stream_key = find_token(text, STREAM_KEY_MARKER)
        .map(|token| token.trim_matches('"'))
        .filter(|key| !key.is_empty())
        .map(str::to_string);
    Extraction { server, stream_key }
}
