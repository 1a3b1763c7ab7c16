use serde::{Deserialize, Serialize};

/// Positions of the interesting fields in a pipe-delimited decoder frame.
///
/// Decoder versions disagree on where capcodes and body live, so the
/// layout is configurable. The default matches the most common
/// multimon-ng output: `PROTO|timestamp|..|..|capcodes|body...`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameLayout {
    /// Frames with fewer fields are kept as minimal records. Default: 6.
    #[serde(default = "default_min_fields")]
    pub min_fields: usize,
    /// Index of the decoder timestamp. Default: 1.
    #[serde(default = "default_timestamp_field")]
    pub timestamp_field: usize,
    /// Index of the whitespace-separated capcode list. Default: 4.
    #[serde(default = "default_capcode_field")]
    pub capcode_field: usize,
    /// Index of the first body field; the rest is rejoined with `|`. Default: 5.
    #[serde(default = "default_body_start")]
    pub body_start: usize,
}

fn default_min_fields() -> usize {
    6
}
fn default_timestamp_field() -> usize {
    1
}
fn default_capcode_field() -> usize {
    4
}
fn default_body_start() -> usize {
    5
}

impl Default for FrameLayout {
    fn default() -> Self {
        Self {
            min_fields: default_min_fields(),
            timestamp_field: default_timestamp_field(),
            capcode_field: default_capcode_field(),
            body_start: default_body_start(),
        }
    }
}

/// Structured candidate record produced from one decoder line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFrame {
    /// The line exactly as received. Business key for deduplication.
    pub raw: String,
    pub timestamp: Option<String>,
    pub priority: Option<String>,
    pub grip: Option<u8>,
    /// Recipient addresses in frame order.
    pub capcodes: Vec<String>,
    pub body: Option<String>,
    /// Set when the line did not fit the layout and was kept whole.
    pub minimal: bool,
}

impl ParsedFrame {
    /// Record kept for frames that do not match the layout: the whole line
    /// becomes the body and nothing is derived.
    pub fn minimal(line: &str) -> Self {
        Self {
            raw: line.to_string(),
            body: Some(line.to_string()),
            minimal: true,
            ..Default::default()
        }
    }

    /// Whether this record came out of the minimal fallback.
    pub fn is_minimal(&self) -> bool {
        self.minimal
    }
}

/// Parse one decoder line. Never fails: anything that does not fit the
/// layout degrades to [`ParsedFrame::minimal`].
pub fn parse_frame(line: &str, layout: &FrameLayout) -> ParsedFrame {
    let fields: Vec<&str> = line.split('|').collect();
    if fields.len() < layout.min_fields {
        return ParsedFrame::minimal(line);
    }

    let (Some(timestamp), Some(capcodes), Some(body)) = (
        fields.get(layout.timestamp_field),
        fields.get(layout.capcode_field),
        fields.get(layout.body_start..),
    ) else {
        return ParsedFrame::minimal(line);
    };

    ParsedFrame {
        raw: line.to_string(),
        timestamp: non_empty(timestamp),
        priority: None,
        grip: None,
        capcodes: capcodes.split_whitespace().map(str::to_string).collect(),
        body: non_empty(&body.join("|")),
        minimal: false,
    }
}

/// Fields are kept verbatim; only a field with no text at all is absent.
fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}
