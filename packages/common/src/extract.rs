use std::sync::LazyLock;

use regex::Regex;

use crate::frame::ParsedFrame;

static PRIORITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b([AB]?[1-3]|PRIO ?[1-5]|P ?[1-5])\b").expect("valid priority pattern")
});

static GRIP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bGRIP ?([1-4])\b").expect("valid grip pattern"));

/// Find the first priority token in `body`, normalized to uppercase
/// without internal whitespace (`"p 2"` becomes `"P2"`).
pub fn extract_priority(body: &str) -> Option<String> {
    PRIORITY_RE.captures(body).map(|caps| {
        caps[1]
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_uppercase()
    })
}

/// Find the first GRIP response grade (1-4) in `body`.
pub fn extract_grip(body: &str) -> Option<u8> {
    GRIP_RE
        .captures(body)
        .and_then(|caps| caps[1].parse().ok())
}

/// Derive priority and GRIP from the body, only where the record does not
/// already carry a value.
pub fn fill_missing(frame: &mut ParsedFrame) {
    let Some(body) = frame.body.as_deref() else {
        return;
    };

    if frame.priority.is_none() {
        frame.priority = extract_priority(body);
    }
    if frame.grip.is_none() {
        frame.grip = extract_grip(body);
    }
}
