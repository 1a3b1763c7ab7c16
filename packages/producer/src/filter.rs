/// Separates decoded frames from the banner and status lines the decoder
/// writes to the same stream.
#[derive(Debug, Clone)]
pub struct FrameFilter {
    prefixes: Vec<String>,
}

impl FrameFilter {
    pub fn new(prefixes: Vec<String>) -> Self {
        Self { prefixes }
    }

    /// The trimmed frame, or `None` for blank and diagnostic lines.
    pub fn accept<'a>(&self, line: &'a str) -> Option<&'a str> {
        let line = line.trim();
        if line.is_empty() || self.prefixes.iter().any(|p| line.starts_with(p.as_str())) {
            return None;
        }
        Some(line)
    }
}
