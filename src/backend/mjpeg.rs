//! Frame counting for `multipart/x-mixed-replace` image streams.

/// Boundary used by the backend when the header does not announce one.
pub const DEFAULT_BOUNDARY: &str = "frame";

/// Extract the `boundary` parameter from a multipart Content-Type header.
pub fn boundary_from_content_type(value: &str) -> Option<String> {
    value
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(k, _)| k.trim().eq_ignore_ascii_case("boundary"))
        .map(|(_, v)| v.trim().trim_matches('"').to_string())
        .filter(|b| !b.is_empty())
}

/// Counts multipart parts as body chunks arrive. Delimiters split across
/// chunk edges are still counted once.
pub struct FrameCounter {
    delimiter: Vec<u8>,
    carry: Vec<u8>,
    frames: u64,
    bytes: u64,
}

impl FrameCounter {
    pub fn new(boundary: &str) -> Self {
        Self {
            delimiter: format!("--{boundary}").into_bytes(),
            carry: Vec::new(),
            frames: 0,
            bytes: 0,
        }
    }

    /// Feed a chunk; returns the number of frames it completed.
    pub fn push(&mut self, chunk: &[u8]) -> u64 {
        self.bytes += chunk.len() as u64;
        let mut buf = std::mem::take(&mut self.carry);
        buf.extend_from_slice(chunk);

        let needle = self.delimiter.as_slice();
        let mut found = 0u64;
        let mut pos = 0usize;
        while pos + needle.len() <= buf.len() {
            if &buf[pos..pos + needle.len()] == needle {
                found += 1;
                pos += needle.len();
            } else {
                pos += 1;
            }
        }

        // Keep at most delimiter-1 trailing bytes that could start a delimiter.
        let keep_from = pos.max(buf.len().saturating_sub(needle.len() - 1));
        self.carry = buf[keep_from..].to_vec();
        self.frames += found;
        found
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }
}
