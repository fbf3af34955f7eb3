//! Accumulation buffer with streaming-safe UTF-8 decoding.
//!
//! Fragments arrive at arbitrary byte boundaries, so a multi-byte sequence
//! can be split across two fragments. The undecoded tail is carried over and
//! prepended to the next fragment instead of being decoded to replacement
//! characters. Only genuinely invalid bytes become U+FFFD.

/// Mutable ordered text owned by one ingestion controller.
///
/// Grows by appending decoded fragments; shrinks by consuming a dispatched
/// leading span or by a bounded backpressure trim.
#[derive(Debug, Default)]
pub struct RecordBuffer {
    text: String,
    /// Undecoded trailing bytes of a split multi-byte sequence (at most 3).
    carry: Vec<u8>,
}

impl RecordBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `fragment` and append it to the buffer, carrying any trailing
    /// partial multi-byte sequence over to the next call.
    pub fn push_bytes(&mut self, fragment: &[u8]) {
        if self.carry.is_empty() {
            self.append_decoded(fragment);
        } else {
            let mut stitched = std::mem::take(&mut self.carry);
            stitched.extend_from_slice(fragment);
            self.append_decoded(&stitched);
        }
    }

    fn append_decoded(&mut self, mut bytes: &[u8]) {
        loop {
            match std::str::from_utf8(bytes) {
                Ok(s) => {
                    self.text.push_str(s);
                    return;
                }
                Err(e) => {
                    let (head, rest) = bytes.split_at(e.valid_up_to());
                    if let Ok(s) = std::str::from_utf8(head) {
                        self.text.push_str(s);
                    }
                    match e.error_len() {
                        // Truncated sequence at the end: keep it for the
                        // next fragment.
                        None => {
                            self.carry = rest.to_vec();
                            return;
                        }
                        // Invalid bytes mid-stream: replace and keep going.
                        Some(len) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            bytes = &rest[len..];
                        }
                    }
                }
            }
        }
    }

    /// Remove and return the leading span through byte index `end` inclusive.
    /// `end` must fall on a char boundary (the scanner only returns indices
    /// of ASCII `}`).
    pub fn consume_through(&mut self, end: usize) -> String {
        self.text.drain(..=end).collect()
    }

    /// Backpressure trim: drop the oldest bytes so at most `keep` bytes
    /// remain. Lossy - any record boundary in the discarded prefix is gone.
    /// The cut is advanced to the next char boundary.
    pub fn trim_to_tail(&mut self, keep: usize) {
        if self.text.len() <= keep {
            return;
        }
        let mut cut = self.text.len() - keep;
        while !self.text.is_char_boundary(cut) {
            cut += 1;
        }
        self.text.drain(..cut);
    }

    /// Take everything left, including a trailing partial sequence (decoded
    /// to U+FFFD since no further bytes can complete it).
    pub fn take_remaining(&mut self) -> String {
        if !self.carry.is_empty() {
            self.carry.clear();
            self.text.push(char::REPLACEMENT_CHARACTER);
        }
        std::mem::take(&mut self.text)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.carry.is_empty()
    }
}
