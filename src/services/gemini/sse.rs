// src/services/gemini/sse.rs
use bytes::{Buf, BytesMut};

/// Reassembles Server-Sent Events `data:` payloads from arbitrarily split
/// network chunks.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: BytesMut,
    // Bytes of `buffer` already known to hold no newline.
    scanned: usize,
}

impl SseDecoder {
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(offset) = self.buffer[self.scanned..].iter().position(|b| *b == b'\n') {
            let line = self.buffer.split_to(self.scanned + offset + 1);
            self.scanned = 0;
            if let Some(payload) = data_payload(&line) {
                payloads.push(payload);
            }
        }
        self.scanned = self.buffer.len();
        payloads
    }

    /// Returns a trailing `data:` line that never got its newline.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = self.buffer.split();
        self.scanned = 0;
        data_payload(rest.chunk())
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim_end_matches(['\n', '\r']);
    let payload = line.strip_prefix("data:")?.trim_start();
    if payload.is_empty() {
        None
    } else {
        Some(payload.to_string())
    }
}
