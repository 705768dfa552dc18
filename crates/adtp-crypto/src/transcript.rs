//! Deterministic transcript builder for signing.
//!
//! Appends (tag, len, bytes) tuples so the same logical data hashes the
//! same everywhere, with a domain separator up front.

use bytes::{BufMut, BytesMut};

use crate::hash::sha256;

#[derive(Clone, Debug)]
pub struct Transcript {
    buf: BytesMut,
}

impl Transcript {
    pub fn new(domain: &'static str) -> Self {
        let mut t = Self {
            buf: BytesMut::with_capacity(256),
        };
        t.append_bytes(0, domain.as_bytes());
        t
    }

    pub fn append_bytes(&mut self, tag: u32, data: &[u8]) -> &mut Self {
        self.buf.put_u32(tag);
        self.buf.put_u32(data.len() as u32);
        self.buf.extend_from_slice(data);
        self
    }

    pub fn append_str(&mut self, tag: u32, s: &str) -> &mut Self {
        self.append_bytes(tag, s.as_bytes())
    }

    pub fn append_u64(&mut self, tag: u32, v: u64) -> &mut Self {
        self.buf.put_u32(tag);
        self.buf.put_u32(8);
        self.buf.put_u64(v);
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// SHA-256 of the transcript contents.
    pub fn finalize(&self) -> [u8; 32] {
        sha256(&self.buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn determinism() {
        let mut t1 = Transcript::new("adtp_test");
        t1.append_bytes(1, b"hello").append_u64(2, 42);
        let mut t2 = Transcript::new("adtp_test");
        t2.append_bytes(1, b"hello").append_u64(2, 42);
        assert_eq!(t1.finalize(), t2.finalize());
    }

    #[test]
    fn domain_separation() {
        let mut t1 = Transcript::new("domain_a");
        t1.append_bytes(1, b"data");
        let mut t2 = Transcript::new("domain_b");
        t2.append_bytes(1, b"data");
        assert_ne!(t1.finalize(), t2.finalize());
    }

    #[test]
    fn append_order_matters() {
        let mut t1 = Transcript::new("adtp_test");
        t1.append_str(1, "first").append_str(2, "second");
        let mut t2 = Transcript::new("adtp_test");
        t2.append_str(2, "second").append_str(1, "first");
        assert_ne!(t1.finalize(), t2.finalize());
    }

    #[test]
    fn length_framing_prevents_ambiguity() {
        // "ab" + "c" must not hash like "a" + "bc".
        let mut t1 = Transcript::new("adtp_test");
        t1.append_bytes(1, b"ab").append_bytes(1, b"c");
        let mut t2 = Transcript::new("adtp_test");
        t2.append_bytes(1, b"a").append_bytes(1, b"bc");
        assert_ne!(t1.finalize(), t2.finalize());
    }
}
