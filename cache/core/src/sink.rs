//! Sinks receive the value produced by a get.
//!
//! A caller expresses how the value should be materialized by handing the
//! engine a sink: into an owning byte buffer, into a string, into a decoded
//! wire message, or back into a [`ByteView`]. Loaders must call one of the
//! `set_*` methods on success; the engine then freezes the sink into a view
//! for caching.
//!
//! Calling a set method more than once is tolerated; the last call wins.
//! View-capable sinks override [`Sink::set_view`] so that values already
//! held as views skip the byte copy.

use protocol_wire::{Encode, Message};

use crate::{ByteView, Error};

/// Receiver for the value of a get.
pub trait Sink: Send {
    /// Set the value to the given string.
    fn set_string(&mut self, s: &str) -> Result<(), Error>;

    /// Set the value to a copy of the given bytes.
    fn set_bytes(&mut self, b: &[u8]) -> Result<(), Error>;

    /// Set the value to the encoded form of a wire message.
    fn set_proto(&mut self, m: &dyn Encode) -> Result<(), Error> {
        self.set_bytes(&m.encode_to_vec())
    }

    /// Set the value from a view.
    ///
    /// The default forwards to [`Sink::set_bytes`]; sinks that can hold a
    /// view directly override this to skip the copy.
    fn set_view(&mut self, v: ByteView) -> Result<(), Error> {
        self.set_bytes(v.as_slice())
    }

    /// A frozen view of the received bytes, used for caching.
    ///
    /// Freezing a sink that was never set yields an empty view.
    fn freeze(&self) -> Result<ByteView, Error>;
}

/// Sink that fills a caller-provided [`ByteView`] slot.
pub struct ByteViewSink<'a> {
    dst: &'a mut ByteView,
}

impl<'a> ByteViewSink<'a> {
    pub fn new(dst: &'a mut ByteView) -> Self {
        Self { dst }
    }
}

impl Sink for ByteViewSink<'_> {
    fn set_string(&mut self, s: &str) -> Result<(), Error> {
        *self.dst = ByteView::from(s);
        Ok(())
    }

    fn set_bytes(&mut self, b: &[u8]) -> Result<(), Error> {
        *self.dst = ByteView::from(b);
        Ok(())
    }

    fn set_view(&mut self, v: ByteView) -> Result<(), Error> {
        *self.dst = v;
        Ok(())
    }

    fn freeze(&self) -> Result<ByteView, Error> {
        Ok(self.dst.clone())
    }
}

/// Sink that allocates a byte vector to hold the received value.
///
/// The destination is a defensive copy; the frozen view does not alias it.
pub struct AllocatingByteSink<'a> {
    dst: &'a mut Vec<u8>,
    view: ByteView,
}

impl<'a> AllocatingByteSink<'a> {
    pub fn new(dst: &'a mut Vec<u8>) -> Self {
        Self {
            dst,
            view: ByteView::default(),
        }
    }
}

impl Sink for AllocatingByteSink<'_> {
    fn set_string(&mut self, s: &str) -> Result<(), Error> {
        *self.dst = s.as_bytes().to_vec();
        self.view = ByteView::from(s);
        Ok(())
    }

    fn set_bytes(&mut self, b: &[u8]) -> Result<(), Error> {
        *self.dst = b.to_vec();
        self.view = ByteView::from(b);
        Ok(())
    }

    fn set_view(&mut self, v: ByteView) -> Result<(), Error> {
        *self.dst = v.to_vec();
        self.view = v;
        Ok(())
    }

    fn freeze(&self) -> Result<ByteView, Error> {
        Ok(self.view.clone())
    }
}

/// Sink that fills a caller-provided string.
///
/// Unlike byte sinks, a string sink rejects values that are not valid
/// UTF-8.
pub struct StringSink<'a> {
    dst: &'a mut String,
    view: ByteView,
}

impl<'a> StringSink<'a> {
    pub fn new(dst: &'a mut String) -> Self {
        Self {
            dst,
            view: ByteView::default(),
        }
    }
}

impl Sink for StringSink<'_> {
    fn set_string(&mut self, s: &str) -> Result<(), Error> {
        *self.dst = s.to_string();
        self.view = ByteView::from(s);
        Ok(())
    }

    fn set_bytes(&mut self, b: &[u8]) -> Result<(), Error> {
        let s = std::str::from_utf8(b)
            .map_err(|_| Error::Sink("string sink requires utf-8".to_string()))?;
        self.set_string(s)
    }

    fn freeze(&self) -> Result<ByteView, Error> {
        Ok(self.view.clone())
    }
}

/// Sink that writes at most the destination's current length.
///
/// Extra bytes are silently truncated; if fewer bytes arrive than the
/// destination holds, it is shrunk to fit. The frozen view always covers
/// the full value.
pub struct TruncatingByteSink<'a> {
    dst: &'a mut Vec<u8>,
    view: ByteView,
}

impl<'a> TruncatingByteSink<'a> {
    pub fn new(dst: &'a mut Vec<u8>) -> Self {
        Self {
            dst,
            view: ByteView::default(),
        }
    }
}

impl Sink for TruncatingByteSink<'_> {
    fn set_string(&mut self, s: &str) -> Result<(), Error> {
        let n = self.dst.len().min(s.len());
        self.dst[..n].copy_from_slice(&s.as_bytes()[..n]);
        self.dst.truncate(n);
        self.view = ByteView::from(s);
        Ok(())
    }

    fn set_bytes(&mut self, b: &[u8]) -> Result<(), Error> {
        let n = self.dst.len().min(b.len());
        self.dst[..n].copy_from_slice(&b[..n]);
        self.dst.truncate(n);
        self.view = ByteView::from(b);
        Ok(())
    }

    fn freeze(&self) -> Result<ByteView, Error> {
        Ok(self.view.clone())
    }
}

/// Sink that decodes the received bytes into a wire message.
pub struct ProtoSink<'a, M: Message> {
    dst: &'a mut M,
    view: ByteView,
}

impl<'a, M: Message> ProtoSink<'a, M> {
    pub fn new(dst: &'a mut M) -> Self {
        Self {
            dst,
            view: ByteView::default(),
        }
    }
}

impl<M: Message + Send> Sink for ProtoSink<'_, M> {
    fn set_string(&mut self, s: &str) -> Result<(), Error> {
        self.set_bytes(s.as_bytes())
    }

    fn set_bytes(&mut self, b: &[u8]) -> Result<(), Error> {
        *self.dst = M::decode(b).map_err(Error::decode)?;
        self.view = ByteView::from(b);
        Ok(())
    }

    fn set_proto(&mut self, m: &dyn Encode) -> Result<(), Error> {
        self.set_bytes(&m.encode_to_vec())
    }

    fn freeze(&self) -> Result<ByteView, Error> {
        Ok(self.view.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol_wire::GetRequest;

    #[test]
    fn test_byte_view_sink_fast_path() {
        let mut dst = ByteView::default();
        let mut sink = ByteViewSink::new(&mut dst);
        sink.set_view(ByteView::from("shared")).unwrap();
        assert_eq!(sink.freeze().unwrap(), "shared");
        assert_eq!(dst, "shared");
    }

    #[test]
    fn test_allocating_sink_copies() {
        let mut dst = Vec::new();
        let mut sink = AllocatingByteSink::new(&mut dst);
        sink.set_bytes(b"value").unwrap();
        let view = sink.freeze().unwrap();
        assert_eq!(view, "value");

        // Mutating the destination must not affect the frozen view.
        dst[0] = b'X';
        assert_eq!(view, "value");
    }

    #[test]
    fn test_string_sink() {
        let mut dst = String::new();
        let mut sink = StringSink::new(&mut dst);
        sink.set_string("hello").unwrap();
        assert_eq!(sink.freeze().unwrap(), "hello");
        assert_eq!(dst, "hello");
    }

    #[test]
    fn test_string_sink_rejects_invalid_utf8() {
        let mut dst = String::new();
        let mut sink = StringSink::new(&mut dst);
        assert!(sink.set_bytes(&[0xFF, 0xFE]).is_err());
    }

    #[test]
    fn test_truncating_sink_truncates() {
        let mut dst = vec![0u8; 3];
        let mut sink = TruncatingByteSink::new(&mut dst);
        sink.set_bytes(b"abcdef").unwrap();
        // The destination holds the prefix, the view the whole value.
        assert_eq!(sink.freeze().unwrap(), "abcdef");
        assert_eq!(dst, b"abc");
    }

    #[test]
    fn test_truncating_sink_shrinks() {
        let mut dst = vec![0u8; 10];
        let mut sink = TruncatingByteSink::new(&mut dst);
        sink.set_bytes(b"ab").unwrap();
        drop(sink);
        assert_eq!(dst, b"ab");
    }

    #[test]
    fn test_proto_sink_decodes() {
        let mut dst = GetRequest::default();
        let mut sink = ProtoSink::new(&mut dst);
        let msg = GetRequest::new("colors", "apple");
        sink.set_proto(&msg).unwrap();

        let frozen = sink.freeze().unwrap();
        assert_eq!(frozen, msg.encode_to_vec().as_slice());
        assert_eq!(dst, msg);
    }

    #[test]
    fn test_proto_sink_rejects_garbage() {
        let mut dst = GetRequest::default();
        let mut sink = ProtoSink::new(&mut dst);
        assert!(sink.set_bytes(&[0x0A]).is_err());
    }

    #[test]
    fn test_multiple_sets_last_wins() {
        let mut dst = Vec::new();
        let mut sink = AllocatingByteSink::new(&mut dst);
        sink.set_bytes(b"first").unwrap();
        sink.set_bytes(b"second").unwrap();
        assert_eq!(sink.freeze().unwrap(), "second");
        assert_eq!(dst, b"second");
    }

    #[test]
    fn test_unset_sink_freezes_empty() {
        let mut dst = Vec::new();
        let sink = AllocatingByteSink::new(&mut dst);
        assert_eq!(sink.freeze().unwrap(), ByteView::default());
    }
}
