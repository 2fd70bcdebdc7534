//! Fragment struct with typed accessors.
//!
//! Represents one parsed fragment: header plus blob. Uses `bytes::Bytes`
//! for zero-copy blob sharing between the parser and the reassembly
//! accumulator.

use bytes::{BufMut, Bytes, BytesMut};

use super::wire_format::{FragmentHeader, HEADER_LEN};

/// A complete protocol fragment.
#[derive(Debug, Clone)]
pub struct Fragment {
    /// Decoded header.
    pub header: FragmentHeader,
    /// Blob bytes (zero-copy via `bytes::Bytes`).
    pub blob: Bytes,
}

impl Fragment {
    /// Create a new fragment from header and blob.
    pub fn new(header: FragmentHeader, blob: Bytes) -> Self {
        Self { header, blob }
    }

    /// Get the object id.
    #[inline]
    pub fn object_id(&self) -> u64 {
        self.header.object_id
    }

    /// Get the fragment id.
    #[inline]
    pub fn fragment_id(&self) -> u64 {
        self.header.fragment_id
    }

    /// Check if this fragment opens an object.
    #[inline]
    pub fn is_start(&self) -> bool {
        self.header.is_start()
    }

    /// Check if this fragment closes an object.
    #[inline]
    pub fn is_end(&self) -> bool {
        self.header.is_end()
    }

    /// Get a reference to the blob bytes.
    #[inline]
    pub fn blob(&self) -> &[u8] {
        &self.blob
    }

    /// Blob length in bytes.
    #[inline]
    pub fn blob_len(&self) -> usize {
        self.blob.len()
    }

    /// Short hex rendering of the blob head for trace events.
    #[inline]
    pub fn blob_preview(&self) -> BlobPreview<'_> {
        BlobPreview(&self.blob)
    }
}

/// Build a complete fragment as a single contiguous buffer.
///
/// # Example
///
/// ```
/// use fragwire::protocol::{build_fragment, FragmentHeader, HEADER_LEN};
///
/// let header = FragmentHeader::new(1, 0, true, true, 5);
/// let bytes = build_fragment(&header, b"hello");
/// assert_eq!(bytes.len(), HEADER_LEN + 5);
/// ```
pub fn build_fragment(header: &FragmentHeader, blob: &[u8]) -> Bytes {
    let mut buf = BytesMut::with_capacity(HEADER_LEN + blob.len());
    buf.put_slice(&header.encode());
    buf.put_slice(blob);
    buf.freeze()
}

/// Lazy hex rendering of the first bytes of a blob.
///
/// Formats at most eight bytes, with a trailing `..` when truncated, so a
/// trace subscriber never pulls a whole payload into a log line.
pub struct BlobPreview<'a>(pub &'a [u8]);

impl std::fmt::Display for BlobPreview<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        const PREVIEW_LEN: usize = 8;
        for byte in self.0.iter().take(PREVIEW_LEN) {
            write!(f, "{byte:02x}")?;
        }
        if self.0.len() > PREVIEW_LEN {
            f.write_str("..")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_accessors() {
        let header = FragmentHeader::new(7, 2, false, true, 5);
        let fragment = Fragment::new(header, Bytes::from_static(b"hello"));

        assert_eq!(fragment.object_id(), 7);
        assert_eq!(fragment.fragment_id(), 2);
        assert!(!fragment.is_start());
        assert!(fragment.is_end());
        assert_eq!(fragment.blob(), b"hello");
        assert_eq!(fragment.blob_len(), 5);
    }

    #[test]
    fn test_build_fragment_layout() {
        let header = FragmentHeader::new(1, 0, true, true, 5);
        let bytes = build_fragment(&header, b"hello");

        assert_eq!(bytes.len(), HEADER_LEN + 5);
        let parsed = FragmentHeader::decode(&bytes).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(&bytes[HEADER_LEN..], b"hello");
    }

    #[test]
    fn test_build_fragment_empty_blob() {
        let header = FragmentHeader::new(1, 0, true, true, 0);
        let bytes = build_fragment(&header, b"");
        assert_eq!(bytes.len(), HEADER_LEN);
    }

    #[test]
    fn test_blob_preview_short() {
        let preview = BlobPreview(&[0x01, 0xab, 0xff]);
        assert_eq!(preview.to_string(), "01abff");
    }

    #[test]
    fn test_blob_preview_truncates() {
        let blob: Vec<u8> = (0..16).collect();
        let preview = BlobPreview(&blob);
        assert_eq!(preview.to_string(), "0001020304050607..");
    }

    #[test]
    fn test_blob_preview_empty() {
        assert_eq!(BlobPreview(b"").to_string(), "");
    }
}
