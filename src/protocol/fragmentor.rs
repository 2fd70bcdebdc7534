//! Send-side fragmentation of serialized objects.
//!
//! A [`Fragmentor`] slices one serialized object into ordered fragments of
//! bounded size, each carrying the 21-byte framing header. The fragmentor
//! owns the per-direction [`ObjectIdSequence`], so every object it splits
//! gets a fresh, monotonically increasing id regardless of which priority
//! buffer it lands in.

use bytes::{BufMut, Bytes, BytesMut};

use super::fragment::BlobPreview;
use super::wire_format::{
    FragmentHeader, ObjectIdSequence, DEFAULT_FRAGMENT_SIZE, HEADER_LEN, MAX_FRAGMENT_TOTAL,
};

/// Splits serialized objects into wire fragments.
#[derive(Debug)]
pub struct Fragmentor {
    /// Max total bytes per fragment, header included.
    fragment_size: usize,
    object_ids: ObjectIdSequence,
}

impl Fragmentor {
    /// Create a fragmentor with the given fragment size (header included).
    ///
    /// # Panics
    ///
    /// Panics if `fragment_size` leaves no room for payload bytes or
    /// exceeds the signed 32-bit fragment budget. Both are programmer
    /// errors in transport configuration.
    pub fn new(fragment_size: usize) -> Self {
        assert!(
            fragment_size > HEADER_LEN,
            "fragment size must exceed the header length"
        );
        assert!(
            fragment_size as u64 <= MAX_FRAGMENT_TOTAL,
            "fragment size must fit a signed 32-bit length"
        );
        Self {
            fragment_size,
            object_ids: ObjectIdSequence::new(),
        }
    }

    /// Configured max total bytes per fragment.
    #[inline]
    pub fn fragment_size(&self) -> usize {
        self.fragment_size
    }

    /// Max blob bytes carried by one fragment.
    #[inline]
    pub fn max_blob_len(&self) -> usize {
        self.fragment_size - HEADER_LEN
    }

    /// Split one serialized object into its wire fragments.
    ///
    /// Allocates a fresh object id. Fragment ids run 0..N contiguously;
    /// the start flag is set on fragment 0 and the end flag on the last,
    /// with both on a single-fragment object. A zero-length body still
    /// produces exactly one fragment with an empty blob.
    ///
    /// # Example
    ///
    /// ```
    /// use fragwire::protocol::Fragmentor;
    ///
    /// let fragmentor = Fragmentor::new(50);
    /// let fragments = fragmentor.fragment(&[0u8; 70]);
    /// assert_eq!(fragments.len(), 3); // 29 + 29 + 12 payload bytes
    /// ```
    pub fn fragment(&self, data: &[u8]) -> Vec<Bytes> {
        let object_id = self.object_ids.next();
        let max_blob = self.max_blob_len();
        let count = data.len().div_ceil(max_blob).max(1);

        let mut fragments = Vec::with_capacity(count);
        for fragment_id in 0..count {
            let lo = fragment_id * max_blob;
            let hi = data.len().min(lo + max_blob);
            let blob = &data[lo..hi];

            let header = FragmentHeader::new(
                object_id,
                fragment_id as u64,
                fragment_id == 0,
                fragment_id == count - 1,
                blob.len() as u32,
            );

            tracing::trace!(
                target: "fragwire::send",
                object_id,
                fragment_id,
                start = header.is_start(),
                end = header.is_end(),
                blob_len = blob.len(),
                preview = %BlobPreview(blob),
                "fragment produced"
            );

            let mut buf = BytesMut::with_capacity(HEADER_LEN + blob.len());
            buf.put_slice(&header.encode());
            buf.put_slice(blob);
            fragments.push(buf.freeze());
        }
        fragments
    }
}

impl Default for Fragmentor {
    fn default() -> Self {
        Self::new(DEFAULT_FRAGMENT_SIZE)
    }
}
