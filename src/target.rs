//! Output buffers for serialization
//!
//! [`Target`] abstracts the byte sink an encoder appends to. The `push_XXX`
//! methods are infallible and total by design: they return the number of
//! bytes written purely for summary book-keeping on the caller side, never
//! as a feedback mechanism for partial success.
//!
//! Two implementations are provided: `Vec<u8>` for real output, and
//! [`ByteCounter`] (an alias for [`std::io::Sink`]) for computing the
//! serialized width of a value without allocating.

/// Byte-oriented buffer with incremental, infallible append operations.
pub trait Target {
    /// Amortizes the cost of writing roughly `extra` further bytes.
    ///
    /// May be called with partial information; additional writes and
    /// further `anticipate` calls should be expected to follow.
    fn anticipate(&mut self, extra: usize);

    /// Returns a fresh object of the `Self` type with an empty buffer.
    fn create() -> Self;

    /// Appends a single byte. The return value must be `1`.
    fn push_one(&mut self, b: u8) -> usize;

    /// Appends a known-length array. The return value must be `N`.
    fn push_many<const N: usize>(&mut self, arr: [u8; N]) -> usize;

    /// Appends an arbitrary-length byte slice. The return value must be
    /// the length of the slice.
    fn push_all(&mut self, buf: &[u8]) -> usize;
}

/// Alias for [`std::io::Sink`] used to count the number of bytes a value
/// would serialize to, without performing any memory operations.
pub type ByteCounter = std::io::Sink;

impl Target for ByteCounter {
    #[inline(always)]
    fn anticipate(&mut self, _: usize) {}

    #[inline]
    fn create() -> Self {
        std::io::sink()
    }

    #[inline(always)]
    fn push_one(&mut self, _: u8) -> usize {
        1
    }

    #[inline(always)]
    fn push_many<const N: usize>(&mut self, _: [u8; N]) -> usize {
        N
    }

    #[inline(always)]
    fn push_all(&mut self, buf: &[u8]) -> usize {
        buf.len()
    }
}

impl Target for Vec<u8> {
    #[inline]
    fn anticipate(&mut self, extra: usize) {
        self.reserve(extra);
    }

    #[inline]
    fn create() -> Self {
        Self::new()
    }

    #[inline]
    fn push_one(&mut self, b: u8) -> usize {
        self.push(b);
        1
    }

    #[inline]
    fn push_many<const N: usize>(&mut self, arr: [u8; N]) -> usize {
        self.extend(&arr);
        N
    }

    #[inline]
    fn push_all(&mut self, buf: &[u8]) -> usize {
        self.extend_from_slice(buf);
        buf.len()
    }
}
