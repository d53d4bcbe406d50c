// Random-access input abstraction for the match engine.
//
// Both inputs (reference and target) are addressed by offset. Two backing
// modes exist:
//   - **Direct**: in-memory data hands out sub-slices without copying
//     (`as_slice` returns `Some`).
//   - **Callback**: a caller-supplied reader copies bytes into a scratch
//     buffer on demand (`as_slice` returns `None`, `get_bytes` fills).
//
// Engine code never reads the scratch buffer directly; it always uses the
// slice returned by `fetch`, which picks the fast path when one exists.

/// Random-access byte provider for one input side.
pub trait Source {
    /// Total input length in bytes.
    fn len(&self) -> usize;

    /// Whether the input contains no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy bytes starting at `offset` into `buf`, returning the count
    /// copied. Short reads only occur at end of input.
    fn get_bytes(&self, offset: usize, buf: &mut [u8]) -> usize;

    /// Borrow `len` bytes at `offset` without copying, if the backing
    /// storage is addressable. Callback-backed sources return `None`.
    fn as_slice(&self, offset: usize, len: usize) -> Option<&[u8]>;
}

impl Source for &[u8] {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn get_bytes(&self, offset: usize, buf: &mut [u8]) -> usize {
        if offset >= <[u8]>::len(self) {
            return 0;
        }
        let avail = &self[offset..];
        let n = buf.len().min(avail.len());
        buf[..n].copy_from_slice(&avail[..n]);
        n
    }

    fn as_slice(&self, offset: usize, len: usize) -> Option<&[u8]> {
        self.get(offset..offset + len)
    }
}

impl Source for Vec<u8> {
    fn len(&self) -> usize {
        <[u8]>::len(self)
    }

    fn get_bytes(&self, offset: usize, buf: &mut [u8]) -> usize {
        self.as_slice().get_bytes(offset, buf)
    }

    fn as_slice(&self, offset: usize, len: usize) -> Option<&[u8]> {
        self.get(offset..offset + len)
    }
}

impl<T: Source + ?Sized> Source for &T {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn get_bytes(&self, offset: usize, buf: &mut [u8]) -> usize {
        (**self).get_bytes(offset, buf)
    }

    fn as_slice(&self, offset: usize, len: usize) -> Option<&[u8]> {
        (**self).as_slice(offset, len)
    }
}

impl<T: Source + ?Sized> Source for Box<T> {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn get_bytes(&self, offset: usize, buf: &mut [u8]) -> usize {
        (**self).get_bytes(offset, buf)
    }

    fn as_slice(&self, offset: usize, len: usize) -> Option<&[u8]> {
        (**self).as_slice(offset, len)
    }
}

// ---------------------------------------------------------------------------
// Callback-backed source
// ---------------------------------------------------------------------------

/// A `Source` backed by a caller-supplied read callback.
///
/// The callback receives an absolute offset and a destination buffer and
/// must fill it with input bytes, returning the count written. The engine
/// issues reads of at most a few KiB at a time; the callback may block.
pub struct FnSource<F> {
    len: usize,
    read: F,
}

impl<F> FnSource<F>
where
    F: Fn(usize, &mut [u8]) -> usize,
{
    /// Wrap a read callback serving `len` total bytes.
    pub fn new(len: usize, read: F) -> Self {
        Self { len, read }
    }
}

impl<F> Source for FnSource<F>
where
    F: Fn(usize, &mut [u8]) -> usize,
{
    fn len(&self) -> usize {
        self.len
    }

    fn get_bytes(&self, offset: usize, buf: &mut [u8]) -> usize {
        (self.read)(offset, buf)
    }

    fn as_slice(&self, _offset: usize, _len: usize) -> Option<&[u8]> {
        None
    }
}

// ---------------------------------------------------------------------------
// Fetch helper
// ---------------------------------------------------------------------------

/// Read `len` bytes at `offset`, borrowing directly when possible and
/// otherwise copying into `scratch`. Callers must use the returned slice,
/// never `scratch` itself.
pub(crate) fn fetch<'a, S: Source>(
    src: &'a S,
    offset: usize,
    len: usize,
    scratch: &'a mut [u8],
) -> &'a [u8] {
    if let Some(direct) = src.as_slice(offset, len) {
        return direct;
    }
    let n = src.get_bytes(offset, &mut scratch[..len]);
    &scratch[..n]
}

/// Read `len` bytes at `offset` so they end up in `dst`, taking the
/// direct path when the backing storage allows. For callers that must
/// own the bytes across further reads (rolling-window buffers), where
/// `fetch`'s borrowed return value cannot outlive the next fill.
pub(crate) fn fetch_into<S: Source>(src: &S, offset: usize, len: usize, dst: &mut [u8]) {
    if let Some(direct) = src.as_slice(offset, len) {
        dst[..len].copy_from_slice(direct);
    } else {
        let n = src.get_bytes(offset, &mut dst[..len]);
        debug_assert_eq!(n, len);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
