use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

/// Bytes captured by a [`MemWriter`], readable while the writer is owned elsewhere.
pub type Captured = Rc<RefCell<Vec<u8>>>;

/// In-memory stand-in for stdout/stderr.
///
/// A [`Session`](crate::Session) built with two of these keeps everything the
/// builtins print; the paired [`Captured`] handle reads it back. Forked
/// children never see this writer and keep the real descriptors.
#[derive(Default, Clone)]
pub struct MemWriter {
    buf: Captured,
}

impl MemWriter {
    /// A fresh writer plus a handle onto its buffer.
    pub fn with_handle() -> (Self, Captured) {
        let writer = Self::default();
        let handle = Rc::clone(&writer.buf);
        (writer, handle)
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.borrow()).into_owned()
    }
}

impl Write for MemWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
