//! Provide the growable byte buffer used by the I/O and serialization layers.
//! This module is based on `buf.c` in `libxml2-v2.11.8`.
//!
//! Please refer to original libxml2 documents also.

use std::io::Write;

use anyhow::{bail, ensure};

use crate::{
    error::{XmlErrorDomain, XmlParserErrors, xml_simple_error, xml_simple_oom_error},
    globals::GLOBAL_STATE,
    tree::{BASE_BUFFER_SIZE, XML_MAX_TEXT_LENGTH, XmlBufferAllocationScheme},
};

fn xml_buf_memory_error(buf: &mut XmlBuf, extra: &str) {
    xml_simple_oom_error(XmlErrorDomain::XmlFromBuffer, None, Some(extra));
    if buf.error.is_ok() {
        buf.error = XmlParserErrors::XmlErrNoMemory;
    }
}

fn xml_buf_bounded_error(buf: &mut XmlBuf, extra: &str) {
    xml_simple_error(
        XmlErrorDomain::XmlFromBuffer,
        XmlParserErrors::XmlBufBoundedExceeded,
        None,
        Some(extra),
    );
    if buf.error.is_ok() {
        buf.error = XmlParserErrors::XmlBufBoundedExceeded;
    }
}

/// A byte buffer with `usize` lengths.
///
/// Once an error occurs, the buffer stays in the error state and refuses every
/// further write.
#[derive(Debug, Clone)]
pub struct XmlBuf {
    content: Vec<u8>,
    // bytes consumed from the head, only under `XmlBufferAllocIo`
    head: usize,
    scheme: XmlBufferAllocationScheme,
    max_length: usize,
    read_only: bool,
    error: XmlParserErrors,
}

impl XmlBuf {
    /// Create a buffer with the default size.
    #[doc(alias = "xmlBufCreate")]
    pub fn new() -> Self {
        let size = GLOBAL_STATE.with_borrow(|state| state.default_buffer_size);
        Self::with_capacity(size)
    }

    /// Create a buffer able to hold `size` bytes without growing.
    #[doc(alias = "xmlBufCreateSize")]
    pub fn with_capacity(size: usize) -> Self {
        Self {
            content: Vec::with_capacity(size),
            head: 0,
            scheme: XmlBufferAllocationScheme::XmlBufferAllocExact,
            max_length: XML_MAX_TEXT_LENGTH,
            read_only: false,
            error: XmlParserErrors::XmlErrOK,
        }
    }

    /// Create a read-only buffer over static memory.
    #[doc(alias = "xmlBufCreateMem")]
    pub fn from_static(mem: &'static [u8]) -> Self {
        Self {
            content: mem.to_vec(),
            head: 0,
            scheme: XmlBufferAllocationScheme::XmlBufferAllocImmutable,
            max_length: XML_MAX_TEXT_LENGTH,
            read_only: true,
            error: XmlParserErrors::XmlErrOK,
        }
    }

    pub fn set_allocation_scheme(
        &mut self,
        scheme: XmlBufferAllocationScheme,
    ) -> Result<(), anyhow::Error> {
        ensure!(
            self.error.is_ok(),
            "Failed to set scheme: Some errors have already occured"
        );
        ensure!(
            !self.read_only,
            "Failed to set scheme: the buffer is read-only"
        );
        ensure!(
            self.scheme != XmlBufferAllocationScheme::XmlBufferAllocIo,
            "Failed to set scheme: XmlBufferAllocIO has been already set."
        );
        match scheme {
            XmlBufferAllocationScheme::XmlBufferAllocDoubleit
            | XmlBufferAllocationScheme::XmlBufferAllocExact
            | XmlBufferAllocationScheme::XmlBufferAllocHybrid
            | XmlBufferAllocationScheme::XmlBufferAllocBounded
            | XmlBufferAllocationScheme::XmlBufferAllocIo => {
                self.scheme = scheme;
                Ok(())
            }
            _ => bail!("Unsupported allocation scheme."),
        }
    }

    pub fn current_allocation_scheme(&self) -> XmlBufferAllocationScheme {
        self.scheme
    }

    /// Set the size limit used by `XmlBufferAllocBounded`.
    pub fn set_max_length(&mut self, max: usize) {
        self.max_length = max;
    }

    pub fn error(&self) -> XmlParserErrors {
        self.error
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_ok()
    }

    /// # Note
    /// This method *does not shrink the internal allocated buffer*.
    #[doc(alias = "xmlBufEmpty")]
    pub fn clear(&mut self) {
        if self.error.is_err() || self.read_only {
            return;
        }
        self.content.clear();
        self.head = 0;
    }

    pub fn len(&self) -> usize {
        self.content.len() - self.head
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.content.capacity() - self.head
    }

    /// The bytes currently held by this buffer.
    #[doc(alias = "xmlBufContent")]
    pub fn as_bytes(&self) -> &[u8] {
        &self.content[self.head..]
    }

    /// Compute the new capacity for a buffer that must hold `needed` bytes.
    fn next_capacity(&self, needed: usize) -> Option<usize> {
        let current = self.content.capacity().max(1);
        let size = match self.scheme {
            XmlBufferAllocationScheme::XmlBufferAllocExact => needed,
            XmlBufferAllocationScheme::XmlBufferAllocHybrid if current < BASE_BUFFER_SIZE => {
                needed
            }
            XmlBufferAllocationScheme::XmlBufferAllocBounded => {
                let mut now = current;
                while now < needed {
                    now = now.checked_mul(2)?;
                }
                now.min(self.max_length)
            }
            _ => {
                let mut now = current;
                while now < needed {
                    now = now.checked_mul(2)?;
                }
                now
            }
        };
        Some(size.max(needed))
    }

    /// Expand the buffer so that the remaining capacity is greater than or equal to `additional`.
    ///
    /// If the expantion is successful, return the remaining capacity after expantion,
    /// otherwise, return `Err`.
    #[doc(alias = "xmlBufGrow")]
    pub fn grow(&mut self, additional: usize) -> Result<usize, anyhow::Error> {
        ensure!(
            self.error.is_ok(),
            "Failed to grow: Some errors have been already occured."
        );
        ensure!(!self.read_only, "Failed to grow: the buffer is read-only");
        let Some(needed) = self.content.len().checked_add(additional) else {
            const MSG: &str = "growing buffer past SIZE_MAX";
            xml_buf_memory_error(self, MSG);
            bail!(MSG);
        };
        if self.scheme == XmlBufferAllocationScheme::XmlBufferAllocBounded
            && needed - self.head > self.max_length
        {
            const MSG: &str = "buffer error: text too long";
            xml_buf_bounded_error(self, MSG);
            bail!(MSG);
        }
        if additional <= self.avail() {
            return Ok(self.avail());
        }
        if self.scheme == XmlBufferAllocationScheme::XmlBufferAllocIo && self.head > 0 {
            // reclaim the consumed head before asking for more memory
            self.content.drain(..self.head);
            self.head = 0;
            if additional <= self.avail() {
                return Ok(self.avail());
            }
        }
        let Some(size) = self.next_capacity(self.content.len() + additional) else {
            const MSG: &str = "growing buffer";
            xml_buf_memory_error(self, MSG);
            bail!(MSG);
        };
        if self
            .content
            .try_reserve_exact(size - self.content.len())
            .is_err()
        {
            const MSG: &str = "growing buffer";
            xml_buf_memory_error(self, MSG);
            bail!(MSG);
        }
        Ok(self.avail())
    }

    /// Append `bytes` to the buffer.
    #[doc(alias = "xmlBufAdd")]
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Result<(), XmlParserErrors> {
        if self.error.is_err() {
            return Err(self.error);
        }
        if self.read_only {
            return Err(XmlParserErrors::XmlErrArgument);
        }
        if bytes.is_empty() {
            return Ok(());
        }
        if self.grow(bytes.len()).is_err() {
            return Err(self.error);
        }
        self.content.extend_from_slice(bytes);
        Ok(())
    }

    #[doc(alias = "xmlBufCat")]
    pub fn push_str(&mut self, s: &str) -> Result<(), XmlParserErrors> {
        self.push_bytes(s.as_bytes())
    }

    /// Append `s` surrounded by quotes.
    ///
    /// Double quotes are used unless `s` contains only double quotes, in which
    /// case single quotes are used. If `s` contains both, inner double quotes are
    /// escaped.
    #[doc(alias = "xmlBufWriteQuotedString")]
    pub fn push_quoted_str(&mut self, s: &str) -> Result<(), XmlParserErrors> {
        if s.contains('"') {
            if s.contains('\'') {
                self.push_str("\"")?;
                let mut split = s.split('"');
                if let Some(first) = split.next() {
                    self.push_str(first)?;
                }
                for chunk in split {
                    self.push_str("&quot;")?;
                    self.push_str(chunk)?;
                }
                self.push_str("\"")
            } else {
                self.push_str("'")?;
                self.push_str(s)?;
                self.push_str("'")
            }
        } else {
            self.push_str("\"")?;
            self.push_str(s)?;
            self.push_str("\"")
        }
    }

    /// Remove the first `len` bytes.
    ///
    /// Returns the number of bytes removed.
    #[doc(alias = "xmlBufShrink")]
    pub fn trim_head(&mut self, len: usize) -> usize {
        if self.error.is_err() || self.read_only {
            return 0;
        }
        let len = len.min(self.len());
        if self.scheme == XmlBufferAllocationScheme::XmlBufferAllocIo {
            self.head += len;
        } else {
            self.content.drain(..len);
        }
        len
    }

    /// The remaining capacity before the buffer has to grow.
    #[doc(alias = "xmlBufAvail")]
    pub fn avail(&self) -> usize {
        if self.error.is_ok() {
            self.content.capacity() - self.content.len()
        } else {
            0
        }
    }

    /// Take the content out of the buffer, leaving it empty.
    #[doc(alias = "xmlBufDetach")]
    pub fn detach(&mut self) -> Option<Vec<u8>> {
        if self.error.is_err() || self.read_only {
            return None;
        }
        let mut content = std::mem::take(&mut self.content);
        content.drain(..self.head);
        self.head = 0;
        Some(content)
    }

    #[doc(alias = "xmlBufDump")]
    pub fn dump(&self, out: &mut impl Write) -> std::io::Result<usize> {
        if self.error.is_err() {
            return Err(std::io::Error::other(
                "Failed to dump: some errors have already occured.",
            ));
        }
        out.write_all(self.as_bytes()).map(|_| self.len())
    }
}

impl Default for XmlBuf {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_buffer_refuses_writes_past_limit() {
        let mut buf = XmlBuf::with_capacity(4);
        buf.set_allocation_scheme(XmlBufferAllocationScheme::XmlBufferAllocBounded)
            .unwrap();
        buf.set_max_length(8);
        buf.push_bytes(b"12345678").unwrap();
        assert_eq!(
            buf.push_bytes(b"9"),
            Err(XmlParserErrors::XmlBufBoundedExceeded)
        );
        // the error state is sticky
        assert!(buf.push_bytes(b"").is_err());
    }

    #[test]
    fn io_scheme_consumes_head_lazily() {
        let mut buf = XmlBuf::with_capacity(16);
        buf.set_allocation_scheme(XmlBufferAllocationScheme::XmlBufferAllocIo)
            .unwrap();
        buf.push_str("hello world").unwrap();
        assert_eq!(buf.trim_head(6), 6);
        assert_eq!(buf.as_bytes(), b"world");
        buf.push_str(", again and again").unwrap();
        assert_eq!(buf.as_bytes(), b"world, again and again");
        assert_eq!(buf.detach().unwrap(), b"world, again and again");
        assert!(buf.is_empty());
    }

    #[test]
    fn quoting_picks_the_right_delimiter() {
        let mut buf = XmlBuf::with_capacity(0);
        buf.push_quoted_str("a\"b").unwrap();
        buf.push_quoted_str("a'b\"c").unwrap();
        assert_eq!(buf.as_bytes(), b"'a\"b'\"a'b&quot;c\"");
    }

    #[test]
    fn static_buffers_are_read_only() {
        let mut buf = XmlBuf::from_static(b"fixed");
        assert_eq!(buf.push_str("x"), Err(XmlParserErrors::XmlErrArgument));
        assert_eq!(buf.as_bytes(), b"fixed");
    }
}
