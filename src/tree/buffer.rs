// Copyright of the original code is the following.
// --------
// Summary: interfaces for tree manipulation
// Description: this module describes the structures found in an tree resulting
//              from an XML or HTML parsing, as well as the API provided for
//              various processing on that tree
//
// Copy: See Copyright for the status of this software.
//
// Author: Daniel Veillard
// --------
// tree.c : implementation of access function for an XML tree.
//
// References:
//   XHTML 1.0 W3C REC: http://www.w3.org/TR/2002/REC-xhtml1-20020801/
//
// See Copyright for the status of this software.
//
// daniel@veillard.com

use std::io::Write;

use crate::{
    buf::XmlBuf,
    error::{XmlErrorDomain, XmlParserErrors, xml_simple_error, xml_simple_oom_error},
    globals::GLOBAL_STATE,
};

use super::{BASE_BUFFER_SIZE, XmlBufferAllocationScheme};

/// Upper bound of the content of a legacy buffer.
pub const XML_BUFFER_MAX: usize = i32::MAX as usize;

fn xml_buffer_err_memory(extra: &str) -> XmlParserErrors {
    xml_simple_oom_error(XmlErrorDomain::XmlFromBuffer, None, Some(extra));
    XmlParserErrors::XmlErrNoMemory
}

/// A buffer structure, this old construct is limited to 2GB and
/// is being deprecated, use API with [`XmlBuf`] instead.
///
/// A failed write leaves the content untouched.
#[derive(Debug, Clone)]
pub struct XmlBuffer {
    content: Vec<u8>,
    // in IO mode bytes before `head` are consumed
    head: usize,
    scheme: XmlBufferAllocationScheme,
    max_length: usize,
    read_only: bool,
}

impl XmlBuffer {
    /// Create a buffer with the default size.
    #[doc(alias = "xmlBufferCreate")]
    pub fn new() -> Self {
        let size = GLOBAL_STATE.with_borrow(|state| state.default_buffer_size);
        Self::with_capacity(size)
    }

    /// Create a buffer able to hold `size` bytes without growing.
    #[doc(alias = "xmlBufferCreateSize")]
    pub fn with_capacity(size: usize) -> Self {
        Self {
            content: Vec::with_capacity(size.min(XML_BUFFER_MAX)),
            head: 0,
            scheme: XmlBufferAllocationScheme::XmlBufferAllocExact,
            max_length: XML_BUFFER_MAX,
            read_only: false,
        }
    }

    /// Create a read-only buffer over `mem`.
    ///
    /// Every mutation of the result fails with `XmlErrArgument`.
    #[doc(alias = "xmlBufferCreateStatic")]
    pub fn from_static(mem: &[u8]) -> Self {
        Self {
            content: mem.to_vec(),
            head: 0,
            scheme: XmlBufferAllocationScheme::XmlBufferAllocImmutable,
            max_length: XML_BUFFER_MAX,
            read_only: true,
        }
    }

    /// Sets the allocation scheme for this buffer.
    ///
    /// A buffer in IO mode keeps it. `XmlBufferAllocImmutable` is refused.
    #[doc(alias = "xmlBufferSetAllocationScheme")]
    pub fn set_allocation_scheme(&mut self, scheme: XmlBufferAllocationScheme) {
        if self.read_only
            || self.scheme == XmlBufferAllocationScheme::XmlBufferAllocIo
            || scheme == XmlBufferAllocationScheme::XmlBufferAllocImmutable
        {
            return;
        }
        self.scheme = scheme;
    }

    pub fn allocation_scheme(&self) -> XmlBufferAllocationScheme {
        self.scheme
    }

    /// Set the cap enforced under `XmlBufferAllocBounded`.
    pub fn set_max_length(&mut self, max: usize) {
        self.max_length = max.min(XML_BUFFER_MAX);
    }

    fn check_writable(&self) -> Result<(), XmlParserErrors> {
        if self.read_only {
            xml_simple_error(
                XmlErrorDomain::XmlFromBuffer,
                XmlParserErrors::XmlErrArgument,
                None,
                Some("the buffer is read-only"),
            );
            return Err(XmlParserErrors::XmlErrArgument);
        }
        Ok(())
    }

    /// Function to get the content of a buffer.
    #[doc(alias = "xmlBufferContent")]
    pub fn content(&self) -> &[u8] {
        &self.content[self.head..]
    }

    /// Function to get the length of a buffer.
    #[doc(alias = "xmlBufferLength")]
    pub fn len(&self) -> usize {
        self.content.len() - self.head
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.content.capacity() - self.head
    }

    /// Resize a buffer to accommodate at least `size` bytes.
    #[doc(alias = "xmlBufferResize")]
    pub fn resize(&mut self, size: usize) -> Result<(), XmlParserErrors> {
        self.check_writable()?;
        if size <= self.capacity() {
            return Ok(());
        }
        if size > XML_BUFFER_MAX
            || (self.scheme == XmlBufferAllocationScheme::XmlBufferAllocBounded
                && size > self.max_length)
        {
            return Err(self.bounded_err("growing buffer past the limit"));
        }
        if self.scheme == XmlBufferAllocationScheme::XmlBufferAllocIo && self.head > 0 {
            self.content.drain(..self.head);
            self.head = 0;
            if size <= self.capacity() {
                return Ok(());
            }
        }
        let current = self.content.capacity().max(1);
        let target = match self.scheme {
            XmlBufferAllocationScheme::XmlBufferAllocExact => size,
            XmlBufferAllocationScheme::XmlBufferAllocHybrid if current < BASE_BUFFER_SIZE => size,
            _ => {
                let mut now = current;
                while now < size {
                    now = now.saturating_mul(2);
                }
                let cap = if self.scheme == XmlBufferAllocationScheme::XmlBufferAllocBounded {
                    self.max_length
                } else {
                    XML_BUFFER_MAX
                };
                now.min(cap)
            }
        };
        self.content
            .try_reserve_exact(target - self.content.len())
            .map_err(|_| xml_buffer_err_memory("growing buffer"))
    }

    fn bounded_err(&self, extra: &str) -> XmlParserErrors {
        if self.scheme == XmlBufferAllocationScheme::XmlBufferAllocBounded {
            xml_simple_error(
                XmlErrorDomain::XmlFromBuffer,
                XmlParserErrors::XmlBufBoundedExceeded,
                None,
                Some(extra),
            );
            XmlParserErrors::XmlBufBoundedExceeded
        } else {
            xml_buffer_err_memory(extra)
        }
    }

    /// Grow the available space of a buffer by at least `len` bytes.
    ///
    /// Returns the new available space.
    #[doc(alias = "xmlBufferGrow")]
    pub fn grow(&mut self, len: usize) -> Result<usize, XmlParserErrors> {
        self.check_writable()?;
        let needed = self
            .len()
            .checked_add(len)
            .ok_or_else(|| xml_buffer_err_memory("growing buffer past INT_MAX"))?;
        self.resize(needed)?;
        Ok(self.content.capacity() - self.content.len())
    }

    /// Add a string range to an XML buffer.
    #[doc(alias = "xmlBufferAdd")]
    pub fn add(&mut self, bytes: &[u8]) -> Result<(), XmlParserErrors> {
        self.check_writable()?;
        if bytes.is_empty() {
            return Ok(());
        }
        let needed = self
            .len()
            .checked_add(bytes.len())
            .filter(|&n| n <= XML_BUFFER_MAX)
            .ok_or_else(|| self.bounded_err("growing buffer past INT_MAX"))?;
        self.resize(needed)?;
        self.content.extend_from_slice(bytes);
        Ok(())
    }

    /// Add a string range to the beginning of an XML buffer.
    ///
    /// Only buffers in IO mode have room for it, other buffers refuse with
    /// `XmlErrArgument`.
    #[doc(alias = "xmlBufferAddHead")]
    pub fn add_head(&mut self, bytes: &[u8]) -> Result<(), XmlParserErrors> {
        self.check_writable()?;
        if self.scheme != XmlBufferAllocationScheme::XmlBufferAllocIo {
            return Err(XmlParserErrors::XmlErrArgument);
        }
        if bytes.is_empty() {
            return Ok(());
        }
        if bytes.len() <= self.head {
            // reuse the consumed area
            let start = self.head - bytes.len();
            self.content[start..self.head].copy_from_slice(bytes);
            self.head = start;
            return Ok(());
        }
        let needed = self
            .len()
            .checked_add(bytes.len())
            .filter(|&n| n <= XML_BUFFER_MAX)
            .ok_or_else(|| xml_buffer_err_memory("growing buffer past INT_MAX"))?;
        let mut content = Vec::new();
        content
            .try_reserve_exact(needed)
            .map_err(|_| xml_buffer_err_memory("growing buffer"))?;
        content.extend_from_slice(bytes);
        content.extend_from_slice(self.content());
        self.content = content;
        self.head = 0;
        Ok(())
    }

    /// Append a string to an XML buffer.
    #[doc(alias = "xmlBufferCat", alias = "xmlBufferCCat")]
    pub fn push_str(&mut self, s: &str) -> Result<(), XmlParserErrors> {
        self.add(s.as_bytes())
    }

    /// Routine which manages and grows an output buffer.
    /// This one adds xmlChars at the end of the buffer.
    #[doc(alias = "xmlBufferWriteCHAR", alias = "xmlBufferWriteChar")]
    pub fn write_str(&mut self, s: &str) -> Result<(), XmlParserErrors> {
        self.push_str(s)
    }

    /// Routine which manage and grows an output buffer. This one writes
    /// a quoted or double quoted string, checking first if it holds quote or
    /// double-quotes internally.
    #[doc(alias = "xmlBufferWriteQuotedString")]
    pub fn write_quoted_string(&mut self, s: &str) -> Result<(), XmlParserErrors> {
        if !s.contains('"') {
            self.push_str("\"")?;
            self.push_str(s)?;
            return self.push_str("\"");
        }
        if !s.contains('\'') {
            self.push_str("'")?;
            self.push_str(s)?;
            return self.push_str("'");
        }
        self.push_str("\"")?;
        for (i, chunk) in s.split('"').enumerate() {
            if i > 0 {
                self.push_str("&quot;")?;
            }
            self.push_str(chunk)?;
        }
        self.push_str("\"")
    }

    /// Remove the beginning of an XML buffer.
    ///
    /// Returns the number of bytes removed.
    #[doc(alias = "xmlBufferShrink")]
    pub fn shrink(&mut self, len: usize) -> Result<usize, XmlParserErrors> {
        self.check_writable()?;
        if len > self.len() {
            return Err(XmlParserErrors::XmlErrArgument);
        }
        if self.scheme == XmlBufferAllocationScheme::XmlBufferAllocIo {
            self.head += len;
        } else {
            self.content.drain(..len);
        }
        Ok(len)
    }

    /// Empty a buffer.
    #[doc(alias = "xmlBufferEmpty")]
    pub fn empty(&mut self) {
        if self.read_only {
            return;
        }
        self.content.clear();
        self.head = 0;
    }

    /// Remove the string contained in a buffer and give it back.
    /// The buffer is reset to an empty content.
    #[doc(alias = "xmlBufferDetach")]
    pub fn detach(&mut self) -> Result<Vec<u8>, XmlParserErrors> {
        self.check_writable()?;
        let mut content = std::mem::take(&mut self.content);
        content.drain(..self.head);
        self.head = 0;
        Ok(content)
    }

    /// Dumps an XML buffer to `out`.
    ///
    /// Returns the number of bytes written.
    #[doc(alias = "xmlBufferDump")]
    pub fn dump(&self, out: &mut impl Write) -> std::io::Result<usize> {
        out.write_all(self.content())?;
        Ok(self.len())
    }
}

impl Default for XmlBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for XmlBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.add(buf).map_err(std::io::Error::other)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl TryFrom<XmlBuffer> for XmlBuf {
    type Error = XmlParserErrors;

    /// Convert a legacy buffer into a modern one, keeping its content.
    #[doc(alias = "xmlBufFromBuffer")]
    fn try_from(mut buffer: XmlBuffer) -> Result<Self, Self::Error> {
        let mut buf = XmlBuf::with_capacity(buffer.len());
        if buffer.read_only {
            buf.push_bytes(buffer.content())?;
        } else {
            buf.push_bytes(&buffer.detach()?)?;
        }
        Ok(buf)
    }
}

impl TryFrom<&mut XmlBuf> for XmlBuffer {
    type Error = XmlParserErrors;

    /// Take the content of a modern buffer into a legacy one.
    ///
    /// Fails if the content does not fit the 2GB limit.
    #[doc(alias = "xmlBufBackToBuffer")]
    fn try_from(buf: &mut XmlBuf) -> Result<Self, Self::Error> {
        if buf.error().is_err() {
            return Err(buf.error());
        }
        if buf.len() > XML_BUFFER_MAX {
            return Err(xml_buffer_err_memory("buffer too large"));
        }
        let content = buf.detach().ok_or(XmlParserErrors::XmlErrArgument)?;
        let mut buffer = XmlBuffer::with_capacity(0);
        buffer.content = content;
        Ok(buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_buffer_accepts_exactly_the_cap() {
        let mut buffer = XmlBuffer::with_capacity(2);
        buffer.set_allocation_scheme(XmlBufferAllocationScheme::XmlBufferAllocBounded);
        buffer.set_max_length(10);
        buffer.add(b"12345").unwrap();
        buffer.add(b"67890").unwrap();
        assert_eq!(buffer.add(b"x"), Err(XmlParserErrors::XmlBufBoundedExceeded));
        assert_eq!(buffer.content(), b"1234567890");
    }

    #[test]
    fn head_insertion_needs_io_mode() {
        let mut buffer = XmlBuffer::with_capacity(8);
        buffer.push_str("world").unwrap();
        assert_eq!(buffer.add_head(b"hello "), Err(XmlParserErrors::XmlErrArgument));

        buffer.set_allocation_scheme(XmlBufferAllocationScheme::XmlBufferAllocIo);
        buffer.add_head(b"hello ").unwrap();
        assert_eq!(buffer.content(), b"hello world");
        assert_eq!(buffer.shrink(6), Ok(6));
        assert_eq!(buffer.content(), b"world");
        // the consumed area is reused
        buffer.add_head(b"new ").unwrap();
        assert_eq!(buffer.content(), b"new world");
        assert_eq!(buffer.detach().unwrap(), b"new world");
        assert!(buffer.is_empty());
    }

    #[test]
    fn static_buffers_refuse_mutation() {
        let mut buffer = XmlBuffer::from_static(b"fixed");
        assert_eq!(buffer.push_str("x"), Err(XmlParserErrors::XmlErrArgument));
        assert_eq!(buffer.shrink(1), Err(XmlParserErrors::XmlErrArgument));
        assert_eq!(buffer.grow(1), Err(XmlParserErrors::XmlErrArgument));
        buffer.empty();
        assert_eq!(buffer.content(), b"fixed");
        assert_eq!(buffer.allocation_scheme(), XmlBufferAllocationScheme::XmlBufferAllocImmutable);
    }

    #[test]
    fn quoted_strings() {
        let mut buffer = XmlBuffer::with_capacity(0);
        buffer.write_quoted_string("plain").unwrap();
        buffer.write_quoted_string("say \"hi\"").unwrap();
        buffer.write_quoted_string("it's \"x\"").unwrap();
        assert_eq!(
            std::str::from_utf8(buffer.content()).unwrap(),
            "\"plain\"'say \"hi\"'\"it's &quot;x&quot;\""
        );
        let mut out = vec![];
        assert_eq!(buffer.dump(&mut out).unwrap(), buffer.len());
    }

    #[test]
    fn conversion_keeps_content() {
        let mut buffer = XmlBuffer::with_capacity(4);
        buffer.push_str("abc").unwrap();
        let mut buf = XmlBuf::try_from(buffer).unwrap();
        assert_eq!(buf.as_bytes(), b"abc");
        let back = XmlBuffer::try_from(&mut buf).unwrap();
        assert_eq!(back.content(), b"abc");
        assert!(buf.is_empty());
    }
}
