use std::{
    fs::File,
    io::{self, Write, stdout},
    str::from_utf8,
};

use crate::{
    buf::XmlBuf,
    encoding::{EncodingError, XmlCharEncodingHandler},
    error::{XmlErrorDomain, XmlParserErrors, xml_simple_error},
    tree::XmlBufferAllocationScheme,
};

use super::{MINLEN, file_uri_to_path, io_error_code, xml_ioerr};

/// A buffered output, converted from UTF-8 on the fly.
///
/// Pending data is flushed when the buffer is dropped.
#[derive(Default)]
pub struct XmlOutputBuffer<'a> {
    pub(crate) context: Option<Box<dyn Write + 'a>>,
    pub(crate) encoder: Option<XmlCharEncodingHandler>,
    // UTF-8 data not yet converted or written
    pub(crate) buffer: XmlBuf,
    // converted data, only with an encoder
    pub(crate) conv: Option<XmlBuf>,
    pub(crate) written: usize,
    pub(crate) error: XmlParserErrors,
}

impl<'a> XmlOutputBuffer<'a> {
    /// Create a buffered output into memory.
    ///
    /// A UTF-8 encoder is the identity and is not kept.
    #[doc(alias = "xmlAllocOutputBuffer")]
    pub fn new(encoder: Option<XmlCharEncodingHandler>) -> Self {
        let mut buffer = XmlBuf::new();
        buffer
            .set_allocation_scheme(XmlBufferAllocationScheme::XmlBufferAllocDoubleit)
            .ok();
        let encoder = encoder.filter(|encoder| !encoder.is_utf8());
        let conv = encoder.is_some().then(|| XmlBuf::with_capacity(MINLEN));
        Self {
            context: None,
            encoder,
            buffer,
            conv,
            written: 0,
            error: XmlParserErrors::XmlErrOK,
        }
    }

    /// Create a buffered output writing into `writer`.
    #[doc(alias = "xmlOutputBufferCreateIO")]
    #[doc(alias = "xmlOutputBufferCreateFile")]
    pub fn from_writer(writer: impl Write + 'a, encoder: Option<XmlCharEncodingHandler>) -> Self {
        let mut ret = Self::new(encoder);
        ret.context = Some(Box::new(writer));
        ret
    }

    /// Create a buffered output for the progressive saving of a file.
    ///
    /// If `uri` is `"-"` then the standard output is used. `file://` URLs are
    /// unescaped. Compression is not supported.
    #[doc(alias = "xmlOutputBufferCreateFilename")]
    pub fn from_uri(
        uri: &str,
        encoder: Option<XmlCharEncodingHandler>,
    ) -> Result<Self, XmlParserErrors> {
        if uri == "-" {
            return Ok(Self::from_writer(stdout(), encoder));
        }
        let path = file_uri_to_path(uri);
        match File::create(path.as_ref()) {
            Ok(file) => Ok(Self::from_writer(file, encoder)),
            Err(err) => {
                let code = io_error_code(&err);
                xml_ioerr(code, Some(&path));
                Err(code)
            }
        }
    }

    pub fn error(&self) -> XmlParserErrors {
        self.error
    }

    /// Total number of bytes handed to the underlying writer.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Convert the pending UTF-8 data into `conv`.
    ///
    /// Characters the target encoding cannot represent become `&#N;`.
    ///
    /// Returns the number of converted bytes.
    pub(crate) fn encode(&mut self) -> Result<usize, EncodingError> {
        let Self {
            encoder: Some(encoder),
            conv: Some(conv),
            buffer,
            ..
        } = self
        else {
            return Err(EncodingError::Other {
                msg: "Encoder or Buffer is not set.".into(),
            });
        };

        let mut total = 0;
        while !buffer.is_empty() {
            let pending = buffer.as_bytes();
            let text = match from_utf8(pending) {
                Ok(text) => text,
                // a multi-byte character may be split between two writes
                Err(err) if err.error_len().is_none() && err.valid_up_to() > 0 => {
                    from_utf8(&pending[..err.valid_up_to()]).unwrap_or_default()
                }
                Err(err) if err.error_len().is_none() => break,
                Err(_) => {
                    return Err(EncodingError::Other {
                        msg: "output is not valid UTF-8".into(),
                    });
                }
            };
            let mut dst = vec![0; text.len() * 4 + 16];
            match encoder.encode(text, &mut dst) {
                Ok((read, write)) => {
                    buffer.trim_head(read);
                    conv.push_bytes(&dst[..write]).ok();
                    total += write;
                    if read == 0 {
                        break;
                    }
                }
                Err(EncodingError::Unmappable { read, write, c }) => {
                    buffer.trim_head(read);
                    conv.push_bytes(&dst[..write]).ok();
                    total += write;

                    let charref = format!("&#{};", c as u32);
                    let mut dst = [0; 64];
                    match encoder.encode(&charref, &mut dst) {
                        Ok((read, write)) if read == charref.len() => {
                            conv.push_bytes(&dst[..write]).ok();
                            total += write;
                        }
                        _ => {
                            xml_simple_error(
                                XmlErrorDomain::XmlFromI18N,
                                XmlParserErrors::XmlIOEncoder,
                                None,
                                Some(&format!(
                                    "output conversion failed due to conv error, character U+{:04X}",
                                    c as u32
                                )),
                            );
                            return Err(EncodingError::Unmappable { read, write, c });
                        }
                    }
                }
                Err(EncodingError::BufferTooShort) => break,
                Err(err) => return Err(err),
            }
        }
        Ok(total)
    }

    /// Write the content of the array in the output I/O buffer.
    /// This routine handle the I18N transcoding from internal UTF-8.
    ///
    /// Returns the number of bytes accepted.
    #[doc(alias = "xmlOutputBufferWrite")]
    pub fn write_bytes(&mut self, buf: &[u8]) -> Result<usize, XmlParserErrors> {
        if self.error.is_err() {
            return Err(self.error);
        }
        if let Err(err) = self.buffer.push_bytes(buf) {
            self.error = err;
            return Err(err);
        }
        if self.buffer.len() >= MINLEN {
            if self.encoder.is_some() {
                self.encode_pending()?;
            }
            if self.context.is_some() && self.pending().len() >= MINLEN {
                self.write_pending()?;
            }
        }
        Ok(buf.len())
    }

    /// Write the content of the string in the output I/O buffer.
    #[doc(alias = "xmlOutputBufferWriteString")]
    pub fn write_str(&mut self, s: &str) -> Result<usize, XmlParserErrors> {
        self.write_bytes(s.as_bytes())
    }

    /// Write the content of the string in the output I/O buffer.
    /// This routine escapes the characters with `escaping`, or with the default
    /// content escaping if `None`.
    #[doc(alias = "xmlOutputBufferWriteEscape")]
    pub fn write_str_with_escape(
        &mut self,
        s: &str,
        escaping: Option<fn(&str, &mut String)>,
    ) -> Result<usize, XmlParserErrors> {
        let mut escaped = String::with_capacity(s.len());
        escaping.unwrap_or(xml_escape_content)(s, &mut escaped);
        self.write_str(&escaped)
    }

    /// Write `s` surrounded by quotes, see [`XmlBuf::push_quoted_str`].
    #[doc(alias = "xmlOutputBufferWriteQuotedString")]
    pub fn write_quoted_str(&mut self, s: &str) -> Result<usize, XmlParserErrors> {
        if self.error.is_err() {
            return Err(self.error);
        }
        let before = self.buffer.len();
        if let Err(err) = self.buffer.push_quoted_str(s) {
            self.error = err;
            return Err(err);
        }
        Ok(self.buffer.len() - before)
    }

    /// Whether the output converts to an encoding other than UTF-8.
    pub fn has_encoder(&self) -> bool {
        self.encoder.is_some()
    }

    /// Start converting to `encoder` from now on.
    ///
    /// Data written before the switch is kept as is. Nothing happens if an
    /// encoder is already installed.
    pub(crate) fn switch_encoder(&mut self, encoder: XmlCharEncodingHandler) {
        if self.encoder.is_some() || encoder.is_utf8() {
            return;
        }
        let mut conv = XmlBuf::with_capacity(MINLEN);
        if let Err(err) = conv.push_bytes(self.buffer.as_bytes()) {
            self.error = err;
            return;
        }
        self.buffer.clear();
        self.encoder = Some(encoder);
        self.conv = Some(conv);
    }

    /// Stop converting, the converted data stays in front of anything written next.
    pub(crate) fn clear_encoder(&mut self) -> Result<(), XmlParserErrors> {
        if self.encoder.is_some() {
            self.encode_pending()?;
        }
        self.encoder = None;
        if let Some(conv) = self.conv.take() {
            let mut buffer = XmlBuf::with_capacity(conv.len() + self.buffer.len());
            buffer
                .push_bytes(conv.as_bytes())
                .and_then(|_| buffer.push_bytes(self.buffer.as_bytes()))
                .inspect_err(|&err| self.error = err)?;
            self.buffer = buffer;
        }
        Ok(())
    }

    fn pending(&self) -> &[u8] {
        match self.conv.as_ref() {
            Some(conv) => conv.as_bytes(),
            None => self.buffer.as_bytes(),
        }
    }

    fn encode_pending(&mut self) -> Result<usize, XmlParserErrors> {
        self.encode().map_err(|_| {
            xml_ioerr(XmlParserErrors::XmlIOEncoder, None);
            self.error = XmlParserErrors::XmlIOEncoder;
            self.error
        })
    }

    fn write_pending(&mut self) -> Result<usize, XmlParserErrors> {
        let Some(context) = self.context.as_mut() else {
            return Ok(0);
        };
        let pending = match self.conv.as_mut() {
            Some(conv) => conv,
            None => &mut self.buffer,
        };
        let len = pending.len();
        if let Err(err) = context.write_all(pending.as_bytes()) {
            xml_ioerr(XmlParserErrors::XmlIOWrite, Some(&err.to_string()));
            self.error = XmlParserErrors::XmlIOWrite;
            return Err(self.error);
        }
        pending.trim_head(len);
        self.written = self.written.saturating_add(len);
        Ok(len)
    }

    /// flushes the output I/O channel
    ///
    /// Returns the number of bytes written by this call.
    #[doc(alias = "xmlOutputBufferFlush")]
    pub fn flush(&mut self) -> Result<usize, XmlParserErrors> {
        if self.error.is_err() {
            return Err(self.error);
        }
        if self.encoder.is_some() {
            self.encode_pending()?;
        }
        let len = self.write_pending()?;
        if let Some(context) = self.context.as_mut() {
            if let Err(err) = context.flush() {
                xml_ioerr(XmlParserErrors::XmlIOFlush, Some(&err.to_string()));
                self.error = XmlParserErrors::XmlIOFlush;
                return Err(self.error);
            }
        }
        Ok(len)
    }

    /// Flush and close the output.
    ///
    /// Returns the total number of bytes written.
    #[doc(alias = "xmlOutputBufferClose")]
    pub fn close(mut self) -> Result<usize, XmlParserErrors> {
        self.flush()?;
        self.context = None;
        Ok(self.written)
    }

    /// Gives the UTF-8 data currently held in the output buffer.
    #[doc(alias = "xmlOutputBufferGetContent")]
    pub fn content(&self) -> &[u8] {
        if self.buffer.is_ok() {
            self.buffer.as_bytes()
        } else {
            &[]
        }
    }

    /// Flush the converter and take the encoded bytes out of an in-memory output.
    pub fn into_content(mut self) -> Result<Vec<u8>, XmlParserErrors> {
        self.flush()?;
        let content = match self.conv.as_mut() {
            Some(conv) => conv.detach(),
            None => self.buffer.detach(),
        };
        content.ok_or(XmlParserErrors::XmlErrNoMemory)
    }
}

impl Drop for XmlOutputBuffer<'_> {
    fn drop(&mut self) {
        if self.context.is_some() {
            self.flush().ok();
        }
    }
}

impl Write for XmlOutputBuffer<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_bytes(buf).map_err(io::Error::other)
    }

    fn flush(&mut self) -> io::Result<()> {
        XmlOutputBuffer::flush(self)
            .map(|_| ())
            .map_err(io::Error::other)
    }
}

/// Escape `<`, `>`, `&` and carriage returns for character data.
#[doc(alias = "xmlEscapeContent")]
pub(crate) fn xml_escape_content(input: &str, output: &mut String) {
    for c in input.chars() {
        match c {
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '&' => output.push_str("&amp;"),
            '\r' => output.push_str("&#13;"),
            c => output.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::encoding::find_encoding_handler;

    use super::*;

    #[test]
    fn unmappable_characters_become_references() {
        let mut out = XmlOutputBuffer::new(find_encoding_handler("ISO-8859-1"));
        out.write_str("caf\u{e9} \u{3042}!").unwrap();
        assert_eq!(out.into_content().unwrap(), b"caf\xE9 &#12354;!");
    }

    #[test]
    fn writer_receives_everything_on_close() {
        let mut sink = vec![];
        {
            let mut out = XmlOutputBuffer::from_writer(&mut sink, None);
            out.write_str_with_escape("a<b & c\r", None).unwrap();
            assert_eq!(out.close().unwrap(), 19);
        }
        assert_eq!(sink, b"a&lt;b &amp; c&#13;");
    }

    #[test]
    fn utf8_encoder_is_dropped() {
        let out = XmlOutputBuffer::new(find_encoding_handler("UTF-8"));
        assert!(out.encoder.is_none());
    }
}
