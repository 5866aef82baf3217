use std::{
    any::Any,
    io::{self, Cursor, Read},
    sync::{Mutex, MutexGuard},
};

use crate::{
    buf::XmlBuf,
    encoding::{EncodingError, XmlCharEncoding, XmlCharEncodingHandler, get_encoding_handler},
    error::{XmlErrorDomain, XmlParserErrors, xml_simple_error},
    globals::GLOBAL_STATE,
    tree::XmlBufferAllocationScheme,
};

use super::{
    DefaultFileIOCallbacks, MINLEN, XML_INPUT_NETWORK, io_error_code, is_network_uri, xml_ioerr,
    xml_ioerr_memory,
};

/// Callback used in the I/O Input API to detect if the current handler
/// can provide input functionality for this resource.
#[doc(alias = "xmlInputMatchCallback")]
pub type XmlInputMatchCallback = fn(filename: &str) -> bool;
/// Callback used in the I/O Input API to open the resource.
///
/// Returns an input context or `None` in case or error.
#[doc(alias = "xmlInputOpenCallback")]
pub type XmlInputOpenCallback = fn(filename: &str) -> Option<Box<dyn Any>>;
/// Callback used in the I/O Input API to read the resource.
///
/// Returns the number of bytes read or `-1` in case of error.
#[doc(alias = "xmlInputReadCallback")]
pub type XmlInputReadCallback = fn(context: &mut dyn Any, buffer: &mut [u8]) -> i32;
/// Callback used in the I/O Input API to close the resource.
///
/// Returns `0` or `-1` in case of error.
#[doc(alias = "xmlInputCloseCallback")]
pub type XmlInputCloseCallback = fn(context: Box<dyn Any>) -> i32;

/// A handler able to open some resources for reading.
pub trait XmlInputCallback: Send {
    fn is_match(&self, filename: &str) -> bool;
    fn open(&mut self, filename: &str) -> io::Result<Box<dyn Read>>;
}

/// Adapter turning the four classic function callbacks into an [`XmlInputCallback`].
#[derive(Debug, Clone, Copy)]
pub struct XmlInputCallbackFns {
    matcher: XmlInputMatchCallback,
    opener: XmlInputOpenCallback,
    reader: XmlInputReadCallback,
    closer: Option<XmlInputCloseCallback>,
}

impl XmlInputCallbackFns {
    pub fn new(
        matcher: XmlInputMatchCallback,
        opener: XmlInputOpenCallback,
        reader: XmlInputReadCallback,
        closer: Option<XmlInputCloseCallback>,
    ) -> Self {
        Self {
            matcher,
            opener,
            reader,
            closer,
        }
    }
}

impl XmlInputCallback for XmlInputCallbackFns {
    fn is_match(&self, filename: &str) -> bool {
        (self.matcher)(filename)
    }

    fn open(&mut self, filename: &str) -> io::Result<Box<dyn Read>> {
        let context = (self.opener)(filename)
            .ok_or_else(|| io::Error::other(format!("failed to open {filename}")))?;
        Ok(Box::new(CallbackReader {
            context: Some(context),
            reader: self.reader,
            closer: self.closer,
        }))
    }
}

struct CallbackReader {
    context: Option<Box<dyn Any>>,
    reader: XmlInputReadCallback,
    closer: Option<XmlInputCloseCallback>,
}

impl Read for CallbackReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(context) = self.context.as_deref_mut() else {
            return Ok(0);
        };
        let len = (self.reader)(context, buf);
        usize::try_from(len)
            .map(|len| len.min(buf.len()))
            .map_err(|_| io::Error::other("read callback failed"))
    }
}

impl Drop for CallbackReader {
    fn drop(&mut self) {
        if let (Some(context), Some(closer)) = (self.context.take(), self.closer) {
            closer(context);
        }
    }
}

pub(crate) const MAX_INPUT_CALLBACK: usize = 15;

struct InputCallbackTable {
    initialized: bool,
    // (handler, is the compiled-in default)
    entries: Vec<(Box<dyn XmlInputCallback>, bool)>,
}

static XML_INPUT_CALLBACK_TABLE: Mutex<InputCallbackTable> = Mutex::new(InputCallbackTable {
    initialized: false,
    entries: Vec::new(),
});

/// Lock the callback table, installing the compiled-in handlers on first use.
fn input_callbacks() -> MutexGuard<'static, InputCallbackTable> {
    let mut table = XML_INPUT_CALLBACK_TABLE
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if !table.initialized {
        table.initialized = true;
        table.entries.push((Box::new(DefaultFileIOCallbacks), true));
    }
    table
}

/// clears the entire input callback table. this includes the compiled-in I/O.
#[doc(alias = "xmlCleanupInputCallbacks")]
pub fn cleanup_input_callbacks() {
    input_callbacks().entries.clear();
}

/// Clear the top input callback from the input stack. this includes the compiled-in I/O.
///
/// Returns the number of input callback registered after execution.
#[doc(alias = "xmlPopInputCallbacks")]
pub fn pop_input_callbacks() -> usize {
    let mut table = input_callbacks();
    table.entries.pop();
    table.entries.len()
}

/// Registers the default compiled-in I/O handlers.
#[doc(alias = "xmlRegisterDefaultInputCallbacks")]
pub fn register_default_input_callbacks() -> io::Result<usize> {
    let mut table = input_callbacks();
    if table.entries.len() == MAX_INPUT_CALLBACK {
        return Err(io::Error::other("Too many input callbacks."));
    }
    table.entries.push((Box::new(DefaultFileIOCallbacks), true));
    Ok(table.entries.len())
}

/// Register a new set of I/O callback for handling parser input.
///
/// Returns the number of registered handlers, or `Err` if the table is full.
#[doc(alias = "xmlRegisterInputCallbacks")]
pub fn register_input_callbacks(callback: impl XmlInputCallback + 'static) -> io::Result<usize> {
    let mut table = input_callbacks();
    if table.entries.len() == MAX_INPUT_CALLBACK {
        return Err(io::Error::other("Too many input callbacks."));
    }
    table.entries.push((Box::new(callback), false));
    Ok(table.entries.len())
}

/// A buffered input, converted to UTF-8 on the fly.
pub struct XmlParserInputBuffer {
    pub(crate) context: Option<Box<dyn Read>>,
    pub(crate) encoder: Option<XmlCharEncodingHandler>,
    /// Local buffer encoded in UTF-8.
    pub buffer: XmlBuf,
    // raw input waiting for the encoder
    pub(crate) raw: Option<XmlBuf>,
    pub(crate) error: XmlParserErrors,
    pub(crate) rawconsumed: u64,
}

impl XmlParserInputBuffer {
    #[doc(alias = "xmlAllocParserInputBuffer")]
    pub fn new(enc: XmlCharEncoding) -> Self {
        let default_buffer_size = GLOBAL_STATE.with_borrow(|state| state.default_buffer_size);
        let mut buffer = XmlBuf::with_capacity(2 * default_buffer_size);
        buffer
            .set_allocation_scheme(XmlBufferAllocationScheme::XmlBufferAllocDoubleit)
            .ok();
        let encoder = get_encoding_handler(enc);
        let raw = encoder
            .is_some()
            .then(|| XmlBuf::with_capacity(2 * default_buffer_size));
        Self {
            context: None,
            encoder,
            buffer,
            raw,
            error: XmlParserErrors::XmlErrOK,
            rawconsumed: 0,
        }
    }

    /// Create a buffered parser input for the input from a memory area.
    #[doc(alias = "xmlParserInputBufferCreateMem")]
    pub fn from_memory(mem: &[u8], enc: XmlCharEncoding) -> Result<Self, XmlParserErrors> {
        let mut ret = Self::new(enc);
        ret.push_bytes(mem)?;
        Ok(ret)
    }

    /// Create a buffered parser input over static memory.
    ///
    /// Without conversion the memory is used as a read-only buffer.
    #[doc(alias = "xmlParserInputBufferCreateStatic")]
    pub fn from_static(mem: &'static [u8], enc: XmlCharEncoding) -> Result<Self, XmlParserErrors> {
        let mut ret = Self::new(enc);
        if ret.encoder.is_none() {
            ret.buffer = XmlBuf::from_static(mem);
        } else {
            ret.push_bytes(mem)?;
        }
        Ok(ret)
    }

    /// Create a buffered parser input for the input from an I/O handler.
    #[doc(alias = "xmlParserInputBufferCreateIO")]
    #[doc(alias = "xmlParserInputBufferCreateFile")]
    pub fn from_reader(reader: impl Read + 'static, enc: XmlCharEncoding) -> Self {
        let mut ret = Self::new(enc);
        ret.context = Some(Box::new(reader));
        ret
    }

    /// Create a buffered parser input for the resource named `uri`.
    ///
    /// The registered handlers are tried from the newest to the oldest.
    /// A user handler that matches but fails to open is skipped. The compiled-in
    /// handler refuses network URLs unless `flags` contains [`XML_INPUT_NETWORK`],
    /// and stops the search on any failure other than a missing file.
    ///
    /// Nothing is reported through the error channel, the code is returned instead.
    #[doc(alias = "xmlParserInputBufferCreateUrl")]
    pub fn from_url(uri: &str, enc: XmlCharEncoding, flags: i32) -> Result<Self, XmlParserErrors> {
        let mut code = XmlParserErrors::XmlIOENOENT;
        let mut context = None;
        {
            let mut table = input_callbacks();
            for (callback, is_default) in table.entries.iter_mut().rev() {
                if *is_default {
                    let opened = if is_network_uri(uri) && flags & XML_INPUT_NETWORK == 0 {
                        Err(XmlParserErrors::XmlIONetworkAttempt)
                    } else {
                        callback.open(uri).map_err(|err| io_error_code(&err))
                    };
                    match opened {
                        Ok(reader) => {
                            context = Some(reader);
                            break;
                        }
                        Err(err) => {
                            code = err;
                            if err != XmlParserErrors::XmlIOENOENT {
                                break;
                            }
                        }
                    }
                } else if callback.is_match(uri) {
                    if let Ok(reader) = callback.open(uri) {
                        context = Some(reader);
                        break;
                    }
                }
            }
        }
        let context = context.ok_or(code)?;
        let mut ret = Self::new(enc);
        ret.context = Some(context);
        Ok(ret)
    }

    pub fn error(&self) -> XmlParserErrors {
        self.error
    }

    /// Number of raw bytes consumed by the encoder so far.
    pub fn raw_consumed(&self) -> u64 {
        self.rawconsumed
    }

    /// Convert as much raw input as possible into the UTF-8 buffer.
    ///
    /// Returns the number of bytes written into the buffer.
    pub(crate) fn decode(&mut self, flush: bool) -> Result<usize, EncodingError> {
        let Self {
            encoder: Some(encoder),
            raw: Some(raw),
            buffer,
            ..
        } = self
        else {
            return Err(EncodingError::Other {
                msg: "Encoder or Buffer is not set.".into(),
            });
        };

        let mut total = 0;
        while !raw.is_empty() {
            let mut toconv = raw.len();
            if !flush {
                toconv = toconv.min(64 * 1024);
            }
            let mut out = vec![0; toconv * 2 + 8];
            match encoder.decode(&raw.as_bytes()[..toconv], &mut out) {
                Ok((read, write)) => {
                    raw.trim_head(read);
                    buffer
                        .push_bytes(&out[..write])
                        .map_err(|err| EncodingError::Other {
                            msg: err.message().into(),
                        })?;
                    total += write;
                    if read == 0 {
                        break;
                    }
                }
                Err(EncodingError::BufferTooShort) => break,
                Err(err @ EncodingError::Malformed { read, write }) => {
                    buffer.push_bytes(&out[..write]).ok();
                    let bytes = &raw.as_bytes()[read.saturating_sub(4)..read];
                    let hex = bytes
                        .iter()
                        .map(|b| format!("0x{b:02X}"))
                        .collect::<Vec<_>>()
                        .join(" ");
                    xml_simple_error(
                        XmlErrorDomain::XmlFromI18N,
                        XmlParserErrors::XmlIOEncoder,
                        None,
                        Some(&format!(
                            "input conversion failed due to input error, bytes {hex}"
                        )),
                    );
                    raw.trim_head(read);
                    return Err(err);
                }
                Err(err) => return Err(err),
            }
            if !flush {
                break;
            }
        }
        Ok(total)
    }

    /// Refresh the content of the input buffer, the old data are considered consumed.
    ///
    /// Returns the number of bytes read and stored in the buffer.
    #[doc(alias = "xmlParserInputBufferRead")]
    pub fn read(&mut self, len: usize) -> Result<usize, XmlParserErrors> {
        self.grow(len)
    }

    /// Grow up the content of the input buffer, the old data are preserved.
    /// This routine handle the I18N transcoding to internal UTF-8.
    ///
    /// Returns the number of bytes read and stored in the buffer.
    #[doc(alias = "xmlParserInputBufferGrow")]
    pub fn grow(&mut self, len: usize) -> Result<usize, XmlParserErrors> {
        if self.error.is_err() {
            return Err(self.error);
        }
        let len = if len <= MINLEN && len != 4 { MINLEN } else { len };
        let Some(context) = self.context.as_mut() else {
            return Ok(0);
        };

        let mut chunk = vec![0; len];
        let read = match context.read(&mut chunk) {
            Ok(read) => read,
            Err(err) => {
                let code = io_error_code(&err);
                xml_ioerr(code, Some(&err.to_string()));
                self.error = code;
                return Err(code);
            }
        };
        if read == 0 {
            // end of input, close the resource
            self.context = None;
        }

        let Some(raw) = self.raw.as_mut() else {
            if let Err(err) = self.buffer.push_bytes(&chunk[..read]) {
                xml_ioerr_memory("growing input buffer");
                self.error = err;
                return Err(err);
            }
            return Ok(read);
        };
        if let Err(err) = raw.push_bytes(&chunk[..read]) {
            xml_ioerr_memory("growing input buffer");
            self.error = err;
            return Err(err);
        }
        self.convert_raw()
    }

    /// Push the content of the array in the input buffer.
    /// This routine handle the I18N transcoding to internal UTF-8.
    ///
    /// Returns the number of bytes stored in the buffer.
    #[doc(alias = "xmlParserInputBufferPush")]
    pub fn push_bytes(&mut self, buf: &[u8]) -> Result<usize, XmlParserErrors> {
        if self.error.is_err() {
            return Err(self.error);
        }
        let Some(raw) = self.raw.as_mut() else {
            self.buffer.push_bytes(buf).inspect_err(|&err| {
                self.error = err;
            })?;
            return Ok(buf.len());
        };
        if let Err(err) = raw.push_bytes(buf) {
            self.error = err;
            return Err(err);
        }
        self.convert_raw()
    }

    fn convert_raw(&mut self) -> Result<usize, XmlParserErrors> {
        let before = self.raw.as_ref().map_or(0, |raw| raw.len());
        let Ok(written) = self.decode(true) else {
            xml_ioerr(XmlParserErrors::XmlIOEncoder, None);
            self.error = XmlParserErrors::XmlIOEncoder;
            return Err(self.error);
        };
        let after = self.raw.as_ref().map_or(0, |raw| raw.len());
        self.rawconsumed = self
            .rawconsumed
            .saturating_add(before.saturating_sub(after) as u64);
        Ok(written)
    }
}

impl std::fmt::Debug for XmlParserInputBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmlParserInputBuffer")
            .field("encoder", &self.encoder)
            .field("buffered", &self.buffer.len())
            .field("error", &self.error)
            .finish()
    }
}

/// Read everything `input` can provide into a single UTF-8 byte vector.
pub(crate) fn read_to_end(mut input: XmlParserInputBuffer) -> Result<Vec<u8>, XmlParserErrors> {
    while input.grow(MINLEN)? > 0 || input.context.is_some() {}
    Ok(input.buffer.as_bytes().to_vec())
}

impl From<Vec<u8>> for XmlParserInputBuffer {
    fn from(value: Vec<u8>) -> Self {
        Self::from_reader(Cursor::new(value), XmlCharEncoding::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_input_is_converted_to_utf8() {
        let input =
            XmlParserInputBuffer::from_memory(b"caf\xE9", XmlCharEncoding::ISO8859_1).unwrap();
        assert_eq!(input.buffer.as_bytes(), "caf\u{e9}".as_bytes());
        assert_eq!(input.raw_consumed(), 4);
    }

    #[test]
    fn reader_input_grows_until_the_end() {
        let input = XmlParserInputBuffer::from(b"<doc/>".to_vec());
        assert_eq!(read_to_end(input).unwrap(), b"<doc/>");
    }

    #[test]
    fn static_input_is_read_only() {
        let mut input = XmlParserInputBuffer::from_static(b"abc", XmlCharEncoding::None).unwrap();
        assert_eq!(input.buffer.as_bytes(), b"abc");
        assert_eq!(input.grow(10), Ok(0));
        assert_eq!(input.push_bytes(b"d"), Err(XmlParserErrors::XmlErrArgument));
    }

    #[test]
    fn malformed_input_sets_the_encoder_error() {
        let mut input = XmlParserInputBuffer::new(XmlCharEncoding::ASCII);
        assert!(input.push_bytes(b"ab\xFFc").is_err());
        assert_eq!(input.buffer.as_bytes(), b"ab");
        assert_eq!(input.error(), XmlParserErrors::XmlIOEncoder);
    }
}
