//! Provide methods and data structures for handling I/O actions.
//! This module is based on `libxml/xmlIO.h`, `xmlIO.c`, and so on in `libxml2-v2.11.8`.
//!
//! Please refer to original libxml2 documents also.

// Copyright of the original code is the following.
// --------
// Summary: interface for the I/O interfaces used by the parser
// Description: interface for the I/O interfaces used by the parser
//
// Copy: See Copyright for the status of this software.
//
// Author: Daniel Veillard
// --------
// xmlIO.c : implementation of the I/O interfaces used by the parser
//
// See Copyright for the status of this software.
//
// daniel@veillard.com
//
// 14 Nov 2000 ht - for VMS, truncated name of long functions to under 32 char

mod input;
#[cfg(feature = "libxml_output")]
mod output;

use std::{
    borrow::Cow,
    fs::{File, metadata},
    io::{self, ErrorKind, Read, stdin},
    path::Path,
};

use libc::{EACCES, EINVAL, EIO, ENOENT};

use crate::{
    error::{XmlErrorDomain, XmlParserErrors, xml_simple_error, xml_simple_oom_error},
    uri::unescape_url,
};

pub use input::*;
#[cfg(feature = "libxml_output")]
pub use output::*;

/// Minimum number of bytes read or written in one I/O round.
pub(crate) const MINLEN: usize = 4000;

/// Transparently decompress the input. Compressed input is not supported, so
/// this flag is accepted and ignored.
pub const XML_INPUT_UNZIP: i32 = 1 << 3;
/// Allow network access when resolving a URL.
pub const XML_INPUT_NETWORK: i32 = 1 << 4;

/// Handle an out of memory condition
#[doc(alias = "xmlIOErrMemory")]
pub(crate) fn xml_ioerr_memory(extra: &str) {
    xml_simple_oom_error(XmlErrorDomain::XmlFromIO, None, Some(extra));
}

/// Handle an I/O error
#[doc(alias = "__xmlIOErr")]
pub(crate) fn xml_ioerr(code: XmlParserErrors, extra: Option<&str>) {
    xml_simple_error(XmlErrorDomain::XmlFromIO, code, None, extra);
}

/// Map an I/O error to the closest error code.
pub(crate) fn io_error_code(err: &io::Error) -> XmlParserErrors {
    match err.kind() {
        ErrorKind::NotFound => return XmlParserErrors::XmlIOENOENT,
        ErrorKind::PermissionDenied => return XmlParserErrors::XmlIOEACCES,
        ErrorKind::InvalidInput => return XmlParserErrors::XmlIOEINVAL,
        _ => {}
    }
    match err.raw_os_error() {
        Some(ENOENT) => XmlParserErrors::XmlIOENOENT,
        Some(EACCES) => XmlParserErrors::XmlIOEACCES,
        Some(EINVAL) => XmlParserErrors::XmlIOEINVAL,
        Some(EIO) => XmlParserErrors::XmlIOEIO,
        _ => XmlParserErrors::XmlIOUnknown,
    }
}

/// Check whether `uri` names a resource that can only be fetched over the network.
pub(crate) fn is_network_uri(uri: &str) -> bool {
    ["http://", "https://", "ftp://"].iter().any(|scheme| {
        uri.get(..scheme.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(scheme))
    })
}

/// Strip the `file://` scheme and unescape the rest, if `uri` has that form.
pub(crate) fn file_uri_to_path(uri: &str) -> Cow<'_, str> {
    let rest = if uri.starts_with("file://localhost/") {
        &uri[16..]
    } else if uri.starts_with("file:///") {
        &uri[7..]
    } else if uri.starts_with("file:/") {
        &uri[5..]
    } else {
        return Cow::Borrowed(uri);
    };
    match unescape_url(rest) {
        Ok(Cow::Borrowed(path)) => Cow::Borrowed(path),
        Ok(Cow::Owned(path)) => Cow::Owned(path),
        Err(_) => Cow::Borrowed(rest),
    }
}

/// function checks to see if `path` is a valid source (file, socket...) for XML.
///
/// if stat fails, returns 0 (if calling stat on the filename fails, it can't be right).
/// if stat succeeds and the file is a directory, returns 2.
/// otherwise returns 1.
#[doc(alias = "xmlCheckFilename")]
pub fn xml_check_filename(path: impl AsRef<Path>) -> i32 {
    match metadata(path.as_ref()) {
        Ok(meta) if meta.is_dir() => 2,
        Ok(_) => 1,
        Err(_) => 0,
    }
}

/// The compiled-in handler reading local files.
///
/// `"-"` reads the standard input.
#[derive(Debug, Clone, Copy)]
pub struct DefaultFileIOCallbacks;

impl XmlInputCallback for DefaultFileIOCallbacks {
    fn is_match(&self, _filename: &str) -> bool {
        true
    }

    fn open(&mut self, filename: &str) -> io::Result<Box<dyn Read>> {
        if filename == "-" {
            return Ok(Box::new(stdin()));
        }

        let path = file_uri_to_path(filename);
        match xml_check_filename(path.as_ref()) {
            0 => {
                return Err(io::Error::new(
                    ErrorKind::NotFound,
                    format!("{path} is not found"),
                ));
            }
            2 => {
                return Err(io::Error::new(
                    ErrorKind::InvalidInput,
                    format!("{path} is a directory"),
                ));
            }
            _ => {}
        }

        File::open(path.as_ref()).map(|file| Box::new(file) as Box<dyn Read>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_schemes_are_detected() {
        assert!(is_network_uri("http://example/"));
        assert!(is_network_uri("HTTPS://example/"));
        assert!(is_network_uri("ftp://example/a.xml"));
        assert!(!is_network_uri("file:///tmp/a.xml"));
        assert!(!is_network_uri("http"));
    }

    #[test]
    fn file_uris_become_paths() {
        assert_eq!(file_uri_to_path("file:///tmp/a%20b.xml"), "/tmp/a b.xml");
        assert_eq!(file_uri_to_path("file://localhost/etc/x"), "/etc/x");
        assert_eq!(file_uri_to_path("doc.xml"), "doc.xml");
    }

    #[test]
    fn io_errors_map_to_codes() {
        let err = io::Error::new(ErrorKind::NotFound, "x");
        assert_eq!(io_error_code(&err), XmlParserErrors::XmlIOENOENT);
        let err = io::Error::from_raw_os_error(EIO);
        assert_eq!(io_error_code(&err), XmlParserErrors::XmlIOEIO);
        let err = io::Error::other("x");
        assert_eq!(io_error_code(&err), XmlParserErrors::XmlIOUnknown);
    }
}
