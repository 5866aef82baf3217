//! Provide methods and data structures for error handling.
//! This module is based on `libxml/xmlerror.h`, `error.c`, and so on in `libxml2-v2.11.8`.
//!
//! Please refer to original libxml2 documents also.

use std::{
    borrow::Cow,
    fmt::{self, Display},
    io::Write,
};

use crate::{globals::GLOBAL_STATE, tree::XmlNodeId};

/// Indicates the level of an error
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum XmlErrorLevel {
    #[default]
    XmlErrNone = 0,
    XmlErrWarning = 1, /* A simple warning */
    XmlErrError = 2,   /* A recoverable error */
    XmlErrFatal = 3,   /* A fatal error */
}

/// Indicates where an error may have come from
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XmlErrorDomain {
    #[default]
    XmlFromNone = 0,
    XmlFromParser,   /* The XML parser */
    XmlFromTree,     /* The tree module */
    XmlFromNamespace, /* The XML Namespace module */
    XmlFromDTD,      /* The XML DTD validation with parser context */
    XmlFromHTML,     /* The HTML parser */
    XmlFromMemory,   /* The memory allocator */
    XmlFromOutput,   /* The serialization code */
    XmlFromIO,       /* The Input/Output stack */
    XmlFromValid,    /* The XML DTD validation with valid context */
    XmlFromI18N,     /* The I18N module */
    XmlFromBuffer,   /* The buffers module */
    XmlFromURI,      /* The URI module */
}

impl Display for XmlErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::XmlFromNone => "",
            Self::XmlFromParser => "parser ",
            Self::XmlFromTree => "tree ",
            Self::XmlFromNamespace => "namespace ",
            Self::XmlFromDTD => "validity ",
            Self::XmlFromHTML => "HTML parser ",
            Self::XmlFromMemory => "memory ",
            Self::XmlFromOutput => "output ",
            Self::XmlFromIO => "I/O ",
            Self::XmlFromValid => "validity ",
            Self::XmlFromI18N => "encoding ",
            Self::XmlFromBuffer => "buffer ",
            Self::XmlFromURI => "URI ",
        };
        write!(f, "{s}")
    }
}

macro_rules! impl_xml_parser_errors {
    ( $( $variant:ident = $value:literal => $msg:literal ),* $(,)? ) => {
        /// This is an error that the tree, the serializer or the I/O layer can generate.
        #[repr(C)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub enum XmlParserErrors {
            #[default]
            XmlErrOK = 0,
            $( $variant = $value ),*
        }

        impl XmlParserErrors {
            /// Human readable description of this error code.
            pub fn message(&self) -> &'static str {
                match self {
                    Self::XmlErrOK => "no error",
                    $( Self::$variant => $msg ),*
                }
            }
        }

        impl TryFrom<i32> for XmlParserErrors {
            type Error = anyhow::Error;
            fn try_from(value: i32) -> Result<Self, Self::Error> {
                if value == 0 {
                    return Ok(Self::XmlErrOK);
                }
                $(
                    if value == Self::$variant as i32 {
                        return Ok(Self::$variant);
                    }
                )*
                Err(anyhow::anyhow!("Invalid convert from value '{value}' to {}", std::any::type_name::<Self>()))
            }
        }
    };
}

impl_xml_parser_errors!(
    XmlErrInternalError = 1 => "internal error",
    XmlErrNoMemory = 2 => "out of memory",
    XmlErrUnsupportedEncoding = 32 => "unsupported encoding",
    XmlErrArgument = 115 => "invalid argument",
    XmlErrUnsupportedFeature = 116 => "unsupported feature",
    XmlErrSystem = 117 => "system error",
    XmlErrRessourceLimit = 118 => "resource limit exceeded",
    XmlErrNotFound = 119 => "not found",
    XmlErrEntityProcessing = 104 => "entity processing error",
    XmlWarEntityRedefined = 107 => "entity redefined",
    XmlNsErrUndefinedNamespace = 201 => "undefined namespace",
    XmlDTDAttributeDefault = 500 => "invalid attribute default value",
    XmlDTDAttributeRedefined = 501 => "attribute redefined",
    XmlDTDElemRedefined = 509 => "element redefined",
    XmlDTDIDRedefined = 513 => "ID redefined",
    XmlDTDMultipleID = 520 => "multiple ID attributes",
    XmlDTDNoDTD = 522 => "no DTD",
    XmlDTDNotationRedefined = 526 => "notation redefined",
    XmlDTDDupToken = 541 => "duplicate token",
    XmlDTDUnknownElem = 534 => "unknown element",
    XmlTreeInvalidHex = 1300 => "invalid hexadecimal character value",
    XmlTreeInvalidDec = 1301 => "invalid decimal character value",
    XmlTreeUnterminatedEntity = 1302 => "unterminated entity reference",
    XmlTreeNotUTF8 = 1303 => "string is not in UTF-8",
    XmlTreeWrongParent = 1304 => "node has a wrong parent",
    XmlTreeInvalidName = 1305 => "invalid name",
    XmlTreeNamespaceConflict = 1306 => "namespace conflict",
    XmlSaveNotUTF8 = 1400 => "string not in UTF-8",
    XmlSaveCharInvalid = 1401 => "invalid character value",
    XmlSaveNoDoctype = 1402 => "document has no DOCTYPE",
    XmlSaveUnknownEncoding = 1403 => "unknown encoding",
    XmlIOUnknown = 1500 => "unknown IO error",
    XmlIOEACCES = 1501 => "permission denied",
    XmlIOEINVAL = 1527 => "invalid argument",
    XmlIOEIO = 1528 => "input/output error",
    XmlIOENOENT = 1533 => "no such file or directory",
    XmlIOEncoder = 1544 => "encoder error",
    XmlIOFlush = 1545 => "flush error",
    XmlIOWrite = 1546 => "write error",
    XmlIONoInput = 1547 => "no input",
    XmlIONetworkAttempt = 1552 => "attempt to load network entity",
    XmlBufOverflow = 7000 => "buffer overflow",
    XmlBufBoundedExceeded = 7001 => "bounded buffer size exceeded",
);

impl XmlParserErrors {
    pub fn is_ok(&self) -> bool {
        *self == Self::XmlErrOK
    }

    pub fn is_err(&self) -> bool {
        !self.is_ok()
    }
}

impl Display for XmlParserErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

impl std::error::Error for XmlParserErrors {}

/// An XML error as reported through the error channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlError {
    pub(crate) domain: XmlErrorDomain,
    pub(crate) code: XmlParserErrors,
    pub(crate) message: Option<Cow<'static, str>>,
    pub(crate) level: XmlErrorLevel,
    pub(crate) node: Option<XmlNodeId>,
    pub(crate) str1: Option<Cow<'static, str>>,
}

impl XmlError {
    pub fn domain(&self) -> XmlErrorDomain {
        self.domain
    }

    pub fn code(&self) -> XmlParserErrors {
        self.code
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn level(&self) -> XmlErrorLevel {
        self.level
    }

    pub fn node(&self) -> Option<XmlNodeId> {
        self.node
    }

    pub fn str1(&self) -> Option<&str> {
        self.str1.as_deref()
    }

    pub fn is_ok(&self) -> bool {
        self.code.is_ok()
    }

    pub fn is_err(&self) -> bool {
        self.code.is_err()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

impl Display for XmlError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let level = match self.level {
            XmlErrorLevel::XmlErrNone => "",
            XmlErrorLevel::XmlErrWarning => "warning",
            XmlErrorLevel::XmlErrError => "error",
            XmlErrorLevel::XmlErrFatal => "fatal error",
        };
        write!(
            f,
            "{}{level} : {}",
            self.domain,
            self.message.as_deref().unwrap_or(self.code.message())
        )
    }
}

/// Default handler for out of context error messages.
#[doc(alias = "xmlGenericErrorDefaultFunc")]
pub fn generic_error_default(out: Option<&mut (dyn Write + 'static)>, msg: &str) {
    if let Some(out) = out {
        write!(out, "{msg}").ok();
    } else {
        eprint!("{msg}");
    }
}

/// Print a message through the generic error handler of the current thread.
#[macro_export]
macro_rules! generic_error {
    ($($arg:tt)*) => {
        $crate::error::generic_error_message(&format!($($arg)*))
    };
}

#[doc(hidden)]
pub fn generic_error_message(msg: &str) {
    let (generic, mut context) = GLOBAL_STATE.with_borrow_mut(|state| {
        (state.generic_error, state.generic_error_context.take())
    });
    generic(context.as_deref_mut(), msg);
    restore_generic_context(context);
}

fn restore_generic_context(context: Option<Box<dyn Write>>) {
    if context.is_some() {
        GLOBAL_STATE.with_borrow_mut(|state| {
            if state.generic_error_context.is_none() {
                state.generic_error_context = context;
            }
        });
    }
}

/// Report an error through the thread-local error channel.
///
/// The error always becomes the last error. If a structured handler is installed
/// it receives the error, otherwise the generic handler prints it.
#[doc(alias = "__xmlRaiseError")]
pub(crate) fn xml_raise_error(error: XmlError) {
    let (structured, generic, mut context) = GLOBAL_STATE.with_borrow_mut(|state| {
        state.last_error = error.clone();
        (
            state.structured_error,
            state.generic_error,
            state.generic_error_context.take(),
        )
    });
    // handlers run without the state borrowed so that they may query it
    if let Some(handler) = structured {
        handler(&error);
    } else {
        generic(context.as_deref_mut(), &format!("{error}\n"));
    }
    restore_generic_context(context);
}

/// Handle an error with a code, the context node and an extra information.
#[doc(alias = "__xmlSimpleError")]
pub(crate) fn xml_simple_error(
    domain: XmlErrorDomain,
    code: XmlParserErrors,
    node: Option<XmlNodeId>,
    extra: Option<&str>,
) {
    if code == XmlParserErrors::XmlErrNoMemory {
        xml_simple_oom_error(domain, node, extra);
        return;
    }
    let message = match extra {
        Some(extra) => format!("{} : {extra}", code.message()),
        None => code.message().to_owned(),
    };
    xml_raise_error(XmlError {
        domain,
        code,
        message: Some(Cow::Owned(message)),
        level: XmlErrorLevel::XmlErrError,
        node,
        str1: extra.map(|s| Cow::Owned(s.to_owned())),
    });
}

/// Handle an out of memory condition.
#[doc(alias = "__xmlSimpleOOMError")]
pub(crate) fn xml_simple_oom_error(
    domain: XmlErrorDomain,
    node: Option<XmlNodeId>,
    extra: Option<&str>,
) {
    let message = match extra {
        Some(extra) => Cow::Owned(format!("Memory allocation failed : {extra}")),
        None => Cow::Borrowed("Memory allocation failed"),
    };
    xml_raise_error(XmlError {
        domain,
        code: XmlParserErrors::XmlErrNoMemory,
        message: Some(message),
        level: XmlErrorLevel::XmlErrFatal,
        node,
        str1: None,
    });
}

/// Report a tree error and hand the code back, for use with `map_err` and `?`.
pub(crate) fn xml_tree_err(code: XmlParserErrors, node: Option<XmlNodeId>, extra: &str) -> XmlParserErrors {
    xml_simple_error(XmlErrorDomain::XmlFromTree, code, node, Some(extra));
    code
}

/// Get the last global error registered.
#[doc(alias = "xmlGetLastError")]
pub fn get_last_error() -> XmlError {
    GLOBAL_STATE.with_borrow(|state| state.last_error.clone())
}

/// Cleanup the last global error registered.
#[doc(alias = "xmlResetLastError")]
pub fn reset_last_error() {
    GLOBAL_STATE.with_borrow_mut(|state| state.last_error.reset());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_error_is_recorded_and_reset() {
        reset_last_error();
        xml_simple_error(
            XmlErrorDomain::XmlFromTree,
            XmlParserErrors::XmlTreeInvalidName,
            None,
            Some("1abc"),
        );
        let err = get_last_error();
        assert_eq!(err.code(), XmlParserErrors::XmlTreeInvalidName);
        assert_eq!(err.domain(), XmlErrorDomain::XmlFromTree);
        assert_eq!(err.str1(), Some("1abc"));
        reset_last_error();
        assert!(get_last_error().is_ok());
    }

    #[test]
    fn error_codes_convert_from_integers() {
        assert_eq!(
            XmlParserErrors::try_from(513).unwrap(),
            XmlParserErrors::XmlDTDIDRedefined
        );
        assert!(XmlParserErrors::try_from(-5).is_err());
    }
}
