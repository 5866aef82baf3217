//! Provide methods and data structures for tree manipulation.
//! This module is based on `libxml/tree.h`, `tree.c`, and so on in `libxml2-v2.11.8`.
//!
//! Please refer to original libxml2 documents also.

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

mod attribute;
mod buffer;
mod copy;
mod document;
mod dom_wrapper;
mod dtd;
#[cfg(feature = "libxml_output")]
mod dump;
mod entities;
mod generic;
mod id;
mod namespace;
mod node;

use std::{any::type_name, borrow::Cow};

pub use attribute::*;
pub use buffer::*;
pub use copy::*;
pub use document::*;
pub use dom_wrapper::*;
pub use dtd::*;
pub use entities::*;
pub use generic::*;
pub use id::*;
pub use namespace::*;
pub use node::*;

/// default buffer size 4000.
pub const BASE_BUFFER_SIZE: usize = 4096;

/// Maximum size allowed for a single text node when building a tree.
pub const XML_MAX_TEXT_LENGTH: usize = 10_000_000;

/// A buffer allocation scheme can be defined to either match exactly the
/// need or double it's allocated size each time it is found too small.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlBufferAllocationScheme {
    XmlBufferAllocDoubleit,  /* double each time one need to grow */
    XmlBufferAllocExact,     /* grow only to the minimal size */
    XmlBufferAllocImmutable, /* immutable buffer, deprecated */
    XmlBufferAllocIo,        /* special allocation scheme used for I/O */
    XmlBufferAllocHybrid,    /* exact up to a threshold, and doubleit thereafter */
    XmlBufferAllocBounded,   /* limit the upper size of the buffer */
}

impl TryFrom<i32> for XmlBufferAllocationScheme {
    type Error = anyhow::Error;
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::XmlBufferAllocDoubleit),
            1 => Ok(Self::XmlBufferAllocExact),
            2 => Ok(Self::XmlBufferAllocImmutable),
            3 => Ok(Self::XmlBufferAllocIo),
            4 => Ok(Self::XmlBufferAllocHybrid),
            5 => Ok(Self::XmlBufferAllocBounded),
            _ => Err(anyhow::anyhow!(
                "Invalid convert from value '{value}' to {}",
                type_name::<Self>()
            )),
        }
    }
}

/// This is the namespace for the special xml: prefix predefined in the
/// XML Namespace specification.
pub const XML_XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// This is the name for the special xml:id attribute
pub const XML_XML_ID: &str = "xml:id";

/// Names carried by text and comment nodes.
pub const XML_STRING_TEXT: &str = "text";
pub const XML_STRING_TEXT_NOENC: &str = "textnoenc";
pub const XML_STRING_COMMENT: &str = "comment";

/// The different element types carried by an XML tree.
///
/// # NOTE
/// This is synchronized with DOM Level1 values.
/// See <http://www.w3.org/TR/REC-DOM-Level-1/>
///
/// Actually this had diverged a bit, and now XML_DOCUMENT_TYPE_NODE should
/// be deprecated to use an XML_DTD_NODE.
///
/// The value `21` was used by the removed DOCB document node and stays reserved.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum XmlElementType {
    #[default]
    XmlInvalidNode = 0, // for a stale or unknown handle. This is invalid value.
    XmlElementNode = 1,
    XmlAttributeNode = 2,
    XmlTextNode = 3,
    XmlCDATASectionNode = 4,
    XmlEntityRefNode = 5,
    XmlEntityNode = 6,
    XmlPINode = 7,
    XmlCommentNode = 8,
    XmlDocumentNode = 9,
    XmlDocumentTypeNode = 10,
    XmlDocumentFragNode = 11,
    XmlNotationNode = 12,
    XmlHTMLDocumentNode = 13,
    XmlDTDNode = 14,
    XmlElementDecl = 15,
    XmlAttributeDecl = 16,
    XmlEntityDecl = 17,
    XmlNamespaceDecl = 18,
    XmlXIncludeStart = 19,
    XmlXIncludeEnd = 20,
}

impl TryFrom<i32> for XmlElementType {
    type Error = anyhow::Error;
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        use XmlElementType::*;
        const TYPES: [XmlElementType; 20] = [
            XmlElementNode,
            XmlAttributeNode,
            XmlTextNode,
            XmlCDATASectionNode,
            XmlEntityRefNode,
            XmlEntityNode,
            XmlPINode,
            XmlCommentNode,
            XmlDocumentNode,
            XmlDocumentTypeNode,
            XmlDocumentFragNode,
            XmlNotationNode,
            XmlHTMLDocumentNode,
            XmlDTDNode,
            XmlElementDecl,
            XmlAttributeDecl,
            XmlEntityDecl,
            XmlNamespaceDecl,
            XmlXIncludeStart,
            XmlXIncludeEnd,
        ];
        usize::try_from(value)
            .ok()
            .and_then(|v| v.checked_sub(1))
            .and_then(|i| TYPES.get(i).copied())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "Invalid convert from value '{value}' to {}",
                    type_name::<Self>()
                )
            })
    }
}

/// A DTD Attribute type definition.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlAttributeType {
    XmlAttributeCDATA = 1,
    XmlAttributeID,
    XmlAttributeIDREF,
    XmlAttributeIDREFS,
    XmlAttributeEntity,
    XmlAttributeEntities,
    XmlAttributeNmtoken,
    XmlAttributeNmtokens,
    XmlAttributeEnumeration,
    XmlAttributeNotation,
}

impl TryFrom<i32> for XmlAttributeType {
    type Error = anyhow::Error;
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        use XmlAttributeType::*;
        match value {
            1 => Ok(XmlAttributeCDATA),
            2 => Ok(XmlAttributeID),
            3 => Ok(XmlAttributeIDREF),
            4 => Ok(XmlAttributeIDREFS),
            5 => Ok(XmlAttributeEntity),
            6 => Ok(XmlAttributeEntities),
            7 => Ok(XmlAttributeNmtoken),
            8 => Ok(XmlAttributeNmtokens),
            9 => Ok(XmlAttributeEnumeration),
            10 => Ok(XmlAttributeNotation),
            _ => Err(anyhow::anyhow!(
                "Invalid convert from value '{value}' to {}",
                type_name::<Self>()
            )),
        }
    }
}

/// A DTD Attribute default definition.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlAttributeDefault {
    XmlAttributeNone = 1,
    XmlAttributeRequired,
    XmlAttributeImplied,
    XmlAttributeFixed,
}

impl TryFrom<i32> for XmlAttributeDefault {
    type Error = anyhow::Error;
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::XmlAttributeNone),
            2 => Ok(Self::XmlAttributeRequired),
            3 => Ok(Self::XmlAttributeImplied),
            4 => Ok(Self::XmlAttributeFixed),
            _ => Err(anyhow::anyhow!(
                "Invalid convert from value '{value}' to {}",
                type_name::<Self>()
            )),
        }
    }
}

/// Possible definitions of element content types.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlElementContentType {
    XmlElementContentPCDATA = 1,
    XmlElementContentElement,
    XmlElementContentSeq,
    XmlElementContentOr,
}

/// Possible definitions of element content occurrences.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlElementContentOccur {
    XmlElementContentOnce = 1,
    XmlElementContentOpt,
    XmlElementContentMult,
    XmlElementContentPlus,
}

/// The different possibilities for an element content type.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlElementTypeVal {
    XmlElementTypeUndefined = 0,
    XmlElementTypeEmpty = 1,
    XmlElementTypeAny,
    XmlElementTypeMixed,
    XmlElementTypeElement,
}

impl TryFrom<i32> for XmlElementTypeVal {
    type Error = anyhow::Error;
    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::XmlElementTypeUndefined),
            1 => Ok(Self::XmlElementTypeEmpty),
            2 => Ok(Self::XmlElementTypeAny),
            3 => Ok(Self::XmlElementTypeMixed),
            4 => Ok(Self::XmlElementTypeElement),
            _ => Err(anyhow::anyhow!(
                "Invalid convert from value '{value}' to {}",
                type_name::<Self>()
            )),
        }
    }
}

/// Set of properties of the document as found by the parser.
/// Some of them are linked to similarly named `XmlParserOption`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlDocProperties {
    XmlDocWellformed = 1 << 0, /* document is XML well formed */
    XmlDocNsvalid = 1 << 1,    /* document is Namespace valid */
    XmlDocOld10 = 1 << 2,      /* parsed with old XML-1.0 parser */
    XmlDocDTDValid = 1 << 3,   /* DTD validation was successful */
    XmlDocXInclude = 1 << 4,   /* XInclude substitution was done */
    XmlDocUserbuilt = 1 << 5,  /* Document was built using the API
                               and not by parsing an instance */
    XmlDocInternal = 1 << 6, /* built for internal processing */
    XmlDocHTML = 1 << 7,     /* parsed or built HTML document */
}

/// Callback invoked right after a node is created.
pub type XmlRegisterNodeFunc = fn(&XmlTree, XmlNodeId);
/// Callback invoked right before a node is freed.
pub type XmlDeregisterNodeFunc = fn(&XmlTree, XmlNodeId);

/// Node creation and destruction hooks of a tree.
///
/// Every [`XmlTree`] owns a copy, initialized from the thread defaults set by
/// `register_node_default` and `deregister_node_default`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct XmlTreeHooks {
    pub register: Option<XmlRegisterNodeFunc>,
    pub deregister: Option<XmlDeregisterNodeFunc>,
}

impl XmlTreeHooks {
    /// The hooks currently registered as thread defaults.
    pub fn from_defaults() -> Self {
        crate::globals::GLOBAL_STATE.with_borrow(|state| Self {
            register: state.register_node_default_value,
            deregister: state.deregister_node_default_value,
        })
    }
}

pub(crate) fn xml_is_blank_char(c: char) -> bool {
    matches!(c, '\x20' | '\x09' | '\x0A' | '\x0D')
}

/// `NameStartChar` of XML 1.0 Fifth Edition.
pub(crate) fn xml_is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | 'A'..='Z' | '_' | 'a'..='z'
        | '\u{C0}'..='\u{D6}'
        | '\u{D8}'..='\u{F6}'
        | '\u{F8}'..='\u{2FF}'
        | '\u{370}'..='\u{37D}'
        | '\u{37F}'..='\u{1FFF}'
        | '\u{200C}'..='\u{200D}'
        | '\u{2070}'..='\u{218F}'
        | '\u{2C00}'..='\u{2FEF}'
        | '\u{3001}'..='\u{D7FF}'
        | '\u{F900}'..='\u{FDCF}'
        | '\u{FDF0}'..='\u{FFFD}'
        | '\u{10000}'..='\u{EFFFF}')
}

/// `NameChar` of XML 1.0 Fifth Edition.
pub(crate) fn xml_is_name_char(c: char) -> bool {
    xml_is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}'
            | '\u{0300}'..='\u{036F}'
            | '\u{203F}'..='\u{2040}')
}

fn trim_blanks<const ALLOW_SPACE: bool>(value: &str) -> &str {
    if ALLOW_SPACE {
        value.trim_matches(xml_is_blank_char)
    } else {
        value
    }
}

fn is_ncname(value: &str) -> bool {
    let mut chars = value.chars();
    chars
        .next()
        .is_some_and(|c| c != ':' && xml_is_name_start_char(c))
        && chars.all(|c| c != ':' && xml_is_name_char(c))
}

/// Check that a value conforms to the lexical space of NCName
///
/// Returns `Ok` if this validates, `Err` otherwise.
#[doc(alias = "xmlValidateNCName")]
pub fn validate_ncname<const ALLOW_SPACE: bool>(value: &str) -> Result<(), &'static str> {
    if is_ncname(trim_blanks::<ALLOW_SPACE>(value)) {
        Ok(())
    } else {
        Err("Invalid NCName")
    }
}

/// Check that a value conforms to the lexical space of QName
///
/// Returns `Ok` if this validates, `Err` otherwise.
#[doc(alias = "xmlValidateQName")]
pub fn validate_qname<const ALLOW_SPACE: bool>(value: &str) -> Result<(), &'static str> {
    let value = trim_blanks::<ALLOW_SPACE>(value);
    let valid = match value.split_once(':') {
        Some((prefix, local)) => is_ncname(prefix) && is_ncname(local),
        None => is_ncname(value),
    };
    if valid { Ok(()) } else { Err("Invalid QName") }
}

/// Check that a value conforms to the lexical space of Name
///
/// Returns `Ok` if this validates, `Err` otherwise.
#[doc(alias = "xmlValidateName")]
pub fn validate_name<const ALLOW_SPACE: bool>(value: &str) -> Result<(), &'static str> {
    let mut chars = trim_blanks::<ALLOW_SPACE>(value).chars();
    if chars.next().is_some_and(xml_is_name_start_char) && chars.all(xml_is_name_char) {
        Ok(())
    } else {
        Err("Invalid Name")
    }
}

/// Check that a value conforms to the lexical space of NMToken
///
/// Returns `Ok` if this validates, `Err` otherwise.
#[doc(alias = "xmlValidateNMToken")]
pub fn validate_nmtoken<const ALLOW_SPACE: bool>(value: &str) -> Result<(), &'static str> {
    let value = trim_blanks::<ALLOW_SPACE>(value);
    if !value.is_empty() && value.chars().all(xml_is_name_char) {
        Ok(())
    } else {
        Err("Invalid NMToken")
    }
}

/// Builds the QName `prefix:ncname` in `memory` if there is enough space
/// and prefix is not `None` nor empty, otherwise allocate a new string.
/// If prefix is `None` or empty it returns `ncname`.
///
/// As the original C API, `memory` must leave room for a NUL terminator,
/// so `prefix.len() + ncname.len() + 2` bytes are required to use it.
#[doc(alias = "xmlBuildQName")]
pub fn build_qname<'a>(
    ncname: &'a str,
    prefix: Option<&str>,
    memory: Option<&'a mut [u8]>,
) -> Cow<'a, str> {
    let Some(prefix) = prefix.filter(|p| !p.is_empty()) else {
        return Cow::Borrowed(ncname);
    };
    let (lenp, lenn) = (prefix.len(), ncname.len());
    match memory {
        Some(memory) if memory.len() >= lenn + lenp + 2 => {
            memory[..lenp].copy_from_slice(prefix.as_bytes());
            memory[lenp] = b':';
            memory[lenp + 1..lenp + 1 + lenn].copy_from_slice(ncname.as_bytes());
            memory[lenp + 1 + lenn] = 0;
            let memory: &'a [u8] = memory;
            match std::str::from_utf8(&memory[..lenp + 1 + lenn]) {
                Ok(qname) => Cow::Borrowed(qname),
                Err(_) => Cow::Owned(format!("{prefix}:{ncname}")),
            }
        }
        _ => Cow::Owned(format!("{prefix}:{ncname}")),
    }
}

/// Parse an XML qualified name string
///
/// ```text
/// [NS 5] QName ::= (Prefix ':')? LocalPart
///
/// [NS 6] Prefix ::= NCName
///
/// [NS 7] LocalPart ::= NCName
/// ```
///
/// Returns `None` if the name doesn't have a prefix.
/// Otherwise, returns `(prefix, local part)`.
#[doc(alias = "xmlSplitQName2")]
pub fn split_qname2(name: &str) -> Option<(&str, &str)> {
    // nasty but valid
    if name.starts_with(':') {
        return None;
    }
    // we are not trying to validate but just to cut
    name.split_once(':')
}

/// Parse an XML qualified name string without allocation.
///
/// Returns `None` if it is not a Qualified Name, otherwise, returns the length
/// in byte of the prefix and the name without the prefix.
#[doc(alias = "xmlSplitQName3")]
pub fn split_qname3(name: &str) -> Option<(usize, &str)> {
    split_qname2(name).map(|(prefix, local)| (prefix.len(), local))
}

/// Parse an XML qualified name.
///
/// Returns `(prefix, local name)`. `prefix` is `None` if `name` has no prefix.
#[doc(alias = "xmlSplitQName4")]
pub fn split_qname(name: &str) -> (Option<&str>, &str) {
    match split_qname2(name) {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_qname_uses_scratch_when_it_fits() {
        let mut scratch = [0u8; 16];
        let qname = build_qname("local", Some("ns"), Some(&mut scratch[..]));
        assert!(matches!(qname, Cow::Borrowed(_)));
        assert_eq!(qname, "ns:local");

        let mut small = [0u8; 8];
        let qname = build_qname("local", Some("ns"), Some(&mut small[..]));
        assert!(matches!(qname, Cow::Owned(_)));
        assert_eq!(qname, "ns:local");

        assert_eq!(build_qname("local", None, None), "local");
        assert_eq!(build_qname("local", Some(""), None), "local");
    }

    #[test]
    fn split_then_build_is_identity() {
        for name in ["a:b", "xml:lang", "p:q:r"] {
            let (prefix, local) = split_qname2(name).unwrap();
            assert_eq!(build_qname(local, Some(prefix), None), name);
        }
        assert_eq!(split_qname2("plain"), None);
        assert_eq!(split_qname2(":odd"), None);
        assert_eq!(split_qname3("ab:cd"), Some((2, "cd")));
        assert_eq!(split_qname("cd"), (None, "cd"));
    }

    #[test]
    fn name_validation() {
        assert!(validate_ncname::<false>("abc").is_ok());
        assert!(validate_ncname::<false>("a:b").is_err());
        assert!(validate_ncname::<false>("1abc").is_err());
        assert!(validate_ncname::<false>(" abc ").is_err());
        assert!(validate_ncname::<true>(" abc ").is_ok());
        assert!(validate_qname::<false>("a:b").is_ok());
        assert!(validate_qname::<false>("a:").is_err());
        assert!(validate_qname::<false>("a:b:c").is_err());
        assert!(validate_name::<false>("a:b:c").is_ok());
        assert!(validate_name::<false>("-a").is_err());
        assert!(validate_nmtoken::<false>("-a").is_ok());
        assert!(validate_nmtoken::<false>("").is_err());
        assert!(validate_ncname::<false>("\u{00E9}t\u{00E9}").is_ok());
    }

    #[test]
    fn element_type_from_integer() {
        assert_eq!(
            XmlElementType::try_from(1).unwrap(),
            XmlElementType::XmlElementNode
        );
        assert_eq!(
            XmlElementType::try_from(20).unwrap(),
            XmlElementType::XmlXIncludeEnd
        );
        assert!(XmlElementType::try_from(21).is_err());
        assert!(XmlElementType::try_from(0).is_err());
    }
}
