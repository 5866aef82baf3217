//! Provide methods and data structures for serializing XML documents.
//! This module is based on `libxml/xmlsave.h`, `xmlsave.c`, and so on in `libxml2-v2.11.8`.
//!
//! Please refer to original libxml2 documents also.

// Copyright of the original code is the following.
// --------
// Summary: the XML document serializer
// Description: API to save document or subtree of document
//
// Copy: See Copyright for the status of this software.
//
// Author: Daniel Veillard
// --------
// xmlsave.c: Implementation of the document serializer
//
// See Copyright for the status of this software.
//
// daniel@veillard.com

use std::io::Write;

use crate::{
    encoding::find_encoding_handler,
    error::{XmlErrorDomain, XmlParserErrors, xml_simple_error},
    globals::GLOBAL_STATE,
    io::XmlOutputBuffer,
    tree::{
        XML_STRING_TEXT_NOENC, XmlAttributeDefault, XmlAttributeType, XmlBuffer, XmlDocProperties,
        XmlElementContent, XmlElementContentOccur, XmlElementContentType, XmlElementType,
        XmlElementTypeVal, XmlEntityType, XmlNodeId, XmlNotation, XmlNsId, XmlTree, is_xhtml,
    },
};
#[cfg(feature = "html")]
use crate::html::{html_is_boolean_attr, html_node_dump_internal};

pub(crate) const MAX_INDENT: usize = 60;

#[cfg(feature = "html")]
const XHTML_NS_NAME: &str = "http://www.w3.org/1999/xhtml";

/// Escaping routine applied to text or attribute content before output.
pub type XmlCharEncodingOutputFunc = fn(&str, &mut String);

/// This is the set of XML save options that can be passed down
/// to the `XmlSaveCtxt::save_to_*` functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlSaveOption {
    XmlSaveFormat = 1 << 0,   /* format save output */
    XmlSaveNoDecl = 1 << 1,   /* drop the xml declaration */
    XmlSaveNoEmpty = 1 << 2,  /* no empty tags */
    XmlSaveNoXHTML = 1 << 3,  /* disable XHTML1 specific rules */
    XmlSaveXHTML = 1 << 4,    /* force XHTML1 specific rules */
    XmlSaveAsXML = 1 << 5,    /* force XML serialization on HTML doc */
    XmlSaveAsHTML = 1 << 6,   /* force HTML serialization on XML doc */
    XmlSaveWsNonSig = 1 << 7, /* format with non-significant whitespace */
    XmlSaveEmpty = 1 << 8,    /* force empty tags, overriding global */
    XmlSaveNoIndent = 1 << 9, /* disable indenting */
    XmlSaveIndent = 1 << 10,  /* force indenting, overriding global */
}

const FORMAT: i32 = XmlSaveOption::XmlSaveFormat as i32;
const NO_DECL: i32 = XmlSaveOption::XmlSaveNoDecl as i32;
const NO_EMPTY: i32 = XmlSaveOption::XmlSaveNoEmpty as i32;
const NO_XHTML: i32 = XmlSaveOption::XmlSaveNoXHTML as i32;
const XHTML: i32 = XmlSaveOption::XmlSaveXHTML as i32;
const AS_XML: i32 = XmlSaveOption::XmlSaveAsXML as i32;
const AS_HTML: i32 = XmlSaveOption::XmlSaveAsHTML as i32;
const WS_NON_SIG: i32 = XmlSaveOption::XmlSaveWsNonSig as i32;
const EMPTY: i32 = XmlSaveOption::XmlSaveEmpty as i32;
const NO_INDENT: i32 = XmlSaveOption::XmlSaveNoIndent as i32;
const INDENT: i32 = XmlSaveOption::XmlSaveIndent as i32;

/// Handle an output error
#[doc(alias = "xmlSaveErr")]
pub(crate) fn xml_save_err(code: XmlParserErrors, node: Option<XmlNodeId>, extra: Option<&str>) {
    xml_simple_error(XmlErrorDomain::XmlFromOutput, code, node, extra);
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{D7FF}' | '\u{E000}'..='\u{FFFD}' | '\u{10000}'..)
}

fn push_hex_char_ref(out: &mut String, val: u32) {
    out.push_str(&format!("&#x{val:X};"));
}

/// Same quoting rule as `XmlBuf::push_quoted_str`.
fn push_quoted(out: &mut String, s: &str) {
    if !s.contains('"') {
        out.push('"');
        out.push_str(s);
        out.push('"');
    } else if !s.contains('\'') {
        out.push('\'');
        out.push_str(s);
        out.push('\'');
    } else {
        out.push('"');
        out.push_str(&s.replace('"', "&quot;"));
        out.push('"');
    }
}

/// Escape markup characters and every character outside of ASCII as a
/// hexadecimal character reference.
///
/// Used for text content when the output has no declared encoding.
#[doc(alias = "xmlEscapeEntities")]
pub fn xml_escape_entities(input: &str, out: &mut String) {
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '\n' | '\t' | '\u{20}'..='\u{7F}' => out.push(c),
            c if is_xml_char(c) => push_hex_char_ref(out, c as u32),
            c => xml_save_err(
                XmlParserErrors::XmlSaveCharInvalid,
                None,
                Some(&format!("U+{:04X}", c as u32)),
            ),
        }
    }
}

/// Serialize the text of an attribute value.
///
/// When `escape_non_ascii` is set, characters outside of ASCII become
/// hexadecimal character references.
#[doc(alias = "xmlBufAttrSerializeTxtContent")]
pub(crate) fn attr_serialize_text(out: &mut String, text: &str, escape_non_ascii: bool) {
    for c in text.chars() {
        match c {
            '\n' => out.push_str("&#10;"),
            '\r' => out.push_str("&#13;"),
            '\t' => out.push_str("&#9;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            c if !c.is_ascii() && escape_non_ascii => {
                if !is_xml_char(c) {
                    xml_save_err(
                        XmlParserErrors::XmlSaveCharInvalid,
                        None,
                        Some(&format!("U+{:04X}", c as u32)),
                    );
                }
                push_hex_char_ref(out, c as u32);
            }
            c => out.push(c),
        }
    }
}

fn push_element_occur(out: &mut String, content: &XmlElementContent) {
    match content.ocur() {
        XmlElementContentOccur::XmlElementContentOnce => {}
        XmlElementContentOccur::XmlElementContentOpt => out.push('?'),
        XmlElementContentOccur::XmlElementContentMult => out.push('*'),
        XmlElementContentOccur::XmlElementContentPlus => out.push('+'),
    }
}

fn dump_element_content_node(
    out: &mut String,
    content: &XmlElementContent,
    parent: Option<XmlElementContentType>,
) {
    match content.typ() {
        XmlElementContentType::XmlElementContentPCDATA => out.push_str("#PCDATA"),
        XmlElementContentType::XmlElementContentElement => {
            if let Some(prefix) = content.prefix() {
                out.push_str(prefix);
                out.push(':');
            }
            out.push_str(content.name().unwrap_or(""));
        }
        typ @ (XmlElementContentType::XmlElementContentSeq
        | XmlElementContentType::XmlElementContentOr) => {
            let englob = parent.is_some_and(|parent| {
                parent != typ || content.ocur() != XmlElementContentOccur::XmlElementContentOnce
            });
            if englob {
                out.push('(');
            }
            if let Some(c1) = content.c1() {
                dump_element_content_node(out, c1, Some(typ));
            }
            if typ == XmlElementContentType::XmlElementContentSeq {
                out.push_str(" , ");
            } else {
                out.push_str(" | ");
            }
            if let Some(c2) = content.c2() {
                dump_element_content_node(out, c2, Some(typ));
            }
            if englob {
                out.push(')');
            }
        }
    }
    if parent.is_some() {
        push_element_occur(out, content);
    }
}

/// Dump the content model of an element declaration, always wrapped in parentheses.
#[doc(alias = "xmlDumpElementContent")]
pub(crate) fn dump_element_content(out: &mut String, content: &XmlElementContent) {
    out.push('(');
    dump_element_content_node(out, content, None);
    out.push(')');
    push_element_occur(out, content);
}

/// Dump an element declaration.
#[doc(alias = "xmlBufDumpElementDecl")]
pub(crate) fn dump_element_decl(out: &mut String, tree: &XmlTree, decl: XmlNodeId) {
    let Some(node) = tree.get(decl) else {
        return;
    };
    let Some(elem) = node.as_element_decl() else {
        return;
    };
    out.push_str("<!ELEMENT ");
    if let Some(prefix) = elem.prefix() {
        out.push_str(prefix);
        out.push(':');
    }
    out.push_str(node.name().unwrap_or(""));
    match elem.etype() {
        XmlElementTypeVal::XmlElementTypeEmpty => out.push_str(" EMPTY"),
        XmlElementTypeVal::XmlElementTypeAny => out.push_str(" ANY"),
        XmlElementTypeVal::XmlElementTypeMixed | XmlElementTypeVal::XmlElementTypeElement => {
            out.push(' ');
            if let Some(content) = elem.content() {
                dump_element_content(out, content);
            }
        }
        XmlElementTypeVal::XmlElementTypeUndefined => {
            xml_save_err(
                XmlParserErrors::XmlErrInternalError,
                Some(decl),
                Some("unknown element type"),
            );
            return;
        }
    }
    out.push_str(">\n");
}

/// Dump an attribute declaration.
#[doc(alias = "xmlBufDumpAttributeDecl")]
pub(crate) fn dump_attribute_decl(out: &mut String, tree: &XmlTree, decl: XmlNodeId) {
    let Some(node) = tree.get(decl) else {
        return;
    };
    let Some(attr) = node.as_attribute_decl() else {
        return;
    };
    out.push_str("<!ATTLIST ");
    out.push_str(attr.elem());
    out.push(' ');
    if let Some(prefix) = attr.prefix() {
        out.push_str(prefix);
        out.push(':');
    }
    out.push_str(node.name().unwrap_or(""));
    let enumeration = |out: &mut String| {
        out.push_str(" (");
        if let Some(tree) = attr.tree() {
            for (i, name) in tree.iter().enumerate() {
                if i > 0 {
                    out.push_str(" | ");
                }
                out.push_str(name);
            }
        }
        out.push(')');
    };
    match attr.atype() {
        XmlAttributeType::XmlAttributeCDATA => out.push_str(" CDATA"),
        XmlAttributeType::XmlAttributeID => out.push_str(" ID"),
        XmlAttributeType::XmlAttributeIDREF => out.push_str(" IDREF"),
        XmlAttributeType::XmlAttributeIDREFS => out.push_str(" IDREFS"),
        XmlAttributeType::XmlAttributeEntity => out.push_str(" ENTITY"),
        XmlAttributeType::XmlAttributeEntities => out.push_str(" ENTITIES"),
        XmlAttributeType::XmlAttributeNmtoken => out.push_str(" NMTOKEN"),
        XmlAttributeType::XmlAttributeNmtokens => out.push_str(" NMTOKENS"),
        XmlAttributeType::XmlAttributeEnumeration => enumeration(out),
        XmlAttributeType::XmlAttributeNotation => {
            out.push_str(" NOTATION");
            enumeration(out);
        }
    }
    match attr.def() {
        XmlAttributeDefault::XmlAttributeNone => {}
        XmlAttributeDefault::XmlAttributeRequired => out.push_str(" #REQUIRED"),
        XmlAttributeDefault::XmlAttributeImplied => out.push_str(" #IMPLIED"),
        XmlAttributeDefault::XmlAttributeFixed => out.push_str(" #FIXED"),
    }
    if let Some(default) = attr.default_value() {
        out.push(' ');
        push_quoted(out, default);
    }
    out.push_str(">\n");
}

/// Write an entity value, escaping `%` and the quote it is wrapped in.
#[doc(alias = "xmlBufDumpEntityContent")]
fn dump_entity_content(out: &mut String, content: &str) {
    if !content.contains('%') {
        push_quoted(out, content);
        return;
    }
    out.push('"');
    for c in content.chars() {
        match c {
            '"' => out.push_str("&quot;"),
            '%' => out.push_str("&#x25;"),
            c => out.push(c),
        }
    }
    out.push('"');
}

/// Dump an entity declaration.
#[doc(alias = "xmlDumpEntityDecl")]
pub(crate) fn dump_entity_decl(out: &mut String, tree: &XmlTree, decl: XmlNodeId) {
    let Some(node) = tree.get(decl) else {
        return;
    };
    let Some(ent) = node.as_entity_decl() else {
        return;
    };
    let name = node.name().unwrap_or("");
    let ids = |out: &mut String| {
        if let Some(external_id) = ent.external_id() {
            out.push_str(" PUBLIC ");
            push_quoted(out, external_id);
            out.push(' ');
        } else {
            out.push_str(" SYSTEM ");
        }
        push_quoted(out, ent.system_id().unwrap_or(""));
    };
    match ent.etype() {
        XmlEntityType::XmlInternalGeneralEntity => {
            out.push_str("<!ENTITY ");
            out.push_str(name);
            out.push(' ');
            match ent.orig() {
                Some(orig) => push_quoted(out, orig),
                None => dump_entity_content(out, ent.content().unwrap_or("")),
            }
        }
        XmlEntityType::XmlExternalGeneralParsedEntity => {
            out.push_str("<!ENTITY ");
            out.push_str(name);
            ids(out);
        }
        XmlEntityType::XmlExternalGeneralUnparsedEntity => {
            out.push_str("<!ENTITY ");
            out.push_str(name);
            ids(out);
            if let Some(ndata) = ent.content() {
                out.push_str(" NDATA ");
                match ent.orig() {
                    Some(orig) => out.push_str(orig),
                    None => out.push_str(ndata),
                }
            }
        }
        XmlEntityType::XmlInternalParameterEntity => {
            out.push_str("<!ENTITY % ");
            out.push_str(name);
            out.push(' ');
            match ent.orig() {
                Some(orig) => push_quoted(out, orig),
                None => dump_entity_content(out, ent.content().unwrap_or("")),
            }
        }
        XmlEntityType::XmlExternalParameterEntity => {
            out.push_str("<!ENTITY % ");
            out.push_str(name);
            ids(out);
        }
        XmlEntityType::XmlInternalPredefinedEntity => return,
    }
    out.push_str(">\n");
}

/// Dump a notation declaration.
#[doc(alias = "xmlDumpNotationDecl")]
pub(crate) fn dump_notation_decl(out: &mut String, nota: &XmlNotation) {
    out.push_str("<!NOTATION ");
    out.push_str(nota.name());
    if let Some(public_id) = nota.public_id() {
        out.push_str(" PUBLIC ");
        push_quoted(out, public_id);
        if let Some(system_id) = nota.system_id() {
            out.push(' ');
            push_quoted(out, system_id);
        }
    } else {
        out.push_str(" SYSTEM ");
        push_quoted(out, nota.system_id().unwrap_or(""));
    }
    out.push_str(" >\n");
}

/// The state of one serialization run.
///
/// Created with one of the `save_to_*` constructors, fed with
/// [`save_doc`](XmlSaveCtxt::save_doc) or [`save_tree`](XmlSaveCtxt::save_tree),
/// and completed with [`close`](XmlSaveCtxt::close) or [`finish`](XmlSaveCtxt::finish).
#[doc(alias = "xmlSaveCtxt")]
#[derive(Default)]
pub struct XmlSaveCtxt<'a> {
    pub(crate) encoding: Option<String>,
    pub(crate) buf: XmlOutputBuffer<'a>,
    pub(crate) options: i32,
    pub(crate) level: i32,
    pub(crate) format: i32,
    indent: String,
    indent_nr: usize,
    indent_size: usize,
    indent_output: bool,
    // text content falls back to `xml_escape_entities` when no encoding is known
    entities_escape: bool,
    escape: Option<XmlCharEncodingOutputFunc>,
    escape_attr: Option<XmlCharEncodingOutputFunc>,
}

impl<'a> XmlSaveCtxt<'a> {
    /// Create a context writing into `buf`.
    #[doc(alias = "xmlNewSaveCtxt")]
    pub(crate) fn from_output(buf: XmlOutputBuffer<'a>, encoding: Option<&str>, options: i32) -> Self {
        let mut ctxt = Self {
            encoding: encoding.map(str::to_owned),
            buf,
            options,
            ..Default::default()
        };
        ctxt.init();
        if options & FORMAT != 0 {
            ctxt.format = 1;
        } else if options & WS_NON_SIG != 0 {
            ctxt.format = 2;
        }
        ctxt
    }

    fn init(&mut self) {
        self.entities_escape = self.encoding.is_none();
        let (indent, no_empty, indent_output) = GLOBAL_STATE.with_borrow(|state| {
            (
                state.tree_indent_string.clone(),
                state.save_no_empty_tags,
                state.indent_tree_output,
            )
        });
        self.set_indent(&indent);
        if self.options & EMPTY == 0 && no_empty {
            self.options |= NO_EMPTY;
        }
        self.indent_output = if self.options & INDENT != 0 {
            true
        } else if self.options & NO_INDENT != 0 {
            false
        } else {
            indent_output
        };
    }

    fn set_indent(&mut self, indent: &str) {
        self.indent.clear();
        self.indent_size = indent.len();
        self.indent_nr = MAX_INDENT.checked_div(indent.len()).unwrap_or(0);
        for _ in 0..self.indent_nr {
            self.indent.push_str(indent);
        }
    }

    /// Create a document saving context serializing to a writer.
    ///
    /// Fails with `XmlErrUnsupportedEncoding` if `encoding` has no known handler.
    #[doc(alias = "xmlSaveToIO")]
    pub fn save_to_io(
        writer: impl Write + 'a,
        encoding: Option<&str>,
        options: i32,
    ) -> Result<Self, XmlParserErrors> {
        let handler = lookup_handler(encoding)?;
        let buf = XmlOutputBuffer::from_writer(writer, handler);
        Ok(Self::from_output(buf, encoding, options))
    }

    /// Create a document saving context serializing to a buffer.
    #[doc(alias = "xmlSaveToBuffer")]
    pub fn save_to_buffer(
        buffer: &'a mut XmlBuffer,
        encoding: Option<&str>,
        options: i32,
    ) -> Result<Self, XmlParserErrors> {
        Self::save_to_io(buffer, encoding, options)
    }

    /// Create a document saving context serializing to a filename or URL.
    #[doc(alias = "xmlSaveToFilename")]
    pub fn save_to_filename(
        filename: &str,
        encoding: Option<&str>,
        options: i32,
    ) -> Result<Self, XmlParserErrors> {
        let handler = lookup_handler(encoding)?;
        let buf = XmlOutputBuffer::from_uri(filename, handler)?;
        Ok(Self::from_output(buf, encoding, options))
    }

    /// Set a custom indentation string. At most 60 bytes are accepted.
    #[doc(alias = "xmlSaveSetIndentString")]
    pub fn set_indent_string(&mut self, indent: &str) -> Result<(), XmlParserErrors> {
        if indent.len() > MAX_INDENT {
            return Err(XmlParserErrors::XmlErrArgument);
        }
        self.set_indent(indent);
        Ok(())
    }

    /// Set a custom escaping function for text content.
    #[doc(alias = "xmlSaveSetEscape")]
    pub fn set_escape(&mut self, escape: Option<XmlCharEncodingOutputFunc>) {
        self.escape = escape;
    }

    /// Set a custom escaping function for attribute values.
    #[doc(alias = "xmlSaveSetAttrEscape")]
    pub fn set_attr_escape(&mut self, escape: Option<XmlCharEncodingOutputFunc>) {
        self.escape_attr = escape;
    }

    /// Save a full document.
    #[doc(alias = "xmlSaveDoc")]
    pub fn save_doc(&mut self, tree: &XmlTree, doc: XmlNodeId) -> Result<(), XmlParserErrors> {
        self.doc_content_dump(tree, doc)?;
        self.check_error()
    }

    /// Save a subtree starting at `node`.
    #[doc(alias = "xmlSaveTree")]
    pub fn save_tree(&mut self, tree: &XmlTree, node: XmlNodeId) -> Result<(), XmlParserErrors> {
        if !tree.contains(node) {
            return Err(XmlParserErrors::XmlErrArgument);
        }
        #[cfg(feature = "html")]
        {
            if self.options & XHTML != 0 {
                self.xhtml_node_dump(tree, node);
                return self.check_error();
            }
            let html_doc = tree
                .document(node)
                .and_then(|doc| tree.get(doc))
                .is_some_and(|doc| doc.element_type() == XmlElementType::XmlHTMLDocumentNode);
            if (html_doc && self.options & AS_XML == 0) || self.options & AS_HTML != 0 {
                let encoding = self.encoding.clone();
                html_node_dump_internal(
                    &mut self.buf,
                    tree,
                    node,
                    encoding.as_deref(),
                    self.format == 1,
                );
                return self.check_error();
            }
        }
        self.node_dump_internal(tree, node);
        self.check_error()
    }

    /// Flush the pending output.
    ///
    /// Returns the number of bytes written.
    #[doc(alias = "xmlSaveFlush")]
    pub fn flush(&mut self) -> Result<usize, XmlParserErrors> {
        self.buf.flush()
    }

    /// Flush and release the context.
    ///
    /// Returns the number of bytes written.
    #[doc(alias = "xmlSaveClose")]
    pub fn close(self) -> Result<usize, XmlParserErrors> {
        self.buf.close()
    }

    /// Flush and release the context, returning the first error met, or `XmlErrOK`.
    #[doc(alias = "xmlSaveFinish")]
    pub fn finish(self) -> XmlParserErrors {
        match self.close() {
            Ok(_) => XmlParserErrors::XmlErrOK,
            Err(err) => err,
        }
    }

    fn check_error(&self) -> Result<(), XmlParserErrors> {
        match self.buf.error() {
            XmlParserErrors::XmlErrOK => Ok(()),
            err => Err(err),
        }
    }

    // Failures are latched in the output buffer and reported by `check_error`.
    fn write(&mut self, s: &str) {
        self.buf.write_str(s).ok();
    }

    fn write_quoted(&mut self, s: &str) {
        self.buf.write_quoted_str(s).ok();
    }

    fn write_text(&mut self, text: &str) {
        let escape = match self.escape {
            Some(escape) => Some(escape),
            None if self.entities_escape => Some(xml_escape_entities as XmlCharEncodingOutputFunc),
            None => None,
        };
        self.buf.write_str_with_escape(text, escape).ok();
    }

    fn write_indent(&mut self, level: i32) {
        if self.indent_size == 0 {
            return;
        }
        let level = (level.max(0) as usize).min(self.indent_nr);
        self.buf
            .write_str(&self.indent[..self.indent_size * level])
            .ok();
    }

    /// Write a newline followed by the indentation of `level + extra`.
    #[doc(alias = "xmlOutputBufferWriteWSNonSig")]
    fn write_ws_non_sig(&mut self, extra: i32) {
        self.write("\n");
        if self.indent_nr == 0 {
            return;
        }
        let total = (self.level + extra).max(0) as usize;
        let mut done = 0;
        while done < total {
            let n = (total - done).min(self.indent_nr);
            self.buf.write_str(&self.indent[..self.indent_size * n]).ok();
            done += n;
        }
    }

    fn write_qname(&mut self, tree: &XmlTree, node: XmlNodeId) {
        let prefix = tree
            .get(node)
            .and_then(|node| node.ns())
            .and_then(|ns| tree.ns(ns))
            .and_then(|ns| ns.prefix());
        if let Some(prefix) = prefix {
            self.write(prefix);
            self.write(":");
        }
        self.write(tree.name(node).unwrap_or(""));
    }

    #[doc(alias = "xmlNsDumpOutput")]
    fn ns_dump(&mut self, tree: &XmlTree, ns: XmlNsId) {
        let Some(ns) = tree.ns(ns) else {
            return;
        };
        if ns.prefix() == Some("xml") {
            return;
        }
        if self.format == 2 {
            self.write_ws_non_sig(2);
        } else {
            self.write(" ");
        }
        match ns.prefix() {
            Some(prefix) => {
                self.write("xmlns:");
                self.write(prefix);
            }
            None => self.write("xmlns"),
        }
        self.write("=");
        self.write_quoted(ns.href());
    }

    fn ns_list_dump(&mut self, tree: &XmlTree, node: XmlNodeId) {
        for ns in tree.ns_defs(node) {
            self.ns_dump(tree, ns);
        }
    }

    /// Serialize the value of `attr`, resolving entity references back to `&name;`.
    fn attr_serialize_content(&mut self, tree: &XmlTree, attr: XmlNodeId) {
        let mut out = String::new();
        for child in tree.child_nodes(attr) {
            let Some(node) = tree.get(child) else {
                continue;
            };
            match node.element_type() {
                XmlElementType::XmlTextNode => {
                    let text = node.content().unwrap_or("");
                    match self.escape_attr {
                        Some(escape) => escape(text, &mut out),
                        None => attr_serialize_text(&mut out, text, self.entities_escape),
                    }
                }
                XmlElementType::XmlEntityRefNode => {
                    out.push('&');
                    out.push_str(node.name().unwrap_or(""));
                    out.push(';');
                }
                _ => {}
            }
        }
        self.write(&out);
    }

    #[doc(alias = "xmlAttrDumpOutput")]
    fn attr_dump(&mut self, tree: &XmlTree, attr: XmlNodeId) {
        if self.format == 2 {
            self.write_ws_non_sig(2);
        } else {
            self.write(" ");
        }
        self.write_qname(tree, attr);
        self.write("=\"");
        self.attr_serialize_content(tree, attr);
        self.write("\"");
    }

    fn write_cdata(&mut self, content: Option<&str>) {
        let Some(mut rest) = content.filter(|content| !content.is_empty()) else {
            self.write("<![CDATA[]]>");
            return;
        };
        while let Some(pos) = rest.find("]]>") {
            self.write("<![CDATA[");
            self.write(&rest[..pos + 2]);
            self.write("]]>");
            rest = &rest[pos + 2..];
        }
        if !rest.is_empty() {
            self.write("<![CDATA[");
            self.write(rest);
            self.write("]]>");
        }
    }

    #[doc(alias = "xmlDtdDumpOutput")]
    fn dtd_dump(&mut self, tree: &XmlTree, dtd_id: XmlNodeId) {
        let (Some(node), Some(dtd)) = (tree.get(dtd_id), tree.dtd(dtd_id)) else {
            return;
        };
        self.write("<!DOCTYPE ");
        self.write(node.name().unwrap_or(""));
        if let Some(external_id) = dtd.external_id() {
            self.write(" PUBLIC ");
            self.write_quoted(external_id);
            self.write(" ");
            self.write_quoted(dtd.system_id().unwrap_or(""));
        } else if let Some(system_id) = dtd.system_id() {
            self.write(" SYSTEM ");
            self.write_quoted(system_id);
        }
        if node.children().is_none() && dtd.notations().next().is_none() {
            self.write(">");
            return;
        }
        self.write(" [\n");
        let int_subset = node.document().is_none_or(|doc| {
            tree.doc(doc)
                .is_some_and(|doc| doc.int_subset() == Some(dtd_id))
        });
        if int_subset {
            let mut notations = dtd.notations().collect::<Vec<_>>();
            notations.sort_by(|l, r| l.name().cmp(r.name()));
            let mut out = String::new();
            for nota in notations {
                dump_notation_decl(&mut out, nota);
            }
            self.write(&out);
        }
        let (format, level) = (self.format, self.level);
        self.format = 0;
        self.level = -1;
        for child in tree.child_nodes(dtd_id) {
            self.node_dump_internal(tree, child);
        }
        self.format = format;
        self.level = level;
        self.write("]>");
    }

    fn decl_dump(&mut self, tree: &XmlTree, decl: XmlNodeId) {
        let mut out = String::new();
        match tree.element_type(decl) {
            XmlElementType::XmlElementDecl => dump_element_decl(&mut out, tree, decl),
            XmlElementType::XmlAttributeDecl => dump_attribute_decl(&mut out, tree, decl),
            XmlElementType::XmlEntityDecl => dump_entity_decl(&mut out, tree, decl),
            _ => {}
        }
        self.write(&out);
    }

    /// Whether children of `node` must be written without added whitespace.
    fn needs_unformatted(tree: &XmlTree, node: XmlNodeId, cdata: bool) -> bool {
        tree.child_nodes(node).any(|child| match tree.element_type(child) {
            XmlElementType::XmlTextNode | XmlElementType::XmlEntityRefNode => true,
            XmlElementType::XmlCDATASectionNode => cdata,
            _ => false,
        }) || tree.get_space_preserve(node) == Some(true)
    }

    /// Close the element `cur` after its last child has been written.
    fn end_element(&mut self, tree: &XmlTree, cur: XmlNodeId, ws_non_sig: bool) {
        if self.level > 0 {
            self.level -= 1;
        }
        if self.indent_output && self.format == 1 {
            self.write_indent(self.level);
        }
        self.write("</");
        self.write_qname(tree, cur);
        if ws_non_sig && self.format == 2 {
            self.write_ws_non_sig(0);
        }
        self.write(">");
    }

    /// Dump an XML node and its subtree, without recursion.
    #[doc(alias = "xmlNodeDumpOutputInternal")]
    pub(crate) fn node_dump_internal(&mut self, tree: &XmlTree, root: XmlNodeId) {
        let format = self.format;
        let mut unformatted_node = None;
        let mut parent = tree.parent(root);
        let mut cur = root;

        loop {
            let Some(node) = tree.get(cur) else {
                return;
            };
            match node.element_type() {
                XmlElementType::XmlDocumentNode | XmlElementType::XmlHTMLDocumentNode => {
                    self.doc_content_dump(tree, cur).ok();
                }
                XmlElementType::XmlDTDNode => self.dtd_dump(tree, cur),
                XmlElementType::XmlDocumentFragNode => {
                    if let Some(children) = node.children() {
                        parent = Some(cur);
                        cur = children;
                        continue;
                    }
                }
                XmlElementType::XmlElementDecl
                | XmlElementType::XmlAttributeDecl
                | XmlElementType::XmlEntityDecl => self.decl_dump(tree, cur),
                XmlElementType::XmlElementNode => {
                    if cur != root && self.format == 1 && self.indent_output {
                        self.write_indent(self.level);
                    }
                    self.write("<");
                    self.write_qname(tree, cur);
                    self.ns_list_dump(tree, cur);
                    for attr in tree.attributes(cur) {
                        self.attr_dump(tree, attr);
                    }

                    if let Some(children) = node.children() {
                        if self.format == 1 && Self::needs_unformatted(tree, cur, true) {
                            self.format = 0;
                            unformatted_node = Some(cur);
                        }
                        if self.format == 2 {
                            self.write_ws_non_sig(1);
                        }
                        self.write(">");
                        if self.format == 1 {
                            self.write("\n");
                        }
                        if self.level >= 0 {
                            self.level += 1;
                        }
                        parent = Some(cur);
                        cur = children;
                        continue;
                    }

                    if self.options & NO_EMPTY == 0 {
                        if self.format == 2 {
                            self.write_ws_non_sig(0);
                        }
                        self.write("/>");
                    } else {
                        if self.format == 2 {
                            self.write_ws_non_sig(1);
                        }
                        self.write("></");
                        self.write_qname(tree, cur);
                        if self.format == 2 {
                            self.write_ws_non_sig(0);
                        }
                        self.write(">");
                    }
                }
                XmlElementType::XmlTextNode => {
                    if let Some(content) = node.content() {
                        if node.name() == Some(XML_STRING_TEXT_NOENC) {
                            self.write(content);
                        } else {
                            self.write_text(content);
                        }
                    }
                }
                XmlElementType::XmlPINode => {
                    if cur != root && self.format == 1 && self.indent_output {
                        self.write_indent(self.level);
                    }
                    self.write("<?");
                    self.write(node.name().unwrap_or(""));
                    if let Some(content) = node.content() {
                        if self.format == 2 {
                            self.write_ws_non_sig(0);
                        } else {
                            self.write(" ");
                        }
                        self.write(content);
                    } else if self.format == 2 {
                        self.write_ws_non_sig(0);
                    }
                    self.write("?>");
                }
                XmlElementType::XmlCommentNode => {
                    if cur != root && self.format == 1 && self.indent_output {
                        self.write_indent(self.level);
                    }
                    if let Some(content) = node.content() {
                        self.write("<!--");
                        self.write(content);
                        self.write("-->");
                    }
                }
                XmlElementType::XmlEntityRefNode => {
                    self.write("&");
                    self.write(node.name().unwrap_or(""));
                    self.write(";");
                }
                XmlElementType::XmlCDATASectionNode => self.write_cdata(node.content()),
                XmlElementType::XmlAttributeNode => self.attr_dump(tree, cur),
                _ => {}
            }

            loop {
                if cur == root {
                    return;
                }
                if self.format == 1
                    && !matches!(
                        tree.element_type(cur),
                        XmlElementType::XmlXIncludeStart | XmlElementType::XmlXIncludeEnd
                    )
                {
                    self.write("\n");
                }
                if let Some(next) = tree.next(cur) {
                    cur = next;
                    break;
                }
                let Some(up) = parent else {
                    return;
                };
                cur = up;
                parent = tree.parent(cur);
                if tree.element_type(cur) == XmlElementType::XmlElementNode {
                    self.end_element(tree, cur, true);
                    if unformatted_node == Some(cur) {
                        self.format = format;
                        unformatted_node = None;
                    }
                }
            }
        }
    }

    /// Dump an XML document.
    #[doc(alias = "xmlDocContentDumpOutput")]
    pub(crate) fn doc_content_dump(
        &mut self,
        tree: &XmlTree,
        doc_id: XmlNodeId,
    ) -> Result<(), XmlParserErrors> {
        let (Some(node), Some(doc)) = (tree.get(doc_id), tree.doc(doc_id)) else {
            return Err(XmlParserErrors::XmlErrArgument);
        };
        let encoding = self
            .encoding
            .clone()
            .or_else(|| doc.encoding().map(str::to_owned));

        let html_doc = node.element_type() == XmlElementType::XmlHTMLDocumentNode
            || doc.has_property(XmlDocProperties::XmlDocHTML);
        if (html_doc && self.options & (AS_XML | XHTML) == 0) || self.options & AS_HTML != 0 {
            #[cfg(feature = "html")]
            {
                return self.html_doc_content_dump(tree, doc_id, encoding.as_deref());
            }
            #[cfg(not(feature = "html"))]
            {
                xml_save_err(
                    XmlParserErrors::XmlErrUnsupportedFeature,
                    Some(doc_id),
                    Some("HTML"),
                );
                return Err(XmlParserErrors::XmlErrUnsupportedFeature);
            }
        }

        let entities_escape = self.entities_escape;
        let mut switched = false;
        if let Some(enc) = encoding.as_deref() {
            if self.encoding.is_none() && !self.buf.has_encoder() && self.options & NO_DECL == 0 {
                let Some(handler) = find_encoding_handler(enc) else {
                    xml_save_err(
                        XmlParserErrors::XmlSaveUnknownEncoding,
                        Some(doc_id),
                        Some(enc),
                    );
                    return Err(XmlParserErrors::XmlErrUnsupportedEncoding);
                };
                if !handler.is_utf8() {
                    self.buf.switch_encoder(handler);
                    self.encoding = Some(enc.to_owned());
                    switched = true;
                }
                self.entities_escape = false;
            }
        }

        if self.options & NO_DECL == 0 {
            self.write("<?xml version=");
            match doc.version() {
                Some(version) => self.write_quoted(version),
                None => self.write("\"1.0\""),
            }
            if let Some(enc) = encoding.as_deref() {
                self.write(" encoding=");
                self.write_quoted(enc);
            }
            match doc.standalone() {
                0 => self.write(" standalone=\"no\""),
                1 => self.write(" standalone=\"yes\""),
                _ => {}
            }
            self.write("?>\n");
        }

        #[cfg(feature = "html")]
        let xhtml = self.options & XHTML != 0
            || (self.options & NO_XHTML == 0
                && tree
                    .get_int_subset(doc_id)
                    .and_then(|dtd| tree.dtd(dtd))
                    .is_some_and(|dtd| is_xhtml(dtd.system_id(), dtd.external_id())));
        #[cfg(not(feature = "html"))]
        let xhtml = false;

        for child in tree.child_nodes(doc_id) {
            self.level = 0;
            #[cfg(feature = "html")]
            if xhtml {
                self.xhtml_node_dump(tree, child);
            } else {
                self.node_dump_internal(tree, child);
            }
            #[cfg(not(feature = "html"))]
            {
                let _ = xhtml;
                self.node_dump_internal(tree, child);
            }
            if !matches!(
                tree.element_type(child),
                XmlElementType::XmlXIncludeStart | XmlElementType::XmlXIncludeEnd
            ) {
                self.write("\n");
            }
        }

        self.entities_escape = entities_escape;
        if switched {
            self.encoding = None;
            self.buf.clear_encoder()?;
        }
        Ok(())
    }

    /// Dump an HTML document, selecting an output encoding first.
    #[cfg(feature = "html")]
    fn html_doc_content_dump(
        &mut self,
        tree: &XmlTree,
        doc_id: XmlNodeId,
        encoding: Option<&str>,
    ) -> Result<(), XmlParserErrors> {
        let encoding = encoding.unwrap_or("HTML");
        let mut switched = false;
        if self.encoding.is_none() && !self.buf.has_encoder() {
            let Some(handler) = find_encoding_handler(encoding) else {
                xml_save_err(
                    XmlParserErrors::XmlSaveUnknownEncoding,
                    Some(doc_id),
                    Some(encoding),
                );
                return Err(XmlParserErrors::XmlErrUnsupportedEncoding);
            };
            if !handler.is_utf8() {
                self.buf.switch_encoder(handler);
                switched = true;
            }
        }
        html_node_dump_internal(&mut self.buf, tree, doc_id, Some(encoding), self.format == 1);
        if switched {
            self.buf.clear_encoder()?;
        }
        Ok(())
    }

    #[cfg(feature = "html")]
    fn xhtml_is_empty(tree: &XmlTree, node: XmlNodeId) -> bool {
        let Some(elem) = tree.get(node) else {
            return false;
        };
        if elem.element_type() != XmlElementType::XmlElementNode || elem.children().is_some() {
            return false;
        }
        if elem
            .ns()
            .and_then(|ns| tree.ns(ns))
            .is_some_and(|ns| ns.href() != XHTML_NS_NAME)
        {
            return false;
        }
        matches!(
            elem.name(),
            Some(
                "area"
                    | "br"
                    | "base"
                    | "basefont"
                    | "col"
                    | "frame"
                    | "hr"
                    | "img"
                    | "input"
                    | "isindex"
                    | "link"
                    | "meta"
                    | "param"
            )
        )
    }

    /// Dump the attributes of an XHTML element, applying the compatibility rules
    /// of XHTML 1.0 Appendix C.
    #[cfg(feature = "html")]
    #[doc(alias = "xhtmlAttrListDumpOutput")]
    fn xhtml_attr_list_dump(&mut self, tree: &XmlTree, elem: XmlNodeId) {
        let mut xml_lang = None;
        let mut lang = None;
        let mut name = None;
        let mut id = None;
        let parent = tree.parent(elem);

        for attr in tree.attributes(elem) {
            let Some(node) = tree.get(attr) else {
                continue;
            };
            let attr_name = node.name().unwrap_or("");
            let prefix = node.ns().and_then(|ns| tree.ns(ns)).map(|ns| ns.prefix());
            match (prefix, attr_name) {
                (None, "id") => id = Some(attr),
                (None, "name") => name = Some(attr),
                (None, "lang") => lang = Some(attr),
                (Some(Some("xml")), "lang") => xml_lang = Some(attr),
                _ => {}
            }
            let empty_value = node
                .children()
                .and_then(|child| tree.get(child))
                .and_then(|child| child.content())
                .is_none_or(str::is_empty);
            if prefix.is_none() && empty_value && html_is_boolean_attr(attr_name) {
                if self.format == 2 {
                    self.write_ws_non_sig(2);
                } else {
                    self.write(" ");
                }
                self.write(attr_name);
                self.write("=\"");
                self.write(attr_name);
                self.write("\"");
                continue;
            }
            self.attr_dump(tree, attr);
        }

        // C.8
        if let (Some(name), None) = (name, id) {
            let anchor_like = parent.is_some_and(|_| {
                matches!(
                    tree.name(elem),
                    Some(
                        "a" | "p"
                            | "div"
                            | "img"
                            | "map"
                            | "applet"
                            | "form"
                            | "frame"
                            | "iframe"
                    )
                )
            });
            if anchor_like {
                self.write(" id=\"");
                self.attr_serialize_content(tree, name);
                self.write("\"");
            }
        }
        // C.7
        match (lang, xml_lang) {
            (Some(lang), None) => {
                self.write(" xml:lang=\"");
                self.attr_serialize_content(tree, lang);
                self.write("\"");
            }
            (None, Some(xml_lang)) => {
                self.write(" lang=\"");
                self.attr_serialize_content(tree, xml_lang);
                self.write("\"");
            }
            _ => {}
        }
    }

    #[cfg(feature = "html")]
    fn xhtml_write_meta(&mut self) {
        self.write("<meta http-equiv=\"Content-Type\" content=\"text/html; charset=");
        self.buf
            .write_str(self.encoding.as_deref().unwrap_or("UTF-8"))
            .ok();
        self.write("\" />");
    }

    /// Whether `node` is the `head` of an `html` root element lacking a
    /// `Content-Type` meta element.
    #[cfg(feature = "html")]
    fn xhtml_needs_meta(tree: &XmlTree, node: XmlNodeId) -> bool {
        let Some(parent) = tree.parent(node) else {
            return false;
        };
        if tree.name(node) != Some("head")
            || tree.name(parent) != Some("html")
            || tree.parent(parent) != tree.document(node)
        {
            return false;
        }
        !tree.child_nodes(node).any(|child| {
            tree.element_type(child) == XmlElementType::XmlElementNode
                && tree.name(child) == Some("meta")
                && tree
                    .get_prop(child, "http-equiv")
                    .is_some_and(|value| value.eq_ignore_ascii_case("Content-Type"))
        })
    }

    /// Dump an XHTML node, recursive behaviour, children are printed too.
    #[cfg(feature = "html")]
    #[doc(alias = "xhtmlNodeDumpOutput")]
    pub(crate) fn xhtml_node_dump(&mut self, tree: &XmlTree, root: XmlNodeId) {
        let format = self.format;
        let mut unformatted_node = None;
        let mut parent = tree.parent(root);
        let mut cur = root;

        loop {
            let Some(node) = tree.get(cur) else {
                return;
            };
            match node.element_type() {
                XmlElementType::XmlDocumentNode | XmlElementType::XmlHTMLDocumentNode => {
                    self.doc_content_dump(tree, cur).ok();
                }
                XmlElementType::XmlDTDNode => self.dtd_dump(tree, cur),
                XmlElementType::XmlDocumentFragNode => {
                    if let Some(children) = node.children() {
                        parent = Some(cur);
                        cur = children;
                        continue;
                    }
                }
                XmlElementType::XmlElementDecl
                | XmlElementType::XmlAttributeDecl
                | XmlElementType::XmlEntityDecl => self.decl_dump(tree, cur),
                XmlElementType::XmlElementNode => {
                    let add_meta = Self::xhtml_needs_meta(tree, cur);
                    if cur != root && self.format == 1 && self.indent_output {
                        self.write_indent(self.level);
                    }
                    self.write("<");
                    self.write_qname(tree, cur);
                    self.ns_list_dump(tree, cur);
                    if node.name() == Some("html") && node.ns().is_none() && node.ns_def().is_none()
                    {
                        self.write(" xmlns=\"");
                        self.write(XHTML_NS_NAME);
                        self.write("\"");
                    }
                    self.xhtml_attr_list_dump(tree, cur);

                    if let Some(children) = node.children() {
                        if self.format == 1 && Self::needs_unformatted(tree, cur, false) {
                            self.format = 0;
                            unformatted_node = Some(cur);
                        }
                        self.write(">");
                        if add_meta {
                            if self.format == 1 {
                                self.write("\n");
                                if self.indent_output {
                                    self.write_indent(self.level + 1);
                                }
                            }
                            self.xhtml_write_meta();
                        }
                        if self.format == 1 {
                            self.write("\n");
                        }
                        if self.level >= 0 {
                            self.level += 1;
                        }
                        parent = Some(cur);
                        cur = children;
                        continue;
                    }

                    let prefixed = node
                        .ns()
                        .and_then(|ns| tree.ns(ns))
                        .is_some_and(|ns| ns.prefix().is_some());
                    if !prefixed && !add_meta && Self::xhtml_is_empty(tree, cur) {
                        self.write(" />");
                    } else {
                        if add_meta {
                            self.write(">");
                            if self.format == 1 {
                                self.write("\n");
                                if self.indent_output {
                                    self.write_indent(self.level + 1);
                                }
                            }
                            self.xhtml_write_meta();
                            if self.format == 1 {
                                self.write("\n");
                            }
                        } else {
                            self.write(">");
                        }
                        self.write("</");
                        self.write_qname(tree, cur);
                        self.write(">");
                    }
                }
                XmlElementType::XmlTextNode => {
                    if let Some(content) = node.content() {
                        if node.name() == Some(XML_STRING_TEXT_NOENC) {
                            self.write(content);
                        } else {
                            self.write_text(content);
                        }
                    }
                }
                XmlElementType::XmlPINode => {
                    self.write("<?");
                    self.write(node.name().unwrap_or(""));
                    if let Some(content) = node.content() {
                        self.write(" ");
                        self.write(content);
                    }
                    self.write("?>");
                }
                XmlElementType::XmlCommentNode => {
                    if let Some(content) = node.content() {
                        self.write("<!--");
                        self.write(content);
                        self.write("-->");
                    }
                }
                XmlElementType::XmlEntityRefNode => {
                    self.write("&");
                    self.write(node.name().unwrap_or(""));
                    self.write(";");
                }
                XmlElementType::XmlCDATASectionNode => self.write_cdata(node.content()),
                XmlElementType::XmlAttributeNode => self.attr_dump(tree, cur),
                _ => {}
            }

            loop {
                if cur == root {
                    return;
                }
                if self.format == 1 {
                    self.write("\n");
                }
                if let Some(next) = tree.next(cur) {
                    cur = next;
                    break;
                }
                let Some(up) = parent else {
                    return;
                };
                cur = up;
                parent = tree.parent(cur);
                if tree.element_type(cur) == XmlElementType::XmlElementNode {
                    self.end_element(tree, cur, false);
                    if unformatted_node == Some(cur) {
                        self.format = format;
                        unformatted_node = None;
                    }
                }
            }
        }
    }
}

fn lookup_handler(
    encoding: Option<&str>,
) -> Result<Option<crate::encoding::XmlCharEncodingHandler>, XmlParserErrors> {
    let Some(encoding) = encoding else {
        return Ok(None);
    };
    match find_encoding_handler(encoding) {
        Some(handler) => Ok(Some(handler)),
        None => {
            xml_save_err(XmlParserErrors::XmlSaveUnknownEncoding, None, Some(encoding));
            Err(XmlParserErrors::XmlErrUnsupportedEncoding)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn save(tree: &XmlTree, doc: XmlNodeId, encoding: Option<&str>, options: i32) -> String {
        let mut buffer = XmlBuffer::new();
        let mut ctxt = XmlSaveCtxt::save_to_buffer(&mut buffer, encoding, options).unwrap();
        ctxt.save_doc(tree, doc).unwrap();
        ctxt.close().unwrap();
        String::from_utf8(buffer.content().to_vec()).unwrap()
    }

    fn save_node(tree: &XmlTree, node: XmlNodeId, options: i32) -> String {
        let mut buffer = XmlBuffer::new();
        let mut ctxt = XmlSaveCtxt::save_to_buffer(&mut buffer, None, options).unwrap();
        ctxt.save_tree(tree, node).unwrap();
        ctxt.close().unwrap();
        String::from_utf8(buffer.content().to_vec()).unwrap()
    }

    fn doc_with_root(tree: &mut XmlTree, name: &str) -> (XmlNodeId, XmlNodeId) {
        let doc = tree.new_doc(None);
        let root = tree.new_doc_node(Some(doc), None, name, None).unwrap();
        tree.set_root_element(doc, root).unwrap();
        (doc, root)
    }

    #[test]
    fn empty_document() {
        let mut tree = XmlTree::new();
        let doc = tree.new_doc(None);
        assert_eq!(save(&tree, doc, None, 0), "<?xml version=\"1.0\"?>\n");
    }

    #[test]
    fn document_with_root() {
        let mut tree = XmlTree::new();
        let (doc, _) = doc_with_root(&mut tree, "root");
        assert_eq!(save(&tree, doc, None, 0), "<?xml version=\"1.0\"?>\n<root/>\n");
        assert_eq!(save(&tree, doc, None, NO_DECL), "<root/>\n");
        assert_eq!(
            save(&tree, doc, None, NO_DECL | NO_EMPTY),
            "<root></root>\n"
        );
    }

    #[test]
    fn formatted_output_is_indented() {
        let mut tree = XmlTree::new();
        let (doc, root) = doc_with_root(&mut tree, "a");
        let b = tree.new_child(root, None, "b", None).unwrap();
        tree.new_child(b, None, "c", None).unwrap();
        tree.new_text_child(root, None, "d", Some("x")).unwrap();
        assert_eq!(
            save(&tree, doc, None, NO_DECL | FORMAT | INDENT),
            "<a>\n  <b>\n    <c/>\n  </b>\n  <d>x</d>\n</a>\n"
        );
        assert_eq!(
            save(&tree, doc, None, NO_DECL | FORMAT | NO_INDENT),
            "<a>\n<b>\n<c/>\n</b>\n<d>x</d>\n</a>\n"
        );
    }

    #[test]
    fn text_children_disable_formatting() {
        let mut tree = XmlTree::new();
        let (doc, root) = doc_with_root(&mut tree, "a");
        let text = tree.new_text("t");
        tree.add_child(root, text).unwrap();
        tree.new_child(root, None, "b", None).unwrap();
        assert_eq!(
            save(&tree, doc, None, NO_DECL | FORMAT | INDENT),
            "<a>t<b/></a>\n"
        );
    }

    #[test]
    fn custom_indent_string() {
        let mut tree = XmlTree::new();
        let (doc, root) = doc_with_root(&mut tree, "a");
        tree.new_child(root, None, "b", None).unwrap();
        let mut buffer = XmlBuffer::new();
        let mut ctxt =
            XmlSaveCtxt::save_to_buffer(&mut buffer, None, NO_DECL | FORMAT | INDENT).unwrap();
        assert!(ctxt.set_indent_string(&"x".repeat(61)).is_err());
        ctxt.set_indent_string("\t").unwrap();
        ctxt.save_doc(&tree, doc).unwrap();
        ctxt.close().unwrap();
        assert_eq!(buffer.content(), b"<a>\n\t<b/>\n</a>\n");
    }

    #[test]
    fn text_and_attribute_escaping() {
        let mut tree = XmlTree::new();
        let (doc, root) = doc_with_root(&mut tree, "a");
        tree.set_prop(root, "v", Some("\"<é>\"\n")).unwrap();
        let text = tree.new_text("1 < 2 & é\r");
        tree.add_child(root, text).unwrap();
        assert_eq!(
            save(&tree, doc, None, NO_DECL),
            "<a v=\"&quot;&lt;&#xE9;&gt;&quot;&#10;\">1 &lt; 2 &amp; &#xE9;&#xD;</a>\n"
        );
        assert_eq!(
            save(&tree, doc, Some("UTF-8"), NO_DECL),
            "<a v=\"&quot;&lt;é&gt;&quot;&#10;\">1 &lt; 2 &amp; é&#13;</a>\n"
        );
    }

    #[test]
    fn cdata_is_split_at_terminator() {
        let mut tree = XmlTree::new();
        let (doc, root) = doc_with_root(&mut tree, "a");
        let cdata = tree.new_cdata_block(Some(doc), "x]]>y");
        tree.add_child(root, cdata).unwrap();
        assert_eq!(
            save(&tree, doc, None, NO_DECL),
            "<a><![CDATA[x]]]]><![CDATA[>y]]></a>\n"
        );
    }

    #[test]
    fn pi_comment_and_reference() {
        let mut tree = XmlTree::new();
        let (doc, root) = doc_with_root(&mut tree, "a");
        let pi = tree.new_doc_pi(Some(doc), "target", Some("data")).unwrap();
        tree.add_child(root, pi).unwrap();
        let comment = tree.new_doc_comment(Some(doc), " c ");
        tree.add_child(root, comment).unwrap();
        let reference = tree.new_reference(Some(doc), "ent").unwrap();
        tree.add_child(root, reference).unwrap();
        assert_eq!(
            save(&tree, doc, None, NO_DECL),
            "<a><?target data?><!-- c -->&ent;</a>\n"
        );
    }

    #[test]
    fn declaration_carries_encoding_and_standalone() {
        let mut tree = XmlTree::new();
        let (doc, _) = doc_with_root(&mut tree, "r");
        tree.doc_mut(doc).unwrap().set_standalone(1);
        assert_eq!(
            save(&tree, doc, Some("UTF-8"), 0),
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n<r/>\n"
        );
    }

    #[test]
    fn unknown_encoding_is_rejected() {
        let mut buffer = XmlBuffer::new();
        let res = XmlSaveCtxt::save_to_buffer(&mut buffer, Some("no-such-encoding"), 0);
        assert_eq!(
            res.err(),
            Some(XmlParserErrors::XmlErrUnsupportedEncoding)
        );
    }

    #[test]
    fn latin1_output_uses_char_refs() {
        let mut tree = XmlTree::new();
        let (doc, root) = doc_with_root(&mut tree, "a");
        let text = tree.new_text("é€");
        tree.add_child(root, text).unwrap();
        let mut buffer = XmlBuffer::new();
        let mut ctxt =
            XmlSaveCtxt::save_to_buffer(&mut buffer, Some("ISO-8859-1"), NO_DECL).unwrap();
        ctxt.save_doc(&tree, doc).unwrap();
        ctxt.close().unwrap();
        assert_eq!(buffer.content(), b"<a>\xE9&#8364;</a>\n");
    }

    #[test]
    fn namespaces_are_declared() {
        let mut tree = XmlTree::new();
        let (doc, root) = doc_with_root(&mut tree, "a");
        let ns = tree.new_ns(Some(root), "urn:x", Some("p")).unwrap();
        tree.set_ns(root, Some(ns));
        tree.new_ns_prop(Some(root), Some(ns), "k", Some("v")).unwrap();
        assert_eq!(
            save(&tree, doc, None, NO_DECL),
            "<p:a xmlns:p=\"urn:x\" p:k=\"v\"/>\n"
        );
    }

    #[test]
    fn dtd_with_declarations() {
        let mut tree = XmlTree::new();
        let (doc, _) = doc_with_root(&mut tree, "r");
        let dtd = tree
            .create_int_subset(doc, Some("r"), None, Some("r.dtd"))
            .unwrap();
        let a = XmlElementContent::new(Some("a"), XmlElementContentType::XmlElementContentElement)
            .unwrap();
        let mut b =
            XmlElementContent::new(Some("b"), XmlElementContentType::XmlElementContentElement)
                .unwrap();
        b.set_ocur(XmlElementContentOccur::XmlElementContentMult);
        let content =
            XmlElementContent::with_children(XmlElementContentType::XmlElementContentSeq, a, b)
                .unwrap();
        tree.add_element_decl(
            dtd,
            "r",
            XmlElementTypeVal::XmlElementTypeElement,
            Some(&content),
        )
        .unwrap();
        tree.add_attribute_decl(
            dtd,
            "r",
            "id",
            None,
            XmlAttributeType::XmlAttributeID,
            XmlAttributeDefault::XmlAttributeImplied,
            None,
            None,
        )
        .unwrap();
        assert_eq!(
            save(&tree, doc, None, NO_DECL),
            "<!DOCTYPE r SYSTEM \"r.dtd\" [\n<!ELEMENT r (a , b*)>\n<!ATTLIST r id ID #IMPLIED>\n]>\n<r/>\n"
        );
    }

    #[test]
    fn element_content_grouping() {
        let leaf = |name| {
            XmlElementContent::new(Some(name), XmlElementContentType::XmlElementContentElement)
                .unwrap()
        };
        let mut or = XmlElementContent::with_children(
            XmlElementContentType::XmlElementContentOr,
            leaf("b"),
            leaf("c"),
        )
        .unwrap();
        or.set_ocur(XmlElementContentOccur::XmlElementContentPlus);
        let seq =
            XmlElementContent::with_children(XmlElementContentType::XmlElementContentSeq, leaf("a"), or)
                .unwrap();
        let mut out = String::new();
        dump_element_content(&mut out, &seq);
        assert_eq!(out, "(a , (b | c)+)");
    }

    #[test]
    fn subtree_save() {
        let mut tree = XmlTree::new();
        let (_, root) = doc_with_root(&mut tree, "a");
        let b = tree.new_child(root, None, "b", None).unwrap();
        tree.set_prop(b, "k", Some("v")).unwrap();
        assert_eq!(save_node(&tree, b, 0), "<b k=\"v\"/>");
    }

    #[test]
    fn ws_non_sig_layout() {
        let mut tree = XmlTree::new();
        let (doc, root) = doc_with_root(&mut tree, "a");
        tree.set_prop(root, "k", Some("v")).unwrap();
        assert_eq!(
            save(&tree, doc, None, NO_DECL | WS_NON_SIG),
            "<a\n    k=\"v\"\n/>\n"
        );
    }

    #[test]
    fn xhtml_rules() {
        let mut tree = XmlTree::new();
        let (doc, html) = doc_with_root(&mut tree, "html");
        let head = tree.new_child(html, None, "head", None).unwrap();
        tree.new_child(head, None, "title", None).unwrap();
        let body = tree.new_child(html, None, "body", None).unwrap();
        tree.new_child(body, None, "br", None).unwrap();
        let p = tree.new_child(body, None, "p", None).unwrap();
        tree.set_prop(p, "name", Some("n")).unwrap();
        tree.set_prop(p, "lang", Some("en")).unwrap();
        let input = tree.new_child(body, None, "input", None).unwrap();
        tree.set_prop(input, "checked", Some("")).unwrap();
        assert_eq!(
            save(&tree, doc, Some("UTF-8"), NO_DECL | XHTML),
            concat!(
                "<html xmlns=\"http://www.w3.org/1999/xhtml\"><head>",
                "<meta http-equiv=\"Content-Type\" content=\"text/html; charset=UTF-8\" />",
                "<title></title></head><body><br />",
                "<p name=\"n\" lang=\"en\" id=\"n\" xml:lang=\"en\"></p>",
                "<input checked=\"checked\" /></body></html>\n"
            )
        );
    }
}
