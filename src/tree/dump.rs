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

use std::{io::Write, mem::take};

use crate::{
    encoding::{XmlCharEncodingHandler, find_encoding_handler},
    error::XmlParserErrors,
    io::XmlOutputBuffer,
    save::{XmlSaveCtxt, XmlSaveOption, attr_serialize_text, xml_save_err},
};
#[cfg(feature = "html")]
use crate::{html::html_node_dump_output, tree::is_xhtml};

use super::{XmlBuffer, XmlElementType, XmlNodeId, XmlTree};

const AS_XML: i32 = XmlSaveOption::XmlSaveAsXML as i32;

/// The handler for `encoding`, reporting unknown names.
fn output_handler(
    encoding: Option<&str>,
    node: Option<XmlNodeId>,
) -> Result<Option<XmlCharEncodingHandler>, XmlParserErrors> {
    let Some(encoding) = encoding else {
        return Ok(None);
    };
    match find_encoding_handler(encoding) {
        Some(handler) => Ok(Some(handler)),
        None => {
            xml_save_err(XmlParserErrors::XmlSaveUnknownEncoding, node, Some(encoding));
            Err(XmlParserErrors::XmlErrUnsupportedEncoding)
        }
    }
}

impl XmlTree {
    fn check_doc(&self, doc: XmlNodeId) -> Result<(), XmlParserErrors> {
        if matches!(
            self.element_type(doc),
            XmlElementType::XmlDocumentNode | XmlElementType::XmlHTMLDocumentNode
        ) {
            Ok(())
        } else {
            Err(XmlParserErrors::XmlErrArgument)
        }
    }

    /// The encoding requested by the caller, or the one declared by the document.
    fn dump_encoding(&self, doc: XmlNodeId, encoding: Option<&str>) -> Option<String> {
        encoding
            .or_else(|| self.doc(doc).and_then(|doc| doc.encoding()))
            .map(str::to_owned)
    }

    /// Serialize `doc` as XML into `buf`, which already carries the right encoder.
    fn doc_dump_to_output(
        &self,
        buf: XmlOutputBuffer<'_>,
        doc: XmlNodeId,
        encoding: Option<&str>,
        format: bool,
    ) -> Result<usize, XmlParserErrors> {
        let mut ctxt = XmlSaveCtxt::from_output(buf, encoding, AS_XML);
        ctxt.format = format as i32;
        ctxt.doc_content_dump(self, doc)?;
        ctxt.close()
    }

    /// Dump the document into memory using the character encoding specified by the caller,
    /// or the document encoding if `None`.
    ///
    /// With `format`, the output is indented when `indent_tree_output` is enabled.
    #[doc(alias = "xmlDocDumpFormatMemoryEnc")]
    pub fn doc_dump_format_memory_enc(
        &self,
        doc: XmlNodeId,
        encoding: Option<&str>,
        format: bool,
    ) -> Result<Vec<u8>, XmlParserErrors> {
        self.check_doc(doc)?;
        let encoding = self.dump_encoding(doc, encoding);
        let handler = output_handler(encoding.as_deref(), Some(doc))?;
        let mut ctxt =
            XmlSaveCtxt::from_output(XmlOutputBuffer::new(handler), encoding.as_deref(), AS_XML);
        ctxt.format = format as i32;
        ctxt.doc_content_dump(self, doc)?;
        ctxt.buf.into_content()
    }

    /// Dump the document into memory.
    #[doc(alias = "xmlDocDumpFormatMemory")]
    pub fn doc_dump_format_memory(
        &self,
        doc: XmlNodeId,
        format: bool,
    ) -> Result<Vec<u8>, XmlParserErrors> {
        self.doc_dump_format_memory_enc(doc, None, format)
    }

    #[doc(alias = "xmlDocDumpMemory")]
    pub fn doc_dump_memory(&self, doc: XmlNodeId) -> Result<Vec<u8>, XmlParserErrors> {
        self.doc_dump_format_memory_enc(doc, None, false)
    }

    #[doc(alias = "xmlDocDumpMemoryEnc")]
    pub fn doc_dump_memory_enc(
        &self,
        doc: XmlNodeId,
        encoding: Option<&str>,
    ) -> Result<Vec<u8>, XmlParserErrors> {
        self.doc_dump_format_memory_enc(doc, encoding, false)
    }

    /// Dump the document to `out` in the document encoding.
    ///
    /// Returns the number of bytes written.
    #[doc(alias = "xmlDocFormatDump")]
    pub fn doc_format_dump(
        &self,
        out: impl Write,
        doc: XmlNodeId,
        format: bool,
    ) -> Result<usize, XmlParserErrors> {
        self.check_doc(doc)?;
        let encoding = self.dump_encoding(doc, None);
        let handler = output_handler(encoding.as_deref(), Some(doc))?;
        let buf = XmlOutputBuffer::from_writer(out, handler);
        self.doc_dump_to_output(buf, doc, encoding.as_deref(), format)
    }

    #[doc(alias = "xmlDocDump")]
    pub fn doc_dump(&self, out: impl Write, doc: XmlNodeId) -> Result<usize, XmlParserErrors> {
        self.doc_format_dump(out, doc, false)
    }

    /// Dump the document to a file or an URL, converting it to `encoding`.
    ///
    /// If `filename` is `"-"` the stdout file is used.
    ///
    /// Returns the number of bytes written.
    #[doc(alias = "xmlSaveFormatFileEnc")]
    pub fn save_format_file_enc(
        &self,
        filename: &str,
        doc: XmlNodeId,
        encoding: Option<&str>,
        format: bool,
    ) -> Result<usize, XmlParserErrors> {
        self.check_doc(doc)?;
        let encoding = self.dump_encoding(doc, encoding);
        let handler = output_handler(encoding.as_deref(), Some(doc))?;
        let buf = XmlOutputBuffer::from_uri(filename, handler)?;
        self.doc_dump_to_output(buf, doc, encoding.as_deref(), format)
    }

    #[doc(alias = "xmlSaveFormatFile")]
    pub fn save_format_file(
        &self,
        filename: &str,
        doc: XmlNodeId,
        format: bool,
    ) -> Result<usize, XmlParserErrors> {
        self.save_format_file_enc(filename, doc, None, format)
    }

    #[doc(alias = "xmlSaveFileEnc")]
    pub fn save_file_enc(
        &self,
        filename: &str,
        doc: XmlNodeId,
        encoding: Option<&str>,
    ) -> Result<usize, XmlParserErrors> {
        self.save_format_file_enc(filename, doc, encoding, false)
    }

    /// Dump the document to a file. If `filename` is `"-"` the stdout file is used.
    #[doc(alias = "xmlSaveFile")]
    pub fn save_file(&self, filename: &str, doc: XmlNodeId) -> Result<usize, XmlParserErrors> {
        self.save_format_file_enc(filename, doc, None, false)
    }

    /// Dump the document to an output buffer, which is closed afterwards.
    ///
    /// `encoding` is only used for the XML declaration, the conversion is
    /// up to the encoder of `buf`.
    #[doc(alias = "xmlSaveFormatFileTo")]
    pub fn save_format_file_to(
        &self,
        buf: XmlOutputBuffer<'_>,
        doc: XmlNodeId,
        encoding: Option<&str>,
        format: bool,
    ) -> Result<usize, XmlParserErrors> {
        self.check_doc(doc)?;
        self.doc_dump_to_output(buf, doc, encoding, format)
    }

    #[doc(alias = "xmlSaveFileTo")]
    pub fn save_file_to(
        &self,
        buf: XmlOutputBuffer<'_>,
        doc: XmlNodeId,
        encoding: Option<&str>,
    ) -> Result<usize, XmlParserErrors> {
        self.save_format_file_to(buf, doc, encoding, false)
    }

    /// Dump an XML node, recursive behaviour, children are printed too.
    ///
    /// `level` is the indentation level of `node`. XHTML documents follow the
    /// XHTML 1.0 compatibility rules.
    #[doc(alias = "xmlNodeDumpOutput")]
    pub fn node_dump_output(
        &self,
        buf: &mut XmlOutputBuffer<'_>,
        node: XmlNodeId,
        level: i32,
        format: bool,
        encoding: Option<&str>,
    ) {
        let mut ctxt =
            XmlSaveCtxt::from_output(take(buf), Some(encoding.unwrap_or("UTF-8")), AS_XML);
        ctxt.level = level;
        ctxt.format = format as i32;

        #[cfg(feature = "html")]
        let xhtml = self
            .document(node)
            .and_then(|doc| self.get_int_subset(doc))
            .and_then(|dtd| self.dtd(dtd))
            .is_some_and(|dtd| is_xhtml(dtd.system_id(), dtd.external_id()));
        #[cfg(not(feature = "html"))]
        let xhtml = false;

        if xhtml {
            #[cfg(feature = "html")]
            ctxt.xhtml_node_dump(self, node);
        } else {
            ctxt.node_dump_internal(self, node);
        }
        ctxt.buf.flush().ok();
        *buf = take(&mut ctxt.buf);
    }

    /// Dump an XML node into `buf`, children are printed too.
    ///
    /// Returns the number of bytes appended to `buf`.
    #[doc(alias = "xmlNodeDump")]
    #[doc(alias = "xmlBufNodeDump")]
    pub fn node_dump(
        &self,
        buf: &mut XmlBuffer,
        node: XmlNodeId,
        level: i32,
        format: bool,
    ) -> Result<usize, XmlParserErrors> {
        if !self.contains(node) {
            return Err(XmlParserErrors::XmlErrArgument);
        }
        let before = buf.len();
        let mut out = XmlOutputBuffer::from_writer(&mut *buf, None);
        self.node_dump_output(&mut out, node, level, format, None);
        out.close()?;
        Ok(buf.len() - before)
    }

    /// Dump an XML or HTML node to `out`, formatted, children are printed too.
    #[doc(alias = "xmlElemDump")]
    pub fn elem_dump(&self, out: impl Write, node: XmlNodeId) -> Result<(), XmlParserErrors> {
        if !self.contains(node) {
            return Err(XmlParserErrors::XmlErrArgument);
        }
        let mut outbuf = XmlOutputBuffer::from_writer(out, None);
        let html_doc = self
            .document(node)
            .is_some_and(|doc| self.element_type(doc) == XmlElementType::XmlHTMLDocumentNode);
        if html_doc {
            #[cfg(feature = "html")]
            html_node_dump_output(&mut outbuf, self, node);
            #[cfg(not(feature = "html"))]
            {
                xml_save_err(
                    XmlParserErrors::XmlErrUnsupportedFeature,
                    Some(node),
                    Some("HTML"),
                );
                return Err(XmlParserErrors::XmlErrUnsupportedFeature);
            }
        } else {
            self.node_dump_output(&mut outbuf, node, 0, true, None);
        }
        outbuf.close().map(|_| ())
    }

    /// Serialize an attribute value into `buf`, escaping markup characters.
    ///
    /// Non-ASCII characters become character references unless the document
    /// declares an encoding.
    #[doc(alias = "xmlAttrSerializeTxtContent")]
    pub fn attr_serialize_txt_content(
        &self,
        buf: &mut XmlBuffer,
        doc: Option<XmlNodeId>,
        value: &str,
    ) -> Result<(), XmlParserErrors> {
        let escape_non_ascii = doc
            .and_then(|doc| self.doc(doc))
            .is_none_or(|doc| doc.encoding().is_none());
        let mut out = String::with_capacity(value.len());
        attr_serialize_text(&mut out, value, escape_non_ascii);
        buf.push_str(&out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(tree: &mut XmlTree) -> (XmlNodeId, XmlNodeId) {
        let doc = tree.new_doc(None);
        let root = tree.new_doc_node(Some(doc), None, "a", None).unwrap();
        tree.set_root_element(doc, root).unwrap();
        let b = tree.new_child(root, None, "b", None).unwrap();
        tree.new_text_child(b, None, "c", Some("caf\u{e9}")).unwrap();
        (doc, root)
    }

    #[test]
    fn memory_dump() {
        let mut tree = XmlTree::new();
        let (doc, _) = sample(&mut tree);
        assert_eq!(
            tree.doc_dump_memory(doc).unwrap(),
            "<?xml version=\"1.0\"?>\n<a><b><c>caf&#xE9;</c></b></a>\n".as_bytes()
        );
        assert_eq!(
            tree.doc_dump_format_memory(doc, true).unwrap(),
            "<?xml version=\"1.0\"?>\n<a>\n  <b>\n    <c>caf&#xE9;</c>\n  </b>\n</a>\n".as_bytes()
        );
    }

    #[test]
    fn memory_dump_with_encoding() {
        let mut tree = XmlTree::new();
        let (doc, _) = sample(&mut tree);
        assert_eq!(
            tree.doc_dump_memory_enc(doc, Some("ISO-8859-1")).unwrap(),
            b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n<a><b><c>caf\xE9</c></b></a>\n"
        );
        assert_eq!(
            tree.doc_dump_memory_enc(doc, Some("no-such-encoding")),
            Err(XmlParserErrors::XmlErrUnsupportedEncoding)
        );
        // the declared encoding is used by default
        tree.doc_mut(doc).unwrap().set_encoding(Some("UTF-8"));
        assert_eq!(
            tree.doc_dump_memory(doc).unwrap(),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<a><b><c>caf\u{e9}</c></b></a>\n"
                .as_bytes()
        );
    }

    #[test]
    fn dump_requires_a_document() {
        let mut tree = XmlTree::new();
        let (_, root) = sample(&mut tree);
        assert_eq!(
            tree.doc_dump_memory(root),
            Err(XmlParserErrors::XmlErrArgument)
        );
    }

    #[test]
    fn writer_dump() {
        let mut tree = XmlTree::new();
        let (doc, _) = sample(&mut tree);
        let mut out = vec![];
        let written = tree.doc_dump(&mut out, doc).unwrap();
        assert_eq!(written, out.len());
        assert!(out.starts_with(b"<?xml version=\"1.0\"?>\n<a>"));
    }

    #[test]
    fn node_dump_at_level() {
        let mut tree = XmlTree::new();
        let (_, root) = sample(&mut tree);
        let b = tree.children(root).unwrap();
        let mut buf = XmlBuffer::new();
        let len = tree.node_dump(&mut buf, b, 1, true).unwrap();
        assert_eq!(buf.content(), "<b>\n    <c>caf\u{e9}</c>\n  </b>".as_bytes());
        assert_eq!(len, buf.len());

        let mut buf = XmlBuffer::new();
        tree.node_dump(&mut buf, b, 0, false).unwrap();
        assert_eq!(buf.content(), "<b><c>caf\u{e9}</c></b>".as_bytes());
    }

    #[test]
    fn elem_dump_is_formatted() {
        let mut tree = XmlTree::new();
        let (_, root) = sample(&mut tree);
        let mut out = vec![];
        tree.elem_dump(&mut out, root).unwrap();
        assert_eq!(
            out,
            "<a>\n  <b>\n    <c>caf\u{e9}</c>\n  </b>\n</a>".as_bytes()
        );
    }

    #[test]
    fn file_round_trip() {
        let mut tree = XmlTree::new();
        let (doc, _) = sample(&mut tree);
        let path = std::env::temp_dir().join(format!("extree-dump-{}.xml", std::process::id()));
        let path_str = path.to_str().unwrap();
        let written = tree.save_file_enc(path_str, doc, Some("ISO-8859-1")).unwrap();
        let content = std::fs::read(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(written, content.len());
        assert!(content.ends_with(b"<c>caf\xE9</c></b></a>\n"));
    }

    #[test]
    fn attribute_text_serialization() {
        let mut tree = XmlTree::new();
        let (doc, _) = sample(&mut tree);
        let mut buf = XmlBuffer::new();
        tree.attr_serialize_txt_content(&mut buf, Some(doc), "<\"&\u{e9}\">")
            .unwrap();
        assert_eq!(buf.content(), b"&lt;&quot;&amp;&#xE9;&quot;&gt;");

        tree.doc_mut(doc).unwrap().set_encoding(Some("UTF-8"));
        let mut buf = XmlBuffer::new();
        tree.attr_serialize_txt_content(&mut buf, Some(doc), "\u{e9}\t")
            .unwrap();
        assert_eq!(buf.content(), "\u{e9}&#9;".as_bytes());
    }
}
