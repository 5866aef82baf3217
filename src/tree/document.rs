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

use std::{any::Any, collections::HashMap, rc::Rc};

use crate::{
    dict::XmlDictRef,
    error::{XmlParserErrors, xml_tree_err},
};

use super::{
    XmlDocProperties, XmlElementType, XmlID, XmlNode, XmlNodeId, XmlNodeVariant, XmlNsId, XmlRef,
    XmlTree, encode_special_chars, get_predefined_entity,
};

/// The XML version written when none is given.
pub const XML_DEFAULT_VERSION: &str = "1.0";

const XHTML_STRICT_PUBLIC_ID: &str = "-//W3C//DTD XHTML 1.0 Strict//EN";
const XHTML_STRICT_SYSTEM_ID: &str = "http://www.w3.org/TR/xhtml1/DTD/xhtml1-strict.dtd";
const XHTML_FRAME_PUBLIC_ID: &str = "-//W3C//DTD XHTML 1.0 Frameset//EN";
const XHTML_FRAME_SYSTEM_ID: &str = "http://www.w3.org/TR/xhtml1/DTD/xhtml1-frameset.dtd";
const XHTML_TRANS_PUBLIC_ID: &str = "-//W3C//DTD XHTML 1.0 Transitional//EN";
const XHTML_TRANS_SYSTEM_ID: &str = "http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd";

/// The document specific part of a document node.
#[derive(Debug)]
pub struct XmlDoc {
    pub(crate) compression: i32,
    /// standalone document (no external refs)
    ///   1 if standalone="yes"
    ///   0 if standalone="no"
    ///  -1 if there is no XML declaration
    ///  -2 if there is an XML declaration, but no standalone attribute was specified
    pub(crate) standalone: i32,
    pub(crate) int_subset: Option<XmlNodeId>,
    pub(crate) ext_subset: Option<XmlNodeId>,
    // global namespace, the old way
    pub(crate) old_ns: Option<XmlNsId>,
    pub(crate) version: Option<String>,
    pub(crate) encoding: Option<String>,
    pub(crate) ids: HashMap<String, XmlID>,
    pub(crate) refs: HashMap<String, Vec<XmlRef>>,
    pub(crate) url: Option<String>,
    pub(crate) dict: Option<XmlDictRef>,
    pub(crate) psvi: Option<Rc<dyn Any>>,
    pub(crate) parse_flags: i32,
    pub(crate) properties: i32,
}

impl XmlDoc {
    pub(crate) fn new(version: Option<&str>) -> Self {
        Self {
            compression: -1,
            standalone: -1,
            int_subset: None,
            ext_subset: None,
            old_ns: None,
            version: version.map(str::to_owned),
            encoding: None,
            ids: HashMap::new(),
            refs: HashMap::new(),
            url: None,
            dict: None,
            psvi: None,
            parse_flags: 0,
            properties: XmlDocProperties::XmlDocUserbuilt as i32,
        }
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn set_version(&mut self, version: Option<&str>) {
        self.version = version.map(str::to_owned);
    }

    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    pub fn set_encoding(&mut self, encoding: Option<&str>) {
        self.encoding = encoding.map(str::to_owned);
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn set_url(&mut self, url: Option<&str>) {
        self.url = url.map(str::to_owned);
    }

    pub fn standalone(&self) -> i32 {
        self.standalone
    }

    /// Set the standalone status. Values outside `-2..=1` are ignored.
    pub fn set_standalone(&mut self, standalone: i32) {
        if (-2..=1).contains(&standalone) {
            self.standalone = standalone;
        }
    }

    pub fn int_subset(&self) -> Option<XmlNodeId> {
        self.int_subset
    }

    pub fn ext_subset(&self) -> Option<XmlNodeId> {
        self.ext_subset
    }

    pub fn old_ns(&self) -> Option<XmlNsId> {
        self.old_ns
    }

    pub fn dict(&self) -> Option<&XmlDictRef> {
        self.dict.as_ref()
    }

    /// Share `dict` with this document. Names of nodes created afterward are interned in it.
    pub fn set_dict(&mut self, dict: Option<XmlDictRef>) {
        self.dict = dict;
    }

    pub fn properties(&self) -> i32 {
        self.properties
    }

    pub fn set_properties(&mut self, properties: i32) {
        self.properties = properties;
    }

    pub fn has_property(&self, property: XmlDocProperties) -> bool {
        self.properties & property as i32 != 0
    }

    pub fn parse_flags(&self) -> i32 {
        self.parse_flags
    }

    pub fn set_parse_flags(&mut self, flags: i32) {
        self.parse_flags = flags;
    }

    /// get the compression ratio for a document, ZLIB based.
    ///
    /// Returns 0 (uncompressed) to 9 (max compression)
    #[doc(alias = "xmlGetDocCompressMode")]
    pub fn get_compress_mode(&self) -> i32 {
        self.compression
    }

    /// set the compression ratio for a document, ZLIB based.
    /// Correct values: 0 (uncompressed) to 9 (max compression)
    #[doc(alias = "xmlSetDocCompressMode")]
    pub fn set_compress_mode(&mut self, mode: i32) {
        self.compression = mode.clamp(0, 9);
    }
}

impl XmlTree {
    pub(crate) fn new_doc_internal(
        &mut self,
        typ: XmlElementType,
        version: Option<&str>,
    ) -> XmlNodeId {
        let doc = XmlNode::new(typ, None, XmlNodeVariant::Doc(Box::new(XmlDoc::new(version))));
        let id = self.alloc(doc);
        if let Some(node) = self.get_mut(id) {
            node.doc = Some(id);
        }
        id
    }

    /// Creates a new XML document. If `version` is `None`, "1.0" is used.
    #[doc(alias = "xmlNewDoc")]
    pub fn new_doc(&mut self, version: Option<&str>) -> XmlNodeId {
        self.new_doc_internal(
            XmlElementType::XmlDocumentNode,
            Some(version.unwrap_or(XML_DEFAULT_VERSION)),
        )
    }

    pub fn doc(&self, doc: XmlNodeId) -> Option<&XmlDoc> {
        self.get(doc)?.as_doc()
    }

    pub fn doc_mut(&mut self, doc: XmlNodeId) -> Option<&mut XmlDoc> {
        self.get_mut(doc)?.as_doc_mut()
    }

    /// Free up all the structures used by a document, tree included.
    #[doc(alias = "xmlFreeDoc")]
    pub fn free_doc(&mut self, doc: XmlNodeId) {
        if self.doc(doc).is_some() {
            self.release_subtree(doc);
        }
    }

    /// Get the root element of the document.
    ///
    /// Searches the document children list for the first element node.
    #[doc(alias = "xmlDocGetRootElement")]
    pub fn get_root_element(&self, doc: XmlNodeId) -> Option<XmlNodeId> {
        self.doc(doc)?;
        self.child_nodes(doc)
            .find(|&c| self.element_type(c) == XmlElementType::XmlElementNode)
    }

    /// Set the root element of the document.
    ///
    /// Returns the old root element if any was found.
    #[doc(alias = "xmlDocSetRootElement")]
    pub fn set_root_element(
        &mut self,
        doc: XmlNodeId,
        root: XmlNodeId,
    ) -> Result<Option<XmlNodeId>, XmlParserErrors> {
        if self.doc(doc).is_none() || self.element_type(root) != XmlElementType::XmlElementNode {
            return Err(xml_tree_err(
                XmlParserErrors::XmlErrArgument,
                Some(root),
                "a root element must be an element set on a document",
            ));
        }
        self.unlink(root);
        self.set_tree_doc(root, Some(doc));
        match self.get_root_element(doc) {
            Some(old) => {
                self.replace_node(old, Some(root))?;
                Ok(Some(old))
            }
            None => {
                self.set_parent(root, Some(doc));
                self.append_child_link(doc, root);
                Ok(None)
            }
        }
    }

    /// Get the internal subset of a document.
    #[doc(alias = "xmlGetIntSubset")]
    pub fn get_int_subset(&self, doc: XmlNodeId) -> Option<XmlNodeId> {
        self.child_nodes(doc)
            .find(|&c| self.element_type(c) == XmlElementType::XmlDTDNode)
            .or_else(|| self.doc(doc)?.int_subset)
    }

    /// Parse the value string and build the node list associated.
    /// Character references are decoded, predefined entities are substituted
    /// and other entity references become reference nodes.
    ///
    /// Returns the first node of a free standing sibling chain, or `None` if
    /// `value` is empty.
    #[doc(alias = "xmlStringGetNodeList")]
    pub fn string_get_node_list(
        &mut self,
        doc: Option<XmlNodeId>,
        value: &str,
    ) -> Result<Option<XmlNodeId>, XmlParserErrors> {
        let mut nodes = vec![];
        match self.parse_node_list(doc, value, &mut nodes) {
            Ok(()) => {
                for pair in nodes.windows(2) {
                    self.set_next(pair[0], Some(pair[1]));
                    self.set_prev(pair[1], Some(pair[0]));
                }
                Ok(nodes.first().copied())
            }
            Err(err) => {
                for node in nodes {
                    self.free_node(node);
                }
                Err(err)
            }
        }
    }

    /// Parse the first `len` bytes of `value` and build the node list associated.
    #[doc(alias = "xmlStringLenGetNodeList")]
    pub fn string_len_get_node_list(
        &mut self,
        doc: Option<XmlNodeId>,
        value: &str,
        len: usize,
    ) -> Result<Option<XmlNodeId>, XmlParserErrors> {
        self.string_get_node_list(doc, super::node::truncate_at_char_boundary(value, len))
    }

    fn parse_node_list(
        &mut self,
        doc: Option<XmlNodeId>,
        value: &str,
        nodes: &mut Vec<XmlNodeId>,
    ) -> Result<(), XmlParserErrors> {
        let mut buf = String::new();
        let mut rest = value;
        while let Some(pos) = rest.find('&') {
            buf.push_str(&rest[..pos]);
            rest = &rest[pos + 1..];
            let Some(end) = rest.find(';') else {
                return Err(xml_tree_err(
                    XmlParserErrors::XmlTreeUnterminatedEntity,
                    None,
                    rest,
                ));
            };
            let name = &rest[..end];
            rest = &rest[end + 1..];
            if let Some(num) = name.strip_prefix('#') {
                buf.push(parse_char_ref(num)?);
                continue;
            }
            if name.is_empty() {
                return Err(xml_tree_err(
                    XmlParserErrors::XmlTreeUnterminatedEntity,
                    None,
                    "&;",
                ));
            }
            let declared = doc.and_then(|doc| self.get_doc_entity(doc, name));
            if let Some(predefined) = get_predefined_entity(name).filter(|_| declared.is_none()) {
                buf.push_str(predefined.content);
                continue;
            }
            if !buf.is_empty() {
                nodes.push(self.new_doc_text(doc, &buf));
                buf.clear();
            }
            nodes.push(self.new_reference(doc, name)?);
        }
        buf.push_str(rest);
        if !buf.is_empty() {
            nodes.push(self.new_doc_text(doc, &buf));
        }
        Ok(())
    }

    fn list_get_string_internal(
        &self,
        doc: Option<XmlNodeId>,
        list: XmlNodeId,
        in_line: bool,
        raw: bool,
    ) -> String {
        let mut ret = String::new();
        let in_attr = self
            .parent(list)
            .is_some_and(|p| self.element_type(p) == XmlElementType::XmlAttributeNode);
        for node in self.siblings(Some(list)) {
            let Some(n) = self.get(node) else {
                continue;
            };
            match n.element_type() {
                XmlElementType::XmlTextNode | XmlElementType::XmlCDATASectionNode => {
                    let content = n.content().unwrap_or("");
                    if in_line {
                        ret.push_str(content);
                    } else if raw {
                        ret.push_str(&encode_special_chars(content));
                    } else if in_attr {
                        ret.push_str(&self.encode_attribute_entities(doc, content));
                    } else {
                        ret.push_str(&self.encode_entities_reentrant(doc, content));
                    }
                }
                XmlElementType::XmlEntityRefNode => {
                    let name = n.name().unwrap_or("");
                    if in_line {
                        match self.get_content(node) {
                            Some(content) if !content.is_empty() => ret.push_str(&content),
                            _ => ret.push_str(n.content().unwrap_or("")),
                        }
                    } else {
                        ret.push('&');
                        ret.push_str(name);
                        ret.push(';');
                    }
                }
                _ => {}
            }
        }
        ret
    }

    /// Build the string equivalent to the text contained in the Node list
    /// made of TEXTs and ENTITY_REFs.
    ///
    /// If `in_line` is true, entity references are substituted and no escaping
    /// is done. Otherwise the result is suitable to be written back as markup.
    #[doc(alias = "xmlNodeListGetString")]
    pub fn node_list_get_string(
        &self,
        doc: Option<XmlNodeId>,
        list: XmlNodeId,
        in_line: bool,
    ) -> String {
        self.list_get_string_internal(doc, list, in_line, false)
    }

    /// Builds the string equivalent to the text contained in the Node list
    /// made of TEXTs and ENTITY_REFs, contrary to [`XmlTree::node_list_get_string`]
    /// this function doesn't do any character encoding handling.
    #[doc(alias = "xmlNodeListGetRawString")]
    pub fn node_list_get_raw_string(
        &self,
        doc: Option<XmlNodeId>,
        list: XmlNodeId,
        in_line: bool,
    ) -> String {
        self.list_get_string_internal(doc, list, in_line, true)
    }
}

fn parse_char_ref(num: &str) -> Result<char, XmlParserErrors> {
    let (digits, radix, code) = match num.strip_prefix('x') {
        Some(hex) => (hex, 16, XmlParserErrors::XmlTreeInvalidHex),
        None => (num, 10, XmlParserErrors::XmlTreeInvalidDec),
    };
    let value = (!digits.is_empty())
        .then(|| {
            digits.chars().try_fold(0u32, |acc, c| {
                let d = c.to_digit(radix)?;
                acc.checked_mul(radix)?.checked_add(d)
            })
        })
        .flatten();
    value
        .filter(|&v| v != 0)
        .and_then(char::from_u32)
        .ok_or_else(|| xml_tree_err(code, None, num))
}

/// Try to find if the document correspond to an XHTML DTD.
///
/// Returns `true` if `system_id` or `public_id` names one of the XHTML 1.0 DTDs.
#[doc(alias = "xmlIsXHTML")]
pub fn is_xhtml(system_id: Option<&str>, public_id: Option<&str>) -> bool {
    if let Some(public_id) = public_id {
        if [
            XHTML_STRICT_PUBLIC_ID,
            XHTML_FRAME_PUBLIC_ID,
            XHTML_TRANS_PUBLIC_ID,
        ]
        .contains(&public_id)
        {
            return true;
        }
    }
    if let Some(system_id) = system_id {
        if [
            XHTML_STRICT_SYSTEM_ID,
            XHTML_FRAME_SYSTEM_ID,
            XHTML_TRANS_SYSTEM_ID,
        ]
        .contains(&system_id)
        {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_has_no_root() {
        let mut tree = XmlTree::new();
        let doc = tree.new_doc(None);
        assert_eq!(tree.get_root_element(doc), None);
        assert_eq!(tree.doc(doc).unwrap().version(), Some("1.0"));
        assert_eq!(tree.doc(doc).unwrap().standalone(), -1);
        assert!(
            tree.doc(doc)
                .unwrap()
                .has_property(XmlDocProperties::XmlDocUserbuilt)
        );
        assert_eq!(tree.document(doc), Some(doc));
    }

    #[test]
    fn set_root_element_returns_old_root() {
        let mut tree = XmlTree::new();
        let doc = tree.new_doc(None);
        let a = tree.new_node(None, "a").unwrap();
        let b = tree.new_node(None, "b").unwrap();
        assert_eq!(tree.set_root_element(doc, a), Ok(None));
        assert_eq!(tree.document(a), Some(doc));
        assert_eq!(tree.set_root_element(doc, b), Ok(Some(a)));
        assert_eq!(tree.get_root_element(doc), Some(b));
        assert_eq!(tree.parent(a), None);
        let text = tree.new_text("t");
        assert!(tree.set_root_element(doc, text).is_err());
    }

    #[test]
    fn node_list_from_string() {
        let mut tree = XmlTree::new();
        let doc = tree.new_doc(None);
        let first = tree
            .string_get_node_list(Some(doc), "a&#65;&#x42;&lt;&ent;z")
            .unwrap()
            .unwrap();
        let nodes = tree.siblings(Some(first)).collect::<Vec<_>>();
        assert_eq!(nodes.len(), 3);
        assert_eq!(tree.get_content(nodes[0]).as_deref(), Some("aAB<"));
        assert_eq!(
            tree.element_type(nodes[1]),
            XmlElementType::XmlEntityRefNode
        );
        assert_eq!(tree.name(nodes[1]), Some("ent"));
        assert_eq!(tree.get_content(nodes[2]).as_deref(), Some("z"));
        assert_eq!(
            tree.node_list_get_string(Some(doc), first, false),
            "aAB&lt;&ent;z"
        );
        assert_eq!(tree.node_list_get_raw_string(Some(doc), first, true), "aAB<z");
    }

    #[test]
    fn malformed_references_are_rejected() {
        let mut tree = XmlTree::new();
        assert_eq!(
            tree.string_get_node_list(None, "&#xZZ;"),
            Err(XmlParserErrors::XmlTreeInvalidHex)
        );
        assert_eq!(
            tree.string_get_node_list(None, "&#12a;"),
            Err(XmlParserErrors::XmlTreeInvalidDec)
        );
        assert_eq!(
            tree.string_get_node_list(None, "a &amp b"),
            Err(XmlParserErrors::XmlTreeUnterminatedEntity)
        );
        assert_eq!(tree.node_count(), 0);
        assert_eq!(tree.string_get_node_list(None, ""), Ok(None));
    }

    #[test]
    fn xhtml_identifiers() {
        assert!(is_xhtml(None, Some("-//W3C//DTD XHTML 1.0 Strict//EN")));
        assert!(is_xhtml(
            Some("http://www.w3.org/TR/xhtml1/DTD/xhtml1-transitional.dtd"),
            None
        ));
        assert!(!is_xhtml(Some("about:legacy-compat"), None));
    }

    #[test]
    fn compress_mode_is_clamped() {
        let mut tree = XmlTree::new();
        let doc = tree.new_doc(None);
        let d = tree.doc_mut(doc).unwrap();
        d.set_compress_mode(12);
        assert_eq!(d.get_compress_mode(), 9);
        d.set_compress_mode(-3);
        assert_eq!(d.get_compress_mode(), 0);
    }
}
