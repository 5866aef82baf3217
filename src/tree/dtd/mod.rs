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
mod element;
mod enumeration;
mod notation;

use std::collections::HashMap;

use crate::error::{XmlErrorDomain, XmlParserErrors, xml_simple_error, xml_tree_err};

use super::{
    XmlAttributeDefault, XmlAttributeType, XmlElementType, XmlElementTypeVal, XmlNode, XmlNodeId,
    XmlNodeVariant, XmlTree, split_qname, validate_name, validate_nmtoken,
};

pub use attribute::*;
pub use element::*;
pub use enumeration::*;
pub use notation::*;

/// Key of an element declaration: local name and prefix.
pub(crate) type ElementKey = (String, Option<String>);
/// Key of an attribute declaration: local name, prefix and element qualified name.
pub(crate) type AttributeKey = (String, Option<String>, String);

/// The declarations of a DTD, internal or external subset.
///
/// Element, attribute and entity declarations are nodes linked as children
/// of the DTD node in declaration order. The tables below index them by name.
#[derive(Debug, Default)]
pub struct XmlDtd {
    pub(crate) notations: HashMap<String, XmlNotation>,
    pub(crate) elements: HashMap<ElementKey, XmlNodeId>,
    pub(crate) attributes: HashMap<AttributeKey, XmlNodeId>,
    pub(crate) entities: HashMap<String, XmlNodeId>,
    pub(crate) pentities: HashMap<String, XmlNodeId>,
    pub(crate) external_id: Option<String>,
    pub(crate) system_id: Option<String>,
}

impl XmlDtd {
    /// External identifier for PUBLIC DTD.
    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }

    /// URI for a SYSTEM or PUBLIC DTD.
    pub fn system_id(&self) -> Option<&str> {
        self.system_id.as_deref()
    }

    pub fn notations(&self) -> impl Iterator<Item = &XmlNotation> {
        self.notations.values()
    }

    pub fn entity(&self, name: &str) -> Option<XmlNodeId> {
        self.entities.get(name).copied()
    }

    pub fn parameter_entity(&self, name: &str) -> Option<XmlNodeId> {
        self.pentities.get(name).copied()
    }
}

fn valid_err(code: XmlParserErrors, node: Option<XmlNodeId>, msg: &str) -> XmlParserErrors {
    xml_simple_error(XmlErrorDomain::XmlFromValid, code, node, Some(msg));
    code
}

fn is_valid_default(atype: XmlAttributeType, value: &str) -> bool {
    let names = |value: &str, check: fn(&str) -> Result<(), &'static str>| {
        let mut tokens = value.split('\x20').peekable();
        tokens.peek().is_some() && tokens.all(|t| check(t).is_ok())
    };
    match atype {
        XmlAttributeType::XmlAttributeCDATA => true,
        XmlAttributeType::XmlAttributeID
        | XmlAttributeType::XmlAttributeIDREF
        | XmlAttributeType::XmlAttributeEntity
        | XmlAttributeType::XmlAttributeNotation => validate_name::<false>(value).is_ok(),
        XmlAttributeType::XmlAttributeIDREFS | XmlAttributeType::XmlAttributeEntities => {
            names(value, validate_name::<false>)
        }
        XmlAttributeType::XmlAttributeNmtoken | XmlAttributeType::XmlAttributeEnumeration => {
            validate_nmtoken::<false>(value).is_ok()
        }
        XmlAttributeType::XmlAttributeNmtokens => names(value, validate_nmtoken::<false>),
    }
}

impl XmlTree {
    pub fn dtd(&self, dtd: XmlNodeId) -> Option<&XmlDtd> {
        self.get(dtd)?.as_dtd()
    }

    pub(crate) fn dtd_mut(&mut self, dtd: XmlNodeId) -> Option<&mut XmlDtd> {
        self.get_mut(dtd)?.as_dtd_mut()
    }

    fn alloc_dtd(
        &mut self,
        doc: Option<XmlNodeId>,
        name: Option<&str>,
        external_id: Option<&str>,
        system_id: Option<&str>,
    ) -> XmlNodeId {
        let name = name.map(|name| self.intern_name(doc, name));
        let dtd = XmlDtd {
            external_id: external_id.map(str::to_owned),
            system_id: system_id.map(str::to_owned),
            ..Default::default()
        };
        let mut node = XmlNode::new(
            XmlElementType::XmlDTDNode,
            name,
            XmlNodeVariant::Dtd(Box::new(dtd)),
        );
        node.doc = doc;
        self.alloc(node)
    }

    /// Creation of a new DTD for the external subset.
    /// To create an internal subset, use [`XmlTree::create_int_subset`].
    ///
    /// The DTD is recorded as the external subset of `doc` but is not linked
    /// into its children.
    #[doc(alias = "xmlNewDtd")]
    pub fn new_dtd(
        &mut self,
        doc: Option<XmlNodeId>,
        name: Option<&str>,
        external_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        if let Some(doc) = doc {
            let Some(d) = self.doc(doc) else {
                return Err(xml_tree_err(
                    XmlParserErrors::XmlErrArgument,
                    Some(doc),
                    "a DTD must belong to a document",
                ));
            };
            if d.ext_subset.is_some() {
                return Err(xml_tree_err(
                    XmlParserErrors::XmlErrArgument,
                    Some(doc),
                    "the document already has an external subset",
                ));
            }
        }
        let dtd = self.alloc_dtd(doc, name, external_id, system_id);
        if let Some(d) = doc.and_then(|doc| self.doc_mut(doc)) {
            d.ext_subset = Some(dtd);
        }
        Ok(dtd)
    }

    /// Create the internal subset of a document.
    ///
    /// On HTML documents the subset becomes the first child. Otherwise it is
    /// inserted before the root element, or appended if there is none.
    #[doc(alias = "xmlCreateIntSubset")]
    pub fn create_int_subset(
        &mut self,
        doc: XmlNodeId,
        name: Option<&str>,
        external_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        let Some(d) = self.doc(doc) else {
            return Err(xml_tree_err(
                XmlParserErrors::XmlErrArgument,
                Some(doc),
                "an internal subset must belong to a document",
            ));
        };
        if d.int_subset.is_some() {
            return Err(xml_tree_err(
                XmlParserErrors::XmlErrArgument,
                Some(doc),
                "the document already has an internal subset",
            ));
        }
        let dtd = self.alloc_dtd(Some(doc), name, external_id, system_id);
        if let Some(d) = self.doc_mut(doc) {
            d.int_subset = Some(dtd);
        }
        self.set_parent(dtd, Some(doc));

        let before = if self.element_type(doc) == XmlElementType::XmlHTMLDocumentNode {
            self.children(doc)
        } else {
            self.child_nodes(doc)
                .find(|&c| self.element_type(c) == XmlElementType::XmlElementNode)
        };
        match before {
            Some(next) => {
                let prev = self.prev(next);
                self.set_next(dtd, Some(next));
                self.set_prev(dtd, prev);
                self.set_prev(next, Some(dtd));
                match prev {
                    Some(prev) => self.set_next(prev, Some(dtd)),
                    None => self.set_children(doc, Some(dtd)),
                }
            }
            None => self.append_child_link(doc, dtd),
        }
        Ok(dtd)
    }

    /// Free a DTD structure.
    ///
    /// The DTD is detached from its document first.
    #[doc(alias = "xmlFreeDtd")]
    pub fn free_dtd(&mut self, dtd: XmlNodeId) {
        if self.dtd(dtd).is_some() {
            self.free_node(dtd);
        }
    }

    /// Drop `decl` from the lookup table of `dtd` it is indexed in.
    pub(crate) fn remove_decl_from_dtd(&mut self, dtd: XmlNodeId, decl: XmlNodeId) {
        let Some(node) = self.get(decl) else {
            return;
        };
        let name = node.name().unwrap_or("").to_owned();
        let (typ, prefix, elem, parameter) = match &node.variant {
            XmlNodeVariant::ElementDecl(e) => (node.element_type(), e.prefix.clone(), None, false),
            XmlNodeVariant::AttributeDecl(a) => (
                node.element_type(),
                a.prefix.clone(),
                Some(a.elem.clone()),
                false,
            ),
            XmlNodeVariant::EntityDecl(e) => (node.element_type(), None, None, e.etype.is_parameter()),
            _ => return,
        };
        let Some(d) = self.dtd_mut(dtd) else {
            return;
        };
        match typ {
            XmlElementType::XmlElementDecl => {
                let key = (name, prefix);
                if d.elements.get(&key) == Some(&decl) {
                    d.elements.remove(&key);
                }
            }
            XmlElementType::XmlAttributeDecl => {
                let key = (name, prefix, elem.unwrap_or_default());
                if d.attributes.get(&key) == Some(&decl) {
                    d.attributes.remove(&key);
                }
            }
            _ => {
                let table = if parameter {
                    &mut d.pentities
                } else {
                    &mut d.entities
                };
                if table.get(&name) == Some(&decl) {
                    table.remove(&name);
                }
            }
        }
    }

    fn link_decl(&mut self, dtd: XmlNodeId, decl: XmlNodeId) {
        self.set_parent(decl, Some(dtd));
        self.append_child_link(dtd, decl);
    }

    /// Register a new element declaration.
    ///
    /// `EMPTY` and `ANY` declarations take no content model, `MIXED` and
    /// `ELEMENT` declarations require one.
    #[doc(alias = "xmlAddElementDecl")]
    pub fn add_element_decl(
        &mut self,
        dtd: XmlNodeId,
        name: &str,
        etype: XmlElementTypeVal,
        content: Option<&XmlElementContent>,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        if self.dtd(dtd).is_none() {
            return Err(XmlParserErrors::XmlErrArgument);
        }
        match etype {
            XmlElementTypeVal::XmlElementTypeEmpty | XmlElementTypeVal::XmlElementTypeAny
                if content.is_some() =>
            {
                return Err(valid_err(
                    XmlParserErrors::XmlErrInternalError,
                    Some(dtd),
                    &format!("{name}: content model given for EMPTY or ANY element"),
                ));
            }
            XmlElementTypeVal::XmlElementTypeMixed | XmlElementTypeVal::XmlElementTypeElement
                if content.is_none() =>
            {
                return Err(valid_err(
                    XmlParserErrors::XmlErrInternalError,
                    Some(dtd),
                    &format!("{name}: content model missing"),
                ));
            }
            XmlElementTypeVal::XmlElementTypeUndefined => {
                return Err(valid_err(
                    XmlParserErrors::XmlErrInternalError,
                    Some(dtd),
                    "ELEMENT decl corrupted invalid type",
                ));
            }
            _ => {}
        }
        let (prefix, local) = split_qname(name);
        let key = (local.to_owned(), prefix.map(str::to_owned));
        if self.dtd(dtd).is_some_and(|d| d.elements.contains_key(&key)) {
            return Err(valid_err(
                XmlParserErrors::XmlDTDElemRedefined,
                Some(dtd),
                &format!("Redefinition of element {name}"),
            ));
        }

        let doc = self.document(dtd);
        let decl = XmlElement {
            etype,
            content: content.map(XmlElementContent::copy),
            prefix: key.1.clone(),
        };
        let name = self.intern_name(doc, local);
        let mut node = XmlNode::new(
            XmlElementType::XmlElementDecl,
            Some(name),
            XmlNodeVariant::ElementDecl(Box::new(decl)),
        );
        node.doc = doc;
        let id = self.alloc(node);
        if let Some(d) = self.dtd_mut(dtd) {
            d.elements.insert(key, id);
        }
        self.link_decl(dtd, id);
        Ok(id)
    }

    /// Search the DTD for the description of this element.
    ///
    /// A prefixed `name` is looked up by prefix and local name.
    #[doc(alias = "xmlGetDtdElementDesc")]
    pub fn get_dtd_element_desc(&self, dtd: XmlNodeId, name: &str) -> Option<XmlNodeId> {
        let (prefix, local) = split_qname(name);
        self.get_dtd_qelement_desc(dtd, local, prefix)
    }

    /// Search the DTD for the description of this qualified element.
    #[doc(alias = "xmlGetDtdQElementDesc")]
    pub fn get_dtd_qelement_desc(
        &self,
        dtd: XmlNodeId,
        name: &str,
        prefix: Option<&str>,
    ) -> Option<XmlNodeId> {
        self.dtd(dtd)?
            .elements
            .get(&(name.to_owned(), prefix.map(str::to_owned)))
            .copied()
    }

    fn count_id_attributes(&self, dtd: XmlNodeId, elem: &str) -> usize {
        self.dtd_element_attributes(dtd, elem)
            .filter(|&attr| {
                self.get(attr)
                    .and_then(|a| a.as_attribute_decl())
                    .is_some_and(|a| a.atype == XmlAttributeType::XmlAttributeID)
            })
            .count()
    }

    /// Register a new attribute declaration.
    ///
    /// An invalid default value is reported and dropped. A declaration of the
    /// external subset already made in the internal subset is ignored and
    /// reported as `XmlDTDAttributeRedefined` without raising an error.
    #[doc(alias = "xmlAddAttributeDecl")]
    #[allow(clippy::too_many_arguments)]
    pub fn add_attribute_decl(
        &mut self,
        dtd: XmlNodeId,
        elem: &str,
        name: &str,
        prefix: Option<&str>,
        atype: XmlAttributeType,
        def: XmlAttributeDefault,
        default_value: Option<&str>,
        tree: Option<XmlEnumeration>,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        if self.dtd(dtd).is_none() {
            return Err(XmlParserErrors::XmlErrArgument);
        }
        let mut default_value = default_value;
        if let Some(value) = default_value.filter(|v| !is_valid_default(atype, v)) {
            valid_err(
                XmlParserErrors::XmlDTDAttributeDefault,
                Some(dtd),
                &format!("Attribute {name} of {elem}: invalid default value '{value}'"),
            );
            default_value = None;
        }

        let key = (name.to_owned(), prefix.map(str::to_owned), elem.to_owned());
        let doc = self.document(dtd);
        // an attribute of the external subset declared in the internal subset keeps the first one
        if let Some(int_subset) = doc
            .and_then(|doc| self.doc(doc))
            .filter(|d| d.ext_subset == Some(dtd))
            .and_then(|d| d.int_subset)
        {
            if self
                .dtd(int_subset)
                .is_some_and(|d| d.attributes.contains_key(&key))
            {
                return Err(XmlParserErrors::XmlDTDAttributeRedefined);
            }
        }
        if self.dtd(dtd).is_some_and(|d| d.attributes.contains_key(&key)) {
            return Err(valid_err(
                XmlParserErrors::XmlDTDAttributeRedefined,
                Some(dtd),
                &format!("Attribute {name} of element {elem}: already defined"),
            ));
        }
        if atype == XmlAttributeType::XmlAttributeID && self.count_id_attributes(dtd, elem) != 0 {
            // reported, the declaration is kept anyway
            valid_err(
                XmlParserErrors::XmlDTDMultipleID,
                Some(dtd),
                &format!("Element {elem} has too may ID attributes defined : {name}"),
            );
        }

        let decl = XmlAttribute {
            atype,
            def,
            default_value: default_value.map(str::to_owned),
            tree,
            prefix: key.1.clone(),
            elem: key.2.clone(),
        };
        let name = self.intern_name(doc, name);
        let mut node = XmlNode::new(
            XmlElementType::XmlAttributeDecl,
            Some(name),
            XmlNodeVariant::AttributeDecl(Box::new(decl)),
        );
        node.doc = doc;
        let id = self.alloc(node);
        if let Some(d) = self.dtd_mut(dtd) {
            d.attributes.insert(key, id);
        }
        self.link_decl(dtd, id);
        Ok(id)
    }

    /// Search the DTD for the description of this attribute on this element.
    ///
    /// A prefixed `name` is looked up by prefix and local name.
    #[doc(alias = "xmlGetDtdAttrDesc")]
    pub fn get_dtd_attr_desc(&self, dtd: XmlNodeId, elem: &str, name: &str) -> Option<XmlNodeId> {
        let (prefix, local) = split_qname(name);
        self.get_dtd_qattr_desc(dtd, elem, local, prefix)
    }

    /// Search the DTD for the description of this qualified attribute on this element.
    #[doc(alias = "xmlGetDtdQAttrDesc")]
    pub fn get_dtd_qattr_desc(
        &self,
        dtd: XmlNodeId,
        elem: &str,
        name: &str,
        prefix: Option<&str>,
    ) -> Option<XmlNodeId> {
        self.dtd(dtd)?
            .attributes
            .get(&(name.to_owned(), prefix.map(str::to_owned), elem.to_owned()))
            .copied()
    }

    /// The attribute declarations of the element `elem`, in declaration order.
    pub fn dtd_element_attributes<'a>(
        &'a self,
        dtd: XmlNodeId,
        elem: &'a str,
    ) -> impl Iterator<Item = XmlNodeId> + 'a {
        let first = self.dtd(dtd).and_then(|_| self.children(dtd));
        self.siblings(first).filter(move |&decl| {
            self.get(decl)
                .and_then(|d| d.as_attribute_decl())
                .is_some_and(|a| a.elem == elem)
        })
    }

    /// Register a new notation declaration.
    ///
    /// At least one of `public_id` and `system_id` is required.
    #[doc(alias = "xmlAddNotationDecl")]
    pub fn add_notation_decl(
        &mut self,
        dtd: XmlNodeId,
        name: &str,
        public_id: Option<&str>,
        system_id: Option<&str>,
    ) -> Result<(), XmlParserErrors> {
        if name.is_empty() || (public_id.is_none() && system_id.is_none()) {
            return Err(XmlParserErrors::XmlErrArgument);
        }
        let Some(d) = self.dtd_mut(dtd) else {
            return Err(XmlParserErrors::XmlErrArgument);
        };
        if d.notations.contains_key(name) {
            return Err(valid_err(
                XmlParserErrors::XmlDTDNotationRedefined,
                Some(dtd),
                &format!("xmlAddNotationDecl: {name} already defined"),
            ));
        }
        d.notations.insert(
            name.to_owned(),
            XmlNotation {
                name: name.to_owned(),
                public_id: public_id.map(str::to_owned),
                system_id: system_id.map(str::to_owned),
            },
        );
        Ok(())
    }

    /// Search the DTD for the description of this notation.
    #[doc(alias = "xmlGetDtdNotationDesc")]
    pub fn get_dtd_notation_desc(&self, dtd: XmlNodeId, name: &str) -> Option<&XmlNotation> {
        self.dtd(dtd)?.notations.get(name)
    }
}

#[cfg(test)]
mod tests {
    use crate::{error::get_last_error, tree::XmlElementContentType};

    use super::*;

    fn doc_with_subset(tree: &mut XmlTree) -> (XmlNodeId, XmlNodeId) {
        let doc = tree.new_doc(None);
        let dtd = tree.create_int_subset(doc, Some("r"), None, None).unwrap();
        (doc, dtd)
    }

    #[test]
    fn internal_subset_precedes_the_root() {
        let mut tree = XmlTree::new();
        let doc = tree.new_doc(None);
        let comment = tree.new_doc_comment(Some(doc), "c");
        tree.add_child(doc, comment).unwrap();
        let root = tree.new_doc_node(Some(doc), None, "r", None).unwrap();
        tree.set_root_element(doc, root).unwrap();
        let dtd = tree.create_int_subset(doc, Some("r"), None, Some("r.dtd")).unwrap();
        assert_eq!(tree.child_nodes(doc).collect::<Vec<_>>(), vec![comment, dtd, root]);
        assert_eq!(tree.get_int_subset(doc), Some(dtd));
        assert!(tree.create_int_subset(doc, Some("r"), None, None).is_err());

        tree.free_dtd(dtd);
        assert_eq!(tree.doc(doc).unwrap().int_subset(), None);
        assert_eq!(tree.child_nodes(doc).collect::<Vec<_>>(), vec![comment, root]);
    }

    #[test]
    fn external_subset_is_not_a_child() {
        let mut tree = XmlTree::new();
        let doc = tree.new_doc(None);
        let dtd = tree.new_dtd(Some(doc), Some("r"), Some("-//X//EN"), None).unwrap();
        assert_eq!(tree.doc(doc).unwrap().ext_subset(), Some(dtd));
        assert_eq!(tree.children(doc), None);
        assert_eq!(tree.dtd(dtd).unwrap().external_id(), Some("-//X//EN"));
        assert!(tree.new_dtd(Some(doc), Some("r"), None, None).is_err());
    }

    #[test]
    fn element_declarations() {
        let mut tree = XmlTree::new();
        let (_, dtd) = doc_with_subset(&mut tree);
        let pcdata = XmlElementContent::new(None, XmlElementContentType::XmlElementContentPCDATA).unwrap();
        let e = tree
            .add_element_decl(dtd, "p:e", XmlElementTypeVal::XmlElementTypeMixed, Some(&pcdata))
            .unwrap();
        assert_eq!(tree.get_dtd_element_desc(dtd, "p:e"), Some(e));
        assert_eq!(tree.get_dtd_qelement_desc(dtd, "e", Some("p")), Some(e));
        assert_eq!(tree.get_dtd_element_desc(dtd, "e"), None);
        assert_eq!(tree.parent(e), Some(dtd));

        assert_eq!(
            tree.add_element_decl(dtd, "p:e", XmlElementTypeVal::XmlElementTypeAny, None),
            Err(XmlParserErrors::XmlDTDElemRedefined)
        );
        assert!(
            tree.add_element_decl(dtd, "x", XmlElementTypeVal::XmlElementTypeEmpty, Some(&pcdata))
                .is_err()
        );
        assert!(
            tree.add_element_decl(dtd, "x", XmlElementTypeVal::XmlElementTypeElement, None)
                .is_err()
        );

        tree.free_node(e);
        assert_eq!(tree.get_dtd_element_desc(dtd, "p:e"), None);
    }

    #[test]
    fn attribute_declarations() {
        let mut tree = XmlTree::new();
        let (_, dtd) = doc_with_subset(&mut tree);
        let a = tree
            .add_attribute_decl(
                dtd,
                "e",
                "kind",
                None,
                XmlAttributeType::XmlAttributeEnumeration,
                XmlAttributeDefault::XmlAttributeNone,
                Some("one"),
                Some(["one", "two"].into_iter().collect()),
            )
            .unwrap();
        assert_eq!(tree.get_dtd_attr_desc(dtd, "e", "kind"), Some(a));
        let decl = tree.get(a).unwrap().as_attribute_decl().unwrap();
        assert_eq!(decl.default_value(), Some("one"));
        assert_eq!(decl.tree().map(|t| t.len()), Some(2));

        assert_eq!(
            tree.add_attribute_decl(
                dtd,
                "e",
                "kind",
                None,
                XmlAttributeType::XmlAttributeCDATA,
                XmlAttributeDefault::XmlAttributeImplied,
                None,
                None,
            ),
            Err(XmlParserErrors::XmlDTDAttributeRedefined)
        );

        let id = tree
            .add_attribute_decl(
                dtd,
                "e",
                "id",
                None,
                XmlAttributeType::XmlAttributeID,
                XmlAttributeDefault::XmlAttributeImplied,
                Some("not a name"),
                None,
            )
            .unwrap();
        assert_eq!(tree.get(id).unwrap().as_attribute_decl().unwrap().default_value(), None);

        let second = tree
            .add_attribute_decl(
                dtd,
                "e",
                "key",
                None,
                XmlAttributeType::XmlAttributeID,
                XmlAttributeDefault::XmlAttributeImplied,
                None,
                None,
            )
            .unwrap();
        assert_eq!(get_last_error().code(), XmlParserErrors::XmlDTDMultipleID);
        assert_eq!(
            tree.dtd_element_attributes(dtd, "e").collect::<Vec<_>>(),
            vec![a, id, second]
        );

        let q = tree
            .add_attribute_decl(
                dtd,
                "e",
                "lang",
                Some("xml"),
                XmlAttributeType::XmlAttributeCDATA,
                XmlAttributeDefault::XmlAttributeFixed,
                Some("en"),
                None,
            )
            .unwrap();
        assert_eq!(tree.get_dtd_attr_desc(dtd, "e", "xml:lang"), Some(q));
        assert_eq!(tree.get_dtd_qattr_desc(dtd, "e", "lang", Some("xml")), Some(q));
    }

    #[test]
    fn notation_declarations() {
        let mut tree = XmlTree::new();
        let (_, dtd) = doc_with_subset(&mut tree);
        tree.add_notation_decl(dtd, "gif", None, Some("image/gif")).unwrap();
        assert_eq!(
            tree.add_notation_decl(dtd, "gif", Some("x"), None),
            Err(XmlParserErrors::XmlDTDNotationRedefined)
        );
        assert!(tree.add_notation_decl(dtd, "png", None, None).is_err());
        let gif = tree.get_dtd_notation_desc(dtd, "gif").unwrap();
        assert_eq!(gif.system_id(), Some("image/gif"));
        assert_eq!(gif.public_id(), None);
    }
}
