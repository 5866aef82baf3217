// Copyright of the original code is the following.
// --------
// Summary: The DTD validation
// Description: API for the DTD handling and the validity checking
//
// Copy: See Copyright for the status of this software.
//
// Author: Daniel Veillard
// --------
// valid.c : part of the code use to do the DTD handling and the validity
//           checking
//
// See Copyright for the status of this software.
//
// daniel@veillard.com

use crate::error::{XmlErrorDomain, XmlParserErrors, xml_simple_error};

use super::{XmlAttributeType, XmlElementType, XmlNodeId, XmlTree, build_qname};

/// An ID registered in the index of a document.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlID {
    pub(crate) value: String,
    pub(crate) attr: XmlNodeId,
    pub(crate) lineno: u32,
}

impl XmlID {
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The attribute holding the ID.
    pub fn attr(&self) -> XmlNodeId {
        self.attr
    }

    pub fn lineno(&self) -> u32 {
        self.lineno
    }
}

/// A reference to an ID, as an IDREF attribute holds it.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlRef {
    pub(crate) value: String,
    pub(crate) attr: XmlNodeId,
    pub(crate) lineno: u32,
}

impl XmlRef {
    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn attr(&self) -> XmlNodeId {
        self.attr
    }

    pub fn lineno(&self) -> u32 {
        self.lineno
    }
}

impl XmlTree {
    fn owner_line(&self, attr: XmlNodeId) -> u32 {
        self.parent(attr)
            .and_then(|elem| self.get(elem))
            .map_or(0, |elem| elem.line())
    }

    /// Register a new id declared by `attr` in the document `doc`.
    ///
    /// An attribute registered under another value is moved to the new one.
    /// Registering a value held by another attribute fails with `XmlDTDIDRedefined`
    /// and leaves the index unchanged.
    #[doc(alias = "xmlAddID", alias = "xmlAddIDSafe")]
    pub fn add_id(
        &mut self,
        doc: XmlNodeId,
        value: &str,
        attr: XmlNodeId,
    ) -> Result<(), XmlParserErrors> {
        if value.is_empty() || self.element_type(attr) != XmlElementType::XmlAttributeNode {
            return Err(XmlParserErrors::XmlErrArgument);
        }
        let Some(d) = self.doc(doc) else {
            return Err(XmlParserErrors::XmlErrArgument);
        };
        if let Some(old) = d.ids.get(value) {
            if old.attr == attr {
                return Ok(());
            }
            xml_simple_error(
                XmlErrorDomain::XmlFromValid,
                XmlParserErrors::XmlDTDIDRedefined,
                Some(attr),
                Some(&format!("ID {value} already defined")),
            );
            return Err(XmlParserErrors::XmlDTDIDRedefined);
        }
        if self.get(attr).and_then(|a| a.as_attr()).is_some_and(|a| a.id.is_some()) {
            self.remove_id_of(attr);
        }
        let id = XmlID {
            value: value.to_owned(),
            attr,
            lineno: self.owner_line(attr),
        };
        if let Some(d) = self.doc_mut(doc) {
            d.ids.insert(value.to_owned(), id);
        }
        if let Some(a) = self.get_mut(attr).and_then(|a| a.as_attr_mut()) {
            a.atype = Some(XmlAttributeType::XmlAttributeID);
            a.id = Some(value.to_owned());
        }
        Ok(())
    }

    /// Search the attribute declaring the given ID.
    #[doc(alias = "xmlGetID")]
    pub fn get_id(&self, doc: XmlNodeId, value: &str) -> Option<XmlNodeId> {
        let attr = self.doc(doc)?.ids.get(value)?.attr;
        self.contains(attr).then_some(attr)
    }

    /// The ID record registered under `value`.
    pub fn id_record(&self, doc: XmlNodeId, value: &str) -> Option<&XmlID> {
        self.doc(doc)?.ids.get(value)
    }

    /// Determine whether an attribute is of type ID. In case we have DTD(s)
    /// then this is done if DTD loading has been requested. In the case
    /// of HTML documents parsed with the HTML parser, then ID detection is
    /// done systematically.
    #[doc(alias = "xmlIsID")]
    pub fn is_id(&self, doc: XmlNodeId, elem: Option<XmlNodeId>, attr: XmlNodeId) -> bool {
        let Some(a) = self.get(attr) else {
            return false;
        };
        let Some(name) = a.name() else {
            return false;
        };
        let prefix = a.ns().and_then(|ns| self.ns(ns)).and_then(|ns| ns.prefix());
        if name == "id" && prefix == Some("xml") {
            return true;
        }
        if self.element_type(doc) == XmlElementType::XmlHTMLDocumentNode {
            let elem_name = elem.and_then(|elem| self.name(elem));
            return name.eq_ignore_ascii_case("id")
                || (name.eq_ignore_ascii_case("name")
                    && elem_name.is_none_or(|n| n.eq_ignore_ascii_case("a")));
        }
        let Some(elem) = elem.and_then(|elem| self.get(elem)) else {
            return false;
        };
        let Some(d) = self.doc(doc) else {
            return false;
        };
        let Some(elem_name) = elem.name() else {
            return false;
        };
        let elem_prefix = elem.ns().and_then(|ns| self.ns(ns)).and_then(|ns| ns.prefix());
        let mut felem = [0u8; 50];
        let mut fattr = [0u8; 50];
        let elem_qname = build_qname(elem_name, elem_prefix, Some(&mut felem[..]));
        let attr_qname = build_qname(name, prefix, Some(&mut fattr[..]));
        [d.int_subset, d.ext_subset]
            .into_iter()
            .flatten()
            .filter_map(|dtd| self.get_dtd_attr_desc(dtd, &elem_qname, &attr_qname))
            .filter_map(|decl| self.get(decl)?.as_attribute_decl())
            .any(|decl| decl.atype() == XmlAttributeType::XmlAttributeID)
    }

    /// Remove the given attribute from the ID table maintained internally.
    #[doc(alias = "xmlRemoveID")]
    pub fn remove_id(&mut self, doc: XmlNodeId, attr: XmlNodeId) -> Result<(), XmlParserErrors> {
        let value = self
            .get(attr)
            .and_then(|a| a.as_attr())
            .and_then(|a| a.id.clone())
            .ok_or(XmlParserErrors::XmlErrNotFound)?;
        let d = self.doc_mut(doc).ok_or(XmlParserErrors::XmlErrArgument)?;
        if d.ids.get(&value).is_none_or(|id| id.attr != attr) {
            return Err(XmlParserErrors::XmlErrNotFound);
        }
        d.ids.remove(&value);
        if let Some(a) = self.get_mut(attr).and_then(|a| a.as_attr_mut()) {
            a.id = None;
            a.atype = None;
        }
        Ok(())
    }

    /// Drop the ID registered by `attr` from the index of its document, if any.
    pub(crate) fn remove_id_of(&mut self, attr: XmlNodeId) {
        let Some(a) = self.get(attr) else {
            return;
        };
        let doc = a.document();
        let Some(value) = a.as_attr().and_then(|a| a.id.clone()) else {
            return;
        };
        if let Some(d) = doc.and_then(|doc| self.doc_mut(doc)) {
            if d.ids.get(&value).is_some_and(|id| id.attr == attr) {
                d.ids.remove(&value);
            }
        }
        if let Some(a) = self.get_mut(attr).and_then(|a| a.as_attr_mut()) {
            a.id = None;
            a.atype = None;
        }
    }

    /// Register a new ref declaration.
    #[doc(alias = "xmlAddRef")]
    pub fn add_ref(
        &mut self,
        doc: XmlNodeId,
        value: &str,
        attr: XmlNodeId,
    ) -> Result<(), XmlParserErrors> {
        if value.is_empty() || self.element_type(attr) != XmlElementType::XmlAttributeNode {
            return Err(XmlParserErrors::XmlErrArgument);
        }
        let lineno = self.owner_line(attr);
        let d = self.doc_mut(doc).ok_or(XmlParserErrors::XmlErrArgument)?;
        d.refs.entry(value.to_owned()).or_default().push(XmlRef {
            value: value.to_owned(),
            attr,
            lineno,
        });
        Ok(())
    }

    /// Find the set of references for the supplied ID.
    #[doc(alias = "xmlGetRefs")]
    pub fn get_refs(&self, doc: XmlNodeId, value: &str) -> Option<&[XmlRef]> {
        self.doc(doc)?
            .refs
            .get(value)
            .map(|refs| refs.as_slice())
            .filter(|refs| !refs.is_empty())
    }

    /// Remove the given attribute from the Ref table maintained internally.
    #[doc(alias = "xmlRemoveRef")]
    pub fn remove_ref(&mut self, doc: XmlNodeId, attr: XmlNodeId) -> Result<(), XmlParserErrors> {
        let value = self
            .children(attr)
            .map(|list| self.node_list_get_string(Some(doc), list, true))
            .ok_or(XmlParserErrors::XmlErrNotFound)?;
        let d = self.doc_mut(doc).ok_or(XmlParserErrors::XmlErrArgument)?;
        let refs = d.refs.get_mut(&value).ok_or(XmlParserErrors::XmlErrNotFound)?;
        let before = refs.len();
        refs.retain(|r| r.attr != attr);
        if refs.len() == before {
            return Err(XmlParserErrors::XmlErrNotFound);
        }
        if refs.is_empty() {
            d.refs.remove(&value);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{get_last_error, reset_last_error};

    use super::*;

    fn doc_with_root(tree: &mut XmlTree) -> (XmlNodeId, XmlNodeId) {
        let doc = tree.new_doc(None);
        let root = tree.new_doc_node(Some(doc), None, "root", None).unwrap();
        tree.set_root_element(doc, root).unwrap();
        (doc, root)
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut tree = XmlTree::new();
        let (doc, root) = doc_with_root(&mut tree);
        let a = tree.set_prop(root, "a", Some("x1")).unwrap();
        let child = tree.new_child(root, None, "c", None).unwrap();
        let b = tree.set_prop(child, "b", Some("x1")).unwrap();

        tree.add_id(doc, "x1", a).unwrap();
        assert_eq!(tree.add_id(doc, "x1", a), Ok(()));
        reset_last_error();
        assert_eq!(
            tree.add_id(doc, "x1", b),
            Err(XmlParserErrors::XmlDTDIDRedefined)
        );
        assert_eq!(get_last_error().domain(), XmlErrorDomain::XmlFromValid);
        assert_eq!(tree.get_id(doc, "x1"), Some(a));
        reset_last_error();
    }

    #[test]
    fn xml_id_is_registered_on_creation() {
        let mut tree = XmlTree::new();
        let (doc, root) = doc_with_root(&mut tree);
        let xml = tree.search_ns(Some(doc), Some(root), Some("xml")).unwrap();
        let attr = tree.set_ns_prop(root, Some(xml), "id", Some("top")).unwrap();
        assert!(tree.is_id(doc, Some(root), attr));
        assert_eq!(tree.get_id(doc, "top"), Some(attr));

        // overwriting the value moves the registration
        tree.set_ns_prop(root, Some(xml), "id", Some("moved")).unwrap();
        assert_eq!(tree.get_id(doc, "top"), None);
        assert_eq!(tree.get_id(doc, "moved"), Some(attr));

        // freeing the attribute drops it from the index
        tree.unset_ns_prop(root, Some(xml), "id").unwrap();
        assert_eq!(tree.get_id(doc, "moved"), None);
    }

    #[test]
    fn html_documents_treat_id_and_anchor_names_as_ids() {
        let mut tree = XmlTree::new();
        let doc = tree.new_doc_internal(XmlElementType::XmlHTMLDocumentNode, None);
        let a = tree.new_doc_node(Some(doc), None, "a", None).unwrap();
        let p = tree.new_doc_node(Some(doc), None, "p", None).unwrap();
        let name_on_a = tree.new_prop(Some(a), "name", None).unwrap();
        let name_on_p = tree.new_prop(Some(p), "name", None).unwrap();
        let id = tree.new_prop(Some(p), "ID", None).unwrap();
        assert!(tree.is_id(doc, Some(a), name_on_a));
        assert!(!tree.is_id(doc, Some(p), name_on_p));
        assert!(tree.is_id(doc, Some(p), id));
    }

    #[test]
    fn refs_are_indexed_by_value() {
        let mut tree = XmlTree::new();
        let (doc, root) = doc_with_root(&mut tree);
        let r1 = tree.set_prop(root, "r1", Some("target")).unwrap();
        let r2 = tree.set_prop(root, "r2", Some("target")).unwrap();
        tree.add_ref(doc, "target", r1).unwrap();
        tree.add_ref(doc, "target", r2).unwrap();
        assert_eq!(tree.get_refs(doc, "target").map(|r| r.len()), Some(2));
        tree.remove_ref(doc, r1).unwrap();
        let refs = tree.get_refs(doc, "target").unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].attr(), r2);
        assert!(tree.remove_ref(doc, r1).is_err());
        tree.remove_ref(doc, r2).unwrap();
        assert!(tree.get_refs(doc, "target").is_none());
    }
}
