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

use std::{any::Any, rc::Rc};

use crate::error::{XmlParserErrors, xml_tree_err};

use super::{
    XML_XML_NAMESPACE, XmlAttributeType, XmlElementType, XmlNode, XmlNodeId, XmlNodeVariant,
    XmlNsId, XmlTree, build_qname, generic::Siblings, split_qname3,
};

/// The attribute specific part of an attribute node.
///
/// The value of the attribute is held by the children of the node,
/// a list of TEXT and ENTITY_REF nodes.
#[derive(Debug, Default)]
pub struct XmlAttr {
    pub(crate) ns: Option<XmlNsId>,
    pub(crate) atype: Option<XmlAttributeType>,
    pub(crate) psvi: Option<Rc<dyn Any>>,
    // the ID value this attribute is registered under
    pub(crate) id: Option<String>,
}

impl XmlAttr {
    pub fn ns(&self) -> Option<XmlNsId> {
        self.ns
    }

    /// The type of the attribute, `XmlAttributeID` once it is registered as an ID.
    pub fn atype(&self) -> Option<XmlAttributeType> {
        self.atype
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

impl XmlTree {
    /// Iterate the attributes of an element.
    pub fn attributes(&self, elem: XmlNodeId) -> Siblings<'_> {
        self.siblings(self.get(elem).and_then(|n| n.properties()))
    }

    /// The namespace name of an attribute, if it has one.
    pub(crate) fn attr_ns_href(&self, attr: XmlNodeId) -> Option<String> {
        let ns = self.get(attr)?.ns()?;
        self.ns(ns).map(|ns| ns.href().to_owned())
    }

    fn new_prop_internal(
        &mut self,
        node: Option<XmlNodeId>,
        ns: Option<XmlNsId>,
        name: &str,
        value: Option<&str>,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        if node.is_some_and(|node| self.element_type(node) != XmlElementType::XmlElementNode) {
            return Err(xml_tree_err(
                XmlParserErrors::XmlTreeWrongParent,
                node,
                "attributes can only be set on elements",
            ));
        }
        if name.is_empty() {
            return Err(xml_tree_err(
                XmlParserErrors::XmlTreeInvalidName,
                node,
                "attribute name is empty",
            ));
        }
        let doc = node.and_then(|node| self.document(node));
        let name = self.intern_name(doc, name);
        let mut attr = XmlNode::new(
            XmlElementType::XmlAttributeNode,
            Some(name),
            XmlNodeVariant::Attr(XmlAttr {
                ns,
                ..Default::default()
            }),
        );
        attr.doc = doc;
        let cur = self.alloc(attr);
        if let Some(value) = value {
            let text = self.new_doc_text(doc, value);
            self.link_children(cur, text);
        }
        if let Some(node) = node {
            self.set_parent(cur, Some(node));
            self.append_property(node, cur);
            if let (Some(value), Some(doc)) = (value, doc) {
                if self.is_id(doc, Some(node), cur) {
                    if let Err(err) = self.add_id(doc, value, cur) {
                        self.free_prop(cur);
                        return Err(err);
                    }
                }
            }
        }
        Ok(cur)
    }

    /// Create a new property carried by a node.
    ///
    /// The value is stored verbatim, entity references are not parsed.
    #[doc(alias = "xmlNewProp")]
    pub fn new_prop(
        &mut self,
        node: Option<XmlNodeId>,
        name: &str,
        value: Option<&str>,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        self.new_prop_internal(node, None, name, value)
    }

    /// Create a new property tagged with a namespace and carried by a node.
    #[doc(alias = "xmlNewNsProp")]
    pub fn new_ns_prop(
        &mut self,
        node: Option<XmlNodeId>,
        ns: Option<XmlNsId>,
        name: &str,
        value: Option<&str>,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        self.new_prop_internal(node, ns, name, value)
    }

    /// Create a new property tagged with a namespace and carried by a node,
    /// taking the ownership of `name`.
    #[doc(alias = "xmlNewNsPropEatName")]
    pub fn new_ns_prop_eat_name(
        &mut self,
        node: Option<XmlNodeId>,
        ns: Option<XmlNsId>,
        name: String,
        value: Option<&str>,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        self.new_prop_internal(node, ns, &name, value)
    }

    /// Create a new property carried by a document.
    ///
    /// `value` may contain entity references, they are turned into nodes.
    /// The attribute is not attached to any element.
    #[doc(alias = "xmlNewDocProp")]
    pub fn new_doc_prop(
        &mut self,
        doc: Option<XmlNodeId>,
        name: &str,
        value: Option<&str>,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        if name.is_empty() {
            return Err(xml_tree_err(
                XmlParserErrors::XmlTreeInvalidName,
                None,
                "attribute name is empty",
            ));
        }
        let list = match value {
            Some(value) => self.string_get_node_list(doc, value)?,
            None => None,
        };
        let name = self.intern_name(doc, name);
        let mut attr = XmlNode::new(
            XmlElementType::XmlAttributeNode,
            Some(name),
            XmlNodeVariant::Attr(XmlAttr::default()),
        );
        attr.doc = doc;
        let cur = self.alloc(attr);
        if let Some(list) = list {
            self.link_children(cur, list);
        }
        Ok(cur)
    }

    /// Find the attribute of `node` named `name` in the namespace `href`.
    /// `href == None` matches attributes without a namespace.
    pub(crate) fn has_ns_prop_internal(
        &self,
        node: XmlNodeId,
        name: &str,
        href: Option<&str>,
    ) -> Option<XmlNodeId> {
        if self.element_type(node) != XmlElementType::XmlElementNode {
            return None;
        }
        self.attributes(node).find(|&attr| {
            let Some(a) = self.get(attr) else {
                return false;
            };
            if a.name() != Some(name) {
                return false;
            }
            match (href, a.ns().and_then(|ns| self.ns(ns))) {
                (None, None) => true,
                (Some(href), Some(ns)) => ns.href() == href,
                _ => false,
            }
        })
    }

    /// Look up the attribute declaration giving a default value to `name` on `node`.
    fn dtd_attr_default(&self, node: XmlNodeId, name: &str, href: Option<&str>) -> Option<XmlNodeId> {
        let doc = self.document(node)?;
        let doc = self.doc(doc)?;
        let subsets = [doc.int_subset, doc.ext_subset];
        let elem = self.get(node)?;
        let elem_name = elem.name()?;
        let elem_prefix = elem
            .ns()
            .and_then(|ns| self.ns(ns))
            .and_then(|ns| ns.prefix());
        let mut scratch = [0u8; 50];
        let elem_qname = build_qname(elem_name, elem_prefix, Some(&mut scratch[..]));

        let found = match href {
            None => subsets
                .into_iter()
                .flatten()
                .find_map(|dtd| self.get_dtd_attr_desc(dtd, &elem_qname, name)),
            Some(XML_XML_NAMESPACE) => subsets
                .into_iter()
                .flatten()
                .find_map(|dtd| self.get_dtd_qattr_desc(dtd, &elem_qname, name, Some("xml"))),
            Some(href) => {
                let prefixes = self
                    .get_ns_list(node)
                    .unwrap_or_default()
                    .into_iter()
                    .filter_map(|ns| self.ns(ns))
                    .filter(|ns| ns.href() == href)
                    .filter_map(|ns| ns.prefix().map(str::to_owned))
                    .collect::<Vec<_>>();
                prefixes.iter().find_map(|prefix| {
                    subsets.into_iter().flatten().find_map(|dtd| {
                        self.get_dtd_qattr_desc(dtd, &elem_qname, name, Some(prefix))
                    })
                })
            }
        };
        found.filter(|&decl| {
            self.get(decl)
                .and_then(|d| d.as_attribute_decl())
                .is_some_and(|d| d.default_value().is_some())
        })
    }

    /// The value of an attribute node, or the default value of an attribute declaration.
    pub(crate) fn prop_node_value(&self, prop: XmlNodeId) -> Option<String> {
        let node = self.get(prop)?;
        match node.element_type() {
            XmlElementType::XmlAttributeNode => {
                let Some(first) = node.children() else {
                    return Some(String::new());
                };
                if let Some(child) = self.get(first) {
                    if child.next().is_none()
                        && matches!(
                            child.element_type(),
                            XmlElementType::XmlTextNode | XmlElementType::XmlCDATASectionNode
                        )
                    {
                        return Some(child.content().unwrap_or("").to_owned());
                    }
                }
                Some(self.node_list_get_string(node.document(), first, true))
            }
            XmlElementType::XmlAttributeDecl => {
                node.as_attribute_decl()?.default_value().map(str::to_owned)
            }
            _ => None,
        }
    }

    /// Search an attribute associated to a node.
    /// This function also looks in DTD attribute declaration for #FIXED or
    /// default declaration values.
    ///
    /// Returns the attribute or the attribute declaration, or `None`.
    fn get_prop_node_with_default(
        &self,
        node: XmlNodeId,
        name: &str,
        href: Option<&str>,
    ) -> Option<XmlNodeId> {
        self.has_ns_prop_internal(node, name, href)
            .or_else(|| self.dtd_attr_default(node, name, href))
    }

    /// Search an attribute associated to a node, whatever its namespace.
    ///
    /// DTD defaults are not considered.
    #[doc(alias = "xmlHasProp")]
    pub fn has_prop(&self, node: XmlNodeId, name: &str) -> Option<XmlNodeId> {
        if self.element_type(node) != XmlElementType::XmlElementNode {
            return None;
        }
        self.attributes(node)
            .find(|&attr| self.name(attr) == Some(name))
    }

    /// Search for an attribute associated to a node.
    /// The attribute has to be anchored in the namespace specified.
    ///
    /// DTD defaults are not considered.
    #[doc(alias = "xmlHasNsProp")]
    pub fn has_ns_prop(
        &self,
        node: XmlNodeId,
        name: &str,
        href: Option<&str>,
    ) -> Option<XmlNodeId> {
        self.has_ns_prop_internal(node, name, href)
    }

    /// Search and get the value of an attribute associated to a node.
    /// This does the entity substitution.
    /// This function looks in DTD attribute declaration for #FIXED or
    /// default declaration values unless DTD use has been turned off.
    ///
    /// # Note
    /// This function acts independently of namespaces associated to the attribute.
    /// Use [`XmlTree::get_ns_prop`] or [`XmlTree::get_no_ns_prop`] for namespace aware processing.
    #[doc(alias = "xmlGetProp")]
    pub fn get_prop(&self, node: XmlNodeId, name: &str) -> Option<String> {
        let prop = self
            .has_prop(node, name)
            .or_else(|| self.dtd_attr_default(node, name, None))?;
        self.prop_node_value(prop)
    }

    /// Search and get the value of an attribute associated to a node.
    /// This does the entity substitution.
    ///
    /// This function is similar to [`XmlTree::get_prop`] except it will accept
    /// only an attribute in no namespace.
    #[doc(alias = "xmlGetNoNsProp")]
    pub fn get_no_ns_prop(&self, node: XmlNodeId, name: &str) -> Option<String> {
        let prop = self.get_prop_node_with_default(node, name, None)?;
        self.prop_node_value(prop)
    }

    /// Search and get the value of an attribute associated to a node.
    /// This attribute has to be anchored in the namespace specified.
    /// This does the entity substitution.
    #[doc(alias = "xmlGetNsProp")]
    pub fn get_ns_prop(
        &self,
        node: XmlNodeId,
        name: &str,
        href: Option<&str>,
    ) -> Option<String> {
        let prop = self.get_prop_node_with_default(node, name, href)?;
        self.prop_node_value(prop)
    }

    /// Search and get the value of an attribute associated to a node,
    /// ignoring DTD defaults.
    ///
    /// Returns `Ok(None)` if the attribute does not exist.
    #[doc(alias = "xmlNodeGetAttrValue")]
    pub fn node_get_attr_value(
        &self,
        node: XmlNodeId,
        name: &str,
        href: Option<&str>,
    ) -> Result<Option<String>, XmlParserErrors> {
        if self.element_type(node) != XmlElementType::XmlElementNode {
            return Err(XmlParserErrors::XmlErrArgument);
        }
        Ok(self
            .has_ns_prop_internal(node, name, href)
            .and_then(|prop| self.prop_node_value(prop)))
    }

    /// Set (or reset) an attribute carried by a node.
    ///
    /// If `name` has a prefix, then the corresponding namespace-binding will be used,
    /// if in scope; it is an error if there's no such ns-binding for the prefix in scope.
    #[doc(alias = "xmlSetProp")]
    pub fn set_prop(
        &mut self,
        node: XmlNodeId,
        name: &str,
        value: Option<&str>,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        if self.element_type(node) != XmlElementType::XmlElementNode {
            return Err(xml_tree_err(
                XmlParserErrors::XmlTreeWrongParent,
                Some(node),
                "attributes can only be set on elements",
            ));
        }
        if let Some((len, local)) = split_qname3(name) {
            let prefix = &name[..len];
            let doc = self.document(node);
            if let Some(ns) = self.search_ns(doc, Some(node), Some(prefix)) {
                let local = local.to_owned();
                return self.set_ns_prop(node, Some(ns), &local, value);
            }
        }
        self.set_ns_prop(node, None, name, value)
    }

    /// Set (or reset) an attribute carried by a node.
    /// The ns structure must be in scope, this is not checked.
    #[doc(alias = "xmlSetNsProp")]
    pub fn set_ns_prop(
        &mut self,
        node: XmlNodeId,
        ns: Option<XmlNsId>,
        name: &str,
        value: Option<&str>,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        let href = ns.and_then(|ns| self.ns(ns)).map(|ns| ns.href().to_owned());
        let Some(prop) = self.has_ns_prop_internal(node, name, href.as_deref()) else {
            return self.new_prop_internal(Some(node), ns, name, value);
        };
        // Modify the attribute's value.
        let was_id = self
            .get(prop)
            .and_then(|p| p.as_attr())
            .is_some_and(|a| a.atype == Some(XmlAttributeType::XmlAttributeID));
        if was_id {
            self.remove_id_of(prop);
        }
        if let Some(children) = self.children(prop) {
            self.free_node_list(children);
        }
        self.set_children(prop, None);
        self.set_last(prop, None);
        if let Some(attr) = self.get_mut(prop).and_then(|p| p.as_attr_mut()) {
            attr.ns = ns;
        }
        if let Some(value) = value {
            let text = self.new_doc_text(self.document(node), value);
            self.link_children(prop, text);
        }
        if let (true, Some(value), Some(doc)) = (was_id, value, self.document(node)) {
            self.add_id(doc, value, prop)?;
        }
        Ok(prop)
    }

    /// Remove an attribute carried by a node.
    /// This handles only attributes in no namespace.
    #[doc(alias = "xmlUnsetProp")]
    pub fn unset_prop(&mut self, node: XmlNodeId, name: &str) -> Result<(), XmlParserErrors> {
        let prop = self
            .has_ns_prop_internal(node, name, None)
            .ok_or(XmlParserErrors::XmlErrNotFound)?;
        self.free_prop(prop);
        Ok(())
    }

    /// Remove an attribute carried by a node.
    #[doc(alias = "xmlUnsetNsProp")]
    pub fn unset_ns_prop(
        &mut self,
        node: XmlNodeId,
        ns: Option<XmlNsId>,
        name: &str,
    ) -> Result<(), XmlParserErrors> {
        let href = ns.and_then(|ns| self.ns(ns)).map(|ns| ns.href().to_owned());
        let prop = self
            .has_ns_prop_internal(node, name, href.as_deref())
            .ok_or(XmlParserErrors::XmlErrNotFound)?;
        self.free_prop(prop);
        Ok(())
    }

    /// Unlink and free one attribute, all the content is freed too.
    ///
    /// # Note
    /// This doesn't work for namespace definition attributes.
    #[doc(alias = "xmlRemoveProp")]
    pub fn remove_prop(&mut self, attr: XmlNodeId) -> Result<(), XmlParserErrors> {
        if self.element_type(attr) != XmlElementType::XmlAttributeNode {
            return Err(xml_tree_err(
                XmlParserErrors::XmlErrArgument,
                Some(attr),
                "only attributes can be removed as properties",
            ));
        }
        self.free_prop(attr);
        Ok(())
    }

    /// Free one attribute, all the content is freed too.
    /// A registered ID is removed from the document index.
    #[doc(alias = "xmlFreeProp")]
    pub fn free_prop(&mut self, attr: XmlNodeId) {
        if self.element_type(attr) != XmlElementType::XmlAttributeNode {
            return;
        }
        self.unlink(attr);
        self.release_subtree(attr);
    }

    /// Free a property and all its siblings, all the children are freed too.
    #[doc(alias = "xmlFreePropList")]
    pub fn free_prop_list(&mut self, head: XmlNodeId) {
        let list = self.siblings(Some(head)).collect::<Vec<_>>();
        for attr in list {
            self.free_prop(attr);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_get_properties() {
        let mut tree = XmlTree::new();
        let e = tree.new_node(None, "e").unwrap();
        let a = tree.set_prop(e, "a", Some("1 & 2")).unwrap();
        assert_eq!(tree.get_prop(e, "a").as_deref(), Some("1 & 2"));
        assert_eq!(tree.set_prop(e, "a", Some("3")).unwrap(), a);
        assert_eq!(tree.get_prop(e, "a").as_deref(), Some("3"));
        assert_eq!(tree.attributes(e).count(), 1);

        let ns = tree.new_ns(Some(e), "urn:p", Some("p")).unwrap();
        let pa = tree.set_prop(e, "p:a", Some("ns")).unwrap();
        assert_ne!(pa, a);
        assert_eq!(tree.get(pa).unwrap().ns(), Some(ns));
        assert_eq!(tree.get_ns_prop(e, "a", Some("urn:p")).as_deref(), Some("ns"));
        assert_eq!(tree.get_no_ns_prop(e, "a").as_deref(), Some("3"));
        assert_eq!(tree.has_ns_prop(e, "a", Some("urn:p")), Some(pa));
        assert_eq!(tree.has_ns_prop(e, "a", Some("urn:q")), None);

        let t = tree.new_text("t");
        assert_eq!(
            tree.set_prop(t, "a", None),
            Err(XmlParserErrors::XmlTreeWrongParent)
        );
    }

    #[test]
    fn doc_prop_parses_references() {
        let mut tree = XmlTree::new();
        let doc = tree.new_doc(None);
        let attr = tree.new_doc_prop(Some(doc), "a", Some("x&amp;y&#x41;")).unwrap();
        assert_eq!(tree.get_content(attr).as_deref(), Some("x&yA"));
        assert!(tree.parent(attr).is_none());
        assert!(tree.new_doc_prop(Some(doc), "a", Some("&broken")).is_err());
    }

    #[test]
    fn attr_value_distinguishes_missing() {
        let mut tree = XmlTree::new();
        let e = tree.new_node(None, "e").unwrap();
        tree.new_prop(Some(e), "empty", None).unwrap();
        assert_eq!(tree.node_get_attr_value(e, "empty", None), Ok(Some(String::new())));
        assert_eq!(tree.node_get_attr_value(e, "missing", None), Ok(None));
        let c = tree.new_comment("c");
        assert!(tree.node_get_attr_value(c, "a", None).is_err());
    }

    #[test]
    fn unset_and_remove() {
        let mut tree = XmlTree::new();
        let e = tree.new_node(None, "e").unwrap();
        tree.set_prop(e, "a", Some("1")).unwrap();
        let b = tree.set_prop(e, "b", Some("2")).unwrap();
        tree.unset_prop(e, "a").unwrap();
        assert_eq!(tree.unset_prop(e, "a"), Err(XmlParserErrors::XmlErrNotFound));
        assert_eq!(tree.get(e).unwrap().properties(), Some(b));
        tree.remove_prop(b).unwrap();
        assert!(!tree.contains(b));
        assert!(tree.get(e).unwrap().properties().is_none());
    }

    #[test]
    fn adding_an_attribute_replaces_its_namesake() {
        let mut tree = XmlTree::new();
        let e = tree.new_node(None, "e").unwrap();
        let old = tree.set_prop(e, "a", Some("old")).unwrap();
        let new = tree.new_prop(None, "a", Some("new")).unwrap();
        tree.add_child(e, new).unwrap();
        assert!(!tree.contains(old));
        assert_eq!(tree.get_prop(e, "a").as_deref(), Some("new"));
    }
}
