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

use std::{any::Any, num::NonZeroU32, rc::Rc};

use crate::error::{XmlParserErrors, xml_tree_err};

use super::{XML_XML_NAMESPACE, XmlElementType, XmlNodeId, XmlTree};

/// A handle to a namespace declaration stored in an [`XmlTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct XmlNsId {
    index: NonZeroU32,
    generation: u32,
}

impl XmlNsId {
    pub(crate) fn new(index: NonZeroU32, generation: u32) -> Self {
        Self { index, generation }
    }

    pub(crate) fn slot(self) -> usize {
        self.index.get() as usize - 1
    }

    pub(crate) fn index(self) -> NonZeroU32 {
        self.index
    }

    pub(crate) fn generation(self) -> u32 {
        self.generation
    }
}

/// An XML namespace.
///
/// Note that prefix == `None` is valid, it defines the default namespace
/// within the subtree (until overridden).
#[derive(Debug, Clone)]
pub struct XmlNs {
    pub(crate) next: Option<XmlNsId>,
    pub(crate) typ: XmlElementType,
    pub(crate) href: Rc<str>,
    pub(crate) prefix: Option<Rc<str>>,
    pub(crate) private: Option<Rc<dyn Any>>,
    // the document holding the declaration, if any
    pub(crate) context: Option<XmlNodeId>,
}

impl XmlNs {
    fn new(href: &str, prefix: Option<&str>) -> Self {
        Self {
            next: None,
            typ: XmlElementType::XmlNamespaceDecl,
            href: Rc::from(href),
            prefix: prefix.map(Rc::from),
            private: None,
            context: None,
        }
    }

    pub fn href(&self) -> &str {
        &self.href
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn next(&self) -> Option<XmlNsId> {
        self.next
    }

    pub fn context(&self) -> Option<XmlNodeId> {
        self.context
    }

    pub fn private(&self) -> Option<&Rc<dyn Any>> {
        self.private.as_ref()
    }
}

/// A namespace declaration seen as a node, as the XPath data model requires.
///
/// The view pairs the declaration with the element it is attached to.
/// It is a read only view; the declaration is never part of the node arena.
#[derive(Debug, Clone, Copy)]
pub struct XmlNsNodeView<'a> {
    tree: &'a XmlTree,
    ns: XmlNsId,
    parent: Option<XmlNodeId>,
}

impl XmlNsNodeView<'_> {
    pub fn element_type(&self) -> XmlElementType {
        XmlElementType::XmlNamespaceDecl
    }

    /// The prefix, as XPath names a namespace node.
    pub fn name(&self) -> Option<&str> {
        self.tree.ns(self.ns)?.prefix()
    }

    /// The namespace URI, the string value of a namespace node.
    pub fn content(&self) -> Option<&str> {
        self.tree.ns(self.ns).map(|ns| ns.href())
    }

    pub fn parent(&self) -> Option<XmlNodeId> {
        self.parent
    }

    pub fn ns(&self) -> XmlNsId {
        self.ns
    }
}

/// Iterator over a chain of namespace declarations.
pub struct NsList<'a> {
    tree: &'a XmlTree,
    cur: Option<XmlNsId>,
}

impl Iterator for NsList<'_> {
    type Item = XmlNsId;

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.cur?;
        self.cur = self.tree.ns(cur).and_then(|ns| ns.next);
        Some(cur)
    }
}

impl XmlTree {
    /// Iterate a namespace chain starting at `head`.
    pub fn ns_list(&self, head: Option<XmlNsId>) -> NsList<'_> {
        NsList {
            tree: self,
            cur: head,
        }
    }

    /// Iterate the namespaces declared on `node`.
    pub fn ns_defs(&self, node: XmlNodeId) -> NsList<'_> {
        self.ns_list(self.get(node).and_then(|n| n.ns_def()))
    }

    /// View a namespace declaration held by `parent` as an XPath namespace node.
    pub fn ns_node_view(&self, ns: XmlNsId, parent: Option<XmlNodeId>) -> XmlNsNodeView<'_> {
        XmlNsNodeView {
            tree: self,
            ns,
            parent,
        }
    }

    fn ns_prefix_eq(&self, ns: XmlNsId, prefix: Option<&str>) -> bool {
        self.ns(ns).is_some_and(|ns| ns.prefix() == prefix)
    }

    fn ns_href_eq(&self, ns: XmlNsId, href: &str) -> bool {
        self.ns(ns).is_some_and(|ns| ns.href() == href)
    }

    /// Creation of a new Namespace. This function will refuse to create
    /// a namespace with a similar prefix than an existing one present on this node.
    /// Note that for a default namespace, `prefix` should be `None`.
    ///
    /// We use href == "" for a namespace created from an unbound prefix.
    ///
    /// Returns `None` if `node` is not an element, if `prefix` is `xml` or if the
    /// prefix is already declared on `node`.
    #[doc(alias = "xmlNewNs")]
    pub fn new_ns(
        &mut self,
        node: Option<XmlNodeId>,
        href: &str,
        prefix: Option<&str>,
    ) -> Option<XmlNsId> {
        if node.is_some_and(|node| self.element_type(node) != XmlElementType::XmlElementNode) {
            return None;
        }
        // the xml prefix is predefined and cannot be rebound
        if prefix == Some("xml") {
            return None;
        }
        let Some(node) = node else {
            return Some(self.alloc_ns(XmlNs::new(href, prefix)));
        };
        let mut last = None;
        for def in self.ns_defs(node) {
            if self.ns_prefix_eq(def, prefix) {
                return None;
            }
            last = Some(def);
        }
        let mut ns = XmlNs::new(href, prefix);
        ns.context = self.document(node);
        let id = self.alloc_ns(ns);
        match last {
            Some(last) => {
                if let Some(last) = self.ns_mut(last) {
                    last.next = Some(id);
                }
            }
            None => {
                if let Some(fields) = self.get_mut(node).and_then(|n| n.as_node_fields_mut()) {
                    fields.ns_def = Some(id);
                }
            }
        }
        Some(id)
    }

    /// Free up the structures associated to a namespace.
    #[doc(alias = "xmlFreeNs")]
    pub fn free_ns(&mut self, ns: XmlNsId) {
        self.release_ns(ns);
    }

    /// Free up all the structures associated to the chained namespaces.
    #[doc(alias = "xmlFreeNsList")]
    pub fn free_ns_list(&mut self, head: XmlNsId) {
        let list = self.ns_list(Some(head)).collect::<Vec<_>>();
        for ns in list {
            self.release_ns(ns);
        }
    }

    /// Do a copy of the namespace. The copy is not attached to any node.
    #[doc(alias = "xmlCopyNamespace")]
    pub fn copy_namespace(&mut self, ns: XmlNsId) -> Option<XmlNsId> {
        let (href, prefix) = {
            let ns = self.ns(ns)?;
            (ns.href.clone(), ns.prefix.clone())
        };
        let mut copy = XmlNs::new("", None);
        copy.href = href;
        copy.prefix = prefix;
        Some(self.alloc_ns(copy))
    }

    /// Do a copy of a namespace list.
    #[doc(alias = "xmlCopyNamespaceList")]
    pub fn copy_namespace_list(&mut self, head: XmlNsId) -> Option<XmlNsId> {
        let list = self.ns_list(Some(head)).collect::<Vec<_>>();
        let mut first = None;
        let mut last: Option<XmlNsId> = None;
        for ns in list {
            let copy = self.copy_namespace(ns)?;
            match last {
                Some(last) => {
                    if let Some(last) = self.ns_mut(last) {
                        last.next = Some(copy);
                    }
                }
                None => first = Some(copy),
            }
            last = Some(copy);
        }
        first
    }

    /// Ensures that there is an XML namespace declaration on the doc.
    ///
    /// Returns the XML namespace.
    #[doc(alias = "xmlTreeEnsureXMLDecl")]
    pub(crate) fn ensure_xmldecl(&mut self, doc: XmlNodeId) -> Option<XmlNsId> {
        if let Some(ns) = self.doc(doc)?.old_ns {
            return Some(ns);
        }
        let mut ns = XmlNs::new(XML_XML_NAMESPACE, Some("xml"));
        ns.context = Some(doc);
        let id = self.alloc_ns(ns);
        if let Some(doc) = self.doc_mut(doc) {
            doc.old_ns = Some(id);
        }
        Some(id)
    }

    /// The xml namespace for `node` when it has no document:
    /// the declaration is held by the element itself.
    fn xml_ns_on_node(&mut self, node: XmlNodeId) -> Option<XmlNsId> {
        if let Some(found) = self
            .ns_defs(node)
            .find(|&ns| self.ns_prefix_eq(ns, Some("xml")))
        {
            return Some(found);
        }
        let mut ns = XmlNs::new(XML_XML_NAMESPACE, Some("xml"));
        ns.next = self.get(node).and_then(|n| n.ns_def());
        let id = self.alloc_ns(ns);
        if let Some(fields) = self.get_mut(node).and_then(|n| n.as_node_fields_mut()) {
            fields.ns_def = Some(id);
        }
        Some(id)
    }

    fn xml_ns_for(&mut self, doc: Option<XmlNodeId>, node: XmlNodeId) -> Option<XmlNsId> {
        let doc = doc.or_else(|| self.document(node));
        match doc.filter(|&doc| self.doc(doc).is_some()) {
            Some(doc) => self.ensure_xmldecl(doc),
            None if self.element_type(node) == XmlElementType::XmlElementNode => {
                self.xml_ns_on_node(node)
            }
            None => None,
        }
    }

    /// Search a Ns registered under a given name space for a document.
    /// recurse on the parents until it finds the defined namespace or return `None` otherwise.
    ///
    /// `prefix` can be `None`, this is a search for the default namespace.
    /// The `xml` prefix always resolves, creating its declaration when needed.
    #[doc(alias = "xmlSearchNs")]
    pub fn search_ns(
        &mut self,
        doc: Option<XmlNodeId>,
        node: Option<XmlNodeId>,
        prefix: Option<&str>,
    ) -> Option<XmlNsId> {
        let node = node.filter(|&node| self.contains(node))?;
        if prefix == Some("xml") {
            return self.xml_ns_for(doc, node);
        }
        self.lookup_ns_by_prefix(node, prefix)
    }

    /// Same as [`XmlTree::search_ns`] without the `xml` prefix special case, read only.
    pub(crate) fn lookup_ns_by_prefix(
        &self,
        node: XmlNodeId,
        prefix: Option<&str>,
    ) -> Option<XmlNsId> {
        let orig = node;
        let mut cur = Some(node);
        while let Some(now) = cur {
            match self.element_type(now) {
                XmlElementType::XmlEntityRefNode
                | XmlElementType::XmlEntityNode
                | XmlElementType::XmlEntityDecl => return None,
                XmlElementType::XmlElementNode => {
                    if let Some(found) = self
                        .ns_defs(now)
                        .find(|&ns| self.ns_prefix_eq(ns, prefix))
                    {
                        return Some(found);
                    }
                    if now != orig {
                        if let Some(ns) = self
                            .get(now)
                            .and_then(|n| n.ns())
                            .filter(|&ns| self.ns_prefix_eq(ns, prefix))
                        {
                            return Some(ns);
                        }
                    }
                }
                _ => {}
            }
            cur = self.parent(now);
        }
        None
    }

    /// Verify that the given namespace held on `ancestor` is still in scope on `node`.
    #[doc(alias = "xmlNsInScope")]
    fn ns_in_scope(&self, node: XmlNodeId, ancestor: XmlNodeId, prefix: Option<&str>) -> bool {
        let mut cur = Some(node);
        while let Some(now) = cur {
            if now == ancestor {
                return true;
            }
            match self.element_type(now) {
                XmlElementType::XmlEntityRefNode
                | XmlElementType::XmlEntityNode
                | XmlElementType::XmlEntityDecl => return false,
                XmlElementType::XmlElementNode => {
                    if self.ns_defs(now).any(|ns| self.ns_prefix_eq(ns, prefix)) {
                        return false;
                    }
                }
                _ => {}
            }
            cur = self.parent(now);
        }
        false
    }

    /// Search a Ns aliasing a given URI.
    /// Recurse on the parents until it finds the defined namespace or return `None` otherwise.
    ///
    /// A declaration shadowed by a closer one with the same prefix is skipped.
    /// Attributes never resolve to a default namespace.
    #[doc(alias = "xmlSearchNsByHref")]
    pub fn search_ns_by_href(
        &mut self,
        doc: Option<XmlNodeId>,
        node: Option<XmlNodeId>,
        href: &str,
    ) -> Option<XmlNsId> {
        let node = node.filter(|&node| self.contains(node))?;
        if href == XML_XML_NAMESPACE {
            return self.xml_ns_for(doc, node);
        }
        self.lookup_ns_by_href(node, href)
    }

    pub(crate) fn lookup_ns_by_href(&self, node: XmlNodeId, href: &str) -> Option<XmlNsId> {
        let orig = node;
        let is_attr = self.element_type(node) == XmlElementType::XmlAttributeNode;
        let usable = |ns: XmlNsId, holder: XmlNodeId| {
            let prefix = self.ns(ns).and_then(|ns| ns.prefix());
            self.ns_href_eq(ns, href)
                && (!is_attr || prefix.is_some())
                && self.ns_in_scope(orig, holder, prefix)
        };
        let mut cur = Some(node);
        while let Some(now) = cur {
            match self.element_type(now) {
                XmlElementType::XmlEntityRefNode
                | XmlElementType::XmlEntityNode
                | XmlElementType::XmlEntityDecl => return None,
                XmlElementType::XmlElementNode => {
                    if let Some(found) = self.ns_defs(now).find(|&ns| usable(ns, now)) {
                        return Some(found);
                    }
                    if now != orig {
                        if let Some(ns) = self
                            .get(now)
                            .and_then(|n| n.ns())
                            .filter(|&ns| usable(ns, now))
                        {
                            return Some(ns);
                        }
                    }
                }
                _ => {}
            }
            cur = self.parent(now);
        }
        None
    }

    /// Search all the namespace applying to a given element.
    ///
    /// Returns `None` if no namespace is in scope.
    #[doc(alias = "xmlGetNsList")]
    pub fn get_ns_list(&self, node: XmlNodeId) -> Option<Vec<XmlNsId>> {
        self.get_ns_list_safe(node).ok().flatten()
    }

    /// Search all the namespace applying to a given element.
    ///
    /// Returns `Ok(None)` if no namespace is in scope, or `Err` if `node` is invalid.
    #[doc(alias = "xmlGetNsListSafe")]
    pub fn get_ns_list_safe(&self, node: XmlNodeId) -> Result<Option<Vec<XmlNsId>>, XmlParserErrors> {
        if !self.contains(node) {
            return Err(xml_tree_err(
                XmlParserErrors::XmlErrArgument,
                None,
                "namespace list of an invalid node",
            ));
        }
        let mut ret: Vec<XmlNsId> = vec![];
        let mut cur = Some(node);
        while let Some(now) = cur {
            if self.element_type(now) == XmlElementType::XmlElementNode {
                for ns in self.ns_defs(now) {
                    let prefix = self.ns(ns).and_then(|ns| ns.prefix());
                    if !ret.iter().any(|&seen| self.ns_prefix_eq(seen, prefix)) {
                        ret.push(ns);
                    }
                }
            }
            cur = self.parent(now);
        }
        Ok((!ret.is_empty()).then_some(ret))
    }

    /// Associate a namespace to a node, a posteriori.
    ///
    /// The caller is responsible for `ns` being in scope.
    #[doc(alias = "xmlSetNs")]
    pub fn set_ns(&mut self, node: XmlNodeId, ns: Option<XmlNsId>) {
        let Some(n) = self.get_mut(node) else {
            return;
        };
        match n.element_type() {
            XmlElementType::XmlElementNode => {
                if let Some(fields) = n.as_node_fields_mut() {
                    fields.ns = ns;
                }
            }
            XmlElementType::XmlAttributeNode => {
                if let Some(attr) = n.as_attr_mut() {
                    attr.ns = ns;
                }
            }
            _ => {}
        }
    }

    /// This function tries to locate a namespace definition in a tree ancestors,
    /// or create a new namespace definition node similar to `ns` trying to
    /// reuse the same prefix. However if the given prefix is null (default namespace)
    /// or reused within the subtree defined by `tree` or on one of its ancestors
    /// then a new prefix is generated.
    ///
    /// Returns the (new) namespace definition or `None` in case of error.
    #[doc(alias = "xmlNewReconciledNs")]
    pub fn new_reconciled_ns(
        &mut self,
        doc: Option<XmlNodeId>,
        tree: XmlNodeId,
        ns: XmlNsId,
    ) -> Option<XmlNsId> {
        if self.element_type(tree) != XmlElementType::XmlElementNode {
            return None;
        }
        let (href, prefix) = {
            let ns = self.ns(ns)?;
            (ns.href.clone(), ns.prefix.clone())
        };
        // Search an existing namespace definition inherited.
        if let Some(def) = self.search_ns_by_href(doc, Some(tree), &href) {
            return Some(def);
        }
        // Find a close prefix which is not already in use.
        let base = prefix
            .as_deref()
            .unwrap_or("default")
            .chars()
            .take(20)
            .collect::<String>();
        let mut candidate = base.clone();
        let mut counter = 1;
        while self.search_ns(doc, Some(tree), Some(&candidate)).is_some() {
            if counter > 1000 {
                return None;
            }
            candidate = format!("{base}{counter}");
            counter += 1;
        }
        self.new_ns(Some(tree), &href, Some(&candidate))
    }

    /// This function checks that all the namespaces declared within the given
    /// tree are properly declared. This is needed for example after Copy or Cut
    /// and then paste operations. The subtree may still hold pointers to
    /// namespace declarations outside the subtree or invalid/masked. As much
    /// as possible the function try to reuse the existing namespaces found in
    /// the new environment. If not possible the new namespaces are redeclared
    /// on `tree` at the top of the given subtree.
    #[doc(alias = "xmlReconciliateNs")]
    pub fn reconciliate_ns(
        &mut self,
        doc: Option<XmlNodeId>,
        tree: XmlNodeId,
    ) -> Result<(), XmlParserErrors> {
        if self.element_type(tree) != XmlElementType::XmlElementNode {
            return Err(xml_tree_err(
                XmlParserErrors::XmlErrArgument,
                Some(tree),
                "namespaces can only be reconciled on an element",
            ));
        }
        let mut cache: Vec<(XmlNsId, XmlNsId)> = vec![];
        let elements = self
            .descendants(tree)
            .filter(|&n| self.element_type(n) == XmlElementType::XmlElementNode)
            .collect::<Vec<_>>();
        let mut failed = false;
        for elem in elements {
            let attrs = self
                .siblings(self.get(elem).and_then(|n| n.properties()))
                .collect::<Vec<_>>();
            for node in std::iter::once(elem).chain(attrs) {
                let Some(old) = self.get(node).and_then(|n| n.ns()) else {
                    continue;
                };
                if let Some(&(_, new)) = cache.iter().find(|(o, _)| *o == old) {
                    self.set_ns(node, Some(new));
                    continue;
                }
                let Some(href) = self.ns(old).map(|ns| ns.href.clone()) else {
                    continue;
                };
                let found = self
                    .search_ns_by_href(doc, Some(node), &href)
                    .or_else(|| self.new_reconciled_ns(doc, tree, old));
                match found {
                    Some(new) => {
                        cache.push((old, new));
                        self.set_ns(node, Some(new));
                    }
                    None => failed = true,
                }
            }
        }
        if failed {
            Err(XmlParserErrors::XmlTreeNamespaceConflict)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_prefixes_are_refused() {
        let mut tree = XmlTree::new();
        let e = tree.new_node(None, "e").unwrap();
        let a = tree.new_ns(Some(e), "urn:a", Some("a")).unwrap();
        assert!(tree.new_ns(Some(e), "urn:b", Some("a")).is_none());
        assert!(tree.new_ns(Some(e), XML_XML_NAMESPACE, Some("xml")).is_none());
        let d = tree.new_ns(Some(e), "urn:d", None).unwrap();
        assert!(tree.new_ns(Some(e), "urn:x", None).is_none());
        assert_eq!(tree.ns_defs(e).collect::<Vec<_>>(), vec![a, d]);
        let t = tree.new_text("t");
        assert!(tree.new_ns(Some(t), "urn:a", Some("b")).is_none());
    }

    #[test]
    fn search_walks_ancestors() {
        let mut tree = XmlTree::new();
        let doc = tree.new_doc(None);
        let root = tree.new_doc_node(Some(doc), None, "r", None).unwrap();
        tree.set_root_element(doc, root).unwrap();
        let p = tree.new_ns(Some(root), "urn:p", Some("p")).unwrap();
        let child = tree.new_child(root, None, "c", None).unwrap();
        let inner = tree.new_child(child, None, "i", None).unwrap();

        assert_eq!(tree.search_ns(Some(doc), Some(inner), Some("p")), Some(p));
        assert_eq!(tree.search_ns(Some(doc), Some(inner), Some("q")), None);
        assert_eq!(tree.search_ns_by_href(Some(doc), Some(inner), "urn:p"), Some(p));

        let xml = tree.search_ns(Some(doc), Some(inner), Some("xml")).unwrap();
        assert_eq!(tree.ns(xml).unwrap().href(), XML_XML_NAMESPACE);
        assert_eq!(tree.doc(doc).unwrap().old_ns(), Some(xml));

        // a closer declaration of `p` masks the outer one
        tree.new_ns(Some(child), "urn:other", Some("p")).unwrap();
        assert_eq!(tree.search_ns_by_href(Some(doc), Some(inner), "urn:p"), None);
    }

    #[test]
    fn ns_list_keeps_closest_prefixes() {
        let mut tree = XmlTree::new();
        let root = tree.new_node(None, "r").unwrap();
        tree.new_ns(Some(root), "urn:a", Some("a")).unwrap();
        let b = tree.new_ns(Some(root), "urn:b", Some("b")).unwrap();
        let child = tree.new_node(None, "c").unwrap();
        tree.add_child(root, child).unwrap();
        let a2 = tree.new_ns(Some(child), "urn:a2", Some("a")).unwrap();
        assert_eq!(tree.get_ns_list(child), Some(vec![a2, b]));
        let lone = tree.new_node(None, "l").unwrap();
        assert_eq!(tree.get_ns_list_safe(lone), Ok(None));
        tree.free_node(lone);
        assert!(tree.get_ns_list_safe(lone).is_err());
    }

    #[test]
    fn reconciliation_declares_missing_namespaces() {
        let mut tree = XmlTree::new();
        let doc = tree.new_doc(None);
        let src = tree.new_node(None, "src").unwrap();
        let foreign = tree.new_ns(Some(src), "urn:f", Some("f")).unwrap();
        let default = tree.new_ns(Some(src), "urn:d", None).unwrap();

        let root = tree.new_doc_node(Some(doc), None, "root", None).unwrap();
        tree.set_root_element(doc, root).unwrap();
        let taken = tree.new_ns(Some(root), "urn:other", Some("f")).unwrap();
        let moved = tree.new_node(Some(foreign), "m").unwrap();
        let inner = tree.new_node(Some(default), "i").unwrap();
        tree.add_child(moved, inner).unwrap();
        tree.add_child(root, moved).unwrap();

        tree.reconciliate_ns(Some(doc), moved).unwrap();
        let ns = tree.get(moved).unwrap().ns().unwrap();
        assert_ne!(ns, taken);
        assert_eq!(tree.ns(ns).unwrap().href(), "urn:f");
        assert_eq!(tree.ns(ns).unwrap().prefix(), Some("f1"));
        let ns = tree.get(inner).unwrap().ns().unwrap();
        assert_eq!(tree.ns(ns).unwrap().href(), "urn:d");
        assert_eq!(tree.ns(ns).unwrap().prefix(), Some("default"));
        assert!(tree.ns_defs(moved).any(|d| d == ns));
    }

    #[test]
    fn namespace_node_view() {
        let mut tree = XmlTree::new();
        let e = tree.new_node(None, "e").unwrap();
        let ns = tree.new_ns(Some(e), "urn:a", Some("a")).unwrap();
        let view = tree.ns_node_view(ns, Some(e));
        assert_eq!(view.element_type(), XmlElementType::XmlNamespaceDecl);
        assert_eq!(view.name(), Some("a"));
        assert_eq!(view.content(), Some("urn:a"));
        assert_eq!(view.parent(), Some(e));
    }
}
