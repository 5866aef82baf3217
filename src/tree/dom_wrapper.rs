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

use std::collections::{HashMap, HashSet};

use crate::error::{XmlParserErrors, xml_tree_err};

use super::{XmlElementType, XmlNodeFields, XmlNodeId, XmlNsId, XmlTree};

/// Remove redundant namespace declarations while reconciling.
pub const XML_DOM_RECONNS_REMOVEREDUND: i32 = 1 << 0;
/// Register ID attributes of a clone in the destination document.
pub const XML_DOM_CLONE_IDS: i32 = 1 << 1;

/// Acquire a namespace declaration for a node moved into another tree.
///
/// `node` is the element or attribute whose reference has to be rebound,
/// `ns_name` and `ns_prefix` describe the declaration it referenced before.
#[doc(alias = "xmlDOMWrapAcquireNsFunction")]
pub trait XmlDOMWrapAcquireNs {
    /// The provided implementation declares the namespace on the element
    /// itself (the owner element for an attribute). If the prefix is taken
    /// there, `{prefix}_{n}` or `ns_{n}` is used instead.
    fn acquire_ns(
        &mut self,
        tree: &mut XmlTree,
        node: XmlNodeId,
        ns_name: &str,
        ns_prefix: Option<&str>,
    ) -> Option<XmlNsId> {
        let elem = match tree.element_type(node) {
            XmlElementType::XmlAttributeNode => tree.parent(node)?,
            _ => node,
        };
        tree.declare_ns_forced(elem, ns_name, ns_prefix)
    }
}

/// The acquisition used when a context carries no custom one.
#[derive(Debug, Default, Clone, Copy)]
pub struct XmlDOMWrapDefaultAcquire;

impl XmlDOMWrapAcquireNs for XmlDOMWrapDefaultAcquire {}

impl<F> XmlDOMWrapAcquireNs for F
where
    F: FnMut(&mut XmlTree, XmlNodeId, &str, Option<&str>) -> Option<XmlNsId>,
{
    fn acquire_ns(
        &mut self,
        tree: &mut XmlTree,
        node: XmlNodeId,
        ns_name: &str,
        ns_prefix: Option<&str>,
    ) -> Option<XmlNsId> {
        self(tree, node, ns_name, ns_prefix)
    }
}

/// Context for DOM wrapper-operations.
#[derive(Default)]
pub struct XmlDOMWrapCtxt {
    /// Acquires a namespace for `node.ns`, never for `ns_def`.
    get_ns_for_node_func: Option<Box<dyn XmlDOMWrapAcquireNs>>,
    /// Old declaration to the one replacing it, for the current operation.
    namespace_map: HashMap<XmlNsId, XmlNsId>,
}

impl XmlDOMWrapCtxt {
    #[doc(alias = "xmlDOMWrapNewCtxt")]
    pub fn new() -> Self {
        Self::default()
    }

    /// A context rebinding out of scope namespaces through `acquire`.
    pub fn with_acquire_ns(acquire: impl XmlDOMWrapAcquireNs + 'static) -> Self {
        Self {
            get_ns_for_node_func: Some(Box::new(acquire)),
            namespace_map: HashMap::new(),
        }
    }

    pub fn has_acquire_ns(&self) -> bool {
        self.get_ns_for_node_func.is_some()
    }
}

impl std::fmt::Debug for XmlDOMWrapCtxt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XmlDOMWrapCtxt")
            .field("get_ns_for_node_func", &self.get_ns_for_node_func.is_some())
            .field("namespace_map", &self.namespace_map)
            .finish()
    }
}

/// Where in-scope declarations are searched while rebinding a branch.
#[derive(Clone, Copy)]
struct Scope {
    branch: XmlNodeId,
    // searched once the walk leaves the branch
    outer: Option<XmlNodeId>,
}

impl XmlTree {
    /// The element owning the references of `node`.
    fn owner_element(&self, node: XmlNodeId) -> Option<XmlNodeId> {
        match self.element_type(node) {
            XmlElementType::XmlElementNode => Some(node),
            XmlElementType::XmlAttributeNode => self
                .parent(node)
                .filter(|&p| self.element_type(p) == XmlElementType::XmlElementNode),
            _ => None,
        }
    }

    /// Walk the elements from `start` to the top of `scope`, then on from
    /// `scope.outer`.
    fn scope_elements(&self, start: Option<XmlNodeId>, scope: Scope) -> Vec<XmlNodeId> {
        let mut elems = vec![];
        let mut cur = start;
        let mut left_branch = false;
        while let Some(now) = cur {
            if self.element_type(now) == XmlElementType::XmlElementNode {
                elems.push(now);
            } else if !matches!(
                self.element_type(now),
                XmlElementType::XmlDocumentFragNode | XmlElementType::XmlAttributeNode
            ) {
                break;
            }
            cur = if now == scope.branch && !left_branch {
                left_branch = true;
                scope.outer
            } else {
                self.parent(now)
            };
        }
        elems
    }

    /// The declaration `prefix` resolves to from `start`, only looking at
    /// declarations held by elements.
    fn scope_lookup_prefix(
        &self,
        start: Option<XmlNodeId>,
        scope: Scope,
        prefix: Option<&str>,
    ) -> Option<XmlNsId> {
        self.scope_elements(start, scope)
            .into_iter()
            .flat_map(|elem| self.ns_defs(elem).collect::<Vec<_>>())
            .find(|&ns| self.ns(ns).is_some_and(|ns| ns.prefix() == prefix))
    }

    /// An unshadowed in-scope declaration of `href`.
    ///
    /// Empty names never match. If `prefixed`, default declarations are skipped.
    fn scope_lookup_href(
        &self,
        start: Option<XmlNodeId>,
        scope: Scope,
        href: &str,
        prefixed: bool,
    ) -> Option<XmlNsId> {
        if href.is_empty() {
            return None;
        }
        let mut seen = HashSet::new();
        for elem in self.scope_elements(start, scope) {
            for ns in self.ns_defs(elem).collect::<Vec<_>>() {
                let Some(decl) = self.ns(ns) else {
                    continue;
                };
                let prefix = decl.prefix().map(str::to_owned);
                if !seen.insert(prefix.clone()) {
                    continue;
                }
                if decl.href() == href && (!prefixed || prefix.is_some()) {
                    return Some(ns);
                }
            }
        }
        None
    }

    /// Declare `ns_name` on `elem`, trying `prefix` first and inventing
    /// another prefix if `elem` already declares it.
    #[doc(alias = "xmlDOMWrapNSNormDeclareNsForced")]
    pub(crate) fn declare_ns_forced(
        &mut self,
        elem: XmlNodeId,
        ns_name: &str,
        prefix: Option<&str>,
    ) -> Option<XmlNsId> {
        if self.element_type(elem) != XmlElementType::XmlElementNode {
            return None;
        }
        let mut candidate = prefix.map(str::to_owned);
        for counter in 1..=1000 {
            let taken = self
                .ns_defs(elem)
                .any(|ns| self.ns(ns).is_some_and(|ns| ns.prefix() == candidate.as_deref()));
            if !taken && candidate.as_deref() != Some("xml") {
                return self.new_ns(Some(elem), ns_name, candidate.as_deref());
            }
            candidate = Some(match prefix {
                Some(prefix) => format!("{prefix}_{counter}"),
                None => format!("ns_{counter}"),
            });
        }
        None
    }

    /// Store a declaration in the document's `old_ns` list, reusing an
    /// equal one.
    #[doc(alias = "xmlDOMWrapStoreNs")]
    fn store_ns(&mut self, doc: XmlNodeId, ns_name: &str, prefix: Option<&str>) -> Option<XmlNsId> {
        let head = self.ensure_xmldecl(doc)?;
        let mut last = head;
        for ns in self.ns_list(Some(head)).collect::<Vec<_>>() {
            if self
                .ns(ns)
                .is_some_and(|n| n.prefix() == prefix && n.href() == ns_name)
            {
                return Some(ns);
            }
            last = ns;
        }
        let ns = self.new_ns(None, ns_name, prefix)?;
        if let Some(n) = self.ns_mut(ns) {
            n.context = Some(doc);
        }
        if let Some(last) = self.ns_mut(last) {
            last.next = Some(ns);
        }
        Some(ns)
    }

    /// Find or create a declaration for `ns` visible from `node`.
    fn acquire_normalized_ns(
        &mut self,
        ctxt: &mut XmlDOMWrapCtxt,
        doc: Option<XmlNodeId>,
        node: XmlNodeId,
        scope: Scope,
        ns: XmlNsId,
    ) -> Option<XmlNsId> {
        let (href, prefix) = {
            let decl = self.ns(ns)?;
            (decl.href().to_owned(), decl.prefix().map(str::to_owned))
        };
        if prefix.as_deref() == Some("xml") {
            return match doc {
                Some(doc) => self.ensure_xmldecl(doc),
                None => Some(ns),
            };
        }
        if let Some(&mapped) = ctxt.namespace_map.get(&ns) {
            let visible = self.ns(mapped).and_then(|m| m.prefix().map(str::to_owned));
            let start = self.owner_element(node);
            if self.scope_lookup_prefix(start, scope, visible.as_deref()) == Some(mapped) {
                return Some(mapped);
            }
        }
        let prefixed = self.element_type(node) == XmlElementType::XmlAttributeNode;
        let found = match ctxt.get_ns_for_node_func.as_mut() {
            Some(acquire) => acquire.acquire_ns(self, node, &href, prefix.as_deref()),
            None => {
                let start = self.owner_element(node);
                match self.scope_lookup_href(start, scope, &href, prefixed) {
                    Some(found) => Some(found),
                    None if start.is_none() => match doc {
                        Some(doc) => self.store_ns(doc, &href, prefix.as_deref()),
                        None => None,
                    },
                    None => XmlDOMWrapDefaultAcquire.acquire_ns(self, node, &href, prefix.as_deref()),
                }
            }
        };
        if let Some(found) = found {
            ctxt.namespace_map.insert(ns, found);
        }
        found
    }

    /// Elements and attributes of a branch, in document order.
    fn branch_nodes(&self, root: XmlNodeId) -> Vec<XmlNodeId> {
        let mut out = vec![];
        let mut stack = vec![root];
        while let Some(cur) = stack.pop() {
            out.push(cur);
            if self.element_type(cur) != XmlElementType::XmlElementNode {
                continue;
            }
            let props = self.attributes(cur).collect::<Vec<_>>();
            let children = self.siblings(self.children(cur)).collect::<Vec<_>>();
            stack.extend(children.into_iter().rev());
            stack.extend(props.into_iter().rev());
        }
        out
    }

    /// Rebind every namespace reference of the branch at `root` that does not
    /// resolve to a declaration in scope.
    fn rebind_branch_ns(
        &mut self,
        ctxt: &mut XmlDOMWrapCtxt,
        doc: Option<XmlNodeId>,
        root: XmlNodeId,
        scope: Scope,
    ) -> Result<(), XmlParserErrors> {
        for node in self.branch_nodes(root) {
            let typ = self.element_type(node);
            if !matches!(
                typ,
                XmlElementType::XmlElementNode | XmlElementType::XmlAttributeNode
            ) {
                continue;
            }
            let Some(ns) = self.get(node).and_then(|n| n.ns()) else {
                continue;
            };
            let Some(prefix) = self.ns(ns).map(|n| n.prefix().map(str::to_owned)) else {
                // a dangling reference is dropped
                self.set_node_ns(node, None);
                continue;
            };
            let start = self.owner_element(node);
            if prefix.as_deref() != Some("xml")
                && self.scope_lookup_prefix(start, scope, prefix.as_deref()) == Some(ns)
            {
                continue;
            }
            let Some(found) = self.acquire_normalized_ns(ctxt, doc, node, scope, ns) else {
                return Err(xml_tree_err(
                    XmlParserErrors::XmlErrNoMemory,
                    Some(node),
                    "failed to acquire a namespace declaration",
                ));
            };
            self.set_node_ns(node, Some(found));
        }
        Ok(())
    }

    fn set_node_ns(&mut self, node: XmlNodeId, ns: Option<XmlNsId>) {
        let Some(n) = self.get_mut(node) else {
            return;
        };
        if let Some(attr) = n.as_attr_mut() {
            attr.ns = ns;
        } else if let Some(fields) = n.as_node_fields_mut() {
            fields.ns = ns;
        }
    }

    /// Bind the entity references of a branch to the declarations of `doc`.
    fn rebind_entity_refs(&mut self, root: XmlNodeId, doc: XmlNodeId) {
        let refs = self
            .descendants(root)
            .filter(|&n| self.element_type(n) == XmlElementType::XmlEntityRefNode)
            .collect::<Vec<_>>();
        for node in refs {
            let entity = self.name(node).and_then(|name| self.get_doc_entity(doc, name));
            if let Some(fields) = self.get_mut(node).and_then(|n| n.as_node_fields_mut()) {
                fields.entity = entity;
            }
        }
    }

    /// Ensures that ns-references point to ns-decls held on element-nodes.
    ///
    /// Missing declarations are added to the element using them. With
    /// [`XML_DOM_RECONNS_REMOVEREDUND`], declarations repeating an equal
    /// declaration in scope are removed. Other option bits are ignored.
    #[doc(alias = "xmlDOMWrapReconcileNamespaces")]
    pub fn dom_wrap_reconcile_namespaces(
        &mut self,
        ctxt: Option<&mut XmlDOMWrapCtxt>,
        elem: XmlNodeId,
        options: i32,
    ) -> Result<(), XmlParserErrors> {
        if self.element_type(elem) != XmlElementType::XmlElementNode {
            return Err(xml_tree_err(
                XmlParserErrors::XmlErrArgument,
                Some(elem),
                "only elements can be reconciled",
            ));
        }
        let mut local = XmlDOMWrapCtxt::default();
        let ctxt = ctxt.unwrap_or(&mut local);
        ctxt.namespace_map.clear();
        let doc = self.document(elem);
        let scope = Scope {
            branch: elem,
            outer: self.parent(elem),
        };

        let mut removed = vec![];
        if options & XML_DOM_RECONNS_REMOVEREDUND != 0 {
            let elems = self
                .descendants(elem)
                .filter(|&n| self.element_type(n) == XmlElementType::XmlElementNode)
                .collect::<Vec<_>>();
            for cur in elems {
                for ns in self.ns_defs(cur).collect::<Vec<_>>() {
                    let Some((href, prefix)) = self
                        .ns(ns)
                        .map(|n| (n.href().to_owned(), n.prefix().map(str::to_owned)))
                    else {
                        continue;
                    };
                    let above = self.scope_lookup_prefix(self.parent(cur), scope, prefix.as_deref());
                    if let Some(above) = above.filter(|&a| self.ns(a).is_some_and(|a| a.href() == href)) {
                        self.unlink_ns_def(cur, ns);
                        ctxt.namespace_map.insert(ns, above);
                        removed.push(ns);
                    }
                }
            }
            // references to removed declarations move to the equal one above
            for node in self.branch_nodes(elem) {
                let Some(ns) = self.get(node).and_then(|n| n.ns()) else {
                    continue;
                };
                if let Some(&to) = ctxt.namespace_map.get(&ns) {
                    self.set_node_ns(node, Some(to));
                }
            }
        }

        let ret = self.rebind_branch_ns(ctxt, doc, elem, scope);
        for ns in removed {
            self.free_ns(ns);
        }
        ctxt.namespace_map.clear();
        ret
    }

    fn unlink_ns_def(&mut self, elem: XmlNodeId, ns: XmlNsId) {
        let next = self.ns(ns).and_then(|n| n.next());
        let head = self.get(elem).and_then(|n| n.ns_def());
        if head == Some(ns) {
            if let Some(fields) = self.get_mut(elem).and_then(|n| n.as_node_fields_mut()) {
                fields.ns_def = next;
            }
        } else {
            let prev = self.ns_list(head).find(|&cur| self.ns(cur).and_then(|c| c.next()) == Some(ns));
            if let Some(prev) = prev.and_then(|prev| self.ns_mut(prev)) {
                prev.next = next;
            }
        }
        if let Some(n) = self.ns_mut(ns) {
            n.next = None;
        }
    }

    /// References an adopted or cloned node set and `dest_parent` must agree on.
    fn check_dom_wrap_args(
        &self,
        source_doc: Option<XmlNodeId>,
        node: XmlNodeId,
        dest_doc: XmlNodeId,
        dest_parent: Option<XmlNodeId>,
    ) -> Result<Option<XmlNodeId>, XmlParserErrors> {
        if !self.contains(node)
            || self.doc(dest_doc).is_none()
            || dest_parent.is_some_and(|p| self.document(p) != Some(dest_doc))
        {
            return Err(xml_tree_err(
                XmlParserErrors::XmlErrArgument,
                Some(node),
                "invalid DOM wrapper arguments",
            ));
        }
        let node_doc = self.document(node);
        if let (Some(node_doc), Some(source_doc)) = (node_doc, source_doc) {
            if node_doc != source_doc {
                return Err(xml_tree_err(
                    XmlParserErrors::XmlErrArgument,
                    Some(node),
                    "node doesn't belong to the source document",
                ));
            }
        }
        Ok(source_doc.or(node_doc))
    }

    /// Moves `node` from `source_doc` into `dest_doc`.
    ///
    /// The node is unlinked unless it already is a child of `dest_parent`;
    /// it is not linked into `dest_parent`, which only contributes the
    /// declarations in scope there. Names are re-interned against the
    /// destination dictionary, IDs are dropped from the source index and
    /// namespace references leaving scope are rebound through the context.
    #[doc(alias = "xmlDOMWrapAdoptNode")]
    pub fn dom_wrap_adopt_node(
        &mut self,
        ctxt: Option<&mut XmlDOMWrapCtxt>,
        source_doc: Option<XmlNodeId>,
        node: XmlNodeId,
        dest_doc: XmlNodeId,
        dest_parent: Option<XmlNodeId>,
        _options: i32,
    ) -> Result<(), XmlParserErrors> {
        let source_doc = self.check_dom_wrap_args(source_doc, node, dest_doc, dest_parent)?;
        if source_doc == Some(dest_doc) {
            return Err(xml_tree_err(
                XmlParserErrors::XmlErrArgument,
                Some(node),
                "node already belongs to the destination document",
            ));
        }
        match self.element_type(node) {
            XmlElementType::XmlElementNode
            | XmlElementType::XmlAttributeNode
            | XmlElementType::XmlTextNode
            | XmlElementType::XmlCDATASectionNode
            | XmlElementType::XmlEntityRefNode
            | XmlElementType::XmlPINode
            | XmlElementType::XmlCommentNode => {}
            _ => {
                return Err(xml_tree_err(
                    XmlParserErrors::XmlErrUnsupportedFeature,
                    Some(node),
                    "node kind can't be adopted",
                ));
            }
        }
        if self.parent(node).is_some() && self.parent(node) != dest_parent {
            self.unlink(node);
        }
        self.set_tree_doc(node, Some(dest_doc));
        self.rebind_entity_refs(node, dest_doc);

        let mut local = XmlDOMWrapCtxt::default();
        let ctxt = ctxt.unwrap_or(&mut local);
        ctxt.namespace_map.clear();
        let scope = Scope {
            branch: node,
            // a custom acquisition takes over the search in the destination
            outer: dest_parent.filter(|_| ctxt.get_ns_for_node_func.is_none()),
        };
        let ret = match self.element_type(node) {
            XmlElementType::XmlElementNode => {
                // declarations of the branch now belong to the destination
                let elems = self
                    .descendants(node)
                    .filter(|&n| self.element_type(n) == XmlElementType::XmlElementNode)
                    .collect::<Vec<_>>();
                for elem in elems {
                    for ns in self.ns_defs(elem).collect::<Vec<_>>() {
                        if let Some(ns) = self.ns_mut(ns) {
                            ns.context = Some(dest_doc);
                        }
                    }
                }
                self.rebind_branch_ns(ctxt, Some(dest_doc), node, scope)
            }
            XmlElementType::XmlAttributeNode => {
                self.rebind_adopted_attr(ctxt, dest_doc, node, dest_parent, scope)
            }
            _ => Ok(()),
        };
        ctxt.namespace_map.clear();
        ret
    }

    fn rebind_adopted_attr(
        &mut self,
        ctxt: &mut XmlDOMWrapCtxt,
        dest_doc: XmlNodeId,
        attr: XmlNodeId,
        dest_parent: Option<XmlNodeId>,
        scope: Scope,
    ) -> Result<(), XmlParserErrors> {
        let Some(ns) = self.get(attr).and_then(|n| n.ns()) else {
            return Ok(());
        };
        let Some((href, prefix)) = self
            .ns(ns)
            .map(|n| (n.href().to_owned(), n.prefix().map(str::to_owned)))
        else {
            self.set_node_ns(attr, None);
            return Ok(());
        };
        let found = if prefix.as_deref() == Some("xml") {
            self.ensure_xmldecl(dest_doc)
        } else if let Some(acquire) = ctxt.get_ns_for_node_func.as_mut() {
            acquire.acquire_ns(self, attr, &href, prefix.as_deref())
        } else {
            let start = dest_parent.filter(|&p| self.element_type(p) == XmlElementType::XmlElementNode);
            let scope = Scope {
                branch: start.unwrap_or(scope.branch),
                outer: None,
            };
            match self.scope_lookup_href(start, scope, &href, true) {
                Some(found) => Some(found),
                None => match start {
                    Some(elem) => self.declare_ns_forced(elem, &href, prefix.as_deref()),
                    None => self.store_ns(dest_doc, &href, prefix.as_deref()),
                },
            }
        };
        if found.is_none() {
            return Err(xml_tree_err(
                XmlParserErrors::XmlErrNoMemory,
                Some(attr),
                "failed to acquire a namespace declaration",
            ));
        }
        self.set_node_ns(attr, found);
        Ok(())
    }

    /// Unlinks `node` from its owner.
    ///
    /// References from the removed branch to declarations outside of it are
    /// redirected to equal declarations stored in the document's `old_ns`,
    /// so the branch stays namespace well-formed on its own.
    #[doc(alias = "xmlDOMWrapRemoveNode")]
    pub fn dom_wrap_remove_node(
        &mut self,
        ctxt: Option<&mut XmlDOMWrapCtxt>,
        doc: XmlNodeId,
        node: XmlNodeId,
        _options: i32,
    ) -> Result<(), XmlParserErrors> {
        if !self.contains(node) || self.document(node) != Some(doc) {
            return Err(xml_tree_err(
                XmlParserErrors::XmlErrArgument,
                Some(node),
                "node doesn't belong to the document",
            ));
        }
        if self.parent(node).is_none() {
            return Ok(());
        }
        match self.element_type(node) {
            XmlElementType::XmlTextNode
            | XmlElementType::XmlCDATASectionNode
            | XmlElementType::XmlEntityRefNode
            | XmlElementType::XmlPINode
            | XmlElementType::XmlCommentNode => {
                self.unlink(node);
                return Ok(());
            }
            XmlElementType::XmlElementNode | XmlElementType::XmlAttributeNode => {}
            _ => {
                return Err(xml_tree_err(
                    XmlParserErrors::XmlErrUnsupportedFeature,
                    Some(node),
                    "node kind can't be removed",
                ));
            }
        }
        self.unlink(node);

        let mut local = XmlDOMWrapCtxt::default();
        let ctxt = ctxt.unwrap_or(&mut local);
        ctxt.namespace_map.clear();
        let scope = Scope {
            branch: node,
            outer: None,
        };
        for cur in self.branch_nodes(node) {
            let Some(ns) = self.get(cur).and_then(|n| n.ns()) else {
                continue;
            };
            let Some((href, prefix)) = self
                .ns(ns)
                .map(|n| (n.href().to_owned(), n.prefix().map(str::to_owned)))
            else {
                continue;
            };
            if prefix.as_deref() == Some("xml")
                || self.scope_lookup_prefix(self.owner_element(cur), scope, prefix.as_deref())
                    == Some(ns)
            {
                continue;
            }
            let stored = match ctxt.namespace_map.get(&ns) {
                Some(&stored) => Some(stored),
                None => self.store_ns(doc, &href, prefix.as_deref()),
            };
            let Some(stored) = stored else {
                ctxt.namespace_map.clear();
                return Err(xml_tree_err(
                    XmlParserErrors::XmlErrNoMemory,
                    Some(cur),
                    "failed to store a namespace declaration",
                ));
            };
            ctxt.namespace_map.insert(ns, stored);
            self.set_node_ns(cur, Some(stored));
        }
        ctxt.namespace_map.clear();
        Ok(())
    }

    fn attributes_of(&self, node: XmlNodeId) -> Vec<XmlNodeId> {
        if self.element_type(node) == XmlElementType::XmlElementNode {
            self.attributes(node).collect()
        } else {
            vec![]
        }
    }

    /// Copy one node of a branch being cloned into `dest_doc`.
    fn clone_one(
        &mut self,
        node: XmlNodeId,
        dest_doc: XmlNodeId,
        ns_map: &mut HashMap<XmlNsId, XmlNsId>,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        let typ = self.element_type(node);
        let name = self.name(node).map(str::to_owned);
        if typ == XmlElementType::XmlAttributeNode {
            let ret = self.new_doc_prop(Some(dest_doc), name.as_deref().unwrap_or(""), None)?;
            let ns = self.get(node).and_then(|n| n.ns());
            self.set_node_ns(ret, ns);
            return Ok(ret);
        }
        let Some(fields) = self.get(node).and_then(|n| n.as_node_fields()) else {
            return Err(xml_tree_err(
                XmlParserErrors::XmlErrUnsupportedFeature,
                Some(node),
                "node kind can't be cloned",
            ));
        };
        let copied = XmlNodeFields {
            ns: fields.ns,
            content: (typ != XmlElementType::XmlElementNode)
                .then(|| fields.content.clone())
                .flatten(),
            line: fields.line,
            extra: fields.extra,
            ..Default::default()
        };
        let src_ns_def = fields.ns_def;
        let ret = self.new_node_in(typ, Some(dest_doc), name.as_deref(), copied);
        if let Some(head) = src_ns_def {
            let mut last: Option<XmlNsId> = None;
            for ns in self.ns_list(Some(head)).collect::<Vec<_>>() {
                let Some(copy) = self.copy_namespace(ns) else {
                    continue;
                };
                if let Some(n) = self.ns_mut(copy) {
                    n.context = Some(dest_doc);
                }
                ns_map.insert(ns, copy);
                match last {
                    Some(last) => {
                        if let Some(last) = self.ns_mut(last) {
                            last.next = Some(copy);
                        }
                    }
                    None => {
                        if let Some(f) = self.get_mut(ret).and_then(|n| n.as_node_fields_mut()) {
                            f.ns_def = Some(copy);
                        }
                    }
                }
                last = Some(copy);
            }
        }
        Ok(ret)
    }

    /// Clones `node` into `dest_doc`.
    ///
    /// With `deep`, the whole branch is cloned, otherwise an element keeps its
    /// attributes and declarations but no children. The clone is not linked
    /// into `dest_parent`, which only contributes the declarations in scope
    /// there. ID attributes are registered in the destination only with
    /// [`XML_DOM_CLONE_IDS`]; other option bits are ignored.
    #[doc(alias = "xmlDOMWrapCloneNode")]
    #[allow(clippy::too_many_arguments)]
    pub fn dom_wrap_clone_node(
        &mut self,
        ctxt: Option<&mut XmlDOMWrapCtxt>,
        source_doc: Option<XmlNodeId>,
        node: XmlNodeId,
        dest_doc: XmlNodeId,
        dest_parent: Option<XmlNodeId>,
        deep: bool,
        options: i32,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        let source_doc = self.check_dom_wrap_args(source_doc, node, dest_doc, dest_parent)?;
        match self.element_type(node) {
            XmlElementType::XmlElementNode
            | XmlElementType::XmlAttributeNode
            | XmlElementType::XmlTextNode
            | XmlElementType::XmlCDATASectionNode
            | XmlElementType::XmlEntityRefNode
            | XmlElementType::XmlPINode
            | XmlElementType::XmlCommentNode
            | XmlElementType::XmlDocumentFragNode => {}
            _ => {
                return Err(xml_tree_err(
                    XmlParserErrors::XmlErrUnsupportedFeature,
                    Some(node),
                    "node kind can't be cloned",
                ));
            }
        }

        // copy the branch, the source declarations map to their copies
        let mut ns_map = HashMap::new();
        let root = self.clone_one(node, dest_doc, &mut ns_map)?;
        let mut first = self.attributes_of(node);
        if deep {
            first.extend(self.siblings(self.children(node)));
        }
        let mut stack = first.into_iter().rev().map(|c| (c, root)).collect::<Vec<_>>();
        let mut clones = vec![(node, root)];
        while let Some((src, parent)) = stack.pop() {
            let copy = match self.clone_one(src, dest_doc, &mut ns_map) {
                Ok(copy) => copy,
                Err(err) => {
                    self.free_node(root);
                    return Err(err);
                }
            };
            self.set_parent(copy, Some(parent));
            if self.element_type(copy) == XmlElementType::XmlAttributeNode {
                self.append_property(parent, copy);
            } else {
                self.append_child_link(parent, copy);
            }
            clones.push((src, copy));
            if self.element_type(src) == XmlElementType::XmlEntityRefNode {
                continue;
            }
            let mut next = self.attributes_of(src);
            next.extend(self.siblings(self.children(src)));
            stack.extend(next.into_iter().rev().map(|c| (c, copy)));
        }
        self.rebind_entity_refs(root, dest_doc);

        // references to copied declarations follow the copy
        for &(_, copy) in &clones {
            let Some(ns) = self.get(copy).and_then(|n| n.ns()) else {
                continue;
            };
            if let Some(&to) = ns_map.get(&ns) {
                self.set_node_ns(copy, Some(to));
            }
        }
        let mut local = XmlDOMWrapCtxt::default();
        let ctxt = ctxt.unwrap_or(&mut local);
        ctxt.namespace_map.clear();
        let scope = Scope {
            branch: root,
            outer: dest_parent.filter(|_| ctxt.get_ns_for_node_func.is_none()),
        };
        let rebound = if self.element_type(root) == XmlElementType::XmlAttributeNode {
            self.rebind_adopted_attr(ctxt, dest_doc, root, dest_parent, scope)
        } else {
            self.rebind_branch_ns(ctxt, Some(dest_doc), root, scope)
        };
        ctxt.namespace_map.clear();
        if let Err(err) = rebound {
            self.free_node(root);
            return Err(err);
        }

        if options & XML_DOM_CLONE_IDS != 0 {
            for (src, copy) in clones {
                if self.element_type(copy) != XmlElementType::XmlAttributeNode {
                    continue;
                }
                let owner = self.parent(copy).or(dest_parent);
                if !self.is_id(dest_doc, owner, copy) {
                    continue;
                }
                let value = self
                    .children(src)
                    .map(|first| self.node_list_get_string(source_doc, first, true))
                    .unwrap_or_default();
                if !value.is_empty() {
                    self.add_id(dest_doc, &value, copy)?;
                }
            }
        }
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc_with_root(tree: &mut XmlTree, name: &str) -> (XmlNodeId, XmlNodeId) {
        let doc = tree.new_doc(None);
        let root = tree.new_doc_node(Some(doc), None, name, None).unwrap();
        tree.set_root_element(doc, root).unwrap();
        (doc, root)
    }

    #[test]
    fn adopt_declares_missing_namespace() {
        let mut tree = XmlTree::default();
        let (doc, root) = doc_with_root(&mut tree, "r");
        let ns = tree.new_ns(Some(root), "u", Some("p")).unwrap();
        let c = tree.new_child(root, Some(ns), "c", None).unwrap();
        tree.unlink(c);

        let dest = tree.new_doc(None);
        tree.dom_wrap_adopt_node(None, Some(doc), c, dest, None, 0).unwrap();
        assert_eq!(tree.document(c), Some(dest));
        let bound = tree.get(c).unwrap().ns().unwrap();
        assert_ne!(bound, ns);
        assert_eq!(tree.ns(bound).unwrap().href(), "u");
        assert_eq!(tree.ns(bound).unwrap().prefix(), Some("p"));
        assert_eq!(tree.ns_defs(c).collect::<Vec<_>>(), vec![bound]);
    }

    #[test]
    fn adopt_reuses_destination_scope() {
        let mut tree = XmlTree::default();
        let (doc, root) = doc_with_root(&mut tree, "r");
        let ns = tree.new_ns(Some(root), "u", Some("p")).unwrap();
        let c = tree.new_child(root, Some(ns), "c", None).unwrap();

        let (dest, dest_root) = doc_with_root(&mut tree, "d");
        let dest_ns = tree.new_ns(Some(dest_root), "u", Some("q")).unwrap();
        tree.dom_wrap_adopt_node(None, Some(doc), c, dest, Some(dest_root), 0)
            .unwrap();
        assert!(tree.parent(c).is_none());
        assert_eq!(tree.get(c).unwrap().ns(), Some(dest_ns));
        assert!(tree.get(c).unwrap().ns_def().is_none());

        // same document is refused
        let other = tree.new_doc_node(Some(dest), None, "x", None).unwrap();
        assert!(
            tree.dom_wrap_adopt_node(None, None, other, dest, None, 0)
                .is_err()
        );
    }

    #[test]
    fn custom_acquisition_is_used() {
        let mut tree = XmlTree::default();
        let (doc, root) = doc_with_root(&mut tree, "r");
        let ns = tree.new_ns(Some(root), "u", Some("p")).unwrap();
        let c = tree.new_child(root, Some(ns), "c", None).unwrap();
        let dest = tree.new_doc(None);

        let mut ctxt = XmlDOMWrapCtxt::with_acquire_ns(
            |tree: &mut XmlTree, node: XmlNodeId, href: &str, _prefix: Option<&str>| {
                tree.new_ns(Some(node), href, Some("custom"))
            },
        );
        assert!(ctxt.has_acquire_ns());
        tree.dom_wrap_adopt_node(Some(&mut ctxt), Some(doc), c, dest, None, 0)
            .unwrap();
        let bound = tree.get(c).unwrap().ns().unwrap();
        assert_eq!(tree.ns(bound).unwrap().prefix(), Some("custom"));
    }

    #[test]
    fn forced_declarations_invent_prefixes() {
        let mut tree = XmlTree::default();
        let (_, root) = doc_with_root(&mut tree, "r");
        tree.new_ns(Some(root), "a", Some("p")).unwrap();
        tree.new_ns(Some(root), "b", None).unwrap();
        let p1 = tree.declare_ns_forced(root, "c", Some("p")).unwrap();
        assert_eq!(tree.ns(p1).unwrap().prefix(), Some("p_1"));
        let d1 = tree.declare_ns_forced(root, "d", None).unwrap();
        assert_eq!(tree.ns(d1).unwrap().prefix(), Some("ns_1"));
    }

    #[test]
    fn remove_keeps_branch_well_formed() {
        let mut tree = XmlTree::default();
        let (doc, root) = doc_with_root(&mut tree, "r");
        let ns = tree.new_ns(Some(root), "u", Some("p")).unwrap();
        let c = tree.new_child(root, Some(ns), "c", None).unwrap();
        let text = tree.new_doc_text(Some(doc), "t");
        tree.add_child(root, text).unwrap();

        tree.dom_wrap_remove_node(None, doc, text, 0).unwrap();
        assert!(tree.parent(text).is_none());

        tree.dom_wrap_remove_node(None, doc, c, 0).unwrap();
        assert!(tree.parent(c).is_none());
        let stored = tree.get(c).unwrap().ns().unwrap();
        assert_ne!(stored, ns);
        assert_eq!(tree.ns(stored).unwrap().href(), "u");
        let old = tree.doc(doc).unwrap().old_ns();
        assert!(tree.ns_list(old).any(|n| n == stored));
    }

    #[test]
    fn clone_deep_and_shallow() {
        let mut tree = XmlTree::default();
        let (doc, root) = doc_with_root(&mut tree, "r");
        let ns = tree.new_ns(Some(root), "u", Some("p")).unwrap();
        let c = tree.new_child(root, Some(ns), "c", Some("body")).unwrap();
        tree.set_ns_prop(c, Some(ns), "a", Some("v")).unwrap();

        let (dest, dest_root) = doc_with_root(&mut tree, "d");
        let deep = tree
            .dom_wrap_clone_node(None, Some(doc), c, dest, Some(dest_root), true, 0)
            .unwrap();
        assert_eq!(tree.document(deep), Some(dest));
        assert_eq!(tree.get_content(deep).as_deref(), Some("body"));
        let bound = tree.get(deep).unwrap().ns().unwrap();
        assert_eq!(tree.ns(bound).unwrap().href(), "u");
        assert_eq!(tree.get_ns_prop(deep, "a", Some("u")).as_deref(), Some("v"));
        // the source is untouched
        assert_eq!(tree.parent(c), Some(root));
        assert_eq!(tree.get(c).unwrap().ns(), Some(ns));

        let shallow = tree
            .dom_wrap_clone_node(None, Some(doc), c, dest, None, false, 0)
            .unwrap();
        assert!(tree.children(shallow).is_none());
        assert!(tree.get(shallow).unwrap().properties().is_some());
    }

    #[test]
    fn reconcile_adds_and_removes_declarations() {
        let mut tree = XmlTree::default();
        let (_, root) = doc_with_root(&mut tree, "r");
        let ns = tree.new_ns(Some(root), "u", Some("p")).unwrap();
        let c = tree.new_child(root, None, "c", None).unwrap();
        let redundant = tree.new_ns(Some(c), "u", Some("p")).unwrap();
        let leaf = tree.new_child(c, Some(redundant), "leaf", None).unwrap();

        tree.dom_wrap_reconcile_namespaces(None, root, XML_DOM_RECONNS_REMOVEREDUND | 1 << 20)
            .unwrap();
        assert!(tree.get(c).unwrap().ns_def().is_none());
        assert_eq!(tree.get(leaf).unwrap().ns(), Some(ns));

        // a reference to a declaration out of scope gets a local one
        let other = tree.new_doc_node(None, None, "o", None).unwrap();
        let far = tree.new_ns(Some(other), "v", Some("f")).unwrap();
        let inner = tree.new_child(root, Some(far), "inner", None).unwrap();
        tree.dom_wrap_reconcile_namespaces(None, root, 0).unwrap();
        let bound = tree.get(inner).unwrap().ns().unwrap();
        assert_ne!(bound, far);
        assert_eq!(tree.ns(bound).unwrap().href(), "v");
        assert_eq!(tree.ns_defs(inner).collect::<Vec<_>>(), vec![bound]);
    }
}
