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

use std::{num::NonZeroU32, rc::Rc};

use crate::error::{XmlParserErrors, xml_tree_err};

use super::{
    XmlElementType, XmlNode, XmlNodeVariant, XmlNs, XmlNsId, XmlTreeHooks,
};

/// A handle to a node stored in an [`XmlTree`].
///
/// Handles are cheap to copy. A handle whose node has been freed is stale:
/// every lookup through it fails instead of reaching another node that reuses
/// the same slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct XmlNodeId {
    index: NonZeroU32,
    generation: u32,
}

impl XmlNodeId {
    fn slot(self) -> usize {
        self.index.get() as usize - 1
    }
}

#[derive(Debug, Default)]
struct NodeSlot {
    generation: u32,
    node: Option<XmlNode>,
}

#[derive(Debug, Default)]
struct NsSlot {
    generation: u32,
    ns: Option<XmlNs>,
}

/// The storage of every node and namespace declaration.
///
/// Documents, DTDs and detached subtrees all live in one `XmlTree`, so nodes can
/// move between documents. Links between nodes are non-owning handles;
/// a node is released only by the `free_*` methods or when the whole tree is dropped.
#[derive(Debug)]
pub struct XmlTree {
    nodes: Vec<NodeSlot>,
    free_nodes: Vec<NonZeroU32>,
    namespaces: Vec<NsSlot>,
    free_namespaces: Vec<NonZeroU32>,
    live_nodes: usize,
    pub(crate) hooks: XmlTreeHooks,
}

impl XmlTree {
    /// Create an empty tree whose hooks are the current thread defaults.
    pub fn new() -> Self {
        Self::with_hooks(XmlTreeHooks::from_defaults())
    }

    /// Create an empty tree with explicit creation/destruction hooks.
    pub fn with_hooks(hooks: XmlTreeHooks) -> Self {
        Self {
            nodes: vec![],
            free_nodes: vec![],
            namespaces: vec![],
            free_namespaces: vec![],
            live_nodes: 0,
            hooks,
        }
    }

    pub fn hooks(&self) -> XmlTreeHooks {
        self.hooks
    }

    /// Replace the hooks. Returns the previous ones.
    pub fn set_hooks(&mut self, hooks: XmlTreeHooks) -> XmlTreeHooks {
        std::mem::replace(&mut self.hooks, hooks)
    }

    /// Number of nodes currently allocated.
    pub fn node_count(&self) -> usize {
        self.live_nodes
    }

    pub fn get(&self, id: XmlNodeId) -> Option<&XmlNode> {
        self.nodes
            .get(id.slot())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: XmlNodeId) -> Option<&mut XmlNode> {
        self.nodes
            .get_mut(id.slot())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }

    /// Check whether `id` still refers to a live node.
    pub fn contains(&self, id: XmlNodeId) -> bool {
        self.get(id).is_some()
    }

    /// Store `node` and fire the registration hook.
    pub(crate) fn alloc(&mut self, node: XmlNode) -> XmlNodeId {
        let id = if let Some(index) = self.free_nodes.pop() {
            let slot = &mut self.nodes[index.get() as usize - 1];
            slot.node = Some(node);
            XmlNodeId {
                index,
                generation: slot.generation,
            }
        } else {
            self.nodes.push(NodeSlot {
                generation: 0,
                node: Some(node),
            });
            XmlNodeId {
                index: NonZeroU32::new(self.nodes.len() as u32).unwrap_or(NonZeroU32::MIN),
                generation: 0,
            }
        };
        self.live_nodes += 1;
        if let Some(register) = self.hooks.register {
            register(self, id);
        }
        id
    }

    /// Fire the deregistration hook and take the node out of its slot.
    ///
    /// Links of other nodes are not updated.
    pub(crate) fn release(&mut self, id: XmlNodeId) -> Option<XmlNode> {
        if !self.contains(id) {
            return None;
        }
        if let Some(deregister) = self.hooks.deregister {
            deregister(self, id);
        }
        let slot = self.nodes.get_mut(id.slot())?;
        let node = slot.node.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_nodes.push(id.index);
        self.live_nodes -= 1;
        Some(node)
    }

    pub fn ns(&self, id: XmlNsId) -> Option<&XmlNs> {
        self.namespaces
            .get(id.slot())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.ns.as_ref())
    }

    pub(crate) fn ns_mut(&mut self, id: XmlNsId) -> Option<&mut XmlNs> {
        self.namespaces
            .get_mut(id.slot())
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.ns.as_mut())
    }

    pub(crate) fn alloc_ns(&mut self, ns: XmlNs) -> XmlNsId {
        if let Some(index) = self.free_namespaces.pop() {
            let slot = &mut self.namespaces[index.get() as usize - 1];
            slot.ns = Some(ns);
            XmlNsId::new(index, slot.generation)
        } else {
            self.namespaces.push(NsSlot {
                generation: 0,
                ns: Some(ns),
            });
            let index =
                NonZeroU32::new(self.namespaces.len() as u32).unwrap_or(NonZeroU32::MIN);
            XmlNsId::new(index, 0)
        }
    }

    pub(crate) fn release_ns(&mut self, id: XmlNsId) -> Option<XmlNs> {
        let slot = self
            .namespaces
            .get_mut(id.slot())
            .filter(|slot| slot.generation == id.generation())?;
        let ns = slot.ns.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_namespaces.push(id.index());
        Some(ns)
    }

    /// The type of the node, or `XmlInvalidNode` for a stale handle.
    pub fn element_type(&self, id: XmlNodeId) -> XmlElementType {
        self.get(id)
            .map_or(XmlElementType::XmlInvalidNode, |node| node.element_type())
    }

    pub fn name(&self, id: XmlNodeId) -> Option<&str> {
        self.get(id)?.name()
    }

    pub fn parent(&self, id: XmlNodeId) -> Option<XmlNodeId> {
        self.get(id)?.parent()
    }

    pub fn children(&self, id: XmlNodeId) -> Option<XmlNodeId> {
        self.get(id)?.children()
    }

    pub fn last(&self, id: XmlNodeId) -> Option<XmlNodeId> {
        self.get(id)?.last()
    }

    pub fn next(&self, id: XmlNodeId) -> Option<XmlNodeId> {
        self.get(id)?.next()
    }

    pub fn prev(&self, id: XmlNodeId) -> Option<XmlNodeId> {
        self.get(id)?.prev()
    }

    pub fn document(&self, id: XmlNodeId) -> Option<XmlNodeId> {
        self.get(id)?.document()
    }

    /// Iterate over `first` and its following siblings.
    pub fn siblings(&self, first: Option<XmlNodeId>) -> Siblings<'_> {
        Siblings {
            tree: self,
            cur: first,
        }
    }

    /// Iterate over the children of `parent`.
    pub fn child_nodes(&self, parent: XmlNodeId) -> Siblings<'_> {
        self.siblings(self.children(parent))
    }

    pub(crate) fn set_parent(&mut self, id: XmlNodeId, parent: Option<XmlNodeId>) {
        if let Some(node) = self.get_mut(id) {
            node.parent = parent;
        }
    }

    pub(crate) fn set_next(&mut self, id: XmlNodeId, next: Option<XmlNodeId>) {
        if let Some(node) = self.get_mut(id) {
            node.next = next;
        }
    }

    pub(crate) fn set_prev(&mut self, id: XmlNodeId, prev: Option<XmlNodeId>) {
        if let Some(node) = self.get_mut(id) {
            node.prev = prev;
        }
    }

    pub(crate) fn set_children(&mut self, id: XmlNodeId, children: Option<XmlNodeId>) {
        if let Some(node) = self.get_mut(id) {
            node.children = children;
        }
    }

    pub(crate) fn set_last(&mut self, id: XmlNodeId, last: Option<XmlNodeId>) {
        if let Some(node) = self.get_mut(id) {
            node.last = last;
        }
    }

    /// Set user data attached to a node. Returns the previous data.
    pub fn set_private(
        &mut self,
        id: XmlNodeId,
        private: Option<Rc<dyn std::any::Any>>,
    ) -> Option<Rc<dyn std::any::Any>> {
        let node = self.get_mut(id)?;
        std::mem::replace(&mut node.private, private)
    }

    /// `true` if `ancestor` is `node` itself or one of its ancestors.
    pub(crate) fn is_ancestor_or_self(&self, ancestor: XmlNodeId, node: XmlNodeId) -> bool {
        let mut cur = Some(node);
        while let Some(now) = cur {
            if now == ancestor {
                return true;
            }
            cur = self.parent(now);
        }
        false
    }

    fn is_same_text_kind(&self, a: XmlNodeId, b: XmlNodeId) -> bool {
        let (Some(a), Some(b)) = (self.get(a), self.get(b)) else {
            return false;
        };
        a.element_type() == XmlElementType::XmlTextNode
            && b.element_type() == XmlElementType::XmlTextNode
            && a.name() == b.name()
    }

    /// Move the content of the text node `src` to the end of `dst` and free `src`.
    fn merge_text_after(&mut self, dst: XmlNodeId, src: XmlNodeId) -> XmlNodeId {
        let content = self.get(src).and_then(|n| n.content()).unwrap_or("").to_owned();
        self.append_raw_content(dst, &content);
        self.free_node(src);
        dst
    }

    /// Move the content of the text node `src` in front of `dst` and free `src`.
    fn merge_text_before(&mut self, dst: XmlNodeId, src: XmlNodeId) -> XmlNodeId {
        let mut content = self.get(src).and_then(|n| n.content()).unwrap_or("").to_owned();
        if let Some(fields) = self.get_mut(dst).and_then(|n| n.as_node_fields_mut()) {
            content.push_str(fields.content.as_deref().unwrap_or(""));
            fields.content = Some(content);
        }
        self.free_node(src);
        dst
    }

    fn check_insertable(&self, target: XmlNodeId, elem: XmlNodeId) -> Result<(), XmlParserErrors> {
        if !self.contains(target) || !self.contains(elem) || target == elem {
            return Err(xml_tree_err(
                XmlParserErrors::XmlErrArgument,
                Some(target),
                "invalid node for insertion",
            ));
        }
        if matches!(
            self.element_type(elem),
            XmlElementType::XmlDocumentNode | XmlElementType::XmlHTMLDocumentNode
        ) {
            return Err(xml_tree_err(
                XmlParserErrors::XmlErrArgument,
                Some(elem),
                "a document cannot be inserted",
            ));
        }
        if self.is_ancestor_or_self(elem, target) {
            return Err(xml_tree_err(
                XmlParserErrors::XmlErrArgument,
                Some(elem),
                "insertion would create a cycle",
            ));
        }
        Ok(())
    }

    /// Add a new node to `parent`, at the end of the child (or property) list
    /// merging adjacent TEXT nodes (in which case `cur` is freed).
    ///
    /// If the new node is ATTRIBUTE, it is added into properties instead of children.
    /// If there is an attribute with equal name, it is first destroyed.
    ///
    /// Returns the child or an error. The child may be another node than `cur`
    /// if a merge happened.
    #[doc(alias = "xmlAddChild")]
    pub fn add_child(
        &mut self,
        parent: XmlNodeId,
        cur: XmlNodeId,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        self.check_insertable(parent, cur)?;
        let ptype = self.element_type(parent);
        let ctype = self.element_type(cur);
        if ctype == XmlElementType::XmlAttributeNode && ptype != XmlElementType::XmlElementNode {
            return Err(xml_tree_err(
                XmlParserErrors::XmlTreeWrongParent,
                Some(parent),
                "attributes can only be added to elements",
            ));
        }
        // If cur is a TEXT node, merge its content with adjacent TEXT nodes
        if matches!(
            ptype,
            XmlElementType::XmlTextNode
                | XmlElementType::XmlCDATASectionNode
                | XmlElementType::XmlCommentNode
                | XmlElementType::XmlPINode
        ) {
            if self.is_same_text_kind(parent, cur) {
                self.unlink(cur);
                return Ok(self.merge_text_after(parent, cur));
            }
            return Err(xml_tree_err(
                XmlParserErrors::XmlErrArgument,
                Some(parent),
                "text nodes cannot have children",
            ));
        }

        self.unlink(cur);
        if ctype == XmlElementType::XmlTextNode {
            if let Some(last) = self.last(parent).filter(|&l| self.is_same_text_kind(l, cur)) {
                return Ok(self.merge_text_after(last, cur));
            }
        }

        let doc = self.document(parent);
        if self.document(cur) != doc {
            self.set_tree_doc(cur, doc);
        }
        self.set_parent(cur, Some(parent));

        if ctype == XmlElementType::XmlAttributeNode {
            let name = self.name(cur).unwrap_or("").to_owned();
            let href = self.attr_ns_href(cur);
            if let Some(old) = self.has_ns_prop_internal(parent, &name, href.as_deref()) {
                if old != cur {
                    self.free_prop(old);
                }
            }
            self.append_property(parent, cur);
        } else {
            self.append_child_link(parent, cur);
        }
        Ok(cur)
    }

    pub(crate) fn append_child_link(&mut self, parent: XmlNodeId, cur: XmlNodeId) {
        match self.last(parent) {
            Some(last) => {
                self.set_next(last, Some(cur));
                self.set_prev(cur, Some(last));
            }
            None => self.set_children(parent, Some(cur)),
        }
        self.set_last(parent, Some(cur));
    }

    pub(crate) fn append_property(&mut self, elem: XmlNodeId, attr: XmlNodeId) {
        let Some(head) = self.get(elem).and_then(|n| n.properties()) else {
            if let Some(fields) = self.get_mut(elem).and_then(|n| n.as_node_fields_mut()) {
                fields.properties = Some(attr);
            }
            return;
        };
        let mut last = head;
        while let Some(next) = self.next(last) {
            last = next;
        }
        self.set_next(last, Some(attr));
        self.set_prev(attr, Some(last));
    }

    /// Add a list of nodes at the end of the child list of `parent`,
    /// merging adjacent TEXT nodes.
    ///
    /// `cur` and its following siblings are consumed.
    /// Returns the last child added.
    #[doc(alias = "xmlAddChildList")]
    pub fn add_child_list(
        &mut self,
        parent: XmlNodeId,
        cur: XmlNodeId,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        let list = self.siblings(Some(cur)).collect::<Vec<_>>();
        let mut last = None;
        for node in list {
            last = Some(self.add_child(parent, node)?);
        }
        last.ok_or(XmlParserErrors::XmlErrArgument)
    }

    /// Add a new node `elem` as the next sibling of `cur`.
    ///
    /// If the new node was already inserted in a document it is first unlinked
    /// from its existing context. If the new node is ATTRIBUTE, it is added into
    /// properties instead of children. If there is an attribute with equal name,
    /// it is first destroyed.
    ///
    /// Returns the new node. It is another node than `elem` if a TEXT merge happened.
    #[doc(alias = "xmlAddNextSibling")]
    pub fn add_next_sibling(
        &mut self,
        cur: XmlNodeId,
        elem: XmlNodeId,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        self.check_insertable(cur, elem)?;
        if self.element_type(elem) == XmlElementType::XmlAttributeNode {
            return self.add_prop_sibling(cur, cur, elem, true);
        }
        self.unlink(elem);
        if self.element_type(elem) == XmlElementType::XmlTextNode {
            if self.is_same_text_kind(cur, elem) {
                return Ok(self.merge_text_after(cur, elem));
            }
            if let Some(next) = self.next(cur).filter(|&n| self.is_same_text_kind(n, elem)) {
                return Ok(self.merge_text_before(next, elem));
            }
        }
        let doc = self.document(cur);
        if self.document(elem) != doc {
            self.set_tree_doc(elem, doc);
        }
        let parent = self.parent(cur);
        let next = self.next(cur);
        self.set_parent(elem, parent);
        self.set_prev(elem, Some(cur));
        self.set_next(elem, next);
        self.set_next(cur, Some(elem));
        match next {
            Some(next) => self.set_prev(next, Some(elem)),
            None => {
                if let Some(parent) = parent {
                    self.set_last(parent, Some(elem));
                }
            }
        }
        Ok(elem)
    }

    /// Add a new node `elem` as the previous sibling of `cur`,
    /// merging adjacent TEXT nodes (`elem` may be freed).
    ///
    /// Returns the new node. It is another node than `elem` if a TEXT merge happened.
    #[doc(alias = "xmlAddPrevSibling")]
    pub fn add_prev_sibling(
        &mut self,
        cur: XmlNodeId,
        elem: XmlNodeId,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        self.check_insertable(cur, elem)?;
        if self.element_type(elem) == XmlElementType::XmlAttributeNode {
            return self.add_prop_sibling(cur, cur, elem, false);
        }
        self.unlink(elem);
        if self.element_type(elem) == XmlElementType::XmlTextNode {
            if self.is_same_text_kind(cur, elem) {
                return Ok(self.merge_text_before(cur, elem));
            }
            if let Some(prev) = self.prev(cur).filter(|&p| self.is_same_text_kind(p, elem)) {
                return Ok(self.merge_text_after(prev, elem));
            }
        }
        let doc = self.document(cur);
        if self.document(elem) != doc {
            self.set_tree_doc(elem, doc);
        }
        let parent = self.parent(cur);
        let prev = self.prev(cur);
        self.set_parent(elem, parent);
        self.set_next(elem, Some(cur));
        self.set_prev(elem, prev);
        self.set_prev(cur, Some(elem));
        match prev {
            Some(prev) => self.set_next(prev, Some(elem)),
            None => {
                if let Some(parent) = parent {
                    self.set_children(parent, Some(elem));
                }
            }
        }
        Ok(elem)
    }

    /// Add a new element `elem` to the list of siblings of `cur`,
    /// merging adjacent TEXT nodes (`elem` may be freed).
    ///
    /// If the new element was already inserted in a document it is first unlinked
    /// from its existing context.
    ///
    /// Returns the new element. It is another node than `elem` if a TEXT merge happened.
    #[doc(alias = "xmlAddSibling")]
    pub fn add_sibling(
        &mut self,
        cur: XmlNodeId,
        elem: XmlNodeId,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        self.check_insertable(cur, elem)?;
        let mut last = cur;
        while let Some(next) = self.next(last) {
            last = next;
        }
        if last == elem {
            return Ok(elem);
        }
        if self.element_type(elem) == XmlElementType::XmlAttributeNode {
            return self.add_prop_sibling(last, last, elem, true);
        }
        self.add_next_sibling(last, elem)
    }

    /// Insert the attribute `prop` next to (or before) `cur`, removing any attribute
    /// of `prev`'s owner with the same name and namespace.
    fn add_prop_sibling(
        &mut self,
        prev: XmlNodeId,
        cur: XmlNodeId,
        prop: XmlNodeId,
        after: bool,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        if self.element_type(cur) != XmlElementType::XmlAttributeNode {
            return Err(xml_tree_err(
                XmlParserErrors::XmlTreeWrongParent,
                Some(cur),
                "attributes can only be siblings of attributes",
            ));
        }
        self.unlink(prop);
        let Some(parent) = self.parent(cur) else {
            return Err(xml_tree_err(
                XmlParserErrors::XmlTreeWrongParent,
                Some(cur),
                "attribute has no owner element",
            ));
        };
        let name = self.name(prop).unwrap_or("").to_owned();
        let href = self.attr_ns_href(prop);
        let dup = self
            .has_ns_prop_internal(parent, &name, href.as_deref())
            .filter(|&attr| attr != prop && attr != cur);
        let doc = self.document(cur);
        if self.document(prop) != doc {
            self.set_tree_doc(prop, doc);
        }
        self.set_parent(prop, Some(parent));
        if after {
            let next = self.next(prev);
            self.set_prev(prop, Some(prev));
            self.set_next(prop, next);
            self.set_next(prev, Some(prop));
            if let Some(next) = next {
                self.set_prev(next, Some(prop));
            }
        } else {
            let before = self.prev(cur);
            self.set_next(prop, Some(cur));
            self.set_prev(prop, before);
            self.set_prev(cur, Some(prop));
            match before {
                Some(before) => self.set_next(before, Some(prop)),
                None => {
                    if let Some(fields) = self.get_mut(parent).and_then(|n| n.as_node_fields_mut())
                    {
                        fields.properties = Some(prop);
                    }
                }
            }
        }
        if let Some(dup) = dup {
            self.free_prop(dup);
        }
        Ok(prop)
    }

    /// Unlink a node from its current context, the node is not freed.
    ///
    /// If one need to free the node, use [`XmlTree::free_node`] routine after the unlink.
    /// DTDs are detached from their document, declarations are removed from
    /// the lookup tables of their DTD.
    #[doc(alias = "xmlUnlinkNode")]
    pub fn unlink(&mut self, cur: XmlNodeId) {
        let Some(node) = self.get(cur) else {
            return;
        };
        let typ = node.element_type();
        let (parent, next, prev, doc) = (node.parent, node.next, node.prev, node.doc);

        match typ {
            XmlElementType::XmlDTDNode => {
                if let Some(doc) = doc.and_then(|doc| self.get_mut(doc)).and_then(|d| d.as_doc_mut()) {
                    if doc.int_subset == Some(cur) {
                        doc.int_subset = None;
                    }
                    if doc.ext_subset == Some(cur) {
                        doc.ext_subset = None;
                    }
                }
            }
            XmlElementType::XmlEntityDecl
            | XmlElementType::XmlElementDecl
            | XmlElementType::XmlAttributeDecl => {
                if let Some(dtd) = parent {
                    self.remove_decl_from_dtd(dtd, cur);
                }
            }
            _ => {}
        }

        if let Some(parent) = parent {
            if typ == XmlElementType::XmlAttributeNode {
                if let Some(fields) = self.get_mut(parent).and_then(|n| n.as_node_fields_mut()) {
                    if fields.properties == Some(cur) {
                        fields.properties = next;
                    }
                }
            } else {
                if self.children(parent) == Some(cur) {
                    self.set_children(parent, next);
                }
                if self.last(parent) == Some(cur) {
                    self.set_last(parent, prev);
                }
            }
        }
        if let Some(next) = next {
            self.set_prev(next, prev);
        }
        if let Some(prev) = prev {
            self.set_next(prev, next);
        }
        if let Some(node) = self.get_mut(cur) {
            node.parent = None;
            node.next = None;
            node.prev = None;
        }
    }

    /// Unlink the old node. If `cur` is provided, it is unlinked and inserted
    /// in place of `old`.
    ///
    /// Returns the `old` node.
    #[doc(alias = "xmlReplaceNode")]
    pub fn replace_node(
        &mut self,
        old: XmlNodeId,
        cur: Option<XmlNodeId>,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        let Some(parent) = self.parent(old) else {
            return Err(xml_tree_err(
                XmlParserErrors::XmlErrArgument,
                Some(old),
                "the replaced node has no parent",
            ));
        };
        let Some(cur) = cur else {
            self.unlink(old);
            return Ok(old);
        };
        if cur == old {
            return Ok(old);
        }
        self.check_insertable(old, cur)?;
        let old_is_attr = self.element_type(old) == XmlElementType::XmlAttributeNode;
        let cur_is_attr = self.element_type(cur) == XmlElementType::XmlAttributeNode;
        if old_is_attr != cur_is_attr {
            return Err(xml_tree_err(
                XmlParserErrors::XmlErrArgument,
                Some(cur),
                "attributes and other nodes cannot replace each other",
            ));
        }
        self.unlink(cur);
        let doc = self.document(old);
        if self.document(cur) != doc {
            self.set_tree_doc(cur, doc);
        }
        let (next, prev) = (self.next(old), self.prev(old));
        self.set_parent(cur, Some(parent));
        self.set_next(cur, next);
        self.set_prev(cur, prev);
        if let Some(next) = next {
            self.set_prev(next, Some(cur));
        }
        if let Some(prev) = prev {
            self.set_next(prev, Some(cur));
        }
        if old_is_attr {
            if let Some(fields) = self.get_mut(parent).and_then(|n| n.as_node_fields_mut()) {
                if fields.properties == Some(old) {
                    fields.properties = Some(cur);
                }
            }
        } else {
            if self.children(parent) == Some(old) {
                self.set_children(parent, Some(cur));
            }
            if self.last(parent) == Some(old) {
                self.set_last(parent, Some(cur));
            }
        }
        if let Some(node) = self.get_mut(old) {
            node.parent = None;
            node.next = None;
            node.prev = None;
        }
        Ok(old)
    }

    /// Free a node, this is a recursive behaviour, all the children are freed too.
    /// The node is unlinked first.
    ///
    /// The traversal uses an explicit stack, so the depth of the subtree is not
    /// limited by the call stack.
    #[doc(alias = "xmlFreeNode")]
    pub fn free_node(&mut self, cur: XmlNodeId) {
        if !self.contains(cur) {
            return;
        }
        self.unlink(cur);
        self.release_subtree(cur);
    }

    /// Free a node and all its siblings, this is a recursive behaviour,
    /// all the children are freed too.
    #[doc(alias = "xmlFreeNodeList")]
    pub fn free_node_list(&mut self, cur: XmlNodeId) {
        let list = self.siblings(Some(cur)).collect::<Vec<_>>();
        for node in list {
            self.free_node(node);
        }
    }

    /// Release `root` and everything it owns without touching outer links.
    pub(crate) fn release_subtree(&mut self, root: XmlNodeId) {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else {
                continue;
            };
            stack.extend(self.siblings(node.children));
            if let Some(props) = node.properties() {
                stack.extend(self.siblings(Some(props)));
            }
            if let Some(doc) = node.as_doc() {
                stack.extend(doc.int_subset);
                stack.extend(doc.ext_subset);
            }
            if node.element_type() == XmlElementType::XmlAttributeNode {
                self.remove_id_of(id);
            }
            let Some(node) = self.release(id) else {
                continue;
            };
            match node.variant {
                XmlNodeVariant::Node(fields) => {
                    if let Some(ns) = fields.ns_def {
                        self.free_ns_list(ns);
                    }
                }
                XmlNodeVariant::Doc(doc) => {
                    if let Some(ns) = doc.old_ns {
                        self.free_ns_list(ns);
                    }
                }
                _ => {}
            }
        }
    }

    /// Update all nodes under the tree to point to the right document.
    ///
    /// Names are re-interned in the dictionary of the new document if it has one.
    /// IDs registered in the old document are dropped from its index.
    #[doc(alias = "xmlSetTreeDoc")]
    pub fn set_tree_doc(&mut self, tree: XmlNodeId, doc: Option<XmlNodeId>) {
        let dict = doc
            .and_then(|doc| self.get(doc))
            .and_then(|doc| doc.as_doc())
            .and_then(|doc| doc.dict.clone());
        let mut stack = vec![tree];
        while let Some(id) = stack.pop() {
            let Some(node) = self.get(id) else {
                continue;
            };
            if matches!(
                node.element_type(),
                XmlElementType::XmlDocumentNode | XmlElementType::XmlHTMLDocumentNode
            ) {
                continue;
            }
            stack.extend(self.siblings(node.children));
            if let Some(props) = node.properties() {
                stack.extend(self.siblings(Some(props)));
            }
            if node.element_type() == XmlElementType::XmlAttributeNode && node.doc != doc {
                self.remove_id_of(id);
            }
            let Some(node) = self.get_mut(id) else {
                continue;
            };
            node.doc = doc;
            if let (Some(dict), Some(name)) = (dict.as_ref(), node.name.as_ref()) {
                if let Some(interned) = dict.borrow_mut().lookup(name) {
                    node.name = Some(interned);
                }
            }
        }
    }

    /// Update all nodes in the list to point to the right document.
    #[doc(alias = "xmlSetListDoc")]
    pub fn set_list_doc(&mut self, list: XmlNodeId, doc: Option<XmlNodeId>) {
        let list = self.siblings(Some(list)).collect::<Vec<_>>();
        for node in list {
            if self.document(node) != doc {
                self.set_tree_doc(node, doc);
            }
        }
    }
}

impl Default for XmlTree {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over a sibling chain.
pub struct Siblings<'a> {
    tree: &'a XmlTree,
    cur: Option<XmlNodeId>,
}

impl Iterator for Siblings<'_> {
    type Item = XmlNodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.cur?;
        self.cur = self.tree.next(cur);
        Some(cur)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stale_handles_are_rejected() {
        let mut tree = XmlTree::new();
        let a = tree.new_node(None, "a").unwrap();
        tree.free_node(a);
        assert!(!tree.contains(a));
        assert_eq!(tree.element_type(a), XmlElementType::XmlInvalidNode);
        let b = tree.new_node(None, "b").unwrap();
        assert_ne!(a, b);
        assert!(tree.get(a).is_none());
        assert_eq!(tree.name(b), Some("b"));
    }

    #[test]
    fn sibling_links_stay_consistent() {
        let mut tree = XmlTree::new();
        let parent = tree.new_node(None, "p").unwrap();
        let a = tree.new_node(None, "a").unwrap();
        let b = tree.new_node(None, "b").unwrap();
        let c = tree.new_node(None, "c").unwrap();
        tree.add_child(parent, a).unwrap();
        tree.add_child(parent, c).unwrap();
        tree.add_prev_sibling(c, b).unwrap();
        assert_eq!(tree.child_nodes(parent).collect::<Vec<_>>(), vec![a, b, c]);
        assert_eq!(tree.prev(a), None);
        assert_eq!(tree.last(parent), Some(c));

        tree.unlink(b);
        assert_eq!(tree.child_nodes(parent).collect::<Vec<_>>(), vec![a, c]);
        assert_eq!(tree.parent(b), None);
        assert_eq!(tree.next(b), None);
        assert_eq!(tree.prev(c), Some(a));

        tree.add_next_sibling(a, b).unwrap();
        assert_eq!(tree.child_nodes(parent).collect::<Vec<_>>(), vec![a, b, c]);
    }

    #[test]
    fn cycles_are_rejected() {
        let mut tree = XmlTree::new();
        let a = tree.new_node(None, "a").unwrap();
        let b = tree.new_node(None, "b").unwrap();
        tree.add_child(a, b).unwrap();
        assert_eq!(tree.add_child(b, a), Err(XmlParserErrors::XmlErrArgument));
        assert_eq!(tree.add_child(a, a), Err(XmlParserErrors::XmlErrArgument));
    }

    #[test]
    fn text_coalesces_with_neighbours() {
        let mut tree = XmlTree::new();
        let p = tree.new_node(None, "p").unwrap();
        let t1 = tree.new_text("a");
        let e = tree.new_node(None, "e").unwrap();
        let t2 = tree.new_text("c");
        tree.add_child(p, t1).unwrap();
        tree.add_child(p, e).unwrap();
        tree.add_child(p, t2).unwrap();

        let before = tree.new_text("b");
        let got = tree.add_prev_sibling(t2, before).unwrap();
        assert_eq!(got, t2);
        assert_eq!(tree.get_content(t2).as_deref(), Some("bc"));
        assert!(!tree.contains(before));

        let after = tree.new_text("!");
        let got = tree.add_next_sibling(e, after).unwrap();
        assert_eq!(got, t2);
        assert_eq!(tree.get_content(t2).as_deref(), Some("!bc"));
        assert_eq!(tree.child_nodes(p).count(), 3);
    }

    #[test]
    fn replace_returns_detached_old_node() {
        let mut tree = XmlTree::new();
        let p = tree.new_node(None, "p").unwrap();
        let a = tree.new_node(None, "a").unwrap();
        let b = tree.new_node(None, "b").unwrap();
        tree.add_child(p, a).unwrap();
        let old = tree.replace_node(a, Some(b)).unwrap();
        assert_eq!(old, a);
        assert_eq!(tree.parent(a), None);
        assert_eq!(tree.children(p), Some(b));
        assert_eq!(tree.last(p), Some(b));
    }

    #[test]
    fn deep_trees_are_freed_without_recursion() {
        let mut tree = XmlTree::new();
        let root = tree.new_node(None, "r").unwrap();
        let mut cur = root;
        for _ in 0..100_000 {
            let child = tree.new_node(None, "d").unwrap();
            tree.add_child(cur, child).unwrap();
            cur = child;
        }
        tree.free_node(root);
        assert_eq!(tree.node_count(), 0);
    }

    #[test]
    fn hooks_fire_on_create_and_free() {
        use std::cell::Cell;
        thread_local! {
            static CREATED: Cell<usize> = const { Cell::new(0) };
            static FREED: Cell<usize> = const { Cell::new(0) };
        }
        fn on_create(_: &XmlTree, _: XmlNodeId) {
            CREATED.with(|c| c.set(c.get() + 1));
        }
        fn on_free(tree: &XmlTree, id: XmlNodeId) {
            assert!(tree.contains(id));
            FREED.with(|c| c.set(c.get() + 1));
        }
        let mut tree = XmlTree::with_hooks(XmlTreeHooks {
            register: Some(on_create),
            deregister: Some(on_free),
        });
        let a = tree.new_node(None, "a").unwrap();
        let t = tree.new_text("x");
        tree.add_child(a, t).unwrap();
        tree.free_node(a);
        assert_eq!(CREATED.with(|c| c.get()), 2);
        assert_eq!(FREED.with(|c| c.get()), 2);
    }
}
