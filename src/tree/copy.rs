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

use crate::error::{XmlParserErrors, xml_tree_err};

use super::{XmlElementType, XmlElementTypeVal, XmlNodeFields, XmlNodeId, XmlTree, build_qname};

impl XmlTree {
    /// The outermost element among `node` and its ancestors.
    fn topmost_element(&self, node: XmlNodeId) -> XmlNodeId {
        let mut root = node;
        while let Some(parent) = self
            .parent(root)
            .filter(|&p| self.element_type(p) == XmlElementType::XmlElementNode)
        {
            root = parent;
        }
        root
    }

    /// Copy `node` alone, then link the copy as last child of `parent`.
    ///
    /// The flag is `false` when a TEXT copy was merged into the previous
    /// child of `parent`, which is then returned instead.
    fn copy_one(
        &mut self,
        node: XmlNodeId,
        doc: Option<XmlNodeId>,
        parent: Option<XmlNodeId>,
        extended: i32,
    ) -> Result<(XmlNodeId, bool), XmlParserErrors> {
        let Some(src) = self.get(node) else {
            return Err(XmlParserErrors::XmlErrArgument);
        };
        let typ = src.element_type();
        let (Some(fields), name) = (src.as_node_fields(), src.name().map(str::to_owned)) else {
            return Err(xml_tree_err(
                XmlParserErrors::XmlErrArgument,
                Some(node),
                "node can't be copied",
            ));
        };
        let keep_content = !matches!(
            typ,
            XmlElementType::XmlElementNode
                | XmlElementType::XmlEntityRefNode
                | XmlElementType::XmlXIncludeStart
                | XmlElementType::XmlXIncludeEnd
        );
        let mut copied = XmlNodeFields {
            content: keep_content.then(|| fields.content.clone()).flatten(),
            extra: fields.extra,
            ..Default::default()
        };
        if typ == XmlElementType::XmlElementNode {
            copied.line = fields.line;
        }
        let src_ns = fields.ns;
        let src_ns_def = fields.ns_def;
        let src_props = fields.properties;
        let src_entity = fields.entity;
        let src_doc = src.document();

        let ret = self.new_node_in(typ, doc, name.as_deref(), copied);
        if let Some(parent) = parent {
            match self.add_child(parent, ret) {
                Ok(linked) if linked != ret => return Ok((linked, false)),
                Ok(_) => {}
                Err(err) => {
                    self.free_node(ret);
                    return Err(err);
                }
            }
        }

        if typ == XmlElementType::XmlEntityRefNode {
            let entity = match doc {
                Some(doc) if src_doc != Some(doc) => {
                    name.as_deref().and_then(|name| self.get_doc_entity(doc, name))
                }
                _ => src_entity,
            };
            if let Some(fields) = self.get_mut(ret).and_then(|n| n.as_node_fields_mut()) {
                fields.entity = entity;
            }
        }

        if typ != XmlElementType::XmlElementNode || extended == 0 {
            return Ok((ret, true));
        }
        if let Some(head) = src_ns_def {
            let defs = self.copy_namespace_list(head);
            if let Some(fields) = self.get_mut(ret).and_then(|n| n.as_node_fields_mut()) {
                fields.ns_def = defs;
            }
            let mut cur = defs;
            while let Some(ns) = cur {
                if let Some(ns) = self.ns_mut(ns) {
                    ns.context = doc;
                    cur = ns.next;
                } else {
                    break;
                }
            }
        }
        if let Some(src_ns) = src_ns {
            let prefix = self.ns(src_ns).and_then(|ns| ns.prefix()).map(str::to_owned);
            let resolved = match self.search_ns(doc, Some(ret), prefix.as_deref()) {
                Some(ns) => Some(ns),
                None => match self.lookup_ns_by_prefix(node, prefix.as_deref()) {
                    Some(orig) => {
                        // declare it on the outermost copied element
                        let href = self.ns(orig).map(|ns| ns.href().to_owned()).unwrap_or_default();
                        let root = self.topmost_element(ret);
                        self.new_ns(Some(root), &href, prefix.as_deref())
                    }
                    None => self.new_reconciled_ns(doc, ret, src_ns),
                },
            };
            self.set_ns(ret, resolved);
        }
        if let Some(first) = src_props {
            if let Err(err) = self.copy_prop_list(Some(ret), first) {
                self.free_node(ret);
                return Err(err);
            }
        }
        Ok((ret, true))
    }

    /// Copy `node` with its whole subtree, without recursion.
    fn static_copy_node(
        &mut self,
        node: XmlNodeId,
        doc: Option<XmlNodeId>,
        parent: Option<XmlNodeId>,
        extended: i32,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        match self.element_type(node) {
            XmlElementType::XmlAttributeNode => {
                return self.copy_prop_internal(doc, parent, node);
            }
            XmlElementType::XmlDocumentNode | XmlElementType::XmlHTMLDocumentNode => {
                return self.copy_doc(node, extended != 0);
            }
            XmlElementType::XmlDTDNode
            | XmlElementType::XmlDocumentTypeNode
            | XmlElementType::XmlNotationNode
            | XmlElementType::XmlElementDecl
            | XmlElementType::XmlAttributeDecl
            | XmlElementType::XmlEntityDecl
            | XmlElementType::XmlNamespaceDecl => {
                return Err(xml_tree_err(
                    XmlParserErrors::XmlErrArgument,
                    Some(node),
                    "declarations can't be copied as nodes",
                ));
            }
            _ => {}
        }
        let (ret, fresh) = self.copy_one(node, doc, parent, extended)?;
        if !fresh || extended != 1 || self.element_type(node) == XmlElementType::XmlEntityRefNode {
            return Ok(ret);
        }
        if let Some(first) = self.children(node) {
            let ret_doc = self.document(ret);
            if let Err(err) = self.copy_children_into(first, ret_doc, ret) {
                self.free_node(ret);
                return Err(err);
            }
        }
        Ok(ret)
    }

    /// Copy `first` and its following siblings, with their subtrees,
    /// as children of `parent`.
    fn copy_children_into(
        &mut self,
        first: XmlNodeId,
        doc: Option<XmlNodeId>,
        parent: XmlNodeId,
    ) -> Result<(), XmlParserErrors> {
        let mut stack = self
            .siblings(Some(first))
            .map(|src| (src, parent))
            .collect::<Vec<_>>();
        stack.reverse();
        while let Some((src, dst)) = stack.pop() {
            match self.element_type(src) {
                XmlElementType::XmlDTDNode => {
                    self.copy_subset_into(src, doc, Some(dst))?;
                    continue;
                }
                XmlElementType::XmlAttributeNode => continue,
                _ => {}
            }
            let (copy, fresh) = self.copy_one(src, doc, Some(dst), 1)?;
            if !fresh || self.element_type(src) == XmlElementType::XmlEntityRefNode {
                continue;
            }
            let children = self.siblings(self.children(src)).collect::<Vec<_>>();
            stack.extend(children.into_iter().rev().map(|child| (child, copy)));
        }
        Ok(())
    }

    /// Handle a DTD met while copying a node list into `doc`.
    ///
    /// The source subset is copied when `doc` has none yet. A subset that
    /// `doc` owns but that is not linked yet is linked at this position.
    fn copy_subset_into(
        &mut self,
        dtd: XmlNodeId,
        doc: Option<XmlNodeId>,
        parent: Option<XmlNodeId>,
    ) -> Result<Option<XmlNodeId>, XmlParserErrors> {
        let Some(doc) = doc.filter(|&doc| self.doc(doc).is_some()) else {
            return Ok(None);
        };
        let subset = match self.doc(doc).and_then(|d| d.int_subset) {
            Some(existing) if self.parent(existing).is_none() => existing,
            Some(_) => return Ok(None),
            None => {
                let copy = self.copy_dtd_in(dtd, Some(doc))?;
                if let Some(d) = self.doc_mut(doc) {
                    d.int_subset = Some(copy);
                }
                copy
            }
        };
        if let Some(parent) = parent {
            self.set_parent(subset, Some(parent));
            self.append_child_link(parent, subset);
        }
        Ok(Some(subset))
    }

    fn static_copy_node_list(
        &mut self,
        node: XmlNodeId,
        doc: Option<XmlNodeId>,
    ) -> Result<Option<XmlNodeId>, XmlParserErrors> {
        let mut first: Option<XmlNodeId> = None;
        let mut last: Option<XmlNodeId> = None;
        let list = self.siblings(Some(node)).collect::<Vec<_>>();
        for src in list {
            let copy = if self.element_type(src) == XmlElementType::XmlDTDNode {
                match self.copy_subset_into(src, doc, None)? {
                    Some(copy) => copy,
                    None => continue,
                }
            } else {
                match self.static_copy_node(src, doc, None, 1) {
                    Ok(copy) => copy,
                    Err(err) => {
                        if let Some(first) = first {
                            self.free_node_list(first);
                        }
                        return Err(err);
                    }
                }
            };
            match last {
                Some(last) => {
                    self.set_next(last, Some(copy));
                    self.set_prev(copy, Some(last));
                }
                None => first = Some(copy),
            }
            last = Some(copy);
        }
        Ok(first)
    }

    /// Do a copy of the node.
    ///
    /// `extended` selects what is copied:
    /// - `0`: the node alone
    /// - `1`: the node with its properties, namespaces and children
    /// - `2`: the node with its properties and namespaces, no children
    ///
    /// DTD and declaration nodes can't be copied this way.
    #[doc(alias = "xmlCopyNode")]
    pub fn copy_node(&mut self, node: XmlNodeId, extended: i32) -> Result<XmlNodeId, XmlParserErrors> {
        self.static_copy_node(node, None, None, extended)
    }

    /// Do a copy of the node to a given document.
    ///
    /// See [`XmlTree::copy_node`] for the meaning of `extended`.
    #[doc(alias = "xmlDocCopyNode")]
    pub fn doc_copy_node(
        &mut self,
        node: XmlNodeId,
        doc: Option<XmlNodeId>,
        extended: i32,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        self.static_copy_node(node, doc, None, extended)
    }

    /// Do a recursive copy of the node list.
    ///
    /// Returns the first node of the copied list, `None` if nothing was copied.
    #[doc(alias = "xmlCopyNodeList")]
    pub fn copy_node_list(&mut self, node: XmlNodeId) -> Result<Option<XmlNodeId>, XmlParserErrors> {
        self.static_copy_node_list(node, None)
    }

    /// Do a recursive copy of the node list into `doc`.
    #[doc(alias = "xmlDocCopyNodeList")]
    pub fn doc_copy_node_list(
        &mut self,
        doc: Option<XmlNodeId>,
        node: XmlNodeId,
    ) -> Result<Option<XmlNodeId>, XmlParserErrors> {
        self.static_copy_node_list(node, doc)
    }

    fn copy_prop_internal(
        &mut self,
        doc: Option<XmlNodeId>,
        target: Option<XmlNodeId>,
        cur: XmlNodeId,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        if self.element_type(cur) != XmlElementType::XmlAttributeNode {
            return Err(XmlParserErrors::XmlErrArgument);
        }
        if target.is_some_and(|t| self.element_type(t) != XmlElementType::XmlElementNode) {
            return Err(xml_tree_err(
                XmlParserErrors::XmlTreeWrongParent,
                target,
                "attributes can only be copied to elements",
            ));
        }
        let target_doc = match target {
            Some(target) => self.document(target),
            None => doc,
        };
        let name = self.name(cur).unwrap_or("").to_owned();
        let ret = self.new_doc_prop(target_doc, &name, None)?;
        self.set_parent(ret, target);

        let src_ns = self.get(cur).and_then(|n| n.ns());
        if let (Some(src_ns), Some(target)) = (src_ns, target) {
            let prefix = self.ns(src_ns).and_then(|ns| ns.prefix()).map(str::to_owned);
            let src_href = self.ns(src_ns).map(|ns| ns.href().to_owned());
            let ns = match self.search_ns(target_doc, Some(target), prefix.as_deref()) {
                Some(found) if self.ns(found).map(|ns| ns.href()) == src_href.as_deref() => {
                    Some(found)
                }
                // the prefix is bound to another name here
                Some(_) => self.new_reconciled_ns(target_doc, target, src_ns),
                None => {
                    let orig = self.parent(cur).and_then(|p| {
                        let doc = self.document(cur);
                        self.search_ns(doc, Some(p), prefix.as_deref())
                    });
                    match orig {
                        Some(orig) => {
                            let href = self.ns(orig).map(|ns| ns.href().to_owned()).unwrap_or_default();
                            let root = self.topmost_element(target);
                            self.new_ns(Some(root), &href, prefix.as_deref())
                        }
                        None => None,
                    }
                }
            };
            if let Some(attr) = self.get_mut(ret).and_then(|n| n.as_attr_mut()) {
                attr.ns = ns;
            }
        }

        if let Some(first) = self.children(cur) {
            let list = self.static_copy_node_list(first, target_doc)?;
            if let Some(list) = list {
                self.link_children(ret, list);
            }
        }

        // carry over the ID status when copying to an element of a document
        let Some(tdoc) = target.and(target_doc) else {
            return Ok(ret);
        };
        let src_doc = self.document(cur);
        if let (Some(sdoc), Some(owner)) = (src_doc, self.parent(cur)) {
            if self.is_id(sdoc, Some(owner), cur) {
                let value = self
                    .children(cur)
                    .map(|first| self.node_list_get_string(Some(sdoc), first, true))
                    .unwrap_or_default();
                if !value.is_empty() && self.get_id(tdoc, &value).is_none() {
                    // Failures are reported through the error channel.
                    self.add_id(tdoc, &value, ret).ok();
                }
            }
        }
        Ok(ret)
    }

    /// Do a copy of the attribute.
    ///
    /// The copy is bound to the namespaces in scope on `target` but is not
    /// added to its attribute list.
    #[doc(alias = "xmlCopyProp")]
    pub fn copy_prop(
        &mut self,
        target: Option<XmlNodeId>,
        cur: XmlNodeId,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        self.copy_prop_internal(None, target, cur)
    }

    /// Do a copy of an attribute list, appended to the attributes of `target`.
    ///
    /// Returns the first copied attribute.
    #[doc(alias = "xmlCopyPropList")]
    pub fn copy_prop_list(
        &mut self,
        target: Option<XmlNodeId>,
        cur: XmlNodeId,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        if target.is_some_and(|t| self.element_type(t) != XmlElementType::XmlElementNode) {
            return Err(xml_tree_err(
                XmlParserErrors::XmlTreeWrongParent,
                target,
                "attributes can only be copied to elements",
            ));
        }
        let list = self.siblings(Some(cur)).collect::<Vec<_>>();
        let mut first = None;
        let mut last: Option<XmlNodeId> = None;
        for attr in list {
            let copy = self.copy_prop_internal(None, target, attr)?;
            match target {
                Some(target) => self.append_property(target, copy),
                None => {
                    if let Some(last) = last {
                        self.set_next(last, Some(copy));
                        self.set_prev(copy, Some(last));
                    }
                }
            }
            first.get_or_insert(copy);
            last = Some(copy);
        }
        first.ok_or(XmlParserErrors::XmlErrArgument)
    }

    fn copy_dtd_in(
        &mut self,
        dtd: XmlNodeId,
        doc: Option<XmlNodeId>,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        let Some(src) = self.dtd(dtd) else {
            return Err(XmlParserErrors::XmlErrArgument);
        };
        let external_id = src.external_id.clone();
        let system_id = src.system_id.clone();
        let notations = src.notations.clone();
        let name = self.name(dtd).map(str::to_owned);
        let ret = self.new_dtd(None, name.as_deref(), external_id.as_deref(), system_id.as_deref())?;
        if let Some(node) = self.get_mut(ret) {
            node.doc = doc;
        }
        if let Some(d) = self.dtd_mut(ret) {
            d.notations = notations;
        }

        let children = self.siblings(self.children(dtd)).collect::<Vec<_>>();
        for cur in children {
            let Some(node) = self.get(cur) else {
                continue;
            };
            let name = node.name().unwrap_or("").to_owned();
            match node.element_type() {
                XmlElementType::XmlEntityDecl => {
                    let Some(ent) = node.as_entity_decl().cloned() else {
                        continue;
                    };
                    if let Ok(copy) = self.add_entity(
                        ret,
                        &name,
                        ent.etype,
                        ent.external_id.as_deref(),
                        ent.system_id.as_deref(),
                        ent.content.as_deref(),
                    ) {
                        if let Some(e) = self.get_mut(copy).and_then(|n| n.as_entity_decl_mut()) {
                            e.orig = ent.orig;
                            e.uri = ent.uri;
                        }
                    }
                }
                XmlElementType::XmlElementDecl => {
                    let Some(decl) = node.as_element_decl().cloned() else {
                        continue;
                    };
                    if decl.etype == XmlElementTypeVal::XmlElementTypeUndefined {
                        continue;
                    }
                    let qname = build_qname(&name, decl.prefix.as_deref(), None).into_owned();
                    self.add_element_decl(ret, &qname, decl.etype, decl.content.as_ref())?;
                }
                XmlElementType::XmlAttributeDecl => {
                    let Some(decl) = node.as_attribute_decl().cloned() else {
                        continue;
                    };
                    self.add_attribute_decl(
                        ret,
                        &decl.elem,
                        &name,
                        decl.prefix.as_deref(),
                        decl.atype,
                        decl.def,
                        decl.default_value.as_deref(),
                        decl.tree,
                    )?;
                }
                XmlElementType::XmlCommentNode | XmlElementType::XmlPINode => {
                    let (copy, _) = self.copy_one(cur, doc, None, 0)?;
                    self.set_parent(copy, Some(ret));
                    self.append_child_link(ret, copy);
                }
                _ => {}
            }
        }
        Ok(ret)
    }

    /// Do a copy of the DTD.
    ///
    /// The copy belongs to no document until it is attached to one.
    #[doc(alias = "xmlCopyDtd")]
    pub fn copy_dtd(&mut self, dtd: XmlNodeId) -> Result<XmlNodeId, XmlParserErrors> {
        self.copy_dtd_in(dtd, None)
    }

    /// Do a copy of the document info.
    ///
    /// If `recursive`, the content tree, the internal subset and the IDs are
    /// copied too and namespaces are reconciled in the copy.
    #[doc(alias = "xmlCopyDoc")]
    pub fn copy_doc(&mut self, doc: XmlNodeId, recursive: bool) -> Result<XmlNodeId, XmlParserErrors> {
        let typ = self.element_type(doc);
        let Some(src) = self.doc(doc) else {
            return Err(XmlParserErrors::XmlErrArgument);
        };
        let version = src.version.clone();
        let encoding = src.encoding.clone();
        let url = src.url.clone();
        let compression = src.compression;
        let standalone = src.standalone;
        let parse_flags = src.parse_flags;
        let properties = src.properties;
        let old_ns = src.old_ns;
        let int_subset = src.int_subset;
        let name = self.name(doc).map(str::to_owned);

        let ret = self.new_doc_internal(typ, version.as_deref());
        if let Some(name) = name {
            let name = self.intern_name(None, &name);
            if let Some(node) = self.get_mut(ret) {
                node.name = Some(name);
            }
        }
        if let Some(d) = self.doc_mut(ret) {
            d.encoding = encoding;
            d.url = url;
            d.compression = compression;
            d.standalone = standalone;
            d.parse_flags = parse_flags;
            d.properties = properties;
        }
        if let Some(old_ns) = old_ns {
            let copy = self.copy_namespace_list(old_ns);
            if let Some(d) = self.doc_mut(ret) {
                d.old_ns = copy;
            }
        }
        if !recursive {
            return Ok(ret);
        }

        if let Some(int_subset) = int_subset {
            let copy = match self.copy_dtd_in(int_subset, Some(ret)) {
                Ok(copy) => copy,
                Err(err) => {
                    self.free_doc(ret);
                    return Err(err);
                }
            };
            if let Some(d) = self.doc_mut(ret) {
                d.int_subset = Some(copy);
            }
        }
        if let Some(first) = self.children(doc) {
            if let Err(err) = self.copy_children_into(first, Some(ret), ret) {
                self.free_doc(ret);
                return Err(err);
            }
        }
        let roots = self
            .siblings(self.children(ret))
            .filter(|&c| self.element_type(c) == XmlElementType::XmlElementNode)
            .collect::<Vec<_>>();
        for root in roots {
            // Failures are reported through the error channel.
            self.reconciliate_ns(Some(ret), root).ok();
        }
        Ok(ret)
    }
}

#[cfg(test)]
mod tests {
    use crate::tree::{XmlAttributeDefault, XmlAttributeType, XmlElementType, XmlTree};

    #[test]
    fn shallow_and_deep_copies() {
        let mut tree = XmlTree::default();
        let doc = tree.new_doc(None);
        let root = tree.new_doc_node(Some(doc), None, "root", None).unwrap();
        tree.set_root_element(doc, root).unwrap();
        tree.set_prop(root, "a", Some("1")).unwrap();
        let child = tree.new_child(root, None, "child", Some("text")).unwrap();

        let shallow = tree.copy_node(root, 0).unwrap();
        assert_eq!(tree.name(shallow), Some("root"));
        assert!(tree.children(shallow).is_none());
        assert!(tree.get(shallow).unwrap().properties().is_none());

        let no_children = tree.doc_copy_node(root, Some(doc), 2).unwrap();
        assert_eq!(tree.get_prop(no_children, "a").as_deref(), Some("1"));
        assert!(tree.children(no_children).is_none());

        let deep = tree.doc_copy_node(root, Some(doc), 1).unwrap();
        assert_eq!(tree.document(deep), Some(doc));
        let copied_child = tree.children(deep).unwrap();
        assert_ne!(copied_child, child);
        assert_eq!(tree.get_content(copied_child).as_deref(), Some("text"));
        assert_eq!(tree.parent(copied_child), Some(deep));
    }

    #[test]
    fn namespaces_follow_the_copy() {
        let mut tree = XmlTree::default();
        let doc = tree.new_doc(None);
        let root = tree.new_doc_node(Some(doc), None, "root", None).unwrap();
        tree.set_root_element(doc, root).unwrap();
        let ns = tree.new_ns(Some(root), "urn:a", Some("a")).unwrap();
        let inner = tree.new_child(root, Some(ns), "inner", None).unwrap();

        // the declaration lives on the source root, outside the copied subtree
        let copy = tree.copy_node(inner, 1).unwrap();
        let copy_ns = tree.get(copy).unwrap().ns().unwrap();
        assert_ne!(copy_ns, ns);
        assert_eq!(tree.ns(copy_ns).unwrap().href(), "urn:a");
        assert_eq!(tree.ns(copy_ns).unwrap().prefix(), Some("a"));
        assert_eq!(tree.get(copy).unwrap().ns_def(), Some(copy_ns));
    }

    #[test]
    fn list_copy_without_parent() {
        let mut tree = XmlTree::default();
        let doc = tree.new_doc(None);
        let root = tree.new_doc_node(Some(doc), None, "root", None).unwrap();
        let first = tree.new_doc_comment(Some(doc), "one");
        let second = tree.new_doc_node(Some(doc), None, "two", None).unwrap();
        tree.add_child(root, first).unwrap();
        tree.add_child(root, second).unwrap();

        let list = tree.copy_node_list(first).unwrap().unwrap();
        assert_eq!(tree.element_type(list), XmlElementType::XmlCommentNode);
        let next = tree.next(list).unwrap();
        assert_eq!(tree.name(next), Some("two"));
        assert_eq!(tree.prev(next), Some(list));
        assert!(tree.parent(list).is_none());
    }

    #[test]
    fn attribute_copy_registers_ids() {
        let mut tree = XmlTree::default();
        let doc = tree.new_doc(None);
        let root = tree.new_doc_node(Some(doc), None, "root", None).unwrap();
        tree.set_root_element(doc, root).unwrap();
        let dtd = tree.create_int_subset(doc, Some("root"), None, None).unwrap();
        tree.add_attribute_decl(
            dtd,
            "root",
            "key",
            None,
            XmlAttributeType::XmlAttributeID,
            XmlAttributeDefault::XmlAttributeImplied,
            None,
            None,
        )
        .unwrap();
        let attr = tree.set_prop(root, "key", Some("k1")).unwrap();
        tree.add_id(doc, "k1", attr).unwrap();

        let other = tree.new_doc(None);
        let target = tree.new_doc_node(Some(other), None, "target", None).unwrap();
        tree.set_root_element(other, target).unwrap();
        let copy = tree.copy_prop(Some(target), attr).unwrap();
        assert_eq!(tree.get_id(other, "k1"), Some(copy));
        assert!(tree.get_prop(target, "key").is_none());

        let first = tree.copy_prop_list(Some(target), attr).unwrap();
        assert_eq!(tree.get_prop(target, "key").as_deref(), Some("k1"));
        assert_eq!(tree.parent(first), Some(target));
    }

    #[test]
    fn document_copy() {
        let mut tree = XmlTree::default();
        let doc = tree.new_doc(None);
        let dtd = tree.create_int_subset(doc, Some("root"), None, Some("root.dtd")).unwrap();
        tree.add_notation_decl(dtd, "gif", None, Some("image/gif")).unwrap();
        let root = tree.new_doc_node(Some(doc), None, "root", Some("body")).unwrap();
        tree.set_root_element(doc, root).unwrap();

        let shallow = tree.copy_doc(doc, false).unwrap();
        assert!(tree.children(shallow).is_none());
        assert_eq!(tree.doc(shallow).unwrap().version(), Some("1.0"));

        let deep = tree.copy_doc(doc, true).unwrap();
        let subset = tree.get_int_subset(deep).unwrap();
        assert_ne!(subset, dtd);
        assert_eq!(tree.children(deep), Some(subset));
        assert!(tree.get_dtd_notation_desc(subset, "gif").is_some());
        let new_root = tree.get_root_element(deep).unwrap();
        assert_eq!(tree.get_content(new_root).as_deref(), Some("body"));
        assert_eq!(tree.document(new_root), Some(deep));

        tree.free_doc(deep);
        assert!(tree.get(subset).is_none());
        assert!(tree.get(root).is_some());
    }
}
