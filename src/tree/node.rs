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

use crate::{
    buf::XmlBuf,
    error::{XmlParserErrors, xml_tree_err},
    uri::build_uri,
};

use super::{
    XML_STRING_COMMENT, XML_STRING_TEXT, XML_XML_NAMESPACE, XmlAttr, XmlAttribute, XmlBuffer,
    XmlDoc, XmlDtd, XmlElement, XmlElementType, XmlEntity, XmlNodeId, XmlNsId, XmlTree,
    get_predefined_entity, xml_is_blank_char,
};

/// Fields shared by elements, character data, references, comments,
/// processing instructions and fragments.
#[derive(Debug, Default)]
pub struct XmlNodeFields {
    pub(crate) ns: Option<XmlNsId>,
    pub(crate) content: Option<String>,
    pub(crate) properties: Option<XmlNodeId>,
    pub(crate) ns_def: Option<XmlNsId>,
    pub(crate) psvi: Option<Rc<dyn Any>>,
    pub(crate) line: u32,
    pub(crate) extra: u16,
    // declaration bound by an entity reference, never owned
    pub(crate) entity: Option<XmlNodeId>,
}

/// The kind specific part of a node.
#[derive(Debug)]
pub enum XmlNodeVariant {
    Node(XmlNodeFields),
    Attr(XmlAttr),
    Doc(Box<XmlDoc>),
    Dtd(Box<XmlDtd>),
    ElementDecl(Box<XmlElement>),
    AttributeDecl(Box<XmlAttribute>),
    EntityDecl(Box<XmlEntity>),
}

/// A node in an XML tree.
///
/// Every kind of node shares the same linkage, so generic traversal does not
/// depend on the node type. Links are handles into the owning [`XmlTree`].
#[derive(Debug)]
pub struct XmlNode {
    pub(crate) private: Option<Rc<dyn Any>>,
    pub(crate) typ: XmlElementType,
    pub(crate) name: Option<Rc<str>>,
    pub(crate) children: Option<XmlNodeId>,
    pub(crate) last: Option<XmlNodeId>,
    pub(crate) parent: Option<XmlNodeId>,
    pub(crate) next: Option<XmlNodeId>,
    pub(crate) prev: Option<XmlNodeId>,
    pub(crate) doc: Option<XmlNodeId>,
    pub(crate) variant: XmlNodeVariant,
}

impl XmlNode {
    pub(crate) fn new(typ: XmlElementType, name: Option<Rc<str>>, variant: XmlNodeVariant) -> Self {
        Self {
            private: None,
            typ,
            name,
            children: None,
            last: None,
            parent: None,
            next: None,
            prev: None,
            doc: None,
            variant,
        }
    }

    pub fn element_type(&self) -> XmlElementType {
        self.typ
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The name as stored, shared with the document dictionary if any.
    pub fn name_rc(&self) -> Option<&Rc<str>> {
        self.name.as_ref()
    }

    pub fn children(&self) -> Option<XmlNodeId> {
        self.children
    }

    pub fn last(&self) -> Option<XmlNodeId> {
        self.last
    }

    pub fn parent(&self) -> Option<XmlNodeId> {
        self.parent
    }

    pub fn next(&self) -> Option<XmlNodeId> {
        self.next
    }

    pub fn prev(&self) -> Option<XmlNodeId> {
        self.prev
    }

    pub fn document(&self) -> Option<XmlNodeId> {
        self.doc
    }

    pub fn private(&self) -> Option<&Rc<dyn Any>> {
        self.private.as_ref()
    }

    /// The stored content of character data, comments, PIs and entity declarations.
    ///
    /// This does not synthesize anything for elements. Use [`XmlTree::get_content`] for it.
    pub fn content(&self) -> Option<&str> {
        match &self.variant {
            XmlNodeVariant::Node(fields) => fields.content.as_deref(),
            XmlNodeVariant::EntityDecl(ent) => ent.content.as_deref(),
            _ => None,
        }
    }

    /// The namespace of an element or an attribute.
    pub fn ns(&self) -> Option<XmlNsId> {
        match &self.variant {
            XmlNodeVariant::Node(fields) => fields.ns,
            XmlNodeVariant::Attr(attr) => attr.ns,
            _ => None,
        }
    }

    /// The first attribute of an element.
    pub fn properties(&self) -> Option<XmlNodeId> {
        self.as_node_fields().and_then(|fields| fields.properties)
    }

    /// The first namespace declared on an element.
    pub fn ns_def(&self) -> Option<XmlNsId> {
        self.as_node_fields().and_then(|fields| fields.ns_def)
    }

    pub fn line(&self) -> u32 {
        self.as_node_fields().map_or(0, |fields| fields.line)
    }

    pub fn psvi(&self) -> Option<&Rc<dyn Any>> {
        match &self.variant {
            XmlNodeVariant::Node(fields) => fields.psvi.as_ref(),
            XmlNodeVariant::Attr(attr) => attr.psvi.as_ref(),
            XmlNodeVariant::Doc(doc) => doc.psvi.as_ref(),
            _ => None,
        }
    }

    /// The entity declaration bound to an entity reference.
    pub fn entity(&self) -> Option<XmlNodeId> {
        self.as_node_fields().and_then(|fields| fields.entity)
    }

    pub fn as_node_fields(&self) -> Option<&XmlNodeFields> {
        match &self.variant {
            XmlNodeVariant::Node(fields) => Some(fields),
            _ => None,
        }
    }

    pub(crate) fn as_node_fields_mut(&mut self) -> Option<&mut XmlNodeFields> {
        match &mut self.variant {
            XmlNodeVariant::Node(fields) => Some(fields),
            _ => None,
        }
    }

    pub fn as_attr(&self) -> Option<&XmlAttr> {
        match &self.variant {
            XmlNodeVariant::Attr(attr) => Some(attr),
            _ => None,
        }
    }

    pub(crate) fn as_attr_mut(&mut self) -> Option<&mut XmlAttr> {
        match &mut self.variant {
            XmlNodeVariant::Attr(attr) => Some(attr),
            _ => None,
        }
    }

    pub fn as_doc(&self) -> Option<&XmlDoc> {
        match &self.variant {
            XmlNodeVariant::Doc(doc) => Some(doc),
            _ => None,
        }
    }

    pub(crate) fn as_doc_mut(&mut self) -> Option<&mut XmlDoc> {
        match &mut self.variant {
            XmlNodeVariant::Doc(doc) => Some(doc),
            _ => None,
        }
    }

    pub fn as_dtd(&self) -> Option<&XmlDtd> {
        match &self.variant {
            XmlNodeVariant::Dtd(dtd) => Some(dtd),
            _ => None,
        }
    }

    pub(crate) fn as_dtd_mut(&mut self) -> Option<&mut XmlDtd> {
        match &mut self.variant {
            XmlNodeVariant::Dtd(dtd) => Some(dtd),
            _ => None,
        }
    }

    pub fn as_element_decl(&self) -> Option<&XmlElement> {
        match &self.variant {
            XmlNodeVariant::ElementDecl(elem) => Some(elem),
            _ => None,
        }
    }

    pub(crate) fn as_element_decl_mut(&mut self) -> Option<&mut XmlElement> {
        match &mut self.variant {
            XmlNodeVariant::ElementDecl(elem) => Some(elem),
            _ => None,
        }
    }

    pub fn as_attribute_decl(&self) -> Option<&XmlAttribute> {
        match &self.variant {
            XmlNodeVariant::AttributeDecl(attr) => Some(attr),
            _ => None,
        }
    }

    pub fn as_entity_decl(&self) -> Option<&XmlEntity> {
        match &self.variant {
            XmlNodeVariant::EntityDecl(ent) => Some(ent),
            _ => None,
        }
    }

    pub(crate) fn as_entity_decl_mut(&mut self) -> Option<&mut XmlEntity> {
        match &mut self.variant {
            XmlNodeVariant::EntityDecl(ent) => Some(ent),
            _ => None,
        }
    }

    /// Check whether this node is a Text node or not.
    #[doc(alias = "xmlNodeIsText")]
    pub fn is_text_node(&self) -> bool {
        self.typ == XmlElementType::XmlTextNode
    }
}

fn is_line_carrier(typ: XmlElementType) -> bool {
    matches!(
        typ,
        XmlElementType::XmlElementNode
            | XmlElementType::XmlTextNode
            | XmlElementType::XmlCommentNode
            | XmlElementType::XmlPINode
    )
}

/// Pre-order iterator over a subtree, attributes excluded.
pub struct Descendants<'a> {
    tree: &'a XmlTree,
    root: XmlNodeId,
    cur: Option<XmlNodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = XmlNodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let cur = self.cur?;
        self.cur = if let Some(child) = self.tree.children(cur) {
            Some(child)
        } else {
            let mut now = cur;
            loop {
                if now == self.root {
                    break None;
                }
                if let Some(next) = self.tree.next(now) {
                    break Some(next);
                }
                match self.tree.parent(now) {
                    Some(parent) => now = parent,
                    None => break None,
                }
            }
        };
        Some(cur)
    }
}

impl XmlTree {
    /// Iterate `root` and all its descendants in document order.
    pub fn descendants(&self, root: XmlNodeId) -> Descendants<'_> {
        Descendants {
            tree: self,
            root,
            cur: self.contains(root).then_some(root),
        }
    }

    pub(crate) fn intern_name(&self, doc: Option<XmlNodeId>, name: &str) -> Rc<str> {
        doc.and_then(|doc| self.get(doc))
            .and_then(|doc| doc.as_doc())
            .and_then(|doc| doc.dict.as_ref())
            .and_then(|dict| dict.borrow_mut().lookup(name))
            .unwrap_or_else(|| Rc::from(name))
    }

    pub(crate) fn new_node_in(
        &mut self,
        typ: XmlElementType,
        doc: Option<XmlNodeId>,
        name: Option<&str>,
        fields: XmlNodeFields,
    ) -> XmlNodeId {
        let name = name.map(|name| self.intern_name(doc, name));
        let mut node = XmlNode::new(typ, name, XmlNodeVariant::Node(fields));
        node.doc = doc;
        self.alloc(node)
    }

    fn new_element_in(
        &mut self,
        doc: Option<XmlNodeId>,
        ns: Option<XmlNsId>,
        name: &str,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        if name.is_empty() {
            return Err(xml_tree_err(
                XmlParserErrors::XmlTreeInvalidName,
                None,
                "element name is empty",
            ));
        }
        let fields = XmlNodeFields {
            ns,
            ..Default::default()
        };
        Ok(self.new_node_in(XmlElementType::XmlElementNode, doc, Some(name), fields))
    }

    /// Creation of a new node element. `ns` is optional.
    #[doc(alias = "xmlNewNode")]
    pub fn new_node(
        &mut self,
        ns: Option<XmlNsId>,
        name: &str,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        self.new_element_in(None, ns, name)
    }

    /// Creation of a new node element taking the ownership of `name`.
    #[doc(alias = "xmlNewNodeEatName")]
    pub fn new_node_eat_name(
        &mut self,
        ns: Option<XmlNsId>,
        name: String,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        self.new_element_in(None, ns, &name)
    }

    /// Creation of a new node element within a document.
    ///
    /// `content` is parsed as an attribute-like string: entity and character
    /// references are decoded. Use [`XmlTree::new_doc_raw_node`] to avoid it.
    #[doc(alias = "xmlNewDocNode")]
    pub fn new_doc_node(
        &mut self,
        doc: Option<XmlNodeId>,
        ns: Option<XmlNsId>,
        name: &str,
        content: Option<&str>,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        let cur = self.new_element_in(doc, ns, name)?;
        if let Some(content) = content {
            if let Err(err) = self.set_content(cur, Some(content)) {
                self.free_node(cur);
                return Err(err);
            }
        }
        Ok(cur)
    }

    /// Creation of a new node element within a document taking the ownership of `name`.
    #[doc(alias = "xmlNewDocNodeEatName")]
    pub fn new_doc_node_eat_name(
        &mut self,
        doc: Option<XmlNodeId>,
        ns: Option<XmlNsId>,
        name: String,
        content: Option<&str>,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        self.new_doc_node(doc, ns, &name, content)
    }

    /// Creation of a new node element within a document.
    /// `content` is stored as a single text child without any interpretation.
    #[doc(alias = "xmlNewDocRawNode")]
    pub fn new_doc_raw_node(
        &mut self,
        doc: Option<XmlNodeId>,
        ns: Option<XmlNsId>,
        name: &str,
        content: Option<&str>,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        let cur = self.new_element_in(doc, ns, name)?;
        if let Some(content) = content {
            let text = self.new_doc_text(doc, content);
            self.set_parent(text, Some(cur));
            self.append_child_link(cur, text);
        }
        Ok(cur)
    }

    fn new_child_internal(
        &mut self,
        parent: XmlNodeId,
        ns: Option<XmlNsId>,
        name: &str,
        content: Option<&str>,
        raw: bool,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        let ptype = self.element_type(parent);
        if !matches!(
            ptype,
            XmlElementType::XmlElementNode
                | XmlElementType::XmlDocumentNode
                | XmlElementType::XmlHTMLDocumentNode
                | XmlElementType::XmlDocumentFragNode
        ) {
            return Err(xml_tree_err(
                XmlParserErrors::XmlTreeWrongParent,
                Some(parent),
                "new child needs an element, a document or a fragment",
            ));
        }
        // an element child inherits the namespace of its parent by default
        let ns = ns.or_else(|| {
            (ptype == XmlElementType::XmlElementNode)
                .then(|| self.get(parent).and_then(|p| p.ns()))
                .flatten()
        });
        let doc = self.document(parent);
        let cur = if raw {
            self.new_doc_raw_node(doc, ns, name, content)?
        } else {
            self.new_doc_node(doc, ns, name, content)?
        };
        self.set_parent(cur, Some(parent));
        self.append_child_link(parent, cur);
        Ok(cur)
    }

    /// Creation of a new child element, added at the end of `parent` children list.
    ///
    /// If `ns` is `None`, the newly created element inherits the namespace of `parent`.
    /// If `content` is not `None`, a child list containing the TEXTs and
    /// ENTITY_REFs node will be created.
    ///
    /// # Note
    /// `content` is supposed to be a piece of XML CDATA, so it allows entity
    /// references. XML special chars must be escaped first by using
    /// [`encode_entities_reentrant`](crate::tree::XmlTree::encode_entities_reentrant),
    /// or [`XmlTree::new_text_child`] should be used.
    #[doc(alias = "xmlNewChild")]
    pub fn new_child(
        &mut self,
        parent: XmlNodeId,
        ns: Option<XmlNsId>,
        name: &str,
        content: Option<&str>,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        self.new_child_internal(parent, ns, name, content, false)
    }

    /// Creation of a new child element with a single text child, added at
    /// the end of `parent` children list.
    #[doc(alias = "xmlNewTextChild")]
    pub fn new_text_child(
        &mut self,
        parent: XmlNodeId,
        ns: Option<XmlNsId>,
        name: &str,
        content: Option<&str>,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        self.new_child_internal(parent, ns, name, content, true)
    }

    fn new_text_in(&mut self, doc: Option<XmlNodeId>, content: &str) -> XmlNodeId {
        let fields = XmlNodeFields {
            content: Some(content.to_owned()),
            ..Default::default()
        };
        self.new_node_in(XmlElementType::XmlTextNode, doc, Some(XML_STRING_TEXT), fields)
    }

    /// Creation of a new text node.
    #[doc(alias = "xmlNewText")]
    pub fn new_text(&mut self, content: &str) -> XmlNodeId {
        self.new_text_in(None, content)
    }

    /// Creation of a new text node within a document.
    #[doc(alias = "xmlNewDocText")]
    pub fn new_doc_text(&mut self, doc: Option<XmlNodeId>, content: &str) -> XmlNodeId {
        self.new_text_in(doc, content)
    }

    /// Creation of a new text node with an extra parameter for the content's length.
    ///
    /// `len` is a byte length. It is shortened to the closest character boundary.
    #[doc(alias = "xmlNewTextLen")]
    pub fn new_text_len(&mut self, content: &str, len: usize) -> XmlNodeId {
        self.new_text_in(None, truncate_at_char_boundary(content, len))
    }

    /// Creation of a new text node with an extra content length parameter.
    #[doc(alias = "xmlNewDocTextLen")]
    pub fn new_doc_text_len(
        &mut self,
        doc: Option<XmlNodeId>,
        content: &str,
        len: usize,
    ) -> XmlNodeId {
        self.new_text_in(doc, truncate_at_char_boundary(content, len))
    }

    /// Creation of a new node containing a CDATA block.
    #[doc(alias = "xmlNewCDataBlock")]
    pub fn new_cdata_block(&mut self, doc: Option<XmlNodeId>, content: &str) -> XmlNodeId {
        let fields = XmlNodeFields {
            content: Some(content.to_owned()),
            ..Default::default()
        };
        self.new_node_in(XmlElementType::XmlCDATASectionNode, doc, None, fields)
    }

    /// Creation of a new character reference node.
    ///
    /// `name` is either `&#...;`, `#...` or the same without the `#` for a named reference.
    #[doc(alias = "xmlNewCharRef")]
    pub fn new_char_ref(
        &mut self,
        doc: Option<XmlNodeId>,
        name: &str,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        let name = strip_reference(name);
        if name.is_empty() {
            return Err(xml_tree_err(
                XmlParserErrors::XmlTreeInvalidName,
                None,
                "empty character reference",
            ));
        }
        Ok(self.new_node_in(
            XmlElementType::XmlEntityRefNode,
            doc,
            Some(name),
            XmlNodeFields::default(),
        ))
    }

    /// Creation of a new reference node.
    ///
    /// The reference is bound to the entity declared in `doc` under that name, if any.
    #[doc(alias = "xmlNewReference")]
    pub fn new_reference(
        &mut self,
        doc: Option<XmlNodeId>,
        name: &str,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        let name = strip_reference(name);
        if name.is_empty() {
            return Err(xml_tree_err(
                XmlParserErrors::XmlTreeInvalidName,
                None,
                "empty entity reference",
            ));
        }
        let entity = doc.and_then(|doc| self.get_doc_entity(doc, name));
        let content = entity.and_then(|ent| self.get(ent)?.content().map(str::to_owned));
        let fields = XmlNodeFields {
            content,
            entity,
            ..Default::default()
        };
        Ok(self.new_node_in(XmlElementType::XmlEntityRefNode, doc, Some(name), fields))
    }

    /// Use of `new_comment` is DISCOURAGED, use [`XmlTree::new_doc_comment`] instead.
    #[doc(alias = "xmlNewComment")]
    pub fn new_comment(&mut self, content: &str) -> XmlNodeId {
        self.new_doc_comment(None, content)
    }

    /// Creation of a new node containing a comment within a document.
    #[doc(alias = "xmlNewDocComment")]
    pub fn new_doc_comment(&mut self, doc: Option<XmlNodeId>, content: &str) -> XmlNodeId {
        let fields = XmlNodeFields {
            content: Some(content.to_owned()),
            ..Default::default()
        };
        self.new_node_in(
            XmlElementType::XmlCommentNode,
            doc,
            Some(XML_STRING_COMMENT),
            fields,
        )
    }

    /// Creation of a processing instruction element.
    #[doc(alias = "xmlNewPI")]
    pub fn new_pi(
        &mut self,
        name: &str,
        content: Option<&str>,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        self.new_doc_pi(None, name, content)
    }

    /// Creation of a processing instruction element within a document.
    #[doc(alias = "xmlNewDocPI")]
    pub fn new_doc_pi(
        &mut self,
        doc: Option<XmlNodeId>,
        name: &str,
        content: Option<&str>,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        if name.is_empty() {
            return Err(xml_tree_err(
                XmlParserErrors::XmlTreeInvalidName,
                None,
                "processing instruction target is empty",
            ));
        }
        let fields = XmlNodeFields {
            content: content.map(str::to_owned),
            ..Default::default()
        };
        Ok(self.new_node_in(XmlElementType::XmlPINode, doc, Some(name), fields))
    }

    /// Creation of a new Fragment node.
    #[doc(alias = "xmlNewDocFragment")]
    pub fn new_doc_fragment(&mut self, doc: Option<XmlNodeId>) -> XmlNodeId {
        self.new_node_in(
            XmlElementType::XmlDocumentFragNode,
            doc,
            None,
            XmlNodeFields::default(),
        )
    }

    /// Set the source line of a node.
    pub fn set_line(&mut self, id: XmlNodeId, line: u32) {
        if let Some(fields) = self.get_mut(id).and_then(|n| n.as_node_fields_mut()) {
            fields.line = line;
        }
    }

    /// Get line number of `node`.
    ///
    /// A node without a recorded line borrows the line of its previous sibling,
    /// or of its parent element.
    #[doc(alias = "xmlGetLineNo")]
    pub fn get_line_no(&self, node: XmlNodeId) -> Option<u32> {
        let mut cur = node;
        loop {
            let n = self.get(cur)?;
            if is_line_carrier(n.element_type()) && n.line() != 0 {
                return Some(n.line());
            }
            if let Some(prev) = n.prev().filter(|&p| is_line_carrier(self.element_type(p))) {
                cur = prev;
            } else if let Some(parent) = n
                .parent()
                .filter(|&p| self.element_type(p) == XmlElementType::XmlElementNode)
            {
                cur = parent;
            } else {
                return None;
            }
        }
    }

    fn path_step(&self, cur: XmlNodeId) -> Option<(String, Option<XmlNodeId>)> {
        let node = self.get(cur)?;
        // position among the siblings matching `same`, 0 if the node is the only one
        let count_same = |same: &dyn Fn(XmlNodeId) -> bool| -> usize {
            let mut occur = 0;
            let mut tmp = node.prev();
            while let Some(now) = tmp {
                if same(now) {
                    occur += 1;
                }
                tmp = self.prev(now);
            }
            if occur == 0 {
                if self.siblings(node.next()).any(same) {
                    1
                } else {
                    0
                }
            } else {
                occur + 1
            }
        };
        let with_index = |name: String, occur: usize| {
            if occur > 0 {
                format!("/{name}[{occur}]")
            } else {
                format!("/{name}")
            }
        };
        match node.element_type() {
            XmlElementType::XmlElementNode => {
                let prefix = node
                    .ns()
                    .and_then(|ns| self.ns(ns))
                    .map(|ns| ns.prefix().map(str::to_owned));
                let (name, generic) = match prefix {
                    Some(Some(prefix)) => (format!("{prefix}:{}", node.name()?), false),
                    Some(None) => ("*".to_owned(), true),
                    None => (node.name()?.to_owned(), false),
                };
                let occur = count_same(&|tmp| {
                    let Some(other) = self.get(tmp) else {
                        return false;
                    };
                    if other.element_type() != XmlElementType::XmlElementNode {
                        return false;
                    }
                    if generic {
                        return true;
                    }
                    other.name() == node.name()
                        && (other.ns() == node.ns()
                            || match (other.ns(), node.ns()) {
                                (Some(a), Some(b)) => {
                                    self.ns(a).and_then(|ns| ns.prefix())
                                        == self.ns(b).and_then(|ns| ns.prefix())
                                }
                                _ => false,
                            })
                });
                Some((with_index(name, occur), node.parent()))
            }
            XmlElementType::XmlCommentNode => {
                let occur = count_same(&|tmp| {
                    self.element_type(tmp) == XmlElementType::XmlCommentNode
                });
                Some((with_index("comment()".to_owned(), occur), node.parent()))
            }
            XmlElementType::XmlTextNode | XmlElementType::XmlCDATASectionNode => {
                let occur = count_same(&|tmp| {
                    matches!(
                        self.element_type(tmp),
                        XmlElementType::XmlTextNode | XmlElementType::XmlCDATASectionNode
                    )
                });
                Some((with_index("text()".to_owned(), occur), node.parent()))
            }
            XmlElementType::XmlPINode => {
                let name = format!("processing-instruction('{}')", node.name()?);
                let occur = count_same(&|tmp| {
                    self.element_type(tmp) == XmlElementType::XmlPINode
                        && self.name(tmp) == node.name()
                });
                Some((with_index(name, occur), node.parent()))
            }
            XmlElementType::XmlAttributeNode => {
                let name = match node.ns().and_then(|ns| self.ns(ns)).and_then(|ns| ns.prefix()) {
                    Some(prefix) => format!("/@{prefix}:{}", node.name()?),
                    None => format!("/@{}", node.name()?),
                };
                Some((name, node.parent()))
            }
            _ => None,
        }
    }

    /// Build a structure based Path for the given node.
    ///
    /// Returns `None` for nodes that have no such path.
    #[doc(alias = "xmlGetNodePath")]
    pub fn get_node_path(&self, node: XmlNodeId) -> Option<String> {
        let mut steps = vec![];
        let mut cur = Some(node);
        while let Some(now) = cur {
            match self.element_type(now) {
                XmlElementType::XmlDocumentNode | XmlElementType::XmlHTMLDocumentNode => break,
                _ => {
                    let (step, next) = self.path_step(now)?;
                    steps.push(step);
                    cur = next;
                }
            }
        }
        if steps.is_empty() {
            return Some("/".to_owned());
        }
        Some(steps.into_iter().rev().collect())
    }

    /// Search the last child of a node.
    #[doc(alias = "xmlGetLastChild")]
    pub fn get_last_child(&self, parent: XmlNodeId) -> Option<XmlNodeId> {
        self.last(parent)
    }

    fn accepts_element_children(&self, parent: XmlNodeId) -> bool {
        matches!(
            self.element_type(parent),
            XmlElementType::XmlElementNode
                | XmlElementType::XmlEntityDecl
                | XmlElementType::XmlDocumentNode
                | XmlElementType::XmlDocumentFragNode
                | XmlElementType::XmlHTMLDocumentNode
        )
    }

    fn is_element(&self, id: XmlNodeId) -> bool {
        self.element_type(id) == XmlElementType::XmlElementNode
    }

    /// Finds the current number of child nodes of that element which are element nodes.
    #[doc(alias = "xmlChildElementCount")]
    pub fn child_element_count(&self, parent: XmlNodeId) -> usize {
        if !self.accepts_element_children(parent) {
            return 0;
        }
        self.child_nodes(parent).filter(|&c| self.is_element(c)).count()
    }

    /// Finds the first child node of that element which is a Element node.
    #[doc(alias = "xmlFirstElementChild")]
    pub fn first_element_child(&self, parent: XmlNodeId) -> Option<XmlNodeId> {
        if !self.accepts_element_children(parent) {
            return None;
        }
        self.child_nodes(parent).find(|&c| self.is_element(c))
    }

    /// Finds the last child node of that element which is a Element node.
    #[doc(alias = "xmlLastElementChild")]
    pub fn last_element_child(&self, parent: XmlNodeId) -> Option<XmlNodeId> {
        if !self.accepts_element_children(parent) {
            return None;
        }
        let mut cur = self.last(parent);
        while let Some(now) = cur {
            if self.is_element(now) {
                return Some(now);
            }
            cur = self.prev(now);
        }
        None
    }

    fn is_sibling_kind(&self, id: XmlNodeId) -> bool {
        !matches!(
            self.element_type(id),
            XmlElementType::XmlInvalidNode
                | XmlElementType::XmlAttributeNode
                | XmlElementType::XmlDocumentNode
                | XmlElementType::XmlHTMLDocumentNode
                | XmlElementType::XmlNamespaceDecl
        )
    }

    /// Finds the first closest next sibling of the node which is an element node.
    #[doc(alias = "xmlNextElementSibling")]
    pub fn next_element_sibling(&self, node: XmlNodeId) -> Option<XmlNodeId> {
        if !self.is_sibling_kind(node) {
            return None;
        }
        self.siblings(self.next(node)).find(|&c| self.is_element(c))
    }

    /// Finds the first closest previous sibling of the node which is an element node.
    #[doc(alias = "xmlPreviousElementSibling")]
    pub fn previous_element_sibling(&self, node: XmlNodeId) -> Option<XmlNodeId> {
        if !self.is_sibling_kind(node) {
            return None;
        }
        let mut cur = self.prev(node);
        while let Some(now) = cur {
            if self.is_element(now) {
                return Some(now);
            }
            cur = self.prev(now);
        }
        None
    }

    /// Checks whether this node is an empty or whitespace only (and possibly ignorable) text-node.
    #[doc(alias = "xmlIsBlankNode")]
    pub fn is_blank_node(&self, node: XmlNodeId) -> bool {
        let Some(n) = self.get(node) else {
            return false;
        };
        if !matches!(
            n.element_type(),
            XmlElementType::XmlTextNode | XmlElementType::XmlCDATASectionNode
        ) {
            return false;
        }
        n.content().is_none_or(|c| c.chars().all(xml_is_blank_char))
    }

    /// Append raw content to a character data node.
    pub(crate) fn append_raw_content(&mut self, id: XmlNodeId, content: &str) {
        if let Some(fields) = self.get_mut(id).and_then(|n| n.as_node_fields_mut()) {
            fields
                .content
                .get_or_insert_with(String::new)
                .push_str(content);
        }
    }

    /// Merge two text nodes into one. `second` is freed.
    ///
    /// Returns the first text node augmented.
    #[doc(alias = "xmlTextMerge")]
    pub fn text_merge(
        &mut self,
        first: XmlNodeId,
        second: XmlNodeId,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        if first == second
            || self.element_type(first) != XmlElementType::XmlTextNode
            || self.element_type(second) != XmlElementType::XmlTextNode
            || self.name(first) != self.name(second)
        {
            return Err(xml_tree_err(
                XmlParserErrors::XmlErrArgument,
                Some(first),
                "only two distinct text nodes of the same kind can be merged",
            ));
        }
        let content = self.get(second).and_then(|n| n.content()).unwrap_or("").to_owned();
        self.append_raw_content(first, &content);
        self.free_node(second);
        Ok(first)
    }

    /// Concat the given string at the end of the existing node content.
    #[doc(alias = "xmlTextConcat")]
    pub fn text_concat(&mut self, node: XmlNodeId, content: &str) -> Result<(), XmlParserErrors> {
        if !matches!(
            self.element_type(node),
            XmlElementType::XmlTextNode
                | XmlElementType::XmlCDATASectionNode
                | XmlElementType::XmlCommentNode
                | XmlElementType::XmlPINode
        ) {
            return Err(xml_tree_err(
                XmlParserErrors::XmlErrArgument,
                Some(node),
                "content can only be appended to character data",
            ));
        }
        self.append_raw_content(node, content);
        Ok(())
    }

    /// Set (or reset) the name of a node.
    #[doc(alias = "xmlNodeSetName")]
    pub fn set_name(&mut self, node: XmlNodeId, name: &str) -> Result<(), XmlParserErrors> {
        match self.element_type(node) {
            XmlElementType::XmlTextNode
            | XmlElementType::XmlCDATASectionNode
            | XmlElementType::XmlCommentNode
            | XmlElementType::XmlDocumentTypeNode
            | XmlElementType::XmlDocumentFragNode
            | XmlElementType::XmlNotationNode
            | XmlElementType::XmlHTMLDocumentNode
            | XmlElementType::XmlNamespaceDecl
            | XmlElementType::XmlXIncludeStart
            | XmlElementType::XmlXIncludeEnd
            | XmlElementType::XmlDocumentNode
            | XmlElementType::XmlInvalidNode => Err(xml_tree_err(
                XmlParserErrors::XmlErrArgument,
                Some(node),
                "this node has no settable name",
            )),
            _ => {
                let name = self.intern_name(self.document(node), name);
                if let Some(n) = self.get_mut(node) {
                    n.name = Some(name);
                }
                Ok(())
            }
        }
    }

    fn entity_ref_content(&self, node: &XmlNode) -> Option<String> {
        if let Some(content) = node
            .entity()
            .and_then(|ent| self.get(ent))
            .and_then(|ent| ent.content())
        {
            return Some(content.to_owned());
        }
        let name = node.name()?;
        get_predefined_entity(name).map(|ent| ent.content.to_owned())
    }

    /// Append the text content of `cur` to `buf`.
    pub(crate) fn collect_content(&self, cur: XmlNodeId, buf: &mut String) {
        let Some(node) = self.get(cur) else {
            return;
        };
        match node.element_type() {
            XmlElementType::XmlTextNode | XmlElementType::XmlCDATASectionNode => {
                buf.push_str(node.content().unwrap_or(""));
            }
            XmlElementType::XmlCommentNode | XmlElementType::XmlPINode => {
                buf.push_str(node.content().unwrap_or(""));
            }
            XmlElementType::XmlEntityRefNode => {
                if let Some(content) = self.entity_ref_content(node) {
                    buf.push_str(&content);
                }
            }
            XmlElementType::XmlEntityDecl => {
                buf.push_str(node.content().unwrap_or(""));
            }
            XmlElementType::XmlAttributeNode => {
                for child in self.child_nodes(cur) {
                    self.collect_content(child, buf);
                }
            }
            XmlElementType::XmlElementNode
            | XmlElementType::XmlDocumentFragNode
            | XmlElementType::XmlDocumentNode
            | XmlElementType::XmlHTMLDocumentNode => {
                for id in self.descendants(cur).skip(1) {
                    let Some(n) = self.get(id) else {
                        continue;
                    };
                    match n.element_type() {
                        XmlElementType::XmlTextNode | XmlElementType::XmlCDATASectionNode => {
                            buf.push_str(n.content().unwrap_or(""));
                        }
                        XmlElementType::XmlEntityRefNode => {
                            if let Some(content) = self.entity_ref_content(n) {
                                buf.push_str(&content);
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    /// Read the value of a node, this can be either the text carried directly by
    /// this node if it's a TEXT node or the aggregate string of the values carried
    /// by this node child's (TEXT and ENTITY_REF). Entity references are substituted.
    ///
    /// Returns `None` for nodes without content, like DTDs.
    #[doc(alias = "xmlNodeGetContent")]
    pub fn get_content(&self, cur: XmlNodeId) -> Option<String> {
        let node = self.get(cur)?;
        match node.element_type() {
            XmlElementType::XmlElementNode
            | XmlElementType::XmlDocumentFragNode
            | XmlElementType::XmlDocumentNode
            | XmlElementType::XmlHTMLDocumentNode
            | XmlElementType::XmlAttributeNode
            | XmlElementType::XmlEntityRefNode => {
                let mut buf = String::new();
                self.collect_content(cur, &mut buf);
                Some(buf)
            }
            XmlElementType::XmlTextNode
            | XmlElementType::XmlCDATASectionNode
            | XmlElementType::XmlCommentNode
            | XmlElementType::XmlPINode
            | XmlElementType::XmlEntityDecl => Some(node.content().unwrap_or("").to_owned()),
            _ => None,
        }
    }

    /// Read the value of a node `cur` and append it to the legacy buffer `buf`.
    #[doc(alias = "xmlNodeBufGetContent")]
    pub fn node_buf_get_content(
        &self,
        buf: &mut XmlBuffer,
        cur: XmlNodeId,
    ) -> Result<(), XmlParserErrors> {
        let content = self.get_content(cur).ok_or(XmlParserErrors::XmlErrArgument)?;
        buf.push_str(&content)
    }

    /// Read the value of a node `cur` and append it to the buffer `buf`.
    #[doc(alias = "xmlBufGetNodeContent")]
    pub fn buf_get_node_content(
        &self,
        buf: &mut XmlBuf,
        cur: XmlNodeId,
    ) -> Result<(), XmlParserErrors> {
        let content = self.get_content(cur).ok_or(XmlParserErrors::XmlErrArgument)?;
        buf.push_str(&content)
    }

    /// Replace the content of a node.
    ///
    /// For elements, fragments and attributes, `content` is parsed: entity and
    /// character references become nodes. Other nodes keep it verbatim.
    #[doc(alias = "xmlNodeSetContent")]
    pub fn set_content(
        &mut self,
        cur: XmlNodeId,
        content: Option<&str>,
    ) -> Result<(), XmlParserErrors> {
        match self.element_type(cur) {
            XmlElementType::XmlDocumentFragNode
            | XmlElementType::XmlElementNode
            | XmlElementType::XmlAttributeNode => {
                let list = match content {
                    Some(content) => self.string_get_node_list(self.document(cur), content)?,
                    None => None,
                };
                if let Some(children) = self.children(cur) {
                    self.free_node_list(children);
                }
                if let Some(list) = list {
                    self.link_children(cur, list);
                }
                Ok(())
            }
            XmlElementType::XmlTextNode
            | XmlElementType::XmlCDATASectionNode
            | XmlElementType::XmlEntityRefNode
            | XmlElementType::XmlEntityDecl
            | XmlElementType::XmlPINode
            | XmlElementType::XmlCommentNode => {
                if let Some(children) = self.children(cur) {
                    self.free_node_list(children);
                }
                if let Some(fields) = self.get_mut(cur).and_then(|n| n.as_node_fields_mut()) {
                    fields.content = content.map(str::to_owned);
                }
                Ok(())
            }
            XmlElementType::XmlInvalidNode => Err(XmlParserErrors::XmlErrArgument),
            _ => Ok(()),
        }
    }

    /// Replace the content of a node with the first `len` bytes of `content`.
    #[doc(alias = "xmlNodeSetContentLen")]
    pub fn set_content_len(
        &mut self,
        cur: XmlNodeId,
        content: &str,
        len: usize,
    ) -> Result<(), XmlParserErrors> {
        self.set_content(cur, Some(truncate_at_char_boundary(content, len)))
    }

    /// Append the extra substring to the node content.
    ///
    /// # Note
    /// In contrast to [`XmlTree::set_content`], `content` is supposed to be raw text,
    /// so unescaped XML special chars are allowed, entity references are not supported.
    #[doc(alias = "xmlNodeAddContent")]
    pub fn add_content(&mut self, cur: XmlNodeId, content: &str) -> Result<(), XmlParserErrors> {
        match self.element_type(cur) {
            XmlElementType::XmlDocumentFragNode | XmlElementType::XmlElementNode => {
                let text = self.new_doc_text(self.document(cur), content);
                self.add_child(cur, text)?;
                Ok(())
            }
            XmlElementType::XmlTextNode
            | XmlElementType::XmlCDATASectionNode
            | XmlElementType::XmlEntityRefNode
            | XmlElementType::XmlEntityDecl
            | XmlElementType::XmlPINode
            | XmlElementType::XmlCommentNode => {
                self.append_raw_content(cur, content);
                Ok(())
            }
            XmlElementType::XmlInvalidNode => Err(XmlParserErrors::XmlErrArgument),
            _ => Ok(()),
        }
    }

    /// Append the first `len` bytes of `content` to the node content.
    #[doc(alias = "xmlNodeAddContentLen")]
    pub fn add_content_len(
        &mut self,
        cur: XmlNodeId,
        content: &str,
        len: usize,
    ) -> Result<(), XmlParserErrors> {
        self.add_content(cur, truncate_at_char_boundary(content, len))
    }

    /// Attach a free standing sibling chain as the children of `parent`.
    pub(crate) fn link_children(&mut self, parent: XmlNodeId, list: XmlNodeId) {
        let nodes = self.siblings(Some(list)).collect::<Vec<_>>();
        for &node in &nodes {
            self.set_parent(node, Some(parent));
        }
        self.set_children(parent, nodes.first().copied());
        self.set_last(parent, nodes.last().copied());
    }

    /// Searches the language of a node, i.e. the values of the xml:lang
    /// attribute or the one carried by the nearest ancestor.
    #[doc(alias = "xmlNodeGetLang")]
    pub fn get_lang(&self, node: XmlNodeId) -> Option<String> {
        let mut cur = Some(node);
        while let Some(now) = cur {
            if let Some(lang) = self.get_ns_prop(now, "lang", Some(XML_XML_NAMESPACE)) {
                return Some(lang);
            }
            cur = self.parent(now);
        }
        None
    }

    /// Set the language of a node, i.e. the values of the xml:lang attribute.
    #[doc(alias = "xmlNodeSetLang")]
    pub fn set_lang(&mut self, node: XmlNodeId, lang: &str) -> Result<(), XmlParserErrors> {
        if self.element_type(node) != XmlElementType::XmlElementNode {
            return Err(XmlParserErrors::XmlErrArgument);
        }
        let doc = self.document(node);
        let ns = self
            .search_ns(doc, Some(node), Some("xml"))
            .ok_or(XmlParserErrors::XmlErrNoMemory)?;
        self.set_ns_prop(node, Some(ns), "lang", Some(lang))?;
        Ok(())
    }

    /// Searches the space preserving behaviour of a node, i.e. the values of
    /// the xml:space attribute or the one carried by the nearest ancestor.
    ///
    /// Returns `Some(false)` for "default", `Some(true)` for "preserve" and
    /// `None` if not inherited.
    #[doc(alias = "xmlNodeGetSpacePreserve")]
    pub fn get_space_preserve(&self, node: XmlNodeId) -> Option<bool> {
        let mut cur = Some(node);
        while let Some(now) = cur {
            if self.element_type(now) == XmlElementType::XmlElementNode {
                match self
                    .get_ns_prop(now, "space", Some(XML_XML_NAMESPACE))
                    .as_deref()
                {
                    Some("preserve") => return Some(true),
                    Some("default") => return Some(false),
                    _ => {}
                }
            }
            cur = self.parent(now);
        }
        None
    }

    /// Set (or reset) the space preserving behaviour of a node, i.e. the
    /// value of the xml:space attribute.
    #[doc(alias = "xmlNodeSetSpacePreserve")]
    pub fn set_space_preserve(
        &mut self,
        node: XmlNodeId,
        preserve: bool,
    ) -> Result<(), XmlParserErrors> {
        if self.element_type(node) != XmlElementType::XmlElementNode {
            return Err(XmlParserErrors::XmlErrArgument);
        }
        let doc = self.document(node);
        let ns = self
            .search_ns(doc, Some(node), Some("xml"))
            .ok_or(XmlParserErrors::XmlErrNoMemory)?;
        let value = if preserve { "preserve" } else { "default" };
        self.set_ns_prop(node, Some(ns), "space", Some(value))?;
        Ok(())
    }

    /// Searches for the BASE URL. The code should work on both XML
    /// and HTML document even if base mechanisms are completely different.
    /// It returns the base as defined in RFC 2396 sections
    /// 5.1.1. Base URI within Document Content and 5.1.2. Base URI from the Encapsulating Entity.
    ///
    /// The document URL is used when no `xml:base` resolves to an absolute URI.
    #[doc(alias = "xmlNodeGetBase")]
    pub fn get_base(&self, doc: Option<XmlNodeId>, node: XmlNodeId) -> Option<String> {
        self.get_base_safe(doc, node).ok().flatten()
    }

    /// Same as [`XmlTree::get_base`], distinguishing "no base" (`Ok(None)`)
    /// from invalid arguments.
    #[doc(alias = "xmlNodeGetBaseSafe")]
    pub fn get_base_safe(
        &self,
        doc: Option<XmlNodeId>,
        node: XmlNodeId,
    ) -> Result<Option<String>, XmlParserErrors> {
        if !self.contains(node) {
            return Err(XmlParserErrors::XmlErrArgument);
        }
        let doc = doc.or_else(|| self.document(node));
        if let Some(doc) = doc.filter(|&doc| {
            self.element_type(doc) == XmlElementType::XmlHTMLDocumentNode
        }) {
            return Ok(self.html_base(doc));
        }

        let mut bases: Vec<String> = vec![];
        let mut cur = Some(node);
        while let Some(now) = cur {
            if let Some(ent) = self.get(now).and_then(|n| n.as_entity_decl()) {
                return Ok(ent.uri.clone());
            }
            if self.element_type(now) == XmlElementType::XmlElementNode {
                if let Some(base) = self.get_ns_prop(now, "base", Some(XML_XML_NAMESPACE)) {
                    let absolute = base.starts_with("http://")
                        || base.starts_with("ftp://")
                        || base.starts_with("urn:");
                    bases.push(base);
                    if absolute {
                        break;
                    }
                }
            }
            cur = self.parent(now);
        }
        let url = doc
            .and_then(|doc| self.get(doc))
            .and_then(|doc| doc.as_doc())
            .and_then(|doc| doc.url.clone());
        let mut resolved = match (bases.pop(), url) {
            (Some(outer), Some(url)) if cur.is_none() => build_uri(&outer, &url),
            (Some(outer), _) => Some(outer),
            (None, url) => return Ok(url),
        };
        while let Some(inner) = bases.pop() {
            resolved = match resolved {
                Some(base) => build_uri(&inner, &base),
                None => return Ok(None),
            };
        }
        Ok(resolved)
    }

    fn html_base(&self, doc: XmlNodeId) -> Option<String> {
        let mut cur = self.children(doc);
        while let Some(now) = cur {
            let Some(name) = self
                .name(now)
                .filter(|_| self.element_type(now) == XmlElementType::XmlElementNode)
            else {
                cur = self.next(now);
                continue;
            };
            if name.eq_ignore_ascii_case("html") || name.eq_ignore_ascii_case("head") {
                cur = self.children(now);
                continue;
            }
            if name.eq_ignore_ascii_case("base") {
                return self.get_prop(now, "href");
            }
            cur = self.next(now);
        }
        None
    }

    /// Set (or reset) the base URI of a node, i.e. the value of the xml:base attribute.
    ///
    /// On a document node, this sets the document URL.
    #[doc(alias = "xmlNodeSetBase")]
    pub fn set_base(&mut self, node: XmlNodeId, uri: Option<&str>) -> Result<(), XmlParserErrors> {
        match self.element_type(node) {
            XmlElementType::XmlElementNode => {
                let doc = self.document(node);
                let ns = self
                    .search_ns(doc, Some(node), Some("xml"))
                    .ok_or(XmlParserErrors::XmlErrNoMemory)?;
                match uri {
                    Some(uri) => {
                        self.set_ns_prop(node, Some(ns), "base", Some(uri))?;
                    }
                    None => {
                        // Nothing to remove is not an error here.
                        self.unset_ns_prop(node, Some(ns), "base").ok();
                    }
                }
                Ok(())
            }
            XmlElementType::XmlDocumentNode | XmlElementType::XmlHTMLDocumentNode => {
                if let Some(doc) = self.get_mut(node).and_then(|n| n.as_doc_mut()) {
                    doc.url = uri.map(str::to_owned);
                }
                Ok(())
            }
            XmlElementType::XmlInvalidNode => Err(XmlParserErrors::XmlErrArgument),
            _ => Ok(()),
        }
    }
}

fn strip_reference(name: &str) -> &str {
    match name.strip_prefix('&') {
        Some(rest) => rest.strip_suffix(';').unwrap_or(rest),
        None => name,
    }
}

pub(crate) fn truncate_at_char_boundary(s: &str, len: usize) -> &str {
    if len >= s.len() {
        return s;
    }
    let mut end = len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (XmlTree, XmlNodeId, XmlNodeId) {
        let mut tree = XmlTree::new();
        let doc = tree.new_doc(Some("1.0"));
        let root = tree.new_doc_node(Some(doc), None, "root", None).unwrap();
        tree.set_root_element(doc, root).unwrap();
        (tree, doc, root)
    }

    #[test]
    fn element_navigation_skips_other_nodes() {
        let (mut tree, _, root) = sample();
        let t = tree.new_text("x");
        tree.add_child(root, t).unwrap();
        let a = tree.new_child(root, None, "a", None).unwrap();
        let c = tree.new_doc_comment(None, "c");
        tree.add_child(root, c).unwrap();
        let b = tree.new_child(root, None, "b", None).unwrap();
        let t2 = tree.new_text("y");
        tree.add_child(root, t2).unwrap();

        assert_eq!(tree.child_element_count(root), 2);
        assert_eq!(tree.first_element_child(root), Some(a));
        assert_eq!(tree.last_element_child(root), Some(b));
        assert_eq!(tree.next_element_sibling(a), Some(b));
        assert_eq!(tree.previous_element_sibling(b), Some(a));
        assert_eq!(tree.next_element_sibling(b), None);
        assert_eq!(tree.next_element_sibling(t), Some(a));
    }

    #[test]
    fn node_paths() {
        let (mut tree, doc, root) = sample();
        let a1 = tree.new_child(root, None, "a", None).unwrap();
        let a2 = tree.new_child(root, None, "a", None).unwrap();
        let b = tree.new_child(root, None, "b", None).unwrap();
        let t = tree.new_text("x");
        tree.add_child(b, t).unwrap();
        let attr = tree.set_prop(b, "id", Some("v")).unwrap();

        assert_eq!(tree.get_node_path(doc).as_deref(), Some("/"));
        assert_eq!(tree.get_node_path(root).as_deref(), Some("/root"));
        assert_eq!(tree.get_node_path(a1).as_deref(), Some("/root/a[1]"));
        assert_eq!(tree.get_node_path(a2).as_deref(), Some("/root/a[2]"));
        assert_eq!(tree.get_node_path(b).as_deref(), Some("/root/b"));
        assert_eq!(tree.get_node_path(t).as_deref(), Some("/root/b/text()"));
        assert_eq!(tree.get_node_path(attr).as_deref(), Some("/root/b/@id"));
    }

    #[test]
    fn content_of_elements_is_synthesized() {
        let (mut tree, doc, root) = sample();
        tree.new_text_child(root, None, "a", Some("1 < 2")).unwrap();
        tree.new_child(root, None, "b", Some("&amp;&#x41;")).unwrap();
        assert_eq!(tree.get_content(root).as_deref(), Some("1 < 2&A"));
        assert_eq!(tree.get(root).unwrap().content(), None);

        let cdata = tree.new_cdata_block(Some(doc), "]]");
        tree.add_child(root, cdata).unwrap();
        assert_eq!(tree.get_content(root).as_deref(), Some("1 < 2&A]]"));
    }

    #[test]
    fn set_and_add_content() {
        let (mut tree, _, root) = sample();
        tree.set_content(root, Some("a&lt;b")).unwrap();
        assert_eq!(tree.get_content(root).as_deref(), Some("a<b"));
        tree.add_content(root, "&c").unwrap();
        assert_eq!(tree.get_content(root).as_deref(), Some("a<b&c"));
        assert_eq!(tree.child_nodes(root).count(), 1);
        assert_eq!(
            tree.set_content(root, Some("&broken")),
            Err(XmlParserErrors::XmlTreeUnterminatedEntity)
        );
    }

    #[test]
    fn text_merge_and_concat() {
        let mut tree = XmlTree::new();
        let a = tree.new_text("a");
        let b = tree.new_text("b");
        assert_eq!(tree.text_merge(a, b), Ok(a));
        assert_eq!(tree.get_content(a).as_deref(), Some("ab"));
        assert!(!tree.contains(b));

        let c = tree.new_comment("x");
        assert!(tree.text_merge(a, c).is_err());
        tree.text_concat(c, "y").unwrap();
        assert_eq!(tree.get_content(c).as_deref(), Some("xy"));
        let e = tree.new_node(None, "e").unwrap();
        assert!(tree.text_concat(e, "y").is_err());
    }

    #[test]
    fn lang_and_space_are_inherited() {
        let (mut tree, _, root) = sample();
        let child = tree.new_child(root, None, "c", None).unwrap();
        assert_eq!(tree.get_lang(child), None);
        tree.set_lang(root, "en").unwrap();
        assert_eq!(tree.get_lang(child).as_deref(), Some("en"));
        assert_eq!(tree.get_space_preserve(child), None);
        tree.set_space_preserve(root, true).unwrap();
        assert_eq!(tree.get_space_preserve(child), Some(true));
        tree.set_space_preserve(child, false).unwrap();
        assert_eq!(tree.get_space_preserve(child), Some(false));
    }

    #[test]
    fn base_resolution() {
        let (mut tree, doc, root) = sample();
        tree.set_base(doc, Some("http://example.com/dir/doc.xml")).unwrap();
        let child = tree.new_child(root, None, "c", None).unwrap();
        assert_eq!(
            tree.get_base(None, child).as_deref(),
            Some("http://example.com/dir/doc.xml")
        );
        tree.set_base(root, Some("sub/")).unwrap();
        assert_eq!(
            tree.get_base(None, child).as_deref(),
            Some("http://example.com/dir/sub/")
        );
        tree.set_base(child, Some("leaf.xml")).unwrap();
        assert_eq!(
            tree.get_base(None, child).as_deref(),
            Some("http://example.com/dir/sub/leaf.xml")
        );
    }

    #[test]
    fn line_numbers_are_borrowed_from_neighbours() {
        let (mut tree, _, root) = sample();
        tree.set_line(root, 3);
        let t = tree.new_text("x");
        tree.add_child(root, t).unwrap();
        assert_eq!(tree.get_line_no(t), Some(3));
        tree.set_line(t, 4);
        let c = tree.new_child(root, None, "c", None).unwrap();
        assert_eq!(tree.get_line_no(c), Some(4));
    }

    #[test]
    fn blank_nodes() {
        let mut tree = XmlTree::new();
        let blank = tree.new_text(" \n\t");
        let text = tree.new_text(" a ");
        let elem = tree.new_node(None, "e").unwrap();
        assert!(tree.is_blank_node(blank));
        assert!(!tree.is_blank_node(text));
        assert!(!tree.is_blank_node(elem));
    }
}
