//! Provide methods and data structures for handling XML entities.
//!
//! This module is based on `libxml/entities.h`, `entities.c`, and so on in `libxml2-v2.11.8`.
//! Please refer to original libxml2 documents also.

// Copyright of the original code is the following.
// --------
// Summary: interface for the XML entities handling
// Description: this module provides some of the entity API needed
//              for the parser and applications.
//
// Copy: See Copyright for the status of this software.
//
// Author: Daniel Veillard
// --------
// entities.c : implementation for the XML entities handling
//
// See Copyright for the status of this software.
//
// daniel@veillard.com

use std::fmt::Write as _;

use crate::error::{XmlErrorDomain, XmlParserErrors, xml_simple_error};

use super::{XmlElementType, XmlNode, XmlNodeId, XmlNodeVariant, XmlTree};

/// The different valid entity types.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XmlEntityType {
    #[default]
    XmlInternalGeneralEntity = 1,
    XmlExternalGeneralParsedEntity = 2,
    XmlExternalGeneralUnparsedEntity = 3,
    XmlInternalParameterEntity = 4,
    XmlExternalParameterEntity = 5,
    XmlInternalPredefinedEntity = 6,
}

impl XmlEntityType {
    pub fn is_parameter(self) -> bool {
        matches!(
            self,
            Self::XmlInternalParameterEntity | Self::XmlExternalParameterEntity
        )
    }
}

impl TryFrom<i32> for XmlEntityType {
    type Error = anyhow::Error;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::XmlInternalGeneralEntity),
            2 => Ok(Self::XmlExternalGeneralParsedEntity),
            3 => Ok(Self::XmlExternalGeneralUnparsedEntity),
            4 => Ok(Self::XmlInternalParameterEntity),
            5 => Ok(Self::XmlExternalParameterEntity),
            6 => Ok(Self::XmlInternalPredefinedEntity),
            _ => Err(anyhow::anyhow!(
                "Invalid convert from value '{value}' to {}",
                std::any::type_name::<Self>()
            )),
        }
    }
}

/// The entity specific part of an entity declaration node.
#[derive(Debug, Clone, Default)]
pub struct XmlEntity {
    pub(crate) etype: XmlEntityType,
    // content without ref substitution
    pub(crate) orig: Option<String>,
    // content or ndata if unparsed
    pub(crate) content: Option<String>,
    pub(crate) external_id: Option<String>,
    pub(crate) system_id: Option<String>,
    // the full URI as computed
    pub(crate) uri: Option<String>,
}

impl XmlEntity {
    pub fn etype(&self) -> XmlEntityType {
        self.etype
    }

    pub fn orig(&self) -> Option<&str> {
        self.orig.as_deref()
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn external_id(&self) -> Option<&str> {
        self.external_id.as_deref()
    }

    pub fn system_id(&self) -> Option<&str> {
        self.system_id.as_deref()
    }

    pub fn uri(&self) -> Option<&str> {
        self.uri.as_deref()
    }

    pub fn set_uri(&mut self, uri: Option<&str>) {
        self.uri = uri.map(str::to_owned);
    }
}

/// One of the five entities every XML processor recognizes.
#[derive(Debug)]
pub struct XmlPredefinedEntity {
    pub name: &'static str,
    pub content: &'static str,
}

static XML_PREDEFINED_ENTITIES: [XmlPredefinedEntity; 5] = [
    XmlPredefinedEntity {
        name: "lt",
        content: "<",
    },
    XmlPredefinedEntity {
        name: "gt",
        content: ">",
    },
    XmlPredefinedEntity {
        name: "amp",
        content: "&",
    },
    XmlPredefinedEntity {
        name: "apos",
        content: "'",
    },
    XmlPredefinedEntity {
        name: "quot",
        content: "\"",
    },
];

/// Check whether this name is an predefined entity.
#[doc(alias = "xmlGetPredefinedEntity")]
pub fn get_predefined_entity(name: &str) -> Option<&'static XmlPredefinedEntity> {
    XML_PREDEFINED_ENTITIES.iter().find(|ent| ent.name == name)
}

/// 4.6 Predefined Entities: a redeclaration must produce the same character.
fn is_valid_predefined_redeclaration(
    predef: &XmlPredefinedEntity,
    etype: XmlEntityType,
    content: Option<&str>,
) -> bool {
    if etype != XmlEntityType::XmlInternalGeneralEntity {
        return false;
    }
    let Some(content) = content else {
        return false;
    };
    let Some(c) = predef.content.chars().next() else {
        return false;
    };
    if content == predef.content && matches!(c, '>' | '\'' | '"') {
        return true;
    }
    let Some(reference) = content
        .strip_prefix("&#")
        .and_then(|r| r.strip_suffix(';'))
    else {
        return false;
    };
    let value = match reference.strip_prefix('x') {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => reference.parse::<u32>().ok(),
    };
    value == Some(c as u32)
}

fn entities_err(code: XmlParserErrors, msg: &str) {
    xml_simple_error(XmlErrorDomain::XmlFromTree, code, None, Some(msg));
}

impl XmlTree {
    pub(crate) fn add_entity(
        &mut self,
        dtd: XmlNodeId,
        name: &str,
        etype: XmlEntityType,
        external_id: Option<&str>,
        system_id: Option<&str>,
        content: Option<&str>,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        if etype == XmlEntityType::XmlInternalPredefinedEntity {
            return Err(XmlParserErrors::XmlErrArgument);
        }
        if !etype.is_parameter() {
            if let Some(predef) = get_predefined_entity(name) {
                if !is_valid_predefined_redeclaration(predef, etype, content) {
                    entities_err(
                        XmlParserErrors::XmlErrEntityProcessing,
                        &format!("invalid redeclaration of predefined entity '{name}'"),
                    );
                    return Err(XmlParserErrors::XmlErrEntityProcessing);
                }
            }
        }
        let d = self.dtd(dtd).ok_or(XmlParserErrors::XmlErrArgument)?;
        let table = if etype.is_parameter() {
            &d.pentities
        } else {
            &d.entities
        };
        if table.contains_key(name) {
            // entity was already defined at another level.
            return Err(XmlParserErrors::XmlWarEntityRedefined);
        }

        let doc = self.document(dtd);
        let entity = XmlEntity {
            etype,
            orig: None,
            content: content.map(str::to_owned),
            external_id: external_id.map(str::to_owned),
            system_id: system_id.map(str::to_owned),
            uri: None,
        };
        let name = self.intern_name(doc, name);
        let mut node = XmlNode::new(
            XmlElementType::XmlEntityDecl,
            Some(name.clone()),
            XmlNodeVariant::EntityDecl(Box::new(entity)),
        );
        node.doc = doc;
        let ent = self.alloc(node);
        if let Some(d) = self.dtd_mut(dtd) {
            let table = if etype.is_parameter() {
                &mut d.pentities
            } else {
                &mut d.entities
            };
            table.insert(name.to_string(), ent);
        }
        // Link it to the DTD
        self.set_parent(ent, Some(dtd));
        self.append_child_link(dtd, ent);
        Ok(ent)
    }

    /// Register a new entity for this document.
    #[doc(alias = "xmlAddDocEntity")]
    pub fn add_doc_entity(
        &mut self,
        doc: XmlNodeId,
        name: &str,
        etype: XmlEntityType,
        external_id: Option<&str>,
        system_id: Option<&str>,
        content: Option<&str>,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        let Some(dtd) = self.doc(doc).and_then(|d| d.int_subset) else {
            entities_err(
                XmlParserErrors::XmlDTDNoDTD,
                "add_doc_entity: document without internal subset",
            );
            return Err(XmlParserErrors::XmlDTDNoDTD);
        };
        self.add_entity(dtd, name, etype, external_id, system_id, content)
    }

    /// Register a new entity for this document DTD external subset.
    #[doc(alias = "xmlAddDtdEntity")]
    pub fn add_dtd_entity(
        &mut self,
        doc: XmlNodeId,
        name: &str,
        etype: XmlEntityType,
        external_id: Option<&str>,
        system_id: Option<&str>,
        content: Option<&str>,
    ) -> Result<XmlNodeId, XmlParserErrors> {
        let Some(dtd) = self.doc(doc).and_then(|d| d.ext_subset) else {
            entities_err(
                XmlParserErrors::XmlDTDNoDTD,
                "add_dtd_entity: document without external subset",
            );
            return Err(XmlParserErrors::XmlDTDNoDTD);
        };
        self.add_entity(dtd, name, etype, external_id, system_id, content)
    }

    fn entity_from_subset(&self, dtd: Option<XmlNodeId>, name: &str, param: bool) -> Option<XmlNodeId> {
        let d = self.dtd(dtd?)?;
        let table = if param { &d.pentities } else { &d.entities };
        table.get(name).copied()
    }

    /// Do an entity lookup in the document entity hash table.
    /// The external subset is searched unless the document is standalone.
    ///
    /// Predefined entities are not declarations; use [`get_predefined_entity`] for them.
    #[doc(alias = "xmlGetDocEntity")]
    pub fn get_doc_entity(&self, doc: XmlNodeId, name: &str) -> Option<XmlNodeId> {
        let d = self.doc(doc)?;
        if let Some(ent) = self.entity_from_subset(d.int_subset, name, false) {
            return Some(ent);
        }
        if d.standalone != 1 {
            return self.entity_from_subset(d.ext_subset, name, false);
        }
        None
    }

    /// Do an entity lookup in the DTD entity hash table.
    #[doc(alias = "xmlGetDtdEntity")]
    pub fn get_dtd_entity(&self, doc: XmlNodeId, name: &str) -> Option<XmlNodeId> {
        self.entity_from_subset(self.doc(doc)?.ext_subset, name, false)
    }

    /// Do an entity lookup in the internal and external subsets.
    #[doc(alias = "xmlGetParameterEntity")]
    pub fn get_parameter_entity(&self, doc: XmlNodeId, name: &str) -> Option<XmlNodeId> {
        let d = self.doc(doc)?;
        self.entity_from_subset(d.int_subset, name, true)
            .or_else(|| self.entity_from_subset(d.ext_subset, name, true))
    }

    fn encode_entities_internal(&self, doc: Option<XmlNodeId>, input: &str, attr: bool) -> String {
        let html = doc.is_some_and(|doc| self.element_type(doc) == XmlElementType::XmlHTMLDocumentNode);
        let has_encoding = doc
            .and_then(|doc| self.doc(doc))
            .is_some_and(|d| d.encoding.is_some());
        let mut out = String::with_capacity(input.len() + 16);
        let mut rest = input;
        while let Some(c) = rest.chars().next() {
            let len = c.len_utf8();
            match c {
                '<' => {
                    // Special handling of server side include in HTML attributes
                    if html && attr && rest.starts_with("<!--") {
                        if let Some(end) = rest.find("-->") {
                            out.push_str(&rest[..end + 3]);
                            rest = &rest[end + 3..];
                            continue;
                        }
                    }
                    out.push_str("&lt;");
                }
                '>' => out.push_str("&gt;"),
                '&' => {
                    // Special handling of &{...} construct from HTML 4, see
                    // http://www.w3.org/TR/html401/appendix/notes.html#h-B.7.1
                    if html && attr && rest.starts_with("&{") {
                        if let Some(end) = rest.find('}') {
                            out.push_str(&rest[..end + 1]);
                            rest = &rest[end + 1..];
                            continue;
                        }
                    }
                    out.push_str("&amp;");
                }
                '\n' | '\t' => out.push(c),
                '\r' if html => out.push(c),
                '\r' => out.push_str("&#13;"),
                ' '..='\x7F' => out.push(c),
                c if !c.is_ascii() => {
                    if has_encoding || html {
                        out.push(c);
                    } else {
                        write!(out, "&#x{:X};", c as u32).ok();
                    }
                }
                // other control characters cannot be represented
                _ => {}
            }
            rest = &rest[len..];
        }
        out
    }

    /// Do a global encoding of a string, replacing the predefined entities
    /// and non ASCII values with their entities and CharRef counterparts.
    /// Contrary to xmlEncodeEntities, this routine is reentrant, and result
    /// must be deallocated.
    #[doc(alias = "xmlEncodeEntitiesReentrant")]
    pub fn encode_entities_reentrant(&self, doc: Option<XmlNodeId>, input: &str) -> String {
        self.encode_entities_internal(doc, input, false)
    }

    /// Do a global encoding of a string, replacing the predefined entities
    /// and non ASCII values with their entities and CharRef counterparts for
    /// attribute values.
    #[doc(alias = "xmlEncodeAttributeEntities")]
    pub fn encode_attribute_entities(&self, doc: Option<XmlNodeId>, input: &str) -> String {
        self.encode_entities_internal(doc, input, true)
    }
}

/// Do a global encoding of a string, replacing the predefined entities
/// this routine is reentrant, and result must be deallocated.
#[doc(alias = "xmlEncodeSpecialChars")]
pub fn encode_special_chars(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 16);
    for c in input.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\r' => out.push_str("&#13;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predefined_entities() {
        assert_eq!(get_predefined_entity("amp").map(|e| e.content), Some("&"));
        assert!(get_predefined_entity("nbsp").is_none());
    }

    #[test]
    fn special_chars() {
        assert_eq!(
            encode_special_chars("<a href=\"x\">&\r</a>"),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#13;&lt;/a&gt;"
        );
    }

    #[test]
    fn entity_encoding_depends_on_document() {
        let mut tree = XmlTree::new();
        let doc = tree.new_doc(None);
        assert_eq!(tree.encode_entities_reentrant(Some(doc), "a<é\"\x01"), "a&lt;&#xE9;\"");
        tree.doc_mut(doc).unwrap().set_encoding(Some("UTF-8"));
        assert_eq!(tree.encode_entities_reentrant(Some(doc), "é"), "é");

        let html = tree.new_doc_internal(XmlElementType::XmlHTMLDocumentNode, None);
        assert_eq!(
            tree.encode_attribute_entities(Some(html), "&{x}<!-- c -->&"),
            "&{x}<!-- c -->&amp;"
        );
        assert_eq!(tree.encode_entities_reentrant(Some(html), "&{x}"), "&amp;{x}");
    }

    #[test]
    fn declare_and_lookup_entities() {
        let mut tree = XmlTree::new();
        let doc = tree.new_doc(None);
        assert_eq!(
            tree.add_doc_entity(doc, "e", XmlEntityType::XmlInternalGeneralEntity, None, None, Some("v")),
            Err(XmlParserErrors::XmlDTDNoDTD)
        );
        tree.create_int_subset(doc, Some("r"), None, None).unwrap();
        let e = tree
            .add_doc_entity(doc, "e", XmlEntityType::XmlInternalGeneralEntity, None, None, Some("v"))
            .unwrap();
        let p = tree
            .add_doc_entity(doc, "e", XmlEntityType::XmlInternalParameterEntity, None, None, Some("p"))
            .unwrap();
        assert_eq!(tree.get_doc_entity(doc, "e"), Some(e));
        assert_eq!(tree.get_parameter_entity(doc, "e"), Some(p));
        assert_eq!(
            tree.add_doc_entity(doc, "e", XmlEntityType::XmlInternalGeneralEntity, None, None, Some("w")),
            Err(XmlParserErrors::XmlWarEntityRedefined)
        );

        // predefined entities may only be redeclared with their own value
        assert!(tree
            .add_doc_entity(doc, "gt", XmlEntityType::XmlInternalGeneralEntity, None, None, Some("&#62;"))
            .is_ok());
        assert!(tree
            .add_doc_entity(doc, "lt", XmlEntityType::XmlInternalGeneralEntity, None, None, Some("x"))
            .is_err());

        let r = tree.new_reference(Some(doc), "&e;").unwrap();
        assert_eq!(tree.get(r).unwrap().entity(), Some(e));
        assert_eq!(tree.get_content(r).as_deref(), Some("v"));
    }
}
