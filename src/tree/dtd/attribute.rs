use crate::tree::{XmlAttributeDefault, XmlAttributeType};

use super::XmlEnumeration;

/// An Attribute declaration in a DTD.
///
/// The declared name is the name of the declaration node.
#[derive(Debug, Clone)]
pub struct XmlAttribute {
    pub(crate) atype: XmlAttributeType,
    pub(crate) def: XmlAttributeDefault,
    pub(crate) default_value: Option<String>,
    pub(crate) tree: Option<XmlEnumeration>,
    pub(crate) prefix: Option<String>,
    // element holding the attribute
    pub(crate) elem: String,
}

impl XmlAttribute {
    pub fn atype(&self) -> XmlAttributeType {
        self.atype
    }

    pub fn def(&self) -> XmlAttributeDefault {
        self.def
    }

    pub fn default_value(&self) -> Option<&str> {
        self.default_value.as_deref()
    }

    /// The enumeration of allowed values, if any.
    pub fn tree(&self) -> Option<&XmlEnumeration> {
        self.tree.as_ref()
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn elem(&self) -> &str {
        &self.elem
    }
}
