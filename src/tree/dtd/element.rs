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

use crate::{
    error::{XmlErrorDomain, XmlParserErrors, xml_simple_error},
    tree::{XmlElementContentOccur, XmlElementContentType, XmlElementTypeVal, split_qname2},
};

/// An XML Element content as stored after parsing an element definition
/// in a DTD.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElementContent {
    pub(crate) typ: XmlElementContentType,
    pub(crate) ocur: XmlElementContentOccur,
    pub(crate) name: Option<String>,
    pub(crate) prefix: Option<String>,
    pub(crate) c1: Option<Box<XmlElementContent>>,
    pub(crate) c2: Option<Box<XmlElementContent>>,
}

impl XmlElementContent {
    /// Allocate an element content structure.
    ///
    /// `name` is required for `XmlElementContentElement` and forbidden otherwise.
    /// A prefixed name is split into prefix and local name.
    #[doc(alias = "xmlNewDocElementContent", alias = "xmlNewElementContent")]
    pub fn new(name: Option<&str>, typ: XmlElementContentType) -> Result<Self, XmlParserErrors> {
        match (typ, name) {
            (XmlElementContentType::XmlElementContentElement, None) => {
                return Err(element_content_err("name == NULL"));
            }
            (XmlElementContentType::XmlElementContentElement, Some(_)) => {}
            (_, Some(_)) => return Err(element_content_err("name != NULL")),
            (_, None) => {}
        }
        let (prefix, name) = match name.map(|name| (split_qname2(name), name)) {
            Some((Some((prefix, local)), _)) => (Some(prefix.to_owned()), Some(local.to_owned())),
            Some((None, name)) => (None, Some(name.to_owned())),
            None => (None, None),
        };
        Ok(Self {
            typ,
            ocur: XmlElementContentOccur::XmlElementContentOnce,
            name,
            prefix,
            c1: None,
            c2: None,
        })
    }

    /// Combine two particles into a sequence or a choice.
    pub fn with_children(
        typ: XmlElementContentType,
        c1: XmlElementContent,
        c2: XmlElementContent,
    ) -> Result<Self, XmlParserErrors> {
        let mut ret = Self::new(None, typ)?;
        if !matches!(
            typ,
            XmlElementContentType::XmlElementContentSeq | XmlElementContentType::XmlElementContentOr
        ) {
            return Err(element_content_err("only sequences and choices have children"));
        }
        ret.c1 = Some(Box::new(c1));
        ret.c2 = Some(Box::new(c2));
        Ok(ret)
    }

    pub fn typ(&self) -> XmlElementContentType {
        self.typ
    }

    pub fn ocur(&self) -> XmlElementContentOccur {
        self.ocur
    }

    pub fn set_ocur(&mut self, ocur: XmlElementContentOccur) {
        self.ocur = ocur;
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    pub fn c1(&self) -> Option<&XmlElementContent> {
        self.c1.as_deref()
    }

    pub fn c2(&self) -> Option<&XmlElementContent> {
        self.c2.as_deref()
    }

    /// Build a copy of an element content description.
    #[doc(alias = "xmlCopyElementContent", alias = "xmlCopyDocElementContent")]
    pub fn copy(&self) -> Self {
        self.clone()
    }

    fn is_group(&self) -> bool {
        matches!(
            self.typ,
            XmlElementContentType::XmlElementContentSeq | XmlElementContentType::XmlElementContentOr
        )
    }

    /// This will dump the content of the element content definition
    /// Intended just for the debug routine.
    ///
    /// Output stops with ` ...` once `buf` would grow past `size` bytes.
    #[doc(alias = "xmlSnprintfElementContent")]
    pub fn snprintf(&self, buf: &mut String, size: usize, englob: bool) {
        if size.saturating_sub(buf.len()) < 50 {
            if size.saturating_sub(buf.len()) > 4 && !buf.ends_with('.') {
                buf.push_str(" ...");
            }
            return;
        }
        if englob {
            buf.push('(');
        }
        match self.typ {
            XmlElementContentType::XmlElementContentPCDATA => buf.push_str("#PCDATA"),
            XmlElementContentType::XmlElementContentElement => {
                let name = self.name.as_deref().unwrap_or("");
                let qname_len = name.len() + self.prefix.as_ref().map_or(0, |p| p.len() + 1);
                if size.saturating_sub(buf.len()) < qname_len + 10 {
                    buf.push_str(" ...");
                    return;
                }
                if let Some(prefix) = self.prefix.as_deref() {
                    buf.push_str(prefix);
                    buf.push(':');
                }
                buf.push_str(name);
            }
            XmlElementContentType::XmlElementContentSeq
            | XmlElementContentType::XmlElementContentOr => {
                let is_seq = self.typ == XmlElementContentType::XmlElementContentSeq;
                if let Some(c1) = self.c1.as_deref() {
                    c1.snprintf(buf, size, c1.is_group());
                }
                if size.saturating_sub(buf.len()) < 50 {
                    if size.saturating_sub(buf.len()) > 4 && !buf.ends_with('.') {
                        buf.push_str(" ...");
                    }
                    return;
                }
                buf.push_str(if is_seq { " , " } else { " | " });
                if let Some(c2) = self.c2.as_deref() {
                    // a nested group of the other kind, or a repeated one, needs parentheses
                    let other = if is_seq {
                        XmlElementContentType::XmlElementContentOr
                    } else {
                        XmlElementContentType::XmlElementContentSeq
                    };
                    let englob = c2.typ == other
                        || (c2.typ == self.typ
                            && c2.ocur != XmlElementContentOccur::XmlElementContentOnce);
                    c2.snprintf(buf, size, englob);
                }
            }
        }
        if size.saturating_sub(buf.len()) <= 2 {
            return;
        }
        if englob {
            buf.push(')');
        }
        match self.ocur {
            XmlElementContentOccur::XmlElementContentOnce => {}
            XmlElementContentOccur::XmlElementContentOpt => buf.push('?'),
            XmlElementContentOccur::XmlElementContentMult => buf.push('*'),
            XmlElementContentOccur::XmlElementContentPlus => buf.push('+'),
        }
    }
}

fn element_content_err(msg: &str) -> XmlParserErrors {
    xml_simple_error(
        XmlErrorDomain::XmlFromTree,
        XmlParserErrors::XmlErrArgument,
        None,
        Some(msg),
    );
    XmlParserErrors::XmlErrArgument
}

/// An XML Element declaration from a DTD.
///
/// The declared local name is the name of the declaration node.
#[derive(Debug, Clone)]
pub struct XmlElement {
    pub(crate) etype: XmlElementTypeVal,
    pub(crate) content: Option<XmlElementContent>,
    pub(crate) prefix: Option<String>,
}

impl XmlElement {
    pub fn etype(&self) -> XmlElementTypeVal {
        self.etype
    }

    /// The allowed element content.
    pub fn content(&self) -> Option<&XmlElementContent> {
        self.content.as_ref()
    }

    /// The namespace prefix, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn elem(name: &str) -> XmlElementContent {
        XmlElementContent::new(Some(name), XmlElementContentType::XmlElementContentElement).unwrap()
    }

    #[test]
    fn names_are_required_only_for_elements() {
        assert!(XmlElementContent::new(None, XmlElementContentType::XmlElementContentElement).is_err());
        assert!(XmlElementContent::new(Some("a"), XmlElementContentType::XmlElementContentSeq).is_err());
        let e = elem("p:a");
        assert_eq!(e.prefix(), Some("p"));
        assert_eq!(e.name(), Some("a"));
    }

    #[test]
    fn content_model_printing() {
        let mut inner =
            XmlElementContent::with_children(XmlElementContentType::XmlElementContentOr, elem("b"), elem("c"))
                .unwrap();
        inner.set_ocur(XmlElementContentOccur::XmlElementContentMult);
        let mut seq =
            XmlElementContent::with_children(XmlElementContentType::XmlElementContentSeq, elem("p:a"), inner)
                .unwrap();
        seq.set_ocur(XmlElementContentOccur::XmlElementContentPlus);

        let mut buf = String::new();
        seq.snprintf(&mut buf, 5000, true);
        assert_eq!(buf, "(p:a , (b | c)*)+");

        let mut buf = String::new();
        seq.snprintf(&mut buf, 55, true);
        assert!(buf.ends_with(" ..."));

        assert_eq!(seq.copy(), seq);
    }
}
