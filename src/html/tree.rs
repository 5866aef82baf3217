//! Provide methods and data structures for handling HTML tree.
//! This module is based on `libxml/HTMLtree.h`, `HTMLtree.c`, and so on in `libxml2-v2.11.8`.
//!
//! Please refer to original libxml2 documents also.

// Copyright of the original code is the following.
// --------
// Summary: specific APIs to process HTML tree, especially serialization
// Description: this module implements a few function needed to process
//              tree in an HTML specific way.
//
// Copy: See Copyright for the status of this software.
//
// Author: Daniel Veillard
// --------
// HTMLtree.c : implementation of access function for an HTML tree.
//
// See Copyright for the status of this software.
//
// daniel@veillard.com

use std::io::Write;

use crate::{
    encoding::{XmlCharEncodingHandler, find_encoding_handler},
    error::XmlParserErrors,
    io::XmlOutputBuffer,
    save::xml_save_err,
    tree::{
        XML_STRING_TEXT_NOENC, XmlBuffer, XmlDocProperties, XmlElementType, XmlNodeId, XmlTree,
    },
    uri::escape_url_except,
};

use super::html_tag_lookup;

/// These are the HTML attributes which will be output
/// in minimized form, i.e. `<option selected="selected">` will be
/// output as `<option selected>`, as per XSLT 1.0 16.2 "HTML Output Method"
const HTML_BOOLEAN_ATTRS: &[&str] = &[
    "checked", "compact", "declare", "defer", "disabled", "ismap", "multiple", "nohref",
    "noresize", "noshade", "nowrap", "readonly", "selected",
];

/// Characters kept verbatim in URI valued attributes.
const URI_ATTR_KEEP: &[u8] = b"\"#$%&+,/:;<=>?@[\\]^`{|}";

fn is_ws_html(c: u8) -> bool {
    matches!(c, b' ' | b'\t' | b'\n' | b'\x0C' | b'\r')
}

/// Creates a new HTML document without a DTD node if `uri` and `external_id` are `None`.
#[doc(alias = "htmlNewDocNoDtD")]
pub fn html_new_doc_no_dtd(
    tree: &mut XmlTree,
    uri: Option<&str>,
    external_id: Option<&str>,
) -> Result<XmlNodeId, XmlParserErrors> {
    let doc = tree.new_doc_internal(XmlElementType::XmlHTMLDocumentNode, None);
    if let Some(d) = tree.doc_mut(doc) {
        d.set_standalone(1);
        d.set_properties(
            XmlDocProperties::XmlDocHTML as i32 | XmlDocProperties::XmlDocUserbuilt as i32,
        );
    }
    if uri.is_some() || external_id.is_some() {
        if let Err(err) = tree.create_int_subset(doc, Some("html"), external_id, uri) {
            tree.free_doc(doc);
            return Err(err);
        }
    }
    Ok(doc)
}

/// Creates a new HTML document.
///
/// Without identifiers, the HTML 4.0 Transitional DTD is referenced.
#[doc(alias = "htmlNewDoc")]
pub fn html_new_doc(
    tree: &mut XmlTree,
    uri: Option<&str>,
    external_id: Option<&str>,
) -> Result<XmlNodeId, XmlParserErrors> {
    if uri.is_none() && external_id.is_none() {
        return html_new_doc_no_dtd(
            tree,
            Some("http://www.w3.org/TR/REC-html40/loose.dtd"),
            Some("-//W3C//DTD HTML 4.0 Transitional//EN"),
        );
    }
    html_new_doc_no_dtd(tree, uri, external_id)
}

/// The location of an encoding declaration inside a meta attribute.
struct MetaEncoding {
    attr: XmlNodeId,
    value: String,
    start: usize,
    end: usize,
}

impl MetaEncoding {
    fn encoding(&self) -> &str {
        &self.value[self.start..self.end]
    }

    /// The attribute value with the declared encoding replaced by `encoding`.
    #[doc(alias = "htmlUpdateMetaEncoding")]
    fn updated(&self, encoding: &str) -> String {
        // the pseudo "HTML" encoding only produces ASCII
        let encoding = if encoding.eq_ignore_ascii_case("HTML") {
            "ASCII"
        } else {
            encoding
        };
        format!(
            "{}{encoding}{}",
            &self.value[..self.start],
            &self.value[self.end..]
        )
    }
}

fn find_first_child(tree: &XmlTree, parent: XmlNodeId, name: &str) -> Option<XmlNodeId> {
    tree.child_nodes(parent).find(|&child| {
        tree.get(child).is_some_and(|node| {
            node.element_type() == XmlElementType::XmlElementNode
                && node.ns().is_none()
                && node.name().is_some_and(|n| n.eq_ignore_ascii_case(name))
        })
    })
}

#[doc(alias = "htmlFindHead")]
fn find_head(tree: &XmlTree, doc: XmlNodeId) -> Option<XmlNodeId> {
    let html = find_first_child(tree, doc, "html")?;
    find_first_child(tree, html, "head")
}

/// Locate the `charset=` part of a `Content-Type` value.
///
/// Returns the byte range of the encoding name.
#[doc(alias = "htmlParseContentType")]
pub(crate) fn parse_content_type(val: &str) -> Option<(usize, usize)> {
    let bytes = val.as_bytes();
    let skip_ws = |mut p: usize| {
        while bytes.get(p).copied().is_some_and(is_ws_html) {
            p += 1;
        }
        p
    };
    let mut p = 0;
    loop {
        while !bytes.get(p)?.eq_ignore_ascii_case(&b'c') {
            p += 1;
        }
        p += 1;
        if !bytes
            .get(p..p + 6)
            .is_some_and(|s| s.eq_ignore_ascii_case(b"harset"))
        {
            continue;
        }
        p = skip_ws(p + 6);
        if bytes.get(p) != Some(&b'=') {
            continue;
        }
        p = skip_ws(p + 1);
        let &first = bytes.get(p)?;
        if first == b'"' || first == b'\'' {
            p = skip_ws(p + 1);
            let start = p;
            let mut end = start;
            loop {
                let &c = bytes.get(p)?;
                if c == first {
                    return Some((start, end));
                }
                if !is_ws_html(c) {
                    end = p + 1;
                }
                p += 1;
            }
        }
        let start = p;
        while bytes
            .get(p)
            .is_some_and(|&c| c != b';' && !is_ws_html(c))
        {
            p += 1;
        }
        return Some((start, p));
    }
}

/// The value of an attribute made of a single text node, if so.
fn single_text_value(tree: &XmlTree, attr: XmlNodeId) -> Option<&str> {
    let child = tree.children(attr)?;
    if tree.element_type(child) != XmlElementType::XmlTextNode || tree.next(child).is_some() {
        return None;
    }
    tree.get(child)?.content()
}

/// Find the attribute of a `meta` element declaring the encoding.
///
/// The flag tells whether it is the `content` of a `Content-Type` declaration.
#[doc(alias = "htmlFindMetaEncodingAttr")]
fn find_meta_encoding_attr(tree: &XmlTree, elem: XmlNodeId) -> Option<(XmlNodeId, bool)> {
    if !tree
        .name(elem)
        .is_some_and(|name| name.eq_ignore_ascii_case("meta"))
    {
        return None;
    }
    let mut content = None;
    let mut is_content_type = false;
    for attr in tree.attributes(elem) {
        let Some(node) = tree.get(attr) else {
            continue;
        };
        if node.ns().is_some() {
            continue;
        }
        let name = node.name().unwrap_or("");
        if name.eq_ignore_ascii_case("charset") {
            return Some((attr, false));
        }
        if name.eq_ignore_ascii_case("content") {
            content = Some(attr);
        }
        if name.eq_ignore_ascii_case("http-equiv")
            && single_text_value(tree, attr)
                .is_some_and(|value| value.eq_ignore_ascii_case("Content-Type"))
        {
            is_content_type = true;
        }
    }
    content.filter(|_| is_content_type).map(|attr| (attr, true))
}

#[doc(alias = "htmlParseMetaEncoding")]
fn parse_meta_encoding(tree: &XmlTree, elem: XmlNodeId) -> Option<MetaEncoding> {
    let node = tree.get(elem)?;
    if node.element_type() != XmlElementType::XmlElementNode || node.ns().is_some() {
        return None;
    }
    let (attr, is_content_type) = find_meta_encoding_attr(tree, elem)?;
    let value = single_text_value(tree, attr).unwrap_or("").to_owned();
    let (start, end) = if is_content_type {
        parse_content_type(&value)?
    } else {
        let trimmed = value.trim_start_matches(|c: char| c.is_ascii() && is_ws_html(c as u8));
        let start = value.len() - trimmed.len();
        let trimmed = value.trim_end_matches(|c: char| c.is_ascii() && is_ws_html(c as u8));
        (start, trimmed.len().max(start))
    };
    Some(MetaEncoding {
        attr,
        value,
        start,
        end,
    })
}

/// Encoding definition lookup in the Meta tags
///
/// Returns the declared encoding, if any.
#[doc(alias = "htmlGetMetaEncoding")]
pub fn html_get_meta_encoding(tree: &XmlTree, doc: XmlNodeId) -> Option<String> {
    let head = find_head(tree, doc)?;
    tree.child_nodes(head)
        .find_map(|node| parse_meta_encoding(tree, node))
        .map(|menc| menc.encoding().to_owned())
}

/// Creates or updates the meta tags declaring the encoding.
///
/// This does not change the document content encoding.
///
/// Returns `Ok(false)` if the document has no `head` element.
#[doc(alias = "htmlSetMetaEncoding")]
pub fn html_set_meta_encoding(
    tree: &mut XmlTree,
    doc: XmlNodeId,
    encoding: &str,
) -> Result<bool, XmlParserErrors> {
    let Some(head) = find_head(tree, doc) else {
        return Ok(false);
    };
    let updates = tree
        .child_nodes(head)
        .filter_map(|meta| {
            let menc = parse_meta_encoding(tree, meta)?;
            let name = tree.name(menc.attr)?.to_owned();
            Some((meta, name, menc.updated(encoding)))
        })
        .collect::<Vec<_>>();
    if !updates.is_empty() {
        for (meta, name, value) in updates {
            tree.set_ns_prop(meta, None, &name, Some(&value))?;
        }
        return Ok(true);
    }

    let meta = tree.new_doc_node(tree.document(head), None, "meta", None)?;
    if let Err(err) = tree.new_prop(Some(meta), "charset", Some(encoding)) {
        tree.free_node(meta);
        return Err(err);
    }
    match tree.children(head) {
        Some(first) => tree.add_prev_sibling(first, meta)?,
        None => tree.add_child(head, meta)?,
    };
    Ok(true)
}

/// Determine if a given attribute is a boolean attribute.
#[doc(alias = "htmlIsBooleanAttr")]
pub fn html_is_boolean_attr(name: &str) -> bool {
    HTML_BOOLEAN_ATTRS
        .iter()
        .any(|attr| attr.eq_ignore_ascii_case(name))
}

fn put(buf: &mut XmlOutputBuffer, s: &str) {
    // failures are latched in the buffer
    buf.write_str(s).ok();
}

fn put_qname(buf: &mut XmlOutputBuffer, tree: &XmlTree, node: XmlNodeId) {
    let prefix = tree
        .get(node)
        .and_then(|node| node.ns())
        .and_then(|ns| tree.ns(ns))
        .and_then(|ns| ns.prefix());
    if let Some(prefix) = prefix {
        put(buf, prefix);
        put(buf, ":");
    }
    put(buf, tree.name(node).unwrap_or(""));
}

fn is_text_like(tree: &XmlTree, node: Option<XmlNodeId>) -> bool {
    node.is_some_and(|node| {
        matches!(
            tree.element_type(node),
            XmlElementType::XmlTextNode | XmlElementType::XmlEntityRefNode
        )
    })
}

fn name_starts_with_p(tree: &XmlTree, node: Option<XmlNodeId>) -> bool {
    node.and_then(|node| tree.name(node))
        .is_none_or(|name| name.starts_with('p'))
}

fn escape_html_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            c => out.push(c),
        }
    }
}

fn escape_html_attr(text: &str, out: &mut String) {
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            // keep template syntax such as `&{...}` intact
            '&' if chars.peek() == Some(&'{') => out.push('&'),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

/// The escaped value of an attribute, entity references kept as `&name;`.
fn attr_value(tree: &XmlTree, attr: XmlNodeId) -> String {
    let mut out = String::new();
    for child in tree.child_nodes(attr) {
        let Some(node) = tree.get(child) else {
            continue;
        };
        match node.element_type() {
            XmlElementType::XmlTextNode => escape_html_attr(node.content().unwrap_or(""), &mut out),
            XmlElementType::XmlEntityRefNode => {
                out.push('&');
                out.push_str(node.name().unwrap_or(""));
                out.push(';');
            }
            _ => {}
        }
    }
    out
}

#[doc(alias = "htmlDtdDumpOutput")]
fn html_dtd_dump(buf: &mut XmlOutputBuffer, tree: &XmlTree, doc: XmlNodeId) {
    let Some(dtd_id) = tree.doc(doc).and_then(|doc| doc.int_subset()) else {
        return;
    };
    let Some(dtd) = tree.dtd(dtd_id) else {
        return;
    };
    put(buf, "<!DOCTYPE ");
    put(buf, tree.name(dtd_id).unwrap_or(""));
    if let Some(external_id) = dtd.external_id() {
        put(buf, " PUBLIC ");
        buf.write_quoted_str(external_id).ok();
        if let Some(system_id) = dtd.system_id() {
            put(buf, " ");
            buf.write_quoted_str(system_id).ok();
        }
    } else if let Some(system_id) = dtd
        .system_id()
        .filter(|&system_id| system_id != "about:legacy-compat")
    {
        put(buf, " SYSTEM ");
        buf.write_quoted_str(system_id).ok();
    }
    put(buf, ">\n");
}

#[doc(alias = "htmlAttrDumpOutput")]
fn html_attr_dump(buf: &mut XmlOutputBuffer, tree: &XmlTree, attr: XmlNodeId) {
    let Some(node) = tree.get(attr) else {
        return;
    };
    let name = node.name().unwrap_or("");
    put(buf, " ");
    put_qname(buf, tree, attr);
    if node.children().is_none() || html_is_boolean_attr(name) {
        return;
    }
    let value = attr_value(tree, attr);
    put(buf, "=");
    let parent = node.parent().and_then(|parent| tree.get(parent));
    let is_uri = node.ns().is_none()
        && parent.is_some_and(|parent| parent.ns().is_none())
        && (["href", "action", "src"]
            .iter()
            .any(|uri_attr| name.eq_ignore_ascii_case(uri_attr))
            || (name.eq_ignore_ascii_case("name")
                && parent
                    .and_then(|parent| parent.name())
                    .is_some_and(|parent| parent.eq_ignore_ascii_case("a"))));
    if is_uri {
        let trimmed = value.trim_start_matches([' ', '\t', '\n', '\r']);
        buf.write_quoted_str(&escape_url_except(trimmed, URI_ATTR_KEEP))
            .ok();
    } else {
        buf.write_quoted_str(&value).ok();
    }
}

fn html_ns_list_dump(buf: &mut XmlOutputBuffer, tree: &XmlTree, node: XmlNodeId) {
    for ns in tree.ns_defs(node) {
        let Some(ns) = tree.ns(ns) else {
            continue;
        };
        match ns.prefix() {
            Some("xml") => continue,
            Some(prefix) => {
                put(buf, " xmlns:");
                put(buf, prefix);
            }
            None => put(buf, " xmlns"),
        }
        put(buf, "=");
        buf.write_quoted_str(ns.href()).ok();
    }
}

/// Dump an HTML node and its subtree.
///
/// With an `encoding` other than `"HTML"`, encoding declarations in `meta`
/// elements are rewritten and a `<meta charset>` is added to a `head` lacking one.
#[doc(alias = "htmlNodeDumpInternal")]
pub(crate) fn html_node_dump_internal(
    buf: &mut XmlOutputBuffer,
    tree: &XmlTree,
    root: XmlNodeId,
    encoding: Option<&str>,
    format: bool,
) {
    let mut meta_head = None;
    let mut parent = tree.parent(root);
    let mut cur = root;

    loop {
        let Some(node) = tree.get(cur) else {
            return;
        };
        match node.element_type() {
            XmlElementType::XmlHTMLDocumentNode | XmlElementType::XmlDocumentNode => {
                html_dtd_dump(buf, tree, cur);
                if let Some(children) = node.children() {
                    parent = Some(cur);
                    cur = children;
                    continue;
                }
                put(buf, "\n");
            }
            XmlElementType::XmlElementNode => {
                let name = node.name().unwrap_or("");
                let info = node.ns().is_none().then(|| html_tag_lookup(name)).flatten();
                let mut menc = None;
                let mut add_meta = false;
                if let Some(encoding) = encoding.filter(|_| node.ns().is_none()) {
                    menc = parse_meta_encoding(tree, cur);
                    let under_root_html = parent.is_some_and(|parent| {
                        tree.get(parent).is_some_and(|p| {
                            p.ns().is_none()
                                && p.name().is_some_and(|n| n.eq_ignore_ascii_case("html"))
                                && p.parent().is_some_and(|pp| tree.parent(pp).is_none())
                        })
                    });
                    if !encoding.eq_ignore_ascii_case("HTML")
                        && name.eq_ignore_ascii_case("head")
                        && under_root_html
                        && meta_head.is_none()
                        && !tree
                            .child_nodes(cur)
                            .any(|child| find_meta_encoding_attr(tree, child).is_some())
                    {
                        meta_head = Some(cur);
                        add_meta = true;
                    }
                }

                put(buf, "<");
                put_qname(buf, tree, cur);
                html_ns_list_dump(buf, tree, cur);
                for attr in tree.attributes(cur) {
                    match (&menc, encoding) {
                        (Some(menc), Some(encoding)) if menc.attr == attr => {
                            put(buf, " ");
                            put(buf, tree.name(attr).unwrap_or(""));
                            put(buf, "=");
                            buf.write_quoted_str(&menc.updated(encoding)).ok();
                        }
                        _ => html_attr_dump(buf, tree, attr),
                    }
                }

                if info.is_some_and(|info| info.empty) {
                    put(buf, ">");
                } else if let Some(children) = node.children() {
                    put(buf, ">");
                    if format
                        && (add_meta
                            || (info.is_some_and(|info| info.is_block())
                                && !is_text_like(tree, Some(children))
                                && node.children() != node.last()
                                && !name.starts_with('p')))
                    {
                        put(buf, "\n");
                    }
                    if add_meta {
                        put(buf, "<meta charset=\"");
                        put(buf, encoding.unwrap_or(""));
                        put(buf, "\">");
                        if format && !is_text_like(tree, Some(children)) {
                            put(buf, "\n");
                        }
                    }
                    parent = Some(cur);
                    cur = children;
                    continue;
                } else if info.is_some_and(|info| {
                    info.save_end_tag != 0 && info.name != "html" && info.name != "body"
                }) {
                    put(buf, ">");
                } else {
                    if add_meta {
                        put(buf, "><meta charset=\"");
                        put(buf, encoding.unwrap_or(""));
                        put(buf, "\"></");
                    } else {
                        put(buf, "></");
                    }
                    put_qname(buf, tree, cur);
                    put(buf, ">");
                }

                if format
                    && info.is_some_and(|info| info.is_block())
                    && node.next().is_some()
                    && !is_text_like(tree, node.next())
                    && !name_starts_with_p(tree, parent)
                {
                    put(buf, "\n");
                }
            }
            XmlElementType::XmlAttributeNode => html_attr_dump(buf, tree, cur),
            XmlElementType::XmlTextNode => {
                if let Some(content) = node.content() {
                    let raw_parent = parent.and_then(|parent| tree.name(parent)).is_some_and(|name| {
                        name.eq_ignore_ascii_case("script") || name.eq_ignore_ascii_case("style")
                    });
                    if node.name() != Some(XML_STRING_TEXT_NOENC) && !raw_parent {
                        buf.write_str_with_escape(content, Some(escape_html_text)).ok();
                    } else {
                        put(buf, content);
                    }
                }
            }
            XmlElementType::XmlCommentNode => {
                if let Some(content) = node.content() {
                    put(buf, "<!--");
                    put(buf, content);
                    put(buf, "-->");
                }
            }
            XmlElementType::XmlPINode => {
                if let Some(name) = node.name() {
                    put(buf, "<?");
                    put(buf, name);
                    if let Some(content) = node.content() {
                        put(buf, " ");
                        put(buf, content);
                    }
                    put(buf, ">");
                }
            }
            XmlElementType::XmlEntityRefNode => {
                put(buf, "&");
                put(buf, node.name().unwrap_or(""));
                put(buf, ";");
            }
            // preserved content
            XmlElementType::XmlCDATASectionNode => {
                if let Some(content) = node.content() {
                    put(buf, content);
                }
            }
            _ => {}
        }

        loop {
            if cur == root {
                return;
            }
            if let Some(next) = tree.next(cur) {
                cur = next;
                break;
            }
            let Some(up) = parent else {
                return;
            };
            cur = up;
            parent = tree.parent(cur);

            if matches!(
                tree.element_type(cur),
                XmlElementType::XmlHTMLDocumentNode | XmlElementType::XmlDocumentNode
            ) {
                put(buf, "\n");
                continue;
            }
            let Some(node) = tree.get(cur) else {
                return;
            };
            let info = if format && node.ns().is_none() {
                node.name().and_then(html_tag_lookup)
            } else {
                None
            };
            if info.is_some_and(|info| info.is_block())
                && !is_text_like(tree, node.last())
                && (node.children() != node.last() || meta_head == Some(cur))
                && !name_starts_with_p(tree, Some(cur))
            {
                put(buf, "\n");
            }
            put(buf, "</");
            put_qname(buf, tree, cur);
            put(buf, ">");
            if info.is_some_and(|info| info.is_block())
                && node.next().is_some()
                && !is_text_like(tree, node.next())
                && !name_starts_with_p(tree, parent)
            {
                put(buf, "\n");
            }
            if meta_head == Some(cur) {
                meta_head = None;
            }
        }
    }
}

/// The output encoder for `encoding`, defaulting to ASCII with character references.
fn find_output_encoder(encoding: Option<&str>) -> Result<XmlCharEncodingHandler, XmlParserErrors> {
    let encoding = encoding.unwrap_or("HTML");
    find_encoding_handler(encoding).ok_or_else(|| {
        xml_save_err(XmlParserErrors::XmlSaveUnknownEncoding, None, Some(encoding));
        XmlParserErrors::XmlErrUnsupportedEncoding
    })
}

/// Dump an HTML node, recursive behaviour, children are printed too,
/// and formatting returns are added. Always uses UTF-8.
///
/// Returns the number of bytes written.
#[doc(alias = "htmlNodeDump")]
pub fn html_node_dump(
    buf: &mut XmlBuffer,
    tree: &XmlTree,
    node: XmlNodeId,
) -> Result<usize, XmlParserErrors> {
    if !tree.contains(node) {
        return Err(XmlParserErrors::XmlErrArgument);
    }
    let before = buf.len();
    let mut out = XmlOutputBuffer::from_writer(&mut *buf, None);
    html_node_dump_internal(&mut out, tree, node, None, true);
    out.close()?;
    Ok(buf.len() - before)
}

/// Dump an HTML node to `out`, in `encoding` or ASCII if `None`.
///
/// Returns the number of bytes written.
#[doc(alias = "htmlNodeDumpFileFormat")]
pub fn html_node_dump_file_format(
    out: impl Write,
    tree: &XmlTree,
    node: XmlNodeId,
    encoding: Option<&str>,
    format: bool,
) -> Result<usize, XmlParserErrors> {
    let handler = find_output_encoder(encoding)?;
    let mut buf = XmlOutputBuffer::from_writer(out, Some(handler));
    html_node_dump_internal(&mut buf, tree, node, None, format);
    buf.close()
}

/// Same as [`html_node_dump_file_format`] with formatting enabled.
#[doc(alias = "htmlNodeDumpFile")]
pub fn html_node_dump_file(
    out: impl Write,
    tree: &XmlTree,
    node: XmlNodeId,
) -> Result<usize, XmlParserErrors> {
    html_node_dump_file_format(out, tree, node, None, true)
}

/// Dump an HTML document in memory, in the document encoding or ASCII
/// with character references if it has none.
#[doc(alias = "htmlDocDumpMemoryFormat")]
pub fn html_doc_dump_memory_format(
    tree: &XmlTree,
    doc: XmlNodeId,
    format: bool,
) -> Result<Vec<u8>, XmlParserErrors> {
    let encoding = tree.doc(doc).ok_or(XmlParserErrors::XmlErrArgument)?.encoding();
    let handler = find_output_encoder(encoding)?;
    let mut buf = XmlOutputBuffer::new(Some(handler));
    html_node_dump_internal(&mut buf, tree, doc, None, format);
    buf.into_content()
}

/// Same as [`html_doc_dump_memory_format`] with formatting enabled.
#[doc(alias = "htmlDocDumpMemory")]
pub fn html_doc_dump_memory(tree: &XmlTree, doc: XmlNodeId) -> Result<Vec<u8>, XmlParserErrors> {
    html_doc_dump_memory_format(tree, doc, true)
}

/// Dump an HTML node into an output buffer.
#[doc(alias = "htmlNodeDumpFormatOutput")]
pub fn html_node_dump_format_output(
    buf: &mut XmlOutputBuffer,
    tree: &XmlTree,
    node: XmlNodeId,
    format: bool,
) {
    html_node_dump_internal(buf, tree, node, None, format);
}

/// Same as [`html_node_dump_format_output`] with formatting enabled.
#[doc(alias = "htmlNodeDumpOutput")]
pub fn html_node_dump_output(buf: &mut XmlOutputBuffer, tree: &XmlTree, node: XmlNodeId) {
    html_node_dump_internal(buf, tree, node, None, true);
}

/// Dump an HTML document into an output buffer.
#[doc(alias = "htmlDocContentDumpFormatOutput")]
pub fn html_doc_content_dump_format_output(
    buf: &mut XmlOutputBuffer,
    tree: &XmlTree,
    doc: XmlNodeId,
    format: bool,
) {
    html_node_dump_internal(buf, tree, doc, None, format);
}

/// Same as [`html_doc_content_dump_format_output`] with formatting enabled.
#[doc(alias = "htmlDocContentDumpOutput")]
pub fn html_doc_content_dump_output(buf: &mut XmlOutputBuffer, tree: &XmlTree, doc: XmlNodeId) {
    html_node_dump_internal(buf, tree, doc, None, true);
}

/// Dump an HTML document to `out`.
///
/// Returns the number of bytes written.
#[doc(alias = "htmlDocDump")]
pub fn html_doc_dump(
    out: impl Write,
    tree: &XmlTree,
    doc: XmlNodeId,
) -> Result<usize, XmlParserErrors> {
    let encoding = tree.doc(doc).ok_or(XmlParserErrors::XmlErrArgument)?.encoding();
    let handler = find_output_encoder(encoding)?;
    let mut buf = XmlOutputBuffer::from_writer(out, Some(handler));
    html_node_dump_internal(&mut buf, tree, doc, None, true);
    buf.close()
}

/// Dump an HTML document to a file. If `filename` is `"-"` the stdout file is used.
///
/// With an explicit `encoding`, the meta tags declaring the encoding are
/// updated in the output, or a `<meta charset>` is added to `head`.
///
/// Returns the number of bytes written.
#[doc(alias = "htmlSaveFileFormat")]
pub fn html_save_file_format(
    filename: &str,
    tree: &XmlTree,
    doc: XmlNodeId,
    encoding: Option<&str>,
    format: bool,
) -> Result<usize, XmlParserErrors> {
    if tree.doc(doc).is_none() {
        return Err(XmlParserErrors::XmlErrArgument);
    }
    let handler = find_output_encoder(encoding)?;
    let mut buf = XmlOutputBuffer::from_uri(filename, Some(handler))?;
    html_node_dump_internal(&mut buf, tree, doc, encoding, format);
    buf.close()
}

/// Same as [`html_save_file_format`] without encoding, with formatting enabled.
#[doc(alias = "htmlSaveFile")]
pub fn html_save_file(
    filename: &str,
    tree: &XmlTree,
    doc: XmlNodeId,
) -> Result<usize, XmlParserErrors> {
    html_save_file_format(filename, tree, doc, None, true)
}

/// Same as [`html_save_file_format`] with formatting enabled.
#[doc(alias = "htmlSaveFileEnc")]
pub fn html_save_file_enc(
    filename: &str,
    tree: &XmlTree,
    doc: XmlNodeId,
    encoding: Option<&str>,
) -> Result<usize, XmlParserErrors> {
    html_save_file_format(filename, tree, doc, encoding, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dump(tree: &XmlTree, node: XmlNodeId, encoding: Option<&str>, format: bool) -> String {
        let mut buf = XmlOutputBuffer::new(None);
        html_node_dump_internal(&mut buf, tree, node, encoding, format);
        String::from_utf8(buf.into_content().unwrap()).unwrap()
    }

    fn skeleton(tree: &mut XmlTree) -> (XmlNodeId, XmlNodeId, XmlNodeId) {
        let doc = html_new_doc_no_dtd(tree, None, None).unwrap();
        let html = tree.new_doc_node(Some(doc), None, "html", None).unwrap();
        tree.set_root_element(doc, html).unwrap();
        let head = tree.new_child(html, None, "head", None).unwrap();
        let body = tree.new_child(html, None, "body", None).unwrap();
        (doc, head, body)
    }

    #[test]
    fn new_doc_has_html_properties() {
        let mut tree = XmlTree::new();
        let doc = html_new_doc(&mut tree, None, None).unwrap();
        assert_eq!(tree.element_type(doc), XmlElementType::XmlHTMLDocumentNode);
        let d = tree.doc(doc).unwrap();
        assert!(d.has_property(XmlDocProperties::XmlDocHTML));
        assert_eq!(d.standalone(), 1);
        let dtd = tree.dtd(tree.get_int_subset(doc).unwrap()).unwrap();
        assert_eq!(dtd.external_id(), Some("-//W3C//DTD HTML 4.0 Transitional//EN"));

        let doc = html_new_doc_no_dtd(&mut tree, None, None).unwrap();
        assert!(tree.get_int_subset(doc).is_none());
    }

    #[test]
    fn boolean_attributes() {
        assert!(html_is_boolean_attr("checked"));
        assert!(html_is_boolean_attr("SELECTED"));
        assert!(!html_is_boolean_attr("href"));
    }

    #[test]
    fn content_type_parsing() {
        let value = "text/html; charset=ISO-8859-1";
        let (start, end) = parse_content_type(value).unwrap();
        assert_eq!(&value[start..end], "ISO-8859-1");
        let value = "text/html; Charset = \" utf-8 \"";
        let (start, end) = parse_content_type(value).unwrap();
        assert_eq!(&value[start..end], "utf-8");
        assert!(parse_content_type("text/html").is_none());
        assert!(parse_content_type("charset=\"open").is_none());
    }

    #[test]
    fn meta_encoding_round_trip() {
        let mut tree = XmlTree::new();
        let (doc, head, _) = skeleton(&mut tree);
        assert_eq!(html_get_meta_encoding(&tree, doc), None);
        assert_eq!(html_set_meta_encoding(&mut tree, doc, "UTF-8"), Ok(true));
        assert_eq!(html_get_meta_encoding(&tree, doc).as_deref(), Some("UTF-8"));
        assert_eq!(tree.child_element_count(head), 1);

        // an existing declaration is updated in place
        assert_eq!(html_set_meta_encoding(&mut tree, doc, "HTML"), Ok(true));
        assert_eq!(html_get_meta_encoding(&tree, doc).as_deref(), Some("ASCII"));
        assert_eq!(tree.child_element_count(head), 1);

        let bare = html_new_doc_no_dtd(&mut tree, None, None).unwrap();
        assert_eq!(html_set_meta_encoding(&mut tree, bare, "UTF-8"), Ok(false));
    }

    #[test]
    fn http_equiv_declaration_is_found() {
        let mut tree = XmlTree::new();
        let (doc, head, _) = skeleton(&mut tree);
        let meta = tree.new_child(head, None, "meta", None).unwrap();
        tree.set_prop(meta, "http-equiv", Some("Content-Type"))
            .unwrap();
        tree.set_prop(meta, "content", Some("text/html; charset=koi8-r"))
            .unwrap();
        assert_eq!(html_get_meta_encoding(&tree, doc).as_deref(), Some("koi8-r"));
        html_set_meta_encoding(&mut tree, doc, "UTF-8").unwrap();
        assert_eq!(
            tree.get_prop(meta, "content").as_deref(),
            Some("text/html; charset=UTF-8")
        );
    }

    #[test]
    fn element_layout() {
        let mut tree = XmlTree::new();
        let (doc, head, body) = skeleton(&mut tree);
        tree.new_text_child(head, None, "title", Some("T")).unwrap();
        let p = tree.new_text_child(body, None, "p", Some("a < b")).unwrap();
        tree.new_child(p, None, "br", None).unwrap();
        let input = tree.new_child(body, None, "input", None).unwrap();
        tree.set_prop(input, "checked", Some("checked")).unwrap();
        let a = tree.new_child(body, None, "a", None).unwrap();
        tree.set_prop(a, "href", Some(" x y.html?a=1&b=2")).unwrap();
        assert_eq!(
            dump(&tree, doc, None, false),
            concat!(
                "<html><head><title>T</title></head><body>",
                "<p>a &lt; b<br></p><input checked>",
                "<a href=\"x%20y.html?a=1&amp;b=2\"></a></body></html>\n"
            )
        );
    }

    #[test]
    fn formatted_layout() {
        let mut tree = XmlTree::new();
        let (doc, head, body) = skeleton(&mut tree);
        tree.new_text_child(head, None, "title", Some("T")).unwrap();
        tree.new_child(body, None, "div", None).unwrap();
        tree.new_child(body, None, "div", None).unwrap();
        assert_eq!(
            dump(&tree, doc, None, true),
            "<html>\n<head><title>T</title></head>\n<body>\n<div></div>\n<div></div>\n</body>\n</html>\n"
        );
    }

    #[test]
    fn script_content_is_raw() {
        let mut tree = XmlTree::new();
        let (doc, head, _) = skeleton(&mut tree);
        tree.new_text_child(head, None, "script", Some("if (a < b) {}"))
            .unwrap();
        assert_eq!(
            dump(&tree, doc, None, false),
            "<html><head><script>if (a < b) {}</script></head><body></body></html>\n"
        );
    }

    #[test]
    fn meta_charset_is_added_with_encoding() {
        let mut tree = XmlTree::new();
        let (doc, head, _) = skeleton(&mut tree);
        tree.new_text_child(head, None, "title", Some("T")).unwrap();
        assert_eq!(
            dump(&tree, doc, Some("UTF-8"), false),
            "<html><head><meta charset=\"UTF-8\"><title>T</title></head><body></body></html>\n"
        );
        assert_eq!(
            dump(&tree, doc, Some("HTML"), false),
            "<html><head><title>T</title></head><body></body></html>\n"
        );
        // the tree is left untouched
        assert_eq!(tree.child_element_count(head), 1);
    }

    #[test]
    fn doctype_and_ascii_fallback() {
        let mut tree = XmlTree::new();
        let doc = html_new_doc(&mut tree, None, None).unwrap();
        let html = tree.new_doc_node(Some(doc), None, "html", None).unwrap();
        tree.set_root_element(doc, html).unwrap();
        let text = tree.new_doc_text(Some(doc), "é");
        tree.add_child(html, text).unwrap();
        let out = html_doc_dump_memory_format(&tree, doc, false).unwrap();
        assert_eq!(
            out,
            concat!(
                "<!DOCTYPE html PUBLIC \"-//W3C//DTD HTML 4.0 Transitional//EN\" ",
                "\"http://www.w3.org/TR/REC-html40/loose.dtd\">\n",
                "<html>&#233;</html>\n"
            )
            .as_bytes()
        );
    }

    #[test]
    fn node_dump_into_buffer() {
        let mut tree = XmlTree::new();
        let (_, _, body) = skeleton(&mut tree);
        tree.new_child(body, None, "hr", None).unwrap();
        let mut buf = XmlBuffer::new();
        let len = html_node_dump(&mut buf, &tree, body).unwrap();
        assert_eq!(buf.content(), b"<body><hr></body>");
        assert_eq!(len, buf.len());
    }
}
