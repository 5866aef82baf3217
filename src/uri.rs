//! Provide the URI routines needed by the tree and the serializers.
//!
//! This module is based on `libxml/uri.h`, `uri.c`, and so on in `libxml2-v2.11.8`.
//! Please refer to original libxml2 documents also.

//Copyright of the original code is the following.
// --------
// Summary: library of generic URI related routines
// Description: library of generic URI related routines
//              Implements RFC 2396
//
// Copy: See Copyright for the status of this software.
//
// Author: Daniel Veillard
// --------
// uri.c: set of generic URI related routines
//
// Reference: RFCs 3986, 2732 and 2373
//
// See Copyright for the status of this software.
//
// daniel@veillard.com

use std::{borrow::Cow, fmt::Display, string::FromUtf8Error};

fn is_mark(c: u8) -> bool {
    matches!(c, b'-' | b'_' | b'.' | b'!' | b'~' | b'*' | b'\'' | b'(' | b')')
}

fn is_unreserved(c: u8) -> bool {
    c.is_ascii_alphanumeric() || is_mark(c)
}

// gen-delims and sub-delims of RFC 3986, plus the escape introducer
fn is_uri_char(c: u8) -> bool {
    is_unreserved(c)
        || matches!(
            c,
            b':' | b'/'
                | b'?'
                | b'#'
                | b'['
                | b']'
                | b'@'
                | b'$'
                | b'&'
                | b'+'
                | b','
                | b';'
                | b'='
                | b'%'
        )
}

fn to_hexdigit(c: u8) -> char {
    (if c < 10 { c + b'0' } else { c - 10 + b'A' }) as char
}

fn is_scheme(s: &str) -> bool {
    let mut bytes = s.bytes();
    bytes.next().is_some_and(|c| c.is_ascii_alphabetic())
        && bytes.all(|c| c.is_ascii_alphanumeric() || matches!(c, b'+' | b'-' | b'.'))
}

/// A parsed URI reference, split into the five components of RFC 3986.
///
/// Components are kept in their escaped form.
#[doc(alias = "xmlURI")]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlURI {
    pub scheme: Option<String>,
    pub authority: Option<String>,
    pub path: String,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl XmlURI {
    /// Simply creates an empty xmlURI
    #[doc(alias = "xmlCreateURI")]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse an URI reference.
    ///
    /// Returns `None` if `s` contains characters that cannot appear in an URI
    /// (spaces, controls, non-ASCII). Escape them with [`escape_url_except`] first.
    #[doc(alias = "xmlParseURI")]
    #[doc(alias = "xmlParseURIReference")]
    pub fn parse(s: &str) -> Option<Self> {
        if !s.bytes().all(is_uri_char) {
            return None;
        }
        let mut ret = Self::new();
        let mut rest = s;
        if let Some((fragment, head)) = rest.split_once('#').map(|(h, f)| (f, h)) {
            ret.fragment = Some(fragment.to_owned());
            rest = head;
        }
        if let Some((head, query)) = rest.split_once('?') {
            ret.query = Some(query.to_owned());
            rest = head;
        }
        if let Some(pos) = rest.find(':') {
            if !rest[..pos].contains('/') && is_scheme(&rest[..pos]) {
                ret.scheme = Some(rest[..pos].to_owned());
                rest = &rest[pos + 1..];
            }
        }
        if let Some(hier) = rest.strip_prefix("//") {
            let end = hier.find('/').unwrap_or(hier.len());
            ret.authority = Some(hier[..end].to_owned());
            rest = &hier[end..];
        }
        ret.path = rest.to_owned();
        Some(ret)
    }

    /// Save the URI as an escaped string
    #[doc(alias = "xmlSaveUri")]
    pub fn save(&self) -> String {
        self.to_string()
    }
}

impl Display for XmlURI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(scheme) = self.scheme.as_deref() {
            write!(f, "{scheme}:")?;
        }
        if let Some(authority) = self.authority.as_deref() {
            write!(f, "//{authority}")?;
        }
        write!(f, "{}", self.path)?;
        if let Some(query) = self.query.as_deref() {
            write!(f, "?{query}")?;
        }
        if let Some(fragment) = self.fragment.as_deref() {
            write!(f, "#{fragment}")?;
        }
        Ok(())
    }
}

/// Computes he final URI of the reference done by checking that
/// the given URI is valid, and building the final URI using the
/// base URI. This is processed according to section 5.2 of the
/// RFC 3986
///
/// Returns a new URI string or `None` if one of the inputs is not an URI.
#[doc(alias = "xmlBuildURI")]
pub fn build_uri(uri: &str, base: &str) -> Option<String> {
    // an empty reference designates the base without its fragment
    if uri.is_empty() {
        let mut bas = XmlURI::parse(base)?;
        bas.fragment = None;
        return Some(bas.save());
    }
    let refe = XmlURI::parse(uri)?;
    if refe.scheme.is_some() {
        return Some(uri.to_owned());
    }
    let Some(bas) = XmlURI::parse(base) else {
        return Some(refe.save());
    };

    let mut res = XmlURI {
        scheme: bas.scheme.clone(),
        fragment: refe.fragment.clone(),
        ..Default::default()
    };
    if refe.authority.is_some() {
        res.authority = refe.authority;
        res.path = normalize_uri_path(&refe.path).into_owned();
        res.query = refe.query;
        return Some(res.save());
    }
    res.authority = bas.authority.clone();
    if refe.path.is_empty() {
        res.path = bas.path;
        res.query = refe.query.or(bas.query);
        return Some(res.save());
    }
    res.query = refe.query;
    if refe.path.starts_with('/') {
        res.path = normalize_uri_path(&refe.path).into_owned();
        return Some(res.save());
    }
    // merge with the directory of the base path
    let mut merged = String::new();
    if bas.authority.is_some() && bas.path.is_empty() {
        merged.push('/');
    } else if let Some(pos) = bas.path.rfind('/') {
        merged.push_str(&bas.path[..=pos]);
    }
    merged.push_str(&refe.path);
    res.path = normalize_uri_path(&merged).into_owned();
    Some(res.save())
}

/// Applies the `remove_dot_segments` algorithm of RFC 3986 section 5.2.4.
///
/// Relative paths keep their leading `..` segments, as libxml2 does.
/// If `path` is not modified, no extra memory is allocated.
#[doc(alias = "xmlNormalizeURIPath")]
pub fn normalize_uri_path(path: &str) -> Cow<'_, str> {
    if !path.split('/').any(|seg| seg == "." || seg == "..") {
        return Cow::Borrowed(path);
    }
    let absolute = path.starts_with('/');
    let mut segments = path.split('/').collect::<Vec<_>>();
    if absolute {
        segments.remove(0);
    }
    let trailing = matches!(segments.last(), Some(&"." | &".."));
    let mut out: Vec<&str> = vec![];
    for seg in segments {
        match seg {
            "." => {}
            ".." => match out.last() {
                Some(&last) if last != ".." => {
                    out.pop();
                }
                _ if absolute => {}
                _ => out.push(".."),
            },
            seg => out.push(seg),
        }
    }
    let mut ret = if absolute {
        String::from("/")
    } else {
        String::new()
    };
    ret.push_str(&out.join("/"));
    if trailing && !ret.is_empty() && !ret.ends_with('/') {
        ret.push('/');
    }
    Cow::Owned(ret)
}

/// This routine escapes a string to hex, ignoring unreserved characters
/// a-z, A-Z, 0-9, "-._~", a few sub-delims "!*'()", the gen-delim "@"
/// (why?) and the characters in the exception list.
#[doc(alias = "xmlURIEscapeStr")]
pub fn escape_url_except<'a>(s: &'a str, except: &[u8]) -> Cow<'a, str> {
    let need = |ch: u8| ch != b'@' && !is_unreserved(ch) && !except.contains(&ch);
    if !s.bytes().any(need) {
        return Cow::Borrowed(s);
    }
    let mut ret = String::with_capacity(s.len() + 8);
    for ch in s.bytes() {
        if need(ch) {
            ret.push('%');
            ret.push(to_hexdigit(ch >> 4));
            ret.push(to_hexdigit(ch & 0x0F));
        } else {
            ret.push(ch as char);
        }
    }
    Cow::Owned(ret)
}

/// Unescaping routine, but does not check that the string is an URI.
///
/// `%` not followed by two hex digits is kept as is.
/// If an invalid UTF-8 sequence results from unescaping, return `Err`.
///
/// # Examples
/// ```rust
/// use std::borrow::Cow;
///
/// use extree::uri::unescape_url;
///
/// assert_eq!(
///     unescape_url("%F0%9F%91%BE%20Exterminate%21"),
///     Ok(Cow::<str>::Owned("👾 Exterminate!".to_owned()))
/// );
/// assert_eq!(unescape_url("100%"), Ok(Cow::<str>::Borrowed("100%")));
/// ```
#[doc(alias = "xmlURIUnescapeString")]
pub fn unescape_url(url: &str) -> Result<Cow<'_, str>, FromUtf8Error> {
    fn hex(c: u8) -> Option<u8> {
        (c as char).to_digit(16).map(|d| d as u8)
    }

    let bytes = url.as_bytes();
    let mut owned: Option<Vec<u8>> = None;
    let mut i = 0;
    while i < bytes.len() {
        let decoded = (bytes[i] == b'%')
            .then(|| Some((hex(*bytes.get(i + 1)?)? << 4) | hex(*bytes.get(i + 2)?)?))
            .flatten();
        match decoded {
            Some(c) => {
                owned
                    .get_or_insert_with(|| bytes[..i].to_vec())
                    .push(c);
                i += 3;
            }
            None => {
                if let Some(owned) = owned.as_mut() {
                    owned.push(bytes[i]);
                }
                i += 1;
            }
        }
    }
    match owned {
        Some(owned) => String::from_utf8(owned).map(Cow::Owned),
        None => Ok(Cow::Borrowed(url)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_save() {
        let uri = XmlURI::parse("http://example.com:80/a/b?q=1#frag").unwrap();
        assert_eq!(uri.scheme.as_deref(), Some("http"));
        assert_eq!(uri.authority.as_deref(), Some("example.com:80"));
        assert_eq!(uri.path, "/a/b");
        assert_eq!(uri.query.as_deref(), Some("q=1"));
        assert_eq!(uri.fragment.as_deref(), Some("frag"));
        assert_eq!(uri.save(), "http://example.com:80/a/b?q=1#frag");

        assert!(XmlURI::parse("has space").is_none());
        let relative = XmlURI::parse("a/b:c").unwrap();
        assert_eq!(relative.scheme, None);
    }

    // the normal examples of RFC 3986 section 5.4.1
    #[test]
    fn resolve_references() {
        let base = "http://a/b/c/d;p?q";
        for (reference, expected) in [
            ("g:h", "g:h"),
            ("g", "http://a/b/c/g"),
            ("./g", "http://a/b/c/g"),
            ("g/", "http://a/b/c/g/"),
            ("/g", "http://a/g"),
            ("//g", "http://g"),
            ("?y", "http://a/b/c/d;p?y"),
            ("g?y", "http://a/b/c/g?y"),
            ("#s", "http://a/b/c/d;p?q#s"),
            ("g#s", "http://a/b/c/g#s"),
            ("..", "http://a/b/"),
            ("../g", "http://a/b/g"),
            ("../..", "http://a/"),
            ("../../g", "http://a/g"),
            ("../../../g", "http://a/g"),
        ] {
            assert_eq!(build_uri(reference, base).as_deref(), Some(expected), "{reference}");
        }
        assert_eq!(build_uri("", "http://a/b#f").as_deref(), Some("http://a/b"));
        assert_eq!(build_uri("c.xml", "dir/doc.xml").as_deref(), Some("dir/c.xml"));
    }

    #[test]
    fn dot_segments_of_relative_paths() {
        assert_eq!(normalize_uri_path("a/./b/../c"), "a/c");
        assert_eq!(normalize_uri_path("../x"), "../x");
        assert_eq!(normalize_uri_path("/a/b/.."), "/a/");
        assert!(matches!(normalize_uri_path("/plain/path"), Cow::Borrowed(_)));
    }

    #[test]
    fn escaping() {
        assert_eq!(escape_url_except("a b/c", b"/"), "a%20b/c");
        assert_eq!(escape_url_except("\u{e9}", b""), "%C3%A9");
        assert!(matches!(escape_url_except("abc", b""), Cow::Borrowed(_)));
        assert_eq!(unescape_url("a%20b%zz").unwrap(), "a b%zz");
        assert!(unescape_url("%FF").is_err());
    }
}
