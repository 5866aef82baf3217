//! HTML 4 element descriptors used when serializing HTML trees.

/// Serialization relevant properties of an HTML element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HtmlElemDesc {
    /// The tag name, in lower case.
    pub name: &'static str,
    /// Whether the end tag should be saved
    pub save_end_tag: u8,
    /// Is this an empty element ?
    pub empty: bool,
    /// Is this a deprecated element ?
    pub depr: bool,
    /// Block (0), inline (1), or both (2).
    pub isinline: u8,
    pub desc: &'static str,
}

impl HtmlElemDesc {
    /// Whether a line break may be inserted around this element.
    pub fn is_block(&self) -> bool {
        self.isinline == 0
    }
}

macro_rules! elem {
    ($name:literal, $save_end_tag:literal, $empty:literal, $depr:literal, $isinline:literal, $desc:literal) => {
        HtmlElemDesc {
            name: $name,
            save_end_tag: $save_end_tag,
            empty: $empty != 0,
            depr: $depr != 0,
            isinline: $isinline,
            desc: $desc,
        }
    };
}

// sorted by name for the binary search in `html_tag_lookup`
const HTML40_ELEMENT_TABLE: &[HtmlElemDesc] = &[
    elem!("a", 0, 0, 0, 1, "anchor"),
    elem!("abbr", 0, 0, 0, 1, "abbreviated form"),
    elem!("acronym", 0, 0, 0, 1, ""),
    elem!("address", 0, 0, 0, 0, "information on author"),
    elem!("applet", 0, 0, 1, 2, "java applet"),
    elem!("area", 2, 1, 0, 0, "client-side image map area"),
    elem!("b", 0, 0, 0, 1, "bold text style"),
    elem!("base", 2, 1, 0, 0, "document base uri"),
    elem!("basefont", 2, 1, 1, 1, "base font size"),
    elem!("bdo", 0, 0, 0, 1, "i18n bidi over-ride"),
    elem!("big", 0, 0, 0, 1, "large text style"),
    elem!("blockquote", 0, 0, 0, 0, "long quotation"),
    elem!("body", 0, 0, 0, 0, "document body"),
    elem!("br", 2, 1, 0, 1, "forced line break"),
    elem!("button", 0, 0, 0, 2, "push button"),
    elem!("caption", 0, 0, 0, 0, "table caption"),
    elem!("center", 0, 0, 1, 0, "shorthand for div align=center"),
    elem!("cite", 0, 0, 0, 1, "citation"),
    elem!("code", 0, 0, 0, 1, "computer code fragment"),
    elem!("col", 2, 1, 0, 0, "table column"),
    elem!("colgroup", 0, 0, 0, 0, "table column group"),
    elem!("dd", 0, 0, 0, 0, "definition description"),
    elem!("del", 0, 0, 0, 2, "deleted text"),
    elem!("dfn", 0, 0, 0, 1, "instance definition"),
    elem!("dir", 0, 0, 1, 0, "directory list"),
    elem!("div", 0, 0, 0, 0, "generic language/style container"),
    elem!("dl", 0, 0, 0, 0, "definition list"),
    elem!("dt", 0, 0, 0, 0, "definition term"),
    elem!("em", 0, 0, 0, 1, "emphasis"),
    elem!("embed", 0, 0, 1, 1, "generic embedded object"),
    elem!("fieldset", 0, 0, 0, 0, "form control group"),
    elem!("font", 0, 0, 1, 1, "local change to font"),
    elem!("form", 0, 0, 0, 0, "interactive form"),
    elem!("frame", 2, 1, 0, 0, "subwindow"),
    elem!("frameset", 0, 0, 0, 0, "window subdivision"),
    elem!("h1", 0, 0, 0, 0, "heading"),
    elem!("h2", 0, 0, 0, 0, "heading"),
    elem!("h3", 0, 0, 0, 0, "heading"),
    elem!("h4", 0, 0, 0, 0, "heading"),
    elem!("h5", 0, 0, 0, 0, "heading"),
    elem!("h6", 0, 0, 0, 0, "heading"),
    elem!("head", 0, 0, 0, 0, "document head"),
    elem!("hr", 2, 1, 0, 0, "horizontal rule"),
    elem!("html", 0, 0, 0, 0, "document root element"),
    elem!("i", 0, 0, 0, 1, "italic text style"),
    elem!("iframe", 0, 0, 0, 2, "inline subwindow"),
    elem!("img", 2, 1, 0, 1, "embedded image"),
    elem!("input", 2, 1, 0, 1, "form control"),
    elem!("ins", 0, 0, 0, 2, "inserted text"),
    elem!("isindex", 2, 1, 1, 0, "single line prompt"),
    elem!("kbd", 0, 0, 0, 1, "text to be entered by the user"),
    elem!("label", 0, 0, 0, 1, "form field label text"),
    elem!("legend", 0, 0, 0, 0, "fieldset legend"),
    elem!("li", 1, 0, 0, 0, "list item"),
    elem!("link", 2, 1, 0, 0, "a media-independent link"),
    elem!("map", 0, 0, 0, 2, "client-side image map"),
    elem!("menu", 0, 0, 1, 0, "menu list"),
    elem!("meta", 2, 1, 0, 0, "generic metainformation"),
    elem!("noframes", 0, 0, 0, 0, "alternate content container for non frame-based rendering"),
    elem!("noscript", 0, 0, 0, 0, "alternate content container for non script-based rendering"),
    elem!("object", 0, 0, 0, 2, "generic embedded object"),
    elem!("ol", 0, 0, 0, 0, "ordered list"),
    elem!("optgroup", 0, 0, 0, 0, "option group"),
    elem!("option", 0, 0, 0, 0, "selectable choice"),
    elem!("p", 0, 0, 0, 0, "paragraph"),
    elem!("param", 2, 1, 0, 0, "named property value"),
    elem!("pre", 0, 0, 0, 0, "preformatted text"),
    elem!("q", 0, 0, 0, 1, "short inline quotation"),
    elem!("s", 0, 0, 1, 1, "strike-through text style"),
    elem!("samp", 0, 0, 0, 1, "sample program output, scripts, etc."),
    elem!("script", 0, 0, 0, 2, "script statements"),
    elem!("select", 0, 0, 0, 1, "option selector"),
    elem!("small", 0, 0, 0, 1, "small text style"),
    elem!("span", 0, 0, 0, 1, "generic language/style container"),
    elem!("strike", 0, 0, 1, 1, "strike-through text"),
    elem!("strong", 0, 0, 0, 1, "strong emphasis"),
    elem!("style", 0, 0, 0, 0, "style info"),
    elem!("sub", 0, 0, 0, 1, "subscript"),
    elem!("sup", 0, 0, 0, 1, "superscript"),
    elem!("table", 0, 0, 0, 0, ""),
    elem!("tbody", 0, 0, 0, 0, "table body"),
    elem!("td", 0, 0, 0, 0, "table data cell"),
    elem!("textarea", 0, 0, 0, 1, "multi-line text field"),
    elem!("tfoot", 0, 0, 0, 0, "table footer"),
    elem!("th", 0, 0, 0, 0, "table header cell"),
    elem!("thead", 0, 0, 0, 0, "table header"),
    elem!("title", 0, 0, 0, 0, "document title"),
    elem!("tr", 0, 0, 0, 0, "table row"),
    elem!("tt", 0, 0, 0, 1, "teletype or monospaced text style"),
    elem!("u", 0, 0, 1, 1, "underlined text style"),
    elem!("ul", 0, 0, 0, 0, "unordered list"),
    elem!("var", 0, 0, 0, 1, "instance of a variable or program argument"),
];

/// Lookup the HTML tag in the element table, ignoring case.
#[doc(alias = "htmlTagLookup")]
pub fn html_tag_lookup(tag: &str) -> Option<&'static HtmlElemDesc> {
    HTML40_ELEMENT_TABLE
        .binary_search_by(|desc| {
            desc.name
                .bytes()
                .cmp(tag.bytes().map(|b| b.to_ascii_lowercase()))
        })
        .ok()
        .map(|pos| &HTML40_ELEMENT_TABLE[pos])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted() {
        assert!(
            HTML40_ELEMENT_TABLE
                .windows(2)
                .all(|pair| pair[0].name < pair[1].name)
        );
    }

    #[test]
    fn lookup_ignores_case() {
        let br = html_tag_lookup("BR").unwrap();
        assert_eq!(br.name, "br");
        assert!(br.empty);
        assert_eq!(html_tag_lookup("Table").map(|desc| desc.is_block()), Some(true));
        assert_eq!(html_tag_lookup("span").map(|desc| desc.isinline), Some(1));
        assert!(html_tag_lookup("blink").is_none());
    }
}
