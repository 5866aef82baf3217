//! Rust implementation of the command line front end of `xmllint.c` in the original libxml2.
//!
//! Only the tree side of xmllint lives here. The main entity is fetched through a
//! resource loader, a user-built document is created for it and serialized with
//! the requested encoding and pretty-printing style. Turning the loaded bytes into
//! nodes is the job of an optional [`XmllintParser`] hook; without one the document
//! stays empty.

// Copyright of the original code is the following.
// --------
// xmllint.c : a small tester program for XML input.
//
// See Copyright for the status of this software.
//
// daniel@veillard.com

use std::{io::Write, time::Instant};

use clap::{Parser, error::ErrorKind};

#[cfg(feature = "html")]
use crate::html::{html_new_doc, html_new_doc_no_dtd};
#[cfg(feature = "libxml_output")]
use crate::save::{XmlSaveCtxt, XmlSaveOption};
use crate::{
    encoding::XmlCharEncoding,
    error::XmlParserErrors,
    generic_error,
    globals::{LIBXML_DOTTED_VERSION, parser_version},
    io::{XmlParserInputBuffer, read_to_end},
    memory::xml_thread_mem_used,
    tree::{XmlNodeId, XmlTree},
};

// Error codes.
// These are similar to `xmllintReturnCode` in original xmllint.
pub const RETURN_OK: i32 = 0; // No error
pub const ERR_UNCLASS: i32 = 1; // Unclassified
pub const ERR_ARGS: i32 = 2; // Bad command line
pub const ERR_OUT: i32 = 6; // Error writing output
pub const ERR_MEM: i32 = 9; // Out of memory error

/// Fetch the resource named `url`.
///
/// This is where a fuzzer or an embedder substitutes its own storage for files.
pub type XmlResourceLoader = fn(url: &str) -> Result<XmlParserInputBuffer, XmlParserErrors>;

/// Fill `doc` from the loaded `content`.
pub type XmllintParser = fn(
    tree: &mut XmlTree,
    doc: XmlNodeId,
    content: &[u8],
    args: &XmllintArgs,
) -> Result<(), XmlParserErrors>;

#[derive(clap::Parser, Debug, Default)]
#[command(
    name = "xmllint",
    disable_version_flag = true,
    about = "Load the XML files and output the resulting tree.\nThis tool is based on xmllint."
)]
pub struct XmllintArgs {
    pub xml_files: Vec<String>,
    /// limits memory allocation to nbbytes bytes
    #[arg(long, value_name = "nbbytes")]
    pub maxmem: Option<usize>,
    /// maximum amplification factor for entities
    #[arg(long = "max-ampl", value_name = "factor", value_parser = clap::value_parser!(u32).range(1..=5))]
    pub max_ampl: Option<u32>,
    /// display the version of the XML library used
    #[arg(long)]
    pub version: bool,
    /// dump a debug tree of the in-memory document
    #[arg(long)]
    pub debug: bool,
    /// used to test the internal copy implementation
    #[arg(long)]
    pub copy: bool,
    /// output what was parsable on broken XML documents
    #[arg(long)]
    pub recover: bool,
    /// remove any internal arbitrary parser limits
    #[arg(long)]
    pub huge: bool,
    /// substitute entity references by their value
    #[arg(long)]
    pub noent: bool,
    /// ignore any encoding specified inside the document
    #[arg(long)]
    pub noenc: bool,
    /// remove redundant namespace declarations
    #[arg(long)]
    pub nsclean: bool,
    /// replace cdata section with text nodes
    #[arg(long)]
    pub nocdata: bool,
    /// create document without dictionary
    #[arg(long)]
    pub nodict: bool,
    /// don't output the result tree
    #[arg(long)]
    pub noout: bool,
    /// use the HTML parser
    #[arg(long)]
    pub html: bool,
    /// force to use the XML serializer when using --html
    #[arg(long)]
    pub xmlout: bool,
    /// do not default HTML doctype
    #[arg(long)]
    pub nodefdtd: bool,
    /// fetch external DTD
    #[arg(long)]
    pub loaddtd: bool,
    /// loaddtd + populate the tree with inherited attributes
    #[arg(long)]
    pub dtdattr: bool,
    /// validate the document in addition to std well-formed check
    #[arg(long)]
    pub valid: bool,
    /// do a posteriori validation, i.e after parsing
    #[arg(long)]
    pub postvalid: bool,
    /// remove the DOCTYPE of the input docs
    #[arg(long)]
    pub dropdtd: bool,
    /// ad-hoc test for valid insertions
    #[arg(long)]
    pub insert: bool,
    /// be quiet when succeeded
    #[arg(long)]
    pub quiet: bool,
    /// print some timings
    #[arg(long)]
    pub timing: bool,
    /// generate a small doc on the fly
    #[arg(long)]
    pub auto: bool,
    /// repeat 100 times, for timing or profiling
    #[arg(long, action = clap::ArgAction::Count)]
    pub repeat: u8,
    /// use the push mode of the parser
    #[arg(long)]
    pub push: bool,
    /// use the push mode of the parser using tiny increments
    #[arg(long)]
    pub pushsmall: bool,
    /// do XInclude processing
    #[arg(long)]
    pub xinclude: bool,
    /// same but do not generate XInclude nodes
    #[arg(long)]
    pub noxincludenode: bool,
    /// do not fixup xml:base uris
    #[arg(long = "nofixup-base-uris")]
    pub nofixup_base_uris: bool,
    /// turn on gzip compression of output
    #[arg(long)]
    pub compress: bool,
    /// do not emit warnings from parser/validator
    #[arg(long)]
    pub nowarning: bool,
    /// enable additional warnings
    #[arg(long)]
    pub pedantic: bool,
    /// save in W3C canonical format v1.0 (with comments)
    #[arg(long)]
    pub c14n: bool,
    /// save in W3C canonical format v1.1 (with comments)
    #[arg(long)]
    pub c14n11: bool,
    /// save in W3C exclusive canonical format (with comments)
    #[arg(long = "exc-c14n")]
    pub exc_c14n: bool,
    /// deactivate all catalogs
    #[arg(long)]
    pub nocatalogs: bool,
    /// output in the given encoding
    #[arg(long, value_name = "encoding")]
    pub encode: Option<String>,
    /// drop (ignorable?) blanks spaces
    #[arg(long)]
    pub noblanks: bool,
    /// reformat/reindent the output
    #[arg(long)]
    pub format: bool,
    /// pretty-print in a particular style
    /// - 0: Do not pretty print
    /// - 1: Format the XML content, as --format
    /// - 2: Add whitespace inside tags, preserving content
    #[arg(long, value_name = "STYLE", value_parser = clap::value_parser!(u8).range(0..=2))]
    pub pretty: Option<u8>,
    /// use the streaming interface to process very large files
    #[arg(long)]
    pub stream: bool,
    /// create a reader and walk though the resulting doc
    #[arg(long)]
    pub walker: bool,
    /// test the pattern support
    #[arg(long, value_name = "pattern_value")]
    pub pattern: Option<String>,
    /// use the old SAX1 interfaces for processing
    #[arg(long)]
    pub sax1: bool,
    /// do not build a tree but work just at the SAX level
    #[arg(long)]
    pub sax: bool,
    /// refuse to fetch DTDs or entities over network
    #[arg(long)]
    pub nonet: bool,
    /// do not generate compact text nodes
    #[arg(long)]
    pub nocompact: bool,
    /// print trace of all external entities loaded
    #[arg(long = "load-trace")]
    pub load_trace: bool,
    /// evaluate the XPath expression, imply --noout
    #[arg(long, value_name = "expr")]
    pub xpath: Option<String>,
    /// use XML-1.0 parsing rules before the 5th edition
    #[arg(long)]
    pub oldxml10: bool,
}

impl XmllintArgs {
    /// The output style: 0 verbatim, 1 indented, 2 whitespace inside tags.
    pub fn pretty_style(&self) -> u8 {
        self.pretty.unwrap_or(self.format as u8)
    }

    fn repeat_count(&self) -> usize {
        match self.repeat {
            0 => 1,
            n => 10usize.saturating_pow(u32::from(n) + 1),
        }
    }
}

/// Run xmllint over `argv`, writing the serialized documents to `out`.
///
/// Returns the xmllint exit status.
pub fn xmllint_main<S: AsRef<str>>(
    argv: &[S],
    out: &mut dyn Write,
    loader: Option<XmlResourceLoader>,
) -> i32 {
    xmllint_main_with_parser(argv, out, loader, None)
}

/// Same as [`xmllint_main`], filling each document with `parser`.
pub fn xmllint_main_with_parser<S: AsRef<str>>(
    argv: &[S],
    out: &mut dyn Write,
    loader: Option<XmlResourceLoader>,
    parser: Option<XmllintParser>,
) -> i32 {
    let args = match XmllintArgs::try_parse_from(argv.iter().map(AsRef::<str>::as_ref)) {
        Ok(args) => args,
        Err(err) => {
            generic_error!("{err}");
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => RETURN_OK,
                _ => ERR_ARGS,
            };
        }
    };
    let mut lint = Xmllint {
        args,
        loader,
        parser,
        progresult: RETURN_OK,
        mem_base: xml_thread_mem_used(),
    };
    lint.run(out)
}

struct Xmllint {
    args: XmllintArgs,
    loader: Option<XmlResourceLoader>,
    parser: Option<XmllintParser>,
    progresult: i32,
    mem_base: isize,
}

impl Xmllint {
    fn run(&mut self, out: &mut dyn Write) -> i32 {
        if self.args.version {
            show_version();
        }
        if self.args.xml_files.is_empty() && !self.args.auto && !self.args.version {
            generic_error!("xmllint: no input file\n");
            return ERR_ARGS;
        }
        if self.args.html && cfg!(not(feature = "html")) {
            generic_error!("xmllint: HTML support not compiled in\n");
            return ERR_UNCLASS;
        }

        let repeat = self.repeat_count();
        let files = self.args.xml_files.clone();
        for file in &files {
            let start = Instant::now();
            for _ in 0..repeat {
                if self.args.stream || self.args.sax {
                    self.walk_file(file);
                } else {
                    self.parse_and_print(Some(file.as_str()), out);
                }
            }
            if self.args.timing && repeat > 1 {
                generic_error!(
                    "{repeat} iterations took {} ms\n",
                    start.elapsed().as_millis()
                );
            }
        }
        if self.args.auto {
            self.parse_and_print(None, out);
        }
        self.progresult
    }

    fn repeat_count(&self) -> usize {
        self.args.repeat_count()
    }

    fn out_of_memory(&mut self) -> bool {
        let Some(max) = self.args.maxmem.filter(|&max| max > 0) else {
            return false;
        };
        let used = xml_thread_mem_used().saturating_sub(self.mem_base);
        if used > max as isize {
            generic_error!("Ran out of memory needs > {max} bytes\n");
            self.progresult = ERR_MEM;
            return true;
        }
        false
    }

    fn load(&mut self, url: &str) -> Option<Vec<u8>> {
        let input = match self.loader {
            Some(loader) => loader(url),
            None => XmlParserInputBuffer::from_url(url, XmlCharEncoding::None, 0),
        };
        let content = input.and_then(read_to_end);
        match content {
            Ok(content) => {
                if self.args.load_trace {
                    generic_error!("Loaded URL=\"{url}\" ID=\"(null)\"\n");
                }
                Some(content)
            }
            Err(err) => {
                generic_error!("failed to load \"{url}\": {err}\n");
                self.progresult = ERR_UNCLASS;
                None
            }
        }
    }

    /// The reader and SAX modes never build a tree.
    fn walk_file(&mut self, url: &str) {
        let start = Instant::now();
        if self.load(url).is_some() && self.args.timing && self.repeat_count() == 1 {
            generic_error!("Parsing took {} ms\n", start.elapsed().as_millis());
        }
        self.out_of_memory();
    }

    fn new_document(&self, tree: &mut XmlTree) -> Result<XmlNodeId, XmlParserErrors> {
        #[cfg(feature = "html")]
        if self.args.html {
            return if self.args.nodefdtd {
                html_new_doc_no_dtd(tree, None, None)
            } else {
                html_new_doc(tree, None, None)
            };
        }
        Ok(tree.new_doc(None))
    }

    fn load_document(&mut self, tree: &mut XmlTree, url: &str) -> Option<XmlNodeId> {
        let content = self.load(url)?;
        let doc = match self.new_document(tree) {
            Ok(doc) => doc,
            Err(err) => {
                generic_error!("failed to create a document for {url}: {err}\n");
                self.progresult = ERR_UNCLASS;
                return None;
            }
        };
        if let Some(d) = tree.doc_mut(doc) {
            d.set_url(Some(url));
        }
        if let Some(parser) = self.parser {
            if let Err(err) = parser(tree, doc, &content, &self.args) {
                generic_error!("{url}: {err}\n");
                self.progresult = ERR_UNCLASS;
                if !self.args.recover {
                    tree.free_doc(doc);
                    return None;
                }
            }
        }
        Some(doc)
    }

    /// The document of `--auto`.
    fn generate_document(&mut self, tree: &mut XmlTree) -> Option<XmlNodeId> {
        let doc = tree.new_doc(None);
        let built = tree
            .new_doc_node(Some(doc), None, "info", None)
            .and_then(|info| {
                tree.set_root_element(doc, info)?;
                tree.new_text_child(info, None, "version", Some(LIBXML_DOTTED_VERSION))
            });
        if let Err(err) = built {
            generic_error!("failed to generate a document: {err}\n");
            self.progresult = ERR_UNCLASS;
            tree.free_doc(doc);
            return None;
        }
        Some(doc)
    }

    fn parse_and_print(&mut self, url: Option<&str>, out: &mut dyn Write) {
        let mut tree = XmlTree::new();
        let start = Instant::now();
        let doc = match url {
            Some(url) => self.load_document(&mut tree, url),
            None => self.generate_document(&mut tree),
        };
        let Some(mut doc) = doc else {
            return;
        };
        if self.args.timing && self.repeat_count() == 1 {
            generic_error!("Parsing took {} ms\n", start.elapsed().as_millis());
        }

        if self.args.copy {
            match tree.copy_doc(doc, true) {
                Ok(copy) => {
                    tree.free_doc(doc);
                    doc = copy;
                }
                Err(err) => {
                    generic_error!("failed to copy the document: {err}\n");
                    self.progresult = ERR_UNCLASS;
                }
            }
        }

        if self.args.dropdtd {
            if let Some(dtd) = tree.get_int_subset(doc) {
                tree.unlink(dtd);
                tree.free_dtd(dtd);
            }
        }

        if !self.out_of_memory() && !self.args.noout && self.args.xpath.is_none() {
            let start = Instant::now();
            self.save(&tree, doc, out);
            if self.args.timing && self.repeat_count() == 1 {
                generic_error!("Saving took {} ms\n", start.elapsed().as_millis());
            }
            self.out_of_memory();
        }
        tree.free_doc(doc);
    }

    #[cfg(feature = "libxml_output")]
    fn save(&mut self, tree: &XmlTree, doc: XmlNodeId, out: &mut dyn Write) {
        let mut options = match self.args.pretty_style() {
            1 => XmlSaveOption::XmlSaveFormat as i32,
            2 => XmlSaveOption::XmlSaveWsNonSig as i32,
            _ => 0,
        };
        if self.args.xmlout {
            options |= XmlSaveOption::XmlSaveAsXML as i32;
        }
        let saved = XmlSaveCtxt::save_to_io(&mut *out, self.args.encode.as_deref(), options)
            .and_then(|mut ctxt| {
                let res = ctxt.save_doc(tree, doc);
                let closed = ctxt.close();
                res.and(closed.map(|_| ()))
            });
        if saved.is_err() {
            generic_error!("failed save to -\n");
            self.progresult = ERR_OUT;
        }
    }

    #[cfg(not(feature = "libxml_output"))]
    fn save(&mut self, _tree: &XmlTree, _doc: XmlNodeId, _out: &mut dyn Write) {}
}

fn show_version() {
    let mut features = String::new();
    if cfg!(feature = "libxml_output") {
        features.push_str("Output ");
    }
    if cfg!(feature = "html") {
        features.push_str("HTML ");
    }
    generic_error!(
        "xmllint: using libxml version {}\n   compiled with: {features}\n",
        parser_version()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_loader(url: &str) -> Result<XmlParserInputBuffer, XmlParserErrors> {
        match url {
            "doc.xml" => XmlParserInputBuffer::from_memory(b"<doc/>", XmlCharEncoding::None),
            _ => Err(XmlParserErrors::XmlIOENOENT),
        }
    }

    fn build_nested(
        tree: &mut XmlTree,
        doc: XmlNodeId,
        content: &[u8],
        _args: &XmllintArgs,
    ) -> Result<(), XmlParserErrors> {
        assert_eq!(content, b"<doc/>");
        let root = tree.new_doc_node(Some(doc), None, "doc", None)?;
        tree.set_root_element(doc, root)?;
        let item = tree.new_child(root, None, "item", None)?;
        tree.set_prop(item, "n", Some("1"))?;
        tree.create_int_subset(doc, Some("doc"), None, Some("doc.dtd"))?;
        Ok(())
    }

    fn failing_parser(
        _tree: &mut XmlTree,
        _doc: XmlNodeId,
        _content: &[u8],
        _args: &XmllintArgs,
    ) -> Result<(), XmlParserErrors> {
        Err(XmlParserErrors::XmlErrInternalError)
    }

    fn run(argv: &[&str], parser: Option<XmllintParser>) -> (i32, String) {
        let mut out = vec![];
        let status = xmllint_main_with_parser(argv, &mut out, Some(memory_loader), parser);
        (status, String::from_utf8_lossy(&out).into_owned())
    }

    #[test]
    fn bad_arguments() {
        assert_eq!(run(&["xmllint", "--no-such-switch", "doc.xml"], None).0, ERR_ARGS);
        assert_eq!(run(&["xmllint", "--pretty", "3", "doc.xml"], None).0, ERR_ARGS);
        assert_eq!(run(&["xmllint", "--max-ampl", "9", "doc.xml"], None).0, ERR_ARGS);
        assert_eq!(run(&["xmllint"], None).0, ERR_ARGS);
    }

    #[test]
    fn harness_switches_are_accepted() {
        let (status, _) = run(
            &[
                "xmllint",
                "--nocatalogs",
                "--huge",
                "--noent",
                "--nonet",
                "--recover",
                "--sax1",
                "--xinclude",
                "--maxmem",
                "100000000",
                "--max-ampl",
                "3",
                "--pattern",
                "a",
                "doc.xml",
            ],
            None,
        );
        assert_eq!(status, RETURN_OK);
    }

    #[test]
    fn generated_document() {
        let (status, out) = run(&["xmllint", "--auto"], None);
        assert_eq!(status, RETURN_OK);
        assert_eq!(
            out,
            format!("<?xml version=\"1.0\"?>\n<info><version>{LIBXML_DOTTED_VERSION}</version></info>\n")
        );
    }

    #[test]
    fn document_without_parser_is_empty() {
        let (status, out) = run(&["xmllint", "doc.xml"], None);
        assert_eq!(status, RETURN_OK);
        assert_eq!(out, "<?xml version=\"1.0\"?>\n");
    }

    #[test]
    fn missing_document() {
        let (status, out) = run(&["xmllint", "missing.xml"], None);
        assert_eq!(status, ERR_UNCLASS);
        assert!(out.is_empty());
    }

    #[test]
    fn parser_output_and_styles() {
        let (status, out) = run(&["xmllint", "doc.xml"], Some(build_nested));
        assert_eq!(status, RETURN_OK);
        assert_eq!(
            out,
            "<?xml version=\"1.0\"?>\n<!DOCTYPE doc SYSTEM \"doc.dtd\">\n<doc><item n=\"1\"/></doc>\n"
        );

        let (_, out) = run(&["xmllint", "--format", "--dropdtd", "doc.xml"], Some(build_nested));
        assert_eq!(out, "<?xml version=\"1.0\"?>\n<doc>\n  <item n=\"1\"/>\n</doc>\n");

        let (_, copied) = run(&["xmllint", "--copy", "doc.xml"], Some(build_nested));
        let (_, plain) = run(&["xmllint", "doc.xml"], Some(build_nested));
        assert_eq!(copied, plain);
    }

    #[test]
    fn output_encoding() {
        let (status, out) = run(&["xmllint", "--encode", "ISO-8859-1", "doc.xml"], None);
        assert_eq!(status, RETURN_OK);
        assert_eq!(out, "<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n");

        let (status, out) = run(&["xmllint", "--encode", "no-such-encoding", "doc.xml"], None);
        assert_eq!(status, ERR_OUT);
        assert!(out.is_empty());
    }

    #[test]
    fn suppressed_output() {
        assert_eq!(run(&["xmllint", "--noout", "doc.xml"], None), (RETURN_OK, String::new()));
        assert_eq!(
            run(&["xmllint", "--xpath", "/", "doc.xml"], None),
            (RETURN_OK, String::new())
        );
        assert_eq!(run(&["xmllint", "--sax", "doc.xml"], None), (RETURN_OK, String::new()));
        assert_eq!(
            run(&["xmllint", "--stream", "doc.xml"], None),
            (RETURN_OK, String::new())
        );
    }

    #[test]
    fn parser_failures() {
        let (status, out) = run(&["xmllint", "doc.xml"], Some(failing_parser));
        assert_eq!(status, ERR_UNCLASS);
        assert!(out.is_empty());

        let (status, out) = run(&["xmllint", "--recover", "doc.xml"], Some(failing_parser));
        assert_eq!(status, ERR_UNCLASS);
        assert_eq!(out, "<?xml version=\"1.0\"?>\n");
    }

    #[cfg(feature = "html")]
    #[test]
    fn html_documents() {
        let (status, out) = run(&["xmllint", "--html", "doc.xml"], None);
        assert_eq!(status, RETURN_OK);
        assert!(out.starts_with("<!DOCTYPE html PUBLIC \"-//W3C//DTD HTML 4.0 Transitional//EN\""));

        let (_, out) = run(&["xmllint", "--html", "--nodefdtd", "doc.xml"], None);
        assert_eq!(out, "\n");
    }
}
