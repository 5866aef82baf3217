//! Shared logic of the libFuzzer targets living under `fuzz/`.
//!
//! The fuzz input is consumed through a small cursor: integers, escaped strings
//! and a list of `(url, entity)` pairs. The first entity becomes the main document,
//! the others are served by [`xml_fuzz_resource_loader`].
//!
//! Two harnesses are built on top of it:
//! - [`xml_fuzz_uri`] feeds a NUL terminated buffer to [`XmlParserInputBuffer::from_url`]
//!   with a broken input handler registered in front of the default ones.
//! - [`xml_fuzz_lint`] turns the input into an `xmllint` command line.

// Copyright of the original code is the following.
// --------
// fuzz.c: Common functions for fuzzing.
//
// See Copyright for the status of this software.

use std::{any::Any, cell::RefCell, collections::HashMap, io, process::abort, sync::Once};

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
    encoding::XmlCharEncoding,
    error::{XmlParserErrors, reset_last_error},
    globals::set_generic_error,
    io::{XmlInputCallbackFns, XmlParserInputBuffer, register_input_callbacks},
    lint::xmllint_main,
    memory::xml_thread_mem_used,
};

/// The probability of an event which always happens.
pub const XML_FUZZ_PROB_ONE: u32 = 1 << 16;

/// A fixed size region at the head of a fuzz input.
///
/// `mutate_prob` is a fraction of [`XML_FUZZ_PROB_ONE`].
#[derive(Debug, Clone, Copy)]
pub struct XmlFuzzChunkDesc {
    pub size: usize,
    pub mutate_prob: u32,
}

/// Chunk layout of the `lint` target: switches, maxmem, max-ampl and pretty.
pub const LINT_CHUNKS: &[XmlFuzzChunkDesc] = &[
    XmlFuzzChunkDesc {
        size: 8,
        mutate_prob: XML_FUZZ_PROB_ONE / 10,
    },
    XmlFuzzChunkDesc {
        size: 4,
        mutate_prob: XML_FUZZ_PROB_ONE / 10,
    },
    XmlFuzzChunkDesc {
        size: 1,
        mutate_prob: XML_FUZZ_PROB_ONE / 100,
    },
    XmlFuzzChunkDesc {
        size: 1,
        mutate_prob: XML_FUZZ_PROB_ONE / 100,
    },
];

/// Switches selected by the bits of the leading integers of a `lint` input.
///
/// `None` entries keep bit positions stable for switches that were removed.
pub const LINT_SWITCHES: &[Option<&str>] = &[
    Some("--auto"),
    Some("--c14n"),
    Some("--c14n11"),
    Some("--compress"),
    Some("--copy"),
    Some("--debug"),
    None,
    Some("--dropdtd"),
    Some("--dtdattr"),
    Some("--exc-c14n"),
    Some("--format"),
    None,
    Some("--huge"),
    Some("--insert"),
    Some("--loaddtd"),
    Some("--load-trace"),
    None,
    Some("--noblanks"),
    Some("--nocdata"),
    Some("--nocompact"),
    Some("--nodefdtd"),
    Some("--nodict"),
    Some("--noenc"),
    Some("--noent"),
    Some("--nofixup-base-uris"),
    Some("--nonet"),
    Some("--noout"),
    Some("--nowarning"),
    None,
    Some("--noxincludenode"),
    Some("--nsclean"),
    Some("--oldxml10"),
    Some("--pedantic"),
    Some("--postvalid"),
    Some("--push"),
    Some("--pushsmall"),
    Some("--quiet"),
    Some("--recover"),
    Some("--repeat"),
    Some("--sax1"),
    None,
    Some("--timing"),
    Some("--valid"),
    Some("--version"),
    Some("--walker"),
    Some("--xinclude"),
    Some("--xmlout"),
];

#[derive(Default)]
struct XmlFuzzData {
    data: Vec<u8>,
    pos: usize,
    entities: HashMap<String, Vec<u8>>,
    main_url: Option<String>,
}

thread_local! {
    static FUZZ_DATA: RefCell<XmlFuzzData> = RefCell::new(XmlFuzzData::default());
    static MEM_WATERMARK: RefCell<Option<isize>> = const { RefCell::new(None) };
}

/// Set up the cursor over a new fuzz input.
#[doc(alias = "xmlFuzzDataInit")]
pub fn xml_fuzz_data_init(data: &[u8]) {
    FUZZ_DATA.with_borrow_mut(|fuzz| {
        *fuzz = XmlFuzzData {
            data: data.to_vec(),
            ..Default::default()
        };
    });
}

/// Release everything read from the current fuzz input.
#[doc(alias = "xmlFuzzDataCleanup")]
pub fn xml_fuzz_data_cleanup() {
    FUZZ_DATA.with_borrow_mut(|fuzz| *fuzz = XmlFuzzData::default());
}

/// Read a big-endian integer of `size` bytes.
///
/// Reads fewer bytes when the input is exhausted.
#[doc(alias = "xmlFuzzReadInt")]
pub fn xml_fuzz_read_int(size: usize) -> u32 {
    FUZZ_DATA.with_borrow_mut(|fuzz| {
        let end = fuzz.data.len().min(fuzz.pos + size);
        let ret = fuzz.data[fuzz.pos..end]
            .iter()
            .fold(0u32, |acc, &b| acc.wrapping_shl(8) | u32::from(b));
        fuzz.pos = end;
        ret
    })
}

fn read_string(fuzz: &mut XmlFuzzData) -> Option<Vec<u8>> {
    let mut out = vec![];
    while fuzz.pos < fuzz.data.len() {
        let c = fuzz.data[fuzz.pos];
        fuzz.pos += 1;
        if c == b'\\' {
            match fuzz.data.get(fuzz.pos) {
                Some(b'\n') => {
                    fuzz.pos += 1;
                    return Some(out);
                }
                Some(b'\\') => fuzz.pos += 1,
                _ => {}
            }
        }
        out.push(c);
    }
    (!out.is_empty()).then_some(out)
}

/// Read a string terminated by a backslash followed by a newline.
///
/// A doubled backslash stands for a single one. Returns `None` once the input
/// is exhausted.
#[doc(alias = "xmlFuzzReadString")]
pub fn xml_fuzz_read_string() -> Option<Vec<u8>> {
    FUZZ_DATA.with_borrow_mut(read_string)
}

/// Read `(url, entity)` pairs until the input is exhausted.
///
/// The first url wins when it appears twice. The first pair is the main entity.
#[doc(alias = "xmlFuzzReadEntities")]
pub fn xml_fuzz_read_entities() {
    FUZZ_DATA.with_borrow_mut(|fuzz| {
        while let Some(url) = read_string(fuzz) {
            let Some(entity) = read_string(fuzz) else {
                break;
            };
            let url = String::from_utf8_lossy(&url).into_owned();
            if fuzz.entities.contains_key(&url) {
                continue;
            }
            if fuzz.main_url.is_none() {
                fuzz.main_url = Some(url.clone());
            }
            fuzz.entities.insert(url, entity);
        }
    });
}

/// The url of the main entity.
#[doc(alias = "xmlFuzzMainUrl")]
pub fn xml_fuzz_main_url() -> Option<String> {
    FUZZ_DATA.with_borrow(|fuzz| fuzz.main_url.clone())
}

/// The content of the main entity.
#[doc(alias = "xmlFuzzMainEntity")]
pub fn xml_fuzz_main_entity() -> Option<Vec<u8>> {
    FUZZ_DATA.with_borrow(|fuzz| {
        let url = fuzz.main_url.as_ref()?;
        fuzz.entities.get(url).cloned()
    })
}

/// Serve the entities read by [`xml_fuzz_read_entities`].
#[doc(alias = "xmlFuzzResourceLoader")]
pub fn xml_fuzz_resource_loader(url: &str) -> Result<XmlParserInputBuffer, XmlParserErrors> {
    let entity = FUZZ_DATA.with_borrow(|fuzz| fuzz.entities.get(url).cloned());
    match entity {
        Some(entity) => Ok(XmlParserInputBuffer::from(entity)),
        None => Err(XmlParserErrors::XmlIOENOENT),
    }
}

/// Error handler discarding every message.
#[doc(alias = "xmlFuzzErrorFunc")]
pub fn xml_fuzz_error_func(_ctx: Option<&mut (dyn io::Write + 'static)>, _msg: &str) {}

/// Mutate `data` chunk by chunk.
///
/// The first `size` bytes of `data` are the input and `data.len()` is the room
/// available. Each chunk of `chunks` is mutated in place with its own probability,
/// in which case the rest of the input is left alone. Otherwise the bytes after
/// the last chunk are mutated. `mutator` receives a region, the size of the input
/// stored in it and the maximum size it may grow to, and returns the new size.
#[doc(alias = "xmlFuzzMutateChunks")]
pub fn xml_fuzz_mutate_chunks(
    chunks: &[XmlFuzzChunkDesc],
    data: &mut [u8],
    size: usize,
    seed: u32,
    mut mutator: impl FnMut(&mut [u8], usize, usize) -> usize,
) -> usize {
    let max_size = data.len();
    if size > max_size {
        return size;
    }
    let mut rng = StdRng::seed_from_u64(u64::from(seed));
    let mut off = 0;
    for chunk in chunks {
        if chunk.size == 0 || off + chunk.size > size {
            break;
        }
        if rng.random_range(0..XML_FUZZ_PROB_ONE) < chunk.mutate_prob {
            let region = &mut data[off..off + chunk.size];
            let len = mutator(region, chunk.size, chunk.size).min(chunk.size);
            region[len..].fill(0);
            return size;
        }
        off += chunk.size;
    }
    off + mutator(&mut data[off..], size - off, max_size - off)
}

fn broken_match(_uri: &str) -> bool {
    true
}

fn broken_open(_uri: &str) -> Option<Box<dyn Any>> {
    None
}

fn broken_read(_context: &mut dyn Any, _buffer: &mut [u8]) -> i32 {
    -1
}

fn broken_close(_context: Box<dyn Any>) -> i32 {
    0
}

static REGISTER_BROKEN_CALLBACKS: Once = Once::new();

/// Whether [`xml_fuzz_register_broken_callbacks`] already ran in this process.
pub fn xml_fuzz_broken_callbacks_registered() -> bool {
    REGISTER_BROKEN_CALLBACKS.is_completed()
}

/// Register, once per process, an input handler that matches every resource but
/// never opens any.
pub fn xml_fuzz_register_broken_callbacks() {
    REGISTER_BROKEN_CALLBACKS.call_once(|| {
        let callbacks =
            XmlInputCallbackFns::new(broken_match, broken_open, broken_read, Some(broken_close));
        // A full table only loses coverage.
        register_input_callbacks(callbacks).ok();
    });
}

/// One-time initialization of a harness on the current thread.
///
/// Records the memory watermark used by the leak check once every lazily
/// allocated piece of global state exists.
pub fn xml_fuzz_init() {
    xml_fuzz_register_broken_callbacks();
    set_generic_error(Some(xml_fuzz_error_func), None::<io::Sink>);
    reset_last_error();
    xml_fuzz_data_cleanup();
    MEM_WATERMARK.with_borrow_mut(|mark| {
        if mark.is_none() {
            *mark = Some(xml_thread_mem_used());
        }
    });
}

/// Abort if memory allocated since [`xml_fuzz_init`] is still alive.
///
/// Only meaningful when [`XmlMemCounter`](crate::memory::XmlMemCounter) is the
/// global allocator.
pub fn xml_fuzz_check_leaks() {
    let mark = MEM_WATERMARK.with_borrow(|mark| *mark);
    if let Some(mark) = mark {
        if xml_thread_mem_used() != mark {
            eprintln!("Undetected leak in previous iteration");
            abort();
        }
    }
}

/// Redirect the standard output of the process to the bit bucket.
pub fn xml_fuzz_discard_stdout() -> io::Result<()> {
    let fd = unsafe { libc::open(c"/dev/null".as_ptr(), libc::O_WRONLY) };
    if fd == -1 {
        return Err(io::Error::last_os_error());
    }
    let res = unsafe { libc::dup2(fd, libc::STDOUT_FILENO) };
    let err = io::Error::last_os_error();
    unsafe { libc::close(fd) };
    if res == -1 {
        return Err(err);
    }
    Ok(())
}

/// Open `data` as a url if it is NUL terminated.
///
/// The bytes up to the first NUL are the url.
pub fn xml_fuzz_open_url(data: &[u8]) {
    let Some((&0, head)) = data.split_last() else {
        return;
    };
    let url = head.split(|&b| b == 0).next().unwrap_or(head);
    let url = String::from_utf8_lossy(url);
    // Success and failure are both fine, the buffer is dropped right away.
    XmlParserInputBuffer::from_url(&url, XmlCharEncoding::None, 0).ok();
}

/// The `uri` harness.
///
/// Input without a terminating NUL is rejected before any initialization.
pub fn xml_fuzz_uri(data: &[u8]) -> i32 {
    if data.last() != Some(&0) {
        return 0;
    }
    xml_fuzz_register_broken_callbacks();
    xml_fuzz_open_url(data);
    0
}

/// Build the `xmllint` command line encoded by the current fuzz input.
///
/// `size` is the length of the whole input. Returns `None` when the input has no
/// usable main entity.
pub fn xml_fuzz_lint_args(size: usize) -> Option<Vec<String>> {
    let mut argv = vec!["xmllint".to_owned(), "--nocatalogs".to_owned()];

    let mut uval = 0;
    for (i, switch) in LINT_SWITCHES.iter().enumerate() {
        if i % 32 == 0 {
            uval = xml_fuzz_read_int(4);
        }
        if let Some(switch) = switch.filter(|_| uval & 1 != 0) {
            argv.push(switch.to_owned());
        }
        uval >>= 1;
    }

    // Four parsing modes with equal probability.
    match uval & 3 {
        1 => argv.push("--html".to_owned()),
        2 => argv.push("--stream".to_owned()),
        3 => argv.push("--sax".to_owned()),
        _ => {}
    }

    let maxmem = xml_fuzz_read_int(4);
    if maxmem > 0 {
        let limit = if size <= (i32::MAX as usize - 2000) / 20 {
            size * 20 + 2000
        } else {
            i32::MAX as usize
        };
        argv.push("--maxmem".to_owned());
        argv.push((maxmem as usize % limit).to_string());
    }

    let max_ampl = xml_fuzz_read_int(1);
    if (1..=5).contains(&max_ampl) {
        argv.push("--max-ampl".to_owned());
        argv.push(max_ampl.to_string());
    }

    let pretty = xml_fuzz_read_int(1);
    if pretty != 0 {
        argv.push("--pretty".to_owned());
        argv.push((pretty % 4).to_string());
    }

    for switch in ["--encode", "--pattern", "--xpath"] {
        if let Some(value) = xml_fuzz_read_string().filter(|s| !s.is_empty()) {
            argv.push(switch.to_owned());
            argv.push(String::from_utf8_lossy(&value).into_owned());
        }
    }

    xml_fuzz_read_entities();
    xml_fuzz_main_entity()?;
    let url = xml_fuzz_main_url()?;
    if url.starts_with('-') {
        return None;
    }
    argv.push(url);
    Some(argv)
}

/// The `lint` harness.
///
/// The exit status of `xmllint` is ignored and `0` is always returned.
pub fn xml_fuzz_lint(data: &[u8]) -> i32 {
    xml_fuzz_init();
    xml_fuzz_open_url(data);
    xml_fuzz_check_leaks();

    xml_fuzz_data_init(data);
    if let Some(argv) = xml_fuzz_lint_args(data.len()) {
        xmllint_main(&argv, &mut io::sink(), Some(xml_fuzz_resource_loader));
    }
    xml_fuzz_data_cleanup();
    reset_last_error();
    0
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Encode `strings` the way [`xml_fuzz_read_string`] decodes them.
    fn encode(strings: &[&[u8]]) -> Vec<u8> {
        let mut out = vec![];
        for s in strings {
            for &b in *s {
                if b == b'\\' {
                    out.push(b'\\');
                }
                out.push(b);
            }
            out.extend_from_slice(b"\\\n");
        }
        out
    }

    #[test]
    fn read_ints() {
        xml_fuzz_data_init(&[0x12, 0x34, 0x56, 0x78, 0x9a]);
        assert_eq!(xml_fuzz_read_int(4), 0x1234_5678);
        assert_eq!(xml_fuzz_read_int(4), 0x9a);
        assert_eq!(xml_fuzz_read_int(1), 0);
        xml_fuzz_data_cleanup();
    }

    #[test]
    fn read_strings() {
        xml_fuzz_data_init(b"a\\\\b\\\n\\\nrest");
        assert_eq!(xml_fuzz_read_string().as_deref(), Some(&b"a\\b"[..]));
        assert_eq!(xml_fuzz_read_string().as_deref(), Some(&b""[..]));
        assert_eq!(xml_fuzz_read_string().as_deref(), Some(&b"rest"[..]));
        assert_eq!(xml_fuzz_read_string(), None);
        xml_fuzz_data_cleanup();
    }

    #[test]
    fn entities_and_loader() {
        let input = encode(&[b"doc.xml", b"<doc/>", b"ext.ent", b"text", b"doc.xml", b"dup"]);
        xml_fuzz_data_init(&input);
        xml_fuzz_read_entities();
        assert_eq!(xml_fuzz_main_url().as_deref(), Some("doc.xml"));
        assert_eq!(xml_fuzz_main_entity().as_deref(), Some(&b"<doc/>"[..]));
        assert!(xml_fuzz_resource_loader("ext.ent").is_ok());
        assert_eq!(
            xml_fuzz_resource_loader("missing").err(),
            Some(XmlParserErrors::XmlIOENOENT)
        );
        xml_fuzz_data_cleanup();
        assert_eq!(xml_fuzz_main_url(), None);
    }

    fn lint_input(switches: u32, mode: u32, maxmem: u32, ampl: u8, pretty: u8) -> Vec<u8> {
        let mut input = vec![];
        input.extend_from_slice(&switches.to_be_bytes());
        input.extend_from_slice(&(mode << 15).to_be_bytes());
        input.extend_from_slice(&maxmem.to_be_bytes());
        input.push(ampl);
        input.push(pretty);
        input.extend(encode(&[b"UTF-8", b"", b"", b"doc.xml", b"<doc/>"]));
        input
    }

    #[test]
    fn lint_command_line() {
        // Bits 0 and 10 select --auto and --format, bit 6 hits a removed switch.
        let input = lint_input(1 | 1 << 6 | 1 << 10, 1, 1_000_000, 3, 6);
        xml_fuzz_data_init(&input);
        let argv = xml_fuzz_lint_args(input.len()).unwrap();
        let limit = input.len() * 20 + 2000;
        let maxmem = (1_000_000 % limit).to_string();
        assert_eq!(
            argv,
            [
                "xmllint",
                "--nocatalogs",
                "--auto",
                "--format",
                "--html",
                "--maxmem",
                &maxmem,
                "--max-ampl",
                "3",
                "--pretty",
                "2",
                "--encode",
                "UTF-8",
                "doc.xml",
            ]
        );
        xml_fuzz_data_cleanup();
    }

    #[test]
    fn lint_skips_dash_urls() {
        let mut input = vec![0; 14];
        input.extend(encode(&[b"", b"", b"", b"-doc", b"<doc/>"]));
        xml_fuzz_data_init(&input);
        assert_eq!(xml_fuzz_lint_args(input.len()), None);
        xml_fuzz_data_cleanup();

        xml_fuzz_data_init(&[0; 14]);
        assert_eq!(xml_fuzz_lint_args(14), None);
        xml_fuzz_data_cleanup();
    }

    #[test]
    fn mutate_remainder_or_chunk() {
        let chunks = [XmlFuzzChunkDesc {
            size: 2,
            mutate_prob: XML_FUZZ_PROB_ONE,
        }];
        let mut data = [1, 2, 3, 4, 0, 0];
        let size = xml_fuzz_mutate_chunks(&chunks, &mut data, 4, 7, |region, size, max| {
            assert_eq!((region.len(), size, max), (2, 2, 2));
            region[0] = 9;
            1
        });
        assert_eq!(size, 4);
        assert_eq!(data, [9, 0, 3, 4, 0, 0]);

        let chunks = [XmlFuzzChunkDesc {
            size: 2,
            mutate_prob: 0,
        }];
        let mut data = [1, 2, 3, 4, 0, 0];
        let size = xml_fuzz_mutate_chunks(&chunks, &mut data, 4, 7, |region, size, max| {
            assert_eq!((region.len(), size, max), (4, 2, 4));
            region[2] = 5;
            3
        });
        assert_eq!(size, 5);
        assert_eq!(data, [1, 2, 3, 4, 5, 0]);
    }

    #[test]
    fn uri_harness_requires_nul() {
        assert_eq!(xml_fuzz_uri(b""), 0);
        assert_eq!(xml_fuzz_uri(b"no-terminator"), 0);
        assert_eq!(xml_fuzz_uri(b"/no/such/file.xml\0"), 0);
    }

    #[test]
    fn lint_harness_always_succeeds() {
        let input = lint_input(0, 0, 0, 0, 0);
        assert_eq!(xml_fuzz_lint(&input), 0);
        assert_eq!(xml_fuzz_lint(b"garbage"), 0);
        assert_eq!(xml_fuzz_main_url(), None);
    }
}
