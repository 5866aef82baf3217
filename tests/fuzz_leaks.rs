//! Harness contracts that need the counting allocator: input callback traffic of
//! the `uri` harness and the per-iteration leak check of the `lint` harness.

use std::{
    any::Any,
    fs,
    sync::atomic::{AtomicUsize, Ordering},
};

use extree::{
    fuzz::{
        xml_fuzz_broken_callbacks_registered, xml_fuzz_check_leaks, xml_fuzz_init, xml_fuzz_lint,
        xml_fuzz_uri,
    },
    io::{XmlInputCallbackFns, register_input_callbacks},
    memory::{XmlMemCounter, xml_mem_used, xml_thread_mem_used},
};

#[global_allocator]
static ALLOC: XmlMemCounter = XmlMemCounter::new();

static MATCHED: AtomicUsize = AtomicUsize::new(0);
static OPENED: AtomicUsize = AtomicUsize::new(0);
static READ: AtomicUsize = AtomicUsize::new(0);

fn counting_match(_uri: &str) -> bool {
    MATCHED.fetch_add(1, Ordering::Relaxed);
    true
}

fn counting_open(_uri: &str) -> Option<Box<dyn Any>> {
    OPENED.fetch_add(1, Ordering::Relaxed);
    None
}

fn counting_read(_context: &mut dyn Any, _buffer: &mut [u8]) -> i32 {
    READ.fetch_add(1, Ordering::Relaxed);
    -1
}

fn counts() -> (usize, usize, usize) {
    (
        MATCHED.swap(0, Ordering::Relaxed),
        OPENED.swap(0, Ordering::Relaxed),
        READ.swap(0, Ordering::Relaxed),
    )
}

fn uri_harness_callback_traffic() {
    register_input_callbacks(XmlInputCallbackFns::new(
        counting_match,
        counting_open,
        counting_read,
        None,
    ))
    .unwrap();

    // Unterminated input is rejected before the harness initializes anything.
    assert_eq!(xml_fuzz_uri(b"http://example/"), 0);
    assert!(!xml_fuzz_broken_callbacks_registered());
    assert_eq!(counts(), (0, 0, 0));

    // The first terminated input registers the broken handler for the process.
    assert_eq!(xml_fuzz_uri(b"http://example/\0"), 0);
    assert!(xml_fuzz_broken_callbacks_registered());
    counts();

    let base = xml_thread_mem_used();
    assert_eq!(xml_fuzz_uri(b"http://example/\0"), 0);
    assert_eq!(counts(), (1, 1, 0));
    assert_eq!(xml_thread_mem_used(), base);
}

fn lint_corpus_iterations_are_balanced() {
    let pattern = format!("{}/fuzz/corpus/lint/*", env!("CARGO_MANIFEST_DIR"));
    let seeds = glob::glob(&pattern)
        .unwrap()
        .map(|path| fs::read(path.unwrap()).unwrap())
        .collect::<Vec<_>>();
    assert!(!seeds.is_empty());

    xml_fuzz_init();
    assert!(xml_mem_used() > 0);
    let base = xml_thread_mem_used();
    for _ in 0..3 {
        for seed in &seeds {
            // Aborts the process if the previous iteration leaked.
            assert_eq!(xml_fuzz_lint(seed), 0);
        }
    }
    xml_fuzz_check_leaks();
    assert_eq!(xml_thread_mem_used(), base);
}

// The callback table and the one-shot registration are process-wide, so the
// order of these steps matters.
#[test]
fn harness_contracts() {
    uri_harness_callback_traffic();
    lint_corpus_iterations_are_balanced();
}
