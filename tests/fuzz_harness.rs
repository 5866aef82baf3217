//! Replay the seeds of the fuzz corpus through the harnesses.

use std::fs;

use extree::fuzz::{xml_fuzz_lint, xml_fuzz_main_url, xml_fuzz_uri};

fn seeds(target: &str) -> Vec<Vec<u8>> {
    let pattern = format!("{}/fuzz/corpus/{target}/*", env!("CARGO_MANIFEST_DIR"));
    glob::glob(&pattern)
        .unwrap()
        .map(|path| fs::read(path.unwrap()).unwrap())
        .collect()
}

#[test]
fn uri_corpus() {
    let seeds = seeds("uri");
    assert!(!seeds.is_empty());
    for seed in seeds {
        assert_eq!(xml_fuzz_uri(&seed), 0);
    }
}

#[test]
fn lint_corpus() {
    let seeds = seeds("lint");
    assert!(!seeds.is_empty());
    for seed in seeds {
        assert_eq!(xml_fuzz_lint(&seed), 0);
        // Nothing of the input outlives an iteration.
        assert_eq!(xml_fuzz_main_url(), None);
    }
}

#[test]
fn lint_accepts_any_bytes() {
    for len in 0..64 {
        let data = (0..len).map(|i| (i * 37 + len) as u8).collect::<Vec<_>>();
        assert_eq!(xml_fuzz_lint(&data), 0);
    }
}
