#![no_main]
use extree::{
    fuzz::{LINT_CHUNKS, xml_fuzz_discard_stdout, xml_fuzz_init, xml_fuzz_lint, xml_fuzz_mutate_chunks},
    memory::XmlMemCounter,
};
use libfuzzer_sys::{fuzz_mutator, fuzz_target, fuzzer_mutate};

#[global_allocator]
static ALLOC: XmlMemCounter = XmlMemCounter::new();

fuzz_target!(
    init: {
        if let Err(err) = xml_fuzz_discard_stdout() {
            eprintln!("/dev/null: {err}");
            std::process::abort();
        }
        xml_fuzz_init();
    },
    |data: &[u8]| {
        xml_fuzz_lint(data);
    }
);

fuzz_mutator!(|data: &mut [u8], size: usize, _max_size: usize, seed: u32| {
    xml_fuzz_mutate_chunks(LINT_CHUNKS, data, size, seed, |region, size, max_size| {
        fuzzer_mutate(region, size, max_size)
    })
});
