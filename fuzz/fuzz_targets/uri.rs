#![no_main]
use extree::{fuzz::xml_fuzz_uri, memory::XmlMemCounter};
use libfuzzer_sys::fuzz_target;

#[global_allocator]
static ALLOC: XmlMemCounter = XmlMemCounter::new();

fuzz_target!(|data: &[u8]| {
    xml_fuzz_uri(data);
});
