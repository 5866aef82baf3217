//! Memory accounting with the counting allocator installed.

use extree::{
    globals::parser_version,
    lint::{RETURN_OK, xmllint_main},
    memory::{XmlMemCounter, xml_mem_blocks, xml_mem_used, xml_thread_mem_used},
    tree::XmlTree,
};

#[global_allocator]
static ALLOC: XmlMemCounter = XmlMemCounter::new();

/// Create the lazily allocated per-thread state outside of the measured sections.
fn warm_up() {
    let _ = parser_version();
}

#[test]
fn counters_follow_allocations() {
    warm_up();
    let base = xml_thread_mem_used();
    let block = vec![0u8; 4096];
    assert!(xml_thread_mem_used() >= base + 4096);
    assert!(xml_mem_used() >= 4096);
    assert!(xml_mem_blocks() > 0);
    drop(block);
    assert_eq!(xml_thread_mem_used(), base);
}

#[test]
fn dropping_a_tree_releases_everything() {
    warm_up();
    let base = xml_thread_mem_used();
    {
        let mut tree = XmlTree::new();
        let doc = tree.new_doc(None);
        let root = tree.new_doc_node(Some(doc), None, "root", None).unwrap();
        tree.set_root_element(doc, root).unwrap();
        for i in 0..32 {
            let item = tree.new_child(root, None, "item", Some("text &amp; more")).unwrap();
            tree.set_prop(item, "n", Some(&i.to_string())).unwrap();
        }
        let copy = tree.copy_doc(doc, true).unwrap();
        let out = tree.doc_dump_format_memory(copy, true).unwrap();
        assert!(!out.is_empty());
        tree.free_doc(doc);
        tree.free_doc(copy);
    }
    assert_eq!(xml_thread_mem_used(), base);
}

#[test]
fn lint_runs_are_balanced() {
    warm_up();
    let base = xml_thread_mem_used();
    let status = xmllint_main(&["xmllint", "--auto", "--format"], &mut std::io::sink(), None);
    assert_eq!(status, RETURN_OK);
    assert_eq!(xml_thread_mem_used(), base);
}
