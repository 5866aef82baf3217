//! End-to-end scenarios over the public tree API.

use extree::{
    error::XmlParserErrors,
    tree::{XmlElementType, XmlNodeId, XmlTree},
};

fn catalog(tree: &mut XmlTree) -> (XmlNodeId, XmlNodeId, XmlNodeId) {
    let doc = tree.new_doc(None);
    let root = tree.new_doc_node(Some(doc), None, "catalog", None).unwrap();
    tree.set_root_element(doc, root).unwrap();
    let ns = tree.new_ns(Some(root), "urn:c", Some("c")).unwrap();
    tree.set_ns(root, Some(ns));
    let book = tree.new_child(root, Some(ns), "book", Some("Title")).unwrap();
    let id = tree.set_prop(book, "id", Some("b1")).unwrap();
    tree.add_id(doc, "b1", id).unwrap();
    (doc, root, book)
}

#[test]
fn build_query_and_serialize() {
    let mut tree = XmlTree::new();
    let (doc, root, book) = catalog(&mut tree);

    assert_eq!(tree.get_root_element(doc), Some(root));
    assert_eq!(tree.parent(book), Some(root));
    assert_eq!(tree.document(book), Some(doc));
    assert_eq!(tree.get_content(root).as_deref(), Some("Title"));
    assert_eq!(tree.get_prop(book, "id").as_deref(), Some("b1"));
    assert_eq!(tree.get_node_path(book).as_deref(), Some("/c:catalog/c:book"));
    assert_eq!(tree.child_element_count(root), 1);

    let id = tree.get_id(doc, "b1").unwrap();
    assert_eq!(tree.parent(id), Some(book));

    let out = tree.doc_dump_memory(doc).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "<?xml version=\"1.0\"?>\n<c:catalog xmlns:c=\"urn:c\"><c:book id=\"b1\">Title</c:book></c:catalog>\n"
    );
}

#[test]
fn copies_serialize_identically() {
    let mut tree = XmlTree::new();
    let (doc, _, _) = catalog(&mut tree);
    let copy = tree.copy_doc(doc, true).unwrap();
    assert_ne!(copy, doc);
    assert_eq!(tree.doc_dump_memory(copy).unwrap(), tree.doc_dump_memory(doc).unwrap());

    let copied_root = tree.get_root_element(copy).unwrap();
    assert_eq!(tree.document(copied_root), Some(copy));
    assert_ne!(tree.get_root_element(doc), Some(copied_root));

    tree.free_doc(doc);
    assert!(!tree.contains(doc));
    assert!(tree.contains(copy));
}

#[test]
fn unlink_and_free() {
    let mut tree = XmlTree::new();
    let (doc, root, book) = catalog(&mut tree);
    tree.unlink(book);
    assert_eq!(tree.parent(book), None);
    assert_eq!(tree.children(root), None);
    tree.free_node(book);
    assert!(!tree.contains(book));
    assert!(tree.get(book).is_none());
    assert_eq!(tree.parent(book), None);
    assert_eq!(tree.get_content(book), None);
    assert_eq!(
        String::from_utf8(tree.doc_dump_memory(doc).unwrap()).unwrap(),
        "<?xml version=\"1.0\"?>\n<c:catalog xmlns:c=\"urn:c\"/>\n"
    );
}

#[test]
fn attributes_need_an_element() {
    let mut tree = XmlTree::new();
    let text = tree.new_text("loose");
    assert_eq!(tree.element_type(text), XmlElementType::XmlTextNode);
    assert_eq!(
        tree.set_prop(text, "a", Some("b")).err(),
        Some(XmlParserErrors::XmlTreeWrongParent)
    );
}
