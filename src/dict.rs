//! Provide string interning for names shared across a document.
//! This module is based on `libxml/dict.h`, `dict.c`, and so on in `libxml2-v2.11.8`.
//!
//! Please refer to original libxml2 documents also.

use std::{cell::RefCell, collections::HashSet, rc::Rc};

/// A shared reference to a dictionary.
///
/// A document and the names of its nodes hold the dictionary through this handle.
pub type XmlDictRef = Rc<RefCell<XmlDict>>;

/// A string interning dictionary.
///
/// Every distinct string is stored once. Looking up the same string twice yields
/// handles that compare equal with [`Rc::ptr_eq`].
#[derive(Debug, Default)]
pub struct XmlDict {
    strings: HashSet<Rc<str>>,
    limit: usize,
}

impl XmlDict {
    /// Create a new dictionary.
    #[doc(alias = "xmlDictCreate")]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new dictionary wrapped in a shared reference.
    pub fn new_ref() -> XmlDictRef {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Set a size limit for the dictionary. `0` means unlimited.
    ///
    /// Returns the previous limit.
    #[doc(alias = "xmlDictSetLimit")]
    pub fn set_limit(&mut self, limit: usize) -> usize {
        std::mem::replace(&mut self.limit, limit)
    }

    /// Add `name` to the dictionary if it is not already present.
    ///
    /// Returns `None` if the dictionary is full.
    #[doc(alias = "xmlDictLookup")]
    pub fn lookup(&mut self, name: &str) -> Option<Rc<str>> {
        if let Some(found) = self.strings.get(name) {
            return Some(found.clone());
        }
        if self.limit != 0 && self.strings.len() >= self.limit {
            return None;
        }
        let new: Rc<str> = Rc::from(name);
        self.strings.insert(new.clone());
        Some(new)
    }

    /// Check if `name` is present in the dictionary without adding it.
    #[doc(alias = "xmlDictExists")]
    pub fn exists(&self, name: &str) -> Option<Rc<str>> {
        self.strings.get(name).cloned()
    }

    /// Check if the very string `name` comes from this dictionary.
    #[doc(alias = "xmlDictOwns")]
    pub fn owns(&self, name: &Rc<str>) -> bool {
        self.strings
            .get(&**name)
            .is_some_and(|found| Rc::ptr_eq(found, name))
    }

    /// Number of distinct strings stored.
    #[doc(alias = "xmlDictSize")]
    pub fn size(&self) -> usize {
        self.strings.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_interns_once() {
        let mut dict = XmlDict::new();
        let a = dict.lookup("root").unwrap();
        let b = dict.lookup("root").unwrap();
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(dict.size(), 1);
        assert!(dict.owns(&a));
        assert!(!dict.owns(&Rc::from("root")));
    }

    #[test]
    fn limit_refuses_new_strings() {
        let mut dict = XmlDict::new();
        dict.set_limit(1);
        assert!(dict.lookup("a").is_some());
        assert!(dict.lookup("a").is_some());
        assert!(dict.lookup("b").is_none());
    }
}
