/// List structure used when there is an enumeration in DTDs.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XmlEnumeration {
    names: Vec<String>,
}

impl XmlEnumeration {
    /// Create an enumeration holding a single value.
    #[doc(alias = "xmlCreateEnumeration")]
    pub fn new(name: &str) -> Self {
        Self {
            names: vec![name.to_owned()],
        }
    }

    pub fn push(&mut self, name: &str) {
        self.names.push(name.to_owned());
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl<'a> FromIterator<&'a str> for XmlEnumeration {
    fn from_iter<T: IntoIterator<Item = &'a str>>(iter: T) -> Self {
        Self {
            names: iter.into_iter().map(str::to_owned).collect(),
        }
    }
}
