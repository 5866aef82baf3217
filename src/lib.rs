//! An XML/HTML document tree library based on the tree layer of libxml2.
//!
//! Documents live in an arena ([`tree::XmlTree`]) and nodes are addressed by
//! [`tree::XmlNodeId`]. On top of the tree, the crate provides serializers for XML
//! ([`save`]) and HTML ([`html`]), the input/output buffers they rely on ([`io`]),
//! an `xmllint`-like front end ([`lint`]) and the logic of the fuzz targets ([`fuzz`]).

#![allow(clippy::missing_safety_doc)]
#![allow(clippy::too_many_arguments)]
#![allow(deprecated)]
#![warn(unused_assignments)]
#![warn(unused_mut)]
#![warn(unused_imports)]
#![warn(unused_labels)]
#![warn(unused_parens)]
#![warn(unused_variables)]
#![warn(unused_unsafe)]

pub mod buf;
pub mod dict;
pub mod encoding;
pub mod error;
pub mod fuzz;
pub mod globals;
#[cfg(feature = "html")]
pub mod html;
pub mod io;
pub mod lint;
pub mod memory;
#[cfg(feature = "libxml_output")]
pub mod save;
pub mod tree;
pub mod uri;
