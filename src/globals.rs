//! Provide the per-thread state shared by the tree, the serializer and the error channel.
//! This module is based on `libxml/globals.h`, `globals.c`, and so on in `libxml2-v2.11.8`.
//!
//! Please refer to original libxml2 documents also.

use std::{borrow::Cow, cell::RefCell, io::Write};

use const_format::concatcp;

use crate::{
    error::{XmlError, generic_error_default},
    tree::{
        BASE_BUFFER_SIZE, XmlBufferAllocationScheme, XmlDeregisterNodeFunc, XmlRegisterNodeFunc,
    },
};

pub type GenericError = for<'a> fn(Option<&mut (dyn Write + 'static)>, &str);
pub type StructuredError = fn(&XmlError);

pub const LIBXML_VERSION_STRING: &str = concatcp!(
    env!("CARGO_PKG_VERSION_MAJOR"),
    "0",
    env!("CARGO_PKG_VERSION_MINOR"),
    "0",
    env!("CARGO_PKG_VERSION_PATCH")
);
pub const LIBXML_DOTTED_VERSION: &str = env!("CARGO_PKG_VERSION");

pub struct XmlGlobalState {
    parser_version: Cow<'static, str>,
    pub(crate) generic_error: GenericError,
    pub(crate) generic_error_context: Option<Box<dyn Write>>,
    pub(crate) structured_error: Option<StructuredError>,
    pub(crate) buffer_alloc_scheme: XmlBufferAllocationScheme,
    pub(crate) default_buffer_size: usize,
    pub(crate) save_no_empty_tags: bool,
    pub(crate) indent_tree_output: bool,
    pub(crate) tree_indent_string: Cow<'static, str>,
    pub(crate) register_node_default_value: Option<XmlRegisterNodeFunc>,
    pub(crate) deregister_node_default_value: Option<XmlDeregisterNodeFunc>,
    pub(crate) last_error: XmlError,
}

impl XmlGlobalState {
    fn new() -> Self {
        Self {
            parser_version: Cow::Borrowed(LIBXML_VERSION_STRING),
            generic_error: generic_error_default,
            generic_error_context: None,
            structured_error: None,
            buffer_alloc_scheme: XmlBufferAllocationScheme::XmlBufferAllocExact,
            default_buffer_size: BASE_BUFFER_SIZE,
            save_no_empty_tags: false,
            indent_tree_output: true,
            tree_indent_string: Cow::Borrowed("  "),
            register_node_default_value: None,
            deregister_node_default_value: None,
            last_error: XmlError::default(),
        }
    }
}

thread_local! {
    pub static GLOBAL_STATE: RefCell<XmlGlobalState> = RefCell::new(XmlGlobalState::new());
}

/// Version string of this library, in the form `MMmmpp` zero-padded per component.
pub fn parser_version() -> String {
    GLOBAL_STATE.with_borrow(|state| state.parser_version.to_string())
}

/// Set new generic error function and generic error context.
///
/// If `func` is `None`, set `generic_error_default`.
/// If `context` is `None`, current context is clear and no context is set.
pub fn set_generic_error(func: Option<GenericError>, context: Option<impl Write + 'static>) {
    GLOBAL_STATE.with_borrow_mut(|state| {
        state.generic_error = func.unwrap_or(generic_error_default);
        state.generic_error_context = context.map(|context| {
            let boxed: Box<dyn Write + 'static> = Box::new(context);
            boxed
        });
    });
}

/// Set new structured error function.
///
/// While a structured handler is installed, the generic handler is not called.
pub fn set_structured_error(func: Option<StructuredError>) {
    GLOBAL_STATE.with_borrow_mut(|state| state.structured_error = func);
}

/// Update default buffer allocation scheme.
///
/// The scheme is only recorded and reported by [`get_buffer_allocation_scheme`].
/// Buffers choose their own growth policy, so this setting does not change how
/// they grow.
///
/// Only `XmlBufferAllocExact`, `XmlBufferAllocDoubleit` and `XmlBufferAllocHybrid`
/// are recorded. Other schemes are ignored.
#[deprecated]
#[doc(alias = "xmlSetBufferAllocationScheme")]
pub fn set_buffer_allocation_scheme(scheme: XmlBufferAllocationScheme) {
    if matches!(
        scheme,
        XmlBufferAllocationScheme::XmlBufferAllocExact
            | XmlBufferAllocationScheme::XmlBufferAllocDoubleit
            | XmlBufferAllocationScheme::XmlBufferAllocHybrid
    ) {
        GLOBAL_STATE.with_borrow_mut(|state| state.buffer_alloc_scheme = scheme);
    }
}

/// Get the recorded default buffer allocation scheme.
#[deprecated]
#[doc(alias = "xmlGetBufferAllocationScheme")]
pub fn get_buffer_allocation_scheme() -> XmlBufferAllocationScheme {
    GLOBAL_STATE.with_borrow(|state| state.buffer_alloc_scheme)
}

/// Set whether formatted output is indented.
pub fn set_indent_tree_output(indent: bool) {
    GLOBAL_STATE.with_borrow_mut(|state| state.indent_tree_output = indent);
}

/// Set the string used for one level of indentation in formatted output.
pub fn set_tree_indent_string(indent: impl Into<Cow<'static, str>>) {
    GLOBAL_STATE.with_borrow_mut(|state| state.tree_indent_string = indent.into());
}

/// Set whether empty elements are written as `<a></a>` instead of `<a/>`.
pub fn set_save_no_empty_tags(no_empty: bool) {
    GLOBAL_STATE.with_borrow_mut(|state| state.save_no_empty_tags = no_empty);
}

/// Registers a callback for node creation.
///
/// Returns the previous value of the registration function.
/// Trees created after this call copy the callback into their hooks.
#[deprecated]
#[doc(alias = "xmlRegisterNodeDefault")]
pub fn register_node_default(func: Option<XmlRegisterNodeFunc>) -> Option<XmlRegisterNodeFunc> {
    GLOBAL_STATE.with_borrow_mut(|state| {
        std::mem::replace(&mut state.register_node_default_value, func)
    })
}

/// Registers a callback for node destruction.
///
/// Returns the previous value of the deregistration function.
#[deprecated]
#[doc(alias = "xmlDeregisterNodeDefault")]
pub fn deregister_node_default(
    func: Option<XmlDeregisterNodeFunc>,
) -> Option<XmlDeregisterNodeFunc> {
    GLOBAL_STATE.with_borrow_mut(|state| {
        std::mem::replace(&mut state.deregister_node_default_value, func)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[allow(deprecated)]
    fn allocation_scheme_setter_is_only_recorded() {
        let old = get_buffer_allocation_scheme();
        set_buffer_allocation_scheme(XmlBufferAllocationScheme::XmlBufferAllocHybrid);
        assert_eq!(
            get_buffer_allocation_scheme(),
            XmlBufferAllocationScheme::XmlBufferAllocHybrid
        );
        set_buffer_allocation_scheme(XmlBufferAllocationScheme::XmlBufferAllocImmutable);
        assert_eq!(
            get_buffer_allocation_scheme(),
            XmlBufferAllocationScheme::XmlBufferAllocHybrid
        );
        set_buffer_allocation_scheme(old);
    }

    #[test]
    fn version_string_is_zero_padded() {
        let version = parser_version();
        assert!(version.chars().all(|c| c.is_ascii_digit()));
        assert!(version.len() >= 5);
    }
}
