//! Query template engine
//!
//! Pure string construction: no I/O happens here. Fixed expressions live in
//! [`templates`], dimensioned ones are rendered through [`MetricQuery`].

mod builder;
pub mod templates;

pub use builder::{
    build, build_child, escape_regex, escape_value, Dimensions, Division, Matcher, MetricQuery,
    Selector, Template, WorkloadKind,
};
