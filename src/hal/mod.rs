//! HAL response model.
//!
//! - [`model`] - typed resources, links, templates and option items
//! - [`path`] - API prefix handling for hrefs and navigation paths

pub mod model;
pub mod path;

pub use model::{
    HalFormsOptions, HalFormsProperty, HalFormsTemplate, HalLink, HalResource, LinkValue,
    OptionItem, PageMetadata, SELF_REL,
};
pub use path::ApiPaths;
