#![doc = include_str!("../../README.md")]
//#![deny(warnings)]
//#![warn(missing_docs)]

pub mod lang;
pub mod runtime;

/// Common test functionality
#[doc(hidden)]
pub mod test;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const TAG: Option<&str> = option_env!("TAG");

/// Current version of Sprig, or the release tag it was built from.
pub const fn version() -> &'static str {
    if let Some(tag) = TAG {
        tag
    } else {
        VERSION
    }
}
