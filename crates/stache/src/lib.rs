//! Command line front end for [`stache_render`].
//!
//! ```text
//! stache render page.mustache --data page.yaml --partials templates/
//! stache check templates/**/*.mustache
//! stache key page.mustache
//! ```

pub mod cli;
pub mod data;
pub mod logging;

pub use cli::{run, Cli, Command};
