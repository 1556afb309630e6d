//! Configuration module

mod site;

pub use site::{DeriveOptions, Mode, SiteConfig, CONFIG_FILE};
