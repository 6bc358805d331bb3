//! Plugins compiled into the `nuoca` binary.
//!
//! They run in their own process like any other plugin: the agent starts
//! `nuoca plugin --category <c> --name <n>` for each one.

mod json_lines;
mod printer;
mod static_input;

pub use json_lines::JsonLines;
pub use printer::Printer;
pub use static_input::StaticInput;

use nuoca_core::{Category, PluginCatalog};

/// Catalog of every built-in plugin.
pub fn builtin_catalog() -> PluginCatalog {
    PluginCatalog::new()
        .with(StaticInput::NAME, Category::Input, || {
            Box::new(StaticInput::default())
        })
        .with(Printer::NAME, Category::Output, || Box::new(Printer::stderr()))
        .with(JsonLines::NAME, Category::Output, || {
            Box::new(JsonLines::default())
        })
}
