//! UI module: server-rendered HTML for the confirmation flow.

pub mod pages;

pub use pages::PageRenderer;
