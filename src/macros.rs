//! Macro-substitution boundary
//!
//! Folder and filename templates contain substitution tokens (`%date%`,
//! `%name%`, ...) expanded by an external macro engine. The engine calls it
//! twice per target: once for the destination folder, once for the file name.

use crate::capture::ImageFormat;

/// Filename macro applied to bootstrapped targets.
pub const DEFAULT_FILENAME_MACRO: &str = "%date%_%time%.%format%";

/// Per-target context for filename expansion.
#[derive(Debug, Clone, Copy)]
pub struct MacroContext<'a> {
    pub name: &'a str,
    pub component: i32,
    pub format: ImageFormat,
    pub window_title: &'a str,
}

/// Opaque, pure template expansion.
pub trait MacroExpander {
    /// Expand a folder template.
    fn expand(&self, template: &str) -> String;

    /// Expand a filename template with the target's context.
    fn expand_with(&self, template: &str, ctx: &MacroContext<'_>) -> String;
}
