//! Stylesheets for the classes written by [`SyntectHighlighter`](crate::highlight::SyntectHighlighter).

use std::sync::LazyLock;

use smol_str::SmolStr;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::html::{ClassStyle, css_for_theme_with_class_style};

use crate::error::HighlightError;
use crate::highlight::CSS_PREFIX;

pub const DEFAULT_LIGHT_THEME: &str = "InspiredGitHub";
pub const DEFAULT_DARK_THEME: &str = "base16-ocean.dark";

static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

/// Names of the bundled themes.
pub fn theme_names() -> impl Iterator<Item = &'static str> {
    THEME_SET.themes.keys().map(String::as_str)
}

fn theme(name: &str) -> Result<&'static Theme, HighlightError> {
    THEME_SET
        .themes
        .get(name)
        .ok_or_else(|| HighlightError::UnknownTheme(SmolStr::new(name)))
}

/// CSS for one bundled theme.
pub fn stylesheet(theme_name: &str) -> Result<String, HighlightError> {
    let css = css_for_theme_with_class_style(
        theme(theme_name)?,
        ClassStyle::SpacedPrefixed { prefix: CSS_PREFIX },
    )?;
    Ok(css)
}

/// Light theme by default, dark theme under `prefers-color-scheme: dark`.
pub fn light_dark_stylesheet(light: &str, dark: &str) -> Result<String, HighlightError> {
    let light_css = stylesheet(light)?;
    let dark_css = stylesheet(dark)?;

    let mut result = String::new();
    result.push_str("/* Syntax highlighting - Light Mode (default) */\n");
    result.push_str(&light_css);
    result.push_str("\n\n/* Syntax highlighting - Dark Mode */\n");
    result.push_str("@media (prefers-color-scheme: dark) {\n");
    result.push_str(&dark_css);
    result.push_str("}\n");

    Ok(result)
}
