//! Compile configuration.

use std::env;
use std::ffi::OsStr;
use std::path::PathBuf;

/// Environment variable holding the image search path.
pub const ARTWORK_PATH_VAR: &str = "IPFCARTWORK";
/// Environment variable holding the imbed search path.
pub const IMBED_PATH_VAR: &str = "IPFCIMBED";

/// Which flavor of binary to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputKind {
    /// Online help (`.hlp`), with a name map.
    #[default]
    Help,
    /// Standalone book (`.inf`), without a name map.
    Inf,
}

impl OutputKind {
    pub fn extension(self) -> &'static str {
        match self {
            OutputKind::Help => "hlp",
            OutputKind::Inf => "inf",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Directories searched, in order, for `:artwork` images.
    pub image_path: Vec<PathBuf>,
    /// Directories searched, in order, for `.im` files.
    pub imbed_path: Vec<PathBuf>,
    /// Build the full-text search section.
    pub searchable: bool,
    pub output_kind: OutputKind,
    /// Locale name such as `en_US`; selects country and code page.
    pub locale: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            image_path: Vec::new(),
            imbed_path: Vec::new(),
            searchable: false,
            output_kind: OutputKind::Help,
            locale: "en_US".to_string(),
        }
    }
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read search paths from `IPFCARTWORK` / `IPFCIMBED` and the locale
    /// from `LANG`.
    pub fn from_env() -> Self {
        let mut options = Self::default();
        if let Some(value) = env::var_os(ARTWORK_PATH_VAR) {
            options.image_path = split_search_path(&value);
        }
        if let Some(value) = env::var_os(IMBED_PATH_VAR) {
            options.imbed_path = split_search_path(&value);
        }
        if let Ok(lang) = env::var("LANG")
            && !lang.is_empty()
        {
            options.locale = lang.split('.').next().unwrap_or(&lang).to_string();
        }
        options
    }

    pub fn with_image_path(mut self, dirs: Vec<PathBuf>) -> Self {
        self.image_path = dirs;
        self
    }

    pub fn with_imbed_path(mut self, dirs: Vec<PathBuf>) -> Self {
        self.imbed_path = dirs;
        self
    }

    pub fn with_searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }

    pub fn with_output_kind(mut self, kind: OutputKind) -> Self {
        self.output_kind = kind;
        self
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }
}

/// Split a platform-delimited directory list (`:` on Unix, `;` on Windows).
///
/// Empty components are dropped.
pub fn split_search_path(value: &OsStr) -> Vec<PathBuf> {
    env::split_paths(value)
        .filter(|p| !p.as_os_str().is_empty())
        .collect()
}
