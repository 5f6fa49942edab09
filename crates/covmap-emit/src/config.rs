//! Coverage configuration.

/// Default alignment of the coverage mapping global.
pub const COVMAP_VAR_ALIGN_BYTES: u32 = 8;

/// Coverage instrumentation configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoverageConfig {
    /// Collect regions and emit coverage at all.
    pub enabled: bool,
    /// Module being compiled; covered when no libraries are listed.
    pub main_module: String,
    /// Modules to cover instead of the main module.
    pub libraries_to_cover: Vec<String>,
    /// Alignment of the coverage mapping global, at least 8. The encoded data
    /// is always padded to 8 bytes.
    pub covmap_alignment: u32,
    /// Emit `__llvm_coverage_names` for collected functions that were
    /// never instrumented.
    pub emit_unused_names: bool,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            main_module: String::new(),
            libraries_to_cover: Vec::new(),
            covmap_alignment: COVMAP_VAR_ALIGN_BYTES,
            emit_unused_names: true,
        }
    }
}

impl CoverageConfig {
    /// Enabled configuration covering `main_module`.
    pub fn new(main_module: impl Into<String>) -> Self {
        Self {
            enabled: true,
            main_module: main_module.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Cover these modules instead of the main module.
    #[must_use]
    pub fn with_libraries_to_cover(mut self, libraries: Vec<String>) -> Self {
        self.libraries_to_cover = libraries;
        self
    }

    /// Alignment of the coverage mapping global. Must be a power of two;
    /// values below 8 are raised to 8 at emission.
    #[must_use]
    pub const fn with_covmap_alignment(mut self, alignment: u32) -> Self {
        self.covmap_alignment = alignment;
        self
    }

    #[must_use]
    pub const fn with_unused_names(mut self, enabled: bool) -> Self {
        self.emit_unused_names = enabled;
        self
    }

    /// Whether regions from `module` should be covered.
    pub fn covers(&self, module: &str) -> bool {
        if self.libraries_to_cover.is_empty() {
            module == self.main_module
        } else {
            self.libraries_to_cover.iter().any(|lib| lib == module)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_disabled() {
        let config = CoverageConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.covmap_alignment, 8);
    }

    #[test]
    fn test_covers_main_module_by_default() {
        let config = CoverageConfig::new("app");
        assert!(config.covers("app"));
        assert!(!config.covers("stdlib"));
    }

    #[test]
    fn test_libraries_replace_main_module() {
        let config = CoverageConfig::new("app").with_libraries_to_cover(vec!["core".into()]);
        assert!(config.covers("core"));
        assert!(!config.covers("app"));
    }

    #[test]
    fn test_with_covmap_alignment() {
        let config = CoverageConfig::default().with_covmap_alignment(16);
        assert_eq!(config.covmap_alignment, 16);
    }
}
