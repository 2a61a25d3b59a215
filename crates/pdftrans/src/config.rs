//! Run configuration for [`DocumentTranslator`](crate::DocumentTranslator).

use std::path::PathBuf;

use pdftrans_core::{Alignment, ExtractOptions, FitPolicy, PdfError};

use crate::reinsert::InsertOptions;

/// Everything one translation run needs, fixed at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslateConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    /// Target language, passed verbatim to the translator.
    pub target_language: String,
    /// Neighbor pages on each side given as context (default: 1).
    pub context_window: usize,
    /// Layout attempts per block (default: 10).
    pub max_fit_attempts: usize,
    /// Font size divisor per overflow (default: 1.2).
    pub shrink_factor: f64,
    pub alignment: Alignment,
    /// Options for reading page content.
    pub extract: ExtractOptions,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::new(),
            output_path: PathBuf::new(),
            target_language: String::new(),
            context_window: 1,
            max_fit_attempts: 10,
            shrink_factor: 1.2,
            alignment: Alignment::Left,
            extract: ExtractOptions::default(),
        }
    }
}

impl TranslateConfig {
    pub fn new(
        input_path: impl Into<PathBuf>,
        output_path: impl Into<PathBuf>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: output_path.into(),
            target_language: target_language.into(),
            ..Self::default()
        }
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), PdfError> {
        if self.target_language.trim().is_empty() {
            return Err(PdfError::Other("target language is empty".to_string()));
        }
        if self.max_fit_attempts == 0 {
            return Err(PdfError::Other("max_fit_attempts must be at least 1".to_string()));
        }
        if !(self.shrink_factor.is_finite() && self.shrink_factor > 1.0) {
            return Err(PdfError::Other(format!(
                "shrink_factor must be greater than 1, got {}",
                self.shrink_factor
            )));
        }
        Ok(())
    }

    pub fn fit_policy(&self) -> FitPolicy {
        FitPolicy {
            max_attempts: self.max_fit_attempts,
            shrink_factor: self.shrink_factor,
            ..FitPolicy::default()
        }
    }

    pub fn insert_options(&self) -> InsertOptions {
        InsertOptions {
            fit: self.fit_policy(),
            alignment: self.alignment,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = TranslateConfig::new("in.pdf", "out/out.pdf", "German");
        assert_eq!(config.context_window, 1);
        assert_eq!(config.max_fit_attempts, 10);
        assert_eq!(config.shrink_factor, 1.2);
        assert_eq!(config.alignment, Alignment::Left);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn policy_follows_config() {
        let config = TranslateConfig {
            max_fit_attempts: 4,
            shrink_factor: 1.5,
            alignment: Alignment::Right,
            ..TranslateConfig::new("a", "b", "Arabic")
        };
        let options = config.insert_options();
        assert_eq!(options.fit.max_attempts, 4);
        assert_eq!(options.fit.shrink_factor, 1.5);
        assert_eq!(options.fit.bottom_clamp_step, 1.0);
        assert_eq!(options.alignment, Alignment::Right);
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let base = TranslateConfig::new("a", "b", "French");
        assert!(TranslateConfig { shrink_factor: 1.0, ..base.clone() }.validate().is_err());
        assert!(TranslateConfig { max_fit_attempts: 0, ..base.clone() }.validate().is_err());
        assert!(TranslateConfig { target_language: " ".into(), ..base }.validate().is_err());
    }
}
