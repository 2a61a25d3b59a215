//! Content handler callback trait for content stream interpretation.
//!
//! The interpreter reports what a page paints through [`ContentHandler`].
//! Coordinates in events are in PDF user space of the page (origin at the
//! bottom-left of the coordinate system, y up); callers flip them against
//! the page box.

use pdftrans_core::{Diagnostic, Point, Rgb};

/// One shown string (a `Tj`, `'`, `"` operand or a whole `TJ` array).
#[derive(Debug, Clone, PartialEq)]
pub struct TextRunEvent {
    /// Decoded Unicode text.
    pub text: String,
    /// Base font name with any subset tag kept (e.g. "ABCDEF+ArialMT").
    pub font_name: String,
    /// Resource name the font was selected under (e.g. "F1").
    pub resource_name: String,
    /// Font size after the text and transformation matrices are applied.
    pub font_size: f64,
    /// Baseline start point in page space.
    pub origin: Point,
    /// Baseline end point in page space, after the last glyph advance.
    pub end: Point,
    /// Font descent as a fraction of the em (negative below the baseline).
    pub descent: f64,
    /// Non-stroking color at the time of painting.
    pub fill: Rgb,
    /// Non-stroking alpha (`/ca`) at the time of painting.
    pub alpha: f64,
}

/// A placed image XObject.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageEvent {
    /// XObject resource name (e.g. "Im0").
    pub name: String,
    /// Corners of the unit square mapped through the CTM: min and max.
    pub min: Point,
    pub max: Point,
}

/// Callback handler for content stream interpretation.
///
/// All methods default to no-ops, so handlers only implement the events
/// they need.
pub trait ContentHandler {
    /// Called for each shown string.
    fn on_text_run(&mut self, _event: TextRunEvent) {}

    /// Called when an image XObject is placed.
    fn on_image(&mut self, _event: ImageEvent) {}

    /// Called for recoverable problems; interpretation continues with defaults.
    fn on_warning(&mut self, _warning: Diagnostic) {}
}

/// Handler that gathers every event, mostly for tests and diagnostics.
#[derive(Debug, Default)]
pub struct CollectingHandler {
    pub runs: Vec<TextRunEvent>,
    pub images: Vec<ImageEvent>,
    pub warnings: Vec<Diagnostic>,
}

impl ContentHandler for CollectingHandler {
    fn on_text_run(&mut self, event: TextRunEvent) {
        self.runs.push(event);
    }

    fn on_image(&mut self, event: ImageEvent) {
        self.images.push(event);
    }

    fn on_warning(&mut self, warning: Diagnostic) {
        self.warnings.push(warning);
    }
}
