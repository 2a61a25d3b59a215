//! Graphics and text state tracked by the interpreter.
//!
//! Only the parts that influence where text lands and how it looks are
//! modelled: the CTM, the non-stroking color and alpha, and the PDF text
//! state (font, spacing, scaling, leading, rise, text and line matrices).

use pdftrans_core::{Ctm, Rgb};

/// Text state parameters (Tc, Tw, Tz, TL, Tf, Ts) plus the text matrices.
#[derive(Debug, Clone, PartialEq)]
pub struct TextState {
    pub char_spacing: f64,
    pub word_spacing: f64,
    /// Horizontal scaling in percent (100 = normal).
    pub h_scaling: f64,
    pub leading: f64,
    /// Font resource name selected by `Tf`.
    pub font_name: String,
    pub font_size: f64,
    pub rise: f64,
    text_matrix: Ctm,
    line_matrix: Ctm,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            char_spacing: 0.0,
            word_spacing: 0.0,
            h_scaling: 100.0,
            leading: 0.0,
            font_name: String::new(),
            font_size: 0.0,
            rise: 0.0,
            text_matrix: Ctm::identity(),
            line_matrix: Ctm::identity(),
        }
    }
}

impl TextState {
    pub fn text_matrix(&self) -> &Ctm {
        &self.text_matrix
    }

    pub fn h_scale(&self) -> f64 {
        self.h_scaling / 100.0
    }

    /// `BT`: reset both matrices.
    pub fn begin_text(&mut self) {
        self.text_matrix = Ctm::identity();
        self.line_matrix = Ctm::identity();
    }

    /// `Tm`
    pub fn set_matrix(&mut self, m: Ctm) {
        self.text_matrix = m;
        self.line_matrix = m;
    }

    /// `Td`
    pub fn move_line(&mut self, tx: f64, ty: f64) {
        self.line_matrix = Ctm::translation(tx, ty).concat(&self.line_matrix);
        self.text_matrix = self.line_matrix;
    }

    /// `TD`
    pub fn move_line_set_leading(&mut self, tx: f64, ty: f64) {
        self.leading = -ty;
        self.move_line(tx, ty);
    }

    /// `T*`
    pub fn next_line(&mut self) {
        let leading = self.leading;
        self.move_line(0.0, -leading);
    }

    /// Move the text matrix right by `tx` text-space units.
    pub fn advance(&mut self, tx: f64) {
        self.text_matrix = Ctm::translation(tx, 0.0).concat(&self.text_matrix);
    }

    /// Text rendering matrix for the current glyph position.
    pub fn rendering_matrix(&self, ctm: &Ctm) -> Ctm {
        let params = Ctm::new(
            self.font_size * self.h_scale(),
            0.0,
            0.0,
            self.font_size,
            0.0,
            self.rise,
        );
        params.concat(&self.text_matrix).concat(ctm)
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Saved {
    ctm: Ctm,
    fill: Rgb,
    fill_alpha: f64,
    text: TextState,
}

/// Graphics state stack driven by `q`/`Q`.
///
/// Text parameters are saved with the graphics state; the text matrices are
/// not, but keeping them in the snapshot is harmless because `BT` resets
/// them.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsState {
    pub ctm: Ctm,
    pub fill: Rgb,
    pub fill_alpha: f64,
    stack: Vec<Saved>,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self {
            ctm: Ctm::identity(),
            fill: Rgb::BLACK,
            fill_alpha: 1.0,
            stack: Vec::new(),
        }
    }
}

impl GraphicsState {
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// `q`
    pub fn save(&mut self, text: &TextState) {
        self.stack.push(Saved {
            ctm: self.ctm,
            fill: self.fill,
            fill_alpha: self.fill_alpha,
            text: text.clone(),
        });
    }

    /// `Q`. An unbalanced `Q` is ignored.
    pub fn restore(&mut self, text: &mut TextState) {
        if let Some(saved) = self.stack.pop() {
            self.ctm = saved.ctm;
            self.fill = saved.fill;
            self.fill_alpha = saved.fill_alpha;
            let matrix = text.text_matrix;
            let line = text.line_matrix;
            *text = saved.text;
            text.text_matrix = matrix;
            text.line_matrix = line;
        }
    }

    /// `cm`: `CTM' = m × CTM`.
    pub fn concat(&mut self, m: Ctm) {
        self.ctm = m.concat(&self.ctm);
    }

    /// Set the fill color from `sc`/`scn`-style operands by component count.
    pub fn set_fill_components(&mut self, components: &[f64]) {
        match components {
            [g] => self.fill = Rgb::gray(*g),
            [r, g, b] => self.fill = Rgb::new(*r, *g, *b),
            [c, m, y, k] => self.fill = Rgb::from_cmyk(*c, *m, *y, *k),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn td_moves_line_start() {
        let mut t = TextState::default();
        t.begin_text();
        t.move_line(72.0, 700.0);
        t.advance(30.0);
        t.move_line(0.0, -14.0);
        approx(t.text_matrix().e, 72.0);
        approx(t.text_matrix().f, 686.0);
    }

    #[test]
    fn t_star_uses_leading() {
        let mut t = TextState::default();
        t.move_line_set_leading(10.0, -12.0);
        approx(t.leading, 12.0);
        t.next_line();
        approx(t.text_matrix().f, -24.0);
    }

    #[test]
    fn rendering_matrix_scales_by_font_size() {
        let mut t = TextState::default();
        t.font_size = 12.0;
        t.set_matrix(Ctm::new(2.0, 0.0, 0.0, 2.0, 100.0, 200.0));
        let trm = t.rendering_matrix(&Ctm::identity());
        approx(trm.vertical_scale(), 24.0);
        approx(trm.e, 100.0);
        approx(trm.f, 200.0);
    }

    #[test]
    fn restore_brings_back_color_and_font_but_not_matrix() {
        let mut g = GraphicsState::default();
        let mut t = TextState::default();
        t.font_name = "F1".to_string();
        g.save(&t);
        g.set_fill_components(&[1.0, 0.0, 0.0]);
        g.fill_alpha = 0.5;
        t.font_name = "F2".to_string();
        t.set_matrix(Ctm::translation(5.0, 5.0));
        g.restore(&mut t);
        assert_eq!(g.fill, Rgb::BLACK);
        approx(g.fill_alpha, 1.0);
        assert_eq!(t.font_name, "F1");
        approx(t.text_matrix().e, 5.0);
    }

    #[test]
    fn unbalanced_restore_is_ignored() {
        let mut g = GraphicsState::default();
        let mut t = TextState::default();
        g.concat(Ctm::translation(1.0, 2.0));
        g.restore(&mut t);
        approx(g.ctm.e, 1.0);
        assert_eq!(g.depth(), 0);
    }

    #[test]
    fn fill_components_pick_color_space_by_arity() {
        let mut g = GraphicsState::default();
        g.set_fill_components(&[0.5]);
        assert_eq!(g.fill, Rgb::gray(0.5));
        g.set_fill_components(&[0.0, 0.0, 0.0, 1.0]);
        assert_eq!(g.fill, Rgb::BLACK);
        g.set_fill_components(&[0.1, 0.2]);
        assert_eq!(g.fill, Rgb::BLACK);
    }
}
