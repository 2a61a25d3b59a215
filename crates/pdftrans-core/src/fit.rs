//! Adaptive fit loop for re-inserted text.
//!
//! A layout attempt either fits or reports how much extra height the text
//! needs. On overflow the font shrinks by a fixed factor and the rectangle's
//! right edge grows by the overflow amount, clamped to the page. A rectangle
//! that hangs below the page is clamped and costs an extra size step. The
//! loop stops after a fixed number of attempts.

use crate::geometry::BBox;

/// Parameters of the fit loop.
#[derive(Debug, Clone, PartialEq)]
pub struct FitPolicy {
    /// Maximum number of layout attempts per block (default: 10).
    pub max_attempts: usize,
    /// Font size is divided by this factor after each overflow (default: 1.2).
    pub shrink_factor: f64,
    /// Extra size decrement when the bottom edge is clamped to the page (default: 1.0).
    pub bottom_clamp_step: f64,
    /// Font size never drops below this (default: 1.0).
    pub min_font_size: f64,
}

impl Default for FitPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            shrink_factor: 1.2,
            bottom_clamp_step: 1.0,
            min_font_size: 1.0,
        }
    }
}

/// Working state of one layout attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitAttempt {
    pub rect: BBox,
    pub font_size: f64,
    /// 1-based attempt counter.
    pub attempt: usize,
}

/// Result of a single layout attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum Layout<T> {
    Fits(T),
    /// Additional height, in points, the text would need.
    Overflow(f64),
}

/// Final result of the fit loop for one block.
#[derive(Debug, Clone, PartialEq)]
pub enum FitOutcome<T> {
    Fitted {
        value: T,
        rect: BBox,
        font_size: f64,
        attempts: usize,
    },
    Abandoned {
        attempts: usize,
        last_overflow: f64,
    },
}

impl<T> FitOutcome<T> {
    pub fn attempts(&self) -> usize {
        match self {
            FitOutcome::Fitted { attempts, .. } | FitOutcome::Abandoned { attempts, .. } => {
                *attempts
            }
        }
    }
}

impl FitPolicy {
    fn shrink(&self) -> f64 {
        if self.shrink_factor.is_finite() && self.shrink_factor > 1.0 {
            self.shrink_factor
        } else {
            1.0
        }
    }

    /// Derive the next attempt from an overflowing one.
    pub fn next_attempt(&self, prev: &FitAttempt, overflow: f64, page: &BBox) -> FitAttempt {
        let grow = if overflow.is_finite() && overflow > 0.0 {
            overflow
        } else {
            0.0
        };

        let mut size = prev.font_size / self.shrink();
        let mut rect = prev.rect;
        rect.x1 = (rect.x1 + grow).min(page.x1);
        if rect.bottom > page.bottom {
            rect.bottom = page.bottom;
            size -= self.bottom_clamp_step;
        }

        FitAttempt {
            rect,
            font_size: size.max(self.min_font_size),
            attempt: prev.attempt + 1,
        }
    }
}

/// Run the fit loop, calling `layout` once per attempt.
///
/// Always terminates after at most `policy.max_attempts` calls (at least one).
pub fn fit_text<T, F>(
    rect: BBox,
    font_size: f64,
    page: &BBox,
    policy: &FitPolicy,
    mut layout: F,
) -> FitOutcome<T>
where
    F: FnMut(&FitAttempt) -> Layout<T>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut current = FitAttempt {
        rect,
        font_size: font_size.max(policy.min_font_size),
        attempt: 1,
    };

    loop {
        match layout(&current) {
            Layout::Fits(value) => {
                return FitOutcome::Fitted {
                    value,
                    rect: current.rect,
                    font_size: current.font_size,
                    attempts: current.attempt,
                };
            }
            Layout::Overflow(amount) => {
                if current.attempt >= max_attempts {
                    return FitOutcome::Abandoned {
                        attempts: current.attempt,
                        last_overflow: amount,
                    };
                }
                current = policy.next_attempt(&current, amount, page);
            }
        }
    }
}

/// Lifecycle of one block during re-insertion.
///
/// `Pending → Fitting(1..K) → {Inserted | Abandoned}`. Terminal states
/// reject further transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockState {
    #[default]
    Pending,
    Fitting(usize),
    Inserted,
    Abandoned,
}

impl BlockState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, BlockState::Inserted | BlockState::Abandoned)
    }

    /// Enter the next fitting attempt. Returns `false` from a terminal state.
    pub fn begin_attempt(&mut self) -> bool {
        *self = match *self {
            BlockState::Pending => BlockState::Fitting(1),
            BlockState::Fitting(n) => BlockState::Fitting(n + 1),
            BlockState::Inserted | BlockState::Abandoned => return false,
        };
        true
    }

    /// Move to a terminal state. Ignored if already terminal.
    pub fn finish(&mut self, inserted: bool) {
        if !self.is_terminal() {
            *self = if inserted {
                BlockState::Inserted
            } else {
                BlockState::Abandoned
            };
        }
    }
}
