//! Transition descriptors
//!
//! The navigator does not animate anything. Routes may describe how they would like to
//! enter the screen and the UI collaborator reads that description through
//! [`Coordinator::transition_for`](crate::Coordinator::transition_for).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Slide direction for slide transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlideDirection {
    Left,
    Right,
    Up,
    Down,
}

/// Requested page transition
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Transition {
    /// No animation
    #[default]
    None,
    /// Cross-fade
    Fade { duration_ms: u64 },
    /// Slide in from one edge
    Slide {
        direction: SlideDirection,
        duration_ms: u64,
    },
    /// Scale between two factors
    Scale { from: f32, to: f32, duration_ms: u64 },
}

impl Transition {
    pub fn fade(duration_ms: u64) -> Self {
        Self::Fade { duration_ms }
    }

    pub fn slide(direction: SlideDirection, duration_ms: u64) -> Self {
        Self::Slide {
            direction,
            duration_ms,
        }
    }

    pub fn slide_left(duration_ms: u64) -> Self {
        Self::slide(SlideDirection::Left, duration_ms)
    }

    pub fn slide_right(duration_ms: u64) -> Self {
        Self::slide(SlideDirection::Right, duration_ms)
    }

    pub fn slide_up(duration_ms: u64) -> Self {
        Self::slide(SlideDirection::Up, duration_ms)
    }

    pub fn slide_down(duration_ms: u64) -> Self {
        Self::slide(SlideDirection::Down, duration_ms)
    }

    pub fn scale(from: f32, to: f32, duration_ms: u64) -> Self {
        Self::Scale {
            from,
            to,
            duration_ms,
        }
    }

    /// Scale up from half size
    pub fn zoom_in(duration_ms: u64) -> Self {
        Self::scale(0.5, 1.0, duration_ms)
    }

    pub fn duration(&self) -> Duration {
        match self {
            Self::None => Duration::ZERO,
            Self::Fade { duration_ms }
            | Self::Slide { duration_ms, .. }
            | Self::Scale { duration_ms, .. } => Duration::from_millis(*duration_ms),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Transition to play when the route leaves (slides reverse direction)
    pub fn reversed(&self) -> Self {
        match *self {
            Self::Slide {
                direction,
                duration_ms,
            } => Self::Slide {
                direction: match direction {
                    SlideDirection::Left => SlideDirection::Right,
                    SlideDirection::Right => SlideDirection::Left,
                    SlideDirection::Up => SlideDirection::Down,
                    SlideDirection::Down => SlideDirection::Up,
                },
                duration_ms,
            },
            Self::Scale {
                from,
                to,
                duration_ms,
            } => Self::Scale {
                from: to,
                to: from,
                duration_ms,
            },
            other => other,
        }
    }
}

/// Route capability describing its page transition
pub trait RouteTransition {
    fn transition(&self) -> Transition;
}
