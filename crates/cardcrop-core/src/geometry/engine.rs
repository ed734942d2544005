//! Drag-session constraint engine for the crop rectangle.
//!
//! A drag session starts on one [`Handle`], snapshots the rectangle as its
//! anchor, and then receives cumulative deltas relative to that anchor.
//! Every candidate rectangle is corrected before it is stored, so callers
//! can never observe a rectangle that breaks the geometry invariants.
//!
//! # Example
//!
//! ```ignore
//! let display = DisplaySize::new(320.0, 240.0)?;
//! let mut engine = CropEngine::new(display, CropConfig::default())?;
//!
//! engine.begin_session(Handle::BottomRight)?;
//! engine.update(DragDelta::new(-40.0, -20.0));
//! let rect = engine.end_session();
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::rect::{CropConfig, CropRect, DisplaySize, GeometryError};

/// Interactive control used to mutate the crop rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Handle {
    /// Translate the whole rectangle.
    Move,
    Top,
    Bottom,
    Left,
    Right,
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Handle {
    pub const ALL: [Handle; 9] = [
        Handle::Move,
        Handle::Top,
        Handle::Bottom,
        Handle::Left,
        Handle::Right,
        Handle::TopLeft,
        Handle::TopRight,
        Handle::BottomLeft,
        Handle::BottomRight,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Handle::Move => "move",
            Handle::Top => "top",
            Handle::Bottom => "bottom",
            Handle::Left => "left",
            Handle::Right => "right",
            Handle::TopLeft => "topLeft",
            Handle::TopRight => "topRight",
            Handle::BottomLeft => "bottomLeft",
            Handle::BottomRight => "bottomRight",
        }
    }

    fn moves_left(self) -> bool {
        matches!(self, Handle::Left | Handle::TopLeft | Handle::BottomLeft)
    }

    fn moves_right(self) -> bool {
        matches!(self, Handle::Right | Handle::TopRight | Handle::BottomRight)
    }

    fn moves_top(self) -> bool {
        matches!(self, Handle::Top | Handle::TopLeft | Handle::TopRight)
    }

    fn moves_bottom(self) -> bool {
        matches!(self, Handle::Bottom | Handle::BottomLeft | Handle::BottomRight)
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Handle {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Handle::ALL
            .into_iter()
            .find(|h| h.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| SessionError::UnknownHandle(s.to_string()))
    }
}

/// Cumulative pointer movement since the session began, in display pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DragDelta {
    pub dx: f64,
    pub dy: f64,
}

impl DragDelta {
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    // NaN would poison every clamp below; infinities clamp fine.
    fn sanitized(self) -> Self {
        let fix = |v: f64| if v.is_nan() { 0.0 } else { v };
        Self {
            dx: fix(self.dx),
            dy: fix(self.dy),
        }
    }
}

/// Errors from the drag-session API.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    /// Only one drag session may be active at a time.
    #[error("A drag session is already active on handle '{0}'")]
    AlreadyActive(Handle),

    /// The handle name is not one of the nine known handles.
    #[error("Unknown crop handle: {0}")]
    UnknownHandle(String),
}

#[derive(Debug, Clone, Copy)]
struct DragSession {
    handle: Handle,
    anchor: CropRect,
}

/// Owns one crop rectangle and applies constrained mutations to it.
#[derive(Debug, Clone)]
pub struct CropEngine {
    display: DisplaySize,
    config: CropConfig,
    min_width: f64,
    min_height: f64,
    rect: CropRect,
    session: Option<DragSession>,
}

impl CropEngine {
    /// Create an engine with the default centered rectangle.
    ///
    /// # Errors
    ///
    /// Returns a `GeometryError` if the display size or config is invalid.
    pub fn new(display: DisplaySize, config: CropConfig) -> Result<Self, GeometryError> {
        let display = display.validated()?;
        let config = config.validated()?;
        let (min_width, min_height) = effective_min(display, config.min_size);

        Ok(Self {
            display,
            config,
            min_width,
            min_height,
            rect: CropRect::centered(display, config.inset_ratio, min_width, min_height),
            session: None,
        })
    }

    /// Discard the rectangle and any session, and start over for a new display size.
    pub fn reset(&mut self, display: DisplaySize) -> Result<(), GeometryError> {
        *self = Self::new(display, self.config)?;
        Ok(())
    }

    pub fn rect(&self) -> CropRect {
        self.rect
    }

    pub fn display(&self) -> DisplaySize {
        self.display
    }

    pub fn config(&self) -> CropConfig {
        self.config
    }

    /// Effective minimum `(width, height)`, never larger than the display.
    pub fn min_size(&self) -> (f64, f64) {
        (self.min_width, self.min_height)
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn active_handle(&self) -> Option<Handle> {
        self.session.map(|s| s.handle)
    }

    /// Start a drag session on `handle`, anchoring at the current rectangle.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::AlreadyActive` (and changes nothing) if a
    /// session is already running.
    pub fn begin_session(&mut self, handle: Handle) -> Result<(), SessionError> {
        if let Some(active) = self.session {
            return Err(SessionError::AlreadyActive(active.handle));
        }
        debug!(handle = %handle, "crop drag session started");
        self.session = Some(DragSession {
            handle,
            anchor: self.rect,
        });
        Ok(())
    }

    /// Apply the cumulative `delta` of the active session.
    ///
    /// Without an active session this is a no-op. Returns the (always valid)
    /// current rectangle.
    pub fn update(&mut self, delta: DragDelta) -> CropRect {
        let Some(session) = self.session else {
            return self.rect;
        };
        let delta = delta.sanitized();

        self.rect = match session.handle {
            Handle::Move => self.translate(session.anchor, delta),
            handle => self.resize(session.anchor, handle, delta),
        };
        self.rect
    }

    /// End the active session; the last updated rectangle becomes the baseline.
    pub fn end_session(&mut self) -> CropRect {
        if let Some(session) = self.session.take() {
            debug!(
                handle = %session.handle,
                left = self.rect.left,
                top = self.rect.top,
                right = self.rect.right,
                bottom = self.rect.bottom,
                "crop drag session ended"
            );
        }
        self.rect
    }

    /// Replace the rectangle with `proposed`, corrected to satisfy every
    /// invariant. Ignored while a drag session is active.
    ///
    /// Non-finite proposals fall back to the default centered rectangle.
    pub fn set_rect(&mut self, proposed: CropRect) -> CropRect {
        if self.session.is_some() {
            return self.rect;
        }

        self.rect = if proposed.is_finite() {
            let (left, right) = normalize_span(
                proposed.left,
                proposed.right,
                self.display.width,
                self.min_width,
            );
            let (top, bottom) = normalize_span(
                proposed.top,
                proposed.bottom,
                self.display.height,
                self.min_height,
            );
            CropRect::new(left, top, right, bottom)
        } else {
            CropRect::centered(
                self.display,
                self.config.inset_ratio,
                self.min_width,
                self.min_height,
            )
        };
        self.rect
    }

    /// Find the handle under a display-space point.
    ///
    /// Corners win over edges, edges win over the interior. Points farther
    /// than `tolerance` from the rectangle hit nothing.
    pub fn hit_test(&self, x: f64, y: f64, tolerance: f64) -> Option<Handle> {
        let r = self.rect;
        let tol = tolerance.max(0.0);
        let near = |a: f64, b: f64| (a - b).abs() <= tol;
        let within_x = x >= r.left - tol && x <= r.right + tol;
        let within_y = y >= r.top - tol && y <= r.bottom + tol;

        if !(within_x && within_y) {
            return None;
        }

        let (at_left, at_right) = (near(x, r.left), near(x, r.right));
        let (at_top, at_bottom) = (near(y, r.top), near(y, r.bottom));

        let handle = match (at_left, at_right, at_top, at_bottom) {
            (true, _, true, _) => Handle::TopLeft,
            (_, true, true, _) => Handle::TopRight,
            (true, _, _, true) => Handle::BottomLeft,
            (_, true, _, true) => Handle::BottomRight,
            (true, _, _, _) => Handle::Left,
            (_, true, _, _) => Handle::Right,
            (_, _, true, _) => Handle::Top,
            (_, _, _, true) => Handle::Bottom,
            _ if r.contains(x, y) => Handle::Move,
            _ => return None,
        };
        Some(handle)
    }

    /// Translate the anchor, reducing the delta so the size never changes.
    fn translate(&self, anchor: CropRect, delta: DragDelta) -> CropRect {
        let width = anchor.width();
        let height = anchor.height();

        let left = (anchor.left + delta.dx).clamp(0.0, (self.display.width - width).max(0.0));
        let top = (anchor.top + delta.dy).clamp(0.0, (self.display.height - height).max(0.0));

        CropRect::new(
            left,
            top,
            (left + width).min(self.display.width),
            (top + height).min(self.display.height),
        )
    }

    /// Move the dragged edges; the opposite edges stay at their anchor values.
    fn resize(&self, anchor: CropRect, handle: Handle, delta: DragDelta) -> CropRect {
        let mut rect = anchor;

        if handle.moves_left() {
            rect.left = drag_low_edge(
                anchor.left,
                anchor.right,
                delta.dx,
                self.display.width,
                self.min_width,
            );
        } else if handle.moves_right() {
            rect.right = drag_high_edge(
                anchor.right,
                anchor.left,
                delta.dx,
                self.display.width,
                self.min_width,
            );
        }

        if handle.moves_top() {
            rect.top = drag_low_edge(
                anchor.top,
                anchor.bottom,
                delta.dy,
                self.display.height,
                self.min_height,
            );
        } else if handle.moves_bottom() {
            rect.bottom = drag_high_edge(
                anchor.bottom,
                anchor.top,
                delta.dy,
                self.display.height,
                self.min_height,
            );
        }

        rect
    }
}

fn effective_min(display: DisplaySize, min_size: f64) -> (f64, f64) {
    (min_size.min(display.width), min_size.min(display.height))
}

/// Clamp a dragged low edge (left/top). Minimum size wins over bounds.
fn drag_low_edge(edge: f64, opposite: f64, delta: f64, extent: f64, min: f64) -> f64 {
    (edge + delta).clamp(0.0, extent).min(opposite - min).max(0.0)
}

/// Clamp a dragged high edge (right/bottom). Minimum size wins over bounds.
fn drag_high_edge(edge: f64, opposite: f64, delta: f64, extent: f64, min: f64) -> f64 {
    (edge + delta).clamp(0.0, extent).max(opposite + min).min(extent)
}

fn normalize_span(a: f64, b: f64, extent: f64, min: f64) -> (f64, f64) {
    let lo = a.min(b).clamp(0.0, extent);
    let hi = a.max(b).clamp(0.0, extent);
    if hi - lo >= min {
        (lo, hi)
    } else {
        let hi = (lo + min).min(extent);
        (hi - min, hi)
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
