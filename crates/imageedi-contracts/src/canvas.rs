use std::ops::Sub;
use std::path::Path;

use serde::Serialize;

use crate::image::{EncodedImage, ImageError};

pub const MIN_SCALE: f64 = 0.1;
pub const MAX_SCALE: f64 = 5.0;
pub const WHEEL_ZOOM_FACTOR: f64 = 0.001;
pub const BUTTON_ZOOM_STEP: f64 = 0.2;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CanvasViewState {
    pub scale: f64,
    pub offset: Point,
}

impl Default for CanvasViewState {
    fn default() -> Self {
        Self {
            scale: 1.0,
            offset: Point::ORIGIN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

#[derive(Debug)]
pub enum DropOutcome {
    Replaced,
    Ignored(String),
    Failed(ImageError),
}

/// Pan/zoom state for the single displayed image.
///
/// Gestures only apply while an image is loaded. Any change of the displayed
/// image (including to or from no image) snaps the view back to 100% at the
/// origin.
#[derive(Debug, Clone, Default)]
pub struct CanvasController {
    view: CanvasViewState,
    image: Option<EncodedImage>,
    drag_anchor: Option<Point>,
    drag_over: bool,
}

impl CanvasController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> CanvasViewState {
        self.view
    }

    pub fn image(&self) -> Option<&EncodedImage> {
        self.image.as_ref()
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_anchor.is_some()
    }

    pub fn is_drag_over(&self) -> bool {
        self.drag_over
    }

    pub fn zoom_percent(&self) -> i64 {
        (self.view.scale * 100.0).round() as i64
    }

    /// Replaces the displayed image. Returns true when the identity changed
    /// and the view was reset.
    pub fn on_image_identity_changed(&mut self, image: Option<EncodedImage>) -> bool {
        if self.image == image {
            return false;
        }
        self.image = image;
        self.drag_anchor = None;
        self.view = CanvasViewState::default();
        true
    }

    /// Non-finite deltas are dropped so the scale stays within bounds.
    pub fn on_wheel(&mut self, delta_y: f64) {
        if !self.has_image() || !delta_y.is_finite() {
            return;
        }
        self.view.scale = clamp_scale(self.view.scale - delta_y * WHEEL_ZOOM_FACTOR);
    }

    pub fn on_zoom_button(&mut self, direction: ZoomDirection) {
        if !self.has_image() {
            return;
        }
        let step = match direction {
            ZoomDirection::In => BUTTON_ZOOM_STEP,
            ZoomDirection::Out => -BUTTON_ZOOM_STEP,
        };
        self.view.scale = clamp_scale(self.view.scale + step);
    }

    pub fn on_reset_view(&mut self) {
        self.view = CanvasViewState::default();
    }

    pub fn on_drag_start(&mut self, pointer: Point) {
        if !self.has_image() || !pointer.is_finite() {
            return;
        }
        self.drag_anchor = Some(pointer - self.view.offset);
    }

    pub fn on_drag_move(&mut self, pointer: Point) {
        if !pointer.is_finite() {
            return;
        }
        if let Some(anchor) = self.drag_anchor {
            self.view.offset = pointer - anchor;
        }
    }

    /// Pointer release or pointer leaving the surface.
    pub fn on_drag_end(&mut self) {
        self.drag_anchor = None;
    }

    pub fn on_drag_over(&mut self) {
        self.drag_over = true;
    }

    pub fn on_drag_leave(&mut self) {
        self.drag_over = false;
    }

    /// Decodes a dropped file and hands the result to `replace`. The view is
    /// left alone here; the caller's replacement triggers the identity reset.
    pub fn on_drop<D, R>(&mut self, path: &Path, decode: D, replace: R) -> DropOutcome
    where
        D: FnOnce(&Path) -> Result<EncodedImage, ImageError>,
        R: FnOnce(EncodedImage),
    {
        self.drag_over = false;
        match decode(path) {
            Ok(image) => {
                replace(image);
                DropOutcome::Replaced
            }
            Err(ImageError::NotAnImage(reason)) => DropOutcome::Ignored(reason),
            Err(err) => DropOutcome::Failed(err),
        }
    }
}

pub fn clamp_scale(scale: f64) -> f64 {
    scale.clamp(MIN_SCALE, MAX_SCALE)
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::path::Path;

    use super::*;

    fn loaded() -> CanvasController {
        let mut canvas = CanvasController::new();
        canvas.on_image_identity_changed(Some(EncodedImage::png("QUJD")));
        canvas
    }

    #[test]
    fn composed_zoom_stays_within_bounds() {
        let mut canvas = loaded();
        let deltas = [-5000.0, 120.0, -3.5, 9000.0, -40.0, 0.0, 250.0, -100_000.0];
        for (idx, delta) in deltas.iter().enumerate() {
            canvas.on_wheel(*delta);
            let direction = if idx % 2 == 0 {
                ZoomDirection::In
            } else {
                ZoomDirection::Out
            };
            for _ in 0..idx * 7 {
                canvas.on_zoom_button(direction);
                let scale = canvas.view().scale;
                assert!((MIN_SCALE..=MAX_SCALE).contains(&scale), "scale {scale}");
            }
            let scale = canvas.view().scale;
            assert!((MIN_SCALE..=MAX_SCALE).contains(&scale), "scale {scale}");
        }
    }

    #[test]
    fn wheel_scales_by_delta() {
        let mut canvas = loaded();
        canvas.on_wheel(-100.0);
        assert!((canvas.view().scale - 1.1).abs() < 1e-9);
        assert_eq!(canvas.zoom_percent(), 110);
        canvas.on_wheel(1_000_000.0);
        assert_eq!(canvas.view().scale, MIN_SCALE);
    }

    #[test]
    fn non_finite_input_is_ignored() {
        let mut canvas = loaded();
        canvas.on_wheel(f64::NAN);
        canvas.on_wheel(f64::NEG_INFINITY);
        assert_eq!(canvas.view().scale, 1.0);

        canvas.on_drag_start(Point::new(f64::NAN, 0.0));
        assert!(!canvas.is_dragging());
        canvas.on_drag_start(Point::new(10.0, 10.0));
        canvas.on_drag_move(Point::new(f64::INFINITY, 5.0));
        assert_eq!(canvas.view().offset, Point::ORIGIN);
        canvas.on_drag_move(Point::new(25.0, 5.0));
        assert_eq!(canvas.view().offset, Point::new(15.0, -5.0));
    }

    #[test]
    fn buttons_clamp_at_max() {
        let mut canvas = loaded();
        for _ in 0..50 {
            canvas.on_zoom_button(ZoomDirection::In);
        }
        assert_eq!(canvas.view().scale, MAX_SCALE);
        canvas.on_zoom_button(ZoomDirection::Out);
        assert!((canvas.view().scale - 4.8).abs() < 1e-9);
    }

    #[test]
    fn identity_change_resets_view() {
        let mut canvas = loaded();
        canvas.on_wheel(-800.0);
        canvas.on_drag_start(Point::new(10.0, 10.0));
        canvas.on_drag_move(Point::new(60.0, -15.0));

        assert!(canvas.on_image_identity_changed(Some(EncodedImage::png("REVG"))));
        assert_eq!(canvas.view(), CanvasViewState::default());
        assert!(!canvas.is_dragging());

        canvas.on_zoom_button(ZoomDirection::In);
        assert!(canvas.on_image_identity_changed(None));
        assert_eq!(canvas.view(), CanvasViewState::default());
    }

    #[test]
    fn same_image_is_not_an_identity_change() {
        let mut canvas = loaded();
        canvas.on_zoom_button(ZoomDirection::In);
        assert!(!canvas.on_image_identity_changed(Some(EncodedImage::png("QUJD"))));
        assert!((canvas.view().scale - 1.2).abs() < 1e-9);
    }

    #[test]
    fn drag_moves_offset_relative_to_anchor() {
        let mut canvas = loaded();
        canvas.on_drag_start(Point::new(100.0, 100.0));
        canvas.on_drag_move(Point::new(130.0, 80.0));
        assert_eq!(canvas.view().offset, Point::new(30.0, -20.0));
        canvas.on_drag_end();

        canvas.on_drag_start(Point::new(0.0, 0.0));
        canvas.on_drag_move(Point::new(5.0, 5.0));
        assert_eq!(canvas.view().offset, Point::new(35.0, -15.0));
        assert_eq!(canvas.view().scale, 1.0);
    }

    #[test]
    fn repeated_drag_end_keeps_offset() {
        let mut canvas = loaded();
        canvas.on_drag_start(Point::new(1.0, 2.0));
        canvas.on_drag_move(Point::new(11.0, 22.0));
        let released = canvas.view();
        canvas.on_drag_end();
        canvas.on_drag_end();
        canvas.on_drag_move(Point::new(500.0, 500.0));
        canvas.on_drag_end();
        assert_eq!(canvas.view(), released);
        assert!(!canvas.is_dragging());
    }

    #[test]
    fn gestures_need_an_image() {
        let mut canvas = CanvasController::new();
        canvas.on_wheel(-500.0);
        canvas.on_zoom_button(ZoomDirection::In);
        canvas.on_drag_start(Point::new(3.0, 3.0));
        canvas.on_drag_move(Point::new(50.0, 50.0));
        assert_eq!(canvas.view(), CanvasViewState::default());
        assert!(!canvas.is_dragging());
    }

    #[test]
    fn reset_view_restores_defaults() {
        let mut canvas = loaded();
        canvas.on_wheel(-300.0);
        canvas.on_drag_start(Point::ORIGIN);
        canvas.on_drag_move(Point::new(9.0, 9.0));
        canvas.on_drag_end();
        canvas.on_reset_view();
        assert_eq!(canvas.view(), CanvasViewState::default());
    }

    #[test]
    fn drop_invokes_replace_without_touching_view() {
        let mut canvas = loaded();
        canvas.on_zoom_button(ZoomDirection::In);
        canvas.on_drag_over();
        let replaced = RefCell::new(None);
        let outcome = canvas.on_drop(
            Path::new("dropped.png"),
            |_| Ok(EncodedImage::png("WFla")),
            |image| *replaced.borrow_mut() = Some(image),
        );
        assert!(matches!(outcome, DropOutcome::Replaced));
        assert!(!canvas.is_drag_over());
        assert!((canvas.view().scale - 1.2).abs() < 1e-9);

        let image = replaced.into_inner();
        assert_eq!(image, Some(EncodedImage::png("WFla")));
        canvas.on_image_identity_changed(image);
        assert_eq!(canvas.view(), CanvasViewState::default());
    }

    #[test]
    fn drop_of_non_image_or_broken_file_is_not_applied() {
        let mut canvas = CanvasController::new();
        let outcome = canvas.on_drop(
            Path::new("notes.txt"),
            |_| Err(ImageError::NotAnImage("text/plain".to_string())),
            |_| panic!("replace must not run"),
        );
        assert!(matches!(outcome, DropOutcome::Ignored(_)));

        let outcome = canvas.on_drop(
            Path::new("broken.png"),
            |_| Err(ImageError::Read("permission denied".to_string())),
            |_| panic!("replace must not run"),
        );
        assert!(matches!(outcome, DropOutcome::Failed(ImageError::Read(_))));
        assert!(!canvas.has_image());
    }
}
