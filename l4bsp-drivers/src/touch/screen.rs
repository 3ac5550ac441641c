//! Touchscreen layer: controller coordinates to display pixels
//!
//! Applies the optional calibration, then the panel orientation (mirror,
//! then swap) so that the reported points match what the display shows.

use l4bsp_core::config::{TouchCalibration, TouchConfig};
use l4bsp_core::traits::touch::{Gesture, TouchController, TouchPoint};

use crate::irq::IrqFlag;

/// Touches reported per state
pub const MAX_TOUCHES: usize = 2;

/// Snapshot of the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchState {
    /// Number of valid entries in `points`
    pub count: u8,
    pub points: [TouchPoint; MAX_TOUCHES],
    pub gesture: Gesture,
}

impl TouchState {
    /// Valid touches
    pub fn touches(&self) -> &[TouchPoint] {
        &self.points[..self.count as usize]
    }
}

/// Touchscreen over any [`TouchController`]
pub struct TouchScreen<C> {
    controller: C,
    config: TouchConfig,
    calibration: Option<TouchCalibration>,
}

impl<C: TouchController> TouchScreen<C> {
    /// `config` gives the native panel size and the display orientation
    pub fn new(controller: C, config: TouchConfig) -> Self {
        Self {
            controller,
            config,
            calibration: None,
        }
    }

    /// Select polling mode and forget any previous calibration
    pub fn init(&mut self) -> Result<(), C::Error> {
        self.calibration = None;
        self.controller.set_interrupt_mode(false)
    }

    /// Apply a stored calibration to every raw sample
    pub fn set_calibration(&mut self, calibration: Option<TouchCalibration>) {
        self.calibration = calibration.filter(|c| c.is_valid() && c.verify_crc());
    }

    pub fn calibration(&self) -> Option<&TouchCalibration> {
        self.calibration.as_ref()
    }

    /// Width as seen by the application
    pub fn width(&self) -> u16 {
        let (swap, _, _) = self.config.orientation.transform();
        if swap {
            self.config.height
        } else {
            self.config.width
        }
    }

    /// Height as seen by the application
    pub fn height(&self) -> u16 {
        let (swap, _, _) = self.config.orientation.transform();
        if swap {
            self.config.width
        } else {
            self.config.height
        }
    }

    /// Raise the controller interrupt line on touch
    pub fn enable_interrupt(&mut self) -> Result<(), C::Error> {
        self.controller.set_interrupt_mode(true)
    }

    pub fn disable_interrupt(&mut self) -> Result<(), C::Error> {
        self.controller.set_interrupt_mode(false)
    }

    /// Map a raw controller position to display coordinates
    pub fn transform(&self, raw_x: u16, raw_y: u16) -> (u16, u16) {
        let (w, h) = (self.config.width, self.config.height);
        let (mut x, mut y) = match &self.calibration {
            Some(cal) => cal.apply(raw_x, raw_y, w, h),
            None => (raw_x.min(w.saturating_sub(1)), raw_y.min(h.saturating_sub(1))),
        };

        let (swap, mirror_x, mirror_y) = self.config.orientation.transform();
        if mirror_x {
            x = w.saturating_sub(1) - x;
        }
        if mirror_y {
            y = h.saturating_sub(1) - y;
        }
        if swap {
            (y, x)
        } else {
            (x, y)
        }
    }

    /// Read all touches and the gesture
    pub fn get_state(&mut self) -> Result<TouchState, C::Error> {
        let mut state = TouchState::default();
        let max = self.controller.max_touches().min(MAX_TOUCHES as u8);
        let count = self.controller.detect_touch()?.min(max);

        for index in 0..count {
            let mut point = self.controller.touch_point(index)?;
            let (x, y) = self.transform(point.x, point.y);
            point.x = x;
            point.y = y;
            state.points[index as usize] = point;
        }
        state.count = count;
        if count > 0 {
            state.gesture = self.controller.gesture()?;
        }
        Ok(state)
    }

    /// Read the state only when the touch interrupt fired
    pub fn poll_irq(&mut self, flag: &IrqFlag) -> Result<Option<TouchState>, C::Error> {
        if !flag.take() {
            return Ok(None);
        }
        self.get_state().map(Some)
    }

    /// Access the controller
    pub fn controller(&mut self) -> &mut C {
        &mut self.controller
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use l4bsp_core::config::{AxisCalibration, Orientation};
    use l4bsp_core::traits::touch::TouchEvent;

    /// Controller reporting a fixed list of raw points
    struct FakeController {
        points: std::vec::Vec<(u16, u16)>,
        interrupt: bool,
    }

    impl FakeController {
        fn with(points: &[(u16, u16)]) -> Self {
            Self {
                points: points.to_vec(),
                interrupt: true,
            }
        }
    }

    impl TouchController for FakeController {
        type Error = ();

        fn max_touches(&self) -> u8 {
            2
        }

        fn chip_id(&mut self) -> Result<u8, ()> {
            Ok(0x11)
        }

        fn detect_touch(&mut self) -> Result<u8, ()> {
            Ok(self.points.len() as u8)
        }

        fn touch_point(&mut self, index: u8) -> Result<TouchPoint, ()> {
            let (x, y) = self.points[index as usize];
            Ok(TouchPoint {
                x,
                y,
                weight: 10,
                area: 1,
                event: TouchEvent::Contact,
            })
        }

        fn gesture(&mut self) -> Result<Gesture, ()> {
            Ok(Gesture::MoveLeft)
        }

        fn set_interrupt_mode(&mut self, enabled: bool) -> Result<(), ()> {
            self.interrupt = enabled;
            Ok(())
        }
    }

    fn config(orientation: Orientation) -> TouchConfig {
        TouchConfig {
            width: 400,
            height: 300,
            orientation,
        }
    }

    #[test]
    fn test_portrait_passes_through() {
        let mut ts = TouchScreen::new(FakeController::with(&[(10, 20)]), config(Orientation::Portrait));
        ts.init().unwrap();
        assert!(!ts.controller().interrupt);

        let state = ts.get_state().unwrap();
        assert_eq!(state.count, 1);
        assert_eq!((state.points[0].x, state.points[0].y), (10, 20));
        assert_eq!(state.gesture, Gesture::MoveLeft);
    }

    #[test]
    fn test_orientations() {
        let fake = || FakeController::with(&[]);

        let ts = TouchScreen::new(fake(), config(Orientation::PortraitFlipped));
        assert_eq!(ts.transform(10, 20), (389, 279));

        let ts = TouchScreen::new(fake(), config(Orientation::Landscape));
        assert_eq!((ts.width(), ts.height()), (300, 400));
        assert_eq!(ts.transform(10, 20), (279, 10));

        let ts = TouchScreen::new(fake(), config(Orientation::LandscapeFlipped));
        assert_eq!(ts.transform(10, 20), (20, 389));
    }

    #[test]
    fn test_out_of_panel_raw_is_clamped() {
        let ts = TouchScreen::new(FakeController::with(&[]), config(Orientation::Portrait));
        assert_eq!(ts.transform(1000, 1000), (399, 299));
    }

    #[test]
    fn test_calibration_applied_before_orientation() {
        let mut ts = TouchScreen::new(FakeController::with(&[(2000, 100)]), config(Orientation::Portrait));
        let cal = TouchCalibration::new(
            AxisCalibration {
                raw_min: 0,
                raw_max: 3990,
            },
            AxisCalibration {
                raw_min: 100,
                raw_max: 3088,
            },
        );
        ts.set_calibration(Some(cal));

        let state = ts.get_state().unwrap();
        assert_eq!((state.points[0].x, state.points[0].y), (200, 0));
    }

    #[test]
    fn test_corrupted_calibration_ignored() {
        let mut ts = TouchScreen::new(FakeController::with(&[]), config(Orientation::Portrait));
        let mut cal = TouchCalibration::identity(400, 300);
        cal.crc ^= 1;
        ts.set_calibration(Some(cal));
        assert!(ts.calibration().is_none());
    }

    #[test]
    fn test_no_touch_skips_gesture() {
        let mut ts = TouchScreen::new(FakeController::with(&[]), config(Orientation::Portrait));
        let state = ts.get_state().unwrap();
        assert_eq!(state.count, 0);
        assert!(state.touches().is_empty());
        assert_eq!(state.gesture, Gesture::None);
    }

    #[test]
    fn test_poll_irq_consumes_flag() {
        let flag = IrqFlag::new();
        let mut ts = TouchScreen::new(FakeController::with(&[(1, 1)]), config(Orientation::Portrait));
        assert_eq!(ts.poll_irq(&flag).unwrap(), None);
        flag.signal();
        assert_eq!(ts.poll_irq(&flag).unwrap().map(|s| s.count), Some(1));
    }
}
