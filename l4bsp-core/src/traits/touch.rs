//! Touch controller trait

/// Event attached to a touch point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TouchEvent {
    /// Finger just landed
    PressDown,
    /// Finger just lifted
    LiftUp,
    /// Finger resting
    Contact,
    #[default]
    NoEvent,
}

/// Gesture recognized by the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Gesture {
    #[default]
    None,
    MoveUp,
    MoveRight,
    MoveDown,
    MoveLeft,
    ZoomIn,
    ZoomOut,
}

/// One raw touch sample in controller coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TouchPoint {
    pub x: u16,
    pub y: u16,
    /// Pressure/weight reported by the controller
    pub weight: u8,
    /// Contact area
    pub area: u8,
    pub event: TouchEvent,
}

/// Capacitive touch controller
pub trait TouchController {
    /// Error type for controller operations
    type Error;

    /// Maximum simultaneous touches the controller reports
    fn max_touches(&self) -> u8;

    /// Read the controller chip id
    fn chip_id(&mut self) -> Result<u8, Self::Error>;

    /// Number of active touches (0 when none or the count is invalid)
    fn detect_touch(&mut self) -> Result<u8, Self::Error>;

    /// Read touch `index` (0-based, below the count from `detect_touch`)
    fn touch_point(&mut self, index: u8) -> Result<TouchPoint, Self::Error>;

    /// Last recognized gesture
    fn gesture(&mut self) -> Result<Gesture, Self::Error>;

    /// Select interrupt (trigger) mode or polling mode
    fn set_interrupt_mode(&mut self, enabled: bool) -> Result<(), Self::Error>;
}
