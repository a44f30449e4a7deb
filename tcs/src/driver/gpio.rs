use embedded_hal::digital::OutputPin;

/// The gpio driver is a wrapper for the embedded-hal digital output pin trait.
/// It wraps the low-active and high-active pins, and provides a way to set the pin state
pub(crate) struct OutputController<P: OutputPin> {
    pin: P,
    low_active: bool,
    active: bool,
}

impl<P: OutputPin> OutputController<P> {
    /// Create a new OutputController instance
    pub fn new(pin: P, low_active: bool) -> Self {
        Self {
            pin,
            low_active,
            active: false,
        }
    }

    /// Activate the GPIO pin
    pub fn activate(&mut self) {
        let result = if self.low_active {
            self.pin.set_low()
        } else {
            self.pin.set_high()
        };
        if result.is_err() {
            error!("Failed to activate output pin");
        }
        self.active = true;
    }

    /// Deactivate the GPIO pin
    pub fn deactivate(&mut self) {
        let result = if self.low_active {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        if result.is_err() {
            error!("Failed to deactivate output pin");
        }
        self.active = false;
    }

    /// Last state written to the pin
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn release(self) -> P {
        self.pin
    }
}
