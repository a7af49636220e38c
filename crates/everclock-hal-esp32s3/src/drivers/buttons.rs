//! The three front buttons, active low with internal pull-ups.

use core::cell::RefCell;
use core::convert::Infallible;

use esp_hal::gpio::Input;
use everclock_core::drivers::{ButtonInput, ButtonLevels};

pub struct GpioButtons {
    up: Input<'static>,
    down: Input<'static>,
    set: Input<'static>,
}

impl GpioButtons {
    pub fn new(up: Input<'static>, down: Input<'static>, set: Input<'static>) -> Self {
        Self { up, down, set }
    }

    fn levels(&self) -> ButtonLevels {
        ButtonLevels {
            up: self.up.is_low(),
            down: self.down.is_low(),
            set: self.set.is_low(),
        }
    }
}

/// Shared handle so both the wake cycle and the menu can poll the same pins.
#[derive(Clone, Copy)]
pub struct SharedButtons<'a> {
    buttons: &'a RefCell<GpioButtons>,
}

impl<'a> SharedButtons<'a> {
    pub fn new(buttons: &'a RefCell<GpioButtons>) -> Self {
        Self { buttons }
    }
}

impl ButtonInput for SharedButtons<'_> {
    type Error = Infallible;

    fn read(&mut self) -> Result<ButtonLevels, Self::Error> {
        Ok(self.buttons.borrow().levels())
    }
}
