//! Wall buttons.
//!
//! Buttons are read-only from our side: the entity state reports whether the device currently
//! signals a press of that button.

use std::sync::Arc;

use crate::device::{Capability, Device, Platform};
use crate::entity::{
    channels, Entity, EntityBase, EntityCategory, EntityCommand, Error, ICON_BUTTON,
};

pub const BUTTON_PRESS_STATE: &str = "press";
pub const BUTTON_NO_ACTION_STATE: &str = "no_action";

pub fn discover(device: &Arc<Device>) -> Vec<Button> {
    channels(device, Capability::Button)
        .map(|index| Button::new(device, index))
        .collect()
}

pub struct Button {
    base: EntityBase,
    index: usize,
    pressed: bool,
}

impl Button {
    pub fn new(device: &Arc<Device>, index: usize) -> Self {
        let number = index + 1;
        let base = EntityBase::new(device, &number.to_string(), &format!("btn {number}"));
        let pressed = base
            .read(|state| state.flag(Capability::Button, index))
            .unwrap_or(false);
        Self {
            base,
            index,
            pressed,
        }
    }

    pub fn is_pressed(&self) -> bool {
        self.pressed
    }
}

impl Entity for Button {
    fn device(&self) -> &Arc<Device> {
        &self.base.device
    }
    fn unique_id(&self) -> &str {
        &self.base.unique_id
    }
    fn name(&self) -> &str {
        &self.base.name
    }
    fn platform(&self) -> Platform {
        Platform::Button
    }
    fn icon(&self) -> Option<&'static str> {
        Some(ICON_BUTTON)
    }
    fn entity_category(&self) -> Option<EntityCategory> {
        Some(EntityCategory::Config)
    }
    fn state(&self) -> Option<String> {
        Some(if self.pressed { BUTTON_PRESS_STATE } else { BUTTON_NO_ACTION_STATE }.to_string())
    }

    fn on_state_change(&mut self) {
        let pressed = self
            .base
            .read(|state| state.flag(Capability::Button, self.index))
            .unwrap_or(false);
        if pressed && !self.pressed {
            tracing::info!(entity = %self.base.unique_id, "button pressed");
        }
        self.pressed = pressed;
    }

    fn execute(&self, command: &EntityCommand) -> Result<(), Error> {
        match command {
            // Presses originate on the device, there is nothing to send back.
            EntityCommand::Press => {
                tracing::debug!(entity = %self.base.unique_id, "ignoring press request");
                Ok(())
            }
            _ => Err(self.base.unsupported(Platform::Button, command)),
        }
    }
}
