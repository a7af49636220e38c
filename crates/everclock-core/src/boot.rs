//! Boot-path dispatch from reset cause, button state, and persisted flags.

/// Why the core came out of reset this cycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ResetCause {
    PowerOn,
    NormalReset,
    WakeFromStandby,
}

/// One-time initialization path chosen for the current wake cycle.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BootAction {
    NormalBoot,
    FullReinitThenGuide,
    WakeRefresh,
    EnterMenu,
}

/// Everything the dispatcher consults. Button levels are the debounced ones;
/// the set line is not part of the decision but rides along for the menu
/// hand-off.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct BootInputs {
    pub cause: ResetCause,
    pub oscillator_stop_fault: bool,
    pub periodic_alarm_fired: bool,
    pub up_pressed: bool,
    pub down_pressed: bool,
    pub set_pressed: bool,
    pub reset_requested: bool,
}

/// The entire decision surface, first match wins. Clearing the alarm flag is
/// the orchestrator's job when it acts on `WakeRefresh`.
pub fn decide(inputs: &BootInputs) -> BootAction {
    match inputs.cause {
        ResetCause::PowerOn | ResetCause::NormalReset => {
            if inputs.oscillator_stop_fault
                || inputs.reset_requested
                || (inputs.up_pressed && inputs.down_pressed)
            {
                BootAction::FullReinitThenGuide
            } else {
                BootAction::NormalBoot
            }
        }
        ResetCause::WakeFromStandby => {
            // Up alone forces an immediate refresh; down alone or both
            // together fall through to the menu.
            if inputs.periodic_alarm_fired || (inputs.up_pressed && !inputs.down_pressed) {
                BootAction::WakeRefresh
            } else {
                BootAction::EnterMenu
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(cause: ResetCause) -> BootInputs {
        BootInputs {
            cause,
            oscillator_stop_fault: false,
            periodic_alarm_fired: false,
            up_pressed: false,
            down_pressed: false,
            set_pressed: false,
            reset_requested: false,
        }
    }

    #[test]
    fn clean_power_on_and_reset_boot_normally() {
        for cause in [ResetCause::PowerOn, ResetCause::NormalReset] {
            assert_eq!(decide(&inputs(cause)), BootAction::NormalBoot);
        }
    }

    #[test]
    fn oscillator_fault_forces_full_reinit() {
        for cause in [ResetCause::PowerOn, ResetCause::NormalReset] {
            let mut i = inputs(cause);
            i.oscillator_stop_fault = true;
            assert_eq!(decide(&i), BootAction::FullReinitThenGuide);
        }
    }

    #[test]
    fn persisted_reset_request_forces_full_reinit() {
        for cause in [ResetCause::PowerOn, ResetCause::NormalReset] {
            let mut i = inputs(cause);
            i.reset_requested = true;
            assert_eq!(decide(&i), BootAction::FullReinitThenGuide);
        }
    }

    #[test]
    fn both_buttons_held_force_full_reinit() {
        let mut i = inputs(ResetCause::NormalReset);
        i.up_pressed = true;
        i.down_pressed = true;
        assert_eq!(decide(&i), BootAction::FullReinitThenGuide);
    }

    #[test]
    fn one_button_alone_does_not_reinit() {
        for (up, down) in [(true, false), (false, true)] {
            let mut i = inputs(ResetCause::NormalReset);
            i.up_pressed = up;
            i.down_pressed = down;
            assert_eq!(decide(&i), BootAction::NormalBoot);
        }
    }

    #[test]
    fn standby_wake_with_alarm_refreshes() {
        let mut i = inputs(ResetCause::WakeFromStandby);
        i.periodic_alarm_fired = true;
        assert_eq!(decide(&i), BootAction::WakeRefresh);
    }

    #[test]
    fn standby_wake_with_up_alone_refreshes() {
        let mut i = inputs(ResetCause::WakeFromStandby);
        i.up_pressed = true;
        assert_eq!(decide(&i), BootAction::WakeRefresh);
    }

    #[test]
    fn standby_wake_up_and_down_together_opens_menu() {
        // The up check is asymmetric: up with down held is not a refresh.
        let mut i = inputs(ResetCause::WakeFromStandby);
        i.up_pressed = true;
        i.down_pressed = true;
        assert_eq!(decide(&i), BootAction::EnterMenu);
    }

    #[test]
    fn standby_wake_without_alarm_or_up_opens_menu() {
        assert_eq!(
            decide(&inputs(ResetCause::WakeFromStandby)),
            BootAction::EnterMenu
        );
        let mut i = inputs(ResetCause::WakeFromStandby);
        i.down_pressed = true;
        assert_eq!(decide(&i), BootAction::EnterMenu);
        i.set_pressed = true;
        assert_eq!(decide(&i), BootAction::EnterMenu);
    }
}
