//! Two-step passcode creation: enter, then confirm.

use crate::gate::{KeyPress, Keypad};
use zeroize::Zeroizing;

/// Enrollment step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrollmentStep {
    /// Entering the new passcode
    Create,
    /// Re-entering it
    Confirm,
    /// Both entries matched
    Done,
}

/// Result of a key press during enrollment
#[derive(Debug, PartialEq, Eq)]
pub enum EnrollmentProgress {
    /// Key had no effect
    Ignored,
    /// Waiting for more digits
    Pending,
    /// First entry complete, confirmation needed
    ConfirmRequired,
    /// Confirmation did not match; enter it again
    Mismatch,
    /// Passcode confirmed, ready to enable
    Complete(Zeroizing<String>),
}

/// Passcode creation flow
pub struct PasscodeEnrollment {
    step: EnrollmentStep,
    keypad: Keypad,
    first: Zeroizing<String>,
}

impl PasscodeEnrollment {
    /// Start at the create step
    pub fn new(length: usize) -> Self {
        Self {
            step: EnrollmentStep::Create,
            keypad: Keypad::new(length),
            first: Zeroizing::new(String::new()),
        }
    }

    /// Current step
    pub fn step(&self) -> EnrollmentStep {
        self.step
    }

    /// Keypad state for rendering
    pub fn keypad(&self) -> &Keypad {
        &self.keypad
    }

    /// Remove the last digit of the current entry
    pub fn backspace(&mut self) {
        self.keypad.backspace();
    }

    /// Enter one digit
    pub fn press_digit(&mut self, digit: char) -> EnrollmentProgress {
        if self.step == EnrollmentStep::Done {
            return EnrollmentProgress::Ignored;
        }
        let entry = match self.keypad.press_digit(digit) {
            KeyPress::Ignored => return EnrollmentProgress::Ignored,
            KeyPress::Incomplete => return EnrollmentProgress::Pending,
            KeyPress::Complete(entry) => entry,
        };

        match self.step {
            EnrollmentStep::Create => {
                self.first = entry;
                self.keypad.reset();
                self.step = EnrollmentStep::Confirm;
                EnrollmentProgress::ConfirmRequired
            }
            EnrollmentStep::Confirm if entry == self.first => {
                self.keypad.reset();
                self.step = EnrollmentStep::Done;
                EnrollmentProgress::Complete(self.first.clone())
            }
            EnrollmentStep::Confirm => {
                self.keypad.record_rejection();
                EnrollmentProgress::Mismatch
            }
            EnrollmentStep::Done => EnrollmentProgress::Ignored,
        }
    }

    /// Discard both entries and return to the create step
    pub fn restart(&mut self) {
        self.first = Zeroizing::new(String::new());
        self.keypad.reset();
        self.step = EnrollmentStep::Create;
    }
}

impl std::fmt::Debug for PasscodeEnrollment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasscodeEnrollment")
            .field("step", &self.step)
            .field("keypad", &self.keypad)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_code(flow: &mut PasscodeEnrollment, code: &str) -> EnrollmentProgress {
        let mut last = EnrollmentProgress::Ignored;
        for d in code.chars() {
            last = flow.press_digit(d);
        }
        last
    }

    #[test]
    fn test_matching_confirmation() {
        let mut flow = PasscodeEnrollment::new(4);
        assert_eq!(type_code(&mut flow, "2580"), EnrollmentProgress::ConfirmRequired);
        assert_eq!(flow.step(), EnrollmentStep::Confirm);
        assert_eq!(flow.keypad().entered(), 0);

        match type_code(&mut flow, "2580") {
            EnrollmentProgress::Complete(code) => assert_eq!(code.as_str(), "2580"),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(flow.step(), EnrollmentStep::Done);
        assert_eq!(flow.press_digit('1'), EnrollmentProgress::Ignored);
    }

    #[test]
    fn test_mismatch_stays_on_confirm() {
        let mut flow = PasscodeEnrollment::new(4);
        type_code(&mut flow, "2580");
        assert_eq!(type_code(&mut flow, "2581"), EnrollmentProgress::Mismatch);
        assert_eq!(flow.step(), EnrollmentStep::Confirm);
        assert!(flow.keypad().has_error());

        assert!(matches!(
            type_code(&mut flow, "2580"),
            EnrollmentProgress::Complete(_)
        ));
    }

    #[test]
    fn test_restart() {
        let mut flow = PasscodeEnrollment::new(4);
        type_code(&mut flow, "1111");
        flow.restart();
        assert_eq!(flow.step(), EnrollmentStep::Create);
        assert_eq!(type_code(&mut flow, "2222"), EnrollmentProgress::ConfirmRequired);
    }
}
