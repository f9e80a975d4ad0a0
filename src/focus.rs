//! Shared focus-tracking state (§3, §5).
//!
//! `report_focus` is written by the output thread (the Escape Scanner, on
//! seeing `CSI ? 1004 h`/`l`) and read by the input thread. `has_focus` and
//! `app_focus` are written by the input thread and read by the scanner when
//! it processes an enable sequence. All three are single bool-sized values
//! with a single steady-state writer, so plain atomics with acquire/release
//! ordering satisfy the host memory model without a lock (§5).

use std::sync::atomic::{AtomicBool, Ordering};

pub struct FocusState {
    /// Did the child enable focus-event reporting (`CSI ? 1004 h`)?
    report_focus: AtomicBool,
    /// What focus state has the child last been told about?
    app_focus: AtomicBool,
    /// Last focus state observed from the host console.
    has_focus: AtomicBool,
}

impl FocusState {
    pub fn new() -> Self {
        Self {
            report_focus: AtomicBool::new(false),
            app_focus: AtomicBool::new(true),
            has_focus: AtomicBool::new(true),
        }
    }

    pub fn report_focus(&self) -> bool {
        self.report_focus.load(Ordering::Acquire)
    }

    pub fn has_focus(&self) -> bool {
        self.has_focus.load(Ordering::Acquire)
    }

    pub fn app_focus(&self) -> bool {
        self.app_focus.load(Ordering::Acquire)
    }

    fn set_report_focus(&self, value: bool) {
        self.report_focus.store(value, Ordering::Release);
    }

    fn set_app_focus(&self, value: bool) {
        self.app_focus.store(value, Ordering::Release);
    }

    /// `CSI ? 1004 h` observed by the scanner (§4.2). Returns `true` if this
    /// was a false→true transition, meaning the control channel must be
    /// notified (byte `0x01`) and the wake event signaled.
    pub fn enable_focus_reporting(&self) -> bool {
        if self.report_focus() {
            return false;
        }
        self.set_report_focus(true);
        // Deliberate mismatch so the next synchronization emits a focus event.
        self.set_app_focus(!self.has_focus());
        true
    }

    /// `CSI ? 1004 l` observed by the scanner (§4.2). Unconditional.
    pub fn disable_focus_reporting(&self) {
        self.set_report_focus(false);
    }

    /// Host focus-change event observed by the input thread (§4.3). Returns
    /// the bytes to emit to the child's stdin, if any, and updates
    /// `has_focus`/`app_focus` accordingly.
    pub fn on_host_focus_change(&self, has_focus: bool) -> Option<&'static [u8]> {
        self.has_focus.store(has_focus, Ordering::Release);
        self.sync_if_needed()
    }

    /// Control byte `0x01`: "please resend focus state" (§4.4). Only emits
    /// when the child has asked for reporting and the app's last-known state
    /// has drifted from the host's.
    pub fn resend_if_needed(&self) -> Option<&'static [u8]> {
        if !self.report_focus() {
            return None;
        }
        self.sync_if_needed()
    }

    fn sync_if_needed(&self) -> Option<&'static [u8]> {
        if !self.report_focus() {
            return None;
        }
        let has_focus = self.has_focus();
        if has_focus == self.app_focus() {
            return None;
        }
        self.set_app_focus(has_focus);
        Some(if has_focus { b"\x1b[I" } else { b"\x1b[O" })
    }
}

impl Default for FocusState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enable_reporting_forces_a_mismatch() {
        let focus = FocusState::new();
        assert!(focus.enable_focus_reporting());
        assert_ne!(focus.has_focus(), focus.app_focus());
    }

    #[test]
    fn re_enabling_is_a_no_op() {
        let focus = FocusState::new();
        assert!(focus.enable_focus_reporting());
        assert!(!focus.enable_focus_reporting());
    }

    #[test]
    fn focus_change_emits_at_most_once_per_transition() {
        let focus = FocusState::new();
        focus.enable_focus_reporting();
        // has_focus started true, app_focus was forced to false by enable.
        let first = focus.on_host_focus_change(true);
        assert_eq!(first, Some(&b"\x1b[I"[..]));

        // No change: repeated identical event emits nothing.
        let second = focus.on_host_focus_change(true);
        assert_eq!(second, None);

        let third = focus.on_host_focus_change(false);
        assert_eq!(third, Some(&b"\x1b[O"[..]));
    }

    #[test]
    fn disabled_reporting_emits_nothing() {
        let focus = FocusState::new();
        // report_focus defaults to false.
        assert_eq!(focus.on_host_focus_change(false), None);
        assert_eq!(focus.on_host_focus_change(true), None);
    }

    #[test]
    fn resend_respects_disabled_state() {
        let focus = FocusState::new();
        assert_eq!(focus.resend_if_needed(), None);
        focus.enable_focus_reporting();
        assert!(focus.resend_if_needed().is_some());
        assert_eq!(focus.resend_if_needed(), None);
    }

    #[test]
    fn disable_then_change_emits_nothing() {
        let focus = FocusState::new();
        focus.enable_focus_reporting();
        focus.disable_focus_reporting();
        assert_eq!(focus.on_host_focus_change(false), None);
        assert_eq!(focus.on_host_focus_change(true), None);
    }
}
