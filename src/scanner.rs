//! Escape Scanner: a byte-at-a-time state machine over the PTY output stream
//! that intercepts `CSI 6 n` and `CSI ? 1004 {h,l}` and passes everything
//! else through untouched (§4.2).
//!
//! Pure and portable: no Win32 calls, driven entirely by `feed`. The caller
//! (the output pipeline) is responsible for acting on the returned events —
//! flushing the Sink Writer, notifying the control channel, forwarding
//! pass-through bytes.

use crate::focus::FocusState;

/// Escape bytes accumulate here; a sequence longer than this aborts and is
/// flushed verbatim (§3, §4.2).
const ACCUMULATOR_CAPACITY: usize = 128;

/// Only the first five CSI parameters are retained; the rest are parsed (to
/// keep the scanner synchronized) but discarded (§4.2).
const MAX_PARAMS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    AfterEsc,
    InCsi,
    InCsiPrivate,
}

/// One outcome of feeding bytes to the scanner. A single `feed` call can
/// produce zero or more, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannerEvent {
    /// Bytes to hand to the Sink Writer verbatim: pass-through text, a
    /// forwarded `?1004h`/`?1004l` sequence, or a malformed/aborted/overflowed
    /// accumulation being flushed.
    Forward(Vec<u8>),
    /// `CSI 6 n` recognized and consumed. The caller must flush the Sink
    /// Writer, then write `0x02` to the control channel and signal the wake
    /// event (§4.2).
    CursorPositionRequest,
    /// `CSI ? 1004 h` recognized and consumed; this was a false→true
    /// transition. The caller must write `0x01` to the control channel and
    /// signal the wake event, in addition to forwarding the sequence.
    FocusReportingEnabled,
}

/// The Escape Scanner (§3, §4.2).
pub struct EscapeScanner {
    state: State,
    accumulator: Vec<u8>,
    params: [i64; MAX_PARAMS],
    param_count: usize,
    current_param: i64,
    current_has_digits: bool,
    private: bool,
}

impl EscapeScanner {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            accumulator: Vec::with_capacity(ACCUMULATOR_CAPACITY),
            params: [0; MAX_PARAMS],
            param_count: 0,
            current_param: 0,
            current_has_digits: false,
            private: false,
        }
    }

    /// Process one chunk of bytes read from the PTY, e.g. the result of a
    /// single `read()` call. Returns the events produced, in the order they
    /// occurred within the chunk.
    ///
    /// Pass-through bytes seen before the first `ESC` (or after the last
    /// completed/aborted sequence) are coalesced into a single `Forward`
    /// event per call (§4.2's pass-through rule), rather than one per byte.
    pub fn feed(&mut self, bytes: &[u8], focus: &FocusState) -> Vec<ScannerEvent> {
        let mut events = Vec::new();
        let mut pending = Vec::new();

        for &byte in bytes {
            if self.state == State::Idle {
                if byte == 0x1b {
                    if !pending.is_empty() {
                        events.push(ScannerEvent::Forward(std::mem::take(&mut pending)));
                    }
                    self.start_escape();
                } else {
                    pending.push(byte);
                }
                continue;
            }

            events.append(&mut self.feed_escape_byte(byte, focus));
        }

        if !pending.is_empty() {
            events.push(ScannerEvent::Forward(pending));
        }

        events
    }

    fn start_escape(&mut self) {
        self.state = State::AfterEsc;
        self.accumulator.clear();
        self.accumulator.push(0x1b);
        self.param_count = 0;
        self.current_param = 0;
        self.current_has_digits = false;
        self.private = false;
    }

    fn feed_escape_byte(&mut self, byte: u8, focus: &FocusState) -> Vec<ScannerEvent> {
        if self.accumulator.len() >= ACCUMULATOR_CAPACITY {
            self.accumulator.push(byte);
            return vec![self.abort()];
        }
        self.accumulator.push(byte);

        match self.state {
            State::Idle => unreachable!("idle bytes are handled in feed()"),
            State::AfterEsc => {
                if byte == b'[' {
                    self.state = State::InCsi;
                    Vec::new()
                } else {
                    vec![self.abort()]
                }
            }
            State::InCsi | State::InCsiPrivate => self.feed_csi_byte(byte, focus),
        }
    }

    fn feed_csi_byte(&mut self, byte: u8, focus: &FocusState) -> Vec<ScannerEvent> {
        match byte {
            b'?' if self.state == State::InCsi
                && self.param_count == 0
                && self.current_param == 0
                && !self.current_has_digits =>
            {
                self.state = State::InCsiPrivate;
                self.private = true;
                Vec::new()
            }
            b'0'..=b'9' => {
                let digit = (byte - b'0') as i64;
                self.current_param = self.current_param.saturating_mul(10).saturating_add(digit);
                self.current_has_digits = true;
                Vec::new()
            }
            b';' => {
                self.push_current_param();
                Vec::new()
            }
            0x40..=0x7e => self.finish_sequence(byte, focus),
            _ => vec![self.abort()],
        }
    }

    fn push_current_param(&mut self) {
        if self.param_count < MAX_PARAMS {
            self.params[self.param_count] = self.current_param;
        }
        self.param_count += 1;
        self.current_param = 0;
        self.current_has_digits = false;
    }

    fn finish_sequence(&mut self, terminator: u8, focus: &FocusState) -> Vec<ScannerEvent> {
        self.push_current_param();
        let first_param = self.params[0];
        let single_param = self.param_count == 1;

        let events = if !self.private && terminator == b'n' && single_param && first_param == 6 {
            vec![ScannerEvent::CursorPositionRequest]
        } else if self.private && single_param && first_param == 1004 && terminator == b'h' {
            // Forwarded regardless of transition (§4.2); the notification is
            // only added when this is the false→true edge.
            let mut out = vec![ScannerEvent::Forward(std::mem::take(&mut self.accumulator))];
            if focus.enable_focus_reporting() {
                out.push(ScannerEvent::FocusReportingEnabled);
            }
            out
        } else if self.private && single_param && first_param == 1004 && terminator == b'l' {
            focus.disable_focus_reporting();
            vec![ScannerEvent::Forward(std::mem::take(&mut self.accumulator))]
        } else {
            vec![ScannerEvent::Forward(std::mem::take(&mut self.accumulator))]
        };

        self.reset();
        events
    }

    fn abort(&mut self) -> ScannerEvent {
        let bytes = std::mem::take(&mut self.accumulator);
        self.reset();
        ScannerEvent::Forward(bytes)
    }

    fn reset(&mut self) {
        self.state = State::Idle;
        self.accumulator.clear();
        self.param_count = 0;
        self.current_param = 0;
        self.current_has_digits = false;
        self.private = false;
    }
}

impl Default for EscapeScanner {
    fn default() -> Self {
        Self::new()
    }
}
