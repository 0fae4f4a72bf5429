use std::fmt;

/// Mutable bookkeeping of the pipeline loop.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunState {
    pub frames_seen: usize,
    pub frames_analyzed: usize,
    /// Set by a cancellation request; checked before the next frame is read.
    pub should_stop: bool,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&mut self) {
        self.should_stop = true;
    }
}

/// Why the frame loop ended without an error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Exhausted,
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted => f.write_str("stream exhausted"),
            Self::Cancelled => f.write_str("cancelled by user"),
        }
    }
}
