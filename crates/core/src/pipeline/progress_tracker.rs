/// Turns frame counts into percentage milestones.
///
/// Emits `0` at the start, a value every `interval` consumed frames while
/// the total is known, and `100` at the end. Values never decrease and
/// never exceed 100, even when the decoder yields more frames than the
/// probe reported.
pub struct ProgressTracker {
    total_frames: usize,
    interval: usize,
    last: u8,
}

impl ProgressTracker {
    pub fn new(total_frames: usize, interval: usize) -> Self {
        Self {
            total_frames,
            interval: interval.max(1),
            last: 0,
        }
    }

    pub fn start(&mut self) -> u8 {
        self.last = 0;
        0
    }

    /// Percentage to report after `frames_seen` frames, if one is due.
    pub fn on_frame(&mut self, frames_seen: usize) -> Option<u8> {
        if self.total_frames == 0 || frames_seen == 0 || frames_seen % self.interval != 0 {
            return None;
        }
        let pct = (frames_seen.saturating_mul(100) / self.total_frames).min(100) as u8;
        self.last = self.last.max(pct);
        Some(self.last)
    }

    pub fn finish(&mut self) -> u8 {
        self.last = 100;
        100
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(total: usize, frames: usize) -> Vec<u8> {
        let mut tracker = ProgressTracker::new(total, 15);
        let mut out = vec![tracker.start()];
        out.extend((1..=frames).filter_map(|seen| tracker.on_frame(seen)));
        out.push(tracker.finish());
        out
    }

    #[test]
    fn test_cadence_every_fifteen_frames() {
        assert_eq!(run(150, 150), vec![0, 10, 20, 30, 40, 50, 60, 70, 80, 90, 100, 100]);
    }

    #[test]
    fn test_percentages_truncate() {
        // 15/40 = 37.5%, 30/40 = 75%
        assert_eq!(run(40, 40), vec![0, 37, 75, 100]);
    }

    #[test]
    fn test_unknown_total_emits_only_boundaries() {
        assert_eq!(run(0, 300), vec![0, 100]);
    }

    #[test]
    fn test_overrun_is_clamped_and_monotonic() {
        let values = run(20, 60);
        assert_eq!(values, vec![0, 75, 100, 100, 100, 100]);
        assert!(values.windows(2).all(|w| w[0] <= w[1]));
        assert!(values.iter().all(|v| *v <= 100));
    }
}
