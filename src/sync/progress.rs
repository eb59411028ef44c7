// src/sync/progress.rs

//! Thread-safe progress state for one device sync.
//!
//! Every mutator and the redraw take the same lock, so a redraw always sees a
//! consistent set of counters and slot strings.

use parking_lot::Mutex;
use std::io::{self, Write};
use std::time::{Duration, Instant};

use crate::ui::render::draw_progress;
use crate::ui::theme::Theme;

#[derive(Debug)]
struct ProgressState {
    files_checked: u64,
    files_downloaded: u64,
    files_deleted: u64,
    files_skipped: u64,
    bytes_completed: u64,
    bytes_in_progress: Vec<u64>,
    activity: Vec<String>,
    total_bytes_estimate: u64,
    active_slots: usize,
    started: Instant,
    last_rendered_lines: usize,
}

/// Point-in-time copy of the progress state.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressSnapshot {
    pub files_checked: u64,
    pub files_downloaded: u64,
    pub files_deleted: u64,
    pub files_skipped: u64,
    pub bytes_completed: u64,
    pub bytes_in_progress: Vec<u64>,
    /// One entry per visible slot (`active_slots` long); empty means idle.
    pub activity: Vec<String>,
    /// 0 when unknown.
    pub total_bytes_estimate: u64,
    pub elapsed: Duration,
}

impl ProgressSnapshot {
    /// Completed bytes plus whatever is in flight.
    pub fn transferred(&self) -> u64 {
        self.bytes_completed + self.bytes_in_progress.iter().sum::<u64>()
    }

    pub fn bytes_per_second(&self) -> u64 {
        let secs = self.elapsed.as_secs_f64();
        if secs <= 0.0 {
            return 0;
        }
        (self.transferred() as f64 / secs) as u64
    }

    pub fn percentage(&self) -> Option<f64> {
        if self.total_bytes_estimate == 0 {
            return None;
        }
        Some(self.transferred() as f64 / self.total_bytes_estimate as f64 * 100.0)
    }
}

pub struct SyncProgress {
    max_concurrent: usize,
    state: Mutex<ProgressState>,
}

impl SyncProgress {
    pub fn new(max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        SyncProgress {
            max_concurrent,
            state: Mutex::new(ProgressState {
                files_checked: 0,
                files_downloaded: 0,
                files_deleted: 0,
                files_skipped: 0,
                bytes_completed: 0,
                bytes_in_progress: vec![0; max_concurrent],
                activity: vec![String::new(); max_concurrent],
                total_bytes_estimate: 0,
                active_slots: 1,
                started: Instant::now(),
                last_rendered_lines: 0,
            }),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn increment_checked(&self) {
        self.state.lock().files_checked += 1;
    }

    pub fn increment_skipped(&self) {
        self.state.lock().files_skipped += 1;
    }

    pub fn increment_deleted(&self) {
        self.state.lock().files_deleted += 1;
    }

    pub fn set_total_bytes(&self, bytes: u64) {
        self.state.lock().total_bytes_estimate = bytes;
    }

    /// Number of slot rows shown: `min(max_concurrent, file_count)`, at least 1.
    pub fn set_active_slots(&self, file_count: usize) {
        self.state.lock().active_slots = file_count.clamp(1, self.max_concurrent);
    }

    /// Partial byte count and status string of a running transfer, in one
    /// step. Out-of-range slots are ignored.
    pub fn update_slot(&self, slot: usize, bytes: u64, message: String) {
        let mut state = self.state.lock();
        if slot < state.activity.len() {
            state.bytes_in_progress[slot] = bytes;
            state.activity[slot] = message;
        }
    }

    /// Move a finished transfer's bytes from the slot into the completed total
    /// so the transferred sum never dips between the two updates.
    pub fn finish_download(&self, slot: usize, bytes: u64, message: String) {
        let mut state = self.state.lock();
        state.files_downloaded += 1;
        state.bytes_completed += bytes;
        if slot < state.activity.len() {
            state.bytes_in_progress[slot] = 0;
            state.activity[slot] = message;
        }
    }

    /// Drop a failed transfer's in-flight bytes and status in one step.
    pub fn fail_slot(&self, slot: usize) {
        let mut state = self.state.lock();
        if slot < state.activity.len() {
            state.bytes_in_progress[slot] = 0;
            state.activity[slot].clear();
        }
    }

    pub fn set_activity(&self, slot: usize, message: String) {
        if let Some(a) = self.state.lock().activity.get_mut(slot) {
            *a = message;
        }
    }

    pub fn clear_activity(&self, slot: usize) {
        self.set_activity(slot, String::new());
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        Self::snapshot_locked(&self.state.lock())
    }

    fn snapshot_locked(state: &ProgressState) -> ProgressSnapshot {
        ProgressSnapshot {
            files_checked: state.files_checked,
            files_downloaded: state.files_downloaded,
            files_deleted: state.files_deleted,
            files_skipped: state.files_skipped,
            bytes_completed: state.bytes_completed,
            bytes_in_progress: state.bytes_in_progress.clone(),
            activity: state.activity[..state.active_slots.min(state.activity.len())].to_vec(),
            total_bytes_estimate: state.total_bytes_estimate,
            elapsed: state.started.elapsed(),
        }
    }

    /// Redraw the progress block in place. The lock is held for the whole
    /// redraw so workers cannot change the state half way through.
    pub fn render<W: Write>(&self, out: &mut W, theme: &Theme) -> io::Result<()> {
        let mut state = self.state.lock();
        let snapshot = Self::snapshot_locked(&state);
        let lines = draw_progress(out, &snapshot, state.last_rendered_lines, theme)?;
        state.last_rendered_lines = lines;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_counters_accumulate() {
        let progress = SyncProgress::new(2);
        progress.increment_checked();
        progress.increment_checked();
        progress.increment_skipped();
        progress.increment_deleted();
        progress.finish_download(0, 1024, String::new());

        let snap = progress.snapshot();
        assert_eq!(snap.files_checked, 2);
        assert_eq!(snap.files_skipped, 1);
        assert_eq!(snap.files_deleted, 1);
        assert_eq!(snap.files_downloaded, 1);
        assert_eq!(snap.bytes_completed, 1024);
    }

    #[test]
    fn test_transferred_includes_in_flight_bytes() {
        let progress = SyncProgress::new(3);
        progress.set_total_bytes(4000);
        progress.finish_download(1, 1000, String::new());
        progress.update_slot(0, 500, String::new());
        progress.update_slot(2, 500, String::new());

        let snap = progress.snapshot();
        assert_eq!(snap.transferred(), 2000);
        assert_eq!(snap.percentage(), Some(50.0));

        progress.fail_slot(0);
        assert_eq!(progress.snapshot().transferred(), 1500);
    }

    #[test]
    fn test_finish_download_moves_slot_bytes() {
        let progress = SyncProgress::new(2);
        progress.set_active_slots(2);
        progress.update_slot(1, 700, "↓ a.zip".to_string());
        assert_eq!(progress.snapshot().transferred(), 700);

        progress.finish_download(1, 1024, "✓ a.zip".to_string());
        let snap = progress.snapshot();
        assert_eq!(snap.files_downloaded, 1);
        assert_eq!(snap.bytes_completed, 1024);
        assert_eq!(snap.bytes_in_progress, vec![0, 0]);
        assert_eq!(snap.activity[1], "✓ a.zip");
    }

    #[test]
    fn test_fail_slot_clears_bytes_and_activity() {
        let progress = SyncProgress::new(2);
        progress.set_active_slots(2);
        progress.finish_download(0, 100, "✓ done.zip".to_string());
        progress.update_slot(1, 300, "↓ b.zip".to_string());

        progress.fail_slot(1);
        let snap = progress.snapshot();
        assert_eq!(snap.transferred(), 100);
        assert_eq!(snap.activity, vec!["✓ done.zip".to_string(), String::new()]);
        assert_eq!(snap.files_downloaded, 1);
    }

    #[test]
    fn test_unknown_total_has_no_percentage() {
        let progress = SyncProgress::new(1);
        progress.finish_download(0, 10, String::new());
        assert_eq!(progress.snapshot().percentage(), None);
    }

    #[test]
    fn test_out_of_range_slot_is_ignored() {
        let progress = SyncProgress::new(2);
        progress.update_slot(7, 99, "nope".to_string());
        progress.set_activity(7, "nope".to_string());
        let snap = progress.snapshot();
        assert_eq!(snap.transferred(), 0);
        assert!(snap.activity.iter().all(String::is_empty));
    }

    #[test]
    fn test_active_slots_bounds() {
        let progress = SyncProgress::new(4);
        progress.set_active_slots(0);
        assert_eq!(progress.snapshot().activity.len(), 1);
        progress.set_active_slots(2);
        assert_eq!(progress.snapshot().activity.len(), 2);
        progress.set_active_slots(100);
        assert_eq!(progress.snapshot().activity.len(), 4);
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let progress = SyncProgress::new(0);
        assert_eq!(progress.max_concurrent(), 1);
    }

    #[test]
    fn test_concurrent_updates_are_not_lost() {
        let progress = Arc::new(SyncProgress::new(4));
        let handles: Vec<_> = (0..4)
            .map(|slot| {
                let progress = progress.clone();
                std::thread::spawn(move || {
                    for _ in 0..250 {
                        progress.increment_checked();
                        progress.finish_download(slot, 2, String::new());
                        progress.update_slot(slot, 1, String::new());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let snap = progress.snapshot();
        assert_eq!(snap.files_checked, 1000);
        assert_eq!(snap.bytes_completed, 2000);
        assert_eq!(snap.transferred(), 2004);
    }

    #[test]
    fn test_render_tracks_line_count() -> io::Result<()> {
        let progress = SyncProgress::new(2);
        progress.set_active_slots(2);
        progress.set_activity(1, "busy".to_string());

        let mut out = Vec::new();
        progress.render(&mut out, &Theme::plain())?;
        assert_eq!(progress.state.lock().last_rendered_lines, 4);

        progress.clear_activity(1);
        progress.render(&mut out, &Theme::plain())?;
        assert_eq!(progress.state.lock().last_rendered_lines, 3);
        Ok(())
    }
}
