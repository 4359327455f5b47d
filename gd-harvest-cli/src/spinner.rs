//! Spinner lines for a running harvest.
//!
//! One slot per session: discovery shows the day each session is listing,
//! fetch shows the game each worker is on. A status line underneath keeps
//! the running totals.

use std::collections::HashMap;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

const TICK: Duration = Duration::from_millis(100);

/// A pool of reusable spinner slots keyed by session / worker index.
pub(crate) struct SpinnerPool {
    _mp: MultiProgress,
    spinners: Vec<ProgressBar>,
    status: ProgressBar,
    slot_assignments: HashMap<usize, usize>,
    free_slots: Vec<usize>,
}

impl SpinnerPool {
    /// Create a pool with `n` slots. When `quiet` is true nothing is drawn.
    pub(crate) fn new(n: usize, quiet: bool) -> Self {
        let mp = if quiet {
            MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
        } else {
            MultiProgress::new()
        };

        let spinner_style = ProgressStyle::with_template("  {spinner:.cyan} {msg}")
            .expect("static pattern")
            .tick_chars("/-\\|");

        let spinners = (0..n)
            .map(|_| {
                let pb = mp.add(ProgressBar::new_spinner());
                pb.set_style(spinner_style.clone());
                pb
            })
            .collect();

        let status = mp.add(ProgressBar::new_spinner());
        status.set_style(
            ProgressStyle::with_template("  {elapsed_precise} {msg}").expect("static pattern"),
        );
        status.enable_steady_tick(Duration::from_secs(1));

        Self {
            _mp: mp,
            spinners,
            status,
            slot_assignments: HashMap::new(),
            free_slots: (0..n).rev().collect(),
        }
    }

    /// Claim a slot for `key`, or retarget the slot it already holds.
    pub(crate) fn claim(&mut self, key: usize, msg: String) {
        if let Some(&slot) = self.slot_assignments.get(&key) {
            self.spinners[slot].set_message(msg);
            return;
        }
        if let Some(slot) = self.free_slots.pop() {
            self.spinners[slot].reset();
            self.spinners[slot].enable_steady_tick(TICK);
            self.spinners[slot].set_message(msg);
            self.slot_assignments.insert(key, slot);
        }
    }

    /// Release a slot: stop ticking, clear the line, return it to the pool.
    pub(crate) fn release(&mut self, key: usize) {
        if let Some(slot) = self.slot_assignments.remove(&key) {
            self.spinners[slot].disable_steady_tick();
            self.spinners[slot].set_message("");
            self.spinners[slot].finish_and_clear();
            self.free_slots.push(slot);
        }
    }

    /// Replace the totals line.
    pub(crate) fn set_status(&self, msg: String) {
        self.status.set_message(msg);
    }

    /// Clear every line and reset slot tracking.
    pub(crate) fn clear_all(&mut self) {
        for spinner in &self.spinners {
            spinner.disable_steady_tick();
            spinner.set_message("");
            spinner.finish_and_clear();
        }
        self.status.finish_and_clear();
        self.slot_assignments.clear();
        self.free_slots = (0..self.spinners.len()).rev().collect();
    }
}
