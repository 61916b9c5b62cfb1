//! Virtual timers for the single-threaded game loop.
//!
//! The browser calls `draw_web()` once per frame. Instead of ambient
//! `setTimeout`/`setInterval` callbacks, every component registers a `Task`
//! here and holds on to the returned token. The engine pumps `pop_due(now)`
//! each frame and dispatches whatever is due, so tests can drive the whole
//! game by moving a fake clock.

use crate::effects::EffectKind;

/// Work the engine performs when a timer fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Task {
    ProductionTick,
    SpawnTarget,
    DespawnSweep,
    EffectRoll,
    EffectExpiry(EffectKind),
    AutoNetHaul,
    Autosave,
}

/// Handle for cancelling a scheduled timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerToken(u64);

#[derive(Clone, Debug)]
struct Timer {
    token: TimerToken,
    due_at: f64,
    period: Option<f64>,
    task: Task,
}

/// One-shot and repeating timers in virtual time.
#[derive(Debug, Default)]
pub struct Scheduler {
    timers: Vec<Timer>,
    next_token: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, due_at: f64, period: Option<f64>, task: Task) -> TimerToken {
        self.next_token += 1;
        let token = TimerToken(self.next_token);
        self.timers.push(Timer {
            token,
            due_at,
            period,
            task,
        });
        token
    }

    /// Fire `task` once, `delay_ms` after `now`.
    pub fn after(&mut self, now: f64, delay_ms: f64, task: Task) -> TimerToken {
        self.insert(now + delay_ms.max(0.0), None, task)
    }

    /// Fire `task` every `period_ms`, first one period after `now`.
    pub fn every(&mut self, now: f64, period_ms: f64, task: Task) -> TimerToken {
        let period = period_ms.max(1.0);
        self.insert(now + period, Some(period), task)
    }

    /// Returns false if the token already fired (one-shot) or was cancelled.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        let before = self.timers.len();
        self.timers.retain(|t| t.token != token);
        self.timers.len() != before
    }

    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    #[cfg(test)]
    pub fn is_pending(&self, token: TimerToken) -> bool {
        self.timers.iter().any(|t| t.token == token)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.timers.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.timers.is_empty()
    }

    /// Earliest due time among pending timers.
    #[cfg(test)]
    pub fn next_due(&self) -> Option<f64> {
        self.timers.iter().map(|t| t.due_at).min_by(f64::total_cmp)
    }

    /// Take the earliest timer due at or before `now`. Ties go to the timer
    /// scheduled first.
    ///
    /// A repeating timer is re-armed one period later; if that is still in
    /// the past (the tab was asleep) the missed firings are dropped and it
    /// resumes one period after `now`.
    pub fn pop_due(&mut self, now: f64) -> Option<(TimerToken, Task)> {
        let idx = self
            .timers
            .iter()
            .enumerate()
            .filter(|(_, t)| t.due_at <= now)
            .min_by(|(_, a), (_, b)| {
                a.due_at
                    .total_cmp(&b.due_at)
                    .then(a.token.0.cmp(&b.token.0))
            })
            .map(|(i, _)| i)?;

        let timer = &mut self.timers[idx];
        let fired = (timer.token, timer.task);
        match timer.period {
            Some(period) => {
                let next = timer.due_at + period;
                timer.due_at = if next <= now { now + period } else { next };
            }
            None => {
                self.timers.remove(idx);
            }
        }
        Some(fired)
    }
}
