//! Cancellable scheduled callbacks for the session state machine

use std::future::Future;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Debounced autosave after buffer inactivity
    Autosave,
    /// `saved -> idle` after the confirmation has been displayed
    ClearSaved,
}

struct Scheduled {
    generation: u64,
    handle: JoinHandle<()>,
}

/// One pending callback per `TimerKind`; scheduling replaces the previous one.
#[derive(Default)]
pub struct Timers {
    next_generation: u64,
    autosave: Option<Scheduled>,
    clear_saved: Option<Scheduled>,
}

impl Timers {
    /// Run `callback(generation)` after `delay`, replacing any pending timer of `kind`.
    ///
    /// The callback must call [`Timers::release`] with its generation before
    /// acting, so a superseded timer never fires.
    pub fn schedule<F, Fut>(&mut self, kind: TimerKind, delay: Duration, callback: F)
    where
        F: FnOnce(u64) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel(kind);

        let Ok(runtime) = Handle::try_current() else {
            tracing::warn!("No async runtime available; {:?} timer not scheduled", kind);
            return;
        };

        self.next_generation += 1;
        let generation = self.next_generation;
        let task = callback(generation);
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            task.await;
        });
        *self.slot_mut(kind) = Some(Scheduled { generation, handle });
    }

    pub fn cancel(&mut self, kind: TimerKind) {
        if let Some(scheduled) = self.slot_mut(kind).take() {
            scheduled.handle.abort();
        }
    }

    pub fn cancel_all(&mut self) {
        self.cancel(TimerKind::Autosave);
        self.cancel(TimerKind::ClearSaved);
    }

    /// Claim a fired timer. Returns `false` when it was cancelled or replaced.
    pub fn release(&mut self, kind: TimerKind, generation: u64) -> bool {
        let slot = self.slot_mut(kind);
        if slot
            .as_ref()
            .is_some_and(|scheduled| scheduled.generation == generation)
        {
            *slot = None;
            true
        } else {
            false
        }
    }

    pub fn is_pending(&self, kind: TimerKind) -> bool {
        let slot = match kind {
            TimerKind::Autosave => &self.autosave,
            TimerKind::ClearSaved => &self.clear_saved,
        };
        slot.as_ref()
            .is_some_and(|scheduled| !scheduled.handle.is_finished())
    }

    fn slot_mut(&mut self, kind: TimerKind) -> &mut Option<Scheduled> {
        match kind {
            TimerKind::Autosave => &mut self.autosave,
            TimerKind::ClearSaved => &mut self.clear_saved,
        }
    }
}

impl Drop for Timers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
