//! Per-control in-flight gates. Each control blocks only itself.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;
use tracing::debug;

use crate::{
    error::{ClientError, Control},
    events::SessionEvent,
};

pub(crate) struct Controls {
    start: AtomicBool,
    send: AtomicBool,
    run_code: AtomicBool,
    evaluate: AtomicBool,
    events: broadcast::Sender<SessionEvent>,
}

impl Controls {
    pub(crate) fn new(events: broadcast::Sender<SessionEvent>) -> Self {
        Self {
            start: AtomicBool::new(false),
            send: AtomicBool::new(false),
            run_code: AtomicBool::new(false),
            evaluate: AtomicBool::new(false),
            events,
        }
    }

    fn flag(&self, control: Control) -> &AtomicBool {
        match control {
            Control::Start => &self.start,
            Control::Send => &self.send,
            Control::RunCode => &self.run_code,
            Control::Evaluate => &self.evaluate,
        }
    }

    pub(crate) fn is_busy(&self, control: Control) -> bool {
        self.flag(control).load(Ordering::SeqCst)
    }

    /// Marks `control` busy until the returned guard drops, success or failure.
    pub(crate) fn acquire(&self, control: Control) -> Result<ControlGuard<'_>, ClientError> {
        let flag = self.flag(control);
        if flag
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!(%control, "control already in flight");
            return Err(ClientError::ControlBusy(control));
        }
        let _ = self.events.send(SessionEvent::ControlState {
            control,
            busy: true,
        });
        Ok(ControlGuard {
            control,
            flag,
            events: &self.events,
        })
    }
}

pub(crate) struct ControlGuard<'a> {
    control: Control,
    flag: &'a AtomicBool,
    events: &'a broadcast::Sender<SessionEvent>,
}

impl Drop for ControlGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::SeqCst);
        let _ = self.events.send(SessionEvent::ControlState {
            control: self.control,
            busy: false,
        });
    }
}
