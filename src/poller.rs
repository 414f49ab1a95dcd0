use crate::observer::Observers;
use crate::pipeline::PlaybackPipeline;
use crate::session::Session;
use crate::time::format_time;
use crate::timer::{Task, Tick, TimerHandle, Timers};
use std::time::Duration;

/// Samples the playback position while the session is playing.
///
/// At most one timer is armed at a time. Ticks from a handle that is no
/// longer the active one are stale and publish nothing.
#[derive(Debug)]
pub struct PositionPoller {
    interval: Duration,
    active: Option<TimerHandle>,
}

impl PositionPoller {
    pub fn new(interval: Duration) -> Self {
        PositionPoller {
            interval,
            active: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    pub(crate) fn owns(&self, handle: TimerHandle) -> bool {
        self.active == Some(handle)
    }

    /// Arms the poll timer unless it is already running. Returns whether it was armed.
    pub fn start(&mut self, timers: &mut dyn Timers) -> bool {
        if self.active.is_some() {
            return false;
        }
        self.active = Some(timers.start(Task::PositionPoll, self.interval));
        log::debug!("position poller started");
        true
    }

    pub fn cancel(&mut self, timers: &mut dyn Timers) {
        if let Some(handle) = self.active.take() {
            timers.cancel(handle);
            log::debug!("position poller cancelled");
        }
    }

    /// Runs one poll. The timer is kept only while the position is short of the duration.
    pub fn tick<P>(
        &mut self,
        handle: TimerHandle,
        pipeline: &P,
        session: &mut Session,
        observers: &mut Observers,
    ) -> Tick
    where
        P: PlaybackPipeline + ?Sized,
    {
        if !self.owns(handle) {
            return Tick::Stop;
        }

        let Some(position) = pipeline.query_position() else {
            log::trace!("position not available yet");
            return Tick::Continue;
        };

        session.set_position(position);
        if session.at_end() {
            // end-of-stream publishes the final position
            self.active = None;
            log::debug!("position reached duration, poller stopped");
            return Tick::Stop;
        }

        observers.position_changed(&format_time(session.position()), session.progress());
        Tick::Continue
    }
}
