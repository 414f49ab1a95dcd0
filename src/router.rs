use crate::pipeline::{Backend, Origin, PlaybackEvent, PlaybackPipeline, PlaybackState};
use crate::player::Player;
use crate::time::format_time;

impl<B: Backend> Player<B> {
    /// Applies one notification from the playback pipeline's bus.
    pub fn handle_event(&mut self, event: PlaybackEvent) {
        match event {
            PlaybackEvent::Error {
                source,
                message,
                debug,
            } => {
                log::error!("error received from element {source}: {message}");
                log::error!("debugging information: {}", debug.as_deref().unwrap_or("none"));

                self.poller.cancel(&mut *self.timers);
                self.request(PlaybackState::Ready);
                self.observers.playback_error(&message);
            }
            PlaybackEvent::EndOfStream => {
                log::info!("end-of-stream reached");

                self.poller.cancel(&mut *self.timers);
                self.request(PlaybackState::Ready);
                if let Some(duration) = self.session.duration() {
                    self.session.set_position(duration);
                }
                self.observers.position_changed(
                    &format_time(self.session.position()),
                    self.session.progress(),
                );
            }
            PlaybackEvent::StateChanged { origin, old, new } => {
                if origin != Origin::Pipeline {
                    return;
                }
                log::debug!("state set to {new:?} (from {old:?})");
                self.session.set_state(new);

                if new == PlaybackState::Playing {
                    self.latch_duration();
                    self.poller.start(&mut *self.timers);
                } else {
                    self.poller.cancel(&mut *self.timers);
                }
            }
        }
    }

    /// Queries the duration once per loaded source.
    fn latch_duration(&mut self) {
        if self.session.duration().is_some() {
            return;
        }
        match self.playback.query_duration() {
            Some(duration) => {
                self.session.latch_duration(duration);
                self.observers
                    .duration_changed(&format_time(Some(duration)));
            }
            None => log::warn!("could not query the stream duration"),
        }
    }
}
