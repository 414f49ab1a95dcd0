use crate::pipeline::PlaybackState;
use gstreamer as gst;

/// Tracked state of the playback pipeline.
///
/// `position` never exceeds `duration` when both are known.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    state: PlaybackState,
    duration: Option<gst::ClockTime>,
    position: Option<gst::ClockTime>,
    uri: Option<url::Url>,
}

impl Default for Session {
    fn default() -> Self {
        Session {
            state: PlaybackState::Null,
            duration: None,
            position: None,
            uri: None,
        }
    }
}

impl Session {
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn duration(&self) -> Option<gst::ClockTime> {
        self.duration
    }

    pub fn position(&self) -> Option<gst::ClockTime> {
        self.position
    }

    pub fn uri(&self) -> Option<&url::Url> {
        self.uri.as_ref()
    }

    /// Progress through the clip in `[0, 1]`; zero while the duration is unknown.
    pub fn progress(&self) -> f64 {
        match (self.position, self.duration) {
            (Some(position), Some(duration)) if duration > gst::ClockTime::ZERO => {
                (position.nseconds() as f64 / duration.nseconds() as f64).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }

    /// Re-targets the session, forgetting duration and position.
    pub(crate) fn retarget(&mut self, uri: url::Url) {
        self.uri = Some(uri);
        self.duration = None;
        self.position = None;
    }

    pub(crate) fn set_state(&mut self, state: PlaybackState) {
        self.state = state;
    }

    pub(crate) fn latch_duration(&mut self, duration: gst::ClockTime) {
        self.duration = Some(duration);
        self.position = self.position.map(|p| self.clamp(p));
    }

    pub(crate) fn set_position(&mut self, position: gst::ClockTime) -> gst::ClockTime {
        let position = self.clamp(position);
        self.position = Some(position);
        position
    }

    /// Whether playback has reached the latched duration.
    pub(crate) fn at_end(&self) -> bool {
        self.duration.is_some() && self.position == self.duration
    }

    fn clamp(&self, position: gst::ClockTime) -> gst::ClockTime {
        match self.duration {
            Some(duration) => position.min(duration),
            None => position,
        }
    }
}
