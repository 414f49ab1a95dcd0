use std::path::Path;

/// Outbound refresh callbacks, one slot per refresh kind.
///
/// Every refresh carries the full current value, so receiving one twice is
/// harmless. Callbacks run on the event loop thread while the player is busy
/// and must not call back into it.
#[derive(Default)]
pub struct Observers {
    on_duration_changed: Option<Box<dyn FnMut(&str)>>,
    on_position_changed: Option<Box<dyn FnMut(&str, f64)>>,
    on_thumbnail_ready: Option<Box<dyn FnMut(&Path)>>,
    on_playback_error: Option<Box<dyn FnMut(&str)>>,
}

impl Observers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with the formatted duration once it is known, and with the
    /// unknown time after a new file is opened.
    pub fn on_duration_changed<F>(self, on_duration_changed: F) -> Self
    where
        F: FnMut(&str) + 'static,
    {
        Observers {
            on_duration_changed: Some(Box::new(on_duration_changed)),
            ..self
        }
    }

    /// Called with the formatted position and the progress fraction in `[0, 1]`.
    pub fn on_position_changed<F>(self, on_position_changed: F) -> Self
    where
        F: FnMut(&str, f64) + 'static,
    {
        Observers {
            on_position_changed: Some(Box::new(on_position_changed)),
            ..self
        }
    }

    /// Called with the thumbnail image path after each successful step.
    pub fn on_thumbnail_ready<F>(self, on_thumbnail_ready: F) -> Self
    where
        F: FnMut(&Path) + 'static,
    {
        Observers {
            on_thumbnail_ready: Some(Box::new(on_thumbnail_ready)),
            ..self
        }
    }

    pub fn on_playback_error<F>(self, on_playback_error: F) -> Self
    where
        F: FnMut(&str) + 'static,
    {
        Observers {
            on_playback_error: Some(Box::new(on_playback_error)),
            ..self
        }
    }

    pub(crate) fn duration_changed(&mut self, duration: &str) {
        if let Some(ref mut f) = self.on_duration_changed {
            f(duration);
        }
    }

    pub(crate) fn position_changed(&mut self, position: &str, progress: f64) {
        if let Some(ref mut f) = self.on_position_changed {
            f(position, progress);
        }
    }

    pub(crate) fn thumbnail_ready(&mut self, path: &Path) {
        if let Some(ref mut f) = self.on_thumbnail_ready {
            f(path);
        }
    }

    pub(crate) fn playback_error(&mut self, message: &str) {
        if let Some(ref mut f) = self.on_playback_error {
            f(message);
        }
    }
}
