use gstreamer as gst;
use std::path::PathBuf;
use std::time::Duration;

/// Tunables for a [`Player`](crate::Player) and its [`GstBackend`](crate::GstBackend).
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub(crate) poll_interval: Duration,
    pub(crate) thumbnail_interval: Duration,
    pub(crate) thumbnail_width: u32,
    pub(crate) thumbnail_path: PathBuf,
    pub(crate) video_sink: String,
    pub(crate) state_timeout: gst::ClockTime,
    pub(crate) pull_timeout: gst::ClockTime,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            poll_interval: Duration::from_millis(20),
            thumbnail_interval: Duration::from_millis(1000),
            thumbnail_width: 160,
            thumbnail_path: std::env::temp_dir().join("video-player-thumbnail.png"),
            video_sink: String::from("autovideosink"),
            state_timeout: gst::ClockTime::from_seconds(5),
            pull_timeout: gst::ClockTime::from_seconds(5),
        }
    }
}

impl Settings {
    /// How often the playback position is sampled while playing.
    pub fn poll_interval(self, poll_interval: Duration) -> Self {
        Settings {
            poll_interval,
            ..self
        }
    }

    /// Pace of thumbnail extraction, one frame per interval.
    pub fn thumbnail_interval(self, thumbnail_interval: Duration) -> Self {
        Settings {
            thumbnail_interval,
            ..self
        }
    }

    /// Width of extracted thumbnails; the height follows the source aspect ratio.
    pub fn thumbnail_width(self, thumbnail_width: u32) -> Self {
        Settings {
            thumbnail_width,
            ..self
        }
    }

    /// Where the current thumbnail is written. Overwritten on every step.
    pub fn thumbnail_path(self, thumbnail_path: impl Into<PathBuf>) -> Self {
        Settings {
            thumbnail_path: thumbnail_path.into(),
            ..self
        }
    }

    /// Factory name of the element used as `playbin`'s video sink.
    pub fn video_sink(self, video_sink: impl Into<String>) -> Self {
        Settings {
            video_sink: video_sink.into(),
            ..self
        }
    }

    /// Upper bound on how long prerolling the thumbnail pipeline may block.
    pub fn state_timeout(self, state_timeout: gst::ClockTime) -> Self {
        Settings {
            state_timeout,
            ..self
        }
    }

    /// Upper bound on how long pulling one thumbnail frame may block.
    pub fn pull_timeout(self, pull_timeout: gst::ClockTime) -> Self {
        Settings {
            pull_timeout,
            ..self
        }
    }

    pub fn thumbnail_file(&self) -> &std::path::Path {
        &self.thumbnail_path
    }
}
