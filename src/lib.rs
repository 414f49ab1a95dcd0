//! Playback and thumbnail coordination engine for a GStreamer video player.
//!
//! [`Player`] drives one `playbin` pipeline for on-screen playback and, after
//! every [`Player::open_file`], a second independent pipeline that samples
//! [`THUMBNAIL_COUNT`] still frames across the clip. Results are published
//! through [`Observers`]. [`MainLoopPlayer`] wires everything to a glib main
//! loop; [`Player`] itself only needs a [`Backend`] and a [`Timers`]
//! implementation, so it can be driven by any single-threaded event loop.

mod config;
mod gst_backend;
mod main_loop;
mod observer;
mod pipeline;
mod player;
mod poller;
mod router;
mod session;
mod thumbnail;
mod time;
mod timer;

#[cfg(test)]
mod testing;

use gstreamer as gst;
use thiserror::Error;

pub use config::Settings;
pub use gst_backend::{GstBackend, GstFrameGrabber, GstPlayback};
pub use main_loop::MainLoopPlayer;
pub use observer::Observers;
pub use pipeline::{
    Backend, FrameGrabber, Origin, PlaybackEvent, PlaybackPipeline, PlaybackState, Prime,
    RawFrame,
};
pub use player::{Player, Snapshot};
pub use poller::PositionPoller;
pub use session::Session;
pub use thumbnail::{sample_offset, write_thumbnail, ThumbnailJob, THUMBNAIL_COUNT};
pub use time::format_time;
pub use timer::{Dispatcher, MainLoopTimers, Task, Tick, TimerHandle, Timers};

#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    Glib(#[from] glib::Error),
    #[error("{0}")]
    Bool(#[from] glib::BoolError),
    #[error("failed to get the gstreamer bus")]
    Bus,
    #[error("{0}")]
    StateChange(#[from] gst::StateChangeError),
    #[error("timed out waiting for the pipeline to preroll")]
    Timeout,
    #[error("failed to cast gstreamer element")]
    Cast,
    #[error("{0}")]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Image(#[from] image::ImageError),
    #[error("failed to query media duration")]
    Duration,
    #[error("live sources cannot be sampled for thumbnails")]
    LiveSource,
    #[error("frame buffer holds {actual} bytes, {expected} expected")]
    FrameSize { expected: usize, actual: usize },
    #[error("seek fraction {0} is outside [0, 1]")]
    InvalidFraction(f64),
    #[error("the player has been shut down")]
    ShutDown,
}
