use crate::Error;
use gstreamer as gst;

/// Coarse lifecycle state of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlaybackState {
    Null,
    Ready,
    Paused,
    Playing,
}

/// Which object posted a bus message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// The playback pipeline itself.
    Pipeline,
    /// Some element inside the pipeline, by name.
    Element(String),
}

/// Asynchronous notification from the playback pipeline's bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Error {
        source: String,
        message: String,
        debug: Option<String>,
    },
    EndOfStream,
    StateChanged {
        origin: Origin,
        old: PlaybackState,
        new: PlaybackState,
    },
}

/// The long-lived pipeline that renders the loaded media.
///
/// State changes are requests; the confirmed state arrives later as a
/// [`PlaybackEvent::StateChanged`].
pub trait PlaybackPipeline {
    fn set_uri(&mut self, uri: &url::Url);

    fn request_state(&mut self, state: PlaybackState) -> Result<(), Error>;

    fn query_duration(&self) -> Option<gst::ClockTime>;

    fn query_position(&self) -> Option<gst::ClockTime>;

    /// Keyframe-aligned flushing seek.
    fn seek(&mut self, target: gst::ClockTime) -> Result<(), Error>;

    /// Hands a native window handle to the video sink.
    ///
    /// # Safety
    ///
    /// `handle` must identify a live native window that outlives the
    /// pipeline's use of it.
    unsafe fn set_window_handle(&mut self, handle: usize);
}

/// Outcome of prerolling a frame grabber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prime {
    /// One frame is decodable and the source is seekable.
    Ready,
    /// The source is live and cannot be prerolled or seeked.
    Live,
}

/// One decoded frame in packed RGB.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub data: Vec<u8>,
    /// `(width, height)` read from the sample's caps, if present.
    pub size: Option<(u32, u32)>,
}

/// An independent decode pipeline producing raw thumbnail frames.
///
/// Dropping a grabber releases every resource it holds.
pub trait FrameGrabber {
    /// Advances just far enough to have one frame decodable.
    fn prime(&mut self) -> Result<Prime, Error>;

    fn query_duration(&self) -> Option<gst::ClockTime>;

    /// Keyframe-aligned flushing seek.
    fn seek(&mut self, target: gst::ClockTime) -> Result<(), Error>;

    /// Blocks until one frame is decoded at the current position.
    fn pull_frame(&mut self) -> Option<RawFrame>;
}

/// Factory for the two pipelines a [`Player`](crate::Player) drives.
pub trait Backend {
    type Playback: PlaybackPipeline;
    type Grabber: FrameGrabber;

    /// Builds the playback pipeline. Called once, at startup.
    fn playback(&mut self) -> Result<Self::Playback, Error>;

    /// Builds a fresh frame grabber for `uri`.
    fn frame_grabber(&mut self, uri: &url::Url) -> Result<Self::Grabber, Error>;
}
