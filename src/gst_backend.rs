use crate::config::Settings;
use crate::pipeline::{
    Backend, FrameGrabber, Origin, PlaybackEvent, PlaybackPipeline, PlaybackState, Prime,
    RawFrame,
};
use crate::Error;
use gstreamer as gst;
use gstreamer_app as gst_app;
use gstreamer_app::prelude::*;
use gstreamer_video as gst_video;
use gstreamer_video::prelude::*;

impl From<PlaybackState> for gst::State {
    fn from(state: PlaybackState) -> Self {
        match state {
            PlaybackState::Null => gst::State::Null,
            PlaybackState::Ready => gst::State::Ready,
            PlaybackState::Paused => gst::State::Paused,
            PlaybackState::Playing => gst::State::Playing,
        }
    }
}

fn playback_state(state: gst::State) -> Option<PlaybackState> {
    match state {
        gst::State::Null => Some(PlaybackState::Null),
        gst::State::Ready => Some(PlaybackState::Ready),
        gst::State::Paused => Some(PlaybackState::Paused),
        gst::State::Playing => Some(PlaybackState::Playing),
        _ => None,
    }
}

/// Builds `playbin` for playback and `uridecodebin ! appsink` pipelines for thumbnails.
#[derive(Debug, Clone)]
pub struct GstBackend {
    video_sink: String,
    thumbnail_width: u32,
    state_timeout: gst::ClockTime,
    pull_timeout: gst::ClockTime,
}

impl GstBackend {
    /// Initializes GStreamer.
    pub fn new(settings: &Settings) -> Result<Self, Error> {
        gst::init()?;
        Ok(GstBackend {
            video_sink: settings.video_sink.clone(),
            thumbnail_width: settings.thumbnail_width,
            state_timeout: settings.state_timeout,
            pull_timeout: settings.pull_timeout,
        })
    }
}

impl Backend for GstBackend {
    type Playback = GstPlayback;
    type Grabber = GstFrameGrabber;

    fn playback(&mut self) -> Result<GstPlayback, Error> {
        GstPlayback::new(&self.video_sink)
    }

    fn frame_grabber(&mut self, uri: &url::Url) -> Result<GstFrameGrabber, Error> {
        GstFrameGrabber::new(uri, self.thumbnail_width, self.state_timeout, self.pull_timeout)
    }
}

/// The `playbin` that renders into the application's window.
pub struct GstPlayback {
    pipeline: gst::Pipeline,
}

impl GstPlayback {
    /// Creates `playbin` with an instance of the `video_sink` factory as its video sink.
    pub fn new(video_sink: &str) -> Result<Self, Error> {
        gst::init()?;

        let playbin = gst::ElementFactory::make("playbin")
            .name("playbin")
            .build()?;
        let sink = gst::ElementFactory::make(video_sink)
            .name("videosink")
            .build()?;
        playbin.set_property("video-sink", &sink);

        let pipeline = playbin
            .downcast::<gst::Pipeline>()
            .map_err(|_| Error::Cast)?;

        Ok(GstPlayback { pipeline })
    }

    /// Get the underlying GStreamer pipeline.
    pub fn pipeline(&self) -> gst::Pipeline {
        self.pipeline.clone()
    }

    pub fn bus(&self) -> Result<gst::Bus, Error> {
        self.pipeline.bus().ok_or(Error::Bus)
    }

    /// Translates a bus message into a [`PlaybackEvent`], if it is one the
    /// player cares about.
    pub fn playback_event(&self, msg: &gst::Message) -> Option<PlaybackEvent> {
        match msg.view() {
            gst::MessageView::Error(err) => Some(PlaybackEvent::Error {
                source: msg
                    .src()
                    .map(|src| src.name().to_string())
                    .unwrap_or_default(),
                message: err.error().to_string(),
                debug: err.debug().map(|debug| debug.to_string()),
            }),
            gst::MessageView::Eos(_) => Some(PlaybackEvent::EndOfStream),
            gst::MessageView::StateChanged(change) => {
                let origin = match msg.src() {
                    Some(src) if src == self.pipeline.upcast_ref::<gst::Object>() => {
                        Origin::Pipeline
                    }
                    Some(src) => Origin::Element(src.name().to_string()),
                    None => Origin::Element(String::new()),
                };
                Some(PlaybackEvent::StateChanged {
                    origin,
                    old: playback_state(change.old())?,
                    new: playback_state(change.current())?,
                })
            }
            _ => None,
        }
    }
}

impl PlaybackPipeline for GstPlayback {
    fn set_uri(&mut self, uri: &url::Url) {
        self.pipeline.set_property("uri", uri.as_str());
    }

    fn request_state(&mut self, state: PlaybackState) -> Result<(), Error> {
        self.pipeline.set_state(state.into())?;
        Ok(())
    }

    fn query_duration(&self) -> Option<gst::ClockTime> {
        self.pipeline.query_duration::<gst::ClockTime>()
    }

    fn query_position(&self) -> Option<gst::ClockTime> {
        self.pipeline.query_position::<gst::ClockTime>()
    }

    fn seek(&mut self, target: gst::ClockTime) -> Result<(), Error> {
        self.pipeline
            .seek_simple(gst::SeekFlags::FLUSH | gst::SeekFlags::KEY_UNIT, target)?;
        Ok(())
    }

    unsafe fn set_window_handle(&mut self, handle: usize) {
        match self.pipeline.dynamic_cast_ref::<gst_video::VideoOverlay>() {
            Some(overlay) => overlay.set_window_handle(handle),
            None => log::error!("playbin does not implement the video overlay interface"),
        }
    }
}

impl Drop for GstPlayback {
    fn drop(&mut self) {
        if let Err(err) = self.pipeline.set_state(gst::State::Null) {
            log::error!("failed to release playback pipeline: {err}");
        }
    }
}

/// A paused decode pipeline whose appsink yields packed RGB frames of a fixed width.
pub struct GstFrameGrabber {
    pipeline: gst::Pipeline,
    sink: gst_app::AppSink,
    state_timeout: gst::ClockTime,
    pull_timeout: gst::ClockTime,
}

impl GstFrameGrabber {
    pub fn new(
        uri: &url::Url,
        width: u32,
        state_timeout: gst::ClockTime,
        pull_timeout: gst::ClockTime,
    ) -> Result<Self, Error> {
        gst::init()?;

        // height is left to videoscale so the aspect ratio is kept
        let pipeline = format!("uridecodebin uri=\"{}\" ! videoconvert ! videoscale ! appsink name=thumbnail_sink sync=false caps=\"video/x-raw,format=RGB,width={},pixel-aspect-ratio=1/1\"", uri.as_str(), width);
        let pipeline = gst::parse::launch(pipeline.as_ref())?
            .downcast::<gst::Pipeline>()
            .map_err(|_| Error::Cast)?;

        let sink = pipeline
            .by_name("thumbnail_sink")
            .ok_or(Error::Cast)?
            .downcast::<gst_app::AppSink>()
            .map_err(|_| Error::Cast)?;

        Ok(GstFrameGrabber {
            pipeline,
            sink,
            state_timeout,
            pull_timeout,
        })
    }

    fn seekable(&self) -> bool {
        let mut query = gst::query::Seeking::new(gst::Format::Time);
        if !self.pipeline.query(&mut query) {
            // unanswered: assume seekable
            return true;
        }
        let (seekable, _, _) = query.result();
        seekable
    }
}

impl FrameGrabber for GstFrameGrabber {
    fn prime(&mut self) -> Result<Prime, Error> {
        if self.pipeline.set_state(gst::State::Paused)? == gst::StateChangeSuccess::NoPreroll {
            return Ok(Prime::Live);
        }

        // wait until the first frame is prerolled
        match self.pipeline.state(self.state_timeout).0? {
            gst::StateChangeSuccess::Success => {}
            gst::StateChangeSuccess::NoPreroll => return Ok(Prime::Live),
            gst::StateChangeSuccess::Async => return Err(Error::Timeout),
        }

        Ok(if self.seekable() {
            Prime::Ready
        } else {
            Prime::Live
        })
    }

    fn query_duration(&self) -> Option<gst::ClockTime> {
        self.pipeline.query_duration::<gst::ClockTime>()
    }

    fn seek(&mut self, target: gst::ClockTime) -> Result<(), Error> {
        self.pipeline
            .seek_simple(gst::SeekFlags::FLUSH | gst::SeekFlags::KEY_UNIT, target)?;
        Ok(())
    }

    fn pull_frame(&mut self) -> Option<RawFrame> {
        // a flushing seek in PAUSED prerolls exactly one new frame
        let sample = self.sink.try_pull_preroll(self.pull_timeout)?;

        let size = sample.caps().and_then(|caps| {
            let s = caps.structure(0)?;
            let width = s.get::<i32>("width").ok()?;
            let height = s.get::<i32>("height").ok()?;
            Some((u32::try_from(width).ok()?, u32::try_from(height).ok()?))
        });

        let buffer = sample.buffer()?;
        let map = buffer.map_readable().ok()?;

        Some(RawFrame {
            data: map.as_slice().to_vec(),
            size,
        })
    }
}

impl Drop for GstFrameGrabber {
    fn drop(&mut self) {
        if let Err(err) = self.pipeline.set_state(gst::State::Null) {
            log::error!("failed to release thumbnail pipeline: {err}");
        }
    }
}
