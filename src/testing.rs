//! Scriptable stand-ins for the pipelines, timers and observers.

use crate::pipeline::{Backend, FrameGrabber, PlaybackPipeline, PlaybackState, Prime, RawFrame};
use crate::timer::{Task, TimerHandle, Timers};
use crate::{Error, Observers, Player, Settings};
use gstreamer as gst;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PrimeScript {
    Ready,
    Live,
    Fail,
}

#[derive(Debug)]
pub(crate) struct Script {
    pub duration: Option<gst::ClockTime>,
    pub position: Option<gst::ClockTime>,
    pub duration_queries: usize,
    pub requested: Vec<PlaybackState>,
    pub seeks: Vec<gst::ClockTime>,
    pub reject_seeks: bool,
    pub uris: Vec<url::Url>,
    pub window_handles: Vec<usize>,
    pub fail_playback: bool,

    pub grabber_prime: PrimeScript,
    pub grabber_duration: Option<gst::ClockTime>,
    pub frames: VecDeque<Option<RawFrame>>,
    pub grabber_seeks: Vec<gst::ClockTime>,
    pub grabbers_built: usize,
    pub live_grabbers: usize,
}

impl Default for Script {
    fn default() -> Self {
        Script {
            duration: None,
            position: None,
            duration_queries: 0,
            requested: Vec::new(),
            seeks: Vec::new(),
            reject_seeks: false,
            uris: Vec::new(),
            window_handles: Vec::new(),
            fail_playback: false,
            grabber_prime: PrimeScript::Ready,
            grabber_duration: Some(gst::ClockTime::from_seconds(120)),
            frames: VecDeque::new(),
            grabber_seeks: Vec::new(),
            grabbers_built: 0,
            live_grabbers: 0,
        }
    }
}

pub(crate) type SharedScript = Rc<RefCell<Script>>;

/// A 2x2 RGB frame with rows padded to four bytes.
pub(crate) fn frame() -> RawFrame {
    RawFrame {
        data: vec![
            255, 0, 0, 0, 255, 0, 0, 0, //
            0, 0, 255, 255, 255, 255, 0, 0,
        ],
        size: Some((2, 2)),
    }
}

#[derive(Default)]
pub(crate) struct FakeBackend {
    pub script: SharedScript,
}

impl Backend for FakeBackend {
    type Playback = FakePlayback;
    type Grabber = FakeGrabber;

    fn playback(&mut self) -> Result<FakePlayback, Error> {
        if self.script.borrow().fail_playback {
            return Err(Error::Cast);
        }
        Ok(FakePlayback {
            script: Rc::clone(&self.script),
        })
    }

    fn frame_grabber(&mut self, _uri: &url::Url) -> Result<FakeGrabber, Error> {
        let mut script = self.script.borrow_mut();
        script.grabbers_built += 1;
        script.live_grabbers += 1;
        Ok(FakeGrabber {
            script: Rc::clone(&self.script),
        })
    }
}

pub(crate) struct FakePlayback {
    pub script: SharedScript,
}

impl PlaybackPipeline for FakePlayback {
    fn set_uri(&mut self, uri: &url::Url) {
        self.script.borrow_mut().uris.push(uri.clone());
    }

    fn request_state(&mut self, state: PlaybackState) -> Result<(), Error> {
        self.script.borrow_mut().requested.push(state);
        Ok(())
    }

    fn query_duration(&self) -> Option<gst::ClockTime> {
        let mut script = self.script.borrow_mut();
        script.duration_queries += 1;
        script.duration
    }

    fn query_position(&self) -> Option<gst::ClockTime> {
        self.script.borrow().position
    }

    fn seek(&mut self, target: gst::ClockTime) -> Result<(), Error> {
        let mut script = self.script.borrow_mut();
        if script.reject_seeks {
            return Err(Error::Bool(glib::bool_error!("seek rejected")));
        }
        script.seeks.push(target);
        Ok(())
    }

    unsafe fn set_window_handle(&mut self, handle: usize) {
        self.script.borrow_mut().window_handles.push(handle);
    }
}

pub(crate) struct FakeGrabber {
    pub script: SharedScript,
}

impl FrameGrabber for FakeGrabber {
    fn prime(&mut self) -> Result<Prime, Error> {
        match self.script.borrow().grabber_prime {
            PrimeScript::Ready => Ok(Prime::Ready),
            PrimeScript::Live => Ok(Prime::Live),
            PrimeScript::Fail => Err(Error::Bool(glib::bool_error!("preroll failed"))),
        }
    }

    fn query_duration(&self) -> Option<gst::ClockTime> {
        self.script.borrow().grabber_duration
    }

    fn seek(&mut self, target: gst::ClockTime) -> Result<(), Error> {
        self.script.borrow_mut().grabber_seeks.push(target);
        Ok(())
    }

    fn pull_frame(&mut self) -> Option<RawFrame> {
        self.script
            .borrow_mut()
            .frames
            .pop_front()
            .unwrap_or_else(|| Some(frame()))
    }
}

impl Drop for FakeGrabber {
    fn drop(&mut self) {
        self.script.borrow_mut().live_grabbers -= 1;
    }
}

#[derive(Debug, Default)]
pub(crate) struct TimerLog {
    next_id: u64,
    pub armed: Vec<(TimerHandle, Duration)>,
    pub cancelled: Vec<TimerHandle>,
}

impl TimerLog {
    /// Handles of `task` that were armed and never cancelled.
    pub fn running(&self, task: Task) -> Vec<TimerHandle> {
        self.armed
            .iter()
            .map(|(handle, _)| *handle)
            .filter(|handle| handle.task() == task && !self.cancelled.contains(handle))
            .collect()
    }

    pub fn last(&self, task: Task) -> Option<TimerHandle> {
        self.armed
            .iter()
            .rev()
            .map(|(handle, _)| *handle)
            .find(|handle| handle.task() == task)
    }
}

#[derive(Default)]
pub(crate) struct FakeTimers {
    pub log: Rc<RefCell<TimerLog>>,
}

impl Timers for FakeTimers {
    fn start(&mut self, task: Task, interval: Duration) -> TimerHandle {
        let mut log = self.log.borrow_mut();
        log.next_id += 1;
        let handle = TimerHandle::new(task, log.next_id);
        log.armed.push((handle, interval));
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        let mut log = self.log.borrow_mut();
        if !log.cancelled.contains(&handle) {
            log.cancelled.push(handle);
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Published {
    pub durations: Vec<String>,
    pub positions: Vec<(String, f64)>,
    pub thumbnails: Vec<PathBuf>,
    pub errors: Vec<String>,
}

pub(crate) fn recording_observers() -> (Observers, Rc<RefCell<Published>>) {
    let published = Rc::new(RefCell::new(Published::default()));

    let durations = Rc::clone(&published);
    let positions = Rc::clone(&published);
    let thumbnails = Rc::clone(&published);
    let errors = Rc::clone(&published);

    let observers = Observers::new()
        .on_duration_changed(move |d| durations.borrow_mut().durations.push(d.to_owned()))
        .on_position_changed(move |p, f| positions.borrow_mut().positions.push((p.to_owned(), f)))
        .on_thumbnail_ready(move |path| thumbnails.borrow_mut().thumbnails.push(path.to_owned()))
        .on_playback_error(move |e| errors.borrow_mut().errors.push(e.to_owned()));

    (observers, published)
}

pub(crate) struct Harness {
    pub player: Player<FakeBackend>,
    pub script: SharedScript,
    pub timers: Rc<RefCell<TimerLog>>,
    pub published: Rc<RefCell<Published>>,
    pub dir: tempfile::TempDir,
}

/// A player over fake pipelines, writing thumbnails into a temp dir.
pub(crate) fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let backend = FakeBackend::default();
    let script = Rc::clone(&backend.script);
    let timers = FakeTimers::default();
    let log = Rc::clone(&timers.log);
    let (observers, published) = recording_observers();
    let settings = Settings::default().thumbnail_path(dir.path().join("thumb.png"));

    Harness {
        player: Player::new(backend, Box::new(timers), observers, settings).unwrap(),
        script,
        timers: log,
        published,
        dir,
    }
}

pub(crate) fn clip() -> url::Url {
    url::Url::parse("file:///videos/clip.mp4").unwrap()
}
