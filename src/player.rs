use crate::config::Settings;
use crate::observer::Observers;
use crate::pipeline::{Backend, PlaybackPipeline, PlaybackState};
use crate::poller::PositionPoller;
use crate::session::Session;
use crate::thumbnail::ThumbnailJob;
use crate::time::format_time;
use crate::timer::{Task, Tick, TimerHandle, Timers};
use crate::Error;
use gstreamer as gst;

/// Read-only view of the playback session.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub state: PlaybackState,
    pub duration: Option<gst::ClockTime>,
    pub position: Option<gst::ClockTime>,
    pub uri: Option<url::Url>,
    /// Next step of the running thumbnail job, if one is running.
    pub thumbnail_step: Option<u32>,
}

/// Owns the playback pipeline and coordinates polling and thumbnail extraction.
///
/// Transport calls are requests; the tracked state only moves when the
/// pipeline confirms it through [`Player::handle_event`].
pub struct Player<B: Backend> {
    pub(crate) backend: B,
    pub(crate) playback: B::Playback,
    pub(crate) timers: Box<dyn Timers>,
    pub(crate) observers: Observers,
    pub(crate) settings: Settings,
    pub(crate) session: Session,
    pub(crate) poller: PositionPoller,
    pub(crate) thumbnails: Option<ThumbnailJob<B::Grabber>>,
    window_handle_set: bool,
    shut_down: bool,
}

impl<B: Backend> Player<B> {
    /// Builds the playback pipeline. Failure here is fatal for the application.
    pub fn new(
        mut backend: B,
        timers: Box<dyn Timers>,
        observers: Observers,
        settings: Settings,
    ) -> Result<Self, Error> {
        let playback = backend.playback()?;
        Ok(Player {
            backend,
            playback,
            timers,
            observers,
            poller: PositionPoller::new(settings.poll_interval),
            settings,
            session: Session::default(),
            thumbnails: None,
            window_handle_set: false,
            shut_down: false,
        })
    }

    pub fn playback(&self) -> &B::Playback {
        &self.playback
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn current_state(&self) -> Snapshot {
        Snapshot {
            state: self.session.state(),
            duration: self.session.duration(),
            position: self.session.position(),
            uri: self.session.uri().cloned(),
            thumbnail_step: self
                .thumbnails
                .as_ref()
                .filter(|job| !job.is_finished())
                .map(|job| job.step()),
        }
    }

    /// Re-targets the session at `uri`, starts playing it and starts a fresh
    /// thumbnail job for it.
    ///
    /// Blocks for up to the configured state timeout while the thumbnail
    /// pipeline prerolls.
    pub fn open_file(&mut self, uri: &url::Url) -> Result<(), Error> {
        self.ensure_running()?;
        log::info!("opening {uri}");

        self.poller.cancel(&mut *self.timers);
        // the uri may only change below PAUSED
        self.request(PlaybackState::Ready);
        self.playback.set_uri(uri);
        self.session.retarget(uri.clone());

        self.observers.duration_changed(&format_time(None));
        self.observers.position_changed(&format_time(None), 0.0);

        self.request(PlaybackState::Playing);
        self.start_thumbnails(uri);
        Ok(())
    }

    pub fn play(&mut self) {
        self.request(PlaybackState::Playing);
    }

    /// Stops position refreshes right away; they resume once PLAYING is
    /// confirmed again.
    pub fn pause(&mut self) {
        self.poller.cancel(&mut *self.timers);
        self.request(PlaybackState::Paused);
    }

    pub fn stop(&mut self) {
        self.poller.cancel(&mut *self.timers);
        self.request(PlaybackState::Ready);
    }

    /// Seeks to `fraction` of the latched duration, snapping to the nearest
    /// keyframe.
    ///
    /// Only an out-of-range fraction is an error. A rejected seek or an
    /// unknown duration is logged and ignored.
    pub fn seek(&mut self, fraction: f64) -> Result<(), Error> {
        if !(0.0..=1.0).contains(&fraction) {
            return Err(Error::InvalidFraction(fraction));
        }
        let Some(duration) = self.session.duration() else {
            log::debug!("ignoring seek to {fraction}: duration unknown");
            return Ok(());
        };

        let target = gst::ClockTime::from_nseconds((duration.nseconds() as f64 * fraction) as u64);
        if let Err(err) = self.playback.seek(target) {
            log::warn!("seek to {target} rejected: {err}");
        }
        Ok(())
    }

    /// Forwards the native window handle to the video sink. Only the first
    /// call has an effect.
    ///
    /// # Safety
    ///
    /// `handle` must identify a live native window that outlives the player.
    pub unsafe fn window_handle_ready(&mut self, handle: usize) {
        if self.window_handle_set {
            log::debug!("window handle already set, ignoring {handle:#x}");
            return;
        }
        self.window_handle_set = true;
        self.playback.set_window_handle(handle);
    }

    /// Delivers one fire of a timer armed through this player's [`Timers`].
    pub fn on_timer(&mut self, handle: TimerHandle) -> Tick {
        match handle.task() {
            Task::PositionPoll => self.poller.tick(
                handle,
                &self.playback,
                &mut self.session,
                &mut self.observers,
            ),
            Task::ThumbnailStep => self.step_thumbnails(handle),
        }
    }

    /// Stops polling, releases the thumbnail pipeline and forces the playback
    /// pipeline to NULL. Later commands fail with [`Error::ShutDown`] or are
    /// ignored.
    pub fn shutdown(&mut self) {
        if self.shut_down {
            return;
        }
        log::info!("shutting down");
        self.poller.cancel(&mut *self.timers);
        self.cancel_thumbnails();
        if let Err(err) = self.playback.request_state(PlaybackState::Null) {
            log::error!("failed to release playback pipeline: {err}");
        }
        self.session.set_state(PlaybackState::Null);
        self.shut_down = true;
    }

    pub(crate) fn request(&mut self, state: PlaybackState) {
        if self.shut_down {
            log::debug!("ignoring {state:?} request after shutdown");
            return;
        }
        if let Err(err) = self.playback.request_state(state) {
            log::error!("failed to request {state:?}: {err}");
        }
    }

    fn ensure_running(&self) -> Result<(), Error> {
        if self.shut_down {
            Err(Error::ShutDown)
        } else {
            Ok(())
        }
    }

    fn start_thumbnails(&mut self, uri: &url::Url) {
        self.cancel_thumbnails();

        let job = self.backend.frame_grabber(uri).and_then(|grabber| {
            ThumbnailJob::start(grabber, uri.clone(), self.settings.thumbnail_path.clone())
        });
        match job {
            Ok(mut job) => {
                job.arm(
                    self.timers
                        .start(Task::ThumbnailStep, self.settings.thumbnail_interval),
                );
                self.thumbnails = Some(job);
            }
            Err(err) => log::warn!("no thumbnails for {uri}: {err}"),
        }
    }

    fn cancel_thumbnails(&mut self) {
        if let Some(mut job) = self.thumbnails.take() {
            if !job.is_finished() {
                log::debug!("preempting thumbnail job for {}", job.uri());
            }
            job.cancel(&mut *self.timers);
        }
    }

    fn step_thumbnails(&mut self, handle: TimerHandle) -> Tick {
        let Some(job) = self.thumbnails.as_mut().filter(|job| job.owns(handle)) else {
            return Tick::Stop;
        };

        if let Some(path) = job.advance() {
            self.observers.thumbnail_ready(path);
        }

        if job.is_finished() {
            // the timer ends itself by returning `Stop`
            self.thumbnails = None;
            Tick::Stop
        } else {
            Tick::Continue
        }
    }
}

impl<B: Backend> Drop for Player<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
