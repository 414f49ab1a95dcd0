use crate::config::Settings;
use crate::gst_backend::GstBackend;
use crate::observer::Observers;
use crate::player::{Player, Snapshot};
use crate::timer::{MainLoopTimers, Tick};
use crate::Error;
use gstreamer as gst;
use std::cell::RefCell;
use std::rc::Rc;

/// A [`Player`] over GStreamer, driven by the thread-default glib main context.
///
/// Bus messages and timer ticks are dispatched by whoever runs that context
/// (a `glib::MainLoop` or a GUI toolkit's loop). Must be created and used on
/// that thread, and not from inside an [`Observers`] callback.
pub struct MainLoopPlayer {
    player: Rc<RefCell<Player<GstBackend>>>,
    _bus_watch: gst::bus::BusWatchGuard,
}

impl MainLoopPlayer {
    /// Builds both pipelines' factory and the playback pipeline, then hooks
    /// the bus and timers into the main context.
    pub fn new(settings: Settings, observers: Observers) -> Result<Self, Error> {
        let backend = GstBackend::new(&settings)?;
        let timers = MainLoopTimers::new();
        let dispatcher = timers.dispatcher();
        let player = Rc::new(RefCell::new(Player::new(
            backend,
            Box::new(timers),
            observers,
            settings,
        )?));

        let weak = Rc::downgrade(&player);
        dispatcher.set(move |handle| match weak.upgrade() {
            Some(player) => player.borrow_mut().on_timer(handle),
            None => Tick::Stop,
        });

        let bus = player.borrow().playback().bus()?;
        let weak = Rc::downgrade(&player);
        let bus_watch = bus.add_watch_local(move |_, msg| {
            let Some(player) = weak.upgrade() else {
                return glib::ControlFlow::Break;
            };
            let event = player.borrow().playback().playback_event(msg);
            if let Some(event) = event {
                player.borrow_mut().handle_event(event);
            }
            glib::ControlFlow::Continue
        })?;

        Ok(MainLoopPlayer {
            player,
            _bus_watch: bus_watch,
        })
    }

    /// Blocks the calling loop for up to the configured state timeout while
    /// the thumbnail pipeline prerolls.
    pub fn open_file(&self, uri: &url::Url) -> Result<(), Error> {
        self.player.borrow_mut().open_file(uri)
    }

    pub fn play(&self) {
        self.player.borrow_mut().play();
    }

    pub fn pause(&self) {
        self.player.borrow_mut().pause();
    }

    pub fn stop(&self) {
        self.player.borrow_mut().stop();
    }

    pub fn seek(&self, fraction: f64) -> Result<(), Error> {
        self.player.borrow_mut().seek(fraction)
    }

    /// # Safety
    ///
    /// `handle` must identify a live native window that outlives the player.
    pub unsafe fn window_handle_ready(&self, handle: usize) {
        self.player.borrow_mut().window_handle_ready(handle);
    }

    pub fn current_state(&self) -> Snapshot {
        self.player.borrow().current_state()
    }

    /// Get the underlying GStreamer playback pipeline.
    pub fn pipeline(&self) -> gst::Pipeline {
        self.player.borrow().playback().pipeline()
    }

    /// Releases both pipelines. Call before leaving the main loop for good.
    pub fn shutdown(&self) {
        self.player.borrow_mut().shutdown();
    }
}
