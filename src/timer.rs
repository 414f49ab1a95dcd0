use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

/// Which recurring job a timer drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    PositionPoll,
    ThumbnailStep,
}

/// Identifies one armed periodic task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle {
    task: Task,
    id: u64,
}

impl TimerHandle {
    pub fn new(task: Task, id: u64) -> Self {
        TimerHandle { task, id }
    }

    pub fn task(&self) -> Task {
        self.task
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// What a periodic task wants after running once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tick {
    Continue,
    Stop,
}

impl From<Tick> for glib::ControlFlow {
    fn from(tick: Tick) -> Self {
        match tick {
            Tick::Continue => glib::ControlFlow::Continue,
            Tick::Stop => glib::ControlFlow::Break,
        }
    }
}

/// Schedules periodic tasks on the event loop that drives the player.
///
/// Every fire of an armed task must be delivered as
/// [`Player::on_timer`](crate::Player::on_timer) with its handle, one at a
/// time. A task stops when cancelled or when its tick returns [`Tick::Stop`].
pub trait Timers {
    fn start(&mut self, task: Task, interval: Duration) -> TimerHandle;

    /// Cancelling a stopped or unknown handle is a no-op.
    fn cancel(&mut self, handle: TimerHandle);
}

type Dispatch = Box<dyn FnMut(TimerHandle) -> Tick>;

/// Late-bound target that [`MainLoopTimers`] delivers ticks to.
#[derive(Clone, Default)]
pub struct Dispatcher(Rc<RefCell<Option<Dispatch>>>);

impl Dispatcher {
    pub fn set(&self, dispatch: impl FnMut(TimerHandle) -> Tick + 'static) {
        *self.0.borrow_mut() = Some(Box::new(dispatch));
    }

    fn dispatch(&self, handle: TimerHandle) -> Tick {
        match self.0.borrow_mut().as_mut() {
            Some(dispatch) => dispatch(handle),
            None => Tick::Stop,
        }
    }
}

/// [`Timers`] backed by glib timeout sources on the thread-default main context.
#[derive(Default)]
pub struct MainLoopTimers {
    next_id: u64,
    sources: Rc<RefCell<HashMap<u64, glib::SourceId>>>,
    dispatcher: Dispatcher,
}

impl MainLoopTimers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispatcher(&self) -> Dispatcher {
        self.dispatcher.clone()
    }
}

impl Timers for MainLoopTimers {
    fn start(&mut self, task: Task, interval: Duration) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle::new(task, self.next_id);

        let dispatcher = self.dispatcher.clone();
        let sources = Rc::downgrade(&self.sources);
        let source = glib::timeout_add_local(interval, move || {
            let tick = dispatcher.dispatch(handle);
            if tick == Tick::Stop {
                // glib destroys the source once we return `Break`
                if let Some(sources) = sources.upgrade() {
                    sources.borrow_mut().remove(&handle.id);
                }
            }
            tick.into()
        });

        self.sources.borrow_mut().insert(handle.id, source);
        log::trace!("armed {:?} every {:?}", handle, interval);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        let source = self.sources.borrow_mut().remove(&handle.id);
        if let Some(source) = source {
            source.remove();
            log::trace!("cancelled {:?}", handle);
        }
    }
}

impl Drop for MainLoopTimers {
    fn drop(&mut self) {
        let sources: Vec<_> = self.sources.borrow_mut().drain().collect();
        for (_, source) in sources {
            source.remove();
        }
    }
}
