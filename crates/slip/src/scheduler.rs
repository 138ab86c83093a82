//! Cooperative task scheduler.
//!
//! Each interpreter instance is single-threaded and cooperative. The
//! scheduler owns a ready queue and a timer set and drives task futures to
//! completion one poll at a time; there is no preemption and no cross-task
//! parallelism. Suspension points are exactly: `sleep`, channel send/receive
//! when not immediately possible, loop-iteration auto-yield inside task
//! context, and host capabilities declared as suspending.
//!
//! Tasks are plain futures over the async evaluator. A suspension future
//! registers the current task wherever it must wait (ready tail, timer
//! heap, channel waiter list) before returning `Pending`; the executor then
//! picks the next ready task. Fairness is FIFO on the ready queue.
//!
//! Cancellation sets a flag and wakes the task; every suspension future
//! checks the flag first and unwinds with a cancellation signal that
//! reaches the task boundary (cleanup is RAII on the way out).

use std::{
    cell::RefCell,
    cmp::Reverse,
    collections::{BinaryHeap, VecDeque},
    future::Future,
    pin::Pin,
    rc::Rc,
    task::{Context, Poll, Waker},
    time::{Duration, Instant},
};

use ahash::AHashMap;

use crate::{
    error::{RunError, RunResult},
    value::Value,
};

/// How many polls the executor spends draining spawned tasks after the main
/// script completes. Tasks still alive afterwards are cancelled; the
/// sanctioned shutdown for long-lived tasks is `cancel-tasks`.
const DRAIN_POLL_BUDGET: usize = 10_000;

/// Longest timer the drain phase is willing to wait out.
const DRAIN_TIMER_CAP: Duration = Duration::from_millis(50);

/// Unique identifier for a task. Task ids are sequential; the main script
/// is always task 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct TaskId(u32);

impl TaskId {
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }
}

/// Opaque handle returned by `task`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskHandle(pub(crate) TaskId);

impl TaskHandle {
    /// The raw task id, for display purposes.
    #[must_use]
    pub fn id(&self) -> u32 {
        self.0.raw()
    }
}

pub(crate) type TaskFuture = Pin<Box<dyn Future<Output = RunResult<Value>>>>;

#[derive(Debug, Default)]
struct TaskState {
    cancelled: bool,
    /// Value handed over by a channel send while this task waited to
    /// receive.
    mailbox: Option<Value>,
    /// Set when a parked send completed (a receiver took the value).
    send_done: bool,
    finished: Option<RunResult<Value>>,
    /// Host object this task is registered to, for `cancel-tasks`.
    host: Option<String>,
}

#[derive(Default)]
struct SchedState {
    next_id: u32,
    ready: VecDeque<TaskId>,
    timers: BinaryHeap<Reverse<(Instant, TaskId)>>,
    tasks: AHashMap<TaskId, TaskState>,
    current: Option<TaskId>,
}

/// Cheap-clone handle to the scheduler. One per interpreter.
#[derive(Clone, Default)]
pub(crate) struct Scheduler {
    state: Rc<RefCell<SchedState>>,
    futures: Rc<RefCell<AHashMap<TaskId, TaskFuture>>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new task and queues it at the ready tail. The task does
    /// not execute synchronously.
    pub fn spawn(&self, future: TaskFuture, host: Option<String>) -> TaskHandle {
        let id = {
            let mut state = self.state.borrow_mut();
            let id = TaskId(state.next_id);
            state.next_id += 1;
            state.tasks.insert(
                id,
                TaskState {
                    host,
                    ..TaskState::default()
                },
            );
            state.ready.push_back(id);
            id
        };
        self.futures.borrow_mut().insert(id, future);
        TaskHandle(id)
    }

    /// The task currently being polled, if any.
    pub fn current(&self) -> Option<TaskId> {
        self.state.borrow().current
    }

    pub fn is_cancelled(&self, id: TaskId) -> bool {
        self.state
            .borrow()
            .tasks
            .get(&id)
            .is_some_and(|t| t.cancelled)
    }

    fn is_finished(&self, id: TaskId) -> bool {
        self.state
            .borrow()
            .tasks
            .get(&id)
            .is_none_or(|t| t.finished.is_some())
    }

    /// Marks a task cancelled and queues it so the signal is observed at
    /// its next suspension point.
    pub fn cancel(&self, id: TaskId) {
        let mut state = self.state.borrow_mut();
        if let Some(task) = state.tasks.get_mut(&id)
            && task.finished.is_none()
        {
            task.cancelled = true;
            state.ready.push_back(id);
        }
    }

    /// Cancels every live task registered to `host`.
    pub fn cancel_host(&self, host: &str) {
        let ids: Vec<TaskId> = {
            let state = self.state.borrow();
            state
                .tasks
                .iter()
                .filter(|(_, t)| t.finished.is_none() && t.host.as_deref() == Some(host))
                .map(|(id, _)| *id)
                .collect()
        };
        for id in ids {
            self.cancel(id);
        }
    }

    /// Cancels every live task except the one currently running.
    pub fn cancel_all(&self) {
        let current = self.current();
        let ids: Vec<TaskId> = {
            let state = self.state.borrow();
            state
                .tasks
                .iter()
                .filter(|(id, t)| t.finished.is_none() && Some(**id) != current)
                .map(|(id, _)| *id)
                .collect()
        };
        for id in ids {
            self.cancel(id);
        }
    }

    fn wake(&self, id: TaskId) {
        let mut state = self.state.borrow_mut();
        if let Some(task) = state.tasks.get_mut(&id)
            && task.finished.is_none()
        {
            state.ready.push_back(id);
        }
    }

    fn poll_task(&self, id: TaskId) {
        let Some(mut future) = self.futures.borrow_mut().remove(&id) else {
            return;
        };
        self.state.borrow_mut().current = Some(id);
        let waker = Waker::noop();
        let mut cx = Context::from_waker(waker);
        let poll = future.as_mut().poll(&mut cx);
        self.state.borrow_mut().current = None;
        match poll {
            Poll::Ready(result) => {
                if let Some(task) = self.state.borrow_mut().tasks.get_mut(&id) {
                    task.finished = Some(result);
                }
            }
            Poll::Pending => {
                self.futures.borrow_mut().insert(id, future);
            }
        }
    }

    /// Drives the executor until `main` completes, then drains remaining
    /// tasks within the drain budget. Returns the main task's outcome.
    ///
    /// Returns a deadlock error if every task is blocked while `main` is
    /// still pending.
    pub fn run_until_complete(&self, main: TaskHandle) -> RunResult<Value> {
        let main = main.0;
        let mut drain_polls = 0usize;
        loop {
            let main_done = self.is_finished(main);
            if main_done {
                drain_polls += 1;
                if drain_polls > DRAIN_POLL_BUDGET {
                    break;
                }
            }
            let next = self.state.borrow_mut().ready.pop_front();
            if let Some(id) = next {
                if !self.is_finished(id) {
                    self.poll_task(id);
                }
                continue;
            }
            // No ready task: advance the timer set.
            let due = self.state.borrow_mut().timers.pop();
            let Some(Reverse((when, id))) = due else {
                if main_done {
                    break;
                }
                return Err(RunError::runtime("deadlock: all tasks are blocked"));
            };
            if self.is_finished(id) {
                continue;
            }
            let now = Instant::now();
            if when > now {
                let wait = when - now;
                if main_done && wait > DRAIN_TIMER_CAP {
                    break;
                }
                std::thread::sleep(wait);
            }
            self.wake(id);
        }
        // Abandon whatever is still live; long-lived tasks are expected to
        // be shut down via cancel-tasks before this point.
        self.cancel_all();
        self.futures.borrow_mut().clear();
        let outcome = self
            .state
            .borrow_mut()
            .tasks
            .get_mut(&main)
            .and_then(|t| t.finished.take());
        outcome.unwrap_or_else(|| Err(RunError::runtime("main task did not complete")))
    }

    /// Outcome of a finished task, if it has completed.
    pub fn take_outcome(&self, handle: TaskHandle) -> Option<RunResult<Value>> {
        self.state
            .borrow_mut()
            .tasks
            .get_mut(&handle.0)
            .and_then(|t| t.finished.take())
    }

    // --- suspension points ---

    /// Requeues the current task at the ready tail (equivalent to
    /// `sleep(0)`); the mandatory loop-iteration yield uses this.
    pub fn yield_now(&self) -> YieldFut {
        YieldFut {
            sched: self.clone(),
            task: self.current().expect("yield outside task"),
            registered: false,
        }
    }

    /// Suspends the current task for `duration`.
    pub fn sleep(&self, duration: Duration) -> SleepFut {
        SleepFut {
            sched: self.clone(),
            task: self.current().expect("sleep outside task"),
            until: Instant::now() + duration,
            zero: duration.is_zero(),
            registered: false,
        }
    }

    pub fn send(&self, channel: ChannelRef, value: Value) -> SendFut {
        SendFut {
            sched: self.clone(),
            task: self.current().expect("send outside task"),
            channel,
            value: Some(value),
            parked: false,
        }
    }

    pub fn receive(&self, channel: ChannelRef) -> RecvFut {
        RecvFut {
            sched: self.clone(),
            task: self.current().expect("receive outside task"),
            channel,
            parked: false,
        }
    }

    fn deliver(&self, receiver: TaskId, value: Value) {
        if let Some(task) = self.state.borrow_mut().tasks.get_mut(&receiver) {
            task.mailbox = Some(value);
        }
        self.wake(receiver);
    }

    fn complete_send(&self, sender: TaskId) {
        if let Some(task) = self.state.borrow_mut().tasks.get_mut(&sender) {
            task.send_done = true;
        }
        self.wake(sender);
    }

    fn take_mailbox(&self, id: TaskId) -> Option<Value> {
        self.state
            .borrow_mut()
            .tasks
            .get_mut(&id)
            .and_then(|t| t.mailbox.take())
    }

    fn take_send_done(&self, id: TaskId) -> bool {
        self.state
            .borrow_mut()
            .tasks
            .get_mut(&id)
            .is_some_and(|t| std::mem::take(&mut t.send_done))
    }
}

/// A bounded channel. Capacity 0 is a rendezvous: each send waits for a
/// matching receive.
#[derive(Debug)]
pub struct ChannelState {
    capacity: usize,
    buffer: VecDeque<Value>,
    parked_senders: VecDeque<(TaskId, Value)>,
    waiting_receivers: VecDeque<TaskId>,
}

impl ChannelState {
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            buffer: VecDeque::new(),
            parked_senders: VecDeque::new(),
            waiting_receivers: VecDeque::new(),
        }
    }
}

/// Shared channel handle.
pub type ChannelRef = Rc<RefCell<ChannelState>>;

#[must_use]
pub fn make_channel(capacity: usize) -> ChannelRef {
    Rc::new(RefCell::new(ChannelState::with_capacity(capacity)))
}

/// Requeue-at-tail future (`sleep(0)` / loop auto-yield).
pub(crate) struct YieldFut {
    sched: Scheduler,
    task: TaskId,
    registered: bool,
}

impl Future for YieldFut {
    type Output = RunResult<()>;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.sched.is_cancelled(self.task) {
            return Poll::Ready(Err(RunError::Cancelled));
        }
        if self.registered {
            Poll::Ready(Ok(()))
        } else {
            self.registered = true;
            self.sched.wake(self.task);
            Poll::Pending
        }
    }
}

pub(crate) struct SleepFut {
    sched: Scheduler,
    task: TaskId,
    until: Instant,
    zero: bool,
    registered: bool,
}

impl Future for SleepFut {
    type Output = RunResult<()>;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.sched.is_cancelled(self.task) {
            return Poll::Ready(Err(RunError::Cancelled));
        }
        if self.registered {
            return Poll::Ready(Ok(()));
        }
        self.registered = true;
        if self.zero {
            self.sched.wake(self.task);
        } else {
            let entry = Reverse((self.until, self.task));
            self.sched.state.borrow_mut().timers.push(entry);
        }
        Poll::Pending
    }
}

pub(crate) struct SendFut {
    sched: Scheduler,
    task: TaskId,
    channel: ChannelRef,
    value: Option<Value>,
    parked: bool,
}

impl Future for SendFut {
    type Output = RunResult<()>;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.sched.is_cancelled(self.task) {
            // Withdraw a parked send so the value is not delivered after
            // cancellation.
            let task = self.task;
            self.channel
                .borrow_mut()
                .parked_senders
                .retain(|(id, _)| *id != task);
            return Poll::Ready(Err(RunError::Cancelled));
        }
        if self.parked {
            if self.sched.take_send_done(self.task) {
                return Poll::Ready(Ok(()));
            }
            return Poll::Pending;
        }
        let value = self.value.take().expect("send value already consumed");
        let receiver = self.channel.borrow_mut().waiting_receivers.pop_front();
        if let Some(rx) = receiver {
            self.sched.deliver(rx, value);
            return Poll::Ready(Ok(()));
        }
        let room = {
            let chan = self.channel.borrow();
            chan.buffer.len() < chan.capacity
        };
        if room {
            self.channel.borrow_mut().buffer.push_back(value);
            return Poll::Ready(Ok(()));
        }
        let task = self.task;
        self.channel.borrow_mut().parked_senders.push_back((task, value));
        self.parked = true;
        Poll::Pending
    }
}

pub(crate) struct RecvFut {
    sched: Scheduler,
    task: TaskId,
    channel: ChannelRef,
    parked: bool,
}

impl Future for RecvFut {
    type Output = RunResult<Value>;

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.sched.is_cancelled(self.task) {
            let task = self.task;
            self.channel
                .borrow_mut()
                .waiting_receivers
                .retain(|id| *id != task);
            return Poll::Ready(Err(RunError::Cancelled));
        }
        if let Some(value) = self.sched.take_mailbox(self.task) {
            return Poll::Ready(Ok(value));
        }
        let from_buffer = self.channel.borrow_mut().buffer.pop_front();
        if let Some(value) = from_buffer {
            // A parked sender can now move its value into the freed slot.
            let unparked = self.channel.borrow_mut().parked_senders.pop_front();
            if let Some((sender, pending)) = unparked {
                self.channel.borrow_mut().buffer.push_back(pending);
                self.sched.complete_send(sender);
            }
            return Poll::Ready(Ok(value));
        }
        // Rendezvous: take directly from a parked sender.
        let direct = self.channel.borrow_mut().parked_senders.pop_front();
        if let Some((sender, value)) = direct {
            self.sched.complete_send(sender);
            return Poll::Ready(Ok(value));
        }
        if !self.parked {
            let task = self.task;
            self.channel.borrow_mut().waiting_receivers.push_back(task);
            self.parked = true;
        }
        Poll::Pending
    }
}
