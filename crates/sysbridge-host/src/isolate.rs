//! The isolate: one host value space, its handle scopes and its event loop.
//!
//! An isolate is owned by exactly one thread (the host's logical thread of
//! control). Everything that touches values goes through it. Work that must
//! not block that thread is handed to the worker pool with
//! [`Isolate::queue_work`]; the completion half always runs back on the
//! isolate's thread while [`Isolate::run_loop`] is driving the loop.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::{Rc, Weak};

use tokio::runtime::{Builder, Runtime};
use tokio::sync::Notify;
use tokio::task::LocalSet;
use tracing::{debug, error, trace};

use crate::error::HostResult;
use crate::handle::{Local, PersistentId};
use crate::value::{Exception, FunctionKind, Object, Value};
use crate::{legacy, modern};

thread_local! {
    static ENTERED: RefCell<Vec<Weak<Inner>>> = const { RefCell::new(Vec::new()) };
}

/// Abort the process after an unrecoverable host failure.
///
/// This is the host's equivalent of a fatal runtime error: there is no
/// caller left that could meaningfully handle it.
pub fn fatal_error(location: &str, message: &str) -> ! {
    error!(location, message, "fatal host error");
    std::process::abort()
}

#[derive(Default)]
struct PersistentTable {
    slots: Vec<Option<Value>>,
    free: Vec<u32>,
    live: usize,
}

struct Inner {
    handles: RefCell<Vec<Value>>,
    persistents: RefCell<PersistentTable>,
    pending_exception: RefCell<Option<Value>>,
    uncaught: RefCell<Vec<Value>>,
    low_memory_notifications: Cell<usize>,
    global: Object,
    tasks: LocalSet,
    runtime: Runtime,
    pending_work: Cell<usize>,
    idle: Notify,
}

/// A host value space bound to the current thread.
#[derive(Clone)]
pub struct Isolate {
    inner: Rc<Inner>,
}

/// Keeps an isolate entered on the current thread; see [`Isolate::enter`].
#[must_use = "the isolate is only entered while the guard is alive"]
pub struct EnterGuard {
    _thread_bound: std::marker::PhantomData<*const ()>,
}

impl Drop for EnterGuard {
    fn drop(&mut self) {
        ENTERED.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

impl Isolate {
    /// Create an isolate with its own event loop and worker pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the event loop cannot be started.
    pub fn new() -> HostResult<Self> {
        let runtime = Builder::new_current_thread()
            .thread_name("sysbridge-worker")
            .build()?;
        Ok(Self {
            inner: Rc::new(Inner {
                handles: RefCell::new(Vec::new()),
                persistents: RefCell::new(PersistentTable::default()),
                pending_exception: RefCell::new(None),
                uncaught: RefCell::new(Vec::new()),
                low_memory_notifications: Cell::new(0),
                global: Object::new(),
                tasks: LocalSet::new(),
                runtime,
                pending_work: Cell::new(0),
                idle: Notify::new(),
            }),
        })
    }

    /// The isolate most recently entered on this thread, if any.
    #[must_use]
    pub fn current() -> Option<Self> {
        ENTERED.with(|stack| {
            stack
                .borrow()
                .last()
                .and_then(Weak::upgrade)
                .map(|inner| Self { inner })
        })
    }

    /// Make this isolate the current one until the guard is dropped.
    pub fn enter(&self) -> EnterGuard {
        ENTERED.with(|stack| stack.borrow_mut().push(Rc::downgrade(&self.inner)));
        EnterGuard {
            _thread_bound: std::marker::PhantomData,
        }
    }

    /// The global object.
    #[must_use]
    pub fn global(&self) -> Object {
        self.inner.global.clone()
    }

    /// Identity comparison.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    // -----------------------------------------------------------------------
    // Handles
    // -----------------------------------------------------------------------

    pub(crate) fn push_handle(&self, value: Value) -> usize {
        let mut handles = self.inner.handles.borrow_mut();
        handles.push(value);
        handles.len().saturating_sub(1)
    }

    /// Create a handle to `value` in the innermost open handle scope.
    #[must_use]
    pub fn local<T>(&self, value: Value) -> Local<T> {
        Local::from_index(self.push_handle(value))
    }

    pub(crate) fn handle_mark(&self) -> usize {
        self.inner.handles.borrow().len()
    }

    pub(crate) fn release_handles(&self, mark: usize) {
        self.inner.handles.borrow_mut().truncate(mark);
    }

    /// Read the value behind a handle. A handle whose scope has already exited
    /// reads as `undefined`.
    #[must_use]
    pub fn value<T>(&self, local: Local<T>) -> Value {
        self.inner
            .handles
            .borrow()
            .get(local.index())
            .cloned()
            .unwrap_or_default()
    }

    /// Number of live scoped handles.
    #[must_use]
    pub fn handle_count(&self) -> usize {
        self.inner.handles.borrow().len()
    }

    // -----------------------------------------------------------------------
    // Persistent handles
    // -----------------------------------------------------------------------

    pub(crate) fn persist(&self, value: Value) -> PersistentId {
        let mut table = self.inner.persistents.borrow_mut();
        table.live = table.live.saturating_add(1);
        if let Some(slot) = table.free.pop() {
            if let Some(entry) = table.slots.get_mut(slot as usize) {
                *entry = Some(value);
            }
            return PersistentId(slot);
        }
        let slot = u32::try_from(table.slots.len())
            .unwrap_or_else(|_| fatal_error("Isolate::persist", "persistent table exhausted"));
        table.slots.push(Some(value));
        PersistentId(slot)
    }

    pub(crate) fn persistent_value(&self, id: PersistentId) -> Value {
        self.inner
            .persistents
            .borrow()
            .slots
            .get(id.0 as usize)
            .and_then(Clone::clone)
            .unwrap_or_default()
    }

    pub(crate) fn release_persistent(&self, id: PersistentId) {
        let mut table = self.inner.persistents.borrow_mut();
        let released = table
            .slots
            .get_mut(id.0 as usize)
            .and_then(Option::take)
            .is_some();
        if released {
            table.live = table.live.saturating_sub(1);
            table.free.push(id.0);
        }
    }

    /// Number of persistent handles that have not been released.
    #[must_use]
    pub fn persistent_count(&self) -> usize {
        self.inner.persistents.borrow().live
    }

    // -----------------------------------------------------------------------
    // Exceptions and notifications
    // -----------------------------------------------------------------------

    pub(crate) fn set_pending_exception(&self, exception: Value) {
        *self.inner.pending_exception.borrow_mut() = Some(exception);
    }

    fn take_pending_exception(&self) -> Option<Value> {
        self.inner.pending_exception.borrow_mut().take()
    }

    /// Report an exception nobody caught (for example one thrown by a
    /// callback invoked from the event loop).
    pub fn report_uncaught_exception(&self, exception: Value) {
        debug!(exception = ?exception, "uncaught exception");
        self.inner.uncaught.borrow_mut().push(exception);
    }

    /// Exceptions reported through [`Isolate::report_uncaught_exception`].
    #[must_use]
    pub fn uncaught_exceptions(&self) -> Vec<Value> {
        self.inner.uncaught.borrow().clone()
    }

    pub(crate) fn notify_low_memory(&self) {
        let count = self.inner.low_memory_notifications.get();
        self.inner
            .low_memory_notifications
            .set(count.saturating_add(1));
    }

    /// How many low-memory notifications embedders have sent.
    #[must_use]
    pub fn low_memory_notifications(&self) -> usize {
        self.inner.low_memory_notifications.get()
    }

    // -----------------------------------------------------------------------
    // Calls
    // -----------------------------------------------------------------------

    /// Call a function value with `undefined` as receiver.
    ///
    /// Handles created during the call are released before returning.
    ///
    /// # Errors
    ///
    /// Returns the thrown exception if the callee throws, or a `TypeError` if
    /// `callee` is not a function.
    pub fn call_function(&self, callee: &Value, args: &[Value]) -> Result<Value, Value> {
        let Value::Function(function) = callee else {
            return Err(Exception::type_error(&format!(
                "{} is not a function",
                callee.to_display_string()
            )));
        };

        let _entered = self.enter();
        let mark = self.handle_mark();
        let data = function.0.data.clone();
        let result = match &function.0.kind {
            FunctionKind::Script(body) => body(self, args),
            FunctionKind::Legacy(callback) => {
                let arguments = legacy::Arguments::new(self.clone(), args, data);
                let returned = callback(&arguments);
                Ok(self.value(returned))
            },
            FunctionKind::Modern(callback) => {
                let info = modern::FunctionCallbackInfo::new(self.clone(), args, data);
                callback(&info);
                Ok(info.take_return_value())
            },
        };
        self.release_handles(mark);

        match self.take_pending_exception() {
            Some(exception) => Err(exception),
            None => result,
        }
    }

    // -----------------------------------------------------------------------
    // Event loop
    // -----------------------------------------------------------------------

    /// Run `work` on the worker pool, then `after` on this isolate's thread.
    ///
    /// The work is submitted immediately; `after` runs during a later
    /// [`Isolate::run_loop`], inside a fresh handle scope.
    pub fn queue_work<T, W, A>(&self, work: W, after: A)
    where
        T: Send + 'static,
        W: FnOnce() -> T + Send + 'static,
        A: FnOnce(&Isolate, T) + 'static,
    {
        let joined = self.inner.runtime.spawn_blocking(work);
        self.spawn_completion(joined, move |isolate, output| match output {
            Ok(value) => after(isolate, value),
            Err(e) => fatal_error("Isolate::queue_work", &format!("worker task failed: {e}")),
        });
    }

    /// Wait for `future` on the event loop, then run `after` on this
    /// isolate's thread. The loop stays alive until `after` has run.
    pub fn spawn_completion<F, A>(&self, future: F, after: A)
    where
        F: Future + 'static,
        A: FnOnce(&Isolate, F::Output) + 'static,
    {
        let pending = self.inner.pending_work.get().saturating_add(1);
        self.inner.pending_work.set(pending);
        trace!(pending, "work scheduled");

        let weak = Rc::downgrade(&self.inner);
        self.inner.tasks.spawn_local(async move {
            let output = future.await;
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let isolate = Isolate { inner };
            {
                let _entered = isolate.enter();
                let mark = isolate.handle_mark();
                after(&isolate, output);
                isolate.release_handles(mark);
            }
            isolate.finish_work();
        });
    }

    fn finish_work(&self) {
        let pending = self.inner.pending_work.get().saturating_sub(1);
        self.inner.pending_work.set(pending);
        trace!(pending, "work completed");
        if pending == 0 {
            self.inner.idle.notify_one();
        }
    }

    /// Number of scheduled completions that have not run yet.
    #[must_use]
    pub fn pending_work(&self) -> usize {
        self.inner.pending_work.get()
    }

    /// Drive the event loop until every scheduled completion has run.
    ///
    /// Must not be called from inside a completion.
    pub fn run_loop(&self) {
        let inner = &self.inner;
        inner
            .runtime
            .block_on(inner.tasks.run_until(self.until_idle()));
    }

    async fn until_idle(&self) {
        while self.inner.pending_work.get() > 0 {
            self.inner.idle.notified().await;
        }
    }
}
