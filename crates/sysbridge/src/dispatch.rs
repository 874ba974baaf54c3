//! Moving log writes off the host thread.

use std::cell::RefCell;
use std::sync::Arc;
use std::thread::JoinHandle;

use sysbridge_host::{Isolate, fatal_error};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, trace};

use crate::backend::SyslogBackend;
use crate::config::DispatchMode;
use crate::error::{BridgeError, BridgeResult};
use crate::request::LogRequest;

/// Runs writes on workers and hands each request back to the host thread
/// for completion.
#[derive(Debug)]
pub enum Dispatcher {
    /// The isolate's blocking worker pool. No ordering between requests.
    Pool,
    /// A dedicated thread writing in submission order.
    Serial(SerialWorker),
}

impl Dispatcher {
    /// Create the dispatcher for `mode`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Resource`] if the serial worker thread cannot
    /// be started.
    pub fn new(mode: DispatchMode) -> BridgeResult<Self> {
        match mode {
            DispatchMode::Pool => Ok(Self::Pool),
            DispatchMode::Serial => SerialWorker::spawn().map(Self::Serial),
        }
    }

    /// The mode this dispatcher implements.
    #[must_use]
    pub fn mode(&self) -> DispatchMode {
        match self {
            Self::Pool => DispatchMode::Pool,
            Self::Serial(_) => DispatchMode::Serial,
        }
    }

    /// Write `request` on a worker, then complete it on `isolate`'s thread
    /// during a later turn of its event loop. Never runs the completion
    /// synchronously.
    pub fn dispatch(
        &self,
        isolate: &Isolate,
        backend: Arc<dyn SyslogBackend>,
        request: LogRequest,
    ) {
        trace!(id = request.id(), mode = ?self.mode(), "dispatching log request");
        match self {
            Self::Pool => isolate.queue_work(
                move || {
                    request.write(backend.as_ref());
                    request
                },
                |isolate, request| request.complete(isolate),
            ),
            Self::Serial(worker) => {
                let written = worker.submit(backend, request);
                // Completions take turns so callbacks run in submission order.
                let (finished, next_turn) = oneshot::channel::<()>();
                let turn = worker.last_turn.replace(Some(next_turn));
                isolate.spawn_completion(
                    async move {
                        let written = written.await;
                        if let Some(turn) = turn {
                            let _ = turn.await;
                        }
                        written
                    },
                    move |isolate, written| {
                        match written {
                            Ok(request) => request.complete(isolate),
                            Err(_) => fatal_error(
                                "Dispatcher::dispatch",
                                "serial log worker lost a request",
                            ),
                        }
                        let _ = finished.send(());
                    },
                );
            },
        }
    }
}

struct Job {
    request: LogRequest,
    backend: Arc<dyn SyslogBackend>,
    done: oneshot::Sender<LogRequest>,
}

/// The thread behind [`Dispatcher::Serial`]. Dropping it drains the queue
/// and joins the thread.
#[derive(Debug)]
pub struct SerialWorker {
    jobs: Option<mpsc::UnboundedSender<Job>>,
    thread: Option<JoinHandle<()>>,
    last_turn: RefCell<Option<oneshot::Receiver<()>>>,
}

impl SerialWorker {
    fn spawn() -> BridgeResult<Self> {
        let (jobs, mut queue) = mpsc::unbounded_channel::<Job>();
        let thread = std::thread::Builder::new()
            .name("sysbridge-serial".to_owned())
            .spawn(move || {
                while let Some(job) = queue.blocking_recv() {
                    job.request.write(job.backend.as_ref());
                    // The receiver is gone only if the isolate went away;
                    // the request is then dropped with it.
                    let _ = job.done.send(job.request);
                }
                debug!("serial log worker stopped");
            })
            .map_err(|e| BridgeError::Resource(format!("could not start log worker: {e}")))?;
        debug!("serial log worker started");
        Ok(Self {
            jobs: Some(jobs),
            thread: Some(thread),
            last_turn: RefCell::new(None),
        })
    }

    fn submit(
        &self,
        backend: Arc<dyn SyslogBackend>,
        request: LogRequest,
    ) -> oneshot::Receiver<LogRequest> {
        let (done, written) = oneshot::channel();
        let job = Job {
            request,
            backend,
            done,
        };
        let sent = self.jobs.as_ref().map(|jobs| jobs.send(job));
        if !matches!(sent, Some(Ok(()))) {
            fatal_error("SerialWorker::submit", "serial log worker is gone");
        }
        written
    }
}

impl Drop for SerialWorker {
    fn drop(&mut self) {
        self.jobs.take();
        let Some(thread) = self.thread.take() else {
            return;
        };
        if thread.join().is_err() {
            error!("serial log worker panicked");
        }
    }
}

impl std::fmt::Debug for Job {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job").field("request", &self.request).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingSyslog;
    use crate::request::copy_message;
    use std::rc::Rc;
    use sysbridge_compat::{Local, Persistent, Value, new_scope};
    use sysbridge_host::{Function, kind};

    fn request(isolate: &Isolate, id: u64, text: &str, seen: &Rc<RefCell<Vec<u64>>>) -> LogRequest {
        let seen = Rc::clone(seen);
        let callback = Function::script("cb", move |_, _| {
            seen.borrow_mut().push(id);
            Ok(Value::Undefined)
        });
        let _scope = new_scope(isolate);
        let local: Local<kind::Function> = isolate.local(Value::Function(callback));
        LogRequest::new(
            id,
            6,
            copy_message(text).unwrap(),
            Persistent::new(isolate, local),
        )
    }

    fn run(mode: DispatchMode) -> (Vec<u64>, Vec<String>) {
        let isolate = Isolate::new().unwrap();
        let backend = Arc::new(RecordingSyslog::new());
        let dispatcher = Dispatcher::new(mode).unwrap();
        assert_eq!(dispatcher.mode(), mode);
        let seen = Rc::new(RefCell::new(Vec::new()));

        for id in 0..16 {
            let backend: Arc<dyn SyslogBackend> = backend.clone();
            dispatcher.dispatch(&isolate, backend, request(&isolate, id, &format!("m{id}"), &seen));
        }
        assert!(seen.borrow().is_empty());
        assert_eq!(isolate.pending_work(), 16);

        isolate.run_loop();
        assert_eq!(isolate.persistent_count(), 0);
        let messages = backend.writes().into_iter().map(|(_, m)| m).collect();
        let completed = seen.borrow().clone();
        (completed, messages)
    }

    #[test]
    fn pool_completes_every_request() {
        let (mut completed, mut messages) = run(DispatchMode::Pool);
        completed.sort_unstable();
        messages.sort();
        assert_eq!(completed, (0..16).collect::<Vec<_>>());
        let mut expected: Vec<String> = (0..16).map(|id| format!("m{id}")).collect();
        expected.sort();
        assert_eq!(messages, expected);
    }

    #[test]
    fn serial_preserves_submission_order() {
        let (completed, messages) = run(DispatchMode::Serial);
        assert_eq!(messages, (0..16).map(|id| format!("m{id}")).collect::<Vec<_>>());
        assert_eq!(completed, (0..16).collect::<Vec<_>>());
    }
}
