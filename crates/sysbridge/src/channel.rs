//! The logging channel: one connection to the system logger.

use std::cell::{Cell, RefCell};
use std::ffi::{CStr, CString};
use std::fmt;
use std::sync::Arc;

use sysbridge_host::Isolate;
use tracing::{debug, info};

use crate::backend::SyslogBackend;
use crate::config::{BridgeConfig, MAX_NAME_LEN, NamePolicy};
use crate::dispatch::Dispatcher;
use crate::error::{BridgeError, BridgeResult};
use crate::mask::SeverityMask;
use crate::request::LogRequest;

/// The part of `text` before its first NUL, as a C library would read it.
pub(crate) fn until_nul(text: &str) -> &str {
    text.split('\0').next().unwrap_or_default()
}

/// A validated program name for the system logger.
#[derive(Clone, PartialEq, Eq)]
pub struct DaemonName(CString);

impl DaemonName {
    /// Validate `raw` against the length limit and policy.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Argument`] if the name is empty or would be
    /// truncated to nothing, or too long under [`NamePolicy::Reject`].
    pub fn new(raw: &str, policy: NamePolicy, max_len: usize) -> BridgeResult<Self> {
        let name = until_nul(raw);
        if name.is_empty() {
            return Err(BridgeError::Argument(
                "daemon name must not be empty".to_owned(),
            ));
        }
        let limit = max_len.min(MAX_NAME_LEN);
        let name = if name.len() <= limit {
            name
        } else {
            match policy {
                NamePolicy::Reject => {
                    return Err(BridgeError::Argument(format!(
                        "daemon name is {} bytes, longer than {limit}",
                        name.len()
                    )));
                },
                NamePolicy::Truncate => truncate_at_char_boundary(name, limit),
            }
        };
        if name.is_empty() {
            return Err(BridgeError::Argument(format!(
                "daemon name does not fit in {limit} bytes"
            )));
        }
        CString::new(name)
            .map(Self)
            .map_err(|e| BridgeError::Argument(e.to_string()))
    }

    /// The name as handed to the C library.
    #[must_use]
    pub fn as_c_str(&self) -> &CStr {
        &self.0
    }

    /// The name as text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        self.0.to_str().unwrap_or_default()
    }
}

impl fmt::Debug for DaemonName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DaemonName({:?})", self.as_str())
    }
}

fn truncate_at_char_boundary(name: &str, max_len: usize) -> &str {
    let mut end = max_len.min(name.len());
    while !name.is_char_boundary(end) {
        end = end.saturating_sub(1);
    }
    name.get(..end).unwrap_or_default()
}

/// Channel lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No connection; only `init` and `close` are valid.
    Closed,
    /// Connected under a daemon name.
    Open,
}

/// The single connection to the system logger owned by one module instance.
///
/// Closed when created and when dropped.
pub struct Channel {
    backend: Arc<dyn SyslogBackend>,
    dispatcher: Dispatcher,
    config: BridgeConfig,
    name: RefCell<Option<DaemonName>>,
    next_id: Cell<u64>,
}

impl Channel {
    /// A closed channel over `backend`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::Argument`] if `config` fails validation, or
    /// [`BridgeError::Resource`] if the dispatcher cannot start.
    pub fn new(config: BridgeConfig, backend: Arc<dyn SyslogBackend>) -> BridgeResult<Self> {
        config
            .validate()
            .map_err(|e| BridgeError::Argument(e.to_string()))?;
        let dispatcher = Dispatcher::new(config.dispatch)?;
        Ok(Self {
            backend,
            dispatcher,
            config,
            name: RefCell::new(None),
            next_id: Cell::new(0),
        })
    }

    /// Configuration the channel was created with.
    #[must_use]
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ChannelState {
        if self.name.borrow().is_some() {
            ChannelState::Open
        } else {
            ChannelState::Closed
        }
    }

    /// Whether the channel is connected.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state() == ChannelState::Open
    }

    /// Name the channel is open under.
    #[must_use]
    pub fn daemon_name(&self) -> Option<String> {
        self.name.borrow().as_ref().map(|name| name.as_str().to_owned())
    }

    /// Validate `raw` as a daemon name under this channel's configuration.
    ///
    /// # Errors
    ///
    /// See [`DaemonName::new`].
    pub fn daemon_name_from(&self, raw: &str) -> BridgeResult<DaemonName> {
        DaemonName::new(raw, self.config.name_policy, self.config.max_name_len)
    }

    /// Open under `name`, closing any previous connection first.
    pub fn open(&self, name: DaemonName, option: i32, facility: i32) {
        self.close();
        self.backend.open(name.as_c_str(), option, facility);
        info!(name = name.as_str(), option, facility, "syslog channel opened");
        *self.name.borrow_mut() = Some(name);
    }

    /// Close the connection. Returns whether it was open.
    pub fn close(&self) -> bool {
        let Some(name) = self.name.borrow_mut().take() else {
            return false;
        };
        self.backend.close();
        info!(name = name.as_str(), "syslog channel closed");
        true
    }

    /// Fail with a state error unless open.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::State`] naming `operation` when closed.
    pub fn ensure_open(&self, operation: &str) -> BridgeResult<()> {
        if self.is_open() {
            Ok(())
        } else {
            Err(BridgeError::State(format!(
                "init method has to be called before {operation}"
            )))
        }
    }

    /// Install `mask`, returning the previous mask bits.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::State`] when closed.
    pub fn set_mask(&self, mask: SeverityMask) -> BridgeResult<i32> {
        self.ensure_open("setMask")?;
        let previous = self.backend.set_mask(mask);
        debug!(?mask, previous, "severity mask set");
        Ok(previous)
    }

    /// Identifier for the next request.
    pub fn next_request_id(&self) -> u64 {
        let id = self.next_id.get();
        self.next_id.set(id.wrapping_add(1));
        id
    }

    /// Hand `request` to the dispatcher. Completion happens on a later turn
    /// of `isolate`'s event loop.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeError::State`] when closed; the request is then
    /// dropped unwritten and its callback is never called.
    pub fn submit(&self, isolate: &Isolate, request: LogRequest) -> BridgeResult<()> {
        self.ensure_open("log")?;
        self.dispatcher
            .dispatch(isolate, Arc::clone(&self.backend), request);
        Ok(())
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        if self.close() {
            debug!("channel closed on teardown");
        }
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("state", &self.state())
            .field("name", &self.daemon_name())
            .field("dispatch", &self.dispatcher.mode())
            .finish_non_exhaustive()
    }
}
