//! One run of the module: `init`, optional `setMask`, a `log` per message,
//! then `close`, all called the way a script would call them.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use sysbridge::{BridgeConfig, SyslogBackend, initialize_with};
use sysbridge_host::{Function, Isolate, Object, Value};
use tracing::{debug, info};

/// What to send and how to open the channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Plan {
    pub(crate) name: String,
    pub(crate) option: i32,
    pub(crate) facility: i32,
    pub(crate) level: i32,
    pub(crate) mask: Option<(i32, bool)>,
    pub(crate) messages: Vec<String>,
}

/// Outcome of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Report {
    pub(crate) submitted: usize,
    pub(crate) completed: usize,
    pub(crate) previous_mask: Option<i32>,
}

fn describe(exception: &Value) -> String {
    let Some(object) = exception.as_object() else {
        return exception.to_display_string();
    };
    let message = object.get("message").to_display_string();
    let code = object.get("code");
    if code.is_undefined() {
        message
    } else {
        format!("{message} ({})", code.to_display_string())
    }
}

fn call(isolate: &Isolate, module: &Object, operation: &str, args: &[Value]) -> Result<Value> {
    isolate
        .call_function(&module.get(operation), args)
        .map_err(|exception| anyhow!("{operation} failed: {}", describe(&exception)))
}

pub(crate) fn run(
    plan: &Plan,
    config: BridgeConfig,
    backend: Arc<dyn SyslogBackend>,
) -> Result<Report> {
    let isolate = Isolate::new()?;
    let module = Object::new();
    initialize_with(&isolate, &module, config, backend)?;

    call(&isolate, &module, "init", &[
        Value::string(&plan.name),
        Value::Integer(plan.option),
        Value::Integer(plan.facility),
    ])?;

    let previous_mask = match plan.mask {
        Some((level, up_to)) => {
            let previous = call(&isolate, &module, "setMask", &[
                Value::Integer(level),
                Value::Boolean(up_to),
            ])?;
            Some(previous.to_int32())
        },
        None => None,
    };

    let completed = Rc::new(Cell::new(0_usize));
    let counter = Rc::clone(&completed);
    let done = Function::script("done", move |_, _| {
        counter.set(counter.get().saturating_add(1));
        Ok(Value::Undefined)
    });

    let mut submitted = 0_usize;
    for message in &plan.messages {
        call(&isolate, &module, "log", &[
            Value::Integer(plan.level),
            Value::string(message),
            Value::Null,
            done.clone().into(),
        ])?;
        submitted = submitted.saturating_add(1);
    }
    debug!(submitted, "waiting for completions");
    isolate.run_loop();

    call(&isolate, &module, "close", &[])?;
    info!(submitted, completed = completed.get(), "session finished");
    Ok(Report {
        submitted,
        completed: completed.get(),
        previous_mask,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sysbridge::{DispatchMode, RecordingSyslog, SyslogCall};

    fn plan(messages: &[&str]) -> Plan {
        Plan {
            name: "cli-test".to_owned(),
            option: 1,
            facility: 24,
            level: 5,
            mask: None,
            messages: messages.iter().map(ToString::to_string).collect(),
        }
    }

    #[test]
    fn every_message_completes() {
        let backend = Arc::new(RecordingSyslog::new());
        let report = run(&plan(&["a", "b", "c"]), BridgeConfig::default(), backend.clone()).unwrap();
        assert_eq!(report.submitted, 3);
        assert_eq!(report.completed, 3);
        assert_eq!(report.previous_mask, None);

        let calls = backend.calls();
        assert_eq!(calls.first(), Some(&SyslogCall::Open {
            ident: "cli-test".into(),
            option: 1,
            facility: 24
        }));
        assert_eq!(calls.last(), Some(&SyslogCall::Close));
        assert_eq!(backend.writes().len(), 3);
    }

    #[test]
    fn serial_runs_keep_message_order() {
        let backend = Arc::new(RecordingSyslog::new());
        let config = BridgeConfig {
            dispatch: DispatchMode::Serial,
            ..BridgeConfig::default()
        };
        run(&plan(&["1", "2", "3", "4"]), config, backend.clone()).unwrap();
        let order: Vec<String> = backend.writes().into_iter().map(|(_, m)| m).collect();
        assert_eq!(order, vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn mask_is_applied_before_logging() {
        let backend = Arc::new(RecordingSyslog::new());
        let mut plan = plan(&["filtered"]);
        plan.mask = Some((3, true));
        let report = run(&plan, BridgeConfig::default(), backend.clone()).unwrap();
        assert_eq!(report.previous_mask, Some(RecordingSyslog::INITIAL_MASK));
        assert_eq!(report.completed, 1);
        assert!(backend.writes().is_empty());
        assert_eq!(backend.filtered(), 1);
    }

    #[test]
    fn host_exceptions_become_errors() {
        let backend = Arc::new(RecordingSyslog::new());
        let mut plan = plan(&[]);
        plan.name = String::new();
        let err = run(&plan, BridgeConfig::default(), backend).unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("init failed"), "{text}");
        assert!(text.contains("ERR_ARGUMENT"), "{text}");
    }
}
