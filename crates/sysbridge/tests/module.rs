//! End-to-end tests of the module as a host script sees it.

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use sysbridge::{
    BridgeConfig, BridgeError, Channel, DispatchMode, NamePolicy, RecordingSyslog, SyslogCall, initialize_with,
};
use sysbridge_host::{Function, Isolate, Object, Value};

struct Harness {
    isolate: Isolate,
    module: Object,
    backend: Arc<RecordingSyslog>,
    channel: Rc<Channel>,
}

impl Harness {
    fn new() -> Self {
        Self::with(BridgeConfig::default(), RecordingSyslog::new())
    }

    fn with(config: BridgeConfig, backend: RecordingSyslog) -> Self {
        let isolate = Isolate::new().unwrap();
        let module = Object::new();
        let backend = Arc::new(backend);
        let channel = initialize_with(&isolate, &module, config, backend.clone()).unwrap();
        Self {
            isolate,
            module,
            backend,
            channel,
        }
    }

    fn call(&self, operation: &str, args: &[Value]) -> Result<Value, Value> {
        self.isolate.call_function(&self.module.get(operation), args)
    }

    fn init(&self, name: &str) {
        self.call("init", &[Value::string(name), Value::Integer(0), Value::Integer(8)])
            .unwrap();
    }

    fn log(&self, severity: i32, message: &str, callback: &Function) -> Result<Value, Value> {
        self.call(
            "log",
            &[
                Value::Integer(severity),
                Value::string(message),
                Value::Null,
                callback.clone().into(),
            ],
        )
    }
}

fn counting_callback() -> (Function, Rc<Cell<u32>>) {
    let count = Rc::new(Cell::new(0_u32));
    let seen = Rc::clone(&count);
    let callback = Function::script("done", move |_, args| {
        assert!(args.is_empty());
        seen.set(seen.get().saturating_add(1));
        Ok(Value::Undefined)
    });
    (callback, count)
}

fn error_code(error: &Value) -> String {
    error
        .as_object()
        .map(|object| object.get("code").to_display_string())
        .unwrap_or_default()
}

fn error_name(error: &Value) -> String {
    error
        .as_object()
        .map(|object| object.get("name").to_display_string())
        .unwrap_or_default()
}

#[test]
fn second_init_closes_the_first_channel() {
    let h = Harness::new();
    h.init("first");
    h.init("second");
    h.init("third");

    let calls = h.backend.calls();
    let opens = calls
        .iter()
        .filter(|call| matches!(call, SyslogCall::Open { .. }))
        .count();
    let closes = calls.iter().filter(|call| **call == SyslogCall::Close).count();
    assert_eq!(opens, 3);
    assert_eq!(closes, 2);
    assert_eq!(calls.first(), Some(&SyslogCall::Open {
        ident: "first".into(),
        option: 0,
        facility: 8
    }));
    assert_eq!(h.channel.daemon_name().as_deref(), Some("third"));
}

#[test]
fn log_before_init_is_a_state_error_and_never_calls_back() {
    let h = Harness::new();
    let (callback, count) = counting_callback();

    let err = h.log(6, "too early", &callback).unwrap_err();
    assert_eq!(error_code(&err), "ERR_STATE");
    assert_eq!(error_name(&err), "Error");
    assert_eq!(h.isolate.pending_work(), 0);

    h.isolate.run_loop();
    assert_eq!(count.get(), 0);
    assert!(h.backend.writes().is_empty());
    assert_eq!(h.isolate.persistent_count(), 0);
}

#[test]
fn init_argument_errors_leave_state_unchanged() {
    let h = Harness::new();
    let bad_calls: [&[Value]; 5] = [
        &[],
        &[Value::string("one")],
        &[Value::Integer(1), Value::Integer(0), Value::Integer(8)],
        &[Value::string("two"), Value::Integer(0)],
        &[Value::string(""), Value::Integer(0), Value::Integer(8)],
    ];
    for args in bad_calls {
        let err = h.call("init", args).unwrap_err();
        assert_eq!(error_code(&err), "ERR_ARGUMENT", "args: {args:?}");
        assert!(!h.channel.is_open());
    }
    assert!(h.backend.calls().is_empty());

    h.init("open");
    let err = h.call("init", &[Value::string("x")]).unwrap_err();
    assert_eq!(error_code(&err), "ERR_ARGUMENT");
    assert_eq!(h.channel.daemon_name().as_deref(), Some("open"));
}

#[test]
fn init_converts_options_and_facility_like_the_host() {
    let h = Harness::new();
    h.call(
        "init",
        &[Value::string("conv"), Value::string("3"), Value::Number(16.9)],
    )
    .unwrap();
    assert_eq!(h.backend.calls(), vec![SyslogCall::Open {
        ident: "conv".into(),
        option: 3,
        facility: 16
    }]);
}

#[test]
fn set_mask_returns_the_previous_mask() {
    let h = Harness::new();
    h.init("masks");

    let previous = h.call("setMask", &[Value::Integer(5)]).unwrap();
    assert_eq!(previous.to_int32(), 0xff);
    assert_eq!(h.backend.mask(), 1 << 5);

    let previous = h
        .call("setMask", &[Value::Integer(5), Value::Boolean(true)])
        .unwrap();
    assert_eq!(previous.to_int32(), 1 << 5);
    assert_eq!(h.backend.mask(), (1 << 6) - 1);

    let previous = h
        .call("setMask", &[Value::Integer(7), Value::Boolean(true)])
        .unwrap();
    assert_eq!(previous.to_int32(), (1 << 6) - 1);
}

#[test]
fn set_mask_rejects_bad_arguments_without_touching_the_filter() {
    let h = Harness::new();
    h.init("masks");

    let err = h.call("setMask", &[]).unwrap_err();
    assert_eq!(error_code(&err), "ERR_ARGUMENT");

    let err = h.call("setMask", &[Value::string("five")]).unwrap_err();
    assert_eq!(error_code(&err), "ERR_TYPE");
    assert_eq!(error_name(&err), "TypeError");

    let err = h
        .call("setMask", &[Value::Integer(5), Value::string("yes")])
        .unwrap_err();
    assert_eq!(error_code(&err), "ERR_TYPE");

    let err = h.call("setMask", &[Value::Integer(-1)]).unwrap_err();
    assert_eq!(error_code(&err), "ERR_ARGUMENT");

    assert_eq!(h.backend.mask(), RecordingSyslog::INITIAL_MASK);
    assert!(
        !h.backend
            .calls()
            .iter()
            .any(|call| matches!(call, SyslogCall::SetMask { .. }))
    );
}

#[test]
fn set_mask_on_closed_channel_is_a_state_error() {
    let h = Harness::new();
    let err = h.call("setMask", &[Value::Integer(3)]).unwrap_err();
    assert_eq!(error_code(&err), "ERR_STATE");
    assert_eq!(h.backend.mask(), RecordingSyslog::INITIAL_MASK);
}

#[test]
fn masked_levels_are_not_delivered() {
    let h = Harness::new();
    h.init("filtered");
    h.call("setMask", &[Value::Integer(3), Value::Boolean(true)])
        .unwrap();
    let (callback, count) = counting_callback();
    h.log(6, "info", &callback).unwrap();
    h.log(2, "crit", &callback).unwrap();
    h.isolate.run_loop();

    assert_eq!(h.backend.writes(), vec![(2, "crit".to_string())]);
    assert_eq!(h.backend.filtered(), 1);
    assert_eq!(count.get(), 2);
}

#[test]
fn callback_runs_once_and_only_after_log_returns() {
    let (backend, gate) = RecordingSyslog::gated();
    let h = Harness::with(BridgeConfig::default(), backend);
    h.init("async");
    let (callback, count) = counting_callback();

    let returned = h.log(6, "held", &callback).unwrap();
    assert!(returned.is_undefined());
    assert_eq!(count.get(), 0);
    assert!(h.backend.writes().is_empty());
    assert_eq!(h.isolate.pending_work(), 1);

    gate.open();
    h.isolate.run_loop();
    assert_eq!(count.get(), 1);
    assert_eq!(h.backend.writes(), vec![(6, "held".to_string())]);

    h.isolate.run_loop();
    assert_eq!(count.get(), 1);
}

#[test]
fn close_twice_is_a_quiet_no_op() {
    let h = Harness::new();
    assert!(h.call("close", &[]).unwrap().is_undefined());
    h.init("closing");
    assert!(h.call("close", &[]).unwrap().is_undefined());
    assert!(h.call("close", &[]).unwrap().is_undefined());
    let closes = h
        .backend
        .calls()
        .into_iter()
        .filter(|call| *call == SyslogCall::Close)
        .count();
    assert_eq!(closes, 1);
    assert!(!h.channel.is_open());
}

#[test]
fn end_to_end_log_releases_everything() {
    let h = Harness::new();
    let baseline = h.isolate.handle_count();
    h.call("init", &[Value::string("myapp"), Value::Integer(0), Value::Integer(1)])
        .unwrap();
    let (callback, count) = counting_callback();
    h.log(6, "hello", &callback).unwrap();

    assert_eq!(h.isolate.persistent_count(), 1);
    assert_eq!(h.isolate.handle_count(), baseline);

    h.isolate.run_loop();
    assert_eq!(count.get(), 1);
    assert_eq!(h.backend.writes(), vec![(6, "hello".to_string())]);
    assert_eq!(h.isolate.persistent_count(), 0);
    assert_eq!(h.isolate.handle_count(), baseline);
    assert!(h.isolate.uncaught_exceptions().is_empty());
}

#[test]
fn log_requires_a_callback_function() {
    let h = Harness::new();
    h.init("strict");
    for callback in [Value::Undefined, Value::Integer(1), Value::string("cb")] {
        let err = h
            .call(
                "log",
                &[Value::Integer(6), Value::string("m"), Value::Null, callback],
            )
            .unwrap_err();
        assert_eq!(error_code(&err), "ERR_ARGUMENT");
    }
    assert_eq!(h.isolate.pending_work(), 0);
    assert_eq!(h.isolate.persistent_count(), 0);
}

#[test]
fn log_converts_arguments_like_the_host() {
    let h = Harness::new();
    h.init("convert");
    let (callback, _) = counting_callback();
    h.call(
        "log",
        &[
            Value::Number(3.7),
            Value::Integer(42),
            Value::Undefined,
            callback.into(),
        ],
    )
    .unwrap();
    h.isolate.run_loop();
    assert_eq!(h.backend.writes(), vec![(3, "42".to_string())]);
}

#[test]
fn throwing_callbacks_are_reported_and_released() {
    let h = Harness::new();
    h.init("throws");
    let thrower = Function::script("thrower", |_, _| {
        Err(sysbridge_host::Exception::error("callback exploded"))
    });
    let (callback, count) = counting_callback();
    h.log(6, "first", &thrower).unwrap();
    h.log(6, "second", &callback).unwrap();
    h.isolate.run_loop();

    assert_eq!(count.get(), 1);
    assert_eq!(h.isolate.uncaught_exceptions().len(), 1);
    assert_eq!(h.isolate.persistent_count(), 0);
    assert_eq!(h.backend.writes().len(), 2);
}

#[test]
fn serial_dispatch_keeps_submission_order() {
    let config = BridgeConfig {
        dispatch: DispatchMode::Serial,
        ..BridgeConfig::default()
    };
    let h = Harness::with(config, RecordingSyslog::new());
    h.init("ordered");

    let order = Rc::new(std::cell::RefCell::new(Vec::new()));
    for n in 0..32 {
        let order = Rc::clone(&order);
        let callback = Function::script("done", move |_, _| {
            order.borrow_mut().push(n);
            Ok(Value::Undefined)
        });
        h.log(6, &format!("message {n}"), &callback).unwrap();
    }
    h.isolate.run_loop();

    let expected: Vec<String> = (0..32).map(|n| format!("message {n}")).collect();
    let written: Vec<String> = h.backend.writes().into_iter().map(|(_, m)| m).collect();
    assert_eq!(written, expected);
    assert_eq!(*order.borrow(), (0..32).collect::<Vec<_>>());
    assert_eq!(h.isolate.persistent_count(), 0);
}

#[test]
fn pool_dispatch_delivers_every_message() {
    let h = Harness::new();
    h.init("pool");
    let (callback, count) = counting_callback();
    for n in 0..32 {
        h.log(6, &format!("message {n}"), &callback).unwrap();
    }
    h.isolate.run_loop();

    let mut written: Vec<String> = h.backend.writes().into_iter().map(|(_, m)| m).collect();
    written.sort();
    let mut expected: Vec<String> = (0..32).map(|n| format!("message {n}")).collect();
    expected.sort();
    assert_eq!(written, expected);
    assert_eq!(count.get(), 32);
}

#[test]
fn rejecting_name_policy_refuses_long_names() {
    let config = BridgeConfig {
        name_policy: NamePolicy::Reject,
        max_name_len: 8,
        ..BridgeConfig::default()
    };
    let h = Harness::with(config, RecordingSyslog::new());
    let err = h
        .call(
            "init",
            &[Value::string("much-too-long"), Value::Integer(0), Value::Integer(8)],
        )
        .unwrap_err();
    assert_eq!(error_code(&err), "ERR_ARGUMENT");
    assert!(!h.channel.is_open());
}

#[test]
fn out_of_range_name_limit_fails_initialization() {
    let isolate = Isolate::new().unwrap();
    let module = Object::new();
    let backend = Arc::new(RecordingSyslog::new());
    let config = BridgeConfig {
        max_name_len: 4096,
        ..BridgeConfig::default()
    };
    let result = initialize_with(&isolate, &module, config, backend.clone());
    assert!(matches!(result, Err(BridgeError::Argument(_))));
    assert!(module.keys().is_empty());
    assert!(backend.calls().is_empty());
}

#[test]
fn name_truncated_to_nothing_is_an_argument_error() {
    let config = BridgeConfig {
        max_name_len: 1,
        ..BridgeConfig::default()
    };
    let h = Harness::with(config, RecordingSyslog::new());
    let err = h
        .call(
            "init",
            &[Value::string("éapp"), Value::Integer(0), Value::Integer(8)],
        )
        .unwrap_err();
    assert_eq!(error_code(&err), "ERR_ARGUMENT");
    assert!(!h.channel.is_open());
    assert!(h.backend.calls().is_empty());
}

#[test]
fn dropping_the_module_closes_the_channel() {
    let h = Harness::new();
    h.init("teardown");
    let backend = Arc::clone(&h.backend);
    drop(h);
    assert_eq!(backend.calls().last(), Some(&SyslogCall::Close));
}

#[test]
fn independent_modules_do_not_share_state() {
    let a = Harness::new();
    let b = Harness::new();
    a.init("a");
    assert!(a.channel.is_open());
    assert!(!b.channel.is_open());
    let (callback, _) = counting_callback();
    let err = b.log(6, "nope", &callback).unwrap_err();
    assert_eq!(error_code(&err), "ERR_STATE");
}
