//! End-to-end tests of the generator protocol, driven through bodies shaped
//! exactly like compiler output: straight-line `extern "C"` state machines
//! dispatching on the channel's saved resume point.

use rill_runtime::{
    BodyFault, EvalContext, Generator, GeneratorError, GeneratorState, Value, ValueChannel,
};

/// Yields 'a', 'b', 'c' with no keys, then returns 'done'.
unsafe extern "C" fn abc_body(
    _ctx: *mut EvalContext,
    _receiver: *const Value,
    channel: *mut ValueChannel,
    _handle: *mut Generator,
) {
    let ch = unsafe { &mut *channel };
    match ch.resume_point {
        0 => {
            ch.yield_value(Value::from("a"));
            ch.resume_point = 1;
        }
        1 => {
            ch.yield_value(Value::from("b"));
            ch.resume_point = 2;
        }
        2 => {
            ch.yield_value(Value::from("c"));
            ch.resume_point = 3;
        }
        _ => ch.finish(Value::from("done")),
    }
}

/// Yields ("x" => 1), then a keyless 2, then returns.
unsafe extern "C" fn string_key_body(
    _ctx: *mut EvalContext,
    _receiver: *const Value,
    channel: *mut ValueChannel,
    _handle: *mut Generator,
) {
    let ch = unsafe { &mut *channel };
    match ch.resume_point {
        0 => {
            ch.yield_pair(Value::from("x"), Value::Int(1));
            ch.resume_point = 1;
        }
        1 => {
            ch.yield_value(Value::Int(2));
            ch.resume_point = 2;
        }
        _ => ch.finish(Value::Null),
    }
}

/// Yields (10 => 'a'), then two keyless values.
unsafe extern "C" fn int_key_body(
    _ctx: *mut EvalContext,
    _receiver: *const Value,
    channel: *mut ValueChannel,
    _handle: *mut Generator,
) {
    let ch = unsafe { &mut *channel };
    match ch.resume_point {
        0 => {
            ch.yield_pair(Value::Int(10), Value::from("a"));
            ch.resume_point = 1;
        }
        1 => {
            ch.yield_value(Value::from("b"));
            ch.resume_point = 2;
        }
        2 => {
            ch.yield_value(Value::from("c"));
            ch.resume_point = 3;
        }
        _ => ch.finish(Value::Null),
    }
}

/// Echo generator: yields "ready", then echoes back whatever is sent,
/// recording what `take_sent` observed at each step in its locals.
unsafe extern "C" fn echo_body(
    _ctx: *mut EvalContext,
    _receiver: *const Value,
    channel: *mut ValueChannel,
    _handle: *mut Generator,
) {
    let ch = unsafe { &mut *channel };
    match ch.resume_point {
        0 => {
            let saw = ch.take_sent().unwrap_or(Value::Null);
            ch.locals.set("saw_at_start", saw);
            ch.yield_value(Value::from("ready"));
            ch.resume_point = 1;
        }
        1 => {
            let got = ch.take_sent().unwrap_or(Value::Null);
            ch.locals.set("saw_after_first", got.clone());
            ch.yield_value(got);
            ch.resume_point = 2;
        }
        _ => ch.finish(Value::Null),
    }
}

/// Counts invocations in the context globals, yields once, then returns.
unsafe extern "C" fn counting_body(
    ctx: *mut EvalContext,
    _receiver: *const Value,
    channel: *mut ValueChannel,
    _handle: *mut Generator,
) {
    let ctx = unsafe { &mut *ctx };
    let calls = ctx.global("calls").map(Value::as_int).unwrap_or(0);
    ctx.set_global("calls", Value::Int(calls + 1));

    let ch = unsafe { &mut *channel };
    match ch.resume_point {
        0 => {
            ch.yield_value(Value::Int(1));
            ch.resume_point = 1;
        }
        _ => ch.finish(Value::from("fin")),
    }
}

/// Raises a fault on its very first step.
unsafe extern "C" fn immediate_fault_body(
    _ctx: *mut EvalContext,
    _receiver: *const Value,
    channel: *mut ValueChannel,
    _handle: *mut Generator,
) {
    let ch = unsafe { &mut *channel };
    ch.raise(BodyFault::with_payload("first step failed", Value::Int(13)));
}

/// Yields once, then raises on resumption.
unsafe extern "C" fn fault_after_yield_body(
    _ctx: *mut EvalContext,
    _receiver: *const Value,
    channel: *mut ValueChannel,
    _handle: *mut Generator,
) {
    let ch = unsafe { &mut *channel };
    match ch.resume_point {
        0 => {
            ch.yield_value(Value::Int(1));
            ch.resume_point = 1;
        }
        _ => ch.raise(BodyFault::new("resumed into failure")),
    }
}

/// Yields once; on resumption catches an injected fault and yields its
/// payload, otherwise finishes.
unsafe extern "C" fn catching_body(
    _ctx: *mut EvalContext,
    _receiver: *const Value,
    channel: *mut ValueChannel,
    _handle: *mut Generator,
) {
    let ch = unsafe { &mut *channel };
    match ch.resume_point {
        0 => {
            ch.yield_value(Value::from("armed"));
            ch.resume_point = 1;
        }
        1 => {
            if let Some(fault) = ch.take_fault() {
                ch.yield_value(fault.payload);
                ch.resume_point = 2;
            } else {
                ch.finish(Value::from("no fault"));
            }
        }
        _ => ch.finish(Value::from("after catch")),
    }
}

/// Yields once; on resumption re-raises any injected fault unchanged.
unsafe extern "C" fn rethrowing_body(
    _ctx: *mut EvalContext,
    _receiver: *const Value,
    channel: *mut ValueChannel,
    _handle: *mut Generator,
) {
    let ch = unsafe { &mut *channel };
    match ch.resume_point {
        0 => {
            ch.yield_value(Value::from("armed"));
            ch.resume_point = 1;
        }
        _ => {
            if let Some(fault) = ch.take_fault() {
                ch.raise(fault);
            } else {
                ch.finish(Value::Null);
            }
        }
    }
}

/// Yields the receiver it was constructed with.
unsafe extern "C" fn receiver_body(
    _ctx: *mut EvalContext,
    receiver: *const Value,
    channel: *mut ValueChannel,
    _handle: *mut Generator,
) {
    let ch = unsafe { &mut *channel };
    match ch.resume_point {
        0 => {
            let bound = if receiver.is_null() {
                Value::Null
            } else {
                unsafe { (*receiver).clone() }
            };
            ch.yield_value(bound);
            ch.resume_point = 1;
        }
        _ => ch.finish(Value::Null),
    }
}

/// Returns immediately without ever yielding.
unsafe extern "C" fn empty_body(
    _ctx: *mut EvalContext,
    _receiver: *const Value,
    channel: *mut ValueChannel,
    _handle: *mut Generator,
) {
    unsafe { &mut *channel }.finish(Value::Int(99));
}

fn make(ctx: &mut EvalContext, body: rill_runtime::GeneratorBody) -> Generator {
    unsafe { Generator::new(ctx, None, body) }
}

#[test]
fn auto_keys_count_from_zero() {
    let mut ctx = EvalContext::new();
    let mut g = make(&mut ctx, abc_body);

    for expected in 0..3i64 {
        assert_eq!(g.key().unwrap(), Value::Int(expected));
        g.next().unwrap();
    }
}

#[test]
fn end_to_end_walk() {
    let mut ctx = EvalContext::new();
    let mut g = make(&mut ctx, abc_body);

    assert_eq!(g.current().unwrap(), Value::from("a"));
    assert_eq!(g.key().unwrap(), Value::Int(0));
    g.next().unwrap();
    assert_eq!(g.current().unwrap(), Value::from("b"));
    assert_eq!(g.key().unwrap(), Value::Int(1));
    g.next().unwrap();
    assert_eq!(g.current().unwrap(), Value::from("c"));
    assert_eq!(g.key().unwrap(), Value::Int(2));
    g.next().unwrap();
    assert!(!g.valid().unwrap());
    assert_eq!(g.get_return().unwrap(), Value::from("done"));
}

#[test]
fn string_key_does_not_reseed_counter() {
    let mut ctx = EvalContext::new();
    let mut g = make(&mut ctx, string_key_body);

    assert_eq!(g.key().unwrap(), Value::from("x"));
    assert_eq!(g.current().unwrap(), Value::Int(1));
    g.next().unwrap();
    // "x" is not an integer, so the auto counter is still at 0
    assert_eq!(g.key().unwrap(), Value::Int(0));
    assert_eq!(g.current().unwrap(), Value::Int(2));
}

#[test]
fn integer_key_reseeds_counter() {
    let mut ctx = EvalContext::new();
    let mut g = make(&mut ctx, int_key_body);

    assert_eq!(g.key().unwrap(), Value::Int(10));
    g.next().unwrap();
    assert_eq!(g.key().unwrap(), Value::Int(11));
    g.next().unwrap();
    assert_eq!(g.key().unwrap(), Value::Int(12));
}

#[test]
fn rewind_is_noop_before_progress() {
    let mut ctx = EvalContext::new();
    let mut g = make(&mut ctx, abc_body);

    // rewind forces the first advancement, then is a no-op while the
    // generator still sits at its first yield
    g.rewind().unwrap();
    g.rewind().unwrap();
    assert_eq!(g.current().unwrap(), Value::from("a"));
}

#[test]
fn rewind_fails_after_second_advancement() {
    let mut ctx = EvalContext::new();
    let mut g = make(&mut ctx, abc_body);

    g.next().unwrap();
    let err = g.rewind().unwrap_err();
    assert!(matches!(err, GeneratorError::AlreadyRun));
    assert_eq!(
        err.to_string(),
        "Cannot rewind a generator that was already run"
    );
}

#[test]
fn next_on_fresh_generator_advances_past_first_yield() {
    let mut ctx = EvalContext::new();
    let mut g = make(&mut ctx, abc_body);

    // ensure-started runs to 'a', then next() advances to 'b'
    g.next().unwrap();
    assert_eq!(g.current().unwrap(), Value::from("b"));
}

#[test]
fn get_return_gated_until_body_returns() {
    let mut ctx = EvalContext::new();
    let mut g = make(&mut ctx, abc_body);

    assert!(matches!(g.get_return(), Err(GeneratorError::NoReturnYet)));
    g.rewind().unwrap();
    assert!(matches!(g.get_return(), Err(GeneratorError::NoReturnYet)));

    while g.valid().unwrap() {
        g.next().unwrap();
    }
    // repeatable once closed
    assert_eq!(g.get_return().unwrap(), Value::from("done"));
    assert_eq!(g.get_return().unwrap(), Value::from("done"));
}

#[test]
fn send_before_first_yield_is_delivered_to_second_resumption() {
    let mut ctx = EvalContext::new();
    let mut g = make(&mut ctx, echo_body);

    let echoed = g.send(Value::Int(5)).unwrap();
    assert_eq!(echoed, Value::Int(5));

    // The advancement that produced the first yield saw nothing...
    assert_eq!(
        g.channel_mut().locals.get("saw_at_start"),
        Some(&Value::Null)
    );
    // ...and the resumption after it received the value exactly once.
    assert_eq!(
        g.channel_mut().locals.get("saw_after_first"),
        Some(&Value::Int(5))
    );
}

#[test]
fn send_returns_new_current_value() {
    let mut ctx = EvalContext::new();
    let mut g = make(&mut ctx, echo_body);

    assert_eq!(g.current().unwrap(), Value::from("ready"));
    assert_eq!(g.send(Value::from("ping")).unwrap(), Value::from("ping"));
}

#[test]
fn valid_surfaces_first_step_fault() {
    let mut ctx = EvalContext::new();
    let mut g = make(&mut ctx, immediate_fault_body);

    match g.valid() {
        Err(GeneratorError::Fault(fault)) => {
            assert_eq!(fault.message, "first step failed");
            assert_eq!(fault.payload, Value::Int(13));
        }
        other => panic!("expected propagated fault, got {:?}", other.err()),
    }
    assert_eq!(g.state(), GeneratorState::Closed);
}

#[test]
fn body_fault_closes_generator_and_blocks_get_return() {
    let mut ctx = EvalContext::new();
    let mut g = make(&mut ctx, fault_after_yield_body);

    assert!(g.valid().unwrap());
    assert!(matches!(g.next(), Err(GeneratorError::Fault(_))));
    assert_eq!(g.state(), GeneratorState::Closed);

    // faulted, not returned: the return value never became observable
    assert!(matches!(g.get_return(), Err(GeneratorError::NoReturnYet)));
    // and further driving is a silent no-op
    g.next().unwrap();
    assert!(!g.valid().unwrap());
}

#[test]
fn throw_into_suspended_body_can_be_caught() {
    let mut ctx = EvalContext::new();
    let mut g = make(&mut ctx, catching_body);

    let caught = g
        .throw(BodyFault::with_payload("injected", Value::from("payload")))
        .unwrap();
    assert_eq!(caught, Value::from("payload"));
    assert!(g.valid().unwrap());
}

#[test]
fn throw_into_rethrowing_body_propagates_unchanged() {
    let mut ctx = EvalContext::new();
    let mut g = make(&mut ctx, rethrowing_body);
    g.rewind().unwrap();

    let original = BodyFault::with_payload("kaboom", Value::Int(-1));
    match g.throw(original.clone()) {
        Err(GeneratorError::Fault(fault)) => assert_eq!(fault, original),
        other => panic!("expected propagated fault, got {:?}", other.err()),
    }
    assert_eq!(g.state(), GeneratorState::Closed);
}

#[test]
fn throw_after_closed_reraises_without_invoking_body() {
    let mut ctx = EvalContext::new();
    let mut g = make(&mut ctx, counting_body);

    g.next().unwrap(); // runs to yield, then to completion
    g.next().unwrap();
    assert_eq!(g.state(), GeneratorState::Closed);
    let calls_before = ctx.global("calls").cloned();

    let fault = BodyFault::new("late");
    match g.throw(fault.clone()) {
        Err(GeneratorError::Fault(f)) => assert_eq!(f, fault),
        other => panic!("expected re-raised fault, got {:?}", other.err()),
    }
    assert_eq!(ctx.global("calls").cloned(), calls_before);
}

#[test]
fn current_and_key_retained_after_close() {
    let mut ctx = EvalContext::new();
    let mut g = make(&mut ctx, abc_body);

    while g.valid().unwrap() {
        g.next().unwrap();
    }
    assert_eq!(g.state(), GeneratorState::Closed);
    assert_eq!(g.current().unwrap(), Value::from("c"));
    assert_eq!(g.key().unwrap(), Value::Int(2));
}

#[test]
fn immediately_returning_body_still_allows_rewind() {
    let mut ctx = EvalContext::new();
    let mut g = make(&mut ctx, empty_body);

    assert!(!g.valid().unwrap());
    // only one advancement ever happened, so rewind is still legal
    g.rewind().unwrap();
    assert_eq!(g.get_return().unwrap(), Value::Int(99));
}

#[test]
fn receiver_is_passed_through_to_body() {
    let mut ctx = EvalContext::new();
    let mut g = unsafe { Generator::new(&mut ctx, Some(Value::from("bound")), receiver_body) };
    assert_eq!(g.current().unwrap(), Value::from("bound"));
}

#[test]
fn dropping_suspended_generator_never_resumes_body() {
    let mut ctx = EvalContext::new();
    {
        let mut g = make(&mut ctx, counting_body);
        g.rewind().unwrap();
        assert!(g.valid().unwrap());
    } // dropped here, suspended at its first yield

    // exactly one invocation: the one that produced the yield
    assert_eq!(ctx.global("calls"), Some(&Value::Int(1)));
}

#[cfg(feature = "diagnostics")]
#[test]
fn registry_tracks_generator_lifecycle() {
    use rill_runtime::diagnostics::generator_registry;

    let mut ctx = EvalContext::new();
    let mut g = make(&mut ctx, abc_body);
    let id = g.id();
    g.rewind().unwrap();

    let entry = generator_registry()
        .snapshot()
        .into_iter()
        .find(|e| e.id == id)
        .expect("live generator should be registered");
    assert_eq!(entry.state, "suspended");
    assert_eq!(entry.advancements, 1);

    drop(g);
    assert!(!generator_registry().snapshot().iter().any(|e| e.id == id));
}

#[test]
fn wakeup_refuses_serialization() {
    let mut ctx = EvalContext::new();
    let g = make(&mut ctx, abc_body);
    let err = g.wakeup().unwrap_err();
    assert!(matches!(err, GeneratorError::NotSerializable));
    assert_eq!(err.to_string(), "Serialization of 'Generator' is not allowed");
}
