use std::time::Duration;

use chrono::{SecondsFormat, Utc};

use crate::{
    builtins::{
        types::check_arity, Builtin, BuiltinModule, BuiltinRegistry, CallContext, Capability,
        NativeResult, RegistryError,
    },
    object::{ErrorObject, Object},
};

pub struct TimeModule;

impl BuiltinModule for TimeModule {
    fn namespace(&self) -> &'static str {
        "time"
    }

    fn register(&self, registry: &mut BuiltinRegistry) -> Result<(), RegistryError> {
        registry.register(Builtin::new("time.sleep", Capability::Ordinary, sleep))?;
        registry.register(Builtin::sync("time.unix", unix))?;
        registry.register(Builtin::sync("time.utc", utc))?;
        registry.register(
            Builtin::sync("time.timeout", timeout).with_capability(Capability::Spawning),
        )?;
        registry.register(
            Builtin::sync("time.interval", interval).with_capability(Capability::Spawning),
        )?;
        registry.register(Builtin::sync("time.cancel", cancel))?;
        Ok(())
    }
}

fn integer_argument(name: &str, position: &str, argument: &Object) -> Result<i64, ErrorObject> {
    argument.as_integer().ok_or_else(|| {
        ErrorObject::internal(format!(
            "{} argument to `{}` must be INTEGER, got {}",
            position,
            name,
            argument.object_type()
        ))
    })
}

fn callable_argument(name: &str, argument: &Object) -> Result<Object, ErrorObject> {
    if !argument.is_callable() {
        return Err(ErrorObject::internal(format!(
            "second argument to `{}` must be FUNCTION, got {}",
            name,
            argument.object_type()
        )));
    }
    Ok(argument.clone())
}

/// Suspends only the calling task. Negative durations do not sleep.
async fn sleep(_: CallContext, args: Vec<Object>) -> NativeResult {
    check_arity("sleep", &args, 1)?;
    let millis = integer_argument("sleep", "first", &args[0])?;
    tokio::time::sleep(Duration::from_millis(millis.max(0) as u64)).await;
    Ok(Object::Integer(millis))
}

/// Milliseconds since the Unix epoch.
fn unix(_: &CallContext, args: Vec<Object>) -> NativeResult {
    check_arity("unix", &args, 0)?;
    Ok(Object::Float(Utc::now().timestamp_millis() as f64))
}

/// Current time as an RFC 3339 string, e.g. `2024-05-01T12:30:00Z`.
fn utc(_: &CallContext, args: Vec<Object>) -> NativeResult {
    check_arity("utc", &args, 0)?;
    Ok(Object::from(
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
    ))
}

fn timeout(ctx: &CallContext, args: Vec<Object>) -> NativeResult {
    check_arity("timeout", &args, 2)?;
    let delay = integer_argument("timeout", "first", &args[0])?;
    let function = callable_argument("timeout", &args[1])?;
    let handle = ctx.interpreter.timers().schedule_timeout(
        delay,
        ctx.interpreter.clone(),
        ctx.env.clone(),
        function,
    )?;
    Ok(Object::Integer(handle))
}

fn interval(ctx: &CallContext, args: Vec<Object>) -> NativeResult {
    check_arity("interval", &args, 2)?;
    let period = integer_argument("interval", "first", &args[0])?;
    let function = callable_argument("interval", &args[1])?;
    let handle = ctx.interpreter.timers().schedule_interval(
        period,
        ctx.interpreter.clone(),
        ctx.env.clone(),
        function,
    )?;
    Ok(Object::Integer(handle))
}

fn cancel(ctx: &CallContext, args: Vec<Object>) -> NativeResult {
    check_arity("cancel", &args, 1)?;
    let handle = integer_argument("cancel", "first", &args[0])?;
    ctx.interpreter.timers().cancel(handle)?;
    Ok(Object::Boolean(true))
}
