use std::sync::Arc;

use tracing::debug;

use crate::{
    builtins::{
        types::check_arity, Builtin, BuiltinModule, BuiltinRegistry, CallContext, Capability,
        NativeResult, RegistryError,
    },
    object::{ErrorObject, Hash, Object},
};

pub struct CoreModule;

impl BuiltinModule for CoreModule {
    fn namespace(&self) -> &'static str {
        "core"
    }

    fn register(&self, registry: &mut BuiltinRegistry) -> Result<(), RegistryError> {
        registry.register(Builtin::sync("core.len", len))?;
        registry.register(Builtin::sync("core.print", print))?;
        registry.register(Builtin::sync("core.match", match_regexp))?;
        for (name, function) in [
            ("core.type", type_of as fn(&CallContext, Vec<Object>) -> NativeResult),
            ("core.error", error),
            ("core.panic", panic),
        ] {
            registry.register(Builtin::sync(name, function).with_capability(Capability::ErrorAware))?;
        }
        registry.register(
            Builtin::sync("core.async", spawn_async).with_capability(Capability::Spawning),
        )?;
        registry.register(
            Builtin::sync("core.background", background).with_capability(Capability::Spawning),
        )?;
        registry.register(Builtin::new("core.await", Capability::Ordinary, await_result))?;
        Ok(())
    }
}

fn len(_: &CallContext, args: Vec<Object>) -> NativeResult {
    check_arity("len", &args, 1)?;
    let length = match &args[0] {
        Object::String(value) => value.chars().count(),
        Object::DocString(doc) => doc.char_count(),
        Object::Array(array) => array.len(),
        Object::Hash(hash) => hash.len(),
        other => {
            return Err(ErrorObject::internal(format!(
                "argument to `len` not supported, got {}",
                other.object_type()
            )))
        }
    };
    Ok(Object::Integer(length as i64))
}

fn type_of(_: &CallContext, args: Vec<Object>) -> NativeResult {
    check_arity("type", &args, 1)?;
    Ok(Object::from(args[0].object_type().to_string()))
}

fn print(_: &CallContext, args: Vec<Object>) -> NativeResult {
    let line = args
        .iter()
        .map(Object::inspect)
        .collect::<Vec<_>>()
        .join(" ");
    println!("{}", line);
    Ok(Object::Null)
}

/// Pulls message, code and data out of an `error`/`panic` argument.
fn describe(name: &str, argument: &Object) -> Result<(String, Option<i64>, Option<Object>), ErrorObject> {
    match argument {
        Object::String(message) => Ok((message.to_string(), None, None)),
        Object::Error(error) => Ok((error.message.clone(), error.code, error.data.clone())),
        Object::Hash(hash) => describe_hash(name, hash),
        other => Err(ErrorObject::internal(format!(
            "argument to `{}` must be STRING, HASH or ERROR, got {}",
            name,
            other.object_type()
        ))),
    }
}

fn describe_hash(
    name: &str,
    hash: &Hash,
) -> Result<(String, Option<i64>, Option<Object>), ErrorObject> {
    let message = hash
        .get_str("message")
        .and_then(Object::as_str)
        .ok_or_else(|| {
            ErrorObject::internal(format!("`{}` expects a STRING `message` entry", name))
        })?
        .to_string();
    let code = match hash.get_str("code") {
        None | Some(Object::Null) => None,
        Some(Object::Integer(code)) => Some(*code),
        Some(other) => {
            return Err(ErrorObject::internal(format!(
                "`{}` expects an INTEGER `code` entry, got {}",
                name,
                other.object_type()
            )))
        }
    };
    Ok((message, code, hash.get_str("data").cloned()))
}

/// A panic passed back in keeps its origin, so it still ends the run.
fn still_panicking(argument: &Object) -> Option<Object> {
    match argument {
        Object::Error(error) if error.is_panic() => Some(Object::Error(Arc::clone(error))),
        _ => None,
    }
}

fn build(mut error: ErrorObject, code: Option<i64>, data: Option<Object>) -> ErrorObject {
    error.code = code;
    error.data = data;
    error
}

fn error(_: &CallContext, args: Vec<Object>) -> NativeResult {
    check_arity("error", &args, 1)?;
    if let Some(fatal) = still_panicking(&args[0]) {
        return Ok(fatal);
    }
    let (message, code, data) = describe("error", &args[0])?;
    Ok(Object::error(build(ErrorObject::user(message), code, data)))
}

fn panic(_: &CallContext, args: Vec<Object>) -> NativeResult {
    if let Some(fatal) = args.first().and_then(still_panicking) {
        return Ok(fatal);
    }
    let (message, code, data) = match args.first() {
        None => ("panic".to_string(), None, None),
        Some(argument) => describe("panic", argument)?,
    };
    debug!(message = %message, "script panic");
    Ok(Object::error(build(ErrorObject::panic(message), code, data)))
}

/// `match(pattern, text)`: the whole match followed by every capture
/// group, null for groups that did not take part. No match gives `[]`.
fn match_regexp(_: &CallContext, args: Vec<Object>) -> NativeResult {
    check_arity("match", &args, 2)?;
    let Some(text) = args[1].as_str() else {
        return Err(ErrorObject::internal(format!(
            "second argument to `match` must be STRING, got {}",
            args[1].object_type()
        )));
    };

    let compiled;
    let regex = match &args[0] {
        Object::Regexp(regexp) => regexp.regex(),
        Object::String(pattern) => {
            compiled = regex::Regex::new(pattern).map_err(|e| {
                ErrorObject::internal(format!("invalid regular expression {}: {}", pattern, e))
            })?;
            &compiled
        }
        other => {
            return Err(ErrorObject::internal(format!(
                "first argument to `match` must be STRING or REGEXP, got {}",
                other.object_type()
            )))
        }
    };

    let groups = match regex.captures(text) {
        Some(captures) => captures
            .iter()
            .map(|group| group.map_or(Object::Null, |m| Object::from(m.as_str())))
            .collect(),
        None => Vec::new(),
    };
    Ok(Object::array(groups))
}

fn expect_callable(name: &str, args: &[Object]) -> Result<Object, ErrorObject> {
    check_arity(name, args, 1)?;
    if !args[0].is_callable() {
        return Err(ErrorObject::internal(format!(
            "`{}` expects a FUNCTION, got {}",
            name,
            args[0].object_type()
        )));
    }
    Ok(args[0].clone())
}

fn spawn_async(ctx: &CallContext, args: Vec<Object>) -> NativeResult {
    let function = expect_callable("async", &args)?;
    let handle = ctx.interpreter.tasks().spawn_async(
        ctx.interpreter.clone(),
        ctx.env.clone(),
        function,
    );
    Ok(Object::Integer(handle))
}

async fn await_result(ctx: CallContext, args: Vec<Object>) -> NativeResult {
    check_arity("await", &args, 1)?;
    let Some(handle) = args[0].as_integer() else {
        return Err(ErrorObject::internal(format!(
            "`await` expects an INTEGER handle, got {}",
            args[0].object_type()
        )));
    };
    Ok(ctx.interpreter.tasks().await_result(handle).await?)
}

fn background(ctx: &CallContext, args: Vec<Object>) -> NativeResult {
    let function = expect_callable("background", &args)?;
    ctx.interpreter
        .tasks()
        .spawn_background(ctx.interpreter.clone(), ctx.env.clone(), function);
    Ok(Object::Null)
}
