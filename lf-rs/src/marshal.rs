//! Conversions between Lua values and host strings/options.

use mlua::prelude::*;

use crate::opts::OptValue;

/// Render a Lua argument as host text.  Strings pass through, numbers use
/// Lua's own formatting and booleans become `true`/`false`; everything else
/// is the empty string.
pub fn to_host_string(v: &LuaValue) -> String {
    match v {
        LuaValue::String(s) => s.to_string_lossy().to_string(),
        LuaValue::Integer(i) => i.to_string(),
        LuaValue::Number(n) => number_to_string(*n),
        LuaValue::Boolean(b) => b.to_string(),
        _ => String::new(),
    }
}

/// `tostring` for floats: integral values keep a trailing `.0`.
fn number_to_string(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 {
        format!("{n:.1}")
    } else {
        n.to_string()
    }
}

/// Strings and numbers, the values a completion list may contain.
pub fn is_text(v: &LuaValue) -> bool {
    matches!(v, LuaValue::String(_) | LuaValue::Integer(_) | LuaValue::Number(_))
}

/// Argument `i` as host text; missing arguments are empty.
pub fn arg(args: &[LuaValue], i: usize) -> String {
    args.get(i).map(to_host_string).unwrap_or_default()
}

/// Arguments from index `from` onward as host text.
pub fn rest(args: &[LuaValue], from: usize) -> Vec<String> {
    args.iter().skip(from).map(to_host_string).collect()
}

/// Push an option value as Lua return values.  Lists spread into one value
/// per element; an unknown option is `nil, "unknown option: <name>"`.
pub fn opt_to_lua(lua: &Lua, name: &str, value: Option<OptValue>) -> LuaResult<LuaMultiValue> {
    let values: Vec<LuaValue> = match value {
        None => vec![
            LuaValue::Nil,
            LuaValue::String(lua.create_string(format!("unknown option: {name}"))?),
        ],
        Some(OptValue::Bool(b)) => vec![LuaValue::Boolean(b)],
        Some(OptValue::Int(n)) => vec![LuaValue::Integer(n)],
        Some(OptValue::Str(s)) => vec![LuaValue::String(lua.create_string(&s)?)],
        Some(OptValue::IntList(items)) => items.into_iter().map(LuaValue::Integer).collect(),
        Some(OptValue::StrList(items)) => items
            .iter()
            .map(|s| lua.create_string(s).map(LuaValue::String))
            .collect::<LuaResult<_>>()?,
    };
    Ok(LuaMultiValue::from_vec(values))
}
