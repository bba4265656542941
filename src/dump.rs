//! Format decoded values for display (one-line summary or indented tree), and
//! parse hex text back into bytes.

use crate::timestamp::Timestamp;
use crate::value::Value;

/// Raw scalar string; `None` for containers.
pub fn format_scalar_raw(v: &Value) -> Option<String> {
    let s = match v {
        Value::Nil => "nil".to_string(),
        Value::Bool(x) => format!("{}", x),
        Value::Int(x) => format!("{}", x),
        Value::UInt(x) => format!("{}u", x),
        Value::F32(x) => format!("{:?}f32", x),
        Value::F64(x) => format!("{:?}", x),
        Value::Str(s) => match std::str::from_utf8(s) {
            Ok(s) => format!("{:?}", s),
            Err(_) => format!("str(hex({}))", hex_string(s)),
        },
        Value::Bin(b) => format!("hex({})", hex_string(b)),
        Value::Ext(e) => format!("ext({}, hex({}))", e.ext_type, hex_string(&e.data)),
        Value::Host(h) => match h.downcast_ref::<Timestamp>() {
            Some(ts) => format!("timestamp({})", ts),
            None => format!("{:?}", h),
        },
        Value::Array(_) | Value::Map(_) => return None,
    };
    Some(s)
}

pub fn hex_string(b: &[u8]) -> String {
    b.iter().map(|x| format!("{:02x}", x)).collect::<Vec<_>>().join(" ")
}

/// One-line rendering, e.g. `[{"foo": "bar"}, 123, 4.5]`.
pub fn value_summary_line(v: &Value) -> String {
    match v {
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(value_summary_line).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Map(m) => {
            let parts: Vec<String> = m
                .iter()
                .map(|(k, v)| format!("{}: {}", value_summary_line(k), value_summary_line(v)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
        _ => format_scalar_raw(v).unwrap_or_default(),
    }
}

/// Multi-line rendering: one element or entry per line, two spaces per level.
pub fn value_to_dump(v: &Value, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    match v {
        Value::Array(items) if items.is_empty() => format!("{}[]", pad),
        Value::Array(items) => {
            let mut lines: Vec<String> = vec![format!("{}[", pad)];
            for (i, item) in items.iter().enumerate() {
                let sub = value_to_dump(item, indent + 1);
                lines.push(format!("{}  [{}] {}", pad, i, sub.trim_start()));
            }
            lines.push(format!("{}]", pad));
            lines.join("\n")
        }
        Value::Map(m) if m.is_empty() => format!("{}{{}}", pad),
        Value::Map(m) => {
            let mut lines: Vec<String> = vec![format!("{}{{", pad)];
            for (k, val) in m {
                let sub = value_to_dump(val, indent + 1);
                lines.push(format!("{}  {}: {}", pad, value_summary_line(k), sub.trim_start()));
            }
            lines.push(format!("{}}}", pad));
            lines.join("\n")
        }
        _ => format!("{}{}", pad, format_scalar_raw(v).unwrap_or_default()),
    }
}

/// Parse hex text into bytes. Whitespace, commas and `0x` prefixes are ignored.
pub fn parse_hex(text: &str) -> Result<Vec<u8>, String> {
    let digits: String = text
        .split(|c: char| c.is_whitespace() || c == ',')
        .map(|tok| tok.strip_prefix("0x").or_else(|| tok.strip_prefix("0X")).unwrap_or(tok))
        .collect();
    if digits.len() % 2 != 0 {
        return Err(format!("odd number of hex digits ({})", digits.len()));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            let pair = digits.get(i..i + 2).ok_or_else(|| "non-ASCII input".to_string())?;
            u8::from_str_radix(pair, 16).map_err(|_| format!("invalid hex byte {:?}", pair))
        })
        .collect()
}
