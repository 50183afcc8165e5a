//! The `get-current-date` tool.

use crate::mcp::tools::{Argument, Arguments, InputSchema, Kind, Tool, ToolCallError, ToolCallResponse};
use chrono::{DateTime, FixedOffset, Local, Offset, SecondsFormat, Utc};
use serde_json::{Value, json};

/// Reports the current date and time.
///
/// Time zones are limited to UTC, the host's local zone, and fixed offsets.
#[derive(Debug, Clone, Copy, Default)]
pub struct CurrentDate;

impl CurrentDate {
    pub fn new() -> Self {
        CurrentDate
    }
}

impl Tool for CurrentDate {
    fn name(&self) -> &str {
        "get-current-date"
    }

    fn description(&self) -> &str {
        "Returns the current date and time in the requested time zone and format"
    }

    fn input_schema(&self) -> InputSchema {
        InputSchema::new(vec![
            Argument::new(
                "timezone",
                Kind::String,
                "UTC, local, or a fixed offset such as +05:30",
                false,
            )
            .with_default("UTC"),
            Argument::new(
                "format",
                Kind::one_of(["iso", "rfc2822", "unix"]),
                "Format of the `formatted` field",
                false,
            )
            .with_default("iso"),
        ])
    }

    fn call(&self, arguments: &Arguments) -> Result<ToolCallResponse, ToolCallError> {
        let timezone = arguments.opt_str("timezone").unwrap_or("UTC");
        let format = arguments.opt_str("format").unwrap_or("iso");
        let report = describe(Utc::now(), timezone, format)?;
        ToolCallResponse::json(&report)
    }
}

fn describe(now: DateTime<Utc>, timezone: &str, format: &str) -> Result<Value, ToolCallError> {
    let (label, offset) = parse_timezone(timezone)?;
    let local = now.with_timezone(&offset);
    let formatted = match format {
        "iso" => local.to_rfc3339_opts(SecondsFormat::Millis, true),
        "rfc2822" => local.to_rfc2822(),
        "unix" => now.timestamp().to_string(),
        other => return Err(ToolCallError::new(format!("Unsupported format '{other}'"))),
    };
    Ok(json!({
        "timestamp": local.to_rfc3339_opts(SecondsFormat::Millis, true),
        "timezone": label,
        "unix": now.timestamp(),
        "formatted": formatted,
    }))
}

/// Resolves a time zone name to a display label and a fixed offset.
fn parse_timezone(timezone: &str) -> Result<(String, FixedOffset), ToolCallError> {
    let unsupported = || {
        ToolCallError::new(format!(
            "Unsupported timezone '{timezone}': use UTC, local, or an offset like +05:30"
        ))
    };
    let trimmed = timezone.trim();
    if ["utc", "z", "gmt"].iter().any(|n| trimmed.eq_ignore_ascii_case(n)) {
        return Ok(("UTC".to_string(), Utc.fix()));
    }
    if trimmed.eq_ignore_ascii_case("local") {
        let offset = Local::now().offset().fix();
        return Ok((offset.to_string(), offset));
    }

    let (sign, rest) = match trimmed.as_bytes().first() {
        Some(b'+') => (1, &trimmed[1..]),
        Some(b'-') => (-1, &trimmed[1..]),
        _ => return Err(unsupported()),
    };
    // splitting by byte index below needs ASCII
    if !rest.bytes().all(|b| b.is_ascii_digit() || b == b':') {
        return Err(unsupported());
    }
    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().map_err(|_| unsupported())?;
    let minutes: i32 = minutes.parse().map_err(|_| unsupported())?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return Err(unsupported());
    }
    let offset = FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60)).ok_or_else(unsupported)?;
    Ok((offset.to_string(), offset))
}
