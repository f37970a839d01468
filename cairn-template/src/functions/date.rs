//! Date formatting helpers
//!
//! Patterns use the `SimpleDateFormat` letters build administrators already
//! know from label templates (`yyyy_MM_dd`, `HHmmss`, ...). Each run of a
//! pattern letter is translated to the matching chrono specifier.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};

use crate::function::{CallContext, FunctionMetadata, TemplateFunction, Value, expect_args};

/// Formats `now` using a `SimpleDateFormat`-style pattern
///
/// Supported letters: `y M d H h m s S a E Z z`. Text between single quotes
/// is copied verbatim and `''` produces a single quote.
///
/// # Errors
/// Returns a message for unsupported letters or an unterminated quote.
///
/// # Example
/// ```
/// use cairn_template::functions::format_java_pattern;
/// use chrono::{TimeZone, Utc};
///
/// let now = Utc.with_ymd_and_hms(2024, 1, 31, 8, 5, 9).unwrap();
/// assert_eq!(format_java_pattern(&now, "yyyy_MM_dd").unwrap(), "2024_01_31");
/// ```
pub fn format_java_pattern<Tz>(now: &DateTime<Tz>, pattern: &str) -> Result<String, String>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    let mut out = String::new();
    let mut chars = pattern.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                chars.next();
                out.push('\'');
                continue;
            }
            let mut closed = false;
            while let Some(q) = chars.next() {
                if q == '\'' {
                    if chars.peek() == Some(&'\'') {
                        chars.next();
                        out.push('\'');
                        continue;
                    }
                    closed = true;
                    break;
                }
                out.push(q);
            }
            if !closed {
                return Err(format!("unterminated quote in date pattern '{}'", pattern));
            }
            continue;
        }

        if !c.is_ascii_alphabetic() {
            out.push(c);
            continue;
        }

        let mut count = 1;
        while chars.peek() == Some(&c) {
            chars.next();
            count += 1;
        }
        out.push_str(&format_field(now, c, count)?);
    }

    Ok(out)
}

/// Longest run of one pattern letter
const MAX_FIELD_WIDTH: usize = 64;

fn format_field<Tz>(now: &DateTime<Tz>, letter: char, count: usize) -> Result<String, String>
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    if count > MAX_FIELD_WIDTH {
        return Err(format!(
            "date pattern field too long: {} repeated {} times",
            letter, count
        ));
    }

    let padded = |value: u32| format!("{:0width$}", value, width = count);

    let field = match letter {
        'y' if count == 2 => format!("{:02}", now.year().rem_euclid(100)),
        'y' => format!("{:0width$}", now.year(), width = count),
        'M' if count >= 4 => now.format("%B").to_string(),
        'M' if count == 3 => now.format("%b").to_string(),
        'M' => padded(now.month()),
        'd' => padded(now.day()),
        'H' => padded(now.hour()),
        'h' => padded(now.hour12().1),
        'm' => padded(now.minute()),
        's' => padded(now.second()),
        'S' => padded(now.timestamp_subsec_millis()),
        'a' => now.format("%p").to_string(),
        'E' if count >= 4 => now.format("%A").to_string(),
        'E' => now.format("%a").to_string(),
        'Z' => now.format("%z").to_string(),
        'z' => now.offset().to_string(),
        other => return Err(format!("unsupported date pattern letter '{}'", other)),
    };

    Ok(field)
}

fn pattern_arg<'a>(name: &str, args: &'a [Value]) -> Result<&'a str, String> {
    let args = expect_args(name, args, 1)?;
    args[0]
        .as_str()
        .ok_or_else(|| format!("{}() needs a date pattern", name))
}

/// `date(pattern)`: the current local time
pub struct DateFunction;

impl TemplateFunction for DateFunction {
    fn name(&self) -> &'static str {
        "date"
    }

    fn call(&self, ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
        let pattern = pattern_arg(self.name(), args)?;
        format_java_pattern(&ctx.now, pattern).map(Value::Str)
    }

    fn metadata(&self) -> FunctionMetadata {
        FunctionMetadata {
            name: self.name(),
            signature: "date(pattern)",
            description: "Current local date/time, e.g. date('yyyy_MM_dd')",
        }
    }
}

/// `utc(pattern)`: the current time in UTC
pub struct UtcDateFunction;

impl TemplateFunction for UtcDateFunction {
    fn name(&self) -> &'static str {
        "utc"
    }

    fn call(&self, ctx: &CallContext, args: &[Value]) -> Result<Value, String> {
        let pattern = pattern_arg(self.name(), args)?;
        format_java_pattern(&ctx.now.with_timezone(&Utc), pattern).map(Value::Str)
    }

    fn metadata(&self) -> FunctionMetadata {
        FunctionMetadata {
            name: self.name(),
            signature: "utc(pattern)",
            description: "Current UTC date/time, e.g. utc('yyyyMMdd-HHmm')",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(2 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 7, 9, 5, 4)
            .unwrap()
    }

    #[test]
    fn test_common_patterns() {
        assert_eq!(format_java_pattern(&now(), "yyyy_MM_dd").unwrap(), "2024_03_07");
        assert_eq!(format_java_pattern(&now(), "yyyyMMdd-HHmmss").unwrap(), "20240307-090504");
        assert_eq!(format_java_pattern(&now(), "yy.M.d").unwrap(), "24.3.7");
        assert_eq!(format_java_pattern(&now(), "SSS").unwrap(), "000");
    }

    #[test]
    fn test_text_fields() {
        assert_eq!(format_java_pattern(&now(), "MMM").unwrap(), "Mar");
        assert_eq!(format_java_pattern(&now(), "MMMM").unwrap(), "March");
        assert_eq!(format_java_pattern(&now(), "EEE").unwrap(), "Thu");
        assert_eq!(format_java_pattern(&now(), "EEEE").unwrap(), "Thursday");
        assert_eq!(format_java_pattern(&now(), "hh a").unwrap(), "09 AM");
        assert_eq!(format_java_pattern(&now(), "Z").unwrap(), "+0200");
    }

    #[test]
    fn test_quoted_literals() {
        assert_eq!(
            format_java_pattern(&now(), "'build' yyyy").unwrap(),
            "build 2024"
        );
        assert_eq!(format_java_pattern(&now(), "dd''MM").unwrap(), "07'03");
        assert_eq!(format_java_pattern(&now(), "'it''s' d").unwrap(), "it's 7");
    }

    #[test]
    fn test_unsupported_letter() {
        let err = format_java_pattern(&now(), "yyyy-QQ").unwrap_err();
        assert!(err.contains("'Q'"));
    }

    #[test]
    fn test_overlong_field_is_rejected() {
        let pattern = "d".repeat(70_000);
        let err = format_java_pattern(&now(), &pattern).unwrap_err();
        assert!(err.contains("date pattern field too long"));

        assert_eq!(format_java_pattern(&now(), &"d".repeat(4)).unwrap(), "0007");
    }

    #[test]
    fn test_unterminated_quote() {
        assert!(format_java_pattern(&now(), "'oops").is_err());
    }

    #[test]
    fn test_date_and_utc_functions() {
        let ctx = CallContext { now: now() };
        let pattern = [Value::Str("HH".to_string())];

        assert_eq!(DateFunction.call(&ctx, &pattern), Ok(Value::Str("09".to_string())));
        assert_eq!(UtcDateFunction.call(&ctx, &pattern), Ok(Value::Str("07".to_string())));
    }

    #[test]
    fn test_date_function_needs_pattern() {
        let ctx = CallContext { now: now() };
        assert!(DateFunction.call(&ctx, &[]).is_err());
        assert!(DateFunction.call(&ctx, &[Value::Null]).is_err());
    }
}
