//! Template filters for dates and XML output.

use std::fmt::Write;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use minijinja::{Environment, Value};

/// Format used by the `date` filter when none is given.
pub const DEFAULT_DATE_FORMAT: &str = "%m-%d-%Y";

/// Register all site filters on an environment.
pub fn register(env: &mut Environment<'_>) {
    env.add_filter("date", date);
    env.add_filter("date_to_xmlschema", date_to_xmlschema);
    env.add_filter("xml_escape", xml_escape);
}

/// Format a date with a strftime-style format string.
///
/// Input that is not a recognizable date, or a malformed format string,
/// yields the input unchanged.
pub fn date(value: &Value, format: Option<&str>) -> String {
    let input = value.to_string();
    let Some(parsed) = parse_date(&input) else {
        return input;
    };

    let mut out = String::new();
    match write!(out, "{}", parsed.format(format.unwrap_or(DEFAULT_DATE_FORMAT))) {
        Ok(()) => out,
        Err(_) => input,
    }
}

/// Format a date as an XML Schema (RFC 3339) timestamp in UTC.
pub fn date_to_xmlschema(value: &Value) -> String {
    let input = value.to_string();
    match parse_date(&input) {
        Some(parsed) => parsed.to_rfc3339(),
        None => input,
    }
}

/// Escape text for use in XML element content and attributes.
pub fn xml_escape(value: &Value) -> String {
    let input = value.to_string();
    html_escape::encode_quoted_attribute(&input).into_owned()
}

fn parse_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = NaiveDateTime::parse_from_str(input, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.and_utc());
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_uses_default_format() {
        assert_eq!(date(&Value::from("2019-03-07"), None), "03-07-2019");
    }

    #[test]
    fn date_uses_given_format() {
        assert_eq!(
            date(&Value::from("2019-03-07"), Some("%B %d, %Y")),
            "March 07, 2019"
        );
    }

    #[test]
    fn date_passes_through_unparseable_input() {
        assert_eq!(date(&Value::from("someday"), None), "someday");
    }

    #[test]
    fn date_survives_bad_format() {
        assert_eq!(date(&Value::from("2019-03-07"), Some("%Q%")), "2019-03-07");
    }

    #[test]
    fn xmlschema_formats_plain_dates_at_midnight_utc() {
        assert_eq!(
            date_to_xmlschema(&Value::from("2019-01-01")),
            "2019-01-01T00:00:00+00:00"
        );
    }

    #[test]
    fn xmlschema_normalizes_offsets() {
        assert_eq!(
            date_to_xmlschema(&Value::from("2019-01-01T02:00:00+02:00")),
            "2019-01-01T00:00:00+00:00"
        );
    }

    #[test]
    fn xml_escape_escapes_markup() {
        let escaped = xml_escape(&Value::from(r#"Tom & "Jerry" <tv> 'show'"#));

        assert!(escaped.starts_with("Tom &amp; &quot;Jerry&quot; &lt;tv&gt; "));
        assert!(!escaped.contains('\''));
        assert!(!escaped.contains('<'));
    }

    #[test]
    fn filters_are_usable_from_templates() {
        let mut env = Environment::new();
        register(&mut env);

        let out = env
            .render_str(
                "{{ d | date('%Y/%m/%d') }} {{ d | date_to_xmlschema }} {{ t | xml_escape }}",
                minijinja::context! { d => "2020-02-29", t => "a<b" },
            )
            .unwrap();

        assert_eq!(out, "2020/02/29 2020-02-29T00:00:00+00:00 a&lt;b");
    }
}
