//! Built-in filters.
//!
//! Every filter shares the same shape: take the current value and the rule
//! arguments, return the new value. String filters pass non-string input
//! through untouched; conversion filters fail with [`RuleError::Conversion`].

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use convert_case::{Case, Casing};
use once_cell::sync::Lazy;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;

use crate::error::RuleError;
use crate::filter_registry::{Filter, FilterRegistry};
use crate::value::Value;

/// Layouts tried in order by `strToTime` when the rule gives none.
const DEFAULT_TIME_LAYOUTS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%Y/%m/%d %H:%M",
];

const DEFAULT_DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Query escaping: everything except unreserved characters.
const QUERY_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

static EMAIL_ILLEGAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9!#$%&'*+\-=?^_`{|}~@.\[\]]").unwrap());

/// Register every built-in filter into `registry`.
pub fn register_all(registry: &mut FilterRegistry) {
    registry.register("trim", trim);
    registry.register("ltrim", ltrim);
    registry.register("rtrim", rtrim);
    registry.register("upper", upper);
    registry.register("lower", lower);
    registry.register("ucFirst", uc_first);
    registry.register("lcFirst", lc_first);
    registry.register("ucWord", uc_word);
    registry.register("snake", snake);
    registry.register("camel", camel);
    registry.register("email", email);

    registry.register("int", int);
    registry.register("int64", int);
    registry.register("uint", uint);
    registry.register("float", float);
    registry.register("bool", boolean);

    registry.register_filter("strToArray", Filter::new(str_to_array).with_min_args(1));
    registry.register("stringsToInts", strings_to_ints);
    registry.register("unique", unique);
    registry.register_filter("substr", Filter::new(substr).with_min_args(1));
    registry.register("strToTime", str_to_time);

    registry.register("urlEncode", url_encode);
    registry.register("urlDecode", url_decode);
}

/// Apply `f` to string input, pass anything else through.
fn map_str(value: &Value, f: impl FnOnce(&str) -> String) -> Value {
    match value {
        Value::String(s) => Value::String(f(s)),
        other => other.clone(),
    }
}

fn conversion_error(filter: &str, value: &Value, target: &str) -> RuleError {
    RuleError::conversion(
        filter,
        format!("cannot convert {} '{}' to {}", value.type_name(), value, target),
    )
}

fn trim(value: &Value, _args: &[String]) -> Result<Value, RuleError> {
    Ok(map_str(value, |s| s.trim().to_string()))
}

fn ltrim(value: &Value, _args: &[String]) -> Result<Value, RuleError> {
    Ok(map_str(value, |s| s.trim_start().to_string()))
}

fn rtrim(value: &Value, _args: &[String]) -> Result<Value, RuleError> {
    Ok(map_str(value, |s| s.trim_end().to_string()))
}

fn upper(value: &Value, _args: &[String]) -> Result<Value, RuleError> {
    Ok(map_str(value, str::to_uppercase))
}

fn lower(value: &Value, _args: &[String]) -> Result<Value, RuleError> {
    Ok(map_str(value, str::to_lowercase))
}

fn uc_first(value: &Value, _args: &[String]) -> Result<Value, RuleError> {
    Ok(map_str(value, |s| {
        let mut chars = s.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }))
}

fn lc_first(value: &Value, _args: &[String]) -> Result<Value, RuleError> {
    Ok(map_str(value, |s| {
        let mut chars = s.chars();
        match chars.next() {
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    }))
}

/// Upper-case the first letter of every whitespace separated word.
fn uc_word(value: &Value, _args: &[String]) -> Result<Value, RuleError> {
    Ok(map_str(value, |s| {
        let mut out = String::with_capacity(s.len());
        let mut at_word_start = true;
        for c in s.chars() {
            if at_word_start && !c.is_whitespace() {
                out.extend(c.to_uppercase());
            } else {
                out.push(c);
            }
            at_word_start = c.is_whitespace();
        }
        out
    }))
}

fn snake(value: &Value, _args: &[String]) -> Result<Value, RuleError> {
    Ok(map_str(value, |s| s.to_case(Case::Snake)))
}

fn camel(value: &Value, _args: &[String]) -> Result<Value, RuleError> {
    Ok(map_str(value, |s| s.to_case(Case::Camel)))
}

fn email(value: &Value, _args: &[String]) -> Result<Value, RuleError> {
    Ok(map_str(value, |s| EMAIL_ILLEGAL.replace_all(s.trim(), "").into_owned()))
}

fn int(value: &Value, _args: &[String]) -> Result<Value, RuleError> {
    value
        .to_i64()
        .map(Value::Int)
        .ok_or_else(|| conversion_error("int", value, "int"))
}

fn uint(value: &Value, _args: &[String]) -> Result<Value, RuleError> {
    value
        .to_u64()
        .map(Value::Uint)
        .ok_or_else(|| conversion_error("uint", value, "uint"))
}

fn float(value: &Value, _args: &[String]) -> Result<Value, RuleError> {
    value
        .to_f64()
        .map(Value::Float)
        .ok_or_else(|| conversion_error("float", value, "float"))
}

fn boolean(value: &Value, _args: &[String]) -> Result<Value, RuleError> {
    value
        .to_bool()
        .map(Value::Bool)
        .ok_or_else(|| conversion_error("bool", value, "bool"))
}

/// Split a string on the first argument, trimming parts and dropping empty ones.
fn str_to_array(value: &Value, args: &[String]) -> Result<Value, RuleError> {
    let sep = args
        .first()
        .filter(|sep| !sep.is_empty())
        .ok_or_else(|| RuleError::conversion("strToArray", "missing separator argument"))?;

    Ok(match value {
        Value::String(s) => Value::List(
            s.split(sep.as_str())
                .map(str::trim)
                .filter(|part| !part.is_empty())
                .map(Value::from)
                .collect(),
        ),
        other => other.clone(),
    })
}

fn strings_to_ints(value: &Value, _args: &[String]) -> Result<Value, RuleError> {
    let items = value
        .as_list()
        .ok_or_else(|| conversion_error("stringsToInts", value, "list of ints"))?;

    items
        .iter()
        .map(|item| {
            item.to_i64()
                .map(Value::Int)
                .ok_or_else(|| conversion_error("stringsToInts", item, "int"))
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Value::List)
}

/// Drop repeated elements, keeping the first occurrence of each.
fn unique(value: &Value, _args: &[String]) -> Result<Value, RuleError> {
    Ok(match value {
        Value::List(items) => {
            let mut seen: Vec<Value> = Vec::with_capacity(items.len());
            for item in items {
                if !seen.contains(item) {
                    seen.push(item.clone());
                }
            }
            Value::List(seen)
        }
        other => other.clone(),
    })
}

/// `substr:start[,length]` over characters. A negative start counts from the
/// end; both bounds are clamped to the string.
fn substr(value: &Value, args: &[String]) -> Result<Value, RuleError> {
    let parse_arg = |arg: &String| {
        arg.parse::<i64>().map_err(|_| {
            RuleError::conversion("substr", format!("argument '{}' is not an integer", arg))
        })
    };

    let start = args
        .first()
        .ok_or_else(|| RuleError::conversion("substr", "missing start argument"))
        .and_then(parse_arg)?;
    let length = args.get(1).map(parse_arg).transpose()?;

    Ok(map_str(value, |s| {
        let total = s.chars().count() as i64;
        let from = if start < 0 { (total + start).max(0) } else { start.min(total) };
        let take = match length {
            Some(len) => len.max(0).min(total - from),
            None => total - from,
        };
        s.chars().skip(from as usize).take(take as usize).collect()
    }))
}

/// `strToTime[:layout]` with chrono format strings. Date-only layouts resolve
/// to midnight. All results are UTC.
fn str_to_time(value: &Value, args: &[String]) -> Result<Value, RuleError> {
    let text = match value {
        Value::String(s) => s.trim(),
        Value::Time(_) => return Ok(value.clone()),
        other => return Err(conversion_error("strToTime", other, "time")),
    };

    let parsed = match args.first() {
        Some(layout) => parse_time_with(text, layout),
        None => DateTime::parse_from_rfc3339(text)
            .map(|t| t.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                DEFAULT_TIME_LAYOUTS
                    .iter()
                    .chain(DEFAULT_DATE_LAYOUTS)
                    .find_map(|layout| parse_time_with(text, layout))
            }),
    };

    parsed
        .map(Value::Time)
        .ok_or_else(|| conversion_error("strToTime", value, "time"))
}

fn parse_time_with(text: &str, layout: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(text, layout)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(text, layout)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(|naive| naive.and_utc())
}

/// Escape the query part of a URL (everything after the first `?`).
fn url_encode(value: &Value, _args: &[String]) -> Result<Value, RuleError> {
    Ok(map_str(value, |s| match s.split_once('?') {
        Some((base, query)) => {
            let escaped = utf8_percent_encode(query, QUERY_ESCAPE)
                .to_string()
                .replace("%20", "+");
            format!("{}?{}", base, escaped)
        }
        None => s.to_string(),
    }))
}

/// Reverse of `urlEncode`. Undecodable input is returned unchanged.
fn url_decode(value: &Value, _args: &[String]) -> Result<Value, RuleError> {
    Ok(map_str(value, |s| match s.split_once('?') {
        Some((base, query)) => {
            let query = query.replace('+', " ");
            match percent_decode_str(&query).decode_utf8() {
                Ok(decoded) => format!("{}?{}", base, decoded),
                Err(_) => s.to_string(),
            }
        }
        None => s.to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_trim_family() {
        assert_eq!(trim(&Value::from(" a "), &[]).unwrap(), Value::from("a"));
        assert_eq!(ltrim(&Value::from(" a "), &[]).unwrap(), Value::from("a "));
        assert_eq!(rtrim(&Value::from(" a "), &[]).unwrap(), Value::from(" a"));
        assert_eq!(trim(&Value::Int(3), &[]).unwrap(), Value::Int(3));
    }

    #[test]
    fn test_case_filters() {
        assert_eq!(upper(&Value::from("inhere"), &[]).unwrap(), Value::from("INHERE"));
        assert_eq!(uc_first(&Value::from("inhere"), &[]).unwrap(), Value::from("Inhere"));
        assert_eq!(lc_first(&Value::from("Inhere"), &[]).unwrap(), Value::from("inhere"));
        assert_eq!(uc_first(&Value::from(""), &[]).unwrap(), Value::from(""));
        assert_eq!(uc_word(&Value::from("hello world"), &[]).unwrap(), Value::from("Hello World"));
        assert_eq!(snake(&Value::from("helloWorld"), &[]).unwrap(), Value::from("hello_world"));
        assert_eq!(camel(&Value::from("hello_world"), &[]).unwrap(), Value::from("helloWorld"));
        assert_eq!(upper(&Value::Bool(true), &[]).unwrap(), Value::Bool(true));
    }

    #[test]
    fn test_email() {
        assert_eq!(
            email(&Value::from(" my@email.com "), &[]).unwrap(),
            Value::from("my@email.com")
        );
        assert_eq!(email(&Value::from("a b@c<d>.com"), &[]).unwrap(), Value::from("ab@cd.com"));
    }

    #[test]
    fn test_numeric_filters() {
        assert_eq!(int(&Value::from("50"), &[]).unwrap(), Value::Int(50));
        assert_eq!(uint(&Value::from("50"), &[]).unwrap(), Value::Uint(50));
        assert_eq!(float(&Value::from("50.34"), &[]).unwrap(), Value::Float(50.34));
        assert!(matches!(
            int(&Value::from("inhere"), &[]),
            Err(RuleError::Conversion { .. })
        ));
        assert!(uint(&Value::from("-1"), &[]).is_err());
    }

    #[test]
    fn test_bool_filter() {
        assert_eq!(boolean(&Value::from("yes"), &[]).unwrap(), Value::Bool(true));
        assert_eq!(boolean(&Value::from("Off"), &[]).unwrap(), Value::Bool(false));
        assert!(boolean(&Value::from("perhaps"), &[]).is_err());
    }

    #[test]
    fn test_str_to_array() {
        assert_eq!(
            str_to_array(&Value::from("go;lib"), &args(&[";"])).unwrap(),
            Value::from(vec!["go", "lib"])
        );
        assert_eq!(
            str_to_array(&Value::from("a, b,,c"), &args(&[","])).unwrap(),
            Value::from(vec!["a", "b", "c"])
        );
        assert!(str_to_array(&Value::from("a,b"), &[]).is_err());
    }

    #[test]
    fn test_strings_to_ints_keeps_duplicates() {
        let input = Value::from(vec!["1", "2", "2"]);
        assert_eq!(strings_to_ints(&input, &[]).unwrap(), Value::from(vec![1, 2, 2]));
        assert!(strings_to_ints(&Value::from(vec!["1", "x"]), &[]).is_err());
        assert!(strings_to_ints(&Value::from("1"), &[]).is_err());
    }

    #[test]
    fn test_unique_preserves_order() {
        let input = Value::from(vec!["1", "2", "2", "1"]);
        assert_eq!(unique(&input, &[]).unwrap(), Value::from(vec!["1", "2"]));
        assert_eq!(unique(&Value::from("x"), &[]).unwrap(), Value::from("x"));
    }

    #[test]
    fn test_substr() {
        let word = Value::from("helloWorld");
        assert_eq!(substr(&word, &args(&["0", "2"])).unwrap(), Value::from("he"));
        assert_eq!(substr(&word, &args(&["5"])).unwrap(), Value::from("World"));
        assert_eq!(substr(&word, &args(&["-5", "2"])).unwrap(), Value::from("Wo"));
        assert_eq!(substr(&word, &args(&["20", "2"])).unwrap(), Value::from(""));
        assert_eq!(substr(&word, &args(&["8", "20"])).unwrap(), Value::from("ld"));
        assert_eq!(substr(&Value::from("héllo"), &args(&["1", "2"])).unwrap(), Value::from("él"));
        assert!(substr(&word, &args(&["x"])).is_err());
    }

    #[test]
    fn test_str_to_time() {
        let parsed = str_to_time(&Value::from("2018-10-16 12:34"), &[]).unwrap();
        assert_eq!(parsed.to_string(), "2018-10-16 12:34:00 UTC");

        let date_only = str_to_time(&Value::from("2018-10-16"), &[]).unwrap();
        assert_eq!(date_only.to_string(), "2018-10-16 00:00:00 UTC");

        let with_layout = str_to_time(&Value::from("16.10.2018"), &args(&["%d.%m.%Y"])).unwrap();
        assert_eq!(with_layout.to_string(), "2018-10-16 00:00:00 UTC");

        assert!(str_to_time(&Value::from("not a date"), &[]).is_err());
    }

    #[test]
    fn test_url_encoding() {
        assert_eq!(
            url_encode(&Value::from("a.com?p=1"), &[]).unwrap(),
            Value::from("a.com?p%3D1")
        );
        assert_eq!(
            url_decode(&Value::from("a.com?p%3D1+2"), &[]).unwrap(),
            Value::from("a.com?p=1 2")
        );
        assert_eq!(url_encode(&Value::from("a.com"), &[]).unwrap(), Value::from("a.com"));
    }
}
