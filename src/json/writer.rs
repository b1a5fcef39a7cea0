//! Emits extended JSON from a BSON document view.
//!
//! Follows the same legacy/shell-mode extended-JSON key set the reader accepts (`$oid`, `$date`,
//! `$timestamp`, `$regex`/`$options`, `$ref`/`$id`, `$binary`/`$type`, `$undefined`, `$minkey`,
//! `$maxkey`), so `write_document(read_document(s)?)` round-trips for every shape those two
//! modules agree on.
//!
//! A `code_w_scope` value is always written as both `"$code"` and `"$scope"` keys — never eliding
//! the scope document, even when it is empty.

use base64::Engine;

use crate::raw::{array::RawArray, doc::RawDocument, elem::RawBsonRef};

/// Renders `doc` as extended JSON text.
pub fn write_document(doc: &RawDocument) -> crate::json::error::Result<String> {
    let mut out = String::new();
    write_object(doc, &mut out)?;
    Ok(out)
}

/// Renders `doc` as extended JSON text with its top-level keys sorted by the full element
/// ordering (name, then tag, then value) instead of wire order — for callers presenting a
/// document as an ordered set rather than a sequence.
pub fn write_document_sorted(
    doc: &RawDocument,
    ordering: crate::raw::NameOrdering,
) -> crate::json::error::Result<String> {
    let mut out = String::new();
    out.push('{');
    let mut first = true;
    for (key, value) in doc.elements_sorted(ordering).map_err(wrap_codec_error)? {
        if !first {
            out.push(',');
        }
        first = false;
        write_json_string(key, &mut out);
        out.push(':');
        write_value(value, &mut out)?;
    }
    out.push('}');
    Ok(out)
}

fn write_object(doc: &RawDocument, out: &mut String) -> crate::json::error::Result<()> {
    out.push('{');
    let mut first = true;
    for item in doc.iter() {
        let (key, value) = item.map_err(wrap_codec_error)?;
        if !first {
            out.push(',');
        }
        first = false;
        write_json_string(key, out);
        out.push(':');
        write_value(value, out)?;
    }
    out.push('}');
    Ok(())
}

fn write_array(arr: &RawArray, out: &mut String) -> crate::json::error::Result<()> {
    out.push('[');
    let mut first = true;
    for item in arr.iter() {
        let value = item.map_err(wrap_codec_error)?;
        if !first {
            out.push(',');
        }
        first = false;
        write_value(value, out)?;
    }
    out.push(']');
    Ok(())
}

fn write_value(value: RawBsonRef<'_>, out: &mut String) -> crate::json::error::Result<()> {
    match value {
        RawBsonRef::Double(v) => out.push_str(&format_double(v)?),
        RawBsonRef::String(v) => write_json_string(v, out),
        RawBsonRef::Document(v) => write_object(v, out)?,
        RawBsonRef::Array(v) => write_array(v, out)?,
        RawBsonRef::Binary(v) => {
            out.push_str("{\"$binary\":");
            write_json_string(
                &base64::engine::general_purpose::STANDARD.encode(v.bytes),
                out,
            );
            out.push_str(",\"$type\":");
            write_json_string(&format!("{:02x}", u8::from(v.subtype)), out);
            out.push('}');
        }
        RawBsonRef::Undefined => out.push_str("{\"$undefined\":true}"),
        RawBsonRef::ObjectId(v) => {
            out.push_str("{\"$oid\":");
            write_json_string(&v.to_hex(), out);
            out.push('}');
        }
        RawBsonRef::Boolean(v) => out.push_str(if v { "true" } else { "false" }),
        RawBsonRef::DateTime(millis) => {
            out.push_str("{\"$date\":");
            out.push_str(&millis.to_string());
            out.push('}');
        }
        RawBsonRef::Null => out.push_str("null"),
        RawBsonRef::RegularExpression(v) => {
            out.push_str("{\"$regex\":");
            write_json_string(v.pattern, out);
            out.push_str(",\"$options\":");
            write_json_string(v.options, out);
            out.push('}');
        }
        RawBsonRef::DbPointer(v) => {
            out.push_str("{\"$ref\":");
            write_json_string(v.namespace, out);
            out.push_str(",\"$id\":");
            write_json_string(&v.id.to_hex(), out);
            out.push('}');
        }
        RawBsonRef::JavaScriptCode(v) => {
            out.push_str("{\"$code\":");
            write_json_string(v, out);
            out.push('}');
        }
        RawBsonRef::Symbol(v) => write_json_string(v, out),
        RawBsonRef::JavaScriptCodeWithScope(v) => {
            out.push_str("{\"$code\":");
            write_json_string(v.code, out);
            out.push_str(",\"$scope\":");
            write_object(v.scope, out)?;
            out.push('}');
        }
        RawBsonRef::Int32(v) => out.push_str(&v.to_string()),
        RawBsonRef::Timestamp(v) => {
            out.push_str(&format!(
                "{{\"$timestamp\":{{\"t\":{},\"i\":{}}}}}",
                v.time, v.increment
            ));
        }
        RawBsonRef::Int64(v) => out.push_str(&v.to_string()),
        RawBsonRef::MinKey => out.push_str("{\"$minkey\":1}"),
        RawBsonRef::MaxKey => out.push_str("{\"$maxkey\":1}"),
    }
    Ok(())
}

/// Renders a finite double to 8 significant digits, in fixed or scientific notation depending on
/// magnitude. NaN and infinite values have no JSON representation and are rejected outright rather
/// than written as non-standard tokens.
fn format_double(v: f64) -> crate::json::error::Result<String> {
    if !v.is_finite() {
        return Err(crate::json::error::JsonError {
            kind: crate::json::error::JsonErrorKind::InvalidExtendedJson {
                message: "cannot write a NaN or infinite double as JSON".into(),
            },
            line: 0,
            column: 0,
            snippet: String::new(),
            expected: crate::json::error::Expected::Value,
        });
    }
    if v == 0.0 {
        return Ok(if v.is_sign_negative() { "-0.0" } else { "0.0" }.to_string());
    }

    let negative = v.is_sign_negative();
    let sci = format!("{:.7e}", v.abs());
    let (mantissa_str, exp_str) = sci.split_once('e').expect("scientific format has an exponent");
    let exp: i32 = exp_str.parse().expect("exponent is a valid integer");
    let digits: String = mantissa_str.chars().filter(|c| c.is_ascii_digit()).collect();

    let mut result = if (-4..8).contains(&exp) {
        render_fixed(&digits, exp)
    } else {
        render_scientific(&digits, exp)
    };
    if negative {
        result.insert(0, '-');
    }
    Ok(result)
}

/// `digits` holds exactly 8 significant digits; the decimal point sits after `exp + 1` of them.
fn render_fixed(digits: &str, exp: i32) -> String {
    let point = exp + 1;
    let mut out = String::new();
    if point <= 0 {
        out.push_str("0.");
        out.push_str(&"0".repeat((-point) as usize));
        out.push_str(digits);
    } else if point as usize >= digits.len() {
        out.push_str(digits);
        out.push_str(&"0".repeat(point as usize - digits.len()));
        out.push_str(".0");
    } else {
        out.push_str(&digits[..point as usize]);
        out.push('.');
        out.push_str(&digits[point as usize..]);
    }
    trim_trailing_zeros(&out)
}

fn render_scientific(digits: &str, exp: i32) -> String {
    let mut mantissa = String::new();
    mantissa.push_str(&digits[..1]);
    mantissa.push('.');
    mantissa.push_str(&digits[1..]);
    let mantissa = trim_trailing_zeros(&mantissa);
    format!("{mantissa}e{}{}", if exp >= 0 { "+" } else { "-" }, exp.abs())
}

fn trim_trailing_zeros(s: &str) -> String {
    if !s.contains('.') {
        return s.to_string();
    }
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    if trimmed.contains('.') {
        trimmed.to_string()
    } else {
        format!("{trimmed}.0")
    }
}

fn write_json_string(s: &str, out: &mut String) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

fn wrap_codec_error(e: crate::error::Error) -> crate::json::error::JsonError {
    crate::json::error::JsonError {
        kind: crate::json::error::JsonErrorKind::InvalidExtendedJson {
            message: e.to_string(),
        },
        line: 0,
        column: 0,
        snippet: String::new(),
        expected: crate::json::error::Expected::Value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{json::reader::read_document, raw::RawDocument};

    #[test]
    fn round_trips_oid() {
        let input = r#"{"_id": {"$oid": "507f1f77bcf86cd799439011"}}"#;
        let bytes = read_document(input).unwrap();
        let doc = RawDocument::from_bytes(&bytes).unwrap();
        let written = write_document(doc).unwrap();
        let reread = read_document(&written).unwrap();
        assert_eq!(bytes, reread);
    }

    #[test]
    fn writes_plain_values() {
        let bytes = read_document(r#"{"a": 1, "b": "x", "c": true, "d": null}"#).unwrap();
        let doc = RawDocument::from_bytes(&bytes).unwrap();
        let written = write_document(doc).unwrap();
        assert!(written.contains("\"a\":1"));
        assert!(written.contains("\"b\":\"x\""));
        assert!(written.contains("\"c\":true"));
        assert!(written.contains("\"d\":null"));
    }

    #[test]
    fn sorted_write_orders_keys_by_name() {
        let bytes = read_document(r#"{"c": 1, "a": 2, "b": 3}"#).unwrap();
        let doc = RawDocument::from_bytes(&bytes).unwrap();
        let written = write_document_sorted(doc, crate::raw::NameOrdering::ByteWise).unwrap();
        let a = written.find("\"a\"").unwrap();
        let b = written.find("\"b\"").unwrap();
        let c = written.find("\"c\"").unwrap();
        assert!(a < b && b < c);
    }

    #[test]
    fn formats_double_to_eight_significant_digits() {
        assert_eq!(format_double(1.0).unwrap(), "1.0");
        assert_eq!(format_double(0.5).unwrap(), "0.5");
        assert_eq!(format_double(1.0 / 3.0).unwrap(), "0.33333333");
        assert_eq!(format_double(-2.5).unwrap(), "-2.5");
    }

    #[test]
    fn format_double_rejects_non_finite_values() {
        assert!(format_double(f64::NAN).is_err());
        assert!(format_double(f64::INFINITY).is_err());
        assert!(format_double(f64::NEG_INFINITY).is_err());
    }

    #[test]
    fn scoped_javascript_always_includes_scope() {
        use crate::raw::builder::DocumentBuilder;
        let mut b = DocumentBuilder::new();
        let empty_scope = crate::raw::RawDocumentBuf::new();
        b.append_javascript_with_scope("fn", "function() {}", &empty_scope)
            .unwrap();
        let bytes = b.finish();
        let doc = RawDocument::from_bytes(&bytes).unwrap();
        let written = write_document(doc).unwrap();
        assert!(written.contains("\"$code\""));
        assert!(written.contains("\"$scope\":{}"));
    }
}
