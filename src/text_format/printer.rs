use std::cmp::Ordering;

use crate::descriptor::FieldDescriptor;
use crate::google::protobuf::field_descriptor_proto::Type;
use crate::reflection::{DynamicMessage, FieldStorage, Value};
use crate::unknown_fields::{UnknownFieldSet, UnknownValue};

/// Levels of length-delimited unknown fields tried as embedded messages.
const UNKNOWN_NESTING_BUDGET: usize = 100;

/// Text-format printer configuration.
#[derive(Clone, Debug)]
pub struct Printer {
    single_line_mode: bool,
    initial_indent_level: usize,
    print_unknown_fields: bool,
    use_short_repeated_primitives: bool,
    print_message_fields_in_index_order: bool,
    utf8_strings: bool,
}

impl Default for Printer {
    fn default() -> Self {
        Self::new()
    }
}

impl Printer {
    pub fn new() -> Self {
        Printer {
            single_line_mode: false,
            initial_indent_level: 0,
            print_unknown_fields: true,
            use_short_repeated_primitives: false,
            print_message_fields_in_index_order: false,
            utf8_strings: false,
        }
    }

    /// Everything on one line, fields separated by spaces.
    pub fn single_line_mode(mut self, single_line_mode: bool) -> Self {
        self.single_line_mode = single_line_mode;
        self
    }

    pub fn initial_indent_level(mut self, level: usize) -> Self {
        self.initial_indent_level = level;
        self
    }

    pub fn print_unknown_fields(mut self, print: bool) -> Self {
        self.print_unknown_fields = print;
        self
    }

    /// Repeated scalars as `name: [1, 2, 3]`.
    pub fn use_short_repeated_primitives(mut self, short: bool) -> Self {
        self.use_short_repeated_primitives = short;
        self
    }

    /// Declaration order instead of field-number order, extensions last.
    pub fn print_message_fields_in_index_order(mut self, index_order: bool) -> Self {
        self.print_message_fields_in_index_order = index_order;
        self
    }

    /// Leaves valid UTF-8 in strings unescaped.
    pub fn utf8_strings(mut self, utf8: bool) -> Self {
        self.utf8_strings = utf8;
        self
    }

    pub fn print_to_string(&self, message: &DynamicMessage) -> String {
        let mut out = TextGenerator::new(self.initial_indent_level);
        self.print_message(message, &mut out);
        out.text
    }

    /// One value of `field`: element `index` of a repeated field, or the
    /// singular value (default included) when `index` is `None`.
    pub fn print_field_value_to_string(
        &self,
        message: &DynamicMessage,
        field: &FieldDescriptor,
        index: Option<usize>,
    ) -> String {
        let mut out = TextGenerator::new(self.initial_indent_level);
        let value = match index {
            Some(index) => message.get_repeated(field, index).cloned(),
            None if field.is_list() => None,
            None => Some(message.get_field(field).into_owned()),
        };
        if let Some(value) = value {
            self.print_value(field, &value, &mut out);
        }
        out.text
    }

    pub fn print_unknown_fields_to_string(&self, unknown: &UnknownFieldSet) -> String {
        let mut out = TextGenerator::new(self.initial_indent_level);
        self.print_unknown(unknown, UNKNOWN_NESTING_BUDGET, &mut out);
        out.text
    }

    fn line_end(&self) -> &'static str {
        if self.single_line_mode { " " } else { "\n" }
    }

    fn print_message(&self, message: &DynamicMessage, out: &mut TextGenerator) {
        let mut fields: Vec<(&FieldDescriptor, &FieldStorage)> = message.present_entries().collect();
        if self.print_message_fields_in_index_order {
            fields.sort_by(|(a, _), (b, _)| index_order(a, b));
        }
        for (field, storage) in fields {
            let values = match storage {
                FieldStorage::Singular { value, .. } => std::slice::from_ref(value),
                FieldStorage::Repeated(values) => &values[..],
            };
            self.print_field(field, values, out);
        }
        if self.print_unknown_fields {
            self.print_unknown(message.unknown_fields(), UNKNOWN_NESTING_BUDGET, out);
        }
    }

    fn print_field(&self, field: &FieldDescriptor, values: &[Value], out: &mut TextGenerator) {
        let is_scalar = !matches!(
            field.field_type(),
            Type::String | Type::Bytes | Type::Message | Type::Group
        );
        if self.use_short_repeated_primitives && field.is_list() && is_scalar {
            print_field_name(field, out);
            out.write(": [");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    out.write(", ");
                }
                self.print_value(field, value, out);
            }
            out.write("]");
            out.write(self.line_end());
            return;
        }

        for value in values {
            print_field_name(field, out);
            if let Value::Message(sub) = value {
                out.write(" {");
                out.write(self.line_end());
                out.indent();
                self.print_message(sub, out);
                out.outdent();
                out.write("}");
            } else {
                out.write(": ");
                self.print_value(field, value, out);
            }
            out.write(self.line_end());
        }
    }

    fn print_value(&self, field: &FieldDescriptor, value: &Value, out: &mut TextGenerator) {
        match value {
            Value::Bool(b) => out.write(if *b { "true" } else { "false" }),
            Value::I32(v) => out.write(&v.to_string()),
            Value::I64(v) => out.write(&v.to_string()),
            Value::U32(v) => out.write(&v.to_string()),
            Value::U64(v) => out.write(&v.to_string()),
            Value::F32(v) => out.write(&format_float(*v)),
            Value::F64(v) => out.write(&format_double(*v)),
            Value::String(s) => self.print_quoted(s.as_bytes(), out),
            Value::Bytes(b) => self.print_quoted(b, out),
            Value::EnumNumber(number) => {
                let name = field
                    .enum_type()
                    .and_then(|e| e.get_value(*number))
                    .map(|v| v.name().to_owned());
                out.write(&name.unwrap_or_else(|| number.to_string()));
            }
            Value::Message(sub) => self.print_message(sub, out),
            Value::List(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.write(", ");
                    }
                    self.print_value(field, item, out);
                }
            }
        }
    }

    fn print_quoted(&self, bytes: &[u8], out: &mut TextGenerator) {
        let escaped = if self.utf8_strings && std::str::from_utf8(bytes).is_ok() {
            c_escape(bytes, true)
        } else {
            c_escape(bytes, false)
        };
        out.write("\"");
        out.write(&escaped);
        out.write("\"");
    }

    fn print_unknown(&self, unknown: &UnknownFieldSet, budget: usize, out: &mut TextGenerator) {
        for field in unknown {
            let number = field.number();
            let line = match field.value() {
                UnknownValue::Varint(v) => format!("{number}: {v}"),
                UnknownValue::Fixed32(v) => format!("{number}: 0x{v:08x}"),
                UnknownValue::Fixed64(v) => format!("{number}: 0x{v:016x}"),
                UnknownValue::LengthDelimited(bytes) => {
                    // Anything that parses as a field set is probably an
                    // embedded message. Past the nesting budget it stays bytes.
                    let embedded = if bytes.is_empty() || budget == 0 {
                        None
                    } else {
                        UnknownFieldSet::parse(bytes).ok()
                    };
                    match embedded {
                        Some(embedded) => {
                            self.print_unknown_block(number, &embedded, budget - 1, out);
                            continue;
                        }
                        None => format!("{number}: \"{}\"", c_escape(bytes, false)),
                    }
                }
                UnknownValue::Group(group) => {
                    self.print_unknown_block(number, group, budget.saturating_sub(1), out);
                    continue;
                }
            };
            out.write(&line);
            out.write(self.line_end());
        }
    }

    fn print_unknown_block(
        &self,
        number: u32,
        fields: &UnknownFieldSet,
        budget: usize,
        out: &mut TextGenerator,
    ) {
        out.write(&format!("{number} {{"));
        out.write(self.line_end());
        out.indent();
        self.print_unknown(fields, budget, out);
        out.outdent();
        out.write("}");
        out.write(self.line_end());
    }
}

/// Fields first in declaration order, then extensions by number.
fn index_order(a: &FieldDescriptor, b: &FieldDescriptor) -> Ordering {
    match (a.is_extension(), b.is_extension()) {
        (true, true) => a.number().cmp(&b.number()),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.index().cmp(&b.index()),
    }
}

fn print_field_name(field: &FieldDescriptor, out: &mut TextGenerator) {
    if field.is_extension() {
        out.write("[");
        // MessageSet items are named by the type they carry.
        let message_set_item = field.containing_type().is_message_set()
            && field.field_type() == Type::Message
            && !field.is_list()
            && !field.is_required()
            && field.extension_scope().is_some()
            && field.extension_scope() == field.message_type();
        match field.message_type() {
            Some(carried) if message_set_item => out.write(carried.full_name()),
            _ => out.write(field.full_name()),
        }
        out.write("]");
    } else if field.is_group() {
        match field.message_type() {
            Some(group) => out.write(group.name()),
            None => out.write(field.name()),
        }
    } else {
        out.write(field.name());
    }
}

/// Collects output and indents each non-empty line.
struct TextGenerator {
    text: String,
    indent: usize,
    at_line_start: bool,
}

impl TextGenerator {
    fn new(indent: usize) -> Self {
        TextGenerator {
            text: String::new(),
            indent,
            at_line_start: true,
        }
    }

    fn indent(&mut self) {
        self.indent += 1;
    }

    fn outdent(&mut self) {
        self.indent = self.indent.saturating_sub(1);
    }

    fn write(&mut self, text: &str) {
        for piece in text.split_inclusive('\n') {
            if self.at_line_start && !piece.starts_with('\n') {
                for _ in 0..self.indent {
                    self.text.push_str("  ");
                }
            }
            self.text.push_str(piece);
            self.at_line_start = piece.ends_with('\n');
        }
    }
}

/// C escaping with 3-digit octal escapes. With `utf8`, bytes from 0x80 up
/// are copied as is.
pub(crate) fn c_escape(bytes: &[u8], utf8: bool) -> String {
    let mut out = Vec::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            b'"' => out.extend_from_slice(b"\\\""),
            b'\'' => out.extend_from_slice(b"\\'"),
            b'\\' => out.extend_from_slice(b"\\\\"),
            0x80.. if utf8 => out.push(b),
            b if b < 0x20 || b >= 0x7f => {
                out.extend_from_slice(format!("\\{b:03o}").as_bytes());
            }
            b => out.push(b),
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Shortest `%g`-style text that reads back as the same double.
pub(crate) fn format_double(value: f64) -> String {
    let short = format_g(value, 15);
    if !value.is_finite() || short.parse::<f64>() == Ok(value) {
        return short;
    }
    format_g(value, 17)
}

pub(crate) fn format_float(value: f32) -> String {
    let short = format_g(f64::from(value), 6);
    if !value.is_finite() || short.parse::<f32>() == Ok(value) {
        return short;
    }
    format_g(f64::from(value), 9)
}

/// C's `%.{precision}g`.
fn format_g(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_owned();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_owned();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_owned();
    }
    let scientific = format!("{:.*e}", precision - 1, value);
    let Some((mantissa, exponent)) = scientific.split_once('e') else {
        return scientific;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if exponent < -4 || exponent >= precision as i32 {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exponent.abs())
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_owned()
    }
}

fn trim_fraction(text: &str) -> &str {
    if text.contains('.') {
        text.trim_end_matches('0').trim_end_matches('.')
    } else {
        text
    }
}
