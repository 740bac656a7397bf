use std::collections::HashMap;

use log::warn;

use super::tokenizer::{TokenKind, Tokenizer, parse_float, parse_integer, parse_string_append};
use super::{ExtensionFinder, ParseError, ParseErrorCollector};
use crate::decoding::DEFAULT_RECURSION_LIMIT;
use crate::descriptor::{FieldDescriptor, Kind};
use crate::reflection::{DynamicMessage, Value};

/// 0-based position of a field name in the parsed text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParseLocation {
    pub line: usize,
    pub column: usize,
}

/// Where each field occurrence of a parsed message was written, with one
/// nested tree per sub-message occurrence.
#[derive(Debug, Default)]
pub struct ParseInfoTree {
    locations: HashMap<u32, Vec<ParseLocation>>,
    nested: HashMap<u32, Vec<ParseInfoTree>>,
}

impl ParseInfoTree {
    pub fn new() -> Self {
        Self::default()
    }

    fn record_location(&mut self, field: &FieldDescriptor, location: ParseLocation) {
        self.locations.entry(field.number()).or_default().push(location);
    }

    fn create_nested(&mut self, field: &FieldDescriptor) -> &mut ParseInfoTree {
        let trees = self.nested.entry(field.number()).or_default();
        trees.push(ParseInfoTree::default());
        let last = trees.len() - 1;
        &mut trees[last]
    }

    /// Location of occurrence `index` of `field`. Singular fields take
    /// index -1; repeated fields need a real index.
    pub fn get_location(&self, field: &FieldDescriptor, index: i32) -> Option<ParseLocation> {
        let index = checked_index(field, index)?;
        self.locations.get(&field.number())?.get(index).copied()
    }

    pub fn get_tree_for_nested(&self, field: &FieldDescriptor, index: i32) -> Option<&ParseInfoTree> {
        let index = checked_index(field, index)?;
        self.nested.get(&field.number())?.get(index)
    }
}

fn checked_index(field: &FieldDescriptor, index: i32) -> Option<usize> {
    match (field.is_list(), index) {
        (false, -1) => Some(0),
        (true, index) if index >= 0 => usize::try_from(index).ok(),
        _ => None,
    }
}

/// Text-format parser configuration.
///
/// `parse_from_str` rejects a singular field given twice unless
/// [`allow_singular_overwrites`](Self::allow_singular_overwrites) is set;
/// `merge_from_str` always lets the last value win.
pub struct Parser<'a> {
    finder: Option<&'a dyn ExtensionFinder>,
    collector: Option<&'a mut dyn ParseErrorCollector>,
    info_tree: Option<&'a mut ParseInfoTree>,
    allow_case_insensitive_field: bool,
    allow_partial: bool,
    allow_unknown_field: bool,
    allow_singular_overwrites: bool,
    recursion_limit: u32,
}

impl Default for Parser<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> Parser<'a> {
    pub fn new() -> Self {
        Parser {
            finder: None,
            collector: None,
            info_tree: None,
            allow_case_insensitive_field: false,
            allow_partial: false,
            allow_unknown_field: false,
            allow_singular_overwrites: false,
            recursion_limit: DEFAULT_RECURSION_LIMIT,
        }
    }

    /// Resolves `[name]` keys through `finder` instead of the pool the
    /// message type came from.
    pub fn with_finder(mut self, finder: &'a dyn ExtensionFinder) -> Self {
        self.finder = Some(finder);
        self
    }

    /// Sends errors and warnings to `collector`. Without one, warnings are
    /// logged.
    pub fn record_errors_to(mut self, collector: &'a mut dyn ParseErrorCollector) -> Self {
        self.collector = Some(collector);
        self
    }

    pub fn write_locations_to(mut self, tree: &'a mut ParseInfoTree) -> Self {
        self.info_tree = Some(tree);
        self
    }

    /// Matches field names ignoring ASCII case.
    pub fn allow_case_insensitive_field(mut self, allow: bool) -> Self {
        self.allow_case_insensitive_field = allow;
        self
    }

    /// Skips the missing-required-fields check.
    pub fn allow_partial_message(mut self, allow: bool) -> Self {
        self.allow_partial = allow;
        self
    }

    /// Skips unknown fields and extensions with a warning instead of failing.
    pub fn allow_unknown_field(mut self, allow: bool) -> Self {
        self.allow_unknown_field = allow;
        self
    }

    pub fn allow_singular_overwrites(mut self, allow: bool) -> Self {
        self.allow_singular_overwrites = allow;
        self
    }

    /// Maximum sub-message nesting.
    pub fn recursion_limit(mut self, limit: u32) -> Self {
        self.recursion_limit = limit;
        self
    }

    /// Clears `message` and fills it from `text`.
    pub fn parse_from_str(&mut self, text: &str, message: &mut DynamicMessage) -> Result<(), ParseError> {
        message.clear();
        let overwrites = self.allow_singular_overwrites;
        self.run(text, message, overwrites)
    }

    /// Adds the fields in `text` to `message`.
    pub fn merge_from_str(&mut self, text: &str, message: &mut DynamicMessage) -> Result<(), ParseError> {
        self.run(text, message, true)
    }

    /// Parses a single value of `field` (a scalar literal or a `{ ... }`
    /// body) into `message`.
    pub fn parse_field_value_from_string(
        &mut self,
        text: &str,
        field: &FieldDescriptor,
        message: &mut DynamicMessage,
    ) -> Result<(), ParseError> {
        let mut state = self.state(text, true);
        let result = state.parse_field_value(field, message);
        self.report(message, state.warnings, &result);
        result
    }

    fn state<'t>(&self, text: &'t str, overwrites: bool) -> ParserState<'t>
    where
        'a: 't,
    {
        ParserState {
            tokenizer: Tokenizer::new(text),
            finder: self.finder,
            allow_case_insensitive_field: self.allow_case_insensitive_field,
            allow_unknown_field: self.allow_unknown_field,
            singular_overwrites: overwrites,
            recursion_budget: self.recursion_limit,
            warnings: Vec::new(),
        }
    }

    fn run(&mut self, text: &str, message: &mut DynamicMessage, overwrites: bool) -> Result<(), ParseError> {
        let mut state = self.state(text, overwrites);
        let mut result = state.parse(message, self.info_tree.as_deref_mut());
        if result.is_ok() && !self.allow_partial {
            let missing = message.find_initialization_errors();
            if !missing.is_empty() {
                result = Err(ParseError::without_position(format!(
                    "Message missing required fields: {}",
                    missing.join(", ")
                )));
            }
        }
        self.report(message, state.warnings, &result);
        result
    }

    fn report(&mut self, message: &DynamicMessage, warnings: Vec<ParseError>, result: &Result<(), ParseError>) {
        match self.collector.as_deref_mut() {
            Some(collector) => {
                for warning in &warnings {
                    collector.add_warning(warning);
                }
                if let Err(err) = result {
                    collector.add_error(err);
                }
            }
            None => {
                for warning in &warnings {
                    warn!(
                        "Warning parsing text-format {}: {warning}",
                        message.descriptor().full_name()
                    );
                }
            }
        }
    }
}

/// One parse in progress.
struct ParserState<'t> {
    tokenizer: Tokenizer<'t>,
    finder: Option<&'t dyn ExtensionFinder>,
    allow_case_insensitive_field: bool,
    allow_unknown_field: bool,
    singular_overwrites: bool,
    recursion_budget: u32,
    warnings: Vec<ParseError>,
}

impl ParserState<'_> {
    fn error(&self, message: impl Into<String>) -> ParseError {
        let token = self.tokenizer.current();
        ParseError::at(token.line, token.column, message)
    }

    fn warning(&mut self, message: impl Into<String>) {
        let warning = self.error(message);
        self.warnings.push(warning);
    }

    fn looking_at(&self, text: &str) -> bool {
        self.tokenizer.current().text == text
    }

    fn looking_at_kind(&self, kind: TokenKind) -> bool {
        self.tokenizer.current().kind == kind
    }

    fn try_consume(&mut self, text: &str) -> Result<bool, ParseError> {
        if self.looking_at(text) {
            self.tokenizer.next()?;
            return Ok(true);
        }
        Ok(false)
    }

    fn consume(&mut self, text: &str) -> Result<(), ParseError> {
        if self.try_consume(text)? {
            return Ok(());
        }
        Err(self.error(format!(
            "Expected \"{text}\", found \"{}\".",
            self.tokenizer.current().text
        )))
    }

    fn try_consume_separator(&mut self) -> Result<(), ParseError> {
        if !self.try_consume(";")? {
            self.try_consume(",")?;
        }
        Ok(())
    }

    fn parse(&mut self, message: &mut DynamicMessage, mut tree: Option<&mut ParseInfoTree>) -> Result<(), ParseError> {
        self.tokenizer.next()?;
        while !self.looking_at_kind(TokenKind::End) {
            self.consume_field(message, tree.as_deref_mut())?;
        }
        Ok(())
    }

    fn parse_field_value(&mut self, field: &FieldDescriptor, message: &mut DynamicMessage) -> Result<(), ParseError> {
        self.tokenizer.next()?;
        if field.message_type().is_some() {
            self.consume_field_message(message, field, None)?;
        } else {
            self.consume_field_value(message, field)?;
        }
        if !self.looking_at_kind(TokenKind::End) {
            return Err(self.error(format!(
                "Expected end of input, found \"{}\".",
                self.tokenizer.current().text
            )));
        }
        Ok(())
    }

    fn consume_field(
        &mut self,
        message: &mut DynamicMessage,
        mut tree: Option<&mut ParseInfoTree>,
    ) -> Result<(), ParseError> {
        let desc = message.descriptor().clone();
        let start = ParseLocation {
            line: self.tokenizer.current().line,
            column: self.tokenizer.current().column,
        };

        let field_name;
        let found = if self.try_consume("[")? {
            field_name = self.consume_full_type_name()?;
            self.consume("]")?;
            let found = match self.finder {
                Some(finder) => finder.find_extension(&desc, &field_name),
                None => desc.find_extension_by_name(&field_name),
            };
            if found.is_none() {
                let error = format!(
                    "Extension \"{field_name}\" is not defined or is not an extension of \"{}\".",
                    desc.full_name()
                );
                return self.unknown_field(error);
            }
            found
        } else {
            field_name = self.consume_identifier()?;
            let mut found = desc.get_field_by_name(&field_name);
            if found.is_none() {
                // Group fields are named in lower case but written with the
                // group's type name.
                found = desc
                    .get_field_by_name(&field_name.to_ascii_lowercase())
                    .filter(FieldDescriptor::is_group);
            }
            if found
                .as_ref()
                .is_some_and(|f| f.is_group() && f.message_type().is_some_and(|m| m.name() != field_name))
            {
                found = None;
            }
            if found.is_none() && self.allow_case_insensitive_field {
                found = desc.get_field_by_lowercase_name(&field_name.to_ascii_lowercase());
            }
            if found.is_none() {
                let error = format!(
                    "Message type \"{}\" has no field named \"{field_name}\".",
                    desc.full_name()
                );
                return self.unknown_field(error);
            }
            found
        };
        let Some(field) = found else {
            return Err(self.error("Expected identifier."));
        };

        if !self.singular_overwrites {
            if !field.is_list() && message.has_field(&field) {
                return Err(self.error(format!(
                    "Non-repeated field \"{field_name}\" is specified multiple times."
                )));
            }
            if let Some(oneof) = field.containing_oneof() {
                if let Some(other) = message.which_oneof(&oneof) {
                    return Err(self.error(format!(
                        "Field \"{field_name}\" is specified along with field \"{}\", another member of oneof \"{}\".",
                        other.name(),
                        oneof.name()
                    )));
                }
            }
        }

        let is_message = field.message_type().is_some();
        if is_message {
            self.try_consume(":")?;
        } else {
            self.consume(":")?;
        }

        if field.is_list() && self.try_consume("[")? {
            if !self.try_consume("]")? {
                loop {
                    if is_message {
                        self.consume_field_message(message, &field, tree.as_deref_mut())?;
                    } else {
                        self.consume_field_value(message, &field)?;
                    }
                    if self.try_consume("]")? {
                        break;
                    }
                    self.consume(",")?;
                }
            }
        } else if is_message {
            self.consume_field_message(message, &field, tree.as_deref_mut())?;
        } else {
            self.consume_field_value(message, &field)?;
        }
        self.try_consume_separator()?;

        if field.options().deprecated() {
            self.warning(format!("text format contains deprecated field \"{field_name}\""));
        }
        if let Some(tree) = tree {
            tree.record_location(&field, start);
        }
        Ok(())
    }

    fn unknown_field(&mut self, message: String) -> Result<(), ParseError> {
        if !self.allow_unknown_field {
            return Err(self.error(message));
        }
        self.warning(message);
        self.skip_field_body()
    }

    fn consume_field_message(
        &mut self,
        message: &mut DynamicMessage,
        field: &FieldDescriptor,
        tree: Option<&mut ParseInfoTree>,
    ) -> Result<(), ParseError> {
        let nested = tree.map(|tree| tree.create_nested(field));
        let delimiter = if self.try_consume("<")? {
            ">"
        } else {
            self.consume("{")?;
            "}"
        };
        if self.recursion_budget == 0 {
            return Err(self.error("Message is too deep"));
        }
        let slot = if field.is_list() {
            message.add_message(field)
        } else {
            message.get_message_mut(field)
        };
        let sub = slot.map_err(|err| self.error(err.to_string()))?;

        self.recursion_budget -= 1;
        let result = self.consume_message(sub, delimiter, nested);
        self.recursion_budget += 1;
        result
    }

    fn consume_message(
        &mut self,
        message: &mut DynamicMessage,
        delimiter: &str,
        mut tree: Option<&mut ParseInfoTree>,
    ) -> Result<(), ParseError> {
        while !self.looking_at(">") && !self.looking_at("}") {
            self.consume_field(message, tree.as_deref_mut())?;
        }
        self.consume(delimiter)
    }

    fn consume_field_value(&mut self, message: &mut DynamicMessage, field: &FieldDescriptor) -> Result<(), ParseError> {
        let value = match field.kind() {
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => {
                Value::I32(self.consume_signed_integer(i32::MAX as u64)? as i32)
            }
            Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => Value::I64(self.consume_signed_integer(i64::MAX as u64)?),
            Kind::Uint32 | Kind::Fixed32 => Value::U32(self.consume_unsigned_integer(u64::from(u32::MAX))? as u32),
            Kind::Uint64 | Kind::Fixed64 => Value::U64(self.consume_unsigned_integer(u64::MAX)?),
            Kind::Float => Value::F32(self.consume_double()? as f32),
            Kind::Double => Value::F64(self.consume_double()?),
            Kind::String => {
                let bytes = self.consume_string()?;
                let text = String::from_utf8(bytes).map_err(|_| {
                    self.error(format!("String field \"{}\" contains invalid UTF-8.", field.name()))
                })?;
                Value::String(text)
            }
            Kind::Bytes => Value::Bytes(self.consume_string()?),
            Kind::Bool => {
                if self.looking_at_kind(TokenKind::Integer) {
                    Value::Bool(self.consume_unsigned_integer(1)? == 1)
                } else {
                    let text = self.consume_identifier()?;
                    match text.as_str() {
                        "true" | "True" | "t" => Value::Bool(true),
                        "false" | "False" | "f" => Value::Bool(false),
                        _ => {
                            return Err(self.error(format!(
                                "Invalid value for boolean field \"{}\". Value: \"{text}\".",
                                field.name()
                            )));
                        }
                    }
                }
            }
            Kind::Enum(enum_type) => {
                let (text, number) = if self.looking_at_kind(TokenKind::Identifier) {
                    let text = self.consume_identifier()?;
                    let number = enum_type.get_value_by_name(&text).map(|v| v.number());
                    (text, number)
                } else if self.looking_at("-") || self.looking_at_kind(TokenKind::Integer) {
                    let number = self.consume_signed_integer(i32::MAX as u64)? as i32;
                    let known = enum_type.get_value(number).is_some() || !enum_type.is_closed();
                    (number.to_string(), known.then_some(number))
                } else {
                    return Err(self.error("Expected integer or identifier."));
                };
                match number {
                    Some(number) => Value::EnumNumber(number),
                    None => {
                        return Err(self.error(format!(
                            "Unknown enumeration value of \"{text}\" for field \"{}\".",
                            field.name()
                        )));
                    }
                }
            }
            Kind::Message(_) => {
                return Err(self.error(format!("Expected \"{{\", found \"{}\".", self.tokenizer.current().text)));
            }
        };

        let stored = if field.is_list() {
            message.add_repeated(field, value)
        } else {
            message.set_field(field, value)
        };
        stored.map_err(|err| self.error(err.to_string()))
    }

    fn consume_identifier(&mut self) -> Result<String, ParseError> {
        let token = self.tokenizer.current();
        let accepted = token.kind == TokenKind::Identifier
            || (self.allow_unknown_field && token.kind == TokenKind::Integer);
        if !accepted {
            return Err(self.error("Expected identifier."));
        }
        let text = token.text.clone();
        self.tokenizer.next()?;
        Ok(text)
    }

    fn consume_full_type_name(&mut self) -> Result<String, ParseError> {
        let mut name = self.consume_identifier()?;
        while self.try_consume(".")? {
            name.push('.');
            name.push_str(&self.consume_identifier()?);
        }
        Ok(name)
    }

    fn consume_string(&mut self) -> Result<Vec<u8>, ParseError> {
        if !self.looking_at_kind(TokenKind::String) {
            return Err(self.error("Expected string."));
        }
        let mut out = Vec::new();
        while self.looking_at_kind(TokenKind::String) {
            parse_string_append(&self.tokenizer.current().text, &mut out);
            self.tokenizer.next()?;
        }
        Ok(out)
    }

    fn consume_unsigned_integer(&mut self, max: u64) -> Result<u64, ParseError> {
        if !self.looking_at_kind(TokenKind::Integer) {
            return Err(self.error("Expected integer."));
        }
        let value = parse_integer(&self.tokenizer.current().text, max)
            .ok_or_else(|| self.error("Integer out of range."))?;
        self.tokenizer.next()?;
        Ok(value)
    }

    /// Two's complement allows one more negative value than positive.
    fn consume_signed_integer(&mut self, max: u64) -> Result<i64, ParseError> {
        let negative = self.try_consume("-")?;
        let max = if negative { max + 1 } else { max };
        let magnitude = self.consume_unsigned_integer(max)?;
        let value = magnitude as i64;
        Ok(if negative { value.wrapping_neg() } else { value })
    }

    fn consume_double(&mut self) -> Result<f64, ParseError> {
        let negative = self.try_consume("-")?;
        let token = self.tokenizer.current();
        let value = match token.kind {
            TokenKind::Integer => {
                let text = &token.text;
                if text.starts_with("0x") || text.starts_with("0X") || (text.len() > 1 && text.starts_with('0')) {
                    return Err(self.error("Expect a decimal number."));
                }
                let value = parse_integer(text, u64::MAX).ok_or_else(|| self.error("Integer out of range."))?;
                value as f64
            }
            TokenKind::Float => parse_float(&token.text),
            TokenKind::Identifier => match token.text.to_ascii_lowercase().as_str() {
                "inf" | "infinity" => f64::INFINITY,
                "nan" => f64::NAN,
                _ => return Err(self.error("Expected double.")),
            },
            _ => return Err(self.error("Expected double.")),
        };
        self.tokenizer.next()?;
        Ok(if negative { -value } else { value })
    }

    /// Skips what follows an unknown field's name. Without a `:` (or with
    /// a `{`/`<` after it) the value must be a message body.
    fn skip_field_body(&mut self) -> Result<(), ParseError> {
        if self.try_consume(":")? && !self.looking_at("{") && !self.looking_at("<") {
            self.skip_field_value()?;
        } else {
            self.skip_field_message()?;
        }
        self.try_consume_separator()
    }

    fn skip_field(&mut self) -> Result<(), ParseError> {
        if self.try_consume("[")? {
            self.consume_full_type_name()?;
            self.consume("]")?;
        } else {
            self.consume_identifier()?;
        }
        self.skip_field_body()
    }

    fn skip_field_message(&mut self) -> Result<(), ParseError> {
        let delimiter = if self.try_consume("<")? {
            ">"
        } else {
            self.consume("{")?;
            "}"
        };
        if self.recursion_budget == 0 {
            return Err(self.error("Message is too deep"));
        }
        self.recursion_budget -= 1;
        let result = self.skip_message_fields(delimiter);
        self.recursion_budget += 1;
        result
    }

    fn skip_message_fields(&mut self, delimiter: &str) -> Result<(), ParseError> {
        while !self.looking_at(">") && !self.looking_at("}") {
            self.skip_field()?;
        }
        self.consume(delimiter)
    }

    fn skip_field_value(&mut self) -> Result<(), ParseError> {
        if !self.try_consume("[")? {
            return self.skip_scalar_value();
        }
        if self.try_consume("]")? {
            return Ok(());
        }
        loop {
            if self.looking_at("{") || self.looking_at("<") {
                self.skip_field_message()?;
            } else {
                self.skip_scalar_value()?;
            }
            if self.try_consume("]")? {
                return Ok(());
            }
            self.consume(",")?;
        }
    }

    fn skip_scalar_value(&mut self) -> Result<(), ParseError> {
        if self.looking_at_kind(TokenKind::String) {
            while self.looking_at_kind(TokenKind::String) {
                self.tokenizer.next()?;
            }
            return Ok(());
        }
        let has_minus = self.try_consume("-")?;
        let token = self.tokenizer.current();
        match token.kind {
            TokenKind::Integer | TokenKind::Float => {}
            TokenKind::Identifier if !has_minus => {}
            TokenKind::Identifier => {
                let lower = token.text.to_ascii_lowercase();
                if !matches!(lower.as_str(), "inf" | "infinity" | "nan") {
                    return Err(self.error(format!("Invalid float number: {lower}")));
                }
            }
            _ => return Err(self.error("Expected integer, float, identifier or string.")),
        }
        self.tokenizer.next()
    }
}
