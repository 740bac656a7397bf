//! Turning `uninterpreted_option` entries into real option values.
//!
//! Each option is encoded into the unknown fields of its options message,
//! which is then re-encoded and decoded so that values for known fields land
//! in their typed slots while custom options stay behind as unknown fields.

use std::sync::Arc;

use super::resolve::{self, LookupMode, Misses, SnapshotTable, Visibility};
use super::{DescriptorPool, ErrorLocation, PoolInner};
use crate::descriptor::{FieldDescriptor, MessageDescriptor, PoolData, Symbol};
use crate::google::protobuf::field_descriptor_proto::{Label, Type};
use crate::google::protobuf::{
    EnumOptions, EnumValueOptions, FieldOptions, FileOptions, MessageOptions, MethodOptions,
    OneofOptions, OptionsMessage, ServiceOptions, UninterpretedOption,
};
use crate::reflection::DynamicMessage;
use crate::text_format::{ExtensionFinder, Parser};
use crate::unknown_fields::{UnknownFieldSet, UnknownValue};
use crate::wire::{zigzag_encode32, zigzag_encode64};

/// The element whose options are interpreted, by arena index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum Element {
    File(usize),
    Message(usize),
    Field(usize),
    Oneof(usize),
    Enum(usize),
    EnumValue(usize),
    Service(usize),
    Method(usize),
}

#[derive(Debug)]
pub(super) struct OptionsTarget {
    pub(super) element: Element,
    /// Scope that extension names in option names resolve against.
    pub(super) name_scope: String,
    /// Name reported with errors.
    pub(super) element_name: String,
}

/// Options ready to be written back to their element.
pub(super) enum Interpreted {
    File(usize, FileOptions),
    Message(usize, MessageOptions),
    Field(usize, FieldOptions),
    Oneof(usize, OneofOptions),
    Enum(usize, EnumOptions),
    EnumValue(usize, EnumValueOptions),
    Service(usize, ServiceOptions),
    Method(usize, MethodOptions),
}

impl Interpreted {
    pub(super) fn apply(self, data: &mut PoolData) {
        match self {
            Interpreted::File(i, options) => data.file_mut(i).options = options,
            Interpreted::Message(i, options) => data.message_mut(i).options = options,
            Interpreted::Field(i, options) => data.field_mut(i).options = options,
            Interpreted::Oneof(i, options) => data.oneof_mut(i).options = options,
            Interpreted::Enum(i, options) => data.enum_type_mut(i).options = options,
            Interpreted::EnumValue(i, options) => data.enum_value_mut(i).options = options,
            Interpreted::Service(i, options) => data.service_mut(i).options = options,
            Interpreted::Method(i, options) => data.method_mut(i).options = options,
        }
    }
}

type Failure = (ErrorLocation, String);

fn name_error<T>(message: String) -> Result<T, Failure> {
    Err((ErrorLocation::OptionName, message))
}

fn value_error<T>(message: String) -> Result<T, Failure> {
    Err((ErrorLocation::OptionValue, message))
}

enum Outcome {
    Set,
    /// Left uninterpreted because its target cannot be known.
    Kept,
}

/// Reads the pool mid-build. Handles it creates see the elements of the
/// build in progress.
pub(super) struct OptionInterpreter<'a> {
    pool: &'a Arc<PoolInner>,
    data: &'a PoolData,
    visibility: &'a Visibility,
    allow_unknown: bool,
    errors: Vec<(String, ErrorLocation, String)>,
}

impl<'a> OptionInterpreter<'a> {
    pub(super) fn new(
        pool: &'a Arc<PoolInner>,
        data: &'a PoolData,
        visibility: &'a Visibility,
        allow_unknown: bool,
    ) -> Self {
        OptionInterpreter {
            pool,
            data,
            visibility,
            allow_unknown,
            errors: Vec::new(),
        }
    }

    pub(super) fn into_errors(self) -> Vec<(String, ErrorLocation, String)> {
        self.errors
    }

    pub(super) fn interpret(&mut self, target: &OptionsTarget) -> Option<Interpreted> {
        let data = self.data;
        Some(match target.element {
            Element::File(i) => Interpreted::File(i, self.interpret_options(&data.file(i).options, target)?),
            Element::Message(i) => Interpreted::Message(i, self.interpret_options(&data.message(i).options, target)?),
            Element::Field(i) => Interpreted::Field(i, self.interpret_options(&data.field(i).options, target)?),
            Element::Oneof(i) => Interpreted::Oneof(i, self.interpret_options(&data.oneof(i).options, target)?),
            Element::Enum(i) => Interpreted::Enum(i, self.interpret_options(&data.enum_type(i).options, target)?),
            Element::EnumValue(i) => {
                Interpreted::EnumValue(i, self.interpret_options(&data.enum_value(i).options, target)?)
            }
            Element::Service(i) => Interpreted::Service(i, self.interpret_options(&data.service(i).options, target)?),
            Element::Method(i) => Interpreted::Method(i, self.interpret_options(&data.method(i).options, target)?),
        })
    }

    /// The options message type, preferring the definition in the pool being
    /// built since only that one knows its custom extensions.
    fn options_descriptor(&self, type_name: &str) -> Option<MessageDescriptor> {
        match self.data.find_symbol(type_name) {
            Some(Symbol::Message(i)) => Some(self.data.handle(self.pool, i)),
            _ => DescriptorPool::bootstrap().find_message_by_name(type_name),
        }
    }

    fn interpret_options<O: OptionsMessage + Clone>(&mut self, options: &O, target: &OptionsTarget) -> Option<O> {
        let Some(options_type) = self.options_descriptor(O::TYPE_NAME) else {
            self.errors.push((
                target.element_name.clone(),
                ErrorLocation::Other,
                format!("Options type \"{}\" is not available.", O::TYPE_NAME),
            ));
            return None;
        };
        let mut result = options.clone();
        result.uninterpreted_option_mut().clear();
        let mut kept = Vec::new();
        for option in options.uninterpreted_option() {
            match self.interpret_one(option, &options_type, target, result.unknown_fields_mut()) {
                Ok(Outcome::Set) => {}
                Ok(Outcome::Kept) => kept.push(option.clone()),
                Err((location, message)) => {
                    self.errors.push((target.element_name.clone(), location, message));
                    return None;
                }
            }
        }
        *result.uninterpreted_option_mut() = kept;

        // Known fields set through options move out of the unknown fields.
        match O::decode(&result.encode_to_vec()) {
            Ok(decoded) => Some(decoded),
            Err(err) => {
                self.errors.push((target.element_name.clone(), ErrorLocation::OptionValue, err.to_string()));
                None
            }
        }
    }

    fn interpret_one(
        &self,
        option: &UninterpretedOption,
        options_type: &MessageDescriptor,
        target: &OptionsTarget,
        unknown: &mut UnknownFieldSet,
    ) -> Result<Outcome, Failure> {
        let Some(first) = option.name.first() else {
            return name_error("Option must have a name.".to_owned());
        };
        if first.name_part == "uninterpreted_option" {
            return name_error("Option must not use reserved name \"uninterpreted_option\".".to_owned());
        }

        let mut descriptor = options_type.clone();
        let mut intermediate: Vec<FieldDescriptor> = Vec::new();
        let mut debug_name = String::new();
        let mut leaf = None;
        for (i, part) in option.name.iter().enumerate() {
            if !debug_name.is_empty() {
                debug_name.push('.');
            }
            let mut misses = Misses::default();
            let field: Option<FieldDescriptor> = if part.is_extension {
                debug_name.push_str(&format!("({})", part.name_part));
                let mut table = SnapshotTable {
                    data: self.data,
                    visibility: self.visibility,
                };
                match resolve::lookup_symbol_no_placeholder(
                    &mut table,
                    &part.name_part,
                    &target.name_scope,
                    LookupMode::All,
                    &mut misses,
                ) {
                    Some(Symbol::Field(f)) => Some(self.data.handle(self.pool, f)),
                    _ => None,
                }
            } else {
                debug_name.push_str(&part.name_part);
                descriptor.get_field_by_name(&part.name_part)
            };

            let Some(field) = field else {
                if self.allow_unknown {
                    return Ok(Outcome::Kept);
                }
                if let Some(resolved) = misses.unresolved() {
                    return name_error(format!(
                        "Option \"{debug_name}\" is resolved to \"({resolved})\", which is not defined. The \
                         innermost scope is searched first in name resolution. Consider using a leading \
                         '.'(i.e., \"(.{}\") to start from the outermost scope.",
                        &debug_name[1..]
                    ));
                }
                return name_error(format!("Option \"{debug_name}\" unknown."));
            };

            let containing = field.containing_type();
            if containing != descriptor {
                if containing.is_placeholder() {
                    return Ok(Outcome::Kept);
                }
                return name_error(format!(
                    "Option field \"{debug_name}\" is not a field or extension of message \"{}\".",
                    descriptor.name()
                ));
            }

            if i + 1 < option.name.len() {
                let next = match field.field_type() {
                    Type::Message | Type::Group => field.message_type(),
                    _ => None,
                };
                let Some(next) = next else {
                    return name_error(format!("Option \"{debug_name}\" is an atomic type, not a message."));
                };
                if field.is_list() {
                    return name_error(format!(
                        "Option field \"{debug_name}\" is a repeated message. Repeated message options must be \
                         initialized using an aggregate value."
                    ));
                }
                intermediate.push(field);
                descriptor = next;
            } else {
                leaf = Some(field);
            }
        }
        let Some(leaf) = leaf else {
            return name_error("Option must have a name.".to_owned());
        };

        if is_option_set(&intermediate, &leaf, unknown) {
            return name_error(format!("Option \"{debug_name}\" was already set"));
        }

        let mut fields = UnknownFieldSet::new();
        self.set_option_value(option, &leaf, &mut fields)?;
        for field in intermediate.iter().rev() {
            let mut parent = UnknownFieldSet::new();
            if field.field_type() == Type::Group {
                parent.add_group(field.number()).merge_from(&fields);
            } else {
                parent.add_length_delimited(field.number(), fields.encode_to_vec());
            }
            fields = parent;
        }
        unknown.merge_from(&fields);
        Ok(Outcome::Set)
    }

    fn set_option_value(
        &self,
        option: &UninterpretedOption,
        field: &FieldDescriptor,
        out: &mut UnknownFieldSet,
    ) -> Result<(), Failure> {
        let number = field.number();
        let full_name = field.full_name();
        match field.field_type() {
            ty @ (Type::Int32 | Type::Sint32 | Type::Sfixed32) => {
                let value = match (option.positive_int_value, option.negative_int_value) {
                    (Some(v), _) => i32::try_from(v).ok(),
                    (None, Some(v)) => i32::try_from(v).ok(),
                    (None, None) => {
                        return value_error(format!("Value must be integer for int32 option \"{full_name}\"."));
                    }
                };
                let Some(value) = value else {
                    return value_error(format!("Value out of range for int32 option \"{full_name}\"."));
                };
                match ty {
                    Type::Sint32 => out.add_varint(number, u64::from(zigzag_encode32(value))),
                    Type::Sfixed32 => out.add_fixed32(number, value as u32),
                    _ => out.add_varint(number, i64::from(value) as u64),
                }
            }
            ty @ (Type::Int64 | Type::Sint64 | Type::Sfixed64) => {
                let value = match (option.positive_int_value, option.negative_int_value) {
                    (Some(v), _) => i64::try_from(v).ok(),
                    (None, Some(v)) => Some(v),
                    (None, None) => {
                        return value_error(format!("Value must be integer for int64 option \"{full_name}\"."));
                    }
                };
                let Some(value) = value else {
                    return value_error(format!("Value out of range for int64 option \"{full_name}\"."));
                };
                match ty {
                    Type::Sint64 => out.add_varint(number, zigzag_encode64(value)),
                    Type::Sfixed64 => out.add_fixed64(number, value as u64),
                    _ => out.add_varint(number, value as u64),
                }
            }
            ty @ (Type::Uint32 | Type::Fixed32) => {
                let Some(value) = option.positive_int_value else {
                    return value_error(format!(
                        "Value must be non-negative integer for uint32 option \"{full_name}\"."
                    ));
                };
                let Ok(value) = u32::try_from(value) else {
                    return value_error(format!("Value out of range for uint32 option \"{full_name}\"."));
                };
                if ty == Type::Fixed32 {
                    out.add_fixed32(number, value);
                } else {
                    out.add_varint(number, u64::from(value));
                }
            }
            ty @ (Type::Uint64 | Type::Fixed64) => {
                let Some(value) = option.positive_int_value else {
                    return value_error(format!(
                        "Value must be non-negative integer for uint64 option \"{full_name}\"."
                    ));
                };
                if ty == Type::Fixed64 {
                    out.add_fixed64(number, value);
                } else {
                    out.add_varint(number, value);
                }
            }
            Type::Float => {
                let Some(value) = numeric_value(option) else {
                    return value_error(format!("Value must be number for float option \"{full_name}\"."));
                };
                out.add_fixed32(number, (value as f32).to_bits());
            }
            Type::Double => {
                let Some(value) = numeric_value(option) else {
                    return value_error(format!("Value must be number for double option \"{full_name}\"."));
                };
                out.add_fixed64(number, value.to_bits());
            }
            Type::Bool => {
                let value = match option.identifier_value.as_deref() {
                    None => {
                        return value_error(format!(
                            "Value must be identifier for boolean option \"{full_name}\"."
                        ));
                    }
                    Some("true") => 1,
                    Some("false") => 0,
                    Some(_) => {
                        return value_error(format!(
                            "Value must be \"true\" or \"false\" for boolean option \"{full_name}\"."
                        ));
                    }
                };
                out.add_varint(number, value);
            }
            Type::Enum => {
                let Some(value_name) = option.identifier_value.as_deref() else {
                    return value_error(format!(
                        "Value must be identifier for enum-valued option \"{full_name}\"."
                    ));
                };
                let value = self.find_enum_option_value(field, value_name)?;
                out.add_varint(number, i64::from(value) as u64);
            }
            Type::String | Type::Bytes => {
                let Some(value) = &option.string_value else {
                    return value_error(format!("Value must be quoted string for string option \"{full_name}\"."));
                };
                out.add_length_delimited(number, value.clone());
            }
            Type::Message | Type::Group => self.set_aggregate_option(option, field, out)?,
        }
        Ok(())
    }

    fn find_enum_option_value(&self, field: &FieldDescriptor, value_name: &str) -> Result<i32, Failure> {
        let Some(enum_type) = field.enum_type() else {
            return value_error(format!(
                "Value must be identifier for enum-valued option \"{}\".",
                field.full_name()
            ));
        };
        let not_found = || {
            value_error(format!(
                "Enum type \"{}\" has no value named \"{value_name}\" for option \"{}\".",
                enum_type.full_name(),
                field.full_name()
            ))
        };
        if enum_type.pool.id != self.pool.id {
            return match enum_type.get_value_by_name(value_name) {
                Some(value) => Ok(value.number()),
                None => not_found(),
            };
        }
        // Values are siblings of their enum type.
        let enum_full_name = enum_type.full_name();
        let scope = &enum_full_name[..enum_full_name.len() - enum_type.name().len()];
        match self.data.find_symbol(&format!("{scope}{value_name}")) {
            Some(Symbol::EnumValue(v)) if self.data.enum_value(v).parent == enum_type.index => {
                Ok(self.data.enum_value(v).number)
            }
            Some(Symbol::EnumValue(_)) => value_error(format!(
                "Enum type \"{}\" has no value named \"{value_name}\" for option \"{}\". This appears to be a \
                 value from a sibling type.",
                enum_type.full_name(),
                field.full_name()
            )),
            _ => not_found(),
        }
    }

    fn set_aggregate_option(
        &self,
        option: &UninterpretedOption,
        field: &FieldDescriptor,
        out: &mut UnknownFieldSet,
    ) -> Result<(), Failure> {
        let (Some(aggregate), Some(message_type)) = (option.aggregate_value.as_deref(), field.message_type()) else {
            return value_error(format!(
                "Option \"{}\" is a message. To set the entire message, use syntax like \"{name} = {{ <proto \
                 text format> }}\". To set fields within it, use syntax like \"{name}.foo = value\".",
                field.full_name(),
                name = field.name()
            ));
        };
        let mut message = DynamicMessage::new(message_type);
        let finder = AggregateFinder {
            pool: self.pool,
            data: self.data,
            visibility: self.visibility,
        };
        if let Err(err) = Parser::new().with_finder(&finder).parse_from_str(aggregate, &mut message) {
            return value_error(format!(
                "Error while parsing option value for \"{}\": {}",
                field.name(),
                err.message
            ));
        }
        let bytes = message.encode_to_vec();
        if field.field_type() == Type::Group {
            let group = UnknownFieldSet::parse(&bytes).or_else(|err| value_error(err.to_string()))?;
            out.add_group(field.number()).merge_from(&group);
        } else {
            out.add_length_delimited(field.number(), bytes);
        }
        Ok(())
    }
}

fn numeric_value(option: &UninterpretedOption) -> Option<f64> {
    option
        .double_value
        .or(option.positive_int_value.map(|v| v as f64))
        .or(option.negative_int_value.map(|v| v as f64))
}

/// Whether a non-repeated `leaf` under `path` already has a value in `fields`.
fn is_option_set(path: &[FieldDescriptor], leaf: &FieldDescriptor, fields: &UnknownFieldSet) -> bool {
    let Some((first, rest)) = path.split_first() else {
        return !leaf.is_list() && fields.iter().any(|f| f.number() == leaf.number());
    };
    fields
        .iter()
        .filter(|f| f.number() == first.number())
        .any(|f| match (f.value(), first.field_type()) {
            (UnknownValue::LengthDelimited(bytes), Type::Message) => {
                UnknownFieldSet::parse(bytes).is_ok_and(|inner| is_option_set(rest, leaf, &inner))
            }
            (UnknownValue::Group(inner), Type::Group) => is_option_set(rest, leaf, inner),
            _ => false,
        })
}

/// Resolves `[ext.name]` in aggregate option values relative to the message
/// being parsed. MessageSet items may also be named by their message type.
struct AggregateFinder<'a> {
    pool: &'a Arc<PoolInner>,
    data: &'a PoolData,
    visibility: &'a Visibility,
}

impl ExtensionFinder for AggregateFinder<'_> {
    fn find_extension(&self, message: &MessageDescriptor, name: &str) -> Option<FieldDescriptor> {
        let mut table = SnapshotTable {
            data: self.data,
            visibility: self.visibility,
        };
        let mut misses = Misses::default();
        let symbol =
            resolve::lookup_symbol_no_placeholder(&mut table, name, message.full_name(), LookupMode::All, &mut misses)?;
        match symbol {
            Symbol::Field(f) if self.data.field(f).is_extension => Some(self.data.handle(self.pool, f)),
            Symbol::Message(m) if message.is_message_set() => {
                let carried: MessageDescriptor = self.data.handle(self.pool, m);
                carried.extensions().into_iter().find(|ext| {
                    ext.containing_type() == *message
                        && ext.field_type() == Type::Message
                        && ext.label() == Label::Optional
                        && ext.message_type().as_ref() == Some(&carried)
                })
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::protobuf::uninterpreted_option::NamePart;

    #[test]
    fn numbers_from_any_literal() {
        let mut option = UninterpretedOption::default();
        assert_eq!(numeric_value(&option), None);
        option.negative_int_value = Some(-3);
        assert_eq!(numeric_value(&option), Some(-3.0));
        option.double_value = Some(0.5);
        assert_eq!(numeric_value(&option), Some(0.5));
    }

    #[test]
    fn option_names_must_resolve() {
        let pool = DescriptorPool::bootstrap();
        let options_type = pool
            .find_message_by_name("google.protobuf.FileOptions")
            .unwrap();
        let state = pool.inner.state.lock();
        let visibility = Visibility::default();
        let interpreter = OptionInterpreter::new(&pool.inner, &state.data, &visibility, false);
        let target = OptionsTarget {
            element: Element::File(0),
            name_scope: "pkg.dummy".into(),
            element_name: "a.proto".into(),
        };
        let mut unknown = UnknownFieldSet::new();

        let unnamed = UninterpretedOption::default();
        let err = interpreter
            .interpret_one(&unnamed, &options_type, &target, &mut unknown)
            .err()
            .unwrap();
        assert_eq!(err, (ErrorLocation::OptionName, "Option must have a name.".to_owned()));

        let option = UninterpretedOption {
            name: vec![NamePart::new("no_such_option", false)],
            identifier_value: Some("x".into()),
            ..Default::default()
        };
        let err = interpreter
            .interpret_one(&option, &options_type, &target, &mut unknown)
            .err()
            .unwrap();
        assert_eq!(err.1, "Option \"no_such_option\" unknown.");

        let option = UninterpretedOption {
            name: vec![NamePart::new("java_package", false)],
            identifier_value: Some("x".into()),
            ..Default::default()
        };
        let err = interpreter
            .interpret_one(&option, &options_type, &target, &mut unknown)
            .err()
            .unwrap();
        assert_eq!(
            err,
            (
                ErrorLocation::OptionValue,
                "Value must be quoted string for string option \"google.protobuf.FileOptions.java_package\"."
                    .to_owned()
            )
        );
    }

    #[test]
    fn repeated_setting_is_rejected() {
        let pool = DescriptorPool::bootstrap();
        let options_type = pool
            .find_message_by_name("google.protobuf.FileOptions")
            .unwrap();
        let state = pool.inner.state.lock();
        let visibility = Visibility::default();
        let interpreter = OptionInterpreter::new(&pool.inner, &state.data, &visibility, false);
        let target = OptionsTarget {
            element: Element::File(0),
            name_scope: "dummy".into(),
            element_name: "a.proto".into(),
        };
        let option = UninterpretedOption {
            name: vec![NamePart::new("cc_generic_services", false)],
            identifier_value: Some("true".into()),
            ..Default::default()
        };
        let mut unknown = UnknownFieldSet::new();
        assert!(matches!(
            interpreter.interpret_one(&option, &options_type, &target, &mut unknown),
            Ok(Outcome::Set)
        ));
        let err = interpreter
            .interpret_one(&option, &options_type, &target, &mut unknown)
            .err()
            .unwrap();
        assert_eq!(err.1, "Option \"cc_generic_services\" was already set");
    }
}
