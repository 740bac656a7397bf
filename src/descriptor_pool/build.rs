//! Building one file into the pool's arenas.
//!
//! A build runs in phases over the whole file: every definition first gets
//! its arena slot and its name, then references are resolved, then custom
//! options are interpreted, and last the rules that depend on options are
//! checked. Any error rolls the pool back to where the build started.

use std::collections::{HashMap, HashSet};

use super::options::{Element, OptionInterpreter, OptionsTarget};
use super::resolve::{self, LookupMode, Misses, SymbolTable, Visibility};
use super::{BuildError, ErrorLocation, PoolState, Report};
use crate::descriptor::{
    to_json_name, EnumData, EnumValueData, FieldData, FileData, MessageData, MethodData, OneofData,
    PoolData, ServiceData, Symbol, Syntax, UNLINKED,
};
use crate::google::protobuf::field_descriptor_proto::{Label, Type};
use crate::google::protobuf::file_options::OptimizeMode;
use crate::google::protobuf::{
    DescriptorProto, EnumDescriptorProto, EnumValueDescriptorProto, FieldDescriptorProto,
    FileDescriptorProto, MethodDescriptorProto, OneofDescriptorProto, OptionsMessage,
    ServiceDescriptorProto,
};
use crate::reflection::Value;
use crate::wire::{self, FIRST_RESERVED_FIELD_NUMBER, LAST_RESERVED_FIELD_NUMBER, MAX_FIELD_NUMBER};
use crate::Message;

impl PoolState {
    /// Builds `proto`, loading missing imports from the fallback database
    /// first. Returns the file's arena index.
    pub(crate) fn build_file(&mut self, proto: &FileDescriptorProto, report: &mut Report) -> Option<usize> {
        let name = proto.name();
        if let Some(existing) = self.data.find_file(name) {
            if self.data.file(existing).proto.encode_to_vec() == proto.encode_to_vec() {
                return Some(existing);
            }
        }
        if let Some(pos) = self.pending_files.iter().position(|p| p == name) {
            let chain = self.pending_files[pos..].join(" -> ");
            report.error(
                true,
                BuildError {
                    filename: name.to_owned(),
                    element_name: name.to_owned(),
                    location: ErrorLocation::Other,
                    message: format!("File recursively imports itself: {chain} -> {name}"),
                },
            );
            return None;
        }
        if self.fallback.is_some() {
            // Imports are loaded before this build's checkpoint is taken.
            self.pending_files.push(name.to_owned());
            for dep in &proto.dependency {
                if self.data.find_file(dep).is_none() {
                    self.try_find_file_in_fallback(dep, report);
                }
            }
            self.pending_files.pop();
        }
        Builder::new(self, report, proto).build(proto)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Placeholder {
    Message,
    ExtendableMessage,
    Enum,
}

#[derive(Clone, Copy)]
struct FieldLink<'p> {
    proto: &'p FieldDescriptorProto,
    has_default: bool,
}

struct Builder<'a, 'p> {
    state: &'a mut PoolState,
    report: &'a mut Report,
    filename: String,
    package: String,
    visibility: Visibility,
    had_errors: bool,
    first_field: usize,
    field_links: Vec<FieldLink<'p>>,
    first_method: usize,
    method_protos: Vec<&'p MethodDescriptorProto>,
    option_targets: Vec<OptionsTarget>,
    /// Fields and extensions of this file by (containing type, number).
    numbers: HashMap<(usize, i32), usize>,
}

impl SymbolTable for Builder<'_, '_> {
    fn data(&self) -> &PoolData {
        &self.state.data
    }

    fn visibility(&self) -> &Visibility {
        &self.visibility
    }

    fn find_not_enforcing_deps(&mut self, name: &str) -> Option<Symbol> {
        if let Some(symbol) = self.state.data.find_symbol(name) {
            return Some(symbol);
        }
        if self.state.try_find_symbol_in_fallback(name, self.report) {
            self.state.data.find_symbol(name)
        } else {
            None
        }
    }
}

fn join_name(scope: &str, name: &str) -> String {
    if scope.is_empty() {
        name.to_owned()
    } else {
        format!("{scope}.{name}")
    }
}

fn is_identifier(text: &str) -> bool {
    let mut bytes = text.bytes();
    match bytes.next() {
        Some(b) if b.is_ascii_alphabetic() || b == b'_' => {}
        _ => return false,
    }
    bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

impl<'a, 'p> Builder<'a, 'p> {
    fn new(state: &'a mut PoolState, report: &'a mut Report, proto: &FileDescriptorProto) -> Self {
        Builder {
            state,
            report,
            filename: proto.name().to_owned(),
            package: proto.package().to_owned(),
            visibility: Visibility::default(),
            had_errors: false,
            first_field: 0,
            field_links: Vec::new(),
            first_method: 0,
            method_protos: Vec::new(),
            option_targets: Vec::new(),
            numbers: HashMap::new(),
        }
    }

    fn data(&self) -> &PoolData {
        &self.state.data
    }

    fn data_mut(&mut self) -> &mut PoolData {
        &mut self.state.data
    }

    fn file(&self) -> usize {
        self.visibility.file
    }

    fn add_error(&mut self, element: &str, location: ErrorLocation, message: impl Into<String>) {
        let first = !self.had_errors;
        self.had_errors = true;
        self.report.error(
            first,
            BuildError {
                filename: self.filename.clone(),
                element_name: element.to_owned(),
                location,
                message: message.into(),
            },
        );
    }

    fn add_warning(&mut self, element: &str, location: ErrorLocation, message: String) {
        self.report.warning(BuildError {
            filename: self.filename.clone(),
            element_name: element.to_owned(),
            location,
            message,
        });
    }

    fn validate_symbol_name(&mut self, name: &str, full_name: &str) {
        if name.is_empty() {
            self.add_error(full_name, ErrorLocation::Name, "Missing name.");
        } else if !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            self.add_error(full_name, ErrorLocation::Name, format!("\"{name}\" is not a valid identifier."));
        }
    }

    fn add_symbol(&mut self, full_name: &str, symbol: Symbol) -> bool {
        if self.data_mut().add_symbol(full_name, symbol) {
            return true;
        }
        let Some(existing) = self.data().find_symbol(full_name) else {
            return false;
        };
        let other_file = self.data().symbol_file(existing);
        let message = if other_file == self.file() {
            match full_name.rfind('.') {
                Some(dot) => format!(
                    "\"{}\" is already defined in \"{}\".",
                    &full_name[dot + 1..],
                    &full_name[..dot]
                ),
                None => format!("\"{full_name}\" is already defined."),
            }
        } else {
            format!(
                "\"{full_name}\" is already defined in file \"{}\".",
                self.data().file(other_file).name
            )
        };
        self.add_error(full_name, ErrorLocation::Name, message);
        false
    }

    fn add_package(&mut self, name: &str) {
        let file = self.file();
        if self.data_mut().add_symbol(name, Symbol::Package(file)) {
            match name.rfind('.') {
                Some(dot) => {
                    self.add_package(&name[..dot]);
                    self.validate_symbol_name(&name[dot + 1..], name);
                }
                None => self.validate_symbol_name(name, name),
            }
        } else if let Some(existing) = self.data().find_symbol(name) {
            if !matches!(existing, Symbol::Package(_)) {
                let other = self.data().symbol_file(existing);
                let message = format!(
                    "\"{name}\" is already defined (as something other than a package) in file \"{}\".",
                    self.data().file(other).name
                );
                self.add_error(name, ErrorLocation::Name, message);
            }
        }
    }

    fn queue_options<O: OptionsMessage>(&mut self, options: &Option<O>, element: Element, name_scope: String, element_name: &str) {
        if options.as_ref().is_some_and(|o| !o.uninterpreted_option().is_empty()) {
            self.option_targets.push(OptionsTarget {
                element,
                name_scope,
                element_name: element_name.to_owned(),
            });
        }
    }

    fn finish(mut self) -> Option<usize> {
        if self.had_errors {
            self.data_mut().rollback_to_last_checkpoint();
            None
        } else {
            if let Some(layer) = self.data_mut().clear_last_checkpoint() {
                self.state.publish(layer);
            }
            Some(self.file())
        }
    }

    fn build(mut self, proto: &'p FileDescriptorProto) -> Option<usize> {
        if proto.name.is_none() {
            self.add_error("", ErrorLocation::Other, "Missing field: FileDescriptorProto.name.");
            return None;
        }
        let filename = self.filename.clone();
        let syntax = match proto.syntax() {
            "" | "proto2" => Syntax::Proto2,
            "proto3" => Syntax::Proto3,
            other => {
                self.add_error(&filename, ErrorLocation::Other, format!("Unrecognized syntax: {other}"));
                Syntax::Proto2
            }
        };

        self.data_mut().add_checkpoint();
        let file = self.data().counts().files;
        self.visibility.file = file;
        self.first_field = self.data().counts().fields;
        self.first_method = self.data().counts().methods;
        let package = self.package.clone();
        self.data_mut().push(FileData {
            name: filename.clone(),
            package: package.clone(),
            syntax,
            dependencies: Vec::new(),
            public_dependencies: Vec::new(),
            weak_dependencies: Vec::new(),
            messages: Vec::new(),
            enums: Vec::new(),
            services: Vec::new(),
            extensions: Vec::new(),
            options: proto.options.clone().unwrap_or_default(),
            proto: proto.clone(),
            is_placeholder: false,
        });
        if !self.data_mut().add_file_name(&filename, file) {
            self.add_error(&filename, ErrorLocation::Other, "A file with this name is already in the pool.");
            return self.finish();
        }
        if !package.is_empty() {
            self.add_package(&package);
        }

        if !self.build_dependencies(proto) {
            return self.finish();
        }

        for (i, message) in proto.message_type.iter().enumerate() {
            let index = self.build_message(message, None, i);
            self.data_mut().file_mut(file).messages.push(index);
        }
        for (i, enum_proto) in proto.enum_type.iter().enumerate() {
            let index = self.build_enum(enum_proto, None, i);
            self.data_mut().file_mut(file).enums.push(index);
        }
        for (i, service) in proto.service.iter().enumerate() {
            let index = self.build_service(service, i);
            self.data_mut().file_mut(file).services.push(index);
        }
        for (i, extension) in proto.extension.iter().enumerate() {
            let index = self.build_field(extension, None, i, true);
            self.data_mut().file_mut(file).extensions.push(index);
        }
        self.queue_options(&proto.options, Element::File(file), format!("{package}.dummy"), &filename);

        self.cross_link_file(file);
        if !self.had_errors {
            self.interpret_options();
        }
        if !self.had_errors {
            let problems = validate_file(self.data(), file);
            for (element, location, message) in problems {
                self.add_error(&element, location, message);
            }
        }
        self.finish()
    }

    /// Resolves imports. Returns false if the build must stop silently.
    fn build_dependencies(&mut self, proto: &FileDescriptorProto) -> bool {
        let file = self.file();
        let filename = self.filename.clone();
        let weak: HashSet<i32> = proto.weak_dependency.iter().copied().collect();
        let mut seen = HashSet::new();
        let mut dependencies = Vec::with_capacity(proto.dependency.len());
        for (i, dep) in proto.dependency.iter().enumerate() {
            if !seen.insert(dep.as_str()) {
                self.add_error(&filename, ErrorLocation::Other, format!("Import \"{dep}\" was listed twice."));
            }
            let found = self.data().find_file(dep);
            if found == Some(file) {
                // With a fallback database the loop was already reported
                // while loading imports.
                if self.state.fallback.is_none() {
                    self.add_error(
                        &filename,
                        ErrorLocation::Other,
                        format!("File recursively imports itself: {filename} -> {filename}"),
                    );
                }
                self.had_errors = true;
                return false;
            }
            let index = match found {
                Some(index) => Some(index),
                None if self.state.allow_unknown || i32::try_from(i).is_ok_and(|i| weak.contains(&i)) => {
                    Some(self.new_placeholder_file(dep))
                }
                None => {
                    let message = if self.state.fallback.is_none() {
                        format!("Import \"{dep}\" has not been loaded.")
                    } else {
                        format!("Import \"{dep}\" was not found or had errors.")
                    };
                    self.add_error(&filename, ErrorLocation::Other, message);
                    None
                }
            };
            dependencies.push(index);
        }

        let mut public = Vec::new();
        for &index in &proto.public_dependency {
            match usize::try_from(index) {
                Ok(i) if i < proto.dependency.len() => public.push(i),
                _ => self.add_error(&filename, ErrorLocation::Other, "Invalid public dependency index."),
            }
        }
        let mut weak_indices = Vec::new();
        for &index in &proto.weak_dependency {
            match usize::try_from(index) {
                Ok(i) if i < proto.dependency.len() => weak_indices.push(i),
                _ => self.add_error(&filename, ErrorLocation::Other, "Invalid weak dependency index."),
            }
        }

        for dep in dependencies.iter().flatten() {
            self.record_public_dependencies(*dep);
        }
        let data = self.data_mut();
        data.file_mut(file).dependencies = dependencies.into_iter().flatten().collect();
        data.file_mut(file).public_dependencies = public;
        data.file_mut(file).weak_dependencies = weak_indices;
        true
    }

    fn record_public_dependencies(&mut self, file: usize) {
        if !self.visibility.dependencies.insert(file) {
            return;
        }
        let data = self.data();
        let public: Vec<usize> = data
            .file(file)
            .public_dependencies
            .iter()
            .filter_map(|&i| data.file(file).dependencies.get(i).copied())
            .collect();
        for dep in public {
            self.record_public_dependencies(dep);
        }
    }

    fn new_placeholder_file(&mut self, name: &str) -> usize {
        self.data_mut().push(FileData {
            name: name.to_owned(),
            package: String::new(),
            syntax: Syntax::Proto2,
            dependencies: Vec::new(),
            public_dependencies: Vec::new(),
            weak_dependencies: Vec::new(),
            messages: Vec::new(),
            enums: Vec::new(),
            services: Vec::new(),
            extensions: Vec::new(),
            options: Default::default(),
            proto: FileDescriptorProto {
                name: Some(name.to_owned()),
                ..Default::default()
            },
            is_placeholder: true,
        })
    }

    /// Stand-in for a type that cannot be found. Placeholders are never
    /// registered as symbols, so each unresolved reference gets its own.
    fn new_placeholder(&mut self, name: &str, kind: Placeholder) -> Option<Symbol> {
        if !resolve::is_qualified_name(name) {
            return None;
        }
        let full_name = name.strip_prefix('.').unwrap_or(name).to_owned();
        let (package, simple) = match full_name.rfind('.') {
            Some(dot) => (full_name[..dot].to_owned(), full_name[dot + 1..].to_owned()),
            None => (String::new(), full_name.clone()),
        };
        let file = self.new_placeholder_file(&format!("{full_name}.placeholder.proto"));
        let data = self.data_mut();
        data.file_mut(file).package = package.clone();
        match kind {
            Placeholder::Enum => {
                let enum_index = data.counts().enums;
                let value_index = data.counts().enum_values;
                data.push(EnumValueData {
                    name: "PLACEHOLDER_VALUE".to_owned(),
                    full_name: join_name(&package, "PLACEHOLDER_VALUE"),
                    number: 0,
                    parent: enum_index,
                    index: 0,
                    options: Default::default(),
                });
                data.push(EnumData {
                    name: simple,
                    full_name,
                    file,
                    parent: None,
                    index: 0,
                    values: vec![value_index],
                    options: Default::default(),
                    is_placeholder: true,
                    values_by_name: HashMap::from([("PLACEHOLDER_VALUE".to_owned(), value_index)]),
                    values_by_number: HashMap::from([(0, value_index)]),
                });
                data.file_mut(file).enums.push(enum_index);
                Some(Symbol::Enum(enum_index))
            }
            Placeholder::Message | Placeholder::ExtendableMessage => {
                let index = data.counts().messages;
                let extension_ranges = if kind == Placeholder::ExtendableMessage {
                    vec![(1, MAX_FIELD_NUMBER + 1)]
                } else {
                    Vec::new()
                };
                data.push(MessageData {
                    name: simple,
                    full_name,
                    file,
                    parent: None,
                    index: 0,
                    fields: Vec::new(),
                    oneofs: Vec::new(),
                    nested_messages: Vec::new(),
                    nested_enums: Vec::new(),
                    extensions: Vec::new(),
                    extension_ranges,
                    reserved_ranges: Vec::new(),
                    reserved_names: Vec::new(),
                    options: Default::default(),
                    is_placeholder: true,
                    fields_by_number: HashMap::new(),
                    fields_by_name: HashMap::new(),
                });
                data.file_mut(file).messages.push(index);
                Some(Symbol::Message(index))
            }
        }
    }

    fn lookup_symbol(
        &mut self,
        name: &str,
        relative_to: &str,
        placeholder: Placeholder,
        mode: LookupMode,
        misses: &mut Misses,
    ) -> Option<Symbol> {
        let found = resolve::lookup_symbol_no_placeholder(self, name, relative_to, mode, misses);
        if found.is_none() && self.state.allow_unknown {
            return self.new_placeholder(name, placeholder);
        }
        found
    }

    fn add_not_defined_error(&mut self, element: &str, location: ErrorLocation, undefined: &str, misses: &Misses) {
        for message in misses.not_defined_messages(undefined, &self.filename) {
            self.add_error(element, location, message);
        }
    }

    fn build_message(&mut self, proto: &'p DescriptorProto, parent: Option<usize>, index: usize) -> usize {
        let scope = match parent {
            Some(p) => self.data().message(p).full_name.clone(),
            None => self.package.clone(),
        };
        let full_name = join_name(&scope, proto.name());
        self.validate_symbol_name(proto.name(), &full_name);

        let msg = self.data().counts().messages;
        let file = self.file();
        self.data_mut().push(MessageData {
            name: proto.name().to_owned(),
            full_name: full_name.clone(),
            file,
            parent,
            index,
            fields: Vec::new(),
            oneofs: Vec::new(),
            nested_messages: Vec::new(),
            nested_enums: Vec::new(),
            extensions: Vec::new(),
            extension_ranges: Vec::new(),
            reserved_ranges: Vec::new(),
            reserved_names: proto.reserved_name.clone(),
            options: proto.options.clone().unwrap_or_default(),
            is_placeholder: false,
            fields_by_number: HashMap::new(),
            fields_by_name: HashMap::new(),
        });

        // Oneofs come first so fields can refer to them.
        for (i, oneof) in proto.oneof_decl.iter().enumerate() {
            let o = self.build_oneof(oneof, msg, i);
            self.data_mut().message_mut(msg).oneofs.push(o);
        }
        for (i, field) in proto.field.iter().enumerate() {
            let f = self.build_field(field, Some(msg), i, false);
            self.data_mut().message_mut(msg).fields.push(f);
        }
        for (i, nested) in proto.nested_type.iter().enumerate() {
            let n = self.build_message(nested, Some(msg), i);
            self.data_mut().message_mut(msg).nested_messages.push(n);
        }
        for (i, nested) in proto.enum_type.iter().enumerate() {
            let e = self.build_enum(nested, Some(msg), i);
            self.data_mut().message_mut(msg).nested_enums.push(e);
        }
        for range in &proto.extension_range {
            let (start, end) = (range.start(), range.end());
            if start <= 0 {
                self.add_error(&full_name, ErrorLocation::Number, "Extension numbers must be positive integers.");
            }
            // The upper bound depends on message_set_wire_format and is
            // checked once options are known.
            if start >= end {
                self.add_error(
                    &full_name,
                    ErrorLocation::Number,
                    "Extension range end number must be greater than start number.",
                );
            }
            self.data_mut().message_mut(msg).extension_ranges.push((start, end));
        }
        for (i, extension) in proto.extension.iter().enumerate() {
            let e = self.build_field(extension, Some(msg), i, true);
            self.data_mut().message_mut(msg).extensions.push(e);
        }
        for range in &proto.reserved_range {
            let (start, end) = (range.start(), range.end());
            if start <= 0 {
                self.add_error(&full_name, ErrorLocation::Number, "Reserved numbers must be positive integers.");
            }
            if end <= start {
                self.add_error(
                    &full_name,
                    ErrorLocation::Number,
                    "Reserved range end number must be greater than start number.",
                );
            }
            self.data_mut().message_mut(msg).reserved_ranges.push((start, end));
        }
        self.queue_options(&proto.options, Element::Message(msg), full_name.clone(), &full_name);
        self.add_symbol(&full_name, Symbol::Message(msg));
        self.check_message_numbers(msg, proto);
        msg
    }

    fn check_message_numbers(&mut self, msg: usize, proto: &DescriptorProto) {
        let message = self.data().message(msg);
        let full_name = message.full_name.clone();
        let ext_ranges = message.extension_ranges.clone();
        let reserved = message.reserved_ranges.clone();
        let fields: Vec<(String, String, i32)> = message
            .fields
            .iter()
            .map(|&f| {
                let field = self.data().field(f);
                (field.name.clone(), field.full_name.clone(), field.number)
            })
            .collect();

        let overlaps = |a: (i32, i32), b: (i32, i32)| a.1 > b.0 && b.1 > a.0;

        for (i, &r1) in reserved.iter().enumerate() {
            for &r2 in &reserved[i + 1..] {
                if overlaps(r1, r2) {
                    self.add_error(
                        &full_name,
                        ErrorLocation::Number,
                        format!(
                            "Reserved range {} to {} overlaps with already-defined range {} to {}.",
                            r2.0,
                            r2.1 - 1,
                            r1.0,
                            r1.1 - 1
                        ),
                    );
                }
            }
        }

        let mut reserved_names = HashSet::new();
        for name in &proto.reserved_name {
            if !reserved_names.insert(name.as_str()) {
                self.add_error(name, ErrorLocation::Name, format!("Field name \"{name}\" is reserved multiple times."));
            }
        }

        for (name, field_full_name, number) in &fields {
            for &(start, end) in &ext_ranges {
                if start <= *number && *number < end {
                    self.add_error(
                        field_full_name,
                        ErrorLocation::Number,
                        format!("Extension range {start} to {} includes field \"{name}\" ({number}).", end - 1),
                    );
                }
            }
            for &(start, end) in &reserved {
                if start <= *number && *number < end {
                    self.add_error(
                        field_full_name,
                        ErrorLocation::Number,
                        format!("Field \"{name}\" uses reserved number {number}."),
                    );
                }
            }
            if reserved_names.contains(name.as_str()) {
                self.add_error(field_full_name, ErrorLocation::Name, format!("Field name \"{name}\" is reserved."));
            }
        }

        for (i, &r1) in ext_ranges.iter().enumerate() {
            for &r2 in &reserved {
                if overlaps(r1, r2) {
                    self.add_error(
                        &full_name,
                        ErrorLocation::Number,
                        format!(
                            "Extension range {} to {} overlaps with reserved range {} to {}.",
                            r1.0,
                            r1.1 - 1,
                            r2.0,
                            r2.1 - 1
                        ),
                    );
                }
            }
            for &r2 in &ext_ranges[i + 1..] {
                if overlaps(r1, r2) {
                    self.add_error(
                        &full_name,
                        ErrorLocation::Number,
                        format!(
                            "Extension range {} to {} overlaps with already-defined range {} to {}.",
                            r2.0,
                            r2.1 - 1,
                            r1.0,
                            r1.1 - 1
                        ),
                    );
                }
            }
        }
    }

    fn build_oneof(&mut self, proto: &OneofDescriptorProto, parent: usize, index: usize) -> usize {
        let full_name = join_name(&self.data().message(parent).full_name, proto.name());
        self.validate_symbol_name(proto.name(), &full_name);
        let oneof = self.data().counts().oneofs;
        self.data_mut().push(OneofData {
            name: proto.name().to_owned(),
            full_name: full_name.clone(),
            containing_type: parent,
            index,
            fields: Vec::new(),
            options: proto.options.clone().unwrap_or_default(),
        });
        self.queue_options(&proto.options, Element::Oneof(oneof), full_name.clone(), &full_name);
        self.add_symbol(&full_name, Symbol::Oneof(oneof));
        oneof
    }

    fn build_field(
        &mut self,
        proto: &'p FieldDescriptorProto,
        parent: Option<usize>,
        index: usize,
        is_extension: bool,
    ) -> usize {
        let scope = match parent {
            Some(p) => self.data().message(p).full_name.clone(),
            None => self.package.clone(),
        };
        let full_name = join_name(&scope, proto.name());
        self.validate_symbol_name(proto.name(), &full_name);

        let label = proto.label();
        let ty = proto.r#type();
        if is_extension && label == Label::Required {
            self.add_error(&full_name, ErrorLocation::Type, "Message extensions cannot have required fields.");
        }

        let mut has_default = proto.default_value.is_some();
        if has_default && label == Label::Repeated {
            self.add_error(&full_name, ErrorLocation::DefaultValue, "Repeated fields can't have default values.");
        }
        let mut default_value = None;
        if proto.r#type.is_some() && has_default {
            match parse_default(ty, proto.default_value()) {
                Ok(value) => default_value = value,
                Err(DefaultError::Unparsable) => self.add_error(
                    &full_name,
                    ErrorLocation::DefaultValue,
                    format!("Couldn't parse default value \"{}\".", proto.default_value()),
                ),
                Err(DefaultError::Bool) => self.add_error(
                    &full_name,
                    ErrorLocation::DefaultValue,
                    "Boolean default must be true or false.",
                ),
                Err(DefaultError::Message) => {
                    self.add_error(&full_name, ErrorLocation::DefaultValue, "Messages can't have default values.");
                    has_default = false;
                }
            }
        }

        let number = proto.number();
        if number <= 0 {
            self.add_error(&full_name, ErrorLocation::Number, "Field numbers must be positive integers.");
        } else if !is_extension && number > MAX_FIELD_NUMBER {
            // Extension numbers are bounded by the extendee's ranges instead.
            self.add_error(
                &full_name,
                ErrorLocation::Number,
                format!("Field numbers cannot be greater than {MAX_FIELD_NUMBER}."),
            );
        } else if (FIRST_RESERVED_FIELD_NUMBER..=LAST_RESERVED_FIELD_NUMBER).contains(&number) {
            self.add_error(
                &full_name,
                ErrorLocation::Number,
                format!(
                    "Field numbers {FIRST_RESERVED_FIELD_NUMBER} through {LAST_RESERVED_FIELD_NUMBER} are reserved \
                     for the protocol buffer library implementation."
                ),
            );
        }

        let mut oneof = None;
        if is_extension {
            if proto.extendee.is_none() {
                self.add_error(
                    &full_name,
                    ErrorLocation::Extendee,
                    "FieldDescriptorProto.extendee not set for extension field.",
                );
            }
            if proto.oneof_index.is_some() {
                self.add_error(
                    &full_name,
                    ErrorLocation::Other,
                    "FieldDescriptorProto.oneof_index should not be set for extensions.",
                );
            }
        } else {
            if proto.extendee.is_some() {
                self.add_error(
                    &full_name,
                    ErrorLocation::Extendee,
                    "FieldDescriptorProto.extendee set for non-extension field.",
                );
            }
            if let (Some(oneof_index), Some(p)) = (proto.oneof_index, parent) {
                let message = self.data().message(p);
                match usize::try_from(oneof_index).ok().and_then(|i| message.oneofs.get(i)) {
                    Some(&o) => oneof = Some(o),
                    None => {
                        let message = format!(
                            "FieldDescriptorProto.oneof_index {oneof_index} is out of range for type \"{}\".",
                            message.name
                        );
                        self.add_error(&full_name, ErrorLocation::Other, message);
                    }
                }
            }
        }

        let field = self.data().counts().fields;
        let file = self.file();
        self.data_mut().push(FieldData {
            name: proto.name().to_owned(),
            full_name: full_name.clone(),
            json_name: proto
                .json_name
                .clone()
                .unwrap_or_else(|| to_json_name(proto.name())),
            has_json_name: proto.json_name.is_some(),
            number,
            label,
            ty,
            target: UNLINKED,
            containing_type: if is_extension { UNLINKED } else { parent.unwrap_or(UNLINKED) },
            extension_scope: if is_extension { parent } else { None },
            is_extension,
            oneof,
            file,
            index,
            default_value,
            options: proto.options.clone().unwrap_or_default(),
        });
        if let Some(o) = oneof {
            self.data_mut().oneof_mut(o).fields.push(field);
        }
        self.field_links.push(FieldLink { proto, has_default });
        self.queue_options(&proto.options, Element::Field(field), full_name.clone(), &full_name);
        self.add_symbol(&full_name, Symbol::Field(field));
        if let (false, Some(p)) = (is_extension, parent) {
            self.data_mut().message_mut(p)
                .fields_by_name
                .entry(proto.name().to_owned())
                .or_insert(field);
        }
        field
    }

    fn build_enum(&mut self, proto: &EnumDescriptorProto, parent: Option<usize>, index: usize) -> usize {
        let scope = match parent {
            Some(p) => self.data().message(p).full_name.clone(),
            None => self.package.clone(),
        };
        let full_name = join_name(&scope, proto.name());
        self.validate_symbol_name(proto.name(), &full_name);
        if proto.value.is_empty() {
            // Fields of this type would have no default.
            self.add_error(&full_name, ErrorLocation::Name, "Enums must contain at least one value.");
        }

        let e = self.data().counts().enums;
        let file = self.file();
        self.data_mut().push(EnumData {
            name: proto.name().to_owned(),
            full_name: full_name.clone(),
            file,
            parent,
            index,
            values: Vec::new(),
            options: proto.options.clone().unwrap_or_default(),
            is_placeholder: false,
            values_by_name: HashMap::new(),
            values_by_number: HashMap::new(),
        });
        for (i, value) in proto.value.iter().enumerate() {
            let v = self.build_enum_value(value, e, i);
            self.data_mut().enum_type_mut(e).values.push(v);
        }
        self.queue_options(&proto.options, Element::Enum(e), full_name.clone(), &full_name);
        self.add_symbol(&full_name, Symbol::Enum(e));
        e
    }

    fn build_enum_value(&mut self, proto: &EnumValueDescriptorProto, parent: usize, index: usize) -> usize {
        // Values are named as siblings of their enum, not children.
        let enum_data = self.data().enum_type(parent);
        let prefix_len = enum_data.full_name.len() - enum_data.name.len();
        let full_name = format!("{}{}", &enum_data.full_name[..prefix_len], proto.name());
        let enum_name = enum_data.name.clone();
        let outer_scope = match enum_data.parent {
            Some(m) => self.data().message(m).full_name.clone(),
            None => self.package.clone(),
        };
        self.validate_symbol_name(proto.name(), &full_name);

        let v = self.data().counts().enum_values;
        self.data_mut().push(EnumValueData {
            name: proto.name().to_owned(),
            full_name: full_name.clone(),
            number: proto.number(),
            parent,
            index,
            options: proto.options.clone().unwrap_or_default(),
        });
        self.queue_options(&proto.options, Element::EnumValue(v), full_name.clone(), &full_name);

        let added_outer = self.add_symbol(&full_name, Symbol::EnumValue(v));
        let enum_data = self.data_mut().enum_type_mut(parent);
        let added_inner = !enum_data.values_by_name.contains_key(proto.name());
        if added_inner {
            enum_data.values_by_name.insert(proto.name().to_owned(), v);
        }
        enum_data.values_by_number.entry(proto.number()).or_insert(v);
        if added_inner && !added_outer {
            let scope = if outer_scope.is_empty() {
                "the global scope".to_owned()
            } else {
                format!("\"{outer_scope}\"")
            };
            self.add_error(
                &full_name,
                ErrorLocation::Name,
                format!(
                    "Note that enum values use C++ scoping rules, meaning that enum values are siblings of their \
                     type, not children of it.  Therefore, \"{}\" must be unique within {scope}, not just within \
                     \"{enum_name}\".",
                    proto.name()
                ),
            );
        }
        v
    }

    fn build_service(&mut self, proto: &'p ServiceDescriptorProto, index: usize) -> usize {
        let full_name = join_name(&self.package, proto.name());
        self.validate_symbol_name(proto.name(), &full_name);
        let service = self.data().counts().services;
        let file = self.file();
        self.data_mut().push(ServiceData {
            name: proto.name().to_owned(),
            full_name: full_name.clone(),
            file,
            index,
            methods: Vec::new(),
            options: proto.options.clone().unwrap_or_default(),
        });
        for (i, method) in proto.method.iter().enumerate() {
            let m = self.build_method(method, service, i);
            self.data_mut().service_mut(service).methods.push(m);
        }
        self.queue_options(&proto.options, Element::Service(service), full_name.clone(), &full_name);
        self.add_symbol(&full_name, Symbol::Service(service));
        service
    }

    fn build_method(&mut self, proto: &'p MethodDescriptorProto, service: usize, index: usize) -> usize {
        let full_name = join_name(&self.data().service(service).full_name, proto.name());
        self.validate_symbol_name(proto.name(), &full_name);
        let method = self.data().counts().methods;
        self.data_mut().push(MethodData {
            name: proto.name().to_owned(),
            full_name: full_name.clone(),
            service,
            index,
            input: UNLINKED,
            output: UNLINKED,
            client_streaming: proto.client_streaming(),
            server_streaming: proto.server_streaming(),
            options: proto.options.clone().unwrap_or_default(),
        });
        self.method_protos.push(proto);
        self.queue_options(&proto.options, Element::Method(method), full_name.clone(), &full_name);
        self.add_symbol(&full_name, Symbol::Method(method));
        method
    }

    fn cross_link_file(&mut self, file: usize) {
        let f = self.data().file(file);
        let (messages, extensions, services) = (f.messages.clone(), f.extensions.clone(), f.services.clone());
        for msg in messages {
            self.cross_link_message(msg);
        }
        for field in extensions {
            self.cross_link_field(field);
        }
        for service in services {
            let methods = self.data().service(service).methods.clone();
            for method in methods {
                self.cross_link_method(method);
            }
        }
    }

    fn cross_link_message(&mut self, msg: usize) {
        let m = self.data().message(msg);
        let nested = m.nested_messages.clone();
        let members: Vec<usize> = m.fields.iter().chain(&m.extensions).copied().collect();
        let oneofs = m.oneofs.clone();
        for n in nested {
            self.cross_link_message(n);
        }
        for field in members {
            self.cross_link_field(field);
        }
        for oneof in oneofs {
            let data = self.data().oneof(oneof);
            if data.fields.is_empty() {
                let name = data.full_name.clone();
                self.add_error(&name, ErrorLocation::Name, "Oneof must have at least one field.");
            }
        }
    }

    fn cross_link_field(&mut self, field: usize) {
        let FieldLink { proto, has_default } = self.field_links[field - self.first_field];
        let full_name = self.data().field(field).full_name.clone();
        let number = proto.number();
        let mut misses = Misses::default();

        if let Some(extendee) = &proto.extendee {
            match self.lookup_symbol(extendee, &full_name, Placeholder::ExtendableMessage, LookupMode::All, &mut misses) {
                None => {
                    self.add_not_defined_error(&full_name, ErrorLocation::Extendee, extendee, &misses);
                    return;
                }
                Some(Symbol::Message(m)) => {
                    self.data_mut().field_mut(field).containing_type = m;
                    let message = self.data().message(m);
                    if !message.extension_ranges.iter().any(|&(s, e)| s <= number && number < e) {
                        let text = format!(
                            "\"{}\" does not declare {number} as an extension number.",
                            message.full_name
                        );
                        self.add_error(&full_name, ErrorLocation::Number, text);
                    }
                }
                Some(_) => {
                    self.add_error(&full_name, ErrorLocation::Extendee, format!("\"{extendee}\" is not a message type."));
                    return;
                }
            }
        }

        if self.data().field(field).oneof.is_some() && proto.label() != Label::Optional {
            self.add_error(
                &full_name,
                ErrorLocation::Name,
                "Fields of oneofs must themselves have label LABEL_OPTIONAL.",
            );
        }

        if let Some(type_name) = &proto.type_name {
            let expecting_enum = proto.r#type == Some(Type::Enum) || proto.default_value.is_some();
            let placeholder = if expecting_enum { Placeholder::Enum } else { Placeholder::Message };
            let Some(symbol) = self.lookup_symbol(type_name, &full_name, placeholder, LookupMode::Types, &mut misses)
            else {
                self.add_not_defined_error(&full_name, ErrorLocation::Type, type_name, &misses);
                return;
            };
            if proto.r#type.is_none() {
                let inferred = match symbol {
                    Symbol::Message(_) => Type::Message,
                    Symbol::Enum(_) => Type::Enum,
                    _ => {
                        self.add_error(&full_name, ErrorLocation::Type, format!("\"{type_name}\" is not a type."));
                        return;
                    }
                };
                self.data_mut().field_mut(field).ty = inferred;
            }
            match self.data().field(field).ty {
                Type::Message | Type::Group => {
                    let Symbol::Message(m) = symbol else {
                        self.add_error(&full_name, ErrorLocation::Type, format!("\"{type_name}\" is not a message type."));
                        return;
                    };
                    self.data_mut().field_mut(field).target = m;
                    if has_default {
                        self.add_error(&full_name, ErrorLocation::DefaultValue, "Messages can't have default values.");
                    }
                }
                Type::Enum => {
                    let Symbol::Enum(e) = symbol else {
                        self.add_error(&full_name, ErrorLocation::Type, format!("\"{type_name}\" is not an enum type."));
                        return;
                    };
                    self.data_mut().field_mut(field).target = e;
                    // Defaults of placeholder enums cannot be checked.
                    if has_default && !self.data().enum_type(e).is_placeholder {
                        self.link_enum_default(field, e, proto.default_value(), &full_name);
                    }
                }
                _ => {
                    self.add_error(&full_name, ErrorLocation::Type, "Field with primitive type has type_name.");
                }
            }
        } else if matches!(proto.r#type(), Type::Message | Type::Group | Type::Enum) {
            self.add_error(&full_name, ErrorLocation::Type, "Field with message or enum type missing type_name.");
        }

        self.register_number(field, &full_name);
    }

    fn link_enum_default(&mut self, field: usize, enum_index: usize, default: &str, full_name: &str) {
        if !is_identifier(default) {
            self.add_error(
                full_name,
                ErrorLocation::DefaultValue,
                "Default value for an enum field must be an identifier.",
            );
            return;
        }
        let enum_full_name = self.data().enum_type(enum_index).full_name.clone();
        let mut misses = Misses::default();
        let found = resolve::lookup_symbol_no_placeholder(self, default, &enum_full_name, LookupMode::All, &mut misses);
        match found {
            Some(Symbol::EnumValue(v)) if self.data().enum_value(v).parent == enum_index => {
                let number = self.data().enum_value(v).number;
                self.data_mut().field_mut(field).default_value = Some(Value::EnumNumber(number));
            }
            _ => self.add_error(
                full_name,
                ErrorLocation::DefaultValue,
                format!("Enum type \"{enum_full_name}\" has no value named \"{default}\"."),
            ),
        }
    }

    fn register_number(&mut self, field: usize, full_name: &str) {
        let data = self.data().field(field);
        let (containing, number, is_extension) = (data.containing_type, data.number, data.is_extension);
        if containing == UNLINKED {
            return;
        }
        if let Some(&other) = self.numbers.get(&(containing, number)) {
            let containing_name = self.data().message(containing).full_name.clone();
            let other = self.data().field(other);
            let message = if is_extension {
                format!(
                    "Extension number {number} has already been used in \"{containing_name}\" by extension \"{}\".",
                    other.full_name
                )
            } else {
                format!(
                    "Field number {number} has already been used in \"{containing_name}\" by field \"{}\".",
                    other.name
                )
            };
            self.add_error(full_name, ErrorLocation::Number, message);
            return;
        }
        self.numbers.insert((containing, number), field);
        if !is_extension {
            self.data_mut().message_mut(containing)
                .fields_by_number
                .insert(number, field);
        } else if !self.data_mut().add_extension(containing, number, field) {
            let data = self.data();
            let Some(other) = data.find_extension(containing, number) else {
                return;
            };
            let other = data.field(other);
            let message = format!(
                "Extension number {number} has already been used in \"{}\" by extension \"{}\" defined in {}.",
                data.message(containing).full_name, other.full_name, data.file(other.file).name
            );
            self.add_warning(full_name, ErrorLocation::Number, message);
        }
    }

    fn cross_link_method(&mut self, method: usize) {
        let proto = self.method_protos[method - self.first_method];
        let full_name = self.data().method(method).full_name.clone();
        let mut misses = Misses::default();
        for (type_name, location) in [
            (proto.input_type(), ErrorLocation::InputType),
            (proto.output_type(), ErrorLocation::OutputType),
        ] {
            match self.lookup_symbol(type_name, &full_name, Placeholder::Message, LookupMode::All, &mut misses) {
                None => self.add_not_defined_error(&full_name, location, type_name, &misses),
                Some(Symbol::Message(m)) => {
                    let data = self.data_mut().method_mut(method);
                    if location == ErrorLocation::InputType {
                        data.input = m;
                    } else {
                        data.output = m;
                    }
                }
                Some(_) => self.add_error(&full_name, location, format!("\"{type_name}\" is not a message type.")),
            }
        }
    }

    fn interpret_options(&mut self) {
        if self.option_targets.is_empty() {
            return;
        }
        let Some(pool) = self.state.pool() else {
            return;
        };
        let (updates, errors) = {
            let mut interpreter =
                OptionInterpreter::new(&pool, &self.state.data, &self.visibility, self.state.allow_unknown);
            let updates: Vec<_> = self
                .option_targets
                .iter()
                .filter_map(|target| interpreter.interpret(target))
                .collect();
            (updates, interpreter.into_errors())
        };
        for (element, location, message) in errors {
            self.add_error(&element, location, message);
        }
        if self.had_errors {
            return;
        }
        let data = self.data_mut();
        for update in updates {
            update.apply(data);
        }
    }
}

enum DefaultError {
    Unparsable,
    Bool,
    Message,
}

/// Integer literal with C prefixes: `0x` for hex and a leading `0` for octal.
fn parse_c_integer(text: &str) -> Option<i128> {
    let (negative, rest) = match text.as_bytes().first()? {
        b'-' => (true, &text[1..]),
        b'+' => (false, &text[1..]),
        _ => (false, text),
    };
    let (radix, digits) = if let Some(hex) = rest.strip_prefix("0x").or_else(|| rest.strip_prefix("0X")) {
        (16, hex)
    } else if rest.len() > 1 && rest.starts_with('0') {
        (8, &rest[1..])
    } else {
        (10, rest)
    };
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let magnitude = i128::from_str_radix(digits, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

fn parse_float(text: &str) -> Option<f64> {
    match text {
        "inf" => Some(f64::INFINITY),
        "-inf" => Some(f64::NEG_INFINITY),
        "nan" => Some(f64::NAN),
        _ if text.bytes().any(|b| b.is_ascii_alphabetic() && b != b'e' && b != b'E') => None,
        _ => text.parse().ok(),
    }
}

/// Parses an explicit default. Enum defaults are resolved during
/// cross-linking and come back as `None`.
fn parse_default(ty: Type, text: &str) -> Result<Option<Value>, DefaultError> {
    fn int<T: TryFrom<i128>>(text: &str) -> Result<T, DefaultError> {
        parse_c_integer(text)
            .and_then(|v| T::try_from(v).ok())
            .ok_or(DefaultError::Unparsable)
    }
    let value = match ty {
        Type::Int32 | Type::Sint32 | Type::Sfixed32 => Value::I32(int(text)?),
        Type::Int64 | Type::Sint64 | Type::Sfixed64 => Value::I64(int(text)?),
        Type::Uint32 | Type::Fixed32 => Value::U32(int(text)?),
        Type::Uint64 | Type::Fixed64 => Value::U64(int(text)?),
        Type::Float => Value::F32(parse_float(text).ok_or(DefaultError::Unparsable)? as f32),
        Type::Double => Value::F64(parse_float(text).ok_or(DefaultError::Unparsable)?),
        Type::Bool => match text {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => return Err(DefaultError::Bool),
        },
        Type::String => Value::String(text.to_owned()),
        Type::Bytes => Value::Bytes(crate::text_format::unescape_c_bytes(text)),
        Type::Enum => return Ok(None),
        Type::Message | Type::Group => return Err(DefaultError::Message),
    };
    Ok(Some(value))
}

type Problem = (String, ErrorLocation, String);

fn is_lite(data: &PoolData, file: usize) -> bool {
    data.file(file).options.optimize_for() == OptimizeMode::LiteRuntime
}

/// Rules that need interpreted options.
fn validate_file(data: &PoolData, file: usize) -> Vec<Problem> {
    let mut problems = Vec::new();
    let f = data.file(file);
    for &msg in &f.messages {
        validate_message(data, msg, &mut problems);
    }
    for &e in &f.enums {
        validate_enum(data, e, &mut problems);
    }
    for &service in &f.services {
        let s = data.service(service);
        if is_lite(data, file)
            && (f.options.cc_generic_services.unwrap_or(false) || f.options.java_generic_services.unwrap_or(false))
        {
            problems.push((
                s.full_name.clone(),
                ErrorLocation::Name,
                "Files with optimize_for = LITE_RUNTIME cannot define services unless you set both options \
                 cc_generic_services and java_generic_sevices to false."
                    .to_owned(),
            ));
        }
    }
    for &field in &f.extensions {
        validate_field(data, field, &mut problems);
    }
    if !is_lite(data, file) {
        if let Some(&dep) = f.dependencies.iter().find(|&&dep| is_lite(data, dep)) {
            problems.push((
                f.name.clone(),
                ErrorLocation::Other,
                format!(
                    "Files that do not use optimize_for = LITE_RUNTIME cannot import files which do use this \
                     option.  This file is not lite, but it imports \"{}\" which is.",
                    data.file(dep).name
                ),
            ));
        }
    }
    problems
}

fn validate_message(data: &PoolData, msg: usize, problems: &mut Vec<Problem>) {
    let m = data.message(msg);
    for &field in &m.fields {
        validate_field(data, field, problems);
    }
    for &nested in &m.nested_messages {
        validate_message(data, nested, problems);
    }
    for &e in &m.nested_enums {
        validate_enum(data, e, problems);
    }
    for &field in &m.extensions {
        validate_field(data, field, problems);
    }
    let max = if m.options.message_set_wire_format() {
        i64::from(i32::MAX)
    } else {
        i64::from(MAX_FIELD_NUMBER)
    };
    for &(_, end) in &m.extension_ranges {
        if i64::from(end) > max + 1 {
            problems.push((
                m.full_name.clone(),
                ErrorLocation::Number,
                format!("Extension numbers cannot be greater than {max}."),
            ));
        }
    }
}

fn validate_field(data: &PoolData, field: usize, problems: &mut Vec<Problem>) {
    let f = data.field(field);
    if f.options.lazy() && f.ty != Type::Message {
        problems.push((
            f.full_name.clone(),
            ErrorLocation::Type,
            "[lazy = true] can only be specified for submessage fields.".to_owned(),
        ));
    }
    let packable = f.label == Label::Repeated && wire::is_packable(f.ty);
    if f.options.packed() && !packable {
        problems.push((
            f.full_name.clone(),
            ErrorLocation::Type,
            "[packed = true] can only be specified for repeated primitive fields.".to_owned(),
        ));
    }
    if f.containing_type == UNLINKED {
        return;
    }
    let containing = data.message(f.containing_type);
    if containing.options.message_set_wire_format() {
        if !f.is_extension {
            problems.push((
                f.full_name.clone(),
                ErrorLocation::Name,
                "MessageSets cannot have fields, only extensions.".to_owned(),
            ));
        } else if f.label != Label::Optional || f.ty != Type::Message {
            problems.push((
                f.full_name.clone(),
                ErrorLocation::Type,
                "Extensions of MessageSets must be optional messages.".to_owned(),
            ));
        }
    }
    if is_lite(data, f.file) && !is_lite(data, containing.file) {
        problems.push((
            f.full_name.clone(),
            ErrorLocation::Extendee,
            "Extensions to non-lite types can only be declared in non-lite files.  Note that you cannot extend a \
             non-lite type to contain a lite type, but the reverse is allowed."
                .to_owned(),
        ));
    }
}

fn validate_enum(data: &PoolData, e: usize, problems: &mut Vec<Problem>) {
    let enum_data = data.enum_type(e);
    if enum_data.options.allow_alias() {
        return;
    }
    let mut used: HashMap<i32, &str> = HashMap::new();
    for &v in &enum_data.values {
        let value = data.enum_value(v);
        match used.get(&value.number) {
            Some(first) => problems.push((
                enum_data.full_name.clone(),
                ErrorLocation::Number,
                format!(
                    "\"{}\" uses the same enum value as \"{first}\". If this is intended, set \
                     'option allow_alias = true;' to the enum definition.",
                    value.full_name
                ),
            )),
            None => {
                used.insert(value.number, &value.full_name);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_integers() {
        assert_eq!(parse_c_integer("42"), Some(42));
        assert_eq!(parse_c_integer("-0x10"), Some(-16));
        assert_eq!(parse_c_integer("010"), Some(8));
        assert_eq!(parse_c_integer("0"), Some(0));
        assert_eq!(parse_c_integer(""), None);
        assert_eq!(parse_c_integer("1a"), None);
        assert_eq!(parse_c_integer("--1"), None);
        assert_eq!(parse_c_integer("09"), None);
    }

    #[test]
    fn defaults_by_type() {
        assert!(matches!(parse_default(Type::Int32, "-5"), Ok(Some(Value::I32(-5)))));
        assert!(matches!(parse_default(Type::Uint32, "-5"), Err(DefaultError::Unparsable)));
        assert!(matches!(parse_default(Type::Int32, "3000000000"), Err(DefaultError::Unparsable)));
        assert!(matches!(parse_default(Type::Double, "-inf"), Ok(Some(Value::F64(v))) if v == f64::NEG_INFINITY));
        assert!(matches!(parse_default(Type::Float, "1.5"), Ok(Some(Value::F32(v))) if v == 1.5));
        assert!(matches!(parse_default(Type::Float, "1.5f"), Err(DefaultError::Unparsable)));
        assert!(matches!(parse_default(Type::Bool, "yes"), Err(DefaultError::Bool)));
        assert!(matches!(parse_default(Type::Enum, "FOO"), Ok(None)));
        assert!(matches!(parse_default(Type::Message, "x"), Err(DefaultError::Message)));
        assert!(
            matches!(parse_default(Type::Bytes, "a\\001"), Ok(Some(Value::Bytes(b))) if b == vec![b'a', 1])
        );
    }

    #[test]
    fn identifiers() {
        assert!(is_identifier("FOO_1"));
        assert!(is_identifier("_x"));
        assert!(!is_identifier("1x"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("a.b"));
    }
}
