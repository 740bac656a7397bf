//! Built schema elements.
//!
//! A [`DescriptorPool`] stores its elements in layers: every committed build
//! seals one [`Layer`] holding the files, messages and other elements it
//! added, and sealed layers are never written again. Elements are numbered
//! across layers, so an index names an element for the life of the pool.
//! Handles such as [`MessageDescriptor`] pair the `Arc` of the layer holding
//! their element with its index. They are cheap to clone, `Send + Sync`, and
//! never dangle. Handles of the same pool compare equal by index.

use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::descriptor_pool::{DescriptorPool, PoolInner};
use crate::google::protobuf::field_descriptor_proto::{Label, Type};
use crate::google::protobuf::{
    EnumOptions, EnumValueOptions, FieldOptions, FileDescriptorProto, FileOptions, MessageOptions,
    MethodOptions, OneofOptions, ServiceOptions,
};
use crate::reflection::{DynamicMessage, Value};
use crate::wire;

/// Index not yet filled in by cross-linking. Never observable through a
/// handle of a successfully built file.
pub(crate) const UNLINKED: usize = usize::MAX;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Syntax {
    Proto2,
    Proto3,
}

impl Syntax {
    pub fn as_str(self) -> &'static str {
        match self {
            Syntax::Proto2 => "proto2",
            Syntax::Proto3 => "proto3",
        }
    }
}

/// Anything that can be named in a pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Symbol {
    /// Package, with the index of the first file that declared it.
    Package(usize),
    Message(usize),
    Field(usize),
    Oneof(usize),
    Enum(usize),
    EnumValue(usize),
    Service(usize),
    Method(usize),
}

impl Symbol {
    /// Symbols that can contain other symbols.
    pub(crate) fn is_aggregate(self) -> bool {
        matches!(
            self,
            Symbol::Package(_) | Symbol::Message(_) | Symbol::Enum(_) | Symbol::Service(_)
        )
    }

    pub(crate) fn is_type(self) -> bool {
        matches!(self, Symbol::Message(_) | Symbol::Enum(_))
    }
}

#[derive(Clone, Debug)]
pub(crate) struct FileData {
    pub(crate) name: String,
    pub(crate) package: String,
    pub(crate) syntax: Syntax,
    pub(crate) dependencies: Vec<usize>,
    pub(crate) public_dependencies: Vec<usize>,
    pub(crate) weak_dependencies: Vec<usize>,
    pub(crate) messages: Vec<usize>,
    pub(crate) enums: Vec<usize>,
    pub(crate) services: Vec<usize>,
    pub(crate) extensions: Vec<usize>,
    pub(crate) options: FileOptions,
    pub(crate) proto: FileDescriptorProto,
    pub(crate) is_placeholder: bool,
}

#[derive(Clone, Debug)]
pub(crate) struct MessageData {
    pub(crate) name: String,
    pub(crate) full_name: String,
    pub(crate) file: usize,
    pub(crate) parent: Option<usize>,
    pub(crate) index: usize,
    pub(crate) fields: Vec<usize>,
    pub(crate) oneofs: Vec<usize>,
    pub(crate) nested_messages: Vec<usize>,
    pub(crate) nested_enums: Vec<usize>,
    pub(crate) extensions: Vec<usize>,
    pub(crate) extension_ranges: Vec<(i32, i32)>,
    pub(crate) reserved_ranges: Vec<(i32, i32)>,
    pub(crate) reserved_names: Vec<String>,
    pub(crate) options: MessageOptions,
    pub(crate) is_placeholder: bool,
    pub(crate) fields_by_number: HashMap<i32, usize>,
    pub(crate) fields_by_name: HashMap<String, usize>,
}

#[derive(Clone, Debug)]
pub(crate) struct FieldData {
    pub(crate) name: String,
    pub(crate) full_name: String,
    pub(crate) json_name: String,
    pub(crate) has_json_name: bool,
    pub(crate) number: i32,
    pub(crate) label: Label,
    pub(crate) ty: Type,
    /// Message or enum index for message, group and enum fields.
    pub(crate) target: usize,
    /// The extendee for extensions.
    pub(crate) containing_type: usize,
    pub(crate) extension_scope: Option<usize>,
    pub(crate) is_extension: bool,
    pub(crate) oneof: Option<usize>,
    pub(crate) file: usize,
    pub(crate) index: usize,
    pub(crate) default_value: Option<Value>,
    pub(crate) options: FieldOptions,
}

#[derive(Clone, Debug)]
pub(crate) struct OneofData {
    pub(crate) name: String,
    pub(crate) full_name: String,
    pub(crate) containing_type: usize,
    pub(crate) index: usize,
    pub(crate) fields: Vec<usize>,
    pub(crate) options: OneofOptions,
}

#[derive(Clone, Debug)]
pub(crate) struct EnumData {
    pub(crate) name: String,
    pub(crate) full_name: String,
    pub(crate) file: usize,
    pub(crate) parent: Option<usize>,
    pub(crate) index: usize,
    pub(crate) values: Vec<usize>,
    pub(crate) options: EnumOptions,
    pub(crate) is_placeholder: bool,
    pub(crate) values_by_name: HashMap<String, usize>,
    pub(crate) values_by_number: HashMap<i32, usize>,
}

#[derive(Clone, Debug)]
pub(crate) struct EnumValueData {
    pub(crate) name: String,
    pub(crate) full_name: String,
    pub(crate) number: i32,
    pub(crate) parent: usize,
    pub(crate) index: usize,
    pub(crate) options: EnumValueOptions,
}

#[derive(Clone, Debug)]
pub(crate) struct ServiceData {
    pub(crate) name: String,
    pub(crate) full_name: String,
    pub(crate) file: usize,
    pub(crate) index: usize,
    pub(crate) methods: Vec<usize>,
    pub(crate) options: ServiceOptions,
}

#[derive(Clone, Debug)]
pub(crate) struct MethodData {
    pub(crate) name: String,
    pub(crate) full_name: String,
    pub(crate) service: usize,
    pub(crate) index: usize,
    pub(crate) input: usize,
    pub(crate) output: usize,
    pub(crate) client_streaming: bool,
    pub(crate) server_streaming: bool,
    pub(crate) options: MethodOptions,
}

/// Number of elements of each kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct Counts {
    pub(crate) files: usize,
    pub(crate) messages: usize,
    pub(crate) fields: usize,
    pub(crate) oneofs: usize,
    pub(crate) enums: usize,
    pub(crate) enum_values: usize,
    pub(crate) services: usize,
    pub(crate) methods: usize,
}

/// Elements added by one committed build. The first element of each kind
/// has the global index given by `start`.
#[derive(Clone, Debug, Default)]
pub(crate) struct Layer {
    start: Counts,
    files: Vec<FileData>,
    messages: Vec<MessageData>,
    fields: Vec<FieldData>,
    oneofs: Vec<OneofData>,
    enums: Vec<EnumData>,
    enum_values: Vec<EnumValueData>,
    services: Vec<ServiceData>,
    methods: Vec<MethodData>,
}

impl Layer {
    fn starting_at(start: Counts) -> Self {
        Layer {
            start,
            ..Layer::default()
        }
    }

    fn end(&self) -> Counts {
        let start = &self.start;
        Counts {
            files: start.files + self.files.len(),
            messages: start.messages + self.messages.len(),
            fields: start.fields + self.fields.len(),
            oneofs: start.oneofs + self.oneofs.len(),
            enums: start.enums + self.enums.len(),
            enum_values: start.enum_values + self.enum_values.len(),
            services: start.services + self.services.len(),
            methods: start.methods + self.methods.len(),
        }
    }

    fn is_empty(&self) -> bool {
        self.end() == self.start
    }

    /// Drops every element at or past `end`.
    fn truncate(&mut self, end: &Counts) {
        let start = self.start;
        self.files.truncate(end.files - start.files);
        self.messages.truncate(end.messages - start.messages);
        self.fields.truncate(end.fields - start.fields);
        self.oneofs.truncate(end.oneofs - start.oneofs);
        self.enums.truncate(end.enums - start.enums);
        self.enum_values.truncate(end.enum_values - start.enum_values);
        self.services.truncate(end.services - start.services);
        self.methods.truncate(end.methods - start.methods);
    }

    pub(crate) fn contains<T: Element>(&self, index: usize) -> bool {
        index
            .checked_sub(T::count(&self.start))
            .is_some_and(|offset| offset < T::column(self).len())
    }

    #[inline]
    pub(crate) fn get<T: Element>(&self, index: usize) -> &T {
        &T::column(self)[index - T::count(&self.start)]
    }
}

/// One kind of element, stored in its own column of every layer.
pub(crate) trait Element: Sized {
    fn column(layer: &Layer) -> &[Self];

    fn column_mut(layer: &mut Layer) -> &mut Vec<Self>;

    fn count(counts: &Counts) -> usize;
}

/// The layer holding element `index` of kind `T`. Layers are ordered by
/// their start, and layers without elements of kind `T` share the start of
/// the next one.
pub(crate) fn find_layer<T: Element>(layers: &[Arc<Layer>], index: usize) -> &Arc<Layer> {
    let after = layers.partition_point(|layer| T::count(&layer.start) <= index);
    &layers[after.saturating_sub(1)]
}

/// Log positions and element counts to roll back to.
#[derive(Clone, Copy, Debug)]
struct Checkpoint {
    counts: Counts,
    symbol_log: usize,
    file_log: usize,
    extension_log: usize,
}

/// The builder's view of a pool: sealed layers, the layer of the build in
/// progress, and the name tables.
#[derive(Debug)]
pub(crate) struct PoolData {
    layers: Vec<Arc<Layer>>,
    /// Only shared while options are being interpreted.
    open: Arc<Layer>,
    pub(crate) symbols: HashMap<String, Symbol>,
    pub(crate) file_names: HashMap<String, usize>,
    pub(crate) extensions: HashMap<(usize, i32), usize>,
    symbol_log: Vec<String>,
    file_log: Vec<String>,
    extension_log: Vec<(usize, i32)>,
    checkpoints: Vec<Checkpoint>,
}

macro_rules! element {
    ($data:ident, $column:ident, $get:ident, $get_mut:ident) => {
        impl Element for $data {
            fn column(layer: &Layer) -> &[Self] {
                &layer.$column
            }

            fn column_mut(layer: &mut Layer) -> &mut Vec<Self> {
                &mut layer.$column
            }

            fn count(counts: &Counts) -> usize {
                counts.$column
            }
        }

        impl PoolData {
            pub(crate) fn $get(&self, index: usize) -> &$data {
                self.get(index)
            }

            pub(crate) fn $get_mut(&mut self, index: usize) -> &mut $data {
                self.get_mut(index)
            }
        }
    };
}

element!(FileData, files, file, file_mut);
element!(MessageData, messages, message, message_mut);
element!(FieldData, fields, field, field_mut);
element!(OneofData, oneofs, oneof, oneof_mut);
element!(EnumData, enums, enum_type, enum_type_mut);
element!(EnumValueData, enum_values, enum_value, enum_value_mut);
element!(ServiceData, services, service, service_mut);
element!(MethodData, methods, method, method_mut);

impl PoolData {
    pub(crate) fn new() -> Self {
        PoolData {
            layers: Vec::new(),
            open: Arc::new(Layer::default()),
            symbols: HashMap::new(),
            file_names: HashMap::new(),
            extensions: HashMap::new(),
            symbol_log: Vec::new(),
            file_log: Vec::new(),
            extension_log: Vec::new(),
            checkpoints: Vec::new(),
        }
    }

    /// Elements of each kind so far, including the build in progress.
    pub(crate) fn counts(&self) -> Counts {
        self.open.end()
    }

    pub(crate) fn layer_of<T: Element>(&self, index: usize) -> &Arc<Layer> {
        if index >= T::count(&self.open.start) {
            &self.open
        } else {
            find_layer::<T>(&self.layers, index)
        }
    }

    pub(crate) fn get<T: Element>(&self, index: usize) -> &T {
        self.layer_of::<T>(index).get(index)
    }

    /// Only elements of the build in progress can change.
    pub(crate) fn get_mut<T: Element>(&mut self, index: usize) -> &mut T {
        let open = Arc::make_mut(&mut self.open);
        let offset = index - T::count(&open.start);
        &mut T::column_mut(open)[offset]
    }

    /// Appends to the build in progress and returns the new element's index.
    pub(crate) fn push<T: Element>(&mut self, value: T) -> usize {
        let open = Arc::make_mut(&mut self.open);
        let index = T::count(&open.start) + T::column(open).len();
        T::column_mut(open).push(value);
        index
    }

    /// A handle on element `index` of `pool`.
    pub(crate) fn handle<H: Handle>(&self, pool: &Arc<PoolInner>, index: usize) -> H {
        H::from_parts(Arc::clone(pool), Arc::clone(self.layer_of::<H::Data>(index)), index)
    }

    pub(crate) fn find_symbol(&self, name: &str) -> Option<Symbol> {
        self.symbols.get(name).copied()
    }

    pub(crate) fn find_file(&self, name: &str) -> Option<usize> {
        self.file_names.get(name).copied()
    }

    pub(crate) fn find_extension(&self, extendee: usize, number: i32) -> Option<usize> {
        self.extensions.get(&(extendee, number)).copied()
    }

    /// Extensions of `extendee`, ordered by number.
    pub(crate) fn extensions_of(&self, extendee: usize) -> Vec<usize> {
        let mut found: Vec<(i32, usize)> = self
            .extensions
            .iter()
            .filter(|((msg, _), _)| *msg == extendee)
            .map(|(&(_, number), &field)| (number, field))
            .collect();
        found.sort_unstable();
        found.into_iter().map(|(_, field)| field).collect()
    }

    /// Returns false if the name is taken.
    pub(crate) fn add_symbol(&mut self, name: &str, symbol: Symbol) -> bool {
        if self.symbols.contains_key(name) {
            return false;
        }
        self.symbols.insert(name.to_owned(), symbol);
        self.symbol_log.push(name.to_owned());
        true
    }

    pub(crate) fn add_file_name(&mut self, name: &str, index: usize) -> bool {
        if self.file_names.contains_key(name) {
            return false;
        }
        self.file_names.insert(name.to_owned(), index);
        self.file_log.push(name.to_owned());
        true
    }

    pub(crate) fn add_extension(&mut self, extendee: usize, number: i32, field: usize) -> bool {
        if self.extensions.contains_key(&(extendee, number)) {
            return false;
        }
        self.extensions.insert((extendee, number), field);
        self.extension_log.push((extendee, number));
        true
    }

    pub(crate) fn add_checkpoint(&mut self) {
        self.checkpoints.push(Checkpoint {
            counts: self.counts(),
            symbol_log: self.symbol_log.len(),
            file_log: self.file_log.len(),
            extension_log: self.extension_log.len(),
        });
    }

    /// Keeps everything added since the last checkpoint. Once no checkpoint
    /// remains the logs are dropped and the build's layer is sealed and
    /// returned.
    pub(crate) fn clear_last_checkpoint(&mut self) -> Option<Arc<Layer>> {
        self.checkpoints.pop();
        if !self.checkpoints.is_empty() {
            return None;
        }
        self.symbol_log.clear();
        self.file_log.clear();
        self.extension_log.clear();
        if self.open.is_empty() {
            return None;
        }
        let end = self.open.end();
        let sealed = std::mem::replace(&mut self.open, Arc::new(Layer::starting_at(end)));
        self.layers.push(Arc::clone(&sealed));
        Some(sealed)
    }

    /// Discards everything added since the last checkpoint, including files
    /// built by nested fallback loads.
    pub(crate) fn rollback_to_last_checkpoint(&mut self) {
        let Some(cp) = self.checkpoints.pop() else {
            return;
        };
        for name in self.symbol_log.drain(cp.symbol_log..) {
            self.symbols.remove(&name);
        }
        for name in self.file_log.drain(cp.file_log..) {
            self.file_names.remove(&name);
        }
        for key in self.extension_log.drain(cp.extension_log..) {
            self.extensions.remove(&key);
        }
        if self.counts() != cp.counts {
            Arc::make_mut(&mut self.open).truncate(&cp.counts);
        }
    }

    /// File that defines `symbol`.
    pub(crate) fn symbol_file(&self, symbol: Symbol) -> usize {
        match symbol {
            Symbol::Package(file) => file,
            Symbol::Message(i) => self.message(i).file,
            Symbol::Field(i) => self.field(i).file,
            Symbol::Oneof(i) => self.message(self.oneof(i).containing_type).file,
            Symbol::Enum(i) => self.enum_type(i).file,
            Symbol::EnumValue(i) => self.enum_type(self.enum_value(i).parent).file,
            Symbol::Service(i) => self.service(i).file,
            Symbol::Method(i) => self.service(self.method(i).service).file,
        }
    }

    /// True if some prefix of `name` names a built element other than a
    /// package, meaning the whole definition is already known.
    pub(crate) fn is_sub_symbol_of_built_type(&self, name: &str) -> bool {
        let mut prefix = name;
        while let Some(dot) = prefix.rfind('.') {
            prefix = &prefix[..dot];
            if let Some(symbol) = self.find_symbol(prefix) {
                if !matches!(symbol, Symbol::Package(_)) {
                    return true;
                }
            }
        }
        false
    }
}

/// A descriptor type: a pool, the layer holding the element, and its index.
pub(crate) trait Handle {
    type Data: Element;

    fn from_parts(pool: Arc<PoolInner>, layer: Arc<Layer>, index: usize) -> Self;
}

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident, $data:ty) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name {
            pub(crate) pool: Arc<PoolInner>,
            layer: Arc<Layer>,
            pub(crate) index: usize,
        }

        impl Handle for $name {
            type Data = $data;

            fn from_parts(pool: Arc<PoolInner>, layer: Arc<Layer>, index: usize) -> Self {
                $name { pool, layer, index }
            }
        }

        impl $name {
            #[inline]
            pub(crate) fn data(&self) -> &$data {
                self.layer.get(self.index)
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.pool.id == other.pool.id && self.index == other.index
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.pool.id.hash(state);
                self.index.hash(state);
            }
        }
    };
}

handle!(
    /// A built `.proto` file.
    FileDescriptor,
    FileData
);
handle!(
    /// A message type.
    MessageDescriptor,
    MessageData
);
handle!(
    /// A field of a message, or an extension.
    FieldDescriptor,
    FieldData
);
handle!(OneofDescriptor, OneofData);
handle!(EnumDescriptor, EnumData);
handle!(EnumValueDescriptor, EnumValueData);
handle!(ServiceDescriptor, ServiceData);
handle!(MethodDescriptor, MethodData);

/// Handle on element `index`, which is usually in the same layer as the
/// element referring to it.
fn related<H: Handle>(pool: &Arc<PoolInner>, layer: &Arc<Layer>, index: usize) -> H {
    let layer = if layer.contains::<H::Data>(index) {
        Arc::clone(layer)
    } else {
        pool.layer_of::<H::Data>(index)
    };
    H::from_parts(Arc::clone(pool), layer, index)
}

fn related_all<H: Handle>(pool: &Arc<PoolInner>, layer: &Arc<Layer>, indices: &[usize]) -> Vec<H> {
    indices.iter().map(|&i| related(pool, layer, i)).collect()
}

impl fmt::Debug for FileDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FileDescriptor").field(&self.name()).finish()
    }
}

impl FileDescriptor {
    pub fn name(&self) -> &str {
        &self.data().name
    }

    pub fn package(&self) -> &str {
        &self.data().package
    }

    pub fn syntax(&self) -> Syntax {
        self.data().syntax
    }

    pub fn options(&self) -> &FileOptions {
        &self.data().options
    }

    pub fn is_placeholder(&self) -> bool {
        self.data().is_placeholder
    }

    pub fn dependencies(&self) -> Vec<FileDescriptor> {
        related_all::<FileDescriptor>(&self.pool, &self.layer, &self.data().dependencies)
    }

    pub fn dependency(&self, index: usize) -> Option<FileDescriptor> {
        let file = *self.data().dependencies.get(index)?;
        Some(related::<FileDescriptor>(&self.pool, &self.layer, file))
    }

    /// Files re-exported through `import public`.
    pub fn public_dependencies(&self) -> Vec<FileDescriptor> {
        let data = self.data();
        data.public_dependencies
            .iter()
            .map(|&i| related::<FileDescriptor>(&self.pool, &self.layer, data.dependencies[i]))
            .collect()
    }

    pub fn weak_dependencies(&self) -> Vec<FileDescriptor> {
        let data = self.data();
        data.weak_dependencies
            .iter()
            .map(|&i| related::<FileDescriptor>(&self.pool, &self.layer, data.dependencies[i]))
            .collect()
    }

    pub fn messages(&self) -> Vec<MessageDescriptor> {
        related_all::<MessageDescriptor>(&self.pool, &self.layer, &self.data().messages)
    }

    pub fn enums(&self) -> Vec<EnumDescriptor> {
        related_all::<EnumDescriptor>(&self.pool, &self.layer, &self.data().enums)
    }

    pub fn services(&self) -> Vec<ServiceDescriptor> {
        related_all::<ServiceDescriptor>(&self.pool, &self.layer, &self.data().services)
    }

    pub fn extensions(&self) -> Vec<FieldDescriptor> {
        related_all::<FieldDescriptor>(&self.pool, &self.layer, &self.data().extensions)
    }

    /// Top-level message by unqualified name.
    pub fn find_message_by_name(&self, name: &str) -> Option<MessageDescriptor> {
        self.messages().into_iter().find(|m| m.name() == name)
    }

    pub fn find_enum_by_name(&self, name: &str) -> Option<EnumDescriptor> {
        self.enums().into_iter().find(|e| e.name() == name)
    }

    pub fn find_service_by_name(&self, name: &str) -> Option<ServiceDescriptor> {
        self.services().into_iter().find(|s| s.name() == name)
    }

    pub fn find_extension_by_name(&self, name: &str) -> Option<FieldDescriptor> {
        self.extensions().into_iter().find(|e| e.name() == name)
    }

    /// The proto this file was built from.
    pub fn to_proto(&self) -> FileDescriptorProto {
        self.data().proto.clone()
    }

    /// The pool this file was built in.
    pub fn pool(&self) -> DescriptorPool {
        DescriptorPool::from_inner(Arc::clone(&self.pool))
    }
}

impl fmt::Debug for MessageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MessageDescriptor").field(&self.full_name()).finish()
    }
}

impl MessageDescriptor {
    pub fn name(&self) -> &str {
        &self.data().name
    }

    pub fn full_name(&self) -> &str {
        &self.data().full_name
    }

    pub fn file(&self) -> FileDescriptor {
        related::<FileDescriptor>(&self.pool, &self.layer, self.data().file)
    }

    /// Enclosing message for nested types.
    pub fn containing_type(&self) -> Option<MessageDescriptor> {
        self.data()
            .parent
            .map(|i| related::<MessageDescriptor>(&self.pool, &self.layer, i))
    }

    /// Position among its siblings.
    pub fn index(&self) -> usize {
        self.data().index
    }

    pub fn options(&self) -> &MessageOptions {
        &self.data().options
    }

    pub fn is_placeholder(&self) -> bool {
        self.data().is_placeholder
    }

    pub fn is_message_set(&self) -> bool {
        self.options().message_set_wire_format()
    }

    pub fn is_map_entry(&self) -> bool {
        self.options().map_entry()
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> impl ExactSizeIterator<Item = FieldDescriptor> + '_ {
        self.data()
            .fields
            .iter()
            .map(|&i| related::<FieldDescriptor>(&self.pool, &self.layer, i))
    }

    pub fn field_count(&self) -> usize {
        self.data().fields.len()
    }

    pub fn field(&self, index: usize) -> Option<FieldDescriptor> {
        let field = *self.data().fields.get(index)?;
        Some(related::<FieldDescriptor>(&self.pool, &self.layer, field))
    }

    pub fn get_field(&self, number: u32) -> Option<FieldDescriptor> {
        let number = i32::try_from(number).ok()?;
        let field = *self.data().fields_by_number.get(&number)?;
        Some(related::<FieldDescriptor>(&self.pool, &self.layer, field))
    }

    pub fn get_field_by_name(&self, name: &str) -> Option<FieldDescriptor> {
        let field = *self.data().fields_by_name.get(name)?;
        Some(related::<FieldDescriptor>(&self.pool, &self.layer, field))
    }

    pub fn get_field_by_lowercase_name(&self, name: &str) -> Option<FieldDescriptor> {
        self.fields().find(|f| f.name().to_ascii_lowercase() == name)
    }

    pub fn get_field_by_camelcase_name(&self, name: &str) -> Option<FieldDescriptor> {
        self.fields().find(|f| to_camel_case(f.name()) == name)
    }

    pub fn get_field_by_json_name(&self, name: &str) -> Option<FieldDescriptor> {
        self.fields().find(|f| f.json_name() == name)
    }

    pub fn oneofs(&self) -> Vec<OneofDescriptor> {
        related_all::<OneofDescriptor>(&self.pool, &self.layer, &self.data().oneofs)
    }

    pub fn get_oneof_by_name(&self, name: &str) -> Option<OneofDescriptor> {
        self.oneofs().into_iter().find(|o| o.name() == name)
    }

    pub fn nested_messages(&self) -> Vec<MessageDescriptor> {
        related_all::<MessageDescriptor>(&self.pool, &self.layer, &self.data().nested_messages)
    }

    pub fn nested_enums(&self) -> Vec<EnumDescriptor> {
        related_all::<EnumDescriptor>(&self.pool, &self.layer, &self.data().nested_enums)
    }

    /// Extensions declared inside this message's scope, whatever they extend.
    pub fn extensions(&self) -> Vec<FieldDescriptor> {
        related_all::<FieldDescriptor>(&self.pool, &self.layer, &self.data().extensions)
    }

    pub fn find_nested_message_by_name(&self, name: &str) -> Option<MessageDescriptor> {
        self.nested_messages().into_iter().find(|m| m.name() == name)
    }

    pub fn find_nested_enum_by_name(&self, name: &str) -> Option<EnumDescriptor> {
        self.nested_enums().into_iter().find(|e| e.name() == name)
    }

    /// Enum value declared by one of the nested enums, found by its
    /// unqualified name.
    pub fn find_enum_value_by_name(&self, name: &str) -> Option<EnumValueDescriptor> {
        self.nested_enums().iter().find_map(|e| e.get_value_by_name(name))
    }

    /// `[start, end)` pairs.
    pub fn extension_ranges(&self) -> &[(i32, i32)] {
        &self.data().extension_ranges
    }

    pub fn is_extension_number(&self, number: i32) -> bool {
        self.extension_ranges()
            .iter()
            .any(|&(start, end)| start <= number && number < end)
    }

    pub fn reserved_ranges(&self) -> &[(i32, i32)] {
        &self.data().reserved_ranges
    }

    pub fn reserved_names(&self) -> &[String] {
        &self.data().reserved_names
    }

    pub fn is_reserved_number(&self, number: i32) -> bool {
        self.reserved_ranges()
            .iter()
            .any(|&(start, end)| start <= number && number < end)
    }

    pub fn is_reserved_name(&self, name: &str) -> bool {
        self.reserved_names().iter().any(|n| n == name)
    }

    /// The pool this message type was built in.
    pub fn parent_pool(&self) -> DescriptorPool {
        DescriptorPool::from_inner(Arc::clone(&self.pool))
    }

    /// Extension of this message with the given number. Asks the pool, so
    /// extensions built after this handle was taken are found, and so are
    /// those its fallback database can load.
    pub fn find_extension_by_number(&self, number: u32) -> Option<FieldDescriptor> {
        if !i32::try_from(number).is_ok_and(|n| self.is_extension_number(n)) {
            return None;
        }
        self.parent_pool().find_extension_by_number(self, number)
    }

    /// Extension by full name, or for MessageSets by the full name of the
    /// message type that an item extension carries.
    pub fn find_extension_by_name(&self, name: &str) -> Option<FieldDescriptor> {
        let pool = self.parent_pool();
        if let Some(field) = pool.find_extension_by_name(name) {
            return (field.data().containing_type == self.index).then_some(field);
        }
        if !self.is_message_set() {
            return None;
        }
        let carried = pool.find_message_by_name(name)?;
        carried.extensions().into_iter().find(|ext| {
            ext.data().containing_type == self.index
                && ext.field_type() == Type::Message
                && !ext.is_list()
                && ext.message_type().as_ref() == Some(&carried)
        })
    }

    /// An empty message of this type.
    pub fn new_message(&self) -> DynamicMessage {
        DynamicMessage::new(self.clone())
    }
}

/// Declared type with its resolved message or enum target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Kind {
    Double,
    Float,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Sint32,
    Sint64,
    Fixed32,
    Fixed64,
    Sfixed32,
    Sfixed64,
    Bool,
    String,
    Bytes,
    Message(MessageDescriptor),
    Enum(EnumDescriptor),
}

impl fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FieldDescriptor").field(&self.full_name()).finish()
    }
}

impl FieldDescriptor {
    pub fn name(&self) -> &str {
        &self.data().name
    }

    pub fn full_name(&self) -> &str {
        &self.data().full_name
    }

    pub fn json_name(&self) -> &str {
        &self.data().json_name
    }

    pub fn has_json_name(&self) -> bool {
        self.data().has_json_name
    }

    pub fn camelcase_name(&self) -> String {
        to_camel_case(self.name())
    }

    pub fn number(&self) -> u32 {
        self.data().number as u32
    }

    pub fn label(&self) -> Label {
        self.data().label
    }

    pub fn is_required(&self) -> bool {
        self.label() == Label::Required
    }

    pub fn is_list(&self) -> bool {
        self.label() == Label::Repeated
    }

    pub fn field_type(&self) -> Type {
        self.data().ty
    }

    pub fn is_group(&self) -> bool {
        self.field_type() == Type::Group
    }

    pub fn kind(&self) -> Kind {
        let data = self.data();
        match data.ty {
            Type::Double => Kind::Double,
            Type::Float => Kind::Float,
            Type::Int64 => Kind::Int64,
            Type::Uint64 => Kind::Uint64,
            Type::Int32 => Kind::Int32,
            Type::Fixed64 => Kind::Fixed64,
            Type::Fixed32 => Kind::Fixed32,
            Type::Bool => Kind::Bool,
            Type::String => Kind::String,
            Type::Bytes => Kind::Bytes,
            Type::Uint32 => Kind::Uint32,
            Type::Sfixed32 => Kind::Sfixed32,
            Type::Sfixed64 => Kind::Sfixed64,
            Type::Sint32 => Kind::Sint32,
            Type::Sint64 => Kind::Sint64,
            Type::Group | Type::Message => {
                Kind::Message(related::<MessageDescriptor>(&self.pool, &self.layer, data.target))
            }
            Type::Enum => Kind::Enum(related::<EnumDescriptor>(&self.pool, &self.layer, data.target)),
        }
    }

    pub fn message_type(&self) -> Option<MessageDescriptor> {
        let data = self.data();
        matches!(data.ty, Type::Message | Type::Group)
            .then(|| related::<MessageDescriptor>(&self.pool, &self.layer, data.target))
    }

    pub fn enum_type(&self) -> Option<EnumDescriptor> {
        let data = self.data();
        (data.ty == Type::Enum).then(|| related::<EnumDescriptor>(&self.pool, &self.layer, data.target))
    }

    /// The message this field belongs to; the extendee for extensions.
    pub fn containing_type(&self) -> MessageDescriptor {
        related::<MessageDescriptor>(&self.pool, &self.layer, self.data().containing_type)
    }

    /// Message an extension was declared in, if not at file level.
    pub fn extension_scope(&self) -> Option<MessageDescriptor> {
        let data = self.data();
        if !data.is_extension {
            return None;
        }
        data.extension_scope
            .map(|i| related::<MessageDescriptor>(&self.pool, &self.layer, i))
    }

    pub fn containing_oneof(&self) -> Option<OneofDescriptor> {
        self.data()
            .oneof
            .map(|i| related::<OneofDescriptor>(&self.pool, &self.layer, i))
    }

    pub fn is_extension(&self) -> bool {
        self.data().is_extension
    }

    pub fn file(&self) -> FileDescriptor {
        related::<FileDescriptor>(&self.pool, &self.layer, self.data().file)
    }

    /// Position among the fields (or extensions) of its parent.
    pub fn index(&self) -> usize {
        self.data().index
    }

    pub fn options(&self) -> &FieldOptions {
        &self.data().options
    }

    pub fn has_default_value(&self) -> bool {
        self.data().default_value.is_some()
    }

    /// Explicit default, or the zero value of the type. Enums default to
    /// their first declared value, messages to an empty instance.
    pub fn default_value(&self) -> Value {
        if let Some(value) = &self.data().default_value {
            return value.clone();
        }
        match self.kind() {
            Kind::Double => Value::F64(0.0),
            Kind::Float => Value::F32(0.0),
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => Value::I32(0),
            Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => Value::I64(0),
            Kind::Uint32 | Kind::Fixed32 => Value::U32(0),
            Kind::Uint64 | Kind::Fixed64 => Value::U64(0),
            Kind::Bool => Value::Bool(false),
            Kind::String => Value::String(String::new()),
            Kind::Bytes => Value::Bytes(Vec::new()),
            Kind::Enum(e) => Value::EnumNumber(e.default_value().map_or(0, |v| v.number())),
            Kind::Message(m) => Value::Message(DynamicMessage::new(m)),
        }
    }

    /// Repeated scalar numeric field.
    pub fn is_packable(&self) -> bool {
        self.is_list() && wire::is_packable(self.field_type())
    }

    /// Whether repeated values are written as one packed run.
    pub fn is_packed(&self) -> bool {
        if !self.is_packable() {
            return false;
        }
        match self.options().packed {
            Some(packed) => packed,
            None => self.file().syntax() == Syntax::Proto3,
        }
    }

    /// Singular fields that track presence separately from their value.
    /// Proto3 scalars outside a oneof only report presence when non-default.
    pub fn supports_presence(&self) -> bool {
        if self.is_list() {
            return false;
        }
        self.message_type().is_some()
            || self.is_extension()
            || self.containing_oneof().is_some()
            || self.file().syntax() == Syntax::Proto2
    }
}

impl fmt::Debug for OneofDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OneofDescriptor").field(&self.full_name()).finish()
    }
}

impl OneofDescriptor {
    pub fn name(&self) -> &str {
        &self.data().name
    }

    pub fn full_name(&self) -> &str {
        &self.data().full_name
    }

    pub fn index(&self) -> usize {
        self.data().index
    }

    pub fn containing_type(&self) -> MessageDescriptor {
        related::<MessageDescriptor>(&self.pool, &self.layer, self.data().containing_type)
    }

    pub fn fields(&self) -> Vec<FieldDescriptor> {
        related_all::<FieldDescriptor>(&self.pool, &self.layer, &self.data().fields)
    }

    pub fn options(&self) -> &OneofOptions {
        &self.data().options
    }
}

impl fmt::Debug for EnumDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EnumDescriptor").field(&self.full_name()).finish()
    }
}

impl EnumDescriptor {
    pub fn name(&self) -> &str {
        &self.data().name
    }

    pub fn full_name(&self) -> &str {
        &self.data().full_name
    }

    pub fn file(&self) -> FileDescriptor {
        related::<FileDescriptor>(&self.pool, &self.layer, self.data().file)
    }

    pub fn containing_type(&self) -> Option<MessageDescriptor> {
        self.data()
            .parent
            .map(|i| related::<MessageDescriptor>(&self.pool, &self.layer, i))
    }

    pub fn index(&self) -> usize {
        self.data().index
    }

    pub fn options(&self) -> &EnumOptions {
        &self.data().options
    }

    pub fn is_placeholder(&self) -> bool {
        self.data().is_placeholder
    }

    /// Proto2 enums reject undeclared numbers when parsing.
    pub fn is_closed(&self) -> bool {
        !self.is_placeholder() && self.file().syntax() == Syntax::Proto2
    }

    pub fn values(&self) -> Vec<EnumValueDescriptor> {
        related_all::<EnumValueDescriptor>(&self.pool, &self.layer, &self.data().values)
    }

    pub fn value_count(&self) -> usize {
        self.data().values.len()
    }

    pub fn value(&self, index: usize) -> Option<EnumValueDescriptor> {
        let value = *self.data().values.get(index)?;
        Some(related::<EnumValueDescriptor>(&self.pool, &self.layer, value))
    }

    /// First declared value.
    pub fn default_value(&self) -> Option<EnumValueDescriptor> {
        self.value(0)
    }

    /// First declared value with this number.
    pub fn get_value(&self, number: i32) -> Option<EnumValueDescriptor> {
        let value = *self.data().values_by_number.get(&number)?;
        Some(related::<EnumValueDescriptor>(&self.pool, &self.layer, value))
    }

    pub fn get_value_by_name(&self, name: &str) -> Option<EnumValueDescriptor> {
        let value = *self.data().values_by_name.get(name)?;
        Some(related::<EnumValueDescriptor>(&self.pool, &self.layer, value))
    }
}

impl fmt::Debug for EnumValueDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("EnumValueDescriptor").field(&self.full_name()).finish()
    }
}

impl EnumValueDescriptor {
    pub fn name(&self) -> &str {
        &self.data().name
    }

    /// Sibling of the enum type, not a child: `pkg.FOO` for `pkg.Enum.FOO`.
    pub fn full_name(&self) -> &str {
        &self.data().full_name
    }

    pub fn number(&self) -> i32 {
        self.data().number
    }

    pub fn index(&self) -> usize {
        self.data().index
    }

    pub fn enum_type(&self) -> EnumDescriptor {
        related::<EnumDescriptor>(&self.pool, &self.layer, self.data().parent)
    }

    pub fn options(&self) -> &EnumValueOptions {
        &self.data().options
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ServiceDescriptor").field(&self.full_name()).finish()
    }
}

impl ServiceDescriptor {
    pub fn name(&self) -> &str {
        &self.data().name
    }

    pub fn full_name(&self) -> &str {
        &self.data().full_name
    }

    pub fn file(&self) -> FileDescriptor {
        related::<FileDescriptor>(&self.pool, &self.layer, self.data().file)
    }

    pub fn index(&self) -> usize {
        self.data().index
    }

    pub fn options(&self) -> &ServiceOptions {
        &self.data().options
    }

    pub fn methods(&self) -> Vec<MethodDescriptor> {
        related_all::<MethodDescriptor>(&self.pool, &self.layer, &self.data().methods)
    }

    pub fn find_method_by_name(&self, name: &str) -> Option<MethodDescriptor> {
        self.methods().into_iter().find(|m| m.name() == name)
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MethodDescriptor").field(&self.full_name()).finish()
    }
}

impl MethodDescriptor {
    pub fn name(&self) -> &str {
        &self.data().name
    }

    pub fn full_name(&self) -> &str {
        &self.data().full_name
    }

    pub fn index(&self) -> usize {
        self.data().index
    }

    pub fn service(&self) -> ServiceDescriptor {
        related::<ServiceDescriptor>(&self.pool, &self.layer, self.data().service)
    }

    pub fn input_type(&self) -> MessageDescriptor {
        related::<MessageDescriptor>(&self.pool, &self.layer, self.data().input)
    }

    pub fn output_type(&self) -> MessageDescriptor {
        related::<MessageDescriptor>(&self.pool, &self.layer, self.data().output)
    }

    pub fn client_streaming(&self) -> bool {
        self.data().client_streaming
    }

    pub fn server_streaming(&self) -> bool {
        self.data().server_streaming
    }

    pub fn options(&self) -> &MethodOptions {
        &self.data().options
    }
}

/// `foo_bar_baz` -> `fooBarBaz`.
pub(crate) fn to_json_name(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut capitalize_next = false;
    for c in name.chars() {
        if c == '_' {
            capitalize_next = true;
        } else if capitalize_next {
            result.push(c.to_ascii_uppercase());
            capitalize_next = false;
        } else {
            result.push(c);
        }
    }
    result
}

/// Like [`to_json_name`] but also lowercases the first letter.
pub(crate) fn to_camel_case(name: &str) -> String {
    let mut result = to_json_name(name);
    if let Some(first) = result.get_mut(0..1) {
        first.make_ascii_lowercase();
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_and_camel_case_names() {
        assert_eq!(to_json_name("foo_bar_baz"), "fooBarBaz");
        assert_eq!(to_json_name("FooBar"), "FooBar");
        assert_eq!(to_camel_case("FooBar"), "fooBar");
        assert_eq!(to_camel_case("foo__bar"), "fooBar");
        assert_eq!(to_camel_case(""), "");
    }

    #[test]
    fn rollback_forgets_names_added_after_checkpoint() {
        let mut data = PoolData::new();
        assert!(data.add_symbol("a", Symbol::Package(0)));
        data.add_checkpoint();
        assert!(data.add_symbol("b", Symbol::Package(0)));
        assert!(data.add_file_name("b.proto", 0));
        assert!(!data.add_symbol("a", Symbol::Message(0)));
        data.rollback_to_last_checkpoint();
        assert!(data.find_symbol("a").is_some());
        assert!(data.find_symbol("b").is_none());
        assert!(data.find_file("b.proto").is_none());
    }

    #[test]
    fn nested_checkpoints_roll_back_inner_commits() {
        let mut data = PoolData::new();
        data.add_checkpoint();
        data.add_checkpoint();
        data.add_symbol("inner", Symbol::Package(0));
        data.clear_last_checkpoint();
        data.rollback_to_last_checkpoint();
        assert!(data.find_symbol("inner").is_none());
    }

    #[test]
    fn sub_symbols_of_packages_are_not_built_types() {
        let mut data = PoolData::new();
        data.add_symbol("pkg", Symbol::Package(0));
        data.add_symbol("pkg.Foo", Symbol::Message(0));
        assert!(data.is_sub_symbol_of_built_type("pkg.Foo.bar"));
        assert!(!data.is_sub_symbol_of_built_type("pkg.Bar"));
    }

    fn file_data(name: &str) -> FileData {
        FileData {
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
            options: FileOptions::default(),
            proto: FileDescriptorProto::default(),
            is_placeholder: false,
        }
    }

    #[test]
    fn committed_builds_seal_their_own_layer() {
        let mut data = PoolData::new();
        data.add_checkpoint();
        assert_eq!(data.push(file_data("a.proto")), 0);
        let first = data.clear_last_checkpoint().unwrap();

        data.add_checkpoint();
        let b = data.push(file_data("b.proto"));
        data.file_mut(b).package = "pkg".into();
        let second = data.clear_last_checkpoint().unwrap();

        // Later builds neither copy nor touch earlier layers.
        assert_eq!(Arc::strong_count(&first), 2);
        assert!(Arc::ptr_eq(data.layer_of::<FileData>(0), &first));
        assert!(Arc::ptr_eq(data.layer_of::<FileData>(1), &second));
        assert_eq!(data.file(0).name, "a.proto");
        assert_eq!(data.file(1).package, "pkg");

        data.add_checkpoint();
        data.push(file_data("c.proto"));
        data.rollback_to_last_checkpoint();
        assert_eq!(data.counts().files, 2);
    }

    #[test]
    fn layers_without_an_element_kind_are_skipped() {
        let layers: Vec<Arc<Layer>> = [0, 2, 2, 5]
            .into_iter()
            .map(|files| {
                Arc::new(Layer::starting_at(Counts {
                    files,
                    ..Counts::default()
                }))
            })
            .collect();
        assert!(Arc::ptr_eq(find_layer::<FileData>(&layers, 1), &layers[0]));
        assert!(Arc::ptr_eq(find_layer::<FileData>(&layers, 3), &layers[2]));
        assert!(Arc::ptr_eq(find_layer::<FileData>(&layers, 5), &layers[3]));
    }
}
