//! Runtime construction of descriptors.
//!
//! A [`DescriptorPool`] turns `FileDescriptorProto`s into linked, validated
//! descriptors. Files are built one at a time and either land completely or
//! not at all: every build starts from a checkpoint and rolls back on the
//! first reported error. A pool may be backed by a [`DescriptorDatabase`],
//! in which case lookups that miss load the defining file (and its imports)
//! on demand.

mod build;
mod options;
mod resolve;

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use log::{debug, error, warn};
use parking_lot::{Mutex, RwLock};

use crate::descriptor::{
    find_layer, Element, EnumDescriptor, EnumValueDescriptor, FieldDescriptor, FileDescriptor, Layer,
    MessageDescriptor, MethodDescriptor, OneofDescriptor, PoolData, ServiceDescriptor, Symbol,
};
use crate::descriptor_database::DescriptorDatabase;
use crate::google::protobuf::{FileDescriptorProto, FileDescriptorSet};
use crate::Message;

/// The part of a definition an error refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorLocation {
    Name,
    Number,
    Type,
    Extendee,
    DefaultValue,
    InputType,
    OutputType,
    OptionName,
    OptionValue,
    Other,
}

impl ErrorLocation {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorLocation::Name => "NAME",
            ErrorLocation::Number => "NUMBER",
            ErrorLocation::Type => "TYPE",
            ErrorLocation::Extendee => "EXTENDEE",
            ErrorLocation::DefaultValue => "DEFAULT_VALUE",
            ErrorLocation::InputType => "INPUT_TYPE",
            ErrorLocation::OutputType => "OUTPUT_TYPE",
            ErrorLocation::OptionName => "OPTION_NAME",
            ErrorLocation::OptionValue => "OPTION_VALUE",
            ErrorLocation::Other => "OTHER",
        }
    }
}

impl fmt::Display for ErrorLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receives the problems found while building a file.
///
/// `element_name` is the full name of the offending definition, or the file
/// name for file-level problems.
pub trait ErrorCollector {
    fn add_error(&mut self, filename: &str, element_name: &str, location: ErrorLocation, message: &str);

    fn add_warning(&mut self, filename: &str, element_name: &str, location: ErrorLocation, message: &str) {
        let _ = (filename, element_name, location, message);
    }
}

/// One problem found while building a file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildError {
    pub filename: String,
    pub element_name: String,
    pub location: ErrorLocation,
    pub message: String,
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}: {}: {}",
            self.filename, self.element_name, self.location, self.message
        )
    }
}

/// A file could not be added to a pool.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DescriptorError {
    pub file: String,
    pub errors: Vec<BuildError>,
}

impl fmt::Display for DescriptorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid proto descriptor for file \"{}\":", self.file)?;
        for err in &self.errors {
            write!(f, "\n  {}: {}", err.element_name, err.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for DescriptorError {}

#[derive(Debug)]
enum Diagnostic {
    Error(BuildError),
    Warning(BuildError),
}

/// Diagnostics of one top-level pool operation, in the order they were
/// found. Nested builds triggered by fallback loads report into the same
/// sink.
#[derive(Debug)]
pub(crate) struct Report {
    diagnostics: Vec<Diagnostic>,
    log: bool,
}

impl Report {
    fn new(log: bool) -> Self {
        Report {
            diagnostics: Vec::new(),
            log,
        }
    }

    /// `first` marks the first error of the file being built, which gets a
    /// header line in the log.
    pub(crate) fn error(&mut self, first: bool, err: BuildError) {
        if self.log {
            if first {
                error!("Invalid proto descriptor for file \"{}\":", err.filename);
            }
            error!("  {}: {}", err.element_name, err.message);
        }
        self.diagnostics.push(Diagnostic::Error(err));
    }

    pub(crate) fn warning(&mut self, warning: BuildError) {
        if self.log {
            warn!("{} {}: {}", warning.filename, warning.element_name, warning.message);
        }
        self.diagnostics.push(Diagnostic::Warning(warning));
    }

    fn errors_for(&self, file: &str) -> Vec<BuildError> {
        self.diagnostics
            .iter()
            .filter_map(|d| match d {
                Diagnostic::Error(err) if err.filename == file => Some(err.clone()),
                _ => None,
            })
            .collect()
    }

    fn forward(&self, collector: &mut dyn ErrorCollector) {
        for diagnostic in &self.diagnostics {
            match diagnostic {
                Diagnostic::Error(e) => {
                    collector.add_error(&e.filename, &e.element_name, e.location, &e.message)
                }
                Diagnostic::Warning(w) => {
                    collector.add_warning(&w.filename, &w.element_name, w.location, &w.message)
                }
            }
        }
    }
}

pub(crate) struct PoolState {
    pool: Weak<PoolInner>,
    pub(crate) data: PoolData,
    fallback: Option<Box<dyn DescriptorDatabase>>,
    fallback_collector: Option<Box<dyn ErrorCollector + Send>>,
    pub(crate) allow_unknown: bool,
    known_bad_files: HashSet<String>,
    known_bad_symbols: HashSet<String>,
    /// Extendees whose extension numbers were already fetched in bulk.
    extensions_loaded: HashSet<usize>,
    /// Files whose imports are being loaded from the fallback database.
    pending_files: Vec<String>,
}

impl PoolState {
    fn new(
        pool: Weak<PoolInner>,
        fallback: Option<Box<dyn DescriptorDatabase>>,
        fallback_collector: Option<Box<dyn ErrorCollector + Send>>,
    ) -> Self {
        PoolState {
            pool,
            data: PoolData::new(),
            fallback,
            fallback_collector,
            allow_unknown: false,
            known_bad_files: HashSet::new(),
            known_bad_symbols: HashSet::new(),
            extensions_loaded: HashSet::new(),
            pending_files: Vec::new(),
        }
    }

    /// Runs a lookup that may build files from the fallback database and
    /// routes its diagnostics to the fallback collector.
    fn with_fallback<R>(&mut self, f: impl FnOnce(&mut PoolState, &mut Report) -> R) -> R {
        let mut report = Report::new(self.fallback_collector.is_none());
        let result = f(self, &mut report);
        if let Some(collector) = self.fallback_collector.as_mut() {
            report.forward(collector.as_mut());
        }
        result
    }

    pub(crate) fn pool(&self) -> Option<Arc<PoolInner>> {
        self.pool.upgrade()
    }

    /// Makes a sealed layer reachable from handles.
    pub(crate) fn publish(&self, layer: Arc<Layer>) {
        if let Some(pool) = self.pool.upgrade() {
            pool.layers.write().push(layer);
        }
    }

    fn build_from_database(&mut self, proto: &FileDescriptorProto, report: &mut Report) -> Option<usize> {
        // A file that failed once fails again; its imports are not asked for.
        if self.known_bad_files.contains(proto.name()) {
            return None;
        }
        debug!("Loading {} from the fallback database", proto.name());
        let built = self.build_file(proto, report);
        if built.is_none() {
            debug!("{} from the fallback database failed to build", proto.name());
            self.known_bad_files.insert(proto.name().to_owned());
        }
        built
    }

    pub(crate) fn try_find_file_in_fallback(&mut self, name: &str, report: &mut Report) -> bool {
        if self.known_bad_files.contains(name) {
            return false;
        }
        let Some(proto) = self.fallback.as_ref().and_then(|db| db.find_file_by_name(name)) else {
            self.known_bad_files.insert(name.to_owned());
            return false;
        };
        self.build_from_database(&proto, report).is_some()
    }

    pub(crate) fn try_find_symbol_in_fallback(&mut self, name: &str, report: &mut Report) -> bool {
        if self.fallback.is_none() || self.known_bad_symbols.contains(name) {
            return false;
        }
        // A member of a type that is already built cannot come from another
        // file.
        if self.data.is_sub_symbol_of_built_type(name) {
            return false;
        }
        let proto = self
            .fallback
            .as_ref()
            .and_then(|db| db.find_file_containing_symbol(name));
        let found = match proto {
            // The database is out of sync with the files already built.
            Some(proto) if self.data.find_file(proto.name()).is_some() => {
                debug!("Fallback database names {} for {name}, which does not define it", proto.name());
                false
            }
            Some(proto) => self.build_from_database(&proto, report).is_some(),
            None => false,
        };
        if !found {
            self.known_bad_symbols.insert(name.to_owned());
        }
        found
    }

    pub(crate) fn try_find_extension_in_fallback(
        &mut self,
        extendee: &str,
        number: i32,
        report: &mut Report,
    ) -> bool {
        let Some(proto) = self
            .fallback
            .as_ref()
            .and_then(|db| db.find_file_containing_extension(extendee, number))
        else {
            return false;
        };
        if self.data.find_file(proto.name()).is_some() {
            return false;
        }
        self.build_from_database(&proto, report).is_some()
    }

    fn find_symbol(&mut self, name: &str) -> Option<Symbol> {
        if let Some(symbol) = self.data.find_symbol(name) {
            return Some(symbol);
        }
        if self.fallback.is_none() {
            return None;
        }
        self.with_fallback(|state, report| state.try_find_symbol_in_fallback(name, report));
        self.data.find_symbol(name)
    }
}

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(1);

/// Shared by a [`DescriptorPool`] and every descriptor taken from it.
pub(crate) struct PoolInner {
    pub(crate) id: u64,
    /// Sealed layers, for handles following references into other files.
    layers: RwLock<Vec<Arc<Layer>>>,
    state: Mutex<PoolState>,
}

impl PoolInner {
    pub(crate) fn layer_of<T: Element>(&self, index: usize) -> Arc<Layer> {
        Arc::clone(find_layer::<T>(&self.layers.read(), index))
    }
}

/// A set of built files, their symbols and their extensions.
///
/// Cloning a pool is cheap and yields another handle to the same pool.
/// Descriptors handed out keep the pool alive and stay valid while it goes
/// on growing.
#[derive(Clone)]
pub struct DescriptorPool {
    inner: Arc<PoolInner>,
}

impl Default for DescriptorPool {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DescriptorPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("DescriptorPool")
            .field("files", &state.data.file_names.len())
            .field("has_fallback", &state.fallback.is_some())
            .finish()
    }
}

impl DescriptorPool {
    pub fn new() -> Self {
        Self::with_fallback(None, None)
    }

    /// A pool that loads files from `database` when a lookup misses. Build
    /// errors of loaded files are logged.
    pub fn with_database(database: impl DescriptorDatabase + 'static) -> Self {
        Self::with_fallback(Some(Box::new(database)), None)
    }

    /// Like [`with_database`](Self::with_database), with build errors of
    /// loaded files sent to `collector` instead of the log.
    pub fn with_database_and_collector(
        database: impl DescriptorDatabase + 'static,
        collector: impl ErrorCollector + Send + 'static,
    ) -> Self {
        Self::with_fallback(Some(Box::new(database)), Some(Box::new(collector)))
    }

    fn with_fallback(
        fallback: Option<Box<dyn DescriptorDatabase>>,
        fallback_collector: Option<Box<dyn ErrorCollector + Send>>,
    ) -> Self {
        let inner = Arc::new_cyclic(|pool| PoolInner {
            id: NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed),
            layers: RwLock::new(Vec::new()),
            state: Mutex::new(PoolState::new(pool.clone(), fallback, fallback_collector)),
        });
        DescriptorPool { inner }
    }

    pub(crate) fn from_inner(inner: Arc<PoolInner>) -> Self {
        DescriptorPool { inner }
    }

    /// Pool holding `google/protobuf/descriptor.proto`, used to read custom
    /// options when the pool being built lacks the options messages.
    pub fn bootstrap() -> &'static DescriptorPool {
        static BOOTSTRAP: OnceLock<DescriptorPool> = OnceLock::new();
        BOOTSTRAP.get_or_init(|| {
            let pool = DescriptorPool::new();
            if let Err(err) = pool.add_file(&crate::google::protobuf::descriptor_file_proto()) {
                error!("{err}");
            }
            pool
        })
    }

    /// Lets imports and type references that cannot be resolved stand in as
    /// placeholders instead of failing the build.
    pub fn allow_unknown_dependencies(&self) {
        self.inner.state.lock().allow_unknown = true;
    }

    /// Builds `proto` into the pool. Errors are also logged.
    ///
    /// Adding a file that is already present with identical contents returns
    /// the existing descriptor.
    pub fn add_file(&self, proto: &FileDescriptorProto) -> Result<FileDescriptor, DescriptorError> {
        let mut report = Report::new(true);
        let mut state = self.inner.state.lock();
        let built = state.build_file(proto, &mut report);
        built.map(|i| state.data.handle(&self.inner, i)).ok_or_else(|| DescriptorError {
            file: proto.name().to_owned(),
            errors: report.errors_for(proto.name()),
        })
    }

    /// Builds `proto`, sending every error and warning to `collector`
    /// instead of the log.
    pub fn add_file_with_collector(
        &self,
        proto: &FileDescriptorProto,
        collector: &mut dyn ErrorCollector,
    ) -> Option<FileDescriptor> {
        let mut report = Report::new(false);
        let built = {
            let mut state = self.inner.state.lock();
            let built = state.build_file(proto, &mut report);
            built.map(|i| state.data.handle(&self.inner, i))
        };
        report.forward(collector);
        built
    }

    /// Builds every file of `set`. Files in the set may come in any order;
    /// each is built after the files of the set it imports.
    pub fn add_file_descriptor_set(&self, set: &FileDescriptorSet) -> Result<Vec<FileDescriptor>, DescriptorError> {
        let by_name: HashMap<&str, &FileDescriptorProto> =
            set.file.iter().map(|f| (f.name(), f)).collect();
        let mut visited = HashSet::new();
        let mut built = Vec::with_capacity(set.file.len());
        for file in &set.file {
            self.add_in_dependency_order(file, &by_name, &mut visited, &mut built)?;
        }
        Ok(built)
    }

    fn add_in_dependency_order<'s>(
        &self,
        file: &'s FileDescriptorProto,
        by_name: &HashMap<&str, &'s FileDescriptorProto>,
        visited: &mut HashSet<&'s str>,
        built: &mut Vec<FileDescriptor>,
    ) -> Result<(), DescriptorError> {
        if !visited.insert(file.name()) {
            return Ok(());
        }
        for dep in &file.dependency {
            if let Some(&dep_proto) = by_name.get(dep.as_str()) {
                self.add_in_dependency_order(dep_proto, by_name, visited, built)?;
            }
        }
        built.push(self.add_file(file)?);
        Ok(())
    }

    /// Decodes a serialized `FileDescriptorSet` and builds its files.
    pub fn decode_file_descriptor_set(&self, bytes: &[u8]) -> Result<Vec<FileDescriptor>, crate::Error> {
        let set = FileDescriptorSet::decode(bytes)?;
        Ok(self.add_file_descriptor_set(&set)?)
    }

    /// Every file built so far, in build order.
    pub fn files(&self) -> Vec<FileDescriptor> {
        let state = self.inner.state.lock();
        (0..state.data.counts().files)
            .filter(|&i| !state.data.file(i).is_placeholder)
            .map(|i| state.data.handle(&self.inner, i))
            .collect()
    }

    pub fn find_file_by_name(&self, name: &str) -> Option<FileDescriptor> {
        let mut state = self.inner.state.lock();
        if state.data.find_file(name).is_none() && state.fallback.is_some() {
            state.with_fallback(|st, report| st.try_find_file_in_fallback(name, report));
        }
        let index = state.data.find_file(name)?;
        Some(state.data.handle(&self.inner, index))
    }

    /// Looks `name` up, loading it from the fallback database on a miss,
    /// and hands the symbol to `make` while the pool is locked.
    fn find_symbol<R>(&self, name: &str, make: impl FnOnce(&PoolData, Symbol) -> Option<R>) -> Option<R> {
        let mut state = self.inner.state.lock();
        let symbol = state.find_symbol(name)?;
        make(&state.data, symbol)
    }

    /// File that defines `symbol_name`.
    pub fn find_file_containing_symbol(&self, symbol_name: &str) -> Option<FileDescriptor> {
        self.find_symbol(symbol_name, |data, symbol| {
            Some(data.handle(&self.inner, data.symbol_file(symbol)))
        })
    }

    pub fn find_message_by_name(&self, name: &str) -> Option<MessageDescriptor> {
        self.find_symbol(name, |data, symbol| match symbol {
            Symbol::Message(i) => Some(data.handle(&self.inner, i)),
            _ => None,
        })
    }

    /// A field of a message. Extensions are not fields.
    pub fn find_field_by_name(&self, name: &str) -> Option<FieldDescriptor> {
        self.find_symbol(name, |data, symbol| match symbol {
            Symbol::Field(i) if !data.field(i).is_extension => Some(data.handle(&self.inner, i)),
            _ => None,
        })
    }

    pub fn find_extension_by_name(&self, name: &str) -> Option<FieldDescriptor> {
        self.find_symbol(name, |data, symbol| match symbol {
            Symbol::Field(i) if data.field(i).is_extension => Some(data.handle(&self.inner, i)),
            _ => None,
        })
    }

    pub fn find_oneof_by_name(&self, name: &str) -> Option<OneofDescriptor> {
        self.find_symbol(name, |data, symbol| match symbol {
            Symbol::Oneof(i) => Some(data.handle(&self.inner, i)),
            _ => None,
        })
    }

    pub fn find_enum_by_name(&self, name: &str) -> Option<EnumDescriptor> {
        self.find_symbol(name, |data, symbol| match symbol {
            Symbol::Enum(i) => Some(data.handle(&self.inner, i)),
            _ => None,
        })
    }

    /// Enum values are named as siblings of their enum: `pkg.FOO`, not
    /// `pkg.MyEnum.FOO`.
    pub fn find_enum_value_by_name(&self, name: &str) -> Option<EnumValueDescriptor> {
        self.find_symbol(name, |data, symbol| match symbol {
            Symbol::EnumValue(i) => Some(data.handle(&self.inner, i)),
            _ => None,
        })
    }

    pub fn find_service_by_name(&self, name: &str) -> Option<ServiceDescriptor> {
        self.find_symbol(name, |data, symbol| match symbol {
            Symbol::Service(i) => Some(data.handle(&self.inner, i)),
            _ => None,
        })
    }

    pub fn find_method_by_name(&self, name: &str) -> Option<MethodDescriptor> {
        self.find_symbol(name, |data, symbol| match symbol {
            Symbol::Method(i) => Some(data.handle(&self.inner, i)),
            _ => None,
        })
    }

    /// Extension `number` of `extendee`, loading its file from the fallback
    /// database if needed.
    pub fn find_extension_by_number(&self, extendee: &MessageDescriptor, number: u32) -> Option<FieldDescriptor> {
        let number = i32::try_from(number).ok()?;
        if extendee.pool.id != self.inner.id {
            return None;
        }
        let index = extendee.index;
        let mut state = self.inner.state.lock();
        if state.data.find_extension(index, number).is_none() && state.fallback.is_some() {
            let full_name = extendee.full_name().to_owned();
            state.with_fallback(|st, report| st.try_find_extension_in_fallback(&full_name, number, report));
        }
        let field = state.data.find_extension(index, number)?;
        Some(state.data.handle(&self.inner, field))
    }

    /// Every known extension of `extendee`, ordered by number. With a
    /// fallback database, asks it once for all extension numbers and loads
    /// the files defining them.
    pub fn find_all_extensions(&self, extendee: &MessageDescriptor) -> Vec<FieldDescriptor> {
        if extendee.pool.id != self.inner.id {
            return Vec::new();
        }
        let index = extendee.index;
        let mut state = self.inner.state.lock();
        if !state.extensions_loaded.contains(&index) {
            let numbers = state
                .fallback
                .as_ref()
                .and_then(|db| db.find_all_extension_numbers(extendee.full_name()));
            if let Some(numbers) = numbers {
                let full_name = extendee.full_name().to_owned();
                state.with_fallback(|st, report| {
                    for number in numbers {
                        if st.data.find_extension(index, number).is_none() {
                            st.try_find_extension_in_fallback(&full_name, number, report);
                        }
                    }
                });
                state.extensions_loaded.insert(index);
            }
        }
        state
            .data
            .extensions_of(index)
            .into_iter()
            .map(|i| state.data.handle(&self.inner, i))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{file_from_text, MockErrorCollector};

    #[test]
    fn location_names() {
        assert_eq!(ErrorLocation::DefaultValue.to_string(), "DEFAULT_VALUE");
        assert_eq!(ErrorLocation::OptionName.to_string(), "OPTION_NAME");
    }

    #[test]
    fn descriptor_error_lists_each_problem() {
        let err = DescriptorError {
            file: "foo.proto".into(),
            errors: vec![BuildError {
                filename: "foo.proto".into(),
                element_name: "Foo".into(),
                location: ErrorLocation::Name,
                message: "\"Foo\" is already defined.".into(),
            }],
        };
        assert_eq!(
            err.to_string(),
            "Invalid proto descriptor for file \"foo.proto\":\n  Foo: \"Foo\" is already defined."
        );
    }

    #[test]
    fn failed_build_leaves_no_trace() {
        let pool = DescriptorPool::new();
        let bad = file_from_text(
            r#"name: "bad.proto" package: "pkg"
               message_type { name: "Foo" field { name: "x" number: 1 label: LABEL_OPTIONAL type_name: "Missing" } }"#,
        );
        let mut collector = MockErrorCollector::default();
        assert!(pool.add_file_with_collector(&bad, &mut collector).is_none());
        assert_eq!(
            collector.text(),
            "bad.proto: pkg.Foo.x: TYPE: \"Missing\" is not defined.\n"
        );
        assert!(pool.find_message_by_name("pkg.Foo").is_none());
        assert!(pool.find_file_by_name("bad.proto").is_none());

        let good = file_from_text(r#"name: "bad.proto" package: "pkg" message_type { name: "Foo" }"#);
        assert!(pool.add_file(&good).is_ok());
        assert!(pool.find_message_by_name("pkg.Foo").is_some());
    }

    #[test]
    fn identical_file_can_be_added_twice() {
        let pool = DescriptorPool::new();
        let file = file_from_text(r#"name: "a.proto" message_type { name: "A" }"#);
        let first = pool.add_file(&file).unwrap();
        let second = pool.add_file(&file).unwrap();
        assert_eq!(first, second);

        let changed = file_from_text(r#"name: "a.proto" message_type { name: "B" }"#);
        let err = pool.add_file(&changed).unwrap_err();
        assert_eq!(err.errors[0].message, "A file with this name is already in the pool.");
    }

    #[test]
    fn handles_outlive_later_builds() {
        let pool = DescriptorPool::new();
        pool.add_file(&file_from_text(r#"name: "a.proto" message_type { name: "A" }"#))
            .unwrap();
        let a = pool.find_message_by_name("A").unwrap();
        pool.add_file(&file_from_text(
            r#"name: "b.proto" dependency: "a.proto"
               message_type { name: "B" field { name: "a" number: 1 label: LABEL_OPTIONAL type_name: "A" } }"#,
        ))
        .unwrap();
        let b = pool.find_message_by_name("B").unwrap();
        assert_eq!(b.get_field_by_name("a").unwrap().message_type(), Some(a.clone()));
        assert_eq!(a.name(), "A");
    }

    #[test]
    fn descriptor_set_is_built_in_dependency_order() {
        let set = FileDescriptorSet {
            file: vec![
                file_from_text(r#"name: "b.proto" dependency: "a.proto""#),
                file_from_text(r#"name: "a.proto""#),
            ],
            ..Default::default()
        };
        let pool = DescriptorPool::new();
        let files = pool.decode_file_descriptor_set(&set.encode_to_vec()).unwrap();
        let names: Vec<&str> = files.iter().map(|f| f.name()).collect();
        assert_eq!(names, ["a.proto", "b.proto"]);
        assert_eq!(pool.files().len(), 2);
    }

    #[test]
    fn lookups_do_not_cross_kinds() {
        let pool = DescriptorPool::new();
        pool.add_file(&file_from_text(
            r#"name: "a.proto" package: "p"
               message_type { name: "M" field { name: "f" number: 1 label: LABEL_OPTIONAL type: TYPE_INT32 }
                              extension_range { start: 10 end: 20 } }
               enum_type { name: "E" value { name: "V" number: 0 } }
               extension { name: "ext" number: 10 label: LABEL_OPTIONAL type: TYPE_INT32 extendee: ".p.M" }"#,
        ))
        .unwrap();
        assert!(pool.find_message_by_name("p.E").is_none());
        assert!(pool.find_enum_by_name("p.E").is_some());
        assert!(pool.find_enum_value_by_name("p.V").is_some());
        assert!(pool.find_field_by_name("p.M.f").is_some());
        assert!(pool.find_field_by_name("p.ext").is_none());
        let ext = pool.find_extension_by_name("p.ext").unwrap();
        let m = pool.find_message_by_name("p.M").unwrap();
        assert_eq!(pool.find_extension_by_number(&m, 10), Some(ext.clone()));
        assert_eq!(pool.find_all_extensions(&m), vec![ext]);
        assert_eq!(pool.find_file_containing_symbol("p.M.f").unwrap().name(), "a.proto");
    }
}
