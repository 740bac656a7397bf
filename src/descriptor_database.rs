//! Sources of `FileDescriptorProto`s that a [`DescriptorPool`] can load from
//! lazily.
//!
//! Symbol lookups are by fully-qualified name without a leading dot. A file
//! is found through any symbol nested under one of its top-level symbols,
//! so `pkg.Foo.bar` finds the file that defines `pkg.Foo`.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;
use std::sync::Arc;

use log::error;

use crate::descriptor_pool::DescriptorPool;
use crate::google::protobuf::{DescriptorProto, FieldDescriptorProto, FileDescriptorProto};
use crate::Message;

pub trait DescriptorDatabase: Send + Sync {
    fn find_file_by_name(&self, name: &str) -> Option<FileDescriptorProto>;

    fn find_file_containing_symbol(&self, symbol: &str) -> Option<FileDescriptorProto>;

    /// The file declaring extension `number` of the fully-qualified
    /// `extendee`.
    fn find_file_containing_extension(&self, extendee: &str, number: i32) -> Option<FileDescriptorProto>;

    /// Every known extension number of `extendee`, or `None` when the
    /// database cannot tell.
    fn find_all_extension_numbers(&self, _extendee: &str) -> Option<Vec<i32>> {
        None
    }
}

impl<D: DescriptorDatabase + ?Sized> DescriptorDatabase for Arc<D> {
    fn find_file_by_name(&self, name: &str) -> Option<FileDescriptorProto> {
        (**self).find_file_by_name(name)
    }

    fn find_file_containing_symbol(&self, symbol: &str) -> Option<FileDescriptorProto> {
        (**self).find_file_containing_symbol(symbol)
    }

    fn find_file_containing_extension(&self, extendee: &str, number: i32) -> Option<FileDescriptorProto> {
        (**self).find_file_containing_extension(extendee, number)
    }

    fn find_all_extension_numbers(&self, extendee: &str) -> Option<Vec<i32>> {
        (**self).find_all_extension_numbers(extendee)
    }
}

impl<D: DescriptorDatabase + ?Sized> DescriptorDatabase for Box<D> {
    fn find_file_by_name(&self, name: &str) -> Option<FileDescriptorProto> {
        (**self).find_file_by_name(name)
    }

    fn find_file_containing_symbol(&self, symbol: &str) -> Option<FileDescriptorProto> {
        (**self).find_file_containing_symbol(symbol)
    }

    fn find_file_containing_extension(&self, extendee: &str, number: i32) -> Option<FileDescriptorProto> {
        (**self).find_file_containing_extension(extendee, number)
    }

    fn find_all_extension_numbers(&self, extendee: &str) -> Option<Vec<i32>> {
        (**self).find_all_extension_numbers(extendee)
    }
}

fn is_valid_symbol_name(name: &str) -> bool {
    name.bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'.')
}

/// `sub` is `sup` or an enclosing scope of it.
fn is_sub_symbol(sub: &str, sup: &str) -> bool {
    sup.starts_with(sub) && (sup.len() == sub.len() || sup.as_bytes()[sub.len()] == b'.')
}

/// Name, symbol and extension indices shared by the owned databases. Values
/// are positions in the owner's file list.
#[derive(Debug, Default)]
struct DescriptorIndex {
    by_name: HashMap<String, usize>,
    /// Top-level symbols only; nested names are found by prefix.
    by_symbol: BTreeMap<String, usize>,
    by_extension: BTreeMap<(String, i32), usize>,
}

/// What one `add_file` inserted, so a failed add can be undone.
#[derive(Default)]
struct Undo {
    symbols: Vec<String>,
    extensions: Vec<(String, i32)>,
}

impl DescriptorIndex {
    /// Indexes `file`. A file that conflicts with what is already indexed is
    /// rejected as a whole.
    fn add_file(&mut self, file: &FileDescriptorProto, value: usize) -> bool {
        if self.by_name.contains_key(file.name()) {
            error!("File already exists in database: {}", file.name());
            return false;
        }
        let mut undo = Undo::default();
        if self.index_file(file, value, &mut undo) {
            self.by_name.insert(file.name().to_owned(), value);
            true
        } else {
            for symbol in undo.symbols {
                self.by_symbol.remove(&symbol);
            }
            for key in undo.extensions {
                self.by_extension.remove(&key);
            }
            false
        }
    }

    fn index_file(&mut self, file: &FileDescriptorProto, value: usize, undo: &mut Undo) -> bool {
        let prefix = if file.package().is_empty() {
            String::new()
        } else {
            format!("{}.", file.package())
        };
        for message in &file.message_type {
            if !self.add_symbol(format!("{prefix}{}", message.name()), value, undo)
                || !self.add_nested_extensions(message, value, undo)
            {
                return false;
            }
        }
        for enum_type in &file.enum_type {
            if !self.add_symbol(format!("{prefix}{}", enum_type.name()), value, undo) {
                return false;
            }
        }
        for extension in &file.extension {
            if !self.add_symbol(format!("{prefix}{}", extension.name()), value, undo)
                || !self.add_extension(extension, value, undo)
            {
                return false;
            }
        }
        for service in &file.service {
            if !self.add_symbol(format!("{prefix}{}", service.name()), value, undo) {
                return false;
            }
        }
        true
    }

    fn add_symbol(&mut self, name: String, value: usize, undo: &mut Undo) -> bool {
        if !is_valid_symbol_name(&name) {
            error!("Invalid symbol name: {name}");
            return false;
        }
        // Names sort with '.' before every other symbol character, so only
        // the neighbours of `name` can enclose it or be nested in it.
        if let Some((existing, _)) = self.last_less_or_equal(&name) {
            if is_sub_symbol(existing, &name) {
                error!("Symbol name \"{name}\" conflicts with the existing symbol \"{existing}\".");
                return false;
            }
        }
        let next = self
            .by_symbol
            .range::<str, _>((Bound::Excluded(name.as_str()), Bound::Unbounded))
            .next();
        if let Some((existing, _)) = next {
            if is_sub_symbol(&name, existing) {
                error!("Symbol name \"{name}\" conflicts with a more-specific symbol \"{existing}\".");
                return false;
            }
        }
        undo.symbols.push(name.clone());
        self.by_symbol.insert(name, value);
        true
    }

    fn add_nested_extensions(&mut self, message: &DescriptorProto, value: usize, undo: &mut Undo) -> bool {
        message
            .nested_type
            .iter()
            .all(|nested| self.add_nested_extensions(nested, value, undo))
            && message
                .extension
                .iter()
                .all(|extension| self.add_extension(extension, value, undo))
    }

    fn add_extension(&mut self, field: &FieldDescriptorProto, value: usize, undo: &mut Undo) -> bool {
        // Relative extendees cannot be resolved here; the file is still
        // valid, the extension just is not indexed.
        let Some(extendee) = field.extendee().strip_prefix('.') else {
            return true;
        };
        let key = (extendee.to_owned(), field.number());
        if self.by_extension.contains_key(&key) {
            error!(
                "Extension conflicts with extension already in database: extend {} {{ {} = {} }}",
                field.extendee(),
                field.name(),
                field.number()
            );
            return false;
        }
        undo.extensions.push(key.clone());
        self.by_extension.insert(key, value);
        true
    }

    fn last_less_or_equal(&self, name: &str) -> Option<(&str, usize)> {
        self.by_symbol
            .range::<str, _>((Bound::Unbounded, Bound::Included(name)))
            .next_back()
            .map(|(k, &v)| (k.as_str(), v))
    }

    fn find_file(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    fn find_symbol(&self, name: &str) -> Option<usize> {
        let (existing, value) = self.last_less_or_equal(name)?;
        is_sub_symbol(existing, name).then_some(value)
    }

    fn find_extension(&self, extendee: &str, number: i32) -> Option<usize> {
        self.by_extension.get(&(extendee.to_owned(), number)).copied()
    }

    fn find_all_extension_numbers(&self, extendee: &str) -> Option<Vec<i32>> {
        let numbers: Vec<i32> = self
            .by_extension
            .range((extendee.to_owned(), i32::MIN)..)
            .take_while(|((name, _), _)| name == extendee)
            .map(|((_, number), _)| *number)
            .collect();
        (!numbers.is_empty()).then_some(numbers)
    }
}

/// A database over `FileDescriptorProto`s held in memory.
#[derive(Debug, Default)]
pub struct SimpleDescriptorDatabase {
    index: DescriptorIndex,
    files: Vec<FileDescriptorProto>,
}

impl SimpleDescriptorDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `file`. Returns false, logging why, if its name or one of its
    /// symbols or extensions is already taken.
    pub fn add(&mut self, file: FileDescriptorProto) -> bool {
        if !self.index.add_file(&file, self.files.len()) {
            return false;
        }
        self.files.push(file);
        true
    }
}

impl DescriptorDatabase for SimpleDescriptorDatabase {
    fn find_file_by_name(&self, name: &str) -> Option<FileDescriptorProto> {
        Some(self.files[self.index.find_file(name)?].clone())
    }

    fn find_file_containing_symbol(&self, symbol: &str) -> Option<FileDescriptorProto> {
        Some(self.files[self.index.find_symbol(symbol)?].clone())
    }

    fn find_file_containing_extension(&self, extendee: &str, number: i32) -> Option<FileDescriptorProto> {
        Some(self.files[self.index.find_extension(extendee, number)?].clone())
    }

    fn find_all_extension_numbers(&self, extendee: &str) -> Option<Vec<i32>> {
        self.index.find_all_extension_numbers(extendee)
    }
}

/// A database over serialized `FileDescriptorProto`s, decoded on lookup.
#[derive(Debug, Default)]
pub struct EncodedDescriptorDatabase {
    index: DescriptorIndex,
    files: Vec<Vec<u8>>,
    /// File names by position, parallel to `files`.
    names: Vec<String>,
}

impl EncodedDescriptorDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one encoded file. Returns false, logging why, if the bytes do
    /// not decode or the file conflicts with one already added.
    pub fn add(&mut self, bytes: &[u8]) -> bool {
        let Ok(file) = FileDescriptorProto::decode(bytes) else {
            error!("Invalid file descriptor data passed to EncodedDescriptorDatabase::add().");
            return false;
        };
        if !self.index.add_file(&file, self.files.len()) {
            return false;
        }
        self.files.push(bytes.to_vec());
        self.names.push(file.name.unwrap_or_default());
        true
    }

    /// Name of the file defining `symbol`, without decoding the whole file.
    pub fn find_name_of_file_containing_symbol(&self, symbol: &str) -> Option<String> {
        self.names.get(self.index.find_symbol(symbol)?).cloned()
    }

    fn decode(&self, value: usize) -> Option<FileDescriptorProto> {
        FileDescriptorProto::decode(&self.files[value]).ok()
    }
}

impl DescriptorDatabase for EncodedDescriptorDatabase {
    fn find_file_by_name(&self, name: &str) -> Option<FileDescriptorProto> {
        self.decode(self.index.find_file(name)?)
    }

    fn find_file_containing_symbol(&self, symbol: &str) -> Option<FileDescriptorProto> {
        self.decode(self.index.find_symbol(symbol)?)
    }

    fn find_file_containing_extension(&self, extendee: &str, number: i32) -> Option<FileDescriptorProto> {
        self.decode(self.index.find_extension(extendee, number)?)
    }

    fn find_all_extension_numbers(&self, extendee: &str) -> Option<Vec<i32>> {
        self.index.find_all_extension_numbers(extendee)
    }
}

/// The files of a [`DescriptorPool`], served as a database.
#[derive(Clone, Debug)]
pub struct DescriptorPoolDatabase {
    pool: DescriptorPool,
}

impl DescriptorPoolDatabase {
    pub fn new(pool: DescriptorPool) -> Self {
        DescriptorPoolDatabase { pool }
    }
}

impl DescriptorDatabase for DescriptorPoolDatabase {
    fn find_file_by_name(&self, name: &str) -> Option<FileDescriptorProto> {
        Some(self.pool.find_file_by_name(name)?.to_proto())
    }

    fn find_file_containing_symbol(&self, symbol: &str) -> Option<FileDescriptorProto> {
        Some(self.pool.find_file_containing_symbol(symbol)?.to_proto())
    }

    fn find_file_containing_extension(&self, extendee: &str, number: i32) -> Option<FileDescriptorProto> {
        let message = self.pool.find_message_by_name(extendee)?;
        let number = u32::try_from(number).ok()?;
        let extension = self.pool.find_extension_by_number(&message, number)?;
        Some(extension.file().to_proto())
    }

    fn find_all_extension_numbers(&self, extendee: &str) -> Option<Vec<i32>> {
        let message = self.pool.find_message_by_name(extendee)?;
        Some(
            self.pool
                .find_all_extensions(&message)
                .iter()
                .filter_map(|extension| i32::try_from(extension.number()).ok())
                .collect(),
        )
    }
}

/// Several databases searched in order. A file found in a later source is
/// hidden when an earlier source has a different file of the same name.
pub struct MergedDescriptorDatabase {
    sources: Vec<Box<dyn DescriptorDatabase>>,
}

impl MergedDescriptorDatabase {
    pub fn new(sources: Vec<Box<dyn DescriptorDatabase>>) -> Self {
        MergedDescriptorDatabase { sources }
    }

    fn first_unshadowed(
        &self,
        find: impl Fn(&dyn DescriptorDatabase) -> Option<FileDescriptorProto>,
    ) -> Option<FileDescriptorProto> {
        for (i, source) in self.sources.iter().enumerate() {
            if let Some(file) = find(source.as_ref()) {
                let shadowed = self.sources[..i]
                    .iter()
                    .any(|earlier| earlier.find_file_by_name(file.name()).is_some());
                return (!shadowed).then_some(file);
            }
        }
        None
    }
}

impl std::fmt::Debug for MergedDescriptorDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergedDescriptorDatabase")
            .field("sources", &self.sources.len())
            .finish()
    }
}

impl DescriptorDatabase for MergedDescriptorDatabase {
    fn find_file_by_name(&self, name: &str) -> Option<FileDescriptorProto> {
        self.sources.iter().find_map(|source| source.find_file_by_name(name))
    }

    fn find_file_containing_symbol(&self, symbol: &str) -> Option<FileDescriptorProto> {
        self.first_unshadowed(|source| source.find_file_containing_symbol(symbol))
    }

    fn find_file_containing_extension(&self, extendee: &str, number: i32) -> Option<FileDescriptorProto> {
        self.first_unshadowed(|source| source.find_file_containing_extension(extendee, number))
    }

    fn find_all_extension_numbers(&self, extendee: &str) -> Option<Vec<i32>> {
        let mut merged = BTreeSet::new();
        let mut found = false;
        for source in &self.sources {
            if let Some(numbers) = source.find_all_extension_numbers(extendee) {
                merged.extend(numbers);
                found = true;
            }
        }
        found.then(|| merged.into_iter().collect())
    }
}
