//! Pools backed by a `DescriptorDatabase`: files are built on first use,
//! failures are remembered, and the database is not asked twice for the
//! same missing name.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use protodyn::google::protobuf::FileDescriptorProto;
use protodyn::test_utils::{MockErrorCollector, build_pool, file_from_text};
use protodyn::text_format;
use protodyn::{
    DescriptorDatabase, DescriptorPool, DescriptorPoolDatabase, DynamicMessage, EncodedDescriptorDatabase,
    Message, MergedDescriptorDatabase, SimpleDescriptorDatabase,
};

const FOO: &str = r#"
    name: "foo.proto"
    message_type { name: "Foo"
      field { name: "foo" number: 1 label: LABEL_OPTIONAL type: TYPE_INT32 }
      extension_range { start: 1 end: 1000 }
    }
"#;

const BAR: &str = r#"
    name: "bar.proto" dependency: "foo.proto"
    message_type { name: "Bar"
      field { name: "foo" number: 1 label: LABEL_OPTIONAL type_name: ".Foo" }
    }
    extension { name: "bar_ext" number: 5 label: LABEL_OPTIONAL type: TYPE_INT32 extendee: ".Foo" }
"#;

const BAZ: &str = r#"
    name: "baz.proto" dependency: "foo.proto"
    extension { name: "baz_ext" number: 6 label: LABEL_OPTIONAL type: TYPE_STRING extendee: ".Foo" }
"#;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn simple(files: &[&str]) -> SimpleDescriptorDatabase {
    let mut db = SimpleDescriptorDatabase::new();
    for text in files {
        assert!(db.add(file_from_text(text)), "{text}");
    }
    db
}

/// Counts the queries that reach the wrapped database.
struct CallCountingDatabase {
    inner: SimpleDescriptorDatabase,
    calls: AtomicUsize,
}

impl CallCountingDatabase {
    fn new(files: &[&str]) -> Arc<Self> {
        Arc::new(CallCountingDatabase {
            inner: simple(files),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DescriptorDatabase for CallCountingDatabase {
    fn find_file_by_name(&self, name: &str) -> Option<FileDescriptorProto> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_file_by_name(name)
    }

    fn find_file_containing_symbol(&self, symbol: &str) -> Option<FileDescriptorProto> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_file_containing_symbol(symbol)
    }

    fn find_file_containing_extension(&self, extendee: &str, number: i32) -> Option<FileDescriptorProto> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_file_containing_extension(extendee, number)
    }

    fn find_all_extension_numbers(&self, extendee: &str) -> Option<Vec<i32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.find_all_extension_numbers(extendee)
    }
}

/// Answers every symbol query with the same file, whether or not it
/// defines the symbol.
struct FalsePositiveDatabase {
    file: FileDescriptorProto,
    calls: AtomicUsize,
}

impl DescriptorDatabase for FalsePositiveDatabase {
    fn find_file_by_name(&self, name: &str) -> Option<FileDescriptorProto> {
        (name == self.file.name()).then(|| self.file.clone())
    }

    fn find_file_containing_symbol(&self, _symbol: &str) -> Option<FileDescriptorProto> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Some(self.file.clone())
    }

    fn find_file_containing_extension(&self, _extendee: &str, _number: i32) -> Option<FileDescriptorProto> {
        None
    }
}

#[test]
fn files_load_with_their_imports() {
    let pool = DescriptorPool::with_database(simple(&[FOO, BAR]));
    let bar = pool.find_message_by_name("Bar").unwrap();
    assert_eq!(bar.file().name(), "bar.proto");
    let foo = pool.find_file_by_name("foo.proto").unwrap();
    assert_eq!(foo.messages()[0].full_name(), "Foo");
    assert_eq!(
        bar.get_field_by_name("foo").unwrap().message_type().unwrap().full_name(),
        "Foo"
    );
    assert_eq!(
        pool.files().iter().map(|f| f.name().to_owned()).collect::<Vec<_>>(),
        ["foo.proto", "bar.proto"]
    );
}

#[test]
fn extensions_load_by_number() {
    let pool = DescriptorPool::with_database(simple(&[FOO, BAR, BAZ]));
    let foo = pool.find_message_by_name("Foo").unwrap();
    assert_eq!(pool.files().len(), 1);

    let bar_ext = pool.find_extension_by_number(&foo, 5).unwrap();
    assert_eq!(bar_ext.full_name(), "bar_ext");
    assert!(pool.find_extension_by_number(&foo, 7).is_none());

    let foo = pool.find_message_by_name("Foo").unwrap();
    let all: Vec<String> = pool
        .find_all_extensions(&foo)
        .iter()
        .map(|f| f.full_name().to_owned())
        .collect();
    assert_eq!(all, ["bar_ext", "baz_ext"]);
}

#[test]
fn handles_find_extensions_through_the_database() {
    init_logging();
    let db = CallCountingDatabase::new(&[FOO, BAR, BAZ]);
    let pool = DescriptorPool::with_database(Arc::clone(&db));
    let foo = pool.find_message_by_name("Foo").unwrap();
    assert_eq!(pool.files().len(), 1);

    // 5: 7
    let msg = DynamicMessage::decode(foo.clone(), &[0x28, 0x07]).unwrap();
    let bar_ext = foo.find_extension_by_number(5).unwrap();
    assert_eq!(bar_ext.full_name(), "bar_ext");
    assert_eq!(msg.get_field(&bar_ext).as_i32(), Some(7));
    assert!(msg.unknown_fields().is_empty());
    assert_eq!(pool.files().len(), 2);

    let mut parsed = foo.new_message();
    text_format::parse_from_str("[baz_ext]: \"x\"", &mut parsed).unwrap();
    assert_eq!(parsed.to_string(), "[baz_ext]: \"x\"\n");
    assert_eq!(pool.files().len(), 3);

    // Numbers outside the extension ranges never reach the database.
    let before = db.calls();
    assert!(foo.find_extension_by_number(1000).is_none());
    assert!(foo.find_extension_by_number(u32::MAX).is_none());
    assert_eq!(db.calls(), before);
}

#[test]
fn failing_import_chains_are_loaded_once() {
    init_logging();
    const N: usize = 40;
    let texts: Vec<String> = (0..N)
        .map(|k| {
            let (dep, ty) = if k + 1 == N {
                ("missing.proto".to_owned(), ".Missing".to_owned())
            } else {
                (format!("chain{}.proto", k + 1), format!(".C{}", k + 1))
            };
            format!(
                r#"name: "chain{k}.proto" dependency: "{dep}"
                   message_type {{ name: "C{k}"
                     field {{ name: "next" number: 1 label: LABEL_OPTIONAL type_name: "{ty}" }}
                   }}"#
            )
        })
        .collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let db = CallCountingDatabase::new(&refs);
    let pool = DescriptorPool::with_database(Arc::clone(&db));

    assert!(pool.find_message_by_name("C0").is_none());
    let calls = db.calls();
    assert!(calls <= 3 * N, "{calls} database calls for a chain of {N} files");
    assert!(pool.files().is_empty());

    for k in [0, N / 2, N - 1] {
        let before = db.calls();
        assert!(pool.find_file_by_name(&format!("chain{k}.proto")).is_none());
        assert!(pool.find_message_by_name(&format!("C{k}")).is_none());
        assert!(db.calls() - before <= 1);
    }
}

#[test]
fn build_errors_go_to_the_collector() {
    let collector = MockErrorCollector::new();
    let db = simple(&[r#"
        name: "bad.proto"
        message_type { name: "Bad" field { name: "x" number: 1 label: LABEL_OPTIONAL type_name: "Missing" } }
    "#]);
    let pool = DescriptorPool::with_database_and_collector(db, collector.clone());
    assert!(pool.find_message_by_name("Bad").is_none());
    assert_eq!(collector.text(), "bad.proto: Bad.x: TYPE: \"Missing\" is not defined.\n");

    collector.clear();
    assert!(pool.find_file_by_name("bad.proto").is_none());
    assert!(pool.find_message_by_name("Bad").is_none());
    assert_eq!(collector.text(), "");
}

#[test]
fn missing_imports() {
    let collector = MockErrorCollector::new();
    let db = simple(&[r#"name: "c.proto" dependency: "missing.proto""#]);
    let pool = DescriptorPool::with_database_and_collector(db, collector.clone());
    assert!(pool.find_file_by_name("c.proto").is_none());
    assert_eq!(
        collector.text(),
        "c.proto: c.proto: OTHER: Import \"missing.proto\" was not found or had errors.\n"
    );
}

#[test]
fn recursive_imports_are_reported_once() {
    let collector = MockErrorCollector::new();
    let db = simple(&[
        r#"name: "a.proto" dependency: "b.proto""#,
        r#"name: "b.proto" dependency: "a.proto""#,
    ]);
    let pool = DescriptorPool::with_database_and_collector(db, collector.clone());
    assert!(pool.find_file_by_name("a.proto").is_none());
    assert_eq!(
        collector.text(),
        "a.proto: a.proto: OTHER: File recursively imports itself: a.proto -> b.proto -> a.proto\n\
         b.proto: b.proto: OTHER: Import \"a.proto\" was not found or had errors.\n\
         a.proto: a.proto: OTHER: Import \"b.proto\" was not found or had errors.\n"
    );
}

#[test]
fn misses_are_remembered() {
    let db = CallCountingDatabase::new(&[FOO]);
    let pool = DescriptorPool::with_database(Arc::clone(&db));

    assert!(pool.find_message_by_name("NoSuchSymbol").is_none());
    let after_first = db.calls();
    assert!(after_first > 0);
    assert!(pool.find_message_by_name("NoSuchSymbol").is_none());
    assert_eq!(db.calls(), after_first);

    assert!(pool.find_file_by_name("no_such.proto").is_none());
    let after_file = db.calls();
    assert!(pool.find_file_by_name("no_such.proto").is_none());
    assert_eq!(db.calls(), after_file);
}

#[test]
fn members_of_built_types_never_reach_the_database() {
    let db = CallCountingDatabase::new(&[FOO]);
    let pool = DescriptorPool::with_database(Arc::clone(&db));
    assert!(pool.find_message_by_name("Foo").is_some());
    let before = db.calls();
    assert!(pool.find_field_by_name("Foo.foo").is_some());
    assert!(pool.find_field_by_name("Foo.no_such_field").is_none());
    assert!(pool.find_message_by_name("Foo.Nested.Deeper").is_none());
    assert_eq!(db.calls(), before);
}

#[test]
fn false_positives_are_not_rebuilt() {
    let db = Arc::new(FalsePositiveDatabase {
        file: file_from_text(FOO),
        calls: AtomicUsize::new(0),
    });
    let pool = DescriptorPool::with_database(Arc::clone(&db));
    assert!(pool.find_message_by_name("Foo").is_some());
    assert!(pool.find_message_by_name("NotFoo").is_none());
    let calls = db.calls.load(Ordering::SeqCst);
    assert!(pool.find_message_by_name("NotFoo").is_none());
    assert_eq!(db.calls.load(Ordering::SeqCst), calls);
    assert_eq!(pool.files().len(), 1);
}

#[test]
fn pool_as_database() {
    let source = build_pool(&[FOO, BAR]);
    let pool = DescriptorPool::with_database(DescriptorPoolDatabase::new(source.clone()));
    let bar = pool.find_message_by_name("Bar").unwrap();
    assert_eq!(bar.full_name(), "Bar");
    assert_ne!(Some(bar), source.find_message_by_name("Bar"));
    assert_eq!(pool.files().len(), 2);
}

#[test]
fn merged_and_encoded_sources() {
    let mut encoded = EncodedDescriptorDatabase::new();
    assert!(encoded.add(&file_from_text(FOO).encode_to_vec()));
    let shadowed = simple(&[r#"name: "foo.proto" message_type { name: "Shadow" }"#]);
    let merged = MergedDescriptorDatabase::new(vec![
        Box::new(encoded),
        Box::new(shadowed),
        Box::new(simple(&[BAZ])),
    ]);
    let pool = DescriptorPool::with_database(merged);
    assert!(pool.find_message_by_name("Shadow").is_none());
    let baz_ext = pool.find_extension_by_name("baz_ext").unwrap();
    assert_eq!(baz_ext.containing_type().full_name(), "Foo");
    assert_eq!(pool.find_file_by_name("foo.proto").unwrap().messages()[0].name(), "Foo");
}

#[test]
fn concurrent_lookups() {
    let pool = DescriptorPool::with_database(simple(&[FOO, BAR, BAZ]));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let pool = pool.clone();
            thread::spawn(move || {
                let name = if i % 2 == 0 { "Bar" } else { "baz_ext" };
                let file = pool.find_file_containing_symbol(name).unwrap();
                file.name().to_owned()
            })
        })
        .collect();
    let mut names: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    names.sort();
    names.dedup();
    assert_eq!(names, ["bar.proto", "baz.proto"]);
    assert_eq!(pool.files().len(), 3);
}
