//! Test utilities for protodyn - available to downstream crates for testing.
//!
//! Schemas are written as `FileDescriptorProto` text format, which keeps
//! fixtures close to what a `.proto` compiler would produce without needing
//! one.

use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::descriptor_pool::{DescriptorPool, ErrorCollector, ErrorLocation};
use crate::google::protobuf::FileDescriptorProto;
use crate::reflection::DynamicMessage;
use crate::text_format::{self, ParseError, ParseErrorCollector};

/// Parses a `FileDescriptorProto` written in text format.
///
/// # Panics
///
/// When the text does not parse.
pub fn file_from_text(text: &str) -> FileDescriptorProto {
    let desc = DescriptorPool::bootstrap()
        .find_message_by_name("google.protobuf.FileDescriptorProto")
        .expect("bootstrap pool has FileDescriptorProto");
    let mut message = DynamicMessage::new(desc);
    if let Err(err) = text_format::parse_from_str(text, &mut message) {
        panic!("invalid FileDescriptorProto text: {err}\n{text}");
    }
    message
        .transcode_to()
        .expect("dynamic FileDescriptorProto should transcode")
}

/// Builds each file, in order, into a fresh pool.
///
/// # Panics
///
/// When a file fails to parse or build.
pub fn build_pool(files: &[&str]) -> DescriptorPool {
    let pool = DescriptorPool::new();
    for text in files {
        let proto = file_from_text(text);
        if let Err(err) = pool.add_file(&proto) {
            panic!("{err}");
        }
    }
    pool
}

/// Assert that a message can be encoded and decoded without loss.
pub fn assert_roundtrip(msg: &DynamicMessage) {
    let data = msg.encode_to_vec();
    let roundtrip_msg = DynamicMessage::decode_partial(msg.descriptor().clone(), &data)
        .expect("msg should decode");

    println!("Encoded {} ({} bytes)", msg.descriptor().full_name(), data.len());

    assert_eq!(&roundtrip_msg, msg);
    assert_eq!(roundtrip_msg.encode_to_vec(), data);
}

/// Records errors one per line, `file: element: LOCATION: message` for
/// descriptor builds and `line:column: message` for text parsing.
/// Clones share the same buffer, so a clone can be handed to a pool while
/// the test keeps reading the original.
#[derive(Clone, Debug, Default)]
pub struct MockErrorCollector {
    text: Arc<Mutex<String>>,
}

impl MockErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> String {
        self.text.lock().clone()
    }

    pub fn clear(&self) {
        self.text.lock().clear();
    }
}

impl ErrorCollector for MockErrorCollector {
    fn add_error(&mut self, filename: &str, element_name: &str, location: ErrorLocation, message: &str) {
        let _ = writeln!(self.text.lock(), "{filename}: {element_name}: {location}: {message}");
    }

    fn add_warning(&mut self, filename: &str, element_name: &str, location: ErrorLocation, message: &str) {
        let _ = writeln!(
            self.text.lock(),
            "{filename}: {element_name}: {location}: WARNING:{message}"
        );
    }
}

impl ParseErrorCollector for MockErrorCollector {
    fn add_error(&mut self, error: &ParseError) {
        let _ = writeln!(self.text.lock(), "{error}");
    }

    fn add_warning(&mut self, warning: &ParseError) {
        let _ = writeln!(
            self.text.lock(),
            "{}:{}: WARNING:{}",
            warning.line, warning.column, warning.message
        );
    }
}
