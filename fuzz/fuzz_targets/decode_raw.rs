#![no_main]

use libfuzzer_sys::fuzz_target;
use protodyn::google::protobuf::FileDescriptorProto;
use protodyn::{DecodeOptions, DescriptorPool, DynamicMessage, Message, UnknownFieldSet};

fuzz_target!(|data: &[u8]| {
    let _ = UnknownFieldSet::parse(data);

    let Some(desc) = DescriptorPool::bootstrap().find_message_by_name("google.protobuf.FileDescriptorProto") else {
        return;
    };
    let options = DecodeOptions {
        allow_partial: true,
        ..Default::default()
    };
    let compiled = FileDescriptorProto::decode(data);
    let dynamic = DynamicMessage::decode_with_options(desc.clone(), data, &options);
    match (compiled, dynamic) {
        (Ok(compiled), Ok(dynamic)) => {
            // Both codecs must agree on the canonical encoding.
            let bytes = dynamic.encode_to_vec();
            assert_eq!(compiled.encode_to_vec(), bytes);
            let again = DynamicMessage::decode_with_options(desc, &bytes, &options).unwrap();
            assert_eq!(again.encode_to_vec(), bytes);
            let _ = dynamic.to_string();

            let pool = DescriptorPool::new();
            pool.allow_unknown_dependencies();
            let _ = pool.add_file(&compiled);
        }
        (Err(_), Err(_)) => {}
        (compiled, dynamic) => panic!("compiled {compiled:?} vs dynamic {dynamic:?}"),
    }
});
