#![no_main]

use libfuzzer_sys::fuzz_target;
use protodyn::DescriptorPool;
use protodyn::text_format::Parser;

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let Some(desc) = DescriptorPool::bootstrap().find_message_by_name("google.protobuf.FileDescriptorProto") else {
        return;
    };
    let mut msg = desc.new_message();
    if Parser::new().allow_partial_message(true).parse_from_str(text, &mut msg).is_ok() {
        let printed = msg.to_string();
        let mut reparsed = desc.new_message();
        Parser::new()
            .allow_partial_message(true)
            .parse_from_str(&printed, &mut reparsed)
            .unwrap();
        assert_eq!(reparsed.to_string(), printed);
    }
});
