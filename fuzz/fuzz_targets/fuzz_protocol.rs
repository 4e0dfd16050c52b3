#![no_main]
use libfuzzer_sys::fuzz_target;
use loadnode_core::mocks::ScriptedLink;
use loadnode_core::protocol::{Command, Frame, parse_float_prefix, read_command};

fuzz_target!(|data: &[u8]| {
    // Command stream: every byte is consumed, one command per call.
    let mut link = ScriptedLink::new();
    link.send(&String::from_utf8_lossy(data));
    let mut guard = 0usize;
    while let Ok(Some(cmd)) = read_command(&mut link) {
        if let Command::SetScale(v) = cmd {
            assert!(v.is_finite());
        }
        guard += 1;
        assert!(guard <= data.len() * 4 + 1);
    }
    assert_eq!(link.pending(), 0);

    if let Ok(text) = std::str::from_utf8(data) {
        let _ = parse_float_prefix(text);
        // Frames we format must parse back to the same tag.
        if let Ok(frame) = text.parse::<Frame>() {
            let again = frame.to_string().parse::<Frame>().expect("formatted frame parses");
            assert_eq!(again.tag(), frame.tag());
        }
    }
});
