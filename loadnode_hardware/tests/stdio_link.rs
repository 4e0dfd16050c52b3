use std::io::Cursor;
use std::time::{Duration, Instant};

use loadnode_hardware::StdioLink;
use loadnode_traits::SerialLink;

fn drain<W: std::io::Write>(link: &mut StdioLink<W>) -> Vec<u8> {
    let deadline = Instant::now() + Duration::from_secs(2);
    let mut got = Vec::new();
    while !link.is_closed() && Instant::now() < deadline {
        match link.poll_byte().unwrap() {
            Some(b) => got.push(b),
            None => std::thread::sleep(Duration::from_millis(1)),
        }
    }
    got
}

#[test]
fn forwards_input_bytes_in_order_then_goes_quiet() {
    let input = Cursor::new(b"s2.5\ng\n".to_vec());
    let mut link = StdioLink::from_parts(input, Vec::new()).unwrap();
    assert_eq!(drain(&mut link), b"s2.5\ng\n");
    assert!(link.is_closed());
    assert_eq!(link.poll_byte().unwrap(), None);
}

#[test]
fn writes_crlf_terminated_lines() {
    let mut link = StdioLink::from_parts(Cursor::new(Vec::new()), Vec::new()).unwrap();
    link.write_line("<2,1.00000>").unwrap();
    link.write_line("<1,0.012,0.0000>").unwrap();
    assert_eq!(link.writer().as_slice(), b"<2,1.00000>\r\n<1,0.012,0.0000>\r\n");
}

#[test]
fn input_larger_than_channel_is_delivered() {
    let payload: Vec<u8> = (0..1000u32).map(|i| b'a' + (i % 26) as u8).collect();
    let mut link = StdioLink::from_parts(Cursor::new(payload.clone()), Vec::new()).unwrap();
    assert_eq!(drain(&mut link), payload);
}
