#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;

use evexport_exporter::EventBuffer;

/// 퍼저용 버퍼 조작
#[derive(Arbitrary, Debug)]
enum Op {
    Push(u16),
    Pop,
    Clear,
}

#[derive(Arbitrary, Debug)]
struct Input {
    capacity: u8,
    ops: Vec<Op>,
}

fuzz_target!(|input: Input| {
    let mut buffer = EventBuffer::new(usize::from(input.capacity));
    let capacity = buffer.capacity();
    let mut pushed = 0u64;

    for op in input.ops.iter().take(1_000) {
        match op {
            Op::Push(tag) => {
                let before = buffer.len();
                let payload = Bytes::from(tag.to_be_bytes().to_vec());
                let outcome = buffer.push(payload.clone());
                pushed += 1;
                // 가득 찼을 때만 하나가 축출됨
                assert_eq!(outcome.evicted_any(), before == capacity);
                assert_eq!(buffer.iter().last(), Some(&payload));
            }
            Op::Pop => {
                let _ = buffer.pop_front();
            }
            Op::Clear => {
                let _ = buffer.clear();
            }
        }
        assert!(buffer.len() <= capacity);
    }

    assert_eq!(buffer.total_received(), pushed);
});
