#![no_main]

use libfuzzer_sys::fuzz_target;

use evexport_core::event::Event;
use evexport_core::types::RawEvent;
use evexport_exporter::{FixedClock, serialize};

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = serde_json::from_slice::<RawEvent>(data) else {
        return;
    };

    let clock = FixedClock(1_700_000_000_000);
    let mut events = Vec::new();
    if let Some(packet) = raw.alert_candidate() {
        events.push(Event::Alert(packet.clone()));
    }
    if let Some(flow) = raw.flow_candidate() {
        events.push(Event::Flow(flow.clone()));
    }

    for event in &events {
        let bytes = serialize(event, &clock).expect("records always serialize");
        // 한 줄짜리 JSON 객체여야 함
        assert!(!bytes.contains(&b'\n'));
        let value: serde_json::Value =
            serde_json::from_slice(&bytes).expect("serializer emits valid JSON");
        assert!(value.get("type").is_some());
        assert_eq!(value["timestamp"], 1_700_000_000_000u64);
    }
});
