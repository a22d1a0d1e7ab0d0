#![no_main]

use libfuzzer_sys::fuzz_target;

use evexport_exporter::Endpoint;

fuzz_target!(|data: &str| {
    if let Ok(endpoint) = data.parse::<Endpoint>() {
        // Display 결과는 다시 같은 엔드포인트로 파싱되어야 함
        let rendered = endpoint.to_string();
        let reparsed: Endpoint = rendered.parse().expect("rendered endpoint parses");
        assert_eq!(reparsed, endpoint);
    }
});
