#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Parsing arbitrary input must return an error, never panic
    if let Ok(xml) = std::str::from_utf8(data) {
        let _ = urdfsynth::parse_urdf_str(xml);
    }
});
