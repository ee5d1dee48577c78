#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Anything the parser accepts must serialize and parse again
    let Ok(xml) = std::str::from_utf8(data) else {
        return;
    };
    let Ok(robot) = urdfsynth::parse_urdf_str(xml) else {
        return;
    };
    let written = robot.to_urdf_string().expect("accepted robot must serialize");
    let reread = urdfsynth::parse_urdf_str(&written).expect("serialized robot must parse");
    assert_eq!(reread.links.len(), robot.links.len());
    assert_eq!(reread.joints.len(), robot.joints.len());
});
