#![no_main]

use libfuzzer_sys::fuzz_target;

use ctprofiler::rendering::json;
use ctprofiler::rendering::text::{self, TextOptions};
use ctprofiler::rendering::xml;

fuzz_target!(|data: &[u8]| {
    if let Ok(input) = std::str::from_utf8(data) {
        // Whatever parses must also render without panicking
        if let Ok(stats) = json::from_json_str(input) {
            let _ = text::render_to_string(&stats, TextOptions::unfiltered(), None);
            let _ = xml::render_to_string(&stats, None);
        }
    }
});
