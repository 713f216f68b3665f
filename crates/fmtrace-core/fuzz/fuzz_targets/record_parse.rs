#![no_main]
use fmtrace_core::{decode_int, CipherMode, StringCipher};
use fmtrace_trace::format::{parse_line, ParsedLine};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let _ = decode_int(data);
    let _ = StringCipher::standard().decrypt(data, CipherMode::Filtered);
    if let Ok(line) = std::str::from_utf8(data) {
        if let Ok(ParsedLine::Record(rec)) = parse_line(line) {
            let _ = decode_int(&rec.payload_bytes);
        }
    }
});
