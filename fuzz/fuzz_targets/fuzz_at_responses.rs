//! Fuzz target: AT response parsers
//!
//! Every parser must turn arbitrary modem output into a value or an
//! error, never a panic.
//!
//! cargo fuzz run fuzz_at_responses

#![no_main]

use libfuzzer_sys::fuzz_target;
use pumpstation::modem::response::{
    parse_bearer_ip, parse_current_operator, parse_http_status, parse_operator_list,
    parse_signal_ratio,
};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);

    if let Ok(Some(ip)) = parse_bearer_ip(&text) {
        assert_ne!(ip.as_str(), "0.0.0.0");
    }
    let _ = parse_http_status(&text);
    if let Ok(ratio) = parse_signal_ratio(&text) {
        assert!(ratio >= 0.0);
    }
    let _ = parse_current_operator(&text);
    let _ = parse_operator_list(&text);
});
