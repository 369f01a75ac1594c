//! Parsers for the cleaned text of individual SIM800 responses.

use heapless::String;

use crate::config::fixed;
use crate::error::ModemError;

/// Dotted-quad IPv4 address as reported by the bearer.
pub type IpAddr = String<16>;

/// Highest RSSI index reported by AT+CSQ.
const CSQ_MAX: f32 = 30.0;

/// An operator entry from AT+COPS=?.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    pub name: String<32>,
    pub short_name: String<16>,
    pub id: String<8>,
}

/// `+SAPBR: 1,1,"10.1.2.3"` → `Some("10.1.2.3")`; `0.0.0.0` → `None`.
pub fn parse_bearer_ip(output: &str) -> Result<Option<IpAddr>, ModemError> {
    // Leftovers from earlier URCs may precede the +SAPBR line.
    let tail = output.rsplit('+').next().unwrap_or(output);
    let pieces: heapless::Vec<&str, 4> = tail
        .split(',')
        .take(4)
        .collect();
    if pieces.len() != 3 {
        return Err(ModemError::Parse("bearer status"));
    }
    let ip = pieces[2].trim().trim_matches('"');
    if ip.split('.').count() != 4 {
        return Err(ModemError::Parse("bearer status"));
    }
    if ip == "0.0.0.0" {
        return Ok(None);
    }
    Ok(Some(fixed(ip)))
}

/// Status code from an `+HTTPACTION: <method>,<status>,<length>` line.
pub fn parse_http_status(output: &str) -> Result<u16, ModemError> {
    output
        .split(',')
        .nth(1)
        .and_then(|code| code.trim().parse().ok())
        .ok_or(ModemError::Parse("HTTP action status"))
}

/// `+CSQ: 18,0` → 0.6 (fraction of the best reportable signal).
pub fn parse_signal_ratio(output: &str) -> Result<f32, ModemError> {
    let rssi: u8 = output
        .split(':')
        .nth(1)
        .and_then(|rest| rest.split(',').next())
        .and_then(|v| v.trim().parse().ok())
        .ok_or(ModemError::Parse("signal quality"))?;
    Ok(f32::from(rssi) / CSQ_MAX)
}

/// `+COPS: 0,0,"Tele2"` → `Some("Tele2")`; no operator field → `None`.
pub fn parse_current_operator(output: &str) -> Option<String<32>> {
    let last = output.rsplit(',').next().unwrap_or(output);
    let name = last.trim().trim_matches('"');
    if name.starts_with("+COPS") {
        return None;
    }
    Some(fixed(name))
}

/// Parse the operator list of AT+COPS=?.
///
/// `+COPS: (2,"Tele2","Tele2","24007"),(1,"Telia","Telia","24001"),,(0-4),(0-2)`
pub fn parse_operator_list(output: &str) -> Vec<Operator> {
    let Some((_, list)) = output.split_once('(') else {
        return Vec::new();
    };
    list.split(')')
        .filter_map(|entry| {
            let entry = entry.trim_start_matches(",(").trim_start_matches('(');
            let fields: heapless::Vec<&str, 5> = entry.split(',').take(5).collect();
            if fields.len() != 4 {
                return None;
            }
            let unquote = |s: &str| s.trim().trim_matches('"').to_owned();
            Some(Operator {
                name: fixed(&unquote(fields[1])),
                short_name: fixed(&unquote(fields[2])),
                id: fixed(&unquote(fields[3])),
            })
        })
        .collect()
}
