//! Program-counter to symbol lookup for the `symbol` endpoint.

use std::ffi::c_void;

/// Parse an address with a base prefix: `0x` hex, `0b` binary, a leading
/// `0` octal, decimal otherwise. Underscores between digits are allowed.
#[must_use]
pub fn parse_address(word: &str) -> Option<u64> {
    let word = word.trim();
    let cleaned: String = word.chars().filter(|c| *c != '_').collect();
    let lower = cleaned.to_ascii_lowercase();
    if let Some(hex) = lower.strip_prefix("0x") {
        u64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = lower.strip_prefix("0b") {
        u64::from_str_radix(bin, 2).ok()
    } else if let Some(oct) = lower.strip_prefix("0o") {
        u64::from_str_radix(oct, 8).ok()
    } else if lower.len() > 1 && lower.starts_with('0') {
        u64::from_str_radix(&lower[1..], 8).ok()
    } else {
        lower.parse().ok()
    }
}

/// Name of the function containing `addr`, if the binary has symbols for it.
#[must_use]
pub fn resolve(addr: u64) -> Option<String> {
    let mut name = None;
    backtrace::resolve(addr as usize as *mut c_void, |symbol| {
        if name.is_none() {
            name = symbol.name().map(|n| n.to_string());
        }
    });
    name
}

/// Answer for a `+`-separated address list.
///
/// Always starts with `num_symbols: 1`; unresolvable or malformed words are
/// skipped.
#[must_use]
pub fn lookup(input: &str) -> String {
    let mut out = String::from("num_symbols: 1\n");
    for word in input.split('+').filter(|w| !w.trim().is_empty()) {
        let Some(addr) = parse_address(word) else {
            continue;
        };
        if let Some(name) = resolve(addr) {
            out.push_str(&format!("{addr:#x} {name}\n"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address_bases() {
        assert_eq!(parse_address("0x1f"), Some(31));
        assert_eq!(parse_address("0X1F"), Some(31));
        assert_eq!(parse_address("017"), Some(15));
        assert_eq!(parse_address("0b101"), Some(5));
        assert_eq!(parse_address("1_000"), Some(1000));
        assert_eq!(parse_address("0"), Some(0));
        assert_eq!(parse_address("zz"), None);
        assert_eq!(parse_address("09"), None);
    }

    #[inline(never)]
    fn marker_function() -> u64 {
        std::hint::black_box(42)
    }

    #[test]
    fn test_lookup_resolves_known_function() {
        // an address inside the function body, not its first byte
        let addr = marker_function as usize as u64 + 1;
        let out = lookup(&format!("{addr:#x}+garbage"));
        assert!(out.starts_with("num_symbols: 1\n"));
        assert!(out.contains("marker_function"), "{out}");
    }

    #[test]
    fn test_lookup_empty_input() {
        assert_eq!(lookup(""), "num_symbols: 1\n");
    }
}
