//! Address normalisation shared by the encode and read-report tasks:
//! the wire From/To/Insert-Address-Token grammar expects `/TYPE=PLMN`
//! on bare numbers.

/// Normalises a single address: numbers get `/TYPE=PLMN`, anything
/// with `@` or an explicit `TYPE=` is left as-is.
pub fn normalise(addr: &str) -> String {
    let trimmed = addr.trim();
    if trimmed.contains('@') || trimmed.contains("TYPE=") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/TYPE=PLMN")
    }
}
