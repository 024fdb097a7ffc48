/// Collapse runs of whitespace (including the newlines rendered text picks up
/// from nested markup) into single spaces and trim the ends.
pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

/// Lowercase and drop everything but ASCII letters and digits, so that
/// `customerName`, `customer-name` and `CUSTOMER_NAME` compare equal.
pub fn squash_key(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
