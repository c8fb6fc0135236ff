/// Convert a dotted domain name to a directory base path.
/// `"example.com"` becomes `"DC=example,DC=com"`. Empty labels are dropped.
pub fn domain_to_base_path(domain: &str) -> String {
    domain
        .split('.')
        .filter(|label| !label.is_empty())
        .map(|label| format!("DC={}", label))
        .collect::<Vec<_>>()
        .join(",")
}

/// Short host name from a fully qualified one.
///
/// Strips the `.domain` suffix when present, otherwise cuts at the first dot,
/// otherwise returns the input unchanged.
pub fn extract_short_name(fqdn: &str, domain: &str) -> String {
    if !domain.is_empty() {
        let suffix_len = domain.len() + 1;
        if fqdn.len() > suffix_len {
            let split = fqdn.len() - suffix_len;
            if fqdn.is_char_boundary(split) {
                let (prefix, suffix) = fqdn.split_at(split);
                if suffix.starts_with('.') && suffix[1..].eq_ignore_ascii_case(domain) {
                    return prefix.to_string();
                }
            }
        }
    }

    match fqdn.split_once('.') {
        Some((prefix, _)) => prefix.to_string(),
        None => fqdn.to_string(),
    }
}
