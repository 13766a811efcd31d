use gridpool_types::Identity;

/// Label for participants the provider knows nothing about.
const ANONYMOUS_LABEL: &str = "XXXXXXXX";

/// Uppercase letters only, at most 4 of them.
fn clean_part(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(4)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Right-pad with 'X' to exactly 4 characters.
fn pad4(mut part: String) -> String {
    while part.chars().count() < 4 {
        part.push('X');
    }
    part
}

/// Derive the 8-character display label for a participant.
///
/// Always exactly 8 characters; renderers split it into two 4-character
/// lines, so the length invariant is load-bearing. Preference order:
/// display name (first + last, 4 letters each), then email local part
/// split on `.`/`_`/`-`, then `local@dom`, then the anonymous sentinel.
pub fn derive_label(identity: &Identity) -> String {
    if let Some(name) = identity.display_name.as_deref().filter(|n| !n.is_empty()) {
        let mut tokens = name.split_whitespace();
        let first = tokens.next().unwrap_or("");
        let rest = tokens.collect::<Vec<_>>().join(" ");

        let mut a = clean_part(first);
        if a.is_empty() {
            // First token had no letters; fall back to the email local part.
            let local = identity
                .email
                .as_deref()
                .and_then(|e| e.split('@').next())
                .unwrap_or("");
            a = clean_part(local);
        }
        return pad4(a) + &pad4(clean_part(&rest));
    }

    if let Some(email) = identity.email.as_deref().filter(|e| !e.is_empty()) {
        let (local, domain) = email.split_once('@').unwrap_or((email, ""));

        if local.contains(['.', '_', '-']) {
            // Separator runs collapse: "a..b" splits into "a" and "b".
            let mut tokens = local.split(['.', '_', '-']).filter(|t| !t.is_empty());
            let first = tokens.next().unwrap_or("");
            let second = tokens.next().unwrap_or("");
            return pad4(clean_part(first)) + &pad4(clean_part(second));
        }

        let mut tail = String::from("@");
        tail.extend(domain.chars().take(3).map(|c| c.to_ascii_uppercase()));
        return pad4(clean_part(local)) + &pad4(tail);
    }

    ANONYMOUS_LABEL.to_string()
}

/// Mask an email for the delayed-reveal tooltip: local parts of four or
/// fewer characters stay visible, longer ones keep their first and last
/// two characters with one `*` per hidden character. The domain is never
/// masked. Disclosure aid only, never used for authorization.
pub fn mask_email(email: &str) -> String {
    let Some((local, domain)) = email.split_once('@') else {
        return email.to_string();
    };
    let chars: Vec<char> = local.chars().collect();
    if chars.len() <= 4 {
        return email.to_string();
    }
    let first: String = chars[..2].iter().collect();
    let last: String = chars[chars.len() - 2..].iter().collect();
    let stars = "*".repeat(chars.len() - 4);
    format!("{first}{stars}{last}@{domain}")
}
