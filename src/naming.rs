const FALLBACK_LABEL: &str = "Sound";

/// Vendor and category markers baked into the catalog file names, removed in this order.
pub const STRIPPED_TOKENS: &[&str] = &["bosexx_", "nscp", "msk", "trn_", "SBII_Sound_"];

/// Turn a raw track identifier (usually a URL) into a menu label.
///
/// `https://host/audio/bosexx_nscp_Alpine-Powder.mp3` becomes `Alpine Powder`.
/// Identifiers without a usable file name fall back to `Sound`.
pub fn display_name(raw: &str) -> String {
    let Some(stem) = file_stem(raw) else {
        return String::from(FALLBACK_LABEL);
    };

    let stripped = strip_tokens(stem);
    let spaced: String = stripped
        .chars()
        .map(|ch| if ch == '_' || ch == '-' { ' ' } else { ch })
        .collect();

    let label = spaced
        .split(' ')
        .filter(|word| !word.is_empty())
        .map(capitalize_word)
        .collect::<Vec<_>>()
        .join(" ");

    if label.trim().is_empty() {
        String::from(FALLBACK_LABEL)
    } else {
        label
    }
}

fn file_stem(raw: &str) -> Option<&str> {
    let without_fragment = raw.split('#').next().unwrap_or_default();
    let without_query = without_fragment.split('?').next().unwrap_or_default();
    let name = without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    let stem = match name.rfind('.') {
        Some(dot) if dot > 0 => &name[..dot],
        _ => name,
    };

    (!stem.trim().is_empty()).then_some(stem)
}

/// Removes every token, case-insensitively, until none is left. A single pass could
/// leave a token behind when removing one stitches another together.
fn strip_tokens(stem: &str) -> String {
    let mut current = stem.to_string();
    loop {
        let before = current.len();
        for token in STRIPPED_TOKENS {
            current = remove_ignore_ascii_case(&current, token);
        }
        if current.len() == before {
            return current;
        }
    }
}

fn remove_ignore_ascii_case(haystack: &str, token: &str) -> String {
    let lower_haystack = haystack.to_ascii_lowercase();
    let lower_token = token.to_ascii_lowercase();
    let mut out = String::with_capacity(haystack.len());
    let mut cursor = 0;
    while let Some(found) = lower_haystack[cursor..].find(&lower_token) {
        let start = cursor + found;
        out.push_str(&haystack[cursor..start]);
        cursor = start + token.len();
    }
    out.push_str(&haystack[cursor..]);
    out
}

fn capitalize_word(word: &str) -> String {
    let mut chars = word.chars();
    let Some(first) = chars.next() else {
        return String::new();
    };
    first
        .to_uppercase()
        .chain(chars.flat_map(char::to_lowercase))
        .collect()
}
