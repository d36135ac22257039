/// Code-aware tokenization for sparse retrieval.
///
/// Identifiers are emitted twice: once whole (lowercased) and once per
/// sub-token, so `getUserName` matches both the query `getusername` and the
/// query `user name`. Boundaries are underscores, lower-to-upper case
/// transitions, and letter/digit transitions.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();

    for word in text
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty())
    {
        let whole = word.to_lowercase().replace('_', "");
        let parts = split_identifier(word);

        if !whole.is_empty() {
            tokens.push(whole.clone());
        }
        if parts.len() > 1 {
            for part in parts {
                if part != whole {
                    tokens.push(part);
                }
            }
        }
    }

    tokens
}

/// Split an identifier at underscores, camelCase humps, and digit runs,
/// lowercasing each part
fn split_identifier(word: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut prev: Option<char> = None;

    for c in word.chars() {
        if c == '_' {
            flush(&mut parts, &mut current);
            prev = None;
            continue;
        }

        let boundary = match prev {
            Some(p) => {
                (p.is_lowercase() && c.is_uppercase())
                    || (p.is_alphabetic() && c.is_ascii_digit())
                    || (p.is_ascii_digit() && c.is_alphabetic())
            }
            None => false,
        };

        if boundary {
            flush(&mut parts, &mut current);
        }
        current.extend(c.to_lowercase());
        prev = Some(c);
    }
    flush(&mut parts, &mut current);

    parts
}

fn flush(parts: &mut Vec<String>, current: &mut String) {
    if !current.is_empty() {
        parts.push(std::mem::take(current));
    }
}
