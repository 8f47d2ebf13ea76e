/// Synthesize a display name from an email address.
///
/// Takes the local part, splits on `.`/`_`/`-`, uppercases the first letter
/// of each word (the rest is left untouched) and joins with single spaces.
/// Falls back to the raw email, then to `"Uploader"`. Never fails.
pub fn derive_name(email: &str) -> String {
    let local = email.split('@').next().unwrap_or("");
    let titled = local
        .split(['.', '_', '-'])
        .filter(|word| !word.is_empty())
        .map(title_case)
        .collect::<Vec<_>>()
        .join(" ");

    if !titled.trim().is_empty() {
        return titled;
    }
    let raw = email.trim();
    if !raw.is_empty() {
        return raw.to_string();
    }
    "Uploader".to_string()
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
