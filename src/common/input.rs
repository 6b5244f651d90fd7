/// Keeps only characters valid in an Android package name.
pub fn sanitize_package(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '.' || *c == '_')
        .collect()
}
