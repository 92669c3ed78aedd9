/// Collapse a translated cell to a single line for CSV storage.
///
/// Carriage returns and line feeds become spaces, runs of whitespace collapse
/// to one space, and leading/trailing whitespace is dropped. Only applied to
/// translated output; source text is stored exactly as read since it is the
/// resume key.
pub fn normalize(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
