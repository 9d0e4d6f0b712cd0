/// Returns true if `url` passes a source's link filters.
///
/// An empty filter list accepts every URL; otherwise at least one filter must
/// be a substring of `url`.
pub fn accept<S: AsRef<str>>(filters: &[S], url: &str) -> bool {
    filters.is_empty() || filters.iter().any(|f| url.contains(f.as_ref()))
}
