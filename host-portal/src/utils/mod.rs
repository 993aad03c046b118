pub mod jwt;

/// Accept only same-site absolute paths as post-login destinations.
pub fn safe_return_path(candidate: Option<&str>) -> Option<&str> {
    candidate.filter(|path| path.starts_with('/') && !path.starts_with("//") && !path.contains('\\'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_offsite_return_paths() {
        assert_eq!(safe_return_path(Some("/host")), Some("/host"));
        assert_eq!(safe_return_path(Some("//evil.example.com")), None);
        assert_eq!(safe_return_path(Some("https://evil.example.com")), None);
        assert_eq!(safe_return_path(Some("/\\evil.example.com")), None);
        assert_eq!(safe_return_path(None), None);
    }
}
