use url::Url;

use crate::error::ApiError;

pub const URL_MAX_LENGTH: usize = 2048;

/// Collects the names of request fields that fail validation.
#[derive(Debug, Default)]
pub struct Fields {
    invalid: Vec<String>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject(&mut self, field: &str) {
        if !self.invalid.iter().any(|f| f == field) {
            self.invalid.push(field.to_string());
        }
    }

    /// Non-blank text of at most `max_chars` characters.
    pub fn text(&mut self, field: &str, value: &str, max_chars: usize) {
        if value.trim().is_empty() || value.chars().count() > max_chars {
            self.reject(field);
        }
    }

    /// An absolute `http` or `https` URL with a host.
    pub fn url(&mut self, field: &str, value: &str) {
        let valid = value.len() <= URL_MAX_LENGTH
            && Url::parse(value).is_ok_and(|url| {
                matches!(url.scheme(), "http" | "https")
                    && url.host_str().is_some_and(|host| !host.is_empty())
            });
        if !valid {
            self.reject(field);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.invalid.is_empty()
    }

    pub fn finish(self) -> Result<(), ApiError> {
        if self.invalid.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Invalid(self.invalid))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_each_failing_field_once() {
        let mut fields = Fields::new();
        fields.text("name", "   ", 32);
        fields.url("logoUrl", "ftp://example.com/logo.png");
        fields.reject("name");
        fields.text("ok", "Acme", 32);

        match fields.finish() {
            Err(ApiError::Invalid(invalid)) => assert_eq!(invalid, ["name", "logoUrl"]),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn urls_need_a_web_scheme_and_host() {
        let mut fields = Fields::new();
        fields.url("ok", "https://cdn.example.com/logo.png?size=2");
        fields.url("ok", "http://localhost:8080/a.png");
        assert!(fields.is_empty());

        for bad in ["http://", "https://exa mple.com/x.png", "mailto:jo@example.com", "/logo.png"] {
            let mut fields = Fields::new();
            fields.url("logoUrl", bad);
            assert!(!fields.is_empty(), "{bad} should be rejected");
        }

        let mut fields = Fields::new();
        fields.url("logoUrl", &format!("https://example.com/{}", "a".repeat(URL_MAX_LENGTH)));
        assert!(!fields.is_empty());
    }

    #[test]
    fn length_counts_characters() {
        let mut fields = Fields::new();
        fields.text("name", &"é".repeat(32), 32);
        assert!(fields.is_empty());
        fields.text("name", &"é".repeat(33), 32);
        assert!(!fields.is_empty());
    }
}
