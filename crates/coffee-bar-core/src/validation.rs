use regex::Regex;
use reqwest::Url;
use std::fmt;
use std::sync::LazyLock;

/// Dot-joined labels of 1-63 alphanumerics or hyphens, never starting or ending with a hyphen.
static HOSTNAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$",
    )
    .expect("hostname pattern compiles")
});

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Domain,
    Email,
    GivenName,
    Surname,
    Role,
    WorkspaceName,
    LogoUrl,
    PreferenceKey,
    PreferenceValue,
}

impl FormField {
    pub fn label(self) -> &'static str {
        match self {
            Self::Domain => "domain",
            Self::Email => "email",
            Self::GivenName => "first name",
            Self::Surname => "last name",
            Self::Role => "role",
            Self::WorkspaceName => "workspace name",
            Self::LogoUrl => "logo URL",
            Self::PreferenceKey => "key",
            Self::PreferenceValue => "value",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: FormField,
    pub message: String,
}

impl FieldError {
    pub fn new(field: FormField, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}: {}", self.field.label(), self.message)
    }
}

impl std::error::Error for FieldError {}

pub fn is_valid_hostname(value: &str) -> bool {
    HOSTNAME_RE.is_match(value)
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// Returns the trimmed domain when it is present and well formed.
pub fn validate_domain(value: &str) -> Result<String, FieldError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FieldError::new(FormField::Domain, "Domain is required"));
    }
    if !is_valid_hostname(trimmed) {
        return Err(FieldError::new(
            FormField::Domain,
            "Please enter a valid domain name",
        ));
    }
    Ok(trimmed.to_owned())
}

pub fn validate_optional_domain(value: &str) -> Result<Option<String>, FieldError> {
    if value.trim().is_empty() {
        return Ok(None);
    }
    validate_domain(value).map(Some)
}

pub fn validate_email(value: &str) -> Result<String, FieldError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FieldError::new(FormField::Email, "Email is required"));
    }
    if !is_valid_email(trimmed) {
        return Err(FieldError::new(
            FormField::Email,
            "Please enter a valid email address",
        ));
    }
    Ok(trimmed.to_owned())
}

pub fn validate_required(field: FormField, value: &str) -> Result<String, FieldError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        let message = match field {
            FormField::GivenName => "First name is required".to_owned(),
            FormField::Surname => "Last name is required".to_owned(),
            FormField::WorkspaceName => "Workspace name is required".to_owned(),
            FormField::PreferenceKey => "Key is required".to_owned(),
            FormField::Domain => "Domain is required".to_owned(),
            FormField::Email => "Email is required".to_owned(),
            other => format!("{} is required", capitalize(other.label())),
        };
        return Err(FieldError::new(field, message));
    }
    Ok(trimmed.to_owned())
}

/// Blank input is accepted as "no URL"; anything else must be absolute.
pub fn validate_optional_url(field: FormField, value: &str) -> Result<Option<String>, FieldError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match Url::parse(trimmed) {
        Ok(url) if url.has_host() || !url.cannot_be_a_base() => Ok(Some(trimmed.to_owned())),
        _ => Err(FieldError::new(field, "Please enter a valid URL for the logo")),
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hostname_grammar_accepts_common_domains() {
        for domain in ["example.com", "sub.example.co.uk", "my-company.io", "a.io", "localhost"] {
            assert!(is_valid_hostname(domain), "{domain} should be accepted");
        }
    }

    #[test]
    fn hostname_grammar_rejects_protocols_paths_and_bad_labels() {
        for domain in [
            "http://example.com",
            "-bad.com",
            "bad-.com",
            "exa mple.com",
            "",
            "example.com/path",
            "example.com:8080",
            "example..com",
        ] {
            assert!(!is_valid_hostname(domain), "{domain} should be rejected");
        }
    }

    #[test]
    fn hostname_labels_are_capped_at_sixty_three_characters() {
        let longest = format!("{}.com", "a".repeat(63));
        let too_long = format!("{}.com", "a".repeat(64));
        assert!(is_valid_hostname(&longest));
        assert!(!is_valid_hostname(&too_long));
    }

    #[test]
    fn validate_domain_reports_required_before_shape() {
        let error = validate_domain("   ").expect_err("blank domain");
        assert_eq!(error.message, "Domain is required");

        let error = validate_domain("http://example.com").expect_err("protocol");
        assert_eq!(error.message, "Please enter a valid domain name");
        assert_eq!(error.field, FormField::Domain);

        assert_eq!(validate_domain("  example.com ").as_deref(), Ok("example.com"));
    }

    #[test]
    fn optional_domain_treats_blank_as_absent() {
        assert_eq!(validate_optional_domain(""), Ok(None));
        assert!(validate_optional_domain("-bad.com").is_err());
    }

    #[test]
    fn email_requires_local_and_dotted_domain() {
        assert!(validate_email("ada@example.com").is_ok());
        assert_eq!(
            validate_email("").expect_err("blank").message,
            "Email is required"
        );
        for bad in ["ada", "ada@example", "ada @example.com", "@example.com"] {
            assert_eq!(
                validate_email(bad).expect_err("malformed").message,
                "Please enter a valid email address"
            );
        }
    }

    #[test]
    fn required_fields_carry_field_specific_messages() {
        assert_eq!(
            validate_required(FormField::GivenName, " ")
                .expect_err("blank")
                .to_string(),
            "first name: First name is required"
        );
        assert_eq!(
            validate_required(FormField::Role, "").expect_err("blank").message,
            "Role is required"
        );
    }

    #[test]
    fn logo_url_must_be_absolute_when_present() {
        assert_eq!(validate_optional_url(FormField::LogoUrl, ""), Ok(None));
        assert_eq!(
            validate_optional_url(FormField::LogoUrl, "https://cdn.example.com/logo.png"),
            Ok(Some("https://cdn.example.com/logo.png".to_owned()))
        );
        assert!(validate_optional_url(FormField::LogoUrl, "/logo.png").is_err());
        assert!(validate_optional_url(FormField::LogoUrl, "not a url").is_err());
    }
}
