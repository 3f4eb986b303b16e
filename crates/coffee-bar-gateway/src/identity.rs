use std::fmt;

use async_trait::async_trait;
use coffee_bar_core::CoreError;
use reqwest::Url;
use serde::Deserialize;
use serde_json::json;

use crate::graphql::truncate_for_error;

const DOMAIN_NOT_ALLOWED_ERROR: &str = "access_denied";
const DOMAIN_NOT_ALLOWED_DESCRIPTION: &str = "Domain not in allowlist";
const ACCESS_REQUEST_SUBJECT: &str = "Coffee.ai Admin Access Request";

#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl TokenGrant {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: Option<String>,
        expires_in: Option<u64>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_in,
        }
    }
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("TokenGrant")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    fn authorize_url(&self, state: &str) -> Result<String, CoreError>;
    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, CoreError>;
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, CoreError>;
    fn logout_url(&self) -> Result<String, CoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Auth0Config {
    pub domain: String,
    pub client_id: String,
    pub audience: String,
    pub scope: String,
    pub connection: String,
    pub redirect_uri: String,
    pub logout_return_to: String,
}

impl Auth0Config {
    fn base_url(&self) -> Result<Url, CoreError> {
        let domain = self.domain.trim().trim_end_matches('/');
        let raw = if domain.starts_with("http://") || domain.starts_with("https://") {
            domain.to_owned()
        } else {
            format!("https://{domain}")
        };
        Url::parse(&raw).map_err(|err| {
            CoreError::Configuration(format!("identity domain `{domain}` is not a valid host: {err}"))
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, CoreError> {
        self.base_url()?.join(path).map_err(|err| {
            CoreError::Configuration(format!("failed to build identity endpoint {path}: {err}"))
        })
    }
}

#[derive(Clone)]
pub struct Auth0IdentityProvider {
    config: Auth0Config,
    client: reqwest::Client,
}

impl fmt::Debug for Auth0IdentityProvider {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Auth0IdentityProvider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Auth0IdentityProvider {
    pub fn new(config: Auth0Config) -> Result<Self, CoreError> {
        config.base_url()?;
        let client = reqwest::Client::builder()
            .user_agent("coffee-bar/identity")
            .build()
            .map_err(|err| {
                CoreError::DependencyUnavailable(format!(
                    "failed to initialize identity HTTP client: {err}"
                ))
            })?;
        Ok(Self { config, client })
    }

    async fn request_token(&self, body: serde_json::Value) -> Result<TokenGrant, CoreError> {
        let endpoint = self.config.endpoint("/oauth/token")?;
        let response = self
            .client
            .post(endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                CoreError::DependencyUnavailable(format!(
                    "failed to reach the identity provider: {err}"
                ))
            })?;

        let status = response.status();
        let raw = response.text().await.map_err(|err| {
            CoreError::DependencyUnavailable(format!(
                "failed to read identity provider response: {err}"
            ))
        })?;

        if !status.is_success() {
            if let Ok(payload) = serde_json::from_str::<IdentityErrorPayload>(&raw) {
                return Err(classify_identity_error(
                    &payload.error,
                    payload.error_description.as_deref(),
                ));
            }
            if status.is_server_error() {
                return Err(CoreError::DependencyUnavailable(format!(
                    "identity provider returned HTTP {status}: {}",
                    truncate_for_error(&raw)
                )));
            }
            return Err(CoreError::Identity(format!(
                "identity provider returned HTTP {status}: {}",
                truncate_for_error(&raw)
            )));
        }

        serde_json::from_str(&raw).map_err(|err| {
            CoreError::Identity(format!("failed to decode identity token response: {err}"))
        })
    }
}

#[async_trait]
impl IdentityProvider for Auth0IdentityProvider {
    fn authorize_url(&self, state: &str) -> Result<String, CoreError> {
        let mut url = self.config.endpoint("/authorize")?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.config.client_id)
                .append_pair("redirect_uri", &self.config.redirect_uri)
                .append_pair("scope", &self.config.scope)
                .append_pair("connection", &self.config.connection)
                .append_pair("prompt", "select_account")
                .append_pair("state", state);
            if !self.config.audience.is_empty() {
                query.append_pair("audience", &self.config.audience);
            }
        }
        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> Result<TokenGrant, CoreError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(CoreError::Identity(
                "authorization code must not be empty".to_owned(),
            ));
        }
        self.request_token(json!({
            "grant_type": "authorization_code",
            "client_id": self.config.client_id,
            "code": code,
            "redirect_uri": self.config.redirect_uri,
        }))
        .await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, CoreError> {
        self.request_token(json!({
            "grant_type": "refresh_token",
            "client_id": self.config.client_id,
            "refresh_token": refresh_token,
            "audience": self.config.audience,
            "scope": self.config.scope,
        }))
        .await
    }

    fn logout_url(&self) -> Result<String, CoreError> {
        let mut url = self.config.endpoint("/v2/logout")?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("returnTo", &self.config.logout_return_to);
        Ok(url.into())
    }
}

#[derive(Debug, Deserialize)]
struct IdentityErrorPayload {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// `access_denied` + "Domain not in allowlist" is the only machine-checkable
/// login failure; everything else is a generic identity error.
pub fn classify_identity_error(error: &str, description: Option<&str>) -> CoreError {
    if error == DOMAIN_NOT_ALLOWED_ERROR && description == Some(DOMAIN_NOT_ALLOWED_DESCRIPTION) {
        return CoreError::DomainNotAllowed;
    }
    match description.filter(|value| !value.trim().is_empty()) {
        Some(description) => CoreError::Identity(format!("{error}: {description}")),
        None => CoreError::Identity(error.to_owned()),
    }
}

/// Support mail link offered to signed-in principals without admin access.
pub fn access_request_mailto(
    support_email: &str,
    name: Option<&str>,
    email: Option<&str>,
) -> Result<String, CoreError> {
    let name = name.map(str::trim).filter(|value| !value.is_empty());
    let email = email.map(str::trim).filter(|value| !value.is_empty());
    let body = format!(
        "Hello Coffee.ai Team,\n\n\
         I would like to request access to the Coffee.ai Admin panel.\n\n\
         My details:\n\
         - Name: {}\n\
         - Email: {}\n\n\
         Thank you for your consideration.\n\n\
         Best regards,\n\
         {}",
        name.unwrap_or("N/A"),
        email.unwrap_or("N/A"),
        name.unwrap_or("User"),
    );

    let mut url = Url::parse(&format!("mailto:{}", support_email.trim())).map_err(|err| {
        CoreError::Configuration(format!("support email `{support_email}` is invalid: {err}"))
    })?;
    url.query_pairs_mut()
        .append_pair("subject", ACCESS_REQUEST_SUBJECT)
        .append_pair("body", &body);
    // mailto bodies take %20 for spaces; a literal `+` is already %2B here.
    Ok(String::from(url).replace('+', "%20"))
}

/// Extracts the authorization code from a redirect URL or its query string.
pub fn parse_callback(input: &str) -> Result<String, CoreError> {
    let input = input.trim();
    let query = match Url::parse(input) {
        Ok(url) => url.query().unwrap_or_default().to_owned(),
        Err(_) => input.trim_start_matches('?').to_owned(),
    };

    let mut code = None;
    let mut error = None;
    let mut description = None;
    for (key, value) in url_pairs(&query) {
        match key.as_str() {
            "code" => code = Some(value),
            "error" => error = Some(value),
            "error_description" => description = Some(value),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(classify_identity_error(&error, description.as_deref()));
    }
    code.filter(|code| !code.is_empty()).ok_or_else(|| {
        CoreError::Identity("sign-in callback did not include an authorization code".to_owned())
    })
}

fn url_pairs(query: &str) -> Vec<(String, String)> {
    Url::parse(&format!("http://localhost/?{query}"))
        .map(|url| {
            url.query_pairs()
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Auth0Config {
        Auth0Config {
            domain: "coffee-web-dev.us.auth0.com".to_owned(),
            client_id: "client-1".to_owned(),
            audience: "https://api.coffee.ai".to_owned(),
            scope: "openid profile email".to_owned(),
            connection: "google-oauth2".to_owned(),
            redirect_uri: "http://localhost:3000/callback".to_owned(),
            logout_return_to: "http://localhost:3000".to_owned(),
        }
    }

    #[test]
    fn authorize_url_requests_google_with_account_picker() {
        let provider = Auth0IdentityProvider::new(config()).expect("provider");
        let url = Url::parse(&provider.authorize_url("xyz").expect("url")).expect("valid url");
        assert_eq!(url.host_str(), Some("coffee-web-dev.us.auth0.com"));
        assert_eq!(url.path(), "/authorize");

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        for (key, value) in [
            ("connection", "google-oauth2"),
            ("prompt", "select_account"),
            ("scope", "openid profile email"),
            ("audience", "https://api.coffee.ai"),
            ("state", "xyz"),
        ] {
            assert!(
                pairs.contains(&(key.to_owned(), value.to_owned())),
                "missing {key}={value}"
            );
        }
    }

    #[test]
    fn logout_url_carries_return_to() {
        let provider = Auth0IdentityProvider::new(config()).expect("provider");
        assert_eq!(
            provider.logout_url().expect("logout url"),
            "https://coffee-web-dev.us.auth0.com/v2/logout?client_id=client-1&returnTo=http%3A%2F%2Flocalhost%3A3000"
        );
    }

    #[test]
    fn callback_with_domain_error_is_distinct() {
        let error = parse_callback(
            "http://localhost:3000/callback?error=access_denied&error_description=Domain%20not%20in%20allowlist",
        )
        .expect_err("domain rejected");
        assert_eq!(error, CoreError::DomainNotAllowed);
    }

    #[test]
    fn other_callback_errors_are_generic() {
        let error = parse_callback("?error=access_denied&error_description=User+cancelled")
            .expect_err("cancelled");
        assert_eq!(
            error,
            CoreError::Identity("access_denied: User cancelled".to_owned())
        );
    }

    #[test]
    fn callback_code_is_extracted_from_url_or_query() {
        assert_eq!(
            parse_callback("http://localhost:3000/callback?code=abc&state=1").as_deref(),
            Ok("abc")
        );
        assert_eq!(parse_callback("code=def").as_deref(), Ok("def"));
        assert!(parse_callback("state=1").is_err());
    }

    #[test]
    fn access_request_mailto_prefills_the_principal() {
        let link = access_request_mailto("support@coffee.ai", Some("Ada Lovelace"), None)
            .expect("mailto");
        assert!(link.starts_with(
            "mailto:support@coffee.ai?subject=Coffee.ai%20Admin%20Access%20Request&body="
        ));
        assert!(!link.contains('+'));

        let url = Url::parse(&link).expect("valid mailto");
        let body = url
            .query_pairs()
            .find(|(key, _)| key == "body")
            .map(|(_, value)| value.into_owned())
            .expect("body");
        assert!(body.contains("- Name: Ada Lovelace\n- Email: N/A"));
        assert!(body.ends_with("Best regards,\nAda Lovelace"));
    }

    #[test]
    fn grant_debug_is_redacted() {
        let grant = TokenGrant::new("secret", Some("also-secret".to_owned()), Some(60));
        let rendered = format!("{grant:?}");
        assert!(!rendered.contains("secret"));
    }
}
