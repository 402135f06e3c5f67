//! Route classification
//!
//! Middleware needs to know, before touching the session cookie, what kind of page
//! a request is for:
//!
//! - [`RouteClass::Protected`] pages require a live session; anyone else is sent
//!   to the login page.
//! - [`RouteClass::AuthOnly`] pages (login, sign-up) make no sense with a live
//!   session; such visitors are sent home.
//! - Everything else is [`RouteClass::Public`].

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

use crate::error::ValidationError;

/// Characters escaped in the redirect parameter; `/` stays readable.
const REDIRECT_VALUE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'/')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    Public,
    AuthOnly,
    Protected,
}

/// Path prefixes and redirect targets used to classify requests.
#[derive(Debug, Clone)]
pub struct RouteTable {
    protected: Vec<String>,
    auth_only: Vec<String>,
    /// Where visitors without a live session are sent
    pub login_path: String,
    /// Where visitors with a live session are sent from auth-only pages
    pub home_path: String,
    /// Query parameter carrying the originally requested path to the login page
    pub redirect_param: String,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self {
            protected: ["/dashboard", "/settings", "/profile", "/onboarding"]
                .map(String::from)
                .to_vec(),
            auth_only: ["/login", "/signup", "/forgot-password", "/reset-password"]
                .map(String::from)
                .to_vec(),
            login_path: "/login".to_string(),
            home_path: "/dashboard".to_string(),
            redirect_param: "redirectTo".to_string(),
        }
    }
}

impl RouteTable {
    /// An empty table: every path is public.
    pub fn empty() -> Self {
        Self {
            protected: Vec::new(),
            auth_only: Vec::new(),
            ..Self::default()
        }
    }

    pub fn protect(mut self, prefix: impl Into<String>) -> Self {
        self.protected.push(prefix.into());
        self
    }

    pub fn auth_only(mut self, prefix: impl Into<String>) -> Self {
        self.auth_only.push(prefix.into());
        self
    }

    pub fn with_login_path(mut self, path: impl Into<String>) -> Self {
        self.login_path = path.into();
        self
    }

    pub fn with_home_path(mut self, path: impl Into<String>) -> Self {
        self.home_path = path.into();
        self
    }

    /// Classify a request path.
    ///
    /// Protected prefixes win over auth-only prefixes if both match.
    pub fn classify(&self, path: &str) -> RouteClass {
        if self.protected.iter().any(|prefix| matches_prefix(path, prefix)) {
            RouteClass::Protected
        } else if self.auth_only.iter().any(|prefix| matches_prefix(path, prefix)) {
            RouteClass::AuthOnly
        } else {
            RouteClass::Public
        }
    }

    /// The login URL that returns the visitor to `original_path` afterwards.
    ///
    /// The path is percent-encoded as a query value, so it always yields a single
    /// redirect parameter.
    pub fn login_redirect(&self, original_path: &str) -> String {
        format!(
            "{}?{}={}",
            self.login_path,
            self.redirect_param,
            utf8_percent_encode(original_path, REDIRECT_VALUE)
        )
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        for prefix in self.protected.iter().chain(&self.auth_only) {
            if !prefix.starts_with('/') {
                return Err(ValidationError::InvalidRoute(format!(
                    "prefix {prefix:?} must start with '/'"
                )));
            }
        }
        // A protected login page would redirect to itself forever
        if self.classify(&self.login_path) == RouteClass::Protected {
            return Err(ValidationError::InvalidRoute(format!(
                "login path {:?} is protected",
                self.login_path
            )));
        }
        if self.classify(&self.home_path) == RouteClass::AuthOnly {
            return Err(ValidationError::InvalidRoute(format!(
                "home path {:?} is auth-only",
                self.home_path
            )));
        }
        Ok(())
    }
}

/// Prefix match on whole path segments.
fn matches_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_classification() {
        let table = RouteTable::default();

        assert_eq!(table.classify("/"), RouteClass::Public);
        assert_eq!(table.classify("/pricing"), RouteClass::Public);
        assert_eq!(table.classify("/dashboard"), RouteClass::Protected);
        assert_eq!(table.classify("/settings/profile"), RouteClass::Protected);
        assert_eq!(table.classify("/onboarding/step-2"), RouteClass::Protected);
        assert_eq!(table.classify("/login"), RouteClass::AuthOnly);
        assert_eq!(table.classify("/signup/"), RouteClass::AuthOnly);
    }

    #[test]
    fn test_prefix_respects_segment_boundaries() {
        let table = RouteTable::default();

        assert_eq!(table.classify("/settingsx"), RouteClass::Public);
        assert_eq!(table.classify("/login-help"), RouteClass::Public);
        assert_eq!(table.classify("/dashboards"), RouteClass::Public);
    }

    #[test]
    fn test_custom_table() {
        let table = RouteTable::empty()
            .protect("/admin/")
            .auth_only("/auth")
            .with_login_path("/auth/sign-in")
            .with_home_path("/admin");

        assert_eq!(table.classify("/admin"), RouteClass::Protected);
        assert_eq!(table.classify("/admin/users"), RouteClass::Protected);
        assert_eq!(table.classify("/auth/sign-in"), RouteClass::AuthOnly);
        assert_eq!(table.classify("/dashboard"), RouteClass::Public);
        assert!(table.validate().is_ok());
    }

    #[test]
    fn test_login_redirect() {
        let table = RouteTable::default();
        assert_eq!(
            table.login_redirect("/settings/billing"),
            "/login?redirectTo=/settings/billing"
        );
    }

    #[test]
    fn test_login_redirect_escapes_query_characters() {
        let table = RouteTable::default();

        let url = table.login_redirect("/settings/a&redirectTo=//evil.example");
        assert_eq!(url.matches("redirectTo=").count(), 1);
        assert_eq!(
            url,
            "/login?redirectTo=/settings/a%26redirectTo%3D//evil.example"
        );

        assert_eq!(
            table.login_redirect("/profile?tab=1#top"),
            "/login?redirectTo=/profile%3Ftab%3D1%23top"
        );
    }

    #[test]
    fn test_validate_rejects_self_redirects() {
        assert!(RouteTable::default().validate().is_ok());
        assert!(RouteTable::default().protect("/login").validate().is_err());
        assert!(RouteTable::default().auth_only("/dashboard").validate().is_ok());
        assert!(
            RouteTable::default()
                .with_home_path("/signup")
                .validate()
                .is_err()
        );
        assert!(RouteTable::default().protect("admin").validate().is_err());
    }
}
