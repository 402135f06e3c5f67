use std::sync::Arc;

use crate::{
    Error,
    clock::{Clock, SystemClock},
    crypto::constant_time_compare,
    fingerprint::DeviceHeaders,
    session::{SessionCheck, SessionConfig, SessionContext, SessionMetadata},
};

/// Validates and refreshes the client-held session metadata cookie.
///
/// A session is live while it has seen a request within `timeout` and the request
/// comes from the device the cookie was issued to. Every live check slides the
/// activity timestamp forward.
pub struct SessionLivenessService {
    config: SessionConfig,
    clock: Arc<dyn Clock>,
}

impl SessionLivenessService {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self { config, clock }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Evaluate a raw cookie value against the request's device headers.
    ///
    /// Pure with respect to the request: nothing is written. A live result carries
    /// the metadata that should be written back.
    pub fn check(&self, raw_cookie: Option<&str>, headers: &DeviceHeaders) -> SessionCheck {
        let Some(raw_cookie) = raw_cookie else {
            return SessionCheck::Missing;
        };

        let metadata = match SessionMetadata::from_cookie_value(raw_cookie) {
            Ok(metadata) => metadata,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding malformed session metadata cookie");
                return SessionCheck::Malformed;
            }
        };

        let current_fingerprint = headers.fingerprint();
        let now = self.clock.now();

        if now - metadata.last_activity >= self.config.timeout {
            return SessionCheck::Expired;
        }

        if !constant_time_compare(
            current_fingerprint.as_bytes(),
            metadata.device_fingerprint.as_bytes(),
        ) {
            return SessionCheck::FingerprintMismatch;
        }

        SessionCheck::Live(SessionMetadata::new(now, current_fingerprint))
    }

    /// Check the request's session and refresh the cookie when it is live.
    ///
    /// Failing to write the refreshed cookie is logged and does not change the
    /// outcome for this request.
    pub fn check_and_refresh<C>(&self, ctx: &mut C) -> SessionCheck
    where
        C: SessionContext + ?Sized,
    {
        let raw_cookie = ctx.cookie(&self.config.cookie.name);
        let check = self.check(raw_cookie.as_deref(), &ctx.device_headers());

        match &check {
            SessionCheck::Live(refreshed) => {
                if let Err(e) = self.write_metadata(ctx, refreshed) {
                    tracing::warn!(error = %e, "Failed to refresh session metadata cookie");
                }
            }
            other => {
                tracing::debug!(reason = other.reason(), "Session is not live");
            }
        }

        check
    }

    /// Whether the request carries a live session. Refreshes the cookie if so.
    pub fn validate_session<C>(&self, ctx: &mut C) -> bool
    where
        C: SessionContext + ?Sized,
    {
        self.check_and_refresh(ctx).is_live()
    }

    /// Start a new session for the requesting device, replacing any previous one.
    ///
    /// Call this once after a successful login.
    pub fn initialize_session<C>(&self, ctx: &mut C) -> Result<SessionMetadata, Error>
    where
        C: SessionContext + ?Sized,
    {
        let metadata = SessionMetadata::new(self.clock.now(), ctx.device_headers().fingerprint());
        self.write_metadata(ctx, &metadata)?;
        tracing::debug!("Initialized session metadata");
        Ok(metadata)
    }

    fn write_metadata<C>(&self, ctx: &mut C, metadata: &SessionMetadata) -> Result<(), Error>
    where
        C: SessionContext + ?Sized,
    {
        let value = metadata.to_cookie_value()?;
        ctx.set_cookie(self.config.cookie.cookie(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{clock::MockClock, error::SessionError, session::SessionCookie};
    use chrono::{DateTime, Duration};
    use std::collections::HashMap;

    #[derive(Default)]
    struct TestContext {
        cookies: HashMap<String, String>,
        headers: HashMap<String, String>,
        written: Vec<SessionCookie>,
        fail_writes: bool,
    }

    impl TestContext {
        fn browser() -> Self {
            let mut ctx = Self::default();
            for (name, value) in [
                ("user-agent", "Mozilla/5.0 (X11; Linux x86_64)"),
                ("accept-language", "en-GB,en;q=0.8"),
                ("sec-ch-ua", "\"Chromium\";v=\"128\""),
                ("sec-ch-ua-platform", "\"Linux\""),
            ] {
                ctx.headers.insert(name.to_string(), value.to_string());
            }
            ctx
        }

        fn with_cookie(mut self, value: &str) -> Self {
            let name = "session_metadata".to_string();
            self.cookies.insert(name, value.to_string());
            self
        }
    }

    impl SessionContext for TestContext {
        fn cookie(&self, name: &str) -> Option<String> {
            self.cookies.get(name).cloned()
        }

        fn header(&self, name: &str) -> Option<String> {
            self.headers.get(name).cloned()
        }

        fn set_cookie(&mut self, cookie: SessionCookie) -> Result<(), Error> {
            if self.fail_writes {
                return Err(SessionError::CookieWrite("headers already sent".into()).into());
            }
            self.written.push(cookie);
            Ok(())
        }
    }

    fn service() -> (SessionLivenessService, MockClock) {
        let clock = MockClock::new(DateTime::from_timestamp(1_700_000_000, 0).unwrap());
        let service = SessionLivenessService::with_clock(
            SessionConfig::default(),
            Arc::new(clock.clone()),
        );
        (service, clock)
    }

    fn cookie_for(ctx: &TestContext, last_activity: DateTime<chrono::Utc>) -> String {
        SessionMetadata::new(last_activity, ctx.device_headers().fingerprint())
            .to_cookie_value()
            .unwrap()
    }

    #[test]
    fn test_missing_cookie_is_invalid() {
        let (service, _clock) = service();
        let mut ctx = TestContext::browser();

        assert!(!service.validate_session(&mut ctx));
        assert!(ctx.written.is_empty());
    }

    #[test]
    fn test_malformed_cookie_is_invalid_not_error() {
        let (service, _clock) = service();
        let mut ctx = TestContext::browser().with_cookie("{not json");

        assert_eq!(service.check_and_refresh(&mut ctx), SessionCheck::Malformed);
        assert!(ctx.written.is_empty());
    }

    #[test]
    fn test_live_session_is_refreshed() {
        let (service, clock) = service();
        let browser = TestContext::browser();
        let value = cookie_for(&browser, clock.now());
        let mut ctx = browser.with_cookie(&value);

        clock.advance(Duration::minutes(10));
        assert!(service.validate_session(&mut ctx));

        assert_eq!(ctx.written.len(), 1);
        let written = &ctx.written[0];
        assert_eq!(written.name, "session_metadata");
        assert!(written.http_only);
        assert_eq!(written.max_age, Duration::days(30));
        let refreshed = SessionMetadata::from_cookie_value(&written.value).unwrap();
        assert_eq!(refreshed.last_activity, clock.now());
    }

    #[test]
    fn test_timeout_boundary() {
        let (service, clock) = service();
        let browser = TestContext::browser();
        let issued = clock.now();
        let value = cookie_for(&browser, issued);

        let mut ctx = TestContext::browser().with_cookie(&value);
        clock.set(issued + Duration::minutes(30) - Duration::milliseconds(1));
        assert!(service.validate_session(&mut ctx));

        let mut ctx = TestContext::browser().with_cookie(&value);
        clock.set(issued + Duration::minutes(30));
        assert_eq!(service.check_and_refresh(&mut ctx), SessionCheck::Expired);
        assert!(ctx.written.is_empty());
    }

    #[test]
    fn test_fingerprint_mismatch_is_invalid() {
        let (service, clock) = service();
        let value = cookie_for(&TestContext::browser(), clock.now());

        let mut ctx = TestContext::browser().with_cookie(&value);
        ctx.headers.insert("accept-language".into(), "fr-FR".into());

        assert_eq!(
            service.check_and_refresh(&mut ctx),
            SessionCheck::FingerprintMismatch
        );
        assert!(ctx.written.is_empty());
    }

    #[test]
    fn test_write_failure_does_not_invalidate() {
        let (service, clock) = service();
        let value = cookie_for(&TestContext::browser(), clock.now());
        let mut ctx = TestContext::browser().with_cookie(&value);
        ctx.fail_writes = true;

        assert!(service.validate_session(&mut ctx));
    }

    #[test]
    fn test_initialize_session_overwrites_previous_state() {
        let (service, clock) = service();
        let mut ctx = TestContext::browser().with_cookie("garbage");

        let metadata = service.initialize_session(&mut ctx).unwrap();

        assert_eq!(metadata.last_activity, clock.now());
        assert_eq!(metadata.device_fingerprint, ctx.device_headers().fingerprint());
        assert_eq!(ctx.written[0].value, metadata.to_cookie_value().unwrap());
    }

    #[test]
    fn test_initialize_session_reports_write_failure() {
        let (service, _clock) = service();
        let mut ctx = TestContext::browser();
        ctx.fail_writes = true;

        let err = service.initialize_session(&mut ctx).unwrap_err();
        assert!(err.is_cookie_write_error());
    }

    #[test]
    fn test_initialized_session_validates_on_next_request() {
        let (service, clock) = service();
        let mut login = TestContext::browser();
        service.initialize_session(&mut login).unwrap();

        clock.advance(Duration::minutes(29));
        let mut next = TestContext::browser().with_cookie(&login.written[0].value);
        assert!(service.validate_session(&mut next));
    }
}
