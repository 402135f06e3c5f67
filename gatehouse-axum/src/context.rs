use axum::http::{HeaderMap, HeaderValue};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use gatehouse::{AttemptRepository, Gatehouse};
use gatehouse_core::{
    CookieSameSite, Error, SessionContext, SessionCookie, SessionMetadata,
    error::SessionError,
};

use crate::error::AuthError;

/// [`SessionContext`] over an Axum request's headers and a response cookie jar.
///
/// Cookies written through the context end up in the jar; return
/// [`into_jar`](Self::into_jar) alongside the response to send them.
#[derive(Debug, Clone)]
pub struct AxumSessionContext {
    headers: HeaderMap,
    jar: CookieJar,
}

impl AxumSessionContext {
    pub fn new(headers: HeaderMap, jar: CookieJar) -> Self {
        Self { headers, jar }
    }

    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            jar: CookieJar::from_headers(headers),
            headers: headers.clone(),
        }
    }

    pub fn into_jar(self) -> CookieJar {
        self.jar
    }
}

impl SessionContext for AxumSessionContext {
    fn cookie(&self, name: &str) -> Option<String> {
        self.jar.get(name).map(|cookie| cookie.value().to_string())
    }

    fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }

    fn set_cookie(&mut self, cookie: SessionCookie) -> Result<(), Error> {
        let cookie = to_response_cookie(cookie);
        HeaderValue::from_str(&cookie.to_string())
            .map_err(|e| SessionError::CookieWrite(e.to_string()))?;

        self.jar = self.jar.clone().add(cookie);
        Ok(())
    }
}

fn to_response_cookie(cookie: SessionCookie) -> Cookie<'static> {
    let same_site = match cookie.same_site {
        CookieSameSite::Strict => SameSite::Strict,
        CookieSameSite::Lax => SameSite::Lax,
        CookieSameSite::None => SameSite::None,
    };

    Cookie::build((cookie.name, cookie.value))
        .http_only(cookie.http_only)
        .secure(cookie.secure)
        .same_site(same_site)
        .path(cookie.path)
        .max_age(time::Duration::seconds(cookie.max_age.num_seconds()))
        .build()
}

/// Write fresh session metadata for the device that sent `headers`.
///
/// Call from the login handler once the credentials have been accepted, and
/// return the jar with the response.
pub fn establish_session<R>(
    gatehouse: &Gatehouse<R>,
    headers: &HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, SessionMetadata), AuthError>
where
    R: AttemptRepository,
{
    let mut ctx = AxumSessionContext::new(headers.clone(), jar);
    let metadata = gatehouse.initialize_session(&mut ctx)?;
    Ok((ctx.into_jar(), metadata))
}

/// Overwrite the session metadata cookie with an expired one.
pub fn clear_session<R>(gatehouse: &Gatehouse<R>, jar: CookieJar) -> CookieJar
where
    R: AttemptRepository,
{
    let settings = &gatehouse.config().session.cookie;
    jar.remove(Cookie::build(settings.name.clone()).path(settings.path.clone()))
}
