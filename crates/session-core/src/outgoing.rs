//! Session cookie on the wire

use cookie::time::{Duration, OffsetDateTime};
use cookie::Cookie;

use crate::domain::{CookieAttributes, SameSite};

/// The `Set-Cookie` a mutation emits: encrypted identifier plus the session's
/// current cookie attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingCookie {
    name: String,
    value: String,
    attributes: CookieAttributes,
}

impl OutgoingCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>, attributes: CookieAttributes) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            attributes,
        }
    }

    /// Empty value with `Max-Age=0`, telling the client to drop the cookie.
    pub fn removal(name: impl Into<String>, attributes: &CookieAttributes) -> Self {
        let mut attributes = attributes.clone();
        attributes.set_max_age(Some(0));
        Self::new(name, "", attributes)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn attributes(&self) -> &CookieAttributes {
        &self.attributes
    }

    /// Renders the `Set-Cookie` header value. `maxAge` is held in
    /// milliseconds and rendered as whole seconds.
    pub fn to_header_value(&self) -> String {
        let attrs = &self.attributes;
        let mut builder = Cookie::build((self.name.clone(), self.value.clone()))
            .path(attrs.path().to_string())
            .http_only(attrs.http_only())
            .secure(attrs.secure());

        if let Some(domain) = attrs.domain() {
            builder = builder.domain(domain.to_string());
        }
        if let Some(expires) = attrs.expires() {
            if let Ok(at) = OffsetDateTime::from_unix_timestamp(expires.timestamp()) {
                builder = builder.expires(at);
            }
        }
        if let Some(max_age) = attrs.max_age() {
            builder = builder.max_age(Duration::seconds(max_age.max(0) / 1000));
        }
        if let Some(same_site) = attrs.same_site() {
            builder = builder.same_site(match same_site {
                SameSite::Strict => cookie::SameSite::Strict,
                SameSite::Lax => cookie::SameSite::Lax,
                SameSite::None => cookie::SameSite::None,
            });
        }

        builder.build().to_string()
    }
}

/// Finds the value of cookie `name` in a `Cookie` request header.
pub fn find_cookie(header: &str, name: &str) -> Option<String> {
    Cookie::split_parse(header)
        .filter_map(Result::ok)
        .find(|c| c.name() == name)
        .map(|c| c.value().to_string())
}
