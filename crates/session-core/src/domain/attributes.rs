//! Cookie attributes carried inside the session state
//!
//! `expires` and `max_age` are mutually exclusive: setting one clears the
//! other. The fields are private so that every write goes through a setter.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

pub use session_shared::config::SameSite;
use session_shared::constants::DEFAULT_COOKIE_PATH;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "StoredAttributes")]
pub struct CookieAttributes {
    path: String,
    http_only: bool,
    secure: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    domain: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expires: Option<DateTime<Utc>>,
    /// Milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    max_age: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    same_site: Option<SameSite>,
}

impl Default for CookieAttributes {
    fn default() -> Self {
        Self {
            path: DEFAULT_COOKIE_PATH.to_string(),
            http_only: true,
            secure: false,
            domain: None,
            expires: None,
            max_age: None,
            same_site: None,
        }
    }
}

impl CookieAttributes {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn http_only(&self) -> bool {
        self.http_only
    }

    pub fn secure(&self) -> bool {
        self.secure
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn expires(&self) -> Option<DateTime<Utc>> {
        self.expires
    }

    pub fn max_age(&self) -> Option<i64> {
        self.max_age
    }

    pub fn same_site(&self) -> Option<SameSite> {
        self.same_site
    }

    pub fn set_path(&mut self, path: impl Into<String>) {
        self.path = path.into();
    }

    pub fn set_http_only(&mut self, http_only: bool) {
        self.http_only = http_only;
    }

    pub fn set_secure(&mut self, secure: bool) {
        self.secure = secure;
    }

    pub fn set_domain(&mut self, domain: Option<String>) {
        self.domain = domain;
    }

    pub fn set_same_site(&mut self, same_site: Option<SameSite>) {
        self.same_site = same_site;
    }

    /// Sets an absolute expiry. A `Some` clears `max_age`.
    pub fn set_expires(&mut self, expires: Option<DateTime<Utc>>) {
        if expires.is_some() {
            self.max_age = None;
        }
        self.expires = expires;
    }

    /// Sets a relative lifetime in milliseconds. A `Some` clears `expires`.
    pub fn set_max_age(&mut self, max_age: Option<i64>) {
        if max_age.is_some() {
            self.expires = None;
        }
        self.max_age = max_age;
    }

    /// Applies the fields of `update` in the order they were declared.
    pub fn apply(&mut self, update: &CookieUpdate) {
        for field in &update.fields {
            match field {
                CookieField::Path(path) => self.set_path(path.clone()),
                CookieField::HttpOnly(v) => self.set_http_only(*v),
                CookieField::Secure(v) => self.set_secure(*v),
                CookieField::Domain(domain) => self.set_domain(domain.clone()),
                CookieField::Expires(expires) => self.set_expires(*expires),
                CookieField::MaxAge(max_age) => self.set_max_age(*max_age),
                CookieField::SameSite(same_site) => self.set_same_site(*same_site),
            }
        }
    }
}

/// Shape accepted from the store. Missing keys fall back to defaults and a
/// record carrying both `expires` and `maxAge` keeps `expires`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredAttributes {
    #[serde(default = "default_path")]
    path: String,
    #[serde(default = "default_http_only")]
    http_only: bool,
    #[serde(default)]
    secure: bool,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    expires: Option<DateTime<Utc>>,
    #[serde(default)]
    max_age: Option<i64>,
    #[serde(default)]
    same_site: Option<SameSite>,
}

fn default_path() -> String {
    DEFAULT_COOKIE_PATH.to_string()
}

fn default_http_only() -> bool {
    true
}

impl From<StoredAttributes> for CookieAttributes {
    fn from(raw: StoredAttributes) -> Self {
        let mut attrs = CookieAttributes {
            path: raw.path,
            http_only: raw.http_only,
            secure: raw.secure,
            domain: raw.domain,
            expires: None,
            max_age: None,
            same_site: raw.same_site,
        };
        attrs.set_max_age(raw.max_age);
        attrs.set_expires(raw.expires);
        attrs
    }
}

/// A single cookie attribute write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieField {
    Path(String),
    HttpOnly(bool),
    Secure(bool),
    Domain(Option<String>),
    Expires(Option<DateTime<Utc>>),
    MaxAge(Option<i64>),
    SameSite(Option<SameSite>),
}

/// Ordered batch of cookie attribute writes, persisted as one mutation.
///
/// When both `expires` and `maxAge` appear, the one applied last wins. The
/// JSON form keeps document order, so `{"maxAge": 5000, "expires": "..."}`
/// ends with `expires` set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieUpdate {
    fields: Vec<CookieField>,
}

impl CookieUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: CookieField) -> Self {
        self.fields.push(field);
        self
    }

    pub fn path(self, path: impl Into<String>) -> Self {
        self.field(CookieField::Path(path.into()))
    }

    pub fn http_only(self, http_only: bool) -> Self {
        self.field(CookieField::HttpOnly(http_only))
    }

    pub fn secure(self, secure: bool) -> Self {
        self.field(CookieField::Secure(secure))
    }

    pub fn domain(self, domain: impl Into<String>) -> Self {
        self.field(CookieField::Domain(Some(domain.into())))
    }

    pub fn expires(self, expires: DateTime<Utc>) -> Self {
        self.field(CookieField::Expires(Some(expires)))
    }

    pub fn max_age(self, max_age_ms: i64) -> Self {
        self.field(CookieField::MaxAge(Some(max_age_ms)))
    }

    pub fn same_site(self, same_site: SameSite) -> Self {
        self.field(CookieField::SameSite(Some(same_site)))
    }

    pub fn fields(&self) -> &[CookieField] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

const UPDATE_FIELDS: &[&str] = &[
    "path", "httpOnly", "secure", "domain", "expires", "maxAge", "sameSite",
];

impl<'de> Deserialize<'de> for CookieUpdate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(UpdateVisitor)
    }
}

struct UpdateVisitor;

impl<'de> Visitor<'de> for UpdateVisitor {
    type Value = CookieUpdate;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a map of cookie attributes")
    }

    fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut update = CookieUpdate::new();
        while let Some(key) = map.next_key::<String>()? {
            let field = match key.as_str() {
                "path" => CookieField::Path(map.next_value()?),
                "httpOnly" => CookieField::HttpOnly(map.next_value()?),
                "secure" => CookieField::Secure(map.next_value()?),
                "domain" => CookieField::Domain(map.next_value()?),
                "expires" => CookieField::Expires(map.next_value()?),
                "maxAge" => CookieField::MaxAge(map.next_value()?),
                "sameSite" => CookieField::SameSite(map.next_value()?),
                other => return Err(de::Error::unknown_field(other, UPDATE_FIELDS)),
            };
            update.fields.push(field);
        }
        Ok(update)
    }
}
