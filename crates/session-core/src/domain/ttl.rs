//! Store TTL derived from cookie attributes

use chrono::{DateTime, Utc};

use super::attributes::CookieAttributes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ttl {
    /// No `expires` and no `maxAge`: keep until the store evicts it.
    Persistent,
    Millis(u64),
    /// Lifetime already used up (`maxAge <= 0` or `expires == now`).
    Expired,
}

impl Ttl {
    /// `expires` wins as `|expires - now|`, then `maxAge`, else no TTL.
    pub fn compute(cookie: &CookieAttributes, now: DateTime<Utc>) -> Self {
        if let Some(expires) = cookie.expires() {
            let millis = (expires - now).num_milliseconds().unsigned_abs();
            return if millis == 0 { Ttl::Expired } else { Ttl::Millis(millis) };
        }
        match cookie.max_age() {
            Some(ms) if ms > 0 => Ttl::Millis(ms as u64),
            Some(_) => Ttl::Expired,
            None => Ttl::Persistent,
        }
    }

    pub fn as_millis(&self) -> Option<u64> {
        match self {
            Ttl::Millis(ms) => Some(*ms),
            _ => None,
        }
    }
}
