pub struct Entry {
    pub value: String,
    pub expires_at_ms: u64, // 0 none
}

impl Entry {
    pub fn new(value: String, ttl_ms: Option<u64>, now_ms: u64) -> Self {
        let expires_at_ms = match ttl_ms {
            Some(ttl) => now_ms.saturating_add(ttl).max(1),
            None => 0,
        };
        Self { value, expires_at_ms }
    }

    pub fn is_expired(&self, now: u64) -> bool {
        self.expires_at_ms != 0 && now >= self.expires_at_ms
    }
}
