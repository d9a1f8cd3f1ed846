//! Session identifier generation

use std::net::SocketAddr;

/// Request attributes available to identifier generators.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub method: String,
    pub path: String,
    pub remote_addr: Option<SocketAddr>,
    pub user_agent: Option<String>,
}

/// Produces the random part of a session identifier. The store prefix is
/// prepended by the manager.
///
/// Values must be unique with overwhelming probability across the store
/// namespace.
pub trait IdGenerator: Send + Sync {
    fn generate(&self, ctx: &RequestContext) -> String;
}

impl<F> IdGenerator for F
where
    F: Fn(&RequestContext) -> String + Send + Sync,
{
    fn generate(&self, ctx: &RequestContext) -> String {
        self(ctx)
    }
}

/// Random bytes from the thread RNG, hex encoded.
#[derive(Debug, Clone, Copy)]
pub struct RandomHexId {
    bytes: usize,
}

impl RandomHexId {
    pub fn new(bytes: usize) -> Self {
        Self { bytes: bytes.max(1) }
    }
}

impl Default for RandomHexId {
    fn default() -> Self {
        Self::new(10)
    }
}

impl IdGenerator for RandomHexId {
    fn generate(&self, _ctx: &RequestContext) -> String {
        let token: Vec<u8> = (0..self.bytes).map(|_| rand::random::<u8>()).collect();
        hex::encode(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_default_is_twenty_hex_chars() {
        let id = RandomHexId::default().generate(&RequestContext::default());
        assert_eq!(id.len(), 20);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn test_ids_do_not_repeat() {
        let generator = RandomHexId::new(16);
        let ctx = RequestContext::default();
        let ids: HashSet<String> = (0..1000).map(|_| generator.generate(&ctx)).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn test_closure_generator_sees_context() {
        let generator = |ctx: &RequestContext| format!("{}-fixed", ctx.method.to_lowercase());
        let ctx = RequestContext {
            method: "POST".into(),
            ..Default::default()
        };
        assert_eq!(generator.generate(&ctx), "post-fixed");
    }
}
