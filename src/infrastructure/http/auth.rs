//! Bearer-token construction and host-name resolution for the engine
//! transport's `Authorization` and `UNMESHED_HOST_NAME` headers.

use sha2::{Digest, Sha256};

/// Build the `Authorization` header value: `Bearer
/// client.sdk.{client_id}.{sha256_hex(auth_token)}`.
#[must_use]
pub fn bearer_token(client_id: &str, auth_token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(auth_token.as_bytes());
    let digest = hex::encode(hasher.finalize());
    format!("Bearer client.sdk.{client_id}.{digest}")
}

/// Resolve the value for the `UNMESHED_HOST_NAME` poll header, in order:
/// the `UNMESHED_HOST_NAME` env var, then `HOSTNAME`, then `COMPUTERNAME`,
/// then the OS-reported hostname, finally the literal `"-"`.
#[must_use]
pub fn resolve_host_name() -> String {
    std::env::var("UNMESHED_HOST_NAME")
        .ok()
        .or_else(|| std::env::var("HOSTNAME").ok())
        .or_else(|| std::env::var("COMPUTERNAME").ok())
        .filter(|name| !name.is_empty())
        .or_else(|| gethostname::gethostname().into_string().ok())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "-".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_token_matches_literal_example() {
        // client-id "x", auth-token "y": the literal example from the
        // transport contract.
        let mut hasher = Sha256::new();
        hasher.update(b"y");
        let digest = hex::encode(hasher.finalize());
        assert_eq!(bearer_token("x", "y"), format!("Bearer client.sdk.x.{digest}"));
    }

    #[test]
    fn bearer_token_is_deterministic() {
        assert_eq!(bearer_token("a", "b"), bearer_token("a", "b"));
        assert_ne!(bearer_token("a", "b"), bearer_token("a", "c"));
    }

    #[test]
    fn host_name_resolution_prefers_unmeshed_override() {
        std::env::set_var("UNMESHED_HOST_NAME", "worker-7");
        assert_eq!(resolve_host_name(), "worker-7");
        std::env::remove_var("UNMESHED_HOST_NAME");
    }
}
