//! No authentication handler

use super::{AuthMethod, AuthOutcome, Authenticator};
use crate::error::SocksError;
use crate::socks::SocksStream;
use async_trait::async_trait;

/// Accepts every client without a sub-negotiation
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

#[async_trait]
impl Authenticator for NoAuth {
    fn method(&self) -> AuthMethod {
        AuthMethod::NoAuth
    }

    async fn negotiate(&self, _stream: &mut dyn SocksStream) -> Result<AuthOutcome, SocksError> {
        Ok(AuthOutcome::Accepted { identity: None })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[tokio::test]
    async fn test_no_auth() {
        let mut stream = Cursor::new(Vec::new());
        let outcome = NoAuth.negotiate(&mut stream).await.unwrap();
        assert_eq!(outcome, AuthOutcome::Accepted { identity: None });
        assert!(stream.get_ref().is_empty());
    }
}
