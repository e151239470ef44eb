//! Shared fixtures for DocuSign client tests.

use std::sync::OnceLock;

use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::RsaPrivateKey;
use signrelay_docusign::DocuSignCredentials;

/// Generate (once) a throwaway RSA key for signing grant assertions.
pub fn test_private_key_pem() -> &'static str {
    static KEY: OnceLock<String> = OnceLock::new();
    KEY.get_or_init(|| {
        let mut rng = rand::thread_rng();
        let key = RsaPrivateKey::new(&mut rng, 2048).expect("generate RSA key");
        key.to_pkcs8_pem(LineEnding::LF)
            .expect("encode PEM")
            .to_string()
    })
}

/// Credentials wired to the test key.
pub fn test_credentials() -> DocuSignCredentials {
    DocuSignCredentials {
        integrator_key: "ik-test".to_string(),
        user_id: "11111111-2222-3333-4444-555555555555".to_string(),
        auth_host: "account-d.docusign.com".to_string(),
        private_key_pem: test_private_key_pem().to_string(),
    }
}
