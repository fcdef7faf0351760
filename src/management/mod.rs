mod credentials;

pub use credentials::CredentialStore;
pub use credentials::EnvOverrideStore;
pub use credentials::FileCredentialStore;
#[cfg(feature = "keyring")]
pub use credentials::KeyringCredentialStore;
pub use credentials::MemoryCredentialStore;
pub use credentials::REFRESH_TOKEN_KEY;
pub use credentials::SERVICE_NAME;
pub use credentials::default_store;
