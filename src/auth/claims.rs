use serde::{Deserialize, Serialize};

/// Session JWT payload, issued by this service after a successful sign-in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,  // email
    pub name: String, // display name at sign-in
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}

/// Identity assertion presented to the sign-in callback, signed by the
/// provider with the client secret.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub iss: String,
    pub aud: String,
    pub exp: usize,
}
