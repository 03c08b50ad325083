use serde::{Deserialize, Serialize};

/// Bearer-token claims. Tokens are minted by the external identity
/// service; only `sub` (the user id) is interpreted here.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
    pub iat: usize,
}
