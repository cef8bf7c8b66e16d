use crate::client::ApiClient;
use crate::error::Result;
use crate::models::{AuthPayload, Credentials, Envelope};

const LOGIN_PATH: &str = "/api/users/login";
const REGISTER_PATH: &str = "/api/users/register";

/// Maps login/register intents onto the users endpoints. Envelopes come back untouched.
#[derive(Clone)]
pub struct AuthService {
    client: ApiClient,
}

impl AuthService {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub async fn login(&self, credentials: &Credentials) -> Result<Envelope<AuthPayload>> {
        self.client.post(LOGIN_PATH, credentials).await
    }

    pub async fn register(&self, credentials: &Credentials) -> Result<Envelope<AuthPayload>> {
        self.client.post(REGISTER_PATH, credentials).await
    }
}
