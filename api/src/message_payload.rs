use serde::Deserialize;

#[derive(Deserialize)]
pub struct MessagePayload {
    pub text: String,
}
