use serde::{Deserialize, Serialize};

/// Request body for login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for `/auth/sendotp`.
#[derive(Debug, Deserialize)]
pub struct OtpRequest {
    #[serde(rename = "phoneNumber", default)]
    pub phone_number: String,
}

/// Request body for `/auth/verifyotp`.
#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub user: OtpRequest,
    #[serde(default)]
    pub code: String,
}

/// Response returned after register, login or otp verification.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub status: &'static str,
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub status: &'static str,
    pub error: String,
}
