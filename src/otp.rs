use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, instrument};

use crate::config::OtpConfig;

#[derive(Debug, Error)]
pub enum OtpError {
    #[error("request to otp provider failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("otp provider returned status {0}")]
    Status(u16),
}

/// One-time passcode delivery and checking.
///
/// The provider keeps the verification session; callers only ever see the
/// phone number and the submitted code.
#[async_trait]
pub trait OtpVerifier: Send + Sync {
    async fn send_code(&self, phone: &str) -> Result<(), OtpError>;
    /// `Ok(false)` means the provider answered but did not approve the code.
    async fn check_code(&self, phone: &str, code: &str) -> Result<bool, OtpError>;
}

#[derive(Debug, Deserialize)]
struct VerificationResponse {
    status: String,
}

/// Twilio Verify v2 client.
#[derive(Clone)]
pub struct TwilioVerify {
    client: reqwest::Client,
    account_sid: String,
    auth_token: String,
    service_id: String,
    base_url: String,
}

impl TwilioVerify {
    pub fn new(cfg: &OtpConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            account_sid: cfg.account_sid.clone(),
            auth_token: cfg.auth_token.clone(),
            service_id: cfg.service_id.clone(),
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, resource: &str) -> String {
        format!("{}/v2/Services/{}/{}", self.base_url, self.service_id, resource)
    }

    async fn post(&self, resource: &str, form: &[(&str, &str)]) -> Result<VerificationResponse, OtpError> {
        let res = self
            .client
            .post(self.url(resource))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(form)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            error!(%status, body = %body, resource, "twilio returned an error");
            return Err(OtpError::Status(status.as_u16()));
        }
        Ok(res.json::<VerificationResponse>().await?)
    }
}

#[async_trait]
impl OtpVerifier for TwilioVerify {
    #[instrument(skip(self))]
    async fn send_code(&self, phone: &str) -> Result<(), OtpError> {
        let resp = self
            .post("Verifications", &[("To", phone), ("Channel", "sms")])
            .await?;
        debug!(status = %resp.status, "otp verification created");
        Ok(())
    }

    #[instrument(skip(self, code))]
    async fn check_code(&self, phone: &str, code: &str) -> Result<bool, OtpError> {
        // Twilio answers 404 once a verification has expired, been approved
        // or run out of attempts.
        let resp = match self
            .post("VerificationCheck", &[("To", phone), ("Code", code)])
            .await
        {
            Ok(resp) => resp,
            Err(OtpError::Status(404)) => {
                debug!("no pending otp verification");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };
        debug!(status = %resp.status, "otp verification checked");
        Ok(resp.status == "approved")
    }
}


#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    use super::*;

    /// Serves one canned HTTP response and returns its base URL.
    async fn stub_provider(status: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut sock, _) = listener.accept().await.unwrap();
            let mut req = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = sock.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                req.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&req);
                if let Some(end) = text.find("\r\n\r\n") {
                    let len = text[..end]
                        .lines()
                        .find_map(|l| {
                            let (k, v) = l.split_once(':')?;
                            k.eq_ignore_ascii_case("content-length")
                                .then(|| v.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if req.len() >= end + 4 + len {
                        break;
                    }
                }
            }
            let res = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            sock.write_all(res.as_bytes()).await.unwrap();
            sock.shutdown().await.ok();
        });
        format!("http://{addr}")
    }

    fn cfg(base_url: &str) -> OtpConfig {
        OtpConfig {
            account_sid: "AC0".into(),
            auth_token: "token".into(),
            service_id: "VA42".into(),
            base_url: base_url.into(),
            timeout_secs: 1,
        }
    }

    #[test]
    fn builds_verify_urls() {
        let client = TwilioVerify::new(&cfg("https://verify.twilio.com/")).expect("client");
        assert_eq!(
            client.url("Verifications"),
            "https://verify.twilio.com/v2/Services/VA42/Verifications"
        );
        assert_eq!(
            client.url("VerificationCheck"),
            "https://verify.twilio.com/v2/Services/VA42/VerificationCheck"
        );
    }

    #[tokio::test]
    async fn unreachable_provider_is_a_transport_error() {
        let client = TwilioVerify::new(&cfg("http://127.0.0.1:9")).expect("client");
        let err = client.send_code("+15550000000").await.unwrap_err();
        assert!(matches!(err, OtpError::Transport(_)));
    }

    #[tokio::test]
    async fn approved_check_is_true() {
        let base = stub_provider("200 OK", r#"{"sid":"VE1","status":"approved"}"#).await;
        let client = TwilioVerify::new(&cfg(&base)).expect("client");
        assert!(client.check_code("+15550000000", "123456").await.unwrap());
    }

    #[tokio::test]
    async fn pending_check_is_false() {
        let base = stub_provider("200 OK", r#"{"sid":"VE1","status":"pending"}"#).await;
        let client = TwilioVerify::new(&cfg(&base)).expect("client");
        assert!(!client.check_code("+15550000000", "000000").await.unwrap());
    }

    #[tokio::test]
    async fn expired_verification_is_a_rejection() {
        let base = stub_provider(
            "404 Not Found",
            r#"{"code":20404,"message":"The requested resource was not found"}"#,
        )
        .await;
        let client = TwilioVerify::new(&cfg(&base)).expect("client");
        assert!(!client.check_code("+15550000000", "123456").await.unwrap());
    }

    #[tokio::test]
    async fn provider_failure_on_check_is_an_error() {
        let base = stub_provider("503 Service Unavailable", r#"{"code":20503}"#).await;
        let client = TwilioVerify::new(&cfg(&base)).expect("client");
        let err = client.check_code("+15550000000", "123456").await.unwrap_err();
        assert!(matches!(err, OtpError::Status(503)));
    }

    #[tokio::test]
    async fn provider_failure_on_send_is_an_error() {
        let base = stub_provider("404 Not Found", r#"{"code":20404}"#).await;
        let client = TwilioVerify::new(&cfg(&base)).expect("client");
        let err = client.send_code("+15550000000").await.unwrap_err();
        assert!(matches!(err, OtpError::Status(404)));
    }

    #[test]
    fn parses_provider_status() {
        let resp: VerificationResponse =
            serde_json::from_str(r#"{"sid":"VE1","status":"approved","valid":true}"#).unwrap();
        assert_eq!(resp.status, "approved");
    }
}
