use crate::error::{Result, StudioError};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::Serialize;
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://image.novelai.net/ai/generate-image";
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 600;

const MODEL: &str = "nai-diffusion-3";
const ACTION: &str = "generate";
const IMAGE_WIDTH: u32 = 832;
const IMAGE_HEIGHT: u32 = 1216;
const STEPS: u32 = 28;
const GUIDANCE_SCALE: u32 = 7;
const SAMPLER: &str = "k_dpmpp_2s_ancestral";
const NOISE_SCHEDULE: &str = "karras";
const NEGATIVE_PROMPT: &str = "worst quality, low quality, bad image, displeasing, [abstract], bad anatomy, very displeasing, extra, unfocused, jpeg artifacts, unfinished, chromatic aberration,";

/// Tags stripped from a prompt before it is sent.
const CENSOR_TOKENS: [&str; 4] = ["censor", "censored", "bar censor", "mosaic censoring"];

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerationPayload {
    pub input: String,
    pub model: &'static str,
    pub action: &'static str,
    pub parameters: GenerationParameters,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GenerationParameters {
    pub params_version: u32,
    pub width: u32,
    pub height: u32,
    pub scale: u32,
    pub sampler: &'static str,
    pub steps: u32,
    pub n_samples: u32,
    #[serde(rename = "ucPreset")]
    pub uc_preset: u32,
    #[serde(rename = "qualityToggle")]
    pub quality_toggle: bool,
    pub sm: bool,
    pub sm_dyn: bool,
    pub dynamic_thresholding: bool,
    pub controlnet_strength: u32,
    pub legacy: bool,
    pub add_original_image: bool,
    pub cfg_rescale: u32,
    pub noise_schedule: &'static str,
    pub legacy_v3_extend: bool,
    pub skip_cfg_above_sigma: Option<f32>,
    pub seed: u32,
    pub negative_prompt: &'static str,
}

/// Removes censorship tags from a comma-separated prompt.
pub fn filter_censor_tokens(prompt: &str) -> String {
    prompt
        .split(',')
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .filter(|fragment| !CENSOR_TOKENS.contains(&fragment.to_lowercase().as_str()))
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn build_generation_payload(prompt: &str, seed: u32) -> GenerationPayload {
    GenerationPayload {
        input: prompt.to_string(),
        model: MODEL,
        action: ACTION,
        parameters: GenerationParameters {
            params_version: 3,
            width: IMAGE_WIDTH,
            height: IMAGE_HEIGHT,
            scale: GUIDANCE_SCALE,
            sampler: SAMPLER,
            steps: STEPS,
            n_samples: 1,
            uc_preset: 3,
            quality_toggle: false,
            sm: false,
            sm_dyn: false,
            dynamic_thresholding: false,
            controlnet_strength: 1,
            legacy: false,
            add_original_image: true,
            cfg_rescale: 0,
            noise_schedule: NOISE_SCHEDULE,
            legacy_v3_extend: false,
            skip_cfg_above_sigma: None,
            seed,
            negative_prompt: NEGATIVE_PROMPT,
        },
    }
}

/// Client for the image generation endpoint.
#[derive(Debug, Clone)]
pub struct NaiClient {
    endpoint: String,
    api_token: Option<String>,
    timeout_seconds: u64,
}

impl NaiClient {
    pub fn new(endpoint: impl Into<String>, api_token: Option<String>, timeout_seconds: u64) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_token,
            timeout_seconds,
        }
    }

    pub fn has_token(&self) -> bool {
        self.api_token
            .as_deref()
            .is_some_and(|token| !token.trim().is_empty())
    }

    /// Sends one generation request and returns the raw archive bytes.
    ///
    /// A missing token fails before any I/O. Every call draws a fresh seed.
    pub async fn generate(&self, prompt: &str) -> Result<Vec<u8>> {
        let token = self
            .api_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or(StudioError::MissingCredential)?;

        let filtered = filter_censor_tokens(prompt);
        log::debug!("Original prompt: {}", prompt);
        log::debug!("Filtered prompt: {}", filtered);

        let payload = build_generation_payload(&filtered, rand::random::<u32>());
        let client = build_client(token, self.timeout_seconds)?;

        log::info!("Sending generation request to {}", self.endpoint);
        let response = client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                StudioError::TransportFailure(format_transport_error(
                    &self.endpoint,
                    &error,
                    self.timeout_seconds,
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = match response.text().await {
                Ok(body) => body,
                Err(error) => {
                    log::warn!("Could not read error response body: {}", error);
                    String::new()
                }
            };
            log::error!("Failed to generate image. Status code: {}", status);
            log::error!("Response Body: {}", body);
            return Err(StudioError::GenerationFailed {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await.map_err(|error| {
            StudioError::TransportFailure(format_transport_error(
                &self.endpoint,
                &error,
                self.timeout_seconds,
            ))
        })?;
        log::debug!("Image generated successfully ({} bytes).", bytes.len());
        Ok(bytes.to_vec())
    }

    /// Runs [`NaiClient::generate`] on a private current-thread runtime.
    /// Intended for a background worker thread.
    pub fn generate_blocking(&self, prompt: &str) -> Result<Vec<u8>> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|error| {
                StudioError::TransportFailure(format!("failed to start HTTP runtime: {}", error))
            })?;
        runtime.block_on(self.generate(prompt))
    }
}

fn format_transport_error(endpoint: &str, error: &reqwest::Error, timeout_seconds: u64) -> String {
    if error.is_timeout() {
        return format!(
            "Generation request timed out at {} after {} seconds.",
            endpoint, timeout_seconds
        );
    }

    if error.is_connect() {
        return format!(
            "Connection failed at {}. Check your network connection.",
            endpoint
        );
    }

    format!("Transport error at {}: {}", endpoint, error)
}

fn build_client(token: &str, timeout_seconds: u64) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(&format!("Bearer {}", token))
        .map_err(|_| StudioError::TransportFailure("API token contains invalid characters".to_string()))?;
    headers.insert(AUTHORIZATION, value);

    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .default_headers(headers)
        .build()
        .map_err(|error| StudioError::TransportFailure(format!("failed to build HTTP client: {}", error)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread::JoinHandle;

    /// Serves exactly one HTTP exchange with a canned response and hands back
    /// the raw request head plus body.
    fn serve_once(status_line: &'static str, body: &'static [u8]) -> (String, JoinHandle<(String, String)>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let endpoint = format!("http://{}/ai/generate-image", listener.local_addr().expect("addr"));
        let handle = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut request = Vec::new();
            let mut chunk = [0u8; 4096];
            let head_end = loop {
                let read = stream.read(&mut chunk).expect("read request");
                assert!(read > 0, "client closed before sending headers");
                request.extend_from_slice(&chunk[..read]);
                if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
                    break pos + 4;
                }
            };
            let head = String::from_utf8_lossy(&request[..head_end]).to_lowercase();
            let content_length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            while request.len() < head_end + content_length {
                let read = stream.read(&mut chunk).expect("read body");
                assert!(read > 0, "client closed before sending body");
                request.extend_from_slice(&chunk[..read]);
            }
            let request_body =
                String::from_utf8_lossy(&request[head_end..head_end + content_length]).to_string();

            let response = format!(
                "HTTP/1.1 {}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
                status_line,
                body.len()
            );
            stream.write_all(response.as_bytes()).expect("write head");
            stream.write_all(body).expect("write body");
            (head, request_body)
        });
        (endpoint, handle)
    }

    #[test]
    fn censor_tokens_are_removed() {
        assert_eq!(filter_censor_tokens("1girl, censored, smile"), "1girl, smile");
    }

    #[test]
    fn censor_filter_is_case_insensitive_and_exact() {
        assert_eq!(
            filter_censor_tokens("Bar Censor,cat ,  MOSAIC CENSORING, censorship, censor"),
            "cat, censorship"
        );
    }

    #[test]
    fn payload_carries_fixed_parameters() {
        let payload = build_generation_payload("1girl, smile", 1234);
        let value = serde_json::to_value(&payload).expect("serialize");

        assert_eq!(value["input"], "1girl, smile");
        assert_eq!(value["model"], "nai-diffusion-3");
        assert_eq!(value["action"], "generate");
        let params = &value["parameters"];
        assert_eq!(params["width"], 832);
        assert_eq!(params["height"], 1216);
        assert_eq!(params["steps"], 28);
        assert_eq!(params["scale"], 7);
        assert_eq!(params["sampler"], "k_dpmpp_2s_ancestral");
        assert_eq!(params["noise_schedule"], "karras");
        assert_eq!(params["ucPreset"], 3);
        assert_eq!(params["qualityToggle"], false);
        assert_eq!(params["seed"], 1234);
        assert!(params["skip_cfg_above_sigma"].is_null());
        assert!(params["negative_prompt"]
            .as_str()
            .is_some_and(|value| value.starts_with("worst quality")));
    }

    #[test]
    fn missing_token_fails_before_network() {
        let client = NaiClient::new("http://127.0.0.1:9/unreachable", None, 1);
        assert!(!client.has_token());
        assert!(matches!(
            client.generate_blocking("1girl"),
            Err(StudioError::MissingCredential)
        ));

        let blank = NaiClient::new("http://127.0.0.1:9/unreachable", Some("  ".into()), 1);
        assert!(matches!(
            blank.generate_blocking("1girl"),
            Err(StudioError::MissingCredential)
        ));
    }

    #[test]
    fn error_status_is_generation_failure_with_body() {
        let (endpoint, server) = serve_once("500 Internal Server Error", b"boom");
        let client = NaiClient::new(endpoint, Some("tok".into()), 5);

        let result = client.generate_blocking("1girl, censored, smile");
        assert!(matches!(
            result,
            Err(StudioError::GenerationFailed { status: 500, ref body }) if body == "boom"
        ));

        let (head, body) = server.join().expect("server thread");
        assert!(head.starts_with("post /ai/generate-image"));
        assert!(head.contains("authorization: bearer tok\r\n"));
        let sent: serde_json::Value = serde_json::from_str(&body).expect("json body");
        assert_eq!(sent["input"], "1girl, smile");
        assert_eq!(sent["model"], "nai-diffusion-3");
    }

    #[test]
    fn success_returns_raw_archive_bytes() {
        let (endpoint, server) = serve_once("200 OK", b"PK\x03\x04zip");
        let client = NaiClient::new(endpoint, Some("  tok  ".into()), 5);

        let bytes = client.generate_blocking("cat").expect("generate");
        assert_eq!(bytes, b"PK\x03\x04zip");

        let (head, _) = server.join().expect("server thread");
        assert!(head.contains("authorization: bearer tok\r\n"));
    }

    #[test]
    fn unreachable_endpoint_is_transport_failure() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
            listener.local_addr().expect("addr").port()
        };
        let client = NaiClient::new(format!("http://127.0.0.1:{}/ai", port), Some("tok".into()), 5);

        assert!(matches!(
            client.generate_blocking("cat"),
            Err(StudioError::TransportFailure(_))
        ));
    }
}
