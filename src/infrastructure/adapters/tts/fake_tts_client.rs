//! Fake TTS Client - 用于测试的 TTS 客户端
//!
//! 不调用外部服务，把输入文本的 UTF-8 字节当作“音频”返回

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

use crate::application::ports::{SynthesisRequest, TtsEnginePort, TtsError};

/// Fake TTS Client 配置
#[derive(Debug, Clone, Default)]
pub struct FakeTtsClientConfig {
    /// 输入文本包含该子串时返回服务错误
    pub fail_on: Option<String>,
    /// 模拟推理延迟（毫秒）
    pub latency_ms: u64,
}

impl FakeTtsClientConfig {
    pub fn failing_on(marker: impl Into<String>) -> Self {
        Self {
            fail_on: Some(marker.into()),
            ..Default::default()
        }
    }
}

/// Fake TTS Client
pub struct FakeTtsClient {
    config: FakeTtsClientConfig,
    call_count: AtomicUsize,
    requests: Mutex<Vec<String>>,
}

impl FakeTtsClient {
    pub fn new(config: FakeTtsClientConfig) -> Self {
        tracing::info!(
            fail_on = ?config.fail_on,
            latency_ms = config.latency_ms,
            "FakeTtsClient initialized"
        );
        Self {
            config,
            call_count: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 使用默认配置创建
    pub fn with_defaults() -> Self {
        Self::new(FakeTtsClientConfig::default())
    }

    /// 已收到的合成请求数
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }

    /// 已收到的合成文本（按调用顺序）
    pub async fn requests(&self) -> Vec<String> {
        self.requests.lock().await.clone()
    }
}

impl Default for FakeTtsClient {
    fn default() -> Self {
        Self::with_defaults()
    }
}

#[async_trait]
impl TtsEnginePort for FakeTtsClient {
    async fn synthesize(&self, request: SynthesisRequest) -> Result<Vec<u8>, TtsError> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        self.requests.lock().await.push(request.text.clone());

        tracing::debug!(
            text_len = request.text.len(),
            voice = %request.voice,
            "FakeTtsClient: echoing text as audio"
        );

        if self.config.latency_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.config.latency_ms)).await;
        }

        if let Some(marker) = &self.config.fail_on {
            if request.text.contains(marker.as_str()) {
                return Err(TtsError::ServiceError(format!(
                    "fake failure on marker {:?}",
                    marker
                )));
            }
        }

        Ok(request.text.into_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echoes_text_and_records_requests() {
        let client = FakeTtsClient::with_defaults();
        let audio = client
            .synthesize(SynthesisRequest::new("hello", "alloy"))
            .await
            .unwrap();

        assert_eq!(audio, b"hello".to_vec());
        assert_eq!(client.call_count(), 1);
        assert_eq!(client.requests().await, vec!["hello".to_string()]);
    }

    #[tokio::test]
    async fn test_fails_on_marker() {
        let client = FakeTtsClient::new(FakeTtsClientConfig::failing_on("BOOM"));
        let result = client.synthesize(SynthesisRequest::new("a BOOM b", "alloy")).await;
        assert!(matches!(result, Err(TtsError::ServiceError(_))));
    }
}
