//! Page Audio Assembler
//!
//! 一页文本 → 分段 → 逐段合成 → 拼接为整页音频

use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::application::ports::{PageRecord, SynthesisRequest, TtsEnginePort, TtsError};
use crate::domain::{segment, DEFAULT_MAX_CHARS};

/// 组装参数
#[derive(Debug, Clone)]
pub struct AssemblerConfig {
    /// 单次合成的最大字符数
    pub max_chars: usize,
    /// 用于估算时长的码率
    pub bitrate_bps: u32,
    pub voice: String,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            max_chars: DEFAULT_MAX_CHARS,
            bitrate_bps: 128_000,
            voice: "alloy".to_string(),
        }
    }
}

/// 整页音频
#[derive(Debug, Clone)]
pub struct AssembledPage {
    pub audio_data: Vec<u8>,
    pub duration_secs: f64,
    /// 实际合成的缓冲区数量
    pub buffer_count: usize,
}

/// 页面合成失败，已合成的部分音频被丢弃
#[derive(Debug, Error)]
#[error("Synthesis failed for page {page_number} ({page_id}) at buffer {buffer_index}: {source}")]
pub struct AssemblyError {
    pub page_id: Uuid,
    pub page_number: u32,
    pub buffer_index: usize,
    pub source: TtsError,
}

/// 按码率估算音频时长（秒）
pub fn estimate_duration_secs(bytes: usize, bitrate_bps: u32) -> f64 {
    if bitrate_bps == 0 {
        return 0.0;
    }
    (bytes as f64 * 8.0) / bitrate_bps as f64
}

pub struct PageAudioAssembler {
    tts_engine: Arc<dyn TtsEnginePort>,
    config: AssemblerConfig,
}

impl PageAudioAssembler {
    pub fn new(tts_engine: Arc<dyn TtsEnginePort>, config: AssemblerConfig) -> Self {
        Self { tts_engine, config }
    }

    pub async fn assemble(&self, page: &PageRecord) -> Result<AssembledPage, AssemblyError> {
        let buffers = segment(&page.paragraphs(), self.config.max_chars);

        let mut audio_data: Vec<u8> = Vec::new();
        let mut buffer_count = 0;

        for (buffer_index, buffer) in buffers.into_iter().enumerate() {
            // 空页只产生一个空缓冲区
            if buffer.is_empty() {
                continue;
            }

            let bytes = self
                .tts_engine
                .synthesize(SynthesisRequest::new(buffer, self.config.voice.clone()))
                .await
                .map_err(|source| AssemblyError {
                    page_id: page.id,
                    page_number: page.page_number,
                    buffer_index,
                    source,
                })?;

            audio_data.extend_from_slice(&bytes);
            buffer_count += 1;
        }

        let duration_secs = estimate_duration_secs(audio_data.len(), self.config.bitrate_bps);

        tracing::debug!(
            page_id = %page.id,
            page_number = page.page_number,
            buffers = buffer_count,
            bytes = audio_data.len(),
            duration_secs,
            "Page audio assembled"
        );

        Ok(AssembledPage {
            audio_data,
            duration_secs,
            buffer_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::tts::{FakeTtsClient, FakeTtsClientConfig};

    fn page(text: &str) -> PageRecord {
        PageRecord {
            id: Uuid::new_v4(),
            book_id: Uuid::new_v4(),
            page_number: 7,
            chapter: None,
            paragraphed_text: text.to_string(),
        }
    }

    fn assembler(tts: Arc<FakeTtsClient>, max_chars: usize) -> PageAudioAssembler {
        PageAudioAssembler::new(
            tts,
            AssemblerConfig {
                max_chars,
                bitrate_bps: 8_000,
                voice: "alloy".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn test_buffers_are_synthesized_in_order() {
        let tts = Arc::new(FakeTtsClient::with_defaults());
        let page = page("Hello world.\nSecond paragraph here.");
        let expected = segment(&page.paragraphs(), 12);

        let assembled = assembler(tts.clone(), 12).assemble(&page).await.unwrap();

        assert!(expected.len() > 1);
        assert_eq!(assembled.buffer_count, expected.len());
        assert_eq!(tts.requests().await, expected);
        assert_eq!(assembled.audio_data, expected.concat().into_bytes());
        // 8000 bps：每字节 1 毫秒
        let bytes = assembled.audio_data.len() as f64;
        assert!((assembled.duration_secs - bytes / 1000.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_empty_page_skips_synthesis() {
        let tts = Arc::new(FakeTtsClient::with_defaults());
        let assembled = assembler(tts.clone(), 100).assemble(&page("  \n ")).await.unwrap();

        assert!(assembled.audio_data.is_empty());
        assert_eq!(assembled.duration_secs, 0.0);
        assert_eq!(assembled.buffer_count, 0);
        assert_eq!(tts.call_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_reports_page_and_buffer() {
        let tts = Arc::new(FakeTtsClient::new(FakeTtsClientConfig::failing_on("BOOM")));
        let page = page("Fine here.\nThen BOOM goes.");
        let buffers = segment(&page.paragraphs(), 10);
        let failing = buffers.iter().position(|b| b.contains("BOOM")).unwrap();

        let err = assembler(tts, 10).assemble(&page).await.unwrap_err();

        assert_eq!(err.page_id, page.id);
        assert_eq!(err.page_number, 7);
        assert_eq!(err.buffer_index, failing);
        assert!(matches!(err.source, TtsError::ServiceError(_)));
    }

    #[test]
    fn test_duration_estimate() {
        assert_eq!(estimate_duration_secs(16_000, 128_000), 1.0);
        assert_eq!(estimate_duration_secs(100, 0), 0.0);
    }
}
