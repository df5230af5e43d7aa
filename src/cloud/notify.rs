//! 上传完成后的回调通知。通知失败只记录日志，不会中断流水线

use std::time::Duration;

use serde::Serialize;

use super::Provider;

/// 回调请求的超时
pub const CALLBACK_TIMEOUT: Duration = Duration::from_secs(20);

/// 回调请求体。各节点携带的字段略有不同，缺省的字段不会出现在JSON中
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallbackPayload {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub provider: Provider,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<usize>,
}

impl CallbackPayload {
    pub fn new(url: impl Into<String>, provider: Provider) -> Self {
        Self {
            url: url.into(),
            path: None,
            provider,
            mime: None,
            size_bytes: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    pub fn with_size(mut self, size_bytes: usize) -> Self {
        self.size_bytes = Some(size_bytes);
        self
    }
}

/// 回调的投递结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Delivery {
    /// 未配置回调地址
    Skipped,
    Delivered { status: u16 },
    Failed { reason: String },
}

impl Delivery {
    pub fn is_delivered(&self) -> bool {
        matches!(self, Delivery::Delivered { .. })
    }
}

#[derive(Debug, Clone)]
pub struct Notifier {
    agent: ureq::Agent,
}

impl Notifier {
    pub fn new() -> Self {
        Self::with_timeout(CALLBACK_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }

    /// 以JSON POST回调地址。地址为空时跳过
    pub fn notify(&self, callback_url: &str, payload: &CallbackPayload) -> Delivery {
        let callback_url = callback_url.trim();
        if callback_url.is_empty() {
            return Delivery::Skipped;
        }
        let body = match serde_json::to_value(payload) {
            Ok(body) => body,
            Err(e) => return failed(callback_url, e.to_string()),
        };
        match self.agent.post(callback_url).send_json(body) {
            Ok(response) => {
                let status = response.status();
                tracing::info!(callback_url, status, "回调已送达");
                Delivery::Delivered { status }
            }
            Err(ureq::Error::Status(code, _)) => failed(callback_url, format!("HTTP 状态码 {code}")),
            Err(e) => failed(callback_url, e.to_string()),
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

fn failed(callback_url: &str, reason: String) -> Delivery {
    tracing::warn!(callback_url, reason = %reason, "回调失败");
    Delivery::Failed { reason }
}
