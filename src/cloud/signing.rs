//! Azure请求签名用到的HMAC与URI编码

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::CloudError;

type HmacSha256 = Hmac<Sha256>;

pub fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, CloudError> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| CloudError::Signing(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// 百分号编码：只保留`A-Z a-z 0-9 - _ . ~`，其余字节编码为`%XX`（大写）。
/// `encode_slash`为false时`/`原样保留，用于编码对象路径。
pub fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut encoded = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                encoded.push(byte as char)
            }
            b'/' if !encode_slash => encoded.push('/'),
            _ => encoded.push_str(&format!("%{byte:02X}")),
        }
    }
    encoded
}

/// 按`/`分段编码对象键
pub fn encode_path(key: &str) -> String {
    uri_encode(key, false)
}
