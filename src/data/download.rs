//! 通用下载工具
//!
//! 提供带超时的 HTTP 下载和 MD5 校验功能。超时或校验失败都直接报错，不做重试。

use std::io::{self, Read};
use std::path::Path;
use std::time::Duration;

use md5::{Digest, Md5};

use super::error::DataError;

/// 下载文件并保存到指定路径
///
/// # 参数
/// - `url`: 下载地址
/// - `dest_path`: 保存路径
/// - `expected_md5`: 可选的 MD5 校验码，提供时会验证下载内容
/// - `timeout`: 整个请求（连接 + 读取）的超时时间
///
/// # 返回
/// - 成功返回 `Ok(())`
/// - 超时返回 `DataError::DownloadTimeout`，校验失败返回 `DataError::ChecksumMismatch`，
///   其余失败返回 `DataError::DownloadError`
pub fn download_file(
    url: &str,
    dest_path: &Path,
    expected_md5: Option<&str>,
    timeout: Duration,
) -> Result<(), DataError> {
    log::info!("正在下载 {url} ...");

    let agent = ureq::AgentBuilder::new().timeout(timeout).build();
    let response = agent.get(url).call().map_err(|e| {
        if is_timeout(&e) {
            DataError::DownloadTimeout {
                url: url.to_string(),
                timeout,
            }
        } else {
            DataError::DownloadError(format!("HTTP 请求失败: {e}"))
        }
    })?;

    if response.status() != 200 {
        return Err(DataError::DownloadError(format!(
            "HTTP 状态码: {}",
            response.status()
        )));
    }

    let mut bytes = Vec::new();
    response
        .into_reader()
        .read_to_end(&mut bytes)
        .map_err(|e| {
            if is_timeout_io(&e) {
                DataError::DownloadTimeout {
                    url: url.to_string(),
                    timeout,
                }
            } else {
                DataError::DownloadError(format!("读取响应失败: {e}"))
            }
        })?;

    // MD5 校验（如果提供了预期值）
    if let Some(expected) = expected_md5 {
        verify_md5(&bytes, expected)?;
        log::debug!("MD5 校验通过: {expected}");
    }

    std::fs::write(dest_path, &bytes).map_err(DataError::IoError)?;

    log::info!("下载完成: {}", dest_path.display());
    Ok(())
}

/// 计算数据的 MD5 校验码
pub fn compute_md5(data: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(data);
    let result = hasher.finalize();
    format!("{:x}", result)
}

/// 校验数据的 MD5 是否与`expected`一致
pub fn verify_md5(data: &[u8], expected: &str) -> Result<(), DataError> {
    let actual = compute_md5(data);
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(DataError::ChecksumMismatch {
            expected: expected.to_string(),
            got: actual,
        })
    }
}

fn is_timeout(error: &ureq::Error) -> bool {
    match error {
        ureq::Error::Transport(transport) => {
            transport.kind() == ureq::ErrorKind::Io
                && std::error::Error::source(transport)
                    .and_then(|source| source.downcast_ref::<io::Error>())
                    .is_some_and(is_timeout_io)
        }
        ureq::Error::Status(..) => false,
    }
}

fn is_timeout_io(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock
    )
}
