// 该文件是 Yinji （印记） 项目的一部分。
// src/input/remote.rs - 远程参考标志下载
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::time::Duration;

use tracing::info;
use url::Url;

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// 不缓存，每次调用都重新下载；非 2xx 状态码作为错误返回
pub fn fetch_bytes(url: &Url) -> Result<Vec<u8>, ureq::Error> {
  let agent: ureq::Agent = ureq::Agent::config_builder()
    .timeout_global(Some(FETCH_TIMEOUT))
    .build()
    .into();
  let mut response = agent.get(url.as_str()).call()?;
  let bytes = response.body_mut().read_to_vec()?;
  info!("下载参考标志 {}: {} 字节", url, bytes.len());
  Ok(bytes)
}
