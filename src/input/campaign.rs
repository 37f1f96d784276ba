// 该文件是 Yinji （印记） 项目的一部分。
// src/input/campaign.rs - 活动描述文件中的标志引用
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

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;
use url::Url;

#[derive(Error, Debug)]
pub enum CampaignError {
  #[error("I/O 错误: {path}: {source}")]
  IoError {
    path: PathBuf,
    source: std::io::Error,
  },
  #[error("活动文件解析错误: {path}: {source}")]
  ParseError {
    path: PathBuf,
    source: serde_json::Error,
  },
  #[error("活动文件缺少 campaign_assets.logo: {0}")]
  MissingLogo(PathBuf),
  #[error("无效的标志 URL {value}: {source}")]
  InvalidUrl {
    value: String,
    source: url::ParseError,
  },
  #[error("活动文件引用的标志不存在: {0}")]
  LogoNotFound(String),
}

#[derive(Debug, Deserialize)]
struct CampaignBrief {
  #[serde(default)]
  campaign_assets: Option<CampaignAssets>,
}

#[derive(Debug, Deserialize)]
struct CampaignAssets {
  #[serde(default)]
  logo: Option<String>,
}

/// 活动文件中 `campaign_assets.logo` 解析后的标志位置
#[derive(Debug, Clone, PartialEq)]
pub enum CampaignLogo {
  Path(PathBuf),
  Url(Url),
}

/// `http(s)://` 视为 URL；否则先相对活动文件所在目录查找，再按原值查找
pub fn logo_from_campaign(campaign: &Path) -> Result<CampaignLogo, CampaignError> {
  let text = std::fs::read_to_string(campaign).map_err(|source| CampaignError::IoError {
    path: campaign.to_path_buf(),
    source,
  })?;
  let brief: CampaignBrief =
    serde_json::from_str(&text).map_err(|source| CampaignError::ParseError {
      path: campaign.to_path_buf(),
      source,
    })?;

  let logo = brief
    .campaign_assets
    .and_then(|assets| assets.logo)
    .filter(|logo| !logo.trim().is_empty())
    .ok_or_else(|| CampaignError::MissingLogo(campaign.to_path_buf()))?;

  if logo.starts_with("http://") || logo.starts_with("https://") {
    let url = Url::parse(&logo).map_err(|source| CampaignError::InvalidUrl {
      value: logo.clone(),
      source,
    })?;
    return Ok(CampaignLogo::Url(url));
  }

  let relative = campaign
    .parent()
    .map(|dir| dir.join(&logo))
    .unwrap_or_else(|| PathBuf::from(&logo));
  if relative.is_file() {
    debug!("活动文件标志（相对路径）: {}", relative.display());
    return Ok(CampaignLogo::Path(relative));
  }

  let absolute = PathBuf::from(&logo);
  if absolute.is_file() {
    debug!("活动文件标志（原始路径）: {}", absolute.display());
    return Ok(CampaignLogo::Path(absolute));
  }

  Err(CampaignError::LogoNotFound(logo))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn relative_logo_resolves_against_campaign_dir() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("assets")).unwrap();
    std::fs::write(dir.path().join("assets/logo.png"), b"").unwrap();
    let campaign = dir.path().join("brief.json");
    std::fs::write(&campaign, r#"{"campaign_assets": {"logo": "assets/logo.png"}}"#).unwrap();

    assert_eq!(
      logo_from_campaign(&campaign).unwrap(),
      CampaignLogo::Path(dir.path().join("assets/logo.png"))
    );
  }

  #[test]
  fn absolute_logo_path_is_used_as_is() {
    let dir = tempfile::tempdir().unwrap();
    let logo = dir.path().join("elsewhere.png");
    std::fs::write(&logo, b"").unwrap();
    let campaign_dir = tempfile::tempdir().unwrap();
    let campaign = campaign_dir.path().join("brief.json");
    let body = serde_json::json!({"campaign_assets": {"logo": logo.display().to_string()}});
    std::fs::write(&campaign, body.to_string()).unwrap();

    assert_eq!(logo_from_campaign(&campaign).unwrap(), CampaignLogo::Path(logo));
  }

  #[test]
  fn url_logo_is_not_touched_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let campaign = dir.path().join("brief.json");
    std::fs::write(
      &campaign,
      r#"{"campaign_assets": {"logo": "https://example.com/brand/logo.png"}}"#,
    )
    .unwrap();
    match logo_from_campaign(&campaign).unwrap() {
      CampaignLogo::Url(url) => assert_eq!(url.path(), "/brand/logo.png"),
      other => panic!("unexpected: {:?}", other),
    }
  }

  #[test]
  fn missing_or_dangling_logo_is_error() {
    let dir = tempfile::tempdir().unwrap();
    let campaign = dir.path().join("brief.json");
    std::fs::write(&campaign, r#"{"campaign_name": "summer"}"#).unwrap();
    assert!(matches!(
      logo_from_campaign(&campaign),
      Err(CampaignError::MissingLogo(_))
    ));

    std::fs::write(&campaign, r#"{"campaign_assets": {"logo": "gone.png"}}"#).unwrap();
    assert!(matches!(
      logo_from_campaign(&campaign),
      Err(CampaignError::LogoNotFound(_))
    ));
  }
}
