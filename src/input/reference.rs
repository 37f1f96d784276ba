// 该文件是 Yinji （印记） 项目的一部分。
// src/input/reference.rs - 参考标志来源与加载
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

use std::fmt;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use thiserror::Error;
use tracing::{error, info, warn};
use url::Url;

use crate::{
  FromUrl,
  frame::ReferenceMark,
  input::{
    CampaignError, CampaignLogo, ImageDecodeError, decode_image_bytes, logo_from_campaign,
    read_image_file,
  },
  model::feature::FeatureExtractor,
};

const FILE_SCHEME: &str = "file";
const CAMPAIGN_SCHEME: &str = "campaign";

#[derive(Error, Debug)]
pub enum MarkLoadError {
  #[error("{0}")]
  DecodeError(#[from] ImageDecodeError),
  #[error("活动文件错误: {0}")]
  CampaignError(#[from] CampaignError),
  #[cfg(feature = "remote_mark")]
  #[error("下载失败: {url}: {source}")]
  FetchError { url: String, source: ureq::Error },
  #[error("未启用远程标志支持，无法下载: {0}")]
  RemoteDisabled(String),
  #[error("不支持的 URI 方案: {0}")]
  SchemeMismatch(String),
  #[error("无效的 URL: {0}")]
  InvalidUrl(String),
  #[error("没有配置任何参考标志来源")]
  NoSource,
  #[error("所有参考标志来源均失败: {0}")]
  Exhausted(String),
}

/// 参考标志来源，按变体顺序决定尝试优先级
#[derive(Debug, Clone, PartialEq)]
pub enum ReferenceMarkSource {
  LocalPath(PathBuf),
  Url(Url),
  CampaignRef(PathBuf),
  ConfiguredDefault(Url),
}

impl ReferenceMarkSource {
  /// 数值越小越先尝试
  pub fn priority(&self) -> u8 {
    match self {
      ReferenceMarkSource::LocalPath(_) => 0,
      ReferenceMarkSource::Url(_) => 1,
      ReferenceMarkSource::CampaignRef(_) => 2,
      ReferenceMarkSource::ConfiguredDefault(_) => 3,
    }
  }

  pub fn configured_default(value: &str) -> Result<Self, MarkLoadError> {
    Url::parse(value)
      .map(ReferenceMarkSource::ConfiguredDefault)
      .map_err(|e| MarkLoadError::InvalidUrl(format!("{}: {}", value, e)))
  }
}

impl fmt::Display for ReferenceMarkSource {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ReferenceMarkSource::LocalPath(path) => write!(f, "local file: {}", path.display()),
      ReferenceMarkSource::Url(url) => write!(f, "URL: {}", url),
      ReferenceMarkSource::CampaignRef(path) => write!(f, "campaign file: {}", path.display()),
      ReferenceMarkSource::ConfiguredDefault(url) => {
        write!(f, "default logo URL from config: {}", url)
      }
    }
  }
}

impl FromUrl for ReferenceMarkSource {
  type Error = MarkLoadError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      FILE_SCHEME => url
        .to_file_path()
        .map(ReferenceMarkSource::LocalPath)
        .map_err(|_| MarkLoadError::InvalidUrl(url.to_string())),
      "http" | "https" => Ok(ReferenceMarkSource::Url(url.clone())),
      CAMPAIGN_SCHEME => urlencoding::decode(url.path())
        .map(|path| ReferenceMarkSource::CampaignRef(PathBuf::from(path.as_ref())))
        .map_err(|e| MarkLoadError::InvalidUrl(format!("{}: {}", url, e))),
      other => {
        error!(
          "URI 方案不匹配: 期望 '{}'、'http(s)' 或 '{}', 实际 '{}'",
          FILE_SCHEME, CAMPAIGN_SCHEME, other
        );
        Err(MarkLoadError::SchemeMismatch(other.to_string()))
      }
    }
  }
}

/// 按优先级依次尝试各来源，第一个成功解码的来源胜出
pub struct ReferenceMarkLoader {
  sources: Vec<ReferenceMarkSource>,
  extractor: FeatureExtractor,
}

impl ReferenceMarkLoader {
  pub fn new(extractor: FeatureExtractor) -> Self {
    Self {
      sources: Vec::new(),
      extractor,
    }
  }

  pub fn with_source(mut self, source: ReferenceMarkSource) -> Self {
    self.sources.push(source);
    self
  }

  pub fn sources(&self) -> &[ReferenceMarkSource] {
    &self.sources
  }

  pub fn load(&self) -> Result<ReferenceMark, MarkLoadError> {
    let mut ordered: Vec<&ReferenceMarkSource> = self.sources.iter().collect();
    ordered.sort_by_key(|s| s.priority());
    if ordered.is_empty() {
      error!("没有配置任何参考标志来源");
      return Err(MarkLoadError::NoSource);
    }

    let mut failures = Vec::with_capacity(ordered.len());
    for source in ordered {
      info!("尝试加载参考标志: {}", source);
      match self.load_source(source) {
        Ok(mark) => {
          info!(
            "参考标志来自 {}: {}x{}, {} 个关键点",
            mark.source(),
            mark.width(),
            mark.height(),
            mark.keypoints().len()
          );
          if mark.keypoints().is_empty() {
            warn!("参考标志没有可用的关键点，所有检测结果将为未发现");
          }
          return Ok(mark);
        }
        Err(e) => {
          warn!("参考标志来源失败 {}: {}", source, e);
          failures.push(format!("{}: {}", source, e));
        }
      }
    }
    Err(MarkLoadError::Exhausted(failures.join("; ")))
  }

  /// 单个来源，不回退
  pub fn load_source(&self, source: &ReferenceMarkSource) -> Result<ReferenceMark, MarkLoadError> {
    match source {
      ReferenceMarkSource::LocalPath(path) => {
        self.load_path(path, format!("local file: {}", path.display()))
      }
      ReferenceMarkSource::Url(url) => self.load_url(url, format!("URL: {}", url)),
      ReferenceMarkSource::CampaignRef(campaign) => match logo_from_campaign(campaign)? {
        CampaignLogo::Path(path) => {
          self.load_path(&path, format!("campaign file logo path: {}", path.display()))
        }
        CampaignLogo::Url(url) => self.load_url(&url, format!("campaign file logo URL: {}", url)),
      },
      ReferenceMarkSource::ConfiguredDefault(url) => {
        self.load_url(url, format!("default logo URL from config: {}", url))
      }
    }
  }

  fn load_path(&self, path: &Path, description: String) -> Result<ReferenceMark, MarkLoadError> {
    let image = read_image_file(path)?;
    Ok(self.build_mark(image, description))
  }

  #[cfg(feature = "remote_mark")]
  fn load_url(&self, url: &Url, description: String) -> Result<ReferenceMark, MarkLoadError> {
    let bytes = crate::input::fetch_bytes(url).map_err(|source| MarkLoadError::FetchError {
      url: url.to_string(),
      source,
    })?;
    let image = decode_image_bytes(&bytes, url.as_str())?;
    Ok(self.build_mark(image, description))
  }

  #[cfg(not(feature = "remote_mark"))]
  fn load_url(&self, url: &Url, _description: String) -> Result<ReferenceMark, MarkLoadError> {
    Err(MarkLoadError::RemoteDisabled(url.to_string()))
  }

  fn build_mark(&self, image: DynamicImage, description: String) -> ReferenceMark {
    ReferenceMark::new(image.to_luma8(), &self.extractor, description)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use image::{GrayImage, Luma};

  fn write_mark(path: &Path) {
    let image = GrayImage::from_fn(40, 40, |x, y| {
      if (x / 8 + y / 8) % 2 == 0 { Luma([0]) } else { Luma([255]) }
    });
    image.save(path).unwrap();
  }

  fn loader() -> ReferenceMarkLoader {
    ReferenceMarkLoader::new(FeatureExtractor::default())
  }

  #[test]
  fn local_path_loads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("logo.png");
    write_mark(&path);
    let mark = loader()
      .with_source(ReferenceMarkSource::LocalPath(path.clone()))
      .load()
      .unwrap();
    assert_eq!((mark.width(), mark.height()), (40, 40));
    assert_eq!(mark.source(), format!("local file: {}", path.display()));
    assert_eq!(mark.keypoints().len(), mark.descriptors().len());
  }

  #[test]
  fn falls_back_to_campaign_file_in_priority_order() {
    let dir = tempfile::tempdir().unwrap();
    write_mark(&dir.path().join("brand.png"));
    let campaign = dir.path().join("brief.json");
    std::fs::write(&campaign, r#"{"campaign_assets": {"logo": "brand.png"}}"#).unwrap();

    // 插入顺序与优先级相反，本地路径仍然先被尝试
    let mark = loader()
      .with_source(ReferenceMarkSource::CampaignRef(campaign))
      .with_source(ReferenceMarkSource::LocalPath(dir.path().join("missing.png")))
      .load()
      .unwrap();
    assert!(mark.source().starts_with("campaign file logo path: "));
  }

  #[test]
  fn local_path_wins_over_campaign() {
    let dir = tempfile::tempdir().unwrap();
    let local = dir.path().join("local.png");
    write_mark(&local);
    write_mark(&dir.path().join("brand.png"));
    let campaign = dir.path().join("brief.json");
    std::fs::write(&campaign, r#"{"campaign_assets": {"logo": "brand.png"}}"#).unwrap();

    let mark = loader()
      .with_source(ReferenceMarkSource::CampaignRef(campaign))
      .with_source(ReferenceMarkSource::LocalPath(local))
      .load()
      .unwrap();
    assert!(mark.source().starts_with("local file: "));
  }

  #[test]
  fn no_source_fails_closed() {
    assert!(matches!(loader().load(), Err(MarkLoadError::NoSource)));
  }

  #[test]
  fn all_failing_sources_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let garbage = dir.path().join("garbage.png");
    std::fs::write(&garbage, b"not an image").unwrap();
    let result = loader()
      .with_source(ReferenceMarkSource::LocalPath(garbage))
      .with_source(ReferenceMarkSource::CampaignRef(dir.path().join("none.json")))
      .load();
    match result {
      Err(MarkLoadError::Exhausted(message)) => {
        assert!(message.contains("local file"));
        assert!(message.contains("campaign file"));
      }
      other => panic!("unexpected: {:?}", other.map(|m| m.source().to_string())),
    }
  }

  #[test]
  fn sources_from_url() {
    let file = ReferenceMarkSource::from_url(&Url::parse("file:///tmp/logo.png").unwrap()).unwrap();
    assert_eq!(file, ReferenceMarkSource::LocalPath(PathBuf::from("/tmp/logo.png")));

    let remote = Url::parse("https://example.com/logo.png").unwrap();
    assert_eq!(
      ReferenceMarkSource::from_url(&remote).unwrap(),
      ReferenceMarkSource::Url(remote)
    );

    let campaign =
      ReferenceMarkSource::from_url(&Url::parse("campaign:///srv/brief.json").unwrap()).unwrap();
    assert_eq!(campaign, ReferenceMarkSource::CampaignRef(PathBuf::from("/srv/brief.json")));

    assert!(matches!(
      ReferenceMarkSource::from_url(&Url::parse("ftp://example.com/logo.png").unwrap()),
      Err(MarkLoadError::SchemeMismatch(_))
    ));
  }

  #[test]
  fn campaign_path_is_percent_decoded() {
    let expected = ReferenceMarkSource::CampaignRef(PathBuf::from("/srv/my brief.json"));
    for raw in ["campaign:///srv/my%20brief.json", "campaign:///srv/my brief.json"] {
      let source = ReferenceMarkSource::from_url(&Url::parse(raw).unwrap()).unwrap();
      assert_eq!(source, expected, "{raw}");
    }
    assert!(matches!(
      ReferenceMarkSource::from_url(&Url::parse("campaign:///srv/%FF.json").unwrap()),
      Err(MarkLoadError::InvalidUrl(_))
    ));
  }

  #[test]
  fn configured_default_requires_valid_url() {
    assert!(ReferenceMarkSource::configured_default("https://example.com/a.png").is_ok());
    assert!(matches!(
      ReferenceMarkSource::configured_default("not a url"),
      Err(MarkLoadError::InvalidUrl(_))
    ));
  }
}
