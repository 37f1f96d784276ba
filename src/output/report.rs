// 该文件是 Yinji （印记） 项目的一部分。
// src/output/report.rs - 合规报告
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

use tracing::info;

use crate::{output::OutputError, output::Render, task::BatchResult};

/// 无法分析的图像在报告中的匹配标注
const UNANALYZED_MATCHES: &str = "N/A";

const EXPLANATION: [&str; 5] = [
  "Match Count Explanation:",
  "----------------------",
  "The 'matches: X/Y' indicates X good feature matches out of Y keypoints detected in the logo.",
  "A minimum of 10 good matches is required for high confidence logo detection.",
  "Images with fewer than 5 matches are considered to have no logo present.",
];

/// 报告格式是命令行输出契约的一部分，行内容不可随意调整
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportGenerator;

impl ReportGenerator {
  pub fn render(&self, batch: &BatchResult) -> String {
    let total = batch.len();
    let with_logo = batch.with_logo().count();
    let without_logo = total - with_logo;

    let mut lines = vec![
      "Logo Compliance Report".to_string(),
      "=====================".to_string(),
      format!("Total Images Checked: {}", total),
      format!("Images with Logo: {}", with_logo),
      format!("Images without Logo: {}", without_logo),
      String::new(),
    ];
    lines.extend(EXPLANATION.iter().map(|s| s.to_string()));
    lines.push(String::new());

    if without_logo > 0 {
      lines.push("Images Missing Logo:".to_string());
      lines.push("-------------------".to_string());
      for (path, result) in batch.entries() {
        let matches = match result {
          Ok(r) if r.found => continue,
          Ok(r) => r.match_summary(),
          Err(_) => UNANALYZED_MATCHES.to_string(),
        };
        lines.push(entry_line(path, &matches));
      }
      lines.push(String::new());
    }

    if with_logo > 0 {
      lines.push("Images With Logo:".to_string());
      lines.push("----------------".to_string());
      for (path, result) in batch.with_logo() {
        lines.push(entry_line(path, &result.match_summary()));
      }
      lines.push(String::new());
    }

    lines.join("\n")
  }
}

fn entry_line(path: &Path, matches: &str) -> String {
  format!("- {} (matches: {})", path.display(), matches)
}

/// 将报告文本写入文件
pub struct ReportFileOutput {
  path: PathBuf,
}

impl ReportFileOutput {
  pub fn new(path: impl Into<PathBuf>) -> Self {
    Self { path: path.into() }
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl Render<BatchResult, str> for ReportFileOutput {
  type Error = OutputError;

  fn render_result(&self, _batch: &BatchResult, report: &str) -> Result<(), Self::Error> {
    if let Some(parent) = self.path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent).map_err(|source| OutputError::IoError {
        path: parent.to_path_buf(),
        source,
      })?;
    }
    std::fs::write(&self.path, report).map_err(|source| OutputError::IoError {
      path: self.path.clone(),
      source,
    })?;
    info!("保存报告到文件: {}", self.path.display());
    Ok(())
  }
}
