// 该文件是 Yinji （印记） 项目的一部分。
// src/args.rs - 命令行参数
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

use std::path::PathBuf;

use clap::Parser;
use url::Url;

/// 检查图像素材中是否出现参考标志
#[derive(Parser, Debug)]
#[command(name = "yinji", author, version, about, long_about = None)]
pub struct Args {
  /// 图像文件路径或 glob 模式（`**` 递归匹配）
  #[arg(value_name = "ASSET_PATH")]
  pub asset_path: String,

  /// 本地参考标志文件
  #[arg(long, value_name = "FILE")]
  pub logo_path: Option<PathBuf>,

  /// 远程参考标志 URL
  #[arg(long, value_name = "URL")]
  pub logo_url: Option<Url>,

  /// 含有 `campaign_assets.logo` 字段的活动描述 JSON 文件
  #[arg(long, value_name = "FILE")]
  pub campaign_file: Option<PathBuf>,

  /// 以 URL 形式指定来源:
  /// - file:///path/to/logo.png
  /// - https://example.com/logo.png
  /// - campaign:///path/to/brief.json
  #[arg(long, value_name = "URL")]
  pub logo: Option<Url>,

  /// 判定阈值 (0.0 - 1.0，越大越严格)
  #[arg(long, value_name = "THRESHOLD")]
  pub threshold: Option<f64>,

  /// RANSAC 随机种子
  #[arg(long, value_name = "SEED")]
  pub seed: Option<u64>,

  /// 额外的 JSON 配置文件，覆盖 `$HOME/.yinji/config.json`
  #[arg(long, value_name = "FILE")]
  pub config: Option<PathBuf>,

  /// 报告输出文件
  #[arg(short, long, value_name = "FILE")]
  pub output: Option<PathBuf>,

  /// 标注图像输出目录（仅单张图像模式）
  #[arg(long, value_name = "DIR")]
  pub save_marked: Option<PathBuf>,
}
