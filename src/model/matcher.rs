// 该文件是 Yinji （印记） 项目的一部分。
// src/model/matcher.rs - 描述子最近邻匹配与比值检验
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

use rayon::prelude::*;
use tracing::debug;

use crate::config::MatcherConfig;
use crate::model::feature::Descriptor;

/// 通过比值检验的匹配对
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchPair {
  pub reference_index: usize,
  pub candidate_index: usize,
  pub distance: f32,
}

#[derive(Debug, Clone, Default)]
pub struct CandidateMatcher {
  config: MatcherConfig,
}

impl CandidateMatcher {
  pub fn new(config: MatcherConfig) -> Self {
    Self { config }
  }

  /// 对每个参考描述子取两个最近邻，仅保留 `best < ratio * second` 的匹配。
  /// 输出顺序与参考描述子顺序一致。
  pub fn match_descriptors(&self, reference: &[Descriptor], candidate: &[Descriptor]) -> Vec<MatchPair> {
    if reference.is_empty() || candidate.len() < 2 {
      return Vec::new();
    }

    let ratio_sq = self.config.ratio * self.config.ratio;
    let matches: Vec<MatchPair> = reference
      .par_iter()
      .enumerate()
      .filter_map(|(reference_index, query)| {
        let [(best_index, best), (_, second)] = two_nearest(query, candidate);
        (best < ratio_sq * second).then(|| MatchPair {
          reference_index,
          candidate_index: best_index,
          distance: best.sqrt(),
        })
      })
      .collect();

    debug!(
      "描述子匹配: {} 个参考, {} 个候选, {} 个通过比值检验",
      reference.len(),
      candidate.len(),
      matches.len()
    );
    matches
  }
}

/// 返回平方距离意义下的两个最近邻（索引，平方距离）
fn two_nearest(query: &Descriptor, candidate: &[Descriptor]) -> [(usize, f32); 2] {
  let mut best = (usize::MAX, f32::INFINITY);
  let mut second = (usize::MAX, f32::INFINITY);
  for (index, other) in candidate.iter().enumerate() {
    let d = query.distance_squared(other);
    if d < best.1 {
      second = best;
      best = (index, d);
    } else if d < second.1 {
      second = (index, d);
    }
  }
  [best, second]
}
