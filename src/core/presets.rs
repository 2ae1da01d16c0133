//! 筛选预设模块
//!
//! 负责预设的存储、查找和使用统计。
//! 内置预设随程序提供且不可删除，用户预设可以导入导出。

use crate::core::models::{FilterCriteria, FilterPreset, PresetOrigin};
use anyhow::Result;
use chrono::Utc;

/// 大额交易预设的金额下限（美元）
const LARGE_DEAL_THRESHOLD_USD: f64 = 10_000_000.0;

/// 预设注册表
pub struct PresetRegistry {
    presets: Vec<FilterPreset>,
}

impl PresetRegistry {
    /// 创建注册表并加载内置预设
    pub fn new() -> Self {
        let mut registry = Self {
            presets: Vec::new(),
        };
        registry.load_builtin_presets();
        registry
    }

    /// 加载内置预设
    fn load_builtin_presets(&mut self) {
        let builtin = [
            ("builtin_all", "All funding", FilterCriteria::all()),
            (
                "builtin_seed",
                "Seed rounds",
                FilterCriteria::all().with_investment_types(["Seed Funding"]),
            ),
            (
                "builtin_large_deals",
                "Large deals",
                FilterCriteria::all().with_amount_range(LARGE_DEAL_THRESHOLD_USD, f64::MAX),
            ),
        ];

        for (id, name, criteria) in builtin {
            self.presets.push(FilterPreset {
                id: id.to_string(),
                name: name.to_string(),
                criteria,
                origin: PresetOrigin::BuiltIn,
                created_at: Utc::now(),
                updated_at: Utc::now(),
                hit_count: 0,
            });
        }
    }

    /// 添加预设，同名用户预设会被替换
    pub fn add(&mut self, preset: FilterPreset) {
        if let Some(pos) = self
            .presets
            .iter()
            .position(|p| p.origin == PresetOrigin::User && p.name == preset.name)
        {
            self.presets[pos] = preset;
        } else {
            self.presets.push(preset);
        }
    }

    /// 删除用户预设，内置预设不可删除
    pub fn remove(&mut self, preset_id: &str) -> bool {
        if let Some(pos) = self
            .presets
            .iter()
            .position(|p| p.id == preset_id && p.origin == PresetOrigin::User)
        {
            self.presets.remove(pos);
            true
        } else {
            false
        }
    }

    /// 获取所有预设
    pub fn presets(&self) -> &[FilterPreset] {
        &self.presets
    }

    pub fn get(&self, preset_id: &str) -> Option<&FilterPreset> {
        self.presets.iter().find(|p| p.id == preset_id)
    }

    /// 按名称查找（不区分大小写），用户预设优先
    pub fn find_by_name(&self, name: &str) -> Option<&FilterPreset> {
        self.position_by_name(name).map(|pos| &self.presets[pos])
    }

    fn position_by_name(&self, name: &str) -> Option<usize> {
        let matches = |p: &FilterPreset| p.name.eq_ignore_ascii_case(name.trim());
        self.presets
            .iter()
            .position(|p| p.origin == PresetOrigin::User && matches(p))
            .or_else(|| self.presets.iter().position(|p| matches(p)))
    }

    /// 按名称取出筛选条件，并更新使用统计
    pub fn resolve(&mut self, name: &str) -> Option<FilterCriteria> {
        let pos = self.position_by_name(name)?;
        let preset = &mut self.presets[pos];
        preset.hit_count += 1;
        preset.updated_at = Utc::now();
        tracing::debug!("使用预设: {} ({} 次)", preset.name, preset.hit_count);
        Some(preset.criteria.clone())
    }

    /// 从JSON加载预设
    pub fn load_from_json(&mut self, json_str: &str) -> Result<()> {
        let presets: Vec<FilterPreset> = serde_json::from_str(json_str)?;

        // 只加载用户预设，保留内置预设
        for preset in presets {
            if preset.origin == PresetOrigin::User {
                self.add(preset);
            }
        }

        Ok(())
    }

    /// 导出用户预设为JSON
    pub fn export_user_presets_to_json(&self) -> Result<String> {
        let user_presets: Vec<_> = self
            .presets
            .iter()
            .filter(|p| p.origin == PresetOrigin::User)
            .collect();

        Ok(serde_json::to_string_pretty(&user_presets)?)
    }
}

impl Default for PresetRegistry {
    fn default() -> Self {
        Self::new()
    }
}
