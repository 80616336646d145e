//! 模拟配置
//!
//! 可以从 TOML 文件加载，例如：
//!
//! ```toml
//! level-bits = [4, 8, 8]
//! max-frames = 64
//! aging-interval = 10
//! ```

use std::num::NonZeroU32;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::layout::AddressLayout;

/// 默认老化周期
pub const DEFAULT_AGING_INTERVAL: u32 = 10;

/// 模拟配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct SimConfig {
    /// 每级页表的位宽（最高级在前）
    pub level_bits: Vec<u32>,
    /// 最大物理帧数，`None` 表示不限
    pub max_frames: Option<u32>,
    /// 老化周期（访问次数）
    pub aging_interval: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            level_bits: Vec::new(),
            max_frames: None,
            aging_interval: DEFAULT_AGING_INTERVAL,
        }
    }
}

impl SimConfig {
    pub fn new(level_bits: Vec<u32>) -> Self {
        Self {
            level_bits,
            ..Self::default()
        }
    }

    pub fn with_max_frames(mut self, max_frames: u32) -> Self {
        self.max_frames = Some(max_frames);
        self
    }

    pub fn with_aging_interval(mut self, interval: u32) -> Self {
        self.aging_interval = interval;
        self
    }

    /// 在模拟开始前校验配置
    pub fn validate(&self) -> Result<(), ConfigError> {
        AddressLayout::new(&self.level_bits)?;
        self.frame_budget()?;
        self.interval()?;
        Ok(())
    }

    pub(crate) fn frame_budget(&self) -> Result<Option<NonZeroU32>, ConfigError> {
        self.max_frames
            .map(|frames| NonZeroU32::new(frames).ok_or(ConfigError::ZeroFrames))
            .transpose()
    }

    pub(crate) fn interval(&self) -> Result<NonZeroU32, ConfigError> {
        NonZeroU32::new(self.aging_interval).ok_or(ConfigError::ZeroInterval)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Load {
            path: "<inline>".to_string(),
            message: e.to_string(),
        })
    }

    /// 从 TOML 文件加载配置（不做校验）
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let load_error = |message: String| ConfigError::Load {
            path: path.display().to_string(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| load_error(e.to_string()))?;
        toml::from_str(&content).map_err(|e| load_error(e.to_string()))
    }
}
