use nuoca_core::Category;
use nuoca_protocol::{PluginConfig, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

pub const DEFAULT_COLLECTION_INTERVAL: u64 = 30;
pub const DEFAULT_PLUGIN_PIPE_TIMEOUT: u64 = 5;
pub const DEFAULT_SELFTEST_LOOP_COUNT: u32 = 5;
pub const DEFAULT_SUBPROCESS_EXIT_TIMEOUT: u64 = 5;

fn default_pipe_timeout() -> u64 {
    DEFAULT_PLUGIN_PIPE_TIMEOUT
}

fn default_selftest_loop_count() -> u32 {
    DEFAULT_SELFTEST_LOOP_COUNT
}

fn default_exit_timeout() -> u64 {
    DEFAULT_SUBPROCESS_EXIT_TIMEOUT
}

/// 完整的 NuoCA 配置文件结构
///
/// 键名沿用大写形式，同时接受小写别名。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NuocaConfig {
    /// 采集间隔（秒）；命令行参数优先
    #[serde(
        rename = "COLLECTION_INTERVAL",
        alias = "collection_interval",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub collection_interval: Option<u64>,

    /// 插件管道超时（秒）
    #[serde(
        rename = "PLUGIN_PIPE_TIMEOUT",
        alias = "plugin_pipe_timeout",
        default = "default_pipe_timeout"
    )]
    pub plugin_pipe_timeout: u64,

    /// 自检模式下运行的采集周期数
    #[serde(
        rename = "SELFTEST_LOOP_COUNT",
        alias = "selftest_loop_count",
        default = "default_selftest_loop_count"
    )]
    pub selftest_loop_count: u32,

    /// 等待插件进程退出的最长秒数
    #[serde(
        rename = "SUBPROCESS_EXIT_TIMEOUT",
        alias = "subprocess_exit_timeout",
        default = "default_exit_timeout"
    )]
    pub subprocess_exit_timeout: u64,

    /// 日志文件路径；缺省写到 stderr
    #[serde(
        rename = "NUOCA_LOGFILE",
        alias = "nuoca_logfile",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub nuoca_logfile: Option<PathBuf>,

    /// 附加到每条记录的静态字段
    #[serde(rename = "OUTPUT_VALUES", alias = "output_values", default)]
    pub output_values: BTreeMap<String, Value>,

    #[serde(rename = "INPUT_PLUGINS", alias = "input_plugins", default)]
    pub input_plugins: Vec<PluginSpec>,

    #[serde(rename = "OUTPUT_PLUGINS", alias = "output_plugins", default)]
    pub output_plugins: Vec<PluginSpec>,

    #[serde(rename = "TRANSFORM_PLUGINS", alias = "transform_plugins", default)]
    pub transform_plugins: Vec<PluginSpec>,
}

impl Default for NuocaConfig {
    fn default() -> Self {
        Self {
            collection_interval: None,
            plugin_pipe_timeout: DEFAULT_PLUGIN_PIPE_TIMEOUT,
            selftest_loop_count: DEFAULT_SELFTEST_LOOP_COUNT,
            subprocess_exit_timeout: DEFAULT_SUBPROCESS_EXIT_TIMEOUT,
            nuoca_logfile: None,
            output_values: BTreeMap::new(),
            input_plugins: Vec::new(),
            output_plugins: Vec::new(),
            transform_plugins: Vec::new(),
        }
    }
}

impl NuocaConfig {
    /// 指定类别下配置的插件，保持文件中的顺序
    pub fn plugins(&self, category: Category) -> &[PluginSpec] {
        match category {
            Category::Input => &self.input_plugins,
            Category::Output => &self.output_plugins,
            Category::Transform => &self.transform_plugins,
        }
    }

    /// 配置的插件名，保持文件中的顺序
    pub fn plugin_names(&self, category: Category) -> Vec<&str> {
        self.plugins(category)
            .iter()
            .map(|p| p.name.as_str())
            .collect()
    }
}

/// 单个插件条目：插件名及其配置
///
/// 在 YAML 中可以写成 `- Name`，也可以写成
/// `- Name: {key: value}`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PluginEntry", into = "PluginEntry")]
pub struct PluginSpec {
    pub name: String,
    pub config: PluginConfig,
}

impl PluginSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            config: PluginConfig::new(),
        }
    }

    pub fn with_config(name: impl Into<String>, config: PluginConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }
}

/// 插件条目在文件中的两种写法
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PluginEntry {
    Bare(String),
    Configured(BTreeMap<String, Option<PluginConfig>>),
}

/// 插件条目格式错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginEntryError(String);

impl fmt::Display for PluginEntryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::error::Error for PluginEntryError {}

impl TryFrom<PluginEntry> for PluginSpec {
    type Error = PluginEntryError;

    fn try_from(entry: PluginEntry) -> Result<Self, Self::Error> {
        match entry {
            PluginEntry::Bare(name) => {
                if name.trim().is_empty() {
                    return Err(PluginEntryError("plugin name cannot be empty".into()));
                }
                Ok(PluginSpec::new(name))
            }
            PluginEntry::Configured(map) => {
                if map.len() != 1 {
                    return Err(PluginEntryError(format!(
                        "plugin entry must name exactly one plugin, found {}",
                        map.len()
                    )));
                }
                let (name, config) = map
                    .into_iter()
                    .next()
                    .ok_or_else(|| PluginEntryError("empty plugin entry".into()))?;
                if name.trim().is_empty() {
                    return Err(PluginEntryError("plugin name cannot be empty".into()));
                }
                Ok(PluginSpec::with_config(name, config.unwrap_or_default()))
            }
        }
    }
}

impl From<PluginSpec> for PluginEntry {
    fn from(spec: PluginSpec) -> Self {
        if spec.config.is_empty() {
            PluginEntry::Bare(spec.name)
        } else {
            PluginEntry::Configured(BTreeMap::from([(spec.name, Some(spec.config))]))
        }
    }
}
