use crate::config::NuocaConfig;
use anyhow::{anyhow, Context, Result};
use nuoca_core::Category;
use nuoca_protocol::{Value, RESERVED_RECORD_FIELDS};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

/// 配置加载器，支持从文件或字符串加载配置
pub struct ConfigLoader;

impl ConfigLoader {
    /// 从 YAML 文件加载配置并校验
    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<NuocaConfig> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(anyhow!("Config file: {} does not exist", path.display()));
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config = Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid config file: {:?}", path))?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// 从 YAML 字符串加载配置并校验
    ///
    /// 空文档等价于全部默认值。
    pub fn from_yaml_str(content: &str) -> Result<NuocaConfig> {
        let config = if content.trim().is_empty() {
            NuocaConfig::default()
        } else {
            serde_yaml::from_str(content).with_context(|| "Failed to parse YAML content")?
        };
        Self::validate(&config)?;
        Ok(config)
    }

    /// 保存配置到 YAML 文件
    pub fn save_to_yaml<P: AsRef<Path>>(config: &NuocaConfig, path: P) -> Result<()> {
        let yaml_content =
            serde_yaml::to_string(config).with_context(|| "Failed to serialize config to YAML")?;
        fs::write(&path, yaml_content)
            .with_context(|| format!("Failed to write YAML file: {:?}", path.as_ref()))?;
        Ok(())
    }

    /// 验证配置的基本有效性
    pub fn validate(config: &NuocaConfig) -> Result<()> {
        if config.collection_interval == Some(0) {
            return Err(anyhow!("COLLECTION_INTERVAL must be greater than zero"));
        }
        if config.plugin_pipe_timeout == 0 {
            return Err(anyhow!("PLUGIN_PIPE_TIMEOUT must be greater than zero"));
        }
        if config.subprocess_exit_timeout == 0 {
            return Err(anyhow!("SUBPROCESS_EXIT_TIMEOUT must be greater than zero"));
        }

        // 检查同一类别中插件名的唯一性
        for category in Category::ALL {
            let mut names = HashSet::new();
            for spec in config.plugins(category) {
                if !names.insert(spec.name.as_str()) {
                    return Err(anyhow!(
                        "Duplicate {} plugin: {}",
                        category,
                        spec.name
                    ));
                }
            }
        }

        Self::validate_output_values(&config.output_values)
    }

    /// 静态字段不能覆盖记录的保留字段
    ///
    /// 配置文件和命令行合并后的结果都要经过这里。
    pub fn validate_output_values(output_values: &BTreeMap<String, Value>) -> Result<()> {
        for key in output_values.keys() {
            Self::validate_output_key(key)?;
        }
        Ok(())
    }

    /// 校验单个静态字段名
    pub fn validate_output_key(key: &str) -> Result<()> {
        if RESERVED_RECORD_FIELDS.contains(&key) {
            return Err(anyhow!("OUTPUT_VALUES cannot set reserved field: {}", key));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nuoca_protocol::Value;

    const SAMPLE: &str = r#"
COLLECTION_INTERVAL: 10
PLUGIN_PIPE_TIMEOUT: 2
NUOCA_LOGFILE: /tmp/nuoca/nuoca.log
OUTPUT_VALUES:
  env: prod
  region: 3
INPUT_PLUGINS:
  - A
  - B:
      path: /proc/loadavg
OUTPUT_PLUGINS:
  - Printer
"#;

    #[test]
    fn test_load_sample() {
        let config = ConfigLoader::from_yaml_str(SAMPLE).unwrap();
        assert_eq!(config.collection_interval, Some(10));
        assert_eq!(config.plugin_pipe_timeout, 2);
        assert_eq!(config.selftest_loop_count, 5);
        assert_eq!(config.subprocess_exit_timeout, 5);
        assert_eq!(config.output_values["env"], Value::String("prod".into()));
        assert_eq!(config.output_values["region"], Value::Integer(3));
        assert_eq!(config.plugin_names(Category::Input), vec!["A", "B"]);
        assert_eq!(
            config.input_plugins[1].config["path"],
            serde_json::Value::String("/proc/loadavg".into())
        );
        assert!(config.transform_plugins.is_empty());
    }

    #[test]
    fn test_lower_case_aliases() {
        let config = ConfigLoader::from_yaml_str(
            "collection_interval: 15\noutput_plugins:\n  - Printer\n",
        )
        .unwrap();
        assert_eq!(config.collection_interval, Some(15));
        assert_eq!(config.plugin_names(Category::Output), vec!["Printer"]);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = ConfigLoader::from_yaml_str("\n").unwrap();
        assert_eq!(config, NuocaConfig::default());
    }

    #[test]
    fn test_duplicate_plugin_rejected() {
        let err = ConfigLoader::from_yaml_str("INPUT_PLUGINS:\n  - A\n  - A: {}\n").unwrap_err();
        assert!(err.to_string().contains("Duplicate input plugin: A"));
    }

    #[test]
    fn test_same_name_in_two_categories_allowed() {
        let config =
            ConfigLoader::from_yaml_str("INPUT_PLUGINS: [A]\nOUTPUT_PLUGINS: [A]\n").unwrap();
        assert_eq!(config.plugin_names(Category::Output), vec!["A"]);
    }

    #[test]
    fn test_zero_timeouts_rejected() {
        assert!(ConfigLoader::from_yaml_str("PLUGIN_PIPE_TIMEOUT: 0\n").is_err());
        assert!(ConfigLoader::from_yaml_str("SUBPROCESS_EXIT_TIMEOUT: 0\n").is_err());
        assert!(ConfigLoader::from_yaml_str("COLLECTION_INTERVAL: 0\n").is_err());
    }

    #[test]
    fn test_reserved_output_value_rejected() {
        let err = ConfigLoader::from_yaml_str("OUTPUT_VALUES:\n  timestamp: 1\n").unwrap_err();
        assert!(err.to_string().contains("reserved field"));
    }

    #[test]
    fn test_malformed_yaml_rejected() {
        let err = ConfigLoader::from_yaml_str("INPUT_PLUGINS: [A\n").unwrap_err();
        assert!(err.to_string().contains("Failed to parse YAML content"));
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigLoader::from_yaml_file("/nonexistent/nuoca.yml").unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
