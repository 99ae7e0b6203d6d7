//! 进程级配置源。
//!
//! ## 设计目的（Why）
//! - 首选序列化格式是一项可随时变更的进程级配置；协商器通过注入的 [`SettingsStore`]
//!   在每次调用时重新读取，因此配置变更立即生效，也便于在测试中替换；
//! - [`LiveSettings`] 以 `ArcSwap` 保存不可变快照：读取无锁，写入整体替换。
//!
//! ## 键空间（What）
//! - 键由 `domain` + `name` 组成，文本形式为 `domain.name`，例如
//!   [`PREFERRED_FORMAT`] 即 `serialization.preferred_format`；
//! - TOML 来源中每个顶层表对应一个 `domain`，表内的键对应 `name`。

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::debug;

use crate::error::{FormatError, Result};

const TARGET: &str = "parley::settings";

/// 首选序列化格式的配置键。
pub const PREFERRED_FORMAT: SettingKey =
    SettingKey::from_static("serialization", "preferred_format");

/// `with_defaults` 为首选格式写入的默认值。
pub const DEFAULT_PREFERRED_FORMAT: &str = "json";

/// 配置项的稳定标识符。
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SettingKey {
    domain: Cow<'static, str>,
    name: Cow<'static, str>,
}

impl SettingKey {
    pub const fn from_static(domain: &'static str, name: &'static str) -> Self {
        Self {
            domain: Cow::Borrowed(domain),
            name: Cow::Borrowed(name),
        }
    }

    pub fn new(domain: impl Into<Cow<'static, str>>, name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            domain: domain.into(),
            name: name.into(),
        }
    }

    /// 解析 `domain.name` 形式的文本；`domain` 取第一个点号之前的部分。
    pub fn parse(text: &str) -> Option<Self> {
        let (domain, name) = text.trim().split_once('.')?;
        if domain.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(domain.to_owned(), name.to_owned()))
    }

    #[inline]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.domain, self.name)
    }
}

/// 配置值。
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SettingValue {
    Text(String),
    Boolean(bool),
    Integer(i64),
}

impl SettingValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Boolean(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
        }
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for SettingValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

/// 只读配置查询契约；实现需支持并发读取。
pub trait SettingsStore: Send + Sync + 'static {
    fn get(&self, key: &SettingKey) -> Option<SettingValue>;
}

type Entries = BTreeMap<SettingKey, SettingValue>;

/// 可热更新的内存配置源。
pub struct LiveSettings {
    entries: ArcSwap<Entries>,
}

impl LiveSettings {
    /// 创建空配置源。
    pub fn new() -> Self {
        Self {
            entries: ArcSwap::from_pointee(Entries::new()),
        }
    }

    /// 创建带默认值的配置源：首选格式为 [`DEFAULT_PREFERRED_FORMAT`]。
    pub fn with_defaults() -> Self {
        let settings = Self::new();
        settings.set(PREFERRED_FORMAT, DEFAULT_PREFERRED_FORMAT);
        settings
    }

    /// 从 TOML 文本加载，例如：
    ///
    /// ```toml
    /// [serialization]
    /// preferred_format = "toml"
    /// ```
    ///
    /// 只接受字符串、布尔与整数值；顶层必须全部是表。
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let document: toml::Table = toml::from_str(text).map_err(|err| FormatError::Settings {
            detail: err.message().to_owned(),
            source: Some(Box::new(err)),
        })?;

        let mut entries = Entries::new();
        for (domain, section) in document {
            let toml::Value::Table(section) = section else {
                return Err(FormatError::Settings {
                    detail: format!("top-level key `{domain}` must be a table"),
                    source: None,
                });
            };
            for (name, value) in section {
                let value = match value {
                    toml::Value::String(text) => SettingValue::Text(text),
                    toml::Value::Boolean(flag) => SettingValue::Boolean(flag),
                    toml::Value::Integer(number) => SettingValue::Integer(number),
                    other => {
                        return Err(FormatError::Settings {
                            detail: format!(
                                "`{domain}.{name}` has unsupported type {}",
                                other.type_str()
                            ),
                            source: None,
                        });
                    }
                };
                entries.insert(SettingKey::new(domain.clone(), name), value);
            }
        }

        debug!(target: TARGET, entries = entries.len(), "settings loaded from toml");
        Ok(Self {
            entries: ArcSwap::from_pointee(entries),
        })
    }

    /// 写入配置值；后续所有读取立即看到新值。
    pub fn set(&self, key: SettingKey, value: impl Into<SettingValue>) {
        let value = value.into();
        debug!(target: TARGET, key = %key, value = %value, "setting updated");
        self.entries.rcu(|current| {
            let mut next = Entries::clone(current);
            next.insert(key.clone(), value.clone());
            next
        });
    }

    /// 删除配置值，返回此前的值。
    pub fn remove(&self, key: &SettingKey) -> Option<SettingValue> {
        let mut previous = None;
        self.entries.rcu(|current| {
            let mut next = Entries::clone(current);
            previous = next.remove(key);
            next
        });
        if previous.is_some() {
            debug!(target: TARGET, key = %key, "setting removed");
        }
        previous
    }

    /// 当前配置的不可变快照。
    pub fn snapshot(&self) -> Arc<BTreeMap<SettingKey, SettingValue>> {
        self.entries.load_full()
    }
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self::new()
    }
}

impl SettingsStore for LiveSettings {
    fn get(&self, key: &SettingKey) -> Option<SettingValue> {
        self.entries.load().get(key).cloned()
    }
}

impl fmt::Debug for LiveSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LiveSettings")
            .field("entries", &self.entries.load_full())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_prefer_json() {
        let settings = LiveSettings::with_defaults();
        assert_eq!(
            settings.get(&PREFERRED_FORMAT),
            Some(SettingValue::Text("json".to_owned()))
        );
    }

    #[test]
    fn set_is_visible_to_subsequent_reads_and_old_snapshots_stay_intact() {
        let settings = LiveSettings::with_defaults();
        let before = settings.snapshot();

        settings.set(PREFERRED_FORMAT, "toml");

        assert_eq!(
            settings.get(&PREFERRED_FORMAT).as_ref().and_then(SettingValue::as_text),
            Some("toml")
        );
        assert_eq!(
            before.get(&PREFERRED_FORMAT).and_then(SettingValue::as_text),
            Some("json"),
            "既有快照不受写入影响"
        );
    }

    #[test]
    fn remove_returns_previous_value() {
        let settings = LiveSettings::with_defaults();
        assert_eq!(
            settings.remove(&PREFERRED_FORMAT),
            Some(SettingValue::from("json"))
        );
        assert_eq!(settings.get(&PREFERRED_FORMAT), None);
        assert_eq!(settings.remove(&PREFERRED_FORMAT), None);
    }

    #[test]
    fn remove_under_concurrent_writers_returns_own_value() {
        let settings = Arc::new(LiveSettings::with_defaults());
        let handles: Vec<_> = (0..4i64)
            .map(|worker| {
                let settings = Arc::clone(&settings);
                std::thread::spawn(move || {
                    let key = SettingKey::new("worker", format!("slot{worker}"));
                    for round in 0..200i64 {
                        let value = worker * 1_000 + round;
                        settings.set(key.clone(), value);
                        assert_eq!(settings.remove(&key), Some(SettingValue::Integer(value)));
                        assert_eq!(settings.remove(&key), None);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("线程正常结束");
        }

        let snapshot = settings.snapshot();
        assert_eq!(snapshot.len(), 1, "只剩默认首选格式");
        assert_eq!(
            snapshot.get(&PREFERRED_FORMAT),
            Some(&SettingValue::from("json"))
        );
    }

    #[test]
    fn loads_sections_from_toml() {
        let settings = LiveSettings::from_toml_str(
            r#"
            [serialization]
            preferred_format = "toml"

            [agent]
            retries = 3
            verbose = true
            "#,
        )
        .expect("合法 TOML");

        assert_eq!(
            settings.get(&PREFERRED_FORMAT),
            Some(SettingValue::from("toml"))
        );
        assert_eq!(
            settings.get(&SettingKey::from_static("agent", "retries")),
            Some(SettingValue::Integer(3))
        );
        assert_eq!(
            settings.get(&SettingKey::from_static("agent", "verbose")),
            Some(SettingValue::Boolean(true))
        );
    }

    #[test]
    fn toml_rejects_bare_values_and_unsupported_types() {
        let err = LiveSettings::from_toml_str("preferred_format = \"json\"").expect_err("顶层非表");
        assert_eq!(err.code(), crate::error::codes::SETTINGS_INVALID);

        let err = LiveSettings::from_toml_str("[serialization]\nweights = [1, 2]")
            .expect_err("数组不受支持");
        assert!(err.to_string().contains("serialization.weights"));

        assert!(LiveSettings::from_toml_str("[serialization").is_err());
    }

    #[test]
    fn key_text_form() {
        assert_eq!(PREFERRED_FORMAT.to_string(), "serialization.preferred_format");
        assert_eq!(
            SettingKey::parse("serialization.preferred_format"),
            Some(PREFERRED_FORMAT)
        );
        assert_eq!(SettingKey::parse("nodot"), None);
        assert_eq!(SettingKey::parse(".name"), None);
    }
}
