#![deny(unsafe_code)]
#![warn(missing_docs)]

//! `parley-codecs` 提供三种内置格式：`json`、`toml` 与 `binary`。
//!
//! # 使用概览（How）
//! - 调用 [`register_defaults`] 一次性注册全部内置格式，或单独注册 [`JsonFormat`]、
//!   [`TomlFormat`]、[`BinaryFormat`]；
//! - 注册中心交给 `FormatNegotiator` 后，默认排序为 `json`(15) > `toml`(5) > `binary`(1)，
//!   可通过 `serialization.preferred_format` 配置调整首选项。
//!
//! # 合约说明（What）
//! - 输入无法解析时返回 `FormatError::Malformed`，输出无法表示时返回 `FormatError::Encode`；
//! - `binary` 只承载不透明字节，不提供多对象操作，对应调用返回 `FormatError::Unsupported`。

mod binary;
mod json;
mod toml_doc;

pub use crate::binary::BinaryFormat;
pub use crate::json::JsonFormat;
pub use crate::toml_doc::TomlFormat;

use parley_core::{FormatNegotiator, InMemoryFormatRegistry, Result, SettingsStore};
use std::sync::Arc;

const TARGET: &str = "parley::codecs";

/// 向注册中心写入全部内置格式。
///
/// 任一名称已被占用时返回 `FormatError::AlreadyRegistered`，此前已写入的格式保持注册状态。
pub fn register_defaults(registry: &InMemoryFormatRegistry) -> Result<()> {
    registry.register(JsonFormat::new())?;
    registry.register(TomlFormat::new())?;
    registry.register(BinaryFormat::new())?;
    tracing::debug!(target: TARGET, formats = registry.len(), "default formats registered");
    Ok(())
}

/// 以内置格式与给定配置源构造协商器。
pub fn default_negotiator(settings: Arc<dyn SettingsStore>) -> Result<FormatNegotiator> {
    let registry = InMemoryFormatRegistry::new();
    register_defaults(&registry)?;
    Ok(FormatNegotiator::new(Arc::new(registry), settings))
}
