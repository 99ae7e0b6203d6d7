//! # 格式注册中心
//!
//! ## 核心意图（Why）
//! - 注册中心是“有哪些格式、各自能力如何”的唯一事实来源，协商器只做只读查询；
//! - [`InMemoryFormatRegistry`] 基于 `DashMap`，读路径无全局锁，可被多个协商器并发共享。
//!
//! ## 行为契约（What）
//! - `formats`：返回按名称排序的全部标识，保证多次调用结果一致；
//! - `format`：按精确名称查找；
//! - `format_for`：接受任意调用方标识，先按规范化名称、再按 MIME 类型解析；
//! - 格式在协商开始前一次性注册，注册后不可替换或移除。

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::trace;

use crate::error::{FormatError, Result};
use crate::format::Format;
use crate::name::FormatName;

const TARGET: &str = "parley::registry";

/// 格式注册中心的只读查询契约。
pub trait FormatRegistry: Send + Sync + 'static {
    /// 全部已注册格式的名称，顺序稳定。
    fn formats(&self) -> Vec<FormatName>;

    /// 按精确名称查找。
    fn format(&self, name: &str) -> Result<Arc<dyn Format>>;

    /// 按任意标识查找：名称（忽略大小写与首尾空白）或 MIME 类型。
    fn format_for(&self, ident: &str) -> Result<Arc<dyn Format>>;
}

/// 进程内的格式注册中心。
#[derive(Default)]
pub struct InMemoryFormatRegistry {
    formats: DashMap<FormatName, Arc<dyn Format>>,
}

impl InMemoryFormatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册格式，名称取自其描述符。
    ///
    /// - **前置条件**：同名格式尚未注册；否则返回 [`FormatError::AlreadyRegistered`]，已有条目保持不变；
    /// - **后置条件**：成功后该格式对所有持有本注册中心的协商器立即可见。
    pub fn register<F>(&self, format: F) -> Result<()>
    where
        F: Format,
    {
        self.register_shared(Arc::new(format))
    }

    /// 注册已共享的格式实例。
    ///
    /// 名称不满足 [`FormatName`] 的字符约束（例如含大写字母）时返回
    /// [`FormatError::InvalidName`]；首选格式配置总是按规范化名称比较。
    pub fn register_shared(&self, format: Arc<dyn Format>) -> Result<()> {
        let name = format.descriptor().name().clone().validate()?;
        match self.formats.entry(name.clone()) {
            Entry::Occupied(_) => Err(FormatError::AlreadyRegistered {
                name: name.to_string(),
            }),
            Entry::Vacant(vacant) => {
                trace!(
                    target: TARGET,
                    format = %name,
                    weight = format.descriptor().weight(),
                    mime = format.descriptor().mime(),
                    "format registered"
                );
                vacant.insert(format);
                Ok(())
            }
        }
    }

    /// 按 MIME 类型查找；若多个格式声明同一 MIME，取权重最高者，权重相同取名称较小者。
    pub fn by_mime(&self, mime: &str) -> Option<Arc<dyn Format>> {
        self.formats
            .iter()
            .filter(|entry| entry.value().descriptor().matches_mime(mime))
            .map(|entry| Arc::clone(entry.value()))
            .min_by(|a, b| {
                let (a, b) = (a.descriptor(), b.descriptor());
                b.weight()
                    .cmp(&a.weight())
                    .then_with(|| a.name().cmp(b.name()))
            })
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }
}

impl FormatRegistry for InMemoryFormatRegistry {
    fn formats(&self) -> Vec<FormatName> {
        let mut names: Vec<FormatName> = self
            .formats
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        names.sort();
        names
    }

    fn format(&self, name: &str) -> Result<Arc<dyn Format>> {
        self.formats
            .get(name)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| FormatError::not_found(name))
    }

    fn format_for(&self, ident: &str) -> Result<Arc<dyn Format>> {
        let trimmed = ident.trim();
        if let Some(found) = self.formats.get(trimmed) {
            return Ok(Arc::clone(found.value()));
        }
        if let Ok(name) = FormatName::parse(trimmed)
            && let Some(found) = self.formats.get(name.as_str())
        {
            return Ok(Arc::clone(found.value()));
        }
        if trimmed.contains('/')
            && let Some(found) = self.by_mime(trimmed)
        {
            return Ok(found);
        }
        trace!(target: TARGET, ident = trimmed, "format lookup missed");
        Err(FormatError::not_found(trimmed))
    }
}

impl fmt::Debug for InMemoryFormatRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryFormatRegistry")
            .field("formats", &self.formats())
            .finish()
    }
}
