//! `format` 模块定义格式描述符与对象安全的 [`Format`] 契约。
//!
//! # 模块设计（Why）
//! - 协商器只依赖描述符（名称、权重、MIME、负载类别）与四个编解码入口，
//!   具体的 JSON/TOML/二进制实现位于 `parley-codecs`，可独立扩展；
//! - 领域类型与格式之间以 [`Payload`] 交换数据，格式本身无需知道领域类型的具体定义，
//!   因此 `Format` 可以作为 `Arc<dyn Format>` 存放在注册中心。
//!
//! # 契约说明（What）
//! - `weight` 越大越优先；权重相同时协商器按名称字典序排列；
//! - `supports` 默认只检查类型是否声明了该格式消费的负载类别，实现可收紧但不应放宽。

use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;

use crate::error::Result;
use crate::name::FormatName;
use crate::payload::{Payload, Subject};

/// 格式消费与产出的负载类别。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    /// 结构化数据（`serde_json::Value` 数据模型）。
    Data,
    /// 不透明的字节内容。
    Binary,
}

impl PayloadKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Binary => "binary",
        }
    }
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 格式的静态能力描述。
///
/// 描述符在注册后不可变；协商器每次调用都会重新读取，但不会缓存排序结果。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormatDescriptor {
    name: FormatName,
    weight: i32,
    mime: Cow<'static, str>,
    payload_kind: PayloadKind,
    extension: Option<Cow<'static, str>>,
}

impl FormatDescriptor {
    /// 以名称、MIME 与负载类别创建描述符，权重默认为 0。
    pub fn new(
        name: FormatName,
        mime: impl Into<Cow<'static, str>>,
        payload_kind: PayloadKind,
    ) -> Self {
        Self {
            name,
            weight: 0,
            mime: mime.into(),
            payload_kind,
            extension: None,
        }
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }

    /// 指定落盘时惯用的文件扩展名（不含点号）。
    pub fn with_extension(mut self, extension: impl Into<Cow<'static, str>>) -> Self {
        self.extension = Some(extension.into());
        self
    }

    pub fn name(&self) -> &FormatName {
        &self.name
    }

    pub fn weight(&self) -> i32 {
        self.weight
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn payload_kind(&self) -> PayloadKind {
        self.payload_kind
    }

    pub fn extension(&self) -> Option<&str> {
        self.extension.as_deref()
    }

    /// 判断给定的 MIME 是否指向本格式；忽略大小写与 `;` 之后的参数。
    pub fn matches_mime(&self, mime: &str) -> bool {
        essence(mime).eq_ignore_ascii_case(essence(&self.mime))
    }
}

fn essence(mime: &str) -> &str {
    mime.split(';').next().unwrap_or_default().trim()
}

/// 对象安全的格式契约。
///
/// # 契约（What）
/// - `render`/`render_multiple` 接收的负载类别应与 [`FormatDescriptor::payload_kind`] 一致，
///   否则返回 [`FormatError::UnsupportedPayload`](crate::FormatError::UnsupportedPayload)；
/// - `intern`/`intern_multiple` 收到无法解析的输入时返回
///   [`FormatError::Malformed`](crate::FormatError::Malformed)；
/// - 不支持多对象操作的实现返回 [`FormatError::Unsupported`](crate::FormatError::Unsupported)。
///
/// 实现必须是无状态或内部同步的：注册中心会在多个线程间共享同一个实例。
pub trait Format: Send + Sync + 'static {
    fn descriptor(&self) -> &FormatDescriptor;

    /// 判断本格式能否承载该类型。
    fn supports(&self, subject: &Subject) -> bool {
        subject.accepts(self.descriptor().payload_kind())
    }

    fn render(&self, payload: Payload) -> Result<Bytes>;

    fn render_multiple(&self, payloads: Vec<Payload>) -> Result<Bytes>;

    fn intern(&self, subject: &Subject, data: &[u8]) -> Result<Payload>;

    fn intern_multiple(&self, subject: &Subject, data: &[u8]) -> Result<Vec<Payload>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn json() -> FormatDescriptor {
        FormatDescriptor::new(
            FormatName::from_static("json"),
            "application/json",
            PayloadKind::Data,
        )
        .with_weight(15)
        .with_extension("json")
    }

    #[test]
    fn builder_fills_every_field() {
        let descriptor = json();
        assert_eq!(descriptor.name(), &"json");
        assert_eq!(descriptor.weight(), 15);
        assert_eq!(descriptor.mime(), "application/json");
        assert_eq!(descriptor.payload_kind(), PayloadKind::Data);
        assert_eq!(descriptor.extension(), Some("json"));
    }

    #[test]
    fn mime_match_ignores_parameters_and_case() {
        let descriptor = json();
        assert!(descriptor.matches_mime("Application/JSON; charset=utf-8"));
        assert!(!descriptor.matches_mime("application/toml"));
    }
}
