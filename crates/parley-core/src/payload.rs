//! 领域类型与格式之间的中间表示。
//!
//! # 设计背景（Why）
//! - 格式以 `Arc<dyn Format>` 的形式共享，无法携带领域类型的泛型信息；
//!   领域类型先把自身转换为 [`Payload`]，再交由格式编码，解码方向则相反；
//! - 每个类型通过 [`FormatSupport::subject`] 显式声明诊断名称与可用的负载类别，
//!   协商器据此筛选格式，不在运行期探测类型能力。
//!
//! # 使用方式（How）
//! - 基于 serde 的类型可直接使用 [`to_data`]/[`from_data`]，或用
//!   [`data_format_support!`](crate::data_format_support) 一行完成实现；
//! - 需要二进制表示的类型自行实现 `to_payload`/`from_payload` 并在 `Subject` 中声明 `Binary`。

use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{FormatError, Result};
use crate::format::PayloadKind;

/// 结构化负载的数据模型。
pub type DataValue = serde_json::Value;

/// 领域实例的格式中立表示。
#[derive(Clone, Debug, PartialEq)]
pub enum Payload {
    Data(DataValue),
    Binary(Bytes),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Self::Data(_) => PayloadKind::Data,
            Self::Binary(_) => PayloadKind::Binary,
        }
    }

    /// 取出结构化数据；类别不符时原样返回负载。
    pub fn into_data(self) -> core::result::Result<DataValue, Self> {
        match self {
            Self::Data(value) => Ok(value),
            other => Err(other),
        }
    }

    /// 取出字节内容；类别不符时原样返回负载。
    pub fn into_binary(self) -> core::result::Result<Bytes, Self> {
        match self {
            Self::Binary(bytes) => Ok(bytes),
            other => Err(other),
        }
    }
}

/// 类型级别的格式协商主体：诊断名称加上可用的负载类别。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Subject {
    name: Cow<'static, str>,
    data: bool,
    binary: bool,
}

impl Subject {
    /// 创建不声明任何负载类别的主体；此时没有格式会支持它。
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            data: false,
            binary: false,
        }
    }

    pub fn with_kind(mut self, kind: PayloadKind) -> Self {
        match kind {
            PayloadKind::Data => self.data = true,
            PayloadKind::Binary => self.binary = true,
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn accepts(&self, kind: PayloadKind) -> bool {
        match kind {
            PayloadKind::Data => self.data,
            PayloadKind::Binary => self.binary,
        }
    }

    pub fn kinds(&self) -> impl Iterator<Item = PayloadKind> + '_ {
        [PayloadKind::Data, PayloadKind::Binary]
            .into_iter()
            .filter(|kind| self.accepts(*kind))
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// 可参与格式协商的领域类型。
///
/// # 契约（What）
/// - `subject` 每次调用应返回等价的值；协商器不缓存它；
/// - `to_payload` 收到 `subject` 未声明的类别时返回
///   [`FormatError::UnsupportedPayload`]；
/// - `from_payload` 对结构不符的负载返回 [`FormatError::Conversion`]。
pub trait FormatSupport: Sized {
    fn subject() -> Subject;

    fn to_payload(&self, kind: PayloadKind) -> Result<Payload>;

    fn from_payload(payload: Payload) -> Result<Self>;
}

/// 将 serde 类型转换为结构化负载。
pub fn to_data<T>(value: &T, kind: PayloadKind) -> Result<Payload>
where
    T: FormatSupport + Serialize,
{
    if kind != PayloadKind::Data {
        return Err(FormatError::UnsupportedPayload {
            target: T::subject().name().to_owned(),
            kind,
        });
    }
    serde_json::to_value(value)
        .map(Payload::Data)
        .map_err(|err| {
            let subject = T::subject();
            FormatError::conversion(subject.name(), err.to_string(), Some(Box::new(err)))
        })
}

/// 从结构化负载重建 serde 类型。
pub fn from_data<T>(payload: Payload) -> Result<T>
where
    T: FormatSupport + DeserializeOwned,
{
    let value = payload.into_data().map_err(|other| FormatError::UnsupportedPayload {
        target: T::subject().name().to_owned(),
        kind: other.kind(),
    })?;
    serde_json::from_value(value).map_err(|err| {
        let subject = T::subject();
        FormatError::conversion(subject.name(), err.to_string(), Some(Box::new(err)))
    })
}

/// 为 serde 类型生成只支持结构化负载的 [`FormatSupport`] 实现。
///
/// ```rust
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// struct Node {
///     name: String,
/// }
///
/// parley_core::data_format_support!(Node, "node");
/// ```
#[macro_export]
macro_rules! data_format_support {
    ($ty:ty, $name:expr) => {
        impl $crate::FormatSupport for $ty {
            fn subject() -> $crate::Subject {
                $crate::Subject::new($name).with_kind($crate::PayloadKind::Data)
            }

            fn to_payload(&self, kind: $crate::PayloadKind) -> $crate::Result<$crate::Payload> {
                $crate::payload::to_data(self, kind)
            }

            fn from_payload(payload: $crate::Payload) -> $crate::Result<Self> {
                $crate::payload::from_data(payload)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Catalog {
        name: String,
        version: u32,
    }

    crate::data_format_support!(Catalog, "catalog");

    #[test]
    fn data_roundtrip_through_helpers() {
        let catalog = Catalog {
            name: "web01".to_owned(),
            version: 7,
        };
        let payload = catalog.to_payload(PayloadKind::Data).expect("结构化负载");
        assert_eq!(payload, Payload::Data(json!({"name": "web01", "version": 7})));
        assert_eq!(Catalog::from_payload(payload).expect("重建"), catalog);
    }

    #[test]
    fn binary_request_is_rejected_for_data_only_subject() {
        let catalog = Catalog {
            name: "web01".to_owned(),
            version: 1,
        };
        let err = catalog
            .to_payload(PayloadKind::Binary)
            .expect_err("未声明 Binary");
        assert!(matches!(
            err,
            FormatError::UnsupportedPayload { kind: PayloadKind::Binary, .. }
        ));
    }

    #[test]
    fn structural_mismatch_is_a_conversion_error() {
        let err = Catalog::from_payload(Payload::Data(json!({"name": 3})))
            .expect_err("字段类型不符");
        assert!(matches!(err, FormatError::Conversion { ref subject, .. } if subject == "catalog"));
    }

    #[test]
    fn subject_lists_declared_kinds() {
        let subject = Subject::new("file")
            .with_kind(PayloadKind::Binary)
            .with_kind(PayloadKind::Data);
        assert_eq!(
            subject.kinds().collect::<Vec<_>>(),
            [PayloadKind::Data, PayloadKind::Binary]
        );
        assert!(Subject::new("bare").kinds().next().is_none());
    }
}
