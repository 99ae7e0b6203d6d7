//! 测试桩集合：可配置的 [`StubFormat`]、固定首选格式的 [`FixedPreference`]
//! 以及两个示例领域类型。
//!
//! # 使用方式（How）
//! - 通过 `use parley_core::test_stubs::*;` 引入；下游 crate 的集成测试可直接复用，
//!   无需为每个用例重新实现 `Format` 与 `SettingsStore`；
//! - `StubFormat` 的线格式为 `<name>:<json>`（结构化负载）或 `<name>:<bytes>`（二进制负载），
//!   名称前缀使不同格式的输出一眼可辨。
//!
//! # 契约（What）
//! - 桩对象不做任何 I/O，也不持有可变状态，可在多线程测试中共享；
//! - 仅用于测试与示例，生产代码不应依赖这里的线格式。

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use crate::error::{FormatError, Result};
use crate::format::{Format, FormatDescriptor, PayloadKind};
use crate::name::FormatName;
use crate::payload::{DataValue, FormatSupport, Payload, Subject};
use crate::settings::{PREFERRED_FORMAT, SettingKey, SettingValue, SettingsStore};

/// 可配置的桩格式。
#[derive(Clone, Debug)]
pub struct StubFormat {
    descriptor: FormatDescriptor,
    allow: Option<Vec<String>>,
    failing: bool,
}

impl StubFormat {
    /// 创建结构化负载的桩格式，MIME 为 `application/x-<name>`。
    ///
    /// # Panics
    /// `name` 不是合法格式标识时 panic；需要处理错误时使用 [`try_new`](Self::try_new)。
    pub fn new(name: &str, weight: i32) -> Self {
        match Self::try_new(name, weight) {
            Ok(stub) => stub,
            Err(err) => panic!("invalid stub format: {err}"),
        }
    }

    pub fn try_new(name: &str, weight: i32) -> Result<Self> {
        let name = FormatName::parse(name)?;
        let mime = format!("application/x-{name}");
        Ok(Self {
            descriptor: FormatDescriptor::new(name, mime, PayloadKind::Data).with_weight(weight),
            allow: None,
            failing: false,
        })
    }

    pub fn with_mime(mut self, mime: &'static str) -> Self {
        self.descriptor = FormatDescriptor::new(
            self.descriptor.name().clone(),
            mime,
            self.descriptor.payload_kind(),
        )
        .with_weight(self.descriptor.weight());
        self
    }

    pub fn with_kind(mut self, kind: PayloadKind) -> Self {
        self.descriptor = FormatDescriptor::new(
            self.descriptor.name().clone(),
            self.descriptor.mime().to_owned(),
            kind,
        )
        .with_weight(self.descriptor.weight());
        self
    }

    /// 只支持名称在列表中的主体。
    pub fn only_for(mut self, subjects: &[&str]) -> Self {
        self.allow = Some(subjects.iter().map(|s| (*s).to_owned()).collect());
        self
    }

    /// 所有编解码操作都失败。
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    fn name(&self) -> &str {
        self.descriptor.name().as_str()
    }

    fn framed(&self, body: &[u8]) -> Bytes {
        let mut out = BytesMut::with_capacity(self.name().len() + 1 + body.len());
        out.put_slice(self.name().as_bytes());
        out.put_u8(b':');
        out.put_slice(body);
        out.freeze()
    }

    fn unframe<'a>(&self, data: &'a [u8]) -> Result<&'a [u8]> {
        if self.failing {
            return Err(FormatError::malformed(self.name(), "stub configured to fail", None));
        }
        data.strip_prefix(self.name().as_bytes())
            .and_then(|rest| rest.strip_prefix(b":"))
            .ok_or_else(|| {
                FormatError::malformed(self.name(), format!("missing `{}:` prefix", self.name()), None)
            })
    }

    fn parse_json(&self, body: &[u8]) -> Result<DataValue> {
        serde_json::from_slice(body).map_err(|err| {
            FormatError::malformed(self.name(), err.to_string(), Some(Box::new(err)))
        })
    }

    fn to_json(&self, value: &DataValue) -> Result<Vec<u8>> {
        serde_json::to_vec(value)
            .map_err(|err| FormatError::encode(self.name(), err.to_string(), Some(Box::new(err))))
    }

    fn check_encode(&self) -> Result<()> {
        if self.failing {
            Err(FormatError::encode(self.name(), "stub configured to fail", None))
        } else {
            Ok(())
        }
    }
}

impl Format for StubFormat {
    fn descriptor(&self) -> &FormatDescriptor {
        &self.descriptor
    }

    fn supports(&self, subject: &Subject) -> bool {
        subject.accepts(self.descriptor.payload_kind())
            && self
                .allow
                .as_ref()
                .is_none_or(|allow| allow.iter().any(|name| name == subject.name()))
    }

    fn render(&self, payload: Payload) -> Result<Bytes> {
        self.check_encode()?;
        match (self.descriptor.payload_kind(), payload) {
            (PayloadKind::Data, Payload::Data(value)) => Ok(self.framed(&self.to_json(&value)?)),
            (PayloadKind::Binary, Payload::Binary(bytes)) => Ok(self.framed(&bytes)),
            (_, other) => Err(FormatError::UnsupportedPayload {
                target: self.name().to_owned(),
                kind: other.kind(),
            }),
        }
    }

    fn render_multiple(&self, payloads: Vec<Payload>) -> Result<Bytes> {
        self.check_encode()?;
        if self.descriptor.payload_kind() == PayloadKind::Binary {
            return Err(FormatError::Unsupported {
                format: self.name().to_owned(),
                operation: "render_multiple",
            });
        }
        let values = payloads
            .into_iter()
            .map(|payload| {
                payload.into_data().map_err(|other| FormatError::UnsupportedPayload {
                    target: self.name().to_owned(),
                    kind: other.kind(),
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(self.framed(&self.to_json(&DataValue::Array(values))?))
    }

    fn intern(&self, _subject: &Subject, data: &[u8]) -> Result<Payload> {
        let body = self.unframe(data)?;
        match self.descriptor.payload_kind() {
            PayloadKind::Data => self.parse_json(body).map(Payload::Data),
            PayloadKind::Binary => Ok(Payload::Binary(Bytes::copy_from_slice(body))),
        }
    }

    fn intern_multiple(&self, _subject: &Subject, data: &[u8]) -> Result<Vec<Payload>> {
        let body = self.unframe(data)?;
        if self.descriptor.payload_kind() == PayloadKind::Binary {
            return Err(FormatError::Unsupported {
                format: self.name().to_owned(),
                operation: "intern_multiple",
            });
        }
        match self.parse_json(body)? {
            DataValue::Array(items) => Ok(items.into_iter().map(Payload::Data).collect()),
            _ => Err(FormatError::malformed(self.name(), "expected an array", None)),
        }
    }
}

/// 只回答首选格式键的配置源。
#[derive(Clone, Debug, Default)]
pub struct FixedPreference {
    value: Option<String>,
}

impl FixedPreference {
    pub fn new(value: Option<&str>) -> Self {
        Self {
            value: value.map(str::to_owned),
        }
    }
}

impl SettingsStore for FixedPreference {
    fn get(&self, key: &SettingKey) -> Option<SettingValue> {
        if *key == PREFERRED_FORMAT {
            self.value.clone().map(SettingValue::Text)
        } else {
            None
        }
    }
}

/// 只支持结构化负载的示例类型，主体名称 `stub_record`。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StubRecord {
    pub id: u32,
    pub label: String,
}

impl StubRecord {
    pub fn new(id: u32, label: &str) -> Self {
        Self {
            id,
            label: label.to_owned(),
        }
    }
}

crate::data_format_support!(StubRecord, "stub_record");

/// 只支持二进制负载的示例类型，主体名称 `stub_blob`。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StubBlob(pub Bytes);

impl FormatSupport for StubBlob {
    fn subject() -> Subject {
        Subject::new("stub_blob").with_kind(PayloadKind::Binary)
    }

    fn to_payload(&self, kind: PayloadKind) -> Result<Payload> {
        match kind {
            PayloadKind::Binary => Ok(Payload::Binary(self.0.clone())),
            PayloadKind::Data => Err(FormatError::UnsupportedPayload {
                target: "stub_blob".to_owned(),
                kind,
            }),
        }
    }

    fn from_payload(payload: Payload) -> Result<Self> {
        payload
            .into_binary()
            .map(StubBlob)
            .map_err(|other| FormatError::UnsupportedPayload {
                target: "stub_blob".to_owned(),
                kind: other.kind(),
            })
    }
}
