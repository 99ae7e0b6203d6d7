use bytes::Bytes;
use parley_core::{
    DataValue, Format, FormatDescriptor, FormatError, FormatName, Payload, PayloadKind, Result,
    Subject,
};
use tracing::trace;

use crate::TARGET;

const NAME: &str = "json";

/// JSON 格式，承载结构化负载。
///
/// # 契约说明（What）
/// - 单个实例编码为 JSON 文档，多个实例编码为 JSON 数组；
/// - 解码多个实例时输入必须是数组，否则视为输入不合法；
/// - MIME 为 `application/json`，权重 15，是未配置首选格式时的默认格式。
#[derive(Debug, Clone)]
pub struct JsonFormat {
    descriptor: FormatDescriptor,
}

impl JsonFormat {
    /// 构建 JSON 格式实例。
    pub fn new() -> Self {
        Self {
            descriptor: FormatDescriptor::new(
                FormatName::from_static(NAME),
                "application/json",
                PayloadKind::Data,
            )
            .with_weight(15)
            .with_extension("json"),
        }
    }

    fn parse(&self, data: &[u8]) -> Result<DataValue> {
        serde_json::from_slice(data)
            .map_err(|err| FormatError::malformed(NAME, err.to_string(), Some(Box::new(err))))
    }

    fn write(&self, value: &DataValue) -> Result<Bytes> {
        let encoded = serde_json::to_vec(value)
            .map_err(|err| FormatError::encode(NAME, err.to_string(), Some(Box::new(err))))?;
        trace!(target: TARGET, format = NAME, bytes = encoded.len(), "json rendered");
        Ok(Bytes::from(encoded))
    }
}

impl Default for JsonFormat {
    fn default() -> Self {
        Self::new()
    }
}

fn expect_data(payload: Payload) -> Result<DataValue> {
    payload
        .into_data()
        .map_err(|other| FormatError::UnsupportedPayload {
            target: NAME.to_owned(),
            kind: other.kind(),
        })
}

impl Format for JsonFormat {
    fn descriptor(&self) -> &FormatDescriptor {
        &self.descriptor
    }

    fn render(&self, payload: Payload) -> Result<Bytes> {
        self.write(&expect_data(payload)?)
    }

    fn render_multiple(&self, payloads: Vec<Payload>) -> Result<Bytes> {
        let items = payloads
            .into_iter()
            .map(expect_data)
            .collect::<Result<Vec<_>>>()?;
        self.write(&DataValue::Array(items))
    }

    fn intern(&self, _subject: &Subject, data: &[u8]) -> Result<Payload> {
        self.parse(data).map(Payload::Data)
    }

    fn intern_multiple(&self, _subject: &Subject, data: &[u8]) -> Result<Vec<Payload>> {
        match self.parse(data)? {
            DataValue::Array(items) => Ok(items.into_iter().map(Payload::Data).collect()),
            other => Err(FormatError::malformed(
                NAME,
                format!("expected a JSON array, found {}", kind_of(&other)),
                None,
            )),
        }
    }
}

fn kind_of(value: &DataValue) -> &'static str {
    match value {
        DataValue::Null => "null",
        DataValue::Bool(_) => "a boolean",
        DataValue::Number(_) => "a number",
        DataValue::String(_) => "a string",
        DataValue::Array(_) => "an array",
        DataValue::Object(_) => "an object",
    }
}
