use bytes::Bytes;
use parley_core::{
    DataValue, Format, FormatDescriptor, FormatError, FormatName, Payload, PayloadKind, Result,
    Subject,
};
use serde_json::{Map, Number};
use toml::{Table, Value};
use tracing::trace;

use crate::TARGET;

const NAME: &str = "toml";

/// 多个实例编码时承载数组的键。
const ITEMS_KEY: &str = "items";

/// TOML 格式，承载结构化负载。
///
/// # 契约说明（What）
/// - 单个实例的数据必须是对象（TOML 文档根只能是表）；
/// - 多个实例编码为 `items = [...]`，解码时要求存在 `items` 数组；
/// - TOML 没有空值，`null` 在编码时返回 `FormatError::Encode`；
/// - 日期时间解码为其 RFC 3339 文本形式；`nan`/`inf` 没有对应的数据表示，解码时返回 `Malformed`。
///
/// # 权衡（Trade-offs）
/// - 超出 `i64` 范围的无符号整数无法表示，编码时同样返回 `Encode`。
#[derive(Debug, Clone)]
pub struct TomlFormat {
    descriptor: FormatDescriptor,
}

impl TomlFormat {
    /// 构建 TOML 格式实例。
    pub fn new() -> Self {
        Self {
            descriptor: FormatDescriptor::new(
                FormatName::from_static(NAME),
                "application/toml",
                PayloadKind::Data,
            )
            .with_weight(5)
            .with_extension("toml"),
        }
    }

    fn parse(&self, data: &[u8]) -> Result<Table> {
        let text = std::str::from_utf8(data)
            .map_err(|err| FormatError::malformed(NAME, err.to_string(), Some(Box::new(err))))?;
        toml::from_str(text).map_err(|err| {
            FormatError::malformed(NAME, err.message().to_owned(), Some(Box::new(err)))
        })
    }

    fn write(&self, table: &Table) -> Result<Bytes> {
        let text = toml::to_string(table)
            .map_err(|err| FormatError::encode(NAME, err.to_string(), Some(Box::new(err))))?;
        trace!(target: TARGET, format = NAME, bytes = text.len(), "toml rendered");
        Ok(Bytes::from(text))
    }
}

impl Default for TomlFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl Format for TomlFormat {
    fn descriptor(&self) -> &FormatDescriptor {
        &self.descriptor
    }

    fn render(&self, payload: Payload) -> Result<Bytes> {
        match to_toml(expect_data(payload)?)? {
            Value::Table(table) => self.write(&table),
            other => Err(FormatError::encode(
                NAME,
                format!("document root must be a table, found {}", other.type_str()),
                None,
            )),
        }
    }

    fn render_multiple(&self, payloads: Vec<Payload>) -> Result<Bytes> {
        let items = payloads
            .into_iter()
            .map(|payload| expect_data(payload).and_then(to_toml))
            .collect::<Result<Vec<_>>>()?;
        let mut table = Table::new();
        table.insert(ITEMS_KEY.to_owned(), Value::Array(items));
        self.write(&table)
    }

    fn intern(&self, _subject: &Subject, data: &[u8]) -> Result<Payload> {
        let table = self.parse(data)?;
        from_toml(Value::Table(table)).map(Payload::Data)
    }

    fn intern_multiple(&self, _subject: &Subject, data: &[u8]) -> Result<Vec<Payload>> {
        let mut table = self.parse(data)?;
        match table.remove(ITEMS_KEY) {
            Some(Value::Array(items)) => items
                .into_iter()
                .map(|item| from_toml(item).map(Payload::Data))
                .collect(),
            Some(other) => Err(FormatError::malformed(
                NAME,
                format!("`{ITEMS_KEY}` must be an array, found {}", other.type_str()),
                None,
            )),
            None => Err(FormatError::malformed(
                NAME,
                format!("missing `{ITEMS_KEY}` array"),
                None,
            )),
        }
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

fn to_toml(value: DataValue) -> Result<Value> {
    Ok(match value {
        DataValue::Null => {
            return Err(FormatError::encode(NAME, "null has no TOML representation", None));
        }
        DataValue::Bool(flag) => Value::Boolean(flag),
        DataValue::Number(number) => {
            if let Some(int) = number.as_i64() {
                Value::Integer(int)
            } else if let Some(float) = number.as_f64()
                && number.is_f64()
            {
                Value::Float(float)
            } else {
                return Err(FormatError::encode(
                    NAME,
                    format!("integer {number} is out of range"),
                    None,
                ));
            }
        }
        DataValue::String(text) => Value::String(text),
        DataValue::Array(items) => {
            Value::Array(items.into_iter().map(to_toml).collect::<Result<_>>()?)
        }
        DataValue::Object(map) => Value::Table(
            map.into_iter()
                .map(|(key, value)| to_toml(value).map(|value| (key, value)))
                .collect::<Result<_>>()?,
        ),
    })
}

fn from_toml(value: Value) -> Result<DataValue> {
    Ok(match value {
        Value::String(text) => DataValue::String(text),
        Value::Integer(int) => DataValue::Number(int.into()),
        Value::Float(float) => Number::from_f64(float).map(DataValue::Number).ok_or_else(|| {
            FormatError::malformed(NAME, "non-finite float has no data representation", None)
        })?,
        Value::Boolean(flag) => DataValue::Bool(flag),
        Value::Datetime(datetime) => DataValue::String(datetime.to_string()),
        Value::Array(items) => {
            DataValue::Array(items.into_iter().map(from_toml).collect::<Result<_>>()?)
        }
        Value::Table(table) => DataValue::Object(
            table
                .into_iter()
                .map(|(key, value)| from_toml(value).map(|value| (key, value)))
                .collect::<Result<Map<_, _>>>()?,
        ),
    })
}
