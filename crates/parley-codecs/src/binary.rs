use bytes::Bytes;
use parley_core::{
    Format, FormatDescriptor, FormatError, FormatName, Payload, PayloadKind, Result, Subject,
};

const NAME: &str = "binary";

/// 不透明字节格式。
///
/// 只被声明了 `Binary` 负载的类型支持；字节原样输出与读入，不提供多对象操作。
#[derive(Debug, Clone)]
pub struct BinaryFormat {
    descriptor: FormatDescriptor,
}

impl BinaryFormat {
    /// 构建二进制格式实例。
    pub fn new() -> Self {
        Self {
            descriptor: FormatDescriptor::new(
                FormatName::from_static(NAME),
                "application/octet-stream",
                PayloadKind::Binary,
            )
            .with_weight(1),
        }
    }

    fn unsupported(operation: &'static str) -> FormatError {
        FormatError::Unsupported {
            format: NAME.to_owned(),
            operation,
        }
    }
}

impl Default for BinaryFormat {
    fn default() -> Self {
        Self::new()
    }
}

impl Format for BinaryFormat {
    fn descriptor(&self) -> &FormatDescriptor {
        &self.descriptor
    }

    fn render(&self, payload: Payload) -> Result<Bytes> {
        payload
            .into_binary()
            .map_err(|other| FormatError::UnsupportedPayload {
                target: NAME.to_owned(),
                kind: other.kind(),
            })
    }

    fn render_multiple(&self, _payloads: Vec<Payload>) -> Result<Bytes> {
        Err(Self::unsupported("render_multiple"))
    }

    fn intern(&self, _subject: &Subject, data: &[u8]) -> Result<Payload> {
        Ok(Payload::Binary(Bytes::copy_from_slice(data)))
    }

    fn intern_multiple(&self, _subject: &Subject, _data: &[u8]) -> Result<Vec<Payload>> {
        Err(Self::unsupported("intern_multiple"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_binary_subjects_are_supported() {
        let format = BinaryFormat::new();
        assert!(format.supports(&Subject::new("file").with_kind(PayloadKind::Binary)));
        assert!(!format.supports(&Subject::new("node").with_kind(PayloadKind::Data)));
    }

    #[test]
    fn bytes_pass_through_untouched() {
        let format = BinaryFormat::new();
        let subject = Subject::new("file").with_kind(PayloadKind::Binary);
        let payload = format.intern(&subject, b"\x00\xffdata").expect("任意字节");
        assert_eq!(
            &format.render(payload).expect("原样输出")[..],
            b"\x00\xffdata"
        );
    }

    #[test]
    fn multi_object_operations_are_unsupported() {
        let format = BinaryFormat::new();
        let err = format.render_multiple(Vec::new()).expect_err("不支持");
        assert_eq!(err.to_string(), "format `binary` does not implement `render_multiple`");
    }
}
