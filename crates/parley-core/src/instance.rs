//! 实例级门面：为每个 [`FormatSupport`] 类型提供 `render_with`/`mime_with`/`support_format_with`。
//!
//! 门面本身不做任何协商，只把“未指定格式”解析为类型默认格式后转交 [`FormatNegotiator`]，
//! 失败同样以 [`FormatError::Dispatch`](crate::FormatError::Dispatch) 的形式返回。

use bytes::Bytes;

use crate::error::Result;
use crate::negotiation::FormatNegotiator;
use crate::payload::FormatSupport;

/// 对所有 [`FormatSupport`] 类型自动实现的实例级扩展。
pub trait FormatSupportExt: FormatSupport {
    /// 以指定格式（缺省为类型默认格式）编码自身。
    fn render_with(&self, negotiator: &FormatNegotiator, format: Option<&str>) -> Result<Bytes> {
        negotiator.render(self, format)
    }

    /// 以指定格式（缺省为类型默认格式）编码时使用的 MIME 类型。
    fn mime_with(&self, negotiator: &FormatNegotiator, format: Option<&str>) -> Result<String> {
        negotiator.mime(self, format)
    }

    fn support_format_with(&self, negotiator: &FormatNegotiator, name: &str) -> bool {
        negotiator.support_format::<Self>(name)
    }
}

impl<T: FormatSupport> FormatSupportExt for T {}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::registry::InMemoryFormatRegistry;
    use crate::test_stubs::{FixedPreference, StubFormat, StubRecord};

    #[test]
    fn facade_forwards_to_negotiator() {
        let registry = InMemoryFormatRegistry::new();
        registry.register(StubFormat::new("a", 10)).expect("a");
        registry
            .register(StubFormat::new("b", 5).only_for(&["other"]))
            .expect("b");
        let negotiator =
            FormatNegotiator::new(Arc::new(registry), Arc::new(FixedPreference::new(None)));

        let record = StubRecord::new(3, "three");
        let rendered = record.render_with(&negotiator, None).expect("默认格式编码");
        assert!(rendered.starts_with(b"a:"));
        assert_eq!(
            record.mime_with(&negotiator, Some("a")).expect("mime"),
            "application/x-a"
        );
        assert!(record.support_format_with(&negotiator, "a"));
        assert!(!record.support_format_with(&negotiator, "b"), "b 只支持 other");
        assert!(!record.support_format_with(&negotiator, "c"), "未注册");
    }
}
