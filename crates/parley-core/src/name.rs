use std::borrow::{Borrow, Cow};
use std::fmt;

use crate::error::{FormatError, Result};

/// 已注册格式的稳定标识，例如 `json`、`toml`。
///
/// ## 契约（What）
/// - 合法字符为小写 ASCII 字母、数字以及 `_`、`-`、`.`、`+`，且不能为空；
/// - [`parse`](Self::parse) 会先去除首尾空白并转为小写，适合处理调用方传入的任意标识；
/// - 实现 `Borrow<str>`，可直接以 `&str` 查询以 `FormatName` 为键的映射。
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FormatName(Cow<'static, str>);

impl FormatName {
    /// 以静态字面量构造标识，不做校验；供编解码实现声明常量使用。
    ///
    /// 注册中心在注册时会调用 [`validate`](Self::validate)，非法字面量无法进入协商。
    pub const fn from_static(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }

    /// 校验已构造的标识，合法时原样返回。
    pub fn validate(self) -> Result<Self> {
        if is_valid(&self.0) {
            Ok(self)
        } else {
            Err(FormatError::InvalidName {
                name: self.0.into_owned(),
            })
        }
    }

    /// 构造并校验标识。
    pub fn new(name: impl Into<Cow<'static, str>>) -> Result<Self> {
        let name = name.into();
        if is_valid(&name) {
            Ok(Self(name))
        } else {
            Err(FormatError::InvalidName {
                name: name.into_owned(),
            })
        }
    }

    /// 规范化任意调用方输入后构造标识。
    pub fn parse(ident: &str) -> Result<Self> {
        Self::new(ident.trim().to_ascii_lowercase())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn is_valid(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_lowercase() || b.is_ascii_digit() || matches!(b, b'_' | b'-' | b'.' | b'+')
        })
}

impl fmt::Display for FormatName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for FormatName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for FormatName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for FormatName {
    fn eq(&self, other: &str) -> bool {
        self.as_str() == other
    }
}

impl PartialEq<&str> for FormatName {
    fn eq(&self, other: &&str) -> bool {
        self.as_str() == *other
    }
}

impl PartialEq<FormatName> for &str {
    fn eq(&self, other: &FormatName) -> bool {
        *self == other.as_str()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalizes_case_and_whitespace() {
        let name = FormatName::parse("  JSON ").expect("合法标识");
        assert_eq!(name, "json");
    }

    #[test]
    fn rejects_empty_and_foreign_characters() {
        for bad in ["", "   ", "application/json", "a b"] {
            let err = FormatName::parse(bad).expect_err("非法标识应被拒绝");
            assert!(matches!(err, FormatError::InvalidName { .. }), "{bad:?}");
        }
        assert!(FormatName::new("Json").is_err(), "new 不做大小写折叠");
        assert!(FormatName::from_static("YAML").validate().is_err());
        assert_eq!(
            FormatName::from_static("yaml").validate().expect("合法字面量"),
            "yaml"
        );
    }

    #[test]
    fn orders_lexically() {
        let mut names = vec![
            FormatName::from_static("yaml"),
            FormatName::from_static("json"),
            FormatName::from_static("binary"),
        ];
        names.sort();
        assert_eq!(names, ["binary", "json", "yaml"]);
    }
}
