//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 为协商器、注册中心、配置源与具体编解码实现提供统一的错误域 [`FormatError`]；
//! - 每个变体都映射到 [`codes`] 中的稳定错误码，日志与告警可按码值聚合，而不必解析消息文本。
//!
//! ## 分层约定（What）
//! - `NotFound`/`EmptySelection` 由查找与默认格式解析直接返回；
//! - 编解码路径上的任何失败都会被协商器折叠为单一的 [`FormatError::Dispatch`]，
//!   原始消息保存在 `message` 字段，完整错误链通过 `source()` 保留；
//! - 其余变体由编解码实现、领域类型或配置源产生，通常作为 `Dispatch` 的底层原因出现。

use std::error::Error;
use std::fmt;

use thiserror::Error;

use crate::format::PayloadKind;

/// 跨线程传递的底层原因。
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// 框架统一的返回值别名，默认错误类型为 [`FormatError`]。
pub type Result<T, E = FormatError> = core::result::Result<T, E>;

/// 稳定错误码，遵循 `<领域>.<语义>` 命名约定。
pub mod codes {
    /// 请求的格式标识未注册。
    pub const FORMAT_NOT_FOUND: &str = "format.not_found";
    /// 没有任何已注册格式支持目标类型。
    pub const FORMAT_EMPTY_SELECTION: &str = "format.empty_selection";
    /// 编解码分派失败（统一包装）。
    pub const FORMAT_DISPATCH: &str = "format.dispatch";
    /// 同名格式重复注册。
    pub const FORMAT_ALREADY_REGISTERED: &str = "format.already_registered";
    /// 格式标识不合法。
    pub const FORMAT_INVALID_NAME: &str = "format.invalid_name";
    /// 输入数据无法解析。
    pub const FORMAT_MALFORMED: &str = "format.malformed";
    /// 输出数据无法生成。
    pub const FORMAT_ENCODE: &str = "format.encode";
    /// 负载类别不被接受。
    pub const FORMAT_UNSUPPORTED_PAYLOAD: &str = "format.unsupported_payload";
    /// 编解码实现不提供该操作。
    pub const FORMAT_UNSUPPORTED_OPERATION: &str = "format.unsupported_operation";
    /// 领域类型拒绝了负载。
    pub const FORMAT_CONVERSION: &str = "format.conversion";
    /// 配置源无法解析。
    pub const SETTINGS_INVALID: &str = "settings.invalid";
}

/// 被 [`FormatError::Dispatch`] 包装的编解码操作。
///
/// `Display` 输出同时包含方向介词，例如 `intern from`、`render to`，
/// 以便错误消息读作 “could not intern from json: ...”。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DispatchOperation {
    Intern,
    InternMultiple,
    Render,
    RenderMultiple,
    Mime,
}

impl DispatchOperation {
    /// 返回操作的稳定名称。
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Intern => "intern",
            Self::InternMultiple => "intern_multiple",
            Self::Render => "render",
            Self::RenderMultiple => "render_multiple",
            Self::Mime => "mime",
        }
    }

    const fn preposition(self) -> &'static str {
        match self {
            Self::Intern | Self::InternMultiple => "from",
            Self::Render | Self::RenderMultiple | Self::Mime => "to",
        }
    }
}

impl fmt::Display for DispatchOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.as_str(), self.preposition())
    }
}

/// 格式协商与分派的错误域。
///
/// # 契约（What）
/// - 所有变体均满足 `Send + Sync + 'static`，可跨线程传播；
/// - [`code`](Self::code) 返回稳定错误码，[`origin`](Self::origin) 沿 `source()` 链定位最初的故障点；
/// - `Dispatch` 的 `format` 为 `None` 表示默认格式本身未能解析（例如 `EmptySelection`）。
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FormatError {
    /// 格式标识未注册；由 `get_format` 直接返回，不做包装。
    #[error("format `{name}` is not registered")]
    NotFound { name: String },

    /// 请求默认格式时没有任何格式支持该类型。
    #[error("no registered format supports `{subject}`")]
    EmptySelection { subject: String },

    /// 编解码路径上的统一失败面。
    ///
    /// `Display` 已内嵌 `message`，即 `source` 的 `Display` 文本；沿 `source()` 链逐层输出的
    /// 报告器会把底层原因打印两次。只需要一行摘要时输出本错误即可，需要定位故障点时改用
    /// [`origin`](Self::origin) 或 [`cause`](Self::cause)。
    #[error(
        "could not {operation} {}: {message}",
        .format.as_deref().unwrap_or("default format")
    )]
    Dispatch {
        operation: DispatchOperation,
        format: Option<String>,
        message: String,
        #[source]
        source: BoxError,
    },

    #[error("format `{name}` is already registered")]
    AlreadyRegistered { name: String },

    #[error("`{name}` is not a valid format identifier")]
    InvalidName { name: String },

    /// 编解码实现无法解析输入。
    #[error("malformed {format} input: {detail}")]
    Malformed {
        format: String,
        detail: String,
        #[source]
        source: Option<BoxError>,
    },

    /// 编解码实现无法生成输出。
    #[error("could not encode {format} output: {detail}")]
    Encode {
        format: String,
        detail: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("`{target}` does not accept {kind} payloads")]
    UnsupportedPayload { target: String, kind: PayloadKind },

    #[error("format `{format}` does not implement `{operation}`")]
    Unsupported {
        format: String,
        operation: &'static str,
    },

    /// 领域类型无法从负载重建（或无法生成负载）。
    #[error("`{subject}` rejected payload: {detail}")]
    Conversion {
        subject: String,
        detail: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("invalid settings: {detail}")]
    Settings {
        detail: String,
        #[source]
        source: Option<BoxError>,
    },
}

impl FormatError {
    /// 返回稳定错误码。
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => codes::FORMAT_NOT_FOUND,
            Self::EmptySelection { .. } => codes::FORMAT_EMPTY_SELECTION,
            Self::Dispatch { .. } => codes::FORMAT_DISPATCH,
            Self::AlreadyRegistered { .. } => codes::FORMAT_ALREADY_REGISTERED,
            Self::InvalidName { .. } => codes::FORMAT_INVALID_NAME,
            Self::Malformed { .. } => codes::FORMAT_MALFORMED,
            Self::Encode { .. } => codes::FORMAT_ENCODE,
            Self::UnsupportedPayload { .. } => codes::FORMAT_UNSUPPORTED_PAYLOAD,
            Self::Unsupported { .. } => codes::FORMAT_UNSUPPORTED_OPERATION,
            Self::Conversion { .. } => codes::FORMAT_CONVERSION,
            Self::Settings { .. } => codes::SETTINGS_INVALID,
        }
    }

    /// 将任意底层失败包装为统一的分派错误。
    ///
    /// - **契约 (What)**：`message` 取自 `cause` 的 `Display`，`cause` 本身作为 `source` 保留；
    /// - **前置条件**：只应在协商器的编解码分派路径上调用，查找类接口直接返回原始错误。
    pub fn dispatch(
        operation: DispatchOperation,
        format: Option<&str>,
        cause: impl Into<BoxError>,
    ) -> Self {
        let source = cause.into();
        Self::Dispatch {
            operation,
            format: format.map(str::to_owned),
            message: source.to_string(),
            source,
        }
    }

    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn malformed(
        format: impl Into<String>,
        detail: impl Into<String>,
        source: Option<BoxError>,
    ) -> Self {
        Self::Malformed {
            format: format.into(),
            detail: detail.into(),
            source,
        }
    }

    pub fn encode(
        format: impl Into<String>,
        detail: impl Into<String>,
        source: Option<BoxError>,
    ) -> Self {
        Self::Encode {
            format: format.into(),
            detail: detail.into(),
            source,
        }
    }

    pub fn conversion(
        subject: impl Into<String>,
        detail: impl Into<String>,
        source: Option<BoxError>,
    ) -> Self {
        Self::Conversion {
            subject: subject.into(),
            detail: detail.into(),
            source,
        }
    }

    /// 是否为统一分派错误。
    pub fn is_dispatch(&self) -> bool {
        matches!(self, Self::Dispatch { .. })
    }

    /// 若为 `Dispatch` 且底层原因同为 [`FormatError`]，返回该原因。
    pub fn cause(&self) -> Option<&FormatError> {
        match self {
            Self::Dispatch { source, .. } => source.downcast_ref::<FormatError>(),
            _ => None,
        }
    }

    /// 沿 `source()` 链返回最深处的错误；没有底层原因时返回自身。
    pub fn origin(&self) -> &(dyn Error + 'static) {
        let mut current: &(dyn Error + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_keeps_cause_message_and_chain() {
        let cause = FormatError::malformed("json", "expected value at line 1 column 1", None);
        let err = FormatError::dispatch(DispatchOperation::Intern, Some("json"), cause);

        assert_eq!(err.code(), codes::FORMAT_DISPATCH);
        assert_eq!(
            err.to_string(),
            "could not intern from json: malformed json input: expected value at line 1 column 1"
        );
        let cause = err.cause().expect("底层原因应保留为 FormatError");
        assert_eq!(cause.code(), codes::FORMAT_MALFORMED);
    }

    #[test]
    fn dispatch_without_resolved_format_names_default() {
        let err = FormatError::dispatch(
            DispatchOperation::Render,
            None,
            FormatError::EmptySelection {
                subject: "node".to_owned(),
            },
        );
        assert_eq!(
            err.to_string(),
            "could not render to default format: no registered format supports `node`"
        );
    }

    #[test]
    fn origin_walks_to_deepest_source() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "truncated");
        let inner = FormatError::malformed("toml", "truncated document", Some(Box::new(io)));
        let err = FormatError::dispatch(DispatchOperation::InternMultiple, Some("toml"), inner);

        assert_eq!(err.origin().to_string(), "truncated");
        let plain = FormatError::not_found("yaml");
        assert_eq!(plain.origin().to_string(), plain.to_string());
    }

    #[test]
    fn operations_render_with_direction() {
        assert_eq!(DispatchOperation::RenderMultiple.to_string(), "render_multiple to");
        assert_eq!(DispatchOperation::InternMultiple.to_string(), "intern_multiple from");
        assert_eq!(DispatchOperation::Mime.to_string(), "mime to");
    }
}
