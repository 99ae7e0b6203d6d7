//! # 类型级格式协商器
//!
//! ## 定位（Why）
//! - 对给定领域类型计算“支持哪些格式、按什么顺序、默认用哪个”，并把编解码请求分派到选定格式；
//! - 注册中心与配置源均以依赖注入方式传入，协商器本身不持有可变状态，
//!   每次调用都是注册中心内容、当前首选格式与入参的纯函数。
//!
//! ## 排序规则（What）
//! 1. 枚举注册中心的全部名称，保留 `supports(subject)` 为真的格式；
//! 2. 按权重降序排列，权重相同按名称升序；
//! 3. 若首选格式在结果中，将其移到首位，其余元素相对顺序不变；
//!    若不在结果中，仅记录一条 `debug` 诊断，不视为错误。
//!
//! ## 错误面（What）
//! - `get_format` 直接返回 [`FormatError::NotFound`]；
//! - `default_format` 在无可用格式时返回 [`FormatError::EmptySelection`]；
//! - 所有编解码分派（含其中的查找与默认格式解析）失败都被折叠为 [`FormatError::Dispatch`]。

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, trace};

use crate::error::{DispatchOperation, FormatError, Result};
use crate::format::Format;
use crate::name::FormatName;
use crate::payload::{FormatSupport, Subject};
use crate::registry::FormatRegistry;
use crate::settings::{PREFERRED_FORMAT, SettingKey, SettingsStore};

const TARGET: &str = "parley::negotiation";

/// 类型级格式协商器。
///
/// 克隆开销为两次 `Arc` 引用计数递增；同一实例可在多个线程间共享。
#[derive(Clone)]
pub struct FormatNegotiator {
    registry: Arc<dyn FormatRegistry>,
    settings: Arc<dyn SettingsStore>,
    preference_key: SettingKey,
}

impl FormatNegotiator {
    /// 以注册中心与配置源构造协商器，首选格式读取 [`PREFERRED_FORMAT`]。
    pub fn new(registry: Arc<dyn FormatRegistry>, settings: Arc<dyn SettingsStore>) -> Self {
        Self {
            registry,
            settings,
            preference_key: PREFERRED_FORMAT,
        }
    }

    /// 改用其他配置键读取首选格式。
    pub fn with_preference_key(mut self, key: SettingKey) -> Self {
        self.preference_key = key;
        self
    }

    pub fn registry(&self) -> &Arc<dyn FormatRegistry> {
        &self.registry
    }

    pub fn preference_key(&self) -> &SettingKey {
        &self.preference_key
    }

    /// 当前首选格式；每次调用都重新读取配置源。
    ///
    /// 配置缺失、不是文本或不是合法标识时返回 `None`。
    pub fn preferred_format(&self) -> Option<FormatName> {
        self.raw_preference()
            .and_then(|raw| FormatName::parse(&raw).ok())
    }

    fn raw_preference(&self) -> Option<String> {
        let value = self.settings.get(&self.preference_key)?;
        Some(value.to_string())
    }

    /// 类型 `T` 支持的格式，按协商顺序排列。
    pub fn supported_formats<T: FormatSupport>(&self) -> Vec<FormatName> {
        self.supported_formats_for(&T::subject())
    }

    /// 对显式给出的主体执行协商排序。
    pub fn supported_formats_for(&self, subject: &Subject) -> Vec<FormatName> {
        let mut candidates: Vec<(FormatName, i32)> = self
            .registry
            .formats()
            .into_iter()
            .filter_map(|name| match self.registry.format(name.as_str()) {
                Ok(format) if format.supports(subject) => {
                    let weight = format.descriptor().weight();
                    Some((name, weight))
                }
                Ok(_) => None,
                Err(err) => {
                    trace!(target: TARGET, format = %name, error = %err, "listed format vanished");
                    None
                }
            })
            .collect();

        candidates.sort_by(|(a_name, a_weight), (b_name, b_weight)| {
            b_weight.cmp(a_weight).then_with(|| a_name.cmp(b_name))
        });
        candidates.dedup_by(|a, b| a.0 == b.0);

        let mut ordered: Vec<FormatName> = candidates.into_iter().map(|(name, _)| name).collect();
        self.put_preferred_first(subject, &mut ordered);

        debug!(
            target: TARGET,
            subject = %subject,
            "{} supports formats: {}; using {}",
            subject,
            listing(&ordered),
            DefaultLabel(ordered.first()),
        );
        ordered
    }

    fn put_preferred_first(&self, subject: &Subject, ordered: &mut Vec<FormatName>) {
        let Some(raw) = self.raw_preference() else {
            return;
        };
        let position = FormatName::parse(&raw)
            .ok()
            .and_then(|preferred| ordered.iter().position(|name| *name == preferred));

        match position {
            Some(index) => {
                let preferred = ordered.remove(index);
                ordered.insert(0, preferred);
            }
            None => debug!(
                target: TARGET,
                subject = %subject,
                "value of '{}' ({}) is invalid for {}, using default ({})",
                self.preference_key,
                raw,
                subject,
                DefaultLabel(ordered.first()),
            ),
        }
    }

    /// 类型 `T` 的默认格式，即 `supported_formats::<T>()` 的首元素。
    pub fn default_format<T: FormatSupport>(&self) -> Result<FormatName> {
        self.default_format_for(&T::subject())
    }

    pub fn default_format_for(&self, subject: &Subject) -> Result<FormatName> {
        self.supported_formats_for(subject)
            .into_iter()
            .next()
            .ok_or_else(|| FormatError::EmptySelection {
                subject: subject.name().to_owned(),
            })
    }

    /// `name` 已注册且支持类型 `T` 时返回 `true`；与排序和首选格式无关。
    pub fn support_format<T: FormatSupport>(&self, name: &str) -> bool {
        self.support_format_for(&T::subject(), name)
    }

    pub fn support_format_for(&self, subject: &Subject, name: &str) -> bool {
        self.registry
            .format(name)
            .is_ok_and(|format| format.supports(subject))
    }

    /// 按任意标识解析格式；未注册时直接返回 [`FormatError::NotFound`]。
    pub fn get_format(&self, name: &str) -> Result<Arc<dyn Format>> {
        self.registry.format_for(name)
    }

    /// 以指定格式解码单个实例。
    pub fn convert_from<T: FormatSupport>(&self, format: &str, data: &[u8]) -> Result<T> {
        let subject = T::subject();
        wrap(DispatchOperation::Intern, Some(format), || {
            let codec = self.get_format(format)?;
            let payload = codec.intern(&subject, data)?;
            T::from_payload(payload)
        })
    }

    /// 以指定格式解码实例序列。
    pub fn convert_from_multiple<T: FormatSupport>(
        &self,
        format: &str,
        data: &[u8],
    ) -> Result<Vec<T>> {
        let subject = T::subject();
        wrap(DispatchOperation::InternMultiple, Some(format), || {
            let codec = self.get_format(format)?;
            codec
                .intern_multiple(&subject, data)?
                .into_iter()
                .map(T::from_payload)
                .collect()
        })
    }

    /// 以指定格式编码同构实例序列。
    pub fn render_multiple<T: FormatSupport>(&self, format: &str, instances: &[T]) -> Result<Bytes> {
        wrap(DispatchOperation::RenderMultiple, Some(format), || {
            let codec = self.get_format(format)?;
            let kind = codec.descriptor().payload_kind();
            let payloads = instances
                .iter()
                .map(|instance| instance.to_payload(kind))
                .collect::<Result<Vec<_>>>()?;
            codec.render_multiple(payloads)
        })
    }

    /// 编码单个实例；`format` 为 `None` 时使用类型的默认格式。
    pub fn render<T: FormatSupport>(&self, instance: &T, format: Option<&str>) -> Result<Bytes> {
        let resolved = self.resolve::<T>(DispatchOperation::Render, format)?;
        wrap(DispatchOperation::Render, Some(&*resolved), || {
            let codec = self.get_format(&resolved)?;
            let payload = instance.to_payload(codec.descriptor().payload_kind())?;
            codec.render(payload)
        })
    }

    /// 实例将以何种 MIME 类型编码；`format` 为 `None` 时使用类型的默认格式。
    pub fn mime<T: FormatSupport>(&self, _instance: &T, format: Option<&str>) -> Result<String> {
        let resolved = self.resolve::<T>(DispatchOperation::Mime, format)?;
        wrap(DispatchOperation::Mime, Some(&*resolved), || {
            let codec = self.get_format(&resolved)?;
            Ok(codec.descriptor().mime().to_owned())
        })
    }

    fn resolve<'a, T: FormatSupport>(
        &self,
        operation: DispatchOperation,
        format: Option<&'a str>,
    ) -> Result<Cow<'a, str>> {
        match format {
            Some(name) => Ok(Cow::Borrowed(name)),
            None => self
                .default_format::<T>()
                .map(|name| Cow::Owned(name.to_string()))
                .map_err(|cause| FormatError::dispatch(operation, None, cause)),
        }
    }

    /// 按调用方的 `Accept` 列表挑选类型 `T` 可用的格式。
    ///
    /// - 条目以逗号分隔，可以是格式名称或 MIME 类型，`;` 之后的参数被忽略；
    /// - `*/*` 或 `*` 展开为 `supported_formats::<T>()`；
    /// - 结果保持调用方给出的顺序并去重；无法识别或不支持的条目被跳过。
    pub fn most_suitable_formats<T: FormatSupport>(&self, accept: &str) -> Vec<FormatName> {
        let subject = T::subject();
        let mut chosen: Vec<FormatName> = Vec::new();

        for entry in accept.split(',') {
            let ident = entry.split(';').next().unwrap_or_default().trim();
            if ident.is_empty() {
                continue;
            }
            if ident == "*/*" || ident == "*" {
                for name in self.supported_formats_for(&subject) {
                    push_unique(&mut chosen, name);
                }
                continue;
            }
            match self.registry.format_for(ident) {
                Ok(format) if format.supports(&subject) => {
                    push_unique(&mut chosen, format.descriptor().name().clone());
                }
                Ok(_) => debug!(
                    target: TARGET,
                    subject = %subject,
                    accepted = ident,
                    "accepted format does not support subject"
                ),
                Err(_) => debug!(
                    target: TARGET,
                    subject = %subject,
                    accepted = ident,
                    "accepted format is not registered"
                ),
            }
        }
        chosen
    }
}

fn push_unique(chosen: &mut Vec<FormatName>, name: FormatName) {
    if !chosen.contains(&name) {
        chosen.push(name);
    }
}

fn wrap<R>(
    operation: DispatchOperation,
    format: Option<&str>,
    work: impl FnOnce() -> Result<R>,
) -> Result<R> {
    work().map_err(|cause| FormatError::dispatch(operation, format, cause))
}

/// 诊断消息中的格式清单：按名称排序并以空格分隔。
fn listing(names: &[FormatName]) -> String {
    let mut sorted: Vec<&str> = names.iter().map(FormatName::as_str).collect();
    sorted.sort_unstable();
    sorted.join(" ")
}

struct DefaultLabel<'a>(Option<&'a FormatName>);

impl fmt::Display for DefaultLabel<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(name) => f.write_str(name.as_str()),
            None => f.write_str("none"),
        }
    }
}

impl fmt::Debug for FormatNegotiator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormatNegotiator")
            .field("formats", &self.registry.formats())
            .field("preference_key", &self.preference_key)
            .finish()
    }
}
