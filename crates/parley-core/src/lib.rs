#![deny(unsafe_code)]
#![allow(clippy::result_large_err)]
#![doc = "parley-core: 面向领域类型的序列化格式协商与分派核心契约。"]
#![doc = ""]
#![doc = "== 组成 =="]
#![doc = "1. 格式契约：`Format` 以 `Payload` 为中间表示，可作为 `Arc<dyn Format>` 共享；"]
#![doc = "2. 注册中心：`FormatRegistry` 提供只读查询，`InMemoryFormatRegistry` 为默认实现；"]
#![doc = "3. 协商器：`FormatNegotiator` 结合权重与首选格式配置计算格式顺序，并统一包装编解码失败；"]
#![doc = "4. 配置：`SettingsStore` 抽象配置来源，`LiveSettings` 支持热更新与 TOML 加载。"]

pub mod error;
pub mod format;
pub mod instance;
pub mod name;
pub mod negotiation;
pub mod payload;
pub mod registry;
pub mod settings;
pub mod test_stubs;

pub use error::{BoxError, DispatchOperation, FormatError, Result, codes};
pub use format::{Format, FormatDescriptor, PayloadKind};
pub use instance::FormatSupportExt;
pub use name::FormatName;
pub use negotiation::FormatNegotiator;
pub use payload::{DataValue, FormatSupport, Payload, Subject, from_data, to_data};
pub use registry::{FormatRegistry, InMemoryFormatRegistry};
pub use settings::{
    DEFAULT_PREFERRED_FORMAT, LiveSettings, PREFERRED_FORMAT, SettingKey, SettingValue,
    SettingsStore,
};
