//! 协商排序的性质验证。
//!
//! - **核心目标 (Why)**：对任意“格式集合 + 首选格式”组合验证排序不变式，避免只靠少量手写用例覆盖；
//! - **性质 (What)**：
//!   1. 结果无重复，且恰好是支持该类型的格式集合；
//!   2. 首选格式若受支持则位于首位，其余元素保持“权重降序、名称升序”的相对顺序；
//!   3. 同一输入重复调用结果一致。
//! - **建模手法 (How)**：生成 `(名称, 权重, 是否支持)` 三元组，用简单排序作为参照模型与协商器结果比对。

use std::collections::BTreeMap;
use std::sync::Arc;

use parley_core::test_stubs::{FixedPreference, StubFormat, StubRecord};
use parley_core::{FormatName, FormatNegotiator, InMemoryFormatRegistry};
use proptest::prelude::*;

#[derive(Clone, Debug)]
struct Candidate {
    weight: i32,
    supported: bool,
}

fn candidates() -> impl Strategy<Value = BTreeMap<String, Candidate>> {
    prop::collection::btree_map(
        "[a-z]{1,6}",
        (-3i32..4, any::<bool>()).prop_map(|(weight, supported)| Candidate { weight, supported }),
        0..8,
    )
}

fn build(
    formats: &BTreeMap<String, Candidate>,
    preference: Option<&str>,
) -> FormatNegotiator {
    let registry = InMemoryFormatRegistry::new();
    for (name, candidate) in formats {
        let stub = StubFormat::new(name, candidate.weight);
        let stub = if candidate.supported {
            stub
        } else {
            stub.only_for(&["unrelated"])
        };
        registry.register(stub).expect("生成的名称互不相同");
    }
    FormatNegotiator::new(Arc::new(registry), Arc::new(FixedPreference::new(preference)))
}

/// 参照模型：权重降序、名称升序。
fn weight_order(formats: &BTreeMap<String, Candidate>) -> Vec<String> {
    let mut supported: Vec<(&String, i32)> = formats
        .iter()
        .filter(|(_, candidate)| candidate.supported)
        .map(|(name, candidate)| (name, candidate.weight))
        .collect();
    supported.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    supported.into_iter().map(|(name, _)| name.clone()).collect()
}

fn names(ordered: &[FormatName]) -> Vec<String> {
    ordered.iter().map(|name| name.as_str().to_owned()).collect()
}

proptest! {
    #[test]
    fn prop_without_preference_matches_weight_order(formats in candidates()) {
        let negotiator = build(&formats, None);
        prop_assert_eq!(names(&negotiator.supported_formats::<StubRecord>()), weight_order(&formats));
    }

    #[test]
    fn prop_preference_relocation_preserves_relative_order(
        formats in candidates(),
        pick in any::<prop::sample::Index>(),
        fallback in "[a-z]{1,6}",
    ) {
        let keys: Vec<&String> = formats.keys().collect();
        let preference = if keys.is_empty() {
            fallback
        } else {
            keys[pick.index(keys.len())].clone()
        };

        let negotiator = build(&formats, Some(&preference));
        let ordered = names(&negotiator.supported_formats::<StubRecord>());
        let expected = weight_order(&formats);

        let mut deduped = ordered.clone();
        deduped.sort();
        deduped.dedup();
        prop_assert_eq!(deduped.len(), ordered.len(), "结果不应包含重复项");

        if expected.contains(&preference) {
            prop_assert_eq!(&ordered[0], &preference);
            let rest: Vec<&String> = ordered.iter().skip(1).collect();
            let expected_rest: Vec<&String> =
                expected.iter().filter(|name| **name != preference).collect();
            prop_assert_eq!(rest, expected_rest);
        } else {
            prop_assert_eq!(&ordered, &expected);
        }
    }

    #[test]
    fn prop_repeated_calls_are_identical(formats in candidates(), preference in "[a-z]{1,6}") {
        let negotiator = build(&formats, Some(&preference));
        let first = negotiator.supported_formats::<StubRecord>();
        let second = negotiator.supported_formats::<StubRecord>();
        prop_assert_eq!(first, second);
    }
}
