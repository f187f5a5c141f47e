//! Test utilities for property-based testing
//!
//! This module provides generators and helpers for proptest.

#[cfg(test)]
pub mod generators {
    use proptest::prelude::*;

    /// Generate a component name (alphanumeric with hyphens, mixed case)
    pub fn component_name() -> impl Strategy<Value = String> {
        "[A-Za-z][A-Za-z0-9-]{0,15}"
    }

    /// Generate a non-empty list of distinct architectures
    pub fn architecture_list() -> impl Strategy<Value = Vec<String>> {
        proptest::sample::subsequence(
            vec!["i386", "x86_64", "ppc", "ppc64", "arm64"],
            1..=5,
        )
        .prop_map(|archs| archs.into_iter().map(String::from).collect())
    }

    /// Generate a preprocessor define usable as a compiler flag
    pub fn compiler_flag() -> impl Strategy<Value = String> {
        "-D[A-Z]{1,8}"
    }
}

#[cfg(test)]
mod tests {
    use super::generators::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn test_component_name_generator(name in component_name()) {
            prop_assert!(!name.is_empty());
            prop_assert!(name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'));
        }

        #[test]
        fn test_architecture_list_generator(list in architecture_list()) {
            prop_assert!(!list.is_empty());
            let mut unique = list.clone();
            unique.dedup();
            prop_assert_eq!(unique.len(), list.len());
        }

        #[test]
        fn test_compiler_flag_generator(flag in compiler_flag()) {
            prop_assert!(flag.starts_with("-D"));
            prop_assert!(!flag.contains(' '));
        }
    }
}
