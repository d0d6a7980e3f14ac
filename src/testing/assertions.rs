//! Custom assertions for domain-specific testing.
//!
//! Provides expressive assertions over module results and rendered segments.

use crate::format::Segment;
use crate::modules::ModuleResult;
use crate::style::StyleSpec;

/// Assert that `name` is bound to `expected`.
///
/// # Panics
///
/// Panics with the full result if the variable is missing, absent or
/// different.
///
/// # Example
///
/// ```rust,ignore
/// let result = probe.probe(&ctx).await.unwrap();
/// assert_var(&result, "version", "v1.80.1");
/// ```
pub fn assert_var(result: &ModuleResult, name: &str, expected: &str) {
    assert_eq!(
        result.value(name),
        Some(expected),
        "Expected ${} to be {:?}.\nResult: {:?}",
        name,
        expected,
        result
    );
}

/// Assert that `name` is bound but absent.
///
/// # Panics
///
/// Panics if the variable is unbound or has a value.
pub fn assert_absent(result: &ModuleResult, name: &str) {
    assert_eq!(
        result.get(name),
        Some(None),
        "Expected ${} to be bound and absent.\nResult: {:?}",
        name,
        result
    );
}

/// Assert that a module produced nothing renderable.
///
/// # Panics
///
/// Panics if any variable has a value.
pub fn assert_all_absent(result: &ModuleResult) {
    assert!(
        result.is_all_absent(),
        "Expected an all-absent result, but got {:?}",
        result
    );
}

/// Assert the visible text of rendered segments.
///
/// # Panics
///
/// Panics if the concatenated text differs.
pub fn assert_text(segments: &[Segment], expected: &str) {
    let text: String = segments.iter().map(|s| s.text.as_str()).collect();
    assert_eq!(text, expected, "Segments: {:?}", segments);
}

/// Assert that the segment whose text is `text` carries `style`.
///
/// # Panics
///
/// Panics if no segment has that text, or its style differs.
pub fn assert_segment_style(segments: &[Segment], text: &str, style: Option<StyleSpec>) {
    let segment = segments
        .iter()
        .find(|s| s.text == text)
        .unwrap_or_else(|| panic!("No segment with text {:?} in {:?}", text, segments));
    assert_eq!(
        segment.style, style,
        "Segment {:?} has the wrong style",
        text
    );
}
