//! Common assertion macros for crossguard tests

/// Assert that a report carries a violation for `rule` at `symbol`
#[macro_export]
macro_rules! assert_violation {
    ($report:expr, $rule:expr, $symbol:expr) => {
        let found = $report.violations.iter().any(|v| v.rule_id == $rule && v.symbol == $symbol);
        if !found {
            let violations_str = $report
                .violations
                .iter()
                .map(|v| format!("  - {} {} {}: {}", v.rule_id, v.file_path, v.symbol, v.message))
                .collect::<Vec<_>>()
                .join("\n");
            panic!(
                "Expected violation of '{}' at '{}', but got:\n{}",
                $rule,
                $symbol,
                if violations_str.is_empty() { "  (no violations)".to_string() } else { violations_str }
            );
        }
    };
}

/// Assert that some violation message contains a pattern
#[macro_export]
macro_rules! assert_violation_message {
    ($report:expr, $pattern:expr) => {
        let pattern = $pattern;
        let found = $report.violations.iter().any(|v| v.message.contains(pattern));
        if !found {
            let messages =
                $report.violations.iter().map(|v| v.message.clone()).collect::<Vec<_>>().join("\n");
            panic!("Expected violation containing '{}', but got:\n{}", pattern, messages);
        }
    };
}

/// Assert that a report has no violations at all
#[macro_export]
macro_rules! assert_clean {
    ($report:expr) => {
        if !$report.violations.is_empty() {
            let messages = $report
                .violations
                .iter()
                .map(|v| format!("  - {}: {}", v.rule_id, v.message))
                .collect::<Vec<_>>()
                .join("\n");
            panic!("Expected no violations, but got:\n{}", messages);
        }
    };
}
