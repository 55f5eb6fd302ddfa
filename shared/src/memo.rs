//! Memo number generation

/// Next sequential memo number for a branch that already has `count`
/// documents: zero-padded to six digits.
pub fn sequential_memo(count: i64) -> String {
    format!("{:06}", count + 1)
}

/// Random memo number used when the branch count cannot be read
pub fn random_memo() -> String {
    uuid::Uuid::new_v4()
        .simple()
        .to_string()
        .to_uppercase()
        .chars()
        .take(10)
        .collect()
}
