/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Generate a Snowflake-style i64 for sale and customer IDs.
///
/// Layout (53 bits, fits in JavaScript's Number.MAX_SAFE_INTEGER):
///   - 41 bits: milliseconds since 2024-01-01 UTC
///   - 12 bits: random (4096 values per ms)
pub fn snowflake_id() -> i64 {
    use rand::Rng;
    // Custom epoch: 2024-01-01 00:00:00 UTC
    const EPOCH_MS: i64 = 1_704_067_200_000;
    let now = now_millis();
    let ts = (now - EPOCH_MS) & 0x1FF_FFFF_FFFF; // 41 bits
    let rand_bits: i64 = rand::thread_rng().gen_range(0..0x1000); // 12 bits
    (ts << 12) | rand_bits
}

/// Deterministic snowflake-shaped ID derived from a stable key.
///
/// 同一个订单重复结账时得到同一个销售单号，重复写入即幂等。
pub fn stable_id(key: &str, timestamp_ms: i64) -> i64 {
    const EPOCH_MS: i64 = 1_704_067_200_000;
    // FNV-1a, stable across builds and platforms
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in key.as_bytes() {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    let ts = (timestamp_ms - EPOCH_MS).max(0) & 0x1FF_FFFF_FFFF;
    (ts << 12) | (hash & 0xFFF) as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snowflake_is_positive_and_safe() {
        let id = snowflake_id();
        assert!(id > 0);
        assert!(id < (1_i64 << 53));
    }

    #[test]
    fn test_stable_id_is_deterministic() {
        let a = stable_id("order-1", 1_750_000_000_000);
        let b = stable_id("order-1", 1_750_000_000_000);
        assert_eq!(a, b);
        assert!(a > 0);
        assert!(a < (1_i64 << 53));
    }
}
