use crate::config::FeePolicy;
use crate::error::AppError;

/// 設定可能な手数料レートの上限 (sats/byte)
pub const MAX_SATOSHIS_PER_BYTE: f64 = 1_000.0;

/// P2PKH 入出力数からバイト数を見積もり、固定レートで手数料を算出する。
/// レートはミリサトシ/バイトの整数で保持し、切り捨てを整数演算で行う。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimator {
    millisats_per_byte: u64,
    input_bytes: u64,
    output_bytes: u64,
    overhead_bytes: u64,
}

impl Default for FeeEstimator {
    fn default() -> Self {
        FeeEstimator {
            millisats_per_byte: 1_200,
            input_bytes: 148,
            output_bytes: 34,
            overhead_bytes: 10,
        }
    }
}

impl FeeEstimator {
    pub fn from_policy(policy: &FeePolicy) -> Result<Self, AppError> {
        let rate = policy.satoshis_per_byte;
        if !rate.is_finite() || !(0.0..=MAX_SATOSHIS_PER_BYTE).contains(&rate) {
            return Err(AppError::InputValidation(format!(
                "無効な手数料レートです: {} sats/byte",
                rate
            )));
        }
        Ok(FeeEstimator {
            millisats_per_byte: (rate * 1_000.0).round() as u64,
            input_bytes: policy.input_bytes,
            output_bytes: policy.output_bytes,
            overhead_bytes: policy.overhead_bytes,
        })
    }

    pub fn estimate_size(&self, input_count: usize, output_count: usize) -> u64 {
        // 入出力サイズは設定値なので飽和演算で単調性を保つ
        self.input_bytes
            .saturating_mul(input_count as u64)
            .saturating_add(self.output_bytes.saturating_mul(output_count as u64))
            .saturating_add(self.overhead_bytes)
    }

    pub fn estimate_fee(&self, input_count: usize, output_count: usize) -> u64 {
        let size = self.estimate_size(input_count, output_count);
        let fee = self.millisats_per_byte.saturating_mul(size) / 1_000;
        log::debug!(
            "手数料見積もり: 入力 {}, 出力 {}, 推定サイズ {} bytes, 手数料 {} sats",
            input_count, output_count, size, fee
        );
        fee
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_policy_matches_worked_examples() {
        let fees = FeeEstimator::default();
        // floor(1.2 * 226)
        assert_eq!(fees.estimate_fee(1, 2), 271);
        // floor(1.2 * 374) = floor(448.8)
        assert_eq!(fees.estimate_fee(2, 2), 448);
        // floor(1.2 * 192) = floor(230.4)
        assert_eq!(fees.estimate_fee(1, 1), 230);
    }

    #[test]
    fn fee_is_monotonic_in_both_counts() {
        let fees = FeeEstimator::default();
        for inputs in 1..30 {
            for outputs in 1..5 {
                let fee = fees.estimate_fee(inputs, outputs);
                assert!(fees.estimate_fee(inputs + 1, outputs) >= fee);
                assert!(fees.estimate_fee(inputs, outputs + 1) >= fee);
                assert_eq!(fees.estimate_fee(inputs, outputs), fee);
            }
        }
    }

    #[test]
    fn policy_rate_is_converted_without_float_drift() {
        let policy = FeePolicy { satoshis_per_byte: 1.2, ..FeePolicy::default() };
        let fees = FeeEstimator::from_policy(&policy).unwrap();
        assert_eq!(fees, FeeEstimator::default());

        let policy = FeePolicy { satoshis_per_byte: 1.0, ..FeePolicy::default() };
        let fees = FeeEstimator::from_policy(&policy).unwrap();
        assert_eq!(fees.estimate_fee(1, 1), 192);
    }

    #[test]
    fn negative_rate_is_rejected() {
        let policy = FeePolicy { satoshis_per_byte: -0.5, ..FeePolicy::default() };
        assert!(matches!(
            FeeEstimator::from_policy(&policy),
            Err(AppError::InputValidation(_))
        ));
        let policy = FeePolicy { satoshis_per_byte: f64::NAN, ..FeePolicy::default() };
        assert!(FeeEstimator::from_policy(&policy).is_err());
    }

    #[test]
    fn rate_above_ceiling_is_rejected() {
        let policy = FeePolicy { satoshis_per_byte: 1e30, ..FeePolicy::default() };
        assert!(matches!(
            FeeEstimator::from_policy(&policy),
            Err(AppError::InputValidation(_))
        ));
        let policy = FeePolicy { satoshis_per_byte: MAX_SATOSHIS_PER_BYTE, ..FeePolicy::default() };
        assert_eq!(FeeEstimator::from_policy(&policy).unwrap().estimate_fee(1, 1), 192_000);
    }

    #[test]
    fn oversized_byte_model_saturates_instead_of_overflowing() {
        let policy = FeePolicy { input_bytes: u64::MAX / 2, ..FeePolicy::default() };
        let fees = FeeEstimator::from_policy(&policy).unwrap();
        let fee = fees.estimate_fee(3, 2);
        assert_eq!(fee, u64::MAX / 1_000);
        assert!(fees.estimate_fee(4, 2) >= fee);
    }
}
