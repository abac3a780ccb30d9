use crate::error::AppError;
use crate::fee::FeeEstimator;
use crate::selection::EXACT_MODE_OUTPUTS;
use crate::types::{OutputPlan, PlannedOutput, SelectionResult, SpendMode};

/// 選択済み入力の合計額と手数料から出力一覧を組み立てる。
///
/// おつりにダスト閾値は適用しない。0 sats のおつり出力もそのまま作られる。
pub struct OutputComposer {
    fees: FeeEstimator,
}

impl OutputComposer {
    pub fn new(fees: FeeEstimator) -> Self {
        OutputComposer { fees }
    }

    pub fn compose(
        &self,
        selection: &SelectionResult,
        mode: SpendMode,
        recipient: &str,
        sender: &str,
    ) -> Result<OutputPlan, AppError> {
        let input_count = selection.inputs.len();
        let available = selection.total_selected_sats;

        let plan = match mode {
            SpendMode::Sweep => {
                let fee = self.fees.estimate_fee(input_count, 1);
                let sweep_value = available.checked_sub(fee).ok_or(AppError::InsufficientFunds {
                    available,
                    required: fee,
                    fee,
                })?;
                OutputPlan {
                    outputs: vec![PlannedOutput { address: recipient.to_string(), value_sats: sweep_value }],
                    fee_sats: fee,
                }
            }
            SpendMode::Exact { amount_sats } => {
                let fee = self.fees.estimate_fee(input_count, EXACT_MODE_OUTPUTS);
                let required = amount_sats.saturating_add(fee);
                let change = available.checked_sub(required).ok_or(AppError::InsufficientFunds {
                    available,
                    required,
                    fee,
                })?;
                if change == 0 {
                    log::warn!("おつりが 0 sats です。0 sats の出力をそのまま作成します。");
                }
                OutputPlan {
                    outputs: vec![
                        PlannedOutput { address: recipient.to_string(), value_sats: amount_sats },
                        PlannedOutput { address: sender.to_string(), value_sats: change },
                    ],
                    fee_sats: fee,
                }
            }
        };

        for output in &plan.outputs {
            log::debug!("出力追加: address={}, value={}", output.address, output.value_sats);
        }
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UnspentOutput;

    fn selection(values: &[u64]) -> SelectionResult {
        SelectionResult {
            inputs: values
                .iter()
                .enumerate()
                .map(|(i, v)| UnspentOutput { txid: format!("{:064x}", i + 1), vout: 0, value_sats: *v })
                .collect(),
            total_selected_sats: values.iter().sum(),
        }
    }

    fn composer() -> OutputComposer {
        OutputComposer::new(FeeEstimator::default())
    }

    #[test]
    fn exact_amount_pays_recipient_then_change() {
        let plan = composer()
            .compose(&selection(&[5000, 3000]), SpendMode::Exact { amount_sats: 6000 }, "1Recv", "1Sender")
            .unwrap();
        assert_eq!(
            plan.outputs,
            vec![
                PlannedOutput { address: "1Recv".into(), value_sats: 6000 },
                PlannedOutput { address: "1Sender".into(), value_sats: 1552 },
            ]
        );
        assert_eq!(plan.fee_sats, 448);
        assert_eq!(plan.total_output_sats() + plan.fee_sats, 8000);
    }

    #[test]
    fn sweep_produces_single_output() {
        let plan = composer()
            .compose(&selection(&[10000]), SpendMode::Sweep, "1Recv", "1Sender")
            .unwrap();
        assert_eq!(plan.outputs, vec![PlannedOutput { address: "1Recv".into(), value_sats: 9770 }]);
        assert_eq!(plan.total_output_sats() + plan.fee_sats, 10000);
    }

    #[test]
    fn zero_change_output_is_kept() {
        let fee = FeeEstimator::default().estimate_fee(1, 2);
        let plan = composer()
            .compose(&selection(&[1000 + fee]), SpendMode::Exact { amount_sats: 1000 }, "1Recv", "1Sender")
            .unwrap();
        assert_eq!(plan.outputs.len(), 2);
        assert_eq!(plan.outputs[1].value_sats, 0);
    }

    #[test]
    fn negative_change_is_insufficient_funds() {
        let err = composer()
            .compose(&selection(&[100, 200]), SpendMode::Exact { amount_sats: 1000 }, "1Recv", "1Sender")
            .unwrap_err();
        match err {
            AppError::InsufficientFunds { available, required, fee } => {
                assert_eq!(available, 300);
                assert_eq!(fee, 448);
                assert_eq!(required, 1448);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn sweep_below_fee_fails_fast() {
        let err = composer()
            .compose(&selection(&[100]), SpendMode::Sweep, "1Recv", "1Sender")
            .unwrap_err();
        assert!(matches!(err, AppError::InsufficientFunds { available: 100, fee: 230, .. }));
    }
}
