use std::ops::ControlFlow;

use crate::error::{AppError, Stage, UpstreamError};
use crate::fee::FeeEstimator;
use crate::types::{SelectionResult, SpendMode, UnspentOutput};

/// 指定額モードで手数料を見積もる際の出力数 (受取人 + おつり)
pub const EXACT_MODE_OUTPUTS: usize = 2;

/// インデクサーが返した順序のままUTXOを選択する。
///
/// 指定額モードは先頭から貪欲に積み上げ、「指定額 + その時点の入力数での手数料」
/// に初めて届いた時点で止める。入力数や端数の最小化は行わない。
pub struct CoinSelector {
    fees: FeeEstimator,
}

impl CoinSelector {
    pub fn new(fees: FeeEstimator) -> Self {
        CoinSelector { fees }
    }

    pub fn select(
        &self,
        address: &str,
        utxos: &[UnspentOutput],
        mode: SpendMode,
    ) -> Result<SelectionResult, AppError> {
        if utxos.is_empty() {
            return Err(AppError::NoUtxos { address: address.to_string() });
        }
        let selection = match mode {
            SpendMode::Sweep => select_all(utxos)?,
            SpendMode::Exact { amount_sats } => self.select_until_covered(utxos, amount_sats)?,
        };
        log::info!(
            "UTXO選択完了: {} / {} 件, 合計 {} sats",
            selection.inputs.len(),
            utxos.len(),
            selection.total_selected_sats
        );
        Ok(selection)
    }

    fn select_until_covered(&self, utxos: &[UnspentOutput], amount_sats: u64) -> Result<SelectionResult, AppError> {
        let step = |(count, total): (usize, u64), utxo: &UnspentOutput| {
            let count = count + 1;
            let Some(total) = total.checked_add(utxo.value_sats) else {
                return ControlFlow::Break(Err(value_overflow()));
            };
            let fee = self.fees.estimate_fee(count, EXACT_MODE_OUTPUTS);
            log::debug!("UTXO追加: txid={}, vout={}, 累計 {} sats", utxo.txid, utxo.vout, total);
            if total >= amount_sats.saturating_add(fee) {
                ControlFlow::Break(Ok((count, total)))
            } else {
                ControlFlow::Continue((count, total))
            }
        };
        let (count, total) = match utxos.iter().try_fold((0, 0), step) {
            ControlFlow::Break(result) => result?,
            ControlFlow::Continue(acc) => acc,
        };
        Ok(SelectionResult {
            inputs: utxos[..count].to_vec(),
            total_selected_sats: total,
        })
    }
}

fn select_all(utxos: &[UnspentOutput]) -> Result<SelectionResult, AppError> {
    let total = utxos
        .iter()
        .try_fold(0u64, |total, u| total.checked_add(u.value_sats))
        .ok_or_else(value_overflow)?;
    Ok(SelectionResult {
        inputs: utxos.to_vec(),
        total_selected_sats: total,
    })
}

/// インデクサーが返した金額の合計が u64 に収まらない
fn value_overflow() -> AppError {
    AppError::Upstream {
        stage: Stage::UtxoQuery,
        source: UpstreamError::Malformed("UTXO金額の合計がオーバーフローしました".to_string()),
    }
}
