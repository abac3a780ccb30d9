use bitcoin::{
    absolute::LockTime, consensus::encode, network::Network as BitcoinNetwork,
    script::{Builder, PushBytesBuf}, Amount, OutPoint, ScriptBuf, Sequence, Transaction, TxIn, TxOut, Txid,
    Witness,
};
use std::str::FromStr;

use crate::{
    address::{p2pkh_script, require_key_matches},
    error::AppError,
    sighash::{self, SIGHASH_ALL_FORKID},
    signer::InputSigner,
    types::{OutputPlan, SelectionResult},
};

/// 選択済み入力と出力プランから P2PKH トランザクションを組み立て、署名する。
pub struct TransactionAssembler<'a, S: InputSigner> {
    signer: &'a S,
    network: BitcoinNetwork,
}

impl<'a, S: InputSigner> TransactionAssembler<'a, S> {
    pub fn new(signer: &'a S, network: BitcoinNetwork) -> Self {
        TransactionAssembler { signer, network }
    }

    /// 署名済みトランザクションを16進数文字列で返す。
    pub fn assemble_hex(
        &self,
        selection: &SelectionResult,
        plan: &OutputPlan,
        sender_address: &str,
    ) -> Result<String, AppError> {
        let transaction = self.assemble(selection, plan, sender_address)?;
        let hex = encode::serialize_hex(&transaction);
        log::info!("シリアライズ完了: {} bytes", hex.len() / 2);
        Ok(hex)
    }

    pub fn assemble(
        &self,
        selection: &SelectionResult,
        plan: &OutputPlan,
        sender_address: &str,
    ) -> Result<Transaction, AppError> {
        log::info!("トランザクション構築処理を開始します。");
        let script_code = p2pkh_script(sender_address, self.network)?;
        require_key_matches(sender_address, &script_code, &self.signer.public_key())?;

        // 署名前の骨組み (script_sig は空)
        let mut transaction = Transaction {
            version: bitcoin::transaction::Version(2),
            lock_time: LockTime::ZERO,
            input: selection
                .inputs
                .iter()
                .map(|utxo| -> Result<TxIn, AppError> {
                    let txid = Txid::from_str(&utxo.txid).map_err(|e| {
                        AppError::InputValidation(format!("無効なTXID形式 ({}): {}", utxo.txid, e))
                    })?;
                    Ok(TxIn {
                        previous_output: OutPoint::new(txid, utxo.vout),
                        script_sig: ScriptBuf::new(),
                        sequence: Sequence::MAX,
                        witness: Witness::new(),
                    })
                })
                .collect::<Result<Vec<_>, AppError>>()?,
            output: plan
                .outputs
                .iter()
                .map(|output| -> Result<TxOut, AppError> {
                    Ok(TxOut {
                        value: Amount::from_sat(output.value_sats),
                        script_pubkey: p2pkh_script(&output.address, self.network)?,
                    })
                })
                .collect::<Result<Vec<_>, AppError>>()?,
        };

        // 各入力の署名は互いに独立。出力確定後の骨組みと自身の金額だけに依存する。
        log::info!("トランザクション署名処理を開始します。");
        let script_sigs = selection
            .inputs
            .iter()
            .enumerate()
            .map(|(input_index, utxo)| {
                self.unlocking_script(&transaction, input_index, &script_code, Amount::from_sat(utxo.value_sats))
            })
            .collect::<Result<Vec<_>, AppError>>()?;

        for (input, script_sig) in transaction.input.iter_mut().zip(script_sigs) {
            input.script_sig = script_sig;
        }
        log::info!("全ての入力 ({} 件) の署名が完了しました。", transaction.input.len());

        Ok(transaction)
    }

    fn unlocking_script(
        &self,
        transaction: &Transaction,
        input_index: usize,
        script_code: &ScriptBuf,
        value: Amount,
    ) -> Result<ScriptBuf, AppError> {
        let digest = sighash::signature_hash(transaction, input_index, script_code, value, SIGHASH_ALL_FORKID)?;
        let mut signature = self.signer.sign_digest(input_index, digest)?;
        signature.push(SIGHASH_ALL_FORKID as u8);

        let push = PushBytesBuf::try_from(signature).map_err(|_| AppError::SignatureError {
            input_index,
            reason: "署名のPushBytes変換に失敗しました".to_string(),
        })?;
        let script_sig = Builder::new()
            .push_slice(push)
            .push_key(&self.signer.public_key())
            .into_script();
        log::debug!("入力 {} (value={}) の署名適用完了。", input_index, value.to_sat());
        Ok(script_sig)
    }
}
