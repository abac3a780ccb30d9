//! リプレイ保護付き (FORKID) の BIP-143 形式署名ハッシュ。
//!
//! 従来の P2PKH sighash と異なり、消費する出力の金額をダイジェストに含める。

use bitcoin::consensus::encode::serialize;
use bitcoin::hashes::{sha256d, Hash};
use bitcoin::{Amount, ScriptBuf, Transaction};

use crate::error::AppError;

pub const SIGHASH_ALL: u32 = 0x01;
pub const SIGHASH_FORKID: u32 = 0x40;
/// 全入力・全出力にコミットする署名タイプ
pub const SIGHASH_ALL_FORKID: u32 = SIGHASH_ALL | SIGHASH_FORKID;

pub fn signature_hash(
    tx: &Transaction,
    input_index: usize,
    script_code: &ScriptBuf,
    value: Amount,
    sighash_type: u32,
) -> Result<[u8; 32], AppError> {
    let preimage = preimage(tx, input_index, script_code, value, sighash_type)?;
    log::trace!("入力 {} のsighashプリイメージ: {}", input_index, hex::encode(&preimage));
    Ok(sha256d::Hash::hash(&preimage).to_byte_array())
}

fn preimage(
    tx: &Transaction,
    input_index: usize,
    script_code: &ScriptBuf,
    value: Amount,
    sighash_type: u32,
) -> Result<Vec<u8>, AppError> {
    let input = tx.input.get(input_index).ok_or_else(|| {
        AppError::Internal(format!(
            "入力インデックス {} が範囲外です (入力数 {})",
            input_index,
            tx.input.len()
        ))
    })?;

    let mut buf = Vec::with_capacity(256);
    buf.extend_from_slice(&tx.version.0.to_le_bytes());
    buf.extend_from_slice(&hash_prevouts(tx));
    buf.extend_from_slice(&hash_sequence(tx));
    buf.extend_from_slice(&serialize(&input.previous_output));
    buf.extend_from_slice(&serialize(script_code));
    buf.extend_from_slice(&value.to_sat().to_le_bytes());
    buf.extend_from_slice(&input.sequence.to_consensus_u32().to_le_bytes());
    buf.extend_from_slice(&hash_outputs(tx));
    buf.extend_from_slice(&tx.lock_time.to_consensus_u32().to_le_bytes());
    buf.extend_from_slice(&sighash_type.to_le_bytes());
    Ok(buf)
}

fn hash_prevouts(tx: &Transaction) -> [u8; 32] {
    let mut buf = Vec::with_capacity(tx.input.len() * 36);
    for input in &tx.input {
        buf.extend_from_slice(&serialize(&input.previous_output));
    }
    sha256d::Hash::hash(&buf).to_byte_array()
}

fn hash_sequence(tx: &Transaction) -> [u8; 32] {
    let mut buf = Vec::with_capacity(tx.input.len() * 4);
    for input in &tx.input {
        buf.extend_from_slice(&input.sequence.to_consensus_u32().to_le_bytes());
    }
    sha256d::Hash::hash(&buf).to_byte_array()
}

fn hash_outputs(tx: &Transaction) -> [u8; 32] {
    let mut buf = Vec::new();
    for output in &tx.output {
        buf.extend_from_slice(&serialize(output));
    }
    sha256d::Hash::hash(&buf).to_byte_array()
}
