//! 送金先/送金元アドレスを P2PKH ロックスクリプトに変換する。
//!
//! CashAddr (`bitcoincash:q...`) を優先し、それ以外は従来の base58 アドレスとして扱う。

use bitcoin::{
    address::AddressType, hashes::Hash, network::Network as BitcoinNetwork,
    opcodes::all::{OP_CHECKSIG, OP_DUP, OP_EQUALVERIFY, OP_HASH160}, script::Builder, Address, PublicKey,
    ScriptBuf,
};
use bitcoincash_addr::{Address as CashAddress, HashType, Network as CashNetwork};
use std::str::FromStr;

use crate::error::AppError;

pub fn p2pkh_script(address: &str, network: BitcoinNetwork) -> Result<ScriptBuf, AppError> {
    if address.contains(':') {
        return cashaddr_script(address, network);
    }
    // プレフィックス省略の CashAddr
    if address.starts_with('q') || address.starts_with('p') {
        return cashaddr_script(&format!("{}:{}", cashaddr_prefix(network), address), network);
    }

    let parsed = Address::from_str(address)
        .and_then(|addr| addr.require_network(network))
        .map_err(|e| {
            AppError::InputValidation(format!("アドレス形式エラーまたはネットワーク不整合 ({}): {}", address, e))
        })?;
    if parsed.address_type() != Some(AddressType::P2pkh) {
        return Err(AppError::InputValidation(format!("P2PKH以外のアドレスは使用できません: {}", address)));
    }
    Ok(parsed.script_pubkey())
}

/// 公開鍵のハッシュにロックする P2PKH スクリプト
pub fn p2pkh_script_for_key(public_key: &PublicKey) -> ScriptBuf {
    lock_to_hash(public_key.pubkey_hash().to_byte_array())
}

/// 秘密鍵が送金元アドレスのUTXOを解除できるか確認する。
pub fn require_key_matches(sender_address: &str, sender_script: &ScriptBuf, public_key: &PublicKey) -> Result<(), AppError> {
    if p2pkh_script_for_key(public_key) != *sender_script {
        return Err(AppError::KeyMismatch { address: sender_address.to_string() });
    }
    Ok(())
}

fn cashaddr_script(address: &str, network: BitcoinNetwork) -> Result<ScriptBuf, AppError> {
    let decoded = CashAddress::decode(address).map_err(|e| {
        AppError::InputValidation(format!("CashAddrのデコードに失敗しました ({}): {:?}", address, e))
    })?;
    let network_matches = match decoded.network {
        CashNetwork::Main => network == BitcoinNetwork::Bitcoin,
        CashNetwork::Test => network == BitcoinNetwork::Testnet,
        CashNetwork::Regtest => network == BitcoinNetwork::Regtest,
    };
    if !network_matches {
        return Err(AppError::InputValidation(format!(
            "アドレスのネットワークが設定 ({:?}) と一致しません: {}",
            network, address
        )));
    }
    if !matches!(decoded.hash_type, HashType::Key) {
        return Err(AppError::InputValidation(format!("P2PKH以外のアドレスは使用できません: {}", address)));
    }
    let hash: [u8; 20] = decoded.body.as_slice().try_into().map_err(|_| {
        AppError::InputValidation(format!("公開鍵ハッシュの長さが不正です ({} bytes): {}", decoded.body.len(), address))
    })?;
    Ok(lock_to_hash(hash))
}

fn cashaddr_prefix(network: BitcoinNetwork) -> &'static str {
    match network {
        BitcoinNetwork::Bitcoin => "bitcoincash",
        BitcoinNetwork::Regtest => "bchreg",
        _ => "bchtest",
    }
}

// OP_DUP OP_HASH160 <20-byte hash> OP_EQUALVERIFY OP_CHECKSIG
fn lock_to_hash(hash: [u8; 20]) -> ScriptBuf {
    Builder::new()
        .push_opcode(OP_DUP)
        .push_opcode(OP_HASH160)
        .push_slice(hash)
        .push_opcode(OP_EQUALVERIFY)
        .push_opcode(OP_CHECKSIG)
        .into_script()
}
