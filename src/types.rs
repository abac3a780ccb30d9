use std::fmt;
use serde::Deserialize;

/// インデクサーから取得した未使用出力。(txid, vout) で一意に識別される。
#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct UnspentOutput {
    #[serde(rename = "tx_hash")]
    pub txid: String,
    #[serde(rename = "tx_pos")]
    pub vout: u32,
    #[serde(rename = "value")]
    pub value_sats: u64,
}

/// 確認済み + 未確認の残高。未確認分は負になり得る。
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AddressBalance {
    pub confirmed: i64,
    pub unconfirmed: i64,
}

impl AddressBalance {
    pub fn total_sats(&self) -> i64 {
        self.confirmed.saturating_add(self.unconfirmed)
    }
}

/// WIF形式の秘密鍵。Debug出力では中身を伏せる。
#[derive(Clone)]
pub struct SecretWif(String);

impl SecretWif {
    pub fn new(wif: impl Into<String>) -> Self {
        SecretWif(wif.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretWif {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretWif(***)")
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SpendMode {
    /// 全UTXOを1出力にまとめて送る
    Sweep,
    /// 指定額を送り、残りをおつりとして送金元に戻す
    Exact { amount_sats: u64 },
}

#[derive(Debug, Clone)]
pub struct SpendRequest {
    pub recipient_address: String,
    pub sender_address: String,
    pub secret: SecretWif,
    pub amount_sats: Option<u64>,
}

impl SpendRequest {
    /// 受取アドレスが空の場合は送金元アドレス宛て(自己送金)になる。
    pub fn new(to: &str, from: &str, secret: SecretWif, amount_sats: Option<u64>) -> Self {
        let recipient_address = if to.is_empty() { from } else { to };
        SpendRequest {
            recipient_address: recipient_address.to_string(),
            sender_address: from.to_string(),
            secret,
            amount_sats,
        }
    }

    pub fn mode(&self) -> SpendMode {
        match self.amount_sats {
            Some(amount_sats) => SpendMode::Exact { amount_sats },
            None => SpendMode::Sweep,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionResult {
    pub inputs: Vec<UnspentOutput>,
    pub total_selected_sats: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedOutput {
    pub address: String,
    pub value_sats: u64,
}

/// 受取人の出力が先頭、おつりがあれば2番目。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPlan {
    pub outputs: Vec<PlannedOutput>,
    pub fee_sats: u64,
}

impl OutputPlan {
    pub fn total_output_sats(&self) -> u64 {
        self.outputs.iter().map(|o| o.value_sats).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendOutcome {
    pub transaction_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_recipient_falls_back_to_sender() {
        let req = SpendRequest::new("", "1Sender", SecretWif::new("wif"), None);
        assert_eq!(req.recipient_address, "1Sender");
        assert_eq!(req.mode(), SpendMode::Sweep);

        let req = SpendRequest::new("1Recv", "1Sender", SecretWif::new("wif"), Some(10));
        assert_eq!(req.recipient_address, "1Recv");
        assert_eq!(req.mode(), SpendMode::Exact { amount_sats: 10 });
    }

    #[test]
    fn secret_is_redacted_in_debug_output() {
        let req = SpendRequest::new("", "1Sender", SecretWif::new("KwDiBf89"), None);
        assert!(!format!("{:?}", req).contains("KwDiBf89"));
    }

    #[test]
    fn balance_sums_confirmed_and_unconfirmed() {
        let balance = AddressBalance { confirmed: 1000, unconfirmed: -400 };
        assert_eq!(balance.total_sats(), 600);
    }
}
