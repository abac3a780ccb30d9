use std::future::Future;

use bitcoin::network::Network as BitcoinNetwork;

use crate::address::{p2pkh_script, require_key_matches};
use crate::error::{AppError, Stage, UpstreamError};
use crate::fee::FeeEstimator;
use crate::outputs::OutputComposer;
use crate::selection::CoinSelector;
use crate::signer::{InputSigner, WifSigner};
use crate::transaction::TransactionAssembler;
use crate::types::{AddressBalance, SendOutcome, SpendMode, SpendRequest, UnspentOutput};

/// 残高とUTXOを提供する外部インデクサー
pub trait UtxoIndexer {
    fn balance(&self, address: &str) -> impl Future<Output = Result<AddressBalance, UpstreamError>> + Send;

    /// インデクサーが返した順序を保ったUTXO一覧
    fn utxos(&self, address: &str) -> impl Future<Output = Result<Vec<UnspentOutput>, UpstreamError>> + Send;
}

/// 署名済みトランザクションを受け付ける外部エンドポイント
pub trait Broadcaster {
    /// 受理されたトランザクションのIDを返す。
    fn submit(&self, raw_tx_hex: &str) -> impl Future<Output = Result<String, UpstreamError>> + Send;
}

/// 残高確認 → UTXO取得 → 選択 → 出力計算 → 署名 → シリアライズ → ブロードキャスト
///
/// どの段階で失敗しても処理全体を中断する。リトライは行わない。
pub struct TransactionService<I, B> {
    indexer: I,
    broadcaster: B,
    fees: FeeEstimator,
    network: BitcoinNetwork,
}

impl<I: UtxoIndexer, B: Broadcaster> TransactionService<I, B> {
    pub fn new(indexer: I, broadcaster: B, fees: FeeEstimator, network: BitcoinNetwork) -> Self {
        TransactionService { indexer, broadcaster, fees, network }
    }

    pub async fn balance(&self, address: &str) -> Result<i64, AppError> {
        let balance = self
            .indexer
            .balance(address)
            .await
            .map_err(AppError::upstream(Stage::BalanceQuery))?;
        log::debug!(
            "残高: confirmed={}, unconfirmed={} ({})",
            balance.confirmed, balance.unconfirmed, address
        );
        Ok(balance.total_sats())
    }

    /// 署名済みトランザクションを組み立て、ブロードキャストせずに16進数で返す。
    pub async fn build_raw(&self, request: &SpendRequest) -> Result<String, AppError> {
        let mode = request.mode();
        if mode == (SpendMode::Exact { amount_sats: 0 }) {
            return Err(AppError::InputValidation("送金額に 0 sats は指定できません".to_string()));
        }
        let sender = request.sender_address.as_str();
        let signer = WifSigner::from_wif(&request.secret, self.network)?;
        // アドレスと鍵はネットワーク呼び出しの前に検証する
        let sender_script = p2pkh_script(sender, self.network)?;
        require_key_matches(sender, &sender_script, &signer.public_key())?;
        p2pkh_script(&request.recipient_address, self.network)?;

        let balance = self.balance(sender).await?;
        if balance <= 0 {
            return Err(AppError::ZeroBalance { address: sender.to_string(), balance });
        }
        log::info!("残高確認済み: {} sats", balance);

        let utxos = self
            .indexer
            .utxos(sender)
            .await
            .map_err(AppError::upstream(Stage::UtxoQuery))?;
        log::info!("UTXO取得済み: {} 件", utxos.len());

        let selection = CoinSelector::new(self.fees).select(sender, &utxos, mode)?;
        let plan = OutputComposer::new(self.fees).compose(&selection, mode, &request.recipient_address, sender)?;
        log::info!(
            "出力計算済み: 出力 {} 件, 合計 {} sats, 手数料 {} sats",
            plan.outputs.len(),
            plan.total_output_sats(),
            plan.fee_sats
        );

        TransactionAssembler::new(&signer, self.network).assemble_hex(&selection, &plan, sender)
    }

    pub async fn send(&self, request: &SpendRequest) -> Result<SendOutcome, AppError> {
        let raw_tx_hex = self.build_raw(request).await?;
        let transaction_id = self
            .broadcaster
            .submit(&raw_tx_hex)
            .await
            .map_err(AppError::upstream(Stage::Broadcast))?;
        log::info!("ブロードキャスト完了: txid={}", transaction_id);
        Ok(SendOutcome { transaction_id })
    }
}
