use std::fmt;
use std::path::PathBuf;
use bitcoin::key::FromWifError as BitcoinKeyError; // WIFデコードエラー用
use thiserror::Error;

/// 外部サービス呼び出しのどの段階で失敗したか
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Stage {
    BalanceQuery,
    UtxoQuery,
    Broadcast,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Stage::BalanceQuery => "残高照会",
            Stage::UtxoQuery => "UTXO照会",
            Stage::Broadcast => "ブロードキャスト",
        };
        write!(f, "{}", s)
    }
}

/// インデクサー/ブロードキャスタ由来のエラー。コア側では加工せずそのまま伝播する。
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("HTTPエラー: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTPステータス異常 {status}: {body}")]
    Status { status: u16, body: String },

    #[error("サービスがエラーを返しました: {0}")]
    Rejected(String),

    #[error("不正なレスポンス: {0}")]
    Malformed(String),
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/Oエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSONパースエラー ファイル: {file_path:?}, 詳細: {source}")]
    JsonParse {
        file_path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("秘密鍵(WIF)処理エラー: {0}")]
    BitcoinKey(#[from] BitcoinKeyError),

    #[error("署名エラー (入力インデックス {input_index}): {reason}")]
    SignatureError { input_index: usize, reason: String },

    #[error("ネットワーク不整合: 設定 ({configured}) vs WIF ({inferred})")]
    NetworkMismatch { configured: String, inferred: String },

    #[error("秘密鍵が送金元アドレス {address} に対応していません")]
    KeyMismatch { address: String },

    #[error("入力検証エラー: {0}")]
    InputValidation(String),

    #[error("送金元アドレス {address} の残高がゼロです (残高: {balance} sats)")]
    ZeroBalance { address: String, balance: i64 },

    #[error("送金元アドレス {address} にUTXOが見つかりません")]
    NoUtxos { address: String },

    #[error("資金不足: 利用可能な総額 {available} sats, 要求額 {required} sats (手数料 {fee} sats を含む)")]
    InsufficientFunds {
        available: u64,
        required: u64,
        fee: u64,
    },

    #[error("{stage}に失敗しました: {source}")]
    Upstream {
        stage: Stage,
        #[source]
        source: UpstreamError,
    },

    #[error("内部エラー: {0}")]
    Internal(String),
}

impl AppError {
    pub fn upstream(stage: Stage) -> impl FnOnce(UpstreamError) -> AppError {
        move |source| AppError::Upstream { stage, source }
    }
}
