use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use bitcoin::{amount::Denomination, Amount, Network as BitcoinNetwork};
use crate::error::AppError;
use crate::types::{SecretWif, SpendRequest};

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
pub struct CliArgs {
    /// 設定ファイル (JSON) へのパス
    #[clap(short, long, value_parser)]
    pub config: Option<PathBuf>,

    /// 使用するネットワーク ("bitcoin", "testnet", "regtest")。設定ファイルより優先
    #[clap(short, long, value_parser)]
    pub network: Option<String>,

    /// REST API のベースURL。設定ファイルより優先
    #[clap(long, value_parser)]
    pub rest_url: Option<String>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// トランザクションを構築・署名してブロードキャストする
    Send(SpendArgs),
    /// トランザクションを構築・署名して raw transaction hex を出力する (ブロードキャストしない)
    Build {
        #[clap(flatten)]
        spend: SpendArgs,

        /// 生成された raw transaction hex を保存するファイルへのパス
        #[clap(short, long, value_parser)]
        output_file: Option<PathBuf>,
    },
    /// アドレスの残高 (確認済み + 未確認, sats) を表示する
    Balance {
        #[clap(short, long)]
        address: String,
    },
}

#[derive(Args, Debug)]
pub struct SpendArgs {
    /// 送金元アドレス
    #[clap(long)]
    pub from: String,

    /// 受取アドレス。省略時は送金元アドレス宛て
    #[clap(long, default_value = "")]
    pub to: String,

    /// 送金元の秘密鍵 (WIF)
    #[clap(long, env = "SENDER_WIF", hide_env_values = true)]
    pub secret: String,

    /// 送金額 (BCH単位の10進数)。省略時は全額送金
    #[clap(long, conflicts_with = "amount_sats")]
    pub amount: Option<String>,

    /// 送金額 (sats)
    #[clap(long)]
    pub amount_sats: Option<u64>,
}

impl SpendArgs {
    pub fn to_request(&self) -> Result<SpendRequest, AppError> {
        let amount_sats = match (&self.amount, self.amount_sats) {
            (Some(amount), _) => Some(parse_amount(amount)?),
            (None, sats) => sats,
        };
        Ok(SpendRequest::new(&self.to, &self.from, SecretWif::new(self.secret.clone()), amount_sats))
    }
}

/// BCH単位の金額文字列を sats に変換する。
pub fn parse_amount(amount: &str) -> Result<u64, AppError> {
    Amount::from_str_in(amount.trim(), Denomination::Bitcoin)
        .map(|a| a.to_sat())
        .map_err(|e| AppError::InputValidation(format!("無効な送金額です ({}): {}", amount, e)))
}

pub fn parse_network(network_str: &str) -> Result<BitcoinNetwork, AppError> {
    match network_str.to_lowercase().as_str() {
        "bitcoin" | "mainnet" => Ok(BitcoinNetwork::Bitcoin),
        "testnet" => Ok(BitcoinNetwork::Testnet),
        "regtest" => Ok(BitcoinNetwork::Regtest),
        s => Err(AppError::InputValidation(format!("無効なネットワークが指定されました: {}", s))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SpendMode;

    #[test]
    fn bch_amount_is_converted_to_sats() {
        assert_eq!(parse_amount("0.00006").unwrap(), 6000);
        assert_eq!(parse_amount("1").unwrap(), 100_000_000);
        assert!(parse_amount("0.000000001").is_err());
        assert!(parse_amount("abc").is_err());
    }

    #[test]
    fn network_names_are_case_insensitive() {
        assert_eq!(parse_network("MainNet").unwrap(), BitcoinNetwork::Bitcoin);
        assert_eq!(parse_network("regtest").unwrap(), BitcoinNetwork::Regtest);
        assert!(parse_network("signet-x").is_err());
    }

    #[test]
    fn send_without_amount_is_a_sweep() {
        let args = CliArgs::try_parse_from(["bch-p2pkh-sender", "send", "--from", "1Sender", "--secret", "wif"]).unwrap();
        match args.command {
            Command::Send(spend) => {
                let request = spend.to_request().unwrap();
                assert_eq!(request.mode(), SpendMode::Sweep);
                assert_eq!(request.recipient_address, "1Sender");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn build_accepts_amount_and_output_file() {
        let args = CliArgs::try_parse_from([
            "bch-p2pkh-sender", "--network", "testnet", "build", "--from", "1Sender", "--to", "1Recv",
            "--secret", "wif", "--amount", "0.0001", "--output-file", "tx.hex",
        ])
        .unwrap();
        assert_eq!(args.network.as_deref(), Some("testnet"));
        match args.command {
            Command::Build { spend, output_file } => {
                assert_eq!(spend.to_request().unwrap().mode(), SpendMode::Exact { amount_sats: 10_000 });
                assert_eq!(output_file, Some(PathBuf::from("tx.hex")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn amount_flags_conflict() {
        let result = CliArgs::try_parse_from([
            "bch-p2pkh-sender", "send", "--from", "1Sender", "--secret", "wif", "--amount", "1", "--amount-sats", "5",
        ]);
        assert!(result.is_err());
    }
}
