use std::fs::File;
use std::io::Write;
use clap::Parser;

mod address;
mod cli;
mod client;
mod config;
mod error;
mod fee;
mod outputs;
mod selection;
mod service;
mod sighash;
mod signer;
mod transaction;
mod types;

use cli::{CliArgs, Command, parse_network};
use client::FullstackClient;
use config::ServiceConfig;
use error::AppError;
use fee::FeeEstimator;
use service::TransactionService;

#[tokio::main]
async fn main() -> Result<(), AppError> {
    env_logger::init();

    let args = CliArgs::parse();
    log::info!("アプリケーションを開始します。");

    let config = match &args.config {
        Some(path) => ServiceConfig::load(path)?,
        None => ServiceConfig::default(),
    };
    let network = parse_network(args.network.as_deref().unwrap_or(&config.network))?;
    log::info!("指定されたネットワーク: {:?}", network);
    let rest_url = args.rest_url.clone().unwrap_or_else(|| config.rest_url.clone());
    log::info!("REST API: {}", rest_url);

    let fees = FeeEstimator::from_policy(&config.fee)?;
    let client = FullstackClient::new(&rest_url, config.api_token.clone());
    let service = TransactionService::new(client.clone(), client, fees, network);

    match args.command {
        Command::Balance { address } => {
            let balance = service.balance(&address).await?;
            println!("{}", balance);
        }
        Command::Build { spend, output_file } => {
            let request = spend.to_request()?;
            let raw_tx_hex = service.build_raw(&request).await?;
            log::info!("Raw transaction hex: {}", raw_tx_hex);
            println!("{}", raw_tx_hex);

            if let Some(path) = output_file {
                let mut file = File::create(&path).map_err(|e| {
                    log::error!("出力ファイルの作成に失敗しました: {:?}", path);
                    AppError::Io(e)
                })?;
                file.write_all(raw_tx_hex.as_bytes()).map_err(|e| {
                    log::error!("出力ファイルへの書き込みに失敗しました。");
                    AppError::Io(e)
                })?;
                log::info!("Raw transactionを {:?} に保存しました。", path);
            }
        }
        Command::Send(spend) => {
            let request = spend.to_request()?;
            let outcome = service.send(&request).await?;
            println!("{}", outcome.transaction_id);
        }
    }

    log::info!("処理が正常に完了しました。");
    Ok(())
}
