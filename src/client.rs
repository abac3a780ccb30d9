//! bch-js (fullstack.cash) REST API クライアント。残高・UTXO照会とブロードキャストを行う。

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::UpstreamError;
use crate::service::{Broadcaster, UtxoIndexer};
use crate::types::{AddressBalance, UnspentOutput};

#[derive(Debug, Clone)]
pub struct FullstackClient {
    base_url: String,
    api_token: Option<String>,
    client: reqwest::Client,
}

#[derive(Deserialize, Debug)]
struct BalanceResponse {
    success: bool,
    #[serde(default)]
    balance: Option<AddressBalance>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Deserialize, Debug)]
struct UtxoResponse {
    success: bool,
    #[serde(default)]
    utxos: Vec<UnspentOutput>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Serialize, Debug)]
struct SendRawRequest<'a> {
    hexes: [&'a str; 1],
}

impl FullstackClient {
    pub fn new(base_url: &str, api_token: Option<String>) -> Self {
        FullstackClient {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token,
            client: reqwest::Client::new(),
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(ref token) = self.api_token {
            if let Ok(val) = HeaderValue::from_str(&format!("Token {token}")) {
                headers.insert(AUTHORIZATION, val);
            }
        }
        headers
    }

    fn get(&self, path: &str) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        log::debug!("GET {}", url);
        self.client.get(url).headers(self.headers())
    }

    async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, UpstreamError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(UpstreamError::Status { status: status.as_u16(), body });
        }
        Ok(resp.json().await?)
    }
}

impl UtxoIndexer for FullstackClient {
    async fn balance(&self, address: &str) -> Result<AddressBalance, UpstreamError> {
        let resp = self.get(&format!("electrumx/balance/{address}")).send().await?;
        let body: BalanceResponse = Self::read_json(resp).await?;
        if !body.success {
            return Err(UpstreamError::Rejected(body.error.unwrap_or_else(|| "balance query failed".into())));
        }
        body.balance
            .ok_or_else(|| UpstreamError::Malformed("balance フィールドがありません".into()))
    }

    async fn utxos(&self, address: &str) -> Result<Vec<UnspentOutput>, UpstreamError> {
        let resp = self.get(&format!("electrumx/utxos/{address}")).send().await?;
        let body: UtxoResponse = Self::read_json(resp).await?;
        if !body.success {
            return Err(UpstreamError::Rejected(body.error.unwrap_or_else(|| "utxo query failed".into())));
        }
        Ok(body.utxos)
    }
}

impl Broadcaster for FullstackClient {
    async fn submit(&self, raw_tx_hex: &str) -> Result<String, UpstreamError> {
        let url = format!("{}/rawtransactions/sendRawTransaction", self.base_url);
        log::debug!("POST {}", url);
        let resp = self
            .client
            .post(url)
            .headers(self.headers())
            .json(&SendRawRequest { hexes: [raw_tx_hex] })
            .send()
            .await?;
        let txids: Vec<String> = Self::read_json(resp).await?;
        txids
            .into_iter()
            .next()
            .ok_or_else(|| UpstreamError::Malformed("txid が返されませんでした".into()))
    }
}
