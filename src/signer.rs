use bitcoin::network::Network as BitcoinNetwork;
use bitcoin::secp256k1::{All, Message, Secp256k1};
use bitcoin::{PrivateKey, PublicKey};

use crate::error::AppError;
use crate::types::SecretWif;

/// 入力ごとの署名能力。金額へのコミットはダイジェスト側で済んでいる前提。
pub trait InputSigner {
    fn public_key(&self) -> PublicKey;

    /// DERエンコードされたECDSA署名 (sighashバイトは含まない) を返す。
    fn sign_digest(&self, input_index: usize, digest: [u8; 32]) -> Result<Vec<u8>, AppError>;
}

pub struct WifSigner {
    private_key: PrivateKey,
    public_key: PublicKey,
    secp: Secp256k1<All>,
}

impl WifSigner {
    pub fn from_wif(secret: &SecretWif, network: BitcoinNetwork) -> Result<Self, AppError> {
        let private_key = PrivateKey::from_wif(secret.expose()).map_err(AppError::BitcoinKey)?;
        if private_key.network != network.into() {
            return Err(AppError::NetworkMismatch {
                configured: format!("{:?}", network),
                inferred: format!("{:?}", private_key.network),
            });
        }
        let secp = Secp256k1::new();
        let public_key = private_key.public_key(&secp);
        Ok(WifSigner { private_key, public_key, secp })
    }
}

impl InputSigner for WifSigner {
    fn public_key(&self) -> PublicKey {
        self.public_key
    }

    fn sign_digest(&self, input_index: usize, digest: [u8; 32]) -> Result<Vec<u8>, AppError> {
        log::debug!("入力 {} の署名生成", input_index);
        let message = Message::from_digest(digest);
        let signature = self.secp.sign_ecdsa(&message, &self.private_key.inner);
        Ok(signature.serialize_der().to_vec())
    }
}
