//! Utilitaires cryptographiques hérités des équipements Hikvision.
//!
//! Ces fonctions reproduisent des schémas propriétaires anciens (XOR à clé
//! répétée, AES en mode ECB, code de réinitialisation du mot de passe). Elles
//! servent à l'interopérabilité avec d'anciens firmwares, **pas** à protéger
//! quoi que ce soit.

use aes::cipher::{BlockDecrypt, KeyInit, generic_array::GenericArray};
use aes::{Aes128, Aes192, Aes256};
use thiserror::Error;

/// Clé AES connue des firmwares concernés (hex)
pub const LEGACY_AES_KEY_HEX: &str = "279977f62f6cfd2d91cd75b889ce0c9a";

/// Clé XOR connue des firmwares concernés (hex)
pub const LEGACY_XOR_KEY_HEX: &str = "738B5544";

const AES_BLOCK_SIZE: usize = 16;

/// Multiplicateur de l'algorithme de code de réinitialisation
const RESET_MULTIPLIER: u64 = 1_751_873_395;

/// Substitution des chiffres `0..=8` du code de réinitialisation
const RESET_ALPHABET: [char; 9] = ['Q', 'R', 'S', 'q', 'r', 'd', 'e', 'y', 'z'];

#[derive(Error, Debug, PartialEq)]
pub enum CryptoError {
    #[error("invalid {kind} key hex: {source}")]
    InvalidKeyHex {
        kind: &'static str,
        #[source]
        source: hex::FromHexError,
    },

    #[error("invalid AES key length: {0} bytes (expected 16, 24 or 32)")]
    InvalidKeyLength(usize),

    #[error("XOR key must not be empty")]
    EmptyKey,
}

fn decrypt_blocks<C: BlockDecrypt>(cipher: &C, data: &mut [u8]) {
    for chunk in data.chunks_exact_mut(AES_BLOCK_SIZE) {
        cipher.decrypt_block(GenericArray::from_mut_slice(chunk));
    }
}

/// Déchiffre `data` en AES-ECB avec une clé hexadécimale.
///
/// La taille de clé (16, 24 ou 32 octets) sélectionne AES-128/192/256. Les
/// données sont complétées par des zéros jusqu'à un multiple de la taille de
/// bloc avant déchiffrement ; aucun padding n'est retiré du résultat.
pub fn decrypt_aes_ecb(data: &[u8], key_hex: &str) -> Result<Vec<u8>, CryptoError> {
    let key = hex::decode(key_hex).map_err(|source| CryptoError::InvalidKeyHex {
        kind: "AES",
        source,
    })?;

    let mut buf = data.to_vec();
    let remainder = buf.len() % AES_BLOCK_SIZE;
    if remainder != 0 {
        buf.resize(buf.len() + AES_BLOCK_SIZE - remainder, 0);
    }

    match key.len() {
        16 => decrypt_blocks(&Aes128::new(GenericArray::from_slice(&key)), &mut buf),
        24 => decrypt_blocks(&Aes192::new(GenericArray::from_slice(&key)), &mut buf),
        32 => decrypt_blocks(&Aes256::new(GenericArray::from_slice(&key)), &mut buf),
        n => return Err(CryptoError::InvalidKeyLength(n)),
    }

    Ok(buf)
}

/// Déchiffre (ou chiffre, l'opération est involutive) `data` par XOR avec une clé répétée.
pub fn decrypt_xor(data: &[u8], key_hex: &str) -> Result<Vec<u8>, CryptoError> {
    let key = hex::decode(key_hex).map_err(|source| CryptoError::InvalidKeyHex {
        kind: "XOR",
        source,
    })?;
    if key.is_empty() {
        return Err(CryptoError::EmptyKey);
    }

    Ok(data
        .iter()
        .zip(key.iter().cycle())
        .map(|(b, k)| b ^ k)
        .collect())
}

/// Génère le code de réinitialisation du mot de passe (firmwares < 5.3.0).
///
/// `serial` est le numéro de série sans le préfixe de modèle (sensible à la
/// casse) et `date` la date de l'horloge interne de l'équipement au format
/// `YYYYMMDD`.
pub fn generate_reset_code(serial: &str, date: &str) -> String {
    let seed = format!("{}{}", serial, date);

    let magic = seed.char_indices().fold(0u64, |acc, (i, ch)| {
        let pos = i as u64 + 1;
        acc.wrapping_add(pos.wrapping_mul(ch as u64) ^ pos)
    });

    let secret = magic.wrapping_mul(RESET_MULTIPLIER) as u32;

    secret
        .to_string()
        .chars()
        .map(|c| match c.to_digit(10) {
            Some(d) if (d as usize) < RESET_ALPHABET.len() => RESET_ALPHABET[d as usize],
            _ => c,
        })
        .collect()
}
