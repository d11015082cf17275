// Copyright (c) 2022 MASSA LABS <info@massa.net>

use displaydoc::Display;
use thiserror::Error;

/// Signature errors
#[non_exhaustive]
#[derive(Display, Error, Debug)]
pub enum SignatureError {
    /// parsing error : {0}
    ParsingError(String),

    /// ed25519 engine error: {0}
    EngineError(#[from] ed25519_dalek::SignatureError),

    /// signature verification failed: {0}
    SignatureVerificationError(String),
}
