// SPDX-FileCopyrightText: 2026 Courier Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Signaling transport trait.

use async_trait::async_trait;

use crate::error::CourierError;
use crate::types::SignalEnvelope;

/// A pub/sub transport addressed by channel name.
///
/// Publishing to a channel with no subscribers is not an error.
#[async_trait]
pub trait SignalTransport: Send + Sync + 'static {
    async fn publish(&self, envelope: SignalEnvelope) -> Result<(), CourierError>;
}
