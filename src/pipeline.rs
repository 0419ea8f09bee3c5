//! Receive buffer and stage chaining for one meter.

use alloc::vec::Vec;
use core::mem;

use log::{Level, debug, info, log_enabled, trace, warn};

use crate::{
    Error, GeneralGloCiphering, MeterConfig, MeterReading, ProviderProfile,
    data_notification::DataNotificationHeader, decryption::Decryptor, mbus,
    obis_decoder::ObisDecoder,
};

/// Decodes the telegrams one meter pushes over its serial line.
///
/// Bytes are [`feed`](Self::feed) as they arrive. A telegram is complete once the
/// line has been quiet for the configured read timeout, which [`poll`](Self::poll)
/// checks. Every decode attempt consumes the whole buffer, successful or not.
#[derive(Debug)]
pub struct DlmsMeter {
    profile: ProviderProfile,
    decryptor: Decryptor,
    decoder: ObisDecoder,
    read_timeout_ms: u64,
    max_buffer_len: usize,
    buffer: Vec<u8>,
    last_read_ms: u64,
}

impl DlmsMeter {
    pub fn new(config: MeterConfig) -> Self {
        config.log_summary();

        Self {
            profile: config.profile,
            decryptor: Decryptor::new(&config.key),
            decoder: ObisDecoder::new(config.profile),
            read_timeout_ms: config.read_timeout_ms,
            max_buffer_len: config.max_buffer_len,
            buffer: Vec::new(),
            last_read_ms: 0,
        }
    }

    pub fn profile(&self) -> ProviderProfile {
        self.profile
    }

    /// Bytes received since the last decode attempt.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Appends received bytes. Exceeding the buffer limit drops everything received
    /// so far.
    pub fn feed(&mut self, bytes: &[u8], now_ms: u64) -> Result<(), Error> {
        if bytes.is_empty() {
            return Ok(());
        }

        if self.buffer.len() + bytes.len() > self.max_buffer_len {
            warn!(
                "receive buffer overflow: {} + {} byte(s) exceed {}",
                self.buffer.len(),
                bytes.len(),
                self.max_buffer_len
            );
            self.buffer.clear();
            return Err(Error::BufferOverflow { limit: self.max_buffer_len });
        }

        self.buffer.extend_from_slice(bytes);
        self.last_read_ms = now_ms;
        Ok(())
    }

    /// Decodes the buffered telegram once the line has been quiet for longer than
    /// the read timeout.
    pub fn poll(&mut self, now_ms: u64) -> Result<Option<MeterReading>, Error> {
        if self.buffer.is_empty() || now_ms.saturating_sub(self.last_read_ms) <= self.read_timeout_ms {
            return Ok(None);
        }

        self.process()
    }

    /// Decodes whatever is buffered, leaving the buffer empty.
    pub fn process(&mut self) -> Result<Option<MeterReading>, Error> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        let raw = mem::take(&mut self.buffer);

        match self.decode_telegram(&raw) {
            Ok(reading) => {
                info!("received valid data");
                debug!("{:?}", reading);
                Ok(Some(reading))
            }
            Err(err) => {
                warn!("dropping telegram of {} byte(s): {}", raw.len(), err);
                Err(err)
            }
        }
    }

    /// Runs every decode stage on one complete telegram.
    pub fn decode_telegram(&self, raw: &[u8]) -> Result<MeterReading, Error> {
        if log_enabled!(Level::Trace) {
            trace!("telegram: {}", hex::encode(raw));
        }

        let ciphertext = mbus::assemble(raw)?;
        let apdu = GeneralGloCiphering::parse(&ciphertext, self.profile)?;
        let plaintext = self.decryptor.decrypt(&apdu)?;

        if log_enabled!(Level::Trace) {
            trace!("plaintext: {}", hex::encode(&plaintext));
        }

        let notification = DataNotificationHeader::parse(&plaintext)?;
        debug!(
            "data notification: invoke id {}",
            notification.long_invoke_id_and_priority.invoke_id()
        );

        Ok(self.decoder.decode(&plaintext)?)
    }
}
