use core::fmt;

/// Security control byte of a general-glo-ciphering APDU (Green Book 9.2.7.2.4.1).
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct SecurityControl {
    security_control: u8,
}

impl fmt::Debug for SecurityControl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityControl")
            .field("suite_id", &self.suite_id())
            .field("authentication", &self.authentication())
            .field("encryption", &self.encryption())
            .finish()
    }
}

impl SecurityControl {
    #[rustfmt::skip]
    const ENCRYPTION_BIT:     u8 = 0b00100000;
    #[rustfmt::skip]
    const AUTHENTICATION_BIT: u8 = 0b00010000;

    /// Encrypted push telegrams with security suite 0 or 1.
    pub const SUPPORTED: [u8; 2] = [0x20, 0x21];

    pub fn new(security_control: u8) -> Self {
        Self { security_control }
    }

    pub fn byte(&self) -> u8 {
        self.security_control
    }

    pub fn is_supported(&self) -> bool {
        Self::SUPPORTED.contains(&self.security_control)
    }

    pub fn suite_id(&self) -> u8 {
        self.security_control & 0b00001111
    }

    pub fn authentication(&self) -> bool {
        (self.security_control & Self::AUTHENTICATION_BIT) != 0
    }

    pub fn encryption(&self) -> bool {
        (self.security_control & Self::ENCRYPTION_BIT) != 0
    }
}
