use crate::options::ExiOptions;

/// Encoder-Konfiguration (Header-Optionen).
#[derive(Debug, Clone, Default)]
pub struct EncoderConfig {
    /// "$EXI" Cookie am Anfang schreiben.
    pub include_cookie: bool,
    /// Options-Header immer schreiben (auch bei Default-Options).
    pub include_options: bool,
}

impl EncoderConfig {
    /// Konfiguration mit Cookie.
    pub fn with_cookie() -> Self {
        Self { include_cookie: true, include_options: false }
    }

    /// Options-Dokument im Header: wenn angefordert oder wenn die Optionen
    /// vom Standard abweichen.
    pub(crate) fn writes_options(&self, options: &ExiOptions) -> bool {
        self.include_options || options.differs_from_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Alignment;

    #[test]
    fn options_follow_defaults() {
        let config = EncoderConfig::default();
        assert!(!config.writes_options(&ExiOptions::default()));
        assert!(config.writes_options(&ExiOptions::default().with_alignment(Alignment::ByteAlignment)));
        let forced = EncoderConfig { include_options: true, ..EncoderConfig::default() };
        assert!(forced.writes_options(&ExiOptions::default()));
    }
}
