//! Startup banner

use std::fmt;
use std::io::Write;

use apm_core::Configuration;
use tracing::warn;

const LOGO: [&str; 13] = [
    "            #            ",
    "           ###           ",
    "          #####          ",
    "         #######         ",
    "        #########        ",
    "       ###########       ",
    "      ###### ######      ",
    "     ######   ######     ",
    "    ######  ## ######    ",
    "   ######  ###########   ",
    "  ######  #############  ",
    " ######     ############ ",
    "######           ########",
];

/// Logo with the app identity and APM status alongside the last four rows
pub struct Banner<'a> {
    config: &'a Configuration,
}

impl<'a> Banner<'a> {
    pub fn new(config: &'a Configuration) -> Self {
        Self { config }
    }

    /// Write the banner to `out`. A write failure is logged, not returned.
    pub fn write_to<W: Write>(&self, mut out: W) {
        if let Err(e) = writeln!(out, "{}", self).and_then(|()| out.flush()) {
            warn!(error = %e, "Could not print the startup banner");
        }
    }
}

impl fmt::Display for Banner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.config.telemetry().enabled() {
            "active"
        } else {
            "inactive"
        };
        let captions = [
            format!("Welcome to {}", self.config.app_name().to_uppercase()),
            format!("Version : {}", self.config.app_version()),
            format!("Environment : {}", self.config.environment()),
            format!("APM : {}", status),
        ];

        let first_caption = LOGO.len() - captions.len();
        for (row, line) in LOGO.iter().enumerate() {
            match row.checked_sub(first_caption).and_then(|i| captions.get(i)) {
                Some(caption) => writeln!(f, "{}\t{}", line, caption)?,
                None => writeln!(f, "{}", line)?,
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apm_core::{Environment, TelemetrySettings};
    use std::io;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }
    }

    #[test]
    fn test_banner_shows_identity_and_status() {
        let config = Configuration::new(Environment::Staging, "faro-demo", "1.2.3");
        let text = Banner::new(&config).to_string();

        assert_eq!(text.lines().count(), 13);
        assert!(text.contains("Welcome to FARO-DEMO"));
        assert!(text.contains("Version : 1.2.3"));
        assert!(text.contains("Environment : staging"));
        assert!(text.lines().last().unwrap().ends_with("APM : inactive"));
    }

    #[test]
    fn test_banner_active_status() {
        let config = Configuration::default().with_telemetry(TelemetrySettings::new(true, "http://c"));
        assert!(Banner::new(&config).to_string().contains("APM : active"));
    }

    #[test]
    fn test_write_to_buffer() {
        let config = Configuration::new(Environment::Local, "faro-demo", "1.2.3");
        let mut out = Vec::new();
        Banner::new(&config).write_to(&mut out);

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text, format!("{}\n", Banner::new(&config)));
    }

    #[test]
    fn test_write_to_closed_pipe_does_not_panic() {
        let config = Configuration::default();
        Banner::new(&config).write_to(ClosedPipe);
    }
}
