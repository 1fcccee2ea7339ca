//! Device classification from user agent strings.

use std::sync::LazyLock;

use regex::Regex;
use woothee::parser::Parser;

use crate::events::Device;

// woothee files iPads and Android tablets under "smartphone".
static TABLET_UA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)tablet|ipad|playbook|silk").expect("tablet pattern is valid")
});

/// Classifies user agents into device classes.
///
/// Uses the woothee library for category detection, with a tablet pass first.
pub struct DeviceClassifier {
    parser: Parser,
}

impl DeviceClassifier {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }

    pub fn classify(&self, user_agent: &str) -> Device {
        if user_agent.trim().is_empty() {
            return Device::Unknown;
        }
        if TABLET_UA.is_match(user_agent) {
            return Device::Tablet;
        }

        match self.parser.parse(user_agent).map(|r| r.category) {
            Some("pc") => Device::Desktop,
            Some("smartphone") | Some("mobilephone") => Device::Mobile,
            _ => Device::Unknown,
        }
    }

    /// Device supplied by the client wins; otherwise derive it from the user agent.
    pub fn resolve(&self, explicit: Option<Device>, user_agent: Option<&str>) -> Device {
        match explicit {
            Some(device) if device != Device::Unknown => device,
            _ => user_agent.map_or(Device::Unknown, |ua| self.classify(ua)),
        }
    }
}

impl Default for DeviceClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chrome_macos_is_desktop() {
        let classifier = DeviceClassifier::new();
        let device = classifier.classify(
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
        );
        assert_eq!(device, Device::Desktop);
    }

    #[test]
    fn test_iphone_is_mobile() {
        let classifier = DeviceClassifier::new();
        let device = classifier.classify(
            "Mozilla/5.0 (iPhone; CPU iPhone OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
        );
        assert_eq!(device, Device::Mobile);
    }

    #[test]
    fn test_ipad_is_tablet() {
        let classifier = DeviceClassifier::new();
        let device = classifier.classify(
            "Mozilla/5.0 (iPad; CPU OS 17_0 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Mobile/15E148 Safari/604.1",
        );
        assert_eq!(device, Device::Tablet);
    }

    #[test]
    fn test_empty_user_agent_is_unknown() {
        let classifier = DeviceClassifier::new();
        assert_eq!(classifier.classify(""), Device::Unknown);
        assert_eq!(classifier.resolve(None, None), Device::Unknown);
    }

    #[test]
    fn test_explicit_device_wins() {
        let classifier = DeviceClassifier::new();
        let device = classifier.resolve(Some(Device::Mobile), Some("Mozilla/5.0 (Windows NT 10.0)"));
        assert_eq!(device, Device::Mobile);
    }
}
